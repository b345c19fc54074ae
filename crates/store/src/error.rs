//! Classification of `sqlx::Error` into the shared [`SyncError`] taxonomy.
//!
//! Every repository method funnels its database errors through [`classify`] rather
//! than propagating `sqlx::Error` directly, so callers above the store never branch
//! on a database-specific type (§4.1 "Failure semantics").

use syncd_core::SyncError;

/// Postgres error code for a unique-constraint violation.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres error code for a check-constraint violation (e.g. pin size, I1).
const CHECK_VIOLATION: &str = "23514";

pub fn classify(err: sqlx::Error) -> SyncError {
    if let sqlx::Error::RowNotFound = err {
        return SyncError::NotFound("row not found".to_string());
    }
    if let Some(db_err) = err.as_database_error() {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return SyncError::IntegrityConflict(db_err.message().to_string());
            }
            Some(CHECK_VIOLATION) => {
                return SyncError::PermanentSource(db_err.message().to_string());
            }
            _ => {}
        }
    }
    SyncError::Transient(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(classify(sqlx::Error::RowNotFound), SyncError::NotFound(_)));
    }
}
