//! Type-safe wrappers for domain identifiers
//!
//! These newtypes prevent mixing different ID types at compile time.
//! For example, you cannot pass a `FeedId` where a `CalendarConfigId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                $name(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Primary key of a `FeedConfig` row.
uuid_id!(FeedId);
/// Primary key of a `CalendarConfig` row.
uuid_id!(CalendarConfigId);

/// Chat-platform snowflake IDs (guilds, channels, messages, roles, members, scheduled
/// events) all share the same 64-bit unsigned representation and the same storage
/// trick: Postgres has no unsigned bigint, so we round-trip through `i64`. Snowflakes
/// are time-ordered and won't exceed `i64::MAX` until the year 5138, so the cast is lossless
/// in practice.
macro_rules! snowflake_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[must_use]
            pub const fn new(value: u64) -> Self {
                $name(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                $name(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <i64 as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(
                    &i64::try_from(self.0).unwrap_or(i64::MAX),
                    buf,
                )
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <i64 as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok($name(raw as u64))
            }
        }
    };
}

/// A tenant: an isolated namespace corresponding 1:1 to a chat-platform server.
snowflake_id!(GuildId);
/// A text or voice channel within a guild.
snowflake_id!(ChannelId);
/// A posted or editable chat message.
snowflake_id!(MessageId);
/// A role that can be mentioned (e.g. for reminders).
snowflake_id!(RoleId);
/// A guild member, identified the same way the chat platform identifies users.
snowflake_id!(MemberId);
/// A platform-side scheduled event, created and owned by the calendar engine.
snowflake_id!(ScheduledEventId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_id_creation() {
        let id1 = FeedId::new();
        let id2 = FeedId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_calendar_config_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = CalendarConfigId::from(uuid);
        assert_eq!(Uuid::from(id), uuid);
    }

    #[test]
    fn test_snowflake_roundtrip_display() {
        let id = GuildId::new(123_456_789_012_345_678);
        assert_eq!(id.to_string(), "123456789012345678");
        assert_eq!(u64::from(id), 123_456_789_012_345_678);
    }

    #[test]
    fn test_snowflake_serialization() {
        let id = ChannelId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let back: ChannelId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_distinct_id_types_do_not_mix() {
        // This is a compile-time guarantee; here we just check the values compare
        // equal in their own domains.
        let guild = GuildId::new(1);
        let channel = ChannelId::new(1);
        assert_eq!(guild.0, channel.0);
    }
}
