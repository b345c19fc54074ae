//! Persistent store (§4.1, C1): the only crate in the workspace that speaks SQL.
//!
//! Every other component reaches Postgres through one of the repos bundled in
//! [`Store`]. Grounded in the teacher's `bot/src/db.rs`: one `PgPool`-holding struct
//! per aggregate, cheap to clone, methods that return `Result` instead of panicking.

pub mod calendar_repo;
pub mod error;
pub mod feed_repo;
pub mod guild_repo;
pub mod map_repo;
pub mod moderation_repo;
pub mod pool;

use sqlx::PgPool;

pub use calendar_repo::CalendarRepo;
pub use feed_repo::FeedRepo;
pub use guild_repo::GuildRepo;
pub use map_repo::MapRepo;
pub use moderation_repo::ModerationRepo;
pub use pool::{connect_pool, run_migrations};

/// The full set of repositories, sharing one connection pool.
#[derive(Clone)]
pub struct Store {
    pub guilds: GuildRepo,
    pub feeds: FeedRepo,
    pub calendars: CalendarRepo,
    pub maps: MapRepo,
    pub moderation: ModerationRepo,
}

impl Store {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            guilds: GuildRepo::new(pool.clone()),
            feeds: FeedRepo::new(pool.clone()),
            calendars: CalendarRepo::new(pool.clone()),
            maps: MapRepo::new(pool.clone()),
            moderation: ModerationRepo::new(pool),
        }
    }

    /// Connect, migrate, and build every repo in one call — the engine's one-liner
    /// at startup.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = connect_pool(database_url, max_connections).await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }
}
