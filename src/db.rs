use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use time::OffsetDateTime;

// rooms: unique id, members kept as a JSON array in insertion order.
const CREATE_ROOMS: &str = "CREATE TABLE IF NOT EXISTS rooms (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    avatar TEXT NOT NULL,
    owner TEXT NOT NULL,
    members TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    version INTEGER NOT NULL DEFAULT 0
)";

// messages: unique id, dropped together with their room.
const CREATE_MESSAGES: &str = "CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY NOT NULL,
    room_id TEXT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
    sender TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at INTEGER NOT NULL
)";

const CREATE_MESSAGES_ROOM_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS messages_room_id ON messages (room_id)";

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    init(&db_pool).await?;
    Ok(db_pool)
}

/// Single-connection in-memory database; every extra connection would see its own empty db.
pub async fn memory() -> anyhow::Result<SqlitePool> {
    connect("sqlite::memory:", 1).await
}

pub async fn init(db_pool: &SqlitePool) -> sqlx::Result<()> {
    for statement in [CREATE_ROOMS, CREATE_MESSAGES, CREATE_MESSAGES_ROOM_INDEX] {
        sqlx::query(statement).execute(db_pool).await?;
    }
    tracing::debug!("schema ready");
    Ok(())
}

/// Current time truncated to milliseconds, the precision timestamps are stored at.
pub(crate) fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - time::Duration::nanoseconds(i64::from(now.nanosecond() % 1_000_000))
}

pub(crate) fn to_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn from_millis(millis: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
}
