use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqliteConnection, SqliteExecutor, SqlitePool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Room {
    pub id: i64,
    pub name: String,
}

/// A user's membership in a room. Messages point at this, not at the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RoomUser {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
}

pub async fn connect(database_url: &str, max_connections: u32) -> sqlx::Result<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// A single-connection in-memory database. The connection never idles out,
/// so the schema lives as long as the pool.
pub async fn connect_in_memory() -> sqlx::Result<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

pub async fn migrate(db_pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(db_pool).await
}

pub async fn create_room<'e>(executor: impl SqliteExecutor<'e>, name: &str) -> sqlx::Result<Room> {
    sqlx::query_as("INSERT INTO rooms (name) VALUES (?) RETURNING id,name")
        .bind(name)
        .fetch_one(executor)
        .await
}

pub async fn find_room(db_pool: &SqlitePool, room_id: i64) -> sqlx::Result<Option<Room>> {
    sqlx::query_as("SELECT id,name FROM rooms WHERE id=?")
        .bind(room_id)
        .fetch_optional(db_pool)
        .await
}

pub async fn count_members(db_pool: &SqlitePool, room_id: i64) -> sqlx::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM room_users WHERE room_id=?")
        .bind(room_id)
        .fetch_one(db_pool)
        .await?;
    Ok(count)
}

pub async fn find_membership<'e>(
    executor: impl SqliteExecutor<'e>,
    room_id: i64,
    user_id: i64,
) -> sqlx::Result<Option<RoomUser>> {
    sqlx::query_as("SELECT id,room_id,user_id FROM room_users WHERE room_id=? AND user_id=?")
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// Adds the user to the room unless they are already in it. The flag is
/// true when a new membership row was written. Takes a connection so the
/// join can share a transaction with whatever the caller writes next.
pub async fn join_room(
    conn: &mut SqliteConnection,
    room_id: i64,
    user_id: i64,
) -> sqlx::Result<(RoomUser, bool)> {
    let inserted = sqlx::query("INSERT INTO room_users (room_id,user_id) VALUES (?,?) ON CONFLICT (room_id,user_id) DO NOTHING")
        .bind(room_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected()
        > 0;

    let room_user = find_membership(&mut *conn, room_id, user_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    Ok((room_user, inserted))
}
