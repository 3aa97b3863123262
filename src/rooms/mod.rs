mod msg;
mod room;

use axum::{routing::{get, post}, Router};
use sqlx::{SqliteConnection, SqlitePool};

use crate::{config::MembershipPolicy, db::{self, Room, RoomUser}, AppError, AppResult, AppState};

pub use msg::{MessageView, NewMessage};

pub const MESSAGES_ROUTE: &str = "/rooms/{room_pk}/messages/";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms/", post(room::new_room))
        .route("/rooms/{room_pk}/", get(room::room))
        .route("/rooms/{room_pk}/users/", post(room::join))
        .route(MESSAGES_ROUTE, get(msg::list_msgs).post(msg::send_msg))
        .route("/rooms/{room_pk}/messages", get(msg::list_msgs).post(msg::send_msg))
}

pub fn messages_path(room_pk: i64) -> String {
    MESSAGES_ROUTE.replace("{room_pk}", &room_pk.to_string())
}

async fn existing_room(db_pool: &SqlitePool, room_pk: i64) -> AppResult<Room> {
    db::find_room(db_pool, room_pk)
        .await?
        .ok_or(AppError::NotFound("Room"))
}

/// Looks up the user's membership in the room. A missing membership is an
/// error under `Enforce`; under `Open` it comes back as `None` and the caller
/// decides whether to join.
async fn membership(
    db_pool: &SqlitePool,
    policy: MembershipPolicy,
    room: &Room,
    user_id: i64,
) -> AppResult<Option<RoomUser>> {
    let room_user = db::find_membership(db_pool, room.id, user_id).await?;
    if room_user.is_none() && policy == MembershipPolicy::Enforce {
        return Err(AppError::Forbidden(format!("You are not a member of room {}.", room.id)));
    }

    Ok(room_user)
}

async fn join_if_missing(
    conn: &mut SqliteConnection,
    room: &Room,
    user_id: i64,
    room_user: Option<RoomUser>,
) -> AppResult<RoomUser> {
    if let Some(room_user) = room_user {
        return Ok(room_user);
    }

    let (room_user, _) = db::join_room(conn, room.id, user_id).await?;
    tracing::info!(room_id = room.id, user_id, room_user_id = room_user.id, "joined room on first post");
    Ok(room_user)
}
