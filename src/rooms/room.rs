use axum::{
    debug_handler,
    extract::{rejection::{FormRejection, PathRejection}, Path, State},
    http::StatusCode,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{auth::Authenticated, db::{self, RoomUser}, AppError, AppResult, AppState};

use super::existing_room;

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomForm {
    name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatedRoom {
    id: i64,
    name: String,
    room_user_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomDetail {
    id: i64,
    name: String,
    member_count: i64,
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_room(
    Authenticated(user): Authenticated,
    State(db_pool): State<SqlitePool>,
    form: Result<Form<NewRoomForm>, FormRejection>,
) -> AppResult<(StatusCode, Json<CreatedRoom>)> {
    let Form(NewRoomForm { name }) = form?;
    let name = name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(AppError::BadRequest("A room needs a name.".to_owned()));
    }

    let mut tx = db_pool.begin().await?;
    let room = db::create_room(&mut *tx, name).await?;
    let (room_user, _) = db::join_room(&mut tx, room.id, user.id).await?;
    tx.commit().await?;
    tracing::info!(room_id = room.id, user_id = user.id, "created room");

    Ok((
        StatusCode::CREATED,
        Json(CreatedRoom { id: room.id, name: room.name, room_user_id: room_user.id }),
    ))
}

#[debug_handler(state = AppState)]
pub(crate) async fn room(
    Authenticated(_): Authenticated,
    room_pk: Result<Path<i64>, PathRejection>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<RoomDetail>> {
    let Path(room_pk) = room_pk?;
    let room = existing_room(&db_pool, room_pk).await?;
    let member_count = db::count_members(&db_pool, room.id).await?;

    Ok(Json(RoomDetail { id: room.id, name: room.name, member_count }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn join(
    Authenticated(user): Authenticated,
    room_pk: Result<Path<i64>, PathRejection>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<(StatusCode, Json<RoomUser>)> {
    let Path(room_pk) = room_pk?;
    let room = existing_room(&db_pool, room_pk).await?;

    let mut conn = db_pool.acquire().await?;
    let (room_user, created) = db::join_room(&mut conn, room.id, user.id).await?;
    if !created {
        return Ok((StatusCode::OK, Json(room_user)));
    }

    tracing::info!(room_id = room.id, user_id = user.id, room_user_id = room_user.id, "joined room");
    Ok((StatusCode::CREATED, Json(room_user)))
}
