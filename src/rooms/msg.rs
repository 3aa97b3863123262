use axum::{
    debug_handler,
    extract::{rejection::{FormRejection, PathRejection}, Path, State},
    http::StatusCode,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::{auth::Authenticated, config::MembershipPolicy, AppError, AppResult, AppState};

use super::{existing_room, join_if_missing, membership};

#[derive(Debug, Deserialize)]
pub struct NewMessage {
    pub body: Option<String>,
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub is_reaction: bool,
}

/// A message as one particular user sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub body: String,
    pub is_me: bool,
    pub room_user_id: i64,
    pub parent_id: Option<i64>,
    pub is_reaction: bool,
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: i64,
    room_user_id: i64,
    parent_id: Option<i64>,
    body: String,
    is_reaction: bool,
    author_id: i64,
}

impl MessageRow {
    fn view_for(self, user_id: i64) -> MessageView {
        MessageView {
            id: self.id,
            body: self.body,
            is_me: self.author_id == user_id,
            room_user_id: self.room_user_id,
            parent_id: self.parent_id,
            is_reaction: self.is_reaction,
        }
    }
}

macro_rules! select_msg {
    ($filter:literal) => {
        concat!(
            "SELECT messages.id,messages.room_user_id,messages.parent_id,messages.body,messages.is_reaction,room_users.user_id AS author_id ",
            "FROM messages JOIN room_users ON room_users.id=messages.room_user_id ",
            $filter
        )
    };
}

async fn find_msg(db_pool: &SqlitePool, room_id: i64, msg_id: i64) -> sqlx::Result<Option<MessageRow>> {
    sqlx::query_as(select_msg!("WHERE room_users.room_id=? AND messages.id=?"))
        .bind(room_id)
        .bind(msg_id)
        .fetch_optional(db_pool)
        .await
}

/// Checks the fields that don't depend on who is posting and returns the body.
async fn validate(db_pool: &SqlitePool, room_id: i64, msg: &NewMessage) -> AppResult<String> {
    let body = match msg.body.as_deref() {
        Some(body) if !body.trim().is_empty() => body.to_owned(),
        _ => return Err(AppError::BadRequest("A message needs a body.".to_owned())),
    };

    if msg.is_reaction && msg.parent_id.is_none() {
        return Err(AppError::BadRequest("A reaction needs a parent_id.".to_owned()));
    }

    if let Some(parent_id) = msg.parent_id {
        if find_msg(db_pool, room_id, parent_id).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "Message {parent_id} does not exist in room {room_id}."
            )));
        }
    }

    Ok(body)
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_msg(
    Authenticated(user): Authenticated,
    room_pk: Result<Path<i64>, PathRejection>,
    State(db_pool): State<SqlitePool>,
    State(policy): State<MembershipPolicy>,
    new_msg: Result<Form<NewMessage>, FormRejection>,
) -> AppResult<(StatusCode, Json<MessageView>)> {
    let Path(room_pk) = room_pk?;
    let room = existing_room(&db_pool, room_pk).await?;
    let room_user = membership(&db_pool, policy, &room, user.id).await?;

    // a malformed form only counts once the room and membership checks pass
    let Form(new_msg) = new_msg?;
    let body = validate(&db_pool, room.id, &new_msg).await?;

    let mut tx = db_pool.begin().await?;
    let room_user = join_if_missing(&mut tx, &room, user.id, room_user).await?;

    let (id,): (i64,) = sqlx::query_as("INSERT INTO messages (room_user_id,parent_id,body,is_reaction) VALUES (?,?,?,?) RETURNING id")
        .bind(room_user.id)
        .bind(new_msg.parent_id)
        .bind(&body)
        .bind(new_msg.is_reaction)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(msg_id = id, room_id = room.id, room_user_id = room_user.id, "posted message");

    let msg = find_msg(&db_pool, room.id, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    Ok((StatusCode::CREATED, Json(msg.view_for(user.id))))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_msgs(
    Authenticated(user): Authenticated,
    room_pk: Result<Path<i64>, PathRejection>,
    State(db_pool): State<SqlitePool>,
    State(policy): State<MembershipPolicy>,
) -> AppResult<Json<Vec<MessageView>>> {
    let Path(room_pk) = room_pk?;
    let room = existing_room(&db_pool, room_pk).await?;
    membership(&db_pool, policy, &room, user.id).await?;

    let msgs: Vec<MessageRow> = sqlx::query_as(select_msg!("WHERE room_users.room_id=? ORDER BY messages.id"))
        .bind(room.id)
        .fetch_all(&db_pool)
        .await?;

    Ok(Json(msgs.into_iter().map(|msg| msg.view_for(user.id)).collect()))
}
