// Fixtures shared by the endpoint tests: a router over a fresh in-memory
// database, user/token/room factories and a few request helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use roomchat::{
    app, auth,
    db::{self, Room, RoomUser, User},
    AppState, MembershipPolicy,
};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

static NEXT_USER: AtomicU64 = AtomicU64::new(1);

pub struct TestApp {
    pub router: Router,
    pub db_pool: SqlitePool,
}

impl TestApp {
    pub async fn new() -> TestApp {
        TestApp::with_policy(MembershipPolicy::Open).await
    }

    pub async fn with_policy(policy: MembershipPolicy) -> TestApp {
        let db_pool = db::connect_in_memory().await.expect("in-memory database");
        db::migrate(&db_pool).await.expect("migrations");

        TestApp {
            router: app(AppState::new(db_pool.clone(), policy)),
            db_pool,
        }
    }

    pub async fn create_user(&self) -> (User, String) {
        let username = format!("user{}", NEXT_USER.fetch_add(1, Ordering::Relaxed));
        let user = auth::create_user(&self.db_pool, &username).await.unwrap();
        let token = auth::issue_token(&self.db_pool, user.id).await.unwrap();
        (user, token)
    }

    pub async fn create_room_and_add_users(&self, users: &[&User]) -> Room {
        let room = db::create_room(&self.db_pool, "test room").await.unwrap();
        let mut conn = self.db_pool.acquire().await.unwrap();
        for user in users {
            db::join_room(&mut conn, room.id, user.id).await.unwrap();
        }
        room
    }

    pub async fn membership(&self, room: &Room, user: &User) -> Option<RoomUser> {
        db::find_membership(&self.db_pool, room.id, user.id).await.unwrap()
    }

    pub async fn message_count(&self) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.db_pool)
            .await
            .unwrap();
        count
    }

    pub async fn room_user_count(&self, room: &Room) -> i64 {
        db::count_members(&self.db_pool, room.id).await.unwrap()
    }

    pub async fn post_form(&self, uri: &str, token: Option<&str>, form: &[(&str, &str)]) -> (StatusCode, Value) {
        let request = authorized(Request::builder().method(Method::POST).uri(uri), token)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form_body(form))
            .unwrap();
        self.send(request).await
    }

    /// Posts with a raw `Authorization` header value and hands back the
    /// response headers too.
    pub async fn post_form_with_authorization(
        &self,
        uri: &str,
        authorization: &str,
        form: &[(&str, &str)],
    ) -> (StatusCode, HeaderMap, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, authorization)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form_body(form))
            .unwrap();
        self.send_with_headers(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let request = authorized(Request::builder().method(Method::GET).uri(uri), token)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, json) = self.send_with_headers(request).await;
        (status, json)
    }

    async fn send_with_headers(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, json)
    }
}

fn form_body(form: &[(&str, &str)]) -> Body {
    let body = form
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    Body::from(body)
}

fn authorized(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}
