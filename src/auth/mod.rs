use rand::{distr::Alphanumeric, seq::IndexedRandom, Rng};
use sqlx::SqlitePool;

use crate::db::User;

mod token;

pub use token::{bearer_token, Authenticated};

pub const TOKEN_LEN: usize = 40;

pub async fn create_user(db_pool: &SqlitePool, username: &str) -> sqlx::Result<User> {
    let user: User = sqlx::query_as("INSERT INTO users (username) VALUES (?) RETURNING id,username")
        .bind(username)
        .fetch_one(db_pool)
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "created user");
    Ok(user)
}

pub fn random_username() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy", "Sad",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    let adjective = adjectives.choose(&mut rng).copied().unwrap_or("Nameless");
    let noun = nouns.choose(&mut rng).copied().unwrap_or("User");
    format!("{adjective}{noun}{}", rng.random_range(1000..10000))
}

/// Stores a fresh random key for the user and returns it.
pub async fn issue_token(db_pool: &SqlitePool, user_id: i64) -> sqlx::Result<String> {
    let key: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();

    sqlx::query("INSERT INTO tokens (key,user_id) VALUES (?,?)")
        .bind(&key)
        .bind(user_id)
        .execute(db_pool)
        .await?;

    tracing::debug!(user_id, "issued token");
    Ok(key)
}

pub async fn authenticate(db_pool: &SqlitePool, key: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as("SELECT users.id,users.username FROM tokens JOIN users ON users.id=tokens.user_id WHERE tokens.key=?")
        .bind(key)
        .fetch_optional(db_pool)
        .await
}
