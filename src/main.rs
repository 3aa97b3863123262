use anyhow::Context;
use roomchat::{app, auth, db, AppState, Config};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_filter).context("invalid RUST_LOG")?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_pool = db::connect(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("connecting to {}", config.database_url))?;
    db::migrate(&db_pool).await.context("running migrations")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("serve") => serve(config, db_pool).await,
        Some("create-user") => create_user(&db_pool, args.get(1).cloned()).await,
        Some(other) => Err(anyhow::anyhow!("unknown command {other:?}, expected serve or create-user [username]")),
    }
}

async fn serve(config: Config, db_pool: sqlx::SqlitePool) -> anyhow::Result<()> {
    let app = app(AppState::new(db_pool, config.membership_policy))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, policy = %config.membership_policy, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn create_user(db_pool: &sqlx::SqlitePool, username: Option<String>) -> anyhow::Result<()> {
    let username = username.unwrap_or_else(auth::random_username);
    let user = auth::create_user(db_pool, &username)
        .await
        .with_context(|| format!("creating user {username:?}"))?;
    let key = auth::issue_token(db_pool, user.id).await?;

    println!("user {} {} token {key}", user.id, user.username);
    Ok(())
}
