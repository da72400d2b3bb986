use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::Row;
use tokio::net::TcpListener;
use tracing::info;

use intercom_config::load as load_config;
use intercom_database::{ChatRepository, CreateChatRequest, CreateUserRequest, SessionRepository, UserRepository};
use intercom_gateway::{build_router, GatewayState};
use intercom_runtime::{telemetry, BackendServices};

#[derive(Parser)]
#[command(name = "intercom-backend")]
#[command(about = "Intercom real-time messaging backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the WebSocket server (default)
    Serve,
    /// Seed the database with test users, a chat, and session tokens
    SeedData,
    /// Clear all chats and messages from the database
    ClearData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::SeedData => seed_data().await,
        Commands::ClearData => clear_data().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Intercom backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = GatewayState::new(services.engine.clone(), services.authenticator.clone());
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "websocket server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(intercom_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let users = UserRepository::new(services.db_pool.clone());
    let chats = ChatRepository::new(services.db_pool.clone());
    let sessions = SessionRepository::new(services.db_pool.clone());

    let mut member_ids = Vec::new();
    println!("=== SEEDED USERS ===");
    for (username, display_name) in [
        ("alice", Some("Alice")),
        ("bob", Some("Bob")),
        ("charlie", None),
    ] {
        let user = match users.find_by_username(username).await? {
            Some(existing) => existing,
            None => {
                users
                    .create(&CreateUserRequest {
                        username: username.to_string(),
                        display_name: display_name.map(str::to_string),
                    })
                    .await?
            }
        };
        let session = sessions
            .create(&user.id, config.auth.session_ttl_seconds)
            .await?;
        println!("{:<10} id={}  token={}", user.username, user.id, session.token);
        member_ids.push(user.id);
    }

    let chat = chats
        .create(&CreateChatRequest {
            title: "general".to_string(),
            member_ids,
        })
        .await?;
    println!("\n=== SEEDED CHAT ===");
    println!("{:<10} id={}", chat.title, chat.id);
    println!("\nconnect with: ws://{}:{}/ws?token=<token>", config.http.address, config.http.port);

    Ok(())
}

async fn clear_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("clearing chats and messages from database");

    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    for table in ["message_reactions", "message_reads", "messages", "chat_members", "chats"] {
        let result = sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&services.db_pool)
            .await
            .with_context(|| format!("failed to clear table {table}"))?;
        println!("{:<18} {} rows deleted", table, result.rows_affected());
    }

    let remaining = sqlx::query("SELECT COUNT(*) AS n FROM users")
        .fetch_one(&services.db_pool)
        .await?;
    let n: i64 = remaining.get("n");
    println!("users kept          {n} rows");

    Ok(())
}
