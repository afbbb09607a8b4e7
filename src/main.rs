use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use botvault::{
    config,
    credentials::CredentialService,
    db::{self, Db},
    platform::discord::DiscordPlatform,
    providers::groq::GroqProvider,
    router::CommandRouter,
    routes,
    state::AppState,
    store::SecretStore,
    supervisor::SessionSupervisor,
    vault::SecretCipher,
};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "botvault", about = "Multi-tenant Discord AI bot backend", version)]
struct Cli {
    /// Path to TOML config file
    #[arg(short, long, default_value = "botvault.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server and all stored tenant bot sessions
    Serve,
    /// Register the bot's slash commands with Discord (run once per deploy)
    DeployCommands,
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging from RUST_LOG (default: info)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botvault=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => serve(cfg).await,
        Commands::DeployCommands => deploy_commands(&cfg).await,
    }
}

// ── Serve ──────────────────────────────────────────────────────────────────

async fn serve(cfg: config::BackendConfig) -> anyhow::Result<()> {
    // The process must not come up without a usable master key.
    let master_key = cfg
        .master_key_bytes()
        .context("refusing to start without a valid master key")?;
    let cipher = SecretCipher::new(master_key);

    let database = Arc::new(Db::open(&cfg.database_path).context("failed to open database")?);
    db::run_migrations(&database).context("failed to run database migrations")?;
    info!("Database ready at {}", cfg.database_path.display());

    let credentials = Arc::new(CredentialService::new(SecretStore::new(database), cipher));

    // Inbound events flow platform → router; replies flow back through the
    // supervisor's live connections.
    let (event_tx, event_rx) = tokio::sync::mpsc::channel(128);
    let (reply_tx, mut reply_rx) = tokio::sync::mpsc::channel(128);

    let platform = Arc::new(DiscordPlatform::new(&cfg.discord_api_base));
    let supervisor = Arc::new(SessionSupervisor::new(
        credentials.clone(),
        platform,
        event_tx,
        std::time::Duration::from_secs(cfg.login_timeout_secs),
    ));

    let provider = Arc::new(GroqProvider::new(&cfg.groq_api_base, &cfg.model));
    let router = Arc::new(CommandRouter::new(
        credentials.clone(),
        provider,
        &cfg.system_preamble,
    ));
    tokio::spawn(router.run(event_rx, reply_tx));

    let delivery_supervisor = supervisor.clone();
    tokio::spawn(async move {
        while let Some(reply) = reply_rx.recv().await {
            if let Err(e) = delivery_supervisor
                .send_to(&reply.tenant_id, &reply.channel_id, &reply.text)
                .await
            {
                tracing::warn!("could not deliver reply for tenant {}: {}", reply.tenant_id, e);
            }
        }
    });

    supervisor.start_all().await;

    let state = AppState::new(cfg.clone(), credentials, supervisor.clone());
    let app = routes::app(state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid bind address")?;
    info!("Listening on http://{}", addr);
    info!("Healthcheck available at http://{}/healthcheck", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    supervisor.shutdown().await;
    info!("All tenant sessions closed. Server stopped.");
    Ok(())
}

// ── Graceful shutdown ──────────────────────────────────────────────────────

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("Shutdown signal received, stopping server...");
}

// ── Slash command registration ─────────────────────────────────────────────

/// Register the global slash commands. `setkey`/`removekey` are gated to
/// Administrator via default_member_permissions (bit 0x8).
async fn deploy_commands(cfg: &config::BackendConfig) -> anyhow::Result<()> {
    let token = std::env::var("DISCORD_BOT_TOKEN")
        .context("DISCORD_BOT_TOKEN environment variable is not set")?;
    let client_id = std::env::var("DISCORD_CLIENT_ID")
        .context("DISCORD_CLIENT_ID environment variable is not set")?;

    let commands = serde_json::json!([
        {
            "name": "setkey",
            "description": "Set the Groq API key for this server (Admin only).",
            "default_member_permissions": "8",
            "options": [{
                "name": "key",
                "type": 3,
                "description": "Your Groq API key (starts with gsk_).",
                "required": true,
            }],
        },
        {
            "name": "removekey",
            "description": "Remove the stored Groq API key for this server (Admin only).",
            "default_member_permissions": "8",
        },
        {
            "name": "chatbot",
            "description": "Ask the AI a question.",
            "options": [{
                "name": "prompt",
                "type": 3,
                "description": "What do you want to ask?",
                "required": true,
            }],
        },
    ]);

    let url = format!(
        "{}/applications/{}/commands",
        cfg.discord_api_base.trim_end_matches('/'),
        client_id
    );
    let resp = reqwest::Client::new()
        .put(&url)
        .header("Authorization", format!("Bot {token}"))
        .json(&commands)
        .send()
        .await
        .context("slash command registration request failed")?;

    if !resp.status().is_success() {
        anyhow::bail!("slash command registration returned status {}", resp.status());
    }
    info!("Registered {} slash commands", 3);
    Ok(())
}
