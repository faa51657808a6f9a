//! # parleyd
//!
//! Parley hub server binary — wires the store, hub, and WebSocket server
//! together and runs until SIGINT/SIGTERM.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use parley_core::{Identity, Role, UserId};
use parley_server::auth::StaticTokenVerifier;
use parley_server::config::ServerConfig;
use parley_server::hub::ChatHub;
use parley_server::metrics::install_prometheus;
use parley_server::rpc::context::RpcContext;
use parley_server::rpc::handlers;
use parley_server::rpc::registry::MethodRegistry;
use parley_server::server::ParleyServer;
use parley_settings::{load_settings, ParleySettings};
use parley_store::{new_file, run_migrations, ConnectionConfig, MessageStore};

/// Parley hub server.
#[derive(Parser, Debug)]
#[command(name = "parleyd", about = "Parley support-messaging hub server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings; 0 auto-assigns).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` message database.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// The well-known support user id (overrides settings).
    #[arg(long)]
    support_user_id: Option<i64>,

    /// Path to the provisioned connection-token table (JSON).
    #[arg(long)]
    tokens_file: Option<PathBuf>,
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".parley")
}

fn default_db_path() -> PathBuf {
    home_dir().join("database").join("messages.db")
}

fn default_tokens_path() -> PathBuf {
    home_dir().join("tokens.json")
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// One provisioned connection token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenEntry {
    token: String,
    user_id: i64,
    role: Role,
}

/// Load the token table the external auth collaborator provisioned.
///
/// A missing file is not fatal — the server starts, every connection
/// attempt is refused, and the operator sees a warning.
fn load_token_table(path: &Path) -> Result<Vec<(String, Identity)>> {
    if !path.exists() {
        warn!(path = %path.display(), "token table not found, all connections will be refused");
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token table: {}", path.display()))?;
    let entries: Vec<TokenEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse token table: {}", path.display()))?;
    Ok(entries
        .into_iter()
        .map(|e| (e.token, Identity::new(UserId::new(e.user_id), e.role)))
        .collect())
}

fn apply_cli_overrides(settings: &mut ParleySettings, cli: &Cli) {
    if let Some(host) = &cli.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(id) = cli.support_user_id {
        settings.chat.support_user_id = id;
    }
    if let Some(path) = &cli.db_path {
        settings.database.path = path.display().to_string();
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,parley_server=debug")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut settings = load_settings().context("Failed to load settings")?;
    apply_cli_overrides(&mut settings, &cli);

    // ── Store ───────────────────────────────────────────────────────
    let db_path = if settings.database.path.is_empty() {
        default_db_path()
    } else {
        PathBuf::from(&settings.database.path)
    };
    ensure_parent_dir(&db_path)?;
    let pool = new_file(
        db_path.to_str().context("database path is not UTF-8")?,
        &ConnectionConfig {
            pool_size: settings.database.pool_size,
            busy_timeout_ms: settings.database.busy_timeout_ms,
            ..Default::default()
        },
    )
    .context("Failed to open message database")?;
    {
        let conn = pool.get()?;
        let applied = run_migrations(&conn)?;
        info!(path = %db_path.display(), applied, "message database ready");
    }
    let store = Arc::new(MessageStore::new(pool));

    // ── Hub & RPC surface ───────────────────────────────────────────
    let hub = Arc::new(ChatHub::new(
        store,
        UserId::new(settings.chat.support_user_id),
        settings.chat.history_limit,
    ));
    let ctx = Arc::new(RpcContext::new(hub));

    let mut registry = MethodRegistry::new();
    handlers::register_all(&mut registry);

    let tokens_path = cli.tokens_file.clone().unwrap_or_else(default_tokens_path);
    let verifier = Arc::new(StaticTokenVerifier::new(load_token_table(&tokens_path)?));
    info!(tokens = verifier.len(), "identity verifier ready");

    // ── Server ──────────────────────────────────────────────────────
    let prometheus = match install_prometheus() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "failed to install metrics recorder, /metrics disabled");
            None
        }
    };

    let config = ServerConfig::from_settings(&settings);
    let server = ParleyServer::new(config.clone(), registry, ctx, verifier, prometheus);
    let shutdown = server.shutdown().clone();
    let app = server.router();

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    let addr = listener.local_addr()?;
    info!(%addr, support_user_id = settings.chat.support_user_id, "parleyd listening");

    // SIGINT/SIGTERM → cancel every session task, then drain the server.
    let signal_shutdown = shutdown.clone();
    let _ = tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        signal_shutdown.shutdown();
    });

    let token = shutdown.token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .context("server error")?;

    info!("parleyd stopped");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
