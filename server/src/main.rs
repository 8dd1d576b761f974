mod config;
mod http;
mod persistence;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use config::Backend;
use persistence::sqlite::{Database, SqliteStore};
use persistence::{FileStore, Storage};
use session::SessionManager;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Hazard hunt game server.
///
/// Every flag falls back to its `HAZARD_*` environment variable, then to a
/// built-in default.
#[derive(Parser)]
#[command(name = "hazard-server", about = "Risk-spotting game backend")]
struct Cli {
    /// Address to listen on.
    #[arg(long)]
    bind: Option<String>,

    /// Directory holding the database or JSON files.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Storage backend.
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Write logs to daily rolling files in this directory instead of stdout.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn init_tracing(log_dir: Option<PathBuf>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(&dir, "hazard-server");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(non_blocking)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_span_events(FmtSpan::CLOSE)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.or_else(config::get_log_dir))?;

    let data_dir = cli.data_dir.unwrap_or_else(config::get_data_dir);
    let bind = cli.bind.unwrap_or_else(config::get_bind_addr);
    let backend = cli.backend.unwrap_or_else(config::get_backend);

    tracing::info!("Starting hazard server");
    tracing::info!("Using data directory: {}", data_dir.display());

    match backend {
        Backend::Sqlite => {
            let settings = config::get_sqlite_settings();
            let db = Database::open(&data_dir.join("hazard.db"), settings).await?;
            serve(SqliteStore::new(db.pool().clone()), &bind).await
        }
        Backend::Json => serve(FileStore::new(data_dir), &bind).await,
    }
}

async fn serve<S: Storage>(store: S, bind: &str) -> anyhow::Result<()> {
    let manager = Arc::new(SessionManager::new(
        Arc::new(store),
        config::get_session_idle(),
    ));
    let app = http::router(http::AppState::new(Arc::clone(&manager)));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    manager.shutdown().await;
    Ok(())
}
