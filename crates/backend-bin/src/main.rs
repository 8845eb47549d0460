use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrets_backend_lib::{
    auth::EncryptedCodec,
    config::{LogFormat, Settings, StorageBackend},
    router,
    storage::{CredentialStore, FlatFileStorage, MemoryStorage},
    AppState,
};
use tokio::net::TcpListener;
use tokio::time::interval;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Interval between session and rate limiter sweeps
const CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Parser)]
#[command(name = "secrets-server", version, about = "Credential registration and login server")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, env = "SECRETS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a fresh base64 key for reversible-encryption mode
    GenKey,
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    match settings.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::GenKey) = cli.command {
        println!("{}", EncryptedCodec::generate_key());
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    init_tracing(&settings);
    settings.validate().context("invalid settings")?;

    match settings.storage.backend {
        StorageBackend::Memory => serve(MemoryStorage::new(), settings).await,
        StorageBackend::File => {
            let storage = FlatFileStorage::new(&settings.storage.data_dir)
                .context("failed to open credential storage")?;
            info!(path = %storage.path().display(), "using flat-file credential storage");
            serve(storage, settings).await
        },
    }
}

async fn serve<S: CredentialStore + 'static>(storage: S, settings: Settings) -> anyhow::Result<()> {
    let bind_addr = settings.bind_addr;

    // Bad key material stops the process here, before any request is served
    let state = Arc::new(
        AppState::new(storage, settings).context("failed to initialise credential verifier")?,
    );

    let sessions = state.sessions.clone();
    let auth_rate_limiter = state.auth_rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired().await;
            auth_rate_limiter.cleanup();
            debug!(removed, "expired sessions swept");
        }
    });

    let app = router::create_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("listening on {bind_addr}");

    // Peer addresses key the login rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
