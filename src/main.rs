use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use jspsych_collector::config::Config;
use jspsych_collector::export;
use jspsych_collector::store::PgStore;

#[derive(Parser)]
#[command(name = "jspsych-collector", version, about = "Serve a jsPsych experiment and store its results")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Dump all stored entries as JSON Lines
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Logs go to stderr so `export` can write to stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Export { output } => run_export(config, output).await,
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting jspsych-collector");

    let store = Arc::new(PgStore::connect_lazy(
        &config.database_url,
        config.max_connections,
    )?);

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(
        mode = ?config.submission_mode,
        max_body_size = config.max_body_size,
        "Submission endpoint configured"
    );
    let app = jspsych_collector::build_app(store.clone(), config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    jspsych_collector::serve(listener, app, store.clone(), shutdown_signal()).await?;

    store.close().await;
    tracing::info!("Database pool closed");

    Ok(())
}

async fn run_export(config: Config, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgStore::connect_lazy(&config.database_url, 1)?;
    store.ready().await?;

    let written = match &output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path).await?;
            let n = export::export_entries(store.pool(), &mut file).await?;
            file.sync_all().await?;
            n
        }
        None => {
            let mut stdout = tokio::io::stdout();
            export::export_entries(store.pool(), &mut stdout).await?
        }
    };

    match output {
        Some(path) => tracing::info!("Exported {written} entries to {}", path.display()),
        None => tracing::info!("Exported {written} entries"),
    }

    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
