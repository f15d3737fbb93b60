//! Notebook server binary.
//!
//! ```text
//!  Client ──▶ tower layers ──▶ dispatch ──▶ Pipeline ──▶ controllers ──▶ services
//!             (trace, id,                   (route, bind, session,
//!              timeout, limit)               locale, flash, intercept,
//!                                            invoke, compress, cookies)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use notebook_server::config::{load_config, AppConfig};
use notebook_server::observability::{logging, metrics};
use notebook_server::{assemble, HttpServer, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "notebook-server", version, about = "Photo album notebook server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "notebook-server starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = assemble(config)?;
    tracing::info!(
        bind_address = %app.config.listener.bind_address,
        request_timeout_secs = app.config.timeouts.request_secs,
        handler_timeout_ms = app.config.timeouts.handler_ms,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&app.config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::with_ctrl_c();
    let signal = shutdown.subscribe();

    HttpServer::new(app).run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
