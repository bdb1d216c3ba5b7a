use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use chatshop_server::api::{AppState, router};
use chatshop_server::bootstrap;
use chatshop_server::config::ChatShopConfig;

/// ChatShop payment webhook server.
#[derive(Parser, Debug)]
#[command(name = "chatshop-server", about = "Standalone HTTP server for ChatShop")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "chatshop.toml")]
    config: PathBuf,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration, print it with secrets masked, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::CheckConfig) = cli.command {
        let config = ChatShopConfig::load(&cli.config)?;
        println!("{}", serde_json::to_string_pretty(&config.snapshot())?);
        return Ok(());
    }

    let mut config = ChatShopConfig::load(&cli.config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    chatshop_server::telemetry::init(&config.logging);

    if !cli.config.exists() {
        info!(path = %cli.config.display(), "config file not found, using defaults");
    }

    let services = bootstrap::build(&config)?;
    let sweeper = chatshop_state_memory::spawn_sweeper(
        services.store.clone(),
        Duration::from_secs(config.server.sweep_interval_seconds),
    );
    let event_logger = bootstrap::spawn_event_logger(&services.events);

    let app = router(AppState::new(&services, config.server.max_body_bytes));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "chatshop server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    event_logger.abort();
    info!("chatshop server stopped");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
