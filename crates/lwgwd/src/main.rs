//! lwgwd - LwM2M gateway daemon
//!
//! Usage:
//!   lwgwd [config.toml]
//!
//! Without a config file the built-in defaults are used.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lwgwd::config::LogFormat;
use lwgwd::{build_engine, create_router, AppState, DaemonConfig};

fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                if let Some(path) = args.get(i) {
                    config_path = Some(PathBuf::from(path));
                }
            }
            arg if !arg.starts_with('-') => {
                config_path = Some(PathBuf::from(arg));
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config_path
}

fn print_help() {
    eprintln!("lwgwd - LwM2M gateway daemon");
    eprintln!();
    eprintln!("Usage: lwgwd [OPTIONS] [CONFIG_FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [CONFIG_FILE]        TOML configuration file (defaults when omitted)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>  Same as CONFIG_FILE");
    eprintln!("  -h, --help           Print this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG             Log filter, overrides [logging] filter");
    eprintln!("  FILE_SERVER_ADDRESS  Host put into firmware download URIs");
}

fn init_tracing(config: &DaemonConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.filter.as_str().into());

    match config.logging.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = parse_args();
    let config = DaemonConfig::load(config_path.as_deref())?;

    init_tracing(&config);

    match &config_path {
        Some(path) => tracing::info!(config = %path.display(), "Loaded configuration"),
        None => tracing::info!("No config file given, using defaults"),
    }

    let engine = Arc::new(build_engine(&config)?);

    // Devices registered before startup are provisioned before ingress opens
    let devices = engine.bootstrap().await?;
    tracing::info!(devices, "Bootstrap complete");

    let app = create_router(AppState::new(engine));

    let listener = TcpListener::bind(&config.server.listen).await?;
    tracing::info!(addr = %config.server.listen, "Starting LwM2M gateway");

    axum::serve(listener, app).await?;

    Ok(())
}
