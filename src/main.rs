use anyhow::Result;
use assistant_backend::{config, server};
use tracing::{info, warn};

/// Validates that a log level string is valid
fn validate_log_level(level: &str) -> Result<()> {
    level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
                level
            )
        })?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging setup)
    let (config, source) = match config::load().await {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG may be a full filter directive; only the configured level is validated
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().ok();
    let log_level = config.server.logs.level.clone();

    if env_filter.is_none() {
        if let Err(e) = validate_log_level(&log_level) {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    let env_filter = match env_filter {
        Some(filter) => filter,
        None => tracing_subscriber::EnvFilter::try_new(&log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .init();

    info!("Starting assistant server with log level: {}", log_level);
    match source {
        config::ConfigSource::File(path) => info!("Configuration loaded from {}", path),
        config::ConfigSource::Defaults { missing } => warn!(
            "Configuration file {} not found, using defaults and environment",
            missing
        ),
    }

    server::run(config).await?;

    Ok(())
}
