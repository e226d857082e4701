//! Logging initialization and runtime level control

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::env;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};
use types::StashError;

/// Filter used until the configuration says otherwise
pub const STARTUP_LOG_LEVEL: &str = "debug";

/// Filter used once debug mode is known to be off
pub const QUIET_LOG_LEVEL: &str = "info";

/// Output format of the log sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Something that can change the process log filter after startup
pub trait LogControl {
    fn set_level(&self, directive: &str) -> Result<(), StashError>;
}

/// Handle to the reloadable filter installed by [`init_logging`]
pub struct ReloadHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogControl for ReloadHandle {
    fn set_level(&self, directive: &str) -> Result<(), StashError> {
        let filter = EnvFilter::try_new(directive).map_err(|e| StashError::Logging(e.to_string()))?;
        self.handle
            .reload(filter)
            .map_err(|e| StashError::Logging(e.to_string()))
    }
}

/// Initialize logging, returning a handle to adjust the level later
pub fn init_logging(format: LogFormat) -> Result<ReloadHandle> {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| STARTUP_LOG_LEVEL.to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&log_level));
    let (filter, handle) = reload::Layer::new(env_filter);

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
    }

    info!(level = %log_level, format = ?format, "Logging initialized");

    Ok(ReloadHandle { handle })
}
