//! stashd - Main Application Entry Point

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::{loader::DEFAULT_CONFIG_PATH, Config, ConfigLoader, ConfigValidator};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use vfs::RcloneDriver;

mod bootstrap;
mod logging;

use bootstrap::Bootstrap;
use logging::{init_logging, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "stashd", version, about = "Configuration bootstrap for the stashd storage service")]
struct Cli {
    /// Path of the INI configuration file, created if missing
    #[arg(short, long, env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Initialize and report readiness (default)
    Run,
    /// Validate an existing configuration file and list every issue
    Check,
    /// Print the effective configuration with secrets masked
    Show {
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    // Load .env before parsing so CONFIG_PATH and LOG_FORMAT can come from it
    let dotenv_result = dotenv::dotenv();

    let cli = Cli::parse();
    let log_control = init_logging(cli.log_format)?;

    match dotenv_result {
        Ok(path) => info!(path = %path.display(), "Loaded environment variables from .env file"),
        Err(e) if !e.not_found() => warn!("Could not load .env file: {}", e),
        Err(_) => {}
    }

    info!("Starting stashd v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let mut driver = RcloneDriver::new();
            let ctx = Bootstrap::new(&log_control, &mut driver)
                .run(&cli.config)
                .context("Initialization aborted")?;

            info!(
                mode = %ctx.config.system.mode,
                listen = %ctx.config.system.listen,
                filesystem = ctx.fs.name(),
                mounts = ?ctx.mounts,
                "stashd ready"
            );
        }
        Command::Check => check(&cli.config)?,
        Command::Show { format } => show(&cli.config, format)?,
    }

    Ok(())
}

/// Print every validation error and warning without touching the file
fn check(path: &Path) -> Result<()> {
    let doc = ConfigLoader::read_document(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = Config::map_document(&doc).context("Failed to map configuration")?;
    let report = ConfigValidator::report(&config);

    for issue in &report.errors {
        println!("error: {}", issue);
    }
    if report.has_warnings() {
        for issue in &report.warnings {
            println!("warning: {}", issue);
        }
    }
    println!("{}", report.summary());

    if !report.is_valid() {
        bail!("{} is invalid", path.display());
    }
    Ok(())
}

/// Print the validated configuration with secrets masked
fn show(path: &Path, format: OutputFormat) -> Result<()> {
    let doc = ConfigLoader::read_document(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = Config::from_document(&doc).context("Invalid configuration")?.redacted();

    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(&config).context("Failed to serialize configuration")?,
        OutputFormat::Json => {
            serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?
        }
    };
    println!("{}", rendered);
    Ok(())
}
