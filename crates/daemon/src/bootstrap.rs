//! Startup sequence: configuration file to ready application context
//!
//! Stages run strictly in order and each fatal failure stops the sequence.
//! The post-init steps (log level, remote binds) only ever degrade.

use crate::logging::{LogControl, QUIET_LOG_LEVEL};
use anyhow::Result;
use config::{Config, ConfigLoader, ConfigValidator, RcloneConfig, SystemConfig};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vfs::{configure_binds, default_filesystem, BindOutcome, Filesystem, RemoteDriver};

/// Initialization stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    FileReady,
    Parsed,
    Mapped,
    Validated,
    LoggingAdjusted,
    BindsAdjusted,
    Ready,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::FileReady => "file_ready",
            Stage::Parsed => "parsed",
            Stage::Mapped => "mapped",
            Stage::Validated => "validated",
            Stage::LoggingAdjusted => "logging_adjusted",
            Stage::BindsAdjusted => "binds_adjusted",
            Stage::Ready => "ready",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Everything the rest of the application needs after startup
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub fs: Arc<dyn Filesystem>,
    pub mounts: Vec<PathBuf>,
}

/// Runs the startup sequence once
pub struct Bootstrap<'a> {
    log_control: &'a dyn LogControl,
    driver: &'a mut dyn RemoteDriver,
    os: &'a str,
    stage: Stage,
}

impl<'a> Bootstrap<'a> {
    pub fn new(log_control: &'a dyn LogControl, driver: &'a mut dyn RemoteDriver) -> Self {
        Self {
            log_control,
            driver,
            os: std::env::consts::OS,
            stage: Stage::Start,
        }
    }

    /// Override the platform name used to gate remote binds
    pub fn with_os(mut self, os: &'a str) -> Self {
        self.os = os;
        self
    }

    fn advance(&mut self, stage: Stage) {
        debug!(from = %self.stage, to = %stage, "Initialization stage");
        self.stage = stage;
    }

    /// Load the configuration at `config_path` and apply the post-init steps
    pub fn run(mut self, config_path: &Path) -> Result<AppContext> {
        let config = match self.load(config_path) {
            Ok(config) => config,
            Err(e) => {
                let failed_after = self.stage;
                self.advance(Stage::Aborted);
                return Err(anyhow::Error::new(e).context(format!(
                    "Initialization of {} failed after stage {}",
                    config_path.display(),
                    failed_after
                )));
            }
        };

        if let Err(e) = adjust_logging(&config.system, self.log_control) {
            warn!(error = %e, "Could not lower log level");
        }
        self.advance(Stage::LoggingAdjusted);

        let (fs, mounts) = install_binds(self.os, &config.rclone, &mut *self.driver);
        self.advance(Stage::BindsAdjusted);

        self.advance(Stage::Ready);
        Ok(AppContext {
            config: Arc::new(config),
            fs,
            mounts,
        })
    }

    /// Fatal stages: file, parse, map, validate
    fn load(&mut self, config_path: &Path) -> types::Result<Config> {
        let created = ConfigLoader::materialize(config_path)?;
        self.advance(Stage::FileReady);

        let doc = ConfigLoader::read_document(config_path)?;
        self.advance(Stage::Parsed);

        let config = Config::map_document(&doc)?;
        self.advance(Stage::Mapped);

        config.validate()?;
        self.advance(Stage::Validated);

        info!(
            path = %config_path.display(),
            created,
            mode = %config.system.mode,
            listen = %config.system.listen,
            "Configuration loaded"
        );
        for warning in ConfigValidator::report(&config).warnings {
            warn!(field = %warning.field, "{}", warning.message);
        }

        Ok(config)
    }
}

/// Lower the log level to info unless debug mode is on.
///
/// Returns whether the level was changed.
pub fn adjust_logging(system: &SystemConfig, log_control: &dyn LogControl) -> types::Result<bool> {
    if system.debug {
        debug!("Debug mode enabled, keeping verbose logging");
        return Ok(false);
    }

    log_control.set_level(QUIET_LOG_LEVEL)?;
    info!(level = QUIET_LOG_LEVEL, "Log level adjusted");
    Ok(true)
}

/// Run the remote bind step, falling back to the local filesystem
pub fn install_binds(
    os: &str,
    rclone: &RcloneConfig,
    driver: &mut dyn RemoteDriver,
) -> (Arc<dyn Filesystem>, Vec<PathBuf>) {
    match configure_binds(os, Path::new(&rclone.config), &rclone.binds, driver) {
        BindOutcome::Installed { fs, mounts } => {
            info!(count = mounts.len(), "Remote binds installed");
            return (fs, mounts);
        }
        BindOutcome::Disabled => debug!("Remote binds disabled"),
        BindOutcome::UnsupportedPlatform { os } => {
            warn!(os = %os, "Remote binds are not supported on this platform")
        }
        BindOutcome::MissingRemoteConfig { path } => {
            warn!(path = %path.display(), "rclone configuration file not found")
        }
        BindOutcome::Aborted { error } => warn!(error = %error, "Remote bind setup aborted"),
    }

    (default_filesystem(), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use types::{FsError, StashError};
    use vfs::{LocalFs, SUPPORTED_OS};

    #[derive(Default)]
    struct RecordingLogControl {
        levels: RefCell<Vec<String>>,
    }

    impl LogControl for RecordingLogControl {
        fn set_level(&self, directive: &str) -> Result<(), StashError> {
            self.levels.borrow_mut().push(directive.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubDriver {
        config_path: Option<PathBuf>,
    }

    impl RemoteDriver for StubDriver {
        fn set_config_path(&mut self, path: &Path) -> Result<(), FsError> {
            self.config_path = Some(path.to_path_buf());
            Ok(())
        }

        fn open(&self, target: &str) -> Arc<dyn Filesystem> {
            Arc::new(LocalFs::new(format!("/nonexistent/{}", target)))
        }
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("conf.ini");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_first_run_creates_file_and_lowers_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/conf.ini");
        let logs = RecordingLogControl::default();
        let mut driver = StubDriver::default();

        let ctx = Bootstrap::new(&logs, &mut driver).run(&path).unwrap();

        assert!(path.is_file());
        assert_eq!(ctx.config.system.session_secret.len(), 64);
        assert_eq!(*logs.levels.borrow(), vec![QUIET_LOG_LEVEL]);
        assert_eq!(ctx.fs.name(), "local");
        assert!(ctx.mounts.is_empty());
    }

    #[test]
    fn test_debug_mode_keeps_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[System]\nDebug = true\n");
        let logs = RecordingLogControl::default();
        let mut driver = StubDriver::default();

        let ctx = Bootstrap::new(&logs, &mut driver).run(&path).unwrap();

        assert!(ctx.config.system.debug);
        assert!(logs.levels.borrow().is_empty());
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[Captcha]\nMode = 4\n");
        let logs = RecordingLogControl::default();
        let mut driver = StubDriver::default();

        let err = Bootstrap::new(&logs, &mut driver).run(&path).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Captcha.Mode"));
        assert!(message.contains("after stage mapped"));
        assert!(logs.levels.borrow().is_empty());
    }

    #[test]
    fn test_rerun_keeps_existing_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.ini");
        let logs = RecordingLogControl::default();

        let first = Bootstrap::new(&logs, &mut StubDriver::default()).run(&path).unwrap();
        let second = Bootstrap::new(&logs, &mut StubDriver::default()).run(&path).unwrap();

        assert_eq!(first.config.system.session_secret, second.config.system.session_secret);
        assert_eq!(first.config.system.hash_id_salt, second.config.system.hash_id_salt);
    }

    #[test]
    fn test_binds_installed_on_supported_platform() {
        let dir = tempfile::tempdir().unwrap();
        let rclone_conf = dir.path().join("rclone.conf");
        std::fs::write(&rclone_conf, "[remote]\ntype = local\n").unwrap();
        let path = write_config(
            dir.path(),
            &format!("[RClone]\nConfig = {}\nBinds = /data:remote:mybucket\n", rclone_conf.display()),
        );
        let logs = RecordingLogControl::default();
        let mut driver = StubDriver::default();

        let ctx = Bootstrap::new(&logs, &mut driver)
            .with_os(SUPPORTED_OS)
            .run(&path)
            .unwrap();

        assert_eq!(ctx.fs.name(), "bind");
        assert_eq!(ctx.mounts, vec![PathBuf::from("/"), PathBuf::from("/data")]);
        assert_eq!(driver.config_path, Some(rclone_conf));
    }

    #[test]
    fn test_malformed_bind_keeps_local_fs() {
        let dir = tempfile::tempdir().unwrap();
        let rclone_conf = dir.path().join("rclone.conf");
        std::fs::write(&rclone_conf, "").unwrap();
        let rclone = RcloneConfig {
            config: rclone_conf.display().to_string(),
            binds: vec!["/data:remote:mybucket".to_string(), "bad-entry-no-colon".to_string()],
        };

        let (fs, mounts) = install_binds(SUPPORTED_OS, &rclone, &mut StubDriver::default());
        assert_eq!(fs.name(), "local");
        assert!(mounts.is_empty());
    }

    #[test]
    fn test_unsupported_platform_keeps_local_fs() {
        let rclone = RcloneConfig {
            config: "/etc/rclone.conf".to_string(),
            binds: vec!["/data:remote:mybucket".to_string()],
        };
        let mut driver = StubDriver::default();

        let (fs, mounts) = install_binds("macos", &rclone, &mut driver);
        assert_eq!(fs.name(), "local");
        assert!(mounts.is_empty());
        assert!(driver.config_path.is_none());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::FileReady.to_string(), "file_ready");
        assert_eq!(Stage::Ready.to_string(), "ready");
        assert_eq!(Stage::Aborted.to_string(), "aborted");
    }
}
