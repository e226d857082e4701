//! rclone backed remote filesystem
//!
//! Each operation shells out to the `rclone` binary with the configured
//! `--config` file.

use crate::traits::{Filesystem, RemoteDriver};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use tracing::debug;
use types::FsError;

/// Default rclone executable
pub const RCLONE_BINARY: &str = "rclone";

/// Driver producing [`RcloneFs`] handles
#[derive(Debug, Clone)]
pub struct RcloneDriver {
    binary: String,
    config_path: Option<PathBuf>,
}

impl RcloneDriver {
    pub fn new() -> Self {
        Self::with_binary(RCLONE_BINARY)
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            config_path: None,
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

impl Default for RcloneDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteDriver for RcloneDriver {
    fn set_config_path(&mut self, path: &Path) -> Result<(), FsError> {
        if !path.is_file() {
            return Err(FsError::NotFound {
                path: path.display().to_string(),
            });
        }
        self.config_path = Some(path.to_path_buf());
        Ok(())
    }

    fn open(&self, target: &str) -> Arc<dyn Filesystem> {
        Arc::new(RcloneFs {
            binary: self.binary.clone(),
            config_path: self.config_path.clone(),
            target: target.to_string(),
        })
    }
}

/// Handle for one rclone remote target
#[derive(Debug, Clone)]
pub struct RcloneFs {
    binary: String,
    config_path: Option<PathBuf>,
    target: String,
}

impl RcloneFs {
    /// Remote location of `path` below the target
    pub fn remote_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix("/").unwrap_or(path).to_string_lossy();
        if relative.is_empty() {
            self.target.clone()
        } else if self.target.ends_with(':') || self.target.ends_with('/') {
            format!("{}{}", self.target, relative)
        } else {
            format!("{}/{}", self.target, relative)
        }
    }

    fn command(&self, subcommand: &str, remote: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(config) = &self.config_path {
            cmd.arg("--config").arg(config);
        }
        cmd.arg(subcommand).arg(remote);
        cmd
    }

    fn run(&self, mut cmd: Command, remote: &str) -> Result<Output, FsError> {
        debug!(command = ?cmd, "Running rclone");
        let output = cmd.output().map_err(|e| self.remote_error(remote, e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(self.remote_error(remote, stderr));
        }
        Ok(output)
    }

    fn remote_error(&self, remote: &str, message: String) -> FsError {
        FsError::Remote {
            target: remote.to_string(),
            message,
        }
    }
}

impl Filesystem for RcloneFs {
    fn name(&self) -> &str {
        &self.target
    }

    fn exists(&self, path: &Path) -> bool {
        let remote = self.remote_path(path);
        self.run(self.command("lsf", &remote), &remote)
            .map(|out| !out.stdout.is_empty())
            .unwrap_or(false)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let remote = self.remote_path(path);
        Ok(self.run(self.command("cat", &remote), &remote)?.stdout)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let remote = self.remote_path(path);
        let mut cmd = self.command("rcat", &remote);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| self.remote_error(&remote, e.to_string()))?;
        // stdin is dropped before waiting so rclone sees EOF
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(data),
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| self.remote_error(&remote, e.to_string()));
        written.map_err(|e| self.remote_error(&remote, e.to_string()))?;
        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(self.remote_error(&remote, stderr));
        }
        Ok(())
    }

    fn list(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let remote = self.remote_path(path);
        let output = self.run(self.command("lsf", &remote), &remote)?;
        let mut names: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim_end_matches('/').to_string())
            .filter(|line| !line.is_empty())
            .collect();
        names.sort();
        Ok(names)
    }
}
