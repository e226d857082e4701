//! Filesystem and remote driver interfaces

use crate::bind::{BindPathFs, BindPointTable};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use types::FsError;

/// A filesystem the application reads and writes files through
pub trait Filesystem: Send + Sync + fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Check whether `path` exists
    fn exists(&self, path: &Path) -> bool;

    /// Read the whole file at `path`
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Create or replace the file at `path`
    fn write(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Names of the entries of the directory at `path`, sorted
    fn list(&self, path: &Path) -> Result<Vec<String>, FsError>;
}

/// Driver that builds filesystem handles for remote targets
pub trait RemoteDriver {
    /// Point the driver at its backend configuration file
    fn set_config_path(&mut self, path: &Path) -> Result<(), FsError>;

    /// Handle for a remote target such as `remote:bucket/dir`
    fn open(&self, target: &str) -> Arc<dyn Filesystem>;

    /// Composite filesystem routing each path through `table`
    fn compose(&self, table: BindPointTable) -> Arc<dyn Filesystem> {
        Arc::new(BindPathFs::new(table))
    }
}
