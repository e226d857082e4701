//! Bind points: mounting remote targets onto local paths
//!
//! A bind entry has the form `localPath:remoteTarget` and is split on the
//! first colon only, so the target may contain further colons. The table is
//! built completely before it is handed out: one malformed entry cancels every
//! bind, while an entry whose local path cannot be made absolute is skipped.

use crate::local::LocalFs;
use crate::traits::{Filesystem, RemoteDriver};
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use types::FsError;

/// Sole bind entry that disables binding
pub const BIND_DISABLED: &str = "UNSET";

/// Platform remote binding is supported on
pub const SUPPORTED_OS: &str = "linux";

/// Absolute local path to filesystem handle
#[derive(Debug, Clone, Default)]
pub struct BindPointTable {
    points: BTreeMap<PathBuf, Arc<dyn Filesystem>>,
}

impl BindPointTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mount: PathBuf, fs: Arc<dyn Filesystem>) {
        self.points.insert(mount, fs);
    }

    pub fn get(&self, mount: &Path) -> Option<&Arc<dyn Filesystem>> {
        self.points.get(mount)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Arc<dyn Filesystem>)> {
        self.points.iter().map(|(mount, fs)| (mount.as_path(), fs))
    }

    pub fn mount_points(&self) -> Vec<PathBuf> {
        self.points.keys().cloned().collect()
    }
}

/// Filesystem that routes each path to its deepest bind point
#[derive(Debug, Clone)]
pub struct BindPathFs {
    table: BindPointTable,
}

impl BindPathFs {
    pub fn new(table: BindPointTable) -> Self {
        Self { table }
    }

    /// Handle for `path` and the path below its mount point, rooted at `/`.
    ///
    /// Relative paths are resolved against the working directory first.
    fn route(&self, path: &Path) -> Result<(&Arc<dyn Filesystem>, PathBuf), FsError> {
        let no_bind_point = || FsError::NoBindPoint {
            path: path.display().to_string(),
        };
        let absolute = absolute_path(path).map_err(|_| no_bind_point())?;

        self.table
            .iter()
            .filter_map(|(mount, fs)| {
                absolute
                    .strip_prefix(mount)
                    .ok()
                    .map(|relative| (mount.components().count(), fs, Path::new("/").join(relative)))
            })
            .max_by_key(|(depth, _, _)| *depth)
            .map(|(_, fs, relative)| (fs, relative))
            .ok_or_else(no_bind_point)
    }
}

impl Filesystem for BindPathFs {
    fn name(&self) -> &str {
        "bind"
    }

    fn exists(&self, path: &Path) -> bool {
        self.route(path)
            .map(|(fs, relative)| fs.exists(&relative))
            .unwrap_or(false)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let (fs, relative) = self.route(path)?;
        fs.read(&relative)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let (fs, relative) = self.route(path)?;
        fs.write(&relative, data)
    }

    fn list(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let (fs, relative) = self.route(path)?;
        fs.list(&relative)
    }
}

/// The plain local filesystem used when no binds are installed
pub fn default_filesystem() -> Arc<dyn Filesystem> {
    Arc::new(LocalFs::root())
}

/// Absolute form of `path` with `.` and `..` resolved lexically
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut cleaned = PathBuf::new();

    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            // `..` at the root stays at the root
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }

    Ok(cleaned)
}

/// Split a bind entry into `(local, remote)` at the first colon
pub fn parse_bind_entry(entry: &str) -> Result<(&str, &str), FsError> {
    entry
        .split_once(':')
        .ok_or_else(|| FsError::InvalidBindEntry {
            entry: entry.to_string(),
        })
}

/// Build the table for `entries`, always mounting the local filesystem at `/`
pub fn build_bind_table(
    entries: &[String],
    driver: &dyn RemoteDriver,
) -> Result<BindPointTable, FsError> {
    let mut table = BindPointTable::new();
    table.insert(PathBuf::from("/"), Arc::new(LocalFs::root()));

    for entry in entries {
        let (local, remote) = parse_bind_entry(entry)?;
        info!(local, remote, "Binding remote target");

        match absolute_path(Path::new(local)) {
            Ok(mount) => table.insert(mount, driver.open(remote)),
            Err(err) => warn!(local, error = %err, "Cannot resolve bind path, skipping"),
        }
    }

    Ok(table)
}

/// Result of the remote bind step
#[derive(Debug)]
pub enum BindOutcome {
    /// No binds configured
    Disabled,
    /// Remote binding is not supported on this platform
    UnsupportedPlatform { os: String },
    /// The remote backend configuration file does not exist
    MissingRemoteConfig { path: PathBuf },
    /// The step was cancelled and nothing was installed
    Aborted { error: FsError },
    /// A composite filesystem was built
    Installed {
        fs: Arc<dyn Filesystem>,
        mounts: Vec<PathBuf>,
    },
}

/// Run the remote bind step for `os`.
///
/// Only [`BindOutcome::Installed`] carries a filesystem; every other outcome
/// leaves the default filesystem in effect.
pub fn configure_binds(
    os: &str,
    config_path: &Path,
    entries: &[String],
    driver: &mut dyn RemoteDriver,
) -> BindOutcome {
    if os != SUPPORTED_OS {
        return BindOutcome::UnsupportedPlatform { os: os.to_string() };
    }

    if entries.first().map_or(true, |first| first == BIND_DISABLED) {
        return BindOutcome::Disabled;
    }

    if !config_path.exists() {
        return BindOutcome::MissingRemoteConfig {
            path: config_path.to_path_buf(),
        };
    }

    if let Err(error) = driver.set_config_path(config_path) {
        return BindOutcome::Aborted { error };
    }

    match build_bind_table(entries, driver) {
        Ok(table) => BindOutcome::Installed {
            mounts: table.mount_points(),
            fs: driver.compose(table),
        },
        Err(error) => BindOutcome::Aborted { error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TargetFs {
        target: String,
    }

    impl Filesystem for TargetFs {
        fn name(&self) -> &str {
            &self.target
        }

        fn exists(&self, _path: &Path) -> bool {
            false
        }

        fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
            Ok(format!("{}|{}", self.target, path.display()).into_bytes())
        }

        fn write(&self, _path: &Path, _data: &[u8]) -> Result<(), FsError> {
            Ok(())
        }

        fn list(&self, _path: &Path) -> Result<Vec<String>, FsError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct MockDriver {
        config_path: Option<PathBuf>,
    }

    impl RemoteDriver for MockDriver {
        fn set_config_path(&mut self, path: &Path) -> Result<(), FsError> {
            self.config_path = Some(path.to_path_buf());
            Ok(())
        }

        fn open(&self, target: &str) -> Arc<dyn Filesystem> {
            Arc::new(TargetFs {
                target: target.to_string(),
            })
        }
    }

    fn entries(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_bind_entry_splits_on_first_colon() {
        assert_eq!(parse_bind_entry("/data:remote:mybucket").unwrap(), ("/data", "remote:mybucket"));
        assert!(matches!(
            parse_bind_entry("bad-entry-no-colon"),
            Err(FsError::InvalidBindEntry { .. })
        ));
    }

    #[test]
    fn test_build_table_single_bind() {
        let driver = MockDriver::default();
        let table = build_bind_table(&entries(&["/data:remote:mybucket"]), &driver).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(Path::new("/")).unwrap().name(), "local");
        assert_eq!(table.get(Path::new("/data")).unwrap().name(), "remote:mybucket");
    }

    #[test]
    fn test_build_table_relative_path_made_absolute() {
        let driver = MockDriver::default();
        let table = build_bind_table(&entries(&["mnt:remote:"]), &driver).unwrap();
        let expected = std::env::current_dir().unwrap().join("mnt");
        assert_eq!(table.get(&expected).unwrap().name(), "remote:");
    }

    #[test]
    fn test_build_table_skips_unresolvable_path() {
        let driver = MockDriver::default();
        let table = build_bind_table(&entries(&[":remote:a", "/b:remote:b"]), &driver).unwrap();
        assert_eq!(table.mount_points(), vec![PathBuf::from("/"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_malformed_entry_aborts_everything() {
        let config = tempfile::NamedTempFile::new().unwrap();
        let mut driver = MockDriver::default();
        let outcome = configure_binds(
            SUPPORTED_OS,
            config.path(),
            &entries(&["/data:remote:mybucket", "bad-entry-no-colon"]),
            &mut driver,
        );
        assert!(matches!(
            outcome,
            BindOutcome::Aborted {
                error: FsError::InvalidBindEntry { .. }
            }
        ));
    }

    #[test]
    fn test_unset_disables_binds() {
        let config = tempfile::NamedTempFile::new().unwrap();
        let mut driver = MockDriver::default();

        let outcome = configure_binds(SUPPORTED_OS, config.path(), &entries(&[BIND_DISABLED]), &mut driver);
        assert!(matches!(outcome, BindOutcome::Disabled));

        let outcome = configure_binds(SUPPORTED_OS, config.path(), &[], &mut driver);
        assert!(matches!(outcome, BindOutcome::Disabled));
        assert!(driver.config_path.is_none());
    }

    #[test]
    fn test_other_platforms_are_skipped() {
        let mut driver = MockDriver::default();
        let outcome = configure_binds("windows", Path::new("/x"), &entries(&["/a:b:c"]), &mut driver);
        assert!(matches!(outcome, BindOutcome::UnsupportedPlatform { ref os } if os == "windows"));
    }

    #[test]
    fn test_missing_remote_config() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("rclone.conf");
        let mut driver = MockDriver::default();
        let outcome = configure_binds(SUPPORTED_OS, &missing, &entries(&["/a:b:c"]), &mut driver);
        assert!(matches!(outcome, BindOutcome::MissingRemoteConfig { .. }));
    }

    #[test]
    fn test_installed_binds_route_reads() {
        let config = tempfile::NamedTempFile::new().unwrap();
        let mut driver = MockDriver::default();

        let outcome = configure_binds(
            SUPPORTED_OS,
            config.path(),
            &entries(&["/data:remote:mybucket"]),
            &mut driver,
        );
        let BindOutcome::Installed { fs, mounts } = outcome else {
            panic!("binds were not installed");
        };

        assert_eq!(driver.config_path.as_deref(), Some(config.path()));
        assert_eq!(mounts, vec![PathBuf::from("/"), PathBuf::from("/data")]);
        assert_eq!(fs.name(), "bind");
        assert_eq!(
            fs.read(Path::new("/data/photos/a.jpg")).unwrap(),
            b"remote:mybucket|/photos/a.jpg"
        );
    }

    #[test]
    fn test_bind_fs_prefers_deepest_mount() {
        let outer = tempfile::tempdir().unwrap();
        let inner = tempfile::tempdir().unwrap();

        let mut table = BindPointTable::new();
        table.insert(PathBuf::from("/"), Arc::new(LocalFs::new(outer.path())));
        table.insert(PathBuf::from("/srv/data"), Arc::new(LocalFs::new(inner.path())));
        let fs = BindPathFs::new(table);

        fs.write(Path::new("/srv/data/x.txt"), b"inner").unwrap();
        fs.write(Path::new("/y.txt"), b"outer").unwrap();
        std::fs::create_dir(outer.path().join("srv")).unwrap();
        fs.write(Path::new("/srv/dataset.txt"), b"outer").unwrap();

        assert!(inner.path().join("x.txt").is_file());
        assert!(outer.path().join("y.txt").is_file());
        assert!(outer.path().join("srv/dataset.txt").is_file());
        assert_eq!(fs.read(Path::new("/srv/data/x.txt")).unwrap(), b"inner");
        assert!(fs.exists(Path::new("/y.txt")));
    }

    #[test]
    fn test_bind_fs_without_mounts() {
        let fs = BindPathFs::new(BindPointTable::new());
        assert!(matches!(
            fs.read(Path::new("relative.txt")),
            Err(FsError::NoBindPoint { .. })
        ));
    }

    #[test]
    fn test_relative_paths_match_default_filesystem() {
        let cwd = std::env::current_dir().unwrap();
        let mut table = BindPointTable::new();
        table.insert(PathBuf::from("/"), Arc::new(LocalFs::root()));
        table.insert(
            cwd.join("mnt"),
            Arc::new(TargetFs {
                target: "remote:bucket".to_string(),
            }),
        );
        let bound = BindPathFs::new(table);
        let plain = default_filesystem();

        assert!(plain.exists(Path::new("Cargo.toml")));
        assert!(bound.exists(Path::new("Cargo.toml")));
        assert_eq!(
            bound.read(Path::new("Cargo.toml")).unwrap(),
            plain.read(Path::new("Cargo.toml")).unwrap()
        );
        assert_eq!(
            bound.read(Path::new("mnt/a.txt")).unwrap(),
            b"remote:bucket|/a.txt"
        );
    }

    #[test]
    fn test_absolute_path_resolves_dot_components() {
        assert_eq!(absolute_path(Path::new("/srv/../data")).unwrap(), PathBuf::from("/data"));
        assert_eq!(absolute_path(Path::new("/srv/./x/../data/")).unwrap(), PathBuf::from("/srv/data"));
        assert_eq!(absolute_path(Path::new("/../..")).unwrap(), PathBuf::from("/"));
        assert_eq!(
            absolute_path(Path::new("a/../b")).unwrap(),
            std::env::current_dir().unwrap().join("b")
        );
    }

    #[test]
    fn test_parent_components_in_bind_entry_are_cleaned() {
        let driver = MockDriver::default();
        let table = build_bind_table(&entries(&["/srv/../data:remote:mybucket"]), &driver).unwrap();
        assert_eq!(table.mount_points(), vec![PathBuf::from("/"), PathBuf::from("/data")]);

        let fs = BindPathFs::new(table);
        assert_eq!(fs.read(Path::new("/data/a.txt")).unwrap(), b"remote:mybucket|/a.txt");
        assert_eq!(fs.read(Path::new("/srv/../data/a.txt")).unwrap(), b"remote:mybucket|/a.txt");
    }
}
