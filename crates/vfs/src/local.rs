//! Local disk filesystem

use crate::traits::Filesystem;
use std::io;
use std::path::{Path, PathBuf};
use types::FsError;

/// Filesystem over the local disk, optionally confined to a directory
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: Option<PathBuf>,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// The real filesystem: paths go to the OS unchanged, relative ones
    /// against the working directory
    pub fn root() -> Self {
        Self { root: None }
    }

    /// Under a root, absolute and relative paths are both taken relative to it
    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.strip_prefix("/").unwrap_or(path)),
            None => path.to_path_buf(),
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> FsError {
    if source.kind() == io::ErrorKind::NotFound {
        FsError::NotFound {
            path: path.display().to_string(),
        }
    } else {
        FsError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl Filesystem for LocalFs {
    fn name(&self) -> &str {
        "local"
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let full = self.resolve(path);
        std::fs::read(&full).map_err(|e| io_error(&full, e))
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let full = self.resolve(path);
        std::fs::write(&full, data).map_err(|e| io_error(&full, e))
    }

    fn list(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let full = self.resolve(path);
        let mut names = std::fs::read_dir(&full)
            .map_err(|e| io_error(&full, e))?
            .map(|entry| {
                entry
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .map_err(|e| io_error(&full, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_fs_round_trip_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path());

        fs.write(Path::new("/b.txt"), b"two").unwrap();
        fs.write(Path::new("a.txt"), b"one").unwrap();

        assert!(fs.exists(Path::new("/a.txt")));
        assert_eq!(fs.read(Path::new("b.txt")).unwrap(), b"two");
        assert_eq!(fs.list(Path::new("/")).unwrap(), vec!["a.txt", "b.txt"]);
        assert!(dir.path().join("a.txt").is_file());
    }

    #[test]
    fn test_os_fs_resolves_relative_to_working_directory() {
        let fs = LocalFs::root();
        assert!(fs.exists(Path::new("Cargo.toml")));
        assert_eq!(
            fs.read(Path::new("Cargo.toml")).unwrap(),
            std::fs::read("Cargo.toml").unwrap()
        );

        let cwd = std::env::current_dir().unwrap();
        assert!(fs.exists(&cwd.join("Cargo.toml")));
    }

    #[test]
    fn test_local_fs_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        assert!(!fs.exists(Path::new("/nope")));
        assert!(matches!(
            fs.read(Path::new("/nope")),
            Err(FsError::NotFound { .. })
        ));
    }
}
