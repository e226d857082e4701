//! Configuration loader implementation

use crate::defaults::default_content;
use crate::document::ConfigDocument;
use crate::schema::{Config, SECTIONS};
use figment::providers::Env;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};
use types::ConfigError;

/// Path used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "conf.ini";

/// Prefix of environment overrides, e.g. `STASHD_SYSTEM__LISTEN`
pub const ENV_PREFIX: &str = "STASHD_";

/// Separator between section and key in an override name
pub const ENV_SEPARATOR: &str = "__";

/// Configuration loader that handles the INI file and environment overrides
pub struct ConfigLoader;

impl ConfigLoader {
    /// Materialize, parse, override, map and validate the file at `config_path`
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Config, ConfigError> {
        let config_path = config_path.as_ref();

        Self::materialize(config_path)?;
        let doc = Self::read_document(config_path)?;
        Config::from_document(&doc)
    }

    /// Load configuration from string (for testing)
    pub fn load_from_str(content: &str) -> Result<Config, ConfigError> {
        let doc = ConfigDocument::parse(content)?;
        Config::from_document(&doc)
    }

    /// Parse the file and apply environment overrides on top
    pub fn read_document<P: AsRef<Path>>(config_path: P) -> Result<ConfigDocument, ConfigError> {
        let mut doc = ConfigDocument::from_file(config_path)?;
        let applied = Self::apply_overrides(&mut doc, Self::env_overrides());
        if applied > 0 {
            info!(count = applied, "Applied environment overrides");
        }
        Ok(doc)
    }

    /// Ensure a configuration file exists, writing the starter content if absent.
    ///
    /// Returns `true` when a new file was created. An existing file is never touched.
    pub fn materialize<P: AsRef<Path>>(config_path: P) -> Result<bool, ConfigError> {
        let config_path = config_path.as_ref();

        if config_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath);
        }

        if config_path.exists() {
            debug!(path = %config_path.display(), "Configuration file present");
            return Ok(false);
        }

        let mut file = Self::create_nested_file(config_path)?;
        file.write_all(default_content().as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|source| ConfigError::Write {
                path: config_path.display().to_string(),
                source,
            })?;

        info!(path = %config_path.display(), "Created default configuration file");
        Ok(true)
    }

    fn create_nested_file(path: &Path) -> Result<File, ConfigError> {
        let create_error = |source| ConfigError::Create {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(create_error)?;
        }

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(create_error)
    }

    /// `STASHD_*` variables from the process environment
    pub fn env_overrides() -> Vec<(String, String)> {
        Env::prefixed(ENV_PREFIX)
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), value))
            .collect()
    }

    /// Apply `SECTION__KEY = value` overrides for known keys, case-insensitively.
    ///
    /// Returns the number of overrides applied.
    pub fn apply_overrides<I, K, V>(doc: &mut ConfigDocument, overrides: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut applied = 0;

        for (name, value) in overrides {
            let name = name.as_ref();
            let Some((section, key)) = name.split_once(ENV_SEPARATOR) else {
                debug!(name, "Ignoring override without section separator");
                continue;
            };

            let target = SECTIONS
                .iter()
                .find(|(section_name, _)| section_name.eq_ignore_ascii_case(section))
                .and_then(|(section_name, fields)| {
                    fields
                        .iter()
                        .find(|field| field.key.eq_ignore_ascii_case(key))
                        .map(|field| (*section_name, field.key))
                });

            match target {
                Some((section_name, field_key)) => {
                    debug!(section = section_name, key = field_key, "Overriding from environment");
                    doc.set(section_name, field_key, value);
                    applied += 1;
                }
                None => debug!(name, "Ignoring override for unknown key"),
            }
        }

        applied
    }
}
