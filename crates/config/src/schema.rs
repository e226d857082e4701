//! Configuration schema definitions

use crate::document::ConfigDocument;
use crate::mapping::{coerce, map_section, Field, FieldType, FieldValue, Section};
use crate::validation::{validate_section, Rule};
use serde::Serialize;
use types::utils::sanitize_for_logging;
use types::ConfigError;

/// Sentinel meaning "not configured"
pub const UNSET: &str = "UNSET";

/// Declare a record bound to an INI section.
///
/// Each field lists its type, default, key in the file and optional rules.
macro_rules! config_section {
    (
        $(#[$meta:meta])*
        pub struct $name:ident in $section:literal {
            $(
                $(#[$fmeta:meta])*
                $field:ident: $ty:ty = $default:expr => $key:literal $([$($rule:expr),* $(,)?])?;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[serde(rename = $key)]
                pub $field: $ty,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $( $field: $default, )*
                }
            }
        }

        impl Section for $name {
            const NAME: &'static str = $section;

            const FIELDS: &'static [Field] = &[
                $( Field { key: $key, rules: &[$($($rule),*)?] }, )*
            ];

            fn assign(&mut self, key: &str, raw: &str) -> Result<bool, ConfigError> {
                match key {
                    $( $key => self.$field = coerce($section, $key, raw)?, )*
                    _ => return Ok(false),
                }
                Ok(true)
            }

            fn value(&self, key: &str) -> Option<FieldValue<'_>> {
                match key {
                    $( $key => Some(FieldType::view(&self.$field)), )*
                    _ => None,
                }
            }
        }
    };
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

config_section! {
    /// Database connection settings
    pub struct DatabaseConfig in "Database" {
        /// Backend type; `UNSET` selects the embedded SQLite file
        db_type: String = UNSET.to_string() => "Type";
        user: String = String::new() => "User";
        password: String = String::new() => "Password";
        host: String = String::new() => "Host";
        name: String = String::new() => "Name";
        table_prefix: String = String::new() => "TablePrefix";
        db_file: String = "stashd.db".to_string() => "DBFile";
        port: i64 = 3306 => "Port";
        charset: String = "utf8".to_string() => "Charset";
    }
}

config_section! {
    /// General process settings
    pub struct SystemConfig in "System" {
        /// `master` or `slave`
        mode: String = "master".to_string() => "Mode" [Rule::OneOf(&["master", "slave"])];
        /// HTTP listen address
        listen: String = ":5212".to_string() => "Listen" [Rule::Required];
        /// Keeps verbose logging after startup
        debug: bool = false => "Debug";
        session_secret: String = String::new() => "SessionSecret";
        hash_id_salt: String = String::new() => "HashIDSalt";
    }
}

config_section! {
    /// TLS listener settings
    pub struct SslConfig in "SSL" {
        cert_path: String = String::new() => "CertPath" [Rule::RequiredWith("KeyPath")];
        key_path: String = String::new() => "KeyPath" [Rule::RequiredWith("CertPath")];
        listen: String = ":443".to_string() => "Listen" [Rule::Required];
    }
}

config_section! {
    /// Unix domain socket listener
    pub struct UnixSocketConfig in "UnixSocket" {
        listen: String = String::new() => "Listen";
    }
}

config_section! {
    /// Captcha rendering options
    pub struct CaptchaConfig in "Captcha" {
        height: i64 = 60 => "Height" [Rule::Min(0)];
        width: i64 = 240 => "Width" [Rule::Min(0)];
        mode: i64 = 3 => "Mode" [Rule::Min(0), Rule::Max(3)];
        complex_of_noise_text: i64 = 0 => "ComplexOfNoiseText" [Rule::Min(0), Rule::Max(2)];
        complex_of_noise_dot: i64 = 0 => "ComplexOfNoiseDot" [Rule::Min(0), Rule::Max(2)];
        is_show_hollow_line: bool = false => "IsShowHollowLine";
        is_show_noise_dot: bool = false => "IsShowNoiseDot";
        is_show_noise_text: bool = false => "IsShowNoiseText";
        is_show_slime_line: bool = false => "IsShowSlimeLine";
        is_show_sine_line: bool = false => "IsShowSineLine";
        captcha_len: i64 = 6 => "CaptchaLen" [Rule::GreaterThan(0)];
    }
}

config_section! {
    /// Redis cache connection
    pub struct RedisConfig in "Redis" {
        network: String = "tcp".to_string() => "Network";
        server: String = String::new() => "Server";
        password: String = String::new() => "Password";
        db: String = "0".to_string() => "DB";
    }
}

config_section! {
    /// Thumbnail generation limits
    pub struct ThumbnailConfig in "Thumbnail" {
        max_width: u64 = 400 => "MaxWidth";
        max_height: u64 = 300 => "MaxHeight";
        file_suffix: String = "._thumb".to_string() => "FileSuffix" [Rule::MinLen(1)];
    }
}

config_section! {
    /// Cross-origin resource sharing policy
    pub struct CorsConfig in "CORS" {
        allow_origins: Vec<String> = strings(&[UNSET]) => "AllowOrigins";
        allow_methods: Vec<String> = strings(&["PUT", "POST", "GET", "OPTIONS"]) => "AllowMethods";
        allow_headers: Vec<String> = strings(&[
            "Cookie",
            "X-Policy",
            "Authorization",
            "Content-Length",
            "Content-Type",
            "X-Path",
            "X-FileName",
        ]) => "AllowHeaders";
        allow_credentials: bool = false => "AllowCredentials";
        expose_headers: Vec<String> = Vec::new() => "ExposeHeaders";
    }
}

config_section! {
    /// Remote filesystem binds backed by rclone
    pub struct RcloneConfig in "RClone" {
        /// Path of the rclone configuration file
        config: String = String::new() => "Config";
        /// `local:remote` pairs; a leading `UNSET` disables binding
        binds: Vec<String> = strings(&[UNSET]) => "Binds";
    }
}

config_section! {
    /// Settings used when this node serves as a slave storage node
    pub struct SlaveConfig in "Slave" {
        secret: String = String::new() => "Secret" [Rule::OmitEmpty, Rule::MinLen(64)];
        callback_timeout: i64 = 20 => "CallbackTimeout" [Rule::OmitEmpty, Rule::Min(1)];
        signature_ttl: i64 = 60 => "SignatureTTL" [Rule::OmitEmpty, Rule::Min(1)];
    }
}

/// Role of this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMode {
    Master,
    Slave,
}

impl SystemConfig {
    /// Parsed mode, `None` if the value was never validated
    pub fn role(&self) -> Option<SystemMode> {
        match self.mode.as_str() {
            "master" => Some(SystemMode::Master),
            "slave" => Some(SystemMode::Slave),
            _ => None,
        }
    }
}

impl RcloneConfig {
    /// Whether any bind is configured
    pub fn binds_enabled(&self) -> bool {
        self.binds.first().is_some_and(|first| first != UNSET)
    }
}

/// Known sections and their keys, used to resolve environment overrides
pub const SECTIONS: &[(&str, &[Field])] = &[
    (DatabaseConfig::NAME, DatabaseConfig::FIELDS),
    (SystemConfig::NAME, SystemConfig::FIELDS),
    (SslConfig::NAME, SslConfig::FIELDS),
    (UnixSocketConfig::NAME, UnixSocketConfig::FIELDS),
    (CaptchaConfig::NAME, CaptchaConfig::FIELDS),
    (RedisConfig::NAME, RedisConfig::FIELDS),
    (ThumbnailConfig::NAME, ThumbnailConfig::FIELDS),
    (CorsConfig::NAME, CorsConfig::FIELDS),
    (RcloneConfig::NAME, RcloneConfig::FIELDS),
    (SlaveConfig::NAME, SlaveConfig::FIELDS),
];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Config {
    #[serde(rename = "Database")]
    pub database: DatabaseConfig,
    #[serde(rename = "System")]
    pub system: SystemConfig,
    #[serde(rename = "SSL")]
    pub ssl: SslConfig,
    #[serde(rename = "UnixSocket")]
    pub unix_socket: UnixSocketConfig,
    #[serde(rename = "Captcha")]
    pub captcha: CaptchaConfig,
    #[serde(rename = "Redis")]
    pub redis: RedisConfig,
    #[serde(rename = "Thumbnail")]
    pub thumbnail: ThumbnailConfig,
    #[serde(rename = "CORS")]
    pub cors: CorsConfig,
    #[serde(rename = "RClone")]
    pub rclone: RcloneConfig,
    #[serde(rename = "Slave")]
    pub slave: SlaveConfig,
}

impl Config {
    /// Map and validate every section of `doc`
    pub fn from_document(doc: &ConfigDocument) -> Result<Self, ConfigError> {
        let config = Self::map_document(doc)?;
        config.validate()?;
        Ok(config)
    }

    /// Map every section of `doc` without checking constraints
    pub fn map_document(doc: &ConfigDocument) -> Result<Self, ConfigError> {
        Ok(Self {
            database: map_section(doc)?,
            system: map_section(doc)?,
            ssl: map_section(doc)?,
            unix_socket: map_section(doc)?,
            captcha: map_section(doc)?,
            redis: map_section(doc)?,
            thumbnail: map_section(doc)?,
            cors: map_section(doc)?,
            rclone: map_section(doc)?,
            slave: map_section(doc)?,
        })
    }

    /// Check every record, stopping at the first violated constraint
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_section(&self.database)?;
        validate_section(&self.system)?;
        validate_section(&self.ssl)?;
        validate_section(&self.unix_socket)?;
        validate_section(&self.captcha)?;
        validate_section(&self.redis)?;
        validate_section(&self.thumbnail)?;
        validate_section(&self.cors)?;
        validate_section(&self.rclone)?;
        validate_section(&self.slave)
    }

    /// Copy with every secret value masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for secret in [
            &mut config.database.password,
            &mut config.system.session_secret,
            &mut config.system.hash_id_salt,
            &mut config.redis.password,
            &mut config.slave.secret,
        ] {
            *secret = sanitize_for_logging(secret);
        }
        config
    }
}
