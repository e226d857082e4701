//! Configuration validation utilities

use crate::mapping::{FieldValue, Section};
use crate::schema::{Config, SslConfig, SystemMode, UNSET};
use std::fmt;
use types::ConfigError;

/// A constraint attached to a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Value must not be the zero value
    Required,
    /// A zero value skips the remaining rules of the field
    OmitEmpty,
    /// Inclusive lower bound (length for strings and lists)
    Min(i64),
    /// Inclusive upper bound (length for strings and lists)
    Max(i64),
    /// Exclusive lower bound (length for strings and lists)
    GreaterThan(i64),
    /// String must equal one of the listed values
    OneOf(&'static [&'static str]),
    /// Minimum number of characters or list items
    MinLen(usize),
    /// Required whenever the named sibling key is set
    RequiredWith(&'static str),
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => write!(f, "is required"),
            Rule::OmitEmpty => write!(f, "may be empty"),
            Rule::Min(n) => write!(f, "must be >= {}", n),
            Rule::Max(n) => write!(f, "must be <= {}", n),
            Rule::GreaterThan(n) => write!(f, "must be > {}", n),
            Rule::OneOf(options) => write!(f, "must be one of {}", options.join("|")),
            Rule::MinLen(n) => write!(f, "must have length >= {}", n),
            Rule::RequiredWith(sibling) => write!(f, "is required when {} is set", sibling),
        }
    }
}

impl Rule {
    fn check<S: Section>(&self, value: FieldValue<'_>, record: &S) -> bool {
        match *self {
            Rule::Required => !value.is_zero(),
            Rule::OmitEmpty => true,
            Rule::Min(n) => value.magnitude().map_or(true, |m| m >= i128::from(n)),
            Rule::Max(n) => value.magnitude().map_or(true, |m| m <= i128::from(n)),
            Rule::GreaterThan(n) => value.magnitude().map_or(true, |m| m > i128::from(n)),
            Rule::OneOf(options) => match value {
                FieldValue::Str(s) => options.contains(&s),
                _ => true,
            },
            Rule::MinLen(n) => value.len().map_or(true, |len| len >= n),
            Rule::RequiredWith(sibling) => {
                let sibling_set = record.value(sibling).is_some_and(|v| !v.is_zero());
                !sibling_set || !value.is_zero()
            }
        }
    }
}

/// Every constraint failure of one record, in field order
fn section_failures<S: Section>(record: &S) -> Vec<ValidationIssue> {
    let mut failures = Vec::new();

    for field in S::FIELDS {
        let Some(value) = record.value(field.key) else {
            continue;
        };

        for rule in field.rules {
            if *rule == Rule::OmitEmpty && value.is_zero() {
                break;
            }
            if !rule.check(value, record) {
                failures.push(ValidationIssue {
                    field: format!("{}.{}", S::NAME, field.key),
                    message: rule.to_string(),
                });
                break;
            }
        }
    }

    failures
}

/// Check a record, returning the first failing constraint
pub fn validate_section<S: Section>(record: &S) -> Result<(), ConfigError> {
    match section_failures(record).into_iter().next() {
        Some(issue) => Err(ConfigError::ValidationError {
            field: issue.field,
            message: issue.message,
        }),
        None => Ok(()),
    }
}

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate complete configuration, collecting every issue
    pub fn report(config: &Config) -> ValidationReport {
        let mut report = ValidationReport::new();

        report.errors.extend(section_failures(&config.database));
        report.errors.extend(section_failures(&config.system));
        report.errors.extend(section_failures(&config.ssl));
        report.errors.extend(section_failures(&config.unix_socket));
        report.errors.extend(section_failures(&config.captcha));
        report.errors.extend(section_failures(&config.redis));
        report.errors.extend(section_failures(&config.thumbnail));
        report.errors.extend(section_failures(&config.cors));
        report.errors.extend(section_failures(&config.rclone));
        report.errors.extend(section_failures(&config.slave));

        Self::advise(config, &mut report);

        report
    }

    fn advise(config: &Config, report: &mut ValidationReport) {
        if config.system.debug {
            report.add_warning("System.Debug", "Debug mode is enabled, verbose logging stays on");
        }

        if config.system.session_secret.is_empty() {
            report.add_warning("System.SessionSecret", "Session secret is empty, sessions cannot be signed safely");
        }

        if config.system.role() == Some(SystemMode::Slave) && config.slave.secret.is_empty() {
            report.add_warning("Slave.Secret", "Running in slave mode without a slave secret");
        }

        if config.database.db_type == UNSET {
            report.add_warning(
                "Database.Type",
                &format!("No database type configured, using SQLite file {}", config.database.db_file),
            );
        }

        if config.ssl.cert_path.is_empty() && config.ssl.listen != SslConfig::default().listen {
            report.add_warning("SSL.Listen", "SSL listen address set without a certificate, HTTPS stays off");
        }

        if config.cors.allow_origins.first().map_or(true, |origin| origin == UNSET) {
            report.add_warning("CORS.AllowOrigins", "No CORS origins configured, cross-origin requests are rejected");
        }

        if config.rclone.binds_enabled() && config.rclone.config.is_empty() {
            report.add_warning("RClone.Config", "Binds are configured but no rclone config file is set");
        }
    }
}

/// Validation report containing errors and warnings
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// A validation issue (error or warning)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn summary(&self) -> String {
        format!("Validation: {} errors, {} warnings", self.errors.len(), self.warnings.len())
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
