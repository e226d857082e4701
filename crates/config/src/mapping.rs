//! Section to record mapping
//!
//! Every record type describes its keys through a static [`Field`] table and
//! generated `assign`/`value` accessors, so a single generic routine can
//! populate and validate all of them.

use crate::document::ConfigDocument;
use crate::validation::Rule;
use tracing::debug;
use types::ConfigError;

/// Separator for list valued keys
pub const LIST_DELIMITER: char = ',';

/// Static description of one key of a section
#[derive(Debug, Clone, Copy)]
pub struct Field {
    /// Key as written in the file
    pub key: &'static str,
    /// Constraints checked after mapping, in order
    pub rules: &'static [Rule],
}

/// Borrowed view of a mapped field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Str(&'a str),
    Int(i64),
    UInt(u64),
    Bool(bool),
    List(&'a [String]),
}

impl FieldValue<'_> {
    /// Whether the value equals its type's zero value
    pub fn is_zero(&self) -> bool {
        match self {
            FieldValue::Str(s) => s.is_empty(),
            FieldValue::Int(i) => *i == 0,
            FieldValue::UInt(u) => *u == 0,
            FieldValue::Bool(b) => !b,
            FieldValue::List(items) => items.is_empty(),
        }
    }

    /// Magnitude used by range rules: the number itself, or a length
    pub fn magnitude(&self) -> Option<i128> {
        match self {
            FieldValue::Str(s) => Some(s.chars().count() as i128),
            FieldValue::Int(i) => Some(i128::from(*i)),
            FieldValue::UInt(u) => Some(i128::from(*u)),
            FieldValue::List(items) => Some(items.len() as i128),
            FieldValue::Bool(_) => None,
        }
    }

    /// Length of a string (in characters) or list
    pub fn len(&self) -> Option<usize> {
        match self {
            FieldValue::Str(s) => Some(s.chars().count()),
            FieldValue::List(items) => Some(items.len()),
            _ => None,
        }
    }
}

/// A Rust type a raw string can be coerced into
pub trait FieldType: Sized {
    /// Type name used in coercion errors
    const EXPECTED: &'static str;

    fn coerce(raw: &str) -> Option<Self>;

    fn view(&self) -> FieldValue<'_>;
}

impl FieldType for String {
    const EXPECTED: &'static str = "string";

    fn coerce(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }

    fn view(&self) -> FieldValue<'_> {
        FieldValue::Str(self)
    }
}

impl FieldType for i64 {
    const EXPECTED: &'static str = "integer";

    fn coerce(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    fn view(&self) -> FieldValue<'_> {
        FieldValue::Int(*self)
    }
}

impl FieldType for u64 {
    const EXPECTED: &'static str = "unsigned integer";

    fn coerce(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    fn view(&self) -> FieldValue<'_> {
        FieldValue::UInt(*self)
    }
}

impl FieldType for bool {
    const EXPECTED: &'static str = "boolean";

    fn coerce(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "t" | "true" | "y" | "yes" | "on" => Some(true),
            "0" | "f" | "false" | "n" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    fn view(&self) -> FieldValue<'_> {
        FieldValue::Bool(*self)
    }
}

impl FieldType for Vec<String> {
    const EXPECTED: &'static str = "list";

    fn coerce(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return Some(Vec::new());
        }
        Some(
            raw.split(LIST_DELIMITER)
                .map(|item| item.trim().to_string())
                .collect(),
        )
    }

    fn view(&self) -> FieldValue<'_> {
        FieldValue::List(self)
    }
}

/// A typed record populated from one named section
pub trait Section: Default {
    /// Section header name
    const NAME: &'static str;

    /// Known keys with their constraints
    const FIELDS: &'static [Field];

    /// Coerce `raw` into the field for `key`. Returns `Ok(false)` for unknown keys.
    fn assign(&mut self, key: &str, raw: &str) -> Result<bool, ConfigError>;

    /// Current value of the field for `key`
    fn value(&self, key: &str) -> Option<FieldValue<'_>>;
}

/// Coerce a raw value for `section.key`
pub fn coerce<T: FieldType>(section: &str, key: &str, raw: &str) -> Result<T, ConfigError> {
    T::coerce(raw).ok_or_else(|| ConfigError::InvalidValue {
        field: format!("{}.{}", section, key),
        value: raw.to_string(),
        expected: T::EXPECTED,
    })
}

/// Build a record from its section, starting from the record defaults
pub fn map_section<S: Section>(doc: &ConfigDocument) -> Result<S, ConfigError> {
    let mut record = S::default();

    let Some(section) = doc.section(S::NAME) else {
        debug!(section = S::NAME, "Section absent, using defaults");
        return Ok(record);
    };

    for (key, raw) in section.iter() {
        if !record.assign(key, raw)? {
            debug!(section = S::NAME, key, "Ignoring unknown key");
        }
    }

    Ok(record)
}
