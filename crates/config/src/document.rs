//! INI document parsing
//!
//! The document keeps sections in the order they first appear and keys in the
//! order they were first set. A repeated key keeps its original position but
//! takes the later value.

use std::path::Path;
use types::ConfigError;

/// Section that receives keys appearing before the first header
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// One `[Name]` block of raw key/value pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionEntries {
    name: String,
    entries: Vec<(String, String)>,
}

impl SectionEntries {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Section name as written in the header
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate `(key, raw value)` pairs in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn set(&mut self, key: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }
}

/// Parsed configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    sections: Vec<SectionEntries>,
}

impl ConfigDocument {
    /// Parse INI text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut doc = ConfigDocument::default();
        let mut current = DEFAULT_SECTION.to_string();

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let mut line = raw_line.trim();
            if index == 0 {
                line = line.trim_start_matches('\u{feff}');
            }

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(end) = rest.find(']') else {
                    return Err(parse_error(line_no, "unterminated section header"));
                };
                let name = rest[..end].trim();
                if name.is_empty() {
                    return Err(parse_error(line_no, "empty section name"));
                }
                current = name.to_string();
                doc.section_mut(&current);
                continue;
            }

            let Some(split) = line.find(['=', ':']) else {
                return Err(parse_error(
                    line_no,
                    &format!("key-value delimiter not found: {}", line),
                ));
            };
            let key = line[..split].trim();
            if key.is_empty() {
                return Err(parse_error(line_no, "empty key name"));
            }

            let value = clean_value(&line[split + 1..]);
            doc.section_mut(&current).set(key, value);
        }

        Ok(doc)
    }

    /// Read and parse the file at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Look up a section by exact name
    pub fn section(&self, name: &str) -> Option<&SectionEntries> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// All sections in file order
    pub fn sections(&self) -> impl Iterator<Item = &SectionEntries> {
        self.sections.iter()
    }

    /// Raw value of `key` in `section`
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    /// Set a raw value, creating the section if needed
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.section_mut(section).set(key, value.into());
    }

    fn section_mut(&mut self, name: &str) -> &mut SectionEntries {
        let index = match self.sections.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sections.push(SectionEntries::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[index]
    }
}

fn parse_error(line: usize, message: &str) -> ConfigError {
    ConfigError::ParseError {
        line,
        message: message.to_string(),
    }
}

/// Unquote a value, or drop an inline comment from an unquoted one
fn clean_value(raw: &str) -> String {
    let raw = raw.trim();

    for quote in ['"', '\''] {
        if let Some(rest) = raw.strip_prefix(quote) {
            if let Some(end) = rest.find(quote) {
                return rest[..end].to_string();
            }
        }
    }

    match raw.find(['#', ';']) {
        Some(start) => raw[..start].trim_end().to_string(),
        None => raw.to_string(),
    }
}
