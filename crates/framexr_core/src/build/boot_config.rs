//! Player boot-config (`key=value` per line).

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Boot-config parse/update errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootConfigError {
    EmptyKey,
    InvalidKey(String),
    InvalidValue { key: String },
    MalformedLine { line: usize, content: String },
}

impl Display for BootConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "boot config key must not be empty"),
            Self::InvalidKey(key) => write!(f, "invalid boot config key `{key}`"),
            Self::InvalidValue { key } => {
                write!(f, "boot config value for `{key}` must be a single line")
            }
            Self::MalformedLine { line, content } => {
                write!(f, "boot config line {line} is not `key=value`: `{content}`")
            }
        }
    }
}

impl Error for BootConfigError {}

/// Ordered boot-config entries; updating a key keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootConfigBuilder {
    entries: Vec<(String, String)>,
}

impl BootConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses existing boot-config text. Blank lines are skipped.
    pub fn parse(raw: &str) -> Result<Self, BootConfigError> {
        let mut builder = Self::new();
        for (index, line) in raw.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(BootConfigError::MalformedLine {
                    line: index + 1,
                    content: trimmed.to_string(),
                });
            };
            builder.set(key.trim(), value.trim())?;
        }
        Ok(builder)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), BootConfigError> {
        validate_key(key)?;
        if value.contains(['\n', '\r']) {
            return Err(BootConfigError::InvalidValue {
                key: key.to_string(),
            });
        }
        match self.entries.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, slot)) => *slot = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Removes `key`; returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| existing != key);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect()
    }
}

fn validate_key(key: &str) -> Result<(), BootConfigError> {
    if key.is_empty() {
        return Err(BootConfigError::EmptyKey);
    }
    if key.contains(['=', '\n', '\r']) || key.trim() != key {
        return Err(BootConfigError::InvalidKey(key.to_string()));
    }
    Ok(())
}
