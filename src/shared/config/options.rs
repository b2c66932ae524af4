use std::collections::HashMap;

use crate::engine::errors::{ExchangeError, Result};

/// Immutable string options with case-insensitive keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeOptions {
    entries: HashMap<String, String>,
}

impl ExchangeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(invalid(key, raw, "a boolean")),
            },
        }
    }

    pub fn get_int(&self, key: &str, default: i32) -> Result<i32> {
        self.parse(key, default, "an integer")
    }

    pub fn get_long(&self, key: &str, default: i64) -> Result<i64> {
        self.parse(key, default, "a long")
    }

    pub fn get_double(&self, key: &str, default: f64) -> Result<f64> {
        self.parse(key, default, "a double")
    }

    /// Entries with lower-cased keys.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T, what: &str) -> Result<T> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| invalid(key, raw, what)),
        }
    }
}

fn invalid(key: &str, raw: &str, what: &str) -> ExchangeError {
    ExchangeError::Config(format!("option '{key}' must be {what}, got '{raw}'"))
}

impl<K, V> FromIterator<(K, V)> for ExchangeOptions
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for ExchangeOptions {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}
