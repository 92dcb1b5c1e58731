use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// String-keyed settings handed to an engine factory.
///
/// Mirrors one table of the configuration file (`[storage]` or
/// `[rotator]`). Values keep whatever type the file gave them; the typed
/// accessors below do the validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineConfig(Map<String, Value>);

impl EngineConfig {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.optional_str(key)?
            .ok_or_else(|| Error::Config(format!("Missing required key \"{}\"", key)))
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<&str>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(Error::Config(format!(
                "Key \"{}\" must be a string, got {}",
                key, other
            ))),
        }
    }

    /// Reads a non-negative whole number. Numeric strings such as `"7"` are
    /// accepted so that values coming from environment-style sources work.
    pub fn optional_count(&self, key: &str) -> Result<Option<u32>> {
        let invalid = || Error::Config(format!("Key \"{}\" must be a non-negative number", key));
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(invalid),
            Some(Value::String(s)) => s.trim().parse::<u32>().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }
}

impl From<Map<String, Value>> for EngineConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
