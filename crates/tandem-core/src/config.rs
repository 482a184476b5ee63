//! Nested configuration mapping.
//!
//! A [`Config`] is a JSON object with (at least) an `env` section holding
//! `episode_length` in seconds and an `engine` section that is opaque to
//! the environment core and handed to the engine builder unchanged.
//!
//! ```
//! use tandem_core::Config;
//!
//! let cfg = Config::from_json_str(r#"{
//!     "env": { "episode_length": 2.0 },
//!     "engine": { "engine_name": "kinematic", "timestep": 0.1 }
//! }"#).unwrap();
//!
//! assert_eq!(cfg.env_config().unwrap().episode_length, 2.0);
//! assert_eq!(cfg.engine_config().unwrap().engine_name(), Some("kinematic"));
//! ```

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Root configuration document.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    root: Map<String, Value>,
}

impl Config {
    /// Wrap an already-parsed document. The root must be an object.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ConfigError::invalid(
                "<root>",
                format!("expected a mapping, got {}", type_name(&other)),
            )),
        }
    }

    /// Parse a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Self::from_value(serde_json::from_str(s)?)
    }

    /// Read and parse a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Look up a value by dotted path, e.g. `env.episode_length`.
    pub fn get(&self, dotted: &str) -> Option<&Value> {
        let mut parts = dotted.split('.');
        let mut cur = self.root.get(parts.next()?)?;
        for part in parts {
            cur = cur.as_object()?.get(part)?;
        }
        Some(cur)
    }

    /// A top-level section as a [`Section`].
    ///
    /// Fails with [`ConfigError::MissingKey`] if absent and
    /// [`ConfigError::InvalidValue`] if it is not a mapping.
    pub fn section(&self, name: &str) -> Result<Section, ConfigError> {
        match self.root.get(name) {
            None => Err(ConfigError::MissingKey { key: name.into() }),
            Some(Value::Object(map)) => Ok(Section {
                prefix: name.into(),
                map: map.clone(),
            }),
            Some(other) => Err(ConfigError::invalid(
                name,
                format!("expected a mapping, got {}", type_name(other)),
            )),
        }
    }

    /// The `env` section with its required keys validated.
    pub fn env_config(&self) -> Result<EnvConfig, ConfigError> {
        let section = self.section("env")?;
        let episode_length = section.require_f64("episode_length")?;
        if !episode_length.is_finite() || episode_length <= 0.0 {
            return Err(ConfigError::invalid(
                "env.episode_length",
                format!("must be finite and positive, got {episode_length}"),
            ));
        }
        Ok(EnvConfig {
            episode_length,
            section,
        })
    }

    /// The `engine` section, passed through to the engine builder.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        self.section("engine").map(EngineConfig)
    }
}

/// One mapping inside a [`Config`], with typed getters that report
/// errors against the full dotted key.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    prefix: String,
    map: Map<String, Value>,
}

impl Section {
    /// Build a section directly from a mapping, e.g. in tests.
    pub fn new(prefix: impl Into<String>, map: Map<String, Value>) -> Self {
        Self {
            prefix: prefix.into(),
            map,
        }
    }

    /// Dotted path of a key within this section.
    pub fn path(&self, key: &str) -> String {
        format!("{}.{key}", self.prefix)
    }

    /// Raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Whether the section contains `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Optional float. Integers are accepted.
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.typed(key, "a number", Value::as_f64)
    }

    /// Optional non-negative integer.
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        self.typed(key, "a non-negative integer", Value::as_u64)
    }

    /// Optional boolean.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.typed(key, "a boolean", Value::as_bool)
    }

    /// Optional string.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>, ConfigError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.wrong_type(key, "a string", v)),
        }
    }

    /// Required float.
    pub fn require_f64(&self, key: &str) -> Result<f64, ConfigError> {
        self.get_f64(key)?.ok_or_else(|| ConfigError::MissingKey {
            key: self.path(key),
        })
    }

    /// Deserialize the whole section into a typed settings struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(Value::Object(self.map.clone()))
            .map_err(|e| ConfigError::invalid(self.prefix.clone(), e.to_string()))
    }

    fn typed<'a, T>(
        &'a self,
        key: &str,
        expected: &str,
        get: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>, ConfigError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(v) => get(v)
                .map(Some)
                .ok_or_else(|| self.wrong_type(key, expected, v)),
        }
    }

    fn wrong_type(&self, key: &str, expected: &str, got: &Value) -> ConfigError {
        ConfigError::invalid(
            self.path(key),
            format!("expected {expected}, got {}", type_name(got)),
        )
    }
}

/// Validated `env` section.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvConfig {
    /// Episode length in seconds.
    pub episode_length: f64,
    /// The full section, for task-specific keys.
    pub section: Section,
}

/// The `engine` section. Opaque to the environment core.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig(pub Section);

impl EngineConfig {
    /// Value of `engine.engine_name`, if present and a string.
    pub fn engine_name(&self) -> Option<&str> {
        self.0.get("engine_name").and_then(Value::as_str)
    }

    /// The underlying section.
    pub fn section(&self) -> &Section {
        &self.0
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
