//! Handler option schemas and their validation.
//!
//! A package declares its options as `name → (value, expected type)`. The
//! value is either the package default or one supplied by the operator; the
//! loader runs [`validate`] once per handler before construction, so a handler
//! is never built from a config that failed its type check.
//!
//! ```rust
//! use irk_core::{ConfigSchema, OptionType, validate};
//!
//! let schema = ConfigSchema::new()
//!     .option("greeting", "hello", OptionType::String)
//!     .option("repeat", 2, OptionType::Integer);
//!
//! let config = validate(&schema).unwrap();
//! assert_eq!(config.get_str("greeting"), Some("hello"));
//! assert_eq!(config.get_i64("repeat"), Some(2));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};

/// The type an option value must be an instance of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// `true` / `false`.
    Bool,
    /// A whole number. Booleans are not integers.
    Integer,
    /// A number with a fractional representation. Whole numbers written
    /// without a decimal point do not qualify.
    Float,
    /// A UTF-8 string.
    String,
    /// An ordered list of values.
    List,
    /// A string-keyed map of values.
    Map,
    /// Any value, including `null`.
    Any,
}

impl OptionType {
    /// Returns `true` if `value` is an instance of this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_f64(),
            Self::String => value.is_string(),
            Self::List => value.is_array(),
            Self::Map => value.is_object(),
            Self::Any => true,
        }
    }

    /// Returns the type name as used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::List => "list",
            Self::Map => "map",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared option: its current value and the type it must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub value: Value,
    pub expected: OptionType,
}

/// Declared options of a package or handler, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSchema {
    entries: BTreeMap<String, SchemaEntry>,
}

impl ConfigSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an option (builder pattern).
    pub fn option(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        expected: OptionType,
    ) -> Self {
        self.insert(name, value, expected);
        self
    }

    /// Declares or replaces an option.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>, expected: OptionType) {
        self.entries.insert(
            name.into(),
            SchemaEntry {
                value: value.into(),
                expected,
            },
        );
    }

    /// Replaces the value of an already declared option, keeping its type.
    ///
    /// Returns `false` if the option is not declared. This is how operator
    /// supplied values reach a package schema; the type check happens later,
    /// in [`validate`].
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Returns a schema with `other`'s entries layered over this one's.
    pub fn merged(&self, other: &ConfigSchema) -> ConfigSchema {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        ConfigSchema { entries }
    }

    /// Returns the declared option, if present.
    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.entries.get(name)
    }

    /// Iterates over declared options in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validates every declared option against its expected type.
///
/// On success the result has exactly the schema's keys, each mapped to the
/// declared value unchanged. The first mismatch fails the whole call; no
/// partial result is returned.
pub fn validate(schema: &ConfigSchema) -> ConfigResult<ValidatedConfig> {
    let mut values = Map::new();
    for (name, entry) in &schema.entries {
        if !entry.expected.accepts(&entry.value) {
            return Err(ConfigError::TypeMismatch {
                option: name.clone(),
                expected: entry.expected,
                actual: entry.value.clone(),
            });
        }
        values.insert(name.clone(), entry.value.clone());
    }
    Ok(ValidatedConfig { values })
}

/// The option values of a schema that passed [`validate`].
///
/// Handed to handler constructors. Values can be read one at a time or
/// deserialised into a typed struct with [`deserialize`](Self::deserialize).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedConfig {
    values: Map<String, Value>,
}

impl ValidatedConfig {
    /// Returns the raw value of an option.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Deserialise all options into `T`.
    ///
    /// Use `#[serde(default)]` on the struct to tolerate undeclared fields.
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(Value::Object(self.values.clone()))
    }

    /// Iterates over option names and values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_copies_every_value() {
        let schema = ConfigSchema::new()
            .option("channel", "#rust", OptionType::String)
            .option("limit", 5, OptionType::Integer)
            .option("ratio", 0.5, OptionType::Float)
            .option("loud", false, OptionType::Bool)
            .option("admins", json!(["alice", "bob"]), OptionType::List)
            .option("aliases", json!({"hi": "hello"}), OptionType::Map)
            .option("anything", Value::Null, OptionType::Any);

        let config = validate(&schema).unwrap();

        assert_eq!(config.len(), schema.len());
        for (name, entry) in schema.iter() {
            assert_eq!(config.get(name), Some(&entry.value), "option {name}");
        }
    }

    #[test]
    fn test_validate_rejects_single_mismatch() {
        let schema = ConfigSchema::new()
            .option("channel", "#rust", OptionType::String)
            .option("limit", "five", OptionType::Integer);

        let err = validate(&schema).unwrap_err();
        let ConfigError::TypeMismatch {
            option,
            expected,
            actual,
        } = err;
        assert_eq!(option, "limit");
        assert_eq!(expected, OptionType::Integer);
        assert_eq!(actual, json!("five"));
    }

    #[test]
    fn test_bool_is_not_integer_and_integer_is_not_float() {
        assert!(!OptionType::Integer.accepts(&json!(true)));
        assert!(!OptionType::Float.accepts(&json!(1)));
        assert!(OptionType::Float.accepts(&json!(1.0)));
        assert!(OptionType::Integer.accepts(&json!(u64::MAX)));
    }

    #[test]
    fn test_empty_schema_validates_to_empty_config() {
        let config = validate(&ConfigSchema::new()).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_merged_and_set_value() {
        let shared = ConfigSchema::new()
            .option("greeting", "hello", OptionType::String)
            .option("repeat", 1, OptionType::Integer);
        let own = ConfigSchema::new().option("repeat", 3, OptionType::Integer);

        let mut merged = shared.merged(&own);
        assert_eq!(merged.get("repeat").unwrap().value, json!(3));
        assert_eq!(merged.len(), 2);

        assert!(merged.set_value("greeting", "hey"));
        assert!(!merged.set_value("missing", 1));
        assert_eq!(validate(&merged).unwrap().get_str("greeting"), Some("hey"));
    }

    #[test]
    fn test_deserialize_into_struct() {
        #[derive(Deserialize)]
        struct Greeting {
            greeting: String,
            repeat: u32,
        }

        let schema = ConfigSchema::new()
            .option("greeting", "hello", OptionType::String)
            .option("repeat", 2, OptionType::Integer);
        let cfg: Greeting = validate(&schema).unwrap().deserialize().unwrap();
        assert_eq!(cfg.greeting, "hello");
        assert_eq!(cfg.repeat, 2);
    }

    #[test]
    fn test_mismatch_message() {
        let schema = ConfigSchema::new().option("limit", "five", OptionType::Integer);
        let err = validate(&schema).unwrap_err();
        assert_eq!(
            err.to_string(),
            "config option limit needs integer, but \"five\" given"
        );
    }
}
