//! Operation options
//!
//! Every façade operation that accepts options validates them against an
//! [`OptionsSchema`] built once per channel: the manager dispatches a
//! [`ConfigureOptionsEvent`](super::ConfigureOptionsEvent) and each subscriber
//! declares the keys it understands, with defaults and accepted types.
//! Resolution rejects unknown keys, mistyped values and conflicting pairs,
//! then fills in defaults.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Resolved option values, keyed by option name
pub type Options = Map<String, Value>;

/// Option validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    #[error("The option \"{option}\" does not exist. Defined options are: \"{}\"", .defined.join("\", \""))]
    UndefinedOption { option: String, defined: Vec<String> },

    #[error("The option \"{option}\" with value {value} is expected to be of type \"{expected}\"")]
    InvalidOptionType {
        option: String,
        value: String,
        expected: String,
    },

    #[error("The options \"{first}\" and \"{second}\" cannot be used together")]
    ConflictingOptions { first: String, second: String },
}

/// JSON types an option may accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Null,
    Bool,
    String,
    Integer,
    Array,
    Object,
}

impl OptionType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Null => value.is_null(),
            Self::Bool => value.is_boolean(),
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Integer => "int",
            Self::Array => "array",
            Self::Object => "object",
        })
    }
}

#[derive(Debug, Clone)]
struct OptionDefinition {
    default: Value,
    /// Empty accepts anything
    allowed_types: Vec<OptionType>,
}

/// Declared options of one channel
#[derive(Debug, Clone, Default)]
pub struct OptionsSchema {
    definitions: BTreeMap<String, OptionDefinition>,
    conflicts: Vec<(String, String)>,
}

impl OptionsSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `name` with a default value, or replace the default of an existing option
    pub fn set_default(&mut self, name: impl Into<String>, default: Value) -> &mut Self {
        let name = name.into();
        match self.definitions.get_mut(&name) {
            Some(definition) => definition.default = default,
            None => {
                self.definitions.insert(
                    name,
                    OptionDefinition {
                        default,
                        allowed_types: Vec::new(),
                    },
                );
            }
        }
        self
    }

    /// Restrict the accepted types; defines the option with a `null` default if needed
    pub fn set_allowed_types(&mut self, name: impl Into<String>, types: &[OptionType]) -> &mut Self {
        let name = name.into();
        let definition = self
            .definitions
            .entry(name)
            .or_insert_with(|| OptionDefinition {
                default: Value::Null,
                allowed_types: Vec::new(),
            });
        definition.allowed_types = types.to_vec();
        self
    }

    /// Reject option sets that give both `first` and `second` a non-null value
    pub fn set_conflicting(&mut self, first: impl Into<String>, second: impl Into<String>) -> &mut Self {
        self.conflicts.push((first.into(), second.into()));
        self
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn defined_options(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    /// Validate `options` and merge them over the declared defaults
    pub fn resolve(&self, options: Options) -> Result<Options, OptionsError> {
        for (name, value) in &options {
            let definition = self.definitions.get(name).ok_or_else(|| OptionsError::UndefinedOption {
                option: name.clone(),
                defined: self.definitions.keys().cloned().collect(),
            })?;

            if !definition.allowed_types.is_empty()
                && !definition.allowed_types.iter().any(|kind| kind.accepts(value))
            {
                return Err(OptionsError::InvalidOptionType {
                    option: name.clone(),
                    value: value.to_string(),
                    expected: definition
                        .allowed_types
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("\" or \""),
                });
            }
        }

        for (first, second) in &self.conflicts {
            let given = |name: &String| options.get(name).map_or(false, |value| !value.is_null());
            if given(first) && given(second) {
                return Err(OptionsError::ConflictingOptions {
                    first: first.clone(),
                    second: second.clone(),
                });
            }
        }

        let mut resolved: Options = self
            .definitions
            .iter()
            .map(|(name, definition)| (name.clone(), definition.default.clone()))
            .collect();
        resolved.extend(options);
        Ok(resolved)
    }
}

/// Typed reads of resolved options
pub trait OptionsExt {
    fn str_option(&self, name: &str) -> Option<&str>;
    fn bool_option(&self, name: &str) -> bool;
    fn i64_option(&self, name: &str) -> Option<i64>;
}

impl OptionsExt for Options {
    fn str_option(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Missing and non-boolean values read as `false`
    fn bool_option(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    fn i64_option(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn schema() -> OptionsSchema {
        let mut schema = OptionsSchema::new();
        schema
            .set_default("locale", Value::Null)
            .set_default("auto_create", json!(false))
            .set_allowed_types("auto_create", &[OptionType::Bool])
            .set_allowed_types("path", &[OptionType::Null, OptionType::String])
            .set_default("node_name", Value::Null)
            .set_conflicting("path", "node_name");
        schema
    }

    #[test]
    fn test_defaults_are_filled_in() {
        let resolved = schema().resolve(options(json!({"path": "/a"}))).unwrap();
        assert_eq!(resolved.get("auto_create"), Some(&json!(false)));
        assert_eq!(resolved.get("locale"), Some(&Value::Null));
        assert_eq!(resolved.str_option("path"), Some("/a"));
    }

    #[test]
    fn test_undefined_option() {
        let error = schema().resolve(options(json!({"bogus": 1}))).unwrap_err();
        assert_eq!(
            error.to_string(),
            "The option \"bogus\" does not exist. Defined options are: \"auto_create\", \"locale\", \"node_name\", \"path\""
        );
    }

    #[test]
    fn test_invalid_option_type() {
        let error = schema()
            .resolve(options(json!({"auto_create": "yes"})))
            .unwrap_err();
        assert!(matches!(error, OptionsError::InvalidOptionType { ref option, .. } if option == "auto_create"));

        let error = schema().resolve(options(json!({"path": 3}))).unwrap_err();
        assert_eq!(
            error.to_string(),
            "The option \"path\" with value 3 is expected to be of type \"null\" or \"string\""
        );
    }

    #[test]
    fn test_conflicting_options() {
        let error = schema()
            .resolve(options(json!({"path": "/a", "node_name": "b"})))
            .unwrap_err();
        assert_eq!(
            error,
            OptionsError::ConflictingOptions {
                first: "path".to_string(),
                second: "node_name".to_string(),
            }
        );

        // null counts as not given
        assert!(schema()
            .resolve(options(json!({"path": "/a", "node_name": null})))
            .is_ok());
    }

    #[test]
    fn test_typed_reads() {
        let resolved = options(json!({"flag": true, "user": 7, "name": "x"}));
        assert!(resolved.bool_option("flag"));
        assert!(!resolved.bool_option("missing"));
        assert_eq!(resolved.i64_option("user"), Some(7));
        assert_eq!(resolved.str_option("user"), None);
        assert_eq!(resolved.str_option("name"), Some("x"));
    }
}
