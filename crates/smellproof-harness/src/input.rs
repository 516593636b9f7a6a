#![forbid(unsafe_code)]

//! Named parameters handed to a fixture variant.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InvocationError, InvocationResult};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<i64> for InputValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Ordered mapping of parameter names to values.
///
/// The empty record is the sole domain element of a parameterless fixture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputRecord {
    fields: BTreeMap<String, InputValue>,
}

impl InputRecord {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<InputValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn int(&self, name: &str) -> InvocationResult<i64> {
        match self.fields.get(name) {
            Some(InputValue::Int(value)) => Ok(*value),
            Some(_) => Err(InvocationError::wrong_type(name, "an integer")),
            None => Err(InvocationError::missing(name)),
        }
    }

    pub fn bool(&self, name: &str) -> InvocationResult<bool> {
        match self.fields.get(name) {
            Some(InputValue::Bool(value)) => Ok(*value),
            Some(_) => Err(InvocationError::wrong_type(name, "a boolean")),
            None => Err(InvocationError::missing(name)),
        }
    }

    pub fn text(&self, name: &str) -> InvocationResult<&str> {
        match self.fields.get(name) {
            Some(InputValue::Text(value)) => Ok(value),
            Some(_) => Err(InvocationError::wrong_type(name, "a string")),
            None => Err(InvocationError::missing(name)),
        }
    }
}

impl fmt::Display for InputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (name, value)) in self.fields.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}:{value}")?;
        }
        f.write_str("}")
    }
}

/// Error produced when parsing a `key=value,...` override.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed input pair {pair:?}: expected key=value")]
pub struct ParseInputError {
    pub pair: String,
}

impl FromStr for InputRecord {
    type Err = ParseInputError;

    /// Parse `hours=1,minutes=30,seconds=45`. `{}` or an empty string yields
    /// the empty record.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "{}" {
            return Ok(Self::empty());
        }
        let mut record = Self::empty();
        for pair in trimmed.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, raw)) = pair.split_once('=') else {
                return Err(ParseInputError {
                    pair: pair.to_string(),
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ParseInputError {
                    pair: pair.to_string(),
                });
            }
            let raw = raw.trim();
            let value = if let Ok(int) = raw.parse::<i64>() {
                InputValue::Int(int)
            } else if let Ok(flag) = raw.parse::<bool>() {
                InputValue::Bool(flag)
            } else {
                InputValue::Text(raw.to_string())
            };
            record.fields.insert(key.to_string(), value);
        }
        Ok(record)
    }
}
