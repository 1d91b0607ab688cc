//! Flat attribute bag exchanged with the declarative host
//!
//! Attributes are JSON values. Nested blocks follow the host's convention of
//! a list of objects (`master_profile = [ { count = 1, ... } ]`); single
//! blocks are lists with exactly one element. Every accessor returns a
//! field-named [`Error::Validation`] instead of assuming a shape.

use serde_json::{Map, Value};

use crate::cluster::OptionalScalar;
use crate::{Error, Result};

/// Attribute keys whose values never leave the storage-safe channel
pub const SENSITIVE_KEYS: [&str; 3] = ["client_secret", "client_key", "password"];

/// Top-level attributes of one cluster resource
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceData {
    attrs: Map<String, Value>,
}

impl ResourceData {
    /// Create an empty attribute bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(attrs) => Ok(Self { attrs }),
            other => Err(Error::parse(format!(
                "resource attributes must be an object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Parse attributes from a YAML (or JSON) document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| Error::parse(format!("failed to parse resource attributes: {e}")))?;
        Self::from_value(value)
    }

    /// Look up a top-level attribute
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Set a top-level attribute
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// Convert into a JSON object value
    pub fn into_value(self) -> Value {
        Value::Object(self.attrs)
    }

    /// The top level viewed as a block (paths are bare keys)
    pub(crate) fn root(&self) -> Block<'_> {
        Block {
            path: String::new(),
            attrs: &self.attrs,
        }
    }

    /// The single block stored under `key`
    pub(crate) fn single_block(&self, key: &str) -> Result<Block<'_>> {
        self.root().single_block(key)
    }

    /// All blocks stored under `key`, in order
    pub(crate) fn blocks(&self, key: &str) -> Result<Vec<Block<'_>>> {
        self.root().blocks(key)
    }
}

/// A view of one block together with its attribute path
#[derive(Clone, Debug)]
pub(crate) struct Block<'a> {
    path: String,
    attrs: &'a Map<String, Value>,
}

impl<'a> Block<'a> {
    /// Attribute path of a field in this block
    pub(crate) fn field(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn value(&self, key: &str) -> Option<&'a Value> {
        match self.attrs.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    /// String field; absent reads as empty
    pub(crate) fn string(&self, key: &str) -> Result<&'a str> {
        match self.value(key) {
            None => Ok(""),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(type_mismatch(&self.field(key), "a string", other)),
        }
    }

    /// String field that must be present and non-empty
    pub(crate) fn required_string(&self, key: &str) -> Result<&'a str> {
        let value = self.string(key)?;
        if value.trim().is_empty() {
            return Err(Error::validation(self.field(key), "is required"));
        }
        Ok(value)
    }

    /// Non-negative integer field; numeric strings are accepted
    pub(crate) fn optional_u32(&self, key: &str) -> Result<Option<u32>> {
        let field = || self.field(key);
        match self.value(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| {
                    Error::validation(field(), format!("must be a non-negative integer, got {n}"))
                }),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse::<u32>().map(Some).map_err(|_| {
                Error::validation(field(), format!("must be a non-negative integer, got '{s}'"))
            }),
            Some(other) => Err(type_mismatch(&field(), "an integer", other)),
        }
    }

    /// Integer field falling back to `default` when absent
    pub(crate) fn u32_or(&self, key: &str, default: u32) -> Result<u32> {
        Ok(self.optional_u32(key)?.unwrap_or(default))
    }

    /// Optional-zero field: absent and `0` both read as unset
    pub(crate) fn optional_scalar(&self, key: &str) -> Result<OptionalScalar> {
        Ok(OptionalScalar::from(self.optional_u32(key)?))
    }

    /// The single block nested under `key`
    pub(crate) fn single_block(&self, key: &str) -> Result<Block<'a>> {
        let mut blocks = self.blocks(key)?;
        match blocks.len() {
            1 => Ok(blocks.remove(0)),
            0 => Err(Error::validation(self.field(key), "is required")),
            n => Err(Error::validation(
                self.field(key),
                format!("expected exactly one block, got {n}"),
            )),
        }
    }

    /// All blocks nested under `key`, in order
    ///
    /// A bare object is accepted as a one-element list.
    pub(crate) fn blocks(&self, key: &str) -> Result<Vec<Block<'a>>> {
        let base = self.field(key);
        match self.value(key) {
            None => Ok(Vec::new()),
            Some(Value::Object(attrs)) => Ok(vec![Block {
                path: format!("{base}.0"),
                attrs,
            }]),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let path = format!("{base}.{i}");
                    match item {
                        Value::Object(attrs) => Ok(Block { path, attrs }),
                        other => Err(type_mismatch(&path, "a block", other)),
                    }
                })
                .collect(),
            Some(other) => Err(type_mismatch(&base, "a list of blocks", other)),
        }
    }

    /// String-to-string map field; absent reads as empty
    pub(crate) fn string_map(&self, key: &str) -> Result<Vec<(&'a str, &'a str)>> {
        match self.value(key) {
            None => Ok(Vec::new()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.as_str(), s.as_str())),
                    other => Err(type_mismatch(
                        &format!("{}.{}", self.field(key), k),
                        "a string",
                        other,
                    )),
                })
                .collect(),
            Some(other) => Err(type_mismatch(&self.field(key), "a map of strings", other)),
        }
    }
}

/// Insert an optional-zero field only when it is set
pub(crate) fn insert_optional_scalar(
    map: &mut Map<String, Value>,
    key: &str,
    value: OptionalScalar,
) {
    if let Some(v) = value.get() {
        map.insert(key.to_string(), Value::from(v));
    }
}

/// Copy of the attributes with sensitive values masked, safe to print or log
pub fn display_safe(data: &ResourceData) -> ResourceData {
    ResourceData {
        attrs: mask_map(&data.attrs),
    }
}

/// Mask sensitive values anywhere inside a JSON value
pub fn mask_sensitive(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(mask_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(mask_sensitive).collect()),
        other => other.clone(),
    }
}

fn mask_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| {
            let masked = if SENSITIVE_KEYS.contains(&k.as_str()) && !v.is_null() {
                Value::String("<sensitive>".to_string())
            } else {
                mask_sensitive(v)
            };
            (k.clone(), masked)
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn type_mismatch(field: &str, expected: &str, got: &Value) -> Error {
    Error::validation(field, format!("expected {expected}, got {}", type_name(got)))
}
