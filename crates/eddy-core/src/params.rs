//! Run-time parameter table.
//!
//! Modules read their knobs from a flat [`ParamTable`] with keys namespaced
//! as `"<Identifier>.<key>"`. Parsing an input deck into a table is the
//! driver's concern; this module only stores values and performs typed
//! lookups.

use indexmap::IndexMap;

use crate::error::ParamError;

/// A single parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Real number.
    Real(f64),
    /// Free-form text.
    Text(String),
    /// Array of reals (e.g. a vector quantity).
    RealArray(Vec<f64>),
    /// Array of text values (e.g. a list of identifiers).
    TextArray(Vec<String>),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::RealArray(_) => "real array",
            Self::TextArray(_) => "text array",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        Self::RealArray(v)
    }
}

impl<const N: usize> From<[f64; N]> for ParamValue {
    fn from(v: [f64; N]) -> Self {
        Self::RealArray(v.to_vec())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        Self::TextArray(v)
    }
}

impl From<&[&str]> for ParamValue {
    fn from(v: &[&str]) -> Self {
        Self::TextArray(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ParamValue {
    fn from(v: [&str; N]) -> Self {
        Self::TextArray(v.iter().map(|s| s.to_string()).collect())
    }
}

/// Ordered key/value store of run-time parameters.
///
/// Insertion order is preserved so that dumps of the table are
/// reproducible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamTable {
    values: IndexMap<String, ParamValue>,
}

impl ParamTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// A view of the table that prefixes every key with `"<prefix>."`.
    pub fn scope<'a>(&'a self, prefix: &'a str) -> ParamScope<'a> {
        ParamScope {
            table: self,
            prefix,
        }
    }

    fn lookup(&self, key: &str) -> Result<&ParamValue, ParamError> {
        self.values.get(key).ok_or_else(|| ParamError::Missing {
            key: key.to_string(),
        })
    }

    fn wrong_type(key: &str, expected: &'static str, found: &ParamValue) -> ParamError {
        ParamError::WrongType {
            key: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    /// Look up a real. Integers are widened.
    pub fn get_f64(&self, key: &str) -> Result<f64, ParamError> {
        match self.lookup(key)? {
            ParamValue::Real(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(Self::wrong_type(key, "real", other)),
        }
    }

    /// Look up an array of reals. A single real is treated as a one-element array.
    pub fn get_f64_array(&self, key: &str) -> Result<Vec<f64>, ParamError> {
        match self.lookup(key)? {
            ParamValue::RealArray(v) => Ok(v.clone()),
            ParamValue::Real(v) => Ok(vec![*v]),
            other => Err(Self::wrong_type(key, "real array", other)),
        }
    }

    /// Look up a non-negative integer.
    pub fn get_u64(&self, key: &str) -> Result<u64, ParamError> {
        match self.lookup(key)? {
            ParamValue::Int(v) => u64::try_from(*v).map_err(|_| ParamError::Invalid {
                key: key.to_string(),
                reason: format!("expected a non-negative integer, got {v}"),
            }),
            other => Err(Self::wrong_type(key, "int", other)),
        }
    }

    /// Look up a boolean.
    pub fn get_bool(&self, key: &str) -> Result<bool, ParamError> {
        match self.lookup(key)? {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(Self::wrong_type(key, "bool", other)),
        }
    }

    /// Look up a text value.
    pub fn get_str(&self, key: &str) -> Result<&str, ParamError> {
        match self.lookup(key)? {
            ParamValue::Text(v) => Ok(v.as_str()),
            other => Err(Self::wrong_type(key, "text", other)),
        }
    }

    /// Look up an array of text values. A single text value is treated as a one-element array.
    pub fn get_str_array(&self, key: &str) -> Result<Vec<String>, ParamError> {
        match self.lookup(key)? {
            ParamValue::TextArray(v) => Ok(v.clone()),
            ParamValue::Text(v) => Ok(vec![v.clone()]),
            other => Err(Self::wrong_type(key, "text array", other)),
        }
    }
}

/// A prefixed view into a [`ParamTable`].
///
/// `scope("FreeStream").get_f64("density")` looks up `"FreeStream.density"`.
/// The `*_or` getters return the default only when the key is absent; a
/// present key with the wrong type is still an error.
#[derive(Clone, Copy, Debug)]
pub struct ParamScope<'a> {
    table: &'a ParamTable,
    prefix: &'a str,
}

impl ParamScope<'_> {
    /// The fully-qualified key for `name`.
    pub fn key(&self, name: &str) -> String {
        format!("{}.{}", self.prefix, name)
    }

    /// Whether `"<prefix>.<name>"` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains(&self.key(name))
    }

    /// Scoped [`ParamTable::get_f64`].
    pub fn get_f64(&self, name: &str) -> Result<f64, ParamError> {
        self.table.get_f64(&self.key(name))
    }

    /// Scoped real lookup with a default for absent keys.
    pub fn get_f64_or(&self, name: &str, default: f64) -> Result<f64, ParamError> {
        if self.contains(name) {
            self.get_f64(name)
        } else {
            Ok(default)
        }
    }

    /// Scoped [`ParamTable::get_f64_array`].
    pub fn get_f64_array(&self, name: &str) -> Result<Vec<f64>, ParamError> {
        self.table.get_f64_array(&self.key(name))
    }

    /// Scoped real-array lookup with a default for absent keys.
    pub fn get_f64_array_or(&self, name: &str, default: &[f64]) -> Result<Vec<f64>, ParamError> {
        if self.contains(name) {
            self.get_f64_array(name)
        } else {
            Ok(default.to_vec())
        }
    }

    /// Scoped [`ParamTable::get_u64`].
    pub fn get_u64(&self, name: &str) -> Result<u64, ParamError> {
        self.table.get_u64(&self.key(name))
    }

    /// Scoped integer lookup with a default for absent keys.
    pub fn get_u64_or(&self, name: &str, default: u64) -> Result<u64, ParamError> {
        if self.contains(name) {
            self.get_u64(name)
        } else {
            Ok(default)
        }
    }

    /// Scoped [`ParamTable::get_bool`].
    pub fn get_bool_or(&self, name: &str, default: bool) -> Result<bool, ParamError> {
        if self.contains(name) {
            self.table.get_bool(&self.key(name))
        } else {
            Ok(default)
        }
    }

    /// Scoped [`ParamTable::get_str`] with a default for absent keys.
    pub fn get_str_or(&self, name: &str, default: &str) -> Result<String, ParamError> {
        if self.contains(name) {
            self.table.get_str(&self.key(name)).map(str::to_string)
        } else {
            Ok(default.to_string())
        }
    }

    /// Scoped text-array lookup with an empty default for absent keys.
    pub fn get_str_array_or_empty(&self, name: &str) -> Result<Vec<String>, ParamError> {
        if self.contains(name) {
            self.table.get_str_array(&self.key(name))
        } else {
            Ok(Vec::new())
        }
    }
}
