//! Cell values, column kinds, and text coercion.
//!
//! A cell is either a typed scalar or the explicit [`Value::Missing`] marker.
//! Floats never hold NaN: anything that parses to NaN is missing, which gives
//! `Value` a total equality and a stable hash for grouping and dedupe.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Tokens read as missing when loading, matched exactly.
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Declared kind of a column, decided once at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Boolean,
    /// No value was present at load time; edits are stored as text.
    Null,
}

impl ColumnKind {
    /// Dtype label shown in schema summaries.
    pub fn label(self) -> &'static str {
        match self {
            Self::Integer => "int64",
            Self::Float => "float64",
            Self::Boolean => "bool",
            Self::Text | Self::Null => "object",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Value written by a `fill` with no configured constant.
    pub fn fill_default(self) -> Value {
        match self {
            Self::Integer => Value::Integer(0),
            Self::Float => Value::Float(0.0),
            Self::Boolean => Value::Boolean(false),
            Self::Text | Self::Null => Value::Text(String::new()),
        }
    }

    /// Convert edit text into a value of this kind.
    ///
    /// Every kind writes [`Value::Missing`] for blank input or an NA token,
    /// the same as loading. Other text is kept verbatim by text and null
    /// columns, and trimmed before parsing by the rest. Returns `None` when
    /// the text is not a valid value of this kind.
    pub fn coerce(self, raw: &str, na: &NaValues) -> Option<Value> {
        match self {
            Self::Text | Self::Null => {
                if na.is_missing(raw) {
                    Some(Value::Missing)
                } else {
                    Some(Value::Text(raw.to_owned()))
                }
            }
            Self::Integer | Self::Float | Self::Boolean => {
                let trimmed = raw.trim();
                if na.is_missing(trimmed) {
                    return Some(Value::Missing);
                }
                match self {
                    Self::Integer => parse_integer(trimmed).map(Value::Integer),
                    Self::Float => parse_float(trimmed).map(Value::Float),
                    _ => parse_bool(trimmed).map(Value::Boolean),
                }
            }
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The set of tokens treated as missing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NaValues {
    tokens: Vec<String>,
}

impl NaValues {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        // Blank cells are always missing
        if !tokens.iter().any(String::is_empty) {
            tokens.push(String::new());
        }
        Self { tokens }
    }

    pub fn is_missing(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        self.tokens.iter().any(|t| t == trimmed)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl Default for NaValues {
    fn default() -> Self {
        Self::new(DEFAULT_NA_VALUES.iter().copied())
    }
}

pub(crate) fn parse_integer(s: &str) -> Option<i64> {
    s.parse::<i64>().ok()
}

pub(crate) fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// A single cell.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    #[default]
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Numeric view of the value; booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(_) | Self::Missing => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text written by exporters. Missing cells are empty.
    pub fn to_raw(&self) -> String {
        match self {
            Self::Missing => String::new(),
            other => other.to_string(),
        }
    }

    /// Ordering used by the sort stage. Missing compares greater than any
    /// value so it lands last in an ascending sort; values of different
    /// variants fall back to numeric, then textual comparison.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Missing, _) => Ordering::Greater,
            (_, Self::Missing) => Ordering::Less,
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.to_string().cmp(&b.to_string()),
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            // No NaN, and 0.0 == -0.0 is intended
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Missing, Self::Missing) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Integer(i) => i.hash(state),
            Self::Float(f) => {
                let normalized = if *f == 0.0 { 0.0_f64 } else { *f };
                normalized.to_bits().hash(state);
            }
            Self::Text(s) => s.hash(state),
            Self::Boolean(b) => b.hash(state),
            Self::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Self::Text(s) => f.write_str(s),
            Self::Boolean(b) => f.write_str(if *b { "True" } else { "False" }),
            Self::Missing => f.write_str("NaN"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        if v.is_nan() { Self::Missing } else { Self::Float(v) }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}
