//! Core type definitions for column specifications.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Whole numbers. Integral float spellings (`5.0`) are accepted.
    Integer,
    /// Floating-point numbers.
    Float,
    /// Free or enumerated text.
    Category,
    /// 0/1 flags.
    Binary,
}

impl ColumnKind {
    /// Returns true if this kind is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Category => "category",
            ColumnKind::Binary => "binary",
        }
    }

    /// Parse a raw, non-missing cell into a typed value.
    ///
    /// Returns `None` when the cell does not conform to this kind.
    pub fn parse(&self, raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        match self {
            ColumnKind::Integer => parse_integer(trimmed).map(Value::Integer),
            ColumnKind::Float => parse_float(trimmed).map(Value::Float),
            ColumnKind::Category => Some(Value::Category(trimmed.to_string())),
            ColumnKind::Binary => parse_binary(trimmed).map(Value::Binary),
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Category(String),
    Binary(bool),
}

impl Value {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Binary(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Category(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Category(v) => f.write_str(v),
            Value::Binary(v) => write!(f, "{}", u8::from(*v)),
        }
    }
}

/// Inclusive numeric bounds. Either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ValueRange {
    /// Closed range `[min, max]`.
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Range with only a lower bound.
    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Check whether a value lies inside the bounds.
    pub fn contains(&self, value: f64) -> bool {
        let above_min = self.min.is_none_or(|m| value >= m);
        let below_max = self.max.is_none_or(|m| value <= m);
        above_min && below_max
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min = self.min.map(|v| v.to_string()).unwrap_or("-∞".to_string());
        let max = self.max.map(|v| v.to_string()).unwrap_or("∞".to_string());
        write!(f, "[{}, {}]", min, max)
    }
}

/// Specification for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Declared kind.
    pub kind: ColumnKind,
    /// Whether missing cells are allowed.
    pub nullable: bool,
    /// Allowed values for enumerated categories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    /// Soft numeric range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<ValueRange>,
}

impl ColumnSpec {
    /// Create a non-nullable column of the given kind.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            allowed_values: None,
            range: None,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Float)
    }

    pub fn category(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Category)
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Binary)
    }

    /// Set a closed range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(ValueRange::between(min, max));
        self
    }

    /// Set a lower bound only.
    pub fn with_min(mut self, min: f64) -> Self {
        self.range = Some(ValueRange::at_least(min));
        self
    }

    /// Restrict to an enumerated set.
    pub fn with_allowed(mut self, values: &[&str]) -> Self {
        self.allowed_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Allow missing cells.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Check membership in the allowed set. Columns without a set accept anything.
    pub fn allows(&self, value: &str) -> bool {
        self.allowed_values
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|a| a == value))
    }

    /// Compare two raw cells of this column for equality of their typed values.
    ///
    /// Falls back to trimmed text comparison when either side does not parse.
    pub fn same_value(&self, a: &str, b: &str) -> bool {
        match (self.kind.parse(a), self.kind.parse(b)) {
            (Some(x), Some(y)) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => x == y,
            },
            _ => a.trim() == b.trim(),
        }
    }
}

/// Check if a raw cell represents a missing value.
///
/// `none` is deliberately not treated as missing: it is a legal oxygen device.
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || trimmed == "NA"
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
}

/// Parse an integer, accepting integral float spellings.
pub fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let f = raw.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Parse a finite float.
pub fn parse_float(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a 0/1 flag.
pub fn parse_binary(raw: &str) -> Option<bool> {
    match raw {
        "1" | "1.0" => Some(true),
        "0" | "0.0" => Some(false),
        other if other.eq_ignore_ascii_case("true") => Some(true),
        other if other.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}
