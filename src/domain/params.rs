//! Free-form strategy parameters and regime descriptors.
//!
//! Parameter sets arrive from configuration files and proposal sources with
//! loosely typed values. [`crate::domain::normalizer`] turns them into the
//! canonical shape a strategy accepts; this module only models the values.

use std::collections::BTreeMap;
use std::fmt;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

/// Parameter name to value, ordered by name.
pub type ParameterSet = BTreeMap<String, ParamValue>;

impl ParamValue {
    /// Parses a raw scalar: integer, then float, then text.
    pub fn parse_scalar(raw: &str) -> ParamValue {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            ParamValue::Int(i)
        } else if let Ok(f) = trimmed.parse::<f64>() {
            ParamValue::Float(f)
        } else {
            ParamValue::Text(trimmed.to_string())
        }
    }

    /// Parses a raw value; comma-separated input becomes a list of scalars.
    pub fn parse(raw: &str) -> ParamValue {
        if raw.contains(',') {
            ParamValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ParamValue::parse_scalar)
                    .collect(),
            )
        } else {
            ParamValue::parse_scalar(raw)
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            ParamValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integral value; floats must have no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            ParamValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            ParamValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| ParamValue::Float(s.parse().ok()?).as_i64())
            }
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|i| usize::try_from(i).ok())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => write!(f, "{}", s),
            ParamValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ParamValue::Map(map) => write!(f, "{}", format_params(map)),
        }
    }
}

/// `{key: value, ...}` in key order.
pub fn format_params(params: &ParameterSet) -> String {
    let body: Vec<String> = params.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
    format!("{{{}}}", body.join(", "))
}

const DEFAULT_DETAIL_VOLATILITY: f64 = 0.15;
const DEFAULT_DETAIL_REGIME: &str = "normal";

/// Market regime as handed to regime-aware strategies.
///
/// Proposal sources emit either a bare label such as `"LowVol-Bull"` or a
/// structured mapping such as `{current_regime: bull, current_volatility: 0.12}`.
#[derive(Debug, Clone, PartialEq)]
pub enum RegimeDescriptor {
    Label(String),
    Detail(BTreeMap<String, ParamValue>),
}

impl RegimeDescriptor {
    /// Coerces a raw parameter into a descriptor.
    ///
    /// Text becomes a label, a list becomes the label formed by joining its text
    /// elements with `-`, a map becomes a detail. Anything else is rejected.
    pub fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Text(s) if !s.trim().is_empty() => {
                Some(RegimeDescriptor::Label(s.trim().to_string()))
            }
            ParamValue::List(items) => {
                let parts: Vec<&str> = items
                    .iter()
                    .filter_map(ParamValue::as_text)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(RegimeDescriptor::Label(parts.join("-")))
                }
            }
            ParamValue::Map(map) => Some(RegimeDescriptor::Detail(map.clone())),
            _ => None,
        }
    }

    pub fn into_param(self) -> ParamValue {
        match self {
            RegimeDescriptor::Label(label) => ParamValue::Text(label),
            RegimeDescriptor::Detail(map) => ParamValue::Map(map),
        }
    }

    pub fn name(&self) -> String {
        match self {
            RegimeDescriptor::Label(label) => label.clone(),
            RegimeDescriptor::Detail(map) => map
                .get("current_regime")
                .and_then(ParamValue::as_text)
                .unwrap_or(DEFAULT_DETAIL_REGIME)
                .to_string(),
        }
    }

    /// Annualized volatility implied by the regime.
    pub fn implied_volatility(&self) -> f64 {
        match self {
            RegimeDescriptor::Label(label) => {
                if label.contains("HighVol") || label.contains("Crisis") {
                    0.25
                } else if label.contains("MidVol") {
                    0.18
                } else {
                    0.12
                }
            }
            RegimeDescriptor::Detail(map) => map
                .get("current_volatility")
                .and_then(ParamValue::as_f64)
                .unwrap_or(DEFAULT_DETAIL_VOLATILITY),
        }
    }

    pub fn is_crisis(&self) -> bool {
        self.name().to_lowercase().contains("crisis")
    }
}
