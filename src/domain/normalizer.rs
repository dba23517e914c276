//! Parameter normalization against a strategy's declared schema.
//!
//! One configuration flows through many strategy shapes, so incoming
//! parameter sets may carry legacy keys, loosely typed values, or keys meant
//! for a different strategy. Normalization runs in a fixed order:
//!
//! 1. legacy aliases are rewritten to canonical keys (canonical keys win)
//! 2. declared keys are coerced to their kind, missing ones defaulted
//! 3. undeclared keys are dropped
//! 4. horizon spacing is enforced, then ordering constraints are checked
//!
//! Normalizing an already-normalized set returns it unchanged.

use crate::domain::error::ForwardtestError;
use crate::domain::params::{ParamValue, ParameterSet, RegimeDescriptor};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Integer { min: i64 },
    Float { min: f64, max: f64 },
    /// Regime descriptor, coerced to a label string or a detail map.
    Regime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Int(i64),
    Float(f64),
}

impl From<DefaultValue> for ParamValue {
    fn from(value: DefaultValue) -> Self {
        match value {
            DefaultValue::Int(i) => ParamValue::Int(i),
            DefaultValue::Float(f) => ParamValue::Float(f),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub default: Option<DefaultValue>,
    /// Normalization fails when a required key has neither a value nor a default.
    pub required: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum Alias {
    Rename { from: &'static str, to: &'static str },
    /// One window size expanded into short/medium/long horizons.
    Horizons { from: &'static str, keys: [&'static str; 3] },
}

/// Short/medium/long keys that must each exceed the previous by more than `min_gap`.
#[derive(Debug, Clone, Copy)]
pub struct Spacing {
    pub keys: [&'static str; 3],
    pub min_gap: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSchema {
    pub params: &'static [ParamSpec],
    pub aliases: &'static [Alias],
    /// Keys whose values must strictly increase in the listed order.
    pub ordered: &'static [&'static str],
    pub spacing: Option<Spacing>,
}

impl ParamSchema {
    pub fn spec(&self, key: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.key == key)
    }

    pub fn accepts(&self, key: &str) -> bool {
        self.spec(key).is_some()
    }
}

pub fn normalize(
    strategy: &str,
    schema: &ParamSchema,
    raw: &ParameterSet,
) -> Result<ParameterSet, ForwardtestError> {
    let mut working = raw.clone();
    apply_aliases(strategy, schema, &mut working)?;

    let mut normalized = ParameterSet::new();
    for spec in schema.params {
        match working.remove(spec.key) {
            Some(value) => {
                normalized.insert(spec.key.to_string(), coerce(strategy, spec, &value)?);
            }
            None => match spec.default {
                Some(default) => {
                    normalized.insert(spec.key.to_string(), default.into());
                }
                None if spec.required => {
                    return Err(ForwardtestError::configuration(
                        strategy,
                        format!("missing required parameter {}", spec.key),
                    ));
                }
                None => {}
            },
        }
    }

    if !working.is_empty() {
        let dropped: Vec<&String> = working.keys().collect();
        debug!(strategy, ?dropped, "dropping parameters the strategy does not accept");
    }

    if let Some(spacing) = schema.spacing {
        enforce_spacing(strategy, &spacing, &mut normalized)?;
    }
    check_ordered(strategy, schema.ordered, &normalized)?;

    Ok(normalized)
}

fn apply_aliases(
    strategy: &str,
    schema: &ParamSchema,
    params: &mut ParameterSet,
) -> Result<(), ForwardtestError> {
    for alias in schema.aliases {
        match *alias {
            Alias::Rename { from, to } => {
                if let Some(value) = params.remove(from) {
                    params.entry(to.to_string()).or_insert(value);
                }
            }
            Alias::Horizons { from, keys } => {
                let Some(value) = params.remove(from) else {
                    continue;
                };
                if keys.iter().any(|k| params.contains_key(*k)) {
                    continue;
                }
                let window = value.as_i64().filter(|w| *w >= 1).ok_or_else(|| {
                    ForwardtestError::configuration(
                        strategy,
                        format!("{} must be a positive integer, got {}", from, value),
                    )
                })?;
                let gap = schema.spacing.map(|s| s.min_gap).unwrap_or(0);
                let too_large = || {
                    ForwardtestError::configuration(
                        strategy,
                        format!("{} ({}) is too large", from, window),
                    )
                };
                let short = (window / 2).max(2);
                let medium = window.max(next_horizon(short, gap).ok_or_else(too_large)?);
                let doubled = window.checked_mul(2).ok_or_else(too_large)?;
                let long = doubled.max(next_horizon(medium, gap).ok_or_else(too_large)?);
                for (key, horizon) in keys.iter().zip([short, medium, long]) {
                    params.insert(key.to_string(), ParamValue::Int(horizon));
                }
            }
        }
    }
    Ok(())
}

fn coerce(
    strategy: &str,
    spec: &ParamSpec,
    value: &ParamValue,
) -> Result<ParamValue, ForwardtestError> {
    match spec.kind {
        ParamKind::Integer { min } => {
            let v = value.as_i64().ok_or_else(|| {
                ForwardtestError::configuration(
                    strategy,
                    format!("{} must be an integer, got {}", spec.key, value),
                )
            })?;
            if v < min {
                return Err(ForwardtestError::configuration(
                    strategy,
                    format!("{} must be at least {}, got {}", spec.key, min, v),
                ));
            }
            Ok(ParamValue::Int(v))
        }
        ParamKind::Float { min, max } => {
            let v = value.as_f64().filter(|v| v.is_finite()).ok_or_else(|| {
                ForwardtestError::configuration(
                    strategy,
                    format!("{} must be a number, got {}", spec.key, value),
                )
            })?;
            if v < min || v > max {
                return Err(ForwardtestError::configuration(
                    strategy,
                    format!("{} must be between {} and {}, got {}", spec.key, min, max, v),
                ));
            }
            Ok(ParamValue::Float(v))
        }
        ParamKind::Regime => RegimeDescriptor::from_param(value)
            .map(RegimeDescriptor::into_param)
            .ok_or_else(|| {
                ForwardtestError::configuration(
                    strategy,
                    format!(
                        "{} must be a label, a list of labels or a mapping, got {}",
                        spec.key, value
                    ),
                )
            }),
    }
}

/// Smallest horizon more than `gap` above `previous`.
fn next_horizon(previous: i64, gap: i64) -> Option<i64> {
    previous.checked_add(gap)?.checked_add(1)
}

fn enforce_spacing(
    strategy: &str,
    spacing: &Spacing,
    params: &mut ParameterSet,
) -> Result<(), ForwardtestError> {
    let mut previous: Option<i64> = None;
    for key in spacing.keys {
        let Some(current) = params.get(key).and_then(ParamValue::as_i64) else {
            continue;
        };
        let value = match previous {
            Some(prev) => {
                let floor = next_horizon(prev, spacing.min_gap).ok_or_else(|| {
                    ForwardtestError::configuration(
                        strategy,
                        format!("{} cannot be spaced above {}", key, prev),
                    )
                })?;
                if current < floor {
                    debug!(strategy, key, from = current, to = floor, "widening horizon");
                }
                current.max(floor)
            }
            None => current,
        };
        params.insert(key.to_string(), ParamValue::Int(value));
        previous = Some(value);
    }
    Ok(())
}

fn check_ordered(
    strategy: &str,
    keys: &[&str],
    params: &ParameterSet,
) -> Result<(), ForwardtestError> {
    for pair in keys.windows(2) {
        let lower = params.get(pair[0]).and_then(ParamValue::as_f64);
        let upper = params.get(pair[1]).and_then(ParamValue::as_f64);
        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo >= hi {
                return Err(ForwardtestError::configuration(
                    strategy,
                    format!("{} ({}) must be less than {} ({})", pair[0], lo, pair[1], hi),
                ));
            }
        }
    }
    Ok(())
}
