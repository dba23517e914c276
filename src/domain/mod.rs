//! Core domain types and logic.

pub mod ohlcv;
pub mod price_series;
pub mod indicator;
pub mod params;
pub mod signal;
pub mod strategy;
pub mod strategies;
pub mod normalizer;
pub mod registry;
pub mod simulator;
pub mod metrics;
pub mod bootstrap;
pub mod optimizer;
pub mod evaluation;
pub mod context;
pub mod walk_forward;
pub mod settings;
pub mod config_validation;
pub mod error;
