//! Built-in strategy generators.
//!
//! Each module exposes a `NAME`, a static parameter `SCHEMA` and a unit
//! struct implementing [`crate::domain::strategy::SignalGenerator`].

pub mod kama_trend;
pub mod momentum;
pub mod multi_horizon;
pub mod regime_switch;
pub mod sma_trend;
pub mod vol_adjusted;
