//! Data types and validation modules
//!
//! Contains the fan/temperature vocabulary and configuration handling.

mod types;
mod validation;

pub use types::{
    AutoControlMethod, BackendMode, Config, FanLevel, FanSide, PolicyMode, Settings, Temperature,
    Thresholds,
};
pub use validation::{validate_config, validate_settings, validate_thresholds};
