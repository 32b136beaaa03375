//! Thermfan Core Library
//!
//! Temperature-driven control of the two fans found on Dell Inspiron and
//! Latitude class laptops.
//!
//! # Module Structure
//!
//! - `hw/` - Hardware backends (i8k driver ioctls, raw SMM calls, simulation)
//! - `data/` - Data types, settings, validation
//! - `engine/` - Policy, jump filter, tick scheduler, failsafe
//!
//! # Example
//!
//! ```
//! use tf_core::{validate_settings, Scheduler, Settings, SimulatedBackend};
//!
//! let config = validate_settings(&Settings::default()).unwrap();
//! let mut hw = SimulatedBackend::new(70);
//! let mut scheduler = Scheduler::new(&config);
//! let report = scheduler.tick(&mut hw).unwrap();
//! assert!(report.command.is_some());
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;

// Re-export primary types from data/
pub use data::{
    AutoControlMethod, BackendMode, Config, FanLevel, FanSide, PolicyMode, Settings, Temperature,
    Thresholds,
};

// Re-export validation functions from data/
pub use data::{validate_config, validate_settings, validate_thresholds};

// Re-export engine types
pub use engine::{ControlState, Failsafe, FanPolicy, JumpDetector, Sample, Scheduler, TickReport, Verdict};

// Re-export hardware types
pub use hw::{open_backend, HardwareBackend, IoctlBackend, SimulatedBackend, SmmBackend};

pub use tf_error::{Result, ThermfanError};
