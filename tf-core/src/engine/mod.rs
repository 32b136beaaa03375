//! Fan control engine modules
//!
//! Contains the level policy, the jump filter, the tick scheduler and the
//! exit failsafe.

mod failsafe;
mod jump;
mod policy;
mod scheduler;

pub use failsafe::Failsafe;
pub use jump::{JumpDetector, Verdict};
pub use policy::FanPolicy;
pub use scheduler::{ControlState, Sample, Scheduler, TickReport};
