//! Hardware interaction modules
//!
//! - `ioctl`: requests against the i8k kernel driver's proc node
//! - `smm`: direct SMM firmware calls through privileged I/O ports
//! - `sim`: in-memory backend for tests and dry runs
//!
//! Both real backends implement [`HardwareBackend`]; the engine never knows
//! which one it is talking to.

pub mod ioctl;
pub mod sim;
pub mod smm;

use tracing::info;

use crate::data::{AutoControlMethod, BackendMode, Config, FanLevel, FanSide, Temperature};
use tf_error::Result;

pub use ioctl::IoctlBackend;
pub use sim::SimulatedBackend;
pub use smm::{check_response, PrivilegedPorts, SmmBackend, SmmPort, SmmRegisters};

/// Uniform capability surface of the fan hardware
#[cfg_attr(test, mockall::automock)]
pub trait HardwareBackend {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Current CPU temperature
    fn read_temperature(&mut self) -> Result<Temperature>;

    /// Level the firmware reports for one fan
    fn read_fan(&mut self, side: FanSide) -> Result<FanLevel>;

    /// Command one fan to a level
    fn write_fan(&mut self, side: FanSide, level: FanLevel) -> Result<()>;

    /// Switch the firmware's own fan management on or off
    fn set_firmware_auto_control(&mut self, enabled: bool) -> Result<()>;
}

impl<B: HardwareBackend + ?Sized> HardwareBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read_temperature(&mut self) -> Result<Temperature> {
        (**self).read_temperature()
    }

    fn read_fan(&mut self, side: FanSide) -> Result<FanLevel> {
        (**self).read_fan(side)
    }

    fn write_fan(&mut self, side: FanSide, level: FanLevel) -> Result<()> {
        (**self).write_fan(side, level)
    }

    fn set_firmware_auto_control(&mut self, enabled: bool) -> Result<()> {
        (**self).set_firmware_auto_control(enabled)
    }
}

/// Acquire the hardware handle selected by the configuration.
///
/// Failures here are initialization errors and are never retried.
pub fn open_backend(config: &Config) -> Result<Box<dyn HardwareBackend>> {
    let backend: Box<dyn HardwareBackend> = match config.backend {
        BackendMode::Ioctl => Box::new(IoctlBackend::open(&config.device)?),
        BackendMode::Smm => {
            let method = config.auto_control.unwrap_or(AutoControlMethod::Method1);
            Box::new(SmmBackend::open()?.with_auto_control(method))
        }
    };
    info!(backend = backend.name(), "Hardware backend ready");
    Ok(backend)
}
