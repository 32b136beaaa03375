//! Safe hardware end state
//!
//! Whatever ends the daemon, the fans are left at full speed and the BIOS is
//! given its fan control back if we took it away at startup.

use tracing::{error, info, warn};

use crate::data::{AutoControlMethod, Config, FanLevel, FanSide};
use crate::hw::HardwareBackend;
use tf_error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failsafe {
    monitor_only: bool,
    /// Method used to suppress BIOS control, to be undone on exit
    restore: Option<AutoControlMethod>,
}

impl Failsafe {
    pub fn new(config: &Config) -> Self {
        Self {
            monitor_only: config.monitor_only,
            restore: if config.monitor_only { None } else { config.auto_control },
        }
    }

    pub fn restores_auto_control(&self) -> bool {
        self.restore.is_some()
    }

    /// Switch off BIOS fan control if configured. Called once before the loop.
    pub fn take_control<B: HardwareBackend + ?Sized>(&self, hw: &mut B) -> Result<()> {
        if let Some(method) = self.restore {
            hw.set_firmware_auto_control(false)?;
            info!(method = method.index(), "BIOS fan control disabled");
        }
        Ok(())
    }

    /// Drive both fans to high and hand control back to the BIOS.
    ///
    /// Every step is attempted; the first failure is returned.
    pub fn engage<B: HardwareBackend + ?Sized>(&self, hw: &mut B) -> Result<()> {
        if self.monitor_only {
            info!("Monitor-only mode, leaving fans untouched");
            return Ok(());
        }

        let mut first_error = None;
        for side in FanSide::ALL {
            if let Err(e) = hw.write_fan(side, FanLevel::High) {
                error!(%side, error = %e, "Failsafe could not raise fan");
                first_error.get_or_insert(e);
            }
        }

        if self.restore.is_some() {
            match hw.set_firmware_auto_control(true) {
                Ok(()) => info!("BIOS fan control restored"),
                Err(e) => {
                    error!(error = %e, "Failsafe could not restore BIOS fan control");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                warn!("Fans left at high speed");
                Ok(())
            }
        }
    }
}
