//! Mediated backend: the i8k kernel driver
//!
//! Every operation is a single ioctl on the driver's proc node with a small
//! `int` argument buffer. The kernel performs the firmware call and its own
//! sanity checks; we only range-check what comes back.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::{ioctl, smm, temperature};
use crate::data::{FanLevel, FanSide, Temperature};
use crate::hw::HardwareBackend;
use tf_error::{Result, ThermfanError};

/// Open handle on the i8k driver, owned for the lifetime of the daemon
#[derive(Debug)]
pub struct IoctlBackend {
    device: File,
    path: PathBuf,
}

impl IoctlBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let device = File::open(path).map_err(|source| ThermfanError::DeviceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(device = %path.display(), "Opened i8k device");
        Ok(Self { device, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Issue one request; `args` is both input and output.
    fn request(&self, name: &'static str, request: u32, args: &mut [libc::c_int]) -> Result<()> {
        // SAFETY: the fd is owned by `self.device` and stays open for the call;
        // `args` outlives the call and the driver reads/writes at most two ints,
        // which every caller provides.
        let rc = unsafe { libc::ioctl(self.device.as_raw_fd(), request as _, args.as_mut_ptr()) };
        if rc < 0 {
            return Err(ThermfanError::DeviceRequest {
                request: name,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

/// Range-check a raw temperature from either backend
pub(crate) fn checked_temperature(raw: i64) -> Result<Temperature> {
    if !(0..=temperature::MAX_REPORTED as i64).contains(&raw) {
        return Err(ThermfanError::InvalidResponse { what: "temperature", value: raw });
    }
    Ok(raw as Temperature)
}

/// Map a raw fan state from either backend
pub(crate) fn checked_fan_level(raw: i64) -> Result<FanLevel> {
    FanLevel::from_raw(raw).ok_or(ThermfanError::InvalidResponse { what: "fan level", value: raw })
}

impl HardwareBackend for IoctlBackend {
    fn name(&self) -> &'static str {
        "ioctl"
    }

    fn read_temperature(&mut self) -> Result<Temperature> {
        let mut args: [libc::c_int; 2] = [smm::CPU_SENSOR as libc::c_int, 0];
        self.request("get-temperature", ioctl::GET_TEMP, &mut args)?;
        checked_temperature(args[0] as i64)
    }

    fn read_fan(&mut self, side: FanSide) -> Result<FanLevel> {
        let mut args: [libc::c_int; 2] = [side.as_raw() as libc::c_int, 0];
        self.request("get-fan", ioctl::GET_FAN, &mut args)?;
        checked_fan_level(args[0] as i64)
    }

    fn write_fan(&mut self, side: FanSide, level: FanLevel) -> Result<()> {
        let mut args: [libc::c_int; 2] = [side.as_raw() as libc::c_int, level.as_raw() as libc::c_int];
        self.request("set-fan", ioctl::SET_FAN, &mut args)?;
        // The driver echoes the new state of the fan back in args[0]
        let echoed = checked_fan_level(args[0] as i64)?;
        if echoed != level {
            debug!(%side, requested = %level, reported = %echoed, "Fan has not settled yet");
        }
        Ok(())
    }

    fn set_firmware_auto_control(&mut self, _enabled: bool) -> Result<()> {
        Err(ThermfanError::not_supported(
            "the i8k driver cannot switch BIOS fan control; use the smm backend",
        ))
    }
}
