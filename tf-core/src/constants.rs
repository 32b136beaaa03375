//! Constants and configuration values for Thermfan
//!
//! Centralizes magic numbers, device paths, firmware command codes and
//! configuration defaults. Add new values here rather than inline.

/// System paths
pub mod paths {
    /// Proc node exposed by the i8k / dell-smm-hwmon kernel driver
    pub const I8K_DEVICE: &str = "/proc/i8k";

    /// Configuration directory
    pub const CONFIG_DIR: &str = "/etc/thermfan";

    /// Configuration file inside [`CONFIG_DIR`]
    pub const CONFIG_FILE: &str = "config.json";

    /// PID file for the daemon
    pub const PID_FILE: &str = "/run/thermfand.pid";

    /// PID file location on systems without /run
    pub const PID_FILE_FALLBACK: &str = "/var/run/thermfand.pid";
}

/// Fan levels as understood by the firmware
pub mod fan {
    /// Fan stopped
    pub const OFF: u8 = 0;

    /// Low speed
    pub const LOW: u8 = 1;

    /// High speed
    pub const HIGH: u8 = 2;

    /// Wire index of the left fan
    pub const SIDE_LEFT: u8 = 1;

    /// Wire index of the right fan
    pub const SIDE_RIGHT: u8 = 0;
}

/// Temperature handling
pub mod temperature {
    /// Largest temperature the firmware can report; anything above is garbage
    pub const MAX_REPORTED: i32 = 127;

    /// Absolute lower bound for `t_low`
    pub const MIN_THRESHOLD: i32 = 30;

    /// Absolute upper bound for `t_high`
    pub const MAX_THRESHOLD: i32 = 90;

    /// Default thresholds
    pub const DEFAULT_LOW: i32 = 45;
    pub const DEFAULT_MID: i32 = 60;
    pub const DEFAULT_HIGH: i32 = 80;
}

/// Scheduler timing (all milliseconds)
pub mod timing {
    /// Base tick of the scheduler
    pub const DEFAULT_TICK_MS: u64 = 100;

    /// Temperature control period
    pub const DEFAULT_PERIOD_MS: u64 = 1000;

    /// Fan state verification period
    pub const DEFAULT_FAN_CHECK_PERIOD_MS: u64 = 1000;

    /// Suppression window after a temperature jump
    pub const DEFAULT_JUMP_TIMEOUT_MS: u64 = 2000;

    /// Temperature rise between samples treated as a sensor glitch
    pub const DEFAULT_JUMP_TEMP_DELTA: i32 = 5;
}

/// Validation limits
pub mod limits {
    pub const MIN_TICK_MS: u64 = 10;
    pub const MAX_TICK_MS: u64 = 1000;

    pub const MIN_PERIOD_MS: u64 = 100;
    pub const MAX_PERIOD_MS: u64 = 10_000;

    pub const MAX_JUMP_TIMEOUT_MS: u64 = 60_000;

    pub const MIN_JUMP_TEMP_DELTA: i32 = 2;
    pub const MAX_JUMP_TEMP_DELTA: i32 = 50;

    /// Maximum config file size (bytes)
    pub const MAX_CONFIG_SIZE: u64 = 64 * 1024;
}

/// Mediated backend: ioctl request numbers of the i8k driver
pub mod ioctl {
    const IOC_NRBITS: u32 = 8;
    const IOC_TYPEBITS: u32 = 8;
    const IOC_SIZEBITS: u32 = 14;
    const IOC_NRSHIFT: u32 = 0;
    const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
    const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
    const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

    const IOC_WRITE: u32 = 1;
    const IOC_READ: u32 = 2;

    const I8K_MAGIC: u32 = b'i' as u32;

    const fn ioc(dir: u32, nr: u32) -> u32 {
        // The driver declares every request with size_t as the argument type
        (dir << IOC_DIRSHIFT)
            | (I8K_MAGIC << IOC_TYPESHIFT)
            | (nr << IOC_NRSHIFT)
            | ((std::mem::size_of::<usize>() as u32) << IOC_SIZESHIFT)
    }

    /// `_IOR('i', 0x84, size_t)`
    pub const GET_TEMP: u32 = ioc(IOC_READ, 0x84);

    /// `_IOWR('i', 0x86, size_t)`
    pub const GET_FAN: u32 = ioc(IOC_READ | IOC_WRITE, 0x86);

    /// `_IOWR('i', 0x87, size_t)`
    pub const SET_FAN: u32 = ioc(IOC_READ | IOC_WRITE, 0x87);
}

/// Raw backend: SMM firmware call convention
pub mod smm {
    /// Port receiving the command byte first
    pub const COMMAND_PORT: u16 = 0xb2;

    /// Port receiving the command byte second
    pub const DATA_PORT: u16 = 0x84;

    pub const GET_FAN: u32 = 0x00a3;
    pub const SET_FAN: u32 = 0x01a3;
    pub const GET_TEMP: u32 = 0x10a3;
    pub const GET_SIGNATURE_1: u32 = 0xfea3;
    pub const GET_SIGNATURE_2: u32 = 0xffa3;

    /// Firmware auto-control (disable, enable) command pairs
    pub const AUTO_CONTROL_METHOD_1: (u32, u32) = (0x30a3, 0x31a3);
    pub const AUTO_CONTROL_METHOD_2: (u32, u32) = (0x34a3, 0x35a3);
    pub const AUTO_CONTROL_METHOD_3: (u32, u32) = (0x32a3, 0x33a3);

    /// "DIAG" in eax
    pub const SIGNATURE_EAX: u32 = 0x4449_4147;

    /// "DELL" in edx
    pub const SIGNATURE_EDX: u32 = 0x4445_4c4c;

    /// Low 16 bits of eax reporting an unsupported call
    pub const FAILURE_SENTINEL: u32 = 0xffff;

    /// Sensor index of the CPU temperature
    pub const CPU_SENSOR: u32 = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ioctl_numbers_match_driver_header() {
        if std::mem::size_of::<usize>() == 8 {
            assert_eq!(ioctl::GET_TEMP, 0x8008_6984);
            assert_eq!(ioctl::GET_FAN, 0xc008_6986);
            assert_eq!(ioctl::SET_FAN, 0xc008_6987);
        } else {
            assert_eq!(ioctl::GET_TEMP, 0x8004_6984);
        }
    }

    #[test]
    fn test_signature_spells_vendor() {
        assert_eq!(&smm::SIGNATURE_EAX.to_be_bytes(), b"DIAG");
        assert_eq!(&smm::SIGNATURE_EDX.to_be_bytes(), b"DELL");
    }
}
