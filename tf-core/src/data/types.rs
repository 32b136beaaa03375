//! Core data types for Thermfan
//!
//! Defines the fan/temperature vocabulary, the raw [`Settings`] surface that
//! comes from the config file and command line, and the validated [`Config`]
//! the control loop runs with.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tf_error::ThermfanError;

use crate::constants::{fan, paths, smm, temperature, timing};

/// Temperature in whole degrees Celsius
pub type Temperature = i32;

/// Discrete fan speed, ordered from quietest to loudest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanLevel {
    Off,
    Low,
    High,
}

impl FanLevel {
    /// Value used on the wire by both backends
    pub fn as_raw(self) -> u8 {
        match self {
            FanLevel::Off => fan::OFF,
            FanLevel::Low => fan::LOW,
            FanLevel::High => fan::HIGH,
        }
    }

    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            r if r == fan::OFF as i64 => Some(FanLevel::Off),
            r if r == fan::LOW as i64 => Some(FanLevel::Low),
            r if r == fan::HIGH as i64 => Some(FanLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for FanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FanLevel::Off => "off",
            FanLevel::Low => "low",
            FanLevel::High => "high",
        };
        f.write_str(s)
    }
}

/// Which of the two laptop fans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FanSide {
    Left,
    Right,
}

impl FanSide {
    /// Both sides, in the order writes are issued
    pub const ALL: [FanSide; 2] = [FanSide::Left, FanSide::Right];

    pub fn as_raw(self) -> u8 {
        match self {
            FanSide::Left => fan::SIDE_LEFT,
            FanSide::Right => fan::SIDE_RIGHT,
        }
    }
}

impl fmt::Display for FanSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanSide::Left => f.write_str("left"),
            FanSide::Right => f.write_str("right"),
        }
    }
}

/// Hardware access protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// ioctl requests against the i8k kernel driver
    Ioctl,
    /// Direct SMM firmware calls through I/O ports
    Smm,
}

impl FromStr for BackendMode {
    type Err = ThermfanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ioctl" | "i8k" => Ok(BackendMode::Ioctl),
            "smm" => Ok(BackendMode::Smm),
            other => Err(ThermfanError::invalid_config(
                "backend",
                format!("unknown backend '{}' (expected 'ioctl' or 'smm')", other),
            )),
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Ioctl => f.write_str("ioctl"),
            BackendMode::Smm => f.write_str("smm"),
        }
    }
}

/// How the policy treats temperatures between the boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
    /// Full control with sticky-high hysteresis
    Override,
    /// Only force the boundary levels; hold the last command in between
    Boundary,
    /// Only force the boundary levels; follow the firmware in between
    BoundaryDefer,
}

impl FromStr for PolicyMode {
    type Err = ThermfanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "override" | "default" => Ok(PolicyMode::Override),
            "boundary" => Ok(PolicyMode::Boundary),
            "boundary-defer" | "boundary_defer" => Ok(PolicyMode::BoundaryDefer),
            other => Err(ThermfanError::invalid_config(
                "policy",
                format!(
                    "unknown policy '{}' (expected 'override', 'boundary' or 'boundary-defer')",
                    other
                ),
            )),
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyMode::Override => f.write_str("override"),
            PolicyMode::Boundary => f.write_str("boundary"),
            PolicyMode::BoundaryDefer => f.write_str("boundary-defer"),
        }
    }
}

/// Firmware command pair used to switch BIOS fan control off and back on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoControlMethod {
    Method1,
    Method2,
    Method3,
}

impl AutoControlMethod {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(AutoControlMethod::Method1),
            2 => Some(AutoControlMethod::Method2),
            3 => Some(AutoControlMethod::Method3),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            AutoControlMethod::Method1 => 1,
            AutoControlMethod::Method2 => 2,
            AutoControlMethod::Method3 => 3,
        }
    }

    /// SMM command codes as (disable, enable)
    pub fn command_pair(self) -> (u32, u32) {
        match self {
            AutoControlMethod::Method1 => smm::AUTO_CONTROL_METHOD_1,
            AutoControlMethod::Method2 => smm::AUTO_CONTROL_METHOD_2,
            AutoControlMethod::Method3 => smm::AUTO_CONTROL_METHOD_3,
        }
    }
}

/// Temperature thresholds and the level each band drives the fans to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub t_low: Temperature,
    pub t_mid: Temperature,
    pub t_high: Temperature,
    /// Level at or below `t_low`
    pub low_fan: FanLevel,
    /// Level entered from below inside `[t_mid, t_high]`
    pub mid_fan: FanLevel,
    /// Level above `t_high`, kept inside `[t_mid, t_high]` once reached
    pub high_fan: FanLevel,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            t_low: temperature::DEFAULT_LOW,
            t_mid: temperature::DEFAULT_MID,
            t_high: temperature::DEFAULT_HIGH,
            low_fan: FanLevel::Off,
            mid_fan: FanLevel::Low,
            high_fan: FanLevel::High,
        }
    }
}

/// Raw configuration surface as read from disk and the command line.
///
/// Nothing here is trusted; [`crate::validate_settings`] turns it into a
/// [`Config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// "ioctl" or "smm"
    pub backend: String,
    /// Device node for the ioctl backend
    pub device: PathBuf,
    /// "override", "boundary" or "boundary-defer"
    pub policy: String,
    pub tick_ms: u64,
    pub period_ms: u64,
    pub fan_check_period_ms: u64,
    pub jump_timeout_ms: u64,
    pub jump_temp_delta: i32,
    pub t_low: i32,
    pub t_mid: i32,
    pub t_high: i32,
    pub t_low_fan: u8,
    pub t_mid_fan: u8,
    pub t_high_fan: u8,
    /// Observe and report without ever writing to the hardware
    pub monitor_only: bool,
    /// Switch off BIOS fan control while the daemon runs
    pub disable_bios: bool,
    /// 1, 2 or 3
    pub bios_disable_method: u8,
    /// Skip range checks (selectors are still parsed)
    pub skip_validation: bool,
    /// Log the per-tick trace line at info level
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: "ioctl".to_string(),
            device: PathBuf::from(paths::I8K_DEVICE),
            policy: "override".to_string(),
            tick_ms: timing::DEFAULT_TICK_MS,
            period_ms: timing::DEFAULT_PERIOD_MS,
            fan_check_period_ms: timing::DEFAULT_FAN_CHECK_PERIOD_MS,
            jump_timeout_ms: timing::DEFAULT_JUMP_TIMEOUT_MS,
            jump_temp_delta: timing::DEFAULT_JUMP_TEMP_DELTA,
            t_low: temperature::DEFAULT_LOW,
            t_mid: temperature::DEFAULT_MID,
            t_high: temperature::DEFAULT_HIGH,
            t_low_fan: fan::OFF,
            t_mid_fan: fan::LOW,
            t_high_fan: fan::HIGH,
            monitor_only: false,
            disable_bios: false,
            bios_disable_method: 1,
            skip_validation: false,
            verbose: false,
        }
    }
}

/// Validated, immutable daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub thresholds: Thresholds,
    pub tick_ms: u64,
    pub period_ms: u64,
    pub fan_check_period_ms: u64,
    pub jump_timeout_ms: u64,
    pub jump_temp_delta: i32,
    pub backend: BackendMode,
    pub device: PathBuf,
    pub policy: PolicyMode,
    pub monitor_only: bool,
    /// `Some` when firmware auto-control is suppressed at startup
    pub auto_control: Option<AutoControlMethod>,
    pub verbose: bool,
}

impl Config {
    fn ticks(&self, ms: u64) -> u32 {
        let ticks = ms / self.tick_ms.max(1);
        u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
    }

    /// Temperature control period in ticks
    pub fn period_ticks(&self) -> u32 {
        self.ticks(self.period_ms)
    }

    /// Fan verification period in ticks
    pub fn fan_check_ticks(&self) -> u32 {
        self.ticks(self.fan_check_period_ms)
    }

    /// Jump suppression window in ticks (zero disables the window)
    pub fn jump_timeout_ticks(&self) -> u32 {
        if self.jump_timeout_ms == 0 {
            return 0;
        }
        self.ticks(self.jump_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            tick_ms: timing::DEFAULT_TICK_MS,
            period_ms: timing::DEFAULT_PERIOD_MS,
            fan_check_period_ms: timing::DEFAULT_FAN_CHECK_PERIOD_MS,
            jump_timeout_ms: timing::DEFAULT_JUMP_TIMEOUT_MS,
            jump_temp_delta: timing::DEFAULT_JUMP_TEMP_DELTA,
            backend: BackendMode::Ioctl,
            device: PathBuf::from(paths::I8K_DEVICE),
            policy: PolicyMode::Override,
            monitor_only: false,
            auto_control: None,
            verbose: false,
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.thresholds;
        writeln!(f, "backend             = {}", self.backend)?;
        if self.backend == BackendMode::Ioctl {
            writeln!(f, "device              = {}", self.device.display())?;
        }
        writeln!(f, "policy              = {}", self.policy)?;
        writeln!(
            f,
            "thresholds          = {} / {} / {} C -> {} / {} / {}",
            t.t_low, t.t_mid, t.t_high, t.low_fan, t.mid_fan, t.high_fan
        )?;
        writeln!(f, "tick                = {} ms", self.tick_ms)?;
        writeln!(f, "period              = {} ms ({} ticks)", self.period_ms, self.period_ticks())?;
        writeln!(
            f,
            "fan check period    = {} ms ({} ticks)",
            self.fan_check_period_ms,
            self.fan_check_ticks()
        )?;
        writeln!(
            f,
            "jump                = +{} C, {} ms ({} ticks)",
            self.jump_temp_delta,
            self.jump_timeout_ms,
            self.jump_timeout_ticks()
        )?;
        writeln!(f, "monitor only        = {}", self.monitor_only)?;
        match self.auto_control {
            Some(method) => writeln!(f, "bios fan control    = disabled (method {})", method.index()),
            None => writeln!(f, "bios fan control    = untouched"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_level_ordering() {
        assert!(FanLevel::Off < FanLevel::Low);
        assert!(FanLevel::Low < FanLevel::High);
        assert_eq!(FanLevel::Off.max(FanLevel::High), FanLevel::High);
    }

    #[test]
    fn test_fan_level_raw_values() {
        assert_eq!(FanLevel::from_raw(0), Some(FanLevel::Off));
        assert_eq!(FanLevel::from_raw(2), Some(FanLevel::High));
        assert_eq!(FanLevel::from_raw(3), None);
        assert_eq!(FanLevel::from_raw(-1), None);
        assert_eq!(FanLevel::Low.as_raw(), 1);
    }

    #[test]
    fn test_fan_side_wire_index() {
        assert_eq!(FanSide::Left.as_raw(), 1);
        assert_eq!(FanSide::Right.as_raw(), 0);
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!("SMM".parse::<BackendMode>().unwrap(), BackendMode::Smm);
        assert_eq!("ioctl".parse::<BackendMode>().unwrap(), BackendMode::Ioctl);
        assert!("acpi".parse::<BackendMode>().is_err());
        assert_eq!("boundary-defer".parse::<PolicyMode>().unwrap(), PolicyMode::BoundaryDefer);
        assert!("pid".parse::<PolicyMode>().is_err());
        assert_eq!(AutoControlMethod::from_index(2), Some(AutoControlMethod::Method2));
        assert_eq!(AutoControlMethod::from_index(0), None);
        assert_eq!(AutoControlMethod::from_index(4), None);
    }

    #[test]
    fn test_tick_conversion() {
        let config = Config::default();
        assert_eq!(config.period_ticks(), 10);
        assert_eq!(config.fan_check_ticks(), 10);
        assert_eq!(config.jump_timeout_ticks(), 20);

        let config = Config { period_ms: 50, jump_timeout_ms: 0, ..Config::default() };
        assert_eq!(config.period_ticks(), 1);
        assert_eq!(config.jump_timeout_ticks(), 0);
    }

    #[test]
    fn test_settings_from_partial_json() {
        let settings: Settings = serde_json::from_str(r#"{ "backend": "smm", "t_high": 85 }"#).unwrap();
        assert_eq!(settings.backend, "smm");
        assert_eq!(settings.t_high, 85);
        assert_eq!(settings.t_low, 45);
        assert_eq!(settings.tick_ms, 100);
    }

    #[test]
    fn test_settings_reject_unknown_keys() {
        let parsed: Result<Settings, _> = serde_json::from_str(r#"{ "t_lo": 40 }"#);
        assert!(parsed.is_err());
    }
}
