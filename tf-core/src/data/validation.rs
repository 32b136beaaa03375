//! Configuration validation for Thermfan
//!
//! Runs once before the control loop starts and turns raw [`Settings`] into
//! a [`Config`].
//!
//! # Rules
//!
//! - **Thresholds**: `30 <= t_low < t_mid < t_high <= 90`
//! - **Band levels**: each in 0..=2 and non-decreasing from low to high
//! - **Periods**: tick, control and verification periods within sane
//!   millisecond ranges; verification never slower than control
//! - **Jump filter**: delta large enough that normal warm-up is not a "jump"
//! - **Selectors**: backend, policy and BIOS method must be known values
//!
//! Failures are never clamped. `skip_validation` bypasses the range checks,
//! but selectors are still parsed and a zero tick is still rejected since no
//! [`Config`] can be built from those.

use std::path::Path;

use tracing::warn;

use crate::constants::{limits, temperature};
use crate::data::types::{
    AutoControlMethod, BackendMode, Config, FanLevel, PolicyMode, Settings, Temperature, Thresholds,
};
use tf_error::{Result, ThermfanError};

/// Validates settings and builds the immutable daemon configuration
pub fn validate_settings(settings: &Settings) -> Result<Config> {
    let backend: BackendMode = settings.backend.parse()?;
    let policy: PolicyMode = settings.policy.parse()?;

    let method = AutoControlMethod::from_index(settings.bios_disable_method).ok_or_else(|| {
        ThermfanError::invalid_config(
            "bios_disable_method",
            format!("unknown method {} (expected 1, 2 or 3)", settings.bios_disable_method),
        )
    })?;

    let thresholds = Thresholds {
        t_low: settings.t_low,
        t_mid: settings.t_mid,
        t_high: settings.t_high,
        low_fan: band_level("t_low_fan", settings.t_low_fan)?,
        mid_fan: band_level("t_mid_fan", settings.t_mid_fan)?,
        high_fan: band_level("t_high_fan", settings.t_high_fan)?,
    };

    if settings.tick_ms == 0 {
        return Err(ThermfanError::invalid_config("tick_ms", "must be greater than zero"));
    }

    if settings.disable_bios && backend == BackendMode::Ioctl {
        return Err(ThermfanError::invalid_config(
            "disable_bios",
            "BIOS fan control can only be switched off with the smm backend",
        ));
    }

    let config = Config {
        thresholds,
        tick_ms: settings.tick_ms,
        period_ms: settings.period_ms,
        fan_check_period_ms: settings.fan_check_period_ms,
        jump_timeout_ms: settings.jump_timeout_ms,
        jump_temp_delta: settings.jump_temp_delta,
        backend,
        device: settings.device.clone(),
        policy,
        monitor_only: settings.monitor_only,
        auto_control: settings.disable_bios.then_some(method),
        verbose: settings.verbose,
    };

    if settings.skip_validation {
        warn!("Configuration range checks skipped on request");
        return Ok(config);
    }

    validate_config(&config)?;
    Ok(config)
}

/// Range and consistency checks on an already-typed configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_thresholds(&config.thresholds)?;

    validate_range_ms("tick_ms", config.tick_ms, limits::MIN_TICK_MS, limits::MAX_TICK_MS)?;
    validate_range_ms("period_ms", config.period_ms, limits::MIN_PERIOD_MS, limits::MAX_PERIOD_MS)?;
    validate_range_ms(
        "fan_check_period_ms",
        config.fan_check_period_ms,
        limits::MIN_PERIOD_MS,
        limits::MAX_PERIOD_MS,
    )?;
    validate_range_ms("jump_timeout_ms", config.jump_timeout_ms, 0, limits::MAX_JUMP_TIMEOUT_MS)?;

    if config.period_ms < config.tick_ms {
        return Err(ThermfanError::invalid_config(
            "period_ms",
            format!("{} ms is shorter than the {} ms tick", config.period_ms, config.tick_ms),
        ));
    }

    if config.fan_check_period_ms < config.tick_ms {
        return Err(ThermfanError::invalid_config(
            "fan_check_period_ms",
            format!("{} ms is shorter than the {} ms tick", config.fan_check_period_ms, config.tick_ms),
        ));
    }

    if config.fan_check_period_ms > config.period_ms {
        return Err(ThermfanError::invalid_config(
            "fan_check_period_ms",
            format!(
                "{} ms exceeds the control period of {} ms",
                config.fan_check_period_ms, config.period_ms
            ),
        ));
    }

    if !(limits::MIN_JUMP_TEMP_DELTA..=limits::MAX_JUMP_TEMP_DELTA).contains(&config.jump_temp_delta) {
        return Err(ThermfanError::invalid_config(
            "jump_temp_delta",
            format!(
                "{}°C is outside {}-{}°C",
                config.jump_temp_delta,
                limits::MIN_JUMP_TEMP_DELTA,
                limits::MAX_JUMP_TEMP_DELTA
            ),
        ));
    }

    if config.auto_control.is_some() && config.backend == BackendMode::Ioctl {
        return Err(ThermfanError::invalid_config(
            "disable_bios",
            "BIOS fan control can only be switched off with the smm backend",
        ));
    }

    if config.backend == BackendMode::Ioctl {
        validate_device_path(&config.device)?;
    }

    Ok(())
}

/// Validates absolute range and strict ordering of the thresholds
pub fn validate_thresholds(thresholds: &Thresholds) -> Result<()> {
    let Thresholds { t_low, t_mid, t_high, .. } = *thresholds;

    check_absolute("t_low", t_low)?;
    check_absolute("t_mid", t_mid)?;
    check_absolute("t_high", t_high)?;

    if !(t_low < t_mid && t_mid < t_high) {
        return Err(ThermfanError::invalid_config(
            "thresholds",
            format!(
                "must satisfy t_low < t_mid < t_high (got {} / {} / {})",
                t_low, t_mid, t_high
            ),
        ));
    }

    if !(thresholds.low_fan <= thresholds.mid_fan && thresholds.mid_fan <= thresholds.high_fan) {
        return Err(ThermfanError::invalid_config(
            "fan levels",
            format!(
                "band levels must not decrease with temperature (got {} / {} / {})",
                thresholds.low_fan, thresholds.mid_fan, thresholds.high_fan
            ),
        ));
    }

    Ok(())
}

fn check_absolute(field: &str, value: Temperature) -> Result<()> {
    if !(temperature::MIN_THRESHOLD..=temperature::MAX_THRESHOLD).contains(&value) {
        return Err(ThermfanError::invalid_config(
            field,
            format!(
                "{}°C is outside {}-{}°C",
                value,
                temperature::MIN_THRESHOLD,
                temperature::MAX_THRESHOLD
            ),
        ));
    }
    Ok(())
}

fn band_level(field: &str, raw: u8) -> Result<FanLevel> {
    FanLevel::from_raw(raw as i64).ok_or_else(|| {
        ThermfanError::invalid_config(field, format!("unknown fan level {} (expected 0, 1 or 2)", raw))
    })
}

fn validate_range_ms(field: &str, value: u64, min: u64, max: u64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(ThermfanError::invalid_config(
            field,
            format!("{} ms is outside {}-{} ms", value, min, max),
        ));
    }
    Ok(())
}

fn validate_device_path(path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(ThermfanError::invalid_config(
            "device",
            format!("{} is not an absolute path", path.display()),
        ));
    }
    if path.to_string_lossy().contains("..") {
        return Err(ThermfanError::invalid_config("device", "path traversal detected"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_thresholds(t_low: i32, t_mid: i32, t_high: i32) -> Settings {
        Settings { t_low, t_mid, t_high, ..Settings::default() }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = validate_settings(&Settings::default()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_threshold_ordering() {
        assert!(validate_settings(&settings_with_thresholds(45, 60, 80)).is_ok());
        assert!(validate_settings(&settings_with_thresholds(50, 45, 80)).is_err());
        assert!(validate_settings(&settings_with_thresholds(45, 45, 80)).is_err());
        assert!(validate_settings(&settings_with_thresholds(45, 80, 80)).is_err());
    }

    #[test]
    fn test_threshold_absolute_range() {
        assert!(validate_settings(&settings_with_thresholds(30, 60, 90)).is_ok());
        assert!(validate_settings(&settings_with_thresholds(29, 60, 80)).is_err());
        assert!(validate_settings(&settings_with_thresholds(45, 60, 91)).is_err());
    }

    #[test]
    fn test_band_levels() {
        let settings = Settings { t_low_fan: 1, t_mid_fan: 1, t_high_fan: 2, ..Settings::default() };
        let config = validate_settings(&settings).unwrap();
        assert_eq!(config.thresholds.low_fan, FanLevel::Low);

        let settings = Settings { t_low_fan: 2, t_mid_fan: 1, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());

        let settings = Settings { t_high_fan: 3, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_periods() {
        let settings = Settings { period_ms: 50, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());

        let settings = Settings { period_ms: 20_000, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());

        let settings = Settings { tick_ms: 5, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());

        let settings = Settings { tick_ms: 500, period_ms: 200, fan_check_period_ms: 200, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_fan_check_must_not_exceed_period() {
        let settings = Settings { period_ms: 1000, fan_check_period_ms: 1500, ..Settings::default() };
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("fan_check_period_ms"));

        let settings = Settings { period_ms: 1000, fan_check_period_ms: 500, ..Settings::default() };
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_jump_delta_too_small() {
        let settings = Settings { jump_temp_delta: 1, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());
        let settings = Settings { jump_temp_delta: 0, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_unknown_selectors() {
        let settings = Settings { backend: "acpi".into(), ..Settings::default() };
        assert!(validate_settings(&settings).is_err());

        let settings = Settings { policy: "pid".into(), ..Settings::default() };
        assert!(validate_settings(&settings).is_err());

        let settings = Settings { bios_disable_method: 4, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_disable_bios_requires_smm() {
        let settings = Settings { disable_bios: true, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());

        let settings = Settings {
            backend: "smm".into(),
            disable_bios: true,
            bios_disable_method: 2,
            ..Settings::default()
        };
        let config = validate_settings(&settings).unwrap();
        assert_eq!(config.auto_control, Some(AutoControlMethod::Method2));
    }

    #[test]
    fn test_method_ignored_unless_disabling() {
        let settings = Settings { backend: "smm".into(), bios_disable_method: 3, ..Settings::default() };
        let config = validate_settings(&settings).unwrap();
        assert_eq!(config.auto_control, None);
    }

    #[test]
    fn test_skip_validation_bypasses_ranges_only() {
        let settings = Settings { t_low: 50, t_mid: 45, skip_validation: true, ..Settings::default() };
        let config = validate_settings(&settings).unwrap();
        assert_eq!(config.thresholds.t_low, 50);

        let settings = Settings { backend: "acpi".into(), skip_validation: true, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());

        let settings = Settings { tick_ms: 0, skip_validation: true, ..Settings::default() };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_device_path() {
        let settings = Settings { device: "proc/i8k".into(), ..Settings::default() };
        assert!(validate_settings(&settings).is_err());
        let settings = Settings { device: "/proc/../etc/i8k".into(), ..Settings::default() };
        assert!(validate_settings(&settings).is_err());
    }
}
