/*
 * Integration tests for Thermfan
 *
 * These tests drive the daemon pieces together: settings from disk through
 * validation into the control loop, and the exit paths of that loop.
 */

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mockall::mock;
use serial_test::serial;
use tempfile::NamedTempFile;

use tf_core::{
    validate_settings, AutoControlMethod, BackendMode, Config, Failsafe, FanLevel, FanSide,
    HardwareBackend, PolicyMode, SimulatedBackend, Temperature,
};
use tf_error::{Result, ThermfanError};
use thermfan::config::{self, CliOptions, CONFIG_ENV};
use thermfan::runtime;

mock! {
    pub Hw {}
    impl HardwareBackend for Hw {
        fn name(&self) -> &'static str;
        fn read_temperature(&mut self) -> Result<Temperature>;
        fn read_fan(&mut self, side: FanSide) -> Result<FanLevel>;
        fn write_fan(&mut self, side: FanSide, level: FanLevel) -> Result<()>;
        fn set_firmware_auto_control(&mut self, enabled: bool) -> Result<()>;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Write(FanSide, FanLevel),
    AutoControl(bool),
}

/// Mock hardware that records every write and auto-control switch in order
fn recording_hw(temperature: Temperature, log: Arc<Mutex<Vec<Event>>>) -> MockHw {
    let fans = Arc::new(Mutex::new([FanLevel::Off; 2]));
    let mut hw = MockHw::new();
    hw.expect_name().return_const("mock");
    hw.expect_read_temperature().returning(move || Ok(temperature));

    let read_fans = fans.clone();
    hw.expect_read_fan()
        .returning(move |side| Ok(read_fans.lock().unwrap()[side.as_raw() as usize]));

    let write_log = log.clone();
    hw.expect_write_fan().returning(move |side, level| {
        fans.lock().unwrap()[side.as_raw() as usize] = level;
        write_log.lock().unwrap().push(Event::Write(side, level));
        Ok(())
    });
    hw.expect_set_firmware_auto_control().returning(move |enabled| {
        log.lock().unwrap().push(Event::AutoControl(enabled));
        Ok(())
    });
    hw
}

async fn after(ms: u64) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "test"
}

fn fast(config: Config) -> Config {
    Config { tick_ms: 10, period_ms: 10, fan_check_period_ms: 10, ..config }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", json).unwrap();
    file
}

#[tokio::test]
async fn test_config_file_drives_loop() {
    let file = write_config(
        r#"{
            "policy": "override",
            "tick_ms": 10,
            "period_ms": 100,
            "fan_check_period_ms": 100,
            "t_low": 40,
            "t_mid": 55,
            "t_high": 75
        }"#,
    );
    let settings = config::load_settings(file.path(), true).unwrap();
    let config = validate_settings(&settings).unwrap();
    assert_eq!(config.period_ticks(), 10);

    let mut hw = SimulatedBackend::new(58);
    runtime::run_until(&config, &mut hw, after(60)).await.unwrap();

    // 58C is in the mid band with these thresholds; then the failsafe
    assert_eq!(
        hw.writes(),
        &[
            (FanSide::Left, FanLevel::Low),
            (FanSide::Right, FanLevel::Low),
            (FanSide::Left, FanLevel::High),
            (FanSide::Right, FanLevel::High),
        ]
    );
}

#[tokio::test]
async fn test_failsafe_after_low_with_bios_suppressed() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut hw = recording_hw(65, log.clone());
    let config = fast(Config {
        backend: BackendMode::Smm,
        auto_control: Some(AutoControlMethod::Method2),
        ..Config::default()
    });

    Failsafe::new(&config).take_control(&mut hw).unwrap();
    runtime::run_until(&config, &mut hw, after(50)).await.unwrap();

    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            Event::AutoControl(false),
            Event::Write(FanSide::Left, FanLevel::Low),
            Event::Write(FanSide::Right, FanLevel::Low),
            Event::Write(FanSide::Left, FanLevel::High),
            Event::Write(FanSide::Right, FanLevel::High),
            Event::AutoControl(true),
        ]
    );
}

#[tokio::test]
async fn test_signal_pending_at_startup_still_restores_bios() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut hw = recording_hw(65, log.clone());
    let config = fast(Config {
        backend: BackendMode::Smm,
        auto_control: Some(AutoControlMethod::Method1),
        ..Config::default()
    });

    runtime::supervise(&config, &mut hw, || Ok(std::future::ready("SIGTERM"))).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            Event::AutoControl(false),
            Event::Write(FanSide::Left, FanLevel::High),
            Event::Write(FanSide::Right, FanLevel::High),
            Event::AutoControl(true),
        ]
    );
}

#[tokio::test]
async fn test_hardware_error_engages_failsafe_and_fails() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut hw = MockHw::new();
    hw.expect_read_fan().returning(|_| Ok(FanLevel::Low));
    hw.expect_read_temperature().returning(|| {
        Err(ThermfanError::DeviceRequest {
            request: "get-temperature",
            source: std::io::Error::new(std::io::ErrorKind::Other, "embedded controller timeout"),
        })
    });
    let write_log = log.clone();
    hw.expect_write_fan().returning(move |side, level| {
        write_log.lock().unwrap().push(Event::Write(side, level));
        Ok(())
    });
    let auto_log = log.clone();
    hw.expect_set_firmware_auto_control().returning(move |enabled| {
        auto_log.lock().unwrap().push(Event::AutoControl(enabled));
        Ok(())
    });

    let config = fast(Config {
        backend: BackendMode::Smm,
        auto_control: Some(AutoControlMethod::Method1),
        ..Config::default()
    });
    let err = runtime::run_until(&config, &mut hw, after(5_000)).await.unwrap_err();

    assert!(matches!(err, ThermfanError::DeviceRequest { request: "get-temperature", .. }));
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            Event::Write(FanSide::Left, FanLevel::High),
            Event::Write(FanSide::Right, FanLevel::High),
            Event::AutoControl(true),
        ]
    );
}

#[tokio::test]
async fn test_monitor_only_never_touches_fans() {
    let mut hw = MockHw::new();
    hw.expect_read_fan().returning(|_| Ok(FanLevel::Off));
    hw.expect_read_temperature().returning(|| Ok(95));
    hw.expect_write_fan().never();
    hw.expect_set_firmware_auto_control().never();

    let config = fast(Config { monitor_only: true, ..Config::default() });
    Failsafe::new(&config).take_control(&mut hw).unwrap();
    runtime::run_until(&config, &mut hw, after(40)).await.unwrap();
}

#[test]
fn test_boundary_defer_follows_firmware() {
    let mut hw = SimulatedBackend::new(65).with_fans(FanLevel::High, FanLevel::Low);
    let config = fast(Config { policy: PolicyMode::BoundaryDefer, ..Config::default() });

    let mut scheduler = tf_core::Scheduler::new(&config);
    for _ in 0..5 {
        scheduler.tick(&mut hw).unwrap();
    }
    // Dead band defers to whatever the firmware chose
    assert!(hw.writes().is_empty());

    assert_eq!(hw.fan(FanSide::Right), FanLevel::Low);

    hw.push_temperature(40);
    scheduler.tick(&mut hw).unwrap();
    assert_eq!(hw.fan(FanSide::Left), FanLevel::Off);
    assert_eq!(hw.fan(FanSide::Right), FanLevel::Off);
}

#[test]
fn test_invalid_files_rejected_at_startup() {
    let unordered = write_config(r#"{ "t_low": 50, "t_mid": 45, "t_high": 80 }"#);
    let settings = config::load_settings(unordered.path(), true).unwrap();
    assert!(validate_settings(&settings).unwrap_err().is_config());

    let ioctl_bios = write_config(r#"{ "backend": "ioctl", "disable_bios": true }"#);
    let settings = config::load_settings(ioctl_bios.path(), true).unwrap();
    assert!(validate_settings(&settings).is_err());

    let unknown_backend = write_config(r#"{ "backend": "acpi" }"#);
    let settings = config::load_settings(unknown_backend.path(), true).unwrap();
    assert!(validate_settings(&settings).is_err());
}

#[test]
fn test_cli_overrides_file() {
    let file = write_config(r#"{ "backend": "ioctl", "t_high": 85 }"#);
    let mut settings = config::load_settings(file.path(), true).unwrap();

    let opts = CliOptions { backend: Some("smm".into()), disable_bios: Some(2), ..CliOptions::default() };
    opts.apply(&mut settings);

    let config = validate_settings(&settings).unwrap();
    assert_eq!(config.backend, BackendMode::Smm);
    assert_eq!(config.auto_control, Some(AutoControlMethod::Method2));
    assert_eq!(config.thresholds.t_high, 85);
}

#[test]
#[serial]
fn test_config_path_resolution() {
    std::env::remove_var(CONFIG_ENV);
    assert_eq!(config::config_path(None), (config::default_config_path(), false));

    std::env::set_var(CONFIG_ENV, "/tmp/thermfan-env.json");
    assert_eq!(config::config_path(None), (PathBuf::from("/tmp/thermfan-env.json"), true));

    // Command line wins over the environment
    let cli = Path::new("/tmp/thermfan-cli.json");
    assert_eq!(config::config_path(Some(cli)), (cli.to_path_buf(), true));

    std::env::remove_var(CONFIG_ENV);
}

#[test]
#[serial]
fn test_env_config_file_loaded() {
    let file = write_config(r#"{ "policy": "boundary", "verbose": true }"#);
    std::env::set_var(CONFIG_ENV, file.path());

    let (path, explicit) = config::config_path(None);
    let settings = config::load_settings(&path, explicit).unwrap();
    let config = validate_settings(&settings).unwrap();
    assert_eq!(config.policy, PolicyMode::Boundary);
    assert!(config.verbose);

    std::env::remove_var(CONFIG_ENV);
}
