/*
 * This file is part of Thermfan.
 *
 * Copyright (C) 2025 Thermfan contributors
 *
 * Thermfan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Thermfan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Thermfan. If not, see <https://www.gnu.org/licenses/>.
 */


//! Thermfan Daemon (thermfand)
//!
//! Samples the CPU temperature and drives both laptop fans through the i8k
//! kernel driver or direct SMM firmware calls. On SIGINT/SIGTERM or a
//! hardware failure the fans are left at high speed and BIOS fan control is
//! handed back.

use anyhow::Context;
use tf_core::{open_backend, validate_settings, FanSide, HardwareBackend};
use tracing::{error, info, warn};

use thermfan::config::{self, Command};
use thermfan::{daemon, logging, runtime};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    eprintln!("thermfand {} - laptop fan control daemon", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    thermfand [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -c, --config PATH        Config file (default /etc/thermfan/config.json)");
    eprintln!("    -b, --backend NAME       Hardware backend: ioctl or smm");
    eprintln!("    -m, --monitor-only       Report decisions, never write to the fans");
    eprintln!("    -v, --verbose            Log every control tick at info level");
    eprintln!("        --disable-bios N     Take fan control from the BIOS (smm, method 1-3)");
    eprintln!("        --skip-validation    Accept out-of-range tunables");
    eprintln!("        --check-config       Validate, print the effective config and exit");
    eprintln!("    -V, --version            Print version");
    eprintln!("    -h, --help               Print this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    THERMFAN_CONFIG          Config file path");
    eprintln!("    THERMFAN_LOG             Log filter (trace, debug, info, warn, error)");
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        error!("PANIC at {}: {}", location, message);
        eprintln!("PANIC at {}: {}", location, message);
    }));
}

fn log_initial_state<B: HardwareBackend + ?Sized>(hw: &mut B) -> anyhow::Result<()> {
    let temperature = hw.read_temperature().context("reading initial temperature")?;
    let left = hw.read_fan(FanSide::Left).context("reading left fan")?;
    let right = hw.read_fan(FanSide::Right).context("reading right fan")?;
    info!(temperature, %left, %right, "STARTUP: Initial hardware state");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    install_panic_hook();

    let opts = match config::parse_args(std::env::args().skip(1)) {
        Ok(Command::Run(opts)) => opts,
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Command::Version) => {
            println!("thermfand {}", VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(2);
        }
    };

    let (config_path, explicit) = config::config_path(opts.config.as_deref());
    let mut settings = config::load_settings(&config_path, explicit)
        .with_context(|| format!("loading {}", config_path.display()))?;
    opts.apply(&mut settings);

    let sink = logging::init(settings.verbose);
    info!("STARTUP: thermfand {} starting", VERSION);
    info!("STARTUP: Logging to {}", sink);

    let config = validate_settings(&settings).context("invalid configuration")?;
    if opts.check_config {
        print!("{}", config);
        return Ok(());
    }
    for line in config.to_string().lines() {
        info!("CONFIG: {}", line);
    }

    daemon::harden_process();
    daemon::verify_privileges(&config)?;
    let pid_file = daemon::PidFile::create(&daemon::pid_file_path()).context("claiming PID file")?;
    info!("STARTUP: PID {}", std::process::id());

    let mut hw = open_backend(&config).context("opening fan hardware")?;
    log_initial_state(&mut *hw)?;

    if config.monitor_only {
        warn!("Monitor-only mode: fan levels will be reported, not applied");
    }

    let result = runtime::run(&config, &mut *hw).await;
    drop(pid_file);

    match result {
        Ok(()) => {
            info!("SHUTDOWN: Daemon terminated gracefully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "SHUTDOWN: Daemon terminated on error");
            Err(e.into())
        }
    }
}
