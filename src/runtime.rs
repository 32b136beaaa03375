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


//! The control loop: one interval timer, termination signals, failsafe.
//!
//! Everything runs on a current-thread runtime. A tick is synchronous, so a
//! signal can only win the `select!` between two ticks, and the failsafe
//! always has the last word on the hardware.

use std::future::Future;
use std::time::Duration;

use tf_core::{Config, Failsafe, HardwareBackend, Scheduler, TickReport};
use tf_error::{Result, ThermfanError};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Why the loop stopped
#[derive(Debug)]
pub enum Exit {
    /// Terminated by the named signal
    Signal(&'static str),
    /// A hardware call failed
    Fault(ThermfanError),
}

/// SIGINT and SIGTERM listeners, installed before the loop starts
pub struct Signals {
    interrupt: Signal,
    terminate: Signal,
}

impl Signals {
    pub fn install() -> Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

fn trace_tick(report: &TickReport, verbose: bool) {
    if !report.is_control_tick() {
        return;
    }
    if verbose {
        info!("{}", report);
    } else {
        debug!("{}", report);
    }
}

/// Tick until `shutdown` resolves or the hardware fails
pub async fn drive<B, F>(config: &Config, scheduler: &mut Scheduler, hw: &mut B, shutdown: F) -> Exit
where
    B: HardwareBackend + ?Sized,
    F: Future<Output = &'static str>,
{
    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            name = &mut shutdown => return Exit::Signal(name),
            _ = interval.tick() => {
                match scheduler.tick(hw) {
                    Ok(report) => trace_tick(&report, config.verbose),
                    Err(e) => return Exit::Fault(e),
                }
            }
        }
    }
}

/// Run the loop, then leave the hardware in its safe state.
///
/// Returns the hardware fault if one stopped the loop, otherwise the
/// failsafe's own result.
pub async fn run_until<B, F>(config: &Config, hw: &mut B, shutdown: F) -> Result<()>
where
    B: HardwareBackend + ?Sized,
    F: Future<Output = &'static str>,
{
    let failsafe = Failsafe::new(config);
    let mut scheduler = Scheduler::new(config);

    info!(
        tick_ms = config.tick_ms,
        period_ticks = config.period_ticks(),
        fan_check_ticks = config.fan_check_ticks(),
        "Control loop started"
    );
    let exit = drive(config, &mut scheduler, hw, shutdown).await;
    let state = scheduler.state();

    match exit {
        Exit::Signal(name) => {
            info!(signal = name, commanded = %state.commanded, "Shutdown requested");
            failsafe.engage(hw)
        }
        Exit::Fault(fault) => {
            error!(error = %fault, ticks = scheduler.ticks(), "Hardware failure, engaging failsafe");
            if let Err(e) = failsafe.engage(hw) {
                error!(error = %e, "Failsafe incomplete");
            }
            Err(fault)
        }
    }
}

/// Take fan control from the BIOS, then run until `shutdown` resolves.
///
/// `arm` sets up the shutdown source and runs before the hardware is
/// touched, so no termination request can land while the BIOS is switched
/// off and nothing is listening.
pub async fn supervise<B, F, A>(config: &Config, hw: &mut B, arm: A) -> Result<()>
where
    B: HardwareBackend + ?Sized,
    F: Future<Output = &'static str>,
    A: FnOnce() -> Result<F>,
{
    let shutdown = arm()?;
    let failsafe = Failsafe::new(config);
    if let Err(e) = failsafe.take_control(hw) {
        error!(error = %e, "Could not take fan control, engaging failsafe");
        if let Err(e) = failsafe.engage(hw) {
            error!(error = %e, "Failsafe incomplete");
        }
        return Err(e);
    }
    run_until(config, hw, shutdown).await
}

/// Run until SIGINT or SIGTERM
pub async fn run<B: HardwareBackend + ?Sized>(config: &Config, hw: &mut B) -> Result<()> {
    supervise(config, hw, || {
        let mut signals = Signals::install()?;
        Ok(async move { signals.recv().await })
    })
    .await
}
