//! Multi-rate tick scheduler
//!
//! One clock, three countdowns. Every tick decrements all of them (floored at
//! zero); whichever reaches zero does its work and reloads:
//!
//! ```text
//!   fan check  ──► read both fans, confirm the pending command
//!   control    ──► sample temperature ─► jump filter ─► policy ─► write
//!   jump       ──► while non-zero, control ticks skip sampling
//! ```
//!
//! The tick is synchronous and owns all mutable state, so the caller can run
//! the failsafe between two ticks without any other write racing it.

use std::fmt;

use tracing::{debug, info};

use crate::data::{Config, FanLevel, FanSide, Temperature};
use crate::engine::jump::{JumpDetector, Verdict};
use crate::engine::policy::FanPolicy;
use crate::hw::HardwareBackend;
use tf_error::Result;

/// Mutable loop state, created at loop entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    /// Last level written to the fans
    pub commanded: FanLevel,
    pub left: FanLevel,
    pub right: FanLevel,
    /// Last temperature read, accepted or not
    pub temperature: Option<Temperature>,
    /// A command was written and not yet confirmed by a fan check
    pub pending: bool,
    pub control_countdown: u32,
    pub fan_check_countdown: u32,
    pub jump_countdown: u32,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            commanded: FanLevel::Off,
            left: FanLevel::Off,
            right: FanLevel::Off,
            temperature: None,
            pending: false,
            // Both periodic operations fire on the very first tick
            control_countdown: 1,
            fan_check_countdown: 1,
            jump_countdown: 0,
        }
    }
}

/// What the control step did with the temperature this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// Not a control tick
    Idle,
    /// Control tick inside a jump cooldown window
    CoolingDown { remaining: u32 },
    Accepted(Temperature),
    /// Reading held back as an implausible jump
    Suppressed { temperature: Temperature, window: u32 },
}

/// Outcome of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub sample: Sample,
    pub fans_checked: bool,
    pub left: FanLevel,
    pub right: FanLevel,
    /// Policy decision; `None` when the policy did not run or deferred to
    /// the firmware
    pub target: Option<FanLevel>,
    /// Level written to both fans this tick
    pub command: Option<FanLevel>,
}

impl TickReport {
    pub fn is_control_tick(&self) -> bool {
        self.sample != Sample::Idle
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ", self.tick)?;
        match self.sample {
            Sample::Idle => write!(f, "--")?,
            Sample::CoolingDown { remaining } => write!(f, "cooldown({})", remaining)?,
            Sample::Accepted(t) => write!(f, "{}C", t)?,
            Sample::Suppressed { temperature, window } => {
                write!(f, "{}C jump, holding {} ticks", temperature, window)?
            }
        }
        write!(f, " fans {}/{}", self.left, self.right)?;
        if let Some(target) = self.target {
            write!(f, " target {}", target)?;
        }
        if let Some(command) = self.command {
            write!(f, " --{}--", command)?;
        }
        Ok(())
    }
}

/// Drives sampling, verification and actuation from one tick source
#[derive(Debug, Clone)]
pub struct Scheduler {
    policy: FanPolicy,
    jump: JumpDetector,
    period_ticks: u32,
    fan_check_ticks: u32,
    monitor_only: bool,
    ticks: u64,
    state: ControlState,
}

impl Scheduler {
    pub fn new(config: &Config) -> Self {
        Self {
            policy: FanPolicy::new(config.policy, config.thresholds),
            jump: JumpDetector::new(config.jump_temp_delta, config.jump_timeout_ticks()),
            period_ticks: config.period_ticks(),
            fan_check_ticks: config.fan_check_ticks(),
            monitor_only: config.monitor_only,
            ticks: 0,
            state: ControlState::default(),
        }
    }

    /// Start from a known commanded level instead of `Off`
    pub fn with_commanded(mut self, level: FanLevel) -> Self {
        self.state.commanded = level;
        self
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick. Any hardware error is returned unchanged and is fatal
    /// to the loop; the state is left as it was at the failing call.
    pub fn tick<B: HardwareBackend + ?Sized>(&mut self, hw: &mut B) -> Result<TickReport> {
        self.ticks += 1;
        let st = &mut self.state;
        st.control_countdown = st.control_countdown.saturating_sub(1);
        st.fan_check_countdown = st.fan_check_countdown.saturating_sub(1);
        st.jump_countdown = st.jump_countdown.saturating_sub(1);

        let mut fans_checked = false;
        if st.fan_check_countdown == 0 {
            st.fan_check_countdown = self.fan_check_ticks;
            st.left = hw.read_fan(FanSide::Left)?;
            st.right = hw.read_fan(FanSide::Right)?;
            if st.pending && st.left == st.commanded && st.right == st.commanded {
                debug!(level = %st.commanded, "Fans confirmed commanded level");
                st.pending = false;
            }
            fans_checked = true;
        }

        let mut sample = Sample::Idle;
        let mut target = None;
        if st.control_countdown == 0 {
            st.control_countdown = self.period_ticks;
            st.pending = false;
            if st.jump_countdown == 0 {
                let temperature = hw.read_temperature()?;
                st.temperature = Some(temperature);
                match self.jump.observe(temperature) {
                    Verdict::Accept => {
                        sample = Sample::Accepted(temperature);
                        target = self.policy.decide(temperature, st.commanded);
                    }
                    Verdict::Suppress { ticks } => {
                        info!(temperature, window_ticks = ticks, "Temperature jump, holding decisions");
                        st.jump_countdown = ticks;
                        sample = Sample::Suppressed { temperature, window: ticks };
                    }
                }
            } else {
                sample = Sample::CoolingDown { remaining: st.jump_countdown };
            }
        }

        // The control step above cleared the pending marker, so a target only
        // has to be compared against what the fans report
        let mut command = None;
        if let Some(level) = target.filter(|_| !self.monitor_only) {
            if level != st.left || level != st.right {
                for side in FanSide::ALL {
                    hw.write_fan(side, level)?;
                }
                st.commanded = level;
                st.pending = true;
                command = Some(level);
            }
        }

        Ok(TickReport {
            tick: self.ticks,
            sample,
            fans_checked,
            left: st.left,
            right: st.right,
            target,
            command,
        })
    }
}
