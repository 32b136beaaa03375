//! In-memory hardware for scenario tests and dry runs
//!
//! Temperatures are replayed from a script (the last value repeats once the
//! script runs out); fan writes settle immediately unless the fan is pinned.

use std::collections::VecDeque;

use crate::data::{FanLevel, FanSide, Temperature};
use crate::hw::HardwareBackend;
use tf_error::{Result, ThermfanError};

#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    script: VecDeque<Temperature>,
    current: Temperature,
    left: FanLevel,
    right: FanLevel,
    pinned: bool,
    fail_writes: bool,
    temperature_reads: usize,
    writes: Vec<(FanSide, FanLevel)>,
    auto_control: Vec<bool>,
}

impl SimulatedBackend {
    pub fn new(temperature: Temperature) -> Self {
        Self {
            script: VecDeque::new(),
            current: temperature,
            left: FanLevel::Off,
            right: FanLevel::Off,
            pinned: false,
            fail_writes: false,
            temperature_reads: 0,
            writes: Vec::new(),
            auto_control: Vec::new(),
        }
    }

    /// Replay `temperatures` one per read
    pub fn with_script<I: IntoIterator<Item = Temperature>>(temperatures: I) -> Self {
        let script: VecDeque<Temperature> = temperatures.into_iter().collect();
        let first = script.front().copied().unwrap_or_default();
        Self { script, ..Self::new(first) }
    }

    pub fn with_fans(mut self, left: FanLevel, right: FanLevel) -> Self {
        self.left = left;
        self.right = right;
        self
    }

    /// Queue more readings
    pub fn push_temperature(&mut self, temperature: Temperature) {
        self.script.push_back(temperature);
    }

    /// Change a fan behind the daemon's back, as the firmware would
    pub fn set_fan(&mut self, side: FanSide, level: FanLevel) {
        match side {
            FanSide::Left => self.left = level,
            FanSide::Right => self.right = level,
        }
    }

    /// Ignore writes (fan keeps reporting its old level)
    pub fn pin_fans(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn fan(&self, side: FanSide) -> FanLevel {
        match side {
            FanSide::Left => self.left,
            FanSide::Right => self.right,
        }
    }

    /// Every successful write, in order
    pub fn writes(&self) -> &[(FanSide, FanLevel)] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Every auto-control switch, `true` meaning enabled
    pub fn auto_control_log(&self) -> &[bool] {
        &self.auto_control
    }

    pub fn temperature_reads(&self) -> usize {
        self.temperature_reads
    }
}

impl HardwareBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn read_temperature(&mut self) -> Result<Temperature> {
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        self.temperature_reads += 1;
        Ok(self.current)
    }

    fn read_fan(&mut self, side: FanSide) -> Result<FanLevel> {
        Ok(self.fan(side))
    }

    fn write_fan(&mut self, side: FanSide, level: FanLevel) -> Result<()> {
        if self.fail_writes {
            return Err(ThermfanError::generic(format!("simulated write failure on {} fan", side)));
        }
        self.writes.push((side, level));
        if !self.pinned {
            self.set_fan(side, level);
        }
        Ok(())
    }

    fn set_firmware_auto_control(&mut self, enabled: bool) -> Result<()> {
        self.auto_control.push(enabled);
        Ok(())
    }
}
