//! Implausible temperature jump filter
//!
//! The embedded controller occasionally reports a single spike (a sensor
//! glitch or a very short load burst). A rise of more than `delta` degrees
//! between consecutive accepted samples is held back for a cooldown window
//! instead of spinning the fans up immediately.

use crate::data::Temperature;

/// Outcome of one observed sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Feed the sample to the policy
    Accept,
    /// Drop the sample and stop sampling for `ticks` scheduler ticks
    Suppress { ticks: u32 },
}

#[derive(Debug, Clone)]
pub struct JumpDetector {
    delta: Temperature,
    window_ticks: u32,
    baseline: Option<Temperature>,
    rebaseline: bool,
}

impl JumpDetector {
    pub fn new(delta: Temperature, window_ticks: u32) -> Self {
        Self { delta, window_ticks, baseline: None, rebaseline: false }
    }

    /// Last accepted temperature
    pub fn baseline(&self) -> Option<Temperature> {
        self.baseline
    }

    pub fn observe(&mut self, temperature: Temperature) -> Verdict {
        let baseline = match self.baseline {
            Some(baseline) if !self.rebaseline => baseline,
            // First sample ever, or first after a cooldown window
            _ => {
                self.baseline = Some(temperature);
                self.rebaseline = false;
                return Verdict::Accept;
            }
        };

        if temperature - baseline > self.delta {
            self.rebaseline = true;
            return Verdict::Suppress { ticks: self.window_ticks };
        }

        self.baseline = Some(temperature);
        Verdict::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_baseline() {
        let mut detector = JumpDetector::new(5, 20);
        assert_eq!(detector.observe(90), Verdict::Accept);
        assert_eq!(detector.baseline(), Some(90));
    }

    #[test]
    fn test_spike_is_suppressed() {
        let mut detector = JumpDetector::new(5, 20);
        assert_eq!(detector.observe(40), Verdict::Accept);
        assert_eq!(detector.observe(60), Verdict::Suppress { ticks: 20 });
        // Baseline untouched by the anomaly
        assert_eq!(detector.baseline(), Some(40));
    }

    #[test]
    fn test_delta_is_exclusive() {
        let mut detector = JumpDetector::new(5, 20);
        detector.observe(40);
        assert_eq!(detector.observe(45), Verdict::Accept);
        assert_eq!(detector.observe(51), Verdict::Suppress { ticks: 20 });
    }

    #[test]
    fn test_sample_after_window_rebaselines() {
        let mut detector = JumpDetector::new(5, 20);
        detector.observe(40);
        detector.observe(60);
        // Still far above the old baseline, accepted anyway
        assert_eq!(detector.observe(75), Verdict::Accept);
        assert_eq!(detector.baseline(), Some(75));
        assert_eq!(detector.observe(78), Verdict::Accept);
    }

    #[test]
    fn test_falling_temperature_never_suppressed() {
        let mut detector = JumpDetector::new(5, 20);
        detector.observe(90);
        assert_eq!(detector.observe(40), Verdict::Accept);
        assert_eq!(detector.baseline(), Some(40));
    }
}
