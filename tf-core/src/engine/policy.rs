//! Temperature to fan level mapping
//!
//! Three bands with hysteresis. In the default `override` mode:
//!
//! ```text
//!   temp <= t_low            -> low_fan
//!   t_low < temp < t_mid     -> previous command
//!   t_mid <= temp <= t_high  -> high_fan if already there, else mid_fan
//!   temp > t_high            -> high_fan
//! ```
//!
//! Once the fans reach `high_fan` they stay there until the temperature falls
//! all the way to `t_low`. The boundary modes only force the two extremes and
//! leave the dead band to the previous command (`boundary`) or to whatever
//! the firmware is doing (`boundary-defer`).

use crate::data::{FanLevel, PolicyMode, Temperature, Thresholds};

/// Stateless fan policy; all history is passed in by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanPolicy {
    mode: PolicyMode,
    thresholds: Thresholds,
}

impl FanPolicy {
    pub fn new(mode: PolicyMode, thresholds: Thresholds) -> Self {
        Self { mode, thresholds }
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Target level for `temperature`, given the last commanded level.
    ///
    /// `None` means the policy leaves the fans to the firmware this period;
    /// only `boundary-defer` does that, inside its dead band.
    pub fn decide(&self, temperature: Temperature, previous: FanLevel) -> Option<FanLevel> {
        let t = &self.thresholds;
        match self.mode {
            PolicyMode::Override => Some(if temperature <= t.t_low {
                t.low_fan
            } else if temperature > t.t_high {
                t.high_fan
            } else if temperature >= t.t_mid {
                if previous == t.high_fan {
                    t.high_fan
                } else {
                    t.mid_fan
                }
            } else {
                previous
            }),
            PolicyMode::Boundary | PolicyMode::BoundaryDefer => {
                if temperature <= t.t_low {
                    Some(t.low_fan)
                } else if temperature >= t.t_high {
                    Some(t.high_fan)
                } else if self.mode == PolicyMode::Boundary {
                    Some(previous)
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_LEVELS: [FanLevel; 3] = [FanLevel::Off, FanLevel::Low, FanLevel::High];

    fn override_policy() -> FanPolicy {
        FanPolicy::new(PolicyMode::Override, Thresholds::default())
    }

    #[test]
    fn test_at_or_below_low_is_off() {
        let policy = override_policy();
        for previous in ALL_LEVELS {
            for temp in [0, 30, 45] {
                assert_eq!(policy.decide(temp, previous), Some(FanLevel::Off));
            }
        }
    }

    #[test]
    fn test_above_high_is_high() {
        let policy = override_policy();
        for previous in ALL_LEVELS {
            assert_eq!(policy.decide(81, previous), Some(FanLevel::High));
            assert_eq!(policy.decide(127, previous), Some(FanLevel::High));
        }
    }

    #[test]
    fn test_sticky_high_in_mid_band() {
        let policy = override_policy();
        for temp in 60..=80 {
            assert_eq!(policy.decide(temp, FanLevel::High), Some(FanLevel::High));
            assert_eq!(policy.decide(temp, FanLevel::Low), Some(FanLevel::Low));
            assert_eq!(policy.decide(temp, FanLevel::Off), Some(FanLevel::Low));
        }
    }

    #[test]
    fn test_dead_band_holds_previous() {
        let policy = override_policy();
        for previous in ALL_LEVELS {
            for temp in 46..60 {
                assert_eq!(policy.decide(temp, previous), Some(previous));
            }
        }
    }

    #[test]
    fn test_reference_sequence() {
        let policy = override_policy();
        let mut commanded = FanLevel::Off;
        let mut trace = Vec::new();
        for temp in [30, 50, 65, 85, 70, 40] {
            commanded = policy.decide(temp, commanded).unwrap();
            trace.push(commanded);
        }
        assert_eq!(
            trace,
            vec![FanLevel::Off, FanLevel::Off, FanLevel::Low, FanLevel::High, FanLevel::High, FanLevel::Off]
        );
    }

    #[test]
    fn test_custom_band_levels() {
        let thresholds = Thresholds { low_fan: FanLevel::Low, mid_fan: FanLevel::High, ..Thresholds::default() };
        let policy = FanPolicy::new(PolicyMode::Override, thresholds);
        assert_eq!(policy.decide(40, FanLevel::High), Some(FanLevel::Low));
        assert_eq!(policy.decide(65, FanLevel::Low), Some(FanLevel::High));
    }

    #[test]
    fn test_boundary_modes() {
        let boundary = FanPolicy::new(PolicyMode::Boundary, Thresholds::default());
        let defer = FanPolicy::new(PolicyMode::BoundaryDefer, Thresholds::default());

        // Boundaries are identical; t_high itself already forces high
        for policy in [boundary, defer] {
            assert_eq!(policy.decide(45, FanLevel::High), Some(FanLevel::Off));
            assert_eq!(policy.decide(80, FanLevel::Off), Some(FanLevel::High));
        }

        // Dead band: hold the command, or leave the fans to the firmware
        assert_eq!(boundary.decide(65, FanLevel::Off), Some(FanLevel::Off));
        for previous in ALL_LEVELS {
            for temp in 46..80 {
                assert_eq!(defer.decide(temp, previous), None);
            }
        }
    }
}
