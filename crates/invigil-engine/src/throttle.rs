//! Violation Throttle & Dedup
//!
//! Per-session cooldown keyed by violation type, plus a used-this-frame set
//! that keeps multiple code paths from raising the same type twice within one
//! orchestration pass.

use std::collections::{HashMap, HashSet};

use crate::domain::{dt_us, sec_to_us, ViolationType};

pub struct ViolationThrottle {
    cooldown_us: u64,
    last_fired: HashMap<ViolationType, i64>,
    fired_this_frame: HashSet<ViolationType>,
}

impl ViolationThrottle {
    pub fn new(cooldown_sec: f32) -> Self {
        Self {
            cooldown_us: sec_to_us(cooldown_sec),
            last_fired: HashMap::new(),
            fired_this_frame: HashSet::new(),
        }
    }

    /// Clear the same-frame dedup set. Call at the start of every pass.
    pub fn begin_frame(&mut self) {
        self.fired_this_frame.clear();
    }

    /// Whether a candidate of this type may be emitted now. Emission is
    /// recorded on success, so a second call in the same frame returns false.
    pub fn should_emit(&mut self, violation_type: ViolationType, now_us: i64) -> bool {
        if self.fired_this_frame.contains(&violation_type) {
            return false;
        }
        if let Some(&last) = self.last_fired.get(&violation_type) {
            if dt_us(now_us, last) < self.cooldown_us {
                return false;
            }
        }
        self.last_fired.insert(violation_type, now_us);
        self.fired_this_frame.insert(violation_type);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SEC: i64 = 1_000_000;

    #[test]
    fn test_cooldown_blocks_early_repeat() {
        let mut throttle = ViolationThrottle::new(12.0);

        throttle.begin_frame();
        assert!(throttle.should_emit(ViolationType::PhoneDetected, 0));

        throttle.begin_frame();
        assert!(!throttle.should_emit(ViolationType::PhoneDetected, 11 * SEC));

        throttle.begin_frame();
        assert!(throttle.should_emit(ViolationType::PhoneDetected, 12 * SEC));
    }

    #[test]
    fn test_same_frame_dedup() {
        let mut throttle = ViolationThrottle::new(12.0);
        throttle.begin_frame();
        assert!(throttle.should_emit(ViolationType::LookingAway, 0));
        assert!(!throttle.should_emit(ViolationType::LookingAway, 0));
        // A different type is independent
        assert!(throttle.should_emit(ViolationType::NoPerson, 0));
    }

    #[test]
    fn test_blocked_candidate_does_not_refresh_cooldown() {
        let mut throttle = ViolationThrottle::new(12.0);
        throttle.begin_frame();
        assert!(throttle.should_emit(ViolationType::NoPerson, 0));

        // Rejected attempts must not push the window forward
        throttle.begin_frame();
        assert!(!throttle.should_emit(ViolationType::NoPerson, 6 * SEC));
        throttle.begin_frame();
        assert!(throttle.should_emit(ViolationType::NoPerson, 12 * SEC));
    }

    #[test]
    fn test_clock_regression_blocks() {
        let mut throttle = ViolationThrottle::new(12.0);
        throttle.begin_frame();
        assert!(throttle.should_emit(ViolationType::MultipleFaces, 20 * SEC));
        throttle.begin_frame();
        assert!(!throttle.should_emit(ViolationType::MultipleFaces, 5 * SEC));
    }

    proptest! {
        /// No two accepted emissions of one type closer than the cooldown,
        /// regardless of how candidates arrive.
        #[test]
        fn prop_accepted_emissions_respect_cooldown(
            mut offsets in prop::collection::vec(0i64..40_000_000, 1..80),
            cooldown_sec in 1.0f32..20.0,
        ) {
            offsets.sort_unstable();
            let mut throttle = ViolationThrottle::new(cooldown_sec);
            let cooldown_us = (cooldown_sec as f64 * 1e6) as i64;

            let mut accepted = Vec::new();
            for now in offsets {
                throttle.begin_frame();
                if throttle.should_emit(ViolationType::EyeMovement, now) {
                    accepted.push(now);
                }
            }
            for pair in accepted.windows(2) {
                prop_assert!(pair[1] - pair[0] >= cooldown_us);
            }
        }
    }
}
