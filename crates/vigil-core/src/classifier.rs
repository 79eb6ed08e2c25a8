//! Hazard classification.
//!
//! One [`HazardClassifier`] instance holds the small amount of cycle-to-cycle
//! state the rules need: previous digital levels for edge detection, the
//! previous smoke level for debounce, and the last plausible temperature.
//!
//! Rules run strictly highest-severity-first, so a sample satisfying both the
//! fire and smoke conditions reports [`HazardVerdict::FireAlert`]. State is
//! updated every cycle before any rule fires, which means an outranked motion
//! edge is consumed and does not surface as a later theft alert.

use serde::{Deserialize, Serialize};
use vigil_types::{HazardVerdict, SensorFault, SensorSample};

/// Decision thresholds for hazard classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardThresholds {
    /// Effective temperature above which fire is reported, in °C.
    pub fire_temp_c: f32,
    /// Effective temperature above which smoke is reported, in °C.
    pub smoke_temp_c: f32,
    /// Smoke level above which a changed reading raises a smoke alert.
    pub smoke_alert_level: u8,
    /// Lowest temperature accepted as a real reading, in °C.
    pub temp_plausible_min_c: f32,
    /// Highest temperature accepted as a real reading, in °C.
    pub temp_plausible_max_c: f32,
}

impl Default for HazardThresholds {
    fn default() -> Self {
        Self {
            fire_temp_c: 50.0,
            smoke_temp_c: 35.0,
            smoke_alert_level: 128,
            temp_plausible_min_c: -50.0,
            temp_plausible_max_c: 150.0,
        }
    }
}

/// Previous digital level, for rising edge detection.
#[derive(Debug, Default, Clone, Copy)]
struct EdgeState {
    level: bool,
}

impl EdgeState {
    /// Feed the current level and report whether this is a rising edge.
    fn rising(&mut self, level: bool) -> bool {
        let rising = level && !self.level;
        self.level = level;
        rising
    }
}

/// Last plausible temperature, used when the current reading is unusable.
#[derive(Debug, Clone, Copy)]
struct TemperatureState {
    last_valid_c: f32,
}

impl Default for TemperatureState {
    fn default() -> Self {
        // Until a plausible reading arrives the rules act on 0.0°C, which
        // keeps both temperature conditions quiet.
        Self { last_valid_c: 0.0 }
    }
}

/// Outcome of classifying one sample.
#[derive(Debug)]
pub struct Classification {
    /// Fused verdict for the cycle.
    pub verdict: HazardVerdict,
    /// Temperature the rules acted on, after plausibility reconciliation.
    pub effective_temp_c: f32,
    /// Set when a present temperature reading was rejected as implausible.
    pub temperature_fault: Option<SensorFault>,
}

/// Stateful hazard classifier.
#[derive(Debug)]
pub struct HazardClassifier {
    thresholds: HazardThresholds,
    flame: EdgeState,
    motion: EdgeState,
    prev_smoke: Option<u8>,
    temperature: TemperatureState,
}

impl HazardClassifier {
    pub fn new(thresholds: HazardThresholds) -> Self {
        Self {
            thresholds,
            flame: EdgeState::default(),
            motion: EdgeState::default(),
            prev_smoke: None,
            temperature: TemperatureState::default(),
        }
    }

    /// The thresholds this classifier was built with.
    pub fn thresholds(&self) -> &HazardThresholds {
        &self.thresholds
    }

    /// The last temperature accepted as plausible, in °C.
    pub fn last_valid_temp_c(&self) -> f32 {
        self.temperature.last_valid_c
    }

    /// Classify one sample, updating edge, debounce, and temperature state.
    pub fn classify(&mut self, sample: &SensorSample) -> Classification {
        let flame_rising = self.flame.rising(sample.flame_detected);
        let motion_rising = self.motion.rising(sample.motion_detected);

        // A reading identical to the previous cycle is debounced; a change
        // to or from unknown counts as a change but carries no level.
        let smoke_changed = sample.smoke_level != self.prev_smoke;
        let smoke_high = sample
            .smoke_level
            .is_some_and(|level| level > self.thresholds.smoke_alert_level);
        self.prev_smoke = sample.smoke_level;

        let (effective_temp_c, temperature_fault) =
            self.reconcile_temperature(sample.temperature_c);

        let verdict = if flame_rising || effective_temp_c > self.thresholds.fire_temp_c {
            HazardVerdict::FireAlert
        } else if (smoke_high && smoke_changed) || effective_temp_c > self.thresholds.smoke_temp_c {
            HazardVerdict::SmokeAlert
        } else if motion_rising {
            HazardVerdict::TheftAlert
        } else {
            HazardVerdict::Clear
        };

        Classification {
            verdict,
            effective_temp_c,
            temperature_fault,
        }
    }

    /// Accept a plausible reading, or fall back to the last accepted one.
    fn reconcile_temperature(&mut self, reading: Option<f32>) -> (f32, Option<SensorFault>) {
        match reading {
            Some(value)
                if value >= self.thresholds.temp_plausible_min_c
                    && value <= self.thresholds.temp_plausible_max_c =>
            {
                self.temperature.last_valid_c = value;
                (value, None)
            }
            Some(value) => (
                self.temperature.last_valid_c,
                Some(SensorFault::OutOfRange {
                    value_c: value,
                    min_c: self.thresholds.temp_plausible_min_c,
                    max_c: self.thresholds.temp_plausible_max_c,
                }),
            ),
            None => (self.temperature.last_valid_c, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classifier() -> HazardClassifier {
        HazardClassifier::new(HazardThresholds::default())
    }

    fn quiet() -> SensorSample {
        SensorSample {
            flame_detected: false,
            motion_detected: false,
            smoke_level: Some(10),
            temperature_c: Some(20.0),
        }
    }

    // --- Verdict rules ---

    #[test]
    fn test_quiet_sample_is_clear() {
        let mut c = classifier();
        assert_eq!(c.classify(&quiet()).verdict, HazardVerdict::Clear);
    }

    #[test]
    fn test_flame_rising_edge_fires_once() {
        let mut c = classifier();
        c.classify(&quiet());
        let flame = SensorSample {
            flame_detected: true,
            ..quiet()
        };
        assert_eq!(c.classify(&flame).verdict, HazardVerdict::FireAlert);
        // Held level does not retrigger.
        assert_eq!(c.classify(&flame).verdict, HazardVerdict::Clear);
        // Releasing and raising again does.
        c.classify(&quiet());
        assert_eq!(c.classify(&flame).verdict, HazardVerdict::FireAlert);
    }

    #[test]
    fn test_held_flame_reports_fire_then_clear() {
        let mut c = classifier();
        let flame = SensorSample {
            flame_detected: true,
            ..quiet()
        };
        let verdicts: Vec<_> = (0..3).map(|_| c.classify(&flame).verdict).collect();
        assert_eq!(
            verdicts,
            [
                HazardVerdict::FireAlert,
                HazardVerdict::Clear,
                HazardVerdict::Clear
            ]
        );
    }

    #[test]
    fn test_fire_temperature_is_level_triggered() {
        let mut c = classifier();
        let hot = SensorSample {
            temperature_c: Some(80.0),
            ..quiet()
        };
        assert_eq!(c.classify(&hot).verdict, HazardVerdict::FireAlert);
        assert_eq!(c.classify(&hot).verdict, HazardVerdict::FireAlert);
    }

    #[test]
    fn test_temperature_thresholds_are_exclusive() {
        let mut c = classifier();
        // Exactly 50°C is not fire, but it does clear the smoke threshold.
        let at_fire = SensorSample {
            temperature_c: Some(50.0),
            ..quiet()
        };
        assert_eq!(c.classify(&at_fire).verdict, HazardVerdict::SmokeAlert);
        let at_smoke = SensorSample {
            temperature_c: Some(35.0),
            ..quiet()
        };
        assert_eq!(c.classify(&at_smoke).verdict, HazardVerdict::Clear);
    }

    #[test]
    fn test_smoke_level_requires_change() {
        let mut c = classifier();
        let smoky = SensorSample {
            smoke_level: Some(200),
            ..quiet()
        };
        assert_eq!(c.classify(&smoky).verdict, HazardVerdict::SmokeAlert);
        // Identical reading next cycle is debounced.
        assert_eq!(c.classify(&smoky).verdict, HazardVerdict::Clear);
        // Any different high reading retriggers.
        let smokier = SensorSample {
            smoke_level: Some(201),
            ..quiet()
        };
        assert_eq!(c.classify(&smokier).verdict, HazardVerdict::SmokeAlert);
    }

    #[test]
    fn test_smoke_threshold_is_exclusive() {
        let mut c = classifier();
        let at_threshold = SensorSample {
            smoke_level: Some(128),
            ..quiet()
        };
        assert_eq!(c.classify(&at_threshold).verdict, HazardVerdict::Clear);
    }

    #[test]
    fn test_missing_smoke_never_alerts() {
        let mut c = classifier();
        c.classify(&quiet());
        let missing = SensorSample {
            smoke_level: None,
            ..quiet()
        };
        // Transition to unknown is a change but carries no level.
        assert_eq!(c.classify(&missing).verdict, HazardVerdict::Clear);
        assert_eq!(c.classify(&missing).verdict, HazardVerdict::Clear);
    }

    #[test]
    fn test_smoke_returning_after_gap_counts_as_change() {
        let mut c = classifier();
        c.classify(&quiet());
        c.classify(&SensorSample {
            smoke_level: None,
            ..quiet()
        });
        let smoky = SensorSample {
            smoke_level: Some(200),
            ..quiet()
        };
        assert_eq!(c.classify(&smoky).verdict, HazardVerdict::SmokeAlert);
    }

    #[test]
    fn test_motion_rising_edge_raises_theft() {
        let mut c = classifier();
        c.classify(&quiet());
        let moving = SensorSample {
            motion_detected: true,
            ..quiet()
        };
        assert_eq!(c.classify(&moving).verdict, HazardVerdict::TheftAlert);
        assert_eq!(c.classify(&moving).verdict, HazardVerdict::Clear);
    }

    // --- Priority ---

    #[test]
    fn test_fire_outranks_smoke() {
        let mut c = classifier();
        let both = SensorSample {
            flame_detected: true,
            smoke_level: Some(200),
            ..quiet()
        };
        assert_eq!(c.classify(&both).verdict, HazardVerdict::FireAlert);
    }

    #[test]
    fn test_smoke_outranks_theft_and_consumes_motion_edge() {
        let mut c = classifier();
        let both = SensorSample {
            motion_detected: true,
            smoke_level: Some(200),
            ..quiet()
        };
        assert_eq!(c.classify(&both).verdict, HazardVerdict::SmokeAlert);
        // The motion edge was consumed while outranked, so held motion does
        // not raise a later theft alert.
        let motion_held = SensorSample {
            motion_detected: true,
            ..quiet()
        };
        assert_eq!(c.classify(&motion_held).verdict, HazardVerdict::Clear);
    }

    // --- Temperature reconciliation ---

    #[test]
    fn test_implausible_temperature_falls_back() {
        let mut c = classifier();
        c.classify(&quiet());
        let spike = SensorSample {
            temperature_c: Some(212.0),
            ..quiet()
        };
        let outcome = c.classify(&spike);
        assert_eq!(outcome.verdict, HazardVerdict::Clear);
        assert_eq!(outcome.effective_temp_c, 20.0);
        assert_eq!(c.last_valid_temp_c(), 20.0);
        assert!(matches!(
            outcome.temperature_fault,
            Some(SensorFault::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_missing_temperature_reuses_last_valid() {
        let mut c = classifier();
        c.classify(&SensorSample {
            temperature_c: Some(40.0),
            ..quiet()
        });
        let missing = SensorSample {
            temperature_c: None,
            ..quiet()
        };
        let outcome = c.classify(&missing);
        assert_eq!(outcome.effective_temp_c, 40.0);
        // 40°C held over still clears the smoke threshold.
        assert_eq!(outcome.verdict, HazardVerdict::SmokeAlert);
        assert!(outcome.temperature_fault.is_none());
    }

    #[test]
    fn test_initial_fallback_temperature_is_zero() {
        let mut c = classifier();
        let blind = SensorSample {
            temperature_c: None,
            ..quiet()
        };
        let outcome = c.classify(&blind);
        assert_eq!(outcome.effective_temp_c, 0.0);
        assert_eq!(outcome.verdict, HazardVerdict::Clear);
    }

    #[test]
    fn test_plausible_range_is_inclusive() {
        let mut c = classifier();
        let cold = SensorSample {
            temperature_c: Some(-50.0),
            ..quiet()
        };
        assert!(c.classify(&cold).temperature_fault.is_none());
        let hot = SensorSample {
            temperature_c: Some(150.0),
            ..quiet()
        };
        let outcome = c.classify(&hot);
        assert!(outcome.temperature_fault.is_none());
        assert_eq!(outcome.verdict, HazardVerdict::FireAlert);
    }

    #[test]
    fn test_nan_temperature_is_rejected() {
        let mut c = classifier();
        c.classify(&quiet());
        let garbled = SensorSample {
            temperature_c: Some(f32::NAN),
            ..quiet()
        };
        let outcome = c.classify(&garbled);
        assert_eq!(outcome.effective_temp_c, 20.0);
        assert!(outcome.temperature_fault.is_some());
    }

    // --- Internals ---

    #[test]
    fn test_edge_state_detects_rising_only() {
        let mut edge = EdgeState::default();
        assert!(!edge.rising(false));
        assert!(edge.rising(true));
        assert!(!edge.rising(true));
        assert!(!edge.rising(false));
        assert!(edge.rising(true));
    }

    #[test]
    fn test_default_thresholds() {
        let t = HazardThresholds::default();
        assert_eq!(t.fire_temp_c, 50.0);
        assert_eq!(t.smoke_temp_c, 35.0);
        assert_eq!(t.smoke_alert_level, 128);
        assert_eq!(t.temp_plausible_min_c, -50.0);
        assert_eq!(t.temp_plausible_max_c, 150.0);
    }

    // --- Properties ---

    proptest! {
        #[test]
        fn prop_effective_temperature_is_reading_or_fallback(
            seed in -50.0f32..=150.0,
            reading in proptest::option::of(-500.0f32..500.0),
        ) {
            let mut c = classifier();
            c.classify(&SensorSample { temperature_c: Some(seed), ..quiet() });
            let outcome = c.classify(&SensorSample { temperature_c: reading, ..quiet() });
            match reading {
                Some(v) if (-50.0..=150.0).contains(&v) => prop_assert_eq!(outcome.effective_temp_c, v),
                _ => prop_assert_eq!(outcome.effective_temp_c, seed),
            }
        }

        #[test]
        fn prop_fire_range_heat_always_wins(
            motion in any::<bool>(),
            smoke in proptest::option::of(any::<u8>()),
            temp in 50.1f32..150.0,
        ) {
            let mut c = classifier();
            let sample = SensorSample {
                flame_detected: false,
                motion_detected: motion,
                smoke_level: smoke,
                temperature_c: Some(temp),
            };
            prop_assert_eq!(c.classify(&sample).verdict, HazardVerdict::FireAlert);
        }

        #[test]
        fn prop_quiet_inputs_stay_clear(
            smoke in 0u8..=128,
            temp in -50.0f32..=35.0,
        ) {
            let mut c = classifier();
            let sample = SensorSample {
                flame_detected: false,
                motion_detected: false,
                smoke_level: Some(smoke),
                temperature_c: Some(temp),
            };
            prop_assert_eq!(c.classify(&sample).verdict, HazardVerdict::Clear);
            prop_assert_eq!(c.classify(&sample).verdict, HazardVerdict::Clear);
        }
    }
}
