//! Sensor, verdict, and actuator data types.

use std::fmt;

/// One polled snapshot of every sensor input.
///
/// `None` in an optional field means the backing sensor could not be read
/// this cycle. Classification treats an absent smoke level as nothing to
/// report and an absent temperature like an implausible reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSample {
    /// Digital flame detector output.
    pub flame_detected: bool,
    /// PIR motion detector output.
    pub motion_detected: bool,
    /// Smoke density from the ADC, 0-255.
    pub smoke_level: Option<u8>,
    /// Probe temperature in degrees Celsius.
    pub temperature_c: Option<f32>,
}

/// Fused hazard verdict for one polling cycle.
///
/// Verdicts are ordered by severity, which allows comparisons like
/// `verdict >= HazardVerdict::SmokeAlert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum HazardVerdict {
    /// No hazard condition this cycle.
    Clear = 0,
    /// Unexpected motion with no fire or smoke indication.
    TheftAlert = 1,
    /// Elevated smoke density or smoke-range heat.
    SmokeAlert = 2,
    /// Open flame or fire-range heat.
    FireAlert = 3,
}

impl HazardVerdict {
    /// Returns `true` for any verdict other than [`HazardVerdict::Clear`].
    pub fn is_hazard(&self) -> bool {
        *self != HazardVerdict::Clear
    }

    /// The alert category escalated for this verdict, if any.
    pub fn alert_kind(&self) -> Option<AlertKind> {
        match self {
            HazardVerdict::Clear => None,
            HazardVerdict::TheftAlert => Some(AlertKind::Theft),
            HazardVerdict::SmokeAlert => Some(AlertKind::Smoke),
            HazardVerdict::FireAlert => Some(AlertKind::Fire),
        }
    }

    /// Human-readable description of the verdict.
    pub fn description(&self) -> &'static str {
        match self {
            HazardVerdict::Clear => "No hazard detected",
            HazardVerdict::TheftAlert => "Unexpected motion detected",
            HazardVerdict::SmokeAlert => "Elevated smoke level detected",
            HazardVerdict::FireAlert => "Flame or extreme heat detected",
        }
    }
}

impl fmt::Display for HazardVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HazardVerdict::Clear => "Clear",
            HazardVerdict::TheftAlert => "Theft Alert",
            HazardVerdict::SmokeAlert => "Smoke Alert",
            HazardVerdict::FireAlert => "Fire Alert",
        };
        write!(f, "{label}")
    }
}

/// Category attached to an escalated alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlertKind {
    Fire,
    Smoke,
    Theft,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Wording used verbatim in outbound alert messages.
        let label = match self {
            AlertKind::Fire => "Fire Alert",
            AlertKind::Smoke => "Smoke Alert",
            AlertKind::Theft => "Theft Alert",
        };
        write!(f, "{label}")
    }
}

/// One of the three controlled outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Actuator {
    Buzzer,
    Pump,
    Motor,
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Actuator::Buzzer => "buzzer",
            Actuator::Pump => "pump relay",
            Actuator::Motor => "motor relay",
        };
        write!(f, "{label}")
    }
}

/// Target on/off level for every actuator in one cycle.
///
/// | Verdict      | Buzzer | Pump | Motor          |
/// |--------------|--------|------|----------------|
/// | `FireAlert`  | on     | on   | follows motion |
/// | `SmokeAlert` | on     | off  | on             |
/// | `TheftAlert` | on     | off  | off            |
/// | `Clear`      | off    | off  | off            |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActuatorState {
    pub buzzer: bool,
    pub pump: bool,
    pub motor: bool,
}

impl ActuatorState {
    /// State with every output off.
    pub const fn off() -> Self {
        Self {
            buzzer: false,
            pump: false,
            motor: false,
        }
    }

    /// The full output table for a verdict.
    ///
    /// During `FireAlert` the motor output follows the motion input; every
    /// other verdict fixes all three outputs.
    pub fn for_verdict(verdict: HazardVerdict, motion_detected: bool) -> Self {
        match verdict {
            HazardVerdict::FireAlert => Self {
                buzzer: true,
                pump: true,
                motor: motion_detected,
            },
            HazardVerdict::SmokeAlert => Self {
                buzzer: true,
                pump: false,
                motor: true,
            },
            HazardVerdict::TheftAlert => Self {
                buzzer: true,
                pump: false,
                motor: false,
            },
            HazardVerdict::Clear => Self::off(),
        }
    }

    /// Per-actuator levels in a fixed write order.
    pub fn levels(&self) -> [(Actuator, bool); 3] {
        [
            (Actuator::Buzzer, self.buzzer),
            (Actuator::Pump, self.pump),
            (Actuator::Motor, self.motor),
        ]
    }

    /// Returns `true` if any output is on.
    pub fn any_active(&self) -> bool {
        self.buzzer || self.pump || self.motor
    }
}
