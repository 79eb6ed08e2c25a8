//! Actuator driving.
//!
//! The driver maps a verdict to the full output table and writes every
//! output each cycle, so a missed or reordered cycle cannot leave a stale
//! level behind. Repeating a verdict rewrites the same levels, which is
//! harmless.

use tracing::error;
use vigil_types::{Actuator, ActuatorState, HazardVerdict};

use crate::error::ActuatorFault;
use crate::traits::ActuatorPort;

/// Drives the buzzer, pump, and motor outputs from verdicts.
pub struct ActuatorDriver {
    port: Box<dyn ActuatorPort>,
    last_applied: ActuatorState,
}

impl ActuatorDriver {
    pub fn new(port: Box<dyn ActuatorPort>) -> Self {
        Self {
            port,
            last_applied: ActuatorState::off(),
        }
    }

    /// Target of the most recent write pass.
    pub fn last_applied(&self) -> ActuatorState {
        self.last_applied
    }

    /// Write the full output table for a verdict.
    ///
    /// Every output is written even when an earlier one fails; the first
    /// fault is returned after the pass completes.
    pub fn apply(
        &mut self,
        verdict: HazardVerdict,
        motion_detected: bool,
    ) -> Result<ActuatorState, ActuatorFault> {
        let target = ActuatorState::for_verdict(verdict, motion_detected);
        self.write_all(target)?;
        Ok(target)
    }

    /// Force the buzzer on after a failed write pass.
    pub fn fail_safe(&mut self) {
        if let Err(fault) = self.port.write(Actuator::Buzzer, true) {
            error!(error = %fault, "fail-safe buzzer activation failed");
        } else {
            self.last_applied.buzzer = true;
        }
    }

    /// Deactivate every output.
    pub fn shutdown(&mut self) -> Result<(), ActuatorFault> {
        self.write_all(ActuatorState::off())
    }

    fn write_all(&mut self, target: ActuatorState) -> Result<(), ActuatorFault> {
        let mut first_fault = None;
        for (actuator, on) in target.levels() {
            if let Err(fault) = self.port.write(actuator, on) {
                first_fault.get_or_insert(fault);
            }
        }
        self.last_applied = target;
        match first_fault {
            None => Ok(()),
            Some(fault) => Err(fault),
        }
    }
}
