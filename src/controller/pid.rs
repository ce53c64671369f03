//! PID feedback on the glucose error signal.
//!
//! Each minute the controller forms the error `e = target - G` and corrects
//! the configured basal rate with proportional, integral and derivative
//! terms. The error accumulates as `e / 60` per one-minute call so the
//! integral matches the hourly units of the infusion rate, and the
//! derivative scales the per-minute error change by 60 for the same reason.
//! The raw law is emitted as-is: no clamping and no anti-windup, so the rate
//! can go negative under a large positive error. Hosts that need a
//! non-negative pump command clamp at the pump model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::announcement::CarbAnnouncer;
use crate::controller::{BolusConfig, Controller, Treatment};
use crate::error::{ContractError, LoopResult, ValidationError};
use crate::observation::Observation;
use crate::profile::PatientProfile;
use crate::time::SimTime;

/// Parameters of the PID strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    /// Equilibrium infusion rate in U/h, emitted at zero error.
    pub basal_rate: f64,
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Glucose setpoint in mg/dl.
    pub target: f64,
    /// Announcement-driven bolus parameters.
    pub bolus: BolusConfig,
}

impl PidConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the basal rate is negative, any
    /// parameter is non-finite, or the bolus parameters are invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("basal_rate", self.basal_rate),
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("target", self.target),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { name, value });
            }
        }
        if self.basal_rate < 0.0 {
            return Err(ValidationError::Negative {
                name: "basal_rate",
                value: self.basal_rate,
            });
        }
        self.bolus.validate()
    }
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            basal_rate: 1.0,
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            target: 100.0,
            bolus: BolusConfig::disabled(),
        }
    }
}

/// Per-run feedback state: the integral accumulator and the previous error.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PidState {
    integral: f64,
    prev_error: Option<f64>,
}

/// The PID controller.
#[derive(Debug)]
pub struct PidController {
    cfg: PidConfig,
    announced: CarbAnnouncer,
    state: Option<PidState>,
}

impl PidController {
    /// Creates a controller from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the configuration is invalid.
    pub fn new(cfg: PidConfig) -> LoopResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            announced: CarbAnnouncer::none(),
            state: None,
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &PidConfig {
        &self.cfg
    }
}

impl Controller for PidController {
    fn set_patient(&mut self, _patient: Arc<PatientProfile>) {
        // The feedback law runs entirely on its own configuration.
    }

    fn set_announced_carbs(&mut self, announced: CarbAnnouncer) {
        self.announced = announced;
    }

    fn reset(&mut self) {
        self.state = Some(PidState::default());
    }

    fn compute_treatment(&mut self, t: SimTime, y: &Observation, _x: f64) -> LoopResult<Treatment> {
        let Some(state) = self.state.as_mut() else {
            return Err(ContractError::ResetRequired { strategy: "pid" }.into());
        };

        let ibolus = self.cfg.bolus.units_at(t, &self.announced);

        let e = self.cfg.target - y.glucose;
        state.integral += e / 60.0;

        let mut u = self.cfg.basal_rate - self.cfg.kp * e - self.cfg.ki * state.integral;
        // No derivative contribution on the first call of a run.
        if let Some(prev) = state.prev_error {
            u -= self.cfg.kd * (e - prev) * 60.0;
        }
        state.prev_error = Some(e);

        trace!(t = t.minutes(), error = e, iir = u, "pid step");

        Ok(Treatment {
            iir: u,
            ibolus,
            log: None,
        })
    }
}
