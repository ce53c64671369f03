//! The controller contract and the three dosing strategies.
//!
//! Every strategy answers the same question once per simulated minute: what
//! insulin infusion rate and bolus should be applied right now? The host
//! drives the active strategy through the [`Controller`] trait; strategy
//! selection happens at construction time via [`DosingStrategy`], so there is
//! no "no strategy selected" state to guard against at runtime.

mod basal_bolus;
mod oref0;
mod pid;

pub use basal_bolus::{BasalBolusConfig, BasalBolusController};
pub use oref0::{Oref0Controller, RunId};
pub use pid::{PidConfig, PidController};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::announcement::CarbAnnouncer;
use crate::diagnostics::CycleLog;
use crate::error::{LoopResult, ValidationError};
use crate::observation::Observation;
use crate::profile::PatientProfile;
use crate::time::SimTime;

/// The dosing decision for one simulated minute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Treatment {
    /// Insulin infusion rate to apply for this minute, in U/h.
    pub iir: f64,
    /// Bolus to deliver this minute, in U.
    pub ibolus: f64,
    /// Diagnostic output, populated only on decision cycles.
    #[serde(rename = "logData", skip_serializing_if = "Option::is_none")]
    pub log: Option<CycleLog>,
}

/// Shared bolus parameters used by every strategy that pre-boluses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BolusConfig {
    /// Whether announcement-driven boluses are delivered at all.
    pub use_bolus: bool,
    /// Lead time between the bolus and the announced meal, in minutes.
    pub pre_bolus_min: i64,
    /// Insulin units per 10 g of announced carbohydrate.
    pub carb_factor: f64,
}

impl BolusConfig {
    /// Bolusing switched off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            use_bolus: false,
            pre_bolus_min: 0,
            carb_factor: 0.0,
        }
    }

    /// Bolusing with the given lead time and carb factor.
    #[must_use]
    pub const fn enabled(pre_bolus_min: i64, carb_factor: f64) -> Self {
        Self {
            use_bolus: true,
            pre_bolus_min,
            carb_factor,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the carb factor is negative or
    /// non-finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.carb_factor.is_finite() {
            return Err(ValidationError::NonFinite {
                name: "carb_factor",
                value: self.carb_factor,
            });
        }
        if self.carb_factor < 0.0 {
            return Err(ValidationError::Negative {
                name: "carb_factor",
                value: self.carb_factor,
            });
        }
        Ok(())
    }

    /// Bolus size for minute `t`: the carbs announced `pre_bolus_min` ahead,
    /// scaled by the carb factor per 10 g. Zero when bolusing is off.
    #[must_use]
    pub fn units_at(&self, t: SimTime, announced: &CarbAnnouncer) -> f64 {
        if !self.use_bolus {
            return 0.0;
        }
        announced.grams_at(t.offset(self.pre_bolus_min)) / 10.0 * self.carb_factor
    }
}

impl Default for BolusConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Common interface every dosing strategy implements.
///
/// # Calling contract
///
/// The host calls [`compute_treatment`](Self::compute_treatment) once per
/// simulated minute with strictly increasing `t`, starting at 0, after a
/// single [`reset`](Self::reset). Calls are never concurrent or re-entrant.
/// `compute_treatment` before `reset` fails fast; behavior under
/// non-monotonic `t` is undefined for the stateless strategies, while the
/// history-keeping adapter rejects it outright rather than corrupt its
/// buffers.
pub trait Controller {
    /// Binds the read-only patient parameters.
    fn set_patient(&mut self, patient: Arc<PatientProfile>);

    /// Installs the carb-announcement oracle used for bolus lookahead.
    fn set_announced_carbs(&mut self, announced: CarbAnnouncer);

    /// Clears all per-run state. Must be called before the first
    /// `compute_treatment` of a run; calling it again is safe and starts a
    /// fresh run.
    fn reset(&mut self);

    /// Computes the dosing decision for minute `t`.
    ///
    /// `x` is the host's patient-model state scalar; it is reserved and not
    /// consulted by any current strategy.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ContractError`] on calling-contract
    /// violations and a [`crate::error::EngineError`] when the external
    /// decision engine fails.
    fn compute_treatment(
        &mut self,
        t: SimTime,
        y: &Observation,
        x: f64,
    ) -> LoopResult<Treatment>;
}

/// A dosing strategy selected at construction time.
#[derive(Debug)]
pub enum DosingStrategy {
    /// Open-loop constant basal with announcement-driven boluses.
    BasalBolus(BasalBolusController),
    /// Continuous PID feedback on the glucose error.
    Pid(PidController),
    /// Adapter around the external rule-based decision engine.
    Oref0(Oref0Controller),
}

impl Controller for DosingStrategy {
    fn set_patient(&mut self, patient: Arc<PatientProfile>) {
        match self {
            Self::BasalBolus(c) => c.set_patient(patient),
            Self::Pid(c) => c.set_patient(patient),
            Self::Oref0(c) => c.set_patient(patient),
        }
    }

    fn set_announced_carbs(&mut self, announced: CarbAnnouncer) {
        match self {
            Self::BasalBolus(c) => c.set_announced_carbs(announced),
            Self::Pid(c) => c.set_announced_carbs(announced),
            Self::Oref0(c) => c.set_announced_carbs(announced),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::BasalBolus(c) => c.reset(),
            Self::Pid(c) => c.reset(),
            Self::Oref0(c) => c.reset(),
        }
    }

    fn compute_treatment(&mut self, t: SimTime, y: &Observation, x: f64) -> LoopResult<Treatment> {
        match self {
            Self::BasalBolus(c) => c.compute_treatment(t, y, x),
            Self::Pid(c) => c.compute_treatment(t, y, x),
            Self::Oref0(c) => c.compute_treatment(t, y, x),
        }
    }
}

impl From<BasalBolusController> for DosingStrategy {
    fn from(controller: BasalBolusController) -> Self {
        Self::BasalBolus(controller)
    }
}

impl From<PidController> for DosingStrategy {
    fn from(controller: PidController) -> Self {
        Self::Pid(controller)
    }
}

impl From<Oref0Controller> for DosingStrategy {
    fn from(controller: Oref0Controller) -> Self {
        Self::Oref0(controller)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn bolus_units_follow_the_lookahead_formula() {
        let mut schedule = BTreeMap::new();
        schedule.insert(SimTime::from_minutes(30), 40.0);
        let announced = CarbAnnouncer::from_schedule(schedule);

        let bolus = BolusConfig::enabled(15, 1.0);
        assert_eq!(bolus.units_at(SimTime::from_minutes(15), &announced), 4.0);
        assert_eq!(bolus.units_at(SimTime::from_minutes(16), &announced), 0.0);
    }

    #[test]
    fn disabled_bolus_is_always_zero() {
        let announced = CarbAnnouncer::new(|_| 100.0);
        let bolus = BolusConfig::disabled();
        for minute in 0..60 {
            assert_eq!(bolus.units_at(SimTime::from_minutes(minute), &announced), 0.0);
        }
    }

    #[test]
    fn carb_factor_scales_per_ten_grams() {
        let announced = CarbAnnouncer::new(|_| 25.0);
        let bolus = BolusConfig::enabled(0, 2.0);
        assert_eq!(bolus.units_at(SimTime::ZERO, &announced), 5.0);
    }

    #[test]
    fn bolus_config_rejects_negative_carb_factor() {
        let bolus = BolusConfig::enabled(15, -1.0);
        assert!(bolus.validate().is_err());
    }
}
