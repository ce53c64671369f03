//! Open-loop basal-bolus therapy.
//!
//! The infusion rate never moves: it is the configured basal rate for the
//! whole run. Meals are covered purely by announcement-driven boluses with a
//! fixed lead time. This is the baseline strategy the closed-loop variants
//! are measured against.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::announcement::CarbAnnouncer;
use crate::controller::{BolusConfig, Controller, Treatment};
use crate::error::{ContractError, LoopResult, ValidationError};
use crate::observation::Observation;
use crate::profile::PatientProfile;
use crate::time::SimTime;

/// Parameters of the open-loop strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasalBolusConfig {
    /// Constant infusion rate in U/h.
    pub basal_rate: f64,
    /// Announcement-driven bolus parameters.
    pub bolus: BolusConfig,
}

impl BasalBolusConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the basal rate is negative or
    /// non-finite, or the bolus parameters are invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.basal_rate.is_finite() {
            return Err(ValidationError::NonFinite {
                name: "basal_rate",
                value: self.basal_rate,
            });
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

impl Default for BasalBolusConfig {
    fn default() -> Self {
        Self {
            basal_rate: 1.0,
            bolus: BolusConfig::disabled(),
        }
    }
}

/// The open-loop basal-bolus controller.
#[derive(Debug)]
pub struct BasalBolusController {
    cfg: BasalBolusConfig,
    announced: CarbAnnouncer,
    armed: bool,
}

impl BasalBolusController {
    /// Creates a controller from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the configuration is invalid.
    pub fn new(cfg: BasalBolusConfig) -> LoopResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            announced: CarbAnnouncer::none(),
            armed: false,
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &BasalBolusConfig {
        &self.cfg
    }
}

impl Controller for BasalBolusController {
    fn set_patient(&mut self, _patient: Arc<PatientProfile>) {
        // The open-loop strategy doses from its own configuration only.
    }

    fn set_announced_carbs(&mut self, announced: CarbAnnouncer) {
        self.announced = announced;
    }

    fn reset(&mut self) {
        self.armed = true;
    }

    fn compute_treatment(&mut self, t: SimTime, _y: &Observation, _x: f64) -> LoopResult<Treatment> {
        if !self.armed {
            return Err(ContractError::ResetRequired {
                strategy: "basal-bolus",
            }
            .into());
        }

        Ok(Treatment {
            iir: self.cfg.basal_rate,
            ibolus: self.cfg.bolus.units_at(t, &self.announced),
            log: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn minute(m: i64) -> SimTime {
        SimTime::from_minutes(m)
    }

    #[test]
    fn infusion_rate_is_constant() {
        let mut controller = BasalBolusController::new(BasalBolusConfig {
            basal_rate: 0.8,
            bolus: BolusConfig::disabled(),
        })
        .unwrap();
        controller.reset();

        for m in 0..120 {
            let treatment = controller
                .compute_treatment(minute(m), &Observation::new(80.0 + m as f64), 0.0)
                .unwrap();
            assert_eq!(treatment.iir, 0.8);
            assert_eq!(treatment.ibolus, 0.0);
            assert!(treatment.log.is_none());
        }
    }

    #[test]
    fn bolus_fires_at_the_lookahead_minute_only() {
        let mut schedule = BTreeMap::new();
        schedule.insert(minute(30), 40.0);

        let mut controller = BasalBolusController::new(BasalBolusConfig {
            basal_rate: 1.0,
            bolus: BolusConfig::enabled(15, 1.0),
        })
        .unwrap();
        controller.set_announced_carbs(CarbAnnouncer::from_schedule(schedule));
        controller.reset();

        for m in 0..60 {
            let treatment = controller
                .compute_treatment(minute(m), &Observation::new(100.0), 0.0)
                .unwrap();
            let expected = if m == 15 { 4.0 } else { 0.0 };
            assert_eq!(treatment.ibolus, expected, "t={m}");
        }
    }

    #[test]
    fn compute_before_reset_fails_fast() {
        let mut controller = BasalBolusController::new(BasalBolusConfig::default()).unwrap();
        let err = controller
            .compute_treatment(minute(0), &Observation::new(100.0), 0.0)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::LoopError::Contract(ContractError::ResetRequired { .. })
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(BasalBolusController::new(BasalBolusConfig {
            basal_rate: -1.0,
            bolus: BolusConfig::disabled(),
        })
        .is_err());
    }
}
