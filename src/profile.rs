//! Patient parameters and the profile handed to the decision engine.
//!
//! Two views exist on purpose. [`PatientProfile`] is the small read-only
//! parameter set the host binds to a controller. [`EngineProfile`] is the much
//! wider record the external decision engine expects; the adapter injects the
//! patient's actual basal rate into it as `current_basal` before every call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

fn require_finite(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { name, value })
    }
}

fn require_non_negative(name: &'static str, value: f64) -> Result<(), ValidationError> {
    require_finite(name, value)?;
    if value < 0.0 {
        return Err(ValidationError::Negative { name, value });
    }
    Ok(())
}

/// Read-only patient parameters bound to a controller via `set_patient`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    /// The patient's equilibrium basal rate in U/h.
    pub basal_rate: f64,
}

impl PatientProfile {
    /// Creates a profile with the given equilibrium basal rate (U/h).
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the rate is negative or non-finite.
    pub fn new(basal_rate: f64) -> Result<Self, ValidationError> {
        require_non_negative("basal_rate", basal_rate)?;
        Ok(Self { basal_rate })
    }
}

/// One insulin-sensitivity entry: sensitivity in mg/dl per U from the given
/// minute offset within the day onwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsfSensitivity {
    /// Minute-of-day offset at which this sensitivity takes effect.
    pub offset: i64,
    /// Insulin sensitivity factor in mg/dl per U.
    pub sensitivity: f64,
}

/// Insulin-sensitivity schedule consumed by the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsfProfile {
    /// Sensitivity entries, ordered by offset.
    pub sensitivities: Vec<IsfSensitivity>,
}

impl IsfProfile {
    /// A schedule with a single all-day sensitivity.
    #[must_use]
    pub fn flat(sensitivity: f64) -> Self {
        Self {
            sensitivities: vec![IsfSensitivity {
                offset: 0,
                sensitivity,
            }],
        }
    }
}

/// One basal-schedule entry: rate in U/h from the given minute of day onwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasalScheduleEntry {
    /// Minute-of-day offset at which this rate takes effect.
    pub minutes: i64,
    /// Scheduled basal rate in U/h.
    pub rate: f64,
}

/// The programmed basal schedule handed to the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasalSchedule {
    /// Schedule entries, ordered by minute offset.
    pub basals: Vec<BasalScheduleEntry>,
}

impl BasalSchedule {
    /// A schedule with a single all-day rate.
    #[must_use]
    pub fn flat(rate: f64) -> Self {
        Self {
            basals: vec![BasalScheduleEntry { minutes: 0, rate }],
        }
    }

    /// Validates the schedule.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the schedule is empty or any rate is
    /// negative or non-finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.basals.is_empty() {
            return Err(ValidationError::EmptyBasalSchedule);
        }
        for entry in &self.basals {
            require_non_negative("basal_schedule.rate", entry.rate)?;
        }
        Ok(())
    }
}

impl Default for BasalSchedule {
    fn default() -> Self {
        Self::flat(1.0)
    }
}

/// The patient profile record the external decision engine consumes.
///
/// Typed fields cover everything the adapter reads or rewrites; engine-specific
/// entries beyond those survive in `extra` and are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineProfile {
    /// Profile kind discriminator; the adapter forces this to `"current"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Basal rate in U/h the engine treats as currently programmed. The
    /// adapter overwrites this with the patient's actual basal rate before
    /// every engine call.
    pub current_basal: f64,

    /// Upper bound on insulin on board, in U.
    pub max_iob: f64,

    /// Duration of insulin action, in hours.
    pub dia: f64,

    /// Insulin sensitivity factor in mg/dl per U.
    pub sens: f64,

    /// Carbohydrate ratio in g per U.
    pub carb_ratio: f64,

    /// Maximum temporary basal rate the engine may recommend, in U/h.
    pub max_basal: f64,

    /// Lower bound of the glucose target range, in mg/dl.
    pub min_bg: f64,

    /// Upper bound of the glucose target range, in mg/dl.
    pub max_bg: f64,

    /// Minimum glucose impact per 5 minutes assumed while carbs are absorbing,
    /// in mg/dl. The adapter forces this to 12.
    pub min_5m_carbimpact: f64,

    /// Insulin-sensitivity schedule. The adapter forces a flat 100 mg/dl/U
    /// profile.
    #[serde(rename = "isfProfile")]
    pub isf_profile: IsfProfile,

    /// Engine-specific entries passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EngineProfile {
    /// Validates the numeric fields.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if any rate or factor is negative or
    /// non-finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_negative("current_basal", self.current_basal)?;
        require_non_negative("max_iob", self.max_iob)?;
        require_non_negative("dia", self.dia)?;
        require_non_negative("sens", self.sens)?;
        require_non_negative("carb_ratio", self.carb_ratio)?;
        require_non_negative("max_basal", self.max_basal)?;
        require_finite("min_bg", self.min_bg)?;
        require_finite("max_bg", self.max_bg)?;
        require_non_negative("min_5m_carbimpact", self.min_5m_carbimpact)?;
        for entry in &self.isf_profile.sensitivities {
            require_non_negative("isf_profile.sensitivity", entry.sensitivity)?;
        }
        Ok(())
    }
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self {
            kind: "current".to_string(),
            current_basal: 1.0,
            max_iob: 3.5,
            dia: 6.0,
            sens: 100.0,
            carb_ratio: 10.0,
            max_basal: 4.0,
            min_bg: 100.0,
            max_bg: 120.0,
            min_5m_carbimpact: 12.0,
            isf_profile: IsfProfile::flat(100.0),
            extra: Map::new(),
        }
    }
}
