//! Typed payloads for the decision-engine boundary.
//!
//! Requests borrow the adapter's state and only serialize; responses are
//! owned and deserialize from the engine's native JSON, so field names on the
//! response side follow the engine's casing (`predBGs`, `IOB`, `COB`,
//! `mealCOB`). Every response struct carries a flattened `extra` map so
//! engine-specific fields survive the typed boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::history::{GlucoseReading, TempBasal, TempBasalKind, TreatmentEvent};
use crate::profile::{BasalSchedule, EngineProfile};

/// Snapshot of the current glucose level and its recent trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseStatus {
    /// Current glucose concentration in mg/dl.
    pub glucose: f64,
    /// Wall-clock time of the reading.
    pub date: DateTime<Utc>,
    /// Change over the last 5 minutes, in mg/dl.
    pub delta: f64,
    /// Average 5-minute change over the last 15 minutes, in mg/dl.
    pub short_avgdelta: f64,
    /// Average 5-minute change over the last 45 minutes, in mg/dl.
    pub long_avgdelta: f64,
}

/// Autosensitivity adjustment handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Autosens {
    /// Sensitivity ratio; 1.0 means no adjustment.
    pub ratio: f64,
}

impl Autosens {
    /// The neutral ratio the adapter always uses.
    pub const NEUTRAL: Self = Self { ratio: 1.0 };
}

impl Default for Autosens {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Inputs for the engine's insulin-on-board estimate.
#[derive(Debug, Clone, Serialize)]
pub struct IobInputs<'a> {
    /// Profile in force for this cycle.
    pub profile: &'a EngineProfile,
    /// Wall-clock time of the estimate.
    pub clock: DateTime<Utc>,
    /// Full treatment history of the run.
    pub treatments: &'a [TreatmentEvent],
}

/// The engine's insulin-on-board estimate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IobEstimate {
    /// Units of insulin still active.
    #[serde(default)]
    pub iob: f64,
    /// Current insulin activity in U/min.
    #[serde(default)]
    pub activity: f64,
    /// Engine-specific fields passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Inputs for the engine's meal/carb accounting.
#[derive(Debug, Clone, Serialize)]
pub struct MealInputs<'a> {
    /// Full treatment history of the run.
    pub treatments: &'a [TreatmentEvent],
    /// The same history, in its role as pump delivery record.
    pub pump_history: &'a [TreatmentEvent],
    /// Decision-cycle glucose readings, newest first.
    pub glucose: &'a [GlucoseReading],
    /// Profile in force for this cycle.
    pub profile: &'a EngineProfile,
    /// Programmed basal schedule.
    pub basal_schedule: &'a BasalSchedule,
    /// Wall-clock time of the computation.
    pub clock: DateTime<Utc>,
}

/// The engine's meal/carb accounting result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealData {
    /// Total carbohydrate recorded, in grams.
    #[serde(default)]
    pub carbs: f64,
    /// Carbs still on board, in grams.
    #[serde(rename = "mealCOB", default)]
    pub meal_cob: f64,
    /// Engine-specific fields passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Predicted glucose trajectories keyed by the estimate driving them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredBgs {
    /// Prediction driven by insulin on board.
    #[serde(rename = "IOB", default, skip_serializing_if = "Option::is_none")]
    pub iob: Option<Vec<f64>>,
    /// Prediction driven by carbs on board.
    #[serde(rename = "COB", default, skip_serializing_if = "Option::is_none")]
    pub cob: Option<Vec<f64>>,
    /// Further trajectories the engine may emit.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The fully assembled request for one basal decision.
#[derive(Debug, Clone, Serialize)]
pub struct BasalRequest<'a> {
    /// Current glucose and trend snapshot.
    pub glucose_status: GlucoseStatus,
    /// The temp basal currently in force.
    pub current_temp: TempBasal,
    /// Insulin-on-board estimate for this cycle.
    pub iob: IobEstimate,
    /// Profile with the patient's actual basal rate injected.
    pub profile: &'a EngineProfile,
    /// Autosensitivity adjustment (always neutral).
    pub autosens: Autosens,
    /// Meal/carb accounting for this cycle.
    pub meal: MealData,
    /// Whether the engine may issue micro-boluses (always false here).
    pub microbolus_allowed: bool,
    /// Remaining reservoir volume in U, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservoir: Option<f64>,
    /// Wall-clock time of the request.
    pub clock: DateTime<Utc>,
}

/// The engine's answer to a basal request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasalRecommendation {
    /// New temp-basal rate in U/h, when the engine wants a change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    /// Duration of the new temp in minutes; present whenever `rate` is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    /// Free-text reasoning behind the decision.
    #[serde(default)]
    pub reason: String,
    /// Predicted glucose trajectories, if emitted.
    #[serde(rename = "predBGs", default, skip_serializing_if = "Option::is_none")]
    pub pred_bgs: Option<PredBgs>,
    /// Engine-specific fields passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BasalRecommendation {
    /// The prediction series to display: carb-driven when present, otherwise
    /// insulin-driven.
    #[must_use]
    pub fn preferred_prediction(&self) -> Option<&[f64]> {
        let pred = self.pred_bgs.as_ref()?;
        pred.cob.as_deref().or_else(|| pred.iob.as_deref())
    }

    /// The temp basal this recommendation asks for, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRecommendation`] when a rate is present
    /// but unusable: non-finite, negative, or missing its duration.
    pub fn new_temp(&self) -> Result<Option<TempBasal>, EngineError> {
        let Some(rate) = self.rate else {
            return Ok(None);
        };

        if !rate.is_finite() || rate < 0.0 {
            return Err(EngineError::InvalidRecommendation {
                reason: format!("unusable rate {rate}"),
            });
        }

        match self.duration {
            Some(duration_min) if duration_min >= 0 => Ok(Some(TempBasal {
                rate,
                duration_min,
                kind: TempBasalKind::Absolute,
            })),
            Some(duration_min) => Err(EngineError::InvalidRecommendation {
                reason: format!("negative duration {duration_min}"),
            }),
            None => Err(EngineError::InvalidRecommendation {
                reason: "rate without duration".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_prefers_cob_over_iob() {
        let rec = BasalRecommendation {
            pred_bgs: Some(PredBgs {
                iob: Some(vec![100.0, 98.0]),
                cob: Some(vec![100.0, 104.0]),
                extra: Map::new(),
            }),
            ..BasalRecommendation::default()
        };
        assert_eq!(rec.preferred_prediction().unwrap()[1], 104.0);
    }

    #[test]
    fn prediction_falls_back_to_iob() {
        let rec = BasalRecommendation {
            pred_bgs: Some(PredBgs {
                iob: Some(vec![100.0, 98.0]),
                cob: None,
                extra: Map::new(),
            }),
            ..BasalRecommendation::default()
        };
        assert_eq!(rec.preferred_prediction().unwrap()[1], 98.0);
        assert!(BasalRecommendation::default().preferred_prediction().is_none());
    }

    #[test]
    fn recommendation_without_rate_adopts_nothing() {
        assert_eq!(BasalRecommendation::default().new_temp().unwrap(), None);
    }

    #[test]
    fn rate_without_duration_is_invalid() {
        let rec = BasalRecommendation {
            rate: Some(1.2),
            ..BasalRecommendation::default()
        };
        assert!(matches!(
            rec.new_temp(),
            Err(EngineError::InvalidRecommendation { .. })
        ));
    }

    #[test]
    fn negative_or_non_finite_rates_are_invalid() {
        for rate in [-0.1, f64::NAN, f64::INFINITY] {
            let rec = BasalRecommendation {
                rate: Some(rate),
                duration: Some(30),
                ..BasalRecommendation::default()
            };
            assert!(rec.new_temp().is_err(), "rate {rate} should be rejected");
        }
    }

    #[test]
    fn valid_rate_and_duration_become_a_temp() {
        let rec = BasalRecommendation {
            rate: Some(2.5),
            duration: Some(30),
            ..BasalRecommendation::default()
        };
        let temp = rec.new_temp().unwrap().unwrap();
        assert_eq!(temp.rate, 2.5);
        assert_eq!(temp.duration_min, 30);
        assert_eq!(temp.kind, TempBasalKind::Absolute);
    }

    #[test]
    fn recommendation_deserializes_from_engine_json() {
        let json = r#"{
            "rate": 1.8,
            "duration": 30,
            "reason": "Eventual BG 140 >= 120, adding 0.5",
            "predBGs": { "IOB": [120.0, 118.0], "COB": [120.0, 125.0] },
            "eventualBG": 140
        }"#;
        let rec: BasalRecommendation = serde_json::from_str(json).unwrap();
        assert_eq!(rec.rate, Some(1.8));
        assert_eq!(rec.duration, Some(30));
        assert_eq!(rec.extra["eventualBG"], 140);
        assert_eq!(rec.pred_bgs.unwrap().cob.unwrap().len(), 2);
    }
}
