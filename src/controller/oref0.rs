//! Adapter between the per-minute simulation feed and the external
//! rule-based decision engine.
//!
//! The engine thinks in discrete 5-minute pump cycles over accumulated
//! history; the host delivers one glucose observation per minute. This
//! controller bridges the two: it keeps the minute-keyed sample map, the
//! engine-facing glucose trace and the treatment log, derives trend deltas,
//! assembles the typed request for each due cycle, and translates the
//! engine's answer back into an infusion rate plus diagnostics.
//!
//! Between due cycles the last adopted rate simply stays in force.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::announcement::CarbAnnouncer;
use crate::controller::{BolusConfig, Controller, Treatment};
use crate::diagnostics::{split_reason, CycleLog, DebugBuffer, PredictedBg};
use crate::engine::{Autosens, BasalRequest, DecisionEngine, GlucoseStatus, IobInputs, MealInputs};
use crate::error::{ContractError, LoopResult};
use crate::history::{
    GlucoseReading, GlucoseSamples, GlucoseTrace, TempBasal, TreatmentLog,
};
use crate::observation::Observation;
use crate::profile::{BasalSchedule, EngineProfile, IsfProfile, PatientProfile};
use crate::time::{SimClock, SimTime, DECISION_CYCLE_MIN};

/// Correlates diagnostics and traces across one controller run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new random run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-run state, rebuilt wholesale at every reset.
#[derive(Debug)]
struct RunState {
    id: RunId,
    clock: SimClock,
    current_temp: TempBasal,
    treatments: TreatmentLog,
    samples: GlucoseSamples,
    trace: GlucoseTrace,
    iir: f64,
    last_seen: Option<SimTime>,
}

/// The decision-engine adapter controller.
pub struct Oref0Controller {
    profile: EngineProfile,
    bolus: BolusConfig,
    basal_schedule: BasalSchedule,
    engine: Box<dyn DecisionEngine>,
    patient: Option<Arc<PatientProfile>>,
    announced: CarbAnnouncer,
    epoch_override: Option<DateTime<Utc>>,
    run: Option<RunState>,
}

impl Oref0Controller {
    /// Creates an adapter around the given engine.
    ///
    /// Three profile entries are forced to the values the engine relies on,
    /// regardless of what the caller configured: the profile kind becomes
    /// `"current"`, `min_5m_carbimpact` becomes 12, and the ISF profile
    /// becomes a flat 100 mg/dl per U schedule.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ValidationError`] if the profile or bolus
    /// parameters are invalid.
    pub fn new(
        mut profile: EngineProfile,
        bolus: BolusConfig,
        engine: Box<dyn DecisionEngine>,
    ) -> LoopResult<Self> {
        bolus.validate()?;
        profile.kind = "current".to_string();
        profile.min_5m_carbimpact = 12.0;
        profile.isf_profile = IsfProfile::flat(100.0);
        profile.validate()?;

        // TODO: derive the schedule from the patient profile instead of a
        // flat default.
        let basal_schedule = BasalSchedule::default();

        Ok(Self {
            profile,
            bolus,
            basal_schedule,
            engine,
            patient: None,
            announced: CarbAnnouncer::none(),
            epoch_override: None,
            run: None,
        })
    }

    /// Pins the wall-clock epoch used at the next reset, for deterministic
    /// runs. Without this, each reset anchors at the current time.
    #[must_use]
    pub fn with_run_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.epoch_override = Some(epoch);
        self
    }

    /// The ID of the active run, if one has been started.
    #[must_use]
    pub fn run_id(&self) -> Option<RunId> {
        self.run.as_ref().map(|run| run.id)
    }

    /// The temp basal currently in force, if a run is active.
    #[must_use]
    pub fn current_temp(&self) -> Option<&TempBasal> {
        self.run.as_ref().map(|run| &run.current_temp)
    }

    /// The profile as handed to the engine (after the forced entries).
    #[must_use]
    pub const fn profile(&self) -> &EngineProfile {
        &self.profile
    }
}

impl fmt::Debug for Oref0Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Oref0Controller")
            .field("profile", &self.profile)
            .field("bolus", &self.bolus)
            .field("basal_schedule", &self.basal_schedule)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

impl Controller for Oref0Controller {
    fn set_patient(&mut self, patient: Arc<PatientProfile>) {
        self.patient = Some(patient);
    }

    fn set_announced_carbs(&mut self, announced: CarbAnnouncer) {
        self.announced = announced;
    }

    fn reset(&mut self) {
        let epoch = self.epoch_override.unwrap_or_else(Utc::now);
        let current_temp = TempBasal::initial();
        let id = RunId::new();
        debug!(run = %id, %epoch, "adapter reset");

        self.run = Some(RunState {
            id,
            clock: SimClock::anchored_at(epoch),
            treatments: TreatmentLog::seeded(epoch, &current_temp),
            samples: GlucoseSamples::new(),
            trace: GlucoseTrace::new(),
            iir: current_temp.rate,
            current_temp,
            last_seen: None,
        });
    }

    fn compute_treatment(&mut self, t: SimTime, y: &Observation, _x: f64) -> LoopResult<Treatment> {
        let Some(patient) = self.patient.as_ref() else {
            return Err(ContractError::PatientNotBound.into());
        };
        let baseline = patient.basal_rate;

        let Some(run) = self.run.as_mut() else {
            return Err(ContractError::ResetRequired { strategy: "oref0" }.into());
        };

        if let Some(last) = run.last_seen {
            if t <= last {
                return Err(ContractError::TimeRegression { last, got: t }.into());
            }
        }
        run.last_seen = Some(t);

        let now = run.clock.wall(t);
        let glucose = y.glucose;

        run.samples.record(t, glucose);

        let ibolus = self.bolus.units_at(t, &self.announced);
        if self.bolus.use_bolus {
            run.treatments.record_bolus(now, ibolus);
        }

        let announced_now = self.announced.grams_at(t);
        if announced_now > 0.0 {
            run.treatments.record_carbs(now, announced_now);
        }

        if !t.is_cycle_due() {
            return Ok(Treatment {
                iir: run.iir,
                ibolus,
                log: None,
            });
        }

        run.trace.record_latest(GlucoseReading { at: now, glucose });

        // Reconcile the insulin the elapsed window delivered above baseline,
        // so the on-board estimate sees it before the next decision.
        let relative_rate = run.iir - baseline;
        run.treatments.record_temp_basal(
            now - Duration::minutes(DECISION_CYCLE_MIN),
            relative_rate,
            None,
            Some(DECISION_CYCLE_MIN as f64 / 60.0 * relative_rate),
        );

        let trend = run.samples.trend(t, glucose);
        let glucose_status = GlucoseStatus {
            glucose,
            date: now,
            delta: trend.delta,
            short_avgdelta: trend.short_avgdelta,
            long_avgdelta: trend.long_avgdelta,
        };

        self.profile.current_basal = baseline;

        let mut sink = DebugBuffer::new();

        let iob = self.engine.estimate_iob(
            &IobInputs {
                profile: &self.profile,
                clock: now,
                treatments: run.treatments.events(),
            },
            &mut sink,
        )?;

        let meal = self.engine.meal_totals(
            &MealInputs {
                treatments: run.treatments.events(),
                pump_history: run.treatments.events(),
                glucose: run.trace.readings(),
                profile: &self.profile,
                basal_schedule: &self.basal_schedule,
                clock: now,
            },
            &mut sink,
        )?;

        let request = BasalRequest {
            glucose_status,
            current_temp: run.current_temp,
            iob,
            profile: &self.profile,
            autosens: Autosens::NEUTRAL,
            meal,
            microbolus_allowed: false,
            reservoir: None,
            clock: now,
        };

        let recommendation = self.engine.determine_basal(&request, &mut sink)?;

        if let Some(temp) = recommendation.new_temp()? {
            debug!(
                run = %run.id,
                t = t.minutes(),
                rate = temp.rate,
                duration = temp.duration_min,
                "adopting engine temp"
            );
            run.iir = temp.rate;
            run.current_temp = temp;
        }
        // TODO: when the engine stays silent past the active temp's duration,
        // decide whether to fall back to the baseline rate instead of holding
        // the last temp indefinitely.

        let predicted_bg = recommendation
            .preferred_prediction()
            .map(|series| {
                series
                    .iter()
                    .enumerate()
                    .map(|(i, bg)| PredictedBg {
                        t: t.offset(DECISION_CYCLE_MIN * i as i64),
                        bg: *bg,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let log = CycleLog {
            reason: split_reason(&recommendation.reason),
            debug: sink.into_entries(),
            predicted_bg,
            recommendation,
        };

        Ok(Treatment {
            iir: run.iir,
            ibolus,
            log: Some(log),
        })
    }
}
