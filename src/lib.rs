//! # GlucoLoop - closed-loop insulin dosing for simulated type 1 diabetes
//!
//! GlucoLoop computes, minute by minute, the insulin dosing decisions that
//! drive a simulated artificial-pancreas loop: a continuous basal infusion
//! rate and a per-minute bolus. The surrounding simulation (patient model,
//! time stepping, plotting) lives in the host; this crate is the controller
//! core it calls into.
//!
//! ## Core Concepts
//!
//! - **Controller**: the contract every dosing strategy implements - reset,
//!   then one `compute_treatment` call per simulated minute
//! - **DosingStrategy**: the strategies themselves - open-loop basal-bolus,
//!   PID feedback, and the adapter around an external rule-based engine
//! - **DecisionEngine**: the typed boundary to that external engine, consulted
//!   every 5 minutes with glucose trend, on-board estimates and profile
//! - **Treatment**: the per-minute answer - infusion rate, bolus, and (on
//!   decision cycles) a diagnostic log
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use glucoloop::{
//!     BolusConfig, CarbAnnouncer, Controller, EngineProfile, Observation,
//!     Oref0Controller, PatientProfile, SimTime,
//! };
//!
//! let engine = my_engine(); // anything implementing DecisionEngine
//! let mut controller =
//!     Oref0Controller::new(EngineProfile::default(), BolusConfig::enabled(30, 1.0), engine)?;
//! controller.set_patient(Arc::new(PatientProfile::new(1.0)?));
//! controller.set_announced_carbs(CarbAnnouncer::new(|t| meal_plan(t)));
//! controller.reset();
//!
//! for minute in 0..1440 {
//!     let t = SimTime::from_minutes(minute);
//!     let treatment = controller.compute_treatment(t, &Observation::new(glucose(t)), 0.0)?;
//!     pump.apply(treatment.iir, treatment.ibolus);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod announcement;
pub mod controller;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod history;
pub mod observation;
pub mod profile;
pub mod time;

// Re-export primary types at crate root for convenience
pub use announcement::CarbAnnouncer;
pub use controller::{
    BasalBolusConfig, BasalBolusController, BolusConfig, Controller, DosingStrategy,
    Oref0Controller, PidConfig, PidController, RunId, Treatment,
};
pub use diagnostics::{CycleLog, DebugBuffer, DiagnosticSink, NullSink, PredictedBg};
pub use engine::{
    Autosens, BasalRecommendation, BasalRequest, DecisionEngine, GlucoseStatus, IobEstimate,
    IobInputs, MealData, MealInputs, PredBgs,
};
pub use error::{ContractError, EngineError, LoopError, LoopResult, ValidationError};
pub use history::{
    GlucoseReading, GlucoseSamples, GlucoseTrace, GlucoseTrend, TempBasal, TempBasalKind,
    TreatmentEvent, TreatmentLog,
};
pub use observation::Observation;
pub use profile::{
    BasalSchedule, BasalScheduleEntry, EngineProfile, IsfProfile, IsfSensitivity, PatientProfile,
};
pub use time::{CyclePhase, SimClock, SimTime, DECISION_CYCLE_MIN};
