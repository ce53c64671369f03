//! The external dosing-decision engine boundary.
//!
//! The engine itself is a black box: a rule-based program that, given the
//! glucose trend, insulin- and carbs-on-board estimates and the patient
//! profile, recommends a temporary basal rate. This module fixes its contract
//! as a trait over three calls made once per decision cycle, with typed
//! request and response payloads.
//!
//! Implementations bind whatever actually computes the answer: an in-process
//! port, a scripted stand-in for tests, or a bridge to the out-of-process
//! JavaScript engine (see [`request_to_json_pretty`] and
//! [`recommendation_from_json`]).

mod payload;
mod serialization;

pub use payload::{
    Autosens, BasalRecommendation, BasalRequest, GlucoseStatus, IobEstimate, IobInputs, MealData,
    MealInputs, PredBgs,
};
pub use serialization::{recommendation_from_json, request_to_json_pretty};

use crate::diagnostics::DiagnosticSink;
use crate::error::EngineError;

/// The dosing-decision engine consulted once per 5-minute cycle.
///
/// Each method is a pure function of its inputs for a given call, apart from
/// the diagnostic text it may narrate into `sink`. The adapter owns the sink
/// and scopes it to a single cycle, so implementations must not capture or
/// stash it.
///
/// Failures must surface as [`EngineError`]; the adapter propagates them to
/// the host unchanged rather than guessing at a dose.
pub trait DecisionEngine {
    /// Estimates insulin on board from the treatment history.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the estimate cannot be produced.
    fn estimate_iob(
        &self,
        inputs: &IobInputs<'_>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<IobEstimate, EngineError>;

    /// Totals announced carbs and estimates carbs on board.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the accounting cannot be produced.
    fn meal_totals(
        &self,
        inputs: &MealInputs<'_>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<MealData, EngineError>;

    /// Recommends a temporary basal rate for the coming cycle.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when no recommendation can be produced.
    fn determine_basal(
        &self,
        request: &BasalRequest<'_>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<BasalRecommendation, EngineError>;
}
