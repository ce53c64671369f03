//! End-to-end scenarios driving the controllers the way a host simulation
//! does: sequential minutes, one observation per call.

use std::collections::BTreeMap;
use std::sync::Arc;

use glucoloop::{
    BasalBolusConfig, BasalBolusController, BasalRecommendation, BasalRequest, BolusConfig,
    CarbAnnouncer, Controller, DecisionEngine, DiagnosticSink, DosingStrategy, EngineError,
    EngineProfile, IobEstimate, IobInputs, MealData, MealInputs, Observation, Oref0Controller,
    PatientProfile, PidConfig, PidController, SimTime,
};

fn minute(m: i64) -> SimTime {
    SimTime::from_minutes(m)
}

/// A stand-in engine that always asks for the same temp rate.
struct ConstantRateEngine {
    rate: f64,
}

impl DecisionEngine for ConstantRateEngine {
    fn estimate_iob(
        &self,
        _inputs: &IobInputs<'_>,
        _sink: &mut dyn DiagnosticSink,
    ) -> Result<IobEstimate, EngineError> {
        Ok(IobEstimate::default())
    }

    fn meal_totals(
        &self,
        _inputs: &MealInputs<'_>,
        _sink: &mut dyn DiagnosticSink,
    ) -> Result<MealData, EngineError> {
        Ok(MealData::default())
    }

    fn determine_basal(
        &self,
        _request: &BasalRequest<'_>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<BasalRecommendation, EngineError> {
        sink.record("holding steady");
        Ok(BasalRecommendation {
            rate: Some(self.rate),
            duration: Some(30),
            reason: "steady state".to_string(),
            ..BasalRecommendation::default()
        })
    }
}

#[test]
fn pid_at_target_delivers_pure_basal_for_an_hour() {
    let mut controller = PidController::new(PidConfig {
        basal_rate: 1.2,
        kp: 0.0,
        ki: 0.0,
        kd: 0.0,
        target: 120.0,
        bolus: BolusConfig::disabled(),
    })
    .unwrap();
    controller.set_announced_carbs(CarbAnnouncer::none());
    controller.reset();

    for m in 0..60 {
        let treatment = controller
            .compute_treatment(minute(m), &Observation::new(120.0), 0.0)
            .unwrap();
        assert_eq!(treatment.iir, 1.2, "t={m}");
        assert_eq!(treatment.ibolus, 0.0, "t={m}");
    }
}

#[test]
fn announced_meal_triggers_a_single_pre_bolus() {
    let mut schedule = BTreeMap::new();
    schedule.insert(minute(30), 40.0);

    for mut strategy in [
        DosingStrategy::from(
            BasalBolusController::new(BasalBolusConfig {
                basal_rate: 1.0,
                bolus: BolusConfig::enabled(15, 1.0),
            })
            .unwrap(),
        ),
        DosingStrategy::from(
            PidController::new(PidConfig {
                bolus: BolusConfig::enabled(15, 1.0),
                ..PidConfig::default()
            })
            .unwrap(),
        ),
    ] {
        strategy.set_announced_carbs(CarbAnnouncer::from_schedule(schedule.clone()));
        strategy.reset();

        for m in 0..60 {
            let treatment = strategy
                .compute_treatment(minute(m), &Observation::new(100.0), 0.0)
                .unwrap();
            let expected = if m == 15 { 4.0 } else { 0.0 };
            assert_eq!(treatment.ibolus, expected, "t={m}");
        }
    }
}

#[test]
fn adapter_runs_an_hour_on_the_decision_cadence() {
    let mut strategy = DosingStrategy::from(
        Oref0Controller::new(
            EngineProfile::default(),
            BolusConfig::disabled(),
            Box::new(ConstantRateEngine { rate: 1.4 }),
        )
        .unwrap(),
    );
    strategy.set_patient(Arc::new(PatientProfile::new(1.0).unwrap()));
    strategy.set_announced_carbs(CarbAnnouncer::none());
    strategy.reset();

    for m in 0..60 {
        let treatment = strategy
            .compute_treatment(minute(m), &Observation::new(115.0), 0.0)
            .unwrap();

        if m % 5 == 0 {
            let log = treatment.log.expect("decision cycles carry a log");
            assert_eq!(log.reason, ["steady state"]);
            assert_eq!(log.debug, ["holding steady"]);
        } else {
            assert!(treatment.log.is_none(), "t={m}");
        }

        // The first decision lands at t=0, so the adopted rate is in force
        // from the very first minute.
        assert_eq!(treatment.iir, 1.4, "t={m}");
        assert_eq!(treatment.ibolus, 0.0, "t={m}");
    }
}

#[test]
fn a_second_run_repeats_the_first_exactly() {
    let run = |controller: &mut PidController| -> Vec<f64> {
        controller.reset();
        (0..30)
            .map(|m| {
                controller
                    .compute_treatment(minute(m), &Observation::new(100.0 + m as f64), 0.0)
                    .unwrap()
                    .iir
            })
            .collect()
    };

    let mut controller = PidController::new(PidConfig {
        basal_rate: 1.0,
        kp: 0.02,
        ki: 0.01,
        kd: 0.005,
        target: 110.0,
        bolus: BolusConfig::disabled(),
    })
    .unwrap();

    let first = run(&mut controller);
    let second = run(&mut controller);
    assert_eq!(first, second);
}
