//! Rolling per-run histories kept by the decision-engine adapter.
//!
//! Three structures cover the adapter's memory:
//! - [`GlucoseSamples`], a minute-keyed map of every glucose observation,
//!   from which trend deltas are derived;
//! - [`GlucoseTrace`], the most-recent-first series of 5-minute readings the
//!   engine consumes;
//! - [`TreatmentLog`], the chronological record of boluses, carb intake and
//!   temp-basal changes the engine turns into insulin- and carbs-on-board.
//!
//! All three are append-only within a run and rebuilt from scratch at reset.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{SimTime, DECISION_CYCLE_MIN};

/// Glucose trend deltas derived from the minute-keyed sample map.
///
/// Each field defaults to zero until enough history exists to compute it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlucoseTrend {
    /// Change over the last 5 minutes, in mg/dl.
    pub delta: f64,
    /// Average 5-minute change over the last 15 minutes, in mg/dl.
    pub short_avgdelta: f64,
    /// Average 5-minute change over the last 45 minutes, in mg/dl.
    pub long_avgdelta: f64,
}

/// Minute-keyed map of every glucose observation in the current run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlucoseSamples {
    samples: BTreeMap<i64, f64>,
}

impl GlucoseSamples {
    /// Creates an empty sample map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the observation for the given minute.
    pub fn record(&mut self, t: SimTime, glucose: f64) {
        self.samples.insert(t.minutes(), glucose);
    }

    /// The observation recorded for the given minute, if any.
    #[must_use]
    pub fn get(&self, t: SimTime) -> Option<f64> {
        self.samples.get(&t.minutes()).copied()
    }

    /// Number of recorded minutes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Trend deltas at minute `t`, given the current observation.
    ///
    /// A window whose past sample does not exist yet contributes zero.
    #[must_use]
    pub fn trend(&self, t: SimTime, current: f64) -> GlucoseTrend {
        let lookback = |minutes: i64, per_cycle: f64| {
            self.samples
                .get(&(t.minutes() - minutes))
                .map_or(0.0, |past| (current - past) / per_cycle)
        };

        GlucoseTrend {
            delta: lookback(DECISION_CYCLE_MIN, 1.0),
            short_avgdelta: lookback(15, 3.0),
            long_avgdelta: lookback(45, 9.0),
        }
    }
}

/// One engine-facing glucose reading, taken at each decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReading {
    /// Wall-clock time of the reading.
    pub at: DateTime<Utc>,
    /// Glucose concentration in mg/dl.
    pub glucose: f64,
}

/// Most-recent-first series of decision-cycle glucose readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlucoseTrace {
    readings: Vec<GlucoseReading>,
}

impl GlucoseTrace {
    /// Creates an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends the newest reading.
    pub fn record_latest(&mut self, reading: GlucoseReading) {
        self.readings.insert(0, reading);
    }

    /// All readings, newest first.
    #[must_use]
    pub fn readings(&self) -> &[GlucoseReading] {
        &self.readings
    }

    /// The newest reading, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&GlucoseReading> {
        self.readings.first()
    }

    /// Number of readings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True when no reading has been taken yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Kind of a temporary basal override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempBasalKind {
    /// The rate replaces the scheduled basal outright.
    Absolute,
}

/// The active temporary basal setting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempBasal {
    /// Override rate in U/h.
    pub rate: f64,
    /// How long the override runs, in minutes.
    #[serde(rename = "duration")]
    pub duration_min: i64,
    /// Kind of override.
    #[serde(rename = "temp")]
    pub kind: TempBasalKind,
}

impl TempBasal {
    /// The zero-rate temp every run starts from.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            rate: 0.0,
            duration_min: DECISION_CYCLE_MIN,
            kind: TempBasalKind::Absolute,
        }
    }
}

/// One discrete treatment event.
///
/// The serialized form is tagged with `"_type"` so logs line up with the
/// pump-history records the external engine was built around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum TreatmentEvent {
    /// A discrete insulin bolus.
    Bolus {
        /// Wall-clock time of delivery.
        at: DateTime<Utc>,
        /// Bolus size in U.
        units: f64,
    },

    /// Announced carbohydrate intake.
    #[serde(rename = "carbs")]
    Carbs {
        /// Wall-clock time of intake.
        at: DateTime<Utc>,
        /// Amount in grams.
        grams: f64,
    },

    /// A temp-basal change, or the reconciled effect of one.
    #[serde(rename = "Temp Basal")]
    TempBasal {
        /// Wall-clock time the override took effect.
        at: DateTime<Utc>,
        /// Override rate relative to the patient's baseline, in U/h.
        rate: f64,
        /// Override duration in minutes, for scheduled overrides.
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_min: Option<i64>,
        /// Insulin actually delivered above baseline over the elapsed window,
        /// in U, for reconciliation records.
        #[serde(skip_serializing_if = "Option::is_none")]
        insulin: Option<f64>,
    },
}

impl TreatmentEvent {
    /// Wall-clock time of the event.
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Bolus { at, .. } | Self::Carbs { at, .. } | Self::TempBasal { at, .. } => *at,
        }
    }
}

/// Append-only chronological record of treatment events for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreatmentLog {
    events: Vec<TreatmentEvent>,
}

impl TreatmentLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log seeded with the run's initial temp-basal setting.
    #[must_use]
    pub fn seeded(at: DateTime<Utc>, temp: &TempBasal) -> Self {
        let mut log = Self::new();
        log.events.push(TreatmentEvent::TempBasal {
            at,
            rate: temp.rate,
            duration_min: Some(temp.duration_min),
            insulin: None,
        });
        log
    }

    /// Appends a bolus event.
    pub fn record_bolus(&mut self, at: DateTime<Utc>, units: f64) {
        self.events.push(TreatmentEvent::Bolus { at, units });
    }

    /// Appends a carbohydrate event.
    pub fn record_carbs(&mut self, at: DateTime<Utc>, grams: f64) {
        self.events.push(TreatmentEvent::Carbs { at, grams });
    }

    /// Appends a temp-basal event.
    pub fn record_temp_basal(
        &mut self,
        at: DateTime<Utc>,
        rate: f64,
        duration_min: Option<i64>,
        insulin: Option<f64>,
    ) {
        self.events.push(TreatmentEvent::TempBasal {
            at,
            rate,
            duration_min,
            insulin,
        });
    }

    /// All events in append order.
    #[must_use]
    pub fn events(&self) -> &[TreatmentEvent] {
        &self.events
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the log holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn minute(m: i64) -> SimTime {
        SimTime::from_minutes(m)
    }

    #[test]
    fn trend_is_zero_until_each_window_fills() {
        let mut samples = GlucoseSamples::new();
        for m in 0..=40 {
            samples.record(minute(m), 100.0);
        }

        // 45-minute window still open at t=40.
        let trend = samples.trend(minute(40), 100.0);
        assert_eq!(trend.long_avgdelta, 0.0);

        let trend = samples.trend(minute(4), 100.0);
        assert_eq!(trend.delta, 0.0);
        assert_eq!(trend.short_avgdelta, 0.0);
    }

    #[test]
    fn flat_history_yields_flat_trend() {
        let mut samples = GlucoseSamples::new();
        for m in 0..=60 {
            samples.record(minute(m), 100.0);
        }
        let trend = samples.trend(minute(60), 100.0);
        assert_eq!(trend, GlucoseTrend::default());
    }

    #[test]
    fn trend_formulas_match_the_stated_windows() {
        let mut samples = GlucoseSamples::new();
        // Rising 1 mg/dl per minute.
        for m in 0..=60 {
            samples.record(minute(m), 100.0 + m as f64);
        }

        let current = 160.0;
        let trend = samples.trend(minute(60), current);
        assert_relative_eq!(trend.delta, 5.0);
        assert_relative_eq!(trend.short_avgdelta, 15.0 / 3.0);
        assert_relative_eq!(trend.long_avgdelta, 45.0 / 9.0);
    }

    #[test]
    fn trace_keeps_newest_first() {
        let mut trace = GlucoseTrace::new();
        let t0 = Utc::now();
        for (i, glucose) in [100.0, 105.0, 110.0].into_iter().enumerate() {
            trace.record_latest(GlucoseReading {
                at: t0 + chrono::Duration::minutes(5 * i as i64),
                glucose,
            });
        }
        assert_eq!(trace.latest().unwrap().glucose, 110.0);
        assert_eq!(trace.readings()[2].glucose, 100.0);
    }

    #[test]
    fn seeded_log_starts_with_the_initial_temp() {
        let log = TreatmentLog::seeded(Utc::now(), &TempBasal::initial());
        assert_eq!(log.len(), 1);
        assert!(matches!(
            log.events()[0],
            TreatmentEvent::TempBasal {
                rate,
                duration_min: Some(5),
                insulin: None,
                ..
            } if rate == 0.0
        ));
    }

    #[test]
    fn treatment_events_serialize_with_pump_history_tags() {
        let at = Utc::now();
        let bolus = serde_json::to_value(TreatmentEvent::Bolus { at, units: 1.5 }).unwrap();
        assert_eq!(bolus["_type"], "Bolus");

        let carbs = serde_json::to_value(TreatmentEvent::Carbs { at, grams: 40.0 }).unwrap();
        assert_eq!(carbs["_type"], "carbs");

        let temp = serde_json::to_value(TreatmentEvent::TempBasal {
            at,
            rate: 0.5,
            duration_min: None,
            insulin: Some(0.04),
        })
        .unwrap();
        assert_eq!(temp["_type"], "Temp Basal");
        assert!(temp.get("duration_min").is_none());
    }

    #[test]
    fn temp_basal_serializes_engine_field_names() {
        let json = serde_json::to_value(TempBasal::initial()).unwrap();
        assert_eq!(json["duration"], 5);
        assert_eq!(json["temp"], "absolute");
        assert_eq!(json["rate"], 0.0);
    }
}
