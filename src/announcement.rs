//! Carbohydrate announcements.
//!
//! The host tells a controller about meals through a pure lookup from
//! simulation time to grams of carbohydrate absorbed at that time. Queries may
//! reach into the future, which is what makes pre-bolusing possible.

use std::collections::BTreeMap;
use std::fmt;

use crate::time::SimTime;

/// The carb-announcement oracle installed via `set_announced_carbs`.
///
/// A controller that was never given an announcer behaves as if no carbs are
/// ever announced.
pub struct CarbAnnouncer {
    lookup: Box<dyn Fn(SimTime) -> f64>,
}

impl CarbAnnouncer {
    /// Wraps an arbitrary lookup function.
    #[must_use]
    pub fn new(lookup: impl Fn(SimTime) -> f64 + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// An announcer that reports zero grams at every time.
    #[must_use]
    pub fn none() -> Self {
        Self::new(|_| 0.0)
    }

    /// An announcer backed by an exact-minute schedule.
    ///
    /// Minutes absent from the schedule report zero grams.
    #[must_use]
    pub fn from_schedule(schedule: BTreeMap<SimTime, f64>) -> Self {
        Self::new(move |t| schedule.get(&t).copied().unwrap_or(0.0))
    }

    /// Grams of carbohydrate announced for the given simulation time.
    #[must_use]
    pub fn grams_at(&self, t: SimTime) -> f64 {
        (self.lookup)(t)
    }
}

impl Default for CarbAnnouncer {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for CarbAnnouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarbAnnouncer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_announcer_reports_zero_everywhere() {
        let announcer = CarbAnnouncer::default();
        for minute in [-10, 0, 30, 500] {
            assert_eq!(announcer.grams_at(SimTime::from_minutes(minute)), 0.0);
        }
    }

    #[test]
    fn schedule_lookup_is_exact_minute() {
        let mut schedule = BTreeMap::new();
        schedule.insert(SimTime::from_minutes(30), 40.0);
        let announcer = CarbAnnouncer::from_schedule(schedule);

        assert_eq!(announcer.grams_at(SimTime::from_minutes(30)), 40.0);
        assert_eq!(announcer.grams_at(SimTime::from_minutes(29)), 0.0);
        assert_eq!(announcer.grams_at(SimTime::from_minutes(31)), 0.0);
    }

    #[test]
    fn closures_can_look_into_the_future() {
        let announcer = CarbAnnouncer::new(|t| if t.minutes() >= 60 { 25.0 } else { 0.0 });
        assert_eq!(announcer.grams_at(SimTime::from_minutes(75)), 25.0);
    }
}
