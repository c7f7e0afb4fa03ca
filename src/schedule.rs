//! Prayer schedule sequencing: which event is next, how long until it, and
//! how far through the current interval we are.
//!
//! The astronomy lives behind `TimetableSource`; this engine owns only the
//! ordering and the day-boundary rollover. There is exactly one rollover
//! policy: when today's events are exhausted the engine asks the source for
//! tomorrow's set, and when the day has not yet reached its first event the
//! active interval starts at yesterday's last event.

use chrono::{DateTime, Duration, Utc};

use crate::astro::TimetableSource;
use crate::types::{GeoPoint, NextEventStatus, PrayerEvent, PrayerEventSet};

pub struct PrayerScheduleEngine {
    source: Box<dyn TimetableSource>,
}

impl PrayerScheduleEngine {
    pub fn new(source: Box<dyn TimetableSource>) -> Self {
        Self { source }
    }

    /// The day's events for a location. Pure delegation; idempotent for
    /// identical inputs as long as the source is.
    pub fn daily_events(&self, location: GeoPoint, date: chrono::NaiveDate) -> PrayerEventSet {
        self.source.daily_events(location, date)
    }

    /// The first event strictly after `now`, rolling into the following day
    /// when all of today's events have passed. `None` only when neither
    /// today's remainder nor tomorrow's set holds an event.
    pub fn next_event(
        &self,
        events: &PrayerEventSet,
        location: GeoPoint,
        now: DateTime<Utc>,
    ) -> Option<NextEventStatus> {
        let (active, next) = self.current_interval(events, location, now);
        let next = next?;
        let remaining = next.instant - now;
        let progress_percent = match active {
            Some(active) => interval_progress(active.instant, next.instant, now),
            None => 0.0,
        };
        Some(NextEventStatus {
            event: next,
            remaining,
            progress_percent,
        })
    }

    /// Fractional progress through the current interval, [0, 100]. Uses the
    /// same rollover policy as `next_event`, so the value is continuous
    /// across the last-event-of-day boundary.
    pub fn progress(&self, events: &PrayerEventSet, location: GeoPoint, now: DateTime<Utc>) -> f64 {
        match self.next_event(events, location, now) {
            Some(status) => status.progress_percent,
            None => 0.0,
        }
    }

    /// The active event (latest with instant <= now, reaching back to
    /// yesterday's last before the first event of the day) and the next one
    /// (reaching forward to tomorrow's first after the last).
    fn current_interval(
        &self,
        events: &PrayerEventSet,
        location: GeoPoint,
        now: DateTime<Utc>,
    ) -> (Option<PrayerEvent>, Option<PrayerEvent>) {
        let active = events
            .events()
            .iter()
            .filter(|e| e.instant <= now)
            .last()
            .copied()
            .or_else(|| {
                let yesterday = self.source.daily_events(location, events.date - Duration::days(1));
                yesterday.last().copied()
            });

        let next = events
            .events()
            .iter()
            .find(|e| e.instant > now)
            .copied()
            .or_else(|| {
                let tomorrow = self.source.daily_events(location, events.date + Duration::days(1));
                tomorrow.first().copied()
            });

        (active, next)
    }
}

fn interval_progress(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let total = (end - start).num_milliseconds();
    if total <= 0 {
        // Coincident events: treated as sequential, interval has no width.
        return 0.0;
    }
    let elapsed = (now - start).num_milliseconds();
    (100.0 * elapsed as f64 / total as f64).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrayerName;
    use chrono::NaiveDate;

    /// Fixture source: the same wall-clock offsets every day.
    struct FixedOffsets(Vec<(PrayerName, u32, u32)>);

    impl TimetableSource for FixedOffsets {
        fn daily_events(&self, _location: GeoPoint, date: NaiveDate) -> PrayerEventSet {
            let events = self
                .0
                .iter()
                .map(|&(name, h, m)| PrayerEvent {
                    name,
                    instant: DateTime::<Utc>::from_naive_utc_and_offset(
                        date.and_hms_opt(h, m, 0).unwrap(),
                        Utc,
                    ),
                })
                .collect();
            PrayerEventSet::new(date, events)
        }
    }

    struct EmptySource;

    impl TimetableSource for EmptySource {
        fn daily_events(&self, _location: GeoPoint, date: NaiveDate) -> PrayerEventSet {
            PrayerEventSet::new(date, Vec::new())
        }
    }

    fn full_day() -> FixedOffsets {
        FixedOffsets(vec![
            (PrayerName::Fajr, 5, 0),
            (PrayerName::Sunrise, 6, 15),
            (PrayerName::Dhuhr, 12, 0),
            (PrayerName::Asr, 15, 30),
            (PrayerName::Maghrib, 18, 0),
            (PrayerName::Isha, 19, 30),
        ])
    }

    fn loc() -> GeoPoint {
        GeoPoint::new(24.8607, 67.0011).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        DateTime::<Utc>::from_naive_utc_and_offset(date.and_hms_opt(h, m, s).unwrap(), Utc)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    #[test]
    fn test_next_event_mid_day() {
        let engine = PrayerScheduleEngine::new(Box::new(full_day()));
        let events = engine.daily_events(loc(), day());

        let status = engine.next_event(&events, loc(), at(day(), 13, 0, 0)).unwrap();
        assert_eq!(status.event.name, PrayerName::Asr);
        assert_eq!(status.remaining, Duration::minutes(150));
        // Dhuhr 12:00 → Asr 15:30, one hour in: 60/210.
        let expected = 100.0 * 60.0 / 210.0;
        assert!((status.progress_percent - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rollover_after_last_event() {
        let engine = PrayerScheduleEngine::new(Box::new(full_day()));
        let events = engine.daily_events(loc(), day());

        let status = engine.next_event(&events, loc(), at(day(), 23, 0, 0)).unwrap();
        assert_eq!(status.event.name, PrayerName::Fajr);
        assert_eq!(status.event.instant.date_naive(), day() + Duration::days(1));
        assert_eq!(status.remaining, Duration::hours(6));
        assert!(status.remaining > Duration::zero());
    }

    #[test]
    fn test_progress_continuous_across_midnight() {
        let engine = PrayerScheduleEngine::new(Box::new(full_day()));
        let today = engine.daily_events(loc(), day());
        let tomorrow = engine.daily_events(loc(), day() + Duration::days(1));

        // Isha 19:30 → next Fajr 05:00 is a 9.5 h interval.
        let before = engine.progress(&today, loc(), at(day(), 23, 59, 59));
        let after = engine.progress(
            &tomorrow,
            loc(),
            at(day() + Duration::days(1), 0, 0, 1),
        );
        assert!(before > 0.0 && before <= 100.0);
        assert!(after > 0.0 && after <= 100.0);
        // Two seconds apart, regardless of which day's set the host holds.
        assert!((after - before) < 0.01, "progress jumped: {} -> {}", before, after);
        assert!(after >= before);
    }

    #[test]
    fn test_progress_monotone_and_resets() {
        let engine = PrayerScheduleEngine::new(Box::new(full_day()));
        let events = engine.daily_events(loc(), day());

        let mut prev = -1.0;
        for minutes in (0..210).step_by(15) {
            let now = at(day(), 12, 0, 1) + Duration::minutes(minutes);
            let p = engine.progress(&events, loc(), now);
            assert!(p >= prev, "progress regressed: {} after {}", p, prev);
            prev = p;
        }

        // Just after Asr: back near zero.
        let p = engine.progress(&events, loc(), at(day(), 15, 30, 30));
        assert!(p < 1.0, "expected reset near 0, got {}", p);
    }

    #[test]
    fn test_before_first_event_uses_yesterdays_last() {
        let engine = PrayerScheduleEngine::new(Box::new(full_day()));
        let events = engine.daily_events(loc(), day());

        // 02:00, between yesterday's Isha (19:30) and today's Fajr (05:00).
        let status = engine.next_event(&events, loc(), at(day(), 2, 0, 0)).unwrap();
        assert_eq!(status.event.name, PrayerName::Fajr);
        let expected = 100.0 * 6.5 / 9.5;
        assert!((status.progress_percent - expected).abs() < 1e-6);
    }

    #[test]
    fn test_short_set_tolerated() {
        let engine = PrayerScheduleEngine::new(Box::new(FixedOffsets(vec![
            (PrayerName::Dhuhr, 12, 0),
            (PrayerName::Asr, 15, 30),
        ])));
        let events = engine.daily_events(loc(), day());
        assert_eq!(events.events().len(), 2);

        let status = engine.next_event(&events, loc(), at(day(), 16, 0, 0)).unwrap();
        assert_eq!(status.event.name, PrayerName::Dhuhr); // tomorrow's first
        assert!(status.remaining > Duration::zero());
    }

    #[test]
    fn test_empty_sets_yield_none() {
        let engine = PrayerScheduleEngine::new(Box::new(EmptySource));
        let events = engine.daily_events(loc(), day());
        assert!(engine.next_event(&events, loc(), at(day(), 12, 0, 0)).is_none());
        assert_eq!(engine.progress(&events, loc(), at(day(), 12, 0, 0)), 0.0);
    }
}
