//! Wall-clock source
//!
//! Everything calendar-based (history keys, week anchoring, scheduling)
//! reads "now" through [`Clock`] so the local zone and the instant can
//! be pinned in tests.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    /// Current instant at the zone's current offset
    fn now(&self) -> DateTime<FixedOffset>;

    /// Instant at which this clock's zone shows the wall time `local`.
    ///
    /// The offset comes from the zone rules at that wall time, not from
    /// the current offset, so instants across a DST change stay exact.
    fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>>;
}

/// Resolve a wall time in `zone`: the earlier instant when it is
/// ambiguous, one hour later when a DST jump skipped it.
pub fn resolve_in<Tz: TimeZone>(zone: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    zone.from_local_datetime(&local)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(local + Duration::hours(1))).earliest())
}

fn fixed<Tz: TimeZone>(at: DateTime<Tz>) -> DateTime<FixedOffset> {
    let offset = at.offset().fix();
    at.with_timezone(&offset)
}

/// The system clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        fixed(Local::now())
    }

    fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        resolve_in(&Local, local).map(fixed)
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock<Z: TimeZone = FixedOffset> {
    zone: Z,
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock<FixedOffset> {
    /// Clock pinned to a single fixed offset
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self::in_zone(*now.offset(), now)
    }
}

impl<Z: TimeZone> ManualClock<Z> {
    pub fn in_zone<T: TimeZone>(zone: Z, now: DateTime<T>) -> Self {
        Self {
            zone,
            now: Mutex::new(now.with_timezone(&Utc)),
        }
    }

    pub fn set<T: TimeZone>(&self, now: DateTime<T>) {
        if let Ok(mut slot) = self.now.lock() {
            *slot = now.with_timezone(&Utc);
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut slot) = self.now.lock() {
            *slot = *slot + by;
        }
    }

    fn instant(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl<Z> Clock for ManualClock<Z>
where
    Z: TimeZone + Send + Sync,
{
    fn now(&self) -> DateTime<FixedOffset> {
        fixed(self.instant().with_timezone(&self.zone))
    }

    fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        resolve_in(&self.zone, local).map(fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::Europe::Berlin;

    fn wall(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_manual_clock_advances() {
        let start = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 18, 5, 59, 0)
            .unwrap();
        let clock = ManualClock::new(start);

        clock.advance(Duration::minutes(2));
        assert_eq!(clock.now(), start + Duration::minutes(2));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_zoned_clock_follows_dst() {
        let clock = ManualClock::in_zone(Berlin, Berlin.with_ymd_and_hms(2026, 10, 24, 12, 0, 0).unwrap());
        assert_eq!(clock.now().offset().local_minus_utc(), 2 * 3600);

        clock.advance(Duration::days(1));
        assert_eq!(clock.now().offset().local_minus_utc(), 3600);

        // Saturday noon, resolved after the fall-back, keeps its summer offset
        let saturday = clock.resolve_local(wall(2026, 10, 24, 12, 0)).unwrap();
        assert_eq!(saturday.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_resolve_in_handles_gap_and_overlap() {
        // 02:30 does not exist on 2026-03-29 in Berlin
        let skipped = resolve_in(&Berlin, wall(2026, 3, 29, 2, 30)).unwrap();
        assert_eq!(
            skipped.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 3, 29, 1, 30, 0).unwrap()
        );

        // 02:30 happens twice on 2026-10-25; the first one wins
        let repeated = resolve_in(&Berlin, wall(2026, 10, 25, 2, 30)).unwrap();
        assert_eq!(
            repeated.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 10, 25, 0, 30, 0).unwrap()
        );
    }
}
