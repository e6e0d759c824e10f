use chrono::{Duration, NaiveDate, Utc};
use ledgerbot_common::traits::collaborator_traits::Clock;
use std::sync::atomic::{AtomicI64, Ordering};

/// Calendar days are UTC days.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    days_from_ce: AtomicI64,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { days_from_ce: AtomicI64::new(to_days(today)) }
    }

    pub fn set(&self, today: NaiveDate) {
        self.days_from_ce.store(to_days(today), Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.days_from_ce.fetch_add(days, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        let days = self.days_from_ce.load(Ordering::SeqCst);
        epoch() + Duration::days(days)
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::MIN
}

fn to_days(date: NaiveDate) -> i64 {
    date.signed_duration_since(epoch()).num_days()
}

/// Whole days from `earlier` to `later`; negative if `later` is before.
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    later.signed_duration_since(earlier).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.today(), start);
        clock.advance_days(2);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        clock.set(start);
        assert_eq!(clock.today(), start);
    }

    #[test]
    fn test_days_between_crosses_month() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(days_between(a, b), 1);
        assert_eq!(days_between(b, a), -1);
    }
}
