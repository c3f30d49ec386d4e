//! Market Session
//!
//! The live trading window consumed (not owned) by the engine: it decides order
//! acceptance, whether after-market orders may be evaluated, and when DAY
//! orders expire.

use chrono::{Datelike, Days, FixedOffset, NaiveTime, TimeZone, Utc, Weekday};

use crate::domain::shared::{DomainError, Timestamp};

/// Trading window in exchange-local time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSession {
    open: NaiveTime,
    close: NaiveTime,
    offset: FixedOffset,
    trading_days: Vec<Weekday>,
}

impl MarketSession {
    /// Create a session.
    ///
    /// # Errors
    ///
    /// Returns error if `open` is not before `close`, the offset is out of range
    /// or no trading days are given.
    pub fn new(
        open: NaiveTime,
        close: NaiveTime,
        utc_offset_minutes: i32,
        trading_days: Vec<Weekday>,
    ) -> Result<Self, DomainError> {
        if open >= close {
            return Err(DomainError::invalid(
                "session",
                format!("open {open} must be before close {close}"),
            ));
        }
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            DomainError::invalid("utc_offset_minutes", format!("{utc_offset_minutes} is out of range"))
        })?;
        if trading_days.is_empty() {
            return Err(DomainError::invalid("trading_days", "at least one trading day is required"));
        }
        Ok(Self {
            open,
            close,
            offset,
            trading_days,
        })
    }

    /// NSE equity derivatives session: 09:15 to 15:30 IST, Monday to Friday.
    #[must_use]
    #[allow(clippy::expect_used)] // Constant times and offset are always valid
    pub fn nse() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 15, 0).expect("valid open time"),
            close: NaiveTime::from_hms_opt(15, 30, 0).expect("valid close time"),
            offset: FixedOffset::east_opt(330 * 60).expect("valid IST offset"),
            trading_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }

    /// Whether `at` falls inside the live window on a trading day.
    #[must_use]
    pub fn is_open(&self, at: Timestamp) -> bool {
        let local = at.as_datetime().with_timezone(&self.offset);
        if !self.trading_days.contains(&local.weekday()) {
            return false;
        }
        let time = local.time();
        time >= self.open && time < self.close
    }

    /// First session close strictly after `at`.
    #[must_use]
    pub fn next_close(&self, at: Timestamp) -> Option<Timestamp> {
        self.next_boundary(at, self.close)
    }

    /// First session open strictly after `at`.
    #[must_use]
    pub fn next_open(&self, at: Timestamp) -> Option<Timestamp> {
        self.next_boundary(at, self.open)
    }

    /// Close of the session an order placed at `at` belongs to.
    ///
    /// Inside the window this is today's close. Outside it the order is queued
    /// for the next session and expires at that session's close.
    #[must_use]
    pub fn expiry_for(&self, at: Timestamp) -> Option<Timestamp> {
        if self.is_open(at) {
            self.next_close(at)
        } else {
            self.next_open(at).and_then(|open| self.next_close(open))
        }
    }

    fn next_boundary(&self, at: Timestamp, time: NaiveTime) -> Option<Timestamp> {
        let local_date = at.as_datetime().with_timezone(&self.offset).date_naive();
        (0..=7u64).find_map(|d| {
            let date = local_date.checked_add_days(Days::new(d))?;
            if !self.trading_days.contains(&date.weekday()) {
                return None;
            }
            let candidate = self
                .offset
                .from_local_datetime(&date.and_time(time))
                .single()?
                .with_timezone(&Utc);
            (candidate > at.as_datetime()).then_some(Timestamp::new(candidate))
        })
    }
}

impl Default for MarketSession {
    fn default() -> Self {
        Self::nse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn open_inside_window_on_weekday() {
        let session = MarketSession::nse();
        // Monday 2024-12-02
        assert!(session.is_open(ts("2024-12-02T09:15:00+05:30")));
        assert!(session.is_open(ts("2024-12-02T15:29:59+05:30")));
        assert!(!session.is_open(ts("2024-12-02T15:30:00+05:30")));
        assert!(!session.is_open(ts("2024-12-02T09:14:59+05:30")));
    }

    #[test]
    fn closed_on_weekend() {
        let session = MarketSession::nse();
        // Saturday
        assert!(!session.is_open(ts("2024-12-07T11:00:00+05:30")));
    }

    #[test]
    fn next_close_same_day() {
        let session = MarketSession::nse();
        let close = session.next_close(ts("2024-12-02T10:00:00+05:30")).unwrap();
        assert_eq!(close, ts("2024-12-02T15:30:00+05:30"));
    }

    #[test]
    fn next_close_skips_weekend() {
        let session = MarketSession::nse();
        let close = session.next_close(ts("2024-12-06T16:00:00+05:30")).unwrap();
        assert_eq!(close, ts("2024-12-09T15:30:00+05:30"));
    }

    #[test]
    fn expiry_for_after_market_order_is_next_session_close() {
        let session = MarketSession::nse();
        let expiry = session.expiry_for(ts("2024-12-02T18:00:00+05:30")).unwrap();
        assert_eq!(expiry, ts("2024-12-03T15:30:00+05:30"));
    }

    #[test]
    fn expiry_for_live_order_is_today_close() {
        let session = MarketSession::nse();
        let expiry = session.expiry_for(ts("2024-12-02T11:00:00+05:30")).unwrap();
        assert_eq!(expiry, ts("2024-12-02T15:30:00+05:30"));
    }

    #[test]
    fn new_rejects_inverted_window() {
        let open = NaiveTime::from_hms_opt(15, 30, 0).unwrap();
        let close = NaiveTime::from_hms_opt(9, 15, 0).unwrap();
        assert!(MarketSession::new(open, close, 330, vec![Weekday::Mon]).is_err());
    }
}
