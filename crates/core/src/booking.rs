//! Booking lifecycle and time-range rules.
//!
//! A booking reserves a half-open interval `[start, end)` of a room. It is
//! created `pending`, becomes `confirmed` once paid, and ends either
//! `completed` (the session took place) or `cancelled`.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{MinorUnits, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Shortest bookable session.
pub const MIN_BOOKING_MINUTES: i64 = 60;

/// Longest bookable session.
pub const MAX_BOOKING_HOURS: i64 = 24;

/// Booking start and end must fall on this grid.
pub const SLOT_GRANULARITY_MINUTES: u32 = 30;

/// How far ahead a room can be booked.
pub const MAX_ADVANCE_DAYS: i64 = 180;

/// Clients may cancel a confirmed booking only this long before it starts.
pub const CANCELLATION_CUTOFF_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Booking status as stored in `bookings.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Cancelled and completed bookings never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Whether a booking in this status occupies its time slot.
    pub fn blocks_slot(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Status values that occupy a slot, for `status = ANY($n)` queries.
    pub fn blocking_values() -> Vec<String> {
        [BookingStatus::Pending, BookingStatus::Confirmed]
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(CoreError::Validation(format!(
                "Unknown booking status '{other}'"
            ))),
        }
    }
}

/// Returns the statuses reachable from `from`.
pub fn valid_transitions(from: BookingStatus) -> &'static [BookingStatus] {
    match from {
        BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
        BookingStatus::Confirmed => &[BookingStatus::Completed, BookingStatus::Cancelled],
        BookingStatus::Cancelled | BookingStatus::Completed => &[],
    }
}

pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    valid_transitions(from).contains(&to)
}

pub fn validate_transition(from: BookingStatus, to: BookingStatus) -> Result<(), CoreError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Booking cannot move from {from} to {to}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Time ranges
// ---------------------------------------------------------------------------

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, CoreError> {
        if start >= end {
            return Err(CoreError::Validation(
                "Booking start must be before its end".into(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Back-to-back ranges (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: Timestamp) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// The UTC day `[date 00:00, date+1 00:00)`.
///
/// Fails for the last representable calendar day.
pub fn day_window(date: NaiveDate) -> Result<TimeRange, CoreError> {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_signed(Duration::days(1))
        .ok_or_else(|| CoreError::Validation("date is out of range".into()))?;
    Ok(TimeRange { start, end })
}

fn on_grid(ts: Timestamp) -> bool {
    ts.second() == 0 && ts.nanosecond() == 0 && ts.minute() % SLOT_GRANULARITY_MINUTES == 0
}

/// Validate a requested booking window against the booking rules.
pub fn validate_booking_window(range: &TimeRange, now: Timestamp) -> Result<(), CoreError> {
    if range.start <= now {
        return Err(CoreError::Validation(
            "Booking must start in the future".into(),
        ));
    }
    if !on_grid(range.start) || !on_grid(range.end) {
        return Err(CoreError::Validation(format!(
            "Booking times must be aligned to {SLOT_GRANULARITY_MINUTES}-minute slots"
        )));
    }
    let duration = range.duration();
    if duration < Duration::minutes(MIN_BOOKING_MINUTES) {
        return Err(CoreError::Validation(format!(
            "Booking must last at least {MIN_BOOKING_MINUTES} minutes"
        )));
    }
    if duration > Duration::hours(MAX_BOOKING_HOURS) {
        return Err(CoreError::Validation(format!(
            "Booking must not exceed {MAX_BOOKING_HOURS} hours"
        )));
    }
    if range.start > now + Duration::days(MAX_ADVANCE_DAYS) {
        return Err(CoreError::Validation(format!(
            "Bookings can be made at most {MAX_ADVANCE_DAYS} days in advance"
        )));
    }
    Ok(())
}

/// Price of a booking, charged per started half hour and rounded half up.
pub fn calculate_price(hourly_price: MinorUnits, range: &TimeRange) -> Result<MinorUnits, CoreError> {
    let minutes = range.duration().num_minutes().max(0);
    let granularity = i64::from(SLOT_GRANULARITY_MINUTES);
    let slots = (minutes + granularity - 1) / granularity;
    let slots_per_hour = 60 / granularity;
    hourly_price
        .checked_mul(slots)
        .and_then(|total| total.checked_add(slots_per_hour / 2))
        .map(|total| total / slots_per_hour)
        .ok_or_else(|| CoreError::Validation("booking price is too large".into()))
}

// ---------------------------------------------------------------------------
// Cancellation / expiry
// ---------------------------------------------------------------------------

/// Who is asking to cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canceller {
    Client,
    Owner,
}

pub fn check_cancellation(
    status: BookingStatus,
    start: Timestamp,
    now: Timestamp,
    by: Canceller,
) -> Result<(), CoreError> {
    validate_transition(status, BookingStatus::Cancelled)?;

    if by == Canceller::Client
        && status == BookingStatus::Confirmed
        && start - now < Duration::hours(CANCELLATION_CUTOFF_HOURS)
    {
        return Err(CoreError::Conflict(format!(
            "Confirmed bookings can only be cancelled at least {CANCELLATION_CUTOFF_HOURS} hours before start"
        )));
    }
    Ok(())
}

/// Owners may complete a confirmed booking once its session is over.
pub fn check_completion(
    status: BookingStatus,
    end: Timestamp,
    now: Timestamp,
) -> Result<(), CoreError> {
    validate_transition(status, BookingStatus::Completed)?;
    if now < end {
        return Err(CoreError::Conflict(
            "A booking cannot be completed before it ends".into(),
        ));
    }
    Ok(())
}

/// A pending booking whose payment window has elapsed no longer holds its slot.
pub fn payment_window_elapsed(created_at: Timestamp, now: Timestamp, timeout_mins: i64) -> bool {
    now - created_at >= Duration::minutes(timeout_mins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2030, 5, 10, h, m, 0).unwrap()
    }

    fn now() -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap()
    }

    // -- transitions ---------------------------------------------------------

    #[test]
    fn pending_can_be_confirmed_or_cancelled() {
        assert!(can_transition(BookingStatus::Pending, BookingStatus::Confirmed));
        assert!(can_transition(BookingStatus::Pending, BookingStatus::Cancelled));
        assert!(!can_transition(BookingStatus::Pending, BookingStatus::Completed));
    }

    #[test]
    fn confirmed_can_complete_or_cancel() {
        assert!(can_transition(BookingStatus::Confirmed, BookingStatus::Completed));
        assert!(can_transition(BookingStatus::Confirmed, BookingStatus::Cancelled));
        assert!(!can_transition(BookingStatus::Confirmed, BookingStatus::Pending));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for s in [BookingStatus::Cancelled, BookingStatus::Completed] {
            assert!(s.is_terminal());
            assert!(valid_transitions(s).is_empty());
        }
    }

    #[test]
    fn same_state_transition_is_rejected() {
        assert_matches!(
            validate_transition(BookingStatus::Confirmed, BookingStatus::Confirmed),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn status_parses_from_db_text() {
        assert_eq!("confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert!("archived".parse::<BookingStatus>().is_err());
        assert_eq!(BookingStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn only_pending_and_confirmed_block() {
        assert!(BookingStatus::Pending.blocks_slot());
        assert!(BookingStatus::Confirmed.blocks_slot());
        assert!(!BookingStatus::Cancelled.blocks_slot());
        assert_eq!(BookingStatus::blocking_values(), vec!["pending", "confirmed"]);
    }

    // -- ranges --------------------------------------------------------------

    #[test]
    fn empty_range_is_rejected() {
        assert!(TimeRange::new(at(10, 0), at(10, 0)).is_err());
        assert!(TimeRange::new(at(11, 0), at(10, 0)).is_err());
    }

    #[test]
    fn back_to_back_ranges_do_not_overlap() {
        let a = TimeRange::new(at(10, 0), at(12, 0)).unwrap();
        let b = TimeRange::new(at(12, 0), at(14, 0)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn partial_and_nested_ranges_overlap() {
        let a = TimeRange::new(at(10, 0), at(12, 0)).unwrap();
        let partial = TimeRange::new(at(11, 30), at(13, 0)).unwrap();
        let nested = TimeRange::new(at(10, 30), at(11, 0)).unwrap();
        assert!(a.overlaps(&partial));
        assert!(a.overlaps(&nested));
        assert!(nested.overlaps(&a));
    }

    #[test]
    fn day_window_spans_24_hours() {
        let w = day_window(NaiveDate::from_ymd_opt(2030, 5, 10).unwrap()).unwrap();
        assert_eq!(w.start, at(0, 0));
        assert_eq!(w.duration(), Duration::hours(24));
        assert!(w.contains(at(23, 30)));
    }

    #[test]
    fn day_window_of_last_representable_day_is_rejected() {
        assert_matches!(day_window(NaiveDate::MAX), Err(CoreError::Validation(_)));
        assert!(day_window(NaiveDate::MAX.pred_opt().unwrap()).is_ok());
    }

    // -- window validation ---------------------------------------------------

    #[test]
    fn valid_window_passes() {
        let r = TimeRange::new(at(10, 0), at(12, 30)).unwrap();
        assert!(validate_booking_window(&r, now()).is_ok());
    }

    #[test]
    fn past_start_is_rejected() {
        let r = TimeRange::new(at(10, 0), at(12, 0)).unwrap();
        let later = chrono::Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
        assert_matches!(validate_booking_window(&r, later), Err(CoreError::Validation(_)));
    }

    #[test]
    fn misaligned_times_are_rejected() {
        let r = TimeRange::new(at(10, 15), at(12, 0)).unwrap();
        assert_matches!(validate_booking_window(&r, now()), Err(CoreError::Validation(_)));
    }

    #[test]
    fn too_short_and_too_long_are_rejected() {
        let short = TimeRange::new(at(10, 0), at(10, 30)).unwrap();
        assert!(validate_booking_window(&short, now()).is_err());

        let long = TimeRange::new(at(0, 0), at(0, 0) + Duration::hours(25)).unwrap();
        assert!(validate_booking_window(&long, now()).is_err());
    }

    #[test]
    fn too_far_ahead_is_rejected() {
        let start = now() + Duration::days(MAX_ADVANCE_DAYS + 1);
        let start = start.with_minute(0).unwrap();
        let r = TimeRange::new(start, start + Duration::hours(2)).unwrap();
        assert!(validate_booking_window(&r, now()).is_err());
    }

    // -- pricing -------------------------------------------------------------

    #[test]
    fn price_for_whole_hours() {
        let r = TimeRange::new(at(10, 0), at(13, 0)).unwrap();
        assert_eq!(calculate_price(200_000, &r).unwrap(), 600_000);
    }

    #[test]
    fn price_for_half_hours() {
        let r = TimeRange::new(at(10, 0), at(11, 30)).unwrap();
        assert_eq!(calculate_price(150_000, &r).unwrap(), 225_000);
    }

    #[test]
    fn odd_hourly_price_rounds_half_up() {
        let r = TimeRange::new(at(10, 0), at(11, 30)).unwrap();
        // 3 half hours of 101 = 151.5
        assert_eq!(calculate_price(101, &r).unwrap(), 152);
    }

    #[test]
    fn overflowing_price_is_rejected() {
        let r = TimeRange::new(at(0, 0), at(0, 0) + Duration::hours(24)).unwrap();
        assert_matches!(calculate_price(i64::MAX / 4, &r), Err(CoreError::Validation(_)));
    }

    // -- cancellation --------------------------------------------------------

    #[test]
    fn client_cancels_pending_any_time() {
        let start = now() + Duration::hours(1);
        assert!(check_cancellation(BookingStatus::Pending, start, now(), Canceller::Client).is_ok());
    }

    #[test]
    fn client_cannot_cancel_confirmed_inside_cutoff() {
        let start = now() + Duration::hours(CANCELLATION_CUTOFF_HOURS - 1);
        assert_matches!(
            check_cancellation(BookingStatus::Confirmed, start, now(), Canceller::Client),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn owner_can_cancel_confirmed_inside_cutoff() {
        let start = now() + Duration::hours(1);
        assert!(check_cancellation(BookingStatus::Confirmed, start, now(), Canceller::Owner).is_ok());
    }

    #[test]
    fn completed_booking_cannot_be_cancelled() {
        let start = now() + Duration::days(3);
        assert!(check_cancellation(BookingStatus::Completed, start, now(), Canceller::Owner).is_err());
    }

    #[test]
    fn completion_requires_finished_confirmed_booking() {
        let end = now() + Duration::hours(2);
        assert!(check_completion(BookingStatus::Confirmed, end, now()).is_err());
        assert!(check_completion(BookingStatus::Confirmed, now(), now()).is_ok());
        assert!(check_completion(BookingStatus::Pending, now(), now()).is_err());
    }

    #[test]
    fn payment_window() {
        let created = now();
        assert!(!payment_window_elapsed(created, created + Duration::minutes(29), 30));
        assert!(payment_window_elapsed(created, created + Duration::minutes(30), 30));
    }
}
