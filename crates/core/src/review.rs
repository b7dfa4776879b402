//! Review validation and eligibility rules.

use crate::booking::BookingStatus;
use crate::error::CoreError;
use crate::types::DbId;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

/// Maximum length for review text.
pub const MAX_REVIEW_LENGTH: usize = 2_000;

pub fn validate_review(rating: i16, text: Option<&str>) -> Result<(), CoreError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(CoreError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    if let Some(text) = text {
        if text.chars().count() > MAX_REVIEW_LENGTH {
            return Err(CoreError::Validation(format!(
                "Review text must not exceed {MAX_REVIEW_LENGTH} characters"
            )));
        }
    }
    Ok(())
}

/// Only the client of a completed booking may review it.
pub fn check_can_review(
    status: BookingStatus,
    booking_client_id: DbId,
    user_id: DbId,
) -> Result<(), CoreError> {
    if booking_client_id != user_id {
        return Err(CoreError::Forbidden(
            "Only the client who made the booking can review it".into(),
        ));
    }
    if status != BookingStatus::Completed {
        return Err(CoreError::Conflict(
            "Only completed bookings can be reviewed".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn rating_bounds() {
        assert!(validate_review(1, None).is_ok());
        assert!(validate_review(5, Some("Great light")).is_ok());
        assert!(validate_review(0, None).is_err());
        assert!(validate_review(6, None).is_err());
    }

    #[test]
    fn long_text_is_rejected() {
        let text = "a".repeat(MAX_REVIEW_LENGTH + 1);
        assert!(validate_review(4, Some(&text)).is_err());
    }

    #[test]
    fn stranger_cannot_review() {
        assert_matches!(
            check_can_review(BookingStatus::Completed, 1, 2),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn unfinished_booking_cannot_be_reviewed() {
        assert_matches!(
            check_can_review(BookingStatus::Confirmed, 1, 1),
            Err(CoreError::Conflict(_))
        );
        assert!(check_can_review(BookingStatus::Completed, 1, 1).is_ok());
    }
}
