use chrono::{Days, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityError {
    /// Check-out is on or before check-in.
    EmptyRange,
    StartsInPast,
    DatesUnavailable,
}

impl std::fmt::Display for AvailabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvailabilityError::EmptyRange => write!(f, "Check-out must be after check-in"),
            AvailabilityError::StartsInPast => write!(f, "Check-in date is in the past"),
            AvailabilityError::DatesUnavailable => {
                write!(f, "The selected dates are no longer available")
            }
        }
    }
}

impl std::error::Error for AvailabilityError {}

/// Calendar interval of a stay. Both endpoints are occupied nights for
/// overlap purposes, so `from == to` on another range still conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, AvailabilityError> {
        if to <= from {
            return Err(AvailabilityError::EmptyRange);
        }
        Ok(Self { from, to })
    }

    pub fn start(&self) -> NaiveDate {
        self.from
    }

    pub fn end(&self) -> NaiveDate {
        self.to
    }

    pub fn nights(&self) -> i64 {
        (self.to - self.from).num_days()
    }

    /// Closed-interval intersection: touching boundaries count as overlap,
    /// so a check-in on another booking's check-out date is a conflict.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.from <= other.to && self.to >= other.from
    }

    /// Every calendar day covered by the range, endpoints included.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(self.nights() as usize + 1);
        let mut day = self.from;
        while day <= self.to {
            days.push(day);
            day = match day.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }
        days
    }
}

pub struct AvailabilityService;

impl AvailabilityService {
    /// Decide whether a candidate stay is selectable against the blocking
    /// reservations of a property. Pure and synchronous; callers fetch the
    /// booked ranges first.
    pub fn check_available(
        candidate: &DateRange,
        booked: &[DateRange],
        today: NaiveDate,
    ) -> Result<(), AvailabilityError> {
        if candidate.start() < today {
            return Err(AvailabilityError::StartsInPast);
        }
        if booked.iter().any(|b| candidate.overlaps(b)) {
            return Err(AvailabilityError::DatesUnavailable);
        }
        Ok(())
    }

    /// All individually blocked calendar days, for disabling date-picker
    /// cells before a selection can even start.
    pub fn blocked_dates(booked: &[DateRange]) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = booked.iter().flat_map(|r| r.days()).collect();
        dates.sort();
        dates.dedup();
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range(from: (i32, u32, u32), to: (i32, u32, u32)) -> DateRange {
        DateRange::new(date(from.0, from.1, from.2), date(to.0, to.1, to.2)).unwrap()
    }

    #[test]
    fn rejects_zero_night_range() {
        let day = date(2024, 3, 10);
        assert_eq!(
            DateRange::new(day, day).unwrap_err(),
            AvailabilityError::EmptyRange
        );
    }

    #[test]
    fn rejects_reversed_range() {
        assert!(DateRange::new(date(2024, 3, 12), date(2024, 3, 10)).is_err());
    }

    #[test]
    fn counts_nights() {
        assert_eq!(range((2024, 3, 10), (2024, 3, 13)).nights(), 3);
    }

    #[test]
    fn rejects_past_check_in() {
        let candidate = range((2024, 3, 10), (2024, 3, 12));
        let err = AvailabilityService::check_available(&candidate, &[], date(2024, 3, 11));
        assert_eq!(err.unwrap_err(), AvailabilityError::StartsInPast);
    }

    #[test]
    fn rejects_partially_overlapping_range() {
        // 2024-03-10..12 against booked 2024-03-11..14
        let candidate = range((2024, 3, 10), (2024, 3, 12));
        let booked = vec![range((2024, 3, 11), (2024, 3, 14))];
        let err = AvailabilityService::check_available(&candidate, &booked, date(2024, 3, 1));
        assert_eq!(err.unwrap_err(), AvailabilityError::DatesUnavailable);
    }

    #[test]
    fn rejects_range_inside_booked_range() {
        let candidate = range((2024, 5, 3), (2024, 5, 4));
        let booked = vec![range((2024, 5, 1), (2024, 5, 10))];
        assert!(AvailabilityService::check_available(&candidate, &booked, date(2024, 4, 1)).is_err());
    }

    #[test]
    fn touching_boundary_conflicts() {
        // Candidate check-in on an existing check-out date.
        let candidate = range((2024, 3, 14), (2024, 3, 16));
        let booked = vec![range((2024, 3, 11), (2024, 3, 14))];
        let err = AvailabilityService::check_available(&candidate, &booked, date(2024, 3, 1));
        assert_eq!(err.unwrap_err(), AvailabilityError::DatesUnavailable);
    }

    #[test]
    fn accepts_clear_future_range() {
        let candidate = range((2024, 6, 1), (2024, 6, 5));
        let booked = vec![
            range((2024, 5, 1), (2024, 5, 10)),
            range((2024, 6, 6), (2024, 6, 9)),
        ];
        assert!(
            AvailabilityService::check_available(&candidate, &booked, date(2024, 4, 1)).is_ok()
        );
    }

    #[test]
    fn blocked_dates_expand_and_dedup() {
        let booked = vec![
            range((2024, 3, 10), (2024, 3, 12)),
            range((2024, 3, 12), (2024, 3, 13)),
        ];
        let days = AvailabilityService::blocked_dates(&booked);
        assert_eq!(
            days,
            vec![
                date(2024, 3, 10),
                date(2024, 3, 11),
                date(2024, 3, 12),
                date(2024, 3, 13),
            ]
        );
    }
}
