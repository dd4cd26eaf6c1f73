//! Assumed-age to date-of-birth window conversion.

use chrono::{Months, NaiveDate};

use crate::models::DateOfBirthRange;

/// Convert an assumed age plus a fuzziness tolerance into an inclusive
/// date-of-birth window around `today`.
///
/// Someone assumed to be 40 with a tolerance of 5 years was born at most
/// 45 and at least 35 years ago. The tolerance saturates at age 0 rather
/// than producing a birth date in the future.
pub fn date_of_birth_range(
    assumed_age: u32,
    fuzziness_years: u32,
    today: NaiveDate,
) -> DateOfBirthRange {
    let oldest = assumed_age.saturating_add(fuzziness_years);
    let youngest = assumed_age.saturating_sub(fuzziness_years);
    DateOfBirthRange {
        lower: today
            .checked_sub_months(Months::new(oldest.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN),
        upper: today
            .checked_sub_months(Months::new(youngest.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_spans_tolerance_both_ways() {
        let range = date_of_birth_range(40, 5, date(2024, 6, 15));
        assert_eq!(range.lower, date(1979, 6, 15));
        assert_eq!(range.upper, date(1989, 6, 15));
    }

    #[test]
    fn test_zero_tolerance_collapses_to_one_year_point() {
        let range = date_of_birth_range(30, 0, date(2024, 6, 15));
        assert_eq!(range.lower, date(1994, 6, 15));
        assert_eq!(range.upper, range.lower);
    }

    #[test]
    fn test_tolerance_saturates_at_age_zero() {
        let range = date_of_birth_range(2, 5, date(2024, 6, 15));
        assert_eq!(range.lower, date(2017, 6, 15));
        // Youngest possible is a newborn, not someone born in the future.
        assert_eq!(range.upper, date(2024, 6, 15));
    }
}
