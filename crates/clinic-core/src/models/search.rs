//! Ephemeral search projections. Never persisted.

use chrono::NaiveDate;

/// Inclusive date-of-birth window derived from an assumed age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateOfBirthRange {
    pub lower: NaiveDate,
    pub upper: NaiveDate,
}

/// Lightweight (identifier, name) projection used for scoring. Carries the
/// display name: fuzzy matching works word by word, so the space-stripped
/// searchable form is not usable here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub uuid: String,
    pub full_name: String,
}

/// A candidate that survived scoring. Lower cost is a closer match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredMatch {
    pub uuid: String,
    pub cost: u32,
}
