//! Patient search: exact prefix/digit lookup plus fuzzy name matching,
//! merged into one ranked result list.

mod age_window;
mod distance;
mod fuzzy;
mod merge;

pub use age_window::date_of_birth_range;
pub use distance::{score, EditCosts};
pub use fuzzy::fuzzy_search;
pub use merge::merge_results;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{searchable_name, PatientProfile};

/// Search errors.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),

    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Search was cancelled")]
    Cancelled,
}

/// Cooperative cancellation flag for an in-flight search, shared with the
/// caller that may supersede it with a newer query.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Tuning knobs for a search run.
///
/// The two presets mirror the two fuzzy-matching configurations the system
/// historically shipped with. Their cutoffs are not on the same scale, so
/// neither is "the correct one"; callers pick per deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub costs: EditCosts,
    pub cutoff: u32,
    pub max_results: usize,
    pub age_fuzziness_years: u32,
}

impl SearchConfig {
    /// Explicit weighted-Levenshtein tuning: costs 150/100/100, cutoff 350.
    pub fn weighted() -> Self {
        Self {
            costs: EditCosts::new(150, 100, 100),
            cutoff: 350,
            max_results: 100,
            age_fuzziness_years: 5,
        }
    }

    /// Same cost table with the wider cutoff (750) the store-native
    /// approximate-distance path used.
    pub fn spellfix_compat() -> Self {
        Self {
            cutoff: 750,
            ..Self::weighted()
        }
    }

    /// Reject a malformed configuration before any store access.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.cutoff == 0 {
            return Err(SearchError::InvalidConfig("cutoff must be positive".into()));
        }
        if self.max_results == 0 {
            return Err(SearchError::InvalidConfig(
                "max_results must be positive".into(),
            ));
        }
        if self.costs.substitution == 0 || self.costs.insertion == 0 || self.costs.deletion == 0 {
            return Err(SearchError::InvalidConfig(
                "edit costs must all be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::weighted()
    }
}

/// Orchestrates a search request against the store.
pub struct SearchEngine<'a> {
    db: &'a Database,
    config: SearchConfig,
}

impl<'a> SearchEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            config: SearchConfig::weighted(),
        }
    }

    pub fn with_config(db: &'a Database, config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self { db, config })
    }

    /// Run a search. Exact lookup always runs; fuzzy scoring is skipped for
    /// purely numeric queries (phone-number searches) and when the caller
    /// disables it. Results come back best fuzzy match first, then exact
    /// matches not already covered, hydrated into full profiles.
    pub fn search(
        &self,
        query: &str,
        assumed_age: Option<u32>,
        fuzzy_enabled: bool,
        cancel: &CancelToken,
    ) -> Result<Vec<PatientProfile>, SearchError> {
        let normalized = searchable_name(query);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let dob_range = assumed_age.map(|age| {
            date_of_birth_range(
                age,
                self.config.age_fuzziness_years,
                chrono::Utc::now().date_naive(),
            )
        });

        let numeric = normalized.bytes().all(|b| b.is_ascii_digit());
        if numeric || !fuzzy_enabled {
            let exact = self.db.exact_search(&normalized, dob_range.as_ref())?;
            tracing::debug!(results = exact.len(), fuzzy = false, "search completed");
            return Ok(self.db.hydrate(&exact)?);
        }

        // The store handle is not shareable across threads, so candidates
        // are enumerated up front; the pure-CPU scoring then runs on worker
        // threads while the exact lookup proceeds on the calling thread.
        let candidates = self.db.enumerate_candidates(dob_range.as_ref())?;
        let config = &self.config;
        let (fuzzy_result, exact_result) = std::thread::scope(|scope| {
            let handle = scope.spawn(|| fuzzy_search(&candidates, query, config, cancel));
            let exact = self.db.exact_search(&normalized, dob_range.as_ref());
            let fuzzy = match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            (fuzzy, exact)
        });
        let fuzzy_matches = fuzzy_result?;
        let exact = exact_result?;

        let merged = merge_results(&fuzzy_matches, &exact);
        tracing::debug!(
            fuzzy = fuzzy_matches.len(),
            exact = exact.len(),
            results = merged.len(),
            "search completed"
        );
        Ok(self.db.hydrate(&merged)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(SearchConfig::weighted().validate().is_ok());
        assert!(SearchConfig::spellfix_compat().validate().is_ok());
        assert_eq!(SearchConfig::spellfix_compat().cutoff, 750);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let db = Database::open_in_memory().unwrap();

        let zero_cutoff = SearchConfig {
            cutoff: 0,
            ..SearchConfig::weighted()
        };
        assert!(matches!(
            SearchEngine::with_config(&db, zero_cutoff),
            Err(SearchError::InvalidConfig(_))
        ));

        let zero_cost = SearchConfig {
            costs: EditCosts::new(150, 0, 100),
            ..SearchConfig::weighted()
        };
        assert!(matches!(
            SearchEngine::with_config(&db, zero_cost),
            Err(SearchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_query_returns_empty_without_error() {
        let db = Database::open_in_memory().unwrap();
        let engine = SearchEngine::new(&db);

        let results = engine
            .search("  .. ", None, true, &CancelToken::new())
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
