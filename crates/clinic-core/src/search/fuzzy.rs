//! Fuzzy name search: word-wise weighted edit distance over candidates,
//! sharded across scoped worker threads.

use crate::models::{ScoredMatch, SearchCandidate};

use super::distance::score;
use super::{CancelToken, SearchConfig, SearchError};

/// Candidate counts below this are scored on the calling thread; the
/// thread-spawn overhead is not worth it.
const PARALLEL_THRESHOLD: usize = 512;

/// How many candidates are scored between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 64;

/// Split a name into scoring tokens: whitespace-separated words, each
/// lowercased with non-letters dropped. Digits are stripped too, so a
/// record-number annotation like "(134)" or a trailing "123" never skews
/// the distance; purely numeric words vanish entirely.
pub(super) fn name_tokens(name: &str) -> Vec<String> {
    name.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphabetic())
                .flat_map(|c| c.to_lowercase())
                .collect::<String>()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// Score a candidate name against pre-tokenized query words.
///
/// Query words are zipped with name words in order; extra name words (a
/// surname the caller did not type) cost nothing. Per-pair distances share
/// one cutoff budget, so the sum can never exceed `cutoff`.
fn score_name(
    query_tokens: &[String],
    candidate_name: &str,
    config: &SearchConfig,
) -> Option<u32> {
    let candidate_tokens = name_tokens(candidate_name);
    if candidate_tokens.is_empty() {
        return None;
    }

    let mut total = 0u32;
    for (query_word, candidate_word) in query_tokens.iter().zip(&candidate_tokens) {
        let remaining = config.cutoff - total;
        total += score(query_word, candidate_word, &config.costs, remaining)?;
    }
    Some(total)
}

fn score_chunk(
    chunk: &[SearchCandidate],
    query_tokens: &[String],
    config: &SearchConfig,
    cancel: &CancelToken,
) -> Result<Vec<ScoredMatch>, SearchError> {
    let mut matches = Vec::new();
    for (i, candidate) in chunk.iter().enumerate() {
        if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        if let Some(cost) = score_name(query_tokens, &candidate.full_name, config) {
            matches.push(ScoredMatch {
                uuid: candidate.uuid.clone(),
                cost,
            });
        }
    }
    Ok(matches)
}

/// Score every candidate against `query`, returning surviving matches sorted
/// ascending by cost (stable, so ties keep store order) and truncated to the
/// configured maximum.
///
/// Scoring is sharded across scoped threads in contiguous chunks, which
/// preserves candidate order when the shard outputs are concatenated. All
/// state is per call; cancelling one search cannot disturb another.
pub fn fuzzy_search(
    candidates: &[SearchCandidate],
    query: &str,
    config: &SearchConfig,
    cancel: &CancelToken,
) -> Result<Vec<ScoredMatch>, SearchError> {
    let query_tokens = name_tokens(query);
    if query_tokens.is_empty() || candidates.is_empty() {
        return Ok(Vec::new());
    }

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    let mut matches = if candidates.len() < PARALLEL_THRESHOLD || workers == 1 {
        score_chunk(candidates, &query_tokens, config, cancel)?
    } else {
        let chunk_size = candidates.len().div_ceil(workers);
        let shards = std::thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .chunks(chunk_size)
                .map(|chunk| {
                    let query_tokens = &query_tokens;
                    scope.spawn(move || score_chunk(chunk, query_tokens, config, cancel))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect::<Result<Vec<_>, SearchError>>()
        })?;
        shards.into_iter().flatten().collect()
    };

    matches.sort_by_key(|m| m.cost);
    matches.truncate(config.max_results);
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::super::EditCosts;
    use super::*;

    fn candidates(names: &[&str]) -> Vec<SearchCandidate> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| SearchCandidate {
                uuid: format!("p-{i}"),
                full_name: (*name).to_string(),
            })
            .collect()
    }

    #[test]
    fn test_tokenization_strips_noise() {
        assert_eq!(name_tokens("Ashok(134)  Sharma"), vec!["ashok", "sharma"]);
        assert_eq!(name_tokens("Ashok Sharma123"), vec!["ashok", "sharma"]);
        assert_eq!(name_tokens("Ashok 123 Sharma"), vec!["ashok", "sharma"]);
        assert_eq!(name_tokens("  \t "), Vec::<String>::new());
        assert_eq!(name_tokens("123 456"), Vec::<String>::new());
    }

    #[test]
    fn test_digit_annotated_names_match_their_clean_form() {
        let candidates = candidates(&[
            "Ashok Sharma",
            "Ashok Sharma123",
            "Ashok 123 Sharma",
            "Ashok Sharma(2345)",
            "Ashok(134) Sharma",
        ]);

        let matches = fuzzy_search(
            &candidates,
            "Ashok Sharma",
            &SearchConfig::weighted(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(matches.len(), 5);
        assert!(matches.iter().all(|m| m.cost == 0));
    }

    #[test]
    fn test_ranked_by_cost_with_stable_ties() {
        let candidates = candidates(&["Amith Kumar", "Amit Kumar", "Sumit Kumar", "Amit Singh"]);
        let config = SearchConfig::weighted();

        let matches =
            fuzzy_search(&candidates, "Amit", &config, &CancelToken::new()).unwrap();

        let ranked: Vec<(&str, u32)> = matches
            .iter()
            .map(|m| (m.uuid.as_str(), m.cost))
            .collect();
        // Exact matches keep store order among themselves, one-insertion and
        // substitute-plus-insert matches follow.
        assert_eq!(ranked, vec![("p-1", 0), ("p-3", 0), ("p-0", 100), ("p-2", 250)]);
    }

    #[test]
    fn test_extra_name_words_are_free() {
        let candidates = candidates(&["Rahul Shenoy", "Rahul Sharma"]);
        let config = SearchConfig::weighted();

        let matches =
            fuzzy_search(&candidates, "Rahul", &config, &CancelToken::new()).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.cost == 0));
    }

    #[test]
    fn test_per_word_costs_share_one_budget() {
        // Each word is 60 under uniform-30 costs; 120 total busts a 100 cutoff.
        let candidates = candidates(&["Kamles Mistry", "Kamlesh Mistry"]);
        let config = SearchConfig {
            costs: EditCosts::new(30, 30, 30),
            cutoff: 100,
            ..SearchConfig::weighted()
        };

        let matches =
            fuzzy_search(&candidates, "Khamlesh Mistree", &config, &CancelToken::new()).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].uuid, "p-1");
    }

    #[test]
    fn test_candidates_beyond_cutoff_are_dropped() {
        let candidates = candidates(&["Amit Kumar", "Rahul Sharma"]);
        let config = SearchConfig::weighted();

        let matches =
            fuzzy_search(&candidates, "Amit", &config, &CancelToken::new()).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].uuid, "p-0");
    }

    #[test]
    fn test_truncated_to_max_results() {
        let candidates = candidates(&["Amit", "Amit", "Amit"]);
        let config = SearchConfig {
            max_results: 2,
            ..SearchConfig::weighted()
        };

        let matches =
            fuzzy_search(&candidates, "Amit", &config, &CancelToken::new()).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_cancelled_search_bails_out() {
        let candidates = candidates(&["Amit Kumar"]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = fuzzy_search(&candidates, "Amit", &SearchConfig::weighted(), &cancel);
        assert!(matches!(result, Err(SearchError::Cancelled)));
    }

    #[test]
    fn test_large_candidate_set_uses_shards() {
        // Enough candidates to cross the parallel threshold.
        let names: Vec<String> = (0..2000).map(|i| format!("Patient {i}")).collect();
        let mut candidates: Vec<SearchCandidate> = names
            .iter()
            .enumerate()
            .map(|(i, name)| SearchCandidate {
                uuid: format!("p-{i}"),
                full_name: name.clone(),
            })
            .collect();
        candidates.push(SearchCandidate {
            uuid: "target".into(),
            full_name: "Amit Kumar".into(),
        });

        let matches =
            fuzzy_search(&candidates, "Amit", &SearchConfig::weighted(), &CancelToken::new())
                .unwrap();
        assert!(matches.iter().any(|m| m.uuid == "target"));
    }
}
