//! Combining fuzzy and exact search output.

use std::collections::HashSet;

use crate::models::ScoredMatch;

/// Merge fuzzy and exact results into one ordered identifier list.
///
/// Fuzzy matches come first (they carry a meaningful rank), then exact
/// matches not already covered, in store order. First occurrence wins, so
/// the output never contains a duplicate.
pub fn merge_results(fuzzy: &[ScoredMatch], exact: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(fuzzy.len() + exact.len());
    for scored in fuzzy {
        if seen.insert(scored.uuid.as_str()) {
            merged.push(scored.uuid.clone());
        }
    }
    for uuid in exact {
        if seen.insert(uuid.as_str()) {
            merged.push(uuid.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(uuid: &str, cost: u32) -> ScoredMatch {
        ScoredMatch {
            uuid: uuid.into(),
            cost,
        }
    }

    #[test]
    fn test_fuzzy_rank_comes_first() {
        let fuzzy = vec![scored("b", 0), scored("a", 100)];
        let exact = vec!["a".to_string(), "c".to_string()];

        assert_eq!(merge_results(&fuzzy, &exact), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_no_duplicates_and_deterministic() {
        let fuzzy = vec![scored("a", 0), scored("a", 50)];
        let exact = vec!["a".to_string(), "a".to_string()];

        let first = merge_results(&fuzzy, &exact);
        assert_eq!(first, vec!["a"]);
        assert_eq!(merge_results(&fuzzy, &exact), first);
    }

    #[test]
    fn test_either_side_may_be_empty() {
        assert!(merge_results(&[], &[]).is_empty());
        assert_eq!(
            merge_results(&[], &["a".to_string()]),
            vec!["a".to_string()]
        );
        assert_eq!(merge_results(&[scored("a", 0)], &[]), vec!["a".to_string()]);
    }
}
