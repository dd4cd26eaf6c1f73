//! Property tests for the distance scorer and result merger.

use clinic_core::models::ScoredMatch;
use clinic_core::search::{merge_results, score, EditCosts};
use proptest::prelude::*;

/// Unbounded reference implementation: full DP matrix, no cutoff.
fn reference_distance(query: &str, candidate: &str, costs: &EditCosts) -> u64 {
    let q: Vec<char> = query.chars().collect();
    let c: Vec<char> = candidate.chars().collect();
    let ins = u64::from(costs.insertion);
    let del = u64::from(costs.deletion);
    let sub = u64::from(costs.substitution);

    let mut matrix = vec![vec![0u64; c.len() + 1]; q.len() + 1];
    for (j, cell) in matrix[0].iter_mut().enumerate() {
        *cell = j as u64 * ins;
    }
    for i in 1..=q.len() {
        matrix[i][0] = i as u64 * del;
        for j in 1..=c.len() {
            let subst = matrix[i - 1][j - 1] + if q[i - 1] == c[j - 1] { 0 } else { sub };
            let deleted = matrix[i - 1][j] + del;
            let inserted = matrix[i][j - 1] + ins;
            matrix[i][j] = subst.min(deleted).min(inserted);
        }
    }
    matrix[q.len()][c.len()]
}

fn cost_strategy() -> impl Strategy<Value = EditCosts> {
    (1u32..=500, 1u32..=500, 1u32..=500)
        .prop_map(|(s, i, d)| EditCosts::new(s, i, d))
}

proptest! {
    /// `score` returns `Some` exactly when the true distance is within the
    /// cutoff, and the value matches the reference DP.
    #[test]
    fn score_agrees_with_reference(
        query in "[a-z]{0,12}",
        candidate in "[a-z]{0,12}",
        costs in cost_strategy(),
        cutoff in 0u32..=2000,
    ) {
        let truth = reference_distance(&query, &candidate, &costs);
        match score(&query, &candidate, &costs, cutoff) {
            Some(cost) => {
                prop_assert_eq!(u64::from(cost), truth);
                prop_assert!(truth <= u64::from(cutoff));
            }
            None => prop_assert!(truth > u64::from(cutoff)),
        }
    }

    /// An unbounded cutoff always produces a value.
    #[test]
    fn unbounded_cutoff_always_scores(
        query in "[a-z]{0,12}",
        candidate in "[a-z]{0,12}",
        costs in cost_strategy(),
    ) {
        prop_assert!(score(&query, &candidate, &costs, u32::MAX).is_some());
    }

    /// A string matched against itself costs nothing.
    #[test]
    fn identity_scores_zero(s in "[a-z]{0,16}", costs in cost_strategy()) {
        prop_assert_eq!(score(&s, &s, &costs, 0), Some(0));
    }

    /// Merge output is deterministic, duplicate-free, and fuzzy-first.
    #[test]
    fn merge_is_deterministic_and_duplicate_free(
        fuzzy_ids in prop::collection::vec(0u8..20, 0..10),
        exact_ids in prop::collection::vec(0u8..20, 0..10),
    ) {
        let fuzzy: Vec<ScoredMatch> = fuzzy_ids
            .iter()
            .enumerate()
            .map(|(rank, id)| ScoredMatch { uuid: format!("p-{id}"), cost: rank as u32 })
            .collect();
        let exact: Vec<String> = exact_ids.iter().map(|id| format!("p-{id}")).collect();

        let merged = merge_results(&fuzzy, &exact);
        prop_assert_eq!(merge_results(&fuzzy, &exact), merged.clone());

        let mut unique = merged.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), merged.len());

        // Every fuzzy identifier precedes every exact-only identifier.
        let fuzzy_set: std::collections::HashSet<&str> =
            fuzzy.iter().map(|m| m.uuid.as_str()).collect();
        let first_exact_only = merged.iter().position(|id| !fuzzy_set.contains(id.as_str()));
        if let Some(boundary) = first_exact_only {
            prop_assert!(merged[boundary..]
                .iter()
                .all(|id| !fuzzy_set.contains(id.as_str())));
        }
    }
}
