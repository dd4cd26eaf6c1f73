//! Weighted edit distance with a cost cutoff.

/// Per-operation edit costs. Costs are not assumed symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditCosts {
    pub substitution: u32,
    pub insertion: u32,
    pub deletion: u32,
}

impl EditCosts {
    pub const fn new(substitution: u32, insertion: u32, deletion: u32) -> Self {
        Self {
            substitution,
            insertion,
            deletion,
        }
    }

    /// Classic unit-cost Levenshtein.
    pub const fn uniform() -> Self {
        Self::new(1, 1, 1)
    }
}

/// Weighted edit distance from `query` to `candidate`, or `None` if the true
/// distance exceeds `cutoff`.
///
/// Two-row dynamic program, O(len(query) * len(candidate)) time and
/// O(len(candidate)) space. Once every cell of a row exceeds the cutoff no
/// later cell can come back under it, so the scan bails out early. A cutoff
/// of `u32::MAX` is effectively unbounded.
///
/// Edge cases: identical strings score 0, an empty query costs one insertion
/// per candidate character, an empty candidate costs one deletion per query
/// character.
pub fn score(query: &str, candidate: &str, costs: &EditCosts, cutoff: u32) -> Option<u32> {
    let q: Vec<char> = query.chars().collect();
    let c: Vec<char> = candidate.chars().collect();

    // Intermediate sums run in u64 so pathological cost/length combinations
    // cannot wrap; any accepted result fits u32 because it is <= cutoff.
    let cutoff = u64::from(cutoff);
    let ins = u64::from(costs.insertion);
    let del = u64::from(costs.deletion);
    let sub = u64::from(costs.substitution);

    let mut prev: Vec<u64> = (0..=c.len() as u64).map(|j| j * ins).collect();
    if q.is_empty() {
        let total = prev[c.len()];
        return (total <= cutoff).then_some(total as u32);
    }

    let mut cur = vec![0u64; c.len() + 1];
    for (i, qc) in q.iter().enumerate() {
        cur[0] = (i as u64 + 1) * del;
        let mut row_min = cur[0];
        for (j, cc) in c.iter().enumerate() {
            let substituted = prev[j] + if qc == cc { 0 } else { sub };
            let deleted = prev[j + 1] + del;
            let inserted = cur[j] + ins;
            cur[j + 1] = substituted.min(deleted).min(inserted);
            row_min = row_min.min(cur[j + 1]);
        }
        if row_min > cutoff {
            return None;
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    let total = prev[c.len()];
    (total <= cutoff).then_some(total as u32)
}
