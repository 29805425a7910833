use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::domain::flow::{Branch, ConditionType};

/// Largest weight a branch can carry. Larger weights are capped so the
/// running total cannot overflow.
pub const MAX_WEIGHT: i64 = u32::MAX as i64;

/// Draws an index with probability proportional to its weight.
///
/// Weights below 1 have zero probability and weights above [`MAX_WEIGHT`]
/// count as `MAX_WEIGHT`. Returns `None` when no weight is positive.
pub fn select_weighted<R: Rng + ?Sized>(weights: &[i64], rng: &mut R) -> Option<usize> {
    let clamped = weights
        .iter()
        .map(|w| if *w < 1 { 0u64 } else { (*w).min(MAX_WEIGHT) as u64 });
    let index = WeightedIndex::new(clamped).ok()?;
    Some(index.sample(rng))
}

/// Resolves a branch step to one of its paths.
///
/// The first `condition_id` path whose value equals the participant's
/// assigned condition wins. Otherwise a weighted draw runs among the
/// `random` paths.
pub fn select_branch<R: Rng + ?Sized>(
    branches: &[Branch],
    assigned_condition: Option<&str>,
    rng: &mut R,
) -> Option<usize> {
    if let Some(condition) = assigned_condition {
        let matched = branches.iter().position(|b| {
            b.condition_type == ConditionType::ConditionId && b.condition_value == condition
        });
        if matched.is_some() {
            return matched;
        }
    }

    let random: Vec<usize> = branches
        .iter()
        .enumerate()
        .filter(|(_, b)| b.condition_type == ConditionType::Random)
        .map(|(i, _)| i)
        .collect();
    let weights: Vec<i64> = random.iter().map(|i| branches[*i].weight).collect();
    select_weighted(&weights, rng).map(|pick| random[pick])
}
