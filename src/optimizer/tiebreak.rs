//! Orderings shared by every strategy. All of them are stable, so equal keys
//! keep input order and a fixed input always produces the same result.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::data::Participant;

/// Indices of `values` from largest to smallest, lower index on ties.
pub fn descending_order(values: &[i64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&left, &right| values[right].cmp(&values[left]));
    order
}

/// Participant indices by descending skill, input order on ties.
pub fn skill_order(participants: &[Participant]) -> Vec<usize> {
    let skills: Vec<i64> = participants.iter().map(|p| p.skill).collect();
    descending_order(&skills)
}

/// A permutation of `0..len` fixed by `seed` on every platform.
pub fn seeded_order(len: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(&mut rng);
    order
}

/// Team indices by descending skill sum, lower index on ties. Applying it
/// yields the canonical, non-increasing team numbering.
pub fn canonical_team_order(skill_sums: &[i64]) -> Vec<usize> {
    descending_order(skill_sums)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_order_is_descending_and_stable() {
        let participants = vec![
            Participant::new("a", 3, "Top"),
            Participant::new("b", 9, "Top"),
            Participant::new("c", 3, "Top"),
            Participant::new("d", 5, "Top"),
        ];
        assert_eq!(skill_order(&participants), vec![1, 3, 0, 2]);
    }

    #[test]
    fn seeded_order_is_a_reproducible_permutation() {
        let first = seeded_order(20, 42);
        let second = seeded_order(20, 42);
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());

        assert_ne!(seeded_order(20, 42), seeded_order(20, 43));
    }

    #[test]
    fn canonical_team_order_breaks_ties_by_index() {
        assert_eq!(canonical_team_order(&[10, 30, 10, 20]), vec![1, 3, 0, 2]);
    }
}
