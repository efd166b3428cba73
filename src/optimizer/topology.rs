//! Team topology: how many teams, and how large each one should be.

use serde::Serialize;

use crate::config::TopologyConfig;
use crate::error::{AssignError, AssignResult};

/// Whether team sizes must come from the allowed set, or only should.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePolicy {
    /// Every team's occupied-slot count is a member of the allowed set.
    Enforced,
    /// No layout of the seated participants fits the allowed set; sizes outside
    /// it are penalized instead of rejected.
    Relaxed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamPlan {
    pub team_count: usize,
    pub role_count: usize,
    /// Preferred size after clamping to the role-set size.
    pub preferred_size: usize,
    /// Allowed sizes after clamping, sorted ascending; always contains the preferred size.
    pub allowed_sizes: Vec<usize>,
    /// Per-team seat targets, filled preferred-size first.
    pub target_sizes: Vec<usize>,
    pub size_policy: SizePolicy,
    /// Participants that get a seat (sum of the targets).
    pub seated: usize,
    /// Participants beyond the seat capacity of a fixed team count.
    pub excess: usize,
}

impl TeamPlan {
    pub fn is_allowed_size(&self, size: usize) -> bool {
        self.allowed_sizes.binary_search(&size).is_ok()
    }
}

pub fn plan_teams(
    participant_count: usize,
    role_count: usize,
    policy: &TopologyConfig,
) -> AssignResult<TeamPlan> {
    if role_count == 0 {
        return Err(AssignError::configuration("role set must not be empty"));
    }
    if policy.preferred_size == 0 {
        return Err(AssignError::configuration("preferred team size must be positive"));
    }
    if policy.team_count == Some(0) {
        return Err(AssignError::configuration("team count must be positive"));
    }
    if participant_count == 0 {
        return Err(AssignError::configuration(
            "no participants to assign, team count would be zero",
        ));
    }

    let preferred_size = policy.preferred_size.min(role_count);
    let mut allowed_sizes: Vec<usize> = policy
        .allowed_sizes
        .iter()
        .copied()
        .filter(|size| (1..=role_count).contains(size))
        .chain(std::iter::once(preferred_size))
        .collect();
    allowed_sizes.sort_unstable();
    allowed_sizes.dedup();

    let (target_sizes, size_policy) = match policy.team_count {
        None => {
            let full = participant_count / preferred_size;
            let remainder = participant_count % preferred_size;
            let mut sizes = vec![preferred_size; full];
            let mut size_policy = SizePolicy::Enforced;
            if remainder > 0 {
                sizes.push(remainder);
                if allowed_sizes.binary_search(&remainder).is_err() {
                    size_policy = SizePolicy::Relaxed;
                }
            }
            (sizes, size_policy)
        }
        Some(team_count) => {
            let mut remaining = participant_count;
            let sizes: Vec<usize> = (0..team_count)
                .map(|_| {
                    let size = remaining.min(preferred_size);
                    remaining -= size;
                    size
                })
                .collect();
            let seated = sizes.iter().sum();
            let size_policy = if decomposes(seated, team_count, &allowed_sizes) {
                SizePolicy::Enforced
            } else {
                SizePolicy::Relaxed
            };
            (sizes, size_policy)
        }
    };

    let seated: usize = target_sizes.iter().sum();
    Ok(TeamPlan {
        team_count: target_sizes.len(),
        role_count,
        preferred_size,
        allowed_sizes,
        target_sizes,
        size_policy,
        seated,
        excess: participant_count - seated,
    })
}

/// True when `total` splits into exactly `parts` sizes drawn from `allowed`.
pub(crate) fn decomposes(total: usize, parts: usize, allowed: &[usize]) -> bool {
    let mut reachable = vec![false; total + 1];
    reachable[0] = true;
    for _ in 0..parts {
        let mut next = vec![false; total + 1];
        for (sum, _) in reachable.iter().enumerate().filter(|(_, ok)| **ok) {
            for size in allowed {
                if sum + size <= total {
                    next[sum + size] = true;
                }
            }
        }
        reachable = next;
    }
    reachable[total]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_policy() -> TopologyConfig {
        TopologyConfig::default()
    }

    #[test]
    fn seven_participants_make_a_five_and_a_two() {
        let plan = plan_teams(7, 5, &default_policy()).expect("plan");
        assert_eq!(plan.team_count, 2);
        assert_eq!(plan.target_sizes, vec![5, 2]);
        assert_eq!(plan.size_policy, SizePolicy::Enforced);
        assert_eq!(plan.seated, 7);
        assert_eq!(plan.excess, 0);
    }

    #[test]
    fn ten_participants_make_two_full_teams() {
        let plan = plan_teams(10, 5, &default_policy()).expect("plan");
        assert_eq!(plan.target_sizes, vec![5, 5]);
        assert_eq!(plan.allowed_sizes, vec![1, 2, 3, 5]);
    }

    #[test]
    fn disallowed_remainder_relaxes_the_size_policy() {
        let plan = plan_teams(9, 5, &default_policy()).expect("plan");
        assert_eq!(plan.target_sizes, vec![5, 4]);
        assert_eq!(plan.size_policy, SizePolicy::Relaxed);
        assert_eq!(plan.seated, 9);
    }

    #[test]
    fn preferred_size_is_clamped_to_the_role_set() {
        let plan = plan_teams(4, 2, &default_policy()).expect("plan");
        assert_eq!(plan.preferred_size, 2);
        assert_eq!(plan.allowed_sizes, vec![1, 2]);
        assert_eq!(plan.target_sizes, vec![2, 2]);
    }

    #[test]
    fn fixed_team_count_reports_excess() {
        let policy = TopologyConfig {
            team_count: Some(2),
            ..default_policy()
        };
        let plan = plan_teams(12, 5, &policy).expect("plan");
        assert_eq!(plan.target_sizes, vec![5, 5]);
        assert_eq!(plan.seated, 10);
        assert_eq!(plan.excess, 2);
        assert_eq!(plan.size_policy, SizePolicy::Enforced);
    }

    #[test]
    fn fixed_team_count_with_an_empty_team_is_checked_for_other_layouts() {
        let policy = TopologyConfig {
            team_count: Some(3),
            ..default_policy()
        };
        let plan = plan_teams(6, 5, &policy).expect("plan");
        assert_eq!(plan.target_sizes, vec![5, 1, 0]);
        // 2 + 2 + 2 fits the allowed set.
        assert_eq!(plan.size_policy, SizePolicy::Enforced);

        let policy = TopologyConfig {
            team_count: Some(2),
            ..default_policy()
        };
        let plan = plan_teams(1, 5, &policy).expect("plan");
        assert_eq!(plan.size_policy, SizePolicy::Relaxed);
    }

    #[test]
    fn invalid_inputs_are_configuration_errors() {
        assert!(plan_teams(10, 0, &default_policy()).is_err());
        assert!(plan_teams(0, 5, &default_policy()).is_err());
        let zero_teams = TopologyConfig {
            team_count: Some(0),
            ..default_policy()
        };
        assert!(matches!(
            plan_teams(10, 5, &zero_teams),
            Err(AssignError::Configuration(_))
        ));
    }

    #[test]
    fn decomposition_respects_gaps_in_the_allowed_set() {
        assert!(decomposes(9, 3, &[1, 2, 3, 5]));
        assert!(!decomposes(9, 2, &[1, 2, 3, 5]));
        assert!(decomposes(0, 0, &[1]));
    }
}
