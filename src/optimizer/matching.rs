//! Role layout inside a single team.
//!
//! Given a team's members, the best way to hand out roles is an assignment
//! problem over at most [crate::data::MAX_ROLES] roles. It is solved with a
//! dynamic program over role bitmasks: `values[mask]` is the best coefficient
//! total when the members seen so far occupy exactly the roles in `mask`.

use crate::optimizer::model::Model;

const UNREACHABLE: i64 = i64::MIN;

/// Incremental table for one team. Adding a member costs `O(2^R * R)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamTable {
    values: Vec<i64>,
}

impl TeamTable {
    pub fn empty(role_count: usize) -> Self {
        let mut values = vec![UNREACHABLE; 1 << role_count];
        values[0] = 0;
        Self { values }
    }

    /// The table after seating `participant`, or `None` when no role layout
    /// keeps every member out of their forbidden role.
    pub fn with_member(&self, model: &Model, participant: usize) -> Option<Self> {
        let allowed = model.allowed_mask(participant);
        let mut next = vec![UNREACHABLE; self.values.len()];
        let mut reachable = false;

        for (mask, value) in self.values.iter().enumerate() {
            if *value == UNREACHABLE {
                continue;
            }
            let mut free = allowed & !(mask as u32);
            while free != 0 {
                let role = free.trailing_zeros() as usize;
                free &= free - 1;
                let target = mask | (1 << role);
                let candidate = value + model.coefficient(participant, role);
                if candidate > next[target] {
                    next[target] = candidate;
                    reachable = true;
                }
            }
        }

        reachable.then_some(Self { values: next })
    }

    /// Best coefficient total over all layouts of the current members.
    pub fn best(&self) -> i64 {
        self.values
            .iter()
            .copied()
            .filter(|value| *value != UNREACHABLE)
            .max()
            .unwrap_or(0)
    }
}

/// Best `(participant, role)` layout for `members`, or `None` if none exists.
/// Ties resolve toward the lowest role mask.
pub fn best_layout(model: &Model, members: &[usize]) -> Option<Vec<(usize, usize)>> {
    let size = 1usize << model.role_count();
    let mut layers: Vec<Vec<(i64, usize)>> = Vec::with_capacity(members.len() + 1);
    let mut first = vec![(UNREACHABLE, 0usize); size];
    first[0] = (0, 0);
    layers.push(first);

    for &participant in members {
        let previous = layers.last()?;
        let mut next = vec![(UNREACHABLE, 0usize); size];
        for (mask, (value, _)) in previous.iter().enumerate() {
            if *value == UNREACHABLE {
                continue;
            }
            let mut free = model.allowed_mask(participant) & !(mask as u32);
            while free != 0 {
                let role = free.trailing_zeros() as usize;
                free &= free - 1;
                let target = mask | (1 << role);
                let candidate = value + model.coefficient(participant, role);
                if candidate > next[target].0 {
                    next[target] = (candidate, role);
                }
            }
        }
        layers.push(next);
    }

    let last = layers.last()?;
    let (mut mask, _) = last
        .iter()
        .enumerate()
        .filter(|(_, (value, _))| *value != UNREACHABLE)
        .fold(None::<(usize, i64)>, |best, (mask, (value, _))| match best {
            Some((_, top)) if top >= *value => best,
            _ => Some((mask, *value)),
        })?;

    let mut layout = Vec::with_capacity(members.len());
    for (depth, &participant) in members.iter().enumerate().rev() {
        let role = layers[depth + 1][mask].1;
        layout.push((participant, role));
        mask &= !(1 << role);
    }
    layout.reverse();
    Some(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ObjectiveWeights, TopologyConfig};
    use crate::data::{Participant, RolePreferences, RoleSet};
    use crate::optimizer::model::Objective;
    use crate::optimizer::topology::plan_teams;

    fn model(participants: &[Participant], roles: &[&str]) -> Model {
        let roles = RoleSet::new(roles).expect("roles");
        let prefs: Vec<_> = participants
            .iter()
            .map(|p| RolePreferences::resolve(p, &roles))
            .collect();
        let plan = plan_teams(participants.len(), roles.len(), &TopologyConfig::default())
            .expect("plan");
        Model::build(
            participants,
            &prefs,
            &plan,
            Objective::Preference,
            ObjectiveWeights::default(),
        )
        .expect("model")
    }

    #[test]
    fn layout_resolves_contention_toward_the_larger_coefficient() {
        let participants = vec![
            Participant::new("low", 2, "Mid").with_secondary("Top"),
            Participant::new("high", 9, "Mid"),
        ];
        let model = model(&participants, &["Top", "Mid"]);

        let layout = best_layout(&model, &[0, 1]).expect("layout");
        assert_eq!(layout, vec![(0, 0), (1, 1)]);

        let table = TeamTable::empty(2)
            .with_member(&model, 0)
            .and_then(|t| t.with_member(&model, 1))
            .expect("feasible");
        assert_eq!(table.best(), 500 + 1000 + 90);
    }

    #[test]
    fn members_sharing_the_only_free_role_are_infeasible() {
        let participants = vec![
            Participant::new("a", 1, "Top").with_forbidden("Top"),
            Participant::new("b", 1, "Mid").with_forbidden("Top"),
        ];
        let model = model(&participants, &["Top", "Mid"]);

        let one = TeamTable::empty(2).with_member(&model, 0).expect("one fits");
        assert!(one.with_member(&model, 1).is_none());
        assert!(best_layout(&model, &[0, 1]).is_none());
    }

    #[test]
    fn forbidden_blocking_is_resolved_by_moving_earlier_members() {
        // "a" would take Top first, but "b" can only play Top.
        let participants = vec![
            Participant::new("a", 5, "Top"),
            Participant::new("b", 5, "Top").with_forbidden("Mid"),
        ];
        let model = model(&participants, &["Top", "Mid"]);
        let layout = best_layout(&model, &[0, 1]).expect("layout");
        assert_eq!(layout, vec![(0, 1), (1, 0)]);
    }
}
