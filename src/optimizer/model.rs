//! The exact assignment model.
//!
//! Decision space: one boolean per `(participant, role, team)`, true when the
//! participant occupies that role in that team. The model stores what the
//! search needs to reason about those booleans without materializing them:
//!
//! * a per-participant mask of roles whose booleans are not pinned to false
//!   (the forbidden role is pinned false in every team),
//! * the objective coefficient of each `(participant, role)` pair, identical
//!   for every team,
//! * the team-size rule (an enumerated domain per team when enforced, a
//!   penalty when relaxed) and the seat count,
//! * the non-increasing skill-sum ordering across consecutive teams.
//!
//! [Model::evaluate] checks a complete [Placement] against every hard
//! constraint and scores it.

use serde::Serialize;
use thiserror::Error;

use crate::config::ObjectiveWeights;
use crate::data::{Participant, RolePreferences};
use crate::error::{AssignError, AssignResult};
use crate::optimizer::placement::Placement;
use crate::optimizer::topology::{SizePolicy, TeamPlan};
use crate::optimizer::AssignMode;

/// Ceiling on the summed absolute objective terms. Search bounds add at most
/// four such totals, so every intermediate value stays inside an `i64`.
const SCORE_LIMIT: i64 = i64::MAX / 4;

/// What the exact search optimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Maximize role-preference coefficients plus team-size terms.
    Preference,
    /// [Objective::Preference] plus the skill sum of team 0.
    PreferenceWithTopTeam,
    /// Minimize the gap between the strongest and weakest team's skill sum.
    MinimizeSpread,
}

impl Objective {
    /// Random mode never reaches the model.
    pub fn for_mode(mode: AssignMode) -> Option<Self> {
        match mode {
            AssignMode::Priority => Some(Self::PreferenceWithTopTeam),
            AssignMode::Balance => Some(Self::MinimizeSpread),
            AssignMode::Random => None,
        }
    }
}

/// A hard constraint broken by a placement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("placement shape {teams}x{roles} does not match the model")]
    Shape { teams: usize, roles: usize },

    #[error("participant {participant} occupies more than one slot")]
    DoubleAssignment { participant: usize },

    #[error("participant {participant} placed in forbidden role {role} of team {team}")]
    ForbiddenRole {
        participant: usize,
        team: usize,
        role: usize,
    },

    #[error("team {team} has {size} members, outside the allowed sizes")]
    TeamSize { team: usize, size: usize },

    #[error("{actual} participants seated, expected {expected}")]
    SeatCount { expected: usize, actual: usize },

    #[error("team {team} is stronger than the team before it")]
    SymmetryOrder { team: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Larger is better for every objective.
    pub score: i64,
    /// The reported objective: the maximized sum, or the spread for balance.
    pub objective_value: i64,
    pub skill_sums: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct Model {
    plan: TeamPlan,
    objective: Objective,
    weights: ObjectiveWeights,
    skills: Vec<i64>,
    allowed: Vec<u32>,
    coefficients: Vec<Vec<i64>>,
}

impl Model {
    /// Fails with a configuration error when skills and weights are large
    /// enough that a score or search bound could overflow.
    pub fn build(
        participants: &[Participant],
        preferences: &[RolePreferences],
        plan: &TeamPlan,
        objective: Objective,
        weights: ObjectiveWeights,
    ) -> AssignResult<Self> {
        let role_count = plan.role_count;
        let allowed = preferences
            .iter()
            .map(|prefs| {
                (0..role_count)
                    .filter(|role| prefs.allows(*role))
                    .fold(0u32, |mask, role| mask | (1 << role))
            })
            .collect();
        let coefficients: Vec<Vec<i64>> = participants
            .iter()
            .zip(preferences)
            .map(|(participant, prefs)| {
                (0..role_count)
                    .map(|role| role_coefficient(participant.skill, prefs, role, &weights))
                    .collect::<Option<Vec<i64>>>()
            })
            .collect::<Option<_>>()
            .ok_or_else(too_large)?;
        let skills: Vec<i64> = participants.iter().map(|p| p.skill).collect();

        score_magnitude(&skills, &coefficients, plan.team_count, &weights)
            .filter(|magnitude| *magnitude <= SCORE_LIMIT)
            .ok_or_else(too_large)?;

        Ok(Self {
            plan: plan.clone(),
            objective,
            weights,
            skills,
            allowed,
            coefficients,
        })
    }

    pub fn plan(&self) -> &TeamPlan {
        &self.plan
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn weights(&self) -> &ObjectiveWeights {
        &self.weights
    }

    pub fn participant_count(&self) -> usize {
        self.skills.len()
    }

    pub fn team_count(&self) -> usize {
        self.plan.team_count
    }

    pub fn role_count(&self) -> usize {
        self.plan.role_count
    }

    /// Size of the boolean decision space.
    pub fn variable_count(&self) -> usize {
        self.participant_count() * self.role_count() * self.team_count()
    }

    /// Booleans fixed to false by forbidden roles.
    pub fn pinned_variable_count(&self) -> usize {
        let full = (1u32 << self.role_count()) - 1;
        self.allowed
            .iter()
            .map(|mask| (full & !mask).count_ones() as usize * self.team_count())
            .sum()
    }

    pub fn skill(&self, participant: usize) -> i64 {
        self.skills[participant]
    }

    pub fn allowed_mask(&self, participant: usize) -> u32 {
        self.allowed[participant]
    }

    pub fn is_allowed(&self, participant: usize, role: usize) -> bool {
        self.allowed[participant] & (1 << role) != 0
    }

    pub fn coefficient(&self, participant: usize, role: usize) -> i64 {
        self.coefficients[participant][role]
    }

    /// Best coefficient over allowed roles; 0 when no role is allowed (the
    /// participant can then only stay unseated).
    pub fn best_coefficient(&self, participant: usize) -> i64 {
        (0..self.role_count())
            .filter(|role| self.is_allowed(participant, *role))
            .map(|role| self.coefficient(participant, role))
            .max()
            .unwrap_or(0)
    }

    /// Largest occupied-slot count a team may reach.
    pub fn max_team_size(&self) -> usize {
        match self.plan.size_policy {
            SizePolicy::Enforced => self
                .plan
                .allowed_sizes
                .last()
                .copied()
                .unwrap_or(self.role_count()),
            SizePolicy::Relaxed => self.role_count(),
        }
    }

    /// Objective contribution of one team's size.
    pub fn size_term(&self, size: usize) -> i64 {
        if self.objective == Objective::MinimizeSpread {
            return 0;
        }
        let mut term = 0;
        if size == self.plan.preferred_size {
            term += self.weights.preferred_size;
        }
        if self.plan.size_policy == SizePolicy::Relaxed && !self.plan.is_allowed_size(size) {
            term += self.weights.size_violation;
        }
        term
    }

    /// Upper bound on the summed size terms of any placement.
    pub fn size_term_bound(&self) -> i64 {
        if self.objective == Objective::MinimizeSpread {
            return 0;
        }
        let preferred_teams = self
            .team_count()
            .min(self.plan.seated / self.plan.preferred_size) as i64;
        let mut bound = self.weights.preferred_size.max(0) * preferred_teams;
        if self.plan.size_policy == SizePolicy::Relaxed {
            bound += self.weights.size_violation.max(0) * self.team_count() as i64;
        }
        bound
    }

    /// Combines the objective terms. `skill_sums` may be in any team order.
    pub fn score(&self, preference: i64, sizes: &[usize], skill_sums: &[i64]) -> i64 {
        let max_sum = skill_sums.iter().copied().max().unwrap_or(0);
        let min_sum = skill_sums.iter().copied().min().unwrap_or(0);
        match self.objective {
            Objective::MinimizeSpread => -(max_sum - min_sum),
            Objective::Preference => {
                preference + sizes.iter().map(|size| self.size_term(*size)).sum::<i64>()
            }
            Objective::PreferenceWithTopTeam => {
                preference
                    + sizes.iter().map(|size| self.size_term(*size)).sum::<i64>()
                    + self.weights.top_team * max_sum
            }
        }
    }

    /// The value reported to callers for a given score.
    pub fn objective_value(&self, score: i64) -> i64 {
        match self.objective {
            Objective::MinimizeSpread => -score,
            _ => score,
        }
    }

    pub fn evaluate(&self, placement: &Placement) -> Result<Evaluation, Violation> {
        if placement.team_count() != self.team_count() || placement.role_count() != self.role_count()
        {
            return Err(Violation::Shape {
                teams: placement.team_count(),
                roles: placement.role_count(),
            });
        }

        let mut seen = vec![false; self.participant_count()];
        let mut preference = 0;
        for (team, role, participant) in placement.filled() {
            if std::mem::replace(&mut seen[participant], true) {
                return Err(Violation::DoubleAssignment { participant });
            }
            if !self.is_allowed(participant, role) {
                return Err(Violation::ForbiddenRole {
                    participant,
                    team,
                    role,
                });
            }
            preference += self.coefficient(participant, role);
        }

        let seated = placement.seated_count();
        if seated != self.plan.seated {
            return Err(Violation::SeatCount {
                expected: self.plan.seated,
                actual: seated,
            });
        }

        let sizes: Vec<usize> = (0..self.team_count())
            .map(|team| placement.team_size(team))
            .collect();
        if self.plan.size_policy == SizePolicy::Enforced {
            if let Some((team, size)) = sizes
                .iter()
                .enumerate()
                .find(|(_, size)| !self.plan.is_allowed_size(**size))
            {
                return Err(Violation::TeamSize { team, size: *size });
            }
        }

        let skill_sums: Vec<i64> = (0..self.team_count())
            .map(|team| {
                placement
                    .members(team)
                    .map(|(_, participant)| self.skill(participant))
                    .sum()
            })
            .collect();
        if let Some(team) = (1..skill_sums.len()).find(|t| skill_sums[*t] > skill_sums[t - 1]) {
            return Err(Violation::SymmetryOrder { team });
        }

        let score = self.score(preference, &sizes, &skill_sums);
        Ok(Evaluation {
            score,
            objective_value: self.objective_value(score),
            skill_sums,
        })
    }
}

fn role_coefficient(
    skill: i64,
    prefs: &RolePreferences,
    role: usize,
    weights: &ObjectiveWeights,
) -> Option<i64> {
    if prefs.primary == Some(role) {
        weights.primary.checked_add(weights.primary_skill.checked_mul(skill)?)
    } else if prefs.secondary == Some(role) {
        Some(weights.secondary)
    } else {
        Some(weights.autofill)
    }
}

/// Sum of the absolute values of every term a score or search bound can
/// include, or `None` if that sum overflows.
fn score_magnitude(
    skills: &[i64],
    coefficients: &[Vec<i64>],
    team_count: usize,
    weights: &ObjectiveWeights,
) -> Option<i64> {
    let skill_total = absolute_sum(skills.iter().copied())?;
    let coefficient_total = absolute_sum(coefficients.iter().flatten().copied())?;
    let size_total = weights
        .preferred_size
        .checked_abs()?
        .checked_add(weights.size_violation.checked_abs()?)?
        .checked_mul(i64::try_from(team_count).ok()?)?;
    let top_total = weights.top_team.checked_abs()?.checked_mul(skill_total)?;

    coefficient_total
        .checked_add(size_total)?
        .checked_add(top_total)?
        .checked_add(skill_total.checked_mul(2)?)
}

fn absolute_sum(values: impl IntoIterator<Item = i64>) -> Option<i64> {
    values
        .into_iter()
        .try_fold(0i64, |total, value| total.checked_add(value.checked_abs()?))
}

fn too_large() -> AssignError {
    AssignError::configuration(
        "skill values and objective weights are too large to score without overflow",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use crate::data::RoleSet;
    use crate::optimizer::topology::plan_teams;

    fn fixture(objective: Objective) -> (Vec<Participant>, Model) {
        let roles = RoleSet::new(&["Top", "Mid"]).expect("roles");
        let participants = vec![
            Participant::new("a", 8, "Top").with_forbidden("Mid"),
            Participant::new("b", 6, "Mid").with_secondary("Top"),
            Participant::new("c", 5, "Top"),
            Participant::new("d", 1, "Jungle"),
        ];
        let prefs: Vec<_> = participants
            .iter()
            .map(|p| RolePreferences::resolve(p, &roles))
            .collect();
        let plan = plan_teams(participants.len(), roles.len(), &TopologyConfig::default())
            .expect("plan");
        let model = Model::build(
            &participants,
            &prefs,
            &plan,
            objective,
            ObjectiveWeights::default(),
        )
        .expect("model");
        (participants, model)
    }

    #[test]
    fn coefficients_follow_the_weight_table() {
        let (_, model) = fixture(Objective::Preference);
        assert_eq!(model.coefficient(0, 0), 1000 + 10 * 8);
        assert_eq!(model.coefficient(1, 0), 500);
        assert_eq!(model.coefficient(1, 1), 1000 + 60);
        // Unknown preference auto-fills everywhere.
        assert_eq!(model.coefficient(3, 0), -1000);
        assert_eq!(model.best_coefficient(0), 1080);
    }

    #[test]
    fn oversized_skills_and_weights_are_configuration_errors() {
        let roles = RoleSet::new(&["Top", "Mid"]).expect("roles");
        let build = |participants: &[Participant], weights: ObjectiveWeights| {
            let prefs: Vec<_> = participants
                .iter()
                .map(|p| RolePreferences::resolve(p, &roles))
                .collect();
            let plan = plan_teams(participants.len(), roles.len(), &TopologyConfig::default())
                .expect("plan");
            Model::build(participants, &prefs, &plan, Objective::PreferenceWithTopTeam, weights)
        };

        let extreme = vec![
            Participant::new("a", i64::MAX, "Top"),
            Participant::new("b", i64::MAX, "Mid"),
        ];
        assert!(matches!(
            build(&extreme, ObjectiveWeights::default()),
            Err(AssignError::Configuration(_))
        ));

        let ordinary = vec![Participant::new("a", 9, "Top"), Participant::new("b", 7, "Mid")];
        let heavy_top_team = ObjectiveWeights {
            top_team: i64::MAX / 8,
            ..ObjectiveWeights::default()
        };
        assert!(build(&ordinary, heavy_top_team).is_err());
        assert!(build(&ordinary, ObjectiveWeights::default()).is_ok());
    }

    #[test]
    fn forbidden_roles_pin_variables_in_every_team() {
        let (_, model) = fixture(Objective::Preference);
        assert_eq!(model.variable_count(), 4 * 2 * 2);
        assert!(!model.is_allowed(0, 1));
        assert_eq!(model.pinned_variable_count(), 2);
    }

    #[test]
    fn evaluate_scores_a_valid_placement() {
        let (_, model) = fixture(Objective::Preference);
        let mut placement = Placement::empty(2, 2);
        placement.set(0, 0, Some(0));
        placement.set(0, 1, Some(1));
        placement.set(1, 0, Some(2));
        placement.set(1, 1, Some(3));

        let evaluation = model.evaluate(&placement).expect("valid");
        // 1080 + 1060 + 1050 - 1000, both teams at the preferred size of 2.
        assert_eq!(evaluation.score, 1080 + 1060 + 1050 - 1000 + 2000);
        assert_eq!(evaluation.skill_sums, vec![14, 6]);
    }

    #[test]
    fn evaluate_reports_broken_constraints() {
        let (_, model) = fixture(Objective::MinimizeSpread);

        let mut forbidden = Placement::empty(2, 2);
        forbidden.set(0, 1, Some(0));
        forbidden.set(0, 0, Some(1));
        forbidden.set(1, 0, Some(2));
        forbidden.set(1, 1, Some(3));
        assert!(matches!(
            model.evaluate(&forbidden),
            Err(Violation::ForbiddenRole { participant: 0, .. })
        ));

        let mut unordered = Placement::empty(2, 2);
        unordered.set(0, 0, Some(2));
        unordered.set(0, 1, Some(3));
        unordered.set(1, 0, Some(0));
        unordered.set(1, 1, Some(1));
        assert_eq!(
            model.evaluate(&unordered),
            Err(Violation::SymmetryOrder { team: 1 })
        );

        let mut short = Placement::empty(2, 2);
        short.set(0, 0, Some(0));
        assert!(matches!(
            model.evaluate(&short),
            Err(Violation::SeatCount { expected: 4, actual: 1 })
        ));
    }

    #[test]
    fn spread_objective_reports_the_gap() {
        let (_, model) = fixture(Objective::MinimizeSpread);
        let mut placement = Placement::empty(2, 2);
        placement.set(0, 0, Some(2));
        placement.set(0, 1, Some(1));
        placement.set(1, 0, Some(0));
        placement.set(1, 1, Some(3));
        let evaluation = model.evaluate(&placement).expect("valid");
        assert_eq!(evaluation.skill_sums, vec![11, 9]);
        assert_eq!(evaluation.objective_value, 2);
        assert_eq!(evaluation.score, -2);
    }
}
