pub mod heuristic;
pub mod matching;
pub mod model;
pub mod monitor;
pub mod placement;
pub mod projector;
pub mod solver;
pub mod tiebreak;
pub mod topology;

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{StackConfig, Strategy};
use crate::data::{
    ensure_summable_skills, ensure_unique_ids, Participant, RolePreferences, RoleSet,
};
use crate::error::{AssignError, AssignResult};
use crate::optimizer::heuristic::assign_heuristic;
use crate::optimizer::model::{Model, Objective};
use crate::optimizer::monitor::SearchBudget;
use crate::optimizer::placement::Placement;
use crate::optimizer::projector::{project, TeamResult, UnfilledRole};
use crate::optimizer::solver::{
    BranchAndBound, SearchStats, SolveResult, Solver, TerminationReason,
};
use crate::optimizer::tiebreak::skill_order;
use crate::optimizer::topology::{plan_teams, TeamPlan};
use crate::parallel::WorkerPool;

/// How teams are composed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignMode {
    /// Stack the strongest players into the top team, honouring role preferences.
    #[default]
    #[serde(alias = "rank")]
    Priority,
    /// Even out team skill sums.
    #[serde(alias = "balanced")]
    Balance,
    /// Seeded shuffle, no preference weighting.
    Random,
}

impl AssignMode {
    pub const ALL: [AssignMode; 3] = [Self::Priority, Self::Balance, Self::Random];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Balance => "balance",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for AssignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignMode {
    type Err = AssignError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "priority" | "rank" => Ok(Self::Priority),
            "balance" | "balanced" => Ok(Self::Balance),
            "random" => Ok(Self::Random),
            other => Err(AssignError::configuration(format!(
                "unknown mode '{other}', expected priority, balance or random"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    /// The exact search proved no better objective value exists.
    Optimal,
    /// The exact search hit its budget holding a valid assignment.
    Feasible,
    /// Greedy assignment; every seat that could be filled was filled.
    Heuristic,
    /// Hard constraints could not all be met; see `unfilled_roles`.
    Infeasible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub objective: Objective,
    pub termination: TerminationReason,
    pub variables: usize,
    pub pinned_variables: usize,
    #[serde(flatten)]
    pub stats: SearchStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub status: AssignmentStatus,
    pub mode: AssignMode,
    /// The path that produced `teams`.
    pub strategy: Strategy,
    pub teams: Vec<TeamResult>,
    pub unfilled_roles: Vec<UnfilledRole>,
    /// Participants without a seat.
    pub unassigned: Vec<String>,
    /// Value of the exact objective, when the exact path produced the teams.
    pub objective: Option<i64>,
    pub search: Option<SearchReport>,
}

impl Assignment {
    pub fn is_complete(&self) -> bool {
        self.unfilled_roles.is_empty() && self.unassigned.is_empty()
    }
}

/// One independent request for [assign_many].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignJob {
    pub participants: Vec<Participant>,
    pub roles: Vec<String>,
    #[serde(default)]
    pub mode: AssignMode,
    /// Overrides the configured display order for this job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_roles: Option<Vec<String>>,
}

struct Outcome {
    status: AssignmentStatus,
    strategy: Strategy,
    placement: Placement,
    unassigned: Vec<usize>,
    objective: Option<i64>,
    search: Option<SearchReport>,
}

/// Assigns `participants` to teams with one slot per role in `roles`.
///
/// Priority and balance modes run the exact search unless the configuration
/// selects the heuristic strategy; random mode is always heuristic. An exact
/// run that finds no valid assignment falls back to the heuristic so the
/// caller still gets a partial team list, and the status stays `infeasible`
/// when the search proved it.
pub fn assign<S: AsRef<str>>(
    participants: &[Participant],
    roles: &[S],
    mode: AssignMode,
    config: &StackConfig,
) -> AssignResult<Assignment> {
    assign_with_order(
        participants,
        roles,
        mode,
        config,
        config.canonical_roles.as_deref(),
    )
}

/// [assign] for a self-contained job.
pub fn assign_job(job: &AssignJob, config: &StackConfig) -> AssignResult<Assignment> {
    let canonical = job
        .canonical_roles
        .as_deref()
        .or(config.canonical_roles.as_deref());
    assign_with_order(&job.participants, &job.roles, job.mode, config, canonical)
}

fn assign_with_order<S: AsRef<str>>(
    participants: &[Participant],
    roles: &[S],
    mode: AssignMode,
    config: &StackConfig,
    canonical: Option<&[String]>,
) -> AssignResult<Assignment> {
    let role_set = RoleSet::new(roles)?;
    ensure_unique_ids(participants)?;
    ensure_summable_skills(participants)?;
    let plan = plan_teams(participants.len(), role_set.len(), &config.topology)?;
    let preferences: Vec<RolePreferences> = participants
        .iter()
        .map(|participant| RolePreferences::resolve(participant, &role_set))
        .collect();

    info!(
        event = "assign_start",
        mode = %mode,
        participants = participants.len(),
        roles = role_set.len(),
        teams = plan.team_count,
        size_policy = ?plan.size_policy,
    );

    let exact = Objective::for_mode(mode).filter(|_| config.solver.strategy == Strategy::Exact);
    let outcome = match exact {
        Some(objective) => {
            solve_exact(participants, &preferences, &plan, mode, objective, config)?
        }
        None => solve_heuristic(participants, &preferences, &plan, mode, config),
    };

    let projection = project(
        &outcome.placement,
        participants,
        &role_set,
        canonical,
        &outcome.unassigned,
    );

    info!(
        event = "assign_end",
        mode = %mode,
        status = ?outcome.status,
        strategy = ?outcome.strategy,
        teams = projection.teams.len(),
        unfilled = projection.unfilled_roles.len(),
        unassigned = projection.unassigned.len(),
    );

    Ok(Assignment {
        status: outcome.status,
        mode,
        strategy: outcome.strategy,
        teams: projection.teams,
        unfilled_roles: projection.unfilled_roles,
        unassigned: projection.unassigned,
        objective: outcome.objective,
        search: outcome.search,
    })
}

/// Runs independent jobs in parallel, preserving input order.
pub fn assign_many(
    jobs: &[AssignJob],
    config: &StackConfig,
    pool: WorkerPool,
) -> Vec<AssignResult<Assignment>> {
    pool.install(|| {
        jobs.par_iter()
            .map(|job| assign_job(job, config))
            .collect()
    })
}

fn solve_exact(
    participants: &[Participant],
    preferences: &[RolePreferences],
    plan: &TeamPlan,
    mode: AssignMode,
    objective: Objective,
    config: &StackConfig,
) -> AssignResult<Outcome> {
    let model = Model::build(participants, preferences, plan, objective, config.weights)?;
    let outcome = BranchAndBound::new(SearchBudget::from_config(&config.solver)).solve(&model);
    let search = SearchReport {
        objective,
        termination: outcome.termination,
        variables: model.variable_count(),
        pinned_variables: model.pinned_variable_count(),
        stats: outcome.stats,
    };

    let (status, solution) = match outcome.result {
        SolveResult::Optimal(solution) => (AssignmentStatus::Optimal, solution),
        SolveResult::Feasible(solution) => (AssignmentStatus::Feasible, solution),
        SolveResult::Infeasible => {
            warn!(
                event = "exact_infeasible",
                mode = %mode,
                termination = ?outcome.termination,
                "no valid exact assignment, falling back to the heuristic"
            );
            let mut fallback = solve_heuristic(participants, preferences, plan, mode, config);
            if outcome.termination == TerminationReason::InfeasibilityProven {
                fallback.status = AssignmentStatus::Infeasible;
            }
            fallback.search = Some(search);
            return Ok(fallback);
        }
    };

    let mut seated = vec![false; participants.len()];
    for (_, _, participant) in solution.placement.filled() {
        seated[participant] = true;
    }
    let unassigned = skill_order(participants)
        .into_iter()
        .filter(|participant| !seated[*participant])
        .collect();

    Ok(Outcome {
        status,
        strategy: Strategy::Exact,
        placement: solution.placement,
        unassigned,
        objective: Some(solution.evaluation.objective_value),
        search: Some(search),
    })
}

fn solve_heuristic(
    participants: &[Participant],
    preferences: &[RolePreferences],
    plan: &TeamPlan,
    mode: AssignMode,
    config: &StackConfig,
) -> Outcome {
    let result = assign_heuristic(mode, participants, preferences, plan, &config.solver);
    let status = if result.has_blocked_seat(plan) {
        AssignmentStatus::Infeasible
    } else {
        AssignmentStatus::Heuristic
    };
    Outcome {
        status,
        strategy: Strategy::Heuristic,
        placement: result.placement,
        unassigned: result.unassigned,
        objective: None,
        search: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;

    #[test]
    fn modes_parse_with_aliases() {
        assert_eq!("Priority".parse::<AssignMode>(), Ok(AssignMode::Priority));
        assert_eq!("rank".parse::<AssignMode>(), Ok(AssignMode::Priority));
        assert_eq!(" balanced ".parse::<AssignMode>(), Ok(AssignMode::Balance));
        assert_eq!("random".parse::<AssignMode>(), Ok(AssignMode::Random));
        assert!(matches!(
            "chaos".parse::<AssignMode>(),
            Err(AssignError::Configuration(_))
        ));
        for mode in AssignMode::ALL {
            assert_eq!(mode.to_string().parse::<AssignMode>(), Ok(mode));
        }
    }

    #[test]
    fn heuristic_strategy_skips_the_search() {
        let config = StackConfig {
            solver: SolverConfig {
                strategy: Strategy::Heuristic,
                ..SolverConfig::default()
            },
            ..StackConfig::default()
        };
        let participants = vec![
            Participant::new("a", 3, "Top"),
            Participant::new("b", 2, "Mid"),
        ];
        let assignment =
            assign(&participants, &["Top", "Mid"], AssignMode::Priority, &config).expect("assign");
        assert_eq!(assignment.strategy, Strategy::Heuristic);
        assert_eq!(assignment.status, AssignmentStatus::Heuristic);
        assert!(assignment.search.is_none());
        assert!(assignment.is_complete());
    }

    #[test]
    fn proven_infeasible_exact_run_keeps_the_heuristic_partial_teams() {
        let participants = vec![
            Participant::new("a", 5, "Top").with_secondary("Jungle").with_forbidden("Top"),
            Participant::new("b", 4, "Jungle").with_secondary("Top").with_forbidden("Top"),
        ];
        let assignment = assign(
            &participants,
            &["Top", "Jungle"],
            AssignMode::Priority,
            &StackConfig::default(),
        )
        .expect("assign");

        assert_eq!(assignment.status, AssignmentStatus::Infeasible);
        assert_eq!(assignment.strategy, Strategy::Heuristic);
        let search = assignment.search.as_ref().expect("search report");
        assert_eq!(search.termination, TerminationReason::InfeasibilityProven);
        assert_eq!(assignment.teams[0].members.len(), 1);
        assert_eq!(assignment.unassigned, vec!["b".to_string()]);
    }

    #[test]
    fn duplicate_identities_are_a_configuration_error() {
        let participants = vec![
            Participant::new("a", 3, "Top"),
            Participant::new("a", 2, "Mid"),
        ];
        let err = assign(
            &participants,
            &["Top", "Mid"],
            AssignMode::Balance,
            &StackConfig::default(),
        )
        .expect_err("duplicate ids");
        assert!(err.to_string().contains("duplicate participant"));
    }

    #[test]
    fn skills_that_would_overflow_a_score_are_a_configuration_error() {
        let roles = ["Top", "Mid"];
        let unsummable = vec![
            Participant::new("a", i64::MAX, "Top"),
            Participant::new("b", i64::MAX, "Mid"),
        ];
        for mode in AssignMode::ALL {
            assert!(
                matches!(
                    assign(&unsummable, &roles, mode, &StackConfig::default()),
                    Err(AssignError::Configuration(_))
                ),
                "{mode}"
            );
        }

        // Sums fine, but the weighted primary coefficient does not.
        let unweighable = vec![
            Participant::new("a", i64::MAX / 2, "Top"),
            Participant::new("b", 1, "Mid"),
        ];
        let err = assign(&unweighable, &roles, AssignMode::Priority, &StackConfig::default())
            .expect_err("overflowing coefficient");
        assert!(err.to_string().contains("too large"));
        assert!(assign(&unweighable, &roles, AssignMode::Random, &StackConfig::default()).is_ok());
    }

    #[test]
    fn assign_many_preserves_job_order() {
        let job = |name: &str, mode| AssignJob {
            participants: vec![
                Participant::new(format!("{name}-1"), 4, "Top"),
                Participant::new(format!("{name}-2"), 2, "Mid"),
            ],
            roles: vec!["Top".to_string(), "Mid".to_string()],
            mode,
            canonical_roles: None,
        };
        let jobs = vec![
            job("x", AssignMode::Priority),
            AssignJob {
                roles: Vec::new(),
                ..job("broken", AssignMode::Balance)
            },
            job("z", AssignMode::Random),
        ];

        let results = assign_many(&jobs, &StackConfig::default(), WorkerPool::with_workers(2));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().expect("x").teams[0].members[0].id, "x-1");
        assert_eq!(results[0].as_ref().expect("x").teams[0].members[0].role, "Top");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().expect("z").mode, AssignMode::Random);
    }

    #[test]
    fn job_display_order_overrides_the_configured_one() {
        let job = AssignJob {
            participants: vec![
                Participant::new("a", 4, "Top"),
                Participant::new("b", 2, "Mid"),
            ],
            roles: vec!["Top".to_string(), "Mid".to_string()],
            mode: AssignMode::Priority,
            canonical_roles: Some(vec!["mid".to_string()]),
        };
        let config = StackConfig {
            canonical_roles: Some(vec!["Top".to_string()]),
            ..StackConfig::default()
        };

        let assignment = assign_job(&job, &config).expect("assign");
        let roles: Vec<&str> = assignment.teams[0]
            .members
            .iter()
            .map(|seat| seat.role.as_str())
            .collect();
        assert_eq!(roles, vec!["Mid", "Top"]);

        let configured = assign(&job.participants, &job.roles, job.mode, &config).expect("assign");
        assert_eq!(configured.teams[0].members[0].role, "Top");
    }
}
