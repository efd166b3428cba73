//! Exact search over the assignment [Model].
//!
//! [BranchAndBound] walks participants in descending-skill order. Each node
//! seats the next participant in one team, or leaves them out while the
//! topology still has excess participants to drop. The role layout inside a
//! team is not branched on: [TeamTable] keeps the best layout of the team's
//! current members, which also detects member sets that cannot avoid their
//! forbidden roles. Only the lowest-index empty team may be opened, and the
//! final teams are renumbered by descending skill sum, so every canonical
//! placement is reached exactly once.

use serde::Serialize;
use tracing::{debug, error};

use crate::optimizer::matching::{best_layout, TeamTable};
use crate::optimizer::model::{Evaluation, Model, Objective};
use crate::optimizer::monitor::{BudgetMonitor, BudgetStop, SearchBudget};
use crate::optimizer::placement::Placement;
use crate::optimizer::tiebreak::{canonical_team_order, descending_order};
use crate::optimizer::topology::SizePolicy;

/// A constrained-optimization engine for the assignment model.
pub trait Solver {
    fn solve(&self, model: &Model) -> SolveOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub placement: Placement,
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveResult {
    /// No better objective value exists.
    Optimal(Solution),
    /// Satisfies every hard constraint; the budget ran out before a proof.
    Feasible(Solution),
    /// No placement found. Proven when the termination reason says so.
    Infeasible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    OptimalityProven,
    InfeasibilityProven,
    NodeLimit,
    TimeLimit,
}

impl From<BudgetStop> for TerminationReason {
    fn from(stop: BudgetStop) -> Self {
        match stop {
            BudgetStop::NodeLimit => Self::NodeLimit,
            BudgetStop::TimeLimit => Self::TimeLimit,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub nodes: u64,
    pub solutions: u64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOutcome {
    pub result: SolveResult,
    pub termination: TerminationReason,
    pub stats: SearchStats,
}

/// Depth-first branch and bound with a node/time budget.
#[derive(Debug, Clone, Copy)]
pub struct BranchAndBound {
    budget: SearchBudget,
}

impl BranchAndBound {
    pub fn new(budget: SearchBudget) -> Self {
        Self { budget }
    }
}

impl Solver for BranchAndBound {
    fn solve(&self, model: &Model) -> SolveOutcome {
        let mut search = Search::new(model, self.budget);
        search.descend(0);
        search.finish()
    }
}

struct Incumbent {
    score: i64,
    members: Vec<Vec<usize>>,
}

struct Search<'m> {
    model: &'m Model,
    order: Vec<usize>,
    /// `suffix_best[d]`: summed best coefficients of `order[d..]`.
    suffix_best: Vec<i64>,
    /// Same, with negative entries clamped to zero (those participants may be left out).
    suffix_best_positive: Vec<i64>,
    /// `prefix_skill[d]`: summed positive skills of `order[..d]`.
    prefix_skill: Vec<i64>,
    non_negative_skills: bool,
    max_team_size: usize,
    tables: Vec<TeamTable>,
    members: Vec<Vec<usize>>,
    sums: Vec<i64>,
    skipped: usize,
    monitor: BudgetMonitor,
    incumbent: Option<Incumbent>,
    solutions: u64,
}

impl<'m> Search<'m> {
    fn new(model: &'m Model, budget: SearchBudget) -> Self {
        let skills: Vec<i64> = (0..model.participant_count())
            .map(|participant| model.skill(participant))
            .collect();
        let order = descending_order(&skills);

        let mut suffix_best = vec![0; order.len() + 1];
        let mut suffix_best_positive = vec![0; order.len() + 1];
        for (depth, &participant) in order.iter().enumerate().rev() {
            let best = model.best_coefficient(participant);
            suffix_best[depth] = suffix_best[depth + 1] + best;
            suffix_best_positive[depth] = suffix_best_positive[depth + 1] + best.max(0);
        }
        let mut prefix_skill = vec![0; order.len() + 1];
        for (depth, &participant) in order.iter().enumerate() {
            prefix_skill[depth + 1] = prefix_skill[depth] + skills[participant].max(0);
        }

        let team_count = model.team_count();
        Self {
            model,
            suffix_best,
            suffix_best_positive,
            prefix_skill,
            non_negative_skills: skills.iter().all(|skill| *skill >= 0),
            max_team_size: model.max_team_size(),
            tables: vec![TeamTable::empty(model.role_count()); team_count],
            members: vec![Vec::new(); team_count],
            sums: vec![0; team_count],
            skipped: 0,
            monitor: BudgetMonitor::start(budget, model.role_count()),
            incumbent: None,
            solutions: 0,
            order,
        }
    }

    fn descend(&mut self, depth: usize) {
        if self.monitor.enter_node() {
            return;
        }

        let remaining = self.order.len() - depth;
        let must_skip = self.model.plan().excess - self.skipped;
        if must_skip > remaining {
            return;
        }
        if remaining == 0 {
            self.record_leaf();
            return;
        }
        if let Some(incumbent) = &self.incumbent {
            if self.upper_bound(depth, must_skip) <= incumbent.score {
                return;
            }
        }
        if !self.sizes_reachable(remaining - must_skip) {
            return;
        }

        let participant = self.order[depth];
        if must_skip < remaining {
            for team in self.candidate_teams() {
                let Some(table) = self.tables[team].with_member(self.model, participant) else {
                    continue;
                };
                let previous = std::mem::replace(&mut self.tables[team], table);
                self.members[team].push(participant);
                self.sums[team] += self.model.skill(participant);

                self.descend(depth + 1);

                self.sums[team] -= self.model.skill(participant);
                self.members[team].pop();
                self.tables[team] = previous;

                if self.monitor.stopped().is_some() {
                    return;
                }
            }
        }

        if must_skip > 0 {
            self.skipped += 1;
            self.descend(depth + 1);
            self.skipped -= 1;
        }
    }

    /// Teams the next participant may join: any open team with room, plus the
    /// first empty one.
    fn candidate_teams(&self) -> Vec<usize> {
        let mut teams = Vec::with_capacity(self.members.len());
        let mut empty_offered = false;
        for (team, members) in self.members.iter().enumerate() {
            if members.len() >= self.max_team_size {
                continue;
            }
            if members.is_empty() {
                if empty_offered {
                    continue;
                }
                empty_offered = true;
            }
            teams.push(team);
        }
        if self.model.objective() == Objective::MinimizeSpread {
            teams.sort_by_key(|team| (self.sums[*team], *team));
        }
        teams
    }

    /// Sum of the `count` largest positive skills among participants not yet visited.
    fn top_remaining_skills(&self, depth: usize, count: usize) -> i64 {
        let end = (depth + count).min(self.order.len());
        self.prefix_skill[end] - self.prefix_skill[depth]
    }

    fn upper_bound(&self, depth: usize, must_skip: usize) -> i64 {
        let room = |team: usize| self.max_team_size.saturating_sub(self.members[team].len());

        if self.model.objective() == Objective::MinimizeSpread {
            if !self.non_negative_skills {
                return 0;
            }
            let current_max = self.sums.iter().copied().max().unwrap_or(0);
            let reachable_min = (0..self.sums.len())
                .map(|team| self.sums[team] + self.top_remaining_skills(depth, room(team)))
                .min()
                .unwrap_or(0);
            return -(current_max - reachable_min).max(0);
        }

        let seated: i64 = self.tables.iter().map(TeamTable::best).sum();
        let rest = if must_skip > 0 {
            self.suffix_best_positive[depth]
        } else {
            self.suffix_best[depth]
        };
        let mut bound = seated + rest + self.model.size_term_bound();

        if self.model.objective() == Objective::PreferenceWithTopTeam {
            let weight = self.model.weights().top_team;
            if weight < 0 {
                return i64::MAX;
            }
            let best_top = (0..self.sums.len())
                .map(|team| self.sums[team] + self.top_remaining_skills(depth, room(team)))
                .max()
                .unwrap_or(0);
            bound += weight * best_top;
        }
        bound
    }

    /// Whether the current team sizes can still end in a legal layout that
    /// seats exactly `need` more participants.
    fn sizes_reachable(&self, need: usize) -> bool {
        let plan = self.model.plan();
        if plan.size_policy == SizePolicy::Relaxed {
            let room: usize = self
                .members
                .iter()
                .map(|members| self.max_team_size.saturating_sub(members.len()))
                .sum();
            return room >= need;
        }

        let words = need / 64 + 1;
        let mut reach = vec![0u64; words];
        reach[0] = 1;
        for members in &self.members {
            let filled = members.len();
            let mut next = vec![0u64; words];
            for &size in plan.allowed_sizes.iter().filter(|size| **size >= filled) {
                shift_or(&mut next, &reach, size - filled);
            }
            if next.iter().all(|word| *word == 0) {
                return false;
            }
            reach = next;
        }
        (reach[need / 64] >> (need % 64)) & 1 == 1
    }

    fn record_leaf(&mut self) {
        let plan = self.model.plan();
        let sizes: Vec<usize> = self.members.iter().map(Vec::len).collect();
        if plan.size_policy == SizePolicy::Enforced
            && sizes.iter().any(|size| !plan.is_allowed_size(*size))
        {
            return;
        }

        let preference: i64 = self.tables.iter().map(TeamTable::best).sum();
        let score = self.model.score(preference, &sizes, &self.sums);
        if self
            .incumbent
            .as_ref()
            .map_or(true, |incumbent| score > incumbent.score)
        {
            self.solutions += 1;
            self.incumbent = Some(Incumbent {
                score,
                members: self.members.clone(),
            });
        }
    }

    fn finish(self) -> SolveOutcome {
        let stats = SearchStats {
            nodes: self.monitor.nodes(),
            solutions: self.solutions,
            elapsed_ms: self.monitor.elapsed().as_millis() as u64,
        };
        let stop = self.monitor.stopped();
        let solution = self
            .incumbent
            .and_then(|incumbent| build_solution(self.model, &incumbent));

        let (result, termination) = match (solution, stop) {
            (Some(solution), None) => (
                SolveResult::Optimal(solution),
                TerminationReason::OptimalityProven,
            ),
            (Some(solution), Some(stop)) => (SolveResult::Feasible(solution), stop.into()),
            (None, None) => (
                SolveResult::Infeasible,
                TerminationReason::InfeasibilityProven,
            ),
            (None, Some(stop)) => (SolveResult::Infeasible, stop.into()),
        };

        debug!(
            event = "solve_end",
            termination = ?termination,
            nodes = stats.nodes,
            solutions = stats.solutions,
            elapsed_ms = stats.elapsed_ms,
        );

        SolveOutcome {
            result,
            termination,
            stats,
        }
    }
}

fn build_solution(model: &Model, incumbent: &Incumbent) -> Option<Solution> {
    let mut placement = Placement::empty(model.team_count(), model.role_count());
    let mut sums = Vec::with_capacity(incumbent.members.len());
    for (team, members) in incumbent.members.iter().enumerate() {
        for (participant, role) in best_layout(model, members)? {
            placement.set(team, role, Some(participant));
        }
        sums.push(members.iter().map(|p| model.skill(*p)).sum());
    }
    placement.reorder_teams(&canonical_team_order(&sums));

    match model.evaluate(&placement) {
        Ok(evaluation) => {
            debug_assert_eq!(evaluation.score, incumbent.score);
            Some(Solution {
                placement,
                evaluation,
            })
        }
        Err(violation) => {
            error!(%violation, "search produced a placement the model rejects");
            None
        }
    }
}

/// `dst |= src << shift`, truncated to `dst`'s length.
fn shift_or(dst: &mut [u64], src: &[u64], shift: usize) {
    let word_shift = shift / 64;
    let bit_shift = shift % 64;
    for index in word_shift..dst.len() {
        let source = index - word_shift;
        let mut value = src[source] << bit_shift;
        if bit_shift > 0 && source > 0 {
            value |= src[source - 1] >> (64 - bit_shift);
        }
        dst[index] |= value;
    }
}
