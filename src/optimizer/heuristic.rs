//! Greedy assignment strategies.
//!
//! Every strategy seats participants into a [Placement] whose team `t` holds at
//! most `plan.target_sizes[t]` members, then runs the gap-filling pass. None of
//! them ever seats a participant in their forbidden role; a slot nobody can
//! take stays empty.

use tracing::debug;

use crate::config::SolverConfig;
use crate::data::{Participant, RolePreferences};
use crate::optimizer::placement::Placement;
use crate::optimizer::tiebreak::{seeded_order, skill_order};
use crate::optimizer::topology::TeamPlan;
use crate::optimizer::AssignMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicPlacement {
    pub placement: Placement,
    /// Participants left without a seat, in priority order.
    pub unassigned: Vec<usize>,
    /// Swaps committed by the improvement pass.
    pub swaps: usize,
}

impl HeuristicPlacement {
    /// A seat below its team's target stayed empty although someone is still
    /// waiting, which only happens when forbidden roles block every candidate.
    pub fn has_blocked_seat(&self, plan: &TeamPlan) -> bool {
        !self.unassigned.is_empty()
            && (0..plan.team_count)
                .any(|team| self.placement.team_size(team) < plan.target_sizes[team])
    }
}

pub fn assign_heuristic(
    mode: AssignMode,
    participants: &[Participant],
    preferences: &[RolePreferences],
    plan: &TeamPlan,
    solver: &SolverConfig,
) -> HeuristicPlacement {
    let order = match mode {
        AssignMode::Random => seeded_order(participants.len(), solver.seed),
        AssignMode::Priority | AssignMode::Balance => skill_order(participants),
    };
    let mut board = Board::new(participants, preferences, plan, &order);

    let mut swaps = 0;
    match mode {
        AssignMode::Priority => {
            board.round_robin(&order);
            board.fill_gaps();
            if solver.improvement_pass {
                swaps = board.swap_pass();
                board.fill_gaps();
            }
        }
        AssignMode::Balance => {
            board.lowest_sum_first(&order);
            board.fill_gaps();
        }
        AssignMode::Random => {
            board.pool = order;
            board.fill_gaps();
        }
    }

    debug!(
        event = "heuristic_end",
        mode = %mode,
        seated = board.placement.seated_count(),
        unassigned = board.pool.len(),
        swaps,
    );

    HeuristicPlacement {
        placement: board.placement,
        unassigned: board.pool,
        swaps,
    }
}

struct Board<'a> {
    participants: &'a [Participant],
    preferences: &'a [RolePreferences],
    capacity: &'a [usize],
    /// Position of each participant in the strategy's priority order.
    rank: Vec<usize>,
    placement: Placement,
    /// Unseated participants, kept in priority order.
    pool: Vec<usize>,
}

impl<'a> Board<'a> {
    fn new(
        participants: &'a [Participant],
        preferences: &'a [RolePreferences],
        plan: &'a TeamPlan,
        order: &[usize],
    ) -> Self {
        let mut rank = vec![0; order.len()];
        for (position, &participant) in order.iter().enumerate() {
            rank[participant] = position;
        }
        Self {
            participants,
            preferences,
            capacity: &plan.target_sizes,
            rank,
            placement: Placement::empty(plan.team_count, plan.role_count),
            pool: Vec::with_capacity(order.len()),
        }
    }

    fn team_has_room(&self, team: usize) -> bool {
        self.placement.team_size(team) < self.capacity[team]
    }

    fn try_seat(&mut self, team: usize, role: usize, participant: usize) -> bool {
        if !self.team_has_room(team)
            || self.placement.get(team, role).is_some()
            || !self.preferences[participant].allows(role)
        {
            return false;
        }
        self.placement.set(team, role, Some(participant));
        true
    }

    fn preferred_roles(&self, participant: usize) -> impl Iterator<Item = usize> {
        let prefs = self.preferences[participant];
        [prefs.primary, prefs.secondary].into_iter().flatten()
    }

    /// The k-th participant in priority order is offered team `k mod T` and
    /// takes their primary role there, else their secondary, else waits.
    fn round_robin(&mut self, order: &[usize]) {
        let team_count = self.capacity.len();
        for (position, &participant) in order.iter().enumerate() {
            let team = position % team_count;
            let roles: Vec<usize> = self.preferred_roles(participant).collect();
            if !roles.into_iter().any(|role| self.try_seat(team, role, participant)) {
                self.pool.push(participant);
            }
        }
    }

    /// Each participant goes to the open team with the lowest running skill
    /// sum (lowest index on ties) and tries their preferred roles there.
    fn lowest_sum_first(&mut self, order: &[usize]) {
        let mut sums = vec![0i64; self.capacity.len()];
        for &participant in order {
            let target = (0..sums.len())
                .filter(|team| self.team_has_room(*team))
                .min_by_key(|team| (sums[*team], *team));
            let seated = target.is_some_and(|team| {
                let roles: Vec<usize> = self.preferred_roles(participant).collect();
                roles.into_iter().any(|role| self.try_seat(team, role, participant))
            });
            match target {
                Some(team) if seated => sums[team] += self.participants[participant].skill,
                _ => self.pool.push(participant),
            }
        }
    }

    /// Walks empty seats team by team in role-set order and hands each to the
    /// first waiting participant not forbidden from it.
    fn fill_gaps(&mut self) {
        for team in 0..self.capacity.len() {
            for role in 0..self.placement.role_count() {
                if !self.team_has_room(team) {
                    break;
                }
                if self.placement.get(team, role).is_some() {
                    continue;
                }
                let candidate = self
                    .pool
                    .iter()
                    .position(|participant| self.preferences[*participant].allows(role));
                if let Some(position) = candidate {
                    let participant = self.pool.remove(position);
                    self.placement.set(team, role, Some(participant));
                }
            }
        }
    }

    /// One pass over the filled seats. A seat goes to the strongest waiting
    /// participant who prefers that role, is allowed in it, and outranks the
    /// occupant; the occupant returns to the pool.
    fn swap_pass(&mut self) -> usize {
        let mut swaps = 0;
        for team in 0..self.capacity.len() {
            for role in 0..self.placement.role_count() {
                let Some(incumbent) = self.placement.get(team, role) else {
                    continue;
                };
                let incumbent_skill = self.participants[incumbent].skill;
                let challenger = self.pool.iter().position(|candidate| {
                    let prefs = &self.preferences[*candidate];
                    self.participants[*candidate].skill > incumbent_skill
                        && prefs.prefers(role)
                        && prefs.allows(role)
                });
                let Some(position) = challenger else {
                    continue;
                };

                let challenger = self.pool.remove(position);
                self.placement.set(team, role, Some(challenger));
                let at = self
                    .pool
                    .partition_point(|waiting| self.rank[*waiting] < self.rank[incumbent]);
                self.pool.insert(at, incumbent);
                swaps += 1;
            }
        }
        swaps
    }
}
