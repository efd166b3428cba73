//! Search budget for the exact solver.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::SolverConfig;

/// Clock reads happen once per this many nodes.
const CLOCK_CHECK_INTERVAL: u64 = 1024;

/// Node and wall-clock limits for one solve. A zero limit disables that limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    pub node_limit: u64,
    pub time_limit: Duration,
}

impl SearchBudget {
    pub fn new(node_limit: u64, time_limit: Duration) -> Self {
        Self {
            node_limit,
            time_limit,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(config.node_limit, Duration::from_millis(config.time_limit_ms))
    }
}

/// Why the search stopped before exhausting the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStop {
    NodeLimit,
    TimeLimit,
}

/// Nodes between clock reads for a role set of `role_count` roles. A node
/// costs up to `2^role_count` layout states per team, so the interval shrinks
/// from `CLOCK_CHECK_INTERVAL` at six roles down to every node at sixteen.
pub fn clock_check_interval(role_count: usize) -> u64 {
    CLOCK_CHECK_INTERVAL >> role_count.saturating_sub(6).min(10)
}

/// Counts nodes and watches the clock. The node limit is exact and
/// deterministic; the time limit is checked every [clock_check_interval] nodes.
#[derive(Debug)]
pub struct BudgetMonitor {
    budget: SearchBudget,
    started: Instant,
    nodes: u64,
    clock_interval: u64,
    since_clock_check: u64,
    stop: Option<BudgetStop>,
}

impl BudgetMonitor {
    pub fn start(budget: SearchBudget, role_count: usize) -> Self {
        Self {
            budget,
            started: Instant::now(),
            nodes: 0,
            clock_interval: clock_check_interval(role_count),
            since_clock_check: 0,
            stop: None,
        }
    }

    /// Records one node. Returns `true` once the search must stop.
    pub fn enter_node(&mut self) -> bool {
        if self.stop.is_some() {
            return true;
        }
        self.nodes += 1;

        if self.budget.node_limit > 0 && self.nodes > self.budget.node_limit {
            self.stop = Some(BudgetStop::NodeLimit);
            return true;
        }

        self.since_clock_check += 1;
        if self.since_clock_check >= self.clock_interval {
            self.since_clock_check = 0;
            if !self.budget.time_limit.is_zero() && self.started.elapsed() >= self.budget.time_limit
            {
                self.stop = Some(BudgetStop::TimeLimit);
                return true;
            }
        }
        false
    }

    pub fn stopped(&self) -> Option<BudgetStop> {
        self.stop
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
