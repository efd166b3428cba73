//! Team and role assignment for pick-up games.
//!
//! [assign] places participants into teams with one slot per role, either
//! through an exact branch-and-bound search or through greedy heuristics, and
//! always reports whether the result is optimal, heuristic or infeasible.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod optimizer;
pub mod parallel;
pub mod server;

pub use config::StackConfig;
pub use data::{Participant, RankTable};
pub use error::{AssignError, AssignResult};
pub use optimizer::{
    assign, assign_job, assign_many, AssignJob, AssignMode, Assignment, AssignmentStatus,
};
