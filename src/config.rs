//! stackmaker.toml configuration.
//!
//! Every field has a default, so an empty or missing file yields the stock
//! policy: teams of five, sizes {1, 2, 3, 5}, exact search for priority and
//! balance modes.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::RankTable;

pub const DEFAULT_CONFIG_PATH: &str = "stackmaker.toml";
pub const CONFIG_PATH_ENV: &str = "STACKMAKER_CONFIG";
pub const BIND_ENV: &str = "STACKMAKER_BIND";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Display order for roles in projected teams. Falls back to the request's role order.
    pub canonical_roles: Option<Vec<String>>,
    pub topology: TopologyConfig,
    pub solver: SolverConfig,
    pub weights: ObjectiveWeights,
    pub ranks: RankTable,
}

impl StackConfig {
    /// Loads `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// Loads from `$STACKMAKER_CONFIG`, or `stackmaker.toml` in the working directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Target team size; clamped to the role-set size.
    pub preferred_size: usize,
    /// Team sizes accepted besides the preferred one.
    pub allowed_sizes: Vec<usize>,
    /// Fixed number of teams. When unset, the count is derived from the preferred size.
    pub team_count: Option<usize>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            preferred_size: 5,
            allowed_sizes: vec![1, 2, 3, 5],
            team_count: None,
        }
    }
}

/// How priority and balance modes are solved. Random mode is always heuristic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Exact,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub strategy: Strategy,
    pub seed: u64,
    /// Search nodes before the exact solver stops with its incumbent.
    pub node_limit: u64,
    pub time_limit_ms: u64,
    /// Run the single swap pass after the priority heuristic.
    pub improvement_pass: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Exact,
            seed: 42,
            node_limit: 250_000,
            time_limit_ms: 2_000,
            improvement_pass: true,
        }
    }
}

/// Objective coefficients for the exact model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub primary: i64,
    pub primary_skill: i64,
    pub secondary: i64,
    pub autofill: i64,
    pub preferred_size: i64,
    pub top_team: i64,
    /// Applied per team whose size falls outside the allowed set, when the
    /// topology could not honour the set exactly.
    pub size_violation: i64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            primary: 1000,
            primary_skill: 10,
            secondary: 500,
            autofill: -1000,
            preferred_size: 1000,
            top_team: 1,
            size_violation: -1000,
        }
    }
}
