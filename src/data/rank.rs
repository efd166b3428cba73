//! Skill-label lookup. The core only ever sees resolved ordinal values; this
//! table is handed to the service layer, which resolves labels before calling
//! [crate::optimizer::assign].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const DEFAULT_TIERS: [(&str, i64); 10] = [
    ("iron", 1),
    ("bronze", 2),
    ("silver", 3),
    ("gold", 4),
    ("platinum", 5),
    ("emerald", 6),
    ("diamond", 7),
    ("master", 8),
    ("grandmaster", 9),
    ("challenger", 10),
];

/// Immutable label → ordinal map. Higher values are stronger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankTable {
    values: BTreeMap<String, i64>,
}

impl Default for RankTable {
    fn default() -> Self {
        Self::from_entries(DEFAULT_TIERS.iter().map(|(label, value)| (*label, *value)))
    }
}

impl RankTable {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        Self {
            values: entries
                .into_iter()
                .map(|(label, value)| (label.as_ref().trim().to_ascii_lowercase(), value))
                .collect(),
        }
    }

    /// Resolves `label` case-insensitively. Plain integers resolve to themselves.
    pub fn rank_value(&self, label: &str) -> Option<i64> {
        let trimmed = label.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return Some(value);
        }
        self.values.get(&trimmed.to_ascii_lowercase()).copied()
    }
}
