use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{AssignError, AssignResult};

/// Upper bound on the role-set size. Per-team role layouts are solved with a
/// bitmask over roles, so the set has to stay small.
pub const MAX_ROLES: usize = 16;

/// A participant as consumed by the assignment core. Skill is already resolved
/// to an ordinal value; `skill_label` is carried through for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub skill: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_label: Option<String>,
    pub role1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, skill: i64, role1: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            skill,
            skill_label: None,
            role1: role1.into(),
            role2: None,
            forbidden: None,
        }
    }

    pub fn with_secondary(mut self, role: impl Into<String>) -> Self {
        self.role2 = Some(role.into());
        self
    }

    pub fn with_forbidden(mut self, role: impl Into<String>) -> Self {
        self.forbidden = Some(role.into());
        self
    }

    pub fn with_skill_label(mut self, label: impl Into<String>) -> Self {
        self.skill_label = Some(label.into());
        self
    }
}

/// Case-normalizes a role label into the key used for every comparison.
pub fn normalize_role(label: &str) -> String {
    label.trim().to_ascii_lowercase()
}

/// The ordered role set of a request. Every team holds exactly one slot per role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet {
    labels: Vec<String>,
    keys: Vec<String>,
}

impl RoleSet {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> AssignResult<Self> {
        if labels.is_empty() {
            return Err(AssignError::configuration("role set must not be empty"));
        }
        if labels.len() > MAX_ROLES {
            return Err(AssignError::configuration(format!(
                "role set has {} roles, at most {MAX_ROLES} are supported",
                labels.len()
            )));
        }

        let mut keys = Vec::with_capacity(labels.len());
        let mut seen = HashSet::with_capacity(labels.len());
        for label in labels {
            let key = normalize_role(label.as_ref());
            if key.is_empty() {
                return Err(AssignError::configuration("role labels must not be blank"));
            }
            if !seen.insert(key.clone()) {
                return Err(AssignError::configuration(format!(
                    "duplicate role '{}'",
                    label.as_ref().trim()
                )));
            }
            keys.push(key);
        }

        Ok(Self {
            labels: labels.iter().map(|l| l.as_ref().trim().to_string()).collect(),
            keys,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The caller's label for `role`, as supplied (trimmed).
    pub fn label(&self, role: usize) -> &str {
        &self.labels[role]
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        let key = normalize_role(label);
        self.keys.iter().position(|k| *k == key)
    }
}

/// A participant's role preferences resolved against a [RoleSet].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RolePreferences {
    pub primary: Option<usize>,
    pub secondary: Option<usize>,
    pub forbidden: Option<usize>,
}

impl RolePreferences {
    /// Labels outside the role set resolve to `None`; a secondary equal to the
    /// primary is dropped.
    pub fn resolve(participant: &Participant, roles: &RoleSet) -> Self {
        let primary = roles.index_of(&participant.role1);
        let secondary = participant
            .role2
            .as_deref()
            .and_then(|role| roles.index_of(role))
            .filter(|role| Some(*role) != primary);
        let forbidden = participant
            .forbidden
            .as_deref()
            .and_then(|role| roles.index_of(role));

        Self {
            primary,
            secondary,
            forbidden,
        }
    }

    pub fn allows(&self, role: usize) -> bool {
        self.forbidden != Some(role)
    }

    pub fn prefers(&self, role: usize) -> bool {
        self.primary == Some(role) || self.secondary == Some(role)
    }
}

/// Rejects requests where two participants share an identity.
pub fn ensure_unique_ids(participants: &[Participant]) -> AssignResult<()> {
    let mut seen = HashSet::with_capacity(participants.len());
    for participant in participants {
        if !seen.insert(participant.id.as_str()) {
            return Err(AssignError::configuration(format!(
                "duplicate participant '{}'",
                participant.id
            )));
        }
    }
    Ok(())
}

/// Rejects skill values whose absolute total does not fit an `i64`, so team
/// skill sums never overflow.
pub fn ensure_summable_skills(participants: &[Participant]) -> AssignResult<i64> {
    participants
        .iter()
        .try_fold(0i64, |total, participant| {
            total.checked_add(participant.skill.checked_abs()?)
        })
        .ok_or_else(|| AssignError::configuration("skill values are too large to sum"))
}
