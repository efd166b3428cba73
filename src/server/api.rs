use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{StackConfig, Strategy};
use crate::data::{Participant, RankTable};
use crate::error::AssignError;
use crate::optimizer::projector::UnfilledRole;
use crate::optimizer::{assign_job, AssignJob, AssignMode, Assignment, AssignmentStatus, SearchReport};

pub const SERVICE_GREETING: &str = "FFG StackMaker";

const MAX_PLAYERS: usize = 500;
const MAX_NAME_LEN: usize = 64;
const MAX_RANK: i64 = 1_000_000;

/// A player's rank: an ordinal value, or a tier label looked up in the [RankTable].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RankInput {
    Value(i64),
    Label(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerRequest {
    pub name: String,
    pub rank: RankInput,
    pub role1: String,
    #[serde(default)]
    pub role2: Option<String>,
    #[serde(default)]
    pub forbidden: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRequest {
    pub players: Vec<PlayerRequest>,
    pub roles: Vec<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub canonical_roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    pub name: String,
    pub skill: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_label: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamView {
    pub index: usize,
    pub skill_sum: i64,
    pub members: Vec<MemberView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamResponse {
    pub status: AssignmentStatus,
    pub strategy: Strategy,
    pub mode: AssignMode,
    pub teams: Vec<TeamView>,
    pub unfilled_roles: Vec<UnfilledRole>,
    pub unassigned: Vec<String>,
    pub objective: Option<i64>,
    pub search: Option<SearchReport>,
}

impl From<Assignment> for TeamResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            status: assignment.status,
            strategy: assignment.strategy,
            mode: assignment.mode,
            teams: assignment
                .teams
                .into_iter()
                .map(|team| TeamView {
                    index: team.index,
                    skill_sum: team.skill_sum,
                    members: team
                        .members
                        .into_iter()
                        .map(|seat| MemberView {
                            name: seat.id,
                            skill: seat.skill,
                            skill_label: seat.skill_label,
                            role: seat.role,
                        })
                        .collect(),
                })
                .collect(),
            unfilled_roles: assignment.unfilled_roles,
            unassigned: assignment.unassigned,
            objective: assignment.objective,
            search: assignment.search,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrorResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationErrorResponse {
    fn new(errors: Vec<ValidationIssue>) -> Self {
        Self {
            status: "error",
            message: "Validation failed",
            errors,
        }
    }
}

#[derive(Debug)]
pub enum TeamPayloadError {
    Parse(serde_json::Error),
    Validation(ValidationErrorResponse),
}

impl fmt::Display for TeamPayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Validation(response) => {
                let details: Vec<String> = response
                    .errors
                    .iter()
                    .map(|issue| format!("{}: {}", issue.field, issue.messages.join(", ")))
                    .collect();
                write!(f, "invalid team request ({})", details.join("; "))
            }
        }
    }
}

impl std::error::Error for TeamPayloadError {}

impl From<AssignError> for TeamPayloadError {
    fn from(err: AssignError) -> Self {
        let AssignError::Configuration(message) = err;
        Self::Validation(ValidationErrorResponse::new(vec![ValidationIssue {
            field: "request".to_string(),
            messages: vec![message],
        }]))
    }
}

pub fn greeting_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string(SERVICE_GREETING)
}

pub fn health_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "service": "stackmaker",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn create_teams_payload(body: &str, config: &StackConfig) -> Result<String, TeamPayloadError> {
    let request: TeamRequest = serde_json::from_str(body).map_err(TeamPayloadError::Parse)?;
    let job = resolve_request(request, &config.ranks)?;
    let assignment = assign_job(&job, config)?;
    serde_json::to_string_pretty(&TeamResponse::from(assignment)).map_err(TeamPayloadError::Parse)
}

/// Validates a request and resolves ranks into skill values.
pub fn resolve_request(request: TeamRequest, ranks: &RankTable) -> Result<AssignJob, TeamPayloadError> {
    let mut errors: Vec<ValidationIssue> = Vec::new();
    let mut issue = |field: String, message: String| {
        errors.push(ValidationIssue {
            field,
            messages: vec![message],
        })
    };

    if request.players.is_empty() {
        issue("players".to_string(), "must contain at least one player".to_string());
    }
    if request.players.len() > MAX_PLAYERS {
        issue(
            "players".to_string(),
            format!("must contain at most {MAX_PLAYERS} players"),
        );
    }
    if request.roles.is_empty() {
        issue("roles".to_string(), "must not be empty".to_string());
    }
    for (index, role) in request.roles.iter().enumerate() {
        if role.trim().is_empty() {
            issue(format!("roles[{index}]"), "must not be blank".to_string());
        }
    }

    let mode = match request.mode.as_deref() {
        None => AssignMode::default(),
        Some(raw) => raw.parse().unwrap_or_else(|err: AssignError| {
            issue("mode".to_string(), err.to_string());
            AssignMode::default()
        }),
    };

    let mut participants = Vec::with_capacity(request.players.len());
    for (index, player) in request.players.into_iter().enumerate() {
        let name = player.name.trim().to_string();
        if name.is_empty() {
            issue(format!("players[{index}].name"), "must not be empty".to_string());
        } else if name.chars().count() > MAX_NAME_LEN {
            issue(
                format!("players[{index}].name"),
                format!("must be at most {MAX_NAME_LEN} characters"),
            );
        }
        if player.role1.trim().is_empty() {
            issue(format!("players[{index}].role1"), "must not be empty".to_string());
        }

        let (skill, label) = match &player.rank {
            RankInput::Value(value) if *value < 0 => {
                issue(format!("players[{index}].rank"), "must not be negative".to_string());
                continue;
            }
            RankInput::Value(value) if *value > MAX_RANK => {
                issue(
                    format!("players[{index}].rank"),
                    format!("must be at most {MAX_RANK}"),
                );
                continue;
            }
            RankInput::Value(value) => (*value, value.to_string()),
            RankInput::Label(label) => match ranks.rank_value(label) {
                Some(value) if !(0..=MAX_RANK).contains(&value) => {
                    issue(
                        format!("players[{index}].rank"),
                        format!("'{}' must resolve to a value in 0..={MAX_RANK}", label.trim()),
                    );
                    continue;
                }
                Some(value) => (value, label.trim().to_string()),
                None => {
                    issue(
                        format!("players[{index}].rank"),
                        format!("unknown rank '{}'", label.trim()),
                    );
                    continue;
                }
            },
        };

        let mut participant =
            Participant::new(name, skill, player.role1.trim()).with_skill_label(label);
        participant.role2 = non_blank(player.role2);
        participant.forbidden = non_blank(player.forbidden);
        participants.push(participant);
    }

    if !errors.is_empty() {
        return Err(TeamPayloadError::Validation(ValidationErrorResponse::new(
            errors,
        )));
    }

    Ok(AssignJob {
        participants,
        roles: request.roles,
        mode,
        canonical_roles: request.canonical_roles,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
