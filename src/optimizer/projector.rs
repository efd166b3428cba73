use serde::Serialize;

use crate::data::{Participant, RoleSet};
use crate::optimizer::placement::Placement;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatResult {
    pub id: String,
    pub skill: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_label: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamResult {
    pub index: usize,
    pub skill_sum: i64,
    pub members: Vec<SeatResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnfilledRole {
    pub team_index: usize,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub teams: Vec<TeamResult>,
    pub unfilled_roles: Vec<UnfilledRole>,
    pub unassigned: Vec<String>,
}

/// Role indices in display order: roles named in `canonical` first, in that
/// order, then the remaining roles in role-set order.
pub fn display_order(roles: &RoleSet, canonical: Option<&[String]>) -> Vec<usize> {
    let mut order = Vec::with_capacity(roles.len());
    for label in canonical.unwrap_or_default() {
        if let Some(role) = roles.index_of(label) {
            if !order.contains(&role) {
                order.push(role);
            }
        }
    }
    for role in 0..roles.len() {
        if !order.contains(&role) {
            order.push(role);
        }
    }
    order
}

pub fn project(
    placement: &Placement,
    participants: &[Participant],
    roles: &RoleSet,
    canonical: Option<&[String]>,
    unassigned: &[usize],
) -> Projection {
    let order = display_order(roles, canonical);

    let teams = (0..placement.team_count())
        .map(|team| {
            let members: Vec<SeatResult> = order
                .iter()
                .filter_map(|&role| {
                    placement.get(team, role).map(|index| {
                        let participant = &participants[index];
                        SeatResult {
                            id: participant.id.clone(),
                            skill: participant.skill,
                            skill_label: participant.skill_label.clone(),
                            role: roles.label(role).to_string(),
                        }
                    })
                })
                .collect();
            TeamResult {
                index: team,
                skill_sum: members.iter().map(|seat| seat.skill).sum(),
                members,
            }
        })
        .collect();

    let unfilled_roles = placement
        .empty_slots()
        .into_iter()
        .map(|(team, role)| UnfilledRole {
            team_index: team,
            role: roles.label(role).to_string(),
        })
        .collect();

    Projection {
        teams,
        unfilled_roles,
        unassigned: unassigned
            .iter()
            .map(|index| participants[*index].id.clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> RoleSet {
        RoleSet::new(&["Top", "Jungle", "Mid"]).expect("roles")
    }

    #[test]
    fn canonical_order_leads_and_unknown_labels_are_ignored() {
        let canonical = vec!["MID".to_string(), "bench".to_string(), "top".to_string()];
        assert_eq!(display_order(&roles(), Some(&canonical)), vec![2, 0, 1]);
        assert_eq!(display_order(&roles(), None), vec![0, 1, 2]);
    }

    #[test]
    fn projection_lists_members_gaps_and_waiting_participants() {
        let participants = vec![
            Participant::new("ana", 7, "Mid").with_skill_label("Gold"),
            Participant::new("bo", 3, "Top"),
            Participant::new("cy", 1, "Top"),
        ];
        let mut placement = Placement::empty(1, 3);
        placement.set(0, 0, Some(1));
        placement.set(0, 2, Some(0));
        let canonical = vec!["Mid".to_string()];

        let projection = project(&placement, &participants, &roles(), Some(&canonical), &[2]);

        let team = &projection.teams[0];
        assert_eq!(team.skill_sum, 10);
        let ids: Vec<&str> = team.members.iter().map(|seat| seat.id.as_str()).collect();
        assert_eq!(ids, vec!["ana", "bo"]);
        assert_eq!(team.members[0].role, "Mid");
        assert_eq!(team.members[0].skill_label.as_deref(), Some("Gold"));
        assert_eq!(
            projection.unfilled_roles,
            vec![UnfilledRole {
                team_index: 0,
                role: "Jungle".to_string()
            }]
        );
        assert_eq!(projection.unassigned, vec!["cy".to_string()]);
    }
}
