use crate::data::Participant;

/// Team × role grid of seated participants (indices into the request's participant list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    role_count: usize,
    slots: Vec<Option<usize>>,
}

impl Placement {
    pub fn empty(team_count: usize, role_count: usize) -> Self {
        Self {
            role_count,
            slots: vec![None; team_count * role_count],
        }
    }

    pub fn team_count(&self) -> usize {
        if self.role_count == 0 {
            0
        } else {
            self.slots.len() / self.role_count
        }
    }

    pub fn role_count(&self) -> usize {
        self.role_count
    }

    pub fn get(&self, team: usize, role: usize) -> Option<usize> {
        self.slots[team * self.role_count + role]
    }

    pub fn set(&mut self, team: usize, role: usize, participant: Option<usize>) {
        self.slots[team * self.role_count + role] = participant;
    }

    pub fn team(&self, team: usize) -> &[Option<usize>] {
        let start = team * self.role_count;
        &self.slots[start..start + self.role_count]
    }

    pub fn team_size(&self, team: usize) -> usize {
        self.team(team).iter().flatten().count()
    }

    /// `(role, participant)` pairs of one team in role order.
    pub fn members(&self, team: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.team(team)
            .iter()
            .enumerate()
            .filter_map(|(role, seat)| seat.map(|participant| (role, participant)))
    }

    /// Every filled slot as `(team, role, participant)`.
    pub fn filled(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.slots.iter().enumerate().filter_map(move |(index, seat)| {
            seat.map(|participant| (index / self.role_count, index % self.role_count, participant))
        })
    }

    /// Every empty slot as `(team, role)`, team-major.
    pub fn empty_slots(&self) -> Vec<(usize, usize)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, seat)| seat.is_none())
            .map(|(index, _)| (index / self.role_count, index % self.role_count))
            .collect()
    }

    pub fn seated_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn skill_sums(&self, participants: &[Participant]) -> Vec<i64> {
        (0..self.team_count())
            .map(|team| {
                self.members(team)
                    .map(|(_, participant)| participants[participant].skill)
                    .sum()
            })
            .collect()
    }

    /// Rebuilds the grid so that new team `i` is old team `order[i]`.
    pub fn reorder_teams(&mut self, order: &[usize]) {
        let mut slots = Vec::with_capacity(self.slots.len());
        for &team in order {
            slots.extend_from_slice(self.team(team));
        }
        self.slots = slots;
    }
}
