pub mod participant;
pub mod rank;

pub use participant::{
    ensure_summable_skills, ensure_unique_ids, normalize_role, Participant, RolePreferences,
    RoleSet, MAX_ROLES,
};
pub use rank::RankTable;
