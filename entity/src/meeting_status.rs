use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a meeting. A meeting only ever moves from `Ongoing` to `Ended`.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, EnumIter, Deserialize, Default, Serialize, DeriveActiveEnum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "meeting_status")]
pub enum MeetingStatus {
    /// Participants are collaborating in the meeting's room
    #[sea_orm(string_value = "ongoing")]
    #[default]
    Ongoing,
    /// The room has been torn down and its content captured as a note
    #[sea_orm(string_value = "ended")]
    Ended,
}

impl MeetingStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: MeetingStatus) -> bool {
        matches!((self, next), (MeetingStatus::Ongoing, MeetingStatus::Ended))
    }
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeetingStatus::Ongoing => write!(fmt, "ongoing"),
            MeetingStatus::Ended => write!(fmt, "ended"),
        }
    }
}
