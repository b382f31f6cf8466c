//! SeaORM Entity for the meetings table.

use crate::meeting_status::MeetingStatus;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "spreado", table_name = "meetings")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Id,

    /// Group that owns the meeting
    pub group_id: Id,

    /// User who started the meeting and hosts it
    pub creator_id: Id,

    pub title: String,

    #[serde(skip_deserializing)]
    pub status: MeetingStatus,

    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,

    /// Set exactly once, when the meeting transitions to `Ended`
    #[serde(skip_deserializing)]
    pub ended_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Creator,

    #[sea_orm(has_many = "super::meeting_participations::Entity")]
    MeetingParticipations,

    #[sea_orm(has_one = "super::notes::Entity")]
    Notes,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::meeting_participations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MeetingParticipations.def()
    }
}

impl Related<super::notes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
