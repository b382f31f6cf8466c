//! Storage operations for the meetings table.

use super::error::Error;
use entity::meeting_participations;
use entity::meeting_status::MeetingStatus;
use entity::meetings::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*, ActiveValue::Set, ConnectionTrait, IntoActiveModel, QueryOrder,
    QuerySelect, TryIntoModel,
};

/// Inserts a new meeting in the `Ongoing` state. The id is allocated by the caller so that the
/// meeting's room can be provisioned before the row exists.
pub async fn create(
    db: &impl ConnectionTrait,
    id: Id,
    group_id: Id,
    creator_id: Id,
    title: String,
    created_at: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    debug!("Creating meeting {id} in group {group_id}");

    let active_model = ActiveModel {
        id: Set(id),
        group_id: Set(group_id),
        creator_id: Set(creator_id),
        title: Set(title),
        status: Set(MeetingStatus::Ongoing),
        created_at: Set(created_at),
        ended_at: Set(None),
    };

    Ok(active_model.insert(db).await?.try_into_model()?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::record_not_found)
}

/// Same as [`find_by_id`] but takes a row lock (`SELECT ... FOR UPDATE`). Only meaningful
/// inside a transaction.
pub async fn find_by_id_for_update(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(Error::record_not_found)
}

/// Meetings of a group, newest first
pub async fn find_by_group_id(
    db: &impl ConnectionTrait,
    group_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::GroupId.eq(group_id))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// Meetings the user currently has a participation row in, newest first
pub async fn find_by_participant(
    db: &impl ConnectionTrait,
    user_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .inner_join(meeting_participations::Entity)
        .filter(meeting_participations::Column::UserId.eq(user_id))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// Persists the status and end timestamp of an already-transitioned meeting.
pub async fn save_ended(db: &impl ConnectionTrait, ended: Model) -> Result<Model, Error> {
    debug!("Marking meeting {} as {}", ended.id, ended.status);

    let status = ended.status;
    let ended_at = ended.ended_at;
    let mut active_model = ended.into_active_model();
    active_model.status = Set(status);
    active_model.ended_at = Set(ended_at);

    Ok(active_model.update(db).await?.try_into_model()?)
}
