use super::error::Error;
use entity::meeting_participations::{ActiveModel, Column, Entity, Model};
use entity::{users, Id};
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Set, ConnectionTrait, QueryOrder};

pub async fn create(
    db: &impl ConnectionTrait,
    meeting_id: Id,
    user_id: Id,
    joined_at: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    debug!("Recording participation of user {user_id} in meeting {meeting_id}");

    let active_model = ActiveModel {
        meeting_id: Set(meeting_id),
        user_id: Set(user_id),
        joined_at: Set(joined_at),
        ..Default::default()
    };

    Ok(active_model.insert(db).await?)
}

pub async fn find_by_meeting_and_user(
    db: &impl ConnectionTrait,
    meeting_id: Id,
    user_id: Id,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::MeetingId.eq(meeting_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

/// Returns the existing participation for (meeting, user) or inserts one. A concurrent insert
/// that wins the unique index race is read back rather than surfaced as an error.
pub async fn find_or_create(
    db: &impl ConnectionTrait,
    meeting_id: Id,
    user_id: Id,
    joined_at: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    if let Some(existing) = find_by_meeting_and_user(db, meeting_id, user_id).await? {
        return Ok(existing);
    }

    match create(db, meeting_id, user_id, joined_at).await {
        Ok(created) => Ok(created),
        Err(err) if err.is_unique_violation() => {
            debug!("Participation for user {user_id} in meeting {meeting_id} created concurrently");
            find_by_meeting_and_user(db, meeting_id, user_id)
                .await?
                .ok_or_else(Error::record_not_found)
        }
        Err(err) => Err(err),
    }
}

/// Participations of a meeting paired with the participating user, in join order.
pub async fn find_with_users_by_meeting_id(
    db: &impl ConnectionTrait,
    meeting_id: Id,
) -> Result<Vec<(Model, users::Model)>, Error> {
    let rows = Entity::find()
        .filter(Column::MeetingId.eq(meeting_id))
        .order_by_asc(Column::JoinedAt)
        .find_also_related(users::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(participation, user)| user.map(|user| (participation, user)))
        .collect())
}

pub async fn delete_by_id(db: &impl ConnectionTrait, id: Id) -> Result<(), Error> {
    let result = Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::record_not_found());
    }
    Ok(())
}
