//! Read access to groups and their membership. Groups are managed elsewhere; the meeting
//! pipeline only needs a user's membership row, which carries their role.

use super::error::Error;
use entity::group_role::GroupRole;
use entity::{group_members, groups, Id};
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Set, ConnectionTrait};

pub async fn create(
    db: &impl ConnectionTrait,
    name: String,
    at: DateTimeWithTimeZone,
) -> Result<groups::Model, Error> {
    debug!("Creating group {name}");

    let active_model = groups::ActiveModel {
        name: Set(name),
        created_at: Set(at),
        updated_at: Set(at),
        ..Default::default()
    };

    Ok(active_model.insert(db).await?)
}

pub async fn add_member(
    db: &impl ConnectionTrait,
    group_id: Id,
    user_id: Id,
    role: GroupRole,
    at: DateTimeWithTimeZone,
) -> Result<group_members::Model, Error> {
    debug!("Adding user {user_id} to group {group_id} as {role}");

    let active_model = group_members::ActiveModel {
        group_id: Set(group_id),
        user_id: Set(user_id),
        role: Set(role),
        created_at: Set(at),
        ..Default::default()
    };

    Ok(active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<groups::Model, Error> {
    groups::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::record_not_found)
}

pub async fn find_membership(
    db: &impl ConnectionTrait,
    group_id: Id,
    user_id: Id,
) -> Result<Option<group_members::Model>, Error> {
    Ok(group_members::Entity::find()
        .filter(group_members::Column::GroupId.eq(group_id))
        .filter(group_members::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}
