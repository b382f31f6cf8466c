use super::error::Error;
use entity::users::{ActiveModel, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Set, ConnectionTrait};

pub async fn create(
    db: &impl ConnectionTrait,
    name: String,
    email: String,
    at: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    debug!("Creating user with email {email}");

    let active_model = ActiveModel {
        name: Set(name),
        email: Set(email),
        created_at: Set(at),
        updated_at: Set(at),
        ..Default::default()
    };

    Ok(active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::record_not_found)
}
