use super::error::Error;
use entity::notes::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*, ActiveValue::Set, ActiveValue::Unchanged, ConnectionTrait, TryIntoModel,
};

pub async fn create(
    db: &impl ConnectionTrait,
    meeting_id: Id,
    content: Json,
    created_at: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    debug!("Creating note for meeting {meeting_id}");

    let active_model = ActiveModel {
        meeting_id: Set(meeting_id),
        content: Set(content),
        created_at: Set(created_at),
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

pub async fn find_by_meeting_id(
    db: &impl ConnectionTrait,
    meeting_id: Id,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::MeetingId.eq(meeting_id))
        .one(db)
        .await?)
}

async fn replace_content(
    db: &impl ConnectionTrait,
    existing: Model,
    content: Json,
) -> Result<Model, Error> {
    let active_model = ActiveModel {
        id: Unchanged(existing.id),
        meeting_id: Unchanged(existing.meeting_id),
        content: Set(content),
        created_at: Unchanged(existing.created_at),
    };

    Ok(active_model.update(db).await?.try_into_model()?)
}

/// Stores `content` as the meeting's note, replacing the content of an existing note.
///
/// Runs inside the meeting-end transaction, which holds the meeting row lock, so no other
/// writer can insert a note for the same meeting in between the read and the insert. A unique
/// violation is returned as-is: after a failed statement Postgres rejects every further
/// statement of the transaction, so it cannot be recovered from here.
pub async fn upsert_for_meeting(
    db: &impl ConnectionTrait,
    meeting_id: Id,
    content: Json,
    at: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    if let Some(existing) = find_by_meeting_id(db, meeting_id).await? {
        debug!("Replacing content of note {} for meeting {meeting_id}", existing.id);
        return replace_content(db, existing, content).await;
    }

    create(db, meeting_id, content, at).await
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use crate::error::EntityApiErrorKind;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn note(content: Json) -> Model {
        Model {
            id: Id::new_v4(),
            meeting_id: Id::new_v4(),
            content,
            created_at: chrono::Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn upsert_for_meeting_inserts_the_first_note() -> Result<(), Error> {
        let created = note(json!({"doc": {"type": "doc", "content": []}}));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new(), vec![created.clone()]])
            .into_connection();

        let stored = upsert_for_meeting(
            &db,
            created.meeting_id,
            created.content.clone(),
            created.created_at,
        )
        .await?;

        assert_eq!(stored, created);

        Ok(())
    }

    #[tokio::test]
    async fn upsert_for_meeting_keeps_the_existing_note_id() -> Result<(), Error> {
        let existing = note(json!({"doc": {"content": []}}));
        let mut replaced = existing.clone();
        replaced.content = json!({"doc": {"content": [{"type": "paragraph"}]}});

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![existing.clone()], vec![replaced.clone()]])
            .into_connection();

        let stored = upsert_for_meeting(
            &db,
            existing.meeting_id,
            replaced.content.clone(),
            chrono::Utc::now().into(),
        )
        .await?;

        assert_eq!(stored.id, existing.id);
        assert_eq!(stored.content, replaced.content);

        Ok(())
    }

    #[tokio::test]
    async fn upsert_for_meeting_surfaces_a_failed_insert_without_further_statements() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .append_query_errors(vec![DbErr::Custom("insert rejected".to_string())])
            .into_connection();

        let err = upsert_for_meeting(
            &db,
            Id::new_v4(),
            json!({"content": []}),
            chrono::Utc::now().into(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.error_kind, EntityApiErrorKind::SystemError);
        assert_eq!(db.into_transaction_log().len(), 2);
    }

    #[tokio::test]
    async fn find_by_meeting_id_returns_none_without_a_note() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        assert!(find_by_meeting_id(&db, Id::new_v4()).await?.is_none());

        Ok(())
    }
}
