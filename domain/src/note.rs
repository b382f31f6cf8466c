use crate::error::Error;
use crate::{notes::Model, Id};
use entity_api::note;
use sea_orm::DatabaseConnection;

pub async fn find_by_id(db: &DatabaseConnection, note_id: Id) -> Result<Model, Error> {
    Ok(note::find_by_id(db, note_id).await?)
}

/// The note captured when the meeting ended. Ongoing meetings have none.
pub async fn find_by_meeting_id(db: &DatabaseConnection, meeting_id: Id) -> Result<Model, Error> {
    note::find_by_meeting_id(db, meeting_id)
        .await?
        .ok_or_else(Error::not_found)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    #[tokio::test]
    async fn find_by_meeting_id_returns_the_captured_note() {
        let captured = Model {
            id: Id::new_v4(),
            meeting_id: Id::new_v4(),
            content: json!({"content": []}),
            created_at: Utc::now().into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[captured.clone()]])
            .into_connection();

        assert_eq!(
            find_by_meeting_id(&db, captured.meeting_id).await.unwrap(),
            captured
        );
    }

    #[tokio::test]
    async fn ongoing_meetings_have_no_note() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Model>::new()])
            .into_connection();

        let err = find_by_meeting_id(&db, Id::new_v4()).await.unwrap_err();

        assert_eq!(err.category(), ErrorCategory::NotFound);
    }
}
