use super::error::Error;
use chrono::Duration;
use entity::summaries::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*, ActiveValue::Set, ActiveValue::Unchanged, ConnectionTrait, TryIntoModel,
};

/// Timestamp for the next write of a summary last touched at `previous`. Always strictly later
/// than `previous`, even when the clock has not advanced or has stepped backwards.
pub fn next_updated_at(
    previous: DateTimeWithTimeZone,
    now: DateTimeWithTimeZone,
) -> DateTimeWithTimeZone {
    let floor = previous + Duration::microseconds(1);
    if now > floor {
        now
    } else {
        floor
    }
}

pub async fn create(
    db: &impl ConnectionTrait,
    note_id: Id,
    summary_json: Json,
    at: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    debug!("Creating summary for note {note_id}");

    let active_model = ActiveModel {
        note_id: Set(note_id),
        summary_json: Set(summary_json),
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

pub async fn find_by_note_id(
    db: &impl ConnectionTrait,
    note_id: Id,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::NoteId.eq(note_id))
        .one(db)
        .await?)
}

/// Overwrites the stored body of an existing summary, keeping its id and creation time.
pub async fn update_json(
    db: &impl ConnectionTrait,
    existing: Model,
    summary_json: Json,
    now: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    let updated_at = next_updated_at(existing.updated_at, now);

    let active_model = ActiveModel {
        id: Unchanged(existing.id),
        note_id: Unchanged(existing.note_id),
        summary_json: Set(summary_json),
        created_at: Unchanged(existing.created_at),
        updated_at: Set(updated_at),
    };

    Ok(active_model.update(db).await?.try_into_model()?)
}

/// Creates the note's summary or overwrites the current one in place. Two writers racing on the
/// same note both succeed; the later write wins and only one row exists afterwards.
pub async fn upsert_for_note(
    db: &impl ConnectionTrait,
    note_id: Id,
    summary_json: Json,
    now: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    if let Some(existing) = find_by_note_id(db, note_id).await? {
        debug!("Overwriting summary {} for note {note_id}", existing.id);
        return update_json(db, existing, summary_json, now).await;
    }

    match create(db, note_id, summary_json.clone(), now).await {
        Ok(summary) => Ok(summary),
        Err(err) if err.is_unique_violation() => {
            debug!("Summary for note {note_id} was created concurrently, overwriting it");
            let existing = find_by_note_id(db, note_id)
                .await?
                .ok_or_else(Error::record_not_found)?;
            update_json(db, existing, summary_json, now).await
        }
        Err(err) => Err(err),
    }
}

pub async fn delete_by_id(db: &impl ConnectionTrait, id: Id) -> Result<(), Error> {
    let result = Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::record_not_found());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn next_updated_at_uses_the_clock_when_it_moved_forward() {
        let previous: DateTimeWithTimeZone = Utc::now().into();
        let now = previous + Duration::seconds(5);

        assert_eq!(next_updated_at(previous, now), now);
    }

    #[test]
    fn next_updated_at_is_strictly_later_when_the_clock_stalls() {
        let previous: DateTimeWithTimeZone = Utc::now().into();

        let next = next_updated_at(previous, previous);

        assert!(next > previous);
    }

    #[test]
    fn next_updated_at_is_strictly_later_when_the_clock_goes_backwards() {
        let previous: DateTimeWithTimeZone = Utc::now().into();
        let now = previous - Duration::seconds(30);

        assert!(next_updated_at(previous, now) > previous);
    }
}
