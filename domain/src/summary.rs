//! Summarization pipeline: note → plain text → provider → normalized summary → upsert.

use crate::document;
use crate::error::{Error, ValidationErrorKind};
use crate::gateway::{self, SummaryProvider};
use crate::prompt::PromptTemplate;
use crate::summary_contract::{self, response_schema};
use crate::{notes, summaries, Id};
use chrono::Utc;
use entity_api::{note, summary};
use log::*;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use service::config::Config;

/// Checks everything summarization needs from configuration. Run once at startup so that a
/// missing template or credential stops the process instead of failing the first request.
pub fn validate_config(config: &Config) -> Result<(), Error> {
    PromptTemplate::from_config(config)?;
    gateway::summary_provider(config)?;
    Ok(())
}

/// Summarizes the note and stores the result as the note's current summary.
pub async fn generate(
    db: &DatabaseConnection,
    config: &Config,
    note_id: Id,
) -> Result<summaries::Model, Error> {
    let template = PromptTemplate::from_config(config)?;
    let provider = gateway::summary_provider(config)?;
    generate_with(db, provider.as_ref(), &template, note_id).await
}

pub async fn generate_with(
    db: &DatabaseConnection,
    provider: &dyn SummaryProvider,
    template: &PromptTemplate,
    note_id: Id,
) -> Result<summaries::Model, Error> {
    let note = note::find_by_id(db, note_id).await?;
    summarize_note(db, provider, template, &note).await
}

pub(crate) async fn summarize_note(
    db: &DatabaseConnection,
    provider: &dyn SummaryProvider,
    template: &PromptTemplate,
    note: &notes::Model,
) -> Result<summaries::Model, Error> {
    let text = document::to_plain_text(&note.content)?;
    if text.trim().is_empty() {
        warn!("Note {} has no text to summarize", note.id);
        return Err(Error::validation(ValidationErrorKind::BlankContent));
    }

    let prompt = template.render(&text);
    let payload = provider.summarize(&prompt, &response_schema()).await?;
    let normalized = summary_contract::normalize(payload)?;

    let stored =
        summary::upsert_for_note(db, note.id, normalized.to_json()?, Utc::now().into()).await?;
    info!("Stored summary {} for note {}", stored.id, note.id);

    Ok(stored)
}

/// The current summary of a note.
pub async fn find_by_note_id(db: &DatabaseConnection, note_id: Id) -> Result<summaries::Model, Error> {
    summary::find_by_note_id(db, note_id)
        .await?
        .ok_or_else(Error::not_found)
}

/// Replaces a summary's body with caller-supplied JSON, stored as-is.
pub async fn update(
    db: &DatabaseConnection,
    summary_id: Id,
    summary_json: Value,
) -> Result<summaries::Model, Error> {
    let existing = summary::find_by_id(db, summary_id).await?;
    debug!("Manually overwriting summary {summary_id}");
    Ok(summary::update_json(db, existing, summary_json, Utc::now().into()).await?)
}

pub async fn delete_by_id(db: &DatabaseConnection, summary_id: Id) -> Result<(), Error> {
    summary::delete_by_id(db, summary_id).await?;
    Ok(())
}
