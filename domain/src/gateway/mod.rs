//! Clients for the external providers the meeting pipeline depends on: the real-time room
//! provider and the summarization provider. Orchestration code only sees the traits below.

use crate::error::Error;
use crate::summary_contract::SummaryPayload;
use crate::Id;
use async_trait::async_trait;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service::config::{AiTransport, Config};
use std::time::Duration;

pub mod ai_rest;
pub mod liveblocks;
pub mod openai;

/// Provider-side metadata attached to a room for operational lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMetadata {
    pub group_id: Id,
    pub meeting_id: Id,
}

/// Identity shown to other participants of a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoomUserInfo {
    pub id: String,
    pub name: String,
    pub role: String,
}

/// A short-lived credential scoped to a single room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
}

/// Real-time collaboration room provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomProvider: Send + Sync {
    /// Creates the room. Creating a room that already exists succeeds.
    async fn create_room(&self, room_id: &str, metadata: &RoomMetadata) -> Result<(), Error>;

    /// Issues a write credential for `room_id` only.
    async fn issue_access_token(
        &self,
        room_id: &str,
        user_id: &str,
        user_info: &RoomUserInfo,
    ) -> Result<AccessToken, Error>;

    /// The room's current stored document as JSON.
    async fn fetch_snapshot(&self, room_id: &str) -> Result<Value, Error>;

    async fn delete_room(&self, room_id: &str) -> Result<(), Error>;
}

/// Summarization provider. `schema` is the strict output schema the provider is asked to honor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn summarize(&self, prompt: &str, schema: &Value) -> Result<SummaryPayload, Error>;
}

/// The room provider configured for this deployment.
pub fn room_provider(config: &Config) -> Result<liveblocks::LiveblocksClient, Error> {
    liveblocks::LiveblocksClient::from_config(config)
}

/// The summarization provider selected by `AI_TRANSPORT`.
pub fn summary_provider(config: &Config) -> Result<Box<dyn SummaryProvider>, Error> {
    match config.ai_transport() {
        AiTransport::Responses => Ok(Box::new(openai::OpenAiResponsesClient::from_config(
            config,
        )?)),
        AiTransport::Rest => Ok(Box::new(ai_rest::RestSummaryClient::from_config(config)?)),
    }
}

/// HTTP client shared by the provider clients: rustls, a bounded timeout, and an optional
/// bearer token sent as a sensitive default header.
pub(crate) fn build_client(
    bearer: Option<&SecretString>,
    timeout: Duration,
) -> Result<reqwest::Client, Error> {
    let mut headers = reqwest::header::HeaderMap::new();

    if let Some(secret) = bearer {
        let mut auth_value =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", secret.expose_secret()))
                .map_err(|err| {
                    warn!("Failed to create auth header value: {err:?}");
                    Error {
                        source: Some(Box::new(err)),
                        ..Error::config("provider credential is not a valid header value")
                    }
                })?;
        auth_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);
    }

    Ok(reqwest::Client::builder()
        .use_rustls_tls()
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}

/// Passes successful responses through; anything else becomes an upstream error carrying the
/// provider's status and body verbatim.
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("{provider} responded with {status}: {body}");
    Err(Error::upstream(status.as_u16(), body))
}

pub(crate) fn trimmed_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}
