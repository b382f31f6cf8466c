use super::{build_client, ensure_success, SummaryProvider};
use crate::error::Error;
use crate::summary_contract::{SummaryPayload, SCHEMA_NAME};
use async_trait::async_trait;
use log::*;
use secrecy::SecretString;
use serde_json::{json, Value};
use service::config::Config;
use std::time::Duration;

const PROVIDER: &str = "Summarization service";

/// Client for a plain JSON-over-HTTP summarization service. The service may answer with the
/// summary object itself or with text that has to go through the free-text fallback.
pub struct RestSummaryClient {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl RestSummaryClient {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<&SecretString>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        Ok(Self {
            client: build_client(api_key, timeout)?,
            url: url.into(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let model = config
            .ai_model()
            .ok_or_else(|| Error::config("AI_MODEL is not set"))?;
        let api_key = config.ai_api_key().map(SecretString::new);

        Self::new(
            config.ai_base_url(),
            api_key.as_ref(),
            model,
            config.provider_timeout(),
        )
    }
}

/// A JSON object is the structured summary; a JSON string or a non-JSON body is free text.
fn classify(raw: String) -> SummaryPayload {
    match serde_json::from_str::<Value>(&raw) {
        Ok(value @ Value::Object(_)) => SummaryPayload::Structured(value),
        Ok(Value::String(text)) => SummaryPayload::FreeText(text),
        _ => SummaryPayload::FreeText(raw),
    }
}

#[async_trait]
impl SummaryProvider for RestSummaryClient {
    async fn summarize(&self, prompt: &str, schema: &Value) -> Result<SummaryPayload, Error> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": SCHEMA_NAME,
                    "strict": true,
                    "schema": schema,
                }
            }
        });

        info!("Requesting meeting summary from {}", self.url);
        let response = self.client.post(&self.url).json(&body).send().await?;
        let raw = ensure_success(PROVIDER, response).await?.text().await?;

        Ok(classify(raw))
    }
}
