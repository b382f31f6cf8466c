use super::{build_client, ensure_success, trimmed_base_url, SummaryProvider};
use crate::error::{Error, ValidationErrorKind};
use crate::summary_contract::{SummaryPayload, SCHEMA_NAME};
use async_trait::async_trait;
use log::*;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{json, Value};
use service::config::Config;
use std::time::Duration;

const PROVIDER: &str = "OpenAI";

/// Client for the OpenAI Responses API using strict JSON-schema structured output.
pub struct OpenAiResponsesClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ResponsesBody {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesBody {
    fn output_text(&self) -> Option<&str> {
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .find(|text| !text.trim().is_empty())
    }
}

impl OpenAiResponsesClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: &SecretString,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        Ok(Self {
            client: build_client(Some(api_key), timeout)?,
            base_url: trimmed_base_url(base_url),
            model: model.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let api_key = config
            .ai_api_key()
            .ok_or_else(|| Error::config("AI_API_KEY is not set"))?;
        let model = config
            .ai_model()
            .ok_or_else(|| Error::config("AI_MODEL is not set"))?;

        Self::new(
            config.ai_base_url(),
            &SecretString::new(api_key),
            model,
            config.provider_timeout(),
        )
    }
}

#[async_trait]
impl SummaryProvider for OpenAiResponsesClient {
    async fn summarize(&self, prompt: &str, schema: &Value) -> Result<SummaryPayload, Error> {
        let url = format!("{}/responses", self.base_url);
        let body = json!({
            "model": self.model,
            "input": prompt,
            "text": {
                "format": {
                    "type": "json_schema",
                    "name": SCHEMA_NAME,
                    "strict": true,
                    "schema": schema,
                }
            }
        });

        info!("Requesting meeting summary from model {}", self.model);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status().as_u16();
        let raw = ensure_success(PROVIDER, response).await?.text().await?;

        let parsed: ResponsesBody = serde_json::from_str(&raw).map_err(|err| {
            error!("{PROVIDER} returned an unreadable response body: {err}");
            Error {
                source: Some(Box::new(err)),
                ..Error::validation(ValidationErrorKind::MalformedAiResponse(
                    "AI response body is not a Responses API object".to_string(),
                ))
            }
        })?;

        if let Some(err) = parsed.error.as_ref().filter(|err| !err.is_null()) {
            warn!("{PROVIDER} reported an error: {err}");
            return Err(Error::upstream(status, err.to_string()));
        }

        let text = parsed.output_text().ok_or_else(|| {
            error!("{PROVIDER} response contained no output text");
            Error::validation(ValidationErrorKind::MalformedAiResponse(
                "AI response contained no output text".to_string(),
            ))
        })?;

        Ok(match serde_json::from_str::<Value>(text) {
            Ok(value) => SummaryPayload::Structured(value),
            Err(_) => SummaryPayload::FreeText(text.to_string()),
        })
    }
}
