//! The closed output contract for meeting summaries: the JSON schema sent to the provider and
//! the typed form every provider payload must deserialize into before it is stored.

use crate::error::{DomainErrorKind, Error, InternalErrorKind, ValidationErrorKind};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Name under which the schema is registered with the provider.
pub const SCHEMA_NAME: &str = "meeting_summary";

const LOGGED_PAYLOAD_CHARS: usize = 200;

/// What a summarization provider handed back.
#[derive(Clone, Debug, PartialEq)]
pub enum SummaryPayload {
    /// A JSON value produced under the strict schema
    Structured(Value),
    /// Text that should contain JSON, possibly wrapped in a Markdown code fence
    FreeText(String),
}

/// The fixed set of responsibility tags action items are grouped under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoleTag {
    PM,
    PD,
    FE,
    BE,
    AI,
    ALL,
}

impl RoleTag {
    pub const ALL_TAGS: [RoleTag; 6] = [
        RoleTag::PM,
        RoleTag::PD,
        RoleTag::FE,
        RoleTag::BE,
        RoleTag::AI,
        RoleTag::ALL,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTag::PM => "PM",
            RoleTag::PD => "PD",
            RoleTag::FE => "FE",
            RoleTag::BE => "BE",
            RoleTag::AI => "AI",
            RoleTag::ALL => "ALL",
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Milestone {
    pub task: String,
    pub deadline: String,
}

/// Action items keyed by role tag. Every tag is always present, possibly with an empty list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<RoleTag, Vec<String>>")]
pub struct ActionItemsByRole(BTreeMap<RoleTag, Vec<String>>);

impl ActionItemsByRole {
    pub fn get(&self, tag: RoleTag) -> &[String] {
        self.0.get(&tag).map(Vec::as_slice).unwrap_or_default()
    }
}

impl Default for ActionItemsByRole {
    fn default() -> Self {
        Self(
            RoleTag::ALL_TAGS
                .into_iter()
                .map(|tag| (tag, Vec::new()))
                .collect(),
        )
    }
}

impl TryFrom<BTreeMap<RoleTag, Vec<String>>> for ActionItemsByRole {
    type Error = String;

    fn try_from(items: BTreeMap<RoleTag, Vec<String>>) -> Result<Self, Self::Error> {
        let missing: Vec<&str> = RoleTag::ALL_TAGS
            .iter()
            .filter(|tag| !items.contains_key(tag))
            .map(RoleTag::as_str)
            .collect();

        if missing.is_empty() {
            Ok(Self(items))
        } else {
            Err(format!("missing role tags: {}", missing.join(", ")))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeetingSummary {
    pub summary: String,
    pub milestones: Vec<Milestone>,
    #[serde(rename = "actionItemsByRole")]
    pub action_items_by_role: ActionItemsByRole,
}

impl MeetingSummary {
    /// The normalized JSON form that is persisted.
    pub fn to_json(&self) -> Result<Value, Error> {
        serde_json::to_value(self).map_err(|err| Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to serialize meeting summary".to_string(),
            )),
        })
    }
}

/// JSON schema for [`MeetingSummary`]. Every object level is closed and lists all of its
/// properties as required.
pub fn response_schema() -> Value {
    let string_list = json!({"type": "array", "items": {"type": "string"}});

    let mut roles = Map::new();
    for tag in RoleTag::ALL_TAGS {
        roles.insert(tag.as_str().to_string(), string_list.clone());
    }
    let role_names: Vec<&str> = RoleTag::ALL_TAGS.iter().map(RoleTag::as_str).collect();

    json!({
        "type": "object",
        "properties": {
            "summary": {"type": "string"},
            "milestones": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "task": {"type": "string"},
                        "deadline": {"type": "string"}
                    },
                    "required": ["task", "deadline"],
                    "additionalProperties": false
                }
            },
            "actionItemsByRole": {
                "type": "object",
                "properties": roles,
                "required": role_names,
                "additionalProperties": false
            }
        },
        "required": ["summary", "milestones", "actionItemsByRole"],
        "additionalProperties": false
    })
}

/// Removes a leading ```` ```json ```` or ```` ``` ```` marker and a trailing ```` ``` ````.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Turns a provider payload into a [`MeetingSummary`], enforcing the contract on both the
/// structured and the free-text path.
pub fn normalize(payload: SummaryPayload) -> Result<MeetingSummary, Error> {
    let value = match payload {
        SummaryPayload::Structured(value) => value,
        SummaryPayload::FreeText(text) => {
            let body = strip_code_fence(&text);
            serde_json::from_str(body).map_err(|err| {
                error!(
                    "AI response is not JSON ({err}): {}",
                    truncate(body, LOGGED_PAYLOAD_CHARS)
                );
                Error {
                    source: Some(Box::new(err)),
                    ..Error::validation(ValidationErrorKind::MalformedAiResponse(
                        "AI response not JSON".to_string(),
                    ))
                }
            })?
        }
    };

    serde_json::from_value(value).map_err(|err| {
        warn!("AI response does not match the summary contract: {err}");
        Error::validation(ValidationErrorKind::MalformedAiResponse(format!(
            "AI response does not match the summary contract: {err}"
        )))
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_roles_empty() -> Value {
        json!({"PM": [], "PD": [], "FE": [], "BE": [], "AI": [], "ALL": []})
    }

    fn kind(err: Error) -> ValidationErrorKind {
        match err.error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Validation(kind)) => kind,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn schema_is_closed_and_fully_required_at_every_level() {
        let schema = response_schema();

        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(
            schema["required"],
            json!(["summary", "milestones", "actionItemsByRole"])
        );

        let milestone = &schema["properties"]["milestones"]["items"];
        assert_eq!(milestone["additionalProperties"], json!(false));
        assert_eq!(milestone["required"], json!(["task", "deadline"]));

        let roles = &schema["properties"]["actionItemsByRole"];
        assert_eq!(roles["additionalProperties"], json!(false));
        assert_eq!(roles["required"], json!(["PM", "PD", "FE", "BE", "AI", "ALL"]));
        assert_eq!(roles["properties"].as_object().map(Map::len), Some(6));
    }

    #[test]
    fn fenced_free_text_is_unwrapped_and_parsed() {
        let text = format!(
            "```json\n{}\n```",
            json!({"summary": "x", "milestones": [], "actionItemsByRole": all_roles_empty()})
        );

        let summary = normalize(SummaryPayload::FreeText(text)).unwrap();

        assert_eq!(summary.summary, "x");
        assert!(summary.milestones.is_empty());
        assert_eq!(summary.action_items_by_role, ActionItemsByRole::default());
    }

    #[test]
    fn strip_code_fence_handles_bare_fences_and_unfenced_text() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json{}"), "{}");
    }

    #[test]
    fn non_json_free_text_is_rejected() {
        let err = normalize(SummaryPayload::FreeText("Here is your summary!".to_string()))
            .unwrap_err();

        assert_eq!(
            kind(err),
            ValidationErrorKind::MalformedAiResponse("AI response not JSON".to_string())
        );
    }

    #[test]
    fn unknown_role_tags_are_rejected() {
        let mut roles = all_roles_empty();
        roles["QA"] = json!(["write tests"]);

        let err = normalize(SummaryPayload::Structured(json!({
            "summary": "x", "milestones": [], "actionItemsByRole": roles
        })))
        .unwrap_err();

        assert!(matches!(kind(err), ValidationErrorKind::MalformedAiResponse(_)));
    }

    #[test]
    fn missing_role_tags_are_rejected() {
        let err = normalize(SummaryPayload::Structured(json!({
            "summary": "x", "milestones": [], "actionItemsByRole": {"PM": ["plan"]}
        })))
        .unwrap_err();

        assert!(matches!(kind(err), ValidationErrorKind::MalformedAiResponse(_)));
    }

    #[test]
    fn extra_top_level_fields_are_rejected() {
        let err = normalize(SummaryPayload::Structured(json!({
            "summary": "x",
            "milestones": [],
            "actionItemsByRole": all_roles_empty(),
            "confidence": 0.9
        })))
        .unwrap_err();

        assert!(matches!(kind(err), ValidationErrorKind::MalformedAiResponse(_)));
    }

    #[test]
    fn extra_milestone_fields_are_rejected() {
        let err = normalize(SummaryPayload::Structured(json!({
            "summary": "x",
            "milestones": [{"task": "ship", "deadline": "Friday", "owner": "BE"}],
            "actionItemsByRole": all_roles_empty()
        })))
        .unwrap_err();

        assert!(matches!(kind(err), ValidationErrorKind::MalformedAiResponse(_)));
    }

    #[test]
    fn normalized_json_keeps_every_role_and_milestone() {
        let summary = normalize(SummaryPayload::Structured(json!({
            "summary": "Release planning",
            "milestones": [{"task": "Beta", "deadline": "2025-06-01"}],
            "actionItemsByRole": {
                "ALL": ["retro"], "BE": ["migrate"], "PM": ["announce"],
                "AI": [], "FE": ["polish"], "PD": []
            }
        })))
        .unwrap();

        let stored = summary.to_json().unwrap();

        assert_eq!(
            stored,
            json!({
                "summary": "Release planning",
                "milestones": [{"task": "Beta", "deadline": "2025-06-01"}],
                "actionItemsByRole": {
                    "PM": ["announce"], "PD": [], "FE": ["polish"],
                    "BE": ["migrate"], "AI": [], "ALL": ["retro"]
                }
            })
        );
        assert_eq!(summary.action_items_by_role.get(RoleTag::BE), ["migrate"]);
    }
}
