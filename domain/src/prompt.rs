use crate::error::Error;
use service::config::Config;

/// Placeholder in the configured template that receives the meeting's plain text.
pub const MEETING_CONTENT_PLACEHOLDER: &str = "{meeting_content}";

/// The configured summarization prompt. The template is opaque apart from the placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, Error> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(Error::config("SUMMARY_PROMPT_TEMPLATE is empty"));
        }
        if !template.contains(MEETING_CONTENT_PLACEHOLDER) {
            return Err(Error::config(format!(
                "SUMMARY_PROMPT_TEMPLATE must contain the {MEETING_CONTENT_PLACEHOLDER} placeholder"
            )));
        }
        Ok(Self(template))
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let template = config
            .summary_prompt_template()
            .ok_or_else(|| Error::config("SUMMARY_PROMPT_TEMPLATE is not set"))?;
        Self::new(template)
    }

    pub fn render(&self, meeting_content: &str) -> String {
        self.0.replace(MEETING_CONTENT_PLACEHOLDER, meeting_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn render_substitutes_the_meeting_content() {
        let template = PromptTemplate::new("Summarize:\n{meeting_content}\nEnd.").unwrap();

        assert_eq!(
            template.render("## Plan\n\nShip it"),
            "Summarize:\n## Plan\n\nShip it\nEnd."
        );
    }

    #[test]
    fn template_without_placeholder_is_a_config_error() {
        let err = PromptTemplate::new("Summarize the meeting").unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn blank_template_is_a_config_error() {
        assert!(PromptTemplate::new("   ").is_err());
    }
}
