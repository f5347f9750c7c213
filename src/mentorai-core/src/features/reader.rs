//! Reading aids: key-note summaries and translation.

use serde::{Deserialize, Serialize};

use super::{FormInput, min_chars, no_blank_items, present};
use crate::config::Config;
use crate::error::MentorError;
use crate::flow::Validate;
use crate::template::{TemplateContext, TemplateValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeInput {
    pub text: String,
}

impl FormInput for SummarizeInput {
    fn validate(&self, _config: &Config) -> Result<(), MentorError> {
        min_chars("text", &self.text, 1, "Please enter some text to summarize.")
    }
}

impl TemplateContext for SummarizeInput {
    fn field(&self, name: &str) -> Option<TemplateValue> {
        match name {
            "text" => Some((&self.text).into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutput {
    pub key_notes: Vec<String>,
}

impl Validate for SummaryOutput {
    fn validate(&self) -> Result<(), String> {
        if self.key_notes.is_empty() {
            return Err("keyNotes is empty".to_string());
        }
        no_blank_items("keyNotes", &self.key_notes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateInput {
    pub text: String,
    pub target_language: String,
}

impl FormInput for TranslateInput {
    fn validate(&self, config: &Config) -> Result<(), MentorError> {
        min_chars("text", &self.text, 1, "Please enter some text to translate.")?;
        let known = config
            .languages
            .available
            .iter()
            .any(|l| l.eq_ignore_ascii_case(self.target_language.trim()));
        if !known {
            return Err(MentorError::validation(
                "targetLanguage",
                format!(
                    "Please choose one of: {}.",
                    config.languages.available.join(", ")
                ),
            ));
        }
        Ok(())
    }
}

impl TemplateContext for TranslateInput {
    fn field(&self, name: &str) -> Option<TemplateValue> {
        match name {
            "text" => Some((&self.text).into()),
            "targetLanguage" => Some((&self.target_language).into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationOutput {
    pub translated_text: String,
}

impl Validate for TranslationOutput {
    fn validate(&self) -> Result<(), String> {
        present("translatedText", &self.translated_text)
    }
}

crate::json_flow_output!(SummaryOutput, TranslationOutput);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::features::testing::{QueuedModel, actions};
    use std::sync::Arc;

    #[test]
    fn test_empty_text_rejected() {
        let form = SummarizeInput {
            text: "   ".to_string(),
        };
        assert!(form.validate(&default_config()).unwrap_err().is_validation());
    }

    #[test]
    fn test_language_must_be_offered() {
        let config = default_config();
        let form = |lang: &str| TranslateInput {
            text: "Hello".to_string(),
            target_language: lang.to_string(),
        };

        form("French").validate(&config).unwrap();
        form("french").validate(&config).unwrap();
        let err = form("Klingon").validate(&config).unwrap_err();
        assert!(
            matches!(err, MentorError::Validation { ref field, .. } if field == "targetLanguage")
        );
    }

    #[tokio::test]
    async fn test_summary_requires_notes() {
        let model = Arc::new(QueuedModel::new(vec![
            Ok(r#"{"keyNotes": []}"#),
            Ok(r#"{"keyNotes": ["Cells divide.", "DNA is copied first."]}"#),
        ]));
        let actions = actions(model);
        let form = SummarizeInput {
            text: "Cells divide after DNA is copied.".to_string(),
        };

        assert!(actions.summarize(&form).await.is_err());
        let notes = actions.summarize(&form).await.unwrap();
        assert_eq!(notes.key_notes.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_with_bracketed_chatter() {
        let model = Arc::new(QueuedModel::new(vec![Ok(
            "Sure [see below]:\n{\"keyNotes\": [\"Cells divide.\"]}\nSources: [1]",
        )]));
        let form = SummarizeInput {
            text: "Cells divide after DNA is copied.".to_string(),
        };

        let notes = actions(model).summarize(&form).await.unwrap();
        assert_eq!(notes.key_notes, vec!["Cells divide."]);
    }

    #[tokio::test]
    async fn test_translate_prompt() {
        let model = Arc::new(QueuedModel::new(vec![Ok(r#"{"translatedText": "Bonjour"}"#)]));
        let output = actions(model.clone())
            .translate(&TranslateInput {
                text: "Hello".to_string(),
                target_language: "French".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(output.translated_text, "Bonjour");
        assert!(model.last_prompt().starts_with("Translate the following text into French."));
    }
}
