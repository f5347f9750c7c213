//! Learning anti-pattern detection with a suggested intervention.

use serde::{Deserialize, Serialize};

use super::{FormInput, min_chars, no_blank_items, present};
use crate::config::Config;
use crate::error::MentorError;
use crate::flow::Validate;
use crate::template::{TemplateContext, TemplateValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiPatternsInput {
    pub learning_history: String,
    pub current_activity: String,
}

impl FormInput for AntiPatternsInput {
    fn validate(&self, _config: &Config) -> Result<(), MentorError> {
        min_chars(
            "learningHistory",
            &self.learning_history,
            20,
            "Please describe your learning history in more detail.",
        )?;
        min_chars(
            "currentActivity",
            &self.current_activity,
            10,
            "Please describe what you are doing right now.",
        )
    }
}

impl TemplateContext for AntiPatternsInput {
    fn field(&self, name: &str) -> Option<TemplateValue> {
        match name {
            "learningHistory" => Some((&self.learning_history).into()),
            "currentActivity" => Some((&self.current_activity).into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiPatternsOutput {
    pub anti_patterns: Vec<String>,
    pub intervention: Intervention,
}

impl Validate for AntiPatternsOutput {
    fn validate(&self) -> Result<(), String> {
        no_blank_items("antiPatterns", &self.anti_patterns)?;
        present("intervention.message", &self.intervention.message)
    }
}

crate::json_flow_output!(AntiPatternsOutput);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::features::testing::{QueuedModel, actions};
    use std::sync::Arc;

    fn input() -> AntiPatternsInput {
        AntiPatternsInput {
            learning_history: "Re-read chapter 3 of the calculus book five times this week."
                .to_string(),
            current_activity: "Watching another lecture on limits".to_string(),
        }
    }

    #[test]
    fn test_history_too_short() {
        let mut form = input();
        form.learning_history = "read a book".to_string();
        let err = form.validate(&default_config()).unwrap_err();
        assert!(
            matches!(err, MentorError::Validation { ref field, .. } if field == "learningHistory")
        );
    }

    #[tokio::test]
    async fn test_intervention_type_key() {
        let model = Arc::new(QueuedModel::new(vec![Ok(
            r#"{"antiPatterns": ["Passive re-reading"], "intervention": {"type": "practice", "message": "Solve five limit problems."}}"#,
        )]));
        let output = actions(model).identify_anti_patterns(&input()).await.unwrap();

        assert_eq!(output.anti_patterns, vec!["Passive re-reading"]);
        assert_eq!(output.intervention.kind, "practice");
    }
}
