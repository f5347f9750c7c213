//! Knowledge gap prediction for a career goal.

use serde::{Deserialize, Serialize};

use super::{FormInput, min_chars, no_blank_items};
use crate::config::Config;
use crate::error::MentorError;
use crate::flow::Validate;
use crate::template::{TemplateContext, TemplateValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGapsInput {
    pub career_goal: String,
    pub current_skills: Vec<String>,
    #[serde(default)]
    pub learning_preferences: Option<String>,
}

impl FormInput for KnowledgeGapsInput {
    fn validate(&self, _config: &Config) -> Result<(), MentorError> {
        min_chars(
            "careerGoal",
            &self.career_goal,
            3,
            "Career goal must be at least 3 characters.",
        )?;
        if self.current_skills.iter().all(|s| s.trim().is_empty()) {
            return Err(MentorError::validation(
                "currentSkills",
                "Please list at least one skill.",
            ));
        }
        Ok(())
    }
}

impl TemplateContext for KnowledgeGapsInput {
    fn field(&self, name: &str) -> Option<TemplateValue> {
        match name {
            "careerGoal" => Some((&self.career_goal).into()),
            "currentSkills" => Some((&self.current_skills).into()),
            "learningPreferences" => Some((&self.learning_preferences).into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGapsOutput {
    pub predicted_gaps: Vec<String>,
    pub suggested_resources: Vec<String>,
}

impl Validate for KnowledgeGapsOutput {
    fn validate(&self) -> Result<(), String> {
        no_blank_items("predictedGaps", &self.predicted_gaps)?;
        no_blank_items("suggestedResources", &self.suggested_resources)
    }
}

crate::json_flow_output!(KnowledgeGapsOutput);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::features::testing::{QueuedModel, actions};
    use std::sync::Arc;

    fn input(preferences: Option<&str>) -> KnowledgeGapsInput {
        KnowledgeGapsInput {
            career_goal: "Data scientist".to_string(),
            current_skills: vec!["Python".to_string(), "SQL".to_string()],
            learning_preferences: preferences.map(str::to_string),
        }
    }

    #[test]
    fn test_preferences_are_optional() {
        input(None).validate(&default_config()).unwrap();

        let mut form = input(None);
        form.current_skills.clear();
        let err = form.validate(&default_config()).unwrap_err();
        assert!(
            matches!(err, MentorError::Validation { ref field, .. } if field == "currentSkills")
        );
    }

    #[tokio::test]
    async fn test_preferences_only_rendered_when_given() {
        let reply = r#"{"predictedGaps": ["Statistics"], "suggestedResources": ["Think Stats"]}"#;
        let model = Arc::new(QueuedModel::new(vec![Ok(reply), Ok(reply)]));
        let actions = actions(model.clone());

        let output = actions.predict_gaps(&input(None)).await.unwrap();
        assert_eq!(output.predicted_gaps, vec!["Statistics"]);
        let prompt = model.last_prompt();
        assert!(prompt.contains("current skills of Python, SQL"));
        assert!(!prompt.contains("prefers to learn"));

        actions.predict_gaps(&input(Some("video courses"))).await.unwrap();
        assert!(model.last_prompt().contains("prefers to learn by video courses"));
    }
}
