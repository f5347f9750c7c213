//! Failure simulation: a realistic scenario where the student's skills are
//! not enough, with an analysis and recommendations.

use serde::{Deserialize, Serialize};

use super::{FormInput, min_chars, present};
use crate::config::Config;
use crate::error::MentorError;
use crate::flow::Validate;
use crate::template::{TemplateContext, TemplateValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSimulationInput {
    pub topic: String,
    pub user_skills: Vec<String>,
    pub failure_context: String,
}

impl FormInput for FailureSimulationInput {
    fn validate(&self, _config: &Config) -> Result<(), MentorError> {
        min_chars("topic", &self.topic, 3, "Topic must be at least 3 characters.")?;
        if self.user_skills.iter().all(|s| s.trim().is_empty()) {
            return Err(MentorError::validation(
                "userSkills",
                "Please list at least one skill.",
            ));
        }
        min_chars(
            "failureContext",
            &self.failure_context,
            10,
            "Please describe the context in a bit more detail.",
        )
    }
}

impl TemplateContext for FailureSimulationInput {
    fn field(&self, name: &str) -> Option<TemplateValue> {
        match name {
            "topic" => Some((&self.topic).into()),
            "userSkills" => Some((&self.user_skills).into()),
            "failureContext" => Some((&self.failure_context).into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSimulationOutput {
    pub scenario_description: String,
    pub failure_analysis: String,
    pub learning_recommendations: String,
}

impl Validate for FailureSimulationOutput {
    fn validate(&self) -> Result<(), String> {
        present("scenarioDescription", &self.scenario_description)?;
        present("failureAnalysis", &self.failure_analysis)?;
        present("learningRecommendations", &self.learning_recommendations)
    }
}

crate::json_flow_output!(FailureSimulationOutput);
