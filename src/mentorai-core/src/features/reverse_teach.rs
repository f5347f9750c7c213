//! Reverse teaching: the student explains a concept and the model plays the
//! learner.

use serde::{Deserialize, Serialize};

use super::{FormInput, min_chars, present};
use crate::config::Config;
use crate::error::MentorError;
use crate::flow::Validate;
use crate::template::{TemplateContext, TemplateValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseTeachInput {
    pub concept: String,
    pub student_explanation: String,
}

impl FormInput for ReverseTeachInput {
    fn validate(&self, _config: &Config) -> Result<(), MentorError> {
        min_chars("concept", &self.concept, 3, "Concept must be at least 3 characters.")?;
        min_chars(
            "studentExplanation",
            &self.student_explanation,
            20,
            "Your explanation needs to be more detailed.",
        )
    }
}

impl TemplateContext for ReverseTeachInput {
    fn field(&self, name: &str) -> Option<TemplateValue> {
        match name {
            "concept" => Some((&self.concept).into()),
            "studentExplanation" => Some((&self.student_explanation).into()),
            _ => None,
        }
    }
}

/// What the model understood, what it would ask, and what was missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseTeachOutput {
    pub ai_understanding: String,
    pub questions_for_student: String,
    pub identified_gaps: String,
}

impl Validate for ReverseTeachOutput {
    fn validate(&self) -> Result<(), String> {
        present("aiUnderstanding", &self.ai_understanding)?;
        present("questionsForStudent", &self.questions_for_student)?;
        present("identifiedGaps", &self.identified_gaps)
    }
}

crate::json_flow_output!(ReverseTeachOutput);
