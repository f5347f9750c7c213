//! The multi-persona explanation form.

use serde::{Deserialize, Serialize};

use super::{FormInput, min_chars};
use crate::config::Config;
use crate::error::MentorError;
use crate::persona::PersonaExplanationRequest;
use crate::template::{TemplateContext, TemplateValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaForm {
    pub concept: String,
    pub personas: Vec<String>,
}

impl PersonaForm {
    /// Form prefilled with the configured default personas.
    pub fn with_defaults(concept: impl Into<String>, config: &Config) -> Self {
        Self {
            concept: concept.into(),
            personas: config
                .persona
                .default_personas
                .iter()
                .take(config.persona.max_personas)
                .cloned()
                .collect(),
        }
    }

    /// Validate and build the request handed to the orchestrator.
    pub fn to_request(&self, config: &Config) -> Result<PersonaExplanationRequest, MentorError> {
        self.validate(config)?;
        PersonaExplanationRequest::with_bounds(
            self.concept.clone(),
            self.personas.clone(),
            config.persona.min_personas,
            config.persona.max_personas,
        )
    }
}

impl FormInput for PersonaForm {
    fn validate(&self, _config: &Config) -> Result<(), MentorError> {
        min_chars("concept", &self.concept, 3, "Concept must be at least 3 characters.")?;
        for (i, persona) in self.personas.iter().enumerate() {
            min_chars(
                &format!("persona {}", i + 1),
                persona,
                3,
                "Persona must be at least 3 characters.",
            )?;
        }
        Ok(())
    }
}

impl TemplateContext for PersonaForm {
    fn field(&self, name: &str) -> Option<TemplateValue> {
        match name {
            "concept" => Some((&self.concept).into()),
            "personas" => Some((&self.personas).into()),
            _ => None,
        }
    }
}
