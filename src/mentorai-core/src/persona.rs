//! Persona explanation requests and turns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MentorError;
use crate::template::{TemplateContext, TemplateValue};

/// Fewest personas an explanation can have.
pub const MIN_PERSONAS: usize = 2;
/// Most personas an explanation can have.
pub const MAX_PERSONAS: usize = 3;

/// A concept to be explained by an ordered list of personas.
///
/// Order matters: it is the turn order in single-call mode and the display
/// order in both modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonaExplanationRequest {
    concept: String,
    personas: Vec<String>,
}

impl PersonaExplanationRequest {
    /// Build a request allowing the full 2..=3 persona range.
    pub fn new(concept: impl Into<String>, personas: Vec<String>) -> Result<Self, MentorError> {
        Self::with_bounds(concept, personas, MIN_PERSONAS, MAX_PERSONAS)
    }

    /// Build a request with narrower persona bounds (clamped to 2..=3).
    pub fn with_bounds(
        concept: impl Into<String>,
        personas: Vec<String>,
        min: usize,
        max: usize,
    ) -> Result<Self, MentorError> {
        let min = min.max(MIN_PERSONAS);
        let max = max.min(MAX_PERSONAS);

        let concept = concept.into().trim().to_string();
        if concept.is_empty() {
            return Err(MentorError::validation("concept", "must not be empty"));
        }

        if personas.len() < min || personas.len() > max {
            return Err(MentorError::InvalidPersonaCount {
                min,
                max,
                actual: personas.len(),
            });
        }

        let personas: Vec<String> = personas.into_iter().map(|p| p.trim().to_string()).collect();
        if let Some(i) = personas.iter().position(|p| p.is_empty()) {
            return Err(MentorError::validation(
                format!("persona {}", i + 1),
                "must not be empty",
            ));
        }

        Ok(Self { concept, personas })
    }

    pub fn concept(&self) -> &str {
        &self.concept
    }

    pub fn personas(&self) -> &[String] {
        &self.personas
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

impl TemplateContext for PersonaExplanationRequest {
    fn field(&self, name: &str) -> Option<TemplateValue> {
        match name {
            "concept" => Some((&self.concept).into()),
            "personas" => Some((&self.personas).into()),
            _ => None,
        }
    }
}

/// Prompt context for a single persona in fan-out mode.
#[derive(Debug, Clone, Copy)]
pub struct PersonaPrompt<'a> {
    pub concept: &'a str,
    pub persona: &'a str,
}

impl TemplateContext for PersonaPrompt<'_> {
    fn field(&self, name: &str) -> Option<TemplateValue> {
        match name {
            "concept" => Some(self.concept.into()),
            "persona" => Some(self.persona.into()),
            _ => None,
        }
    }
}

/// One persona's contribution to an explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaTurn {
    /// The persona speaking.
    pub persona: String,
    /// The generated explanation.
    pub text: String,
}

impl PersonaTurn {
    pub fn new(persona: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            text: text.into(),
        }
    }

    /// A fixed stand-in for a turn that could not be generated.
    pub fn placeholder(persona: impl Into<String>, placeholder: &str) -> Self {
        Self::new(persona, placeholder)
    }
}

/// How the orchestrator talks to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestrationMode {
    /// One call returns every persona's turn; later turns build on earlier ones.
    SingleCall,
    /// One independent call per persona, run concurrently.
    #[default]
    FanOut,
}

impl OrchestrationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestrationMode::SingleCall => "single-call",
            OrchestrationMode::FanOut => "fan-out",
        }
    }
}

impl fmt::Display for OrchestrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrchestrationMode {
    type Err = MentorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "single-call" | "single" | "debate" => Ok(OrchestrationMode::SingleCall),
            "fan-out" | "fanout" | "parallel" => Ok(OrchestrationMode::FanOut),
            _ => Err(MentorError::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn personas(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_request_accepts_two_and_three() {
        assert!(PersonaExplanationRequest::new("Recursion", personas(&["A", "B"])).is_ok());
        assert!(PersonaExplanationRequest::new("Recursion", personas(&["A", "B", "C"])).is_ok());
    }

    #[test]
    fn test_request_rejects_bad_counts() {
        let err = PersonaExplanationRequest::new("Recursion", personas(&["A"])).unwrap_err();
        assert!(matches!(
            err,
            MentorError::InvalidPersonaCount {
                min: 2,
                max: 3,
                actual: 1
            }
        ));
        assert!(
            PersonaExplanationRequest::new("Recursion", personas(&["A", "B", "C", "D"])).is_err()
        );
    }

    #[test]
    fn test_request_rejects_blank_fields() {
        assert!(PersonaExplanationRequest::new("  ", personas(&["A", "B"])).is_err());
        let err = PersonaExplanationRequest::new("Recursion", personas(&["A", " "])).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("persona 2"));
    }

    #[test]
    fn test_request_preserves_order_and_trims() {
        let request = PersonaExplanationRequest::new(
            " Recursion ",
            personas(&[" A child", "A compiler engineer "]),
        )
        .unwrap();
        assert_eq!(request.concept(), "Recursion");
        assert_eq!(request.personas(), &["A child", "A compiler engineer"]);
    }

    #[test]
    fn test_with_bounds_narrows() {
        let err =
            PersonaExplanationRequest::with_bounds("X", personas(&["A", "B"]), 3, 3).unwrap_err();
        assert!(matches!(err, MentorError::InvalidPersonaCount { min: 3, .. }));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("fan-out".parse::<OrchestrationMode>().unwrap(), OrchestrationMode::FanOut);
        assert_eq!(
            "Single_Call".parse::<OrchestrationMode>().unwrap(),
            OrchestrationMode::SingleCall
        );
        assert!("sometimes".parse::<OrchestrationMode>().is_err());
        assert_eq!(OrchestrationMode::SingleCall.to_string(), "single-call");
    }
}
