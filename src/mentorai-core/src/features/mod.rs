//! Learning features and their actions.
//!
//! Each feature has a form input (validated before anything is sent), a
//! structured output, and one prompt flow. [`Actions`] forwards validated
//! input to the right flow and hands back its output or its error.

pub mod anti_patterns;
pub mod failure_simulation;
pub mod knowledge_gaps;
pub mod multi_persona;
pub mod reader;
pub mod reverse_teach;

use std::sync::Arc;

use crate::config::{
    Config, FLOW_ANTI_PATTERNS, FLOW_FAILURE_SIMULATION, FLOW_KNOWLEDGE_GAPS, FLOW_REVERSE_TEACH,
    FLOW_SUMMARIZE, FLOW_TRANSLATE,
};
use crate::error::MentorError;
use crate::flow::Flow;
use crate::model::GenerativeModel;
use crate::orchestrator::{OrchestratorCallback, PersonaOrchestrator};
use crate::persona::{PersonaExplanationRequest, PersonaTurn};
use crate::template::TemplateContext;

pub use anti_patterns::{AntiPatternsInput, AntiPatternsOutput, Intervention};
pub use failure_simulation::{FailureSimulationInput, FailureSimulationOutput};
pub use knowledge_gaps::{KnowledgeGapsInput, KnowledgeGapsOutput};
pub use multi_persona::PersonaForm;
pub use reader::{SummarizeInput, SummaryOutput, TranslateInput, TranslationOutput};
pub use reverse_teach::{ReverseTeachInput, ReverseTeachOutput};

/// Input collected by a feature form.
pub trait FormInput: TemplateContext {
    /// Check the input against the form's rules. The first failing field is
    /// reported.
    fn validate(&self, config: &Config) -> Result<(), MentorError>;
}

/// Require at least `min` characters (after trimming).
pub(crate) fn min_chars(
    field: &str,
    value: &str,
    min: usize,
    message: &str,
) -> Result<(), MentorError> {
    if value.trim().chars().count() < min {
        return Err(MentorError::validation(field, message));
    }
    Ok(())
}

/// Output check: a text field must not be blank.
pub(crate) fn present(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is empty", field));
    }
    Ok(())
}

/// Output check: no blank entries in a list.
pub(crate) fn no_blank_items(field: &str, items: &[String]) -> Result<(), String> {
    if items.iter().any(|item| item.trim().is_empty()) {
        return Err(format!("{} contains a blank entry", field));
    }
    Ok(())
}

/// Split a comma-separated skill list as typed into a form.
pub fn split_skills(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Server-side actions, one per feature.
pub struct Actions {
    model: Arc<dyn GenerativeModel>,
    config: Config,
    orchestrator: PersonaOrchestrator,
    reverse_teach: Flow<ReverseTeachInput, ReverseTeachOutput>,
    failure_simulation: Flow<FailureSimulationInput, FailureSimulationOutput>,
    knowledge_gaps: Flow<KnowledgeGapsInput, KnowledgeGapsOutput>,
    anti_patterns: Flow<AntiPatternsInput, AntiPatternsOutput>,
    summarize: Flow<SummarizeInput, SummaryOutput>,
    translate: Flow<TranslateInput, TranslationOutput>,
}

impl Actions {
    pub fn new(model: Arc<dyn GenerativeModel>, config: Config) -> Result<Self, MentorError> {
        let max_tokens = config.model.max_tokens;
        Ok(Self {
            orchestrator: PersonaOrchestrator::new(model.clone(), &config)?,
            reverse_teach: Flow::new(config.prompt(FLOW_REVERSE_TEACH)?, max_tokens),
            failure_simulation: Flow::new(config.prompt(FLOW_FAILURE_SIMULATION)?, max_tokens),
            knowledge_gaps: Flow::new(config.prompt(FLOW_KNOWLEDGE_GAPS)?, max_tokens),
            anti_patterns: Flow::new(config.prompt(FLOW_ANTI_PATTERNS)?, max_tokens),
            summarize: Flow::new(config.prompt(FLOW_SUMMARIZE)?, max_tokens),
            translate: Flow::new(config.prompt(FLOW_TRANSLATE)?, max_tokens),
            model,
            config,
        })
    }

    /// Replace the persona orchestrator, e.g. to attach an event callback or
    /// force a mode.
    pub fn map_orchestrator(
        mut self,
        f: impl FnOnce(PersonaOrchestrator) -> PersonaOrchestrator,
    ) -> Self {
        self.orchestrator = f(self.orchestrator);
        self
    }

    /// Attach a callback to persona orchestration events.
    pub fn with_orchestrator_callback(self, callback: OrchestratorCallback) -> Self {
        self.map_orchestrator(|o| o.with_callback(callback))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn reverse_teach(
        &self,
        input: &ReverseTeachInput,
    ) -> Result<ReverseTeachOutput, MentorError> {
        self.reverse_teach.invoke(self.model.as_ref(), input).await
    }

    /// Never fails once the request is built; failed personas are
    /// placeholder turns.
    pub async fn explain_personas(&self, request: &PersonaExplanationRequest) -> Vec<PersonaTurn> {
        self.orchestrator.explain(request).await
    }

    pub async fn simulate_failure(
        &self,
        input: &FailureSimulationInput,
    ) -> Result<FailureSimulationOutput, MentorError> {
        self.failure_simulation.invoke(self.model.as_ref(), input).await
    }

    pub async fn predict_gaps(
        &self,
        input: &KnowledgeGapsInput,
    ) -> Result<KnowledgeGapsOutput, MentorError> {
        self.knowledge_gaps.invoke(self.model.as_ref(), input).await
    }

    pub async fn identify_anti_patterns(
        &self,
        input: &AntiPatternsInput,
    ) -> Result<AntiPatternsOutput, MentorError> {
        self.anti_patterns.invoke(self.model.as_ref(), input).await
    }

    pub async fn summarize(&self, input: &SummarizeInput) -> Result<SummaryOutput, MentorError> {
        self.summarize.invoke(self.model.as_ref(), input).await
    }

    pub async fn translate(
        &self,
        input: &TranslateInput,
    ) -> Result<TranslationOutput, MentorError> {
        self.translate.invoke(self.model.as_ref(), input).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns canned replies in order and records every prompt.
    pub struct QueuedModel {
        replies: Mutex<Vec<Result<String, String>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl QueuedModel {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            let mut replies: Vec<Result<String, String>> = replies
                .into_iter()
                .map(|r| r.map(str::to_string).map_err(str::to_string))
                .collect();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl GenerativeModel for QueuedModel {
        async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, MentorError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.replies.lock().unwrap().pop() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(reason)) => Err(MentorError::invalid_response("queued", reason)),
                None => Err(MentorError::invalid_response("queued", "no reply queued")),
            }
        }
    }

    pub fn actions(model: Arc<QueuedModel>) -> Actions {
        Actions::new(model, crate::config::default_config()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::persona::OrchestrationMode;

    #[test]
    fn test_split_skills() {
        assert_eq!(
            split_skills("React,  TypeScript , ,Node.js"),
            vec!["React", "TypeScript", "Node.js"]
        );
        assert!(split_skills(" , ").is_empty());
    }

    #[test]
    fn test_min_chars_counts_trimmed_chars() {
        assert!(min_chars("concept", "  ab  ", 3, "too short").is_err());
        assert!(min_chars("concept", "äöü", 3, "too short").is_ok());
    }

    #[tokio::test]
    async fn test_action_propagates_collaborator_failure() {
        let model = Arc::new(QueuedModel::new(vec![Err("provider down")]));
        let actions = actions(model);

        let input = SummarizeInput {
            text: "Some text.".to_string(),
        };
        let err = actions.summarize(&input).await.unwrap_err();
        assert!(matches!(err, MentorError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_explain_personas_uses_configured_mode() {
        let model = Arc::new(QueuedModel::new(vec![Ok(
            r#"[{"persona": "A", "text": "one"}, {"persona": "B", "text": "two"}]"#,
        )]));
        let actions = actions(model.clone())
            .map_orchestrator(|o| o.with_mode(OrchestrationMode::SingleCall));

        let request =
            PersonaExplanationRequest::new("Recursion", vec!["A".to_string(), "B".to_string()])
                .unwrap();
        let turns = actions.explain_personas(&request).await;

        assert_eq!(turns, vec![PersonaTurn::new("A", "one"), PersonaTurn::new("B", "two")]);
        assert!(model.last_prompt().contains("- A\n- B\n"));
    }
}
