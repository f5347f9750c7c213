//! Multi-persona explanation orchestration.
//!
//! Turns a [`PersonaExplanationRequest`] into exactly one [`PersonaTurn`] per
//! requested persona, in request order, whichever strategy is configured and
//! whatever the model does. Failures degrade to placeholder turns.

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{Config, FLOW_DEBATE, FLOW_EXPLAIN};
use crate::error::MentorError;
use crate::flow::{Flow, Validate};
use crate::model::GenerativeModel;
use crate::persona::{OrchestrationMode, PersonaExplanationRequest, PersonaPrompt, PersonaTurn};
use crate::template::{TemplateContext, TemplateValue};

/// Callback for orchestration events.
pub type OrchestratorCallback = Box<dyn Fn(OrchestratorEvent) + Send + Sync>;

/// Events emitted while a batch is being generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    /// A batch is starting.
    BatchStart {
        mode: OrchestrationMode,
        count: usize,
    },
    /// Generation for a persona has been requested.
    PersonaStart { index: usize, persona: String },
    /// A persona's turn was generated.
    PersonaComplete { index: usize, persona: String },
    /// A persona's turn failed and will be a placeholder.
    PersonaFailed {
        index: usize,
        persona: String,
        error: String,
    },
    /// Every slot has settled.
    BatchComplete { count: usize, failed: usize },
}

/// One entry of a single-call script. The persona label the model wrote is
/// ignored and a missing or blank text is kept, so alignment can decide
/// position by position.
#[derive(Debug, Clone, Deserialize)]
struct ScriptTurn {
    #[serde(default)]
    text: String,
}

impl Validate for ScriptTurn {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Owned prompt context for one fan-out call.
#[derive(Debug, Clone)]
pub struct ExplainInput {
    pub concept: String,
    pub persona: String,
}

impl TemplateContext for ExplainInput {
    fn field(&self, name: &str) -> Option<TemplateValue> {
        PersonaPrompt {
            concept: &self.concept,
            persona: &self.persona,
        }
        .field(name)
    }
}

/// Orchestrates persona explanations against a generative model.
pub struct PersonaOrchestrator {
    model: Arc<dyn GenerativeModel>,
    mode: OrchestrationMode,
    debate_flow: Flow<PersonaExplanationRequest, Vec<ScriptTurn>>,
    explain_flow: Flow<ExplainInput, String>,
    placeholder: String,
    callback: Option<OrchestratorCallback>,
}

impl PersonaOrchestrator {
    /// Create an orchestrator using the mode, prompts and placeholder from `config`.
    pub fn new(model: Arc<dyn GenerativeModel>, config: &Config) -> Result<Self, MentorError> {
        let max_tokens = config.model.max_tokens;
        Ok(Self {
            model,
            mode: config.persona_mode()?,
            debate_flow: Flow::new(config.prompt(FLOW_DEBATE)?, max_tokens),
            explain_flow: Flow::new(config.prompt(FLOW_EXPLAIN)?, max_tokens),
            placeholder: config.persona.placeholder.clone(),
            callback: None,
        })
    }

    /// Override the configured strategy.
    pub fn with_mode(mut self, mode: OrchestrationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set a callback for orchestration events.
    pub fn with_callback(mut self, callback: OrchestratorCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn mode(&self) -> OrchestrationMode {
        self.mode
    }

    /// Generate one turn per persona. Never fails: any slot that could not be
    /// generated holds the placeholder text.
    pub async fn explain(&self, request: &PersonaExplanationRequest) -> Vec<PersonaTurn> {
        info!(
            concept = request.concept(),
            personas = request.len(),
            mode = %self.mode,
            "Starting persona explanation"
        );
        self.emit_event(OrchestratorEvent::BatchStart {
            mode: self.mode,
            count: request.len(),
        });

        let texts = match self.mode {
            OrchestrationMode::SingleCall => self.run_single_call(request).await,
            OrchestrationMode::FanOut => self.run_fan_out(request).await,
        };

        let failed = texts.iter().filter(|t| t.is_none()).count();
        let turns = self.assemble(request, texts);

        self.emit_event(OrchestratorEvent::BatchComplete {
            count: turns.len(),
            failed,
        });
        turns
    }

    /// One call whose reply holds every persona's turn.
    async fn run_single_call(&self, request: &PersonaExplanationRequest) -> Vec<Option<String>> {
        for (index, persona) in request.personas().iter().enumerate() {
            self.emit_event(OrchestratorEvent::PersonaStart {
                index,
                persona: persona.clone(),
            });
        }

        let texts = match self.debate_flow.invoke(self.model.as_ref(), request).await {
            Ok(turns) => {
                if turns.len() != request.len() {
                    warn!(
                        expected = request.len(),
                        actual = turns.len(),
                        "Model returned a different number of turns; aligning by position"
                    );
                }
                align_turns(request.len(), turns)
            }
            Err(e) => {
                warn!(error = %e, "Single-call explanation failed; using placeholders");
                vec![None; request.len()]
            }
        };

        for (index, persona) in request.personas().iter().enumerate() {
            let event = match texts[index] {
                Some(_) => OrchestratorEvent::PersonaComplete {
                    index,
                    persona: persona.clone(),
                },
                None => OrchestratorEvent::PersonaFailed {
                    index,
                    persona: persona.clone(),
                    error: "no turn generated".to_string(),
                },
            };
            self.emit_event(event);
        }
        texts
    }

    /// One independent call per persona, all in flight at once.
    async fn run_fan_out(&self, request: &PersonaExplanationRequest) -> Vec<Option<String>> {
        let calls = request
            .personas()
            .iter()
            .enumerate()
            .map(|(index, persona)| {
                let input = ExplainInput {
                    concept: request.concept().to_string(),
                    persona: persona.clone(),
                };
                async move {
                    self.emit_event(OrchestratorEvent::PersonaStart {
                        index,
                        persona: input.persona.clone(),
                    });

                    match self.explain_flow.invoke(self.model.as_ref(), &input).await {
                        Ok(text) => {
                            debug!(index, persona = %input.persona, "Persona explanation complete");
                            self.emit_event(OrchestratorEvent::PersonaComplete {
                                index,
                                persona: input.persona,
                            });
                            Some(text)
                        }
                        Err(e) => {
                            warn!(
                                index,
                                persona = %input.persona,
                                error = %e,
                                "Persona explanation failed; using placeholder"
                            );
                            self.emit_event(OrchestratorEvent::PersonaFailed {
                                index,
                                persona: input.persona,
                                error: e.to_string(),
                            });
                            None
                        }
                    }
                }
            });

        // join_all yields results in input order, so slot i is persona i
        // regardless of completion order.
        join_all(calls).await
    }

    fn assemble(
        &self,
        request: &PersonaExplanationRequest,
        texts: Vec<Option<String>>,
    ) -> Vec<PersonaTurn> {
        request
            .personas()
            .iter()
            .zip(texts)
            .map(|(persona, text)| match text {
                Some(text) => PersonaTurn::new(persona.clone(), text),
                None => PersonaTurn::placeholder(persona.clone(), &self.placeholder),
            })
            .collect()
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: OrchestratorEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

/// Map model-authored turns onto the requested slots by position. Surplus
/// turns are dropped, missing or blank ones become `None`.
fn align_turns(count: usize, turns: Vec<ScriptTurn>) -> Vec<Option<String>> {
    let mut texts: Vec<Option<String>> = turns
        .into_iter()
        .take(count)
        .map(|turn| {
            let text = turn.text.trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .collect();
    texts.resize(count, None);
    texts
}
