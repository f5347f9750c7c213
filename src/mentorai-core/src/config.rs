//! Configuration module for loading TOML config files.
//!
//! Every section is optional; anything left out falls back to the values
//! from [`default_config`].

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::MentorError;
use crate::persona::{MAX_PERSONAS, MIN_PERSONAS, OrchestrationMode};
use crate::template::PromptTemplate;

pub const FLOW_REVERSE_TEACH: &str = "reverse_teach";
pub const FLOW_DEBATE: &str = "debate";
pub const FLOW_EXPLAIN: &str = "explain";
pub const FLOW_FAILURE_SIMULATION: &str = "failure_simulation";
pub const FLOW_KNOWLEDGE_GAPS: &str = "knowledge_gaps";
pub const FLOW_ANTI_PATTERNS: &str = "anti_patterns";
pub const FLOW_SUMMARIZE: &str = "summarize";
pub const FLOW_TRANSLATE: &str = "translate";

/// All flow names with a built-in template.
pub const FLOW_NAMES: [&str; 8] = [
    FLOW_REVERSE_TEACH,
    FLOW_DEBATE,
    FLOW_EXPLAIN,
    FLOW_FAILURE_SIMULATION,
    FLOW_KNOWLEDGE_GAPS,
    FLOW_ANTI_PATTERNS,
    FLOW_SUMMARIZE,
    FLOW_TRANSLATE,
];

/// Upper bound for `model.max_retries`; backoff doubles per attempt.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub persona: PersonaConfig,
    pub voices: VoicesConfig,
    pub languages: LanguagesConfig,
    /// Template overrides keyed by flow name.
    pub prompts: BTreeMap<String, String>,
}

/// Generative model settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-4o-mini".to_string(),
            max_tokens: 1500,
            max_retries: 3,
            request_timeout_secs: 120,
        }
    }
}

/// Multi-persona explanation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// `fan-out` or `single-call`.
    pub mode: String,
    pub min_personas: usize,
    pub max_personas: usize,
    /// Text substituted for a persona whose turn could not be generated.
    pub placeholder: String,
    pub default_personas: Vec<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            mode: "fan-out".to_string(),
            min_personas: 2,
            max_personas: 3,
            placeholder: "I am unable to participate in the explanation right now.".to_string(),
            default_personas: vec![
                "A skeptical five-year-old".to_string(),
                "A philosophy professor from the 18th century".to_string(),
                "A futuristic AI from the year 3000".to_string(),
            ],
        }
    }
}

/// A voice presented to the user.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VoiceOption {
    pub id: String,
    pub name: String,
}

impl VoiceOption {
    fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Voice configuration for TTS.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoicesConfig {
    pub default_voice: String,
    pub available: Vec<VoiceOption>,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            default_voice: "af_sky".to_string(),
            available: vec![
                VoiceOption::new("af_sky", "Narrator 1"),
                VoiceOption::new("bf_emma", "Narrator 2"),
                VoiceOption::new("bm_george", "Narrator 3"),
                VoiceOption::new("am_adam", "Narrator 4"),
            ],
        }
    }
}

/// Target languages offered by the translator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LanguagesConfig {
    pub available: Vec<String>,
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            available: [
                "Spanish",
                "French",
                "German",
                "Japanese",
                "Russian",
                "Mandarin Chinese",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MentorError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| MentorError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, MentorError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| MentorError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), MentorError> {
        if self.model.max_retries > MAX_RETRIES_LIMIT {
            return Err(MentorError::ConfigError(format!(
                "model.max_retries must be at most {} (got {})",
                MAX_RETRIES_LIMIT, self.model.max_retries
            )));
        }

        let persona = &self.persona;
        if persona.min_personas < MIN_PERSONAS
            || persona.max_personas > MAX_PERSONAS
            || persona.min_personas > persona.max_personas
        {
            return Err(MentorError::ConfigError(format!(
                "persona bounds must satisfy {} <= min <= max <= {} (got {}..{})",
                MIN_PERSONAS, MAX_PERSONAS, persona.min_personas, persona.max_personas
            )));
        }
        if persona.placeholder.trim().is_empty() {
            return Err(MentorError::ConfigError(
                "persona.placeholder must not be empty".to_string(),
            ));
        }
        self.persona_mode()?;

        if self.voices.available.is_empty() {
            return Err(MentorError::ConfigError(
                "voices.available must list at least one voice".to_string(),
            ));
        }
        self.voice(&self.voices.default_voice)?;

        if self.languages.available.is_empty() {
            return Err(MentorError::ConfigError(
                "languages.available must list at least one language".to_string(),
            ));
        }

        for name in self.prompts.keys() {
            self.prompt(name)?;
        }
        Ok(())
    }

    /// The configured orchestration strategy for multi-persona explanations.
    pub fn persona_mode(&self) -> Result<OrchestrationMode, MentorError> {
        self.persona.mode.parse()
    }

    /// Look up a presented voice by id.
    pub fn voice(&self, id: &str) -> Result<&VoiceOption, MentorError> {
        self.voices
            .available
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| MentorError::UnknownVoice(id.to_string()))
    }

    /// The prompt template for a flow, preferring a configured override.
    pub fn prompt(&self, flow: &str) -> Result<PromptTemplate, MentorError> {
        let builtin = builtin_prompt(flow)
            .ok_or_else(|| MentorError::ConfigError(format!("Unknown flow: {}", flow)))?;
        let text = self.prompts.get(flow).map(String::as_str).unwrap_or(builtin);
        PromptTemplate::parse(flow, text)
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config::default()
}

/// The built-in template text for a flow.
pub fn builtin_prompt(flow: &str) -> Option<&'static str> {
    match flow {
        FLOW_REVERSE_TEACH => Some(REVERSE_TEACH_PROMPT),
        FLOW_DEBATE => Some(DEBATE_PROMPT),
        FLOW_EXPLAIN => Some(EXPLAIN_PROMPT),
        FLOW_FAILURE_SIMULATION => Some(FAILURE_SIMULATION_PROMPT),
        FLOW_KNOWLEDGE_GAPS => Some(KNOWLEDGE_GAPS_PROMPT),
        FLOW_ANTI_PATTERNS => Some(ANTI_PATTERNS_PROMPT),
        FLOW_SUMMARIZE => Some(SUMMARIZE_PROMPT),
        FLOW_TRANSLATE => Some(TRANSLATE_PROMPT),
        _ => None,
    }
}

const REVERSE_TEACH_PROMPT: &str = r#"You are an AI that is being taught a concept by a student. Your goal is to learn the concept, identify any gaps in the student's explanation, and ask the student questions to refine their understanding.

Concept: {concept}

Student Explanation: {studentExplanation}

Based on the above, provide:
1. Your assessment of your understanding of the concept.
2. Questions for the student to help refine their understanding.
3. Identified gaps in the student's explanation.

Respond with a single JSON object with the string keys "aiUnderstanding", "questionsForStudent" and "identifiedGaps". Output only the JSON.
"#;

const DEBATE_PROMPT: &str = r#"You are a scriptwriter and educator. Your task is to write a detailed and comprehensive explanation of the concept '{concept}' from the perspective of several AI personas.

The personas are:
{#each personas}- {this}
{/each}
The output should be a script where each persona takes a turn to explain a facet of the concept, in the order listed above. The second persona should build on what the first said, and the third should build on the previous two, creating a single, cohesive, and thorough explanation.

Instead of a short debate, the goal is a collaborative and deep explanation. Each persona's turn should be substantial, providing rich detail and clarity.

Present the output as a JSON array of objects, where each object has a "persona" and "text" key. Output only the JSON.
"#;

const EXPLAIN_PROMPT: &str = "Explain the concept of '{concept}' from the perspective of {persona}. Keep your explanation to a maximum of 3 sentences.";

const FAILURE_SIMULATION_PROMPT: &str = r#"You are an AI that creates failure scenarios for students to learn from.

Given the topic, the user's skills, and a specific context, simulate a realistic failure scenario. Analyze why the failure occurred and suggest learning recommendations.

Topic: {topic}
User Skills: {#if userSkills}{#each userSkills}
- {this}{/each}{else}None{/if}
Failure Context: {failureContext}

Respond with a single JSON object with the string keys "scenarioDescription", "failureAnalysis" and "learningRecommendations". Output only the JSON.
"#;

const KNOWLEDGE_GAPS_PROMPT: &str = r#"You are a career advisor who identifies knowledge gaps and finds resources for a student.

Given the student's career goal of {careerGoal} and their current skills of {currentSkills}, identify the knowledge gaps the student needs to fill in order to achieve their goal, and suggest resources to fill them.
{#if learningPreferences}
Take into account that the student prefers to learn by {learningPreferences}.
{/if}
Respond with a single JSON object with two keys:
"predictedGaps": a list of knowledge gaps
"suggestedResources": a list of suggested learning resources
Output only the JSON.
"#;

const ANTI_PATTERNS_PROMPT: &str = r#"You are a learning coach who detects unproductive study habits.

Learning history:
{learningHistory}

Current activity:
{currentActivity}

Identify the learning anti-patterns visible in the history and the current activity (for example passive re-reading, context switching, avoiding practice), then propose one concrete intervention.

Respond with a single JSON object with the keys "antiPatterns" (a list of short descriptions) and "intervention" (an object with the string keys "type" and "message"). Output only the JSON.
"#;

const SUMMARIZE_PROMPT: &str = r#"Read the following text and extract its key notes as short, self-contained bullet points, in the order they appear.

Text:
{text}

Respond with a single JSON object with the key "keyNotes" holding a list of strings. Output only the JSON.
"#;

const TRANSLATE_PROMPT: &str = r#"Translate the following text into {targetLanguage}. Preserve meaning, tone and paragraph breaks.

Text:
{text}

Respond with a single JSON object with the key "translatedText". Output only the JSON.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = default_config();
        config.validate().unwrap();
        assert_eq!(config.persona_mode().unwrap(), OrchestrationMode::FanOut);
    }

    #[test]
    fn test_every_builtin_prompt_parses() {
        let config = default_config();
        for name in FLOW_NAMES {
            assert!(config.prompt(name).is_ok(), "prompt {} failed to parse", name);
        }
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = Config::from_str(
            r#"
            [persona]
            mode = "single-call"

            [model]
            name = "llama3:8b"
            "#,
        )
        .unwrap();

        assert_eq!(config.persona_mode().unwrap(), OrchestrationMode::SingleCall);
        assert_eq!(config.model.name, "llama3:8b");
        assert_eq!(config.model.max_retries, 3);
        assert_eq!(config.persona.max_personas, 3);
        assert_eq!(config.voices.available.len(), 4);
    }

    #[test]
    fn test_prompt_override() {
        let config = Config::from_str(
            r#"
            [prompts]
            explain = "Describe {concept} like {persona} would."
            "#,
        )
        .unwrap();
        let template = config.prompt(FLOW_EXPLAIN).unwrap();
        assert_eq!(template.name(), FLOW_EXPLAIN);
    }

    #[test]
    fn test_unknown_prompt_override_rejected() {
        let result = Config::from_str(
            r#"
            [prompts]
            poetry = "Write a poem"
            "#,
        );
        assert!(matches!(result, Err(MentorError::ConfigError(_))));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result = Config::from_str(
            r#"
            [persona]
            mode = "round-robin"
            "#,
        );
        assert!(matches!(result, Err(MentorError::UnknownMode(_))));
    }

    #[test]
    fn test_default_voice_must_be_presented() {
        let result = Config::from_str(
            r#"
            [voices]
            default_voice = "zz_nobody"
            "#,
        );
        assert!(matches!(result, Err(MentorError::UnknownVoice(_))));
    }

    #[test]
    fn test_retry_count_is_capped() {
        let result = Config::from_str(
            r#"
            [model]
            max_retries = 99
            "#,
        );
        assert!(matches!(result, Err(MentorError::ConfigError(ref m)) if m.contains("max_retries")));

        let config = Config::from_str(
            r#"
            [model]
            max_retries = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.model.max_retries, MAX_RETRIES_LIMIT);
    }

    #[test]
    fn test_sample_config_file() {
        let config = Config::from_str(include_str!("../../../config/mentorai.toml")).unwrap();
        assert_eq!(config.persona.default_personas.len(), 3);
        assert_eq!(config.voice("bm_george").unwrap().name, "Narrator 3");
        assert!(config.prompts.contains_key(FLOW_EXPLAIN));
    }
}
