//! MentorAI Core Library
//!
//! Provides the learning features, multi-persona explanation orchestration,
//! prompt flows and spoken playback of generated text.

pub mod config;
pub mod error;
pub mod features;
pub mod flow;
pub mod model;
pub mod orchestrator;
pub mod persona;
pub mod playback;
pub mod session;
pub mod skills;
pub mod template;
pub mod tts;

pub use config::{Config, default_config};
pub use error::MentorError;
pub use features::{Actions, FormInput, PersonaForm, split_skills};
pub use model::{ApiSettings, GenerativeModel, OpenAICompatibleModel};
pub use orchestrator::{OrchestratorCallback, OrchestratorEvent, PersonaOrchestrator};
pub use persona::{OrchestrationMode, PersonaExplanationRequest, PersonaTurn};
pub use playback::{AudioClip, AudioOutput, PlaybackController, PlaybackState, WavFileOutput};
pub use session::FormSession;
pub use skills::{SkillDomain, SkillTree};
pub use tts::{AudioData, KokoroSynthesizer, SpeechSynthesizer};
