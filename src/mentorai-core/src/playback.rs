//! Audio playback controller.
//!
//! One controller belongs to one view. It holds at most one current clip and
//! moves between [`PlaybackState`]s as clips are requested, toggled and
//! finished:
//!
//! ```text
//! Idle -> Loading(id) -> Playing(id) -> Idle
//!            ^               |
//!            +--- request(other id) supersedes
//! ```
//!
//! Requesting the id that is currently playing pauses it. Any other request
//! abandons the previous one; if the abandoned synthesis completes later its
//! result is discarded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::MentorError;
use crate::tts::{AudioData, SpeechSynthesizer, clip_filename};

/// What the controller is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading(String),
    Playing(String),
}

impl PlaybackState {
    pub fn request_id(&self) -> Option<&str> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Loading(id) | PlaybackState::Playing(id) => Some(id),
        }
    }
}

/// A synthesized clip and what it was made from.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub request_id: String,
    pub source_text: String,
    pub voice: Option<String>,
    pub audio: AudioData,
}

/// Where clips end up. Implementations must not block for the clip's duration;
/// natural end is reported back through
/// [`PlaybackController::on_playback_ended`].
pub trait AudioOutput: Send + Sync {
    fn play(&self, clip: &AudioClip) -> Result<(), MentorError>;
    fn pause(&self);
}

/// Callback invoked on every state change, after the controller has released
/// its state, so it may query the controller.
pub type PlaybackCallback = Box<dyn Fn(&PlaybackState) + Send + Sync>;

#[derive(Default)]
struct Inner {
    state: PlaybackState,
    clip: Option<AudioClip>,
    /// Bumped for every new request; a synthesis result only lands if its
    /// token is still current.
    token: u64,
    voice: Option<String>,
}

/// Drives text-to-speech playback for one view.
pub struct PlaybackController {
    synth: Arc<dyn SpeechSynthesizer>,
    output: Arc<dyn AudioOutput>,
    inner: Mutex<Inner>,
    callback: Option<PlaybackCallback>,
}

impl PlaybackController {
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            synth,
            output,
            inner: Mutex::new(Inner::default()),
            callback: None,
        }
    }

    /// Use `voice` for subsequent requests.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.inner.get_mut().voice = Some(voice.into());
        self
    }

    /// Set a callback for state changes.
    pub fn with_callback(mut self, callback: PlaybackCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub async fn set_voice(&self, voice: Option<String>) {
        self.inner.lock().await.voice = voice;
    }

    /// Play `text` under `request_id`, or pause it if that id is playing.
    ///
    /// Returns the state once this request has settled (or immediately, for
    /// a pause). If a newer request superseded this one while it was loading,
    /// the returned state is whatever the newer request left behind.
    pub async fn request(&self, text: &str, request_id: &str) -> PlaybackState {
        if text.trim().is_empty() {
            return self.state().await;
        }

        let (token, voice) = {
            let mut inner = self.inner.lock().await;

            if inner.state == PlaybackState::Playing(request_id.to_string()) {
                self.output.pause();
                inner.clip = None;
                let changed = Self::transition(&mut inner, PlaybackState::Idle);
                drop(inner);
                self.emit(changed);
                info!(request_id, "Playback paused");
                return PlaybackState::Idle;
            }

            if matches!(inner.state, PlaybackState::Playing(_)) {
                self.output.pause();
            }
            inner.clip = None;
            inner.token += 1;
            let changed =
                Self::transition(&mut inner, PlaybackState::Loading(request_id.to_string()));
            let ticket = (inner.token, inner.voice.clone());
            drop(inner);
            self.emit(changed);
            ticket
        };

        debug!(request_id, token, chars = text.len(), "Requesting speech");
        let result = self.synth.synthesize(text, voice.as_deref()).await;

        let mut inner = self.inner.lock().await;
        if inner.token != token {
            debug!(request_id, token, current = inner.token, "Dropping superseded audio");
            return inner.state.clone();
        }

        let changed = match result {
            Ok(audio) => {
                let clip = AudioClip {
                    request_id: request_id.to_string(),
                    source_text: text.to_string(),
                    voice,
                    audio,
                };
                match self.output.play(&clip) {
                    Ok(()) => {
                        inner.clip = Some(clip);
                        Self::transition(&mut inner, PlaybackState::Playing(request_id.to_string()))
                    }
                    Err(e) => {
                        error!(request_id, error = %e, "Audio play failed");
                        Self::transition(&mut inner, PlaybackState::Idle)
                    }
                }
            }
            Err(e) => {
                error!(request_id, error = %e, "Failed to generate audio");
                Self::transition(&mut inner, PlaybackState::Idle)
            }
        };
        let state = inner.state.clone();
        drop(inner);
        self.emit(changed);
        state
    }

    /// The current clip reached its natural end.
    pub async fn on_playback_ended(&self) {
        let changed = {
            let mut inner = self.inner.lock().await;
            inner.clip = None;
            Self::transition(&mut inner, PlaybackState::Idle)
        };
        self.emit(changed);
    }

    /// Stop everything, including a request still loading.
    pub async fn stop(&self) {
        let changed = {
            let mut inner = self.inner.lock().await;
            if matches!(inner.state, PlaybackState::Playing(_)) {
                self.output.pause();
            }
            inner.token += 1;
            inner.clip = None;
            Self::transition(&mut inner, PlaybackState::Idle)
        };
        self.emit(changed);
    }

    pub async fn state(&self) -> PlaybackState {
        self.inner.lock().await.state.clone()
    }

    pub async fn current_clip(&self) -> Option<AudioClip> {
        self.inner.lock().await.clip.clone()
    }

    pub async fn is_loading(&self, request_id: &str) -> bool {
        self.state().await == PlaybackState::Loading(request_id.to_string())
    }

    pub async fn is_playing(&self, request_id: &str) -> bool {
        self.state().await == PlaybackState::Playing(request_id.to_string())
    }

    /// Move to `next`, returning it if the state actually changed.
    fn transition(inner: &mut Inner, next: PlaybackState) -> Option<PlaybackState> {
        if inner.state == next {
            return None;
        }
        debug!(from = ?inner.state, to = ?next, "Playback state change");
        inner.state = next.clone();
        Some(next)
    }

    /// Notify the callback. Must be called with the state lock released.
    fn emit(&self, changed: Option<PlaybackState>) {
        if let (Some(state), Some(callback)) = (changed, &self.callback) {
            callback(&state);
        }
    }
}

/// Writes each clip to a WAV file in a directory instead of a sound device.
pub struct WavFileOutput {
    dir: PathBuf,
}

impl WavFileOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `clip` is written.
    pub fn path_for(&self, clip: &AudioClip) -> PathBuf {
        self.dir.join(clip_filename(&clip.request_id, &clip.source_text))
    }
}

impl AudioOutput for WavFileOutput {
    fn play(&self, clip: &AudioClip) -> Result<(), MentorError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            MentorError::TtsError(format!(
                "Failed to create output directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;
        let path = self.path_for(clip);
        clip.audio.save_wav(&path)?;
        info!(path = %path.display(), secs = clip.audio.duration().as_secs_f32(), "Clip written");
        Ok(())
    }

    fn pause(&self) {}
}
