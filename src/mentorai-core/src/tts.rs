//! Text-to-speech synthesis.
//!
//! [`SpeechSynthesizer`] is what the playback controller talks to.
//! [`KokoroSynthesizer`] implements it on top of a local kokoro-tiny engine.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use kokoro_tiny::TtsEngine;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::MentorError;

/// Output rate of the kokoro engine.
pub const SAMPLE_RATE: u32 = 24_000;

/// Longest chunk kokoro reliably synthesizes in one go.
const MAX_CHUNK_CHARS: usize = 200;

/// Mono PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    fn wav_spec(&self) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        }
    }

    /// Encode as an in-memory WAV file.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, MentorError> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, self.wav_spec()).map_err(wav_error)?;
            for sample in &self.samples {
                writer.write_sample(*sample).map_err(wav_error)?;
            }
            writer.finalize().map_err(wav_error)?;
        }
        Ok(cursor.into_inner())
    }

    /// Save audio samples to a WAV file.
    pub fn save_wav<P: AsRef<Path>>(&self, path: P) -> Result<(), MentorError> {
        let mut writer = WavWriter::create(path.as_ref(), self.wav_spec()).map_err(wav_error)?;
        for sample in &self.samples {
            writer.write_sample(*sample).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)
    }
}

fn wav_error(e: hound::Error) -> MentorError {
    MentorError::TtsError(format!("Failed to write WAV: {}", e))
}

/// Converts text to speech. Voice ids are opaque strings; `None` selects the
/// synthesizer's default voice.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<AudioData, MentorError>;
}

/// Local TTS using kokoro-tiny.
pub struct KokoroSynthesizer {
    engine: Mutex<TtsEngine>,
    available_voices: Vec<String>,
    default_voice: String,
}

impl KokoroSynthesizer {
    /// Initialize the TTS engine (downloads model on first run).
    pub async fn new(default_voice: impl Into<String>) -> Result<Self, MentorError> {
        let engine = TtsEngine::new()
            .await
            .map_err(|e| MentorError::TtsError(format!("Failed to initialize TTS: {}", e)))?;

        let available_voices = engine.voices();
        let synth = Self {
            engine: Mutex::new(engine),
            available_voices,
            default_voice: default_voice.into(),
        };
        synth.validate_voice(&synth.default_voice)?;
        Ok(synth)
    }

    /// Get list of available voice IDs.
    pub fn available_voices(&self) -> &[String] {
        &self.available_voices
    }

    /// Validate that a voice ID exists.
    pub fn validate_voice(&self, voice_id: &str) -> Result<(), MentorError> {
        if voice_id.is_empty() || !self.available_voices.iter().any(|v| v == voice_id) {
            return Err(MentorError::TtsError(format!(
                "Unknown voice '{}'. Available voices:\n{}",
                voice_id,
                self.format_available_voices()
            )));
        }
        Ok(())
    }

    /// Format English voices for display.
    fn format_available_voices(&self) -> String {
        let mut english_voices: Vec<&String> = self
            .available_voices
            .iter()
            .filter(|v| {
                v.starts_with("af_")
                    || v.starts_with("am_")
                    || v.starts_with("bf_")
                    || v.starts_with("bm_")
            })
            .collect();
        english_voices.sort();

        english_voices
            .iter()
            .map(|v| format!("  - {}", v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl SpeechSynthesizer for KokoroSynthesizer {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<AudioData, MentorError> {
        let voice_id = voice.unwrap_or(&self.default_voice);
        self.validate_voice(voice_id)?;

        let chunks = split_into_chunks(text, MAX_CHUNK_CHARS);
        debug!(voice = voice_id, chunks = chunks.len(), "Synthesizing speech");

        let mut engine = self.engine.lock().await;
        let mut samples = Vec::new();

        for chunk in chunks {
            let chunk_samples = engine
                .synthesize(&chunk, Some(voice_id))
                .map_err(|e| MentorError::TtsError(format!("Synthesis failed: {}", e)))?;
            samples.extend(chunk_samples);
            samples.extend(silence(0.3));
        }

        // Trailing padding so the last word is not clipped.
        samples.extend(silence(0.5));
        Ok(AudioData::new(samples, SAMPLE_RATE))
    }
}

fn silence(seconds: f32) -> Vec<f32> {
    vec![0.0; (seconds * SAMPLE_RATE as f32) as usize]
}

/// Split text into sentence-aligned chunks of at most `max_chars`, falling
/// back to commas for long sentences.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in text.split_inclusive(&['.', '!', '?', ';'][..]) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if current.len() + sentence.len() <= max_chars {
            current.push_str(sentence);
            current.push(' ');
            continue;
        }

        flush(&mut current, &mut chunks);

        if sentence.len() <= max_chars {
            current.push_str(sentence);
            current.push(' ');
            continue;
        }

        for part in sentence.split_inclusive(',') {
            if current.len() + part.len() > max_chars {
                flush(&mut current, &mut chunks);
            }
            current.push_str(part.trim());
            current.push(' ');
        }
    }

    flush(&mut current, &mut chunks);
    chunks
}

fn flush(current: &mut String, chunks: &mut Vec<String>) {
    let chunk = current.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
    current.clear();
}

/// File name for a synthesized clip.
pub fn clip_filename(request_id: &str, text: &str) -> String {
    let sanitize = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };

    let excerpt: String = sanitize(text).chars().take(40).collect();
    format!("MentorAI - {} - {}.wav", sanitize(request_id), excerpt.trim())
}
