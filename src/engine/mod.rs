pub mod remote;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audio::AudioSample;

/// Options steering script generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptOptions {
    pub model: String,
    /// Approximate spoken length of the generated script, in seconds.
    pub target_seconds: u32,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            target_seconds: 60,
        }
    }
}

/// Options steering speech synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechOptions {
    pub model: String,
    pub voice: String,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-preview-tts".to_string(),
            voice: "Kore".to_string(),
        }
    }
}

/// Turns raw news text into a spoken-style script.
#[async_trait]
pub trait ScriptEngine: Send + Sync {
    async fn write_script(&self, text: &str, options: &ScriptOptions) -> Result<String>;
}

/// Turns script text into a decoded audio buffer.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn synthesize(&self, script: &str, options: &SpeechOptions) -> Result<AudioSample>;
}

/// Turns an uploaded binary document into raw text. The mime type is taken
/// as declared by the caller; no sniffing happens here.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8], mime_type: &str) -> Result<String>;
}
