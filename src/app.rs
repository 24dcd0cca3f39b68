use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::audio::{
    format_timestamp, AudioSample, OutputContext, PlaybackController, PlaybackError, ProgressSink,
};
use crate::engine::{ScriptEngine, SpeechEngine, TextExtractor};
use crate::state::{AppStatus, Settings};

/// What a briefing run hands back to the presentation layer.
#[derive(Debug, Clone)]
pub struct BriefingResult {
    pub script: String,
    pub duration_secs: f64,
}

/// The whole pipeline behind the presentation layer: raw text in, spoken
/// script out of the script engine, audio out of the speech engine, playback
/// through the controller.
pub struct Newscast {
    script_engine: Arc<dyn ScriptEngine>,
    speech_engine: Arc<dyn SpeechEngine>,
    extractor: Arc<dyn TextExtractor>,
    controller: PlaybackController,
    last_sample: Mutex<Option<AudioSample>>,
    settings: Settings,
    status: Mutex<AppStatus>,
}

impl Newscast {
    /// Acquires the audio output context up front; a machine that cannot
    /// play audio fails here, before any API call is made.
    pub fn new(
        script_engine: Arc<dyn ScriptEngine>,
        speech_engine: Arc<dyn SpeechEngine>,
        extractor: Arc<dyn TextExtractor>,
        settings: Settings,
        sink: ProgressSink,
    ) -> Result<Self, PlaybackError> {
        let output = OutputContext::acquire()?;
        let controller = PlaybackController::new(output, sink);
        controller.set_volume(settings.general.volume);

        Ok(Self {
            script_engine,
            speech_engine,
            extractor,
            controller,
            last_sample: Mutex::new(None),
            settings,
            status: Mutex::new(AppStatus::Idle),
        })
    }

    /// Summarize raw news text into a script, synthesize it, and load the
    /// result into the playback controller.
    pub async fn brief_from_text(&self, text: &str) -> Result<BriefingResult> {
        self.set_status(AppStatus::Summarizing);
        tracing::info!("Generating script from {} characters of input", text.len());
        let script = self
            .script_engine
            .write_script(text, &self.settings.script)
            .await
            .context("Script generation failed")?;

        self.set_status(AppStatus::Synthesizing);
        let sample = self
            .speech_engine
            .synthesize(&script, &self.settings.speech)
            .await
            .context("Speech synthesis failed")?;
        let duration_secs = sample.duration_secs();

        *self.last_sample.lock().unwrap() = Some(sample.clone());
        self.controller.load(sample)?;
        self.set_status(AppStatus::Ready);

        Ok(BriefingResult {
            script,
            duration_secs,
        })
    }

    /// Extract text from an uploaded document, then run the text pipeline.
    pub async fn brief_from_document(&self, bytes: &[u8], mime_type: &str) -> Result<BriefingResult> {
        self.set_status(AppStatus::Extracting);
        tracing::info!("Extracting text from {} byte document ({})", bytes.len(), mime_type);
        let text = self
            .extractor
            .extract(bytes, mime_type)
            .await
            .context("Text extraction failed")?;

        self.brief_from_text(&text).await
    }

    /// Save the most recently synthesized briefing as a WAV file.
    pub fn save_wav(&self, path: &std::path::Path) -> Result<()> {
        let guard = self.last_sample.lock().unwrap();
        let sample = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No briefing has been synthesized yet"))?;
        sample.write_wav(path)?;
        tracing::info!("Briefing saved to {:?}", path);
        Ok(())
    }

    pub fn play(&self) -> Result<(), PlaybackError> {
        self.controller.play()?;
        if self.controller.is_active() {
            self.set_status(AppStatus::Playing);
        }
        Ok(())
    }

    pub fn pause(&self) {
        self.controller.pause();
        if self.controller.has_sample() {
            self.set_status(AppStatus::Ready);
        }
    }

    pub fn toggle_playback(&self) -> Result<(), PlaybackError> {
        if self.controller.is_active() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    pub fn reset(&self) {
        self.controller.reset();
        if self.controller.has_sample() {
            self.set_status(AppStatus::Ready);
        }
    }

    pub fn set_volume(&self, volume: f32) {
        self.controller.set_volume(volume);
    }

    /// `m:ss / m:ss` transport position for display.
    pub fn position_display(&self) -> String {
        format!(
            "{} / {}",
            format_timestamp(self.controller.position_secs()),
            format_timestamp(self.controller.duration_secs())
        )
    }

    pub fn is_playing(&self) -> bool {
        self.controller.is_active()
    }

    pub fn status(&self) -> AppStatus {
        if self.controller.is_active() {
            return AppStatus::Playing;
        }
        let stored = self.status.lock().unwrap().clone();
        if stored == AppStatus::Playing {
            // Playback completed on its own since the last transport call
            AppStatus::Ready
        } else {
            stored
        }
    }

    fn set_status(&self, status: AppStatus) {
        *self.status.lock().unwrap() = status;
    }
}
