use serde::{Deserialize, Serialize};

use crate::engine::{ScriptOptions, SpeechOptions};

/// Pipeline status, reported to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    Idle,
    Extracting,
    Summarizing,
    Synthesizing,
    Ready,
    Playing,
}

impl Default for AppStatus {
    fn default() -> Self {
        Self::Idle
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub script: ScriptOptions,
    pub speech: SpeechOptions,
    pub general: GeneralSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            script: ScriptOptions::default(),
            speech: SpeechOptions::default(),
            general: GeneralSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Playback volume in [0, 1].
    pub volume: f32,
    /// Directory synthesized briefings are saved to when `--save` is given
    /// without a path.
    pub save_dir: Option<String>,
    /// API key used when the `GEMINI_API_KEY` environment variable is unset.
    pub api_key: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            save_dir: None,
            api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AppStatus::Synthesizing).unwrap(),
            "\"synthesizing\""
        );
    }

    #[test]
    fn test_settings_round_trip() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_settings_tolerate_missing_fields() {
        // Files written by older builds lack newer fields
        let back: Settings =
            serde_json::from_str(r#"{"general": {"volume": 0.7}}"#).unwrap();
        assert_eq!(back.general.volume, 0.7);
        assert_eq!(back.general.api_key, None);
        assert_eq!(back.speech, SpeechOptions::default());
    }
}
