use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::state::Settings;

const SETTINGS_FILE: &str = "settings.json";

fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot find user configuration directory"))?;
    Ok(base.join("newscast"))
}

fn settings_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(SETTINGS_FILE))
}

/// Load persisted settings, falling back to defaults on any failure. A
/// missing or corrupt settings file is never fatal.
pub fn load_settings() -> Settings {
    match settings_path() {
        Ok(path) => load_settings_from(&path),
        Err(e) => {
            tracing::warn!("Failed to locate settings file: {}. Using defaults.", e);
            Settings::default()
        }
    }
}

fn load_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        tracing::info!("No stored settings found. Using defaults.");
        return Settings::default();
    }

    match std::fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str::<Settings>(&data) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to deserialize stored settings: {}. Using defaults.", e);
                Settings::default()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read settings file: {}. Using defaults.", e);
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path()?, settings)
}

fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let mut settings = Settings::default();
        settings.speech.voice = "Puck".to_string();
        settings.general.volume = 0.4;
        settings.general.save_dir = Some("/tmp/briefings".to_string());

        save_settings_to(&path, &settings).unwrap();
        let loaded = load_settings_from(&path);

        assert_eq!(loaded.speech.voice, "Puck");
        assert_eq!(loaded.general.volume, 0.4);
        assert_eq!(loaded.general.save_dir.as_deref(), Some("/tmp/briefings"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_settings_from(&dir.path().join(SETTINGS_FILE));
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings_from(&path), Settings::default());
    }
}
