// Configuration management for treeplay
// Handles loading/saving settings, with sensible defaults when config is missing

use crate::playback::PlaybackSettings;
use crate::ui::UiSettings;
use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "treeplay";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the music library the scanner walks.
    pub music_directory: PathBuf,
    pub catalog_path: PathBuf,
    pub database_path: PathBuf,
    pub log_directory: PathBuf,
    pub ui: UiConfig,
    pub playback: PlaybackConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Mouse wheel scrolls the tree (needs mouse capture).
    pub scroll_input: bool,
    pub debug_overlay: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub volume: f32,
    pub volume_step: f32,
    pub progress_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// End the session when a play can't be written. Off means log and carry on.
    pub fail_on_write_error: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            scroll_input: true,
            debug_overlay: false,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            volume_step: 0.05,
            progress_interval_ms: 500,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            fail_on_write_error: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            music_directory: dirs::audio_dir().unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("Music")
            }),
            catalog_path: data_dir.join("catalog.json"),
            database_path: data_dir.join("history.db"),
            log_directory: data_dir.join("logs"),
            ui: UiConfig::default(),
            playback: PlaybackConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Reads `path`, writing the defaults there first if it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config in {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join(APP_DIR);

        Ok(config_dir.join("config.toml"))
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            volume: self.playback.volume.clamp(0.0, 1.0),
            progress_interval: Duration::from_millis(self.playback.progress_interval_ms.max(10)),
        }
    }

    pub fn ui_settings(&self) -> UiSettings {
        UiSettings {
            scroll_input: self.ui.scroll_input,
            debug_overlay: self.ui.debug_overlay,
            volume_step: self.playback.volume_step.abs(),
            fail_on_write_error: self.history.fail_on_write_error,
        }
    }
}
