use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Logging layers. Missing keys take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// "trace", "debug", "info", "warn" or "error"; `RUST_LOG` wins when set.
    pub level: String,
    pub console_logging_enabled: bool,
    pub file_logging_enabled: bool,
    pub log_dir: String,
    pub file_name_prefix: String,
    /// "minutely", "hourly", "daily" or "never"
    pub rotation: String,
    pub show_target: bool,
    pub show_file_line: bool,
    pub show_thread_ids: bool,
    pub ansi_colors: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            console_logging_enabled: true,
            file_logging_enabled: true,
            log_dir: "logs".into(),
            file_name_prefix: "vibrowtion".into(),
            rotation: "daily".into(),
            show_target: true,
            show_file_line: false,
            show_thread_ids: false,
            ansi_colors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_settings: LogSettings,

    /// Request a connection as soon as the core starts.
    pub auto_connect: bool,

    /// Trace every notification payload.
    pub debug_raw_data_logging: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            auto_connect: true,
            debug_raw_data_logging: false,
        }
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::from_path(settings_path))
    }

    /// Load from `path`, falling back to defaults if it is missing or unreadable.
    pub fn from_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("Vibrowtion");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
