use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// patient whose treatments are loaded when none is given on the command line
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub sound: Sound,
    #[serde(default = "Config::treatments_path")]
    pub treatments_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            patient_id: None,
            volume: default_volume(),
            sound: Sound::default(),
            treatments_dir: Self::treatments_path(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Falls back to the defaults when there is no file yet.
    ///
    /// # Errors
    /// If the file exists but can't be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = std::fs::read_to_string(path)
            .with_context(|| format!("couldn't read config file {}", path.display()))?;
        toml::from_str(&config)
            .with_context(|| format!("couldn't parse config file {}", path.display()))
    }

    /// # Errors
    /// If the config can't be serialized or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let config = toml::to_string(self).context("couldn't serialize config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("couldn't create config dir {}", parent.display()))?;
        }
        std::fs::write(path, config)
            .with_context(|| format!("couldn't write config file {}", path.display()))
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", "med_reminder")
    }

    // falls back to the working directory on systems without a home
    fn data_dir() -> PathBuf {
        Self::project_dirs().map_or_else(
            || PathBuf::from("."),
            |dirs| dirs.data_dir().to_path_buf(),
        )
    }

    #[must_use]
    pub fn config_path() -> PathBuf {
        let mut path = Self::project_dirs().map_or_else(
            || PathBuf::from("."),
            |dirs| dirs.config_dir().to_path_buf(),
        );
        path.push("config.toml");
        path
    }

    #[must_use]
    pub fn sounds_path() -> PathBuf {
        Self::data_dir().join("sounds")
    }

    #[must_use]
    pub fn treatments_path() -> PathBuf {
        Self::data_dir().join("treatments")
    }

    #[must_use]
    pub fn is_config_present() -> bool {
        Self::config_path().exists()
    }
}

const fn default_volume() -> f32 {
    100.0
}

/// The cue played at the end of every alert.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Sound {
    pub name: String,
    pub path: PathBuf,
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.name,
            self.path
                .file_name()
                .map_or_else(|| self.path.to_string_lossy(), |name| name.to_string_lossy())
        )
    }
}

impl Default for Sound {
    fn default() -> Self {
        Self::beep_beep()
    }
}

impl Sound {
    #[must_use]
    pub const fn new(name: String, path: PathBuf) -> Self {
        Self { name, path }
    }

    #[must_use]
    pub fn beep_beep() -> Self {
        Self {
            name: "beep beep".to_string(),
            path: Config::sounds_path().join("beep_beep.wav"),
        }
    }
}
