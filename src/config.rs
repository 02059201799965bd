use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::RealmError;

pub const MIN_MAP_RADIUS: i32 = 4;
pub const MAX_MAP_RADIUS: i32 = 40;

fn default_name() -> String {
    "realm".into()
}

fn default_seed() -> u64 {
    1
}

fn default_map_radius() -> i32 {
    12
}

fn default_turns() -> u32 {
    50
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// Total danger-point strength placed at world generation and handed out
    /// again when a realm collapses.
    pub fn hazard_budget(self) -> u32 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Normal => 15,
            Difficulty::Hard => 20,
        }
    }

    pub fn wild_spawn_chance(self) -> f64 {
        match self {
            Difficulty::Easy => 0.03,
            Difficulty::Normal => 0.06,
            Difficulty::Hard => 0.12,
        }
    }

    /// Fraction of wild spawns that arrive as monsters.
    pub fn monster_share(self) -> f64 {
        match self {
            Difficulty::Easy => 0.05,
            Difficulty::Normal => 0.10,
            Difficulty::Hard => 0.20,
        }
    }
}

impl FromStr for Difficulty {
    type Err = RealmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(RealmError::UnknownDifficulty(s.to_string())),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_map_radius")]
    pub map_radius: i32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub turns: Option<u32>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: default_seed(),
            map_radius: default_map_radius(),
            difficulty: Difficulty::default(),
            turns: None,
            logging: LoggingSettings::default(),
        }
    }
}

impl GameSettings {
    pub fn validate(&self) -> Result<(), RealmError> {
        if !(MIN_MAP_RADIUS..=MAX_MAP_RADIUS).contains(&self.map_radius) {
            return Err(RealmError::InvalidRadius(self.map_radius));
        }
        Ok(())
    }

    pub fn turns(&self, override_turns: Option<u32>) -> u32 {
        override_turns.or(self.turns).unwrap_or_else(default_turns)
    }
}

pub struct SettingsLoader {
    base_dir: PathBuf,
}

impl SettingsLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<GameSettings> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: GameSettings = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        Ok(settings)
    }
}
