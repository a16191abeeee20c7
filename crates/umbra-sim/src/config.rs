//! Simulation configuration.
//!
//! Holds the tick rate, seed and every gameplay tunable. Loaded from
//! `umbra.toml`; a missing or broken file falls back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use umbra_gameplay::enemy::EnemyConfig;
use umbra_gameplay::hide::HideConfig;

/// Configuration file name.
pub const CONFIG_FILE: &str = "umbra.toml";

/// Errors that can occur while saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to write the file.
    #[error("Failed to write config file: {0}")]
    Io(#[from] io::Error),

    /// Failed to encode TOML.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Simulation configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Timing ===
    /// Fixed simulation rate
    pub tick_hz: u32,
    /// Ticks to run before stopping
    pub max_ticks: u32,

    // === Randomness ===
    /// Seed for all agent RNGs
    pub seed: u64,

    // === Player ===
    /// Scripted player walking speed
    pub player_speed: f32,
    /// Player collision radius
    pub player_radius: f32,
    /// Enemy collision radius
    pub enemy_radius: f32,

    // === Events ===
    /// Event bus capacity
    pub event_capacity: usize,

    // === Gameplay ===
    /// Enemy tunables
    pub enemy: EnemyConfig,
    /// Player hide tunables
    pub hide: HideConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz: 50,
            max_ticks: 1500, // 30 seconds at 50 Hz
            seed: 0x5EED,
            player_speed: 2.5,
            player_radius: 0.3,
            enemy_radius: 0.3,
            event_capacity: 256,
            enemy: EnemyConfig::default(),
            hide: HideConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        match fs::File::open(path).and_then(|mut file| file.read_to_string(&mut contents)) {
            Ok(_) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to the default file location.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(Self::config_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_hz = self.tick_hz.clamp(10, 240);
        self.player_speed = self.player_speed.clamp(0.1, 20.0);
        self.player_radius = self.player_radius.clamp(0.05, 2.0);
        self.enemy_radius = self.enemy_radius.clamp(0.05, 2.0);
        self.event_capacity = self.event_capacity.max(16);

        let enemy = &mut self.enemy;
        enemy.aggro_range = enemy.aggro_range.max(0.0);
        // Chasing must be able to end.
        enemy.lose_range = enemy.lose_range.max(enemy.aggro_range);
        enemy.search_duration = enemy.search_duration.max(0.0);
        enemy.arrival_radius = enemy.arrival_radius.max(0.01);
        enemy.sensor.ray_count = enemy.sensor.ray_count.clamp(1, 32);
        enemy.wander.max_step = enemy.wander.max_step.max(enemy.wander.min_step);
        enemy.wander.max_stuck_retries = enemy.wander.max_stuck_retries.max(1);

        self.hide.min_duration = self.hide.min_duration.max(0.01);
    }

    /// Seconds per tick.
    #[must_use]
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_hz.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.tick_hz, 50);
        assert!((config.dt() - 0.02).abs() < 1e-6);
        assert_eq!(config.enemy.aggro_range, 4.0);
        assert_eq!(config.hide.default_duration, 5.0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();
        config.tick_hz = 1;
        config.enemy.aggro_range = 8.0;
        config.enemy.lose_range = 2.0;
        config.enemy.sensor.ray_count = 0;

        config.validate();

        assert_eq!(config.tick_hz, 10);
        assert_eq!(config.enemy.lose_range, 8.0);
        assert_eq!(config.enemy.sensor.ray_count, 1);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("umbra.toml");

        let mut config = SimConfig::default();
        config.seed = 12345;
        config.enemy.chase_speed = 4.5;
        config.hide.lock_input_while_hidden = false;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("umbra.toml");
        fs::write(&config_path, "seed = 9\n[enemy]\naggro_range = 2.5\n").expect("write should succeed");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.seed, 9);
        assert_eq!(loaded.enemy.aggro_range, 2.5);
        assert_eq!(loaded.enemy.lose_range, 6.0);
        assert_eq!(loaded.tick_hz, 50);
    }

    #[test]
    fn test_config_load_missing_or_invalid_file() {
        let config = SimConfig::load_from("/nonexistent/path/umbra.toml");
        assert_eq!(config, SimConfig::default());

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("umbra.toml");
        fs::write(&config_path, "tick_hz = \"fast\"").expect("write should succeed");
        assert_eq!(SimConfig::load_from(&config_path), SimConfig::default());
    }
}
