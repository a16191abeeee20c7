//! Level loading.
//!
//! A level is a TOML file describing static obstacles, hide spots, an
//! optional spot puzzle, enemy spawns and the scripted player route.
//! Definitions are validated before anything is built from them.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use umbra_common::{SpotId, UmbraError};
use umbra_gameplay::hide::ItemKind;
use umbra_gameplay::hide_spot::{ExitAnchors, HideSpot, HideSpotRegistry};
use umbra_gameplay::puzzle::SequencePuzzle;
use umbra_gameplay::wander::RoamBounds;
use umbra_gameplay::world::{ObstacleShape, ObstacleWorld};

/// Errors that can occur during level loading.
#[derive(Debug, Error)]
pub enum LevelLoadError {
    /// File not found.
    #[error("Level file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read level file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse level TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error.
    #[error("Level validation error: {0}")]
    ValidationError(String),

    /// Duplicate spot ID.
    #[error("Duplicate hide spot ID: {0}")]
    DuplicateSpot(SpotId),

    /// Puzzle references a spot that does not exist.
    #[error("Puzzle references unknown spot: {0}")]
    UnknownSpot(SpotId),

    /// Building runtime objects failed.
    #[error(transparent)]
    Build(#[from] UmbraError),
}

/// Result type for level loading operations.
pub type LevelLoadResult<T> = Result<T, LevelLoadError>;

/// A hide spot definition from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotDefinition {
    /// Spot id, also used by the puzzle.
    pub id: u32,
    /// Spot position.
    pub position: Vec2,
    /// Hide duration override (0 = player default).
    #[serde(default)]
    pub hide_seconds: f32,
    /// Interaction trigger radius.
    #[serde(default = "default_trigger_radius")]
    pub trigger_radius: f32,
    /// Optional exit anchors.
    #[serde(default)]
    pub exits: ExitAnchors,
}

const fn default_trigger_radius() -> f32 {
    HideSpot::DEFAULT_TRIGGER_RADIUS
}

/// An enemy spawn from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySpawn {
    /// Spawn position.
    pub position: Vec2,
    /// Roam area (unbounded when absent).
    #[serde(default)]
    pub roam: Option<RoamBounds>,
}

/// Player start and scripted route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerDefinition {
    /// Start position.
    pub position: Vec2,
    /// Equipped item at start.
    #[serde(default)]
    pub equipped: Option<ItemKind>,
    /// Waypoints walked in order; reaching one inside a spot trigger hides there.
    #[serde(default)]
    pub route: Vec<Vec2>,
}

/// Spot sequence puzzle from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleDefinition {
    /// Spot ids in solving order.
    pub order: Vec<u32>,
}

/// A complete level definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDefinition {
    /// Display name.
    pub name: String,
    /// Static obstacles.
    #[serde(default)]
    pub obstacles: Vec<ObstacleShape>,
    /// Hide spots.
    #[serde(default)]
    pub spots: Vec<SpotDefinition>,
    /// Optional spot puzzle.
    #[serde(default)]
    pub puzzle: Option<PuzzleDefinition>,
    /// Enemy spawns.
    #[serde(default)]
    pub enemies: Vec<EnemySpawn>,
    /// Player setup.
    #[serde(default)]
    pub player: PlayerDefinition,
}

impl LevelDefinition {
    /// Loads and validates a level file.
    pub fn load<P: AsRef<Path>>(path: P) -> LevelLoadResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LevelLoadError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let level = Self::from_toml_str(&contents)?;
        info!(
            "Loaded level '{}' from {} ({} obstacles, {} spots, {} enemies)",
            level.name,
            path.display(),
            level.obstacles.len(),
            level.spots.len(),
            level.enemies.len()
        );
        Ok(level)
    }

    /// Parses and validates a level from TOML text.
    pub fn from_toml_str(contents: &str) -> LevelLoadResult<Self> {
        let level: Self = toml::from_str(contents)?;
        level.validate()?;
        Ok(level)
    }

    /// Validates the level definition.
    pub fn validate(&self) -> LevelLoadResult<()> {
        if self.name.trim().is_empty() {
            return Err(LevelLoadError::ValidationError("Level has empty name".to_string()));
        }

        for (i, shape) in self.obstacles.iter().enumerate() {
            match *shape {
                ObstacleShape::Circle { center, radius } => {
                    if !center.is_finite() || !radius.is_finite() || radius <= 0.0 {
                        return Err(LevelLoadError::ValidationError(format!(
                            "Obstacle {i} has invalid circle (radius {radius})"
                        )));
                    }
                },
                ObstacleShape::Rect { min, max } => {
                    if !min.is_finite() || !max.is_finite() || min.cmpgt(max).any() {
                        return Err(LevelLoadError::ValidationError(format!(
                            "Obstacle {i} has min {min} above max {max}"
                        )));
                    }
                },
            }
        }

        let mut ids = HashSet::new();
        for spot in &self.spots {
            if !ids.insert(spot.id) {
                return Err(LevelLoadError::DuplicateSpot(SpotId::new(spot.id)));
            }
            if !spot.position.is_finite() || !spot.hide_seconds.is_finite() {
                return Err(LevelLoadError::ValidationError(format!(
                    "Spot {} has non-finite values",
                    spot.id
                )));
            }
            if spot.trigger_radius < 0.0 {
                return Err(LevelLoadError::ValidationError(format!(
                    "Spot {} has negative trigger radius",
                    spot.id
                )));
            }
        }

        if let Some(puzzle) = &self.puzzle {
            if let Some(missing) = puzzle.order.iter().find(|id| !ids.contains(*id)) {
                return Err(LevelLoadError::UnknownSpot(SpotId::new(*missing)));
            }
        }

        for (i, enemy) in self.enemies.iter().enumerate() {
            if let Some(RoamBounds::Circle { radius, .. }) = enemy.roam {
                if radius < 0.0 {
                    return Err(LevelLoadError::ValidationError(format!(
                        "Enemy {i} has negative roam radius"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Builds the obstacle world.
    #[must_use]
    pub fn build_world(&self) -> ObstacleWorld {
        let mut world = ObstacleWorld::new();
        for shape in &self.obstacles {
            world.add(*shape);
        }
        debug!("Built world with {} obstacles", world.len());
        world
    }

    /// Builds the hide spot registry.
    pub fn build_spots(&self) -> LevelLoadResult<HideSpotRegistry> {
        let mut registry = HideSpotRegistry::new();
        for def in &self.spots {
            registry.insert(
                HideSpot::new(SpotId::new(def.id), def.position)
                    .with_hide_seconds(def.hide_seconds)
                    .with_trigger_radius(def.trigger_radius)
                    .with_exits(def.exits),
            )?;
        }
        Ok(registry)
    }

    /// Builds the spot puzzle, if the level has one.
    #[must_use]
    pub fn build_puzzle(&self) -> Option<SequencePuzzle> {
        self.puzzle
            .as_ref()
            .map(|p| SequencePuzzle::new(p.order.iter().copied().map(SpotId::new).collect()))
    }
}
