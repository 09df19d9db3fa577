//! The immutable world description.

use crate::enemy::{EnemyDefinition, MotionRule};
use choreo_core::{Direction, Error, Position, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Largest accepted side length; boards are rendered cell by cell
pub const MAX_GRID_SIZE: i32 = 256;

/// Square grid, target cell, actor start pose and enemies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldModel {
    /// Side length of the square grid
    pub grid_size: i32,
    pub target: Position,
    pub actor_start: Position,
    pub actor_facing: Direction,
    #[serde(default)]
    pub enemies: Vec<EnemyDefinition>,
}

impl WorldModel {
    /// The stock puzzle: 10x10 grid, target in the far corner, two patrolling enemies
    pub fn reference() -> Self {
        Self {
            grid_size: 10,
            target: Position::new(9, 9),
            actor_start: Position::new(0, 0),
            actor_facing: Direction::Right,
            enemies: vec![
                EnemyDefinition::new(
                    Position::new(5, 5),
                    MotionRule::WrapX { limit: 7, restart: 3 },
                ),
                EnemyDefinition::new(
                    Position::new(2, 2),
                    MotionRule::WrapY { limit: 6, restart: 0 },
                ),
            ],
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.within(self.grid_size)
    }

    pub fn enemy_starts(&self) -> Vec<Position> {
        self.enemies.iter().map(|enemy| enemy.start).collect()
    }

    /// Check the grid size bounds and that every fixed cell lies on the grid
    pub fn validate(&self) -> Result<()> {
        if self.grid_size <= 0 || self.grid_size > MAX_GRID_SIZE {
            return Err(Error::Validation(format!(
                "grid size must be between 1 and {}, got {}",
                MAX_GRID_SIZE, self.grid_size
            )));
        }
        if !self.contains(self.target) {
            return Err(Error::Validation(format!(
                "target {} is outside the {}x{} grid",
                self.target, self.grid_size, self.grid_size
            )));
        }
        if !self.contains(self.actor_start) {
            return Err(Error::Validation(format!(
                "actor start {} is outside the {}x{} grid",
                self.actor_start, self.grid_size, self.grid_size
            )));
        }
        for (index, enemy) in self.enemies.iter().enumerate() {
            if !self.contains(enemy.start) {
                return Err(Error::Validation(format!(
                    "enemy {} starts at {}, outside the grid",
                    index, enemy.start
                )));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let world: WorldModel = serde_json::from_str(json)?;
        world.validate()?;
        Ok(world)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let world = Self::from_json(&contents)?;
        debug!(
            path = %path.display(),
            grid_size = world.grid_size,
            enemies = world.enemies.len(),
            "Loaded world description"
        );
        Ok(world)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for WorldModel {
    fn default() -> Self {
        Self::reference()
    }
}
