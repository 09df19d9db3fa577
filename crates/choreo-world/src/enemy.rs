//! Enemy definitions and their fixed motion rules.

use choreo_core::Position;
use serde::{Deserialize, Serialize};

/// A deterministic motion pattern.
///
/// Every rule is a pure `Position -> Position` map, applied once per step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MotionRule {
    /// Never moves
    Stationary,
    /// Walks right one cell per step; once past `limit` it jumps to `restart`
    WrapX { limit: i32, restart: i32 },
    /// Walks down one cell per step; once past `limit` it jumps to `restart`
    WrapY { limit: i32, restart: i32 },
    /// Cycles through a fixed list of cells
    Route { waypoints: Vec<Position> },
}

impl MotionRule {
    pub fn advance(&self, pos: Position) -> Position {
        match self {
            MotionRule::Stationary => pos,
            MotionRule::WrapX { limit, restart } => Position {
                x: if pos.x > *limit { *restart } else { pos.x + 1 },
                ..pos
            },
            MotionRule::WrapY { limit, restart } => Position {
                y: if pos.y > *limit { *restart } else { pos.y + 1 },
                ..pos
            },
            MotionRule::Route { waypoints } => {
                if waypoints.is_empty() {
                    return pos;
                }
                match waypoints.iter().position(|waypoint| *waypoint == pos) {
                    Some(index) => waypoints[(index + 1) % waypoints.len()],
                    None => waypoints[0],
                }
            }
        }
    }
}

/// One enemy: where it starts and how it moves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyDefinition {
    pub start: Position,
    pub motion: MotionRule,
}

impl EnemyDefinition {
    pub fn new(start: Position, motion: MotionRule) -> Self {
        Self { start, motion }
    }

    pub fn advance(&self, pos: Position) -> Position {
        self.motion.advance(pos)
    }

    /// Positions after step 1, 2, 3, ... (the start is not included)
    pub fn trajectory(&self) -> impl Iterator<Item = Position> + '_ {
        let mut current = self.start;
        std::iter::repeat_with(move || {
            current = self.motion.advance(current);
            current
        })
    }

    /// Position after `steps` steps
    pub fn position_at(&self, steps: usize) -> Position {
        match steps {
            0 => self.start,
            n => self.trajectory().nth(n - 1).unwrap_or(self.start),
        }
    }
}
