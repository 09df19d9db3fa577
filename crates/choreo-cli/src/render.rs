//! Plain-text board drawing.

use choreo_core::{Direction, Outcome, Position};
use choreo_engine::SimulationState;
use choreo_world::WorldModel;
use std::fmt::Write;

fn actor_glyph(facing: Direction) -> char {
    match facing {
        Direction::Up => '^',
        Direction::Down => 'v',
        Direction::Left => '<',
        Direction::Right => '>',
    }
}

/// Draw one frame: `T` target, `X` enemy, an arrow for the actor
pub fn render_board(world: &WorldModel, state: &SimulationState) -> String {
    let mut out = String::new();

    let status = match (state.outcome, state.current_step) {
        (Outcome::Running, Some(step)) => format!("step {}", step + 1),
        (Outcome::Win, _) | (Outcome::Lose, _) => {
            format!("{} (score {})", state.outcome, state.score)
        }
        (outcome, _) => outcome.to_string(),
    };
    let _ = writeln!(out, "{}", status);

    for y in 0..world.grid_size {
        let row: String = (0..world.grid_size)
            .map(|x| {
                let cell = Position::new(x, y);
                if cell == state.actor {
                    actor_glyph(state.facing)
                } else if state.enemy_at(cell) {
                    'X'
                } else if cell == world.target {
                    'T'
                } else {
                    '.'
                }
            })
            .flat_map(|glyph| [glyph, ' '])
            .collect();
        let _ = writeln!(out, "{}", row.trim_end());
    }

    out
}
