use neon_session_core::{InputFrame, Vec2};
use std::f64::consts::TAU;

/// Scripted control state for a headless player: circles and fires on
/// alternate seconds.
#[derive(Debug, Clone, Copy)]
pub struct Autopilot {
    /// Seconds per full circle
    pub period: f64,
    /// How far ahead of the avatar the pointer sits
    pub aim_distance: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            period: 6.0,
            aim_distance: 120.0,
        }
    }
}

impl Autopilot {
    pub fn frame(&self, game_time: f64, position: Vec2) -> InputFrame {
        let phase = TAU * (game_time / self.period);
        let (dx, dy) = (phase.cos() as f32, phase.sin() as f32);
        let firing = (game_time.floor() as i64) % 2 == 0;

        InputFrame::new()
            .with_movement(dx, dy)
            .with_pointer(
                position.x + dx * self.aim_distance,
                position.y + dy * self.aim_distance,
            )
            .with_key("fire", firing)
    }
}
