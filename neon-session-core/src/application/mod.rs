mod consumer;
pub mod reconcile;
mod smoothing;

pub use consumer::GameStateConsumer;
pub use reconcile::{
    apply_lite_snapshot, apply_snapshot, lite_snapshot, reconcile_players, spawn_projectile,
    DEFAULT_CORRECTION_THRESHOLD,
};
pub use smoothing::{HardOverwrite, Smoothing};
