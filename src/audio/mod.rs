// Audio playback module
// rodio output behind a trait, the engine that drives it, and the controller on top

pub mod engine;
pub mod output;
pub mod player;
pub mod position;

pub use engine::{PlaybackEngine, PlaybackState};
pub use output::{AudioOutput, RodioOutput};
pub use player::{PlaybackSnapshot, PlayerController};
