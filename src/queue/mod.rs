// Queue management module
// Holds the playback queue and the rules for moving through it

pub mod sequencer;
pub mod session;

pub use sequencer::{RepeatMode, Sequencer, Transition};
pub use session::PlaybackSession;
