// Decides what plays after a track ends or the user skips
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::queue::session::PlaybackSession;

/// Below this position "previous" goes back a track; at or above it restarts the current one
pub const DEFAULT_PREVIOUS_THRESHOLD_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop at the end of the queue
    #[default]
    None,
    /// Loop the whole queue
    All,
    /// Loop the current track
    One,
}

impl RepeatMode {
    /// None -> All -> One -> None, the order of the repeat button
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::None,
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepeatMode::None => "none",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        };
        f.write_str(name)
    }
}

impl FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(RepeatMode::None),
            "all" => Ok(RepeatMode::All),
            "one" | "single" => Ok(RepeatMode::One),
            other => Err(format!("unknown repeat mode '{other}' (expected none, all or one)")),
        }
    }
}

/// Outcome of a sequencing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Start the track at this queue index
    Play(usize),
    /// Replay the current track from position 0
    Restart,
    /// Stop playback, leaving the cursor where it is
    Stop,
    /// Nothing to do
    Stay,
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    previous_threshold_secs: f64,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIOUS_THRESHOLD_SECS)
    }
}

impl Sequencer {
    pub fn new(previous_threshold_secs: f64) -> Self {
        Self {
            previous_threshold_secs,
        }
    }

    /// The current track finished on its own.
    ///
    /// With shuffle on the queue never runs out, whatever the repeat mode.
    pub fn on_completion<R: Rng + ?Sized>(&self, session: &PlaybackSession, rng: &mut R) -> Transition {
        let Some((index, len)) = cursor(session) else {
            return Transition::Stay;
        };

        match (session.repeat(), session.shuffle()) {
            (RepeatMode::One, _) => Transition::Restart,
            (_, true) => Transition::Play(random_other(len, index, rng)),
            (RepeatMode::All, false) => Transition::Play((index + 1) % len),
            (RepeatMode::None, false) if index + 1 < len => Transition::Play(index + 1),
            (RepeatMode::None, false) => Transition::Stop,
        }
    }

    /// Explicit "next". Like completion, but the last track of a
    /// non-repeating queue stays put instead of stopping.
    pub fn next<R: Rng + ?Sized>(&self, session: &PlaybackSession, rng: &mut R) -> Transition {
        match self.on_completion(session, rng) {
            Transition::Stop => Transition::Stay,
            other => other,
        }
    }

    /// Explicit "previous" at the given playback position.
    pub fn previous<R: Rng + ?Sized>(
        &self,
        session: &PlaybackSession,
        position_secs: f64,
        rng: &mut R,
    ) -> Transition {
        let Some((index, len)) = cursor(session) else {
            return Transition::Stay;
        };

        if position_secs >= self.previous_threshold_secs {
            return Transition::Restart;
        }

        match (session.repeat(), session.shuffle()) {
            (RepeatMode::One, _) => Transition::Restart,
            (_, true) if len > 1 => Transition::Play(random_other(len, index, rng)),
            (_, true) => Transition::Restart,
            (RepeatMode::All, false) if index == 0 => Transition::Play(len - 1),
            (_, false) if index > 0 => Transition::Play(index - 1),
            (_, false) => Transition::Restart,
        }
    }
}

fn cursor(session: &PlaybackSession) -> Option<(usize, usize)> {
    let len = session.len();
    session
        .current_index()
        .filter(|&index| index < len)
        .map(|index| (index, len))
}

/// Uniform pick over every index except `current`; `current` itself when it is the only one
fn random_other<R: Rng + ?Sized>(len: usize, current: usize, rng: &mut R) -> usize {
    if len <= 1 {
        return current;
    }
    let pick = rng.gen_range(0..len - 1);
    if pick >= current {
        pick + 1
    } else {
        pick
    }
}
