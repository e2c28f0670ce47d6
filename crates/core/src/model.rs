use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
    Buffering,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Buffering => "buffering",
        };
        f.write_str(label)
    }
}

/// What a controller believes about playback.
///
/// Only the owning controller writes it, and only after a mutation it issued
/// itself succeeded. A fresh context is `Stopped` with nothing else known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackContext {
    pub track_id: Option<String>,
    pub state: PlaybackState,
    pub progress_ms: Option<u64>,
    pub timestamp: Option<SystemTime>,
}

impl PlaybackContext {
    pub fn is_pristine(&self) -> bool {
        *self == Self::default()
    }
}

/// Permission scopes requested from a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Scope {
    ModifyPlaybackState,
    ReadPlaybackState,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::ModifyPlaybackState => "user-modify-playback-state",
            Scope::ReadPlaybackState => "user-read-playback-state",
        }
    }

    pub fn join(scopes: &[Scope]) -> String {
        scopes
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{PlaybackContext, PlaybackState, Scope};

    #[test]
    fn fresh_context_is_stopped_and_empty() {
        let ctx = PlaybackContext::default();
        assert_eq!(ctx.state, PlaybackState::Stopped);
        assert!(ctx.track_id.is_none());
        assert!(ctx.progress_ms.is_none());
        assert!(ctx.timestamp.is_none());
        assert!(ctx.is_pristine());
    }

    #[test]
    fn scopes_join_with_spaces() {
        let joined = Scope::join(&[Scope::ModifyPlaybackState, Scope::ReadPlaybackState]);
        assert_eq!(
            joined,
            "user-modify-playback-state user-read-playback-state"
        );
    }
}
