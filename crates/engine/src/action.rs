use playctl_core::PlaybackState;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Actions the dispatcher knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    Play,
    Pause,
}

impl PlaybackAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackAction::Play => "play",
            PlaybackAction::Pause => "pause",
        }
    }

    /// State the context moves to once the remote call succeeds.
    pub fn target_state(&self) -> PlaybackState {
        match self {
            PlaybackAction::Play => PlaybackState::Playing,
            PlaybackAction::Pause => PlaybackState::Paused,
        }
    }

    /// Whether the remote side still needs this action.
    pub fn is_needed(&self, is_playing: bool) -> bool {
        match self {
            PlaybackAction::Play => !is_playing,
            PlaybackAction::Pause => is_playing,
        }
    }
}

impl fmt::Display for PlaybackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown playback action `{0}`")]
pub struct UnknownAction(pub String);

impl FromStr for PlaybackAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play" => Ok(PlaybackAction::Play),
            "pause" => Ok(PlaybackAction::Pause),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

/// Where a dispatch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStep {
    Query,
    Mutate,
}

impl fmt::Display for DispatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DispatchStep::Query => "query",
            DispatchStep::Mutate => "mutate",
        })
    }
}

/// Result of one dispatch. None of these are errors to the caller; the
/// controller has already logged whatever went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied(PlaybackState),
    AlreadySatisfied,
    NoActiveSession,
    ProviderFailed(DispatchStep),
    NotReady,
    UnknownAction,
}
