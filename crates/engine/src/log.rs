//! Diagnostic events emitted by the controller.
//!
//! The controller never logs directly; it hands a [`ControlEvent`] to the
//! [`ControlLog`] it was built with. [`TracingLog`] forwards events to
//! `tracing`, tests plug in a recorder.

use crate::action::{DispatchStep, PlaybackAction};
use playctl_core::PlaybackState;
use tracing::{debug, error, info, Level};

#[derive(Debug)]
pub enum ControlEvent<'a> {
    SessionEstablished {
        provider: &'static str,
    },
    NotReady {
        action: PlaybackAction,
    },
    NoActiveSession {
        action: PlaybackAction,
    },
    AlreadySatisfied {
        action: PlaybackAction,
        is_playing: bool,
    },
    Applied {
        action: PlaybackAction,
        state: PlaybackState,
    },
    ProviderFailed {
        action: PlaybackAction,
        step: DispatchStep,
        error: &'a anyhow::Error,
    },
    UnknownAction {
        tag: &'a str,
    },
    VolumeIgnored {
        level: u8,
    },
}

impl ControlEvent<'_> {
    pub fn level(&self) -> Level {
        match self {
            ControlEvent::AlreadySatisfied { .. } | ControlEvent::VolumeIgnored { .. } => {
                Level::DEBUG
            }
            ControlEvent::SessionEstablished { .. } | ControlEvent::Applied { .. } => Level::INFO,
            ControlEvent::NotReady { .. }
            | ControlEvent::NoActiveSession { .. }
            | ControlEvent::ProviderFailed { .. }
            | ControlEvent::UnknownAction { .. } => Level::ERROR,
        }
    }
}

pub trait ControlLog: Send + Sync {
    fn record(&self, event: &ControlEvent<'_>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ControlLog for TracingLog {
    fn record(&self, event: &ControlEvent<'_>) {
        match event {
            ControlEvent::SessionEstablished { provider } => {
                info!(provider, "playback session established");
            }
            ControlEvent::NotReady { action } => {
                error!(action = %action, "controller used before setup; action dropped");
            }
            ControlEvent::NoActiveSession { action } => {
                error!(action = %action, "no active playback session; action abandoned");
            }
            ControlEvent::AlreadySatisfied { action, is_playing } => {
                debug!(action = %action, is_playing, "already in requested state");
            }
            ControlEvent::Applied { action, state } => {
                info!(action = %action, state = %state, "playback action applied");
            }
            ControlEvent::ProviderFailed {
                action,
                step,
                error,
            } => {
                let error = format!("{error:#}");
                error!(action = %action, step = %step, error = %error, "provider call failed");
            }
            ControlEvent::UnknownAction { tag } => {
                error!(tag, "unknown playback action; ignored");
            }
            ControlEvent::VolumeIgnored { level } => {
                debug!(level, "volume control not supported; request ignored");
            }
        }
    }
}
