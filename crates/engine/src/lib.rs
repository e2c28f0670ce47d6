use async_trait::async_trait;
use playctl_core::PlaybackContext;

mod action;
mod controller;
mod error;
mod log;

pub use action::{DispatchOutcome, DispatchStep, PlaybackAction, UnknownAction};
pub use controller::{PlaybackController, PLAYBACK_SCOPES};
pub use error::ControlError;
pub use log::{ControlEvent, ControlLog, TracingLog};

/// Provider-independent playback control.
///
/// `setup` must succeed before the other operations do anything. `play` and
/// `pause` are best effort: they never fail from the caller's point of view.
#[async_trait]
pub trait AudioController: Send {
    async fn setup(&mut self) -> Result<(), ControlError>;
    async fn play(&mut self);
    async fn pause(&mut self);
    /// Accepted for every level; controllers may ignore it.
    async fn set_volume(&mut self, level: u8);
    fn context(&self) -> &PlaybackContext;
}
