use anyhow::Result;
use async_trait::async_trait;
use playctl_core::{Credentials, Scope};

mod error;
mod oauth;
mod spotify;
mod token;

pub use error::SpotifyError;
pub use oauth::{authorization_code, AuthorizationPrompt, SpotifyOAuth};
pub use spotify::{SpotifyAuthenticator, SpotifySession};
pub use token::{Token, TokenCache};

/// Point-in-time read of a provider's playback status. Lives only as long
/// as the decision that consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemotePlaybackSnapshot {
    pub provider_name: &'static str,
    pub is_playing: bool,
    pub track_id: Option<String>,
    pub track_name: Option<String>,
    pub device_name: Option<String>,
    pub progress_ms: Option<u64>,
}

/// An authenticated session able to read and mutate playback.
///
/// `device_id: None` targets whichever device the provider considers active.
#[async_trait]
pub trait PlaybackProvider: Send {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the provider has no active playback session.
    async fn current_playback(&mut self) -> Result<Option<RemotePlaybackSnapshot>>;
    async fn start_playback(&mut self, device_id: Option<&str>) -> Result<()>;
    async fn pause_playback(&mut self, device_id: Option<&str>) -> Result<()>;
}

/// Builds provider sessions from client credentials.
#[async_trait]
pub trait Authenticator: Send + Sync {
    type Session: PlaybackProvider;

    fn provider_name(&self) -> &'static str;
    async fn authenticate(
        &self,
        credentials: &Credentials,
        scopes: &[Scope],
    ) -> Result<Self::Session>;
}
