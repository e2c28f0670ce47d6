use crate::error::SpotifyError;
use crate::oauth::{AuthorizationPrompt, SpotifyOAuth};
use crate::token::{Token, TokenCache};
use crate::{Authenticator, PlaybackProvider, RemotePlaybackSnapshot};
use anyhow::Result;
use async_trait::async_trait;
use playctl_core::{Credentials, Scope, SpotifyConfig};
use reqwest::header::{CONTENT_LENGTH, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER_NAME: &str = "spotify";

#[derive(Debug, Deserialize)]
struct CurrentPlayback {
    #[serde(default)]
    is_playing: bool,
    progress_ms: Option<u64>,
    item: Option<PlayingItem>,
    device: Option<Device>,
}

#[derive(Debug, Deserialize)]
struct PlayingItem {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Device {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl From<CurrentPlayback> for RemotePlaybackSnapshot {
    fn from(p: CurrentPlayback) -> Self {
        let (track_id, track_name) = match p.item {
            Some(item) => (item.id, item.name),
            None => (None, None),
        };
        Self {
            provider_name: PROVIDER_NAME,
            is_playing: p.is_playing,
            track_id,
            track_name,
            device_name: p.device.and_then(|d| d.name),
            progress_ms: p.progress_ms,
        }
    }
}

/// Creates [`SpotifySession`]s through the OAuth authorization-code flow.
pub struct SpotifyAuthenticator {
    http: Client,
    api_url: String,
    oauth: SpotifyOAuth,
}

impl SpotifyAuthenticator {
    pub fn new(cfg: &SpotifyConfig, cache: TokenCache) -> Result<Self, SpotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("playctl/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            oauth: SpotifyOAuth::new(http.clone(), cfg.accounts_base_url.clone(), cache),
            api_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn AuthorizationPrompt>) -> Self {
        self.oauth = self.oauth.with_prompt(prompt);
        self
    }
}

#[async_trait]
impl Authenticator for SpotifyAuthenticator {
    type Session = SpotifySession;

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
        scopes: &[Scope],
    ) -> Result<Self::Session> {
        let token = self.oauth.obtain_token(credentials, scopes).await?;
        Ok(SpotifySession {
            http: self.http.clone(),
            api_url: self.api_url.clone(),
            oauth: self.oauth.clone(),
            credentials: credentials.clone(),
            token,
        })
    }
}

/// Authenticated handle on the Spotify Web API player endpoints.
pub struct SpotifySession {
    http: Client,
    api_url: String,
    oauth: SpotifyOAuth,
    credentials: Credentials,
    token: Token,
}

impl SpotifySession {
    async fn access_token(&mut self) -> Result<String, SpotifyError> {
        if self.token.is_expired() {
            let token = self.oauth.refresh(&self.credentials, &self.token).await?;
            if let Err(err) = self.oauth.cache().save(&token).await {
                warn!(error = %err, "failed to persist refreshed token");
            }
            self.token = token;
        }
        Ok(self.token.access_token.clone())
    }

    async fn fetch_playback(&mut self) -> Result<Option<CurrentPlayback>, SpotifyError> {
        let token = self.access_token().await?;
        let url = format!("{}/me/player", self.api_url);
        debug!(url = %url, "querying current playback");

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let response = check(response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| SpotifyError::Parse(format!("failed to parse playback state: {e}")))
    }

    async fn send_command(
        &mut self,
        command: &str,
        device_id: Option<&str>,
    ) -> Result<(), SpotifyError> {
        let token = self.access_token().await?;
        let url = format!("{}/me/player/{}", self.api_url, command);
        debug!(url = %url, device_id = ?device_id, "sending player command");

        let mut request = self
            .http
            .put(&url)
            .bearer_auth(token)
            .header(CONTENT_LENGTH, "0");
        if let Some(id) = device_id {
            request = request.query(&[("device_id", id)]);
        }

        check(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl PlaybackProvider for SpotifySession {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn current_playback(&mut self) -> Result<Option<RemotePlaybackSnapshot>> {
        Ok(self.fetch_playback().await?.map(RemotePlaybackSnapshot::from))
    }

    async fn start_playback(&mut self, device_id: Option<&str>) -> Result<()> {
        Ok(self.send_command("play", device_id).await?)
    }

    async fn pause_playback(&mut self, device_id: Option<&str>) -> Result<()> {
        Ok(self.send_command("pause", device_id).await?)
    }
}

async fn check(response: Response) -> Result<Response, SpotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        return Err(SpotifyError::RateLimited { retry_after_secs });
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|b| b.error.message)
        .unwrap_or(text);
    Err(SpotifyError::Api {
        status: status.as_u16(),
        message,
    })
}
