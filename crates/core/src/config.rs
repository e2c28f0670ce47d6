use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub token_cache: Option<PathBuf>,
    pub api_base_url: String,
    pub accounts_base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            token_cache: None,
            api_base_url: "https://api.spotify.com/v1".to_string(),
            accounts_base_url: "https://accounts.spotify.com".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub log_file_level: String,
    pub spotify: SpotifyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: "info".to_string(),
            log_file: None,
            log_file_level: "playctl=debug,playctl_engine=debug,playctl_providers=debug"
                .to_string(),
            spotify: SpotifyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Overlays environment values on top of the file config. Blank values
    /// are ignored so an empty `.env` entry never erases a configured one.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_blank("SPOTIPY_CLIENT_ID") {
            self.spotify.client_id = Some(v);
        }
        if let Some(v) = non_blank("SPOTIPY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(v);
        }
        if let Some(v) = non_blank("SPOTIPY_REDIRECT_URI") {
            self.spotify.redirect_uri = Some(v);
        }
        if let Some(v) = non_blank("PLAYCTL_TOKEN_CACHE") {
            self.spotify.token_cache = Some(PathBuf::from(v));
        }
        if let Some(v) = non_blank("PLAYCTL_LOG_LEVEL") {
            self.log_level = v;
        }
    }
}
