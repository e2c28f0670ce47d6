use crate::error::SpotifyError;
use playctl_core::Scope;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: u64 = 60;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// OAuth access token as returned by the accounts service, plus the absolute
/// expiry computed when it was received.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    pub expires_in: u64,
    #[serde(default)]
    pub expires_at: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Token {
    pub fn stamped(mut self, now_secs: u64) -> Self {
        self.expires_at = now_secs.saturating_add(self.expires_in);
        self
    }

    pub fn is_expired_at(&self, now_secs: u64) -> bool {
        self.expires_at <= now_secs.saturating_add(EXPIRY_MARGIN_SECS)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }

    pub fn covers(&self, scopes: &[Scope]) -> bool {
        let granted: HashSet<&str> = self.scope.split_whitespace().collect();
        scopes.iter().all(|s| granted.contains(s.as_str()))
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// JSON file holding the last token. Without a path nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    path: Option<PathBuf>,
}

impl TokenCache {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub async fn load(&self) -> Result<Option<Token>, SpotifyError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(None);
        };

        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cached token");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str::<Token>(&data) {
            Ok(token) => Ok(Some(token)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable token cache");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, token: &Token) -> Result<(), SpotifyError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(token)
            .map_err(|e| SpotifyError::Parse(format!("failed to encode token: {e}")))?;
        tokio::fs::write(path, json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        debug!(path = %path.display(), "token cached");
        Ok(())
    }
}
