use crate::config::SpotifyConfig;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required credential `{0}`")]
    MissingCredential(&'static str),
    #[error("redirect uri `{uri}` is not a valid url: {reason}")]
    InvalidRedirectUri { uri: String, reason: String },
}

/// Client credentials for a provider's OAuth flow. All three values are
/// present and non-blank for any value of this type.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::resolve(
            Some(client_id.into()),
            Some(client_secret.into()),
            Some(redirect_uri.into()),
        )
    }

    pub fn resolve(
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_uri: Option<String>,
    ) -> Result<Self, ConfigError> {
        let client_id = required("client_id", client_id)?;
        let client_secret = required("client_secret", client_secret)?;
        let redirect_uri = required("redirect_uri", redirect_uri)?;

        if let Err(err) = Url::parse(&redirect_uri) {
            return Err(ConfigError::InvalidRedirectUri {
                uri: redirect_uri,
                reason: err.to_string(),
            });
        }

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

impl TryFrom<&SpotifyConfig> for Credentials {
    type Error = ConfigError;

    fn try_from(cfg: &SpotifyConfig) -> Result<Self, Self::Error> {
        Self::resolve(
            cfg.client_id.clone(),
            cfg.client_secret.clone(),
            cfg.redirect_uri.clone(),
        )
    }
}

// Keeps the secret out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

fn required(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingCredential(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, Credentials};
    use crate::config::SpotifyConfig;

    #[test]
    fn accepts_complete_credentials() {
        let creds = Credentials::new("id", "secret", "http://localhost:8080").unwrap();
        assert_eq!(creds.client_id(), "id");
        assert_eq!(creds.client_secret(), "secret");
        assert_eq!(creds.redirect_uri(), "http://localhost:8080");
    }

    #[test]
    fn reports_each_missing_field() {
        let err = Credentials::resolve(None, Some("s".into()), Some("http://x".into()));
        assert_eq!(err.unwrap_err(), ConfigError::MissingCredential("client_id"));

        let err = Credentials::resolve(Some("i".into()), None, Some("http://x".into()));
        assert_eq!(
            err.unwrap_err(),
            ConfigError::MissingCredential("client_secret")
        );

        let err = Credentials::resolve(Some("i".into()), Some("s".into()), None);
        assert_eq!(
            err.unwrap_err(),
            ConfigError::MissingCredential("redirect_uri")
        );
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = Credentials::new("id", "   ", "http://localhost").unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential("client_secret"));
    }

    #[test]
    fn rejects_unparseable_redirect_uri() {
        let err = Credentials::new("id", "secret", "not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRedirectUri { .. }));
    }

    #[test]
    fn debug_output_hides_secret() {
        let creds = Credentials::new("id", "hunter2", "http://localhost").unwrap();
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn converts_from_spotify_config() {
        let cfg = SpotifyConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            redirect_uri: Some("http://127.0.0.1:8888/callback".into()),
            ..SpotifyConfig::default()
        };
        assert!(Credentials::try_from(&cfg).is_ok());

        let empty = SpotifyConfig::default();
        assert_eq!(
            Credentials::try_from(&empty).unwrap_err(),
            ConfigError::MissingCredential("client_id")
        );
    }
}
