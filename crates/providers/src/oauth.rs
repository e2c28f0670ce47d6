//! Authorization-code flow against the Spotify accounts service.

use crate::error::SpotifyError;
use crate::token::{unix_now, Token, TokenCache};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use playctl_core::{Credentials, Scope};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Interactive step of the authorization-code flow: show the authorize URL
/// to the user and hand back the URL the browser was redirected to.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    async fn redirected_url(&self, authorize_url: &Url) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    scope: Option<String>,
    expires_in: u64,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    error: String,
    error_description: Option<String>,
}

#[derive(Clone)]
pub struct SpotifyOAuth {
    http: Client,
    accounts_url: String,
    cache: TokenCache,
    prompt: Option<Arc<dyn AuthorizationPrompt>>,
}

impl SpotifyOAuth {
    pub fn new(http: Client, accounts_url: impl Into<String>, cache: TokenCache) -> Self {
        Self {
            http,
            accounts_url: accounts_url.into().trim_end_matches('/').to_string(),
            cache,
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn AuthorizationPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn authorize_url(
        &self,
        credentials: &Credentials,
        scopes: &[Scope],
        state: &str,
    ) -> Result<Url, SpotifyError> {
        let scope = Scope::join(scopes);
        Url::parse_with_params(
            &format!("{}/authorize", self.accounts_url),
            &[
                ("client_id", credentials.client_id()),
                ("response_type", "code"),
                ("redirect_uri", credentials.redirect_uri()),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| SpotifyError::Parse(format!("invalid accounts url: {e}")))
    }

    pub async fn exchange_code(
        &self,
        credentials: &Credentials,
        code: &str,
    ) -> Result<Token, SpotifyError> {
        debug!("exchanging authorization code");
        self.request_token(
            credentials,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", credentials.redirect_uri()),
            ],
        )
        .await
    }

    /// Refreshes `previous`. Fields the accounts service leaves out of the
    /// response (refresh token, scope) carry over from `previous`.
    pub async fn refresh(
        &self,
        credentials: &Credentials,
        previous: &Token,
    ) -> Result<Token, SpotifyError> {
        let refresh_token = previous
            .refresh_token
            .as_deref()
            .ok_or_else(|| SpotifyError::Auth("token has no refresh token".to_string()))?;

        debug!("refreshing access token");
        let mut token = self
            .request_token(
                credentials,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ],
            )
            .await?;

        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        if token.scope.is_empty() {
            token.scope = previous.scope.clone();
        }
        Ok(token)
    }

    /// Returns a usable token: the cached one, a refreshed one, or a new one
    /// from the interactive prompt. Fresh tokens are written back to the cache.
    pub async fn obtain_token(
        &self,
        credentials: &Credentials,
        scopes: &[Scope],
    ) -> Result<Token> {
        if let Some(cached) = self.cache.load().await? {
            if !cached.covers(scopes) {
                info!(granted = %cached.scope, "cached token lacks required scopes; reauthorizing");
            } else if !cached.is_expired() {
                debug!("using cached token");
                return Ok(cached);
            } else if cached.refresh_token.is_some() {
                match self.refresh(credentials, &cached).await {
                    Ok(token) => {
                        self.cache.save(&token).await?;
                        return Ok(token);
                    }
                    Err(err) => {
                        warn!(error = %err, "token refresh failed; reauthorizing");
                    }
                }
            }
        }

        let prompt = self.prompt.as_ref().ok_or_else(|| {
            anyhow!("no usable cached token and no interactive authorization available")
        })?;

        let state = Uuid::new_v4().simple().to_string();
        let url = self.authorize_url(credentials, scopes, &state)?;
        let redirected = prompt
            .redirected_url(&url)
            .await
            .context("authorization prompt failed")?;
        let code = authorization_code(&redirected, &state)?;

        let token = self.exchange_code(credentials, &code).await?;
        self.cache.save(&token).await?;
        info!("spotify authorization complete");
        Ok(token)
    }

    async fn request_token(
        &self,
        credentials: &Credentials,
        form: &[(&str, &str)],
    ) -> Result<Token, SpotifyError> {
        let url = format!("{}/api/token", self.accounts_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(credentials.client_id(), Some(credentials.client_secret()))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: TokenResponse = response.json().await.map_err(|e| {
                SpotifyError::Parse(format!("failed to parse token response: {e}"))
            })?;
            let token = Token {
                access_token: body.access_token,
                token_type: body.token_type.unwrap_or_else(|| "Bearer".to_string()),
                scope: body.scope.unwrap_or_default(),
                expires_in: body.expires_in,
                expires_at: 0,
                refresh_token: body.refresh_token,
            };
            Ok(token.stamped(unix_now()))
        } else {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<AuthErrorBody>(&text) {
                Ok(body) => match body.error_description {
                    Some(desc) => format!("{}: {}", body.error, desc),
                    None => body.error,
                },
                Err(_) => format!("status {status}: {text}"),
            };
            Err(SpotifyError::Auth(message))
        }
    }
}

/// Extracts the authorization code from the URL the provider redirected to,
/// checking that `state` matches the one sent with the authorize request.
pub fn authorization_code(
    redirected_url: &str,
    expected_state: &str,
) -> Result<String, SpotifyError> {
    let url = Url::parse(redirected_url.trim())
        .map_err(|e| SpotifyError::AuthorizationResponse(format!("not a valid url: {e}")))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => {
                return Err(SpotifyError::AuthorizationResponse(format!(
                    "authorization denied: {value}"
                )))
            }
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(SpotifyError::AuthorizationResponse("state mismatch".to_string()));
    }
    code.ok_or_else(|| SpotifyError::AuthorizationResponse("missing code".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SCOPES: [Scope; 2] = [Scope::ModifyPlaybackState, Scope::ReadPlaybackState];

    fn creds() -> Credentials {
        Credentials::new("id", "secret", "http://localhost:8080/callback").unwrap()
    }

    fn cached_token(expires_at: u64, scope: &str) -> Token {
        Token {
            access_token: "cached".to_string(),
            token_type: "Bearer".to_string(),
            scope: scope.to_string(),
            expires_in: 3600,
            expires_at,
            refresh_token: Some("old-refresh".to_string()),
        }
    }

    /// Answers the prompt by echoing the state back with a fixed code.
    struct EchoPrompt {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AuthorizationPrompt for EchoPrompt {
        async fn redirected_url(&self, authorize_url: &Url) -> Result<String> {
            self.seen.lock().unwrap().push(authorize_url.to_string());
            let state = authorize_url
                .query_pairs()
                .find(|(k, _)| k == "state")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            Ok(format!("http://localhost:8080/callback?code=the-code&state={state}"))
        }
    }

    #[test]
    fn authorize_url_carries_client_and_scopes() {
        let oauth = SpotifyOAuth::new(
            Client::new(),
            "https://accounts.example/",
            TokenCache::default(),
        );
        let url = oauth.authorize_url(&creds(), &SCOPES, "xyz").unwrap();

        assert_eq!(url.path(), "/authorize");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "id".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&(
            "scope".into(),
            "user-modify-playback-state user-read-playback-state".into()
        )));
        assert!(pairs.contains(&("state".into(), "xyz".into())));
    }

    #[test]
    fn authorization_code_checks_state() {
        let code =
            authorization_code("http://localhost/callback?code=abc&state=s1", "s1").unwrap();
        assert_eq!(code, "abc");

        let err = authorization_code("http://localhost/callback?code=abc&state=s2", "s1");
        assert!(matches!(err, Err(SpotifyError::AuthorizationResponse(_))));
    }

    #[test]
    fn authorization_code_surfaces_denial() {
        let err = authorization_code("http://localhost/callback?error=access_denied&state=s", "s")
            .unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[tokio::test]
    async fn exchanges_code_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(header("Authorization", "Basic aWQ6c2VjcmV0"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "token_type": "Bearer",
                "scope": "user-modify-playback-state user-read-playback-state",
                "expires_in": 3600,
                "refresh_token": "refresh"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oauth = SpotifyOAuth::new(Client::new(), server.uri(), TokenCache::default());
        let token = oauth.exchange_code(&creds(), "the-code").await.unwrap();

        assert_eq!(token.access_token, "fresh");
        assert!(token.expires_at >= unix_now() + 3_000);
        assert!(token.covers(&SCOPES));
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token_and_scope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "renewed",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let oauth = SpotifyOAuth::new(Client::new(), server.uri(), TokenCache::default());
        let previous = cached_token(0, "user-read-playback-state");
        let token = oauth.refresh(&creds(), &previous).await.unwrap();

        assert_eq!(token.access_token, "renewed");
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.scope, "user-read-playback-state");
    }

    #[tokio::test]
    async fn rejected_grant_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code"
            })))
            .mount(&server)
            .await;

        let oauth = SpotifyOAuth::new(Client::new(), server.uri(), TokenCache::default());
        let err = oauth.exchange_code(&creds(), "bad").await.unwrap_err();

        match err {
            SpotifyError::Auth(msg) => assert!(msg.contains("invalid_grant")),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_cached_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(Some(dir.path().join("token.json")));
        let cached = cached_token(
            unix_now() + 3_600,
            "user-modify-playback-state user-read-playback-state",
        );
        cache.save(&cached).await.unwrap();

        let oauth = SpotifyOAuth::new(Client::new(), server.uri(), cache);
        let token = oauth.obtain_token(&creds(), &SCOPES).await.unwrap();
        assert_eq!(token.access_token, "cached");
    }

    #[tokio::test]
    async fn expired_cached_token_is_refreshed_and_saved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "renewed",
                "scope": "user-modify-playback-state user-read-playback-state",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(Some(dir.path().join("token.json")));
        cache
            .save(&cached_token(
                1,
                "user-modify-playback-state user-read-playback-state",
            ))
            .await
            .unwrap();

        let oauth = SpotifyOAuth::new(Client::new(), server.uri(), cache.clone());
        let token = oauth.obtain_token(&creds(), &SCOPES).await.unwrap();

        assert_eq!(token.access_token, "renewed");
        let stored = cache.load().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "renewed");
    }

    #[tokio::test]
    async fn missing_token_goes_through_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("code=the-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "from-prompt",
                "scope": "user-modify-playback-state user-read-playback-state",
                "expires_in": 3600,
                "refresh_token": "r"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let prompt = Arc::new(EchoPrompt {
            seen: Mutex::new(Vec::new()),
        });
        let oauth = SpotifyOAuth::new(Client::new(), server.uri(), TokenCache::default())
            .with_prompt(prompt.clone());

        let token = oauth.obtain_token(&creds(), &SCOPES).await.unwrap();
        assert_eq!(token.access_token, "from-prompt");
        assert_eq!(prompt.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_token_without_prompt_fails() {
        let oauth =
            SpotifyOAuth::new(Client::new(), "http://127.0.0.1:9", TokenCache::default());
        let err = oauth.obtain_token(&creds(), &SCOPES).await.unwrap_err();
        assert!(err.to_string().contains("no usable cached token"));
    }
}
