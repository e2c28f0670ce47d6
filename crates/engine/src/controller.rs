use crate::action::{DispatchOutcome, DispatchStep, PlaybackAction};
use crate::error::ControlError;
use crate::log::{ControlEvent, ControlLog, TracingLog};
use crate::AudioController;
use async_trait::async_trait;
use playctl_core::{Credentials, PlaybackContext, PlaybackState, Scope, SpotifyConfig};
use playctl_providers::{Authenticator, PlaybackProvider, RemotePlaybackSnapshot};
use std::sync::Arc;
use std::time::SystemTime;

/// Scopes every session is created with.
pub const PLAYBACK_SCOPES: [Scope; 2] = [Scope::ModifyPlaybackState, Scope::ReadPlaybackState];

/// Drives one provider through the [`AudioController`] contract.
///
/// Every action re-reads the remote state first and only issues a mutation
/// when the remote side is not already where the action would put it. The
/// [`PlaybackContext`] is written only after such a mutation succeeds.
pub struct PlaybackController<A: Authenticator> {
    credentials: Credentials,
    authenticator: A,
    session: Option<A::Session>,
    context: PlaybackContext,
    log: Arc<dyn ControlLog>,
}

impl<A: Authenticator> PlaybackController<A> {
    pub fn new(credentials: Credentials, authenticator: A) -> Self {
        Self {
            credentials,
            authenticator,
            session: None,
            context: PlaybackContext::default(),
            log: Arc::new(TracingLog),
        }
    }

    pub fn from_config(cfg: &SpotifyConfig, authenticator: A) -> Result<Self, ControlError> {
        let credentials = Credentials::try_from(cfg)?;
        Ok(Self::new(credentials, authenticator))
    }

    pub fn with_log(mut self, log: Arc<dyn ControlLog>) -> Self {
        self.log = log;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    /// Query, decide, mutate, record. Provider failures end up in the log
    /// and in the returned outcome, never in a panic or an `Err`.
    pub async fn dispatch(&mut self, action: PlaybackAction) -> DispatchOutcome {
        let Some(session) = self.session.as_mut() else {
            self.log.record(&ControlEvent::NotReady { action });
            return DispatchOutcome::NotReady;
        };

        let snapshot = match session.current_playback().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                self.log.record(&ControlEvent::NoActiveSession { action });
                return DispatchOutcome::NoActiveSession;
            }
            Err(error) => {
                self.log.record(&ControlEvent::ProviderFailed {
                    action,
                    step: DispatchStep::Query,
                    error: &error,
                });
                return DispatchOutcome::ProviderFailed(DispatchStep::Query);
            }
        };

        if !action.is_needed(snapshot.is_playing) {
            self.log.record(&ControlEvent::AlreadySatisfied {
                action,
                is_playing: snapshot.is_playing,
            });
            return DispatchOutcome::AlreadySatisfied;
        }

        let result = match action {
            PlaybackAction::Play => session.start_playback(None).await,
            PlaybackAction::Pause => session.pause_playback(None).await,
        };
        if let Err(error) = result {
            self.log.record(&ControlEvent::ProviderFailed {
                action,
                step: DispatchStep::Mutate,
                error: &error,
            });
            return DispatchOutcome::ProviderFailed(DispatchStep::Mutate);
        }

        let state = action.target_state();
        self.record_transition(state, &snapshot);
        self.log.record(&ControlEvent::Applied { action, state });
        DispatchOutcome::Applied(state)
    }

    /// String-tagged entry point for callers that carry actions as text.
    pub async fn dispatch_named(&mut self, tag: &str) -> DispatchOutcome {
        match tag.parse::<PlaybackAction>() {
            Ok(action) => self.dispatch(action).await,
            Err(_) => {
                self.log.record(&ControlEvent::UnknownAction { tag });
                DispatchOutcome::UnknownAction
            }
        }
    }

    // The snapshot was read before the mutation, so its position is where
    // playback stood when the transition happened.
    fn record_transition(&mut self, state: PlaybackState, snapshot: &RemotePlaybackSnapshot) {
        self.context.state = state;
        self.context.track_id = snapshot.track_id.clone();
        self.context.progress_ms = snapshot.progress_ms;
        self.context.timestamp = Some(SystemTime::now());
    }
}

#[async_trait]
impl<A: Authenticator> AudioController for PlaybackController<A> {
    async fn setup(&mut self) -> Result<(), ControlError> {
        self.session = None;
        match self
            .authenticator
            .authenticate(&self.credentials, &PLAYBACK_SCOPES)
            .await
        {
            Ok(session) => {
                self.log.record(&ControlEvent::SessionEstablished {
                    provider: session.name(),
                });
                self.session = Some(session);
                Ok(())
            }
            Err(source) => Err(ControlError::Setup {
                provider: self.authenticator.provider_name(),
                source,
            }),
        }
    }

    async fn play(&mut self) {
        self.dispatch(PlaybackAction::Play).await;
    }

    async fn pause(&mut self) {
        self.dispatch(PlaybackAction::Pause).await;
    }

    async fn set_volume(&mut self, level: u8) {
        self.log.record(&ControlEvent::VolumeIgnored { level });
    }

    fn context(&self) -> &PlaybackContext {
        &self.context
    }
}
