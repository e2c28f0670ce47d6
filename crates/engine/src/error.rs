use playctl_core::ConfigError;
use thiserror::Error;

/// Errors that cross the controller boundary. Everything else a provider
/// does wrong is absorbed by the dispatcher and only shows up in the log.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{provider} session setup failed")]
    Setup {
        provider: &'static str,
        #[source]
        source: anyhow::Error,
    },
}
