pub mod config;
pub mod credentials;
pub mod model;

pub use config::{AppConfig, SpotifyConfig};
pub use credentials::{ConfigError, Credentials};
pub use model::{PlaybackContext, PlaybackState, Scope};
