use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use playctl_core::{AppConfig, Credentials};
use playctl_engine::{
    AudioController, DispatchOutcome, PlaybackAction, PlaybackController, PLAYBACK_SCOPES,
};
use playctl_providers::{
    AuthorizationPrompt, Authenticator, PlaybackProvider, SpotifyAuthenticator, TokenCache,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "playctl", about = "Control playback on a remote audio provider")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Authorize with the provider and cache the session token
    Setup,
    Play,
    Pause,
    /// Accepted for completeness; the provider volume is left untouched
    Volume {
        level: u8,
    },
    /// Show what the provider is currently playing (default)
    Status,
    Doctor,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("ignoring unreadable .env file: {err}");
        }
    }

    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Status);
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    if let Commands::Config {
        action: ConfigAction::Init,
    } = cmd
    {
        init_config(&cfg_path)?;
        println!("Initialized config at {}", cfg_path.display());
        return Ok(());
    }

    let cfg = load_or_default(&cfg_path)?;
    init_logging(&cfg)?;
    debug!(config = %cfg_path.display(), "configuration loaded");

    match cmd {
        Commands::Doctor => doctor(&cfg, &cfg_path).await,
        Commands::Status => status(&cfg).await,
        Commands::Setup => {
            let controller = ready_controller(&cfg).await?;
            println!(
                "session ready for client {}",
                controller.credentials().client_id()
            );
            Ok(())
        }
        Commands::Play => control(&cfg, PlaybackAction::Play).await,
        Commands::Pause => control(&cfg, PlaybackAction::Pause).await,
        Commands::Volume { level } => {
            let mut controller = ready_controller(&cfg).await?;
            controller.set_volume(level).await;
            println!("volume control is not supported; level {level} ignored");
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

fn authenticator(cfg: &AppConfig, interactive: bool) -> Result<SpotifyAuthenticator> {
    let cache = TokenCache::new(Some(token_cache_path(cfg)));
    let auth = SpotifyAuthenticator::new(&cfg.spotify, cache)
        .context("failed to build spotify client")?;
    Ok(if interactive {
        auth.with_prompt(Arc::new(StdinPrompt))
    } else {
        auth
    })
}

async fn ready_controller(cfg: &AppConfig) -> Result<PlaybackController<SpotifyAuthenticator>> {
    let mut controller = PlaybackController::from_config(&cfg.spotify, authenticator(cfg, true)?)?;
    controller.setup().await?;
    Ok(controller)
}

async fn control(cfg: &AppConfig, action: PlaybackAction) -> Result<()> {
    let mut controller = ready_controller(cfg).await?;
    let outcome = controller.dispatch(action).await;
    info!(action = %action, outcome = ?outcome, "dispatch finished");
    println!("{action}: {}", describe(outcome));
    Ok(())
}

fn describe(outcome: DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Applied(state) => format!("playback is now {state}"),
        DispatchOutcome::AlreadySatisfied => "nothing to do, already there".to_string(),
        DispatchOutcome::NoActiveSession => {
            "no active playback session; start playing on a device first".to_string()
        }
        DispatchOutcome::ProviderFailed(step) => {
            format!("provider call failed during {step}; see log for details")
        }
        DispatchOutcome::NotReady => "controller has no session".to_string(),
        DispatchOutcome::UnknownAction => "unknown action".to_string(),
    }
}

async fn status(cfg: &AppConfig) -> Result<()> {
    let credentials = Credentials::try_from(&cfg.spotify)?;
    let mut session = authenticator(cfg, true)?
        .authenticate(&credentials, &PLAYBACK_SCOPES)
        .await?;

    println!("provider: {}", session.name());
    match session.current_playback().await? {
        Some(snapshot) => {
            println!(
                "track: {}",
                snapshot.track_name.as_deref().unwrap_or("Unknown track")
            );
            if let Some(device) = snapshot.device_name {
                println!("device: {device}");
            }
            println!("playing: {}", snapshot.is_playing);
            if let Some(ms) = snapshot.progress_ms {
                println!("position: {}:{:02}", ms / 60_000, (ms / 1_000) % 60);
            }
        }
        None => println!("track: <no active playback>"),
    }
    Ok(())
}

async fn doctor(cfg: &AppConfig, cfg_path: &Path) -> Result<()> {
    println!("== playctl doctor ==");
    println!(
        "Config file: {} ({})",
        cfg_path.display(),
        if cfg_path.exists() { "found" } else { "defaults" }
    );

    let set = |v: &Option<String>| if v.is_some() { "set" } else { "missing" };
    println!("Client id: {}", set(&cfg.spotify.client_id));
    println!("Client secret: {}", set(&cfg.spotify.client_secret));
    println!("Redirect uri: {}", set(&cfg.spotify.redirect_uri));

    let cache_path = token_cache_path(cfg);
    println!(
        "Token cache: {} ({})",
        cache_path.display(),
        if cache_path.exists() { "present" } else { "absent" }
    );

    let credentials = match Credentials::try_from(&cfg.spotify) {
        Ok(c) => c,
        Err(err) => {
            println!("Credentials: {err}");
            return Ok(());
        }
    };

    let auth = authenticator(cfg, false)?;
    match auth.authenticate(&credentials, &PLAYBACK_SCOPES).await {
        Ok(mut session) => {
            println!("Session: ok");
            match session.current_playback().await {
                Ok(Some(snapshot)) => println!(
                    "Playback: {} ({})",
                    snapshot.track_name.as_deref().unwrap_or("Unknown track"),
                    if snapshot.is_playing { "playing" } else { "paused" }
                ),
                Ok(None) => println!("Playback: no active session"),
                Err(err) => println!("Playback: query failed: {err:#}"),
            }
        }
        Err(err) => println!("Session: {err:#} (run `playctl setup`)"),
    }

    Ok(())
}

struct StdinPrompt;

#[async_trait]
impl AuthorizationPrompt for StdinPrompt {
    async fn redirected_url(&self, authorize_url: &Url) -> Result<String> {
        println!("Open this URL in a browser and approve access:\n\n  {authorize_url}\n");
        println!("Then paste the URL you were redirected to:");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .context("failed to read redirected url")?;

        let line = line.trim();
        if line.is_empty() {
            bail!("no redirected url entered");
        }
        Ok(line.to_string())
    }
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("playctl").join("config.toml")
}

fn token_cache_path(cfg: &AppConfig) -> PathBuf {
    cfg.spotify.token_cache.clone().unwrap_or_else(|| {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("playctl").join("spotify-token.json")
    })
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn read_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    let mut cfg = read_config(path)?;
    cfg.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(cfg)
}

fn init_logging(cfg: &AppConfig) -> Result<()> {
    let console_filter =
        EnvFilter::try_new(&cfg.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file = match &cfg.log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                if !dir.exists() {
                    bail!("log directory does not exist: {}", dir.display());
                }
            }
            let handle = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let filter = EnvFilter::try_new(&cfg.log_file_level)
                .unwrap_or_else(|_| EnvFilter::new("debug"));
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(handle))
                    .with_filter(filter),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
    Ok(())
}
