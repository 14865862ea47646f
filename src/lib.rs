pub mod backend;
pub mod capture;
pub mod cli;
mod commands;
pub mod db;
pub mod events;
pub mod format;
pub mod ranking;
pub mod recorder;
pub mod settings;
pub mod timer;
pub mod views;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use log::info;

use backend::{FileStore, LocalBackend};
use cli::{Cli, Command};
use db::Database;
use events::EventEmitter;
use settings::SettingsStore;

pub struct AppState {
    pub db: Database,
    pub backend: Arc<LocalBackend>,
    pub store: Arc<FileStore>,
    pub settings: SettingsStore,
    pub events: EventEmitter,
}

impl AppState {
    pub fn open(data_dir: PathBuf, events: EventEmitter) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let database = Database::new(data_dir.join("planktime.sqlite3"))?;
        let store = FileStore::new(data_dir.join("evidence"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        Ok(Self {
            backend: Arc::new(LocalBackend::new(database.clone())),
            db: database,
            store: Arc::new(store),
            settings,
            events,
        })
    }
}

fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "planktime")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("could not determine a data directory; pass --data-dir"))
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async move {
        let (events, rx) = EventEmitter::channel();
        info!("Using data in {}", data_dir.display());
        let state = AppState::open(data_dir, events)?;
        commands::restore_sign_in(&state).await?;

        match cli.command {
            Command::Login { user_id, name } => {
                commands::login(&state, &user_id, name.as_deref()).await
            }
            Command::Logout => commands::logout(&state),
            Command::Camera {
                enable,
                disable,
                frame,
            } => commands::camera(&state, enable, disable, frame),
            Command::Plank {
                countdown,
                timed,
                no_cheating,
            } => {
                let countdown = match (countdown, timed) {
                    (Some(target), _) => Some(target),
                    (None, true) => {
                        let secs = state.settings.get().default_countdown_secs;
                        Some((secs / 60, secs % 60))
                    }
                    (None, false) => None,
                };
                commands::plank(&state, rx, countdown, no_cheating).await
            }
            Command::SetDefault { target } => commands::set_default(&state, target),
            Command::Leaderboard { best } => commands::leaderboard(&state, rx, best).await,
            Command::Stats => commands::stats(&state, rx).await,
            Command::Badges => commands::badges(&state, rx).await,
        }
    })
}
