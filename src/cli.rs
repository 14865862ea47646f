use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "planktime", version, about = "Time your planks, keep your streak, climb the board")]
pub struct Cli {
    /// Where the database, settings and photos live
    #[arg(long, env = "PLANKTIME_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in as a user, creating the profile on first use
    Login {
        user_id: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign out
    Logout,
    /// Grant or revoke the camera used for evidence snapshots
    Camera {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
        /// Image file holding the camera's latest frame
        #[arg(long)]
        frame: Option<PathBuf>,
    },
    /// Run a plank session (stopwatch unless --countdown is given)
    Plank {
        /// Countdown target as `m:ss` or plain seconds
        #[arg(long, value_parser = parse_target, conflicts_with = "timed")]
        countdown: Option<(u64, u64)>,
        /// Count down from your saved default target
        #[arg(long)]
        timed: bool,
        /// Confirm you will hold a real plank for the whole session
        #[arg(long = "no-cheating")]
        no_cheating: bool,
    },
    /// Save the target `plank --timed` counts down from
    SetDefault {
        #[arg(value_parser = parse_target)]
        target: (u64, u64),
    },
    /// Show the 30-day leaderboard
    Leaderboard {
        /// Rank by best single session instead of total time
        #[arg(long)]
        best: bool,
    },
    /// Show your streak, best hold and recent sessions
    Stats,
    /// Show badge progress
    Badges,
}

/// Longest target accepted for a countdown.
pub const MAX_TARGET_SECS: u64 = 24 * 60 * 60;

/// Total seconds in `minutes:seconds`, `None` on overflow.
pub fn target_secs(minutes: u64, seconds: u64) -> Option<u64> {
    minutes.checked_mul(60)?.checked_add(seconds)
}

/// Parses `m:ss` or whole seconds into `(minutes, seconds)`, at most a day.
pub fn parse_target(raw: &str) -> Result<(u64, u64)> {
    let raw = raw.trim();
    let (minutes, seconds) = match raw.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u64 = minutes
                .parse()
                .with_context(|| format!("invalid minutes in '{raw}'"))?;
            let seconds: u64 = seconds
                .parse()
                .with_context(|| format!("invalid seconds in '{raw}'"))?;
            if seconds >= 60 {
                bail!("seconds must be below 60 in '{raw}'");
            }
            (minutes, seconds)
        }
        None => {
            let total: u64 = raw
                .parse()
                .with_context(|| format!("invalid duration '{raw}'"))?;
            (total / 60, total % 60)
        }
    };

    match target_secs(minutes, seconds) {
        Some(total) if total <= MAX_TARGET_SECS => Ok((minutes, seconds)),
        _ => bail!("'{raw}' is longer than the 24 hour limit"),
    }
}
