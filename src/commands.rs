//! Handlers behind each CLI subcommand. They drive the same controllers and
//! views a graphical front end would, and print what those return.

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use chrono::Utc;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::UnboundedReceiver,
};

use crate::{
    backend::Backend,
    capture::{FrameSource, StillFrameSource},
    cli::{target_secs, MAX_TARGET_SECS},
    events::{AppEvent, ToastLevel},
    format::format_duration,
    ranking::{RankingMetric, Standing},
    recorder::SessionRecorder,
    timer::{SessionController, TimerMode, TimerStatus},
    views::{AchievementsView, LeaderboardView, PersonalStatsView},
    AppState,
};

pub async fn login(state: &AppState, user_id: &str, name: Option<&str>) -> Result<()> {
    let identity = state.backend.sign_in(user_id, name).await?;
    state
        .settings
        .update(|s| s.signed_in_user = Some(identity.id.clone()))?;
    println!("Signed in as {} ({})", identity.display_name, identity.id);
    Ok(())
}

pub fn logout(state: &AppState) -> Result<()> {
    state.backend.sign_out();
    state.settings.update(|s| s.signed_in_user = None)?;
    println!("Signed out");
    Ok(())
}

pub fn camera(state: &AppState, enable: bool, disable: bool, frame: Option<PathBuf>) -> Result<()> {
    let updated = state.settings.update(|s| {
        if enable {
            s.camera.enabled = true;
        }
        if disable {
            s.camera.enabled = false;
        }
        if let Some(frame) = frame {
            s.camera.frame_path = Some(frame);
        }
    })?;

    match (&updated.camera.enabled, &updated.camera.frame_path) {
        (true, Some(path)) => println!("Camera on, reading frames from {}", path.display()),
        (true, None) => println!("Camera on, but no frame source set (use --frame)"),
        (false, _) => println!("Camera off"),
    }
    Ok(())
}

pub fn set_default(state: &AppState, (minutes, seconds): (u64, u64)) -> Result<()> {
    let total = match target_secs(minutes, seconds) {
        Some(0) => bail!("the default countdown must be longer than zero seconds"),
        Some(total) if total <= MAX_TARGET_SECS => total,
        _ => bail!("the default countdown must be at most {}", format_duration(MAX_TARGET_SECS)),
    };
    state.settings.update(|s| s.default_countdown_secs = total)?;
    println!("Default countdown set to {}", format_duration(total));
    Ok(())
}

fn camera_source(state: &AppState) -> Option<Arc<dyn FrameSource>> {
    let camera = state.settings.get().camera;
    match (camera.enabled, camera.frame_path) {
        (true, Some(path)) => Some(Arc::new(StillFrameSource::new(path))),
        _ => None,
    }
}

pub async fn plank(
    state: &AppState,
    mut rx: UnboundedReceiver<AppEvent>,
    countdown: Option<(u64, u64)>,
    no_cheating: bool,
) -> Result<()> {
    let recorder = SessionRecorder::new(
        state.backend.clone(),
        state.store.clone(),
        state.events.clone(),
    );
    let mode = if countdown.is_some() {
        TimerMode::Countdown
    } else {
        TimerMode::Stopwatch
    };
    let controller = SessionController::new(recorder, state.events.clone(), mode);
    controller.set_camera(camera_source(state)).await;

    if let Some((minutes, seconds)) = countdown {
        controller.configure_countdown(minutes, seconds).await?;
    }
    controller.acknowledge(no_cheating).await;

    if controller.start().await.is_err() {
        print_pending(&mut rx);
        bail!("session not started");
    }

    match mode {
        TimerMode::Stopwatch => {
            println!("Stopwatch running. [Enter] finish, p pause, r resume, q quit without saving")
        }
        TimerMode::Countdown => println!("Countdown running. q quits without saving"),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // a countdown needs no input to finish
                    if mode == TimerMode::Countdown {
                        stdin_open = false;
                        continue;
                    }
                    controller.reset().await;
                    break;
                };
                match (mode, line.trim()) {
                    (_, "q") => {
                        controller.reset().await;
                        println!("Session discarded");
                        break;
                    }
                    (TimerMode::Stopwatch, "p") => report(controller.pause().await),
                    (TimerMode::Stopwatch, "r") => report(controller.start().await),
                    (TimerMode::Stopwatch, "") => {
                        let finished = controller.finish().await;
                        print_pending(&mut rx);
                        // a completed timer cannot be finished again, saved or not
                        if finished.is_ok() || controller.status().await == TimerStatus::Completed {
                            break;
                        }
                    }
                    (_, other) => eprintln!("unknown input '{other}'"),
                }
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                let settled = matches!(
                    event,
                    AppEvent::SessionSaved { .. } | AppEvent::SessionSaveFailed { .. }
                );
                print_event(&event);
                if settled {
                    print_pending(&mut rx);
                    break;
                }
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}

fn report<T, E: std::fmt::Display>(result: Result<T, E>) {
    if let Err(err) = result {
        eprintln!("{err}");
    }
}

fn print_pending(rx: &mut UnboundedReceiver<AppEvent>) {
    for event in crate::events::drain(rx) {
        print_event(&event);
    }
}

fn print_event(event: &AppEvent) {
    match event {
        AppEvent::TimerStateChanged { snapshot } => {
            if snapshot.timer.status == TimerStatus::Active {
                println!("  {}", snapshot.display);
            }
        }
        AppEvent::SnapshotCaptured { retained } => println!("  📸 snapshot ({retained} kept)"),
        AppEvent::SessionSaved {
            session,
            evidence_urls,
            failed_uploads,
        } => {
            println!(
                "Saved {} with {} photo(s){}",
                format_duration(session.duration_secs),
                session.image_paths.len(),
                if *failed_uploads > 0 {
                    format!(", {failed_uploads} upload(s) failed")
                } else {
                    String::new()
                }
            );
            for url in evidence_urls {
                println!("  {url}");
            }
        }
        AppEvent::SessionSaveFailed { .. } => println!("Session not saved"),
        AppEvent::Toast(toast) => {
            let tag = match toast.level {
                ToastLevel::Success => "✓",
                ToastLevel::Warning => "!",
                ToastLevel::Error => "✗",
            };
            eprintln!("[{tag}] {}: {}", toast.title, toast.message);
        }
    }
}

pub async fn leaderboard(
    state: &AppState,
    mut rx: UnboundedReceiver<AppEvent>,
    best: bool,
) -> Result<()> {
    let mut view = LeaderboardView::new(state.backend.clone(), state.events.clone());
    view.set_metric(if best {
        RankingMetric::BestSession
    } else {
        RankingMetric::TotalTime
    });

    view.refresh(Utc::now().date_naive()).await;
    print_pending(&mut rx);
    let rows = view.rows();

    let heading = match view.metric() {
        RankingMetric::TotalTime => "Total time, last 30 days",
        RankingMetric::BestSession => "Best single plank, last 30 days",
    };
    println!("{heading}");
    if rows.is_empty() {
        println!("  nobody has planked yet");
    }
    for row in rows {
        println!("  {:>3}. {:<24} {:>8}", row.rank, row.display_name, row.value_display);
    }
    Ok(())
}

pub async fn stats(state: &AppState, mut rx: UnboundedReceiver<AppEvent>) -> Result<()> {
    let mut view = PersonalStatsView::new(state.backend.clone(), state.events.clone());
    let stats = view.refresh(Utc::now().date_naive()).await.cloned();
    print_pending(&mut rx);

    let Some(stats) = stats else {
        return Ok(());
    };

    let summary = &stats.summary;
    println!("{}", stats.identity.display_name);
    println!("  streak:        {} day(s)", summary.current_streak);
    match summary.best_date {
        Some(date) => println!(
            "  best:          {} on {date}",
            format_duration(summary.best_duration_secs)
        ),
        None => println!("  best:          -"),
    }
    println!("  sessions:      {}", summary.total_sessions);
    match stats.standing {
        Standing::Ranked { rank, total, .. } => println!(
            "  30-day rank:   #{rank} of {total} ({})",
            stats.standing.percentile_label().unwrap_or_default()
        ),
        Standing::Unranked => println!("  30-day rank:   unranked"),
    }

    if !stats.recent_sessions.is_empty() {
        println!("Recent sessions");
        for session in &stats.recent_sessions {
            println!(
                "  {}  {:>8}  {} photo(s)",
                session.session_date,
                format_duration(session.duration_secs),
                session.image_paths.len()
            );
        }
    }
    Ok(())
}

pub async fn badges(state: &AppState, mut rx: UnboundedReceiver<AppEvent>) -> Result<()> {
    let mut view = AchievementsView::new(state.backend.clone(), state.events.clone());
    view.refresh().await;
    print_pending(&mut rx);

    if view.badges().is_empty() {
        return Ok(());
    }

    println!("{} of {} badges earned", view.earned_count(), view.badges().len());
    for badge in view.badges() {
        let status = match badge.earned_at {
            Some(at) => format!("earned {}", at.date_naive()),
            None => format!("{}/{}", badge.progress.min(badge.target), badge.target),
        };
        println!("  {} {:<18} {:<14} {}", badge.icon, badge.name, status, badge.description);
    }
    Ok(())
}

/// Restores the identity saved in settings, if its profile still exists.
pub async fn restore_sign_in(state: &AppState) -> Result<()> {
    if let Some(user_id) = state.settings.get().signed_in_user {
        if state.backend.current_user().await?.is_none() {
            state.backend.sign_in(&user_id, None).await?;
        }
    }
    Ok(())
}
