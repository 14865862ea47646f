use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    ConfiguringCountdown,
    Active,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    #[default]
    Stopwatch,
    Countdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("please confirm you will hold a real plank before starting")]
    NotAcknowledged,
    #[error("set a countdown longer than zero seconds")]
    MissingTarget,
    #[error("timer is already running")]
    AlreadyActive,
    #[error("timer is not running")]
    NotActive,
    #[error("the mode can only be changed before a session starts")]
    ModeLocked,
    #[error("this action needs {0:?} mode")]
    WrongMode(TimerMode),
    #[error("nothing to save yet")]
    NothingElapsed,
    #[error("session already finished; reset to start another")]
    AlreadyCompleted,
}

/// What a single tick did to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Advanced,
    /// Countdown hit zero; carries the duration to record.
    Completed { duration_secs: u64 },
}

/// One session's timer. Time advances only through [`SessionTimer::tick`],
/// which the controller drives once per second.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimer {
    pub status: TimerStatus,
    pub mode: TimerMode,
    /// Seconds counted up in stopwatch mode.
    pub elapsed_secs: u64,
    /// Seconds left in countdown mode.
    pub remaining_secs: u64,
    pub target_secs: Option<u64>,
    pub acknowledged: bool,
}

impl SessionTimer {
    pub fn new(mode: TimerMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    fn is_pristine(&self) -> bool {
        matches!(
            self.status,
            TimerStatus::Idle | TimerStatus::ConfiguringCountdown
        )
    }

    pub fn set_mode(&mut self, mode: TimerMode) -> Result<(), TimerError> {
        if !self.is_pristine() {
            return Err(TimerError::ModeLocked);
        }
        if self.mode != mode {
            self.mode = mode;
            self.target_secs = None;
            self.remaining_secs = 0;
            self.status = TimerStatus::Idle;
        }
        Ok(())
    }

    pub fn configure_countdown(&mut self, minutes: u64, seconds: u64) -> Result<(), TimerError> {
        if self.mode != TimerMode::Countdown {
            return Err(TimerError::WrongMode(TimerMode::Countdown));
        }
        if !self.is_pristine() {
            return Err(TimerError::ModeLocked);
        }

        let target = minutes.saturating_mul(60).saturating_add(seconds);
        self.target_secs = Some(target);
        self.remaining_secs = target;
        self.status = TimerStatus::ConfiguringCountdown;
        Ok(())
    }

    pub fn acknowledge(&mut self, acknowledged: bool) {
        self.acknowledged = acknowledged;
    }

    pub fn start(&mut self) -> Result<(), TimerError> {
        match self.status {
            TimerStatus::Active => return Err(TimerError::AlreadyActive),
            TimerStatus::Completed => return Err(TimerError::AlreadyCompleted),
            TimerStatus::Idle | TimerStatus::ConfiguringCountdown | TimerStatus::Paused => {}
        }

        if !self.acknowledged {
            return Err(TimerError::NotAcknowledged);
        }

        if self.mode == TimerMode::Countdown {
            let target = self.target_secs.unwrap_or(0);
            if target == 0 {
                return Err(TimerError::MissingTarget);
            }
            if self.status != TimerStatus::Paused {
                self.remaining_secs = target;
            }
        }

        self.status = TimerStatus::Active;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        if self.mode != TimerMode::Stopwatch {
            return Err(TimerError::WrongMode(TimerMode::Stopwatch));
        }
        if self.status != TimerStatus::Active {
            return Err(TimerError::NotActive);
        }
        self.status = TimerStatus::Paused;
        Ok(())
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.status != TimerStatus::Active {
            return TickOutcome::Ignored;
        }

        match self.mode {
            TimerMode::Stopwatch => {
                self.elapsed_secs = self.elapsed_secs.saturating_add(1);
                TickOutcome::Advanced
            }
            TimerMode::Countdown => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    self.status = TimerStatus::Completed;
                    TickOutcome::Completed {
                        duration_secs: self.completed_duration_secs(),
                    }
                } else {
                    TickOutcome::Advanced
                }
            }
        }
    }

    /// Manually ends a stopwatch session and returns the duration to record.
    pub fn finish(&mut self) -> Result<u64, TimerError> {
        if self.mode != TimerMode::Stopwatch {
            return Err(TimerError::WrongMode(TimerMode::Stopwatch));
        }
        match self.status {
            TimerStatus::Active | TimerStatus::Paused => {}
            TimerStatus::Completed => return Err(TimerError::AlreadyCompleted),
            TimerStatus::Idle | TimerStatus::ConfiguringCountdown => {
                return Err(TimerError::NotActive)
            }
        }
        if self.elapsed_secs == 0 {
            return Err(TimerError::NothingElapsed);
        }

        self.status = TimerStatus::Completed;
        Ok(self.completed_duration_secs())
    }

    /// Back to a fresh idle timer in the same mode.
    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }

    /// Countdown sessions count as their configured target, stopwatch
    /// sessions as the seconds actually ticked.
    pub fn completed_duration_secs(&self) -> u64 {
        match self.mode {
            TimerMode::Countdown => self.target_secs.unwrap_or(0),
            TimerMode::Stopwatch => self.elapsed_secs,
        }
    }

    /// Seconds shown on the clock face.
    pub fn display_secs(&self) -> u64 {
        match self.mode {
            TimerMode::Countdown => self.remaining_secs,
            TimerMode::Stopwatch => self.elapsed_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed_countdown(minutes: u64, seconds: u64) -> SessionTimer {
        let mut timer = SessionTimer::new(TimerMode::Countdown);
        timer.configure_countdown(minutes, seconds).unwrap();
        timer.acknowledge(true);
        timer
    }

    #[test]
    fn start_requires_acknowledgment() {
        let mut timer = SessionTimer::new(TimerMode::Stopwatch);
        assert_eq!(timer.start(), Err(TimerError::NotAcknowledged));
        assert_eq!(timer.status, TimerStatus::Idle);

        timer.acknowledge(true);
        assert_eq!(timer.start(), Ok(()));
        assert_eq!(timer.status, TimerStatus::Active);
    }

    #[test]
    fn countdown_with_zero_target_is_rejected() {
        let mut timer = armed_countdown(0, 0);
        assert_eq!(timer.status, TimerStatus::ConfiguringCountdown);
        assert_eq!(timer.start(), Err(TimerError::MissingTarget));

        let mut unconfigured = SessionTimer::new(TimerMode::Countdown);
        unconfigured.acknowledge(true);
        assert_eq!(unconfigured.start(), Err(TimerError::MissingTarget));
    }

    #[test]
    fn countdown_reports_the_configured_target() {
        let mut timer = armed_countdown(0, 3);
        timer.start().unwrap();

        assert_eq!(timer.tick(), TickOutcome::Advanced);
        assert_eq!(timer.tick(), TickOutcome::Advanced);
        assert_eq!(timer.display_secs(), 1);
        assert_eq!(
            timer.tick(),
            TickOutcome::Completed { duration_secs: 3 }
        );
        assert_eq!(timer.status, TimerStatus::Completed);
        assert_eq!(timer.tick(), TickOutcome::Ignored);
    }

    #[test]
    fn stopwatch_counts_up_across_pauses() {
        let mut timer = SessionTimer::new(TimerMode::Stopwatch);
        timer.acknowledge(true);
        timer.start().unwrap();
        timer.tick();
        timer.tick();
        timer.pause().unwrap();
        assert_eq!(timer.tick(), TickOutcome::Ignored);
        timer.start().unwrap();
        timer.tick();

        assert_eq!(timer.elapsed_secs, 3);
        assert_eq!(timer.finish(), Ok(3));
        assert_eq!(timer.status, TimerStatus::Completed);
        assert_eq!(timer.start(), Err(TimerError::AlreadyCompleted));
    }

    #[test]
    fn countdown_cannot_be_paused_or_finished_by_hand() {
        let mut timer = armed_countdown(1, 0);
        timer.start().unwrap();
        assert_eq!(
            timer.pause(),
            Err(TimerError::WrongMode(TimerMode::Stopwatch))
        );
        assert_eq!(
            timer.finish(),
            Err(TimerError::WrongMode(TimerMode::Stopwatch))
        );
    }

    #[test]
    fn finishing_an_untouched_stopwatch_is_rejected() {
        let mut timer = SessionTimer::new(TimerMode::Stopwatch);
        timer.acknowledge(true);
        assert_eq!(timer.finish(), Err(TimerError::NotActive));
        timer.start().unwrap();
        assert_eq!(timer.finish(), Err(TimerError::NothingElapsed));
    }

    #[test]
    fn mode_is_locked_once_started() {
        let mut timer = SessionTimer::new(TimerMode::Stopwatch);
        timer.set_mode(TimerMode::Countdown).unwrap();
        timer.configure_countdown(0, 30).unwrap();
        timer.set_mode(TimerMode::Stopwatch).unwrap();
        assert_eq!(timer.target_secs, None);
        assert_eq!(timer.status, TimerStatus::Idle);

        timer.acknowledge(true);
        timer.start().unwrap();
        assert_eq!(
            timer.set_mode(TimerMode::Countdown),
            Err(TimerError::ModeLocked)
        );
    }

    #[test]
    fn reset_clears_everything_but_the_mode() {
        let mut timer = armed_countdown(2, 0);
        timer.start().unwrap();
        timer.tick();
        timer.reset();

        assert_eq!(timer, SessionTimer::new(TimerMode::Countdown));
        assert!(!timer.acknowledged);
        assert_eq!(timer.target_secs, None);
    }
}
