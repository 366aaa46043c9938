use std::sync::Arc;
use std::time::Duration;

use crate::challenge::{ChallengeSubmitter, LogNotifier, Notifier, SaveHandle};
use crate::clock::{Clock, SystemClock};
use crate::session::{ConfigError, EngineConfig, Phase, SessionState};

/// Cadence at which hosts should call [`GameEngine::tick`]
pub const COUNTDOWN_POLL: Duration = Duration::from_millis(100);

/// Multiplier ceiling for a combo streak
pub const MAX_COMBO_MULTIPLIER: u32 = 5;

/// Countdown interval held while a timed session is running.
///
/// Remaining time is always derived from the anchor, never accumulated per
/// tick, so late or skipped polls cannot drift the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CountdownInterval {
    anchor_ms: u64,
    remaining_at_anchor_ms: u64,
}

impl CountdownInterval {
    fn remaining_at(&self, now_ms: u64) -> u64 {
        let elapsed = now_ms.saturating_sub(self.anchor_ms);
        self.remaining_at_anchor_ms.saturating_sub(elapsed)
    }
}

/// Score, combo, lives and countdown state machine for one play session
pub struct GameEngine<C: Clock = SystemClock> {
    config: EngineConfig,
    clock: C,
    state: SessionState,
    last_scored_at_ms: Option<u64>,
    interval: Option<CountdownInterval>,
    submitter: Option<Arc<dyn ChallengeSubmitter>>,
    notifier: Arc<dyn Notifier>,
}

impl GameEngine<SystemClock> {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> GameEngine<C> {
    pub fn with_clock(config: EngineConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut engine = Self {
            state: SessionState::initial(&config),
            config,
            clock,
            last_scored_at_ms: None,
            interval: None,
            submitter: None,
            notifier: Arc::new(LogNotifier),
        };
        if engine.config.auto_start {
            engine.start();
        }
        Ok(engine)
    }

    pub fn with_submitter(mut self, submitter: Arc<dyn ChallengeSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn score(&self) -> u64 {
        self.state.score
    }

    pub fn streak(&self) -> u32 {
        self.state.streak
    }

    pub fn lives(&self) -> u32 {
        self.state.lives
    }

    pub fn max_lives(&self) -> u32 {
        self.state.max_lives
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.state.started_at_ms
    }

    pub fn initial_time_ms(&self) -> Option<u64> {
        self.state.initial_time_ms
    }

    pub fn time_remaining_ms(&self) -> Option<u64> {
        self.state.time_remaining_ms
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_expired(&self) -> bool {
        self.state.is_expired()
    }

    /// Current combo multiplier, as applied to the latest scoring event
    pub fn multiplier(&self) -> u32 {
        self.state.streak.clamp(1, MAX_COMBO_MULTIPLIER)
    }

    /// Resume from `Idle` or `Paused`, anchoring the countdown at now.
    ///
    /// An expired countdown is the one paused state that cannot resume:
    /// `start` leaves it paused at zero, and only `reset` restores the
    /// budget. Score, lives and streak are never touched.
    pub fn start(&mut self) {
        if self.state.is_running {
            return;
        }
        if self.state.is_expired() {
            log::debug!("start ignored: countdown already expired");
            return;
        }

        let now = self.clock.now_ms();
        self.state.is_running = true;
        self.state.started_at_ms = Some(now);

        if let Some(remaining) = self.state.time_remaining_ms {
            self.interval = Some(CountdownInterval {
                anchor_ms: now,
                remaining_at_anchor_ms: remaining,
            });
        }
        log::info!(
            "session started (score {}, lives {}, remaining {:?}ms)",
            self.state.score,
            self.state.lives,
            self.state.time_remaining_ms
        );
    }

    pub fn pause(&mut self) {
        self.settle_countdown();
        self.stop_running();
    }

    pub fn reset(&mut self) {
        self.stop_running();
        self.state = SessionState::initial(&self.config);
        self.last_scored_at_ms = None;
        log::info!("session reset");
    }

    /// Score `points` scaled by the combo multiplier; returns the contribution
    pub fn add_points(&mut self, points: u32) -> u64 {
        let now = self.clock.now_ms();

        let within_combo = self
            .last_scored_at_ms
            .is_some_and(|last| now.saturating_sub(last) <= self.config.combo_window_ms);
        self.state.streak = if within_combo {
            self.state.streak.saturating_add(1)
        } else {
            1
        };

        let multiplier = self.state.streak.min(MAX_COMBO_MULTIPLIER);
        let contribution = u64::from(points) * u64::from(multiplier);
        self.state.score = self.state.score.saturating_add(contribution);
        self.last_scored_at_ms = Some(now);

        log::debug!(
            "+{contribution} ({points} x{multiplier}), streak {}, score {}",
            self.state.streak,
            self.state.score
        );
        contribution
    }

    /// Any life-loss call clears the streak, even when `count` is zero
    pub fn lose_life(&mut self, count: u32) {
        self.state.lives = self.state.lives.saturating_sub(count);
        self.state.streak = 0;
    }

    pub fn miss(&mut self) {
        self.lose_life(1);
    }

    /// Submit `final_score` against the configured challenge off-thread.
    ///
    /// Returns `None` when the session has no challenge, no game type, or no
    /// submitter. Engine state is never touched by the outcome.
    pub fn save_game_score(&self, final_score: u64) -> Option<SaveHandle> {
        let (challenge_id, game_type) = self.config.submission_target()?;
        let Some(submitter) = self.submitter.clone() else {
            log::debug!("no submitter configured; {game_type} score {final_score} kept local");
            return None;
        };

        log::info!("submitting {game_type} score {final_score} for challenge {challenge_id}");
        Some(SaveHandle::spawn(
            submitter,
            self.notifier.clone(),
            challenge_id.to_string(),
            final_score,
        ))
    }

    /// Interval callback: recompute the countdown from its anchor
    pub fn tick(&mut self) {
        let Some(interval) = self.interval else {
            return;
        };

        let remaining = interval.remaining_at(self.clock.now_ms());
        self.state.time_remaining_ms = Some(remaining);
        if remaining == 0 {
            log::info!("countdown expired with score {}", self.state.score);
            self.stop_running();
        }
    }

    fn settle_countdown(&mut self) {
        if let Some(interval) = self.interval {
            self.state.time_remaining_ms = Some(interval.remaining_at(self.clock.now_ms()));
        }
    }

    /// Single exit path out of the running state; releases the interval
    fn stop_running(&mut self) {
        if self.interval.take().is_some() {
            log::debug!("countdown interval released");
        }
        self.state.is_running = false;
    }
}

impl<C: Clock> Drop for GameEngine<C> {
    fn drop(&mut self) {
        self.stop_running();
    }
}

impl<C: Clock> std::fmt::Debug for GameEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("last_scored_at_ms", &self.last_scored_at_ms)
            .field("interval", &self.interval)
            .field("has_submitter", &self.submitter.is_some())
            .finish()
    }
}
