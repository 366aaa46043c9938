use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_LIVES: u32 = 3;
pub const DEFAULT_COMBO_WINDOW_MS: u64 = 4000;

/// Which mini-game a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Quiz,
    Sorting,
    CarbonCalculator,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("a session needs at least one life")]
    NoLives,

    #[error("a timed session needs a non-zero time budget")]
    EmptyTimeBudget,
}

/// Construction-time settings for one play session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_lives: u32,
    pub initial_score: u64,
    pub combo_window_ms: u64,
    pub initial_time_ms: Option<u64>,
    pub auto_start: bool,
    pub challenge_id: Option<String>,
    pub game_type: Option<GameKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_lives: DEFAULT_LIVES,
            initial_score: 0,
            combo_window_ms: DEFAULT_COMBO_WINDOW_MS,
            initial_time_ms: None,
            auto_start: true,
            challenge_id: None,
            game_type: None,
        }
    }
}

impl EngineConfig {
    pub fn timed(mut self, time_ms: u64) -> Self {
        self.initial_time_ms = Some(time_ms);
        self
    }

    pub fn for_challenge(mut self, challenge_id: impl Into<String>, game_type: GameKind) -> Self {
        self.challenge_id = Some(challenge_id.into());
        self.game_type = Some(game_type);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_lives == 0 {
            return Err(ConfigError::NoLives);
        }
        if self.initial_time_ms == Some(0) {
            return Err(ConfigError::EmptyTimeBudget);
        }
        Ok(())
    }

    /// Both identifiers are required before a final score can be submitted
    pub fn submission_target(&self) -> Option<(&str, GameKind)> {
        match (&self.challenge_id, self.game_type) {
            (Some(id), Some(kind)) => Some((id.as_str(), kind)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Paused,
}

/// Observable state of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub score: u64,
    pub streak: u32,
    pub lives: u32,
    pub max_lives: u32,
    pub is_running: bool,
    pub started_at_ms: Option<u64>,
    pub initial_time_ms: Option<u64>,
    pub time_remaining_ms: Option<u64>,
}

impl SessionState {
    pub fn initial(config: &EngineConfig) -> Self {
        Self {
            score: config.initial_score,
            streak: 0,
            lives: config.initial_lives,
            max_lives: config.initial_lives,
            is_running: false,
            started_at_ms: None,
            initial_time_ms: config.initial_time_ms,
            time_remaining_ms: config.initial_time_ms,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.is_running {
            Phase::Running
        } else if self.started_at_ms.is_none() {
            Phase::Idle
        } else {
            Phase::Paused
        }
    }

    pub fn is_expired(&self) -> bool {
        self.time_remaining_ms == Some(0)
    }

    pub fn is_out_of_lives(&self) -> bool {
        self.lives == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = EngineConfig::default();

        assert_eq!(cfg.initial_lives, 3);
        assert_eq!(cfg.initial_score, 0);
        assert_eq!(cfg.combo_window_ms, 4000);
        assert_eq!(cfg.initial_time_ms, None);
        assert!(cfg.auto_start);
        assert!(cfg.submission_target().is_none());
    }

    #[test]
    fn validate_rejects_zero_lives_and_empty_budget() {
        let no_lives = EngineConfig {
            initial_lives: 0,
            ..EngineConfig::default()
        };
        assert_matches!(no_lives.validate(), Err(ConfigError::NoLives));

        let empty = EngineConfig::default().timed(0);
        assert_matches!(empty.validate(), Err(ConfigError::EmptyTimeBudget));

        assert!(EngineConfig::default().timed(1).validate().is_ok());
    }

    #[test]
    fn submission_target_needs_both_identifiers() {
        let mut cfg = EngineConfig {
            challenge_id: Some("weekly-1".into()),
            ..EngineConfig::default()
        };
        assert!(cfg.submission_target().is_none());

        cfg.game_type = Some(GameKind::Quiz);
        assert_eq!(cfg.submission_target(), Some(("weekly-1", GameKind::Quiz)));
    }

    #[test]
    fn phase_follows_running_and_start_marker() {
        let mut state = SessionState::initial(&EngineConfig::default());
        assert_eq!(state.phase(), Phase::Idle);

        state.is_running = true;
        state.started_at_ms = Some(10);
        assert_eq!(state.phase(), Phase::Running);

        state.is_running = false;
        assert_eq!(state.phase(), Phase::Paused);
    }

    #[test]
    fn game_kind_displays_snake_case() {
        assert_eq!(GameKind::CarbonCalculator.to_string(), "carbon_calculator");
        assert_eq!(GameKind::Quiz.to_string(), "quiz");
    }
}
