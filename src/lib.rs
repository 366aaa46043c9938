// Library surface for the game engine, mini-games and bookkeeping.
// The terminal front-end in main.rs is a thin consumer of these modules.
pub mod app_dirs;
pub mod carbon;
pub mod challenge;
pub mod clock;
pub mod config;
pub mod engine;
pub mod games;
pub mod runtime;
pub mod session;
pub mod store;

pub use challenge::{ChallengeSubmitter, Notification, Notifier, SaveHandle, SubmitError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{GameEngine, COUNTDOWN_POLL, MAX_COMBO_MULTIPLIER};
pub use session::{ConfigError, EngineConfig, GameKind, Phase, SessionState};
