//! Mini-game rounds that drive a [`GameEngine`].
//!
//! A round walks through a list of items; a correct choice scores the item's
//! points through the engine's combo logic and a wrong one costs a life.

pub mod quiz;
pub mod sorting;

use include_dir::{include_dir, Dir};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::challenge::SaveHandle;
use crate::clock::{Clock, SystemClock};
use crate::engine::GameEngine;
use crate::session::GameKind;

pub use quiz::{Question, QuestionBank, QuizRound, QUIZ_POINTS};
pub use sorting::{Bin, SortItem, SortingDeck, SortingRound, SORTING_POINTS};

static DATA_DIR: Dir = include_dir!("src/games/data");

#[derive(Debug, Error)]
pub enum BankError {
    #[error("embedded game data {0} not found")]
    Missing(String),

    #[error("embedded game data {0} is not valid UTF-8")]
    Encoding(String),

    #[error("could not parse game data: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("the round is over")]
    Finished,

    #[error("the round is paused")]
    NotRunning,

    #[error("choice {choice} is out of range (0..{available})")]
    InvalidChoice { choice: usize, available: usize },
}

fn load_embedded<T: DeserializeOwned>(file_name: &str) -> Result<T, BankError> {
    let file = DATA_DIR
        .get_file(file_name)
        .ok_or_else(|| BankError::Missing(file_name.to_string()))?;
    let text = file
        .contents_utf8()
        .ok_or_else(|| BankError::Encoding(file_name.to_string()))?;
    Ok(serde_json::from_str(text)?)
}

/// One answerable step of a round
pub trait RoundItem {
    const KIND: GameKind;
    const POINTS: u32;

    fn prompt(&self) -> String;
    fn choices(&self) -> Vec<String>;
    fn is_correct(&self, choice: usize) -> bool;
    fn feedback(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOutcome {
    pub correct: bool,
    pub points: u64,
    pub feedback: String,
}

/// Uniform surface the terminal front-end plays against
pub trait MiniGame<C: Clock = SystemClock> {
    fn kind(&self) -> GameKind;
    fn prompt(&self) -> Option<String>;
    fn choices(&self) -> Vec<String>;
    fn choose(&mut self, choice: usize) -> Result<ChoiceOutcome, RoundError>;
    /// (answered, total)
    fn progress(&self) -> (usize, usize);
    fn last_outcome(&self) -> Option<&ChoiceOutcome>;
    fn engine(&self) -> &GameEngine<C>;
    fn engine_mut(&mut self) -> &mut GameEngine<C>;
    fn is_finished(&self) -> bool;
    /// Stop the clock and submit the final score; only the first call submits
    fn finish(&mut self) -> Option<SaveHandle>;
}

#[derive(Debug)]
pub struct Round<T: RoundItem, C: Clock = SystemClock> {
    items: Vec<T>,
    index: usize,
    engine: GameEngine<C>,
    last_outcome: Option<ChoiceOutcome>,
    submitted: bool,
}

impl<T: RoundItem, C: Clock> Round<T, C> {
    pub fn new(items: Vec<T>, engine: GameEngine<C>) -> Self {
        Self {
            items,
            index: 0,
            engine,
            last_outcome: None,
            submitted: false,
        }
    }

    pub fn current(&self) -> Option<&T> {
        if self.is_over() {
            None
        } else {
            self.items.get(self.index)
        }
    }

    fn is_over(&self) -> bool {
        self.index >= self.items.len() || self.engine.lives() == 0 || self.engine.is_expired()
    }
}

impl<T: RoundItem, C: Clock> MiniGame<C> for Round<T, C> {
    fn kind(&self) -> GameKind {
        T::KIND
    }

    fn prompt(&self) -> Option<String> {
        self.current().map(T::prompt)
    }

    fn choices(&self) -> Vec<String> {
        self.current().map(T::choices).unwrap_or_default()
    }

    fn choose(&mut self, choice: usize) -> Result<ChoiceOutcome, RoundError> {
        // An answer arriving after the budget ran out must not score
        self.engine.tick();
        let item = self.current().ok_or(RoundError::Finished)?;
        if !self.engine.is_running() {
            return Err(RoundError::NotRunning);
        }
        let available = item.choices().len();
        if choice >= available {
            return Err(RoundError::InvalidChoice { choice, available });
        }

        let correct = item.is_correct(choice);
        let feedback = item.feedback();
        let points = if correct {
            self.engine.add_points(T::POINTS)
        } else {
            self.engine.miss();
            0
        };
        self.index += 1;

        let outcome = ChoiceOutcome {
            correct,
            points,
            feedback,
        };
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    fn progress(&self) -> (usize, usize) {
        (self.index.min(self.items.len()), self.items.len())
    }

    fn last_outcome(&self) -> Option<&ChoiceOutcome> {
        self.last_outcome.as_ref()
    }

    fn engine(&self) -> &GameEngine<C> {
        &self.engine
    }

    fn engine_mut(&mut self) -> &mut GameEngine<C> {
        &mut self.engine
    }

    fn is_finished(&self) -> bool {
        self.is_over()
    }

    fn finish(&mut self) -> Option<SaveHandle> {
        self.engine.pause();
        if self.submitted {
            return None;
        }
        self.submitted = true;
        log::info!(
            "{} round finished: score {}, {} of {} answered",
            T::KIND,
            self.engine.score(),
            self.index,
            self.items.len()
        );
        self.engine.save_game_score(self.engine.score())
    }
}
