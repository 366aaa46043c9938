use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use super::{load_embedded, BankError, Round, RoundItem};
use crate::session::GameKind;

pub const QUIZ_POINTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: usize,
    pub fact: String,
}

impl RoundItem for Question {
    const KIND: GameKind = GameKind::Quiz;
    const POINTS: u32 = QUIZ_POINTS;

    fn prompt(&self) -> String {
        self.prompt.clone()
    }

    fn choices(&self) -> Vec<String> {
        self.options.clone()
    }

    fn is_correct(&self, choice: usize) -> bool {
        choice == self.answer
    }

    fn feedback(&self) -> String {
        match self.options.get(self.answer) {
            Some(answer) => format!("{answer}. {}", self.fact),
            None => self.fact.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionBank {
    pub name: String,
    pub questions: Vec<Question>,
}

impl QuestionBank {
    pub fn embedded() -> Result<Self, BankError> {
        load_embedded("quiz.json")
    }

    /// Up to `count` distinct questions in random order
    pub fn draw<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Question> {
        self.questions.choose_multiple(rng, count).cloned().collect()
    }
}

pub type QuizRound<C = crate::clock::SystemClock> = Round<Question, C>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::GameEngine;
    use crate::games::{MiniGame, RoundError};
    use crate::session::EngineConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn question(answer: usize) -> Question {
        Question {
            prompt: "Pick one".into(),
            options: vec!["a".into(), "b".into(), "c".into()],
            answer,
            fact: "Because.".into(),
        }
    }

    fn round(questions: Vec<Question>) -> (QuizRound<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let engine = GameEngine::with_clock(EngineConfig::default(), clock.clone()).unwrap();
        (QuizRound::new(questions, engine), clock)
    }

    #[test]
    fn embedded_bank_is_well_formed() {
        let bank = QuestionBank::embedded().unwrap();
        assert_eq!(bank.name, "eco_quiz");
        assert!(bank.questions.len() >= 10);
        for q in &bank.questions {
            assert!(q.answer < q.options.len(), "bad answer index for {}", q.prompt);
        }
    }

    #[test]
    fn draw_returns_distinct_questions() {
        let bank = QuestionBank::embedded().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let drawn = bank.draw(5, &mut rng);
        assert_eq!(drawn.len(), 5);
        for (i, q) in drawn.iter().enumerate() {
            assert!(!drawn[i + 1..].contains(q));
        }

        assert_eq!(bank.draw(1000, &mut rng).len(), bank.questions.len());
    }

    #[test]
    fn correct_answers_build_a_combo() {
        let (mut round, clock) = round(vec![question(0), question(1), question(2)]);

        clock.advance_ms(500);
        assert_eq!(round.choose(0).unwrap().points, 10);
        clock.advance_ms(500);
        assert_eq!(round.choose(1).unwrap().points, 20);
        clock.advance_ms(500);
        let last = round.choose(2).unwrap();
        assert_eq!(last.points, 30);
        assert_eq!(last.feedback, "c. Because.");

        assert!(round.is_finished());
        assert_eq!(round.engine().score(), 60);
        assert_eq!(round.choose(0), Err(RoundError::Finished));
    }

    #[test]
    fn wrong_answer_costs_a_life_and_breaks_combo() {
        let (mut round, _) = round(vec![question(0), question(0), question(0)]);
        round.choose(0).unwrap();
        let miss = round.choose(2).unwrap();

        assert!(!miss.correct);
        assert_eq!(miss.points, 0);
        assert_eq!(round.engine().lives(), 2);
        assert_eq!(round.engine().streak(), 0);
        assert_eq!(round.choose(0).unwrap().points, 10);
        assert_eq!(round.progress(), (3, 3));
    }

    #[test]
    fn out_of_range_choice_is_rejected_without_side_effects() {
        let (mut round, _) = round(vec![question(0)]);
        assert_eq!(
            round.choose(3),
            Err(RoundError::InvalidChoice {
                choice: 3,
                available: 3
            })
        );
        assert_eq!(round.progress(), (0, 1));
        assert_eq!(round.engine().lives(), 3);
    }

    #[test]
    fn paused_round_refuses_answers() {
        let (mut round, _) = round(vec![question(0)]);
        round.engine_mut().pause();
        assert_eq!(round.choose(0), Err(RoundError::NotRunning));

        round.engine_mut().start();
        assert!(round.choose(0).unwrap().correct);
    }
}
