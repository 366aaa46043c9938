use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ecoquest::challenge::{LocalChallengeLog, NotificationQueue, SubmitError};
use ecoquest::games::{Bin, MiniGame, Question, QuizRound, SortItem, SortingRound};
use ecoquest::runtime::{FixedTicker, GameEvent, Runner, TestEventSource};
use ecoquest::store::MemoryStore;
use ecoquest::{EngineConfig, GameEngine, GameKind, ManualClock};

fn question(answer: usize) -> Question {
    Question {
        prompt: "Which one?".to_string(),
        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        answer,
        fact: "Fact.".to_string(),
    }
}

fn key(c: char) -> GameEvent {
    GameEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

// Drives a quiz round through the runner the way the terminal loop does,
// then submits the final score to a local challenge log.
#[test]
fn headless_quiz_round_submits_final_score() {
    let log = Arc::new(LocalChallengeLog::new(MemoryStore::new()));
    let clock = ManualClock::new();
    let config = EngineConfig::default().for_challenge("earth-day", GameKind::Quiz);
    let engine = GameEngine::with_clock(config, clock.clone())
        .unwrap()
        .with_submitter(log.clone());
    let mut round = QuizRound::new(vec![question(0), question(1), question(3)], engine);

    let (tx, rx) = mpsc::channel();
    let mut runner =
        Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_millis(5)));
    for c in ['1', '2', '3'] {
        tx.send(key(c)).unwrap();
    }

    for _ in 0..100u32 {
        match runner.step() {
            GameEvent::Tick => round.engine_mut().tick(),
            GameEvent::Resize => {}
            GameEvent::Closed => break,
            GameEvent::Key(key) => {
                if let KeyCode::Char(c) = key.code {
                    let choice = c.to_digit(10).unwrap() as usize - 1;
                    clock.advance_ms(300);
                    round.choose(choice).unwrap();
                }
            }
        }
        if round.is_finished() {
            break;
        }
    }

    assert!(round.is_finished());
    // 10 + 20 correct, third answer wrong
    assert_eq!(round.engine().score(), 30);
    assert_eq!(round.engine().lives(), 2);

    round.finish().expect("challenge configured").wait().unwrap();
    assert!(round.finish().is_none(), "only the first finish submits");
    assert_eq!(log.best_score("earth-day").unwrap(), Some(30));
}

#[test]
fn headless_timed_sorting_round_expires() {
    let clock = ManualClock::new();
    let engine = GameEngine::with_clock(EngineConfig::default().timed(300), clock.clone()).unwrap();
    let item = SortItem {
        name: "Glass jar".into(),
        bin: Bin::Recycling,
        tip: "Rinse it.".into(),
    };
    let mut round = SortingRound::new(vec![item; 5], engine);

    let (_tx, rx) = mpsc::channel();
    let mut runner =
        Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_millis(1)));

    for _ in 0..50u32 {
        if let GameEvent::Tick = runner.step() {
            clock.advance_ms(100);
            round.engine_mut().tick();
        }
        if round.is_finished() {
            break;
        }
    }

    assert!(round.is_finished(), "timed round should finish by timeout");
    assert!(round.engine().is_expired());
    assert!(!round.engine().is_running());
}

#[test]
fn countdown_keeps_ticking_while_keys_stream_in() {
    let (tx, rx) = mpsc::channel();
    let typist = thread::spawn(move || {
        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(700) {
            if tx.send(key('1')).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(30));
        }
    });

    let mut runner = Runner::new(TestEventSource::new(rx), FixedTicker::countdown());
    let start = Instant::now();
    let (mut ticks, mut keys) = (0, 0);
    while start.elapsed() < Duration::from_millis(550) {
        match runner.step() {
            GameEvent::Tick => ticks += 1,
            GameEvent::Key(_) => keys += 1,
            GameEvent::Resize => {}
            GameEvent::Closed => break,
        }
    }
    typist.join().unwrap();

    assert!(keys >= 10, "only {keys} keys arrived");
    assert!(ticks >= 3, "only {ticks} ticks in 550ms of typing");
}

#[test]
fn failed_submission_notifies_without_touching_the_round() {
    let queue = NotificationQueue::new();
    let clock = ManualClock::new();
    let engine = GameEngine::with_clock(
        EngineConfig::default().for_challenge("offline", GameKind::Sorting),
        clock,
    )
    .unwrap()
    .with_submitter(Arc::new(|_: &str, _: u64| -> Result<(), SubmitError> {
        Err(SubmitError::Rejected("service unavailable".into()))
    }))
    .with_notifier(Arc::new(queue.clone()));

    let item = SortItem {
        name: "Eggshells".into(),
        bin: Bin::Compost,
        tip: "Compost them.".into(),
    };
    let mut round = SortingRound::new(vec![item], engine);
    round.choose(Bin::Compost.position()).unwrap();
    let score = round.engine().score();

    let outcome = round.finish().unwrap().wait();
    assert!(outcome.is_err());
    assert_eq!(round.engine().score(), score);

    let notes = queue.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].message(), "Score not saved, but you still played great!");
}
