use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

use crate::clock::{Clock, SystemClock};
use crate::engine::COUNTDOWN_POLL;

/// Unified event type consumed by the game loop
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    /// The event source went away; no further input will arrive
    Closed,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // Windows reports releases too; only presses drive the game
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    tx.send(GameEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(GameEvent::Resize),
                Ok(_) => Ok(()),
                Err(err) => {
                    log::warn!("terminal event reader stopped: {err}");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Ticker at the engine's countdown poll cadence
    pub fn countdown() -> Self {
        Self::new(COUNTDOWN_POLL)
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-backed event source for tests and headless drivers
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Interleaves input events with ticks on a fixed cadence.
///
/// The next tick has a deadline on `clock`. Once it has passed, `step`
/// yields `Tick` before any pending input, so a steady stream of key
/// presses cannot hold the countdown poll back.
pub struct Runner<E: GameEventSource, T: Ticker, C: Clock = SystemClock> {
    event_source: E,
    ticker: T,
    clock: C,
    next_tick_ms: u64,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self::with_clock(event_source, ticker, SystemClock::new())
    }
}

impl<E: GameEventSource, T: Ticker, C: Clock> Runner<E, T, C> {
    pub fn with_clock(event_source: E, ticker: T, clock: C) -> Self {
        let next_tick_ms = clock.now_ms() + interval_ms(&ticker);
        Self {
            event_source,
            ticker,
            clock,
            next_tick_ms,
        }
    }

    /// Next event, `Tick` when the deadline is due, or `Closed` once the
    /// source is gone
    pub fn step(&mut self) -> GameEvent {
        let now = self.clock.now_ms();
        if now >= self.next_tick_ms {
            return self.tick_due(now);
        }

        let wait = Duration::from_millis(self.next_tick_ms - now);
        match self.event_source.recv_timeout(wait) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => {
                self.next_tick_ms = self.clock.now_ms() + interval_ms(&self.ticker);
                GameEvent::Tick
            }
            Err(RecvTimeoutError::Disconnected) => GameEvent::Closed,
        }
    }

    fn tick_due(&mut self, now: u64) -> GameEvent {
        let interval = interval_ms(&self.ticker);
        // Keep the cadence, but never replay a backlog of missed ticks
        self.next_tick_ms = if now >= self.next_tick_ms + interval {
            now + interval
        } else {
            self.next_tick_ms + interval
        };
        GameEvent::Tick
    }
}

fn interval_ms<T: Ticker>(ticker: &T) -> u64 {
    (ticker.interval().as_millis() as u64).max(1)
}
