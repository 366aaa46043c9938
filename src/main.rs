pub mod ui;

use std::{
    error::Error,
    io::{self, stdin},
    sync::Arc,
};

use chrono::Local;
use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use ecoquest::{
    carbon::{CarbonInputs, CarbonTracker},
    challenge::{ChallengeSubmitter, LocalChallengeLog, NotificationQueue, SaveHandle},
    config::{Config, ConfigStore, FileConfigStore},
    games::{MiniGame, QuestionBank, QuizRound, SortingDeck, SortingRound},
    runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner},
    store::SqliteStore,
    EngineConfig, GameEngine, GameKind,
};

/// eco-themed quiz and sorting games with combos, lives and countdowns
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Play eco-themed mini-games in the terminal, track your daily carbon footprint, and keep your streak going."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// play a mini-game round (default)
    Play(PlayArgs),
    /// record today's carbon footprint calculation
    Carbon(CarbonArgs),
    /// print carbon calculation history as csv
    History,
    /// list unlocked achievements and the current day streak
    Achievements,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PlayArgs {
    /// which mini-game to play
    #[clap(short = 'g', long, value_enum, default_value_t = SupportedGame::Quiz)]
    game: SupportedGame,

    /// number of lives
    #[clap(short = 'l', long)]
    lives: Option<u32>,

    /// number of seconds on the countdown
    #[clap(short = 's', long)]
    secs: Option<u64>,

    /// play without a countdown
    #[clap(long, conflicts_with = "secs")]
    untimed: bool,

    /// maximum gap between correct answers that keeps a combo alive
    #[clap(long)]
    combo_window_ms: Option<u64>,

    /// number of questions or items in the round
    #[clap(short = 'n', long)]
    items: Option<usize>,

    /// challenge to submit the final score to
    #[clap(short = 'c', long)]
    challenge: Option<String>,

    /// remember these settings as the new defaults
    #[clap(long)]
    save: bool,
}

#[derive(Args, Debug, Clone)]
struct CarbonArgs {
    /// kilometres driven by car
    #[clap(long, default_value_t = 0.0)]
    car_km: f64,

    /// kilometres by bus or train
    #[clap(long, default_value_t = 0.0)]
    transit_km: f64,

    /// electricity used at home, in kWh
    #[clap(long, default_value_t = 0.0)]
    electricity_kwh: f64,

    /// meals containing meat
    #[clap(long, default_value_t = 0)]
    meat_meals: u32,

    /// single-use plastic items thrown away
    #[clap(long, default_value_t = 0)]
    plastic_items: u32,

    /// challenge to submit the calculation points to
    #[clap(short = 'c', long)]
    challenge: Option<String>,
}

#[derive(Debug, Copy, Clone, Default, ValueEnum, strum_macros::Display)]
pub enum SupportedGame {
    #[default]
    Quiz,
    Sorting,
}

impl SupportedGame {
    fn as_kind(&self) -> GameKind {
        match self {
            SupportedGame::Quiz => GameKind::Quiz,
            SupportedGame::Sorting => GameKind::Sorting,
        }
    }
}

impl PlayArgs {
    /// Command-line flags layered over the persisted defaults
    fn apply_to(&self, mut cfg: Config) -> Config {
        if let Some(lives) = self.lives {
            cfg.lives = lives;
        }
        if let Some(secs) = self.secs {
            cfg.time_limit_secs = Some(secs);
        }
        if self.untimed {
            cfg.time_limit_secs = None;
        }
        if let Some(window) = self.combo_window_ms {
            cfg.combo_window_ms = window;
        }
        if let Some(items) = self.items {
            cfg.round_length = items;
        }
        cfg
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Playing,
    Results,
}

pub struct App {
    pub game: SupportedGame,
    pub settings: Config,
    pub challenge: Option<String>,
    pub round: Box<dyn MiniGame>,
    pub state: AppState,
    pub notifications: NotificationQueue,
    pub messages: Vec<String>,
    pub save_status: Option<String>,
    pending_save: Option<SaveHandle>,
    submitter: Option<Arc<dyn ChallengeSubmitter>>,
}

impl App {
    pub fn new(
        game: SupportedGame,
        settings: Config,
        challenge: Option<String>,
        submitter: Option<Arc<dyn ChallengeSubmitter>>,
    ) -> Result<Self, Box<dyn Error>> {
        let notifications = NotificationQueue::new();
        let round = new_round(game, &settings, &challenge, &submitter, &notifications)?;

        Ok(Self {
            game,
            settings,
            challenge,
            round,
            state: AppState::Playing,
            notifications,
            messages: vec![],
            save_status: None,
            pending_save: None,
            submitter,
        })
    }

    pub fn restart(&mut self) -> Result<(), Box<dyn Error>> {
        self.round = new_round(
            self.game,
            &self.settings,
            &self.challenge,
            &self.submitter,
            &self.notifications,
        )?;
        self.state = AppState::Playing;
        self.save_status = None;
        self.pending_save = None;
        Ok(())
    }

    pub fn on_tick(&mut self) {
        self.round.engine_mut().tick();
        if self.state == AppState::Playing && self.round.is_finished() {
            self.end_round();
        }

        if let Some(outcome) = self.pending_save.as_ref().and_then(|h| h.try_outcome()) {
            self.save_status = Some(match outcome {
                Ok(()) => "Score saved to the challenge.".to_string(),
                Err(err) => format!("Score not saved: {err}"),
            });
            self.pending_save = None;
        }

        self.messages
            .extend(self.notifications.drain().iter().map(|n| n.message()));
    }

    pub fn toggle_pause(&mut self) {
        let engine = self.round.engine_mut();
        if engine.is_running() {
            engine.pause();
        } else {
            engine.start();
        }
    }

    pub fn choose(&mut self, choice: usize) {
        if self.state != AppState::Playing {
            return;
        }
        if let Err(err) = self.round.choose(choice) {
            log::debug!("choice ignored: {err}");
        }
        if self.round.is_finished() {
            self.end_round();
        }
    }

    fn end_round(&mut self) {
        self.state = AppState::Results;
        self.pending_save = self.round.finish();
        if self.pending_save.is_some() {
            self.save_status = Some("Saving score...".to_string());
        }
    }
}

fn new_round(
    game: SupportedGame,
    settings: &Config,
    challenge: &Option<String>,
    submitter: &Option<Arc<dyn ChallengeSubmitter>>,
    notifications: &NotificationQueue,
) -> Result<Box<dyn MiniGame>, Box<dyn Error>> {
    let config: EngineConfig = settings.engine_config(game.as_kind(), challenge.clone());
    let mut engine = GameEngine::new(config)?.with_notifier(Arc::new(notifications.clone()));
    if let Some(submitter) = submitter {
        engine = engine.with_submitter(submitter.clone());
    }

    let mut rng = rand::thread_rng();
    let round: Box<dyn MiniGame> = match game {
        SupportedGame::Quiz => {
            let questions = QuestionBank::embedded()?.draw(settings.round_length, &mut rng);
            Box::new(QuizRound::new(questions, engine))
        }
        SupportedGame::Sorting => {
            let items = SortingDeck::embedded()?.draw(settings.round_length, &mut rng);
            Box::new(SortingRound::new(items, engine))
        }
    };
    Ok(round)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Play(PlayArgs::default())) {
        Command::Play(args) => play(args),
        Command::Carbon(args) => record_carbon(args),
        Command::History => {
            let tracker = CarbonTracker::new(SqliteStore::open_default()?);
            tracker.export_history_csv(io::stdout())?;
            Ok(())
        }
        Command::Achievements => list_achievements(),
    }
}

fn play(args: PlayArgs) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let settings = args.apply_to(config_store.load());
    if args.save {
        config_store.save(&settings)?;
    }

    let submitter: Option<Arc<dyn ChallengeSubmitter>> = match SqliteStore::open_default() {
        Ok(store) => Some(Arc::new(LocalChallengeLog::new(store))),
        Err(err) => {
            log::warn!("challenge log unavailable, scores stay local: {err}");
            None
        }
    };
    let mut app = App::new(args.game, settings, args.challenge, submitter)?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::countdown());

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            GameEvent::Tick => app.on_tick(),
            GameEvent::Resize => {}
            GameEvent::Closed => break,
            GameEvent::Key(key) => {
                if !handle_key(app, key)? {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Returns false when the player quits
fn handle_key(app: &mut App, key: KeyEvent) -> Result<bool, Box<dyn Error>> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Ok(false);
    }

    let playing = app.state == AppState::Playing;
    match (key.code, playing) {
        (KeyCode::Esc, _) | (KeyCode::Char('q'), false) => return Ok(false),
        (KeyCode::Char('r'), _) => app.restart()?,
        (KeyCode::Char('p') | KeyCode::Char(' '), true) => app.toggle_pause(),
        (KeyCode::Char(c), true) => {
            if let Some(digit) = c.to_digit(10).filter(|d| *d > 0) {
                app.choose(digit as usize - 1);
            }
        }
        _ => {}
    }
    Ok(true)
}

fn record_carbon(args: CarbonArgs) -> Result<(), Box<dyn Error>> {
    let inputs = CarbonInputs {
        car_km: args.car_km,
        transit_km: args.transit_km,
        electricity_kwh: args.electricity_kwh,
        meat_meals: args.meat_meals,
        plastic_items: args.plastic_items,
    };

    let mut tracker = CarbonTracker::new(SqliteStore::open_default()?);
    let report = tracker.record_calculation(inputs, Local::now().date_naive())?;

    println!("Transport: {:>6.2} kg CO2e", report.breakdown.transport_kg);
    println!("Energy:    {:>6.2} kg CO2e", report.breakdown.energy_kg);
    println!("Food:      {:>6.2} kg CO2e", report.breakdown.food_kg);
    println!("Waste:     {:>6.2} kg CO2e", report.breakdown.waste_kg);
    println!("Total:     {:>6.2} kg CO2e", report.total_kg);
    println!("Points earned: {}", report.points);
    println!(
        "Day streak: {} (best {})",
        report.streak.current, report.streak.best
    );
    for achievement in &report.new_achievements {
        println!("Achievement unlocked: {achievement} - {}", achievement.description());
    }

    if let Some(challenge) = args.challenge {
        let config = EngineConfig::default().for_challenge(challenge, GameKind::CarbonCalculator);
        let mut engine = GameEngine::new(config)?
            .with_submitter(Arc::new(LocalChallengeLog::new(SqliteStore::open_default()?)));
        engine.add_points(report.points);

        if let Some(handle) = engine.save_game_score(engine.score()) {
            match handle.wait() {
                Ok(()) => println!("Score submitted to the challenge."),
                Err(err) => println!("Score not saved ({err}), but you still played great!"),
            }
        }
    }

    Ok(())
}

fn list_achievements() -> Result<(), Box<dyn Error>> {
    let tracker = CarbonTracker::new(SqliteStore::open_default()?);
    let unlocked = tracker.achievements()?;

    if unlocked.is_empty() {
        println!("No achievements yet. Record a calculation with `ecoquest carbon`.");
    }
    for entry in &unlocked {
        println!(
            "{} ({}) - {}",
            entry.achievement,
            entry.unlocked_on,
            entry.achievement.description()
        );
    }

    let streak = tracker.streak()?;
    println!("Day streak: {} (best {})", streak.current, streak.best);
    Ok(())
}
