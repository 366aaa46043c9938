//! Carbon footprint calculator and its local bookkeeping.
//!
//! Every calculation is appended to a short history, folded into a per-day
//! record, advances the day streak and may unlock achievements. All of it
//! lives in a [`KeyValueStore`] under `carbon:` keys.

use chrono::{DateTime, Local, NaiveDate};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::store::{JsonStoreExt, KeyValueStore, Result};

pub const CAR_KG_PER_KM: f64 = 0.17;
pub const TRANSIT_KG_PER_KM: f64 = 0.05;
pub const ELECTRICITY_KG_PER_KWH: f64 = 0.23;
pub const MEAT_KG_PER_MEAL: f64 = 2.5;
pub const PLASTIC_KG_PER_ITEM: f64 = 0.08;

pub const LOW_FOOTPRINT_KG: f64 = 5.0;
pub const MEDIUM_FOOTPRINT_KG: f64 = 12.0;
pub const HISTORY_LIMIT: usize = 30;

const HISTORY_KEY: &str = "carbon:history";
const ACHIEVEMENTS_KEY: &str = "carbon:achievements";
const STREAK_KEY: &str = "carbon:streak";
const DAY_KEY_PREFIX: &str = "carbon:day:";

/// One day of activity entered by the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarbonInputs {
    pub car_km: f64,
    pub transit_km: f64,
    pub electricity_kwh: f64,
    pub meat_meals: u32,
    pub plastic_items: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarbonBreakdown {
    pub transport_kg: f64,
    pub energy_kg: f64,
    pub food_kg: f64,
    pub waste_kg: f64,
}

impl CarbonBreakdown {
    pub fn total_kg(&self) -> f64 {
        self.transport_kg + self.energy_kg + self.food_kg + self.waste_kg
    }
}

pub fn footprint(inputs: &CarbonInputs) -> CarbonBreakdown {
    CarbonBreakdown {
        transport_kg: inputs.car_km.max(0.0) * CAR_KG_PER_KM
            + inputs.transit_km.max(0.0) * TRANSIT_KG_PER_KM,
        energy_kg: inputs.electricity_kwh.max(0.0) * ELECTRICITY_KG_PER_KWH,
        food_kg: f64::from(inputs.meat_meals) * MEAT_KG_PER_MEAL,
        waste_kg: f64::from(inputs.plastic_items) * PLASTIC_KG_PER_ITEM,
    }
}

/// Points awarded for submitting a calculation; lighter days earn more
pub fn calculation_points(total_kg: f64) -> u32 {
    if total_kg < LOW_FOOTPRINT_KG {
        30
    } else if total_kg < MEDIUM_FOOTPRINT_KG {
        20
    } else {
        10
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    #[strum(serialize = "First Steps")]
    FirstCalculation,
    #[strum(serialize = "Light Footprint")]
    LowFootprint,
    #[strum(serialize = "Getting Better")]
    Improved,
    #[strum(serialize = "Three in a Row")]
    ThreeDayStreak,
    #[strum(serialize = "Green Week")]
    WeekStreak,
    #[strum(serialize = "Carbon Counter")]
    TenCalculations,
}

impl Achievement {
    pub fn description(&self) -> &'static str {
        match self {
            Achievement::FirstCalculation => "Complete your first footprint calculation",
            Achievement::LowFootprint => "Log a day under 5 kg CO2e",
            Achievement::Improved => "Beat your previous calculation",
            Achievement::ThreeDayStreak => "Calculate three days in a row",
            Achievement::WeekStreak => "Calculate seven days in a row",
            Achievement::TenCalculations => "Complete ten calculations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub achievement: Achievement,
    pub unlocked_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub recorded_at: DateTime<Local>,
    pub inputs: CarbonInputs,
    pub total_kg: f64,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStreak {
    pub current: u32,
    pub best: u32,
    pub last_played: Option<NaiveDate>,
}

impl DayStreak {
    fn advance(&mut self, today: NaiveDate) {
        self.current = match self.last_played {
            Some(last) if last == today => self.current.max(1),
            Some(last) if last.succ_opt() == Some(today) => self.current + 1,
            // Backdated entries neither extend nor break the streak
            Some(last) if last > today => return,
            _ => 1,
        };
        self.best = self.best.max(self.current);
        self.last_played = Some(today);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub calculations: u32,
    pub best_total_kg: Option<f64>,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculationReport {
    pub breakdown: CarbonBreakdown,
    pub total_kg: f64,
    pub points: u32,
    pub streak: DayStreak,
    pub new_achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub calculations: usize,
    pub mean_total_kg: Option<f64>,
    pub std_dev_total_kg: Option<f64>,
    pub best_day: Option<(NaiveDate, f64)>,
}

#[derive(Serialize)]
struct CsvRow {
    date: NaiveDate,
    total_kg: String,
    points: u32,
}

/// Carbon calculator bookkeeping over a key-value store
#[derive(Debug)]
pub struct CarbonTracker<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> CarbonTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn record_calculation(
        &mut self,
        inputs: CarbonInputs,
        today: NaiveDate,
    ) -> Result<CalculationReport> {
        let breakdown = footprint(&inputs);
        let total_kg = breakdown.total_kg();
        let points = calculation_points(total_kg);

        let mut history = self.history()?;
        let previous_total = history.first().map(|e| e.total_kg);
        history.insert(
            0,
            HistoryEntry {
                date: today,
                recorded_at: Local::now(),
                inputs,
                total_kg,
                points,
            },
        );
        history.truncate(HISTORY_LIMIT);
        self.store.set_json(HISTORY_KEY, &history)?;

        let key = day_key(today);
        let mut day: DayRecord = self.store.get_json(&key)?.unwrap_or_default();
        day.calculations += 1;
        day.points += points;
        day.best_total_kg = Some(day.best_total_kg.map_or(total_kg, |b| b.min(total_kg)));
        self.store.set_json(&key, &day)?;

        let mut streak = self.streak()?;
        streak.advance(today);
        self.store.set_json(STREAK_KEY, &streak)?;

        let total_calculations = self.total_calculations()?;
        let earned = [
            (Achievement::FirstCalculation, true),
            (Achievement::LowFootprint, total_kg < LOW_FOOTPRINT_KG),
            (
                Achievement::Improved,
                previous_total.is_some_and(|prev| total_kg < prev),
            ),
            (Achievement::ThreeDayStreak, streak.current >= 3),
            (Achievement::WeekStreak, streak.current >= 7),
            (Achievement::TenCalculations, total_calculations >= 10),
        ];

        let mut unlocked = self.achievements()?;
        let new_achievements: Vec<Achievement> = earned
            .into_iter()
            .filter(|(a, met)| *met && !unlocked.iter().any(|u| u.achievement == *a))
            .map(|(a, _)| a)
            .collect();
        if !new_achievements.is_empty() {
            unlocked.extend(new_achievements.iter().map(|&achievement| UnlockedAchievement {
                achievement,
                unlocked_on: today,
            }));
            self.store.set_json(ACHIEVEMENTS_KEY, &unlocked)?;
            log::info!("unlocked achievements: {}", new_achievements.iter().join(", "));
        }

        Ok(CalculationReport {
            breakdown,
            total_kg,
            points,
            streak,
            new_achievements,
        })
    }

    /// Newest first, at most [`HISTORY_LIMIT`] entries
    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.store.get_json(HISTORY_KEY)?.unwrap_or_default())
    }

    pub fn achievements(&self) -> Result<Vec<UnlockedAchievement>> {
        Ok(self.store.get_json(ACHIEVEMENTS_KEY)?.unwrap_or_default())
    }

    pub fn streak(&self) -> Result<DayStreak> {
        Ok(self.store.get_json(STREAK_KEY)?.unwrap_or_default())
    }

    pub fn day(&self, date: NaiveDate) -> Result<Option<DayRecord>> {
        self.store.get_json(&day_key(date))
    }

    /// Calculations across all days, including those trimmed from history
    pub fn total_calculations(&self) -> Result<u32> {
        let mut total = 0;
        for key in self.store.keys_with_prefix(DAY_KEY_PREFIX)? {
            if let Some(day) = self.store.get_json::<DayRecord>(&key)? {
                total += day.calculations;
            }
        }
        Ok(total)
    }

    pub fn summary(&self) -> Result<HistorySummary> {
        let history = self.history()?;
        let totals = history.iter().map(|e| e.total_kg).collect_vec();

        let mean = (!totals.is_empty()).then(|| totals.iter().sum::<f64>() / totals.len() as f64);
        let std_dev = mean.map(|m| {
            let variance =
                totals.iter().map(|t| (t - m) * (t - m)).sum::<f64>() / totals.len() as f64;
            variance.sqrt()
        });

        let best_day = history
            .iter()
            .into_group_map_by(|e| e.date)
            .into_iter()
            .map(|(date, entries)| {
                let best = entries
                    .iter()
                    .map(|e| e.total_kg)
                    .fold(f64::INFINITY, f64::min);
                (date, best)
            })
            .sorted_by_key(|(date, _)| *date)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        Ok(HistorySummary {
            calculations: history.len(),
            mean_total_kg: mean,
            std_dev_total_kg: std_dev,
            best_day,
        })
    }

    /// Write history oldest first as `date,total_kg,points`
    pub fn export_history_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for entry in self.history()?.iter().rev() {
            csv.serialize(CsvRow {
                date: entry.date,
                total_kg: format!("{:.2}", entry.total_kg),
                points: entry.points,
            })?;
        }
        csv.flush()?;
        Ok(())
    }
}

fn day_key(date: NaiveDate) -> String {
    format!("{DAY_KEY_PREFIX}{}", date.format("%Y-%m-%d"))
}
