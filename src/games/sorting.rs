use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use super::{load_embedded, BankError, Round, RoundItem};
use crate::session::GameKind;

pub const SORTING_POINTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum Bin {
    Recycling,
    Compost,
    Landfill,
    Hazardous,
}

impl Bin {
    pub const ALL: [Bin; 4] = [Bin::Recycling, Bin::Compost, Bin::Landfill, Bin::Hazardous];

    pub fn position(self) -> usize {
        Bin::ALL.iter().position(|b| *b == self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortItem {
    pub name: String,
    pub bin: Bin,
    pub tip: String,
}

impl RoundItem for SortItem {
    const KIND: GameKind = GameKind::Sorting;
    const POINTS: u32 = SORTING_POINTS;

    fn prompt(&self) -> String {
        format!("Where does this go: {}?", self.name)
    }

    fn choices(&self) -> Vec<String> {
        Bin::ALL.iter().map(|b| b.to_string()).collect()
    }

    fn is_correct(&self, choice: usize) -> bool {
        Bin::ALL.get(choice) == Some(&self.bin)
    }

    fn feedback(&self) -> String {
        format!("{}: {}", self.bin, self.tip)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SortingDeck {
    pub name: String,
    pub items: Vec<SortItem>,
}

impl SortingDeck {
    pub fn embedded() -> Result<Self, BankError> {
        load_embedded("sorting.json")
    }

    pub fn draw<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<SortItem> {
        self.items.choose_multiple(rng, count).cloned().collect()
    }
}

pub type SortingRound<C = crate::clock::SystemClock> = Round<SortItem, C>;
