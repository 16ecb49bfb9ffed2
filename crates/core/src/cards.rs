use crate::rng::{pick_weighted, EntropySource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    ValueLow,
    ValueMid,
    ValueHigh,
    Oracle,
    Historacle,
    Bearish,
    Special,
}

impl Category {
    pub fn is_value(self) -> bool {
        matches!(
            self,
            Category::ValueLow
                | Category::ValueMid
                | Category::ValueHigh
                | Category::Oracle
                | Category::Historacle
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PenaltyKind {
    Reset,
    Half,
    MinusTen,
}

impl PenaltyKind {
    pub const ALL: [PenaltyKind; 3] = [PenaltyKind::Reset, PenaltyKind::Half, PenaltyKind::MinusTen];

    pub fn apply(self, total: u32) -> u32 {
        match self {
            PenaltyKind::Reset => 0,
            PenaltyKind::Half => total / 2,
            PenaltyKind::MinusTen => total.saturating_sub(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    pub category: Category,
    pub value: u32,
    pub penalty: Option<PenaltyKind>,
}

impl Card {
    fn value_card(name: &str, category: Category, value: u32) -> Self {
        Self {
            name: name.to_string(),
            category,
            value,
            penalty: None,
        }
    }

    fn bearish(name: &str, penalty: PenaltyKind) -> Self {
        Self {
            name: name.to_string(),
            category: Category::Bearish,
            value: 0,
            penalty: Some(penalty),
        }
    }

    fn special(name: &str) -> Self {
        Self {
            name: name.to_string(),
            category: Category::Special,
            value: 0,
            penalty: None,
        }
    }
}

// Bearish and Special cards come back untouched; the double-up is negated.
pub fn apply_double_up(card: &Card) -> Card {
    if card.category.is_value() {
        Card {
            value: card.value * 2,
            ..card.clone()
        }
    } else {
        card.clone()
    }
}

// Weights are per copy, not per tier.
pub fn draw_weight(card: &Card) -> u32 {
    match (card.category, card.value) {
        (Category::ValueLow, 1) => 6,
        (Category::ValueLow, _) => 8,
        (Category::ValueMid, 3) => 9,
        (Category::ValueMid, _) => 15,
        (Category::ValueHigh, _) => 15,
        (Category::Oracle, _) => 10,
        (Category::Historacle, _) => 4,
        (Category::Bearish, _) => 2,
        (Category::Special, _) => 25,
    }
}

pub fn builtin_catalogue() -> Vec<Card> {
    let mut cards = Vec::with_capacity(43);
    for name in ["Abbie", "Alita", "EnJ1n", "Jakey"] {
        cards.push(Card::value_card(name, Category::ValueLow, 1));
    }
    for name in ["Ace", "Beats", "Dash", "Ray"] {
        cards.push(Card::value_card(name, Category::ValueLow, 2));
    }
    for name in ["Jazzy", "Meemo", "Sabrina", "Thea"] {
        cards.push(Card::value_card(name, Category::ValueMid, 3));
    }
    for name in ["Nero", "Saul", "Somi", "Wick"] {
        cards.push(Card::value_card(name, Category::ValueMid, 5));
    }
    for name in ["Sandy", "Tala", "Tulip", "Zacky"] {
        cards.push(Card::value_card(name, Category::ValueHigh, 8));
    }
    for seer in ["Aida", "Lana", "Nifty", "Sats"] {
        for n in 1..=3 {
            cards.push(Card::value_card(&format!("{seer} {n}"), Category::Oracle, 13));
        }
    }
    for name in ["Sats", "Fibonacci", "Gann", "Dow", "Elliott"] {
        cards.push(Card::value_card(name, Category::Historacle, 21));
    }
    cards.push(Card::bearish("Bear Reset", PenaltyKind::Reset));
    cards.push(Card::bearish("Bear Half", PenaltyKind::Half));
    cards.push(Card::bearish("Bear -10", PenaltyKind::MinusTen));
    for _ in 0..3 {
        cards.push(Card::special("Ape In!"));
    }
    cards
}

#[derive(Debug, Error)]
pub enum DrawError {
    #[error("no drawable card in pool")]
    EmptyPool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolState {
    catalogue: Vec<Card>,
    used_penalties: BTreeSet<PenaltyKind>,
    suppress_special: bool,
}

impl PoolState {
    pub fn builtin() -> Self {
        Self::with_catalogue(builtin_catalogue())
    }

    pub fn with_catalogue(catalogue: Vec<Card>) -> Self {
        Self {
            catalogue,
            used_penalties: BTreeSet::new(),
            suppress_special: false,
        }
    }

    pub fn penalty_used(&self, kind: PenaltyKind) -> bool {
        self.used_penalties.contains(&kind)
    }

    pub fn mark_penalty_used(&mut self, kind: PenaltyKind) {
        self.used_penalties.insert(kind);
    }

    pub fn suppress_next_special(&mut self) {
        self.suppress_special = true;
    }

    pub fn special_suppressed(&self) -> bool {
        self.suppress_special
    }

    // Catalogue order; draw walks cumulative weights over this sequence.
    pub fn candidates(&self) -> impl Iterator<Item = &Card> {
        self.catalogue.iter().filter(move |card| {
            if let Some(kind) = card.penalty {
                if self.used_penalties.contains(&kind) {
                    return false;
                }
            }
            !(self.suppress_special && card.category == Category::Special)
        })
    }

    pub fn draw(&mut self, rng: &mut dyn EntropySource) -> Result<Card, DrawError> {
        let card = pick_weighted(
            self.candidates().map(|card| (card.clone(), draw_weight(card))),
            rng,
        )
        .ok_or(DrawError::EmptyPool)?;
        self.suppress_special = false;
        Ok(card)
    }
}
