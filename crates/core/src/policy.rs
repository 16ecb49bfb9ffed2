use crate::dice::ProfileKey;
use crate::rng::EntropySource;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// Clamped below 1 so AI playout loops terminate.
pub const MAX_PUSH: f64 = 0.98;

const BEHIND_BONUS_CAP: f64 = 0.20;
const BEHIND_BONUS_HALFWAY: f64 = 60.0;
const LATE_ROUND_STEP: f64 = 0.03;
const LATE_ROUND_WINDOW: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    Sandy,
    Aida,
    Lana,
    Enj1n,
    Nifty,
}

#[derive(Debug, Error)]
#[error("unknown identity: {0}")]
pub struct UnknownIdentity(pub String);

impl Identity {
    pub const ALL: [Identity; 5] = [
        Identity::Sandy,
        Identity::Aida,
        Identity::Lana,
        Identity::Enj1n,
        Identity::Nifty,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Identity::Sandy => "sandy",
            Identity::Aida => "aida",
            Identity::Lana => "lana",
            Identity::Enj1n => "enj1n",
            Identity::Nifty => "nifty",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Identity::Sandy => "Sandy",
            Identity::Aida => "Aida",
            Identity::Lana => "Lana",
            Identity::Enj1n => "En-J1n",
            Identity::Nifty => "Nifty",
        }
    }

    pub fn difficulty(self) -> &'static str {
        match self {
            Identity::Sandy => "Easy",
            Identity::Aida => "Medium",
            Identity::Lana => "Hard",
            Identity::Enj1n => "Expert",
            Identity::Nifty => "Medium-Hard",
        }
    }

    pub fn blurb(self) -> &'static str {
        match self {
            Identity::Sandy => "Tutorial opponent - perfect for beginners",
            Identity::Aida => "Balanced strategy with smart plays",
            Identity::Lana => "Aggressive player who takes big risks",
            Identity::Enj1n => "Master player with unpredictable moves",
            Identity::Nifty => "Adaptable player who changes tactics",
        }
    }
}

impl FromStr for Identity {
    type Err = UnknownIdentity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identity::ALL
            .into_iter()
            .find(|identity| identity.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownIdentity(s.to_string()))
    }
}

// A base of 0.0 forces a bank that no amount of scaling revives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RiskModel {
    SingleThreshold {
        threshold: u32,
        settle_push: f64,
        chase_push: f64,
        chase_gap: i64,
    },
    TieredBands {
        floor: u32,
        ceiling: u32,
        band_push: f64,
        deficit_push: f64,
        deficit_gap: i64,
    },
    StackBias { pivot: u32, push_above: f64 },
    DeficitLock {
        lock_gap: i64,
        stop_score: u32,
        press_push: f64,
    },
    AllIn { stop_score: u32, chase_gap: i64 },
}

impl RiskModel {
    pub fn base_push(&self, turn_score: u32, behind_by: i64) -> f64 {
        match *self {
            RiskModel::SingleThreshold {
                threshold,
                settle_push,
                chase_push,
                chase_gap,
            } => {
                if turn_score < threshold {
                    1.0
                } else if behind_by > chase_gap {
                    chase_push
                } else {
                    settle_push
                }
            }
            RiskModel::TieredBands {
                floor,
                ceiling,
                band_push,
                deficit_push,
                deficit_gap,
            } => {
                if behind_by > deficit_gap {
                    deficit_push
                } else if turn_score >= ceiling {
                    0.0
                } else if turn_score >= floor {
                    band_push
                } else {
                    1.0
                }
            }
            RiskModel::StackBias { pivot, push_above } => {
                if turn_score < pivot {
                    1.0
                } else {
                    push_above
                }
            }
            RiskModel::DeficitLock {
                lock_gap,
                stop_score,
                press_push,
            } => {
                if behind_by > lock_gap || turn_score >= stop_score {
                    0.0
                } else {
                    press_push
                }
            }
            RiskModel::AllIn {
                stop_score,
                chase_gap,
            } => {
                if turn_score < stop_score || behind_by >= chase_gap {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Jitter {
    pub enabled: bool,
    pub pct: f64,
}

impl Jitter {
    pub const OFF: Jitter = Jitter {
        enabled: false,
        pct: 0.0,
    };

    pub const fn pct(pct: f64) -> Jitter {
        Jitter { enabled: true, pct }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub identity: Identity,
    pub risk: RiskModel,
    pub jitter: Jitter,
    pub dice_profiles: Vec<ProfileKey>,
    pub escalate_gap: i64,
    pub target_scores: Vec<u32>,
    pub round_limitless: bool,
}

pub fn ai_config(identity: Identity) -> AiConfig {
    match identity {
        Identity::Sandy => AiConfig {
            identity,
            risk: RiskModel::SingleThreshold {
                threshold: 21,
                settle_push: 0.10,
                chase_push: 0.618,
                chase_gap: 50,
            },
            jitter: Jitter::OFF,
            dice_profiles: vec![ProfileKey::Sandy],
            escalate_gap: 50,
            target_scores: vec![21],
            round_limitless: false,
        },
        Identity::Aida => AiConfig {
            identity,
            risk: RiskModel::TieredBands {
                floor: 21,
                ceiling: 40,
                band_push: 0.50,
                deficit_push: 0.60,
                deficit_gap: 30,
            },
            jitter: Jitter::OFF,
            dice_profiles: vec![ProfileKey::Aida],
            escalate_gap: 30,
            target_scores: vec![21, 26],
            round_limitless: false,
        },
        Identity::Lana => AiConfig {
            identity,
            risk: RiskModel::StackBias {
                pivot: 30,
                push_above: 0.50,
            },
            jitter: Jitter::OFF,
            dice_profiles: vec![ProfileKey::Lana],
            escalate_gap: 30,
            target_scores: vec![26, 34],
            round_limitless: false,
        },
        Identity::Enj1n => AiConfig {
            identity,
            risk: RiskModel::DeficitLock {
                lock_gap: 20,
                stop_score: 50,
                press_push: 0.75,
            },
            jitter: Jitter::pct(0.10),
            dice_profiles: vec![ProfileKey::Enj1n],
            escalate_gap: 20,
            target_scores: vec![34, 42, 55],
            round_limitless: false,
        },
        Identity::Nifty => AiConfig {
            identity,
            risk: RiskModel::AllIn {
                stop_score: 50,
                chase_gap: 20,
            },
            jitter: Jitter::pct(0.08),
            dice_profiles: vec![ProfileKey::Nifty, ProfileKey::Enj1n],
            escalate_gap: 20,
            target_scores: vec![21, 26, 34],
            round_limitless: false,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionSnapshot {
    pub turn_score: u32,
    // Best other total minus ours; negative when leading.
    pub behind_by: i64,
    pub rounds_remaining: Option<u32>,
    pub jitter_seed: u64,
}

fn behind_bonus(behind_by: i64) -> f64 {
    if behind_by <= 0 {
        return 0.0;
    }
    let behind = behind_by as f64;
    BEHIND_BONUS_CAP * behind / (behind + BEHIND_BONUS_HALFWAY)
}

fn rounds_bonus(rounds_remaining: Option<u32>) -> f64 {
    match rounds_remaining {
        Some(left) if left <= LATE_ROUND_WINDOW => {
            f64::from(LATE_ROUND_WINDOW - left + 1) * LATE_ROUND_STEP
        }
        _ => 0.0,
    }
}

/// Stable offset in [-1, 1) from the game seed and identity; the same pair
/// always perturbs the same way within one session.
fn jitter_offset(seed: u64, identity: Identity) -> f64 {
    let mut h = seed ^ (identity as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    h = h.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    h ^= h >> 33;
    (h >> 11) as f64 * (2.0 / (1u64 << 53) as f64) - 1.0
}

/// Risk base, then adaptive scaling, then jitter; reclamped after each stage.
pub fn push_probability(config: &AiConfig, snapshot: DecisionSnapshot) -> f64 {
    let base = config.risk.base_push(snapshot.turn_score, snapshot.behind_by);
    if base <= 0.0 {
        return 0.0;
    }
    let scaled = base + behind_bonus(snapshot.behind_by) + rounds_bonus(snapshot.rounds_remaining);
    let mut prob = scaled.clamp(0.0, MAX_PUSH);
    if config.jitter.enabled {
        let offset = jitter_offset(snapshot.jitter_seed, config.identity);
        prob = (prob * (1.0 + config.jitter.pct * offset)).clamp(0.0, MAX_PUSH);
    }
    prob
}

pub fn decide(config: &AiConfig, snapshot: DecisionSnapshot, rng: &mut dyn EntropySource) -> bool {
    rng.next_f64() < push_probability(config, snapshot)
}

pub fn select_profile(config: &AiConfig, snapshot: DecisionSnapshot) -> ProfileKey {
    let Some((&base, rest)) = config.dice_profiles.split_first() else {
        return ProfileKey::Balanced;
    };
    if rest.is_empty() {
        return base;
    }
    let late = matches!(snapshot.rounds_remaining, Some(left) if left <= 2);
    if snapshot.behind_by > config.escalate_gap || late {
        rest.last().copied().unwrap_or(base)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(turn_score: u32, behind_by: i64, rounds_remaining: Option<u32>) -> DecisionSnapshot {
        DecisionSnapshot {
            turn_score,
            behind_by,
            rounds_remaining,
            jitter_seed: 0xC0FFEE,
        }
    }

    #[test]
    fn forced_banks_stay_banked_under_scaling() {
        let config = ai_config(Identity::Enj1n);
        // Far behind locks progress in even at the round limit.
        let prob = push_probability(&config, snapshot(10, 90, Some(0)));
        assert_eq!(prob, 0.0);
    }

    #[test]
    fn forced_pushes_clamp_below_one() {
        let config = ai_config(Identity::Nifty);
        let prob = push_probability(&config, snapshot(10, 90, Some(0)));
        assert!(prob <= MAX_PUSH);
        assert!(prob > 0.9);
    }

    #[test]
    fn behind_bonus_diminishes_toward_the_cap() {
        assert_eq!(behind_bonus(0), 0.0);
        assert_eq!(behind_bonus(-40), 0.0);
        let near = behind_bonus(30);
        let far = behind_bonus(300);
        assert!(near < far);
        assert!(far < BEHIND_BONUS_CAP);
        // Doubling the deficit must not double the bonus.
        assert!(behind_bonus(60) < 2.0 * near);
    }

    #[test]
    fn rounds_bonus_escalates_into_the_endgame() {
        assert_eq!(rounds_bonus(None), 0.0);
        assert_eq!(rounds_bonus(Some(9)), 0.0);
        assert_eq!(rounds_bonus(Some(3)), 0.03);
        assert_eq!(rounds_bonus(Some(1)), 0.09);
        assert_eq!(rounds_bonus(Some(0)), 0.12);
    }

    #[test]
    fn jitter_is_stable_per_seed_and_identity() {
        let a = jitter_offset(42, Identity::Nifty);
        let b = jitter_offset(42, Identity::Nifty);
        assert_eq!(a, b);
        assert!((-1.0..1.0).contains(&a));
        assert_ne!(jitter_offset(42, Identity::Enj1n), a);
        assert_ne!(jitter_offset(43, Identity::Nifty), a);
    }

    #[test]
    fn sandy_settles_at_the_threshold_unless_chasing() {
        let config = ai_config(Identity::Sandy);
        assert_eq!(config.risk.base_push(20, 0), 1.0);
        assert_eq!(config.risk.base_push(21, 0), 0.10);
        assert_eq!(config.risk.base_push(21, 51), 0.618);
    }

    #[test]
    fn nifty_is_deterministic_before_scaling() {
        let config = ai_config(Identity::Nifty);
        assert_eq!(config.risk.base_push(49, 0), 1.0);
        assert_eq!(config.risk.base_push(50, 0), 0.0);
        assert_eq!(config.risk.base_push(50, 20), 1.0);
    }

    #[test]
    fn nifty_swaps_dice_only_under_pressure() {
        let config = ai_config(Identity::Nifty);
        assert_eq!(
            select_profile(&config, snapshot(0, 0, Some(8))),
            ProfileKey::Nifty
        );
        assert_eq!(
            select_profile(&config, snapshot(0, 21, Some(8))),
            ProfileKey::Enj1n
        );
        assert_eq!(
            select_profile(&config, snapshot(0, 0, Some(2))),
            ProfileKey::Enj1n
        );
        let sandy = ai_config(Identity::Sandy);
        assert_eq!(
            select_profile(&sandy, snapshot(0, 99, Some(0))),
            ProfileKey::Sandy
        );
    }
}
