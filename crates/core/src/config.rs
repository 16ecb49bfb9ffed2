use crate::policy::Identity;
use serde::{Deserialize, Serialize};

pub const MAX_PARTICIPANTS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRules {
    pub winning_score: u32,
    // Ignored when round_limitless is set.
    pub max_rounds: u32,
    pub round_limitless: bool,
    pub max_participants: usize,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            winning_score: 150,
            max_rounds: 10,
            round_limitless: false,
            max_participants: MAX_PARTICIPANTS,
        }
    }
}

impl MatchRules {
    pub fn for_identity(identity: Identity) -> Self {
        let (winning_score, max_rounds) = match identity {
            Identity::Sandy => (150, 10),
            Identity::Aida => (200, 12),
            Identity::Lana => (250, 15),
            Identity::Enj1n => (300, 18),
            Identity::Nifty => (180, 12),
        };
        Self {
            winning_score,
            max_rounds,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rules_scale_with_difficulty() {
        let sandy = MatchRules::for_identity(Identity::Sandy);
        assert_eq!((sandy.winning_score, sandy.max_rounds), (150, 10));
        let enj1n = MatchRules::for_identity(Identity::Enj1n);
        assert_eq!((enj1n.winning_score, enj1n.max_rounds), (300, 18));
        assert!(!enj1n.round_limitless);
        assert_eq!(enj1n.max_participants, MAX_PARTICIPANTS);
    }
}
