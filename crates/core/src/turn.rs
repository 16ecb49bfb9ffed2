use crate::cards::{Card, Category, DrawError, PoolState};
use crate::dice::{classify, roll, DiceProfile, Outcome};
use crate::rng::EntropySource;
use crate::session::ParticipantId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    AwaitingDraw,
    AwaitingRoll,
    ContinueDecision,
    Busted,
    PenaltyApplied,
    Banked,
}

impl TurnPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TurnPhase::Busted | TurnPhase::PenaltyApplied | TurnPhase::Banked
        )
    }
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("invalid state: {0:?}")]
    InvalidState(TurnPhase),
    #[error(transparent)]
    Draw(#[from] DrawError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollResolution {
    pub card: Card,
    pub face: u8,
    pub outcome: Outcome,
    // Turn score at stake before the roll resolved.
    pub staked: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    pub participant: ParticipantId,
    pub phase: TurnPhase,
    pub turn_score: u32,
    pub pending_card: Option<Card>,
    pub double_up_active: bool,
}

impl TurnState {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            phase: TurnPhase::AwaitingDraw,
            turn_score: 0,
            pending_card: None,
            double_up_active: false,
        }
    }

    pub fn draw(
        &mut self,
        pool: &mut PoolState,
        rng: &mut dyn EntropySource,
    ) -> Result<Card, TurnError> {
        if self.phase != TurnPhase::AwaitingDraw {
            return Err(TurnError::InvalidState(self.phase));
        }
        let card = pool.draw(rng)?;
        if card.category == Category::Special {
            // Phase stays AwaitingDraw so the caller draws again.
            self.double_up_active = true;
            pool.suppress_next_special();
        } else {
            self.pending_card = Some(card.clone());
            self.phase = TurnPhase::AwaitingRoll;
        }
        Ok(card)
    }

    // Total-score effects belong to the orchestrator.
    pub fn roll(
        &mut self,
        profile: &DiceProfile,
        pool: &mut PoolState,
        rng: &mut dyn EntropySource,
    ) -> Result<RollResolution, TurnError> {
        if self.phase != TurnPhase::AwaitingRoll {
            return Err(TurnError::InvalidState(self.phase));
        }
        let card = match self.pending_card.take() {
            Some(card) => card,
            None => return Err(TurnError::InvalidState(self.phase)),
        };
        let staked = self.turn_score;
        let face = roll(profile, rng);
        let outcome = classify(&card, face, self.double_up_active);
        self.double_up_active = false;
        match outcome {
            Outcome::Bust => {
                self.turn_score = 0;
                self.phase = TurnPhase::Busted;
            }
            Outcome::Dodged => {
                self.phase = TurnPhase::AwaitingDraw;
            }
            Outcome::Penalty(kind) => {
                self.turn_score = 0;
                pool.mark_penalty_used(kind);
                self.phase = TurnPhase::PenaltyApplied;
            }
            Outcome::Success { delta } => {
                self.turn_score += delta;
                self.phase = TurnPhase::ContinueDecision;
            }
        }
        Ok(RollResolution {
            card,
            face,
            outcome,
            staked,
        })
    }

    pub fn choose(&mut self, push: bool) -> Result<(), TurnError> {
        if self.phase != TurnPhase::ContinueDecision {
            return Err(TurnError::InvalidState(self.phase));
        }
        self.phase = if push {
            TurnPhase::AwaitingDraw
        } else {
            TurnPhase::Banked
        };
        Ok(())
    }

    // Equivalent to a bust; usable from any live phase.
    pub fn force_bust(&mut self) {
        self.turn_score = 0;
        self.pending_card = None;
        self.double_up_active = false;
        self.phase = TurnPhase::Busted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::PenaltyKind;
    use crate::dice::ProfileKey;
    use crate::rng::ScriptedEntropy;
    use crate::session::ParticipantId;

    fn bearish_only_pool() -> PoolState {
        PoolState::with_catalogue(vec![Card {
            name: "Bear Reset".to_string(),
            category: Category::Bearish,
            value: 0,
            penalty: Some(PenaltyKind::Reset),
        }])
    }

    #[test]
    fn roll_before_draw_is_rejected() {
        let mut turn = TurnState::new(ParticipantId(1));
        let mut pool = PoolState::builtin();
        let mut rng = ScriptedEntropy::new([0]);
        let err = turn
            .roll(&ProfileKey::Balanced.profile(), &mut pool, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            TurnError::InvalidState(TurnPhase::AwaitingDraw)
        ));
    }

    #[test]
    fn draw_mid_decision_is_rejected() {
        let mut turn = TurnState::new(ParticipantId(1));
        let mut pool = PoolState::builtin();
        // Script: draw Abbie (roll 0), then face 2 (script 7).
        let mut rng = ScriptedEntropy::new([0, 7]);
        turn.draw(&mut pool, &mut rng).unwrap();
        turn.roll(&ProfileKey::Balanced.profile(), &mut pool, &mut rng)
            .unwrap();
        assert_eq!(turn.phase, TurnPhase::ContinueDecision);
        let err = turn.draw(&mut pool, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            TurnError::InvalidState(TurnPhase::ContinueDecision)
        ));
    }

    #[test]
    fn odd_face_lands_the_penalty_and_spends_it() {
        let mut turn = TurnState::new(ParticipantId(1));
        let mut pool = bearish_only_pool();
        // Draw the bear, then face 3 (weights [7,10,..]: script 17).
        let mut rng = ScriptedEntropy::new([0, 17]);
        turn.draw(&mut pool, &mut rng).unwrap();
        let resolution = turn
            .roll(&ProfileKey::Balanced.profile(), &mut pool, &mut rng)
            .unwrap();
        assert_eq!(resolution.outcome, Outcome::Penalty(PenaltyKind::Reset));
        assert_eq!(turn.phase, TurnPhase::PenaltyApplied);
        assert!(pool.penalty_used(PenaltyKind::Reset));
    }

    #[test]
    fn even_face_dodges_and_returns_to_draw() {
        let mut turn = TurnState::new(ParticipantId(1));
        let mut pool = bearish_only_pool();
        turn.turn_score = 9;
        turn.phase = TurnPhase::AwaitingDraw;
        // Face 2 is script 7 under the balanced weights.
        let mut rng = ScriptedEntropy::new([0, 7]);
        turn.draw(&mut pool, &mut rng).unwrap();
        let resolution = turn
            .roll(&ProfileKey::Balanced.profile(), &mut pool, &mut rng)
            .unwrap();
        assert_eq!(resolution.outcome, Outcome::Dodged);
        assert_eq!(turn.phase, TurnPhase::AwaitingDraw);
        assert_eq!(turn.turn_score, 9);
        assert!(!pool.penalty_used(PenaltyKind::Reset));
    }

    #[test]
    fn force_bust_discards_everything_pending() {
        let mut turn = TurnState::new(ParticipantId(1));
        let mut pool = PoolState::builtin();
        let mut rng = ScriptedEntropy::new([0]);
        turn.draw(&mut pool, &mut rng).unwrap();
        turn.turn_score = 12;
        turn.force_bust();
        assert_eq!(turn.phase, TurnPhase::Busted);
        assert_eq!(turn.turn_score, 0);
        assert!(turn.pending_card.is_none());
        assert!(!turn.double_up_active);
    }
}
