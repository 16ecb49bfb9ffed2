use crate::cards::{Card, Category, PoolState};
use crate::config::MatchRules;
use crate::dice::{Outcome, ProfileKey};
use crate::events::{Event, EventBus};
use crate::policy::{
    ai_config, push_probability, select_profile, AiConfig, DecisionSnapshot, Identity,
    UnknownIdentity,
};
use crate::rng::{EntropySource, RngState};
use crate::turn::{RollResolution, TurnError, TurnState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

// Push probabilities cap below 1, so this bound is unreachable in practice.
const AI_TURN_CAP: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub total_score: u32,
    pub identity: Option<Identity>,
}

impl Participant {
    pub fn is_ai(&self) -> bool {
        self.identity.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is {0:?}")]
    InvalidStatus(SessionStatus),
    #[error("not this participant's turn")]
    NotYourTurn,
    #[error("session is full")]
    SessionFull,
    #[error("participant already joined")]
    DuplicateParticipant,
    #[error("need at least two participants")]
    NotEnoughParticipants,
    #[error(transparent)]
    Turn(#[from] TurnError),
    #[error(transparent)]
    Identity(#[from] UnknownIdentity),
}

/// After any public op the active seat is human or the session is over;
/// AI turns are driven to completion internally.
#[derive(Debug)]
pub struct GameSession {
    rules: MatchRules,
    participants: Vec<Participant>,
    pointer: usize,
    round: u32,
    status: SessionStatus,
    winner: Option<ParticipantId>,
    pool: PoolState,
    turn: Option<TurnState>,
    rng: Box<dyn EntropySource>,
    jitter_seed: u64,
    idle_deadline: Option<u64>,
    events: EventBus,
}

impl GameSession {
    pub fn new(rules: MatchRules, seed: u64) -> Self {
        Self::with_entropy(rules, seed, Box::new(RngState::from_seed(seed)))
    }

    pub fn with_entropy(rules: MatchRules, jitter_seed: u64, rng: Box<dyn EntropySource>) -> Self {
        Self {
            rules,
            participants: Vec::new(),
            pointer: 0,
            round: 1,
            status: SessionStatus::Waiting,
            winner: None,
            pool: PoolState::builtin(),
            turn: None,
            rng,
            jitter_seed,
            idle_deadline: None,
            events: EventBus::default(),
        }
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner
    }

    pub fn jitter_seed(&self) -> u64 {
        self.jitter_seed
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn active_participant(&self) -> Option<&Participant> {
        if self.status != SessionStatus::Playing {
            return None;
        }
        self.participants.get(self.pointer)
    }

    pub fn turn(&self) -> Option<&TurnState> {
        self.turn.as_ref()
    }

    // Opaque tick for the presentation layer; cleared at every turn start.
    pub fn idle_deadline(&self) -> Option<u64> {
        self.idle_deadline
    }

    pub fn set_idle_deadline(&mut self, deadline: Option<u64>) {
        self.idle_deadline = deadline;
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain().collect()
    }

    pub fn add_human(
        &mut self,
        id: ParticipantId,
        display_name: &str,
    ) -> Result<(), SessionError> {
        self.add_participant(Participant {
            id,
            display_name: display_name.to_string(),
            total_score: 0,
            identity: None,
        })
    }

    pub fn add_ai(&mut self, id: ParticipantId, identity: Identity) -> Result<(), SessionError> {
        self.add_participant(Participant {
            id,
            display_name: identity.display_name().to_string(),
            total_score: 0,
            identity: Some(identity),
        })
    }

    pub fn add_ai_by_key(&mut self, id: ParticipantId, key: &str) -> Result<(), SessionError> {
        let identity = key.parse::<Identity>()?;
        self.add_ai(id, identity)
    }

    fn add_participant(&mut self, participant: Participant) -> Result<(), SessionError> {
        if self.status != SessionStatus::Waiting {
            return Err(SessionError::InvalidStatus(self.status));
        }
        if self.participants.len() >= self.rules.max_participants {
            return Err(SessionError::SessionFull);
        }
        if self.participants.iter().any(|p| p.id == participant.id) {
            return Err(SessionError::DuplicateParticipant);
        }
        self.participants.push(participant);
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Waiting {
            return Err(SessionError::InvalidStatus(self.status));
        }
        if self.participants.len() < 2 {
            return Err(SessionError::NotEnoughParticipants);
        }
        self.status = SessionStatus::Playing;
        self.round = 1;
        self.pointer = 0;
        self.events.push(Event::SessionStarted {
            participants: self.participants.len(),
            winning_score: self.rules.winning_score,
            max_rounds: (!self.rules.round_limitless).then_some(self.rules.max_rounds),
        });
        self.begin_turn();
        if let Some(identity) = self.participants[self.pointer].identity {
            self.play_ai_turn(identity)?;
            self.settle()?;
        }
        Ok(())
    }

    /// Special draws resolve internally; returns the card waiting on a roll.
    pub fn draw_card(&mut self, participant: ParticipantId) -> Result<Card, SessionError> {
        self.ensure_active(participant)?;
        self.step_draw()
    }

    pub fn roll_die(&mut self, participant: ParticipantId) -> Result<RollResolution, SessionError> {
        self.ensure_active(participant)?;
        let resolution = self.step_roll(ProfileKey::Balanced)?;
        self.settle()?;
        Ok(resolution)
    }

    pub fn choose(&mut self, participant: ParticipantId, push: bool) -> Result<(), SessionError> {
        self.ensure_active(participant)?;
        self.step_choose(push)?;
        self.settle()
    }

    /// Ends the active turn from outside, forfeiting its unbanked score.
    pub fn force_end_turn(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Playing {
            return Err(SessionError::InvalidStatus(self.status));
        }
        self.force_current_turn();
        self.settle()
    }

    fn ensure_active(&self, participant: ParticipantId) -> Result<(), SessionError> {
        if self.status != SessionStatus::Playing {
            return Err(SessionError::InvalidStatus(self.status));
        }
        let active = &self.participants[self.pointer];
        if active.id != participant || active.is_ai() {
            return Err(SessionError::NotYourTurn);
        }
        Ok(())
    }

    fn begin_turn(&mut self) {
        self.idle_deadline = None;
        let participant = self.participants[self.pointer].clone();
        let declared_target = participant.identity.and_then(|identity| {
            let targets = ai_config(identity).target_scores;
            if targets.is_empty() {
                return None;
            }
            let idx = (self.rng.next_u64() % targets.len() as u64) as usize;
            targets.get(idx).copied()
        });
        self.turn = Some(TurnState::new(participant.id));
        self.events.push(Event::TurnStarted {
            participant: participant.id,
            round: self.round,
            declared_target,
        });
    }

    fn step_draw(&mut self) -> Result<Card, SessionError> {
        let Some(turn) = self.turn.as_mut() else {
            return Err(SessionError::InvalidStatus(self.status));
        };
        let participant = turn.participant;
        loop {
            let card = turn.draw(&mut self.pool, self.rng.as_mut())?;
            self.events.push(Event::CardDrawn {
                participant,
                card: card.clone(),
            });
            if card.category == Category::Special {
                self.events.push(Event::DoubleUpArmed { participant });
                continue;
            }
            return Ok(card);
        }
    }

    fn step_roll(&mut self, key: ProfileKey) -> Result<RollResolution, SessionError> {
        let Some(turn) = self.turn.as_mut() else {
            return Err(SessionError::InvalidStatus(self.status));
        };
        let participant = turn.participant;
        let profile = key.profile();
        let resolution = turn.roll(&profile, &mut self.pool, self.rng.as_mut())?;
        let turn_score = turn.turn_score;
        self.events.push(Event::DieRolled {
            participant,
            profile: key,
            face: resolution.face,
            turn_score,
        });
        match resolution.outcome {
            Outcome::Bust => {
                self.events.push(Event::Busted {
                    participant,
                    forfeited: resolution.staked,
                });
            }
            Outcome::Dodged => {
                self.events.push(Event::BearishDodged {
                    participant,
                    card: resolution.card.clone(),
                });
            }
            Outcome::Penalty(kind) => {
                let seat = &mut self.participants[self.pointer];
                seat.total_score = kind.apply(seat.total_score);
                let total_score = seat.total_score;
                self.events.push(Event::PenaltyApplied {
                    participant,
                    kind,
                    total_score,
                });
            }
            Outcome::Success { .. } => {}
        }
        Ok(resolution)
    }

    fn step_choose(&mut self, push: bool) -> Result<(), SessionError> {
        let Some(turn) = self.turn.as_mut() else {
            return Err(SessionError::InvalidStatus(self.status));
        };
        let participant = turn.participant;
        turn.choose(push)?;
        if !push {
            let amount = turn.turn_score;
            turn.turn_score = 0;
            let seat = &mut self.participants[self.pointer];
            seat.total_score += amount;
            let total_score = seat.total_score;
            self.events.push(Event::Banked {
                participant,
                amount,
                total_score,
            });
        }
        Ok(())
    }

    fn force_current_turn(&mut self) {
        if let Some(turn) = self.turn.as_mut() {
            let participant = turn.participant;
            let forfeited = turn.turn_score;
            turn.force_bust();
            self.events.push(Event::TurnForced {
                participant,
                forfeited,
            });
        }
    }

    /// Concludes terminal turns, advancing the pointer and playing out AI
    /// seats until control rests with a human or the session finishes.
    fn settle(&mut self) -> Result<(), SessionError> {
        loop {
            match self.turn.as_ref() {
                Some(turn) if turn.phase.is_terminal() => {}
                _ => return Ok(()),
            }
            self.conclude_turn();
            if self.status != SessionStatus::Playing {
                return Ok(());
            }
            self.begin_turn();
            let Some(identity) = self.participants[self.pointer].identity else {
                return Ok(());
            };
            self.play_ai_turn(identity)?;
        }
    }

    fn conclude_turn(&mut self) {
        self.turn = None;
        if let Some(winner) = self.threshold_winner() {
            self.status = SessionStatus::Finished;
            self.winner = Some(winner);
            self.events.push(Event::Finished {
                winner: Some(winner),
            });
            return;
        }
        self.pointer = (self.pointer + 1) % self.participants.len();
        if self.pointer == 0 {
            self.round += 1;
            self.events.push(Event::RoundAdvanced { round: self.round });
            if !self.rules.round_limitless && self.round > self.rules.max_rounds {
                let winner = self.round_limit_winner();
                self.status = SessionStatus::Finished;
                self.winner = winner;
                self.events.push(Event::Finished { winner });
            }
        }
    }

    fn threshold_winner(&self) -> Option<ParticipantId> {
        self.participants
            .iter()
            .find(|p| p.total_score >= self.rules.winning_score)
            .map(|p| p.id)
    }

    // An exact tie crowns nobody.
    fn round_limit_winner(&self) -> Option<ParticipantId> {
        let best = self.participants.iter().map(|p| p.total_score).max()?;
        let mut leaders = self.participants.iter().filter(|p| p.total_score == best);
        let first = leaders.next()?;
        if leaders.next().is_some() {
            None
        } else {
            Some(first.id)
        }
    }

    fn snapshot(&self, config: &AiConfig) -> DecisionSnapshot {
        let me = &self.participants[self.pointer];
        let best_other = self
            .participants
            .iter()
            .filter(|p| p.id != me.id)
            .map(|p| p.total_score)
            .max()
            .unwrap_or(0);
        let rounds_remaining = if self.rules.round_limitless || config.round_limitless {
            None
        } else {
            Some(self.rules.max_rounds.saturating_sub(self.round))
        };
        DecisionSnapshot {
            turn_score: self.turn.as_ref().map(|t| t.turn_score).unwrap_or(0),
            behind_by: i64::from(best_other) - i64::from(me.total_score),
            rounds_remaining,
            jitter_seed: self.jitter_seed,
        }
    }

    fn play_ai_turn(&mut self, identity: Identity) -> Result<(), SessionError> {
        let config = ai_config(identity);
        let participant = self.participants[self.pointer].id;
        for _ in 0..AI_TURN_CAP {
            self.step_draw()?;
            let key = select_profile(&config, self.snapshot(&config));
            let resolution = self.step_roll(key)?;
            match resolution.outcome {
                Outcome::Bust | Outcome::Penalty(_) => return Ok(()),
                Outcome::Dodged => continue,
                Outcome::Success { .. } => {
                    let probability = push_probability(&config, self.snapshot(&config));
                    let pushed = self.rng.next_f64() < probability;
                    self.events.push(Event::DecisionMade {
                        participant,
                        pushed,
                        probability,
                    });
                    self.step_choose(pushed)?;
                    if !pushed {
                        return Ok(());
                    }
                }
            }
        }
        self.force_current_turn();
        Ok(())
    }
}

pub type SharedSession = Arc<Mutex<GameSession>>;

#[derive(Debug, Default)]
struct StoreInner {
    next_id: u64,
    sessions: HashMap<SessionId, SharedSession>,
}

/// One lock per session; a cloned handle serializes that session only.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<StoreInner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: GameSession) -> SessionId {
        let mut inner = self.inner.lock().unwrap();
        let id = SessionId(inner.next_id);
        inner.next_id += 1;
        inner.sessions.insert(id, Arc::new(Mutex::new(session)));
        id
    }

    pub fn get(&self, id: SessionId) -> Option<SharedSession> {
        self.inner.lock().unwrap().sessions.get(&id).cloned()
    }

    pub fn remove(&self, id: SessionId) -> Option<SharedSession> {
        self.inner.lock().unwrap().sessions.remove(&id)
    }

    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self
            .inner
            .lock()
            .unwrap()
            .sessions
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lobby_rejects_late_and_duplicate_joins() {
        let mut session = GameSession::new(MatchRules::default(), 1);
        session.add_human(ParticipantId(1), "Ada").unwrap();
        let err = session.add_human(ParticipantId(1), "Ada again").unwrap_err();
        assert!(matches!(err, SessionError::DuplicateParticipant));
        session.add_ai(ParticipantId(2), Identity::Sandy).unwrap();
        session.start().unwrap();
        let err = session.add_human(ParticipantId(3), "Late").unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidStatus(SessionStatus::Playing)
        ));
    }

    #[test]
    fn lobby_enforces_capacity_and_quorum() {
        let mut session = GameSession::new(MatchRules::default(), 1);
        session.add_human(ParticipantId(1), "Solo").unwrap();
        let err = session.start().unwrap_err();
        assert!(matches!(err, SessionError::NotEnoughParticipants));
        for n in 2..=6 {
            session.add_human(ParticipantId(n), &format!("P{n}")).unwrap();
        }
        let err = session.add_human(ParticipantId(7), "Seventh").unwrap_err();
        assert!(matches!(err, SessionError::SessionFull));
    }

    #[test]
    fn unknown_identity_key_is_surfaced() {
        let mut session = GameSession::new(MatchRules::default(), 1);
        let err = session.add_ai_by_key(ParticipantId(9), "mallory").unwrap_err();
        assert!(matches!(err, SessionError::Identity(_)));
    }

    #[test]
    fn store_hands_out_independent_handles() {
        let store = SessionStore::new();
        let a = store.insert(GameSession::new(MatchRules::default(), 1));
        let b = store.insert(GameSession::new(MatchRules::default(), 2));
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        let handle = store.get(a).unwrap();
        handle
            .lock()
            .unwrap()
            .add_human(ParticipantId(1), "Ada")
            .unwrap();
        assert!(store.remove(a).is_some());
        assert!(store.get(a).is_none());
        assert_eq!(store.ids(), vec![b]);
    }
}
