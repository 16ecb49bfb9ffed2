use crate::{Card, ParticipantId, PenaltyKind, ProfileKey};
use serde::{Deserialize, Serialize};

// The engine never reads its own log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    SessionStarted {
        participants: usize,
        winning_score: u32,
        max_rounds: Option<u32>,
    },
    TurnStarted {
        participant: ParticipantId,
        round: u32,
        declared_target: Option<u32>,
    },
    CardDrawn {
        participant: ParticipantId,
        card: Card,
    },
    DoubleUpArmed {
        participant: ParticipantId,
    },
    DieRolled {
        participant: ParticipantId,
        profile: ProfileKey,
        face: u8,
        turn_score: u32,
    },
    BearishDodged {
        participant: ParticipantId,
        card: Card,
    },
    PenaltyApplied {
        participant: ParticipantId,
        kind: PenaltyKind,
        total_score: u32,
    },
    Busted {
        participant: ParticipantId,
        forfeited: u32,
    },
    DecisionMade {
        participant: ParticipantId,
        pushed: bool,
        probability: f64,
    },
    Banked {
        participant: ParticipantId,
        amount: u32,
        total_score: u32,
    },
    TurnForced {
        participant: ParticipantId,
        forfeited: u32,
    },
    RoundAdvanced { round: u32 },
    Finished { winner: Option<ParticipantId> },
}

#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<Event>,
}

impl EventBus {
    pub fn push(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.queue.drain(..)
    }
}
