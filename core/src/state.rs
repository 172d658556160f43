//! Engine state: the root aggregate.
//!
//! RULE: Only the transition function in engine.rs mutates an
//! `EngineState`. Everything else receives `&EngineState` or works on the
//! private copy the transition function hands it.

use crate::{
    benefits::{BenefitAward, BenefitStream},
    clock::MonthClock,
    config::EngineConfig,
    escalation::EscalationState,
    flags::FlagStore,
    message::{History, Message},
    types::{Channel, Effects, Lifestyle, Meters, MessageId, Month, ScenarioId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Housing, phone and broadband picked in month 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contracts {
    pub housing:   String,
    pub phone:     String,
    pub broadband: String,
}

/// A follow-up recorded by a chosen option, kept so a re-choice can
/// withdraw it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledFollowUp {
    pub follow_up_id: ScenarioId,
    pub due_month:    Month,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineState {
    pub clock:     MonthClock,
    pub meters:    Meters,
    pub lifestyle: Option<Lifestyle>,
    pub flags:     FlagStore,
    pub inbox:     Vec<Message>,
    pub chat:      Vec<Message>,
    /// Last applied effect triple per message id.
    pub chosen_effects: BTreeMap<MessageId, Effects>,
    /// Follow-ups waiting for their month to be seeded.
    pub schedule:  BTreeMap<Month, Vec<ScenarioId>>,
    pub follow_ups: BTreeMap<MessageId, ScheduledFollowUp>,
    /// (channel, month) pairs that have already been seeded.
    pub seeded:    BTreeSet<(Channel, Month)>,
    pub history:   History,
    pub fraud:     EscalationState,
    pub awards:    BTreeMap<BenefitStream, BenefitAward>,
    /// Assessed amounts waiting for an award decision.
    pub pending_awards: BTreeMap<BenefitStream, f64>,
    pub pending_choices: BTreeMap<String, String>,
    pub contracts: Option<Contracts>,
    /// Bumped on every applied transition.
    pub revision:  u64,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        let meters = config.starting;
        Self {
            clock:           MonthClock::new(config.final_month),
            meters,
            lifestyle:       None,
            flags:           FlagStore::new(),
            inbox:           Vec::new(),
            chat:            Vec::new(),
            chosen_effects:  BTreeMap::new(),
            schedule:        BTreeMap::new(),
            follow_ups:      BTreeMap::new(),
            seeded:          BTreeSet::new(),
            history:         History::starting_at(&meters),
            fraud:           EscalationState::Inactive,
            awards:          BTreeMap::new(),
            pending_awards:  BTreeMap::new(),
            pending_choices: BTreeMap::new(),
            contracts:       None,
            revision:        0,
        }
    }

    pub fn month(&self) -> Month {
        self.clock.current_month
    }

    pub fn messages(&self, channel: Channel) -> &[Message] {
        match channel {
            Channel::Inbox => &self.inbox,
            Channel::Chat  => &self.chat,
        }
    }

    pub fn messages_mut(&mut self, channel: Channel) -> &mut Vec<Message> {
        match channel {
            Channel::Inbox => &mut self.inbox,
            Channel::Chat  => &mut self.chat,
        }
    }

    pub fn message(&self, channel: Channel, id: &str) -> Option<&Message> {
        self.messages(channel).iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, channel: Channel, id: &str) -> Option<&mut Message> {
        self.messages_mut(channel).iter_mut().find(|m| m.id == id)
    }

    /// Messages of one channel for one month, in seeding order.
    pub fn messages_for(&self, channel: Channel, month: Month) -> impl Iterator<Item = &Message> {
        self.messages(channel).iter().filter(move |m| m.month == month)
    }

    pub fn is_seeded(&self, channel: Channel, month: Month) -> bool {
        self.seeded.contains(&(channel, month))
    }
}
