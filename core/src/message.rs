//! Per-playthrough message instances and the score history.

use crate::types::{Channel, Meters, MessageId, Month, OptionId, ScenarioId};
use serde::{Deserialize, Serialize};

/// A scenario instantiated for one month on one channel.
///
/// Messages are never deleted. Their id is `{scenario_id}@m{month}`, so a
/// scenario that recurs in a later month gets a fresh instance with its
/// own recorded effects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id:          MessageId,
    pub scenario_id: ScenarioId,
    pub month:       Month,
    pub channel:     Channel,
    #[serde(default)]
    pub read:        bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_option_id: Option<OptionId>,
    /// Chat only: provisional choice awaiting send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_option_id:  Option<OptionId>,
}

impl Message {
    pub fn new(scenario_id: &str, month: Month, channel: Channel) -> Self {
        Self {
            id: Self::instance_id(scenario_id, month),
            scenario_id: scenario_id.to_string(),
            month,
            channel,
            read: false,
            chosen_option_id: None,
            draft_option_id: None,
        }
    }

    pub fn instance_id(scenario_id: &str, month: Month) -> MessageId {
        format!("{scenario_id}@m{month}")
    }

    /// A chat message is sent once an option has been chosen.
    pub fn is_sent(&self) -> bool {
        self.chosen_option_id.is_some()
    }
}

/// Three parallel per-month series. Index = month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct History {
    pub money:     Vec<f64>,
    pub health:    Vec<i32>,
    pub wellbeing: Vec<i32>,
}

impl History {
    pub fn starting_at(meters: &Meters) -> Self {
        Self {
            money:     vec![meters.money],
            health:    vec![meters.health],
            wellbeing: vec![meters.wellbeing],
        }
    }

    /// Write `meters` at `month`, first repeating the last known values
    /// over any skipped months.
    pub fn record(&mut self, month: Month, meters: &Meters) {
        let index = month as usize;
        while self.money.len() < index {
            let m = self.money.last().copied().unwrap_or(meters.money);
            let h = self.health.last().copied().unwrap_or(meters.health);
            let w = self.wellbeing.last().copied().unwrap_or(meters.wellbeing);
            self.money.push(m);
            self.health.push(h);
            self.wellbeing.push(w);
        }
        if self.money.len() == index {
            self.money.push(meters.money);
            self.health.push(meters.health);
            self.wellbeing.push(meters.wellbeing);
        } else {
            self.money[index] = meters.money;
            self.health[index] = meters.health;
            self.wellbeing[index] = meters.wellbeing;
        }
    }

    pub fn len(&self) -> usize {
        self.money.len()
    }

    pub fn is_empty(&self) -> bool {
        self.money.is_empty()
    }

    pub fn get(&self, month: Month) -> Option<Meters> {
        let i = month as usize;
        Some(Meters {
            money:     *self.money.get(i)?,
            health:    *self.health.get(i)?,
            wellbeing: *self.wellbeing.get(i)?,
        })
    }
}
