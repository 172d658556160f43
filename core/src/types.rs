//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A simulated month. 0 = January, 11 = December.
pub type Month = u32;

/// Stable catalog identifier of a scenario.
pub type ScenarioId = String;

/// Identifier of one choice inside a scenario.
pub type OptionId = String;

/// Identifier of a per-playthrough message instance.
pub type MessageId = String;

/// The canonical session identifier.
pub type SessionId = String;

/// Health and wellbeing live in this closed range.
pub const METER_MIN: i32 = 0;
pub const METER_MAX: i32 = 100;

pub fn clamp_meter(value: i32) -> i32 {
    value.clamp(METER_MIN, METER_MAX)
}

/// The two independent message channels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Asynchronous email-style messages, single-phase choices.
    Inbox,
    /// Real-time chat messages with a draft/send lifecycle.
    #[serde(alias = "phone")]
    Chat,
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Chat  => "chat",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the player supports themselves. Chosen once, read thereafter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Lifestyle {
    Benefits,
    PartTime,
    FullTime,
}

impl Lifestyle {
    /// Label that catalog lifestyle filters are matched against.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Benefits => "benefits",
            Self::PartTime => "part-time",
            Self::FullTime => "full-time",
        }
    }
}

impl std::str::FromStr for Lifestyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower.contains("benefit") {
            Ok(Self::Benefits)
        } else if lower.contains("part") {
            Ok(Self::PartTime)
        } else if lower.contains("full") {
            Ok(Self::FullTime)
        } else {
            Err(format!("unknown lifestyle '{s}'"))
        }
    }
}

/// A signed change to the three meters.
///
/// Money is unbounded; health and wellbeing deltas are applied and then
/// clamped by whoever owns the meters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Effects {
    #[serde(default)]
    pub money: f64,
    #[serde(default)]
    pub health: i32,
    #[serde(default)]
    pub wellbeing: i32,
}

impl Effects {
    pub const ZERO: Effects = Effects { money: 0.0, health: 0, wellbeing: 0 };

    pub fn new(money: f64, health: i32, wellbeing: i32) -> Self {
        Self { money, health, wellbeing }
    }

    /// `self - other`, component-wise.
    pub fn minus(&self, other: &Effects) -> Effects {
        Effects {
            money:     self.money - other.money,
            health:    self.health - other.health,
            wellbeing: self.wellbeing - other.wellbeing,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.money == 0.0 && self.health == 0 && self.wellbeing == 0
    }
}

/// Current value of the three meters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Meters {
    pub money: f64,
    pub health: i32,
    pub wellbeing: i32,
}

impl Meters {
    /// Apply a delta. Money moves freely, the other two are clamped.
    pub fn apply(&mut self, delta: &Effects) {
        self.money += delta.money;
        self.health = clamp_meter(self.health + delta.health);
        self.wellbeing = clamp_meter(self.wellbeing + delta.wellbeing);
    }

    pub fn clamp(&mut self) {
        self.health = clamp_meter(self.health);
        self.wellbeing = clamp_meter(self.wellbeing);
    }
}
