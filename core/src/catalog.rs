//! Scenario catalog: immutable, ordered, validated at load.
//!
//! The catalog is data: the engine reads it, never writes it. Display copy
//! (`from`, `subject`, `preview`, `label`, `reply`) is carried through
//! untouched for the UI.

use crate::{
    benefits::AwardInstruction,
    error::{SimError, SimResult},
    flags::{FlagPatch, FlagSchema, FlagValue},
    support::SupportAction,
    trigger::Trigger,
    types::{Channel, Effects, Lifestyle, OptionId, ScenarioId},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const BUILTIN_SCENARIOS: &str = include_str!("../../data/scenarios.json");

/// Which lifestyles a scenario applies to: `"all"`, a single fragment such
/// as `"benefit"`, or alternatives such as `"full|part"`. Fragments are
/// matched as lowercase substrings of the lifestyle label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum LifestyleFilter {
    #[default]
    All,
    AnyOf(Vec<String>),
}

impl LifestyleFilter {
    pub fn matches(&self, lifestyle: Option<Lifestyle>) -> bool {
        match self {
            Self::All => true,
            Self::AnyOf(parts) => {
                let label = lifestyle.map(|l| l.label()).unwrap_or("");
                parts.iter().any(|p| label.contains(p.as_str()))
            }
        }
    }
}

impl From<String> for LifestyleFilter {
    fn from(raw: String) -> Self {
        let want = raw.trim().to_lowercase();
        if want.is_empty() || want == "all" {
            return Self::All;
        }
        let parts: Vec<String> = want
            .split('|')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() { Self::All } else { Self::AnyOf(parts) }
    }
}

impl From<&str> for LifestyleFilter {
    fn from(raw: &str) -> Self { Self::from(raw.to_string()) }
}

impl From<LifestyleFilter> for String {
    fn from(f: LifestyleFilter) -> Self {
        match f {
            LifestyleFilter::All => "all".into(),
            LifestyleFilter::AnyOf(parts) => parts.join("|"),
        }
    }
}

/// "Make `follow_up_id` eligible exactly `after_months` from now."
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowUp {
    #[serde(alias = "followUpId")]
    pub follow_up_id: ScenarioId,
    #[serde(alias = "afterMonths")]
    pub after_months: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub id: OptionId,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default)]
    pub effects: Effects,
    #[serde(default, skip_serializing_if = "FlagPatch::is_empty")]
    pub flags: FlagPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<FollowUp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award: Option<AwardInstruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support: Option<SupportAction>,
}

impl Choice {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            label: String::new(),
            reply: None,
            effects: Effects::ZERO,
            flags: FlagPatch::new(),
            next: None,
            award: None,
            support: None,
        }
    }

    pub fn with_effects(mut self, effects: Effects) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_flag(mut self, key: &str, value: impl Into<FlagValue>) -> Self {
        self.flags.insert(key.to_string(), value.into());
        self
    }

    pub fn with_next(mut self, follow_up_id: &str, after_months: u32) -> Self {
        self.next = Some(FollowUp { follow_up_id: follow_up_id.to_string(), after_months });
        self
    }

    pub fn with_award(mut self, award: AwardInstruction) -> Self {
        self.award = Some(award);
        self
    }

    pub fn with_support(mut self, support: SupportAction) -> Self {
        self.support = Some(support);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub id: ScenarioId,
    #[serde(default = "default_channel")]
    pub channel: Channel,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub preview: String,
    #[serde(default, alias = "appliesTo")]
    pub applies_to: LifestyleFilter,
    #[serde(default, alias = "scheduledOnly")]
    pub scheduled_only: bool,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

fn default_channel() -> Channel { Channel::Inbox }

impl Scenario {
    pub fn new(id: &str, channel: Channel) -> Self {
        Self {
            id: id.to_string(),
            channel,
            category: String::new(),
            from: String::new(),
            subject: String::new(),
            preview: String::new(),
            applies_to: LifestyleFilter::All,
            scheduled_only: false,
            trigger: Trigger::Always,
            choices: Vec::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn applies_to(mut self, filter: &str) -> Self {
        self.applies_to = LifestyleFilter::from(filter);
        self
    }

    pub fn scheduled_only(mut self) -> Self {
        self.scheduled_only = true;
        self
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn choice(&self, option_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == option_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    scenarios: Vec<Scenario>,
}

/// The ordered scenario library plus an id index.
#[derive(Debug, Clone)]
pub struct Catalog {
    scenarios: Vec<Scenario>,
    index: HashMap<ScenarioId, usize>,
}

impl Catalog {
    /// Build and validate against the standard flag schema.
    pub fn from_scenarios(scenarios: Vec<Scenario>) -> SimResult<Self> {
        Self::with_schema(scenarios, &FlagSchema::standard())
    }

    pub fn with_schema(scenarios: Vec<Scenario>, schema: &FlagSchema) -> SimResult<Self> {
        let mut index = HashMap::with_capacity(scenarios.len());
        for (i, s) in scenarios.iter().enumerate() {
            if index.insert(s.id.clone(), i).is_some() {
                return Err(SimError::DuplicateScenario { id: s.id.clone() });
            }
        }
        let catalog = Self { scenarios, index };
        catalog.validate(schema)?;
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_scenarios(file.scenarios)
    }

    /// Load `{data_dir}/scenarios.json`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/scenarios.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content).map_err(|e| anyhow::anyhow!("Invalid catalog {path}: {e}"))
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> SimResult<Self> {
        Self::from_json(BUILTIN_SCENARIOS)
    }

    fn validate(&self, schema: &FlagSchema) -> SimResult<()> {
        for s in &self.scenarios {
            let mut seen = HashSet::new();
            for c in &s.choices {
                if !seen.insert(c.id.as_str()) {
                    return Err(SimError::DuplicateChoice {
                        scenario: s.id.clone(),
                        choice:   c.id.clone(),
                    });
                }
                schema.validate(&c.flags)?;
                if let Some(next) = &c.next {
                    if !self.index.contains_key(&next.follow_up_id) {
                        return Err(SimError::DanglingFollowUp {
                            scenario:  s.id.clone(),
                            follow_up: next.follow_up_id.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Scenario> {
        self.index.get(id).map(|&i| &self.scenarios[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifestyle_filter_forms() {
        assert!(LifestyleFilter::from("all").matches(None));
        assert!(LifestyleFilter::from("benefit").matches(Some(Lifestyle::Benefits)));
        assert!(!LifestyleFilter::from("benefit").matches(Some(Lifestyle::FullTime)));
        let work = LifestyleFilter::from("Full|Part");
        assert!(work.matches(Some(Lifestyle::PartTime)));
        assert!(work.matches(Some(Lifestyle::FullTime)));
        assert!(!work.matches(Some(Lifestyle::Benefits)));
        assert!(!work.matches(None));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Catalog::from_scenarios(vec![
            Scenario::new("a", Channel::Inbox),
            Scenario::new("a", Channel::Chat),
        ])
        .unwrap_err();
        assert!(matches!(err, SimError::DuplicateScenario { .. }));
    }

    #[test]
    fn dangling_follow_up_is_rejected() {
        let err = Catalog::from_scenarios(vec![Scenario::new("a", Channel::Inbox)
            .with_choice(Choice::new("go").with_next("missing", 2))])
        .unwrap_err();
        assert!(matches!(err, SimError::DanglingFollowUp { .. }));
    }

    #[test]
    fn mistyped_flag_patch_is_rejected() {
        let err = Catalog::from_scenarios(vec![Scenario::new("a", Channel::Inbox)
            .with_choice(Choice::new("go").with_flag("boilerReplaced", 1i64))])
        .unwrap_err();
        assert!(matches!(err, SimError::InvalidFlag(_)));
    }

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        assert!(catalog.contains("boiler-breakdown"));
        assert!(catalog.contains("bank-warning-scam-activity"));
        assert_eq!(catalog.get("phone-cinema-invite").map(|s| s.channel), Some(Channel::Chat));
    }
}
