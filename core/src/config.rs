//! Engine configuration.
//!
//! `EngineConfig::default()` and `data/engine_config.json` describe the
//! same configuration. Tools load the file so it can be tuned without a
//! rebuild; tests use the default.

use crate::{
    benefits::BenefitStream,
    types::{Channel, Meters, Month, ScenarioId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BUILTIN_CONFIG: &str = include_str!("../../data/engine_config.json");

/// Per-channel selection policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelPolicy {
    pub cap: usize,
    /// Scenario ids that are never dropped by the cap once eligible.
    #[serde(default)]
    pub must_include: Vec<ScenarioId>,
}

/// The synthetic transaction a fraud stage shows on the statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTransaction {
    pub merchant: String,
    pub amount:   f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FraudConfig {
    /// Index 0 is stage 1.
    pub stages:         Vec<StageTransaction>,
    pub report_epsilon: f64,
    /// `phone_scam_type` values that start the chain.
    pub scam_types:     Vec<String>,
}

impl FraudConfig {
    pub fn transaction(&self, stage: u8) -> Option<&StageTransaction> {
        (stage as usize).checked_sub(1).and_then(|i| self.stages.get(i))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenefitsConfig {
    pub jsa_monthly_amount:     f64,
    pub uc_standard_amount:     f64,
    pub uc_expected_council_tax: f64,
    pub uc_expected_utilities:  f64,
}

impl BenefitsConfig {
    pub fn standard_amount(&self, stream: BenefitStream) -> f64 {
        match stream {
            BenefitStream::Jsa             => self.jsa_monthly_amount,
            BenefitStream::UniversalCredit => self.uc_standard_amount,
        }
    }
}

/// Thresholds and rates of the GP, counselling and job-offer support.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupportConfig {
    /// A check-up below this balance opens the food bank voucher window.
    pub foodbank_money_below:        f64,
    /// Months the voucher window lasts, starting next month.
    pub foodbank_months:             u32,
    /// A check-up below this wellbeing starts counselling.
    pub counselling_wellbeing_below: i32,
    /// Wellbeing added at every month end once counselling has started.
    pub counselling_boost:           i32,
    /// Hourly pay times weekly hours times this gives the monthly wage.
    pub weeks_per_month:             f64,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            foodbank_money_below:        100.0,
            foodbank_months:             3,
            counselling_wellbeing_below: 20,
            counselling_boost:           5,
            weeks_per_month:             4.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub starting:    Meters,
    pub final_month: Month,
    pub inbox:       ChannelPolicy,
    pub chat:        ChannelPolicy,
    pub fraud:       FraudConfig,
    pub benefits:    BenefitsConfig,
    #[serde(default)]
    pub support:     SupportConfig,
    /// Monthly rent per housing contract id.
    pub housing_rents: BTreeMap<String, f64>,
    /// Pending-choice keys cleared by every commit.
    pub monthly_choice_keys: Vec<String>,
}

impl EngineConfig {
    /// Load `{data_dir}/engine_config.json`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/engine_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))
    }

    /// The configuration shipped with the crate.
    pub fn builtin() -> crate::error::SimResult<Self> {
        Ok(serde_json::from_str(BUILTIN_CONFIG)?)
    }

    pub fn policy(&self, channel: Channel) -> &ChannelPolicy {
        match channel {
            Channel::Inbox => &self.inbox,
            Channel::Chat  => &self.chat,
        }
    }

    pub fn rent_for(&self, housing: &str) -> Option<f64> {
        self.housing_rents.get(housing).copied()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let ids = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            starting: Meters { money: 0.0, health: 70, wellbeing: 70 },
            final_month: 11,
            inbox: ChannelPolicy {
                cap: 4,
                must_include: ids(&[
                    "benefits-jsa-application",
                    "benefits-uc-housing-invite",
                    "work-interview-feedback-attire",
                    "bank-warning-scam-activity",
                    "bank-warning-scam-activity-stage-2",
                    "bank-warning-scam-activity-stage-3",
                    "bank-warning-how-to-spot-smishing",
                    "life-energy-price-update-m7",
                    "life-unexpected-dentist-m9",
                    "gp-checkup-m5",
                    "gp-checkup-m8",
                    "jobs-agency-new-listings-m4",
                    "jobs-agency-new-listings-m9",
                    "work-interview-invite-job",
                    "work-job-offer",
                ]),
            },
            chat: ChannelPolicy {
                cap: 4,
                must_include: ids(&["start-gift-family-jan"]),
            },
            fraud: FraudConfig {
                stages: vec![
                    StageTransaction { merchant: "Apple Pay".into(), amount: 0.45 },
                    StageTransaction { merchant: "Sports Direct".into(), amount: 59.99 },
                    StageTransaction { merchant: "International Transfer 034500001".into(), amount: 2500.0 },
                ],
                report_epsilon: 0.001,
                scam_types: ids(&["bank", "hmrc", "whatsapp", "parcel", "prize"]),
            },
            benefits: BenefitsConfig {
                jsa_monthly_amount: 320.0,
                uc_standard_amount: 0.0,
                uc_expected_council_tax: 100.0,
                uc_expected_utilities: 181.0,
            },
            support: SupportConfig::default(),
            housing_rents: [
                ("housing_shared", 350.0),
                ("housing_studio", 550.0),
                ("housing_onebed", 700.0),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            monthly_choice_keys: ids(&["food", "transport", "leisure"]),
        }
    }
}
