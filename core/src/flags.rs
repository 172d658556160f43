//! Narrative memory: the typed, versioned flag store.
//!
//! RULE: Flags are the only channel through which scenarios talk to each
//! other and to the escalation machine. Catalog patches go through
//! `FlagStore::merge`, which validates them against the `FlagSchema`.
//! Engine-owned keys (fraud chain mirror, form results) are written with
//! `FlagStore::set`. The fraud mirror is refused in any merged patch: the
//! chain enum is its only writer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// A single flag value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            Self::Bool(_)                => FlagKind::Bool,
            Self::Int(_) | Self::Float(_) => FlagKind::Number,
            Self::Text(_)                => FlagKind::Text,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i)   => Some(*i as f64),
            Self::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i)   => Some(*i),
            Self::Float(f) if f.is_finite() => Some(f.floor() as i64),
            _ => None,
        }
    }
}

impl From<bool> for FlagValue {
    fn from(v: bool) -> Self { Self::Bool(v) }
}
impl From<i64> for FlagValue {
    fn from(v: i64) -> Self { Self::Int(v) }
}
impl From<u32> for FlagValue {
    fn from(v: u32) -> Self { Self::Int(v as i64) }
}
impl From<f64> for FlagValue {
    fn from(v: f64) -> Self { Self::Float(v) }
}
impl From<&str> for FlagValue {
    fn from(v: &str) -> Self { Self::Text(v.to_string()) }
}

/// A partial update to the flag map. Later keys overwrite earlier ones.
pub type FlagPatch = BTreeMap<String, FlagValue>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    Bool,
    Number,
    Text,
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bool   => "bool",
            Self::Number => "number",
            Self::Text   => "text",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagArea {
    Fraud,
    Scam,
    Benefits,
    Housing,
    Bills,
    Work,
    Support,
    Social,
}

impl FlagArea {
    /// Areas only the engine may write.
    pub fn is_engine_owned(&self) -> bool {
        matches!(self, Self::Fraud)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlagError {
    #[error("flag '{key}' ({area:?}) expects {expected}, got {found}")]
    WrongKind {
        key:      String,
        area:     FlagArea,
        expected: FlagKind,
        found:    FlagKind,
    },
    #[error("flag '{key}' ({area:?}) is engine-owned and cannot be patched")]
    EngineOwned { key: String, area: FlagArea },
}

impl FlagError {
    pub fn key(&self) -> &str {
        match self {
            Self::WrongKind { key, .. } | Self::EngineOwned { key, .. } => key,
        }
    }
}

/// Well-known flag keys, grouped by feature area.
pub mod keys {
    pub mod fraud {
        pub const ACTIVE: &str       = "fraud_active";
        pub const STAGE: &str        = "fraud_stage";
        pub const START_MONTH: &str  = "fraud_start_month";
        pub const REPORTED: &str     = "fraud_reported";
        pub const RESOLVED: &str     = "fraud_resolved";
        pub const GAME_OVER: &str    = "fraud_game_over_next";
    }
    pub mod scam {
        pub const FELL_FOR_IT: &str     = "phone_scam_fell_for_it";
        pub const TYPE: &str            = "phone_scam_type";
        pub const ENTERED_DETAILS: &str = "phone_scam_entered_details";
        pub const FELL_MONTH: &str      = "phone_scam_fell_month";
        pub const LOSS: &str            = "phone_scam_loss";
        pub const BANK_WARNING_SENT: &str = "bank_warning_sent";
        pub const SMISHING_TIPS_SENT: &str = "bank_smishing_tips_sent";
    }
    pub mod benefits {
        pub const JSA_FORM_OPEN: &str        = "jsa_form_open";
        pub const JSA_FORM_SUBMITTED: &str   = "jsa_form_submitted";
        pub const JSA_FORM_QUALITY: &str     = "jsa_form_quality";
        pub const JSA_AWARDED: &str          = "jsa_awarded";
        pub const JSA_DECISION_DONE: &str    = "jsa_decision_done";
        pub const UC_FORM_OPEN: &str         = "uc_form_open";
        pub const UC_FORM_SUBMITTED: &str    = "uc_form_submitted";
        pub const UC_DECISION_DUE: &str      = "uc_decision_due_month";
        pub const UC_CORRECT: &str           = "uc_application_correct";
        pub const UC_DECISION_DONE: &str     = "uc_decision_done";
        pub const UC_PENDING_AMOUNT: &str    = "uc_pending_amount";
        pub const UC_MONTHLY_AMOUNT: &str    = "uc_monthly_amount";
        pub const JSA_MONTHLY_AMOUNT: &str   = "jsa_monthly_amount";
    }
    pub mod housing {
        pub const RENT_MONTHLY: &str = "rent_monthly";
    }
    pub mod support {
        pub const FOODBANK_START: &str     = "foodbank_voucher_start_month";
        pub const FOODBANK_END: &str       = "foodbank_voucher_end_month";
        pub const COUNSELLING_ACTIVE: &str = "counselling_active";
        pub const COUNSELLING_START: &str  = "counselling_start_month";
    }
    pub mod job {
        pub const BOARD_OPEN: &str          = "job_board_open";
        pub const APPLICATION_ACTIVE: &str  = "job_application_active";
        pub const APPLIED_MONTH: &str       = "job_applied_month";
        pub const APPLIED_TITLE: &str       = "job_applied_title";
        pub const PAY_PER_HOUR: &str        = "job_applied_pay_per_hour";
        pub const HOURS_PER_WEEK: &str      = "job_applied_hours_per_week";
        pub const OUTFIT_OPEN: &str         = "interview_outfit_open";
        pub const OUTFIT_DONE: &str         = "interview_outfit_done";
        pub const OUTFIT_FAILED: &str       = "interview_outfit_failed";
        pub const MONTHLY_INCOME: &str      = "job_monthly_income";
        pub const INCOME_START: &str        = "job_income_start_month";
    }
}

use FlagArea::*;
use FlagKind::{Bool as B, Number as N, Text as T};

const KNOWN_FLAGS: &[(&str, FlagArea, FlagKind)] = &[
    // fraud chain mirror
    (keys::fraud::ACTIVE,       Fraud, B),
    (keys::fraud::STAGE,        Fraud, N),
    (keys::fraud::START_MONTH,  Fraud, N),
    (keys::fraud::REPORTED,     Fraud, B),
    (keys::fraud::RESOLVED,     Fraud, B),
    (keys::fraud::GAME_OVER,    Fraud, B),
    // scams
    (keys::scam::FELL_FOR_IT,        Scam, B),
    (keys::scam::TYPE,               Scam, T),
    (keys::scam::ENTERED_DETAILS,    Scam, B),
    (keys::scam::FELL_MONTH,         Scam, N),
    (keys::scam::LOSS,               Scam, N),
    (keys::scam::BANK_WARNING_SENT,  Scam, B),
    (keys::scam::SMISHING_TIPS_SENT, Scam, B),
    // benefits
    (keys::benefits::JSA_FORM_OPEN,      Benefits, B),
    (keys::benefits::JSA_FORM_SUBMITTED, Benefits, B),
    (keys::benefits::JSA_FORM_QUALITY,   Benefits, T),
    (keys::benefits::JSA_AWARDED,        Benefits, B),
    (keys::benefits::JSA_DECISION_DONE,  Benefits, B),
    (keys::benefits::UC_FORM_OPEN,       Benefits, B),
    (keys::benefits::UC_FORM_SUBMITTED,  Benefits, B),
    (keys::benefits::UC_DECISION_DUE,    Benefits, N),
    (keys::benefits::UC_CORRECT,         Benefits, B),
    (keys::benefits::UC_DECISION_DONE,   Benefits, B),
    (keys::benefits::UC_PENDING_AMOUNT,  Benefits, N),
    (keys::benefits::UC_MONTHLY_AMOUNT,  Benefits, N),
    (keys::benefits::JSA_MONTHLY_AMOUNT, Benefits, N),
    ("sanctionRisk",                     Benefits, B),
    ("sanctionWarningShown",             Benefits, B),
    ("jobcentreAppointmentDone",         Benefits, B),
    // housing
    (keys::housing::RENT_MONTHLY,    Housing, N),
    ("couldNotPayRent",              Housing, B),
    ("resolvedRentArrears",          Housing, B),
    ("rentDoubleNextMonth",          Housing, B),
    ("boilerServiced",               Housing, B),
    ("boilerReplaced",               Housing, B),
    ("boilerBreakdownPlanned",       Housing, B),
    ("boilerHeatersInstalled",       Housing, B),
    ("boilerBroken",                 Housing, B),
    // bills and credit
    ("couldNotPayCouncilTax",        Bills, B),
    ("overdraftExplained",           Bills, B),
    ("overdraftChargeNextMonth",     Bills, B),
    ("loanPlanActive",               Bills, B),
    ("loanMonthsLeft",               Bills, N),
    ("loanMonthly",                  Bills, N),
    ("storeCardActive",              Bills, B),
    ("storeCardBalance",             Bills, N),
    ("storeCardNextOfferMonth",      Bills, N),
    ("storeCardStartMonth",          Bills, N),
    ("storeCardLateFee",             Bills, B),
    // work
    ("rotasChangedShown",            Work, B),
    ("payrollMistakeShown",          Work, B),
    ("trainingOfferUsed",            Work, B),
    ("interviewInviteUsed",          Work, B),
    ("missedInterview",              Work, B),
    (keys::job::BOARD_OPEN,          Work, B),
    (keys::job::APPLICATION_ACTIVE,  Work, B),
    (keys::job::APPLIED_MONTH,       Work, N),
    (keys::job::APPLIED_TITLE,       Work, T),
    (keys::job::PAY_PER_HOUR,        Work, N),
    (keys::job::HOURS_PER_WEEK,      Work, N),
    (keys::job::OUTFIT_OPEN,         Work, B),
    (keys::job::OUTFIT_DONE,         Work, B),
    (keys::job::OUTFIT_FAILED,       Work, B),
    (keys::job::MONTHLY_INCOME,      Work, N),
    (keys::job::INCOME_START,        Work, N),
    // support
    (keys::support::FOODBANK_START,     Support, N),
    (keys::support::FOODBANK_END,       Support, N),
    (keys::support::COUNSELLING_ACTIVE, Support, B),
    (keys::support::COUNSELLING_START,  Support, N),
    // social / health
    ("gymMembership",                Social, B),
    ("start_gift_done",              Social, B),
    ("start_gift_accepted",          Social, B),
];

/// Enumerated flag schema, checked on every merge.
#[derive(Debug, Clone)]
pub struct FlagSchema {
    known: HashMap<&'static str, (FlagArea, FlagKind)>,
}

impl FlagSchema {
    pub fn standard() -> Self {
        let known = KNOWN_FLAGS
            .iter()
            .map(|(key, area, kind)| (*key, (*area, *kind)))
            .collect();
        Self { known }
    }

    pub fn kind_of(&self, key: &str) -> Option<FlagKind> {
        self.known.get(key).map(|(_, kind)| *kind)
    }

    /// Check every key of the patch. Unknown keys pass; engine-owned keys
    /// never do.
    pub fn validate(&self, patch: &FlagPatch) -> Result<(), FlagError> {
        for (key, value) in patch {
            match self.known.get(key.as_str()) {
                Some((area, _)) if area.is_engine_owned() => {
                    return Err(FlagError::EngineOwned { key: key.clone(), area: *area });
                }
                Some((area, expected)) if *expected != value.kind() => {
                    return Err(FlagError::WrongKind {
                        key:      key.clone(),
                        area:     *area,
                        expected: *expected,
                        found:    value.kind(),
                    });
                }
                Some(_) => {}
                None => log::debug!("flags: key '{key}' is not in the schema"),
            }
        }
        Ok(())
    }
}

impl Default for FlagSchema {
    fn default() -> Self { Self::standard() }
}

/// The flag map plus a version counter bumped on every effective change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FlagStore {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    values: BTreeMap<String, FlagValue>,
}

impl FlagStore {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Strictly `true`. Missing keys and non-bool values are not true.
    pub fn is_true(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(FlagValue::Bool(true)))
    }

    pub fn as_f64(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(FlagValue::as_f64)
    }

    pub fn as_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(FlagValue::as_i64)
    }

    pub fn as_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(FlagValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn values(&self) -> &BTreeMap<String, FlagValue> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Validate then merge. Last write wins. Returns the keys whose value
    /// actually changed; on error nothing is written.
    pub fn merge(&mut self, patch: &FlagPatch, schema: &FlagSchema) -> Result<Vec<String>, FlagError> {
        schema.validate(patch)?;
        let mut changed = Vec::new();
        for (key, value) in patch {
            if self.values.get(key) != Some(value) {
                self.values.insert(key.clone(), value.clone());
                changed.push(key.clone());
            }
        }
        if !changed.is_empty() {
            self.version += 1;
        }
        Ok(changed)
    }

    /// Engine-internal write, no schema check.
    pub fn set(&mut self, key: &str, value: impl Into<FlagValue>) {
        let value = value.into();
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.version += 1;
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FlagValue> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }
}
