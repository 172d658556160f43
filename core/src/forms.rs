//! Special forms: jobseeker's allowance and universal credit.
//!
//! The forms themselves (fields, validation, scoring) live outside the
//! engine. The engine receives the tier the form produced, records it in
//! flags, completes the invite message, and drops a receipt in the inbox.
//! Decisions arrive later as ordinary catalog scenarios gated on those
//! flags.

use crate::{
    command::Rejection,
    benefits::BenefitStream,
    catalog::Catalog,
    config::EngineConfig,
    event::EngineEvent,
    flags::keys,
    message::Message,
    state::EngineState,
    types::{Channel, Month},
};
use serde::{Deserialize, Serialize};

const JSA_INVITE: &str = "benefits-jsa-application";
const JSA_RECEIPT: &str = "jsa-receipt";
const UC_INVITE: &str = "benefits-uc-housing-invite";
const UC_RECEIPT: &str = "uc-receipt";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormQuality {
    Good,
    Ok,
    Bad,
    /// Submitted without the required answers.
    #[serde(rename = "none")]
    Blank,
}

impl FormQuality {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Good  => "good",
            Self::Ok    => "ok",
            Self::Bad   => "bad",
            Self::Blank => "none",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecialForm {
    JobseekerAllowance {
        quality: FormQuality,
    },
    UniversalCredit {
        correct: bool,
        #[serde(default)]
        monthly_award: f64,
    },
}

impl SpecialForm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JobseekerAllowance { .. } => "jobseeker_allowance",
            Self::UniversalCredit { .. }    => "universal_credit",
        }
    }
}

/// The figures a player enters on the universal credit form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UcAnswers {
    pub rent:        f64,
    pub council_tax: f64,
    pub utilities:   f64,
}

/// What the answers are checked against. `rent` is unknown until the
/// housing contract is locked, in which case any rent is accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UcExpected {
    pub rent:        Option<f64>,
    pub council_tax: f64,
    pub utilities:   f64,
}

impl UcExpected {
    pub fn for_state(state: &EngineState, config: &EngineConfig) -> Self {
        Self {
            rent:        state.flags.as_f64(keys::housing::RENT_MONTHLY),
            council_tax: config.benefits.uc_expected_council_tax,
            utilities:   config.benefits.uc_expected_utilities,
        }
    }
}

impl UcAnswers {
    /// Every figure must match to the nearest pound.
    pub fn assess(&self, expected: &UcExpected) -> bool {
        let same = |a: f64, b: f64| (a - b).abs() < 0.5;
        expected.rent.map_or(true, |r| same(self.rent, r))
            && same(self.council_tax, expected.council_tax)
            && same(self.utilities, expected.utilities)
    }
}

pub fn submit(
    state: &mut EngineState,
    catalog: &Catalog,
    form: &SpecialForm,
) -> Result<Vec<EngineEvent>, Rejection> {
    let month = state.month();
    let outcome = match form {
        SpecialForm::JobseekerAllowance { quality } => {
            if state.flags.is_true(keys::benefits::JSA_FORM_SUBMITTED) {
                return Err(Rejection::FormAlreadySubmitted);
            }
            state.flags.set(keys::benefits::JSA_FORM_SUBMITTED, true);
            state.flags.set(keys::benefits::JSA_FORM_QUALITY, quality.label());
            state.flags.set(keys::benefits::JSA_FORM_OPEN, false);
            complete_invite(state, JSA_INVITE, "jsa_form_submitted");
            add_receipt(state, catalog, JSA_RECEIPT, month);
            quality.label().to_string()
        }
        SpecialForm::UniversalCredit { correct, monthly_award } => {
            if state.flags.is_true(keys::benefits::UC_FORM_SUBMITTED) {
                return Err(Rejection::FormAlreadySubmitted);
            }
            state.flags.set(keys::benefits::UC_FORM_SUBMITTED, true);
            state.flags.set(keys::benefits::UC_CORRECT, *correct);
            state.flags.set(keys::benefits::UC_DECISION_DUE, month.saturating_add(1));
            state.flags.set(keys::benefits::UC_PENDING_AMOUNT, *monthly_award);
            state.flags.set(keys::benefits::UC_FORM_OPEN, false);
            state.pending_awards.insert(BenefitStream::UniversalCredit, *monthly_award);
            complete_invite(state, UC_INVITE, "uc_form_submitted");
            add_receipt(state, catalog, UC_RECEIPT, month);
            let tier = if *correct { "correct" } else { "incorrect" };
            tier.to_string()
        }
    };

    log::info!("month={month} form submitted kind={} outcome={outcome}", form.name());
    Ok(vec![EngineEvent::FormSubmitted {
        month,
        form: form.name().to_string(),
        outcome,
    }])
}

/// Mark the latest invite message read and answered.
fn complete_invite(state: &mut EngineState, scenario_id: &str, marker: &str) {
    if let Some(invite) = state
        .inbox
        .iter_mut()
        .rev()
        .find(|m| m.scenario_id == scenario_id)
    {
        invite.read = true;
        if invite.chosen_option_id.is_none() {
            invite.chosen_option_id = Some(marker.to_string());
        }
    }
}

fn add_receipt(state: &mut EngineState, catalog: &Catalog, scenario_id: &str, month: Month) {
    if !catalog.contains(scenario_id) {
        return;
    }
    let exists = state
        .inbox
        .iter()
        .any(|m| m.scenario_id == scenario_id && m.month == month);
    if !exists {
        state.inbox.push(Message::new(scenario_id, month, Channel::Inbox));
    }
}
