//! Periodic benefit income.
//!
//! RULE: An award only exists because a chosen option carried an `award`
//! instruction. Income is paid by `BenefitSubsystem` at month end, never
//! by the option itself, so an award is counted once per committed month.

use crate::{
    config::EngineConfig,
    event::EngineEvent,
    flags::keys,
    state::EngineState,
    subsystem::MonthEndSubsystem,
    types::Month,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BenefitStream {
    Jsa,
    UniversalCredit,
}

impl BenefitStream {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jsa             => "jsa",
            Self::UniversalCredit => "universal_credit",
        }
    }

    /// Flag that mirrors the monthly amount so scenarios can gate on it.
    pub fn amount_flag(&self) -> &'static str {
        match self {
            Self::Jsa             => keys::benefits::JSA_MONTHLY_AMOUNT,
            Self::UniversalCredit => keys::benefits::UC_MONTHLY_AMOUNT,
        }
    }
}

/// Where the monthly amount of an award comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AwardAmount {
    Fixed(f64),
    /// The configured standard rate for the stream.
    Standard,
    /// Whatever the submitted application assessed (see `forms`).
    Pending,
}

/// Catalog-side instruction carried by a choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwardInstruction {
    pub stream: BenefitStream,
    pub amount: AwardAmount,
    #[serde(default, alias = "startsAfterMonths")]
    pub starts_after_months: u32,
}

/// A live award held in engine state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BenefitAward {
    pub stream:         BenefitStream,
    pub monthly_amount: f64,
    pub start_month:    Month,
}

/// Create or overwrite the award for the instruction's stream.
/// Returns `None` when a pending amount was asked for but none is recorded.
pub fn grant(
    state: &mut EngineState,
    instruction: &AwardInstruction,
    month: Month,
    config: &EngineConfig,
) -> Option<EngineEvent> {
    let stream = instruction.stream;
    let monthly_amount = match instruction.amount {
        AwardAmount::Fixed(amount) => amount,
        AwardAmount::Standard      => config.benefits.standard_amount(stream),
        AwardAmount::Pending => match state.pending_awards.remove(&stream) {
            Some(amount) => amount,
            None => {
                log::warn!("month={month} award for {} has no pending amount", stream.name());
                return None;
            }
        },
    };
    let award = BenefitAward {
        stream,
        monthly_amount,
        start_month: month.saturating_add(instruction.starts_after_months),
    };
    state.awards.insert(stream, award);
    state.flags.set(stream.amount_flag(), monthly_amount);
    log::info!(
        "month={month} award granted stream={} amount={monthly_amount:.2} start={}",
        stream.name(),
        award.start_month
    );
    Some(EngineEvent::AwardGranted {
        month,
        stream,
        monthly_amount,
        start_month: award.start_month,
    })
}

/// Pays every award whose start month has been reached.
pub struct BenefitSubsystem;

impl MonthEndSubsystem for BenefitSubsystem {
    fn name(&self) -> &'static str { "benefits" }

    fn on_month_end(
        &self,
        state: &mut EngineState,
        _finishing: Month,
        next: Month,
        _config: &EngineConfig,
    ) -> Vec<EngineEvent> {
        let due: Vec<BenefitAward> = state
            .awards
            .values()
            .filter(|a| a.start_month <= next)
            .copied()
            .collect();

        let mut events = Vec::with_capacity(due.len());
        for award in due {
            state.meters.money += award.monthly_amount;
            log::debug!(
                "month={next} benefit paid stream={} amount={:.2}",
                award.stream.name(),
                award.monthly_amount
            );
            events.push(EngineEvent::BenefitPaid {
                month:  next,
                stream: award.stream,
                amount: award.monthly_amount,
            });
        }
        events
    }
}
