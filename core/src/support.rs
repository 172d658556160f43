//! Support offers: GP check-ups, counselling and a new job.
//!
//! RULES:
//!   - A `SupportAction` rides on a chosen option. It is judged against the
//!     meters as they were before the option's own effects land.
//!   - Everything it grants starts next month and is recorded in flags, so
//!     catalog triggers and the month's totals can read it.
//!   - Counselling is paid out by `CounsellingSubsystem` at month end:
//!     wellbeing is clamped first, then raised by the configured boost.
//!   - Wages are not added by the engine. `job_income` tells the caller
//!     what replaces the lifestyle income in a month's totals.

use crate::{
    config::{EngineConfig, SupportConfig},
    event::EngineEvent,
    flags::{keys, FlagStore},
    state::EngineState,
    subsystem::MonthEndSubsystem,
    types::{clamp_meter, Meters, Month},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SupportAction {
    /// Attending a check-up: a food bank voucher when money is low,
    /// counselling when wellbeing is very low.
    GpCheckup,
    /// Accepting the offered job at the applied hours and pay.
    AcceptJob,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SupportKind {
    FoodbankVoucher,
    Counselling,
}

/// Apply `action`, chosen in `month` with the player at `meters`.
pub fn apply(
    state: &mut EngineState,
    action: SupportAction,
    meters: Meters,
    month: Month,
    config: &SupportConfig,
) -> Vec<EngineEvent> {
    let start_month = month.saturating_add(1);
    let mut events = Vec::new();
    match action {
        SupportAction::GpCheckup => {
            if meters.money < config.foodbank_money_below {
                let end_month = month.saturating_add(config.foodbank_months);
                state.flags.set(keys::support::FOODBANK_START, start_month);
                state.flags.set(keys::support::FOODBANK_END, end_month);
                log::info!("month={month} foodbank voucher granted {start_month}..={end_month}");
                events.push(EngineEvent::SupportGranted {
                    month,
                    support: SupportKind::FoodbankVoucher,
                    start_month,
                    end_month: Some(end_month),
                });
            }
            if meters.wellbeing < config.counselling_wellbeing_below {
                state.flags.set(keys::support::COUNSELLING_ACTIVE, true);
                state.flags.set(keys::support::COUNSELLING_START, start_month);
                log::info!("month={month} counselling from {start_month}");
                events.push(EngineEvent::SupportGranted {
                    month,
                    support: SupportKind::Counselling,
                    start_month,
                    end_month: None,
                });
            }
        }
        SupportAction::AcceptJob => {
            let pay = state.flags.as_f64(keys::job::PAY_PER_HOUR).unwrap_or(0.0);
            let hours = state.flags.as_f64(keys::job::HOURS_PER_WEEK).unwrap_or(0.0);
            let monthly_income = pay * hours * config.weeks_per_month;
            state.flags.set(keys::job::MONTHLY_INCOME, monthly_income);
            state.flags.set(keys::job::INCOME_START, start_month);
            state.flags.set(keys::job::APPLICATION_ACTIVE, false);
            log::info!("month={month} job accepted income={monthly_income:.2} from {start_month}");
            events.push(EngineEvent::JobAccepted { month, monthly_income, start_month });
        }
    }
    events
}

/// True when the food bank voucher covers `month`.
pub fn foodbank_active(flags: &FlagStore, month: Month) -> bool {
    match (
        flags.as_i64(keys::support::FOODBANK_START),
        flags.as_i64(keys::support::FOODBANK_END),
    ) {
        (Some(start), Some(end)) => (start..=end).contains(&i64::from(month)),
        _ => false,
    }
}

/// The accepted job's monthly wage, once it has started.
pub fn job_income(flags: &FlagStore, month: Month) -> Option<f64> {
    let income = flags.as_f64(keys::job::MONTHLY_INCOME).filter(|v| *v > 0.0)?;
    let start = flags.as_i64(keys::job::INCOME_START)?;
    (i64::from(month) >= start).then_some(income)
}

pub struct CounsellingSubsystem;

impl MonthEndSubsystem for CounsellingSubsystem {
    fn name(&self) -> &'static str { "counselling" }

    fn on_month_end(
        &self,
        state: &mut EngineState,
        _finishing: Month,
        next: Month,
        config: &EngineConfig,
    ) -> Vec<EngineEvent> {
        if !state.flags.is_true(keys::support::COUNSELLING_ACTIVE) {
            return Vec::new();
        }
        let due = state
            .flags
            .as_i64(keys::support::COUNSELLING_START)
            .map_or(false, |start| i64::from(next) >= start);
        if !due {
            return Vec::new();
        }

        let before = clamp_meter(state.meters.wellbeing);
        state.meters.wellbeing = clamp_meter(before + config.support.counselling_boost);
        log::debug!("month={next} counselling wellbeing {before} -> {}", state.meters.wellbeing);
        vec![EngineEvent::CounsellingSession {
            month:     next,
            wellbeing: state.meters.wellbeing - before,
        }]
    }
}
