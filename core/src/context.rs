//! Context builder: what a trigger is allowed to see.

use crate::{
    flags::FlagStore,
    state::EngineState,
    types::{Lifestyle, Month},
};

/// The evaluation context handed to every trigger.
///
/// `balance_after_bills` is the current balance. Fixed-cost bills have
/// already been taken by the time messages are evaluated, so scenarios that
/// gate on "after bills" read the same number as `balance_now`.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub month: Month,
    pub lifestyle: Option<Lifestyle>,
    pub flags: &'a FlagStore,
    pub balance_now: f64,
    pub balance_after_bills: f64,
}

impl<'a> EvalContext<'a> {
    pub fn build(state: &'a EngineState, month: Month) -> Self {
        let balance_now = state.meters.money;
        Self {
            month,
            lifestyle: state.lifestyle,
            flags: &state.flags,
            balance_now,
            balance_after_bills: balance_now,
        }
    }

    pub fn lifestyle_label(&self) -> &'static str {
        self.lifestyle.map(|l| l.label()).unwrap_or("")
    }
}
