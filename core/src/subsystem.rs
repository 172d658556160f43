//! Month-end subsystem trait.
//!
//! RULE: Work that happens "because a month ended" implements
//! MonthEndSubsystem. The committer calls each registered subsystem
//! in registration order, once per accepted commit, after the pending
//! totals are applied and before meters are clamped and recorded.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    config::EngineConfig,
    event::EngineEvent,
    state::EngineState,
    types::Month,
};

pub trait MonthEndSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// - `finishing`: the month being committed
    /// - `next`:      the month the clock is about to show
    ///
    /// Returns the events describing what changed.
    fn on_month_end(
        &self,
        state: &mut EngineState,
        finishing: Month,
        next: Month,
        config: &EngineConfig,
    ) -> Vec<EngineEvent>;
}
