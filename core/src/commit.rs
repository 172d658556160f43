//! Month committer.
//!
//! ORDER (fixed):
//!   1. Guard: the commit must be for the current month, and the game
//!      must not be complete.
//!   2. Fold the pending totals into the meters.
//!   3. Month-end subsystems in registration order (escalation, benefits,
//!      counselling).
//!   4. Clamp, then record history at the next month's index.
//!   5. Advance the clock; the final month marks the game complete.
//!   6. Clear per-month pending choices.
//!   7. Seed both channels for the new month.

use crate::{
    command::Rejection,
    engine::Rules,
    event::EngineEvent,
    rng::SelectionRng,
    selector,
    state::EngineState,
    subsystem::MonthEndSubsystem,
    types::{Channel, Effects, Month},
};

pub fn commit_month(
    state: &mut EngineState,
    rules: &Rules<'_>,
    subsystems: &[Box<dyn MonthEndSubsystem>],
    chat_rng: &mut SelectionRng,
    totals: Effects,
    from_month: Month,
) -> Result<Vec<EngineEvent>, Rejection> {
    if state.clock.complete {
        return Err(Rejection::GameComplete);
    }
    let finishing = state.month();
    if from_month != finishing {
        log::warn!("month={finishing} stale commit for month {from_month}");
        return Err(Rejection::StaleCommit);
    }

    let next = state.clock.next_month();
    state.meters.apply(&totals);

    let mut events = Vec::new();
    for subsystem in subsystems {
        let produced = subsystem.on_month_end(state, finishing, next, rules.config);
        if !produced.is_empty() {
            log::debug!("month={finishing} {} emitted {} events", subsystem.name(), produced.len());
        }
        events.extend(produced);
    }

    state.meters.clamp();
    state.history.record(next, &state.meters);
    state.clock.advance();

    for key in &rules.config.monthly_choice_keys {
        state.pending_choices.remove(key);
    }

    let complete = state.clock.complete;
    log::info!(
        "month={finishing} committed -> {next} money={:.2} health={} wellbeing={} complete={complete}",
        state.meters.money,
        state.meters.health,
        state.meters.wellbeing
    );
    events.push(EngineEvent::MonthCommitted {
        from_month: finishing,
        to_month: next,
        totals,
        meters: state.meters,
        complete,
    });

    if !complete {
        events.extend(seed_current_month(state, rules, chat_rng));
    }
    Ok(events)
}

/// Seed inbox then chat for the current month. Already-seeded channels
/// contribute nothing.
pub fn seed_current_month(
    state: &mut EngineState,
    rules: &Rules<'_>,
    chat_rng: &mut SelectionRng,
) -> Vec<EngineEvent> {
    let month = state.month();
    let mut inbox_rng = SelectionRng::for_inbox(month, state.meters.money);
    let mut events = Vec::new();
    events.extend(selector::seed_month(
        state,
        rules.catalog,
        rules.config,
        month,
        Channel::Inbox,
        &mut inbox_rng,
    ));
    events.extend(selector::seed_month(
        state,
        rules.catalog,
        rules.config,
        month,
        Channel::Chat,
        chat_rng,
    ));
    events
}
