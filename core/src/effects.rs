//! Effect applier.
//!
//! RULE: A message's effects reach the meters once per final choice.
//! Every commit of a choice applies `new - previously recorded` and then
//! records `new`, so switching options nets out to the last choice alone.
//!
//! Inbox messages are single-phase (`choose_option`). Chat messages go
//! through a draft (`select_draft`, touches nothing) and a one-time
//! `send_draft` that commits exactly like an inbox choice.

use crate::{
    catalog::Choice,
    benefits,
    command::Rejection,
    engine::Rules,
    escalation,
    event::EngineEvent,
    flags::FlagPatch,
    state::{EngineState, ScheduledFollowUp},
    support,
    types::{Channel, Month},
};

type Applied = Result<Vec<EngineEvent>, Rejection>;

pub fn mark_read(state: &mut EngineState, channel: Channel, message_id: &str) -> Applied {
    let month = state.month();
    let message = state
        .message_mut(channel, message_id)
        .ok_or(Rejection::UnknownMessage)?;
    if message.read {
        return Ok(Vec::new());
    }
    message.read = true;
    Ok(vec![EngineEvent::MessageRead {
        month,
        channel,
        message_id: message_id.to_string(),
    }])
}

/// Single-phase inbox choice.
pub fn choose_option(
    state: &mut EngineState,
    rules: &Rules<'_>,
    channel: Channel,
    message_id: &str,
    option_id: &str,
) -> Applied {
    if channel != Channel::Inbox {
        return Err(Rejection::WrongChannel);
    }
    let choice = lookup_choice(state, rules, channel, message_id, option_id)?;
    let already = state
        .message(channel, message_id)
        .and_then(|m| m.chosen_option_id.as_deref())
        == Some(option_id);
    if already {
        return Ok(Vec::new());
    }
    commit_choice(state, rules, channel, message_id, choice)
}

/// Record a provisional chat choice. Meters and flags are not touched.
pub fn select_draft(
    state: &mut EngineState,
    rules: &Rules<'_>,
    channel: Channel,
    message_id: &str,
    option_id: &str,
) -> Applied {
    if channel != Channel::Chat {
        return Err(Rejection::WrongChannel);
    }
    lookup_choice(state, rules, channel, message_id, option_id)?;
    let month = state.month();
    let message = state
        .message_mut(channel, message_id)
        .ok_or(Rejection::UnknownMessage)?;
    if message.is_sent() {
        return Err(Rejection::AlreadySent);
    }
    if message.draft_option_id.as_deref() == Some(option_id) {
        return Ok(Vec::new());
    }
    message.draft_option_id = Some(option_id.to_string());
    Ok(vec![EngineEvent::DraftSelected {
        month,
        message_id: message_id.to_string(),
        option_id: option_id.to_string(),
    }])
}

/// Finalize a chat draft, once.
pub fn send_draft(
    state: &mut EngineState,
    rules: &Rules<'_>,
    channel: Channel,
    message_id: &str,
) -> Applied {
    if channel != Channel::Chat {
        return Err(Rejection::WrongChannel);
    }
    let message = state
        .message(channel, message_id)
        .ok_or(Rejection::UnknownMessage)?;
    if message.is_sent() {
        return Err(Rejection::AlreadySent);
    }
    let option_id = message.draft_option_id.clone().ok_or(Rejection::NoDraft)?;
    let choice = lookup_choice(state, rules, channel, message_id, &option_id)?;

    let mut events = vec![EngineEvent::DraftSent {
        month: state.month(),
        message_id: message_id.to_string(),
        option_id,
    }];
    events.extend(commit_choice(state, rules, channel, message_id, choice)?);
    Ok(events)
}

/// Merge a patch into the flags, then run the scam hook.
pub fn apply_patch(
    state: &mut EngineState,
    rules: &Rules<'_>,
    patch: &FlagPatch,
    month: Month,
) -> Applied {
    let changed = state.flags.merge(patch, rules.schema).map_err(|e| {
        log::warn!("month={month} flag patch rejected: {e}");
        Rejection::InvalidFlags
    })?;

    let mut events = Vec::new();
    if !changed.is_empty() {
        events.push(EngineEvent::FlagsMerged { month, keys: changed });
    }
    if escalation::scam_triggered(&state.flags, &rules.config.fraud) {
        events.push(escalation::start_chain(state, month));
    }
    Ok(events)
}

fn lookup_choice<'c>(
    state: &EngineState,
    rules: &Rules<'c>,
    channel: Channel,
    message_id: &str,
    option_id: &str,
) -> Result<&'c Choice, Rejection> {
    let message = state
        .message(channel, message_id)
        .ok_or(Rejection::UnknownMessage)?;
    let scenario = rules
        .catalog
        .get(&message.scenario_id)
        .ok_or(Rejection::UnknownMessage)?;
    scenario.choice(option_id).ok_or(Rejection::UnknownOption)
}

/// The shared commit path of inbox choices and chat sends.
///
/// Health and wellbeing are clamped after the delta lands, so switching
/// options is only exact away from the meter bounds: from 70, an option
/// worth +50 leaves 100, and switching to one worth 0 then leaves 50.
fn commit_choice(
    state: &mut EngineState,
    rules: &Rules<'_>,
    channel: Channel,
    message_id: &str,
    choice: &Choice,
) -> Applied {
    // Validate before touching anything so a bad patch rejects cleanly.
    rules.schema.validate(&choice.flags).map_err(|e| {
        log::warn!("option '{}' carries an invalid patch: {e}", choice.id);
        Rejection::InvalidFlags
    })?;

    let month = state.month();
    let meters_before = state.meters;
    let previous = state.chosen_effects.get(message_id).copied().unwrap_or_default();
    let delta = choice.effects.minus(&previous);
    state.meters.apply(&delta);

    let mut events = vec![EngineEvent::OptionChosen {
        month,
        channel,
        message_id: message_id.to_string(),
        option_id: choice.id.clone(),
        delta,
    }];
    events.extend(apply_patch(state, rules, &choice.flags, month)?);
    state.chosen_effects.insert(message_id.to_string(), choice.effects);

    events.extend(reschedule_follow_up(state, rules, message_id, choice, month));

    if let Some(award) = &choice.award {
        events.extend(benefits::grant(state, award, month, rules.config));
    }
    if let Some(action) = choice.support {
        events.extend(support::apply(state, action, meters_before, month, &rules.config.support));
    }

    if let Some(message) = state.message_mut(channel, message_id) {
        message.read = true;
        message.chosen_option_id = Some(choice.id.clone());
        message.draft_option_id = None;
    }
    log::debug!(
        "month={month} chose {message_id}/{} delta=({:.2},{},{})",
        choice.id,
        delta.money,
        delta.health,
        delta.wellbeing
    );
    Ok(events)
}

/// Withdraw the follow-up of the previous choice (if it has not been
/// seeded yet) and schedule the new one.
fn reschedule_follow_up(
    state: &mut EngineState,
    rules: &Rules<'_>,
    message_id: &str,
    choice: &Choice,
    month: Month,
) -> Vec<EngineEvent> {
    let mut events = Vec::new();

    if let Some(old) = state.follow_ups.remove(message_id) {
        if let Some(due) = state.schedule.get_mut(&old.due_month) {
            if let Some(pos) = due.iter().position(|id| *id == old.follow_up_id) {
                due.remove(pos);
                events.push(EngineEvent::FollowUpWithdrawn {
                    month,
                    follow_up_id: old.follow_up_id,
                    due_month: old.due_month,
                });
            }
            if due.is_empty() {
                state.schedule.remove(&old.due_month);
            }
        }
    }

    if let Some(next) = &choice.next {
        let due_month = month.saturating_add(next.after_months.max(1));
        if due_month > rules.config.final_month {
            log::debug!("month={month} follow-up '{}' falls past the final month", next.follow_up_id);
            return events;
        }
        state
            .schedule
            .entry(due_month)
            .or_default()
            .push(next.follow_up_id.clone());
        state.follow_ups.insert(
            message_id.to_string(),
            ScheduledFollowUp { follow_up_id: next.follow_up_id.clone(), due_month },
        );
        events.push(EngineEvent::FollowUpScheduled {
            month,
            follow_up_id: next.follow_up_id.clone(),
            due_month,
        });
    }
    events
}
