//! Message selector: decides which scenarios appear in a month.
//!
//! RULES:
//!   - Seeding a (channel, month) pair happens at most once. A second
//!     request for the same pair is a no-op, whatever the context says.
//!     Only the seeded set decides this: messages added to a month before
//!     it is seeded (form receipts) are kept, after the seeded ones.
//!   - Priority scenarios (the channel's must-include set plus follow-ups
//!     scheduled for the month) are never dropped by the cap.
//!   - Scheduled-only scenarios reach a month only as follow-ups.
//!   - The caller owns the random stream. Inbox callers pass
//!     `SelectionRng::for_inbox`; chat callers pass the engine's stream.

use crate::{
    catalog::{Catalog, Scenario},
    config::{ChannelPolicy, EngineConfig},
    context::EvalContext,
    event::EngineEvent,
    message::Message,
    rng::SelectionRng,
    state::EngineState,
    types::{Channel, MessageId, Month, ScenarioId},
};
use std::collections::HashSet;

/// Scenarios of `channel` eligible under `ctx`, in catalog order.
///
/// Scheduled-only scenarios are skipped outright. Cheap filters run
/// before the trigger so `chance` triggers only draw for scenarios that
/// could actually be picked.
pub fn eligible<'c>(
    catalog: &'c Catalog,
    ctx: &EvalContext<'_>,
    channel: Channel,
    rng: &mut SelectionRng,
) -> Vec<&'c Scenario> {
    catalog
        .iter()
        .filter(|s| s.channel == channel)
        .filter(|s| !s.scheduled_only)
        .filter(|s| s.applies_to.matches(ctx.lifestyle))
        .filter(|s| s.trigger.eval(ctx, rng))
        .collect()
}

/// Capped selection with a priority set.
///
/// Duplicates are dropped (first occurrence wins), the non-priority rest
/// is shuffled, and the result is every priority entry followed by as many
/// others as the cap leaves room for.
pub fn select<'c>(
    pool: Vec<&'c Scenario>,
    cap: usize,
    is_priority: impl Fn(&str) -> bool,
    rng: &mut SelectionRng,
) -> Vec<&'c Scenario> {
    let mut seen = HashSet::new();
    let mut priority = Vec::new();
    let mut others = Vec::new();
    for s in pool {
        if !seen.insert(s.id.as_str()) {
            continue;
        }
        if is_priority(&s.id) {
            priority.push(s);
        } else {
            others.push(s);
        }
    }

    rng.shuffle(&mut others);
    let room = cap.saturating_sub(priority.len());
    priority.extend(others.into_iter().take(room));
    priority
}

/// Seed one channel for one month. Returns `None` if it was already seeded.
pub fn seed_month(
    state: &mut EngineState,
    catalog: &Catalog,
    config: &EngineConfig,
    month: Month,
    channel: Channel,
    rng: &mut SelectionRng,
) -> Option<EngineEvent> {
    if state.is_seeded(channel, month) {
        return None;
    }

    let follow_ups = take_follow_ups(state, catalog, month, channel);
    let policy = config.policy(channel);

    let picked: Vec<ScenarioId> = {
        let ctx = EvalContext::build(state, month);
        let mut pool: Vec<&Scenario> = follow_ups
            .iter()
            .filter_map(|id| catalog.get(id))
            .filter(|s| s.applies_to.matches(ctx.lifestyle))
            .collect();
        pool.extend(eligible(catalog, &ctx, channel, rng));
        log::debug!(
            "month={month} channel={channel} pool={} follow_ups={}",
            pool.len(),
            follow_ups.len()
        );

        let is_priority = |id: &str| is_must_include(policy, id) || follow_ups.iter().any(|f| f == id);
        select(pool, policy.cap, is_priority, rng)
            .into_iter()
            .map(|s| s.id.clone())
            .collect()
    };

    let mut ids: Vec<ScenarioId> = Vec::new();
    if channel == Channel::Inbox {
        ids.extend(system_messages(state, catalog, month));
    }
    ids.extend(picked);

    let messages = state.messages_mut(channel);
    let present: HashSet<MessageId> = messages
        .iter()
        .filter(|m| m.month == month)
        .map(|m| m.id.clone())
        .collect();
    let fresh: Vec<Message> = ids
        .iter()
        .map(|id| Message::new(id, month, channel))
        .filter(|m| !present.contains(&m.id))
        .collect();
    let message_ids: Vec<MessageId> = fresh.iter().map(|m| m.id.clone()).collect();
    let at = messages
        .iter()
        .position(|m| m.month == month)
        .unwrap_or(messages.len());
    messages.splice(at..at, fresh);
    state.seeded.insert((channel, month));

    log::debug!("month={month} channel={channel} seeded={message_ids:?}");
    Some(EngineEvent::MessagesSeeded { month, channel, message_ids })
}

fn is_must_include(policy: &ChannelPolicy, id: &str) -> bool {
    policy.must_include.iter().any(|m| m == id)
}

/// Remove and return the follow-ups of `channel` scheduled for `month`.
fn take_follow_ups(
    state: &mut EngineState,
    catalog: &Catalog,
    month: Month,
    channel: Channel,
) -> Vec<ScenarioId> {
    let Some(due) = state.schedule.remove(&month) else {
        return Vec::new();
    };
    let (mine, rest): (Vec<ScenarioId>, Vec<ScenarioId>) = due
        .into_iter()
        .partition(|id| catalog.get(id).map(|s| s.channel) == Some(channel));
    if !rest.is_empty() {
        state.schedule.insert(month, rest);
    }
    mine
}

/// Welcome (month 0) and the coach message, chosen from the meters.
/// Templates missing from the catalog are skipped.
fn system_messages(state: &EngineState, catalog: &Catalog, month: Month) -> Vec<ScenarioId> {
    let m = &state.meters;
    let coach = if m.money < 0.0 {
        "coach-overdrawn"
    } else if m.health < 40 {
        "coach-low-health"
    } else if m.wellbeing < 40 {
        "coach-low-wellbeing"
    } else {
        "coach-balanced"
    };

    let mut ids = Vec::new();
    if month == 0 {
        ids.push("welcome");
    }
    ids.push(coach);
    ids.into_iter()
        .filter(|id| catalog.contains(id))
        .map(str::to_string)
        .collect()
}
