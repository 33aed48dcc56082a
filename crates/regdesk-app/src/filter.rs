// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{EventDay, PassType, Participant, ReferenceEvent};

/// Rows of the loaded page whose name, email, or id contains `term`,
/// ignoring case. Never consults the store.
pub fn filter_participants<'a>(
    participants: &'a [Participant],
    term: &str,
) -> Vec<&'a Participant> {
    let needle = term.to_lowercase();
    participants
        .iter()
        .filter(|participant| participant_matches(participant, &needle))
        .collect()
}

fn participant_matches(participant: &Participant, needle: &str) -> bool {
    participant
        .name
        .as_deref()
        .is_some_and(|name| name.to_lowercase().contains(needle))
        || participant.email.to_lowercase().contains(needle)
        || participant.id.to_string().contains(needle)
}

/// Reference events offered to a participant holding `pass`.
///
/// `day` is accepted for the slot being edited but does not narrow the
/// result: the pass alone decides which events are offered.
pub fn available_events<'a>(
    events: &'a [ReferenceEvent],
    pass: Option<&str>,
    _day: EventDay,
) -> Vec<&'a ReferenceEvent> {
    let Some(pass) = pass else {
        return Vec::new();
    };
    events.iter().filter(|event| event.pass == pass).collect()
}

/// Narrows dropdown options by the shared event-search term.
pub fn narrow_events<'a>(events: &[&'a ReferenceEvent], term: &str) -> Vec<&'a ReferenceEvent> {
    let needle = term.to_lowercase();
    events
        .iter()
        .copied()
        .filter(|event| event.name.to_lowercase().contains(&needle))
        .collect()
}

/// Event slots are inert unless the pass is General or Signature.
pub fn event_slots_editable(pass: Option<&str>) -> bool {
    pass.and_then(PassType::parse)
        .is_some_and(PassType::allows_event_choice)
}

pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}
