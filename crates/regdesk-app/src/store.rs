// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

use crate::{FieldPatch, Participant, ParticipantId, ReferenceEvent};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParticipantPage {
    pub participants: Vec<Participant>,
    /// Rows matching the listing across all pages.
    pub total: usize,
}

/// Read/patch primitives of the hosted registration store.
pub trait RecordStore {
    /// Participants ordered by id ascending, `page * page_size` rows skipped.
    fn list_participants(&self, page: usize, page_size: usize) -> Result<ParticipantPage>;

    /// Exact-id lookup; at most one row.
    fn find_participant(&self, id: ParticipantId) -> Result<Vec<Participant>>;

    fn list_reference_events(&self) -> Result<Vec<ReferenceEvent>>;

    /// Applies every column of `patch` to one row or none of them.
    fn update_participant(&self, id: ParticipantId, patch: &FieldPatch) -> Result<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn list_participants(&self, page: usize, page_size: usize) -> Result<ParticipantPage> {
        (**self).list_participants(page, page_size)
    }

    fn find_participant(&self, id: ParticipantId) -> Result<Vec<Participant>> {
        (**self).find_participant(id)
    }

    fn list_reference_events(&self) -> Result<Vec<ReferenceEvent>> {
        (**self).list_reference_events()
    }

    fn update_participant(&self, id: ParticipantId, patch: &FieldPatch) -> Result<()> {
        (**self).update_participant(id, patch)
    }
}
