// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::OffsetDateTime;

use crate::{
    FieldKind, Mutation, Participant, ParticipantId, ParticipantPage, PassType, PaymentChoice,
    ReferenceEvent, available_events, event_slots_editable, filter_participants, narrow_events,
    total_pages,
};

pub const DEFAULT_PAGE_SIZE: usize = 100;

pub const LOAD_PARTICIPANTS_FAILED: &str = "Failed to load participants";
pub const LOAD_EVENTS_FAILED: &str = "Failed to load events";
pub const UPDATE_IN_PROGRESS: &str = "another update is in progress";

/// How the visible record set was obtained; refreshes reuse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Page(usize),
    /// Exact-id lookup. `None` when the search text is not an id; the
    /// lookup then fails and the loaded rows stay.
    Lookup(Option<ParticipantId>),
}

/// A listing request. Only the newest ticket's outcome is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub mode: FetchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dropdown {
    pub participant_id: ParticipantId,
    pub field: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropdownOption {
    Payment(PaymentChoice),
    Pass(PassType),
    ConcertPaid,
    Event(String),
}

impl DropdownOption {
    pub fn label(&self) -> &str {
        match self {
            Self::Payment(choice) => choice.label(),
            Self::Pass(pass) => pass.label(),
            Self::ConcertPaid => "Mark Successful",
            Self::Event(name) => name,
        }
    }

    /// `None` when the option does not belong to `field`.
    pub fn into_mutation(self, id: ParticipantId, field: FieldKind) -> Option<Mutation> {
        match (self, field) {
            (Self::Payment(status), FieldKind::Payment) => Some(Mutation::Payment { id, status }),
            (Self::Pass(pass), FieldKind::Pass) => Some(Mutation::Pass { id, pass }),
            (Self::ConcertPaid, FieldKind::Concert) => Some(Mutation::ConcertPayment { id }),
            (Self::Event(event), FieldKind::Event(slot)) => {
                Some(Mutation::EventSlot { id, slot, event })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Info,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub participants: Vec<Participant>,
    pub reference_events: Vec<ReferenceEvent>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub search: String,
    pub event_search: String,
    pub loading: bool,
    pub updating: Option<ParticipantId>,
    pub dropdown: Option<Dropdown>,
    pub mode: FetchMode,
    pub status: Option<Toast>,
    pub last_refreshed: Option<OffsetDateTime>,
    next_seq: u64,
    in_flight: Option<u64>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Load,
    Refresh,
    SearchChanged(String),
    PageSelected(usize),
    OpenDropdown(Dropdown),
    CloseDropdown,
    EventSearchChanged(String),
    BeginMutation(Mutation),
    FinishMutation {
        mutation: Mutation,
        outcome: Result<(), String>,
    },
    FetchCompleted {
        ticket: FetchTicket,
        outcome: Result<ParticipantPage, String>,
        fetched_at: OffsetDateTime,
    },
    ReferenceEventsLoaded(Result<Vec<ReferenceEvent>, String>),
    ShowStatus(Toast),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    FetchRequested(FetchTicket),
    ReferenceEventsRequested,
    MutationRequested(Mutation),
    RecordsReplaced { count: usize },
    StaleFetchDiscarded { seq: u64 },
    DropdownChanged(Option<Dropdown>),
    StatusUpdated(Toast),
    StatusCleared,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            participants: Vec::new(),
            reference_events: Vec::new(),
            page: 0,
            page_size: page_size.max(1),
            total: 0,
            total_pages: 0,
            search: String::new(),
            event_search: String::new(),
            loading: false,
            updating: None,
            dropdown: None,
            mode: FetchMode::Page(0),
            status: None,
            last_refreshed: None,
            next_seq: 0,
            in_flight: None,
        }
    }

    pub fn dispatch(&mut self, command: ViewCommand) -> Vec<ViewEvent> {
        match command {
            ViewCommand::Load => vec![
                self.issue_fetch(FetchMode::Page(self.page)),
                ViewEvent::ReferenceEventsRequested,
            ],
            ViewCommand::Refresh => vec![self.issue_fetch(self.mode)],
            ViewCommand::SearchChanged(text) => self.change_search(text),
            ViewCommand::PageSelected(page) => {
                self.page = page;
                vec![self.issue_fetch(FetchMode::Page(page))]
            }
            ViewCommand::OpenDropdown(dropdown) => self.open_dropdown(dropdown),
            ViewCommand::CloseDropdown => self.close_dropdown().into_iter().collect(),
            ViewCommand::EventSearchChanged(text) => {
                self.event_search = text;
                Vec::new()
            }
            ViewCommand::BeginMutation(mutation) => self.begin_mutation(mutation),
            ViewCommand::FinishMutation { mutation, outcome } => {
                self.finish_mutation(&mutation, outcome)
            }
            ViewCommand::FetchCompleted {
                ticket,
                outcome,
                fetched_at,
            } => self.complete_fetch(ticket, outcome, fetched_at),
            ViewCommand::ReferenceEventsLoaded(Ok(events)) => {
                self.reference_events = events;
                Vec::new()
            }
            ViewCommand::ReferenceEventsLoaded(Err(_)) => {
                vec![self.set_status(Toast::error(LOAD_EVENTS_FAILED))]
            }
            ViewCommand::ShowStatus(toast) => vec![self.set_status(toast)],
            ViewCommand::ClearStatus => {
                self.status = None;
                vec![ViewEvent::StatusCleared]
            }
        }
    }

    /// Loaded rows after the client-side search filter.
    pub fn visible_participants(&self) -> Vec<&Participant> {
        filter_participants(&self.participants, &self.search)
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|participant| participant.id == id)
    }

    pub fn is_updating(&self, id: ParticipantId) -> bool {
        self.updating == Some(id)
    }

    pub fn is_open(&self, id: ParticipantId, field: FieldKind) -> bool {
        self.dropdown == Some(Dropdown {
            participant_id: id,
            field,
        })
    }

    /// Choices shown inside `dropdown`, event choices narrowed by the shared
    /// event-search term.
    pub fn dropdown_options(&self, dropdown: Dropdown) -> Vec<DropdownOption> {
        match dropdown.field {
            FieldKind::Payment => PaymentChoice::ALL
                .into_iter()
                .map(DropdownOption::Payment)
                .collect(),
            FieldKind::Pass => PassType::ALL.into_iter().map(DropdownOption::Pass).collect(),
            FieldKind::Concert => vec![DropdownOption::ConcertPaid],
            FieldKind::Event(slot) => {
                let Some(participant) = self.participant(dropdown.participant_id) else {
                    return Vec::new();
                };
                let offered = available_events(
                    &self.reference_events,
                    participant.pass.as_deref(),
                    slot.day(),
                );
                narrow_events(&offered, &self.event_search)
                    .into_iter()
                    .map(|event| DropdownOption::Event(event.name.clone()))
                    .collect()
            }
        }
    }

    /// Whether the cell's control responds to selection at all.
    pub fn field_enabled(&self, participant: &Participant, field: FieldKind) -> bool {
        match field {
            FieldKind::Payment | FieldKind::Pass | FieldKind::Concert => {
                !self.is_updating(participant.id)
            }
            FieldKind::Event(_) => event_slots_editable(participant.pass.as_deref()),
        }
    }

    fn change_search(&mut self, text: String) -> Vec<ViewEvent> {
        let lookup = ParticipantId::parse(&text);
        let cleared = text.is_empty();
        self.search = text;

        if cleared {
            self.page = 0;
            return vec![self.issue_fetch(FetchMode::Page(0))];
        }
        vec![self.issue_fetch(FetchMode::Lookup(lookup))]
    }

    fn open_dropdown(&mut self, dropdown: Dropdown) -> Vec<ViewEvent> {
        let Some(participant) = self.participant(dropdown.participant_id) else {
            return Vec::new();
        };
        if !self.field_enabled(participant, dropdown.field) {
            return Vec::new();
        }
        self.dropdown = Some(dropdown);
        vec![ViewEvent::DropdownChanged(self.dropdown)]
    }

    fn close_dropdown(&mut self) -> Option<ViewEvent> {
        self.dropdown.take()?;
        Some(ViewEvent::DropdownChanged(None))
    }

    fn begin_mutation(&mut self, mutation: Mutation) -> Vec<ViewEvent> {
        if self.updating.is_some() {
            return vec![self.set_status(Toast::info(UPDATE_IN_PROGRESS))];
        }
        self.updating = Some(mutation.participant_id());
        vec![ViewEvent::MutationRequested(mutation)]
    }

    fn finish_mutation(
        &mut self,
        mutation: &Mutation,
        outcome: Result<(), String>,
    ) -> Vec<ViewEvent> {
        self.updating = None;
        let mut events: Vec<ViewEvent> = self.close_dropdown().into_iter().collect();
        match outcome {
            Ok(()) => {
                events.push(self.set_status(Toast::success(mutation.success_message())));
                events.push(self.issue_fetch(self.mode));
            }
            Err(_) => {
                events.push(self.set_status(Toast::error(mutation.failure_message())));
            }
        }
        events
    }

    fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        outcome: Result<ParticipantPage, String>,
        fetched_at: OffsetDateTime,
    ) -> Vec<ViewEvent> {
        if self.in_flight != Some(ticket.seq) {
            return vec![ViewEvent::StaleFetchDiscarded { seq: ticket.seq }];
        }
        self.in_flight = None;
        self.loading = false;

        let page = match outcome {
            Ok(page) => page,
            Err(_) => return vec![self.set_status(Toast::error(LOAD_PARTICIPANTS_FAILED))],
        };

        self.participants = page.participants;
        self.total = match ticket.mode {
            FetchMode::Page(_) => page.total,
            FetchMode::Lookup(_) => {
                self.page = 0;
                self.participants.len()
            }
        };
        self.total_pages = total_pages(self.total, self.page_size);
        self.last_refreshed = Some(fetched_at);
        vec![ViewEvent::RecordsReplaced {
            count: self.participants.len(),
        }]
    }

    fn issue_fetch(&mut self, mode: FetchMode) -> ViewEvent {
        self.next_seq = self.next_seq.saturating_add(1);
        self.in_flight = Some(self.next_seq);
        self.loading = true;
        self.mode = mode;
        ViewEvent::FetchRequested(FetchTicket {
            seq: self.next_seq,
            mode,
        })
    }

    fn set_status(&mut self, toast: Toast) -> ViewEvent {
        self.status = Some(toast.clone());
        ViewEvent::StatusUpdated(toast)
    }
}
