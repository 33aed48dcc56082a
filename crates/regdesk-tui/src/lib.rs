// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs};
use regdesk_app::{
    Dropdown, FetchMode, FetchTicket, FieldKind, FieldPatch, Mutation, Participant, ParticipantId,
    ParticipantPage, PaymentStatus, RecordStore, ReferenceEvent, Toast, ToastKind, ViewCommand,
    ViewEvent, ViewState, event_slots_editable,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, info, warn};

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(3);

const TABLE_COLUMNS: [&str; 11] = [
    "ID", "Name", "Email", "Payment", "Pass", "Concert", "Day 3 #1", "Day 3 #2", "Day 3 #3",
    "Day 3 #4", "Day 4 #1",
];
/// Table column of the first editable field.
const FIELD_COLUMN_OFFSET: usize = 3;
const UPDATING: &str = "Updating...";
const NOT_SET: &str = "Not Set";
const EVENT_CHOICE_LOCKED: &str = "event choice needs a General or Signature pass";
const ROW_BUSY: &str = "this participant is being updated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    pub toast_duration: Duration,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            toast_duration: DEFAULT_TOAST_DURATION,
        }
    }
}

/// Store access used by the dashboard. The `spawn_*` hooks report back
/// through the internal channel; the defaults run inline, real runtimes
/// move the work onto worker threads.
pub trait AppRuntime {
    fn load_page(&mut self, page: usize, page_size: usize) -> Result<ParticipantPage>;
    fn lookup_participant(&mut self, id: ParticipantId) -> Result<Vec<Participant>>;
    fn load_reference_events(&mut self) -> Result<Vec<ReferenceEvent>>;
    fn apply_patch(&mut self, id: ParticipantId, patch: &FieldPatch) -> Result<()>;

    fn spawn_fetch(
        &mut self,
        ticket: FetchTicket,
        page_size: usize,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = match ticket.mode {
            FetchMode::Page(page) => self.load_page(page, page_size),
            FetchMode::Lookup(Some(id)) => self.lookup_participant(id).map(lookup_page),
            FetchMode::Lookup(None) => Err(not_an_id()),
        };
        send_internal(
            &tx,
            InternalEvent::FetchCompleted {
                ticket,
                outcome: outcome.map_err(|error| format!("{error:#}")),
            },
        )
    }

    fn spawn_reference_events(&mut self, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self
            .load_reference_events()
            .map_err(|error| format!("{error:#}"));
        send_internal(&tx, InternalEvent::ReferenceEventsLoaded(outcome))
    }

    fn spawn_mutation(&mut self, mutation: Mutation, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self
            .apply_patch(mutation.participant_id(), &mutation.patch())
            .map_err(|error| format!("{error:#}"));
        send_internal(&tx, InternalEvent::MutationFinished { mutation, outcome })
    }
}

/// Runs one listing request against `store` in the shape the view expects.
pub fn fetch_participants<S: RecordStore + ?Sized>(
    store: &S,
    mode: FetchMode,
    page_size: usize,
) -> Result<ParticipantPage> {
    match mode {
        FetchMode::Page(page) => store.list_participants(page, page_size),
        FetchMode::Lookup(Some(id)) => store.find_participant(id).map(lookup_page),
        FetchMode::Lookup(None) => Err(not_an_id()),
    }
}

fn not_an_id() -> anyhow::Error {
    anyhow!("search text is not a participant id")
}

fn lookup_page(participants: Vec<Participant>) -> ParticipantPage {
    ParticipantPage {
        total: participants.len(),
        participants,
    }
}

pub fn send_internal(tx: &Sender<InternalEvent>, event: InternalEvent) -> Result<()> {
    tx.send(event)
        .map_err(|_| anyhow!("dashboard event channel closed"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    FetchCompleted {
        ticket: FetchTicket,
        outcome: Result<ParticipantPage, String>,
    },
    ReferenceEventsLoaded(Result<Vec<ReferenceEvent>, String>),
    MutationFinished {
        mutation: Mutation,
        outcome: Result<(), String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    selected_row: usize,
    /// Index into `FieldKind::EDITABLE`.
    selected_col: usize,
    search_focused: bool,
    dropdown_cursor: usize,
    detail_visible: bool,
    help_visible: bool,
    status_token: u64,
    toast_duration: Duration,
}

pub fn run_app<R: AppRuntime>(
    state: &mut ViewState,
    runtime: &mut R,
    options: UiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        toast_duration: options.toast_duration,
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();
    dispatch_view(
        state,
        runtime,
        &mut view_data,
        &internal_tx,
        ViewCommand::Load,
    );

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut ViewState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        let command = match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                ViewCommand::ClearStatus
            }
            InternalEvent::ClearStatus { .. } => continue,
            InternalEvent::FetchCompleted { ticket, outcome } => {
                match &outcome {
                    Ok(page) => debug!(
                        seq = ticket.seq,
                        rows = page.participants.len(),
                        total = page.total,
                        "participant fetch completed"
                    ),
                    Err(error) => warn!(seq = ticket.seq, error = %error, "participant fetch failed"),
                }
                ViewCommand::FetchCompleted {
                    ticket,
                    outcome,
                    fetched_at: OffsetDateTime::now_utc(),
                }
            }
            InternalEvent::ReferenceEventsLoaded(outcome) => {
                if let Err(error) = &outcome {
                    warn!(error = %error, "reference events failed to load");
                }
                ViewCommand::ReferenceEventsLoaded(outcome)
            }
            InternalEvent::MutationFinished { mutation, outcome } => {
                let participant = mutation.participant_id();
                let field = mutation.field().label();
                match &outcome {
                    Ok(()) => info!(%participant, field, "participant updated"),
                    Err(error) => warn!(%participant, field, error = %error, "participant update failed"),
                }
                ViewCommand::FinishMutation { mutation, outcome }
            }
        };
        dispatch_view(state, runtime, view_data, tx, command);
    }
}

fn dispatch_view<R: AppRuntime>(
    state: &mut ViewState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: ViewCommand,
) {
    for event in state.dispatch(command) {
        apply_view_event(state, runtime, view_data, tx, event);
    }
}

fn apply_view_event<R: AppRuntime>(
    state: &mut ViewState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    event: ViewEvent,
) {
    match event {
        ViewEvent::FetchRequested(ticket) => {
            if let Err(error) = runtime.spawn_fetch(ticket, state.page_size, tx.clone()) {
                warn!(seq = ticket.seq, error = %error, "could not start participant fetch");
                dispatch_view(
                    state,
                    runtime,
                    view_data,
                    tx,
                    ViewCommand::FetchCompleted {
                        ticket,
                        outcome: Err(error.to_string()),
                        fetched_at: OffsetDateTime::now_utc(),
                    },
                );
            }
        }
        ViewEvent::ReferenceEventsRequested => {
            if let Err(error) = runtime.spawn_reference_events(tx.clone()) {
                dispatch_view(
                    state,
                    runtime,
                    view_data,
                    tx,
                    ViewCommand::ReferenceEventsLoaded(Err(error.to_string())),
                );
            }
        }
        ViewEvent::MutationRequested(mutation) => {
            info!(
                participant = %mutation.participant_id(),
                field = mutation.field().label(),
                "applying update"
            );
            if let Err(error) = runtime.spawn_mutation(mutation.clone(), tx.clone()) {
                dispatch_view(
                    state,
                    runtime,
                    view_data,
                    tx,
                    ViewCommand::FinishMutation {
                        mutation,
                        outcome: Err(error.to_string()),
                    },
                );
            }
        }
        ViewEvent::RecordsReplaced { .. } => clamp_selection(state, view_data),
        ViewEvent::StaleFetchDiscarded { seq } => debug!(seq, "discarded stale participant fetch"),
        ViewEvent::DropdownChanged(_) => view_data.dropdown_cursor = 0,
        ViewEvent::StatusUpdated(_) => {
            view_data.status_token = view_data.status_token.saturating_add(1);
            schedule_status_clear(tx, view_data.status_token, view_data.toast_duration);
        }
        ViewEvent::StatusCleared => {}
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64, after: Duration) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(after);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status<R: AppRuntime>(
    state: &mut ViewState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    message: &str,
) {
    dispatch_view(
        state,
        runtime,
        view_data,
        tx,
        ViewCommand::ShowStatus(Toast::info(message)),
    );
}

fn handle_key_event<R: AppRuntime>(
    state: &mut ViewState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if key.code == KeyCode::Char('q') && ctrl {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.detail_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('i')) {
            view_data.detail_visible = false;
        }
        return false;
    }

    if view_data.search_focused {
        handle_search_key(state, runtime, view_data, tx, key);
        return false;
    }

    if let Some(dropdown) = state.dropdown {
        handle_dropdown_key(state, runtime, view_data, tx, dropdown, key);
        return false;
    }

    match key.code {
        KeyCode::Char('q') if !ctrl => return true,
        KeyCode::Char('/') => view_data.search_focused = true,
        KeyCode::Char('j') | KeyCode::Down => move_row(state, view_data, 1),
        KeyCode::Char('k') | KeyCode::Up => move_row(state, view_data, -1),
        KeyCode::Char('h') | KeyCode::Left => {
            view_data.selected_col = view_data.selected_col.saturating_sub(1);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            view_data.selected_col = (view_data.selected_col + 1).min(FieldKind::EDITABLE.len() - 1);
        }
        KeyCode::Enter => open_selected_dropdown(state, runtime, view_data, tx),
        KeyCode::Char('[') => {
            if let Some(page) = state.page.checked_sub(1) {
                select_page(state, runtime, view_data, tx, page);
            }
        }
        KeyCode::Char(']') => {
            let next = state.page + 1;
            select_page(state, runtime, view_data, tx, next);
        }
        KeyCode::Char(digit @ '1'..='9') => {
            let page = digit as usize - '1' as usize;
            select_page(state, runtime, view_data, tx, page);
        }
        KeyCode::Char('r') => dispatch_view(state, runtime, view_data, tx, ViewCommand::Refresh),
        KeyCode::Char('i') => {
            view_data.detail_visible = selected_participant(state, view_data).is_some();
        }
        KeyCode::Char('?') => view_data.help_visible = true,
        _ => {}
    }
    false
}

fn handle_search_key<R: AppRuntime>(
    state: &mut ViewState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let mut text = state.search.clone();
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            view_data.search_focused = false;
            return;
        }
        KeyCode::Backspace => {
            if text.pop().is_none() {
                return;
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => text.push(ch),
        _ => return,
    }
    view_data.selected_row = 0;
    dispatch_view(
        state,
        runtime,
        view_data,
        tx,
        ViewCommand::SearchChanged(text),
    );
}

fn handle_dropdown_key<R: AppRuntime>(
    state: &mut ViewState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    dropdown: Dropdown,
    key: KeyEvent,
) {
    let typed = matches!(dropdown.field, FieldKind::Event(_));
    let option_count = state.dropdown_options(dropdown).len();
    match key.code {
        KeyCode::Esc => dispatch_view(state, runtime, view_data, tx, ViewCommand::CloseDropdown),
        KeyCode::Up => view_data.dropdown_cursor = view_data.dropdown_cursor.saturating_sub(1),
        KeyCode::Char('k') if !typed => {
            view_data.dropdown_cursor = view_data.dropdown_cursor.saturating_sub(1);
        }
        KeyCode::Down => move_dropdown_cursor(view_data, option_count),
        KeyCode::Char('j') if !typed => move_dropdown_cursor(view_data, option_count),
        KeyCode::Enter => {
            let options = state.dropdown_options(dropdown);
            let Some(option) = options.get(view_data.dropdown_cursor).cloned() else {
                return;
            };
            if let Some(mutation) = option.into_mutation(dropdown.participant_id, dropdown.field) {
                dispatch_view(
                    state,
                    runtime,
                    view_data,
                    tx,
                    ViewCommand::BeginMutation(mutation),
                );
            }
        }
        KeyCode::Backspace if typed => {
            let mut term = state.event_search.clone();
            if term.pop().is_some() {
                view_data.dropdown_cursor = 0;
                dispatch_view(
                    state,
                    runtime,
                    view_data,
                    tx,
                    ViewCommand::EventSearchChanged(term),
                );
            }
        }
        KeyCode::Char(ch) if typed && !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let mut term = state.event_search.clone();
            term.push(ch);
            view_data.dropdown_cursor = 0;
            dispatch_view(
                state,
                runtime,
                view_data,
                tx,
                ViewCommand::EventSearchChanged(term),
            );
        }
        _ => {}
    }
}

fn move_dropdown_cursor(view_data: &mut ViewData, option_count: usize) {
    if view_data.dropdown_cursor + 1 < option_count {
        view_data.dropdown_cursor += 1;
    }
}

fn open_selected_dropdown<R: AppRuntime>(
    state: &mut ViewState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let field = selected_field(view_data);
    let Some((participant_id, enabled)) = selected_participant(state, view_data)
        .map(|participant| (participant.id, state.field_enabled(participant, field)))
    else {
        return;
    };

    if !enabled {
        let message = match field {
            FieldKind::Event(_) => EVENT_CHOICE_LOCKED,
            _ => ROW_BUSY,
        };
        emit_status(state, runtime, view_data, tx, message);
        return;
    }

    dispatch_view(
        state,
        runtime,
        view_data,
        tx,
        ViewCommand::OpenDropdown(Dropdown {
            participant_id,
            field,
        }),
    );
}

fn select_page<R: AppRuntime>(
    state: &mut ViewState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    page: usize,
) {
    if page >= state.total_pages || page == state.page {
        return;
    }
    view_data.selected_row = 0;
    dispatch_view(
        state,
        runtime,
        view_data,
        tx,
        ViewCommand::PageSelected(page),
    );
}

fn move_row(state: &ViewState, view_data: &mut ViewData, delta: isize) {
    let count = state.visible_participants().len();
    if count == 0 {
        view_data.selected_row = 0;
        return;
    }
    view_data.selected_row = view_data
        .selected_row
        .saturating_add_signed(delta)
        .min(count - 1);
}

fn clamp_selection(state: &ViewState, view_data: &mut ViewData) {
    let count = state.visible_participants().len();
    view_data.selected_row = view_data.selected_row.min(count.saturating_sub(1));
}

fn selected_participant<'a>(state: &'a ViewState, view_data: &ViewData) -> Option<&'a Participant> {
    state
        .visible_participants()
        .get(view_data.selected_row)
        .copied()
}

fn selected_field(view_data: &ViewData) -> FieldKind {
    FieldKind::EDITABLE[view_data.selected_col.min(FieldKind::EDITABLE.len() - 1)]
}

fn render(frame: &mut ratatui::Frame<'_>, state: &ViewState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(state))
        .block(Block::default().title("regdesk").borders(Borders::ALL))
        .style(Style::default().fg(Color::White));
    frame.render_widget(header, layout[0]);

    let search_style = if view_data.search_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let search = Paragraph::new(search_text(state, view_data))
        .style(search_style)
        .block(
            Block::default()
                .title("search by name, email, or id")
                .borders(Borders::ALL),
        );
    frame.render_widget(search, layout[1]);

    render_table(frame, layout[2], state, view_data);

    let pages = Tabs::new(page_labels(state.total_pages))
        .block(Block::default().title("pages").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(state.page);
    frame.render_widget(pages, layout[3]);

    let mut status_lines = Vec::with_capacity(2);
    if let Some(toast) = &state.status {
        status_lines.push(Line::from(Span::styled(
            toast.message.clone(),
            Style::default()
                .fg(toast_color(toast.kind))
                .add_modifier(Modifier::BOLD),
        )));
    }
    status_lines.push(Line::from(Span::styled(
        hint_text(state, view_data),
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(Paragraph::new(status_lines), layout[4]);

    if let Some(dropdown) = state.dropdown {
        let area = centered_rect(44, 50, frame.area());
        frame.render_widget(Clear, area);
        let picker = Paragraph::new(dropdown_overlay_text(state, view_data, dropdown)).block(
            Block::default()
                .title(format!(
                    "{} for #{}",
                    dropdown.field.label(),
                    dropdown.participant_id
                ))
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(picker, area);
    }

    if view_data.detail_visible
        && let Some(participant) = selected_participant(state, view_data)
    {
        let area = centered_rect(70, 80, frame.area());
        frame.render_widget(Clear, area);
        let detail = Paragraph::new(detail_overlay_text(participant)).block(
            Block::default()
                .title(format!("participant #{}", participant.id))
                .borders(Borders::ALL),
        );
        frame.render_widget(detail, area);
    }

    if view_data.help_visible {
        let area = centered_rect(72, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, state: &ViewState, view_data: &ViewData) {
    let visible = state.visible_participants();
    let title = if state.loading && !visible.is_empty() {
        "participants (refreshing)"
    } else {
        "participants"
    };
    let block = Block::default().title(title).borders(Borders::ALL);

    if let Some(message) = table_placeholder(state, visible.len()) {
        let placeholder = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let header = Row::new(TABLE_COLUMNS.iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = visible.iter().enumerate().map(|(row_index, participant)| {
        let selected_row = row_index == view_data.selected_row;
        let cells = (0..TABLE_COLUMNS.len())
            .map(|column| {
                let mut style = cell_style(state, participant, column);
                if selected_row {
                    style = style.bg(Color::DarkGray);
                }
                if selected_row && column == view_data.selected_col + FIELD_COLUMN_OFFSET {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(cell_text(state, participant, column)).style(style)
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let widths = [
        Constraint::Length(6),
        Constraint::Min(14),
        Constraint::Min(18),
        Constraint::Length(18),
        Constraint::Length(11),
        Constraint::Length(11),
        Constraint::Min(10),
        Constraint::Min(10),
        Constraint::Min(10),
        Constraint::Min(10),
        Constraint::Min(10),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(block);
    let mut table_state = TableState::default().with_selected(Some(view_data.selected_row));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn table_placeholder(state: &ViewState, visible: usize) -> Option<&'static str> {
    if visible > 0 {
        return None;
    }
    if state.loading {
        Some("Loading participants...")
    } else {
        Some("No participants found")
    }
}

fn header_text(state: &ViewState) -> String {
    let mut parts = vec![
        format!("{} participants", state.total),
        format!("{} events", state.reference_events.len()),
    ];
    if !state.search.trim().is_empty() {
        parts.push(format!(
            "{} of {} shown",
            state.visible_participants().len(),
            state.participants.len()
        ));
    }
    if let Some(at) = state.last_refreshed {
        let clock = at
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default();
        parts.push(format!("refreshed {clock} UTC"));
    }
    parts.join(" | ")
}

fn search_text(state: &ViewState, view_data: &ViewData) -> String {
    if view_data.search_focused {
        format!("{}▏", state.search)
    } else if state.search.is_empty() {
        "press / to search".to_owned()
    } else {
        state.search.clone()
    }
}

fn page_labels(total_pages: usize) -> Vec<String> {
    (1..=total_pages).map(|page| page.to_string()).collect()
}

fn cell_text(state: &ViewState, participant: &Participant, column: usize) -> String {
    match column {
        0 => participant.id.to_string(),
        1 => participant.name.clone().unwrap_or_default(),
        2 => participant.email.clone(),
        _ => column_field(column)
            .map(|field| field_text(state, participant, field))
            .unwrap_or_default(),
    }
}

fn field_text(state: &ViewState, participant: &Participant, field: FieldKind) -> String {
    if state.is_updating(participant.id) && !matches!(field, FieldKind::Event(_)) {
        return UPDATING.to_owned();
    }
    match field {
        FieldKind::Payment => participant.payment_status().label().to_owned(),
        _ => participant.field_value(field).unwrap_or(NOT_SET).to_owned(),
    }
}

fn column_field(column: usize) -> Option<FieldKind> {
    column
        .checked_sub(FIELD_COLUMN_OFFSET)
        .and_then(|index| FieldKind::EDITABLE.get(index).copied())
}

fn cell_style(state: &ViewState, participant: &Participant, column: usize) -> Style {
    match column_field(column) {
        Some(FieldKind::Payment) if !state.is_updating(participant.id) => {
            Style::default().fg(payment_color(participant.payment_status()))
        }
        Some(FieldKind::Event(_)) if !event_slots_editable(participant.pass.as_deref()) => {
            Style::default().fg(Color::DarkGray)
        }
        _ => Style::default(),
    }
}

fn payment_color(status: PaymentStatus<'_>) -> Color {
    match status {
        PaymentStatus::Successful => Color::Green,
        PaymentStatus::Cancelled => Color::Red,
        PaymentStatus::Unset | PaymentStatus::Legacy(_) => Color::Gray,
    }
}

fn toast_color(kind: ToastKind) -> Color {
    match kind {
        ToastKind::Success => Color::Green,
        ToastKind::Error => Color::Red,
        ToastKind::Info => Color::Yellow,
    }
}

fn dropdown_overlay_text(state: &ViewState, view_data: &ViewData, dropdown: Dropdown) -> String {
    let mut lines = Vec::new();
    if matches!(dropdown.field, FieldKind::Event(_)) {
        lines.push(format!("filter: {}▏", state.event_search));
        lines.push(String::new());
    }

    let options = state.dropdown_options(dropdown);
    if options.is_empty() {
        lines.push("No events available".to_owned());
    }
    for (index, option) in options.iter().enumerate() {
        let marker = if index == view_data.dropdown_cursor {
            ">"
        } else {
            " "
        };
        lines.push(format!("{marker} {}", option.label()));
    }

    if state.is_updating(dropdown.participant_id) {
        lines.push(String::new());
        lines.push(UPDATING.to_owned());
    }
    lines.join("\n")
}

fn detail_overlay_text(participant: &Participant) -> String {
    participant
        .detail_rows()
        .into_iter()
        .map(|(label, value)| format!("{label:<20} {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hint_text(state: &ViewState, view_data: &ViewData) -> String {
    if view_data.search_focused {
        return "SEARCH | digits look up an id, text filters this page | enter/esc done".to_owned();
    }
    if let Some(dropdown) = state.dropdown {
        return match dropdown.field {
            FieldKind::Event(_) => {
                "PICK | type to filter events | up/down choose | enter apply | esc close".to_owned()
            }
            _ => "PICK | j/k choose | enter apply | esc close".to_owned(),
        };
    }
    "NAV | j/k/h/l move | enter edit | [/] 1-9 pages | / search | r refresh | i detail | ? help | q quit"
        .to_owned()
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit\n\
nav: j/k rows | h/l editable columns | enter open choices | q quit\n\
nav: [/] previous/next page | 1-9 jump to page | r refresh | i participant detail\n\
search: / focus | digits look up one id | other text filters the loaded page | esc/enter done\n\
choices: j/k or up/down | enter apply | esc close\n\
event choices: type to filter (the filter is shared by every event list) | backspace erase\n\
overlays: esc close"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, ViewData, cell_text, dropdown_overlay_text, handle_key_event,
        header_text, process_internal_events, render,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use regdesk_app::{
        Dropdown, EventSlot, FetchMode, FieldKind, FieldPatch, Participant, ParticipantId,
        ParticipantPage, ReferenceEvent, ToastKind, ViewState,
    };
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Default)]
    struct TestRuntime {
        participants: Vec<Participant>,
        events: Vec<ReferenceEvent>,
        fetches: Vec<FetchMode>,
        patches: Vec<(ParticipantId, FieldPatch)>,
        fail_fetch: bool,
        fail_patch: bool,
    }

    impl TestRuntime {
        fn with_rows(count: i64) -> Self {
            let participants = (1..=count)
                .map(|id| {
                    let pass = match id % 3 {
                        0 => "Hackathon",
                        1 => "General",
                        _ => "Signature",
                    };
                    Participant {
                        id: ParticipantId::new(id),
                        name: Some(format!("Person {id}")),
                        email: format!("person{id}@fest.example"),
                        pass: Some(pass.to_owned()),
                        ..Participant::default()
                    }
                })
                .collect();
            let events = vec![
                event("General", "Quiz Bowl"),
                event("General", "Robo Race"),
                event("Signature", "Gala Dinner"),
            ];
            Self {
                participants,
                events,
                ..Self::default()
            }
        }
    }

    fn event(pass: &str, name: &str) -> ReferenceEvent {
        ReferenceEvent {
            pass: pass.to_owned(),
            name: name.to_owned(),
            day: "day3".to_owned(),
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_page(&mut self, page: usize, page_size: usize) -> anyhow::Result<ParticipantPage> {
            self.fetches.push(FetchMode::Page(page));
            if self.fail_fetch {
                return Err(anyhow::anyhow!("connection refused"));
            }
            Ok(ParticipantPage {
                participants: self
                    .participants
                    .iter()
                    .skip(page * page_size)
                    .take(page_size)
                    .cloned()
                    .collect(),
                total: self.participants.len(),
            })
        }

        fn lookup_participant(&mut self, id: ParticipantId) -> anyhow::Result<Vec<Participant>> {
            self.fetches.push(FetchMode::Lookup(Some(id)));
            Ok(self
                .participants
                .iter()
                .filter(|participant| participant.id == id)
                .cloned()
                .collect())
        }

        fn load_reference_events(&mut self) -> anyhow::Result<Vec<ReferenceEvent>> {
            Ok(self.events.clone())
        }

        fn apply_patch(&mut self, id: ParticipantId, patch: &FieldPatch) -> anyhow::Result<()> {
            self.patches.push((id, patch.clone()));
            if self.fail_patch {
                return Err(anyhow::anyhow!("timeout"));
            }
            let Some(row) = self.participants.iter_mut().find(|row| row.id == id) else {
                return Err(anyhow::anyhow!("participant {id} not found"));
            };
            for (column, value) in patch.iter() {
                let value = Some(value.to_owned());
                match column {
                    "Payment" => row.payment = value,
                    "Pass" => row.pass = value,
                    "EW" => row.registered = value,
                    "Concert_Payment" => row.concert_payment = value,
                    "Event_1_Day3" => row.event_1_day3 = value,
                    "Event_2_Day3" => row.event_2_day3 = value,
                    "Event_3_Day3" => row.event_3_day3 = value,
                    "Event_4_Day3" => row.event_4_day3 = value,
                    "Event_1_Day4" => row.event_1_day4 = value,
                    other => return Err(anyhow::anyhow!("unexpected column {other}")),
                }
            }
            Ok(())
        }
    }

    struct Harness {
        state: ViewState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<InternalEvent>,
        rx: mpsc::Receiver<InternalEvent>,
    }

    impl Harness {
        fn loaded(runtime: TestRuntime, page_size: usize) -> Self {
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                state: ViewState::new(page_size),
                runtime,
                view_data: ViewData {
                    toast_duration: Duration::from_secs(60),
                    ..ViewData::default()
                },
                tx,
                rx,
            };
            super::dispatch_view(
                &mut harness.state,
                &mut harness.runtime,
                &mut harness.view_data,
                &harness.tx,
                regdesk_app::ViewCommand::Load,
            );
            harness.pump();
            harness
        }

        fn pump(&mut self) {
            process_internal_events(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                &self.rx,
            );
        }

        fn press(&mut self, code: KeyCode) -> bool {
            let quit = handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                KeyEvent::new(code, KeyModifiers::NONE),
            );
            self.pump();
            quit
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(KeyCode::Char(ch));
            }
        }

        fn toast(&self) -> Option<(ToastKind, &str)> {
            self.state
                .status
                .as_ref()
                .map(|toast| (toast.kind, toast.message.as_str()))
        }
    }

    #[test]
    fn load_fills_rows_and_reference_events() {
        let harness = Harness::loaded(TestRuntime::with_rows(5), 100);
        assert_eq!(harness.state.participants.len(), 5);
        assert_eq!(harness.state.reference_events.len(), 3);
        assert_eq!(harness.state.total_pages, 1);
        assert!(!harness.state.loading);
        assert!(header_text(&harness.state).starts_with("5 participants | 3 events"));
    }

    #[test]
    fn q_and_ctrl_q_quit() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(1), 100);
        assert!(harness.press(KeyCode::Char('q')));
        assert!(handle_key_event(
            &mut harness.state,
            &mut harness.runtime,
            &mut harness.view_data,
            &harness.tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        ));
    }

    #[test]
    fn numeric_search_looks_up_single_participant() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(30), 10);
        harness.press(KeyCode::Char('/'));
        harness.type_text("17");
        harness.press(KeyCode::Enter);

        assert!(!harness.view_data.search_focused);
        assert_eq!(
            harness.runtime.fetches.last(),
            Some(&FetchMode::Lookup(Some(ParticipantId::new(17))))
        );
        let visible = harness.state.visible_participants();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, ParticipantId::new(17));
        assert_eq!(harness.state.total_pages, 1);
    }

    #[test]
    fn text_search_issues_failing_lookup_then_filters_loaded_page() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(12), 100);
        harness.press(KeyCode::Char('/'));
        harness.type_text("person1");

        assert_eq!(harness.state.mode, FetchMode::Lookup(None));
        assert_eq!(
            harness.toast(),
            Some((ToastKind::Error, "Failed to load participants"))
        );
        assert!(!harness.state.loading);
        assert_eq!(harness.state.participants.len(), 12);
        // person1, person10, person11, person12
        assert_eq!(harness.state.visible_participants().len(), 4);
        assert!(header_text(&harness.state).contains("4 of 12 shown"));
    }

    #[test]
    fn backspacing_search_to_empty_relists_first_page() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(30), 10);
        harness.press(KeyCode::Char(']'));
        assert_eq!(harness.state.page, 1);

        harness.press(KeyCode::Char('/'));
        harness.type_text("x");
        harness.press(KeyCode::Backspace);
        assert_eq!(harness.state.page, 0);
        assert_eq!(harness.runtime.fetches.last(), Some(&FetchMode::Page(0)));
    }

    #[test]
    fn page_keys_stay_within_range() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(25), 10);
        assert_eq!(harness.state.total_pages, 3);

        harness.press(KeyCode::Char('3'));
        assert_eq!(harness.state.page, 2);
        assert_eq!(harness.state.participants.len(), 5);

        let fetches = harness.runtime.fetches.len();
        harness.press(KeyCode::Char(']'));
        harness.press(KeyCode::Char('9'));
        assert_eq!(harness.runtime.fetches.len(), fetches);

        harness.press(KeyCode::Char('['));
        assert_eq!(harness.state.page, 1);
    }

    #[test]
    fn payment_choice_updates_row_and_reports_success() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(3), 100);
        harness.press(KeyCode::Enter);
        assert_eq!(
            harness.state.dropdown,
            Some(Dropdown {
                participant_id: ParticipantId::new(1),
                field: FieldKind::Payment,
            })
        );

        harness.press(KeyCode::Char('j'));
        harness.press(KeyCode::Enter);

        assert_eq!(harness.state.dropdown, None);
        assert_eq!(harness.state.updating, None);
        assert_eq!(
            harness.toast(),
            Some((ToastKind::Success, "Payment status updated successfully"))
        );
        assert_eq!(
            harness.state.participants[0].payment.as_deref(),
            Some("payment cancelled")
        );
        let row = harness.state.participants[0].clone();
        assert_eq!(cell_text(&harness.state, &row, 3), "payment cancelled");
    }

    #[test]
    fn failed_update_reports_error_and_keeps_row() {
        let mut runtime = TestRuntime::with_rows(2);
        runtime.fail_patch = true;
        let mut harness = Harness::loaded(runtime, 100);
        let before = harness.state.participants.clone();

        harness.press(KeyCode::Char('l'));
        harness.press(KeyCode::Enter);
        harness.press(KeyCode::Enter);

        assert_eq!(harness.toast(), Some((ToastKind::Error, "Failed to update pass")));
        assert_eq!(harness.state.participants, before);
        assert_eq!(harness.runtime.patches.len(), 1);
    }

    #[test]
    fn event_column_is_locked_for_hackathon_pass() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(3), 100);
        harness.press(KeyCode::Char('j'));
        harness.press(KeyCode::Char('j'));
        for _ in 0..3 {
            harness.press(KeyCode::Char('l'));
        }
        harness.press(KeyCode::Enter);

        assert_eq!(harness.state.dropdown, None);
        assert_eq!(
            harness.toast(),
            Some((
                ToastKind::Info,
                "event choice needs a General or Signature pass"
            ))
        );
    }

    #[test]
    fn typing_in_event_dropdown_narrows_choices() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(1), 100);
        for _ in 0..4 {
            harness.press(KeyCode::Char('l'));
        }
        harness.press(KeyCode::Enter);
        let dropdown = Dropdown {
            participant_id: ParticipantId::new(1),
            field: FieldKind::Event(EventSlot::Day3Second),
        };
        assert_eq!(harness.state.dropdown, Some(dropdown));

        harness.type_text("robo");
        let text = dropdown_overlay_text(&harness.state, &harness.view_data, dropdown);
        assert!(text.contains("filter: robo"));
        assert!(text.contains("> Robo Race"));
        assert!(!text.contains("Quiz Bowl"));

        harness.press(KeyCode::Enter);
        assert_eq!(
            harness.state.participants[0].event_2_day3.as_deref(),
            Some("Robo Race")
        );
        assert_eq!(harness.state.event_search, "robo");
    }

    #[test]
    fn empty_event_choices_say_so() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(1), 100);
        for _ in 0..3 {
            harness.press(KeyCode::Char('l'));
        }
        harness.press(KeyCode::Enter);
        harness.type_text("zzz");
        let dropdown = harness.state.dropdown.expect("dropdown should be open");
        let text = dropdown_overlay_text(&harness.state, &harness.view_data, dropdown);
        assert!(text.contains("No events available"));

        harness.press(KeyCode::Esc);
        assert_eq!(harness.state.dropdown, None);
    }

    #[test]
    fn failed_fetch_surfaces_toast() {
        let mut runtime = TestRuntime::with_rows(3);
        runtime.fail_fetch = true;
        let harness = Harness::loaded(runtime, 100);
        assert_eq!(
            harness.toast(),
            Some((ToastKind::Error, "Failed to load participants"))
        );
        assert!(!harness.state.loading);
    }

    #[test]
    fn stale_status_token_does_not_clear_newer_toast() {
        let mut runtime = TestRuntime::with_rows(3);
        runtime.fail_fetch = true;
        let mut harness = Harness::loaded(runtime, 100);
        let current = harness.view_data.status_token;

        harness
            .tx
            .send(InternalEvent::ClearStatus {
                token: current.saturating_sub(1),
            })
            .expect("send stale token");
        harness.pump();
        assert!(harness.state.status.is_some());

        harness
            .tx
            .send(InternalEvent::ClearStatus { token: current })
            .expect("send current token");
        harness.pump();
        assert!(harness.state.status.is_none());
    }

    #[test]
    fn updating_row_shows_placeholder_cells() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(1), 100);
        harness.state.updating = Some(ParticipantId::new(1));
        let row = harness.state.participants[0].clone();
        assert_eq!(cell_text(&harness.state, &row, 3), "Updating...");
        assert_eq!(cell_text(&harness.state, &row, 5), "Updating...");
        assert_eq!(cell_text(&harness.state, &row, 6), "Not Set");

        harness.state.updating = None;
        assert_eq!(cell_text(&harness.state, &row, 3), "null");
        assert_eq!(cell_text(&harness.state, &row, 5), "Not Set");
        assert_eq!(cell_text(&harness.state, &row, 0), "1");
    }

    #[test]
    fn detail_overlay_opens_and_closes() {
        let mut harness = Harness::loaded(TestRuntime::with_rows(1), 100);
        harness.press(KeyCode::Char('i'));
        assert!(harness.view_data.detail_visible);
        harness.press(KeyCode::Char('j'));
        assert_eq!(harness.view_data.selected_row, 0);
        harness.press(KeyCode::Esc);
        assert!(!harness.view_data.detail_visible);
    }

    #[test]
    fn render_shows_placeholder_while_loading() {
        let mut state = ViewState::default();
        state.loading = true;
        let view_data = ViewData::default();
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).expect("test terminal");
        terminal
            .draw(|frame| render(frame, &state, &view_data))
            .expect("draw");
        let screen: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("Loading participants..."));
    }
}
