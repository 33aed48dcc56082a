// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use regdesk_app::{
    FetchTicket, FieldPatch, Mutation, Participant, ParticipantId, ParticipantPage, RecordStore,
    ReferenceEvent,
};
use regdesk_db::Store;
use regdesk_testkit::RegistrationFaker;
use regdesk_tui::{AppRuntime, InternalEvent, fetch_participants, send_internal};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, info};

pub const DEMO_PARTICIPANTS: usize = 240;

/// Where participant records live for this session.
pub enum Backend {
    Local(Store),
    Remote(regdesk_rest::Client),
}

impl Backend {
    pub fn describe(&self) -> String {
        match self {
            Self::Local(_) => "local sqlite store".to_owned(),
            Self::Remote(client) => format!("rest store at {}", client.base_url()),
        }
    }

    pub fn check(&self) -> Result<()> {
        match self {
            Self::Local(store) => store.participant_count().map(|_| ()),
            Self::Remote(client) => client.ping(),
        }
    }
}

impl RecordStore for Backend {
    fn list_participants(&self, page: usize, page_size: usize) -> Result<ParticipantPage> {
        match self {
            Self::Local(store) => store.list_participants(page, page_size),
            Self::Remote(client) => client.list_participants(page, page_size),
        }
    }

    fn find_participant(&self, id: ParticipantId) -> Result<Vec<Participant>> {
        match self {
            Self::Local(store) => store.find_participant(id),
            Self::Remote(client) => client.find_participant(id),
        }
    }

    fn list_reference_events(&self) -> Result<Vec<ReferenceEvent>> {
        match self {
            Self::Local(store) => store.list_reference_events(),
            Self::Remote(client) => client.list_reference_events(),
        }
    }

    fn update_participant(&self, id: ParticipantId, patch: &FieldPatch) -> Result<()> {
        match self {
            Self::Local(store) => store.update_participant(id, patch),
            Self::Remote(client) => client.update_participant(id, patch),
        }
    }
}

/// Drives the dashboard against a [`Backend`]. Remote calls run on worker
/// threads so the terminal keeps redrawing; the SQLite connection stays on
/// the UI thread.
pub struct StoreRuntime {
    backend: Backend,
}

impl StoreRuntime {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    fn run<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&dyn RecordStore) -> Result<()> + Send + 'static,
    {
        match &self.backend {
            Backend::Local(store) => job(store),
            Backend::Remote(client) => {
                let client = client.clone();
                thread::Builder::new()
                    .name("regdesk-store".to_owned())
                    .spawn(move || {
                        if let Err(error) = job(&client) {
                            debug!(error = %error, "store worker result dropped");
                        }
                    })
                    .context("spawn store worker")?;
                Ok(())
            }
        }
    }
}

impl AppRuntime for StoreRuntime {
    fn load_page(&mut self, page: usize, page_size: usize) -> Result<ParticipantPage> {
        self.backend.list_participants(page, page_size)
    }

    fn lookup_participant(&mut self, id: ParticipantId) -> Result<Vec<Participant>> {
        self.backend.find_participant(id)
    }

    fn load_reference_events(&mut self) -> Result<Vec<ReferenceEvent>> {
        self.backend.list_reference_events()
    }

    fn apply_patch(&mut self, id: ParticipantId, patch: &FieldPatch) -> Result<()> {
        self.backend.update_participant(id, patch)
    }

    fn spawn_fetch(
        &mut self,
        ticket: FetchTicket,
        page_size: usize,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        debug!(seq = ticket.seq, mode = ?ticket.mode, "fetching participants");
        self.run(move |store| {
            let outcome = fetch_participants(store, ticket.mode, page_size)
                .map_err(|error| format!("{error:#}"));
            send_internal(&tx, InternalEvent::FetchCompleted { ticket, outcome })
        })
    }

    fn spawn_reference_events(&mut self, tx: Sender<InternalEvent>) -> Result<()> {
        self.run(move |store| {
            let outcome = store
                .list_reference_events()
                .map_err(|error| format!("{error:#}"));
            send_internal(&tx, InternalEvent::ReferenceEventsLoaded(outcome))
        })
    }

    fn spawn_mutation(&mut self, mutation: Mutation, tx: Sender<InternalEvent>) -> Result<()> {
        self.run(move |store| {
            let outcome = store
                .update_participant(mutation.participant_id(), &mutation.patch())
                .map_err(|error| format!("{error:#}"));
            send_internal(&tx, InternalEvent::MutationFinished { mutation, outcome })
        })
    }
}

/// Fills an empty store with a reproducible registration desk.
pub fn seed_demo_data(store: &Store, seed: u64, participants: usize) -> Result<()> {
    let mut faker = RegistrationFaker::new(seed);
    let events = faker.reference_events();
    for event in &events {
        store.insert_reference_event(event)?;
    }
    for _ in 0..participants {
        store.insert_participant(&faker.participant_with_events(&events))?;
    }
    info!(
        seed,
        participants,
        events = events.len(),
        "seeded demo registrations"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Backend, StoreRuntime, seed_demo_data};
    use anyhow::{Result, anyhow};
    use regdesk_app::{
        FetchMode, FetchTicket, Mutation, ParticipantId, PassType, PaymentChoice, RecordStore,
    };
    use regdesk_db::Store;
    use regdesk_tui::{AppRuntime, InternalEvent};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    fn demo_backend(rows: usize) -> Result<Backend> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        seed_demo_data(&store, 11, rows)?;
        Ok(Backend::Local(store))
    }

    #[test]
    fn demo_seed_fills_both_tables() -> Result<()> {
        let backend = demo_backend(30)?;
        backend.check()?;
        assert_eq!(backend.list_participants(0, 100)?.total, 30);
        assert!(!backend.list_reference_events()?.is_empty());
        assert_eq!(backend.describe(), "local sqlite store");
        Ok(())
    }

    #[test]
    fn local_fetch_reports_inline() -> Result<()> {
        let mut runtime = StoreRuntime::new(demo_backend(25)?);
        let (tx, rx) = mpsc::channel();
        let ticket = FetchTicket {
            seq: 4,
            mode: FetchMode::Page(1),
        };

        runtime.spawn_fetch(ticket, 10, tx)?;
        match rx.try_recv()? {
            InternalEvent::FetchCompleted {
                ticket: got,
                outcome,
            } => {
                assert_eq!(got, ticket);
                let page = outcome.map_err(|error| anyhow!(error))?;
                assert_eq!(page.total, 25);
                assert_eq!(page.participants.len(), 10);
                assert_eq!(page.participants[0].id, ParticipantId::new(11));
            }
            other => panic!("unexpected event {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn local_lookup_counts_only_the_match() -> Result<()> {
        let mut runtime = StoreRuntime::new(demo_backend(5)?);
        let (tx, rx) = mpsc::channel();
        runtime.spawn_fetch(
            FetchTicket {
                seq: 1,
                mode: FetchMode::Lookup(Some(ParticipantId::new(3))),
            },
            100,
            tx,
        )?;
        let InternalEvent::FetchCompleted { outcome, .. } = rx.try_recv()? else {
            panic!("expected fetch completion");
        };
        let page = outcome.map_err(|error| anyhow!(error))?;
        assert_eq!(page.total, 1);
        assert_eq!(page.participants[0].id, ParticipantId::new(3));
        Ok(())
    }

    #[test]
    fn local_mutation_applies_patch() -> Result<()> {
        let mut runtime = StoreRuntime::new(demo_backend(3)?);
        let (tx, rx) = mpsc::channel();
        let mutation = Mutation::Pass {
            id: ParticipantId::new(2),
            pass: PassType::General,
        };

        runtime.spawn_mutation(mutation.clone(), tx)?;
        assert_eq!(
            rx.try_recv()?,
            InternalEvent::MutationFinished {
                mutation,
                outcome: Ok(()),
            }
        );
        let row = runtime.lookup_participant(ParticipantId::new(2))?.remove(0);
        assert_eq!(row.pass.as_deref(), Some("General"));
        assert_eq!(row.registered.as_deref(), Some("Registered"));
        Ok(())
    }

    #[test]
    fn local_mutation_failure_is_reported_not_raised() -> Result<()> {
        let mut runtime = StoreRuntime::new(demo_backend(1)?);
        let (tx, rx) = mpsc::channel();
        let mutation = Mutation::Payment {
            id: ParticipantId::new(999),
            status: PaymentChoice::Successful,
        };

        runtime.spawn_mutation(mutation, tx)?;
        let InternalEvent::MutationFinished { outcome, .. } = rx.try_recv()? else {
            panic!("expected mutation result");
        };
        let error = outcome.expect_err("missing participant should fail");
        assert!(error.contains("participant 999 not found"));
        Ok(())
    }

    #[test]
    fn remote_reference_events_arrive_from_worker_thread() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());

        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            assert_eq!(request.url(), "/rest/v1/Events?select=*");
            let response =
                Response::from_string(r#"[{"pass":"Signature","events":"Gala Dinner","Day":"day4"}]"#)
                    .with_header(
                        Header::from_bytes("Content-Type", "application/json")
                            .expect("valid content type header"),
                    );
            request.respond(response).expect("response should succeed");
        });

        let client = regdesk_rest::Client::new(&addr, None, Duration::from_secs(2))?;
        let mut runtime = StoreRuntime::new(Backend::Remote(client));
        let (tx, rx) = mpsc::channel();
        runtime.spawn_reference_events(tx)?;

        let InternalEvent::ReferenceEventsLoaded(outcome) = rx.recv_timeout(Duration::from_secs(5))?
        else {
            panic!("expected reference events");
        };
        let events = outcome.map_err(|error| anyhow!(error))?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Gala Dinner");

        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn remote_fetch_failure_carries_connection_message() -> Result<()> {
        let client =
            regdesk_rest::Client::new("http://127.0.0.1:1", None, Duration::from_millis(200))?;
        let mut runtime = StoreRuntime::new(Backend::Remote(client));
        let (tx, rx) = mpsc::channel();
        runtime.spawn_fetch(
            FetchTicket {
                seq: 9,
                mode: FetchMode::Page(0),
            },
            100,
            tx,
        )?;

        let InternalEvent::FetchCompleted { ticket, outcome } =
            rx.recv_timeout(Duration::from_secs(5))?
        else {
            panic!("expected fetch completion");
        };
        assert_eq!(ticket.seq, 9);
        let error = outcome.expect_err("unreachable host should fail");
        assert!(error.contains("cannot reach http://127.0.0.1:1"));
        Ok(())
    }
}
