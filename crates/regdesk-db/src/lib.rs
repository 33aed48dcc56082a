// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use regdesk_app::{
    FieldPatch, Participant, ParticipantId, ParticipantPage, RecordStore, ReferenceEvent,
};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params, params_from_iter};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const APP_NAME: &str = "regdesk";
pub const PARTICIPANTS_TABLE: &str = "Participants";
pub const EVENTS_TABLE: &str = "Events";

/// Every participant column in select order; `id` first.
const PARTICIPANT_COLUMNS: [&str; 33] = [
    "id",
    "ID_no",
    "Name",
    "Email",
    "DOB",
    "Degree",
    "Course",
    "Year",
    "Phone",
    "Gender",
    "College",
    "Event_1",
    "Event_2",
    "WorkShop",
    "Payment",
    "EW",
    "Pass",
    "Concert",
    "Accommodation",
    "AccommodationDays",
    "AccommodationCost",
    "Reference",
    "Transaction_ID",
    "Date",
    "Time",
    "Team_Members",
    "Concert_transaction",
    "Concert_Payment",
    "Event_1_Day3",
    "Event_2_Day3",
    "Event_3_Day3",
    "Event_4_Day3",
    "Event_1_Day4",
];

const EVENT_COLUMNS: [&str; 3] = ["pass", "events", "Day"];

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (PARTICIPANTS_TABLE, &PARTICIPANT_COLUMNS),
    (EVENTS_TABLE, &EVENT_COLUMNS),
];

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the schema in an empty database, otherwise checks that the
    /// existing tables carry every column the desk reads or writes.
    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)
        } else {
            info!("creating registration schema");
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")
        }
    }

    pub fn participant_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_ident(PARTICIPANTS_TABLE)),
                [],
                |row| row.get(0),
            )
            .context("count participants")?;
        usize::try_from(count).context("participant count out of range")
    }

    /// Stores `participant` under a fresh id; the incoming id is ignored.
    pub fn insert_participant(&self, participant: &Participant) -> Result<ParticipantId> {
        let columns = &PARTICIPANT_COLUMNS[1..];
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_ident(PARTICIPANTS_TABLE),
            quoted_list(columns),
        );
        self.conn
            .execute(&sql, params_from_iter(participant_values(participant)))
            .with_context(|| format!("insert participant {}", participant.email))?;
        Ok(ParticipantId::new(self.conn.last_insert_rowid()))
    }

    pub fn insert_reference_event(&self, event: &ReferenceEvent) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} ({}) VALUES (?, ?, ?)",
                    quote_ident(EVENTS_TABLE),
                    quoted_list(&EVENT_COLUMNS),
                ),
                params![event.pass, event.name, event.day],
            )
            .with_context(|| format!("insert reference event {}", event.name))?;
        Ok(())
    }

    fn select_participants(&self, clause: &str, values: &[i64]) -> Result<Vec<Participant>> {
        let sql = format!(
            "SELECT {} FROM {} {clause}",
            quoted_list(&PARTICIPANT_COLUMNS),
            quote_ident(PARTICIPANTS_TABLE),
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare participants query")?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), participant_from_row)
            .context("query participants")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect participants")
    }
}

impl RecordStore for Store {
    fn list_participants(&self, page: usize, page_size: usize) -> Result<ParticipantPage> {
        let limit = i64::try_from(page_size).context("page size out of range")?;
        let offset = page
            .checked_mul(page_size)
            .and_then(|offset| i64::try_from(offset).ok())
            .ok_or_else(|| anyhow!("page {page} out of range"))?;
        let participants =
            self.select_participants("ORDER BY \"id\" ASC LIMIT ? OFFSET ?", &[limit, offset])?;
        Ok(ParticipantPage {
            participants,
            total: self.participant_count()?,
        })
    }

    fn find_participant(&self, id: ParticipantId) -> Result<Vec<Participant>> {
        self.select_participants("WHERE \"id\" = ?", &[id.get()])
    }

    fn list_reference_events(&self) -> Result<Vec<ReferenceEvent>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM {} ORDER BY rowid ASC",
                quoted_list(&EVENT_COLUMNS),
                quote_ident(EVENTS_TABLE),
            ))
            .context("prepare reference events query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ReferenceEvent {
                    pass: row.get(0)?,
                    name: row.get(1)?,
                    day: row.get(2)?,
                })
            })
            .context("query reference events")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect reference events")
    }

    fn update_participant(&self, id: ParticipantId, patch: &FieldPatch) -> Result<()> {
        if patch.is_empty() {
            bail!("empty update for participant {id}");
        }
        let known: BTreeSet<&str> = PARTICIPANT_COLUMNS[1..].iter().copied().collect();
        let mut assignments = Vec::with_capacity(patch.len());
        let mut values = Vec::with_capacity(patch.len() + 1);
        for (column, value) in patch.iter() {
            if !known.contains(column) {
                bail!("unknown participant column `{column}`");
            }
            assignments.push(format!("{} = ?", quote_ident(column)));
            values.push(Value::Text(value.to_owned()));
        }
        values.push(Value::Integer(id.get()));

        debug!(%id, columns = ?patch.columns().collect::<Vec<_>>(), "updating participant");
        let sql = format!(
            "UPDATE {} SET {} WHERE \"id\" = ?",
            quote_ident(PARTICIPANTS_TABLE),
            assignments.join(", "),
        );
        let rows_affected = self
            .conn
            .execute(&sql, params_from_iter(values))
            .with_context(|| format!("update participant {id}"))?;
        if rows_affected == 0 {
            bail!("participant {id} not found -- refresh the list and retry");
        }
        Ok(())
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("REGDESK_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set REGDESK_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("regdesk.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: ParticipantId::new(row.get(0)?),
        id_no: row.get(1)?,
        name: row.get(2)?,
        email: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        dob: row.get(4)?,
        degree: row.get(5)?,
        course: row.get(6)?,
        year: row.get(7)?,
        phone: row.get(8)?,
        gender: row.get(9)?,
        college: row.get(10)?,
        event_1: row.get(11)?,
        event_2: row.get(12)?,
        workshop: row.get(13)?,
        payment: row.get(14)?,
        registered: row.get(15)?,
        pass: row.get(16)?,
        concert: row.get(17)?,
        accommodation: row.get(18)?,
        accommodation_days: row.get(19)?,
        accommodation_cost: row.get(20)?,
        reference: row.get(21)?,
        transaction_id: row.get(22)?,
        date: row.get(23)?,
        time: row.get(24)?,
        team_members: row.get(25)?,
        concert_transaction: row.get(26)?,
        concert_payment: row.get(27)?,
        event_1_day3: row.get(28)?,
        event_2_day3: row.get(29)?,
        event_3_day3: row.get(30)?,
        event_4_day3: row.get(31)?,
        event_1_day4: row.get(32)?,
    })
}

/// Values for every column after `id`, in `PARTICIPANT_COLUMNS` order.
fn participant_values(participant: &Participant) -> [Option<&str>; 32] {
    let p = participant;
    [
        p.id_no.as_deref(),
        p.name.as_deref(),
        Some(p.email.as_str()),
        p.dob.as_deref(),
        p.degree.as_deref(),
        p.course.as_deref(),
        p.year.as_deref(),
        p.phone.as_deref(),
        p.gender.as_deref(),
        p.college.as_deref(),
        p.event_1.as_deref(),
        p.event_2.as_deref(),
        p.workshop.as_deref(),
        p.payment.as_deref(),
        p.registered.as_deref(),
        p.pass.as_deref(),
        p.concert.as_deref(),
        p.accommodation.as_deref(),
        p.accommodation_days.as_deref(),
        p.accommodation_cost.as_deref(),
        p.reference.as_deref(),
        p.transaction_id.as_deref(),
        p.date.as_deref(),
        p.time.as_deref(),
        p.team_members.as_deref(),
        p.concert_transaction.as_deref(),
        p.concert_payment.as_deref(),
        p.event_1_day3.as_deref(),
        p.event_2_day3.as_deref(),
        p.event_3_day3.as_deref(),
        p.event_4_day3.as_deref(),
        p.event_1_day4.as_deref(),
    ]
}

fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn quoted_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point regdesk at a registration database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}
