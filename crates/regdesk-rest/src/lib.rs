// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Client for the hosted registration database's PostgREST-style HTTP API.

use anyhow::{Context, Result, anyhow, bail};
use regdesk_app::{
    FieldPatch, Participant, ParticipantId, ParticipantPage, RecordStore, ReferenceEvent, columns,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_PARTICIPANTS_TABLE: &str = "Participants";
pub const DEFAULT_EVENTS_TABLE: &str = "Events";

const REST_PREFIX: &str = "rest/v1";

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    api_key: Option<String>,
    participants_table: String,
    events_table: String,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("store.base_url must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("store.base_url {base_url:?} is not a URL"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            api_key: api_key
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_owned),
            participants_table: DEFAULT_PARTICIPANTS_TABLE.to_owned(),
            events_table: DEFAULT_EVENTS_TABLE.to_owned(),
            http,
        })
    }

    pub fn with_tables(mut self, participants: &str, events: &str) -> Result<Self> {
        for (key, table) in [
            ("store.participants_table", participants),
            ("store.events_table", events),
        ] {
            if !is_safe_identifier(table) {
                bail!("{key} {table:?} must be letters, digits, or underscores");
            }
        }
        self.participants_table = participants.to_owned();
        self.events_table = events.to_owned();
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn participants_table(&self) -> &str {
        &self.participants_table
    }

    /// Cheapest authenticated round trip: one id from the participants table.
    pub fn ping(&self) -> Result<()> {
        let url = self.table_url(
            &self.participants_table,
            &[("select", columns::ID.to_owned()), ("limit", "1".to_owned())],
        )?;
        let response = self.send(self.http.get(url))?;
        let _: Vec<serde_json::Value> = decode(response, "decode ping response")?;
        Ok(())
    }

    fn table_url(&self, table: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{REST_PREFIX}/{table}", self.base_url))
            .with_context(|| format!("build URL for table {table}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        };
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }
}

impl RecordStore for Client {
    fn list_participants(&self, page: usize, page_size: usize) -> Result<ParticipantPage> {
        let offset = page
            .checked_mul(page_size)
            .ok_or_else(|| anyhow!("page {page} out of range"))?;
        let url = self.table_url(
            &self.participants_table,
            &[
                ("select", "*".to_owned()),
                ("order", format!("{}.asc", columns::ID)),
                ("offset", offset.to_string()),
                ("limit", page_size.to_string()),
            ],
        )?;
        debug!(%url, page, page_size, "listing participants");

        let response = self.send(self.http.get(url).header("Prefer", "count=exact"))?;
        let total = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range);
        let participants: Vec<Participant> = decode(response, "decode participants")?;
        let total = total.unwrap_or(offset + participants.len());
        Ok(ParticipantPage {
            participants,
            total,
        })
    }

    fn find_participant(&self, id: ParticipantId) -> Result<Vec<Participant>> {
        let url = self.table_url(
            &self.participants_table,
            &[
                ("select", "*".to_owned()),
                (columns::ID, format!("eq.{id}")),
            ],
        )?;
        debug!(%url, "looking up participant");
        let response = self.send(self.http.get(url))?;
        decode(response, "decode participant lookup")
    }

    fn list_reference_events(&self) -> Result<Vec<ReferenceEvent>> {
        let url = self.table_url(&self.events_table, &[("select", "*".to_owned())])?;
        let response = self.send(self.http.get(url))?;
        decode(response, "decode reference events")
    }

    fn update_participant(&self, id: ParticipantId, patch: &FieldPatch) -> Result<()> {
        if patch.is_empty() {
            bail!("empty update for participant {id}");
        }
        let url = self.table_url(&self.participants_table, &[(columns::ID, format!("eq.{id}"))])?;
        debug!(%url, columns = ?patch.columns().collect::<Vec<_>>(), "patching participant");

        let response = self.send(
            self.http
                .patch(url)
                .header("Prefer", "return=representation")
                .json(patch),
        )?;
        let updated: Vec<serde_json::Value> = decode(response, "decode update response")?;
        if updated.is_empty() {
            bail!("participant {id} not found -- refresh the list and retry");
        }
        Ok(())
    }
}

/// Total row count from a `Content-Range` header such as `0-99/250` or
/// `*/0`. `None` when the server did not report one.
pub fn parse_content_range(value: &str) -> Option<usize> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

fn decode<T: DeserializeOwned>(response: Response, what: &'static str) -> Result<T> {
    response.json().context(what)
}

fn is_safe_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check store.base_url and your network ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.message
        && !message.is_empty()
    {
        return match parsed.hint.filter(|hint| !hint.is_empty()) {
            Some(hint) => anyhow!("server error ({}): {message} ({hint})", status.as_u16()),
            None => anyhow!("server error ({}): {message}", status.as_u16()),
        };
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    hint: Option<String>,
}
