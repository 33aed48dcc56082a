// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_TOAST_DURATION: &str = "3s";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "regdesk.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Rest,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            store: StoreSection::default(),
            ui: Ui::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSection {
    pub backend: Option<BackendKind>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub participants_table: Option<String>,
    pub events_table: Option<String>,
    pub timeout: Option<String>,
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub page_size: Option<i64>,
    pub toast_duration: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            page_size: Some(regdesk_app::DEFAULT_PAGE_SIZE as i64),
            toast_duration: Some(DEFAULT_TOAST_DURATION.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
    pub json: Option<bool>,
    pub path: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("REGDESK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set REGDESK_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(regdesk_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [store], [ui], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.store.db_path {
            regdesk_db::validate_db_path(db_path)
                .with_context(|| format!("store.db_path in {}", path.display()))?;
        }

        if let Some(page_size) = self.ui.page_size
            && page_size <= 0
        {
            bail!(
                "ui.page_size in {} must be positive, got {}",
                path.display(),
                page_size
            );
        }

        for (key, value) in [
            ("store.timeout", &self.store.timeout),
            ("ui.toast_duration", &self.ui.toast_duration),
        ] {
            if let Some(raw) = value {
                let parsed = parse_duration(raw)
                    .with_context(|| format!("{key} in {}", path.display()))?;
                if parsed <= Duration::ZERO {
                    bail!("{key} in {} must be positive, got {}", path.display(), raw);
                }
            }
        }

        if let Some(level) = &self.logging.level
            && level.trim().is_empty()
        {
            bail!("logging.level in {} must not be empty", path.display());
        }

        Ok(())
    }

    pub fn backend(&self) -> BackendKind {
        self.store.backend.unwrap_or_default()
    }

    /// Hosted store URL; required for the rest backend.
    pub fn base_url(&self) -> Result<&str> {
        self.store
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "store.base_url is not set; add it under [store] or use backend = \"sqlite\""
                )
            })
    }

    /// `REGDESK_API_KEY` wins over the file value.
    pub fn api_key(&self) -> Option<String> {
        env::var("REGDESK_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.store.api_key.clone())
    }

    pub fn participants_table(&self) -> &str {
        self.store
            .participants_table
            .as_deref()
            .unwrap_or(regdesk_rest::DEFAULT_PARTICIPANTS_TABLE)
    }

    pub fn events_table(&self) -> &str {
        self.store
            .events_table
            .as_deref()
            .unwrap_or(regdesk_rest::DEFAULT_EVENTS_TABLE)
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.store.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.store.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => regdesk_db::default_db_path(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.ui
            .page_size
            .and_then(|size| usize::try_from(size).ok())
            .filter(|size| *size > 0)
            .unwrap_or(regdesk_app::DEFAULT_PAGE_SIZE)
    }

    pub fn toast_duration(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .toast_duration
                .as_deref()
                .unwrap_or(DEFAULT_TOAST_DURATION),
        )
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_json(&self) -> bool {
        self.logging.json.unwrap_or(false)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.logging.path {
            return Ok(PathBuf::from(path));
        }

        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set logging.path in the config file")
        })?;
        let app_dir = data_root.join(regdesk_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create data directory {}", app_dir.display()))?;
        Ok(app_dir.join(LOG_FILE_NAME))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# regdesk config\n# Place this file at: {}\n\nversion = 1\n\n[store]\n# \"rest\" talks to the hosted database, \"sqlite\" opens a local file.\nbackend = \"rest\"\nbase_url = \"https://your-project.example.com\"\n# Prefer the REGDESK_API_KEY environment variable.\n# api_key = \"\"\nparticipants_table = \"{}\"\nevents_table = \"{}\"\ntimeout = \"{}\"\n# Used by backend = \"sqlite\". Default is the platform data dir.\n# db_path = \"/absolute/path/to/regdesk.db\"\n\n[ui]\npage_size = {}\ntoast_duration = \"{}\"\n\n[logging]\n# Overridden by REGDESK_LOG (for example REGDESK_LOG=regdesk=debug).\nlevel = \"{}\"\njson = false\n# path = \"/absolute/path/to/regdesk.log\"\n",
            path.display(),
            regdesk_rest::DEFAULT_PARTICIPANTS_TABLE,
            regdesk_rest::DEFAULT_EVENTS_TABLE,
            DEFAULT_TIMEOUT,
            regdesk_app::DEFAULT_PAGE_SIZE,
            DEFAULT_TOAST_DURATION,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let Some(secs) = mins.checked_mul(60) else {
            bail!("duration {raw:?} is too large");
        };
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
