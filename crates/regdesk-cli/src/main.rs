// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::{BackendKind, Config};
use regdesk_app::ViewState;
use regdesk_db::Store;
use regdesk_tui::UiOptions;
use runtime::{Backend, DEMO_PARTICIPANTS, StoreRuntime};
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "REGDESK_LOG";
const DEMO_SEED: u64 = 2026;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `regdesk --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    init_tracing(&config)?;

    let backend = open_backend(&config, options.demo)?;
    if options.check_only {
        backend
            .check()
            .with_context(|| format!("check {}", backend.describe()))?;
        println!("ok: {}", backend.describe());
        return Ok(());
    }

    info!(backend = %backend.describe(), page_size = config.page_size(), "starting dashboard");
    let mut state = ViewState::new(config.page_size());
    let mut runtime = StoreRuntime::new(backend);
    let ui = UiOptions {
        toast_duration: config.toast_duration()?,
    };
    regdesk_tui::run_app(&mut state, &mut runtime, ui)
}

fn open_backend(config: &Config, demo: bool) -> Result<Backend> {
    if demo {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        runtime::seed_demo_data(&store, DEMO_SEED, DEMO_PARTICIPANTS)?;
        return Ok(Backend::Local(store));
    }

    match config.backend() {
        BackendKind::Sqlite => {
            let db_path = config.db_path()?;
            let store = Store::open(&db_path).with_context(|| {
                format!(
                    "open database {} -- if this path is wrong, set [store].db_path or REGDESK_DB_PATH",
                    db_path.display()
                )
            })?;
            store.bootstrap()?;
            Ok(Backend::Local(store))
        }
        BackendKind::Rest => {
            let api_key = config.api_key();
            let client =
                regdesk_rest::Client::new(config.base_url()?, api_key.as_deref(), config.timeout()?)
                    .context("invalid [store] config; fix base_url/timeout values")?
                    .with_tables(config.participants_table(), config.events_table())?;
            Ok(Backend::Remote(client))
        }
    }
}

/// Logs go to a file: the dashboard owns the terminal.
fn init_tracing(config: &Config) -> Result<()> {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.log_level())
            .with_context(|| format!("invalid logging.level {:?}", config.log_level()))?,
    };

    let log_path = config.log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;
    let writer = Mutex::new(file);

    if config.log_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
            .try_init()
            .context("install log subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer),
            )
            .try_init()
            .context("install log subscriber")?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("regdesk: festival registration desk");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch with seeded demo registrations (in-memory)");
    println!("  --check                  Validate config and reach the record store");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, open_backend, parse_cli_args};
    use crate::config::Config;
    use anyhow::Result;
    use regdesk_app::RecordStore;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/regdesk-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_demo_check_and_print_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--demo", "--check", "--print-example-config", "-h"],
            default_options_path(),
        )?;
        assert!(options.demo);
        assert!(options.check_only);
        assert!(options.print_example);
        assert!(options.show_help);
        assert!(!options.print_config_path);
        Ok(())
    }

    #[test]
    fn demo_backend_is_seeded_in_memory() -> Result<()> {
        let backend = open_backend(&Config::default(), true)?;
        backend.check()?;
        let page = backend.list_participants(0, 50)?;
        assert_eq!(page.total, super::DEMO_PARTICIPANTS);
        assert_eq!(page.participants.len(), 50);
        Ok(())
    }

    #[test]
    fn sqlite_backend_bootstraps_configured_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let db_path = temp.path().join("desk.db");
        std::fs::write(
            &path,
            format!(
                "version = 1\n[store]\nbackend = \"sqlite\"\ndb_path = \"{}\"\n",
                db_path.display()
            ),
        )?;

        let backend = open_backend(&Config::load(&path)?, false)?;
        backend.check()?;
        assert!(db_path.exists());
        assert_eq!(backend.list_participants(0, 10)?.total, 0);
        Ok(())
    }

    #[test]
    fn rest_backend_without_base_url_fails_with_hint() {
        let error = open_backend(&Config::default(), false)
            .err()
            .expect("missing base_url should fail");
        assert!(error.to_string().contains("store.base_url is not set"));
    }
}
