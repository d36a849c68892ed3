// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Datadeck session sweeper.
//!
//! Loads every persisted session record and evicts idle sessions on a fixed interval until
//! interrupted. `--once` performs a single sweep and prints the number of evicted sessions.

use std::error::Error;
use std::time::Duration;

use chrono::Utc;
use datadeck::config::{parse_secs, StoreConfig};
use datadeck::store::{SessionStore, WriteDurability};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {program} [--upload-dir <dir>] [--cache-dir <dir>] [--session-timeout <secs>] \
         [--sweep-interval <secs>] [--durable-writes] [--once]\n\
         \n\
         Defaults come from DATADECK_UPLOAD_DIR, DATADECK_CACHE_DIR,\n\
         DATADECK_SESSION_TIMEOUT_SECS and DATADECK_DURABLE_WRITES."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    upload_dir: Option<String>,
    cache_dir: Option<String>,
    session_timeout: Option<Duration>,
    sweep_interval: Option<Duration>,
    durable_writes: bool,
    once: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--upload-dir" => {
                if options.upload_dir.is_some() {
                    return Err(());
                }
                options.upload_dir = Some(args.next().ok_or(())?);
            }
            "--cache-dir" => {
                if options.cache_dir.is_some() {
                    return Err(());
                }
                options.cache_dir = Some(args.next().ok_or(())?);
            }
            "--session-timeout" => {
                if options.session_timeout.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let timeout = parse_secs("--session-timeout", &raw).map_err(|_| ())?;
                options.session_timeout = Some(timeout);
            }
            "--sweep-interval" => {
                if options.sweep_interval.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let interval = parse_secs("--sweep-interval", &raw).map_err(|_| ())?;
                if interval.is_zero() {
                    return Err(());
                }
                options.sweep_interval = Some(interval);
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            "--once" => {
                if options.once {
                    return Err(());
                }
                options.once = true;
            }
            _ => return Err(()),
        }
    }

    if options.once && options.sweep_interval.is_some() {
        return Err(());
    }

    Ok(options)
}

fn store_config(options: &CliOptions) -> Result<StoreConfig, Box<dyn Error>> {
    let mut config = StoreConfig::from_env()?;
    if let Some(dir) = &options.upload_dir {
        config = config.with_upload_dir(dir);
    }
    if let Some(dir) = &options.cache_dir {
        config = config.with_cache_dir(dir);
    }
    if let Some(timeout) = options.session_timeout {
        config = config.with_session_timeout(timeout);
    }
    if options.durable_writes {
        config = config.with_durability(WriteDurability::Durable);
    }
    Ok(config)
}

async fn run_sweeper(store: &SessionStore, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                store.sweep(Utc::now());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                return;
            }
        }
    }
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "datadeck".to_owned());
        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

        let config = store_config(&options)?;
        config.ensure_dirs()?;
        info!(
            upload_dir = %config.upload_dir().display(),
            cache_dir = %config.cache_dir().display(),
            session_timeout_secs = config.session_timeout().as_secs(),
            "session store ready"
        );

        let store = SessionStore::new(config);
        store.rehydrate_all()?;

        if options.once {
            let evicted = store.sweep(Utc::now());
            println!("{evicted}");
            return Ok(());
        }

        let interval = options.sweep_interval.unwrap_or(DEFAULT_SWEEP_INTERVAL);
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(run_sweeper(&store, interval));
        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("datadeck: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{parse_options, CliOptions};

    fn args(raw: &[&str]) -> impl Iterator<Item = String> {
        raw.iter().map(|arg| (*arg).to_owned()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_empty_args() {
        let options = parse_options(std::iter::empty()).expect("parse options");
        assert_eq!(options, CliOptions::default());
    }

    #[test]
    fn parses_directories_and_timeout() {
        let options = parse_options(args(&[
            "--upload-dir",
            "/srv/uploads",
            "--cache-dir",
            "/srv/cache",
            "--session-timeout",
            "900",
        ]))
        .expect("parse options");

        assert_eq!(options.upload_dir.as_deref(), Some("/srv/uploads"));
        assert_eq!(options.cache_dir.as_deref(), Some("/srv/cache"));
        assert_eq!(options.session_timeout, Some(Duration::from_secs(900)));
        assert!(!options.once);
    }

    #[test]
    fn parses_once_and_durable_writes() {
        let options =
            parse_options(args(&["--once", "--durable-writes"])).expect("parse options");
        assert!(options.once);
        assert!(options.durable_writes);
    }

    #[test]
    fn rejects_repeated_flags() {
        parse_options(args(&["--once", "--once"])).unwrap_err();
        parse_options(args(&["--cache-dir", "a", "--cache-dir", "b"])).unwrap_err();
    }

    #[test]
    fn rejects_missing_or_invalid_values() {
        parse_options(args(&["--cache-dir"])).unwrap_err();
        parse_options(args(&["--session-timeout", "1h"])).unwrap_err();
        parse_options(args(&["--sweep-interval", "0"])).unwrap_err();
    }

    #[test]
    fn rejects_interval_with_single_sweep() {
        parse_options(args(&["--once", "--sweep-interval", "5"])).unwrap_err();
    }

    #[test]
    fn rejects_positional_arguments() {
        parse_options(args(&["cache"])).unwrap_err();
    }
}
