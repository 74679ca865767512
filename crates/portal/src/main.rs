#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use portal_core::config::{GateConfig, DEFAULT_CONFIG_PATH};
use portal_core::types::CheckRequest;
use portal_engine::state::cache::DecisionCache;
use portal_engine::state::store::FileStore;
use portal_engine::AvailabilityGate;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "portal",
    version,
    about = "Decide once per campaign whether to show external content or the native app."
)]
struct Cli {
    /// Config file (defaults to .portal/config.json when present).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the availability gate for a URL and record the decision.
    Check {
        /// External content URL.
        url: String,

        /// Content is eligible from this instant (RFC 3339 or YYYY-MM-DD, UTC).
        #[arg(long)]
        target_date: String,

        /// Skip the tablet exclusion.
        #[arg(long)]
        no_device_check: bool,

        /// Probe timeout in seconds (config default otherwise).
        #[arg(long)]
        timeout: Option<u64>,

        /// Decision scope (defaults to the URL).
        #[arg(long)]
        cache_key: Option<String>,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the recorded decision for a URL.
    Status {
        url: String,

        #[arg(long)]
        cache_key: Option<String>,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Forget the recorded decision for a URL.
    Reset {
        url: String,

        #[arg(long)]
        cache_key: Option<String>,
    },

    /// Print this install's client identity.
    Id,

    /// Inspect the decision journal.
    Journal {
        /// Verify the hash chain.
        #[arg(long)]
        verify: bool,

        /// Print the last N entries.
        #[arg(long, default_value_t = 10)]
        tail: usize,
    },

    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref();
    let config = || GateConfig::load(config_path);

    match cli.cmd {
        Cmd::Check {
            url,
            target_date,
            no_device_check,
            timeout,
            cache_key,
            json,
        } => {
            let config = config()?;
            let timeout = timeout.map_or_else(|| config.request_timeout(), Duration::from_secs);
            let mut request = CheckRequest::new(url, parse_target_date(&target_date)?)
                .device_check(!no_device_check)
                .timeout(timeout);
            if let Some(key) = cache_key {
                request = request.cache_key(key);
            }
            cmd_check(&config, &request, json).await
        }

        Cmd::Status {
            url,
            cache_key,
            json,
        } => cmd_status(&config()?, &url, cache_key.as_deref(), json),

        Cmd::Reset { url, cache_key } => cmd_reset(&config()?, &url, cache_key.as_deref()),

        Cmd::Id => cmd_id(&config()?),

        Cmd::Journal { verify, tail } => cmd_journal(&config()?, verify, tail),

        Cmd::Init { force } => cmd_init(config_path.unwrap_or(DEFAULT_CONFIG_PATH), force),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "portal=debug,portal_engine=debug,portal_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_target_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid --target-date \"{raw}\" (expected RFC 3339 or YYYY-MM-DD)"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("invalid --target-date \"{raw}\""))?;
    Ok(midnight.and_utc())
}

fn decision_cache(config: &GateConfig) -> DecisionCache {
    DecisionCache::new(Arc::new(FileStore::open(&config.store_path)))
}

async fn cmd_check(config: &GateConfig, request: &CheckRequest, json_out: bool) -> Result<()> {
    tracing::debug!(store = %config.store_path, journal = ?config.journal_path, "running gate");
    let gate = AvailabilityGate::from_config(config);
    let result = gate
        .check_availability(request)
        .await
        .with_context(|| format!("cannot record decision in {}", config.store_path))?;

    if json_out {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if result.should_show_external_content {
            eprintln!("  external  {}", result.reason);
        } else {
            eprintln!("  native    {}", result.reason);
        }
        if !result.final_url.is_empty() {
            println!("{}", result.final_url);
        }
    }
    Ok(())
}

fn cmd_status(config: &GateConfig, url: &str, cache_key: Option<&str>, json_out: bool) -> Result<()> {
    let key = cache_key.unwrap_or(url);
    let record = decision_cache(config).load(key, url)?;

    if json_out {
        let status = serde_json::json!({
            "cache_key": key,
            "url": url,
            "external_shown": record.external_shown,
            "app_shown": record.app_shown,
            "decided": record.is_decided(),
            "saved_url": record.saved_url,
            "saved_path_id": record.saved_path_id,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        let decision = if !record.is_decided() {
            "(undecided)"
        } else if record.external_shown {
            "external"
        } else {
            "native"
        };
        eprintln!("  Cache key: {key}");
        eprintln!("  Decision:  {decision}");
        eprintln!(
            "  Saved URL: {}",
            record.saved_url.as_deref().unwrap_or("(none)")
        );
        eprintln!(
            "  Path id:   {}",
            record.saved_path_id.as_deref().unwrap_or("(none)")
        );
    }
    Ok(())
}

fn cmd_reset(config: &GateConfig, url: &str, cache_key: Option<&str>) -> Result<()> {
    let key = cache_key.unwrap_or(url);
    decision_cache(config).clear(key, url)?;
    eprintln!("  cleared {key}");
    Ok(())
}

fn cmd_id(config: &GateConfig) -> Result<()> {
    let store = FileStore::open(&config.store_path);
    println!("{}", portal_engine::state::identity::client_identity(&store)?);
    Ok(())
}

fn cmd_journal(config: &GateConfig, verify: bool, tail: usize) -> Result<()> {
    let Some(path) = config.journal_path.as_deref() else {
        bail!("journal disabled (journal_path is null)");
    };

    if verify {
        let count = portal_engine::state::journal::verify_chain(Path::new(path))?;
        eprintln!("  ok  {path} ({count} entries)");
        return Ok(());
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("cannot read journal {path}")),
    };
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    for line in &lines[lines.len().saturating_sub(tail)..] {
        println!("{line}");
    }
    Ok(())
}

fn cmd_init(path: &str, force: bool) -> Result<()> {
    if Path::new(path).exists() && !force {
        bail!("{path} already exists (use --force to overwrite)");
    }
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(&GateConfig::default())?;
    std::fs::write(path, json).with_context(|| format!("cannot write {path}"))?;
    eprintln!("created {path}");
    Ok(())
}
