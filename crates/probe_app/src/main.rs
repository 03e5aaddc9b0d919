//! urlprobe: probe a list of URLs over HTTP(S) under a concurrency cap and
//! report per-URL success or failure.
mod logging;

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use probe_engine::{ChannelStatusSink, DispatcherConfig, DispatcherHandle, ProbeStatus};
use probe_logging::probe_info;

#[derive(Parser, Debug)]
#[command(
    name = "urlprobe",
    about = "Probe URLs over HTTP(S) with a bounded concurrency cap"
)]
struct Cli {
    /// URLs to probe; stdin is read when neither URLs nor --file are given.
    urls: Vec<String>,

    /// Read URLs from a file: one per line or comma-separated, '#' starts a
    /// comment line.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Maximum number of probes in flight at once.
    #[arg(long, default_value_t = 5)]
    concurrency: usize,

    /// Queue poll interval in milliseconds.
    #[arg(long = "poll-interval-ms", default_value_t = 500)]
    poll_interval_ms: u64,

    /// Per-request timeout in seconds; probes wait indefinitely when omitted.
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,

    /// Print the final summary as JSON instead of the live transition log.
    #[arg(long)]
    json: bool,

    /// Also log to the terminal (stderr), not just ./probe.log.
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(if cli.verbose {
        logging::LogDestination::Both
    } else {
        logging::LogDestination::File
    });

    let urls = gather_urls(&cli)?;
    if urls.is_empty() {
        bail!("no URLs to probe");
    }

    let config = DispatcherConfig {
        concurrency_limit: cli.concurrency,
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
        request_timeout: cli.timeout_secs.map(Duration::from_secs),
        ..DispatcherConfig::default()
    };

    let (tx, rx) = mpsc::channel();
    let handle = DispatcherHandle::spawn(config, Arc::new(ChannelStatusSink::new(tx)))?;
    let expected = handle.enqueue_all(&urls);
    probe_info!("enqueued {} urls ({} submitted)", expected, urls.len());

    // Render transitions as they arrive; each accepted URL produces exactly
    // one terminal transition since the CLI never re-enqueues.
    let mut terminal = 0usize;
    while terminal < expected {
        let change = rx
            .recv()
            .context("dispatcher stopped before all probes finished")?;
        if !cli.json {
            println!("{:<50} {}", change.url, change.status);
        }
        if change.status.is_terminal() {
            terminal += 1;
        }
    }

    let rows = handle.snapshot();
    handle.stop();

    let failed = rows
        .iter()
        .filter(|row| matches!(row.status, ProbeStatus::Failed(_)))
        .count();

    if cli.json {
        let summary: Vec<SummaryRow<'_>> = rows.iter().map(SummaryRow::from_status).collect();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "\n{} probed, {} ok, {} failed",
            rows.len(),
            rows.len() - failed,
            failed
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct SummaryRow<'a> {
    url: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl<'a> SummaryRow<'a> {
    fn from_status(row: &'a probe_engine::StatusRow) -> Self {
        let (status, reason) = match &row.status {
            ProbeStatus::Pending => ("pending", None),
            ProbeStatus::Probing => ("probing", None),
            ProbeStatus::Succeeded => ("succeeded", None),
            ProbeStatus::Failed(reason) => ("failed", Some(reason.as_str())),
        };
        Self {
            url: &row.url,
            status,
            reason,
        }
    }
}

fn gather_urls(cli: &Cli) -> Result<Vec<String>> {
    let mut urls = cli.urls.clone();
    if let Some(path) = &cli.file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading URL list from {}", path.display()))?;
        urls.extend(parse_url_entries(&text));
    }
    if urls.is_empty() && cli.file.is_none() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading URLs from stdin")?;
        urls.extend(parse_url_entries(&text));
    }
    Ok(urls)
}

/// Split pasted text the way the reference UI did: newlines or commas
/// separate entries, blanks are dropped. Comment lines start with '#'.
fn parse_url_entries(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
