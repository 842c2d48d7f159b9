//! Tabrec CLI
//!
//! Replays a captured protocol event stream (one JSON envelope per line)
//! through the recorder and prints the assembled report.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use tabrec::config::Config;
use tabrec::host::{
    AutomationSurface, Directive, GeoInfo, MetadataProvider, Notice, ObserverHandle, Persistence,
    Presentation, TargetInfo,
};
use tabrec::protocol::{
    EventEnvelope, PropertyDescriptor, ProtocolDomain, ProtocolEvent, TargetId,
};
use tabrec::session::{Recorder, SessionSnapshot};
use tabrec::{Result, TabrecError};

/// Offline stand-ins for the live-browser collaborators
///
/// Property fetches fail (no live page behind a replayed stream), so object
/// arguments degrade to their previews; everything else is a no-op.
struct Offline;

#[async_trait]
impl AutomationSurface for Offline {
    async fn attach_observer(&self, _target: TargetId) -> Result<ObserverHandle> {
        Ok(ObserverHandle(1))
    }

    async fn detach_observer(&self, _handle: ObserverHandle) -> Result<()> {
        Ok(())
    }

    async fn enable_domains(
        &self,
        _handle: ObserverHandle,
        _domains: &[ProtocolDomain],
    ) -> Result<()> {
        Ok(())
    }

    async fn get_properties(
        &self,
        _target: TargetId,
        _object_id: &str,
    ) -> Result<Vec<PropertyDescriptor>> {
        Err(TabrecError::PropertyFetch(
            "no live page behind a replayed stream".to_string(),
        ))
    }
}

#[async_trait]
impl Presentation for Offline {
    async fn send_directive(&self, _target: TargetId, directive: Directive) -> Result<()> {
        debug!(?directive, "directive (offline, ignored)");
        Ok(())
    }

    async fn notify(&self, notice: Notice) -> Result<()> {
        eprintln!("{}: {}", notice.title, notice.message);
        Ok(())
    }
}

#[async_trait]
impl Persistence for Offline {
    async fn save(&self, _snapshot: &SessionSnapshot) -> Result<()> {
        Ok(())
    }

    async fn load(&self) -> Result<Option<SessionSnapshot>> {
        Ok(None)
    }
}

#[async_trait]
impl MetadataProvider for Offline {
    async fn fetch_geo_info(&self) -> Result<GeoInfo> {
        Err(TabrecError::Network("offline".to_string()))
    }
}

struct ReportArgs {
    events_path: PathBuf,
    json: bool,
    page_url: String,
    config_path: Option<PathBuf>,
}

fn usage() -> ! {
    eprintln!("Tabrec v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("Usage: tabrec <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  report <events.jsonl>   Replay an event stream and print the report");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --json             Print the report as JSON instead of text");
    eprintln!("  --url <page-url>   Page URL the stream was captured on");
    eprintln!("  --config <path>    Load configuration from a TOML file");
    process::exit(1);
}

fn parse_report_args(args: &[String]) -> ReportArgs {
    let mut events_path = None;
    let mut json = false;
    let mut page_url = "http://localhost/".to_string();
    let mut config_path = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--url" => match iter.next() {
                Some(url) => page_url = url.clone(),
                None => usage(),
            },
            "--config" => match iter.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => usage(),
            },
            path if events_path.is_none() => events_path = Some(PathBuf::from(path)),
            _ => usage(),
        }
    }

    let Some(events_path) = events_path else {
        usage();
    };

    ReportArgs {
        events_path,
        json,
        page_url,
        config_path,
    }
}

async fn run_report(args: ReportArgs) -> anyhow::Result<()> {
    let config = match &args.config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let offline = Arc::new(Offline);
    let recorder = Arc::new(Recorder::new(
        config,
        offline.clone(),
        offline.clone(),
        offline.clone(),
        offline,
    ));

    let target = TargetInfo {
        id: TargetId(1),
        url: args.page_url,
    };
    recorder.start(target.clone()).await?;

    let content = std::fs::read_to_string(&args.events_path)?;
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let envelope: EventEnvelope = serde_json::from_str(line)
            .map_err(|error| anyhow::anyhow!("line {}: {error}", number + 1))?;
        if let Some(event) = ProtocolEvent::from_envelope(envelope)? {
            recorder.ingest(target.id, event).await;
        }
    }

    // Let spawned console tasks drain before assembling the report
    tokio::time::sleep(Duration::from_millis(50)).await;

    let report = recorder.stop(None).await?;
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
    }

    match args[1].as_str() {
        "report" => {
            let report_args = parse_report_args(&args[2..]);
            if let Err(error) = run_report(report_args).await {
                eprintln!("Error: {error}");
                process::exit(1);
            }
        }
        command => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'tabrec' for usage information.");
            process::exit(1);
        }
    }
}
