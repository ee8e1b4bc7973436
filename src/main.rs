use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tagwatch::app::shutdown_on;
use tagwatch::{App, Settings};
use tagwatch_adapters::{Direction, TagFilter, ValueKind};
use tagwatch_engine::Export;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tagwatch")]
#[command(about = "Real-time tag monitoring and alerting for Factory I/O style control systems")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Factory I/O Web API base URL
    #[arg(short, long, conflicts_with = "catalog_file")]
    endpoint: Option<String>,

    /// Read tags from a JSON file instead of the Web API
    #[arg(long)]
    catalog_file: Option<PathBuf>,

    /// Tag ids to monitor (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Monitor the tags of a configured group
    #[arg(short, long)]
    group: Option<String>,

    /// Poll interval (e.g., "500ms", "1s")
    #[arg(short, long)]
    interval: Option<String>,

    /// Time without fresh samples before the system counts as paused (e.g., "5s")
    #[arg(long)]
    stale_timeout: Option<String>,

    /// Maximum history entries kept per tag
    #[arg(long)]
    max_history: Option<usize>,

    /// Print the tag catalog and exit
    #[arg(short, long)]
    list: bool,

    /// Only list tags whose name contains this text
    #[arg(long, requires = "list")]
    name: Option<String>,

    /// Only list tags of this value type (Bit, Int, Float)
    #[arg(long, requires = "list", value_parser = parse_kind)]
    kind: Option<ValueKind>,

    /// Only list tags of this direction (Input, Output)
    #[arg(long, requires = "list", value_parser = parse_direction)]
    direction: Option<Direction>,

    /// Poll once and write the monitored tags to a CSV file
    #[arg(long, conflicts_with = "list")]
    export: Option<PathBuf>,

    /// Poll once and write the whole snapshot to a JSON file
    #[arg(long, conflicts_with = "list")]
    json: Option<PathBuf>,
}

impl Args {
    /// Command line flags take precedence over file and environment settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = endpoint.clone();
            settings.catalog_file = None;
        }
        if let Some(path) = &self.catalog_file {
            settings.catalog_file = Some(path.clone());
        }
        if !self.tags.is_empty() {
            settings.tags = self.tags.clone();
        }
        if let Some(group) = &self.group {
            settings.group = Some(group.clone());
            if self.tags.is_empty() {
                settings.tags.clear();
            }
        }
        if let Some(interval) = &self.interval {
            settings.interval = interval.clone();
        }
        if let Some(timeout) = &self.stale_timeout {
            settings.stale_timeout = timeout.clone();
        }
        if let Some(max) = self.max_history {
            settings.max_history = max;
        }
    }

    fn filter(&self) -> TagFilter {
        TagFilter {
            name: self.name.clone(),
            kind: self.kind,
            direction: self.direction,
        }
    }

    fn exports(&self) -> Vec<Export> {
        let mut exports = Vec::new();
        if let Some(path) = &self.export {
            exports.push(Export::csv(path));
        }
        if let Some(path) = &self.json {
            exports.push(Export::json(path));
        }
        exports
    }
}

fn parse_kind(s: &str) -> Result<ValueKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "bit" | "bool" => Ok(ValueKind::Bit),
        "int" | "integer" => Ok(ValueKind::Int),
        "float" => Ok(ValueKind::Float),
        other => Err(format!("unknown value type: {other}")),
    }
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    match s.to_ascii_lowercase().as_str() {
        "input" | "in" => Ok(Direction::Input),
        "output" | "out" => Ok(Direction::Output),
        other => Err(format!("unknown direction: {other}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);

    let app = App::new(settings)?;

    // Handle list mode (non-interactive)
    if args.list {
        let tags = app.list(&args.filter()).await?;
        for tag in &tags {
            println!(
                "{:<38} {:<32} {:<6} {:<7} {}",
                tag.id,
                tag.name,
                tag.kind.as_str(),
                tag.direction.as_str(),
                tag.value
            );
        }
        println!("{} tag(s)", tags.len());
        return Ok(());
    }

    app.prepare().await?;

    // Handle export mode (non-interactive)
    let exports = args.exports();
    if !exports.is_empty() {
        app.export_once(&exports).await?;
        for export in &exports {
            println!("Exported snapshot to: {}", export.path().display());
        }
        return Ok(());
    }

    // Default: watch until Ctrl-C
    app.run(shutdown_on(tokio::signal::ctrl_c())).await
}
