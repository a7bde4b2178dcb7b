use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use placement_catalog::bookmarks::BookmarkSet;
use placement_catalog::catalog::normalize::normalize_transcript;
use placement_catalog::catalog::source::{load_catalog_snapshot, provider_from_config};
use placement_catalog::catalog::{CatalogSnapshot, Transcript};
use placement_catalog::config::{Config, ConfigOverrides};
use placement_catalog::eligibility::evaluator::evaluate_in_snapshot;
use placement_catalog::eligibility::history::{record_from_report, summarize_history};
use placement_catalog::output::csv::{programmes_to_csv, report_to_csv};
use placement_catalog::output::json::render_json;
use placement_catalog::output::table::{
    render_buckets_table, render_history_table, render_programmes_table, render_report_table,
};
use placement_catalog::query::filter::filter_programmes;
use placement_catalog::query::group::group_by_cluster;
use placement_catalog::query::sort::{sort_programmes, SortKey};
use placement_catalog::query::FilterSpec;
use placement_catalog::server::run_server;
use placement_catalog::snapshot::store::SnapshotStore;
use tracing::warn;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "placement-catalog",
    about = "University placement catalog explorer and eligibility checker"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Placement API base URL override.
    #[arg(short, long)]
    api: Option<String>,
    /// KCSE index number override.
    #[arg(short, long)]
    index: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Comma-separated programme ids to treat as bookmarked this session.
    #[arg(short, long)]
    bookmarks: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone, Default)]
struct FilterArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    level: Option<String>,
    #[arg(long)]
    cluster: Option<u64>,
    #[arg(long = "min-agp-floor")]
    min_agp_floor: Option<f64>,
    #[arg(long = "min-agp-ceiling")]
    min_agp_ceiling: Option<f64>,
    #[arg(long)]
    helb: bool,
    #[arg(long)]
    scholarship: bool,
    #[arg(long)]
    bookmarked: bool,
}

impl From<FilterArgs> for FilterSpec {
    fn from(value: FilterArgs) -> Self {
        Self {
            search_text: value.search,
            level: value.level,
            cluster_id: value.cluster,
            min_agp_floor: value.min_agp_floor,
            min_agp_ceiling: value.min_agp_ceiling,
            require_helb: value.helb,
            require_scholarship: value.scholarship,
            bookmarked_only: value.bookmarked,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Filter and sort the programme catalog.
    Browse {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "name-asc")]
        sort: String,
    },
    /// Partition the (optionally filtered) catalog into cluster buckets.
    Groups {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Check one programme's requirements against a transcript.
    Check {
        programme_id: u64,
        /// JSON file of subject results; skips the API lookup.
        #[arg(long = "results-file")]
        results_file: Option<PathBuf>,
        #[arg(long)]
        no_persist: bool,
    },
    /// Past eligibility checks for the configured index number.
    History {
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long)]
        programme: Option<u64>,
    },
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 3001)]
        port: u16,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        index_number: cli.index.clone(),
        base_url: cli.api.clone(),
    });

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if let Commands::Serve { host, port } = &cli.command {
        let bind = format!("{host}:{port}");
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let bookmarks = match cli.bookmarks.as_deref() {
        Some(raw) => parse_bookmarks(raw)?,
        None => BookmarkSet::new(),
    };

    match &cli.command {
        Commands::Browse { filter, sort } => {
            let snapshot = load_snapshot_or_sample(&config).await;
            let spec: FilterSpec = filter.clone().into();
            let key = SortKey::from_str(sort)?;
            let filtered = filter_programmes(&snapshot.programmes, &spec, &bookmarks);
            let sorted = sort_programmes(&filtered, key);
            print_programmes(&sorted, cli.output)?;
        }
        Commands::Groups { filter } => {
            let snapshot = load_snapshot_or_sample(&config).await;
            let spec: FilterSpec = filter.clone().into();
            let filtered = filter_programmes(&snapshot.programmes, &spec, &bookmarks);
            let buckets = group_by_cluster(&filtered, &snapshot.clusters);
            match cli.output {
                OutputFormat::Table => println!("{}", render_buckets_table(&buckets)),
                OutputFormat::Json => println!("{}", render_json(&buckets)?),
                OutputFormat::Csv => {
                    warn!("CSV output for groups not implemented, using JSON");
                    println!("{}", render_json(&buckets)?);
                }
            }
        }
        Commands::Check {
            programme_id,
            results_file,
            no_persist,
        } => {
            let snapshot = load_snapshot_or_sample(&config).await;
            let programme = snapshot
                .programme(*programme_id)
                .cloned()
                .ok_or_else(|| anyhow!("unknown programme id: {programme_id}"))?;
            let transcript = resolve_transcript(&config, results_file.clone()).await?;
            let report = evaluate_in_snapshot(&snapshot, &programme, &transcript);

            if !*no_persist {
                let store = SnapshotStore::open(&config.resolved_db_path())?;
                let index_number = effective_index_number(&config);
                let record = record_from_report(index_number, &programme, &report);
                store.insert_check_record(&record)?;
            }

            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_report_table(&programme.name, &report))
                }
                OutputFormat::Json => println!("{}", render_json(&report)?),
                OutputFormat::Csv => println!("{}", report_to_csv(&report)?),
            }
        }
        Commands::History { limit, programme } => {
            let index_number = effective_index_number(&config);
            if index_number.is_empty() {
                return Err(anyhow!("no index number configured; pass --index"));
            }
            let store = SnapshotStore::open(&config.resolved_db_path())?;
            let records = store.load_history(&index_number, *programme, (*limit).max(1))?;
            let summary = summarize_history(&records, *programme);
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_history_table(&records));
                    println!("{summary}");
                }
                OutputFormat::Json => println!("{}", render_json(&records)?),
                OutputFormat::Csv => {
                    warn!("CSV output for history not implemented, using JSON");
                    println!("{}", render_json(&records)?);
                }
            }
        }
        Commands::Config { .. } => {}
        Commands::Serve { .. } => unreachable!("serve command handled before dispatch"),
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &PathBuf) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

/// The catalog commands should work offline: when the configured source is
/// unreachable, fall back to the built-in sample catalog.
async fn load_snapshot_or_sample(config: &Config) -> CatalogSnapshot {
    let provider = provider_from_config(config);
    match load_catalog_snapshot(provider.as_ref()).await {
        Ok(snapshot) => {
            if let Ok(store) = SnapshotStore::open(&config.resolved_db_path()) {
                if let Err(error) = store.insert_snapshot(&snapshot) {
                    warn!("failed persisting catalog snapshot: {error}");
                }
            }
            snapshot
        }
        Err(error) => {
            warn!("catalog source unavailable ({error}), using built-in sample catalog");
            CatalogSnapshot::sample()
        }
    }
}

async fn resolve_transcript(config: &Config, results_file: Option<PathBuf>) -> Result<Transcript> {
    let raw = if let Some(path) = results_file {
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("failed reading results file: {}", path.display()))?;
        let payload: serde_json::Value = serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON in results file: {}", path.display()))?;
        match payload {
            serde_json::Value::Array(entries) => entries,
            other => return Err(anyhow!("results file must hold an array, got: {other}")),
        }
    } else {
        let index_number = effective_index_number(config);
        if index_number.is_empty() {
            return Err(anyhow!(
                "no index number configured; pass --index or --results-file"
            ));
        }
        let provider = provider_from_config(config);
        provider.fetch_student_results(&index_number).await?
    };

    let (transcript, failures) = normalize_transcript(&raw);
    for failure in &failures {
        warn!(
            "dropping malformed result record at index {}: {}",
            failure.index, failure.error
        );
    }
    Ok(transcript)
}

fn effective_index_number(config: &Config) -> String {
    config.student.index_number.trim().to_string()
}

fn parse_bookmarks(raw: &str) -> Result<BookmarkSet> {
    let mut ids = Vec::new();
    for piece in raw.split(',') {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        let id = trimmed
            .parse::<u64>()
            .map_err(|_| anyhow!("invalid programme id in bookmark list: {trimmed}"))?;
        ids.push(id);
    }
    if ids.is_empty() {
        return Err(anyhow!("bookmark list is empty"));
    }
    Ok(BookmarkSet::from_ids(ids))
}

fn print_programmes(
    programmes: &[placement_catalog::catalog::Programme],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_programmes_table(programmes)),
        OutputFormat::Json => println!("{}", render_json(programmes)?),
        OutputFormat::Csv => println!("{}", programmes_to_csv(programmes)?),
    }
    Ok(())
}
