//! Signal Triage Core - Insight Normalization and Classification Pipeline
//!
//! The main entry point for st-core, handling:
//! - One-shot and periodic ingestion of the upstream record stream
//! - The filtered query surface consumed by the presentation layer
//! - Configuration validation
//! - JSON Schema export

use clap::{Args, Parser, Subcommand};
use st_common::{InsightId, InsightKind, OutputFormat, StructuredError, SCHEMA_VERSION};
use st_config::{load_config, ConfigError, PipelineConfig};
use st_core::classify::SeverityContext;
use st_core::logging::{init_logging, LogConfig, LogFormat};
use st_core::poller::{run_cycle, Poller, SourceReader};
use st_core::query::{self, InsightFilter};
use st_core::store::InsightStore;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Process exit codes.
const EXIT_OK: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_CONFIG: i32 = 2;
const EXIT_NOT_FOUND: i32 = 3;

/// Signal Triage Core - correlation insight normalization and triage
#[derive(Parser)]
#[command(name = "st-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to pipeline config file (JSON)
    #[arg(long, global = true, env = "ST_CONFIG")]
    config: Option<PathBuf>,

    /// Override the record source path from the config
    #[arg(long, global = true, env = "ST_SOURCE")]
    source: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    log_jsonl: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single ingestion cycle and report its outcome
    Run,

    /// Poll the source on an interval until terminated
    Watch(WatchArgs),

    /// Ingest the source, then list insights through the filter surface
    Query(QueryArgs),

    /// Ingest the source, then fetch one insight by id
    Get(GetArgs),

    /// Ingest the source, then print aggregate statistics
    Stats,

    /// Validate configuration and environment
    Check,

    /// Generate JSON Schemas for output types
    Schema(SchemaArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Override the poll interval (seconds)
    #[arg(long)]
    interval: Option<u64>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Restrict to one kind
    #[arg(long, value_parser = parse_kind)]
    kind: Option<InsightKind>,

    /// Minimum correlation-like metric
    #[arg(long)]
    min_correlation: Option<f64>,

    /// Minimum support-like sample count
    #[arg(long)]
    min_support: Option<u32>,

    /// Minimum aligned burst count (burst kind only)
    #[arg(long)]
    min_aligned_bursts: Option<u32>,

    /// Minimum PMI score (PMI kind only)
    #[arg(long)]
    min_pmi_score: Option<f64>,

    /// Keep only statistically significant records
    #[arg(long)]
    significant_only: bool,

    /// Restrict to a cluster
    #[arg(long)]
    cluster: Option<String>,

    /// Restrict to a namespace
    #[arg(long)]
    namespace: Option<String>,

    /// Case-insensitive substring over participant identifiers
    #[arg(long)]
    search: Option<String>,

    /// Limit the number of returned insights
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct GetArgs {
    /// Insight id
    id: String,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Type name to generate a schema for
    name: Option<String>,

    /// List available schema types
    #[arg(long)]
    list: bool,
}

fn parse_kind(s: &str) -> Result<InsightKind, String> {
    match s {
        "burst_correlation" | "burst" => Ok(InsightKind::BurstCorrelation),
        "lead_lag" => Ok(InsightKind::LeadLag),
        "pmi_cooccurrence" | "pmi" => Ok(InsightKind::PmiCooccurrence),
        "change_attribution" => Ok(InsightKind::ChangeAttribution),
        _ => Err(format!(
            "unknown kind '{s}' (expected burst_correlation, lead_lag, pmi_cooccurrence, change_attribution)"
        )),
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.global.quiet {
        "error"
    } else {
        match cli.global.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let format = cli.global.log_jsonl.then_some(LogFormat::Jsonl);
    init_logging(&LogConfig::from_env(format, Some(level)));

    std::process::exit(execute(cli));
}

fn load_pipeline_config(global: &GlobalOpts) -> Result<PipelineConfig, ConfigError> {
    let mut config = load_config(global.config.as_deref())?;
    if let Some(source) = &global.source {
        config.source = source.clone();
    }
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("serialization failed: {e}"),
    }
}

fn print_error(err: &st_common::Error) {
    println!("{}", StructuredError::from(err).to_json());
}

/// Build a store and run one full ingestion pass over the source.
fn ingest_once(config: &PipelineConfig) -> (InsightStore, st_core::CycleOutcome) {
    let store = InsightStore::new(config.thresholds.clone(), SeverityContext::default());
    let mut reader = SourceReader::new(&config.source);
    let outcome = run_cycle(&store, &mut reader, config.bucket_size);
    (store, outcome)
}

fn execute(cli: Cli) -> i32 {
    let config = match load_pipeline_config(&cli.global) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration rejected");
            print_error(&st_common::Error::Config(e.to_string()));
            return EXIT_CONFIG;
        }
    };

    match cli.command {
        Commands::Run => {
            let (_store, outcome) = ingest_once(&config);
            print_json(&outcome);
            if outcome.degraded() {
                EXIT_ERROR
            } else {
                EXIT_OK
            }
        }

        Commands::Watch(args) => {
            let interval = args.interval.unwrap_or(config.poll_interval_secs);
            let store = Arc::new(InsightStore::new(
                config.thresholds.clone(),
                SeverityContext::default(),
            ));
            let reader = SourceReader::new(&config.source);
            let shutdown = Arc::new(AtomicBool::new(false));
            tracing::info!(
                source = %config.source.display(),
                interval_secs = interval,
                "watch started"
            );
            let mut poller = Poller::new(
                store,
                reader,
                Duration::from_secs(interval),
                config.bucket_size,
                shutdown,
            );
            poller.run();
            EXIT_OK
        }

        Commands::Query(args) => {
            let (store, _outcome) = ingest_once(&config);
            let filter = InsightFilter {
                kind: args.kind,
                min_correlation: args.min_correlation,
                min_support: args.min_support,
                min_aligned_bursts: args.min_aligned_bursts,
                min_pmi_score: args.min_pmi_score,
                significant_only: args.significant_only,
                cluster: args.cluster,
                namespace: args.namespace,
                text_search: args.search,
                bucket_size: Some(config.bucket_size),
            };
            let snapshot = store.snapshot();
            let (mut items, summary) = query::list_insights(&snapshot, &filter);
            if let Some(limit) = args.limit {
                items.truncate(limit);
            }
            print_json(&serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "items": items,
                "summary": summary,
            }));
            EXIT_OK
        }

        Commands::Get(args) => {
            let (store, _outcome) = ingest_once(&config);
            let snapshot = store.snapshot();
            let id = InsightId::from(args.id.as_str());
            match query::get_insight(&snapshot, &id) {
                Some(insight) => {
                    print_json(&insight);
                    EXIT_OK
                }
                None => {
                    print_error(&st_common::Error::InsightNotFound { id: args.id });
                    EXIT_NOT_FOUND
                }
            }
        }

        Commands::Stats => {
            let (store, _outcome) = ingest_once(&config);
            let stats = query::aggregate_stats(&store.snapshot(), chrono::Utc::now());
            match cli.global.format {
                OutputFormat::Summary => {
                    let total: usize = stats.per_kind_counts.values().sum();
                    println!(
                        "{total} unique insights, {:.0}% significant, {} sparse{}",
                        stats.significance_rate * 100.0,
                        stats.sparse_count,
                        if stats.degraded { ", source degraded" } else { "" }
                    );
                }
                _ => print_json(&stats),
            }
            EXIT_OK
        }

        Commands::Check => {
            // load_pipeline_config already validated; report what is active.
            print_json(&serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "valid": true,
                "source": config.source,
                "poll_interval_secs": config.poll_interval_secs,
                "bucket_size": config.bucket_size,
                "thresholds": config.thresholds,
            }));
            EXIT_OK
        }

        Commands::Schema(args) => {
            if args.list || args.name.is_none() {
                let listing: Vec<_> = st_core::schema::available_schemas()
                    .into_iter()
                    .map(|(name, description)| serde_json::json!({"name": name, "description": description}))
                    .collect();
                print_json(&listing);
                return EXIT_OK;
            }
            let name = args.name.unwrap();
            match st_core::schema::schema_json(&name) {
                Some(schema) => {
                    print_json(&schema);
                    EXIT_OK
                }
                None => {
                    eprintln!("unknown schema type: {name} (try --list)");
                    EXIT_ERROR
                }
            }
        }

        Commands::Version => {
            print_json(&serde_json::json!({
                "name": "st-core",
                "version": env!("CARGO_PKG_VERSION"),
                "schema_version": SCHEMA_VERSION,
            }));
            EXIT_OK
        }
    }
}
