//! Cuenca CLI - watershed delineation on drainage networks

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cuenca_algorithms::hydrology::{ancestors, DelineateParams};
use cuenca_algorithms::vector::centroid;
use cuenca_core::io::{
    read_catchments, read_flow_table, read_queries, FlowTableOptions, ResultRecord, ResultStatus,
    ResultWriter,
};
use cuenca_core::{GeometryStore, NetworkGraph, NodeKey};
use cuenca_parallel::{
    BatchItem, BatchOutcome, BatchRunner, BatchTally, ProcessingMode, QueryPoint,
};
use geo::Geometry;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cuenca")]
#[command(author, version, about = "Watershed delineation on drainage networks", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Treat segment ids as text instead of integers
    #[arg(long, global = true)]
    text_ids: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a drainage network
    Info {
        #[command(flatten)]
        network: NetworkArgs,
        /// Catchment polygons (JSON) to check coverage against
        #[arg(long)]
        catchments: Option<PathBuf>,
    },
    /// List every segment upstream of a segment
    Upstream {
        #[command(flatten)]
        network: NetworkArgs,
        /// Segment id
        segment: String,
    },
    /// Delineate the watershed of every query point
    Delineate {
        #[command(flatten)]
        network: NetworkArgs,
        /// Catchment polygons (JSON array of {id, geometry})
        catchments: PathBuf,
        /// Query points (CSV with label,source)
        queries: PathBuf,
        /// Output file (JSON lines)
        output: PathBuf,
        /// Worker threads (0 = all cores, 1 = sequential)
        #[arg(short, long)]
        threads: Option<usize>,
        /// Match ratio below which a partial coverage warning is emitted
        #[arg(long, default_value = "1.0")]
        coverage_threshold: f64,
        /// Write watershed centroids instead of polygons
        #[arg(long)]
        as_points: bool,
        /// Write results in query order instead of completion order
        #[arg(long)]
        ordered: bool,
    },
}

#[derive(Args)]
struct NetworkArgs {
    /// Flow table (CSV)
    flowtable: PathBuf,
    /// Segment id column
    #[arg(long, default_value = "comid")]
    id_column: String,
    /// Downstream segment id column
    #[arg(long, default_value = "tocomid")]
    to_column: String,
    /// Downstream id marking a flow that leaves the network
    #[arg(long, default_value = "0")]
    terminal_id: String,
}

impl NetworkArgs {
    fn options(&self) -> FlowTableOptions {
        FlowTableOptions {
            id_column: self.id_column.clone(),
            to_column: self.to_column.clone(),
            sentinel: self.terminal_id.clone(),
        }
    }
}

/// Everything a segment id type must support to go through the CLI
trait SegmentId: NodeKey + FromStr + DeserializeOwned {}

impl SegmentId for i64 {}
impl SegmentId for String {}

struct DelineateArgs {
    catchments: PathBuf,
    queries: PathBuf,
    output: PathBuf,
    threads: Option<usize>,
    coverage_threshold: f64,
    as_points: bool,
    ordered: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set default subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} query points ({eta})")
    {
        pb.set_style(style);
    }
    pb
}

fn read_network<K: SegmentId>(network: &NetworkArgs) -> Result<NetworkGraph<K>>
where
    <K as FromStr>::Err: Display,
{
    let pb = spinner("Reading flow table...");
    let graph = read_flow_table(&network.flowtable, &network.options())
        .with_context(|| format!("Failed to read flow table {}", network.flowtable.display()))?;
    pb.finish_and_clear();
    Ok(graph)
}

fn read_store<K: SegmentId>(path: &Path) -> Result<GeometryStore<K>>
where
    <K as FromStr>::Err: Display,
{
    let pb = spinner("Reading catchments...");
    let store = read_catchments(path)
        .with_context(|| format!("Failed to read catchments {}", path.display()))?;
    pb.finish_and_clear();
    Ok(store)
}

fn parse_segment<K: SegmentId>(s: &str) -> Result<K>
where
    <K as FromStr>::Err: Display,
{
    s.parse::<K>()
        .map_err(|e| anyhow::anyhow!("Invalid segment id '{}': {}", s, e))
}

fn to_record<K: NodeKey>(item: BatchItem<String, K>, as_points: bool) -> ResultRecord {
    let source = item.query.source.as_ref().map(|s| s.to_string());
    match item.outcome {
        BatchOutcome::Delineated(ws) => {
            let area = ws.area();
            let geometry = if as_points {
                centroid(&ws.geometry).map(Geometry::Point)
            } else if ws.is_empty() {
                None
            } else {
                Some(Geometry::MultiPolygon(ws.geometry))
            };
            ResultRecord {
                match_ratio: Some(ws.match_ratio),
                matched_count: Some(ws.matched_count),
                upstream_count: Some(ws.upstream_count),
                area: Some(area),
                geometry,
                ..ResultRecord::bare(item.query.label, source, ResultStatus::Delineated)
            }
        }
        BatchOutcome::Unresolved => {
            ResultRecord::bare(item.query.label, source, ResultStatus::Unresolved)
        }
        BatchOutcome::Failed(e) => ResultRecord {
            error: Some(e.to_string()),
            ..ResultRecord::bare(item.query.label, source, ResultStatus::Failed)
        },
        BatchOutcome::Cancelled => {
            ResultRecord::bare(item.query.label, source, ResultStatus::Cancelled)
        }
    }
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Commands ───────────────────────────────────────────────────────────

fn show_info<K: SegmentId>(network: &NetworkArgs, catchments: Option<&Path>) -> Result<()>
where
    <K as FromStr>::Err: Display,
{
    let graph: NetworkGraph<K> = read_network(network)?;
    let stats = graph.stats();

    println!("File: {}", network.flowtable.display());
    println!("Segments: {}", stats.nodes);
    println!("Flow links: {}", stats.edges);
    println!("Terminal segments: {}", stats.terminal_rows);
    println!("Segments only seen downstream: {}", stats.implicit_nodes);
    if stats.self_loops > 0 || stats.duplicate_edges > 0 {
        println!(
            "Inert: {} self-loops, {} duplicate links",
            stats.self_loops, stats.duplicate_edges
        );
    }

    if let Some(path) = catchments {
        let store: GeometryStore<K> = read_store(path)?;
        let covered = graph.nodes().filter(|id| store.contains(id)).count();
        println!("\nCatchments: {}", path.display());
        println!("Polygons: {}", store.len());
        println!("Degenerate polygons dropped: {}", store.degenerate_count());
        println!(
            "Network coverage: {} of {} segments ({:.1}%)",
            covered,
            stats.nodes,
            if stats.nodes == 0 {
                0.0
            } else {
                100.0 * covered as f64 / stats.nodes as f64
            }
        );
    }
    Ok(())
}

fn show_upstream<K: SegmentId>(network: &NetworkArgs, segment: &str) -> Result<()>
where
    <K as FromStr>::Err: Display,
{
    let graph: NetworkGraph<K> = read_network(network)?;
    let segment: K = parse_segment(segment)?;

    let mut ids: Vec<K> = ancestors(&segment, &graph)
        .with_context(|| format!("Failed to trace upstream of {}", segment))?
        .into_iter()
        .collect();
    ids.sort();

    info!("{} segments upstream of {}", ids.len(), segment);
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

fn run_delineate<K: SegmentId>(network: &NetworkArgs, args: DelineateArgs) -> Result<()>
where
    <K as FromStr>::Err: Display,
{
    let graph: NetworkGraph<K> = read_network(network)?;
    let store: GeometryStore<K> = read_store(&args.catchments)?;
    let queries: Vec<QueryPoint<String, K>> = read_queries(&args.queries)
        .with_context(|| format!("Failed to read query points {}", args.queries.display()))?
        .into_iter()
        .map(|q| QueryPoint {
            label: q.label,
            source: q.source,
        })
        .collect();

    let mode = ProcessingMode::from_threads(args.threads);
    info!(
        "Delineating {} query points on {} thread(s)",
        queries.len(),
        mode.threads()
    );

    let runner = BatchRunner::new(Arc::new(graph), Arc::new(store))
        .with_params(DelineateParams {
            coverage_threshold: args.coverage_threshold,
        })
        .context("Invalid delineation parameters")?
        .with_mode(mode);

    let start = Instant::now();
    let mut writer = ResultWriter::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut tally = BatchTally::default();

    if args.ordered {
        let report = runner.run(queries).context("Batch failed")?;
        for item in report.items {
            writer
                .write(&to_record(item, args.as_points))
                .context("Failed to write result")?;
        }
        tally = report.tally;
    } else {
        let pb = progress(queries.len());
        let mut stream = runner.stream(queries);
        for item in stream.by_ref() {
            tally.record(&item.outcome);
            writer
                .write(&to_record(item, args.as_points))
                .context("Failed to write result")?;
            pb.inc(1);
        }
        pb.finish_and_clear();
        stream.finish().context("Batch failed")?;
        tally.log();
    }

    let written = writer.finish().context("Failed to write output")?;
    if written != tally.total {
        warn!("{} results written for {} query points", written, tally.total);
    }
    let elapsed = start.elapsed();

    println!("{}", tally);
    done("Watersheds", &args.output, elapsed);
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info {
            network,
            catchments,
        } => {
            if cli.text_ids {
                show_info::<String>(&network, catchments.as_deref())
            } else {
                show_info::<i64>(&network, catchments.as_deref())
            }
        }
        Commands::Upstream { network, segment } => {
            if cli.text_ids {
                show_upstream::<String>(&network, &segment)
            } else {
                show_upstream::<i64>(&network, &segment)
            }
        }
        Commands::Delineate {
            network,
            catchments,
            queries,
            output,
            threads,
            coverage_threshold,
            as_points,
            ordered,
        } => {
            let args = DelineateArgs {
                catchments,
                queries,
                output,
                threads,
                coverage_threshold,
                as_points,
                ordered,
            };
            if cli.text_ids {
                run_delineate::<String>(&network, args)
            } else {
                run_delineate::<i64>(&network, args)
            }
        }
    }
}
