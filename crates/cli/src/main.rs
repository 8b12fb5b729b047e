use anyhow::{Context, Result, bail};
use cache::{Clock, MemoryStore, SystemClock};
use catalog::{Platform, TrackCatalog, TrackRecord};
use clap::{Parser, Subcommand};
use colored::Colorize;
use matcher::{LayerResult, MatchResult, RankedMatch};
use rand::Rng;
use server::{ConfigOverrides, MatchConfig, MatchOrchestrator, TrackMatch};
use sources::CatalogSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

/// song-match - explainable song similarity scoring
#[derive(Parser)]
#[command(name = "song-match")]
#[command(about = "Compare songs by audio features and metadata", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "SONG_MATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Record file with the track catalog
    #[arg(long, env = "SONG_MATCH_CATALOG")]
    catalog: Option<PathBuf>,

    /// Seconds between background sweeps of expired source entries
    #[arg(long, env = "SONG_MATCH_SWEEP_INTERVAL")]
    sweep_interval: Option<u64>,

    /// Platform the track ids belong to
    #[arg(short, long, default_value = "spotify")]
    platform: Platform,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score two tracks against each other
    Compare {
        id_a: String,
        id_b: String,

        /// Recompute even if a cached result exists
        #[arg(long)]
        no_cache: bool,

        /// Show every compared feature
        #[arg(long)]
        breakdown: bool,
    },

    /// Search the catalog by title or artist
    Search {
        query: String,

        #[arg(long, default_value = "20")]
        limit: usize,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Rank search hits by similarity to a seed track
    Similar {
        /// Seed track id
        id: String,

        /// Search query selecting the candidates
        #[arg(long)]
        query: String,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Compare random pairs, then show what the caches hold
    Stats {
        /// Random pairs to compare first
        #[arg(long, default_value = "50")]
        warm: usize,
    },

    /// Measure match latency over random pairs while the sweeper runs
    Benchmark {
        /// Number of comparisons to run
        #[arg(long, default_value = "1000")]
        requests: usize,

        /// Maximum comparisons in flight
        #[arg(long, default_value = "16")]
        concurrent: usize,

        /// Bypass the result cache
        #[arg(long)]
        no_cache: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        catalog_path: cli.catalog.clone(),
        sweep_interval_secs: cli.sweep_interval,
        ..Default::default()
    };
    let config = MatchConfig::load(cli.config.as_deref(), &overrides).context("Invalid configuration")?;

    println!("Loading catalog from {}...", config.catalog_path.display());
    let start = Instant::now();
    let catalog = Arc::new(
        TrackCatalog::load_from_file(&config.catalog_path).context("Failed to load track catalog")?,
    );
    println!("{} Loaded {} tracks in {:?}", "✓".green(), catalog.len(), start.elapsed());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let source = Arc::new(CatalogSource::new(catalog.clone()));
    let orchestrator = MatchOrchestrator::new(&config, store, source, clock);

    match cli.command {
        Commands::Compare {
            id_a,
            id_b,
            no_cache,
            breakdown,
        } => handle_compare(&orchestrator, cli.platform, &id_a, &id_b, no_cache, breakdown).await?,
        Commands::Search { query, limit, offset } => handle_search(&orchestrator, &query, limit, offset).await?,
        Commands::Similar { id, query, limit } => {
            handle_similar(&orchestrator, cli.platform, &id, &query, limit).await?
        }
        Commands::Stats { warm } => handle_stats(&orchestrator, &catalog, warm).await?,
        Commands::Benchmark {
            requests,
            concurrent,
            no_cache,
        } => {
            handle_benchmark(orchestrator, &catalog, requests, concurrent, no_cache, config.sweep_interval()).await?
        }
    }

    Ok(())
}

/// Handle the 'compare' command
async fn handle_compare(
    orchestrator: &MatchOrchestrator,
    platform: Platform,
    id_a: &str,
    id_b: &str,
    no_cache: bool,
    breakdown: bool,
) -> Result<()> {
    let matched = orchestrator.match_tracks(platform, id_a, id_b, no_cache).await?;
    print_match(&matched, breakdown);
    Ok(())
}

/// Handle the 'search' command
async fn handle_search(orchestrator: &MatchOrchestrator, query: &str, limit: usize, offset: usize) -> Result<()> {
    let hits = orchestrator.source_cache().search(query, limit, offset).await?;

    println!("{}", format!("Search results for '{}':", query).bold().blue());
    if hits.is_empty() {
        println!("  (no matches)");
    }
    for record in &hits {
        print_record_line(record);
    }
    Ok(())
}

/// Handle the 'similar' command
async fn handle_similar(
    orchestrator: &MatchOrchestrator,
    platform: Platform,
    id: &str,
    query: &str,
    limit: usize,
) -> Result<()> {
    let ranked = orchestrator.similar_tracks(platform, id, query, limit).await?;

    println!("{}", format!("Tracks most similar to {}:{}", platform, id).bold().blue());
    print_ranked(&ranked);
    Ok(())
}

/// Handle the 'stats' command
async fn handle_stats(orchestrator: &MatchOrchestrator, catalog: &TrackCatalog, warm: usize) -> Result<()> {
    // Caches live in this process only, so there is nothing to report without traffic
    if warm == 0 {
        bail!("Stats needs at least one warm-up comparison");
    }
    let pairs = random_pairs(catalog, warm)?;
    for (a, b) in &pairs {
        orchestrator.match_tracks(a.0, &a.1, &b.1, false).await?;
    }
    // Result writes land in the background
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("{} Compared {} random pairs", "✓".green(), pairs.len());

    print_stats(orchestrator).await
}

async fn print_stats(orchestrator: &MatchOrchestrator) -> Result<()> {
    let stats = orchestrator.stats().await?;
    println!("{}", "Result cache".bold().blue());
    println!("{}Entries: {}", "• ".green(), stats.results.entries);
    println!(
        "{}Approx. size: {} bytes (sampled {})",
        "• ".green(),
        stats.results.approx_bytes,
        stats.results.sampled
    );
    println!(
        "{}Oldest entry: {}",
        "• ".green(),
        stats.results.oldest_key.as_deref().unwrap_or("-")
    );
    println!("{}", "Source cache".bold().blue());
    println!("{}Entries: {}", "• ".cyan(), stats.sources.total);
    println!("{}Expired: {}", "• ".cyan(), stats.sources.expired);
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    orchestrator: MatchOrchestrator,
    catalog: &TrackCatalog,
    requests: usize,
    concurrent: usize,
    no_cache: bool,
    sweep_interval: Duration,
) -> Result<()> {
    if requests == 0 {
        bail!("Benchmark needs at least one request");
    }
    let pairs = random_pairs(catalog, requests)?;
    let sweeper = orchestrator.spawn_sweeper(sweep_interval);
    let limiter = Arc::new(Semaphore::new(concurrent.max(1)));

    let wall = Instant::now();
    let mut handles = Vec::with_capacity(pairs.len());
    for ((platform, id_a), (_, id_b)) in pairs {
        let orchestrator = orchestrator.clone();
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            let _permit = limiter.acquire_owned().await?;
            let start = Instant::now();
            orchestrator.match_tracks(platform, &id_a, &id_b, no_cache).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings = Vec::with_capacity(handles.len());
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall = wall.elapsed();
    sweeper.abort();
    debug!("Collected {} timings", timings.len());

    timings.sort();
    let total: Duration = timings.iter().sum();
    let average = total / timings.len() as u32;
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} in flight)", timings.len(), concurrent.max(1));
    println!("Wall time: {:?}", wall);
    println!("Average latency: {:?}", average);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} matches/second", timings.len() as f64 / wall.as_secs_f64());

    print_stats(&orchestrator).await
}

type TrackRef = (Platform, String);

/// Random pairs of distinct tracks from the same platform
fn random_pairs(catalog: &TrackCatalog, count: usize) -> Result<Vec<(TrackRef, TrackRef)>> {
    let tracks: Vec<&TrackRecord> = catalog.iter().collect();
    if tracks.len() < 2 {
        bail!("Catalog needs at least two tracks, found {}", tracks.len());
    }

    let mut rng = rand::rng();
    let mut pairs = Vec::with_capacity(count);
    let mut attempts = 0;
    while pairs.len() < count {
        attempts += 1;
        if attempts > count * 100 {
            bail!("Could not find {} same-platform track pairs", count);
        }
        let a = tracks[rng.random_range(0..tracks.len())];
        let b = tracks[rng.random_range(0..tracks.len())];
        if a.platform != b.platform || a.id == b.id {
            continue;
        }
        pairs.push(((a.platform, a.id.clone()), (b.platform, b.id.clone())));
    }
    Ok(pairs)
}

fn colored_score(score: u8) -> colored::ColoredString {
    let text = format!("{:>3}", score);
    match score {
        80..=100 => text.green().bold(),
        60..=79 => text.yellow().bold(),
        40..=59 => text.yellow(),
        _ => text.red(),
    }
}

fn print_record_line(record: &TrackRecord) {
    let features = &record.features;
    println!(
        "{}:{} {} [{}] {:.0} BPM, {}",
        record.platform,
        record.id.dimmed(),
        record.display_name(),
        features.genres.join(", "),
        features.tempo,
        features.key_name()
    );
}

fn print_match(matched: &TrackMatch, breakdown: bool) {
    let result = &matched.result;
    println!(
        "{} {} vs {}",
        "Match:".bold().blue(),
        matched.track_a.display_name(),
        matched.track_b.display_name()
    );
    println!(
        "Score: {} / 100   confidence {:.0}%   ({:?}, {})",
        colored_score(result.overall_score),
        result.confidence * 100.0,
        result.processing_time,
        result.algorithm_version
    );
    println!(
        "Layers: audio {:.2}  musical {:.2}  metadata {:.2}",
        result.breakdown.layer1.score, result.breakdown.layer2.score, result.breakdown.layer3.score
    );
    print_explanation(result);

    if breakdown {
        print_layer("Audio", &result.breakdown.layer1);
        print_layer("Musical", &result.breakdown.layer2);
        print_layer("Metadata", &result.breakdown.layer3);
    }
}

fn print_explanation(result: &MatchResult) {
    let explanation = &result.explanation;
    println!("\n{}", explanation.summary.bold());
    for strength in &explanation.strengths {
        println!("  {} {}", "+".green(), strength);
    }
    for weakness in &explanation.weaknesses {
        println!("  {} {}", "-".red(), weakness);
    }
    let details = &explanation.details;
    for line in [&details.mood, &details.rhythm, &details.harmony, &details.style] {
        println!("  {}", line.dimmed());
    }
}

fn print_layer(name: &str, layer: &LayerResult) {
    println!("\n{} {:.3}", format!("{} layer", name).bold(), layer.score);
    for (feature, component) in &layer.components {
        println!(
            "  {:<16} {:.3} x {:.2}   {} | {}",
            feature, component.similarity, component.weight, component.value_a, component.value_b
        );
    }
}

fn print_ranked(ranked: &[RankedMatch]) {
    if ranked.is_empty() {
        println!("  (no candidates)");
    }
    for (rank, candidate) in ranked.iter().enumerate() {
        println!(
            "{}. {} {}:{} {}  {}",
            (rank + 1).to_string().green(),
            colored_score(candidate.result.overall_score),
            candidate.platform,
            candidate.id.dimmed(),
            candidate.title,
            candidate.result.explanation.summary.dimmed()
        );
    }
}
