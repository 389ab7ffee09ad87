use anyhow::Result;
use clap::Parser;
use community_graph_analyzer::cluster::metrics::ranked_members;
use community_graph_analyzer::config::Config;
use community_graph_analyzer::pipeline::{analyze, Analysis};
use community_graph_analyzer::temporal::{compare_slices, SimilarityMode, TimeSlice};
use community_graph_analyzer::{data, storage, viz};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "community-graph-analyzer",
    about = "Community analysis of retweet and mention networks"
)]
struct Cli {
    /// Path to input CSV of (author, text[, timestamp]) rows
    #[clap(long)]
    input: PathBuf,

    /// Later period to compare against: a records CSV or a saved .bin slice
    #[clap(long)]
    compare: Option<PathBuf>,

    /// Output directory for results
    #[clap(long, default_value = "community_results")]
    output_dir: PathBuf,

    /// JSON configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Number of largest communities to analyze (overrides config)
    #[clap(long)]
    top_communities: Option<usize>,

    /// Seed for community detection (overrides config)
    #[clap(long)]
    seed: Option<u64>,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Skip GraphML export
    #[clap(long)]
    skip_viz: bool,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

fn period_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "period".to_string())
}

/// Period labels (and output directory names) for the input and compared run.
///
/// Equal file stems are qualified with their parent directory, and the
/// compared run gets a suffix when that is not enough.
fn period_names(input: &Path, compare: &Path) -> (String, String) {
    let (earlier, later) = (period_name(input), period_name(compare));
    if earlier != later {
        return (earlier, later);
    }

    let qualified = |path: &Path, stem: &str| {
        path.parent()
            .and_then(|dir| dir.file_name())
            .map(|dir| format!("{}-{}", dir.to_string_lossy(), stem))
    };
    let names = (qualified(input, &earlier), qualified(compare, &later));
    match names {
        (Some(a), Some(b)) if a != b => (a, b),
        _ => (earlier, format!("{}-compared", later)),
    }
}

fn run_period(
    path: &Path,
    period: &str,
    config: &Config,
    output_dir: &Path,
    skip_viz: bool,
) -> Result<Analysis> {
    // Load records; malformed rows are skipped and reported
    let batch = data::load_records(path)?;
    if !batch.skipped.is_empty() {
        log::warn!("Skipped {} malformed rows in {}", batch.skipped.len(), path.display());
    }

    // Run the analysis chain for this period
    let analysis = analyze(batch, period, config)?;
    let dir = output_dir.join(period);

    // Save results
    let ranked = ranked_members(
        &analysis.slice.graph,
        &analysis.slice.partition,
        config.degree_direction,
    );
    storage::save_results(&analysis.report, &ranked, &dir)?;
    storage::save_edgelist(&analysis.slice.graph, &dir.join("edgelist.csv"), true)?;
    storage::save_slice(&analysis.slice, &dir.join("slice.bin"))?;

    // Generate visualizations if requested
    if !skip_viz {
        viz::write_graphml(
            &analysis.slice.graph,
            &analysis.slice.partition,
            &dir.join("graph.graphml"),
        )?;
    }

    Ok(analysis)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    // Set number of threads
    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    // Load configuration; command line values take precedence
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(n) = args.top_communities {
        config.top_communities = n;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;

    log::info!("Starting community analysis");
    log::info!("Input: {}", args.input.display());
    log::info!("Output: {}", args.output_dir.display());

    // Create output directory
    std::fs::create_dir_all(&args.output_dir)?;

    let (input_period, compare_period) = match &args.compare {
        Some(compare) => period_names(&args.input, compare),
        None => (period_name(&args.input), String::new()),
    };

    // 1. Analyze the input period
    let earlier = run_period(
        &args.input,
        &input_period,
        &config,
        &args.output_dir,
        args.skip_viz,
    )?;

    // 2. Compare against a later period if requested
    if let Some(compare) = &args.compare {
        let later: TimeSlice = if compare.extension().map_or(false, |ext| ext == "bin") {
            storage::load_slice(compare)?
        } else {
            run_period(
                compare,
                &compare_period,
                &config,
                &args.output_dir,
                args.skip_viz,
            )?
            .slice
        };

        let mode = SimilarityMode::InDegree {
            proportion: config.match_proportion,
        };
        let matrix = compare_slices(&earlier.slice, &later, mode)?;
        let matches = matrix.best_matches(&earlier.slice, &later, config.match_threshold)?;

        log::info!(
            "{} of {} communities in '{}' continue into '{}'",
            matches.iter().filter(|m| m.accepted).count(),
            matches.len(),
            earlier.slice.period,
            later.period
        );

        storage::save_comparison(&matrix, &matches, &args.output_dir.join("comparison.json"))?;
    }

    log::info!("Analysis complete. Results saved to {}", args.output_dir.display());

    Ok(())
}
