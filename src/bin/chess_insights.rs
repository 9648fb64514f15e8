use chess_insights::{
    add_context, AnalysisConfig, InsightsReport, PerspectivePolicy, PgnSources, Pipeline,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Per-account performance insights from PGN archives",
    long_about = None
)]
struct Args {
    /// PGN files to analyze, read in the given order
    #[arg(required = true)]
    pgn: Vec<PathBuf>,

    /// JSON configuration file (missing keys take their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tracked account name; repeat for several. Replaces the configured list.
    #[arg(short, long = "identity")]
    identities: Vec<String>,

    /// Gap in hours after which a new session starts
    #[arg(long)]
    session_gap_hours: Option<f64>,

    /// Count a game between two tracked accounts only for White
    #[arg(long)]
    first_match_only: bool,

    /// Write the enriched table as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the enriched table as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the text report to a file instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };
    if !args.identities.is_empty() {
        config.tracked_identities = args.identities.clone();
    }
    if let Some(hours) = args.session_gap_hours {
        config.session_gap_hours = hours;
    }
    if args.first_match_only {
        config.perspective = PerspectivePolicy::FirstMatch;
    }
    let pipeline = Pipeline::from_config(&config)?;

    println!("♟️  Chess Insights");
    println!("=================");
    println!();
    println!("Configuration:");
    println!("  • Tracked identities: {}", config.tracked_identities.join(", "));
    println!("  • Session gap: {}h", config.session_gap_hours);
    println!("  • Perspective: {:?}", config.perspective);
    for path in &args.pgn {
        println!("  • Input: {}", path.display());
    }
    println!();

    let sources = PgnSources::from_paths(&args.pgn)?;

    let start_time = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {pos} games read {msg}",
    )?);
    pb.enable_steady_tick(Duration::from_millis(120));

    let games = sources.inspect(|_| pb.inc(1));
    let (table, stats) = pipeline.run(games);
    pb.finish_with_message("done");

    println!();
    println!("✅ Extraction complete in {:.2}s", start_time.elapsed().as_secs_f64());
    println!("  • Games read: {}", stats.entries_seen);
    println!("  • Without a tracked player: {}", stats.entries_untracked);
    println!("  • Malformed and skipped: {}", stats.entries_failed);
    println!("  • Records: {}", stats.records_emitted);
    println!();

    if let Some(path) = &args.csv {
        let file = File::create(path)?;
        add_context!(
            table.write_csv(BufWriter::new(file)),
            format!("While writing CSV table to {}", path.display())
        )?;
        info!("Wrote CSV table to {}", path.display());
    }
    if let Some(path) = &args.json {
        let file = File::create(path)?;
        add_context!(
            table.write_json(BufWriter::new(file)),
            format!("While writing JSON table to {}", path.display())
        )?;
        info!("Wrote JSON table to {}", path.display());
    }

    let report = InsightsReport::build(&table, &config.report).render();
    match &args.report {
        Some(path) => {
            std::fs::write(path, report)?;
            println!("📄 Report written to {}", path.display());
        }
        None => print!("{report}"),
    }

    Ok(())
}
