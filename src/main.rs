use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use boltmark::core::db::{InspectionDb, InspectionRepository};
use boltmark::core::inspect_and_record;
use boltmark::detection::annotate::save_annotated;
use boltmark::{AlignmentPolicy, InspectionResult, Inspector, StrategyConfig, load_image};

#[derive(Parser)]
#[command(name = "boltmark")]
#[command(about = "Check torque paint marks on bolts and nuts")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect a single image
    Inspect(InspectArgs),
    /// Show recorded inspections, newest first
    History {
        /// Inspection database
        #[arg(long, value_name = "FILE")]
        db: PathBuf,
    },
}

#[derive(clap::Args)]
struct InspectArgs {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Preset used when no --config is given
    #[arg(long, value_enum, default_value_t = Strategy::Edge)]
    strategy: Strategy,

    /// Alignment rule
    #[arg(long, value_enum)]
    policy: Option<Policy>,

    /// Load the strategy from a JSON file instead of a preset
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Write a copy of the image with regions and segments drawn on it
    #[arg(long, value_name = "FILE")]
    annotate: Option<PathBuf>,

    /// Inspection database to record into
    #[arg(long, value_name = "FILE", requires = "record")]
    db: Option<PathBuf>,

    /// Store the image and result in --db
    #[arg(long, requires = "db")]
    record: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Edge,
    Gradient,
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    Angle,
    Axis,
}

impl Policy {
    fn to_alignment(self) -> AlignmentPolicy {
        match self {
            Policy::Angle => AlignmentPolicy::default(),
            Policy::Axis => AlignmentPolicy::AxisAligned { tolerance_px: 10 },
        }
    }
}

/// Uploaded copies live next to the database
fn uploads_dir(db: &std::path::Path) -> PathBuf {
    db.with_extension("uploads")
}

fn load_config(args: &InspectArgs) -> anyhow::Result<StrategyConfig> {
    let mut config = match &args.config {
        Some(path) => StrategyConfig::from_json_file(path)?,
        None => match args.strategy {
            Strategy::Edge => StrategyConfig::edge(),
            Strategy::Gradient => StrategyConfig::gradient(),
        },
    };
    if let Some(policy) = args.policy {
        config = config.with_alignment(policy.to_alignment());
    }
    Ok(config)
}

async fn run_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    debug!(?config, "strategy loaded");

    let mut inspector = Inspector::new(config)?;
    if let Some(debug_dir) = args.debug_out.clone() {
        inspector = inspector.with_debug(debug_dir)?;
    }

    let (reports, record) = match args.db.as_deref().filter(|_| args.record) {
        Some(db_file) => {
            let db = InspectionDb::open(db_file, uploads_dir(db_file)).await?;
            let recorded = inspect_and_record(&db, &inspector, args.image_path.clone()).await;
            db.close().await;
            let recorded = recorded?;
            (recorded.reports, Some(recorded.record))
        }
        None => {
            let img = load_image(&args.image_path)?;
            debug!(width = img.width(), height = img.height(), "image loaded");
            (inspector.inspect_regions(&img)?, None)
        }
    };
    let result = InspectionResult::aggregate(reports.iter().map(|r| r.label));

    for (i, report) in reports.iter().enumerate() {
        let bbox = report.region.bbox;
        println!(
            "Bolt {}: {} at ({}, {}) {}x{}, {} segment(s)",
            i + 1,
            report.label,
            bbox.x,
            bbox.y,
            bbox.width,
            bbox.height,
            report.segments.len()
        );
    }
    if reports.is_empty() {
        println!("No bolts detected.");
    }
    println!("{}", result.to_json()?);

    if let Some(path) = &args.annotate {
        let img = load_image(&args.image_path)?;
        save_annotated(&img, &reports, path)?;
    }
    if let Some(record) = record {
        println!("Recorded inspection #{}", record.id);
    }

    Ok(())
}

async fn run_history(db_file: PathBuf) -> anyhow::Result<()> {
    let db = InspectionDb::open_existing(&db_file, uploads_dir(&db_file)).await?;
    let records = db.get_inspections().await?;
    if records.is_empty() {
        println!("No inspections recorded.");
    }
    for record in &records {
        println!(
            "#{} {} {} {}",
            record.id,
            record.timestamp.format(&Rfc3339)?,
            record.result.to_json()?,
            record.image_path.display()
        );
    }
    db.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    boltmark::init_tracing(if args.verbose { "debug" } else { "warn" });

    match args.command {
        Command::Inspect(inspect_args) => run_inspect(inspect_args).await,
        Command::History { db } => run_history(db).await,
    }
}
