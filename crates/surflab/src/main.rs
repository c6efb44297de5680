//! Command-line entry point.
//!
//! Thin glue: parse arguments, open a labeling session, report what was
//! recovered, and shut down cleanly. The interactive render loop attaches
//! through the library API; image-import options are accepted for
//! compatibility and logged, the import itself runs elsewhere.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use surflab::{default_patches, load_patches, Labeler, LabelerConfig};

#[derive(Parser, Debug)]
#[command(name = "surflab", version, about = "Out-of-core surfel scene labeler")]
struct Args {
    /// Scene directory.
    scene: PathBuf,

    /// Pixel database path (import handled externally; logged only).
    database: Option<PathBuf>,

    /// Edit history journal file. Without it, edits do not survive a
    /// crash.
    #[arg(long)]
    history: Option<PathBuf>,

    /// Directory for full-state snapshots.
    #[arg(long)]
    snapshot_directory: Option<PathBuf>,

    /// Alternate pixel database (import handled externally; logged only).
    #[arg(long)]
    pixel_database: Option<PathBuf>,

    /// Image directory (import handled externally; logged only).
    #[arg(long)]
    image_directory: Option<PathBuf>,

    /// Depth scale applied during image import.
    #[arg(long, default_value_t = 2000.0)]
    depth_scale: f64,

    /// Depth exponent applied during image import.
    #[arg(long, default_value_t = 0.5)]
    depth_exponent: f64,

    /// Cap on imported images.
    #[arg(long)]
    max_images: Option<usize>,

    /// Focus-driven multiresolution refinement.
    #[arg(long)]
    multiresolution: bool,

    /// Dynamic (focus-driven) block residency instead of eager load.
    #[arg(long)]
    dynamic_cache: bool,

    /// Dynamic-cache memory ceiling in bytes.
    #[arg(long)]
    memory_ceiling: Option<u64>,

    /// JSON file of label flag patches, replacing the built-in table.
    #[arg(long)]
    flag_patches: Option<PathBuf>,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "surflab=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("surflab: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    for (name, path) in [
        ("database", &args.database),
        ("pixel_database", &args.pixel_database),
        ("image_directory", &args.image_directory),
    ] {
        if let Some(path) = path {
            tracing::info!(
                source = name,
                path = %path.display(),
                depth_scale = args.depth_scale,
                depth_exponent = args.depth_exponent,
                max_images = args.max_images,
                "image import is handled externally; option recorded"
            );
        }
    }

    let flag_patches = match &args.flag_patches {
        Some(path) => load_patches(path)
            .with_context(|| format!("reading flag patches from {}", path.display()))?,
        None => default_patches(),
    };

    let config = LabelerConfig {
        history: args.history,
        snapshot_directory: args.snapshot_directory,
        dynamic_cache: args.dynamic_cache,
        multiresolution: args.multiresolution,
        memory_ceiling: args.memory_ceiling,
        flag_patches,
        ..Default::default()
    };

    let labeler = Labeler::open(&args.scene, config)
        .with_context(|| format!("opening scene {}", args.scene.display()))?;

    tracing::info!(
        session = %labeler.session().short(),
        blocks = labeler.cache().working_set().len(),
        labels = labeler.labels().len(),
        edits = labeler.journal().len(),
        durable = labeler.is_durable(),
        "session ready"
    );

    labeler.terminate().context("shutting down session")?;
    Ok(())
}
