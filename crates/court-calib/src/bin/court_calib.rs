//! `court-calib` CLI: calibrate uploads and query a file-backed store.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use court_calib::session::{CalibrationRequest, FileStore, SessionConfig, StaticVideo, UploadId};
use court_calib::workflow::{self, parse_point, parse_size};
use court_calib::{classify_zone, OverlayConfig};
use log::LevelFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Planar court calibration for volleyball video.
#[derive(Parser)]
#[command(name = "court-calib")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Session config JSON (min box size, default label, data root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data root of the file store; overrides the config
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and store a calibration from a request JSON file
    Calibrate {
        upload: String,

        /// CalibrationRequest JSON
        #[arg(long)]
        request: PathBuf,
    },

    /// Print the stored calibration as JSON
    Show { upload: String },

    /// Map image pixels (`x,y`) to court meters
    ToCourt {
        upload: String,
        #[arg(required = true, allow_hyphen_values = true)]
        points: Vec<String>,
    },

    /// Map court meters (`u,v`) to image pixels
    ToImage {
        upload: String,
        #[arg(required = true, allow_hyphen_values = true)]
        points: Vec<String>,
    },

    /// Classify a court-space point into its zone
    #[command(allow_negative_numbers = true)]
    Zone { u: f64, v: f64 },

    /// List stored annotations with their zones
    Annotations { upload: String },

    /// Render the overlay for one video state to SVG
    Overlay {
        upload: String,

        /// Intrinsic video size, `WxH`
        #[arg(long)]
        video: String,

        /// Element box size, `WxH`; defaults to the video size
        #[arg(long = "box")]
        element: Option<String>,

        /// Playhead in seconds
        #[arg(long, default_value_t = 0.0)]
        time: f64,

        /// Overlay config JSON (colors, annotation window)
        #[arg(long)]
        overlay_config: Option<PathBuf>,

        #[arg(long)]
        out: PathBuf,
    },
}

/// `--log-level` sets the default; `RUST_LOG` directives still apply on top.
#[cfg(not(feature = "tracing"))]
fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

/// Spans of the instrumented solver and session calls, filtered by `RUST_LOG`
/// or `--log-level`.
#[cfg(feature = "tracing")]
fn init_logging(level: LevelFilter) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_points(points: &[Option<nalgebra::Point2<f64>>]) {
    for p in points {
        match p {
            Some(p) => println!("{:.6} {:.6}", p.x, p.y),
            None => println!("unmappable"),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => SessionConfig::load_json(path)?,
        None => SessionConfig::default(),
    };
    let data_root = cli.data.clone().unwrap_or_else(|| config.data_root.clone());
    log::debug!("data root {}", data_root.display());

    match cli.command {
        Commands::Calibrate { upload, request } => {
            let raw = std::fs::read_to_string(&request)?;
            let req: CalibrationRequest = serde_json::from_str(&raw)?;
            let mut store = FileStore::open(&data_root)?;
            let record = workflow::calibrate_upload(&mut store, &UploadId::new(upload), &req)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Show { upload } => {
            let store = FileStore::open(&data_root)?;
            let record = workflow::require_calibration(&store, &UploadId::new(upload))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::ToCourt { upload, points } => {
            let pts = points
                .iter()
                .map(|p| parse_point(p))
                .collect::<Result<Vec<_>, _>>()?;
            let store = FileStore::open(&data_root)?;
            print_points(&workflow::project_to_court(&store, &UploadId::new(upload), &pts)?);
        }
        Commands::ToImage { upload, points } => {
            let pts = points
                .iter()
                .map(|p| parse_point(p))
                .collect::<Result<Vec<_>, _>>()?;
            let store = FileStore::open(&data_root)?;
            print_points(&workflow::project_to_image(&store, &UploadId::new(upload), &pts)?);
        }
        Commands::Zone { u, v } => {
            println!("{}", classify_zone(u, v));
        }
        Commands::Annotations { upload } => {
            let store = FileStore::open(&data_root)?;
            for (ann, zone) in workflow::annotations_with_zones(&store, &UploadId::new(upload))? {
                let mut value = serde_json::to_value(&ann)?;
                if let (Some(zone), Some(obj)) = (zone, value.as_object_mut()) {
                    obj.insert("zone".into(), zone.to_string().into());
                }
                println!("{value}");
            }
        }
        Commands::Overlay {
            upload,
            video,
            element,
            time,
            overlay_config,
            out,
        } => {
            let [w, h] = parse_size(&video)?;
            let [bw, bh] = match element {
                Some(s) => parse_size(&s)?,
                None => [w, h],
            };
            let video = StaticVideo::new(w, h)
                .with_element(bw as f64, bh as f64)
                .at(time);
            let overlay_config = match overlay_config {
                Some(path) => OverlayConfig::load_json(path)?,
                None => OverlayConfig::default(),
            };
            let store = FileStore::open(&data_root)?;
            let svg =
                workflow::render_overlay_svg(&store, &UploadId::new(upload), &video, overlay_config)?;
            std::fs::write(&out, svg)?;
            log::info!("wrote {}", out.display());
        }
    }
    Ok(())
}
