//! campusmap: command-line front end for building-outline detection.
//!
//! Detects the building under a click on a campus map image, traces
//! outlines by hand with edge snapping, keeps named outlines in a JSON
//! area store, and renders stored outlines as SVG or PNG overlays at any
//! display size.
//!
//! # Usage
//!
//! ```text
//! campusmap detect campus.png --x 100 --y 85 --store areas.json --name "Library" --save
//! campusmap render areas.json --width 800 --height 600 --svg overlay.svg
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod file_store;
mod preview;

use std::path::{Path, PathBuf};

use campusmap_detect::geometry::vertex_centroid;
use campusmap_detect::sampler::sample;
use campusmap_detect::{
    AreaId, AreaStore, DetectConfig, Detection, Detector, PixelPoint, RenderSize, RenderedArea,
    SnapTrace, denormalize_all,
};
use campusmap_export::{OverlayStyle, SvgMetadata, to_overlay_svg, to_trace_svg};
use clap::{Args, Parser, Subcommand};
use image::RgbaImage;
use image::imageops::FilterType;

use crate::file_store::JsonFileStore;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

/// Outline buildings on raster campus maps from a single click.
#[derive(Parser)]
#[command(name = "campusmap", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the building under a click point.
    Detect(DetectArgs),

    /// Trace an outline by hand, snapping each click to the nearest edge.
    Trace(TraceArgs),

    /// Render stored areas at a display size.
    Render(RenderArgs),

    /// List stored areas.
    List {
        /// Path to the JSON area store.
        store: PathBuf,
    },
}

/// Display size and optional store shared by `detect` and `trace`.
#[derive(Args)]
struct ViewArgs {
    /// Path to the map image (PNG, JPEG, BMP, WebP).
    image: PathBuf,

    /// Rendered width in pixels. Defaults to the image's native width,
    /// or keeps the aspect ratio when only `--height` is given.
    #[arg(long)]
    width: Option<f64>,

    /// Rendered height in pixels.
    #[arg(long)]
    height: Option<f64>,

    /// Path to the JSON area store.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Area name to save the outline under.
    #[arg(long)]
    name: Option<String>,

    /// Save the outline into the store.
    #[arg(long, requires_all = ["store", "name"])]
    save: bool,

    /// Write an SVG overlay to file.
    #[arg(long)]
    svg: Option<PathBuf>,
}

#[derive(Args)]
struct DetectArgs {
    #[command(flatten)]
    view: ViewArgs,

    /// Click x in rendered pixels.
    #[arg(long, allow_negative_numbers = true)]
    x: f64,

    /// Click y in rendered pixels.
    #[arg(long, allow_negative_numbers = true)]
    y: f64,

    /// Treat light line work on a dark base as foreground.
    #[arg(long)]
    invert: bool,

    /// Simplification epsilon as a fraction of the outline perimeter.
    #[arg(long, default_value_t = DetectConfig::DEFAULT_SIMPLIFY_FACTOR)]
    simplify_factor: f64,

    /// Full detection config as a JSON string.
    ///
    /// When provided, `--invert` and `--simplify-factor` are ignored.
    /// The JSON must be a valid `DetectConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Write a PNG preview of the map with the outline painted on.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Print the detection as JSON instead of the text report.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TraceArgs {
    #[command(flatten)]
    view: ViewArgs,

    /// A click as "X,Y" in rendered pixels. Repeat for each corner.
    #[arg(long = "point", value_name = "X,Y", value_parser = parse_point, required = true)]
    points: Vec<PixelPoint>,

    /// Snap search radius in buffer pixels.
    #[arg(long, default_value_t = campusmap_detect::snap::DEFAULT_SNAP_RADIUS)]
    radius: u32,
}

#[derive(Args)]
struct RenderArgs {
    /// Path to the JSON area store.
    store: PathBuf,

    /// Rendered width in pixels.
    #[arg(long)]
    width: f64,

    /// Rendered height in pixels.
    #[arg(long)]
    height: f64,

    /// Name of the area to highlight.
    #[arg(long)]
    selected: Option<String>,

    /// Write an SVG overlay to file instead of printing JSON.
    #[arg(long)]
    svg: Option<PathBuf>,
}

/// Parse `"X,Y"` into a pixel point.
fn parse_point(s: &str) -> Result<PixelPoint, String> {
    let (x_str, y_str) = s
        .split_once(',')
        .ok_or_else(|| format!("point must be 'X,Y', got: '{s}'"))?;
    let x: f64 = x_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid point X '{x_str}': {e}"))?;
    let y: f64 = y_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid point Y '{y_str}': {e}"))?;
    Ok(PixelPoint::new(x, y))
}

/// Resolve the display size from optional flags and the native size.
///
/// With one dimension given the other follows the native aspect ratio.
fn resolve_size(
    width: Option<f64>,
    height: Option<f64>,
    native: (u32, u32),
) -> CliResult<RenderSize> {
    let (nw, nh) = (f64::from(native.0), f64::from(native.1));
    let size = match (width, height) {
        (Some(w), Some(h)) => RenderSize::new(w, h),
        (Some(w), None) => RenderSize::new(w, w * nh / nw),
        (None, Some(h)) => RenderSize::new(h * nw / nh, h),
        (None, None) => RenderSize::from_pixels(native.0, native.1),
    };
    Ok(size?)
}

/// Build a [`DetectConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual flags are ignored.
fn config_from_args(args: &DetectArgs) -> CliResult<DetectConfig> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json)
            .map_err(|e| format!("Error parsing --config-json: {e}").into());
    }
    Ok(DetectConfig {
        invert: args.invert,
        simplify_factor: args.simplify_factor,
        ..DetectConfig::default()
    })
}

fn load_map(path: &Path) -> CliResult<RgbaImage> {
    tracing::info!("Loading map image: {}", path.display());
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {e}", path.display()).into()
    })?;
    let rgba = img.to_rgba8();
    tracing::info!("Image size: {}x{}", rgba.width(), rgba.height());
    Ok(rgba)
}

fn open_store(path: Option<&Path>) -> CliResult<Option<JsonFileStore>> {
    Ok(path.map(JsonFileStore::open).transpose()?)
}

/// Open the store for `detect`. Without `--save` the store only feeds
/// the overlay, so an unreadable store is skipped with a warning.
fn open_detect_store(path: Option<&Path>, save: bool) -> CliResult<Option<JsonFileStore>> {
    match open_store(path) {
        Err(e) if !save => {
            tracing::warn!("Ignoring area store: {e}");
            Ok(None)
        }
        result => result,
    }
}

fn file_title(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("campusmap")
}

fn write_file(path: &Path, bytes: &[u8], what: &str) -> CliResult<()> {
    std::fs::write(path, bytes).map_err(|e| -> CliError {
        format!("Error writing {what} to {}: {e}", path.display()).into()
    })?;
    tracing::info!("{what} written to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Stored areas at `size`, plus the unsaved `outline` under `name` when
/// it is not already in the store.
fn overlay_areas(
    store: Option<&JsonFileStore>,
    detection: &Detection,
    name: &str,
) -> CliResult<Vec<RenderedArea>> {
    let size = detection.render_size;
    let mut areas = match store {
        Some(store) => denormalize_all(&store.list()?, size),
        None => Vec::new(),
    };
    if !areas.iter().any(|a| a.name == name) {
        let polygon = detection.pixel_polygon.clone();
        let label = vertex_centroid(polygon.points()).unwrap_or(PixelPoint::new(0.0, 0.0));
        areas.push(RenderedArea {
            id: AreaId(0),
            name: name.to_string(),
            polygon,
            label,
        });
    }
    Ok(areas)
}

fn run_detect(args: &DetectArgs) -> CliResult<()> {
    let config = config_from_args(args)?;
    let map = load_map(&args.view.image)?;
    let size = resolve_size(args.view.width, args.view.height, map.dimensions())?;
    let click = PixelPoint::new(args.x, args.y);
    tracing::info!("Detecting at ({}, {}) on a {size} render", click.x, click.y);

    let detection = Detector::new(config.clone()).detect(&map, size, click)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
    } else {
        println!("{}", detection.diagnostics.report());
        println!();
        for p in detection.pixel_polygon.points() {
            println!("{:.1},{:.1}", p.x, p.y);
        }
    }

    let mut store = open_detect_store(args.view.store.as_deref(), args.view.save)?;
    if args.view.save
        && let (Some(store), Some(name)) = (store.as_mut(), args.view.name.as_deref())
    {
        let area = store.upsert(name, detection.unit_polygon.clone())?;
        tracing::info!(
            "Saved area {} \"{}\" to {}",
            area.id,
            area.name,
            store.path().display()
        );
    }

    let name = args.view.name.as_deref().unwrap_or("detected");
    let areas = overlay_areas(store.as_ref(), &detection, name)?;

    if let Some(ref svg_path) = args.view.svg {
        let config_json = serde_json::to_string(&config)?;
        let desc = format!("{} outline at ({}, {})", detection.strategy, click.x, click.y);
        let metadata = SvgMetadata {
            title: Some(file_title(&args.view.image)),
            description: Some(&desc),
            config_json: Some(&config_json),
        };
        let svg = to_overlay_svg(
            &areas,
            size,
            Some(name),
            &OverlayStyle::default(),
            &metadata,
        );
        write_file(svg_path, svg.as_bytes(), "SVG")?;
    }

    if let Some(ref preview_path) = args.preview {
        let (w, h) = size.pixel_dimensions();
        let scaled = image::imageops::resize(&map, w, h, FilterType::Triangle);
        let img = preview::render_preview(&scaled, &areas, Some(name))
            .ok_or("preview image would be empty")?;
        img.save(preview_path)?;
        tracing::info!("Preview written to {}", preview_path.display());
    }

    Ok(())
}

fn run_trace(args: &TraceArgs) -> CliResult<()> {
    let map = load_map(&args.view.image)?;
    let size = resolve_size(args.view.width, args.view.height, map.dimensions())?;
    let buf = sample(&map, size)?;

    let mut trace = SnapTrace::new(&buf, size).with_radius(args.radius);
    for &click in &args.points {
        match trace.push(click) {
            Some(p) => println!("{:.1},{:.1} -> {:.1},{:.1}", click.x, click.y, p.x, p.y),
            None => tracing::warn!("Click ({}, {}) could not snap; skipped", click.x, click.y),
        }
    }

    if args.view.save
        && let Some(store_path) = args.view.store.as_deref()
        && let Some(name) = args.view.name.as_deref()
    {
        let outline = trace.finish()?;
        let mut store = JsonFileStore::open(store_path)?;
        let area = store.upsert(name, outline)?;
        tracing::info!("Saved area {} \"{}\" to {}", area.id, area.name, store_path.display());
    }

    if let Some(ref svg_path) = args.view.svg {
        let metadata = SvgMetadata {
            title: Some(file_title(&args.view.image)),
            ..SvgMetadata::default()
        };
        let svg = to_trace_svg(trace.points(), size, &metadata);
        write_file(svg_path, svg.as_bytes(), "SVG")?;
    }

    Ok(())
}

fn run_render(args: &RenderArgs) -> CliResult<()> {
    let size = RenderSize::new(args.width, args.height)?;
    let store = JsonFileStore::open(&args.store)?;
    let rendered = denormalize_all(&store.list()?, size);

    if let Some(ref svg_path) = args.svg {
        let metadata = SvgMetadata {
            title: Some(file_title(&args.store)),
            ..SvgMetadata::default()
        };
        let svg = to_overlay_svg(
            &rendered,
            size,
            args.selected.as_deref(),
            &OverlayStyle::default(),
            &metadata,
        );
        write_file(svg_path, svg.as_bytes(), "SVG")?;
    } else {
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    }
    Ok(())
}

fn run_list(store_path: &Path) -> CliResult<()> {
    let store = JsonFileStore::open(store_path)?;
    let areas = store.list()?;
    println!("{:>6}  {:<32} {:>6}", "id", "name", "points");
    println!("{}", "-".repeat(46));
    for area in &areas {
        println!("{:>6}  {:<32} {:>6}", area.id, area.name, area.points.len());
    }
    println!("{} area(s)", areas.len());
    Ok(())
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::Trace(args) => run_trace(&args),
        Commands::Render(args) => run_render(&args),
        Commands::List { store } => run_list(&store),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_point_accepts_spaces_and_decimals() {
        assert_eq!(parse_point("12, 34.5").unwrap(), PixelPoint::new(12.0, 34.5));
        assert!(parse_point("12").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn corrupt_store_only_fails_detect_when_saving() {
        let path = std::env::temp_dir().join(format!(
            "campusmap-{}-corrupt-detect.json",
            std::process::id()
        ));
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(open_detect_store(Some(&path), false).unwrap().is_none());
        assert!(open_detect_store(Some(&path), true).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn size_defaults_to_native() {
        let size = resolve_size(None, None, (400, 300)).unwrap();
        assert_eq!(size, RenderSize::new(400.0, 300.0).unwrap());
    }

    #[test]
    fn single_dimension_keeps_aspect_ratio() {
        let size = resolve_size(Some(800.0), None, (400, 300)).unwrap();
        assert!((size.height() - 600.0).abs() < 1e-9);
        let size = resolve_size(None, Some(150.0), (400, 300)).unwrap();
        assert!((size.width() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(resolve_size(Some(0.0), Some(10.0), (400, 300)).is_err());
    }

    #[test]
    fn save_requires_store_and_name() {
        let parsed = Cli::try_parse_from([
            "campusmap",
            "detect",
            "map.png",
            "--x",
            "1",
            "--y",
            "2",
            "--save",
        ]);
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from([
            "campusmap",
            "detect",
            "map.png",
            "--x",
            "1",
            "--y",
            "2",
            "--save",
            "--store",
            "a.json",
            "--name",
            "Gym",
        ]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn trace_collects_repeated_points() {
        let cli = Cli::try_parse_from([
            "campusmap",
            "trace",
            "map.png",
            "--point",
            "1,2",
            "--point",
            "3,4",
            "--point",
            "5,6",
        ])
        .unwrap();
        let Commands::Trace(args) = cli.command else {
            unreachable!("expected trace subcommand");
        };
        assert_eq!(args.points.len(), 3);
        assert_eq!(args.radius, campusmap_detect::snap::DEFAULT_SNAP_RADIUS);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = Cli::try_parse_from([
            "campusmap",
            "detect",
            "map.png",
            "--x",
            "1",
            "--y",
            "2",
            "--invert",
            "--config-json",
            r#"{"adaptive_window": 21}"#,
        ])
        .unwrap();
        let Commands::Detect(args) = cli.command else {
            unreachable!("expected detect subcommand");
        };
        let config = config_from_args(&args).unwrap();
        assert_eq!(config.adaptive_window, 21);
        assert!(!config.invert);
    }
}
