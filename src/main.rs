//! LayerView CLI - inspect and preview G-code layers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::{DAffine2, DVec2};
use layerview::{
    init_logging, Config, GCodeMemoryFile, GCodeRenderer, HeadlessBackend, InstructionSource,
    RenderInfo, RenderType, SvgCanvas, BUILD_DATE, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Canvas margin around the print in SVG output, in pixels
const SVG_MARGIN: f64 = 10.0;

#[derive(Parser)]
#[command(name = "layerview")]
#[command(about = "Layer-by-layer G-code preview", long_about = None)]
struct Cli {
    /// Config file (JSON or TOML); the platform default is used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print layer statistics and the speed legend of a file
    Info {
        /// G-code file
        file: PathBuf,
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build 3D geometry for a layer range without a window and report it
    Render {
        /// G-code file
        file: PathBuf,
        /// First layer to draw
        #[arg(long, default_value_t = 0)]
        start_layer: usize,
        /// One past the last layer to draw (defaults to all layers)
        #[arg(long)]
        end_layer: Option<usize>,
        #[arg(long, default_value_t = 0.0)]
        start_ratio: f64,
        #[arg(long, default_value_t = 1.0)]
        end_ratio: f64,
        /// Comma separated render types, e.g. "extrusions,moves,speed-colors"
        #[arg(long)]
        render_types: Option<String>,
    },
    /// Write the 2D preview of one layer as SVG
    Svg {
        /// G-code file
        file: PathBuf,
        /// Output SVG path
        output: PathBuf,
        #[arg(long, default_value_t = 0)]
        layer: usize,
        #[arg(long, default_value_t = 0.0)]
        start_ratio: f64,
        #[arg(long, default_value_t = 1.0)]
        end_ratio: f64,
        /// Canvas edge length in pixels
        #[arg(long, default_value_t = 800.0)]
        size: f64,
        #[arg(long)]
        render_types: Option<String>,
    },
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    debug!("LayerView {} (built {})", VERSION, BUILD_DATE);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { file, json } => show_info(&file, &config, json),
        Commands::Render {
            file,
            start_layer,
            end_layer,
            start_ratio,
            end_ratio,
            render_types,
        } => {
            let source = load_source(&file)?;
            let end_layer = end_layer.unwrap_or(source.layer_count());
            let info = RenderInfo::from_view_settings(&config.view, start_layer, end_layer)
                .with_feature_ratios(start_ratio, end_ratio)
                .with_render_type(render_types_or_default(render_types.as_deref(), &config)?);
            render_headless(source, &config, &info)
        }
        Commands::Svg {
            file,
            output,
            layer,
            start_ratio,
            end_ratio,
            size,
            render_types,
        } => {
            let source = load_source(&file)?;
            let info = RenderInfo::from_view_settings(&config.view, layer, layer)
                .with_feature_ratios(start_ratio, end_ratio)
                .with_render_type(render_types_or_default(render_types.as_deref(), &config)?);
            write_svg(source, &config, info, size, &output)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match Config::default_path() {
            Ok(path) => path,
            Err(e) => {
                debug!("No default config location: {}", e);
                return Ok(Config::default());
            }
        },
    };
    Config::load_or_default(&path).with_context(|| format!("loading config {}", path.display()))
}

fn load_source(file: &Path) -> layerview::Result<Arc<GCodeMemoryFile>> {
    let source = GCodeMemoryFile::load_from_file(file)?;
    info!(
        "Loaded {}: {} instructions in {} layers",
        file.display(),
        source.instruction_count(),
        source.layer_count()
    );
    Ok(Arc::new(source))
}

fn render_types_or_default(list: Option<&str>, config: &Config) -> Result<RenderType> {
    match list {
        Some(list) => RenderType::parse_list(list)
            .with_context(|| format!("unknown render type in '{}'", list)),
        None => Ok(config.view.render_types),
    }
}

fn show_info(file: &Path, config: &Config, json: bool) -> Result<()> {
    let source = load_source(file)?;
    let mut renderer = GCodeRenderer::new(Some(source.clone()), config);

    let layers: Vec<serde_json::Value> = (0..renderer.layer_count())
        .map(|layer| {
            serde_json::json!({
                "layer": layer,
                "first_instruction": source.first_instruction_of_layer(layer),
                "height": source.layer_height(layer),
                "features": renderer.num_features(layer),
            })
        })
        .collect();

    let summary = serde_json::json!({
        "file": file.display().to_string(),
        "instructions": source.instruction_count(),
        "layers": layers,
        "filament_diameter": renderer.filament_diameter(),
        "filament_mm": source.total_filament_mm(),
        "bounds": source.bounds().map(|(min, max)| [min.to_array(), max.to_array()]),
        "speeds": renderer.speed_legend(),
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", file.display());
    println!("  instructions:      {}", source.instruction_count());
    println!("  layers:            {}", renderer.layer_count());
    println!("  filament diameter: {:.2} mm", renderer.filament_diameter());
    println!("  filament used:     {:.1} mm", source.total_filament_mm());
    if let Some((min, max)) = source.bounds() {
        println!(
            "  bounds:            ({:.1}, {:.1}, {:.1}) - ({:.1}, {:.1}, {:.1})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }
    for layer in 0..renderer.layer_count() {
        println!(
            "  layer {:>4}: {:>6} features, height {:.3}",
            layer,
            renderer.num_features(layer),
            source.layer_height(layer)
        );
    }
    for entry in renderer.speed_legend() {
        println!("  speed {:>8.1} mm/min  {}", entry.speed, entry.color.to_hex());
    }
    Ok(())
}

fn render_headless(source: Arc<GCodeMemoryFile>, config: &Config, info: &RenderInfo) -> Result<()> {
    let mut renderer = GCodeRenderer::new(Some(source), config);
    let mut backend = HeadlessBackend::new();

    let report = renderer.render_3d(&mut backend, info)?;
    info!(
        "Rendered layers {}..{}: {} built, {} evicted, {} draw calls",
        report.start_layer,
        report.end_layer,
        report.layers_built,
        report.layers_evicted,
        report.draw_calls
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    renderer.dispose(&mut backend);
    Ok(())
}

/// Bed to canvas transform fitting `min..max` (XY) into a square canvas, Y up
fn fit_transform(min: DVec2, max: DVec2, size: f64) -> (DAffine2, f64) {
    let extent = (max - min).max_element().max(1.0);
    let scale = (size - 2.0 * SVG_MARGIN).max(1.0) / extent;
    let transform = DAffine2::from_translation(DVec2::new(SVG_MARGIN, size - SVG_MARGIN))
        * DAffine2::from_scale(DVec2::new(scale, -scale))
        * DAffine2::from_translation(-min);
    (transform, scale)
}

fn write_svg(
    source: Arc<GCodeMemoryFile>,
    config: &Config,
    info: RenderInfo,
    size: f64,
    output: &Path,
) -> Result<()> {
    let (min, max) = source
        .bounds()
        .map(|(min, max)| (min.truncate(), max.truncate()))
        .unwrap_or((DVec2::ZERO, DVec2::splat(200.0)));
    let (transform, scale) = fit_transform(min, max, size);

    let mut renderer = GCodeRenderer::new(Some(source), config);
    let mut canvas = SvgCanvas::new(size, size).with_background(config.view.theme.background());
    let drawn = renderer.render_2d(&mut canvas, &info.with_transform(transform, scale));

    std::fs::write(output, canvas.finish())
        .with_context(|| format!("writing {}", output.display()))?;
    info!("Wrote {} features to {}", drawn, output.display());
    Ok(())
}
