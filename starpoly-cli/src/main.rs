use clap::Parser;
use serde::{Deserialize, Serialize};
use starpoly::io::save_labels;
use starpoly::{FrameResult, OutputMode, PolygonRecord, SegmentConfig, Segmenter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Starpoly CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OutputModeConfig {
    LabelImage,
    Polygons,
    Both,
}

impl From<OutputModeConfig> for OutputMode {
    fn from(value: OutputModeConfig) -> Self {
        match value {
            OutputModeConfig::LabelImage => OutputMode::LabelImage,
            OutputModeConfig::Polygons => OutputMode::Polygons,
            OutputModeConfig::Both => OutputMode::Both,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SegmentConfigJson {
    n_rays: usize,
    prob_thresh: f32,
    nms_thresh: f32,
    exclude_border: usize,
    output: OutputModeConfig,
    parallel: bool,
}

impl Default for SegmentConfigJson {
    fn default() -> Self {
        let cfg = SegmentConfig::default();
        Self {
            n_rays: cfg.n_rays,
            prob_thresh: cfg.prob_thresh,
            nms_thresh: cfg.nms_thresh,
            exclude_border: cfg.exclude_border,
            output: OutputModeConfig::Both,
            parallel: cfg.parallel,
        }
    }
}

impl From<SegmentConfigJson> for SegmentConfig {
    fn from(value: SegmentConfigJson) -> Self {
        Self {
            n_rays: value.n_rays,
            prob_thresh: value.prob_thresh,
            nms_thresh: value.nms_thresh,
            exclude_border: value.exclude_border,
            output: value.output.into(),
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    prediction_path: String,
    width: usize,
    height: usize,
    frames: usize,
    output_path: Option<String>,
    labels_path: Option<String>,
    segment: SegmentConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prediction_path: String::new(),
            width: 0,
            height: 0,
            frames: 1,
            output_path: None,
            labels_path: None,
            segment: SegmentConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PolygonJson {
    id: u32,
    score: f32,
    origin: [usize; 2],
    vertices: Vec<[f64; 2]>,
}

impl From<&PolygonRecord> for PolygonJson {
    fn from(value: &PolygonRecord) -> Self {
        Self {
            id: value.id,
            score: value.score,
            origin: value.origin,
            vertices: value.vertices.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameJson {
    frame: Option<usize>,
    candidates: usize,
    winners: usize,
    polygons: Vec<PolygonJson>,
}

impl From<&FrameResult> for FrameJson {
    fn from(value: &FrameResult) -> Self {
        Self {
            frame: value.frame,
            candidates: value.stats.candidates,
            winners: value.stats.winners,
            polygons: value.polygons.iter().map(PolygonJson::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    width: usize,
    height: usize,
    frames: Vec<FrameJson>,
}

fn read_f32_le(path: &str) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    if bytes.len() % 4 != 0 {
        return Err(format!("{path}: size {} is not a multiple of 4 bytes", bytes.len()).into());
    }
    let values = bytes
        .chunks_exact(4)
        .map(|chunk| chunk.try_into().map(f32::from_le_bytes))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

/// Number of f32 values in `frames` back-to-back prediction blocks.
fn prediction_len(width: usize, height: usize, channels: usize, frames: usize) -> Option<usize> {
    width
        .checked_mul(height)?
        .checked_mul(channels)?
        .checked_mul(frames)
}

/// `labels.png` becomes `labels_t3.png` for frame 3 of a stack.
fn frame_path(path: &Path, frame: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("labels");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_t{frame}.{ext}"),
        None => format!("{stem}_t{frame}"),
    };
    path.with_file_name(name)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("starpoly=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.prediction_path.is_empty() {
        return Err("prediction_path must be set in the config".into());
    }
    if config.width == 0 || config.height == 0 {
        return Err("width and height must be positive".into());
    }
    if config.frames == 0 {
        return Err("frames must be at least 1".into());
    }

    let segmenter = Segmenter::new(config.segment.into())?;
    let channels = segmenter.config().n_rays + 1;
    let data = read_f32_le(&config.prediction_path)?;
    let expected = prediction_len(config.width, config.height, channels, config.frames)
        .ok_or("width x height x channels x frames overflows")?;
    if data.len() != expected {
        return Err(format!(
            "{}: expected {expected} values ({} frames of {}x{}x{channels}), found {}",
            config.prediction_path,
            config.frames,
            config.height,
            config.width,
            data.len()
        )
        .into());
    }

    let result = segmenter.segment_predictions(&data, config.width, config.height, config.frames)?;

    if let Some(path) = &config.labels_path {
        let path = Path::new(path);
        for frame in &result.frames {
            let Some(labels) = &frame.labels else {
                continue;
            };
            let target = match (config.frames, frame.frame) {
                (1, _) | (_, None) => path.to_path_buf(),
                (_, Some(t)) => frame_path(path, t),
            };
            save_labels(labels.view(), &target)?;
            tracing::info!(path = %target.display(), "wrote label image");
        }
    }

    let output = Output {
        width: config.width,
        height: config.height,
        frames: result.frames.iter().map(FrameJson::from).collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
