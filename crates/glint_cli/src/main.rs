mod scenes;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glint_renderer::{ImageBuffer, RenderConfig, RenderProgress, RenderState, Raytracer, World};
use log::LevelFilter;

use crate::scenes::DemoScene;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser)]
#[command(name = "glint")]
#[command(about = "Whitted-style ray tracer")]
struct Args {
    /// Demo scene to render
    #[arg(long, value_enum, default_value = "spheres")]
    scene: DemoScene,

    /// JSON render config; command line values override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Maximum ray depth
    #[arg(long)]
    depth: Option<u32>,

    /// Anti-aliasing mask size (odd, 1 disables the AA pass)
    #[arg(long)]
    aa: Option<u32>,

    /// Worker threads, 0 uses every core
    #[arg(short, long)]
    threads: Option<usize>,

    /// Output PNG
    #[arg(short, long, default_value = "glint.png")]
    output: PathBuf,

    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

impl Args {
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::from_json_file(path)
                .with_context(|| format!("Failed to load render config {}", path.display()))?,
            None => RenderConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(depth) = self.depth {
            config.max_depth = depth;
        }
        if let Some(aa) = self.aa {
            config.aa_samples = aa;
        }
        if let Some(threads) = self.threads {
            config.num_threads = threads;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    log::info!("Starting Glint");
    let config = args.render_config()?;

    let scene = args
        .scene
        .build()
        .with_context(|| format!("Failed to build scene {:?}", args.scene))?;
    let world = World::new(scene).context("Failed to prepare scene")?;

    let raytracer = Raytracer::new(config);
    let on_progress = |progress: RenderProgress| {
        log::info!(
            "{:3}% ({}/{} rows)",
            progress.percent,
            progress.rows_completed,
            progress.total_rows
        );
    };

    let start = Instant::now();
    let mut buffer = ImageBuffer::new(raytracer.config().width, raytracer.config().height);
    let outcome = raytracer
        .render_into(&world, &mut buffer, Some(&on_progress))
        .context("Render failed")?;
    log::info!("Rendered in {:.2?}", start.elapsed());
    if outcome.state != RenderState::Finished {
        log::warn!("Render ended in state {:?}", outcome.state);
    }

    let png = image::RgbaImage::from_raw(buffer.width, buffer.height, buffer.to_rgba())
        .context("Image buffer does not match its size")?;
    png.save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    log::info!("Saved {}", args.output.display());

    Ok(())
}
