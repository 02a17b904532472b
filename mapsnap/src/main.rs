mod args;
mod quadrant;

use anyhow::{bail, Context, Result};
use args::{Args, Command};
use clap::Parser;
use mapsnap_common::{LatLon, RenderRequest};
use mapsnap_context::egl::EglPlatform;
use mapsnap_renderer::{DataChangeWatcher, RendererConfig, SurfaceRenderer};
use quadrant::QuadrantEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

type Renderer = SurfaceRenderer<EglPlatform, QuadrantEngine>;

fn init_logging(level: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match level {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

/// `--config`, else `<config dir>/mapsnap/config.toml` if present, else defaults.
fn load_config(args: &Args) -> Result<RendererConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => directories::ProjectDirs::from("", "", "mapsnap")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .filter(|path| path.exists()),
    };

    let mut config = match &path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            RendererConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => RendererConfig::default(),
    };

    if let Some(width) = args.width {
        config.frame.width = width;
    }
    if let Some(height) = args.height {
        config.frame.height = height;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn create_renderer(config: &RendererConfig) -> Result<Renderer> {
    let platform = EglPlatform::load().context("Failed to load EGL")?;
    let loader = platform.gl_loader();
    // The factory runs with the context bound, so core GL entry points resolve.
    SurfaceRenderer::create(config, platform, move |size| {
        let gl = loader.load().context("Failed to resolve GL entry points")?;
        Ok(QuadrantEngine::new(gl, size))
    })
    .context("Failed to set up off-screen rendering")
}

fn render(config: &RendererConfig, request: RenderRequest, out: &Path) -> Result<()> {
    let renderer = create_renderer(config)?;
    let frame = renderer.render_viewport(request).context("Render failed")?;

    let Some(bitmap) = frame.bitmap else {
        bail!("Map engine produced no image for {:?}", request.center);
    };
    bitmap
        .save_png(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    info!("Wrote {} frame to {}", bitmap.size(), out.display());

    renderer.shutdown();
    Ok(())
}

fn watch(config: &RendererConfig, dir: Option<PathBuf>, stats_interval: Duration) -> Result<()> {
    let Some(dir) = dir.or_else(|| config.watch.data_dir.clone()) else {
        bail!("No data directory given and none configured in [watch] data_dir");
    };

    let renderer = Arc::new(create_renderer(config)?);
    let _watcher = DataChangeWatcher::start(&dir, config.classifier(), Arc::clone(&renderer))
        .with_context(|| format!("Failed to watch {}", dir.display()))?;

    // Render once so the first invalidation has something to act on.
    let warmup = RenderRequest::new(LatLon::new(0.0, 0.0), 1.0);
    if let Err(e) = renderer.render_viewport(warmup) {
        warn!("Initial render failed: {e}");
    }

    loop {
        thread::sleep(stats_interval);
        info!("{}", renderer.stats().format_summary());
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);
    info!("Starting mapsnap {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;

    match args.command {
        Command::Render {
            lat,
            lon,
            zoom,
            poi,
            location,
            out,
        } => {
            let mut request = RenderRequest::new(LatLon::new(lat, lon), zoom);
            request.poi = poi;
            request.my_location = location;
            render(&config, request, &out)
        }
        Command::Watch { dir, stats_interval } => watch(&config, dir, Duration::from_secs(stats_interval.max(1))),
    }
}
