//! Serialized viewport rendering.
//!
//! [`SurfaceRenderer`] is the single owner of the off-screen graphics context
//! and the map engine. One coarse lock covers both the render path and the
//! invalidation path, so:
//!
//! - the context is current on at most one thread, the one rendering
//! - the engine is never entered concurrently
//! - an invalidation that completes before a render takes the lock is seen
//!   by that render
//!
//! There is no queue and no timeout. A render runs to completion; one that
//! takes longer than the configured threshold is logged.

use crate::config::RendererConfig;
use crate::engine::MapEngine;
use crate::errors::RendererError;
use crate::stats::RenderStats;
use crate::watcher::{DataKind, InvalidationSink};
use mapsnap_common::{FrameSize, LatLon, RenderRequest};
use mapsnap_context::{ContextError, ContextState, GraphicsContextManager, GraphicsPlatform};
use mapsnap_pixelbuffer::{Bitmap, PixelTransformPipeline};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of one render call.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    /// Display-ready bitmap, `None` if the engine drew nothing usable.
    pub bitmap: Option<Bitmap>,
    /// The request's point of interest, echoed back.
    pub poi: Option<LatLon>,
}

impl RenderedFrame {
    /// True if the frame carries a bitmap.
    pub fn is_rendered(&self) -> bool {
        self.bitmap.is_some()
    }
}

struct RendererState<P: GraphicsPlatform, E> {
    context: GraphicsContextManager<P>,
    engine: E,
    pipeline: PixelTransformPipeline,
    stats: RenderStats,
}

impl<P: GraphicsPlatform, E: MapEngine> RendererState<P, E> {
    /// Bind, draw, read back and release. Release happens on every path out
    /// of this function, unwinding included.
    fn draw(&mut self, request: &RenderRequest) -> Result<Option<Bitmap>, ContextError> {
        let Self {
            context,
            engine,
            pipeline,
            stats,
        } = self;

        let mut bound = context.bind()?;
        let size = bound.size();

        let bitmap = if engine.render_map(request) {
            let converted = bound
                .read_framebuffer_pixels()
                .map_err(RendererError::from)
                .and_then(|raw| {
                    pipeline
                        .to_display_bitmap(raw, size.width, size.height)
                        .map_err(RendererError::from)
                });
            match converted {
                Ok(bitmap) => Some(bitmap),
                Err(e) => {
                    warn!(error = %e, "framebuffer conversion failed, returning empty frame");
                    stats.readback_failures += 1;
                    None
                }
            }
        } else {
            debug!(?request, "map engine reported render failure");
            stats.failed_renders += 1;
            None
        };

        // The frame is complete; a failed unbind has already been healed.
        if let Err(e) = bound.release() {
            warn!(error = %e, "releasing context after render failed");
        }
        Ok(bitmap)
    }
}

/// The shared renderer.
///
/// Construct once with [`create`](Self::create) and share by reference or
/// `Arc` with every caller and with the
/// [`DataChangeWatcher`](crate::DataChangeWatcher).
pub struct SurfaceRenderer<P: GraphicsPlatform, E: MapEngine> {
    state: Mutex<RendererState<P, E>>,
    size: FrameSize,
    slow_render_warn: Duration,
}

impl<P: GraphicsPlatform, E: MapEngine> SurfaceRenderer<P, E> {
    /// Set up the graphics context and create the map engine.
    ///
    /// `create_engine` is called with the frame size while the context is
    /// current on the calling thread, so it may create GL resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the context cannot be
    /// set up or bound, or the engine cannot be created.
    pub fn create<F>(config: &RendererConfig, platform: P, create_engine: F) -> Result<Self, RendererError>
    where
        F: FnOnce(FrameSize) -> anyhow::Result<E>,
    {
        config.validate()?;
        let size = config.frame_size();

        let mut context = GraphicsContextManager::new(platform, size, config.requirements());
        context.initialize()?;

        let bound = context.bind()?;
        let engine = create_engine(size)?;
        bound.release()?;

        info!(%size, "surface renderer ready");
        Ok(Self {
            state: Mutex::new(RendererState {
                context,
                engine,
                pipeline: PixelTransformPipeline::new(size),
                stats: RenderStats::default(),
            }),
            size,
            slow_render_warn: config.slow_render_warn(),
        })
    }

    /// Render `request` into a display bitmap.
    ///
    /// An engine failure or a failed read-back is not an error: the frame is
    /// returned without a bitmap, with the request's point of interest.
    ///
    /// # Errors
    ///
    /// Returns an error only if the graphics context cannot be set up or
    /// bound, after one recreate-and-retry cycle.
    pub fn render_viewport(&self, request: RenderRequest) -> Result<RenderedFrame, RendererError> {
        let mut state = self.state.lock();
        let started = Instant::now();

        let outcome = state.draw(&request);
        let elapsed = started.elapsed();
        let recoveries = state.context.stats().recoveries;
        state.stats.context_recoveries = recoveries;
        let bitmap = outcome?;

        state.stats.renders += 1;
        state.stats.render_time += elapsed;
        drop(state);

        if elapsed > self.slow_render_warn {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = self.slow_render_warn.as_millis() as u64,
                "slow render"
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros() as u64, rendered = bitmap.is_some(), "render complete");
        }

        Ok(RenderedFrame {
            bitmap,
            poi: request.poi,
        })
    }

    /// Forward a data change to the engine, under the render lock.
    pub fn invalidate(&self, kind: DataKind) {
        let mut state = self.state.lock();
        match kind {
            DataKind::MapData => {
                state.engine.invalidate_map_data();
                state.stats.map_invalidations += 1;
            }
            DataKind::BookmarkData => {
                state.engine.invalidate_bookmark_data();
                state.stats.bookmark_invalidations += 1;
            }
        }
        debug!(?kind, "map engine data invalidated");
    }

    /// Output raster size.
    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn stats(&self) -> RenderStats {
        self.state.lock().stats
    }

    pub fn context_state(&self) -> ContextState {
        self.state.lock().context.state()
    }

    /// Run `f` on the engine under the render lock.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        f(&mut self.state.lock().engine)
    }

    /// Release the graphics context.
    ///
    /// A later render initializes it again.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.context.terminate();
        info!(stats = %state.stats.format_summary(), "surface renderer shut down");
    }
}

impl<P: GraphicsPlatform, E: MapEngine> InvalidationSink for SurfaceRenderer<P, E> {
    fn data_changed(&self, kind: DataKind) {
        self.invalidate(kind);
    }
}
