//! Map viewport rendering for secondary displays.
//!
//! This crate ties the off-screen graphics context, a map engine and the
//! pixel pipeline together behind two narrow entry points:
//!
//! - [`SurfaceRenderer::render_viewport`]: viewport in, display bitmap out
//! - [`InvalidationSink::data_changed`]: on-disk data changed, fed by
//!   [`DataChangeWatcher`]
//!
//! ```rust,ignore
//! use mapsnap_renderer::{DataChangeWatcher, RendererConfig, SurfaceRenderer};
//! use std::sync::Arc;
//!
//! let config = RendererConfig::builder().data_dir("/data/maps").build()?;
//! let renderer = Arc::new(SurfaceRenderer::create(&config, platform, |size| {
//!     MyEngine::new(size.width, size.height)
//! })?);
//! let _watcher = DataChangeWatcher::start("/data/maps", config.classifier(), Arc::clone(&renderer))?;
//!
//! let frame = renderer.render_viewport(request)?;
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod renderer;
pub mod stats;
pub mod watcher;

pub use config::{RendererConfig, RendererConfigBuilder};
pub use engine::MapEngine;
pub use errors::RendererError;
pub use renderer::{RenderedFrame, SurfaceRenderer};
pub use stats::RenderStats;
pub use watcher::{DataChangeWatcher, DataKind, FileClassifier, FileEvent, InvalidationSink};
