//! # mapsnap-context: Off-screen Graphics Context Management
//!
//! Owns the display connection, off-screen surface and rendering context that
//! map frames are drawn into, and binds them to whichever thread renders next.
//!
//! ## Features
//!
//! - **Config ranking**: candidate configs are ordered by caveat, so hardware
//!   configs win over software or non-conformant ones
//! - **Fallback**: if a config accepts a surface but not a context, the next
//!   candidate is tried
//! - **Self-healing binds**: a failed bind or unbind recreates every resource;
//!   binds are retried once
//! - **Backends**: EGL + OpenGL ES (`egl` feature) or a scripted in-memory fake
//!   (`fake` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use mapsnap_common::FrameSize;
//! use mapsnap_context::{ConfigRequirements, GraphicsContextManager};
//! use mapsnap_context::egl::EglPlatform;
//!
//! let platform = EglPlatform::load()?;
//! let mut manager =
//!     GraphicsContextManager::new(platform, FrameSize::new(320, 320), ConfigRequirements::default());
//! manager.initialize()?;
//!
//! let mut bound = manager.bind()?;
//! // ... issue GL draw calls ...
//! let pixels = bound.read_framebuffer_pixels()?;
//! bound.release()?;
//! ```

pub mod error;
pub mod manager;
pub mod platform;
pub mod selector;

#[cfg(feature = "egl")]
pub mod egl;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use error::{ContextError, PlatformError};
pub use manager::{BoundContext, ContextState, ContextStats, GraphicsContextManager, MIN_API_VERSION};
pub use platform::{
    ApiVersion, ConfigAttributes, ConfigCaveat, ConfigRequirements, GraphicsPlatform, RenderableType, SurfaceType,
};
pub use selector::{rank_configs, GraphicsConfigSelector, RankedConfig};
