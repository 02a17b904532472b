//! Off-screen graphics context lifecycle.
//!
//! [`GraphicsContextManager`] owns one display connection, one off-screen
//! surface and one rendering context, all created against the same config.
//!
//! # State Machine
//!
//! ```text
//! Uninitialized -> Initialized <-> Bound(thread)
//!        |              |               |
//!        +--------------+---------------+--> Terminated -> Initialized ...
//! ```
//!
//! A failed bind or unbind is taken as a sign that the context or display was
//! lost. The manager tears everything down, initializes again and, for a bind,
//! retries exactly once before reporting [`ContextError::ContextBindFailed`].

use crate::selector::{GraphicsConfigSelector, RankedConfig};
use crate::{ApiVersion, ConfigRequirements, ContextError, GraphicsPlatform, PlatformError};
use mapsnap_common::FrameSize;
use std::thread::{self, ThreadId};
use tracing::{debug, info, warn};

/// Oldest display API version accepted by [`GraphicsContextManager::initialize`].
pub const MIN_API_VERSION: ApiVersion = ApiVersion::new(1, 4);

/// Bytes per pixel of the read-back buffer (RGBA8888).
const READBACK_BYTES_PER_PIXEL: usize = 4;

/// Lifecycle state of a [`GraphicsContextManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Uninitialized,
    Initialized,
    /// Context and surface are current on this thread.
    Bound(ThreadId),
    Terminated,
}

/// Counters for resource churn.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContextStats {
    /// Successful `initialize()` calls that created resources.
    pub initializations: u64,
    /// Terminate + initialize cycles caused by failed binds or unbinds.
    pub recoveries: u64,
}

/// Owner of the display, off-screen surface and rendering context.
pub struct GraphicsContextManager<P: GraphicsPlatform> {
    platform: P,
    size: FrameSize,
    requirements: ConfigRequirements,
    display: Option<P::Display>,
    config: Option<RankedConfig<P::Config>>,
    surface: Option<P::Surface>,
    context: Option<P::Context>,
    state: ContextState,
    stats: ContextStats,
}

impl<P: GraphicsPlatform> GraphicsContextManager<P> {
    /// Create an uninitialized manager for surfaces of `size`.
    pub fn new(platform: P, size: FrameSize, requirements: ConfigRequirements) -> Self {
        Self {
            platform,
            size,
            requirements,
            display: None,
            config: None,
            surface: None,
            context: None,
            state: ContextState::Uninitialized,
            stats: ContextStats::default(),
        }
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    pub fn requirements(&self) -> &ConfigRequirements {
        &self.requirements
    }

    /// Config the live surface and context were created with.
    pub fn selected_config(&self) -> Option<&RankedConfig<P::Config>> {
        self.config.as_ref()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// True once resources exist, bound or not.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, ContextState::Initialized | ContextState::Bound(_))
    }

    /// Create the display connection, surface and context.
    ///
    /// Candidate configs are tried best first. For each, a surface is created,
    /// then a context for the same config; if the context fails the surface is
    /// destroyed and the next config is tried. Does nothing if already
    /// initialized.
    ///
    /// # Errors
    ///
    /// - [`ContextError::NoDisplay`] without a default display
    /// - [`ContextError::InitializationFailed`] if the display cannot be
    ///   initialized or is older than [`MIN_API_VERSION`]
    /// - [`ContextError::NoConfigAvailable`] if no config matches
    /// - [`ContextError::SurfaceCreationFailed`] if no config yields a surface
    /// - [`ContextError::ContextCreationFailed`] if surfaces were created but
    ///   no config yields a context
    ///
    /// On error every partially created resource is released and the manager
    /// is left `Terminated`.
    pub fn initialize(&mut self) -> Result<(), ContextError> {
        if self.is_initialized() {
            return Ok(());
        }

        match self.create_resources() {
            Ok(()) => {
                self.state = ContextState::Initialized;
                self.stats.initializations += 1;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "graphics context initialization failed");
                self.terminate();
                Err(e)
            }
        }
    }

    fn create_resources(&mut self) -> Result<(), ContextError> {
        let display = self.platform.default_display().ok_or(ContextError::NoDisplay)?;
        self.display = Some(display);

        let version = self
            .platform
            .initialize(display)
            .map_err(|e| ContextError::InitializationFailed(e.to_string()))?;
        if version < MIN_API_VERSION {
            return Err(ContextError::InitializationFailed(format!(
                "display API {version} is older than {MIN_API_VERSION}"
            )));
        }
        debug!(%version, "display initialized");

        let candidates =
            GraphicsConfigSelector::new(&self.requirements).ranked_configs(&mut self.platform, display)?;

        let mut surface_error: Option<PlatformError> = None;
        let mut context_error: Option<PlatformError> = None;

        for candidate in candidates {
            let surface = match self
                .platform
                .create_offscreen_surface(display, candidate.handle, self.size)
            {
                Ok(surface) => surface,
                Err(e) => {
                    debug!(caveat = %candidate.caveat, error = %e, "config rejected surface");
                    surface_error = Some(e);
                    continue;
                }
            };

            match self.platform.create_context(display, candidate.handle) {
                Ok(context) => {
                    info!(
                        size = %self.size,
                        caveat = %candidate.caveat,
                        "off-screen graphics context ready"
                    );
                    self.config = Some(candidate);
                    self.surface = Some(surface);
                    self.context = Some(context);
                    return Ok(());
                }
                Err(e) => {
                    debug!(caveat = %candidate.caveat, error = %e, "config rejected context");
                    if let Err(destroy) = self.platform.destroy_surface(display, surface) {
                        warn!(error = %destroy, "failed to destroy surface of rejected config");
                    }
                    context_error = Some(e);
                }
            }
        }

        Err(match (context_error, surface_error) {
            (Some(e), _) => ContextError::ContextCreationFailed(e.to_string()),
            (None, Some(e)) => ContextError::SurfaceCreationFailed(e.to_string()),
            (None, None) => ContextError::NoConfigAvailable,
        })
    }

    /// Release every resource and close the display connection.
    ///
    /// Unbinds the context first if it is current. Safe to call in any state;
    /// platform errors during teardown are logged, not returned. All handles
    /// are reset and the state becomes `Terminated`.
    pub fn terminate(&mut self) {
        if let Some(display) = self.display.take() {
            if let ContextState::Bound(owner) = self.state {
                if owner != thread::current().id() {
                    warn!(?owner, "terminating a context that is current on another thread");
                }
                if let Err(e) = self.platform.release_current(display) {
                    warn!(error = %e, "failed to unbind context during terminate");
                }
            }
            if let Some(context) = self.context.take() {
                if let Err(e) = self.platform.destroy_context(display, context) {
                    warn!(error = %e, "failed to destroy context");
                }
            }
            if let Some(surface) = self.surface.take() {
                if let Err(e) = self.platform.destroy_surface(display, surface) {
                    warn!(error = %e, "failed to destroy surface");
                }
            }
            if let Err(e) = self.platform.terminate(display) {
                warn!(error = %e, "failed to terminate display");
            }
            debug!("graphics context terminated");
        }

        self.context = None;
        self.surface = None;
        self.config = None;
        self.state = ContextState::Terminated;
    }

    /// Bind the context and surface to the calling thread.
    ///
    /// Initializes first if needed. Does nothing if already current here.
    ///
    /// # Errors
    ///
    /// - [`ContextError::BoundElsewhere`] if another thread holds the context
    /// - any setup error from [`initialize`](Self::initialize)
    /// - [`ContextError::ContextBindFailed`] if binding failed, resources were
    ///   recreated, and the second bind failed too
    pub fn make_current_on_calling_thread(&mut self) -> Result<(), ContextError> {
        let thread = thread::current().id();
        match self.state {
            ContextState::Bound(owner) if owner == thread => return Ok(()),
            ContextState::Bound(owner) => return Err(ContextError::BoundElsewhere(owner)),
            ContextState::Uninitialized | ContextState::Terminated => self.initialize()?,
            ContextState::Initialized => {}
        }

        if let Err(first) = self.bind_once() {
            warn!(error = %first, "binding context failed, recreating graphics resources");
            self.recover()?;
            self.bind_once().map_err(|second| {
                warn!(error = %second, "binding context failed after recovery");
                ContextError::ContextBindFailed(second.to_string())
            })?;
        }

        self.state = ContextState::Bound(thread);
        Ok(())
    }

    fn bind_once(&mut self) -> Result<(), PlatformError> {
        match (self.display, self.surface, self.context) {
            (Some(display), Some(surface), Some(context)) => {
                self.platform.make_current(display, surface, context)
            }
            _ => Err(PlatformError::new("make_current", "no live surface or context")),
        }
    }

    /// Unbind the context from the calling thread.
    ///
    /// Does nothing if the context is not bound. If the platform refuses to
    /// unbind, resources are recreated, leaving the manager `Initialized`.
    ///
    /// # Errors
    ///
    /// - [`ContextError::NotCurrent`] if another thread holds the context
    /// - any setup error from the recovery's `initialize()`
    pub fn release_from_calling_thread(&mut self) -> Result<(), ContextError> {
        let thread = thread::current().id();
        match self.state {
            ContextState::Bound(owner) if owner == thread => {}
            ContextState::Bound(_) => return Err(ContextError::NotCurrent),
            _ => return Ok(()),
        }

        let result = match self.display {
            Some(display) => self.platform.release_current(display),
            None => Ok(()),
        };
        self.state = ContextState::Initialized;

        if let Err(e) = result {
            warn!(error = %e, "unbinding context failed, recreating graphics resources");
            self.recover()?;
        }
        Ok(())
    }

    fn recover(&mut self) -> Result<(), ContextError> {
        self.stats.recoveries += 1;
        self.terminate();
        self.initialize()
    }

    /// Read the framebuffer of the bound surface, bottom row first, RGBA8888.
    ///
    /// Pack and unpack alignment are set to 1 first so rows carry no padding.
    ///
    /// # Errors
    ///
    /// - [`ContextError::NotCurrent`] unless bound on the calling thread
    /// - [`ContextError::ReadbackFailed`] if the platform read fails
    pub fn read_framebuffer_pixels(&mut self) -> Result<Vec<u8>, ContextError> {
        if self.state != ContextState::Bound(thread::current().id()) {
            return Err(ContextError::NotCurrent);
        }

        self.platform
            .set_pixel_store_alignment(1)
            .map_err(|e| ContextError::ReadbackFailed(e.to_string()))?;

        let mut pixels = vec![0u8; self.size.byte_len(READBACK_BYTES_PER_PIXEL)];
        self.platform
            .read_pixels(self.size, &mut pixels)
            .map_err(|e| ContextError::ReadbackFailed(e.to_string()))?;
        Ok(pixels)
    }

    /// Bind to the calling thread and return a guard that unbinds on drop.
    pub fn bind(&mut self) -> Result<BoundContext<'_, P>, ContextError> {
        self.make_current_on_calling_thread()?;
        Ok(BoundContext {
            manager: self,
            released: false,
        })
    }
}

impl<P: GraphicsPlatform> Drop for GraphicsContextManager<P> {
    fn drop(&mut self) {
        if self.display.is_some() {
            self.terminate();
        }
    }
}

/// The context, current on the thread that created this guard.
///
/// Dropping the guard unbinds the context, including when unwinding.
pub struct BoundContext<'a, P: GraphicsPlatform> {
    manager: &'a mut GraphicsContextManager<P>,
    released: bool,
}

impl<P: GraphicsPlatform> BoundContext<'_, P> {
    pub fn size(&self) -> FrameSize {
        self.manager.size
    }

    /// See [`GraphicsContextManager::read_framebuffer_pixels`].
    pub fn read_framebuffer_pixels(&mut self) -> Result<Vec<u8>, ContextError> {
        self.manager.read_framebuffer_pixels()
    }

    /// Unbind now and report the outcome.
    pub fn release(mut self) -> Result<(), ContextError> {
        self.released = true;
        self.manager.release_from_calling_thread()
    }
}

impl<P: GraphicsPlatform> Drop for BoundContext<'_, P> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.manager.release_from_calling_thread() {
                warn!(error = %e, "failed to release context on scope exit");
            }
        }
    }
}
