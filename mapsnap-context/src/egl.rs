//! EGL + OpenGL ES 2.0 backend.
//!
//! libEGL is loaded at runtime with `khronos-egl`; GL entry points are
//! resolved through `eglGetProcAddress` into a `glow` context the first time
//! pixel state is touched, which is always while the context is current.
//! EGL 1.4 only guarantees extension entry points from `eglGetProcAddress`,
//! and core GLES functions may resolve to null without a current context, so
//! [`GlLoader::load`] refuses to run until one is bound.

use crate::{ApiVersion, ConfigAttributes, ConfigCaveat, ConfigRequirements, GraphicsPlatform, PlatformError};
use glow::HasContext;
use khronos_egl as egl;
use mapsnap_common::FrameSize;
use std::sync::Arc;
use tracing::{debug, info};

macro_rules! egl_handle {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name($inner);

        // SAFETY: EGL handles are opaque identifiers owned by the display
        // connection. The manager never uses one from two threads at once, and
        // eglMakeCurrent enforces single-thread binding of contexts.
        unsafe impl Send for $name {}
    };
}

egl_handle!(EglDisplay, egl::Display);
egl_handle!(EglConfig, egl::Config);
egl_handle!(EglSurface, egl::Surface);
egl_handle!(EglContext, egl::Context);

/// Platform backed by the system libEGL.
pub struct EglPlatform {
    egl: Arc<egl::DynamicInstance<egl::EGL1_4>>,
    gl: Option<glow::Context>,
}

// SAFETY: the dynamic instance holds the loaded library and function pointers,
// which are valid from any thread. The glow context is only called while the
// EGL context is current on the calling thread, which the manager guarantees.
unsafe impl Send for EglPlatform {}

impl EglPlatform {
    /// Load libEGL with at least EGL 1.4 entry points.
    pub fn load() -> Result<Self, PlatformError> {
        let egl = unsafe { egl::DynamicInstance::<egl::EGL1_4>::load_required() }
            .map_err(|e| PlatformError::new("dlopen(libEGL)", format!("{e:?}")))?;
        info!("loaded EGL library");
        Ok(Self {
            egl: Arc::new(egl),
            gl: None,
        })
    }

    /// A handle that resolves GL entry points for drawing engines.
    ///
    /// The loader outlives moves of the platform into a context manager, so
    /// an engine factory can call it once the context is bound.
    pub fn gl_loader(&self) -> GlLoader {
        GlLoader {
            egl: Arc::clone(&self.egl),
        }
    }

    fn gl(&mut self) -> Result<&glow::Context, PlatformError> {
        let gl = match self.gl.take() {
            Some(gl) => gl,
            None => self.gl_loader().load()?,
        };
        Ok(self.gl.insert(gl))
    }

    fn query(&self, display: EglDisplay, config: EglConfig, attribute: egl::Int) -> Result<egl::Int, PlatformError> {
        self.egl
            .get_config_attrib(display.0, config.0, attribute)
            .map_err(|e| egl_error("eglGetConfigAttrib", e))
    }

    fn query_bits(&self, display: EglDisplay, config: EglConfig, attribute: egl::Int) -> Result<u8, PlatformError> {
        let value = self.query(display, config, attribute)?;
        u8::try_from(value).map_err(|_| PlatformError::new("eglGetConfigAttrib", format!("size {value} out of range")))
    }
}

/// Resolves GL entry points through `eglGetProcAddress`.
#[derive(Clone)]
pub struct GlLoader {
    egl: Arc<egl::DynamicInstance<egl::EGL1_4>>,
}

// SAFETY: only the loaded library and its function pointers are shared, and
// those are valid from any thread.
unsafe impl Send for GlLoader {}

impl GlLoader {
    /// Resolve a fresh set of GL entry points for the context current on the
    /// calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if no EGL context is current on the calling thread.
    pub fn load(&self) -> Result<glow::Context, PlatformError> {
        if self.egl.get_current_context().is_none() {
            return Err(PlatformError::new("eglGetProcAddress", "no current context"));
        }
        debug!("resolving GL entry points");
        let gl = unsafe {
            glow::Context::from_loader_function(|name| {
                self.egl
                    .get_proc_address(name)
                    .map_or(std::ptr::null(), |f| f as *const std::ffi::c_void)
            })
        };
        Ok(gl)
    }
}

fn egl_error(call: &'static str, error: egl::Error) -> PlatformError {
    PlatformError::new(call, error.to_string())
}

impl GraphicsPlatform for EglPlatform {
    type Display = EglDisplay;
    type Config = EglConfig;
    type Surface = EglSurface;
    type Context = EglContext;

    fn default_display(&mut self) -> Option<EglDisplay> {
        unsafe { self.egl.get_display(egl::DEFAULT_DISPLAY) }.map(EglDisplay)
    }

    fn initialize(&mut self, display: EglDisplay) -> Result<ApiVersion, PlatformError> {
        let (major, minor) = self
            .egl
            .initialize(display.0)
            .map_err(|e| egl_error("eglInitialize", e))?;
        self.egl
            .bind_api(egl::OPENGL_ES_API)
            .map_err(|e| egl_error("eglBindAPI", e))?;
        Ok(ApiVersion::new(major.max(0) as u32, minor.max(0) as u32))
    }

    fn matching_configs(
        &mut self,
        display: EglDisplay,
        requirements: &ConfigRequirements,
    ) -> Result<Vec<EglConfig>, PlatformError> {
        let attributes = [
            egl::RED_SIZE,
            egl::Int::from(requirements.red_bits),
            egl::GREEN_SIZE,
            egl::Int::from(requirements.green_bits),
            egl::BLUE_SIZE,
            egl::Int::from(requirements.blue_bits),
            egl::ALPHA_SIZE,
            egl::Int::from(requirements.alpha_bits),
            egl::DEPTH_SIZE,
            egl::Int::from(requirements.depth_bits),
            egl::STENCIL_SIZE,
            egl::Int::from(requirements.stencil_bits),
            egl::RENDERABLE_TYPE,
            requirements.renderable.bits() as egl::Int,
            egl::SURFACE_TYPE,
            requirements.surface.bits() as egl::Int,
            egl::NONE,
        ];

        let count = self
            .egl
            .matching_config_count(display.0, &attributes)
            .map_err(|e| egl_error("eglChooseConfig", e))?;
        let mut configs = Vec::with_capacity(count);
        self.egl
            .choose_config(display.0, &attributes, &mut configs)
            .map_err(|e| egl_error("eglChooseConfig", e))?;
        debug!(count = configs.len(), "EGL configs match");
        Ok(configs.into_iter().map(EglConfig).collect())
    }

    fn config_caveat(&mut self, display: EglDisplay, config: EglConfig) -> Result<ConfigCaveat, PlatformError> {
        match self.query(display, config, egl::CONFIG_CAVEAT)? {
            egl::NONE => Ok(ConfigCaveat::None),
            egl::SLOW_CONFIG => Ok(ConfigCaveat::Slow),
            egl::NON_CONFORMANT_CONFIG => Ok(ConfigCaveat::NonConformant),
            other => Err(PlatformError::with_code("eglGetConfigAttrib(EGL_CONFIG_CAVEAT)", other)),
        }
    }

    fn config_attributes(&mut self, display: EglDisplay, config: EglConfig) -> Result<ConfigAttributes, PlatformError> {
        Ok(ConfigAttributes {
            red_bits: self.query_bits(display, config, egl::RED_SIZE)?,
            green_bits: self.query_bits(display, config, egl::GREEN_SIZE)?,
            blue_bits: self.query_bits(display, config, egl::BLUE_SIZE)?,
            alpha_bits: self.query_bits(display, config, egl::ALPHA_SIZE)?,
            depth_bits: self.query_bits(display, config, egl::DEPTH_SIZE)?,
            stencil_bits: self.query_bits(display, config, egl::STENCIL_SIZE)?,
        })
    }

    fn create_offscreen_surface(
        &mut self,
        display: EglDisplay,
        config: EglConfig,
        size: FrameSize,
    ) -> Result<EglSurface, PlatformError> {
        let attributes = [
            egl::WIDTH,
            size.width as egl::Int,
            egl::HEIGHT,
            size.height as egl::Int,
            egl::NONE,
        ];
        self.egl
            .create_pbuffer_surface(display.0, config.0, &attributes)
            .map(EglSurface)
            .map_err(|e| egl_error("eglCreatePbufferSurface", e))
    }

    fn create_context(&mut self, display: EglDisplay, config: EglConfig) -> Result<EglContext, PlatformError> {
        let attributes = [egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE];
        self.egl
            .create_context(display.0, config.0, None, &attributes)
            .map(EglContext)
            .map_err(|e| egl_error("eglCreateContext", e))
    }

    fn make_current(&mut self, display: EglDisplay, surface: EglSurface, context: EglContext) -> Result<(), PlatformError> {
        self.egl
            .make_current(display.0, Some(surface.0), Some(surface.0), Some(context.0))
            .map_err(|e| egl_error("eglMakeCurrent", e))
    }

    fn release_current(&mut self, display: EglDisplay) -> Result<(), PlatformError> {
        self.egl
            .make_current(display.0, None, None, None)
            .map_err(|e| egl_error("eglMakeCurrent(EGL_NO_CONTEXT)", e))
    }

    fn destroy_surface(&mut self, display: EglDisplay, surface: EglSurface) -> Result<(), PlatformError> {
        self.egl
            .destroy_surface(display.0, surface.0)
            .map_err(|e| egl_error("eglDestroySurface", e))
    }

    fn destroy_context(&mut self, display: EglDisplay, context: EglContext) -> Result<(), PlatformError> {
        self.egl
            .destroy_context(display.0, context.0)
            .map_err(|e| egl_error("eglDestroyContext", e))
    }

    fn terminate(&mut self, display: EglDisplay) -> Result<(), PlatformError> {
        // GL entry points may differ once a new display is initialized.
        self.gl = None;
        self.egl
            .terminate(display.0)
            .map_err(|e| egl_error("eglTerminate", e))
    }

    fn set_pixel_store_alignment(&mut self, alignment: i32) -> Result<(), PlatformError> {
        let gl = self.gl()?;
        unsafe {
            gl.pixel_store_i32(glow::PACK_ALIGNMENT, alignment);
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment);
            match gl.get_error() {
                glow::NO_ERROR => Ok(()),
                code => Err(PlatformError::with_code("glPixelStorei", code as i32)),
            }
        }
    }

    fn read_pixels(&mut self, size: FrameSize, out: &mut [u8]) -> Result<(), PlatformError> {
        let gl = self.gl()?;
        unsafe {
            gl.read_pixels(
                0,
                0,
                size.width as i32,
                size.height as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(out),
            );
            match gl.get_error() {
                glow::NO_ERROR => Ok(()),
                code => Err(PlatformError::with_code("glReadPixels", code as i32)),
            }
        }
    }
}
