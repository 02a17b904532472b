//! The platform graphics API as seen by the context manager.
//!
//! [`GraphicsPlatform`] is the seam between the lifecycle logic in
//! [`GraphicsContextManager`](crate::GraphicsContextManager) and a concrete
//! API. The `egl` feature provides an EGL + OpenGL ES implementation; the
//! `fake` feature provides a scripted in-memory one.

use crate::PlatformError;
use bitflags::bitflags;
use mapsnap_common::FrameSize;
use std::fmt;

bitflags! {
    /// Client APIs a config can render with. Values match `EGL_RENDERABLE_TYPE`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderableType: u32 {
        const OPENGL_ES = 0x0001;
        const OPENVG = 0x0002;
        const OPENGL_ES2 = 0x0004;
        const OPENGL = 0x0008;
        const OPENGL_ES3 = 0x0040;
    }
}

bitflags! {
    /// Surface kinds a config supports. Values match `EGL_SURFACE_TYPE`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SurfaceType: u32 {
        const PBUFFER = 0x0001;
        const PIXMAP = 0x0002;
        const WINDOW = 0x0004;
    }
}

/// Hard requirements every candidate config must meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRequirements {
    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
    pub alpha_bits: u8,
    pub depth_bits: u8,
    pub stencil_bits: u8,
    pub renderable: RenderableType,
    pub surface: SurfaceType,
}

impl Default for ConfigRequirements {
    /// RGBA8888 with a 16-bit depth buffer, OpenGL ES 2.0 renderable, pbuffer capable.
    fn default() -> Self {
        Self {
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
            alpha_bits: 8,
            depth_bits: 16,
            stencil_bits: 0,
            renderable: RenderableType::OPENGL_ES2,
            surface: SurfaceType::PBUFFER,
        }
    }
}

/// Platform-reported quality hint for a config.
///
/// Ordered by severity: `None < Slow < NonConformant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigCaveat {
    /// Hardware accelerated, fully conformant.
    None,
    /// Typically a software rasterizer.
    Slow,
    /// Fails conformance tests.
    NonConformant,
}

impl ConfigCaveat {
    /// Ranking weight, lower is better.
    pub const fn rank_weight(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Slow => 1,
            Self::NonConformant => 2,
        }
    }
}

impl fmt::Display for ConfigCaveat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Slow => "slow",
            Self::NonConformant => "non-conformant",
        };
        f.write_str(name)
    }
}

/// Channel and buffer sizes a config actually provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigAttributes {
    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
    pub alpha_bits: u8,
    pub depth_bits: u8,
    pub stencil_bits: u8,
}

impl fmt::Display for ConfigAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}G{}B{}A{} D{}S{}",
            self.red_bits,
            self.green_bits,
            self.blue_bits,
            self.alpha_bits,
            self.depth_bits,
            self.stencil_bits
        )
    }
}

/// Version reported when the display connection is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Raw operations of a platform graphics API.
///
/// Handles are plain copyable values; the manager stores them as `Option`s,
/// with `None` as the "no resource" sentinel. Implementations do no
/// bookkeeping of their own: which thread holds the context, retries and
/// teardown order are the manager's job.
pub trait GraphicsPlatform: Send {
    type Display: Copy + fmt::Debug + PartialEq + Send;
    type Config: Copy + fmt::Debug + PartialEq + Send;
    type Surface: Copy + fmt::Debug + PartialEq + Send;
    type Context: Copy + fmt::Debug + PartialEq + Send;

    /// Open the default display connection, `None` if there is none.
    fn default_display(&mut self) -> Option<Self::Display>;

    /// Initialize the display connection and report the API version.
    fn initialize(&mut self, display: Self::Display) -> Result<ApiVersion, PlatformError>;

    /// All configs meeting `requirements`, in platform order.
    fn matching_configs(
        &mut self,
        display: Self::Display,
        requirements: &ConfigRequirements,
    ) -> Result<Vec<Self::Config>, PlatformError>;

    fn config_caveat(&mut self, display: Self::Display, config: Self::Config) -> Result<ConfigCaveat, PlatformError>;

    fn config_attributes(
        &mut self,
        display: Self::Display,
        config: Self::Config,
    ) -> Result<ConfigAttributes, PlatformError>;

    /// Create an off-screen surface of `size`.
    fn create_offscreen_surface(
        &mut self,
        display: Self::Display,
        config: Self::Config,
        size: FrameSize,
    ) -> Result<Self::Surface, PlatformError>;

    /// Create a rendering context for `config`.
    fn create_context(&mut self, display: Self::Display, config: Self::Config) -> Result<Self::Context, PlatformError>;

    /// Bind `context` and `surface` to the calling thread.
    fn make_current(
        &mut self,
        display: Self::Display,
        surface: Self::Surface,
        context: Self::Context,
    ) -> Result<(), PlatformError>;

    /// Unbind whatever context is current on the calling thread.
    fn release_current(&mut self, display: Self::Display) -> Result<(), PlatformError>;

    fn destroy_surface(&mut self, display: Self::Display, surface: Self::Surface) -> Result<(), PlatformError>;

    fn destroy_context(&mut self, display: Self::Display, context: Self::Context) -> Result<(), PlatformError>;

    /// Close the display connection.
    fn terminate(&mut self, display: Self::Display) -> Result<(), PlatformError>;

    /// Set pack and unpack row alignment, in bytes.
    fn set_pixel_store_alignment(&mut self, alignment: i32) -> Result<(), PlatformError>;

    /// Read the current framebuffer as RGBA8888, bottom row first.
    ///
    /// `out` is exactly `size.byte_len(4)` bytes.
    fn read_pixels(&mut self, size: FrameSize, out: &mut [u8]) -> Result<(), PlatformError>;
}
