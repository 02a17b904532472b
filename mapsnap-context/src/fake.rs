//! Scripted in-memory [`GraphicsPlatform`] for tests.
//!
//! `FakePlatform` is a cheap clone around shared state, so a test can hand one
//! clone to a [`GraphicsContextManager`](crate::GraphicsContextManager) and
//! keep another to script failures and inspect the recorded calls.
//!
//! Like EGL, binding a context that is current on another thread fails; the
//! fake also remembers that it happened, see [`FakePlatform::overlap_detected`].

use crate::{ApiVersion, ConfigAttributes, ConfigCaveat, ConfigRequirements, GraphicsPlatform, PlatformError};
use mapsnap_common::FrameSize;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Opaque handle value handed out by the fake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeHandle(pub u32);

/// A config the fake reports, with scripted creation outcomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FakeConfig {
    pub caveat: ConfigCaveat,
    pub attributes: ConfigAttributes,
    pub surface_ok: bool,
    pub context_ok: bool,
}

impl FakeConfig {
    /// RGBA8888 + 16-bit depth config that creates both resources.
    pub fn new(caveat: ConfigCaveat) -> Self {
        Self {
            caveat,
            attributes: ConfigAttributes {
                red_bits: 8,
                green_bits: 8,
                blue_bits: 8,
                alpha_bits: 8,
                depth_bits: 16,
                stencil_bits: 0,
            },
            surface_ok: true,
            context_ok: true,
        }
    }

    #[must_use]
    pub fn failing_surface(mut self) -> Self {
        self.surface_ok = false;
        self
    }

    #[must_use]
    pub fn failing_context(mut self) -> Self {
        self.context_ok = false;
        self
    }
}

/// A platform call as recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    DefaultDisplay,
    Initialize,
    MatchingConfigs,
    CreateSurface { config: u32 },
    CreateContext { config: u32 },
    MakeCurrent(ThreadId),
    ReleaseCurrent(ThreadId),
    DestroySurface,
    DestroyContext,
    Terminate,
    SetAlignment(i32),
    ReadPixels,
}

#[derive(Debug)]
struct FakeState {
    display_available: bool,
    init_error: Option<String>,
    version: ApiVersion,
    configs: Vec<FakeConfig>,
    fail_binds: u32,
    fail_releases: u32,
    next_handle: u32,
    initialized: bool,
    live_surfaces: HashSet<u32>,
    live_contexts: HashSet<u32>,
    current: Option<(ThreadId, u32)>,
    overlap_detected: bool,
    alignment: i32,
    framebuffer: Option<(FrameSize, Vec<u8>)>,
    calls: Vec<FakeCall>,
}

impl FakeState {
    fn next_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn config(&self, config: FakeHandle) -> Result<FakeConfig, PlatformError> {
        self.configs
            .get(config.0 as usize)
            .copied()
            .ok_or_else(|| PlatformError::new("fake config lookup", "EGL_BAD_CONFIG"))
    }
}

/// In-memory platform with scriptable failures.
#[derive(Debug, Clone)]
pub struct FakePlatform {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakePlatform {
    /// One conformant config.
    fn default() -> Self {
        Self::with_configs(vec![FakeConfig::new(ConfigCaveat::None)])
    }
}

impl FakePlatform {
    /// A platform reporting `configs`, in this order.
    pub fn with_configs(configs: Vec<FakeConfig>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                display_available: true,
                init_error: None,
                version: ApiVersion::new(1, 4),
                configs,
                fail_binds: 0,
                fail_releases: 0,
                next_handle: 100,
                initialized: false,
                live_surfaces: HashSet::new(),
                live_contexts: HashSet::new(),
                current: None,
                overlap_detected: false,
                alignment: 4,
                framebuffer: None,
                calls: Vec::new(),
            })),
        }
    }

    pub fn set_display_available(&self, available: bool) {
        self.state.lock().display_available = available;
    }

    /// Make display initialization fail with `reason`, or succeed again with `None`.
    pub fn set_init_error(&self, reason: Option<&str>) {
        self.state.lock().init_error = reason.map(str::to_owned);
    }

    pub fn set_version(&self, version: ApiVersion) {
        self.state.lock().version = version;
    }

    /// Make the next `count` binds fail.
    pub fn fail_next_binds(&self, count: u32) {
        self.state.lock().fail_binds = count;
    }

    /// Make the next `count` unbinds fail.
    pub fn fail_next_releases(&self, count: u32) {
        self.state.lock().fail_releases = count;
    }

    /// Fill the framebuffer of `size`. `pixel(x, y)` gets GL coordinates
    /// (y = 0 is the bottom row) and returns RGBA.
    pub fn paint(&self, size: FrameSize, pixel: impl Fn(u32, u32) -> [u8; 4]) {
        let mut data = Vec::with_capacity(size.byte_len(4));
        for y in 0..size.height {
            for x in 0..size.width {
                data.extend_from_slice(&pixel(x, y));
            }
        }
        self.state.lock().framebuffer = Some((size, data));
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&FakeCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// True if a bind was ever attempted while another thread held the context.
    pub fn overlap_detected(&self) -> bool {
        self.state.lock().overlap_detected
    }

    /// Thread the context is current on, if any.
    pub fn current_thread(&self) -> Option<ThreadId> {
        self.state.lock().current.map(|(thread, _)| thread)
    }

    pub fn live_surfaces(&self) -> usize {
        self.state.lock().live_surfaces.len()
    }

    pub fn live_contexts(&self) -> usize {
        self.state.lock().live_contexts.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    pub fn alignment(&self) -> i32 {
        self.state.lock().alignment
    }
}

impl GraphicsPlatform for FakePlatform {
    type Display = FakeHandle;
    type Config = FakeHandle;
    type Surface = FakeHandle;
    type Context = FakeHandle;

    fn default_display(&mut self) -> Option<FakeHandle> {
        let mut state = self.state.lock();
        state.calls.push(FakeCall::DefaultDisplay);
        state.display_available.then_some(FakeHandle(1))
    }

    fn initialize(&mut self, _display: FakeHandle) -> Result<ApiVersion, PlatformError> {
        let mut state = self.state.lock();
        state.calls.push(FakeCall::Initialize);
        if let Some(reason) = state.init_error.clone() {
            return Err(PlatformError::new("eglInitialize", reason));
        }
        state.initialized = true;
        Ok(state.version)
    }

    fn matching_configs(
        &mut self,
        _display: FakeHandle,
        _requirements: &ConfigRequirements,
    ) -> Result<Vec<FakeHandle>, PlatformError> {
        let mut state = self.state.lock();
        state.calls.push(FakeCall::MatchingConfigs);
        Ok((0..state.configs.len() as u32).map(FakeHandle).collect())
    }

    fn config_caveat(&mut self, _display: FakeHandle, config: FakeHandle) -> Result<ConfigCaveat, PlatformError> {
        Ok(self.state.lock().config(config)?.caveat)
    }

    fn config_attributes(&mut self, _display: FakeHandle, config: FakeHandle) -> Result<ConfigAttributes, PlatformError> {
        Ok(self.state.lock().config(config)?.attributes)
    }

    fn create_offscreen_surface(
        &mut self,
        _display: FakeHandle,
        config: FakeHandle,
        _size: FrameSize,
    ) -> Result<FakeHandle, PlatformError> {
        let mut state = self.state.lock();
        state.calls.push(FakeCall::CreateSurface { config: config.0 });
        if !state.config(config)?.surface_ok {
            return Err(PlatformError::new("eglCreatePbufferSurface", "EGL_BAD_MATCH"));
        }
        let handle = state.next_handle();
        state.live_surfaces.insert(handle);
        Ok(FakeHandle(handle))
    }

    fn create_context(&mut self, _display: FakeHandle, config: FakeHandle) -> Result<FakeHandle, PlatformError> {
        let mut state = self.state.lock();
        state.calls.push(FakeCall::CreateContext { config: config.0 });
        if !state.config(config)?.context_ok {
            return Err(PlatformError::new("eglCreateContext", "EGL_BAD_CONFIG"));
        }
        let handle = state.next_handle();
        state.live_contexts.insert(handle);
        Ok(FakeHandle(handle))
    }

    fn make_current(&mut self, _display: FakeHandle, surface: FakeHandle, context: FakeHandle) -> Result<(), PlatformError> {
        let thread = thread::current().id();
        let mut state = self.state.lock();
        state.calls.push(FakeCall::MakeCurrent(thread));
        if let Some((owner, _)) = state.current {
            if owner != thread {
                state.overlap_detected = true;
                return Err(PlatformError::new("eglMakeCurrent", "EGL_BAD_ACCESS"));
            }
        }
        if state.fail_binds > 0 {
            state.fail_binds -= 1;
            return Err(PlatformError::new("eglMakeCurrent", "EGL_CONTEXT_LOST"));
        }
        if !state.initialized
            || !state.live_surfaces.contains(&surface.0)
            || !state.live_contexts.contains(&context.0)
        {
            return Err(PlatformError::new("eglMakeCurrent", "EGL_BAD_CONTEXT"));
        }
        state.current = Some((thread, context.0));
        Ok(())
    }

    fn release_current(&mut self, _display: FakeHandle) -> Result<(), PlatformError> {
        let thread = thread::current().id();
        let mut state = self.state.lock();
        state.calls.push(FakeCall::ReleaseCurrent(thread));
        if state.fail_releases > 0 {
            state.fail_releases -= 1;
            return Err(PlatformError::new("eglMakeCurrent", "EGL_BAD_DISPLAY"));
        }
        if matches!(state.current, Some((owner, _)) if owner == thread) {
            state.current = None;
        }
        Ok(())
    }

    fn destroy_surface(&mut self, _display: FakeHandle, surface: FakeHandle) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.calls.push(FakeCall::DestroySurface);
        if state.live_surfaces.remove(&surface.0) {
            Ok(())
        } else {
            Err(PlatformError::new("eglDestroySurface", "EGL_BAD_SURFACE"))
        }
    }

    fn destroy_context(&mut self, _display: FakeHandle, context: FakeHandle) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.calls.push(FakeCall::DestroyContext);
        if matches!(state.current, Some((_, current)) if current == context.0) {
            state.current = None;
        }
        if state.live_contexts.remove(&context.0) {
            Ok(())
        } else {
            Err(PlatformError::new("eglDestroyContext", "EGL_BAD_CONTEXT"))
        }
    }

    fn terminate(&mut self, _display: FakeHandle) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.calls.push(FakeCall::Terminate);
        state.initialized = false;
        state.live_surfaces.clear();
        state.live_contexts.clear();
        state.current = None;
        Ok(())
    }

    fn set_pixel_store_alignment(&mut self, alignment: i32) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.calls.push(FakeCall::SetAlignment(alignment));
        state.alignment = alignment;
        Ok(())
    }

    fn read_pixels(&mut self, size: FrameSize, out: &mut [u8]) -> Result<(), PlatformError> {
        let thread = thread::current().id();
        let mut state = self.state.lock();
        state.calls.push(FakeCall::ReadPixels);
        if !matches!(state.current, Some((owner, _)) if owner == thread) {
            return Err(PlatformError::new("glReadPixels", "GL_INVALID_OPERATION"));
        }
        match &state.framebuffer {
            Some((painted, data)) if *painted == size && data.len() == out.len() => out.copy_from_slice(data),
            _ => out.fill(0),
        }
        Ok(())
    }
}
