//! Error types for graphics context management.

use std::thread::ThreadId;
use thiserror::Error;

/// A failed call into the platform graphics API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{call} failed: {reason}")]
pub struct PlatformError {
    /// Name of the platform call, e.g. `eglMakeCurrent`.
    pub call: &'static str,
    /// Native error description.
    pub reason: String,
}

impl PlatformError {
    pub fn new(call: &'static str, reason: impl Into<String>) -> Self {
        Self {
            call,
            reason: reason.into(),
        }
    }

    /// Error carrying a native numeric error code.
    pub fn with_code(call: &'static str, code: i32) -> Self {
        Self::new(call, format!("error 0x{code:04X}"))
    }
}

/// Errors raised by the context manager.
#[derive(Debug, Error)]
pub enum ContextError {
    /// No default display connection is available.
    #[error("no display connection available")]
    NoDisplay,

    /// The display could not be initialized or reports an unsupported API version.
    #[error("graphics initialization failed: {0}")]
    InitializationFailed(String),

    /// No config satisfies the hard requirements.
    #[error("no graphics config matches the requirements")]
    NoConfigAvailable,

    /// No candidate config could back an off-screen surface.
    #[error("off-screen surface creation failed: {0}")]
    SurfaceCreationFailed(String),

    /// Surfaces were created but no config accepted a rendering context.
    #[error("rendering context creation failed: {0}")]
    ContextCreationFailed(String),

    /// Binding failed, and failed again after recreating all resources.
    #[error("binding context to thread failed: {0}")]
    ContextBindFailed(String),

    /// The context is current on another thread.
    #[error("context is current on another thread ({0:?})")]
    BoundElsewhere(ThreadId),

    /// The operation needs the context current on the calling thread.
    #[error("context is not current on the calling thread")]
    NotCurrent,

    /// Pixel read-back failed.
    #[error("framebuffer read-back failed: {0}")]
    ReadbackFailed(String),
}

impl ContextError {
    /// Returns true for errors raised while creating the display, surface or context.
    ///
    /// Nothing can be rendered until a later `initialize()` succeeds.
    #[must_use]
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::NoDisplay
                | Self::InitializationFailed(_)
                | Self::NoConfigAvailable
                | Self::SurfaceCreationFailed(_)
                | Self::ContextCreationFailed(_)
        )
    }

    /// Returns true if a later attempt on the same manager may succeed.
    ///
    /// Bind failures have already been retried once, but the manager is left
    /// re-initializable, so the next render gets a fresh attempt.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ContextBindFailed(_) | Self::ReadbackFailed(_) | Self::NotCurrent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        assert!(ContextError::NoDisplay.is_setup_error());
        assert!(ContextError::NoConfigAvailable.is_setup_error());
        assert!(ContextError::SurfaceCreationFailed("x".into()).is_setup_error());
        assert!(!ContextError::ContextBindFailed("x".into()).is_setup_error());

        assert!(ContextError::ContextBindFailed("x".into()).is_recoverable());
        assert!(!ContextError::NoDisplay.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = PlatformError::with_code("eglMakeCurrent", 0x3002);
        assert_eq!(err.to_string(), "eglMakeCurrent failed: error 0x3002");

        let err = ContextError::ContextBindFailed(err.to_string());
        assert_eq!(
            err.to_string(),
            "binding context to thread failed: eglMakeCurrent failed: error 0x3002"
        );
    }
}
