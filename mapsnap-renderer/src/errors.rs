//! Error types for the renderer.

use mapsnap_context::ContextError;
use mapsnap_pixelbuffer::PixelError;
use std::io;
use thiserror::Error;

/// Errors surfaced by [`SurfaceRenderer`](crate::SurfaceRenderer) and
/// [`DataChangeWatcher`](crate::DataChangeWatcher).
///
/// A map engine that merely fails to draw is not an error: the render
/// returns a frame without a bitmap instead.
#[derive(Debug, Error)]
pub enum RendererError {
    /// Graphics context setup or binding failed.
    #[error("Graphics context error: {0}")]
    Context(#[from] ContextError),

    /// Pixel buffer conversion failed.
    #[error("Pixel conversion error: {0}")]
    Pixel(#[from] PixelError),

    /// The map engine could not be created.
    #[error("Map engine error: {0}")]
    Engine(#[from] anyhow::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem watch could not be established.
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error (reading config, spawning the watcher thread).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RendererError {
    /// Returns true if a later render on the same renderer may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Context(e) => e.is_recoverable(),
            Self::Pixel(_) => true,
            _ => false,
        }
    }

    /// Returns true if rendering is impossible until the setup problem is fixed.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Context(e) => e.is_setup_error(),
            Self::Engine(_) | Self::Config(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        let bind = RendererError::from(ContextError::ContextBindFailed("lost".into()));
        assert!(bind.is_retryable());
        assert!(!bind.is_fatal());

        let setup = RendererError::from(ContextError::NoDisplay);
        assert!(!setup.is_retryable());
        assert!(setup.is_fatal());

        let config = RendererError::Config("width must be non-zero".into());
        assert!(config.is_fatal());
        assert_eq!(config.to_string(), "Configuration error: width must be non-zero");
    }
}
