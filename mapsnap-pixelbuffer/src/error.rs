//! Error type for pixel buffer operations.

use mapsnap_common::FrameSize;
use thiserror::Error;

/// Errors raised while converting or exporting pixel data.
#[derive(Debug, Error)]
pub enum PixelError {
    /// Buffer length does not match the frame dimensions.
    #[error("buffer holds {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    /// Input dimensions differ from the pipeline's fixed frame size.
    #[error("frame is {actual}, expected {expected}")]
    SizeMismatch { expected: FrameSize, actual: FrameSize },

    /// Channel mapping is not a permutation of the four channels.
    #[error("invalid channel permutation {0:?}")]
    InvalidPermutation([usize; 4]),

    /// Transform needs resampling, which the bitmap primitives do not do.
    #[error("unsupported transform: {0}")]
    UnsupportedTransform(String),

    /// Image encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
