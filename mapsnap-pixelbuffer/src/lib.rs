//! Pixel formats, bitmaps and framebuffer read-back conversion.
//!
//! This crate turns the raw buffer read back from a GL framebuffer into a
//! display-ready [`Bitmap`]: channels are permuted into the display order and
//! the image is flipped so row 0 is the top scan-line.

pub mod bitmap;
pub mod error;
pub mod format;
pub mod permutation;
pub mod pipeline;
pub mod transform;

pub use bitmap::Bitmap;
pub use error::PixelError;
pub use format::PixelFormat;
pub use permutation::ChannelPermutation;
pub use pipeline::PixelTransformPipeline;
pub use transform::AffineTransform;
