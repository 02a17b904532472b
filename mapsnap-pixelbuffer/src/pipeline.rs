//! Framebuffer read-back to display bitmap conversion.
//!
//! The raw buffer read from the framebuffer is bottom-up and in the
//! framebuffer's channel order. [`PixelTransformPipeline::to_display_bitmap`]
//! applies two independent steps:
//!
//! 1. a fixed [`ChannelPermutation`] from the framebuffer format to the display
//!    format (red/blue swap for RGBA to BGRA)
//! 2. an [`AffineTransform`] with a negative vertical scale, so framebuffer row
//!    0 (the bottom scan-line) ends up as bitmap row `height - 1`
//!
//! No cropping, scaling or compression happens here. The output always has the
//! pipeline's fixed frame size.

use crate::{AffineTransform, Bitmap, ChannelPermutation, PixelError, PixelFormat};
use mapsnap_common::FrameSize;
use tracing::trace;

/// Converts read-back framebuffers of one fixed size into display bitmaps.
#[derive(Debug, Clone)]
pub struct PixelTransformPipeline {
    size: FrameSize,
    source_format: PixelFormat,
    display_format: PixelFormat,
    permutation: ChannelPermutation,
    orientation: AffineTransform,
}

impl PixelTransformPipeline {
    /// RGBA framebuffer to BGRA display bitmap, flipped top-down.
    pub fn new(size: FrameSize) -> Self {
        Self::with_formats(size, PixelFormat::rgba8888(), PixelFormat::bgra8888())
    }

    /// Pipeline between arbitrary 32-bit formats, flipped top-down.
    pub fn with_formats(size: FrameSize, source_format: PixelFormat, display_format: PixelFormat) -> Self {
        Self {
            size,
            source_format,
            display_format,
            permutation: ChannelPermutation::between(&source_format, &display_format),
            orientation: AffineTransform::vertical_flip(size.height),
        }
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn source_format(&self) -> PixelFormat {
        self.source_format
    }

    pub fn display_format(&self) -> PixelFormat {
        self.display_format
    }

    pub fn permutation(&self) -> ChannelPermutation {
        self.permutation
    }

    pub fn orientation(&self) -> AffineTransform {
        self.orientation
    }

    /// Convert a raw read-back buffer into a display bitmap.
    ///
    /// # Errors
    ///
    /// - [`PixelError::SizeMismatch`] if `width x height` differs from the
    ///   pipeline's frame size
    /// - [`PixelError::BufferLength`] if `raw` is not tightly packed for that size
    pub fn to_display_bitmap(&self, raw: Vec<u8>, width: u32, height: u32) -> Result<Bitmap, PixelError> {
        let actual = FrameSize::new(width, height);
        if actual != self.size {
            return Err(PixelError::SizeMismatch {
                expected: self.size,
                actual,
            });
        }

        let mut bitmap = Bitmap::from_raw(self.size, self.source_format, raw)?;

        self.permutation
            .apply(bitmap.as_bytes_mut(), self.size.row_len(PixelFormat::BYTES_PER_PIXEL));
        bitmap.set_format(self.display_format);

        self.orientation.apply_to(&mut bitmap)?;

        trace!(size = %self.size, "converted framebuffer to display bitmap");
        Ok(bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_dimensions() {
        let pipeline = PixelTransformPipeline::new(FrameSize::new(4, 4));
        let result = pipeline.to_display_bitmap(vec![0; 4 * 2 * 4], 4, 2);
        assert!(matches!(result, Err(PixelError::SizeMismatch { .. })));
    }

    #[test]
    fn test_rejects_padded_rows() {
        let pipeline = PixelTransformPipeline::new(FrameSize::new(3, 2));
        // Rows padded to 16 bytes instead of 12.
        let result = pipeline.to_display_bitmap(vec![0; 32], 3, 2);
        assert!(matches!(
            result,
            Err(PixelError::BufferLength {
                expected: 24,
                actual: 32
            })
        ));
    }

    #[test]
    fn test_single_row_only_permutes() {
        let pipeline = PixelTransformPipeline::new(FrameSize::new(2, 1));
        let bitmap = pipeline
            .to_display_bitmap(vec![1, 2, 3, 4, 5, 6, 7, 8], 2, 1)
            .unwrap();
        assert_eq!(bitmap.as_bytes(), &[3, 2, 1, 4, 7, 6, 5, 8]);
        assert_eq!(bitmap.format(), PixelFormat::bgra8888());
    }
}
