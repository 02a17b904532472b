//! Owned, tightly packed 32-bit bitmaps.

use crate::{PixelError, PixelFormat};
use image::RgbaImage;
use mapsnap_common::FrameSize;
use std::path::Path;

/// A `width x height` grid of 4-byte pixels, row 0 at the top.
///
/// Rows are tightly packed: the buffer is exactly `width * height * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    size: FrameSize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Bitmap {
    /// Create a zero-filled bitmap.
    pub fn new(size: FrameSize, format: PixelFormat) -> Self {
        Self {
            size,
            format,
            data: vec![0; size.byte_len(PixelFormat::BYTES_PER_PIXEL)],
        }
    }

    /// Wrap an existing buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PixelError::BufferLength`] if `data` is not exactly
    /// `width * height * 4` bytes.
    pub fn from_raw(size: FrameSize, format: PixelFormat, data: Vec<u8>) -> Result<Self, PixelError> {
        let expected = size.byte_len(PixelFormat::BYTES_PER_PIXEL);
        if data.len() != expected {
            return Err(PixelError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { size, format, data })
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Relabel the buffer with a new format without touching its bytes.
    pub(crate) fn set_format(&mut self, format: PixelFormat) {
        self.format = format;
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.size.width && y < self.size.height,
            "pixel ({x}, {y}) outside {} bitmap",
            self.size
        );
        (y as usize * self.size.width as usize + x as usize) * PixelFormat::BYTES_PER_PIXEL
    }

    /// Stored bytes of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = self.offset(x, y);
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&self.data[offset..offset + PixelFormat::BYTES_PER_PIXEL]);
        pixel
    }

    /// The pixel at `(x, y)` as `[R, G, B, A]`.
    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        self.format.to_rgba(&self.pixel(x, y))
    }

    /// Convert to an RGBA image for encoding.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut rgba = Vec::with_capacity(self.data.len());
        for pixel in self.data.chunks_exact(PixelFormat::BYTES_PER_PIXEL) {
            rgba.extend_from_slice(&self.format.to_rgba(pixel));
        }
        // Length always matches, from_raw only fails on a short buffer.
        RgbaImage::from_raw(self.size.width, self.size.height, rgba)
            .unwrap_or_else(|| RgbaImage::new(self.size.width, self.size.height))
    }

    /// Encode as PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), PixelError> {
        self.to_rgba_image()
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}
