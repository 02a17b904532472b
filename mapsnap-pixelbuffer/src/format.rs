//! 32-bit pixel format descriptions.
//!
//! This module defines the [`PixelFormat`] type which describes where each
//! 8-bit color channel lives inside a 4-byte pixel.
//!
//! # Formats in Use
//!
//! Two layouts matter for off-screen rendering:
//! - **RGBA8888**: what `glReadPixels(GL_RGBA, GL_UNSIGNED_BYTE)` writes, byte
//!   order `[R, G, B, A]`
//! - **BGRA8888**: what the display bitmap stores, byte order `[B, G, R, A]`
//!   (a little-endian `0xAARRGGBB` word)
//!
//! Converting between them is a pure channel permutation; color values are
//! never altered. See [`ChannelPermutation`](crate::ChannelPermutation).
//!
//! # Critical Note: Buffers Are Tightly Packed
//!
//! Rows carry no padding. A buffer for a `width x height` frame is exactly
//! `width * height * 4` bytes long, which is why read-back sets the GL pack
//! alignment to 1 before reading.
//!
//! # Example
//!
//! ```
//! use mapsnap_pixelbuffer::PixelFormat;
//!
//! let pf = PixelFormat::bgra8888();
//! assert_eq!(pf.bytes_per_pixel(), 4);
//!
//! // Stored as [B, G, R, A]
//! let stored = pf.from_rgba([0xAA, 0xBB, 0xCC, 0xFF]);
//! assert_eq!(stored, [0xCC, 0xBB, 0xAA, 0xFF]);
//! assert_eq!(pf.to_rgba(&stored), [0xAA, 0xBB, 0xCC, 0xFF]);
//! ```

/// Byte positions of the four channels inside a 4-byte pixel.
///
/// Every index is in `0..4` and the four indices are distinct; use
/// [`PixelFormat::is_valid`] to check formats built by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    /// Byte index of the red channel.
    pub red_index: u8,

    /// Byte index of the green channel.
    pub green_index: u8,

    /// Byte index of the blue channel.
    pub blue_index: u8,

    /// Byte index of the alpha channel.
    pub alpha_index: u8,
}

impl PixelFormat {
    /// Bytes in one pixel. All supported formats are 32 bits wide.
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Returns bytes-per-pixel (always 4).
    pub const fn bytes_per_pixel(&self) -> usize {
        Self::BYTES_PER_PIXEL
    }

    /// Byte order `[R, G, B, A]`, as read back from a GL framebuffer.
    ///
    /// # Example
    ///
    /// ```
    /// use mapsnap_pixelbuffer::PixelFormat;
    ///
    /// let pf = PixelFormat::rgba8888();
    /// assert_eq!(pf.red_index, 0);
    /// assert_eq!(pf.alpha_index, 3);
    /// ```
    pub const fn rgba8888() -> Self {
        Self {
            red_index: 0,
            green_index: 1,
            blue_index: 2,
            alpha_index: 3,
        }
    }

    /// Byte order `[B, G, R, A]`, as stored by the display bitmap.
    pub const fn bgra8888() -> Self {
        Self {
            red_index: 2,
            green_index: 1,
            blue_index: 0,
            alpha_index: 3,
        }
    }

    /// Channel byte indices in `[R, G, B, A]` order.
    pub const fn channel_indices(&self) -> [usize; 4] {
        [
            self.red_index as usize,
            self.green_index as usize,
            self.blue_index as usize,
            self.alpha_index as usize,
        ]
    }

    /// Check that every index is in range and no two channels share a byte.
    pub fn is_valid(&self) -> bool {
        let mut seen = [false; 4];
        for index in self.channel_indices() {
            if index >= Self::BYTES_PER_PIXEL || seen[index] {
                return false;
            }
            seen[index] = true;
        }
        true
    }

    /// Converts a stored pixel to `[R, G, B, A]`.
    ///
    /// # Panics
    ///
    /// Panics if `pixel.len()` is not 4.
    pub fn to_rgba(&self, pixel: &[u8]) -> [u8; 4] {
        assert_eq!(
            pixel.len(),
            Self::BYTES_PER_PIXEL,
            "pixel length {} does not match bytes_per_pixel {}",
            pixel.len(),
            Self::BYTES_PER_PIXEL
        );

        let [r, g, b, a] = self.channel_indices();
        [pixel[r], pixel[g], pixel[b], pixel[a]]
    }

    /// Converts an `[R, G, B, A]` pixel into this format's byte order.
    pub fn from_rgba(&self, rgba: [u8; 4]) -> [u8; 4] {
        let mut stored = [0u8; 4];
        for (channel, index) in self.channel_indices().into_iter().enumerate() {
            stored[index] = rgba[channel];
        }
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba8888_is_identity() {
        let pf = PixelFormat::rgba8888();
        assert!(pf.is_valid());
        assert_eq!(pf.to_rgba(&[1, 2, 3, 4]), [1, 2, 3, 4]);
        assert_eq!(pf.from_rgba([1, 2, 3, 4]), [1, 2, 3, 4]);
    }

    #[test]
    fn test_bgra8888_layout() {
        let pf = PixelFormat::bgra8888();
        assert!(pf.is_valid());
        assert_eq!(pf.from_rgba([0x11, 0x22, 0x33, 0x44]), [0x33, 0x22, 0x11, 0x44]);
        assert_eq!(pf.to_rgba(&[0x33, 0x22, 0x11, 0x44]), [0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_invalid_formats() {
        let duplicate = PixelFormat {
            red_index: 0,
            green_index: 0,
            blue_index: 2,
            alpha_index: 3,
        };
        assert!(!duplicate.is_valid());

        let out_of_range = PixelFormat {
            red_index: 4,
            ..PixelFormat::rgba8888()
        };
        assert!(!out_of_range.is_valid());
    }

    #[test]
    #[should_panic(expected = "does not match bytes_per_pixel")]
    fn test_to_rgba_wrong_length() {
        PixelFormat::rgba8888().to_rgba(&[0, 0, 0]);
    }
}
