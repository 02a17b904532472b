//! Affine transforms applied to whole bitmaps.
//!
//! GL framebuffers have their origin at the bottom-left, bitmaps at the
//! top-left. The pipeline expresses the fix-up as a negative vertical scale
//! followed by a translation by the frame height, and hands the resulting
//! transform to the `image` crate's in-place flip primitives.
//!
//! Only axis-aligned mirrors that map the frame onto itself are supported.
//! Anything that would need resampling is rejected.

use crate::{Bitmap, PixelError};
use image::{imageops, ImageBuffer, Rgba};

/// A 2D affine transform.
///
/// Maps `(x, y)` to `(sx * x + shx * y + tx, shy * x + sy * y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub sx: f64,
    pub shy: f64,
    pub shx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl AffineTransform {
    pub const fn identity() -> Self {
        Self {
            sx: 1.0,
            shy: 0.0,
            shx: 0.0,
            sy: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self {
            sx,
            sy,
            ..Self::identity()
        }
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::identity()
        }
    }

    /// Compose: the returned transform applies `self` first, then `next`.
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        Self {
            sx: next.sx * self.sx + next.shx * self.shy,
            shx: next.sx * self.shx + next.shx * self.sy,
            tx: next.sx * self.tx + next.shx * self.ty + next.tx,
            shy: next.shy * self.sx + next.sy * self.shy,
            sy: next.shy * self.shx + next.sy * self.sy,
            ty: next.shy * self.tx + next.sy * self.ty + next.ty,
        }
    }

    /// Mirror about the horizontal center line of a frame `height` rows tall.
    pub fn vertical_flip(height: u32) -> Self {
        Self::scale(1.0, -1.0).then(&Self::translate(0.0, f64::from(height)))
    }

    /// Map a point through the transform.
    pub fn map_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.sx * x + self.shx * y + self.tx,
            self.shy * x + self.sy * y + self.ty,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Apply in place to `bitmap`.
    ///
    /// # Errors
    ///
    /// Returns [`PixelError::UnsupportedTransform`] unless the transform is a
    /// combination of horizontal and vertical mirrors that keeps the frame in
    /// place.
    pub fn apply_to(&self, bitmap: &mut Bitmap) -> Result<(), PixelError> {
        let (width, height) = (bitmap.width(), bitmap.height());
        let flip_x = mirror_axis(self.sx, self.tx, width)
            .ok_or_else(|| self.unsupported(width, height))?;
        let flip_y = mirror_axis(self.sy, self.ty, height)
            .ok_or_else(|| self.unsupported(width, height))?;
        if self.shx != 0.0 || self.shy != 0.0 {
            return Err(self.unsupported(width, height));
        }
        if !flip_x && !flip_y {
            return Ok(());
        }

        let expected = bitmap.size().byte_len(4);
        let actual = bitmap.as_bytes().len();
        let mut view: ImageBuffer<Rgba<u8>, &mut [u8]> =
            ImageBuffer::from_raw(width, height, bitmap.as_bytes_mut())
                .ok_or(PixelError::BufferLength { expected, actual })?;

        if flip_y {
            imageops::flip_vertical_in_place(&mut view);
        }
        if flip_x {
            imageops::flip_horizontal_in_place(&mut view);
        }
        Ok(())
    }

    fn unsupported(&self, width: u32, height: u32) -> PixelError {
        PixelError::UnsupportedTransform(format!("{self:?} on a {width}x{height} frame"))
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Some(true) for a mirror along this axis, Some(false) for no change,
/// None if the axis would be scaled or shifted off the frame.
fn mirror_axis(scale: f64, offset: f64, extent: u32) -> Option<bool> {
    if scale == 1.0 && offset == 0.0 {
        Some(false)
    } else if scale == -1.0 && offset == f64::from(extent) {
        Some(true)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelFormat;
    use mapsnap_common::FrameSize;

    fn numbered_rows(width: u32, height: u32) -> Bitmap {
        let size = FrameSize::new(width, height);
        let mut data = Vec::with_capacity(size.byte_len(4));
        for row in 0..height {
            for _ in 0..width {
                data.extend_from_slice(&[row as u8, 0, 0, 255]);
            }
        }
        Bitmap::from_raw(size, PixelFormat::rgba8888(), data).unwrap()
    }

    #[test]
    fn test_vertical_flip_maps_pixel_centers() {
        let flip = AffineTransform::vertical_flip(10);
        assert_eq!(flip.map_point(3.0, 0.5), (3.0, 9.5));
        assert_eq!(flip.map_point(3.0, 9.5), (3.0, 0.5));
        assert_eq!(flip.then(&flip), AffineTransform::identity());
    }

    #[test]
    fn test_apply_vertical_flip() {
        let mut bitmap = numbered_rows(3, 4);
        AffineTransform::vertical_flip(4).apply_to(&mut bitmap).unwrap();
        for row in 0..4 {
            assert_eq!(bitmap.pixel(1, row)[0], (3 - row) as u8);
        }
    }

    #[test]
    fn test_identity_is_noop() {
        let mut bitmap = numbered_rows(2, 2);
        let before = bitmap.clone();
        AffineTransform::identity().apply_to(&mut bitmap).unwrap();
        assert_eq!(bitmap, before);
    }

    #[test]
    fn test_rejects_scaling() {
        let mut bitmap = numbered_rows(2, 2);
        let result = AffineTransform::scale(2.0, 1.0).apply_to(&mut bitmap);
        assert!(matches!(result, Err(PixelError::UnsupportedTransform(_))));

        // Mirror without the matching translation would move the frame away.
        let result = AffineTransform::scale(1.0, -1.0).apply_to(&mut bitmap);
        assert!(result.is_err());
    }
}
