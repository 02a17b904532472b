//! Channel permutation between pixel formats.
//!
//! A [`ChannelPermutation`] is a 4x4 0/1 matrix applied to every pixel
//! vector. It only moves bytes: no channel is scaled, blended or converted
//! between color spaces.

use crate::{PixelError, PixelFormat};
use rayon::prelude::*;

/// Reorders the four bytes of every pixel.
///
/// Stored as a source table: output byte `i` takes input byte `source[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelPermutation {
    source: [usize; 4],
}

impl ChannelPermutation {
    /// The permutation that leaves every pixel unchanged.
    pub const IDENTITY: Self = Self {
        source: [0, 1, 2, 3],
    };

    /// Create a permutation from a source table.
    ///
    /// # Errors
    ///
    /// Returns [`PixelError::InvalidPermutation`] if `source` does not name each
    /// of the bytes 0..4 exactly once.
    pub fn new(source: [usize; 4]) -> Result<Self, PixelError> {
        let mut seen = [false; 4];
        for &index in &source {
            if index >= 4 || seen[index] {
                return Err(PixelError::InvalidPermutation(source));
            }
            seen[index] = true;
        }
        Ok(Self { source })
    }

    /// Swap bytes 0 and 2, exchanging red and blue between RGBA and BGRA.
    pub const fn swap_red_blue() -> Self {
        Self {
            source: [2, 1, 0, 3],
        }
    }

    /// The permutation that converts pixels stored as `from` into `to`.
    ///
    /// Both formats must be valid (see [`PixelFormat::is_valid`]).
    pub fn between(from: &PixelFormat, to: &PixelFormat) -> Self {
        let mut source = [0usize; 4];
        for (src, dst) in from.channel_indices().into_iter().zip(to.channel_indices()) {
            source[dst] = src;
        }
        Self { source }
    }

    /// Source table: output byte `i` is read from input byte `source()[i]`.
    pub const fn source(&self) -> [usize; 4] {
        self.source
    }

    /// The permutation as a row-major 0/1 matrix, `out = M * in`.
    pub fn matrix(&self) -> [[u8; 4]; 4] {
        let mut matrix = [[0u8; 4]; 4];
        for (row, &col) in self.source.iter().enumerate() {
            matrix[row][col] = 1;
        }
        matrix
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Apply to a single pixel.
    pub fn apply_pixel(&self, pixel: [u8; 4]) -> [u8; 4] {
        let [a, b, c, d] = self.source;
        [pixel[a], pixel[b], pixel[c], pixel[d]]
    }

    /// Apply in place to a tightly packed buffer, one row per task.
    ///
    /// Any trailing bytes that do not form a whole pixel are left untouched.
    pub fn apply(&self, data: &mut [u8], row_len: usize) {
        if self.is_identity() || data.is_empty() {
            return;
        }
        let chunk = row_len.max(PixelFormat::BYTES_PER_PIXEL);
        data.par_chunks_mut(chunk).for_each(|row| {
            for pixel in row.chunks_exact_mut(PixelFormat::BYTES_PER_PIXEL) {
                let permuted = self.apply_pixel([pixel[0], pixel[1], pixel[2], pixel[3]]);
                pixel.copy_from_slice(&permuted);
            }
        });
    }
}

impl Default for ChannelPermutation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_between_rgba_and_bgra_swaps_red_blue() {
        let perm = ChannelPermutation::between(&PixelFormat::rgba8888(), &PixelFormat::bgra8888());
        assert_eq!(perm, ChannelPermutation::swap_red_blue());
        assert_eq!(perm.apply_pixel([1, 2, 3, 4]), [3, 2, 1, 4]);
    }

    #[test]
    fn test_between_same_format_is_identity() {
        let pf = PixelFormat::bgra8888();
        assert!(ChannelPermutation::between(&pf, &pf).is_identity());
    }

    #[test]
    fn test_matrix() {
        assert_eq!(
            ChannelPermutation::swap_red_blue().matrix(),
            [[0, 0, 1, 0], [0, 1, 0, 0], [1, 0, 0, 0], [0, 0, 0, 1]]
        );
    }

    #[test]
    fn test_new_rejects_non_permutations() {
        assert!(ChannelPermutation::new([0, 1, 2, 3]).is_ok());
        assert!(matches!(
            ChannelPermutation::new([0, 0, 2, 3]),
            Err(PixelError::InvalidPermutation(_))
        ));
        assert!(ChannelPermutation::new([0, 1, 2, 4]).is_err());
    }

    #[test]
    fn test_apply_buffer() {
        let mut data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        ChannelPermutation::swap_red_blue().apply(&mut data, 8);
        assert_eq!(data, vec![3, 2, 1, 4, 7, 6, 5, 8, 11, 10, 9, 12]);
    }
}
