//! Patch dissimilarity and weight computation shared by both engines.
//!
//! The weight kernel is `exp(-d / (h^2 * block_size^2 * channels))`. The
//! denominator normalizes the squared-difference sum by patch area and
//! channel count so a given `h` has the same visual meaning regardless of
//! the configured block size.

use crate::error::{NlmError, Result};
use crate::float_trait::NlmFloat;
use crate::image::{BorderMode, ImageBuf};

/// `h^2 * block_size^2 * channels`, the weight-kernel denominator.
#[inline]
pub(crate) fn norm_constant<F: NlmFloat>(h: F, block_size: usize, channels: usize) -> F {
    h * h * F::usize_as(block_size * block_size * channels)
}

/// Map a dissimilarity score to a weight given the precomputed reciprocal
/// of [`norm_constant`]. Returns 1 for identical patches and underflows
/// toward +0 for very dissimilar ones.
#[inline]
pub(crate) fn weight<F: NlmFloat>(dissimilarity: F, inv_norm: F) -> F {
    (-dissimilarity * inv_norm).exp()
}

/// Sum of squared differences between the patches centered at `p` and `q`,
/// over all channels, with out-of-bounds samples resolved by `mode`.
pub(crate) fn patch_distance<F: NlmFloat>(
    src: &ImageBuf,
    p: (isize, isize),
    q: (isize, isize),
    block_radius: isize,
    mode: BorderMode,
) -> F {
    let mut sum = F::zero();
    for dy in -block_radius..=block_radius {
        for dx in -block_radius..=block_radius {
            for c in 0..src.channels() {
                let a = src.sample_extrapolated(p.0 + dx, p.1 + dy, c, mode);
                let b = src.sample_extrapolated(q.0 + dx, q.1 + dy, c, mode);
                let diff = F::u8_as(a) - F::u8_as(b);
                sum += diff * diff;
            }
        }
    }
    sum
}

/// Eager parameter validation shared by every entry point. Runs before any
/// scratch allocation or pixel work so a failed call leaves the destination
/// untouched.
pub(crate) fn validate_common<F: NlmFloat>(
    src: &ImageBuf,
    h: F,
    search_window: usize,
    block_size: usize,
) -> Result<()> {
    if !(h > F::zero()) || !h.is_finite() {
        return Err(NlmError::invalid_parameter(format!(
            "filter strength h must be a positive finite number, got {h:?}"
        )));
    }
    if search_window == 0 || search_window % 2 == 0 {
        return Err(NlmError::invalid_parameter(format!(
            "search_window must be an odd positive integer, got {search_window}"
        )));
    }
    if block_size == 0 || block_size % 2 == 0 {
        return Err(NlmError::invalid_parameter(format!(
            "block_size must be an odd positive integer, got {block_size}"
        )));
    }
    if search_window < block_size {
        return Err(NlmError::invalid_parameter(format!(
            "search_window ({search_window}) must be at least block_size ({block_size})"
        )));
    }
    if src.width() == 0 || src.height() == 0 {
        return Err(NlmError::invalid_parameter("source image is empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_of_identical_patches_is_one() {
        let inv_norm = 1.0f32 / norm_constant(10.0f32, 7, 3);
        assert_eq!(weight(0.0f32, inv_norm), 1.0);
    }

    #[test]
    fn test_weight_decays_monotonically() {
        let inv_norm = 1.0f64 / norm_constant(10.0f64, 7, 1);
        let mut prev = weight(0.0f64, inv_norm);
        for d in [10.0, 100.0, 1_000.0, 100_000.0] {
            let w = weight(d, inv_norm);
            assert!(w < prev);
            assert!(w >= 0.0);
            prev = w;
        }
    }

    #[test]
    fn test_weight_underflows_gracefully() {
        let inv_norm = 1.0f32 / norm_constant(0.01f32, 1, 1);
        let w = weight(1e9f32, inv_norm);
        assert_eq!(w, 0.0);
        assert!(!w.is_nan());
    }

    #[test]
    fn test_norm_constant_scales_with_geometry() {
        assert_eq!(norm_constant(2.0f32, 3, 1), 4.0 * 9.0);
        assert_eq!(norm_constant(2.0f32, 3, 3), 4.0 * 27.0);
    }

    #[test]
    fn test_patch_distance_identical_centers() {
        let img = ImageBuf::from_vec(vec![1, 2, 3, 4, 5, 6, 7, 8, 9], 3, 3, 1).unwrap();
        let d: f32 = patch_distance(&img, (1, 1), (1, 1), 1, BorderMode::Reflect101);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_patch_distance_known_value() {
        // Two constant half-planes, trivial 1x1 patches.
        let img = ImageBuf::from_vec(vec![0, 0, 10, 10], 2, 2, 1).unwrap();
        let d: f32 = patch_distance(&img, (0, 0), (0, 1), 0, BorderMode::Reflect101);
        assert_eq!(d, 100.0);
    }

    #[test]
    fn test_patch_distance_sums_channels() {
        let img = ImageBuf::from_vec(vec![0, 0, 1, 2], 2, 1, 2).unwrap();
        let d: f64 = patch_distance(&img, (0, 0), (1, 0), 0, BorderMode::Reflect101);
        assert_eq!(d, 1.0 + 4.0);
    }

    #[test]
    fn test_validate_common_rejects_bad_parameters() {
        let img = ImageBuf::new(8, 8, 1);
        assert!(validate_common(&img, 10.0f32, 5, 3).is_ok());
        assert!(matches!(
            validate_common(&img, 0.0f32, 5, 3),
            Err(NlmError::InvalidParameter { .. })
        ));
        assert!(matches!(
            validate_common(&img, -1.0f32, 5, 3),
            Err(NlmError::InvalidParameter { .. })
        ));
        assert!(matches!(
            validate_common(&img, 10.0f32, 4, 3),
            Err(NlmError::InvalidParameter { .. })
        ));
        assert!(matches!(
            validate_common(&img, 10.0f32, 5, 0),
            Err(NlmError::InvalidParameter { .. })
        ));
        assert!(matches!(
            validate_common(&img, 10.0f32, 3, 5),
            Err(NlmError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_validate_common_allows_trivial_windows() {
        let img = ImageBuf::new(4, 4, 1);
        assert!(validate_common(&img, 1.0f32, 1, 1).is_ok());
    }
}
