//! 8-bit interleaved image buffer and border extrapolation.
//!
//! Images are row-major with an arbitrary row stride (in samples) so a
//! buffer can carry row padding and be reused across differently shaped
//! calls. Engines read sources through [`ImageBuf::sample`] /
//! [`ImageBuf::sample_extrapolated`] and write destinations exactly once
//! per pixel.

use crate::error::{NlmError, Result};

/// Border extrapolation policy for out-of-bounds patch samples.
///
/// The integer codes accepted by [`BorderMode::from_code`] follow the
/// conventional OpenCV numbering so callers porting parameter sets keep
/// their configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    /// `iiiiii|abcdefgh|iiiiiii` where `i` is zero.
    Constant,
    /// `aaaaaa|abcdefgh|hhhhhhh`
    Replicate,
    /// `fedcba|abcdefgh|hgfedcb`
    Reflect,
    /// `cdefgh|abcdefgh|abcdefg`
    Wrap,
    /// `gfedcb|abcdefgh|gfedcba` (edge pixel not duplicated; the default).
    Reflect101,
}

impl Default for BorderMode {
    fn default() -> Self {
        BorderMode::Reflect101
    }
}

impl BorderMode {
    /// The integer code used by foreign callers for this mode.
    pub const fn code(self) -> i32 {
        match self {
            BorderMode::Constant => 0,
            BorderMode::Replicate => 1,
            BorderMode::Reflect => 2,
            BorderMode::Wrap => 3,
            BorderMode::Reflect101 => 4,
        }
    }

    /// Map an integer border code to a mode, rejecting anything outside
    /// the supported set before any pixel work starts.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(BorderMode::Constant),
            1 => Ok(BorderMode::Replicate),
            2 => Ok(BorderMode::Reflect),
            3 => Ok(BorderMode::Wrap),
            4 => Ok(BorderMode::Reflect101),
            _ => Err(NlmError::UnsupportedBorderMode { code }),
        }
    }
}

/// Resolve a possibly out-of-bounds coordinate along one axis.
///
/// Returns `None` only for [`BorderMode::Constant`] when `p` falls outside
/// `0..len`; the caller substitutes the constant sample (zero).
#[inline]
pub fn border_interpolate(p: isize, len: usize, mode: BorderMode) -> Option<usize> {
    let n = len as isize;
    debug_assert!(n > 0);
    if (0..n).contains(&p) {
        return Some(p as usize);
    }
    match mode {
        BorderMode::Constant => None,
        BorderMode::Replicate => Some(p.clamp(0, n - 1) as usize),
        BorderMode::Wrap => Some(p.rem_euclid(n) as usize),
        BorderMode::Reflect => {
            let mut q = p;
            while !(0..n).contains(&q) {
                if q < 0 {
                    q = -q - 1;
                } else {
                    q = 2 * n - 1 - q;
                }
            }
            Some(q as usize)
        }
        BorderMode::Reflect101 => {
            if n == 1 {
                return Some(0);
            }
            let mut q = p;
            while !(0..n).contains(&q) {
                if q < 0 {
                    q = -q;
                } else {
                    q = 2 * n - 2 - q;
                }
            }
            Some(q as usize)
        }
    }
}

/// A 2D grid of 8-bit samples with 1, 2 or 3 interleaved channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuf {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
    /// Row stride in samples; `>= width * channels`.
    stride: usize,
}

impl ImageBuf {
    /// Allocate a zeroed, packed image (`stride == width * channels`).
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        let stride = width * channels;
        Self {
            data: vec![0; stride * height],
            width,
            height,
            channels,
            stride,
        }
    }

    /// Wrap an existing packed sample vector.
    pub fn from_vec(data: Vec<u8>, width: usize, height: usize, channels: usize) -> Result<Self> {
        Self::from_vec_with_stride(data, width, height, channels, width * channels)
    }

    /// Wrap an existing sample vector with explicit row stride (in samples).
    pub fn from_vec_with_stride(
        data: Vec<u8>,
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(NlmError::invalid_parameter(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        if !(1..=3).contains(&channels) {
            return Err(NlmError::invalid_parameter(format!(
                "channel count must be 1, 2 or 3, got {channels}"
            )));
        }
        if stride < width * channels {
            return Err(NlmError::invalid_parameter(format!(
                "row stride {stride} is smaller than row width {} samples",
                width * channels
            )));
        }
        let needed = stride * (height - 1) + width * channels;
        if data.len() < needed {
            return Err(NlmError::invalid_parameter(format!(
                "sample buffer holds {} samples but the geometry needs {needed}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
            stride,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// One row of samples (`width * channels` long).
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width * self.channels]
    }

    /// Sample at an in-bounds coordinate.
    #[inline]
    pub fn sample(&self, x: usize, y: usize, c: usize) -> u8 {
        debug_assert!(x < self.width && y < self.height && c < self.channels);
        self.data[y * self.stride + x * self.channels + c]
    }

    #[inline]
    pub(crate) fn set_sample(&mut self, x: usize, y: usize, c: usize, value: u8) {
        debug_assert!(x < self.width && y < self.height && c < self.channels);
        self.data[y * self.stride + x * self.channels + c] = value;
    }

    /// Sample at an arbitrary coordinate, resolving out-of-bounds positions
    /// through the border policy. `Constant` yields zero outside the image.
    #[inline]
    pub fn sample_extrapolated(&self, x: isize, y: isize, c: usize, mode: BorderMode) -> u8 {
        match (
            border_interpolate(x, self.width, mode),
            border_interpolate(y, self.height, mode),
        ) {
            (Some(xi), Some(yi)) => self.sample(xi, yi, c),
            _ => 0,
        }
    }

    /// Reshape this buffer to the packed geometry of `other`, reusing the
    /// allocation when it already fits. Contents are unspecified afterwards;
    /// callers overwrite every pixel.
    pub(crate) fn reshape_like(&mut self, other: &ImageBuf) {
        self.width = other.width;
        self.height = other.height;
        self.channels = other.channels;
        self.stride = other.width * other.channels;
        self.data.resize(self.stride * self.height, 0);
    }

    pub(crate) fn reshape(&mut self, width: usize, height: usize, channels: usize) {
        self.width = width;
        self.height = height;
        self.channels = channels;
        self.stride = width * channels;
        self.data.resize(self.stride * height, 0);
    }
}

/// Build a border-extrapolated copy of `src` grown by `pad` pixels on every
/// side, writing into `out` (reused across calls). The fast engine reads
/// all patch and offset coordinates from this copy instead of performing
/// per-pixel boundary checks.
pub(crate) fn padded_copy(src: &ImageBuf, pad: usize, mode: BorderMode, out: &mut ImageBuf) {
    let ch = src.channels();
    out.reshape(src.width() + 2 * pad, src.height() + 2 * pad, ch);
    let pad = pad as isize;
    for oy in 0..out.height() {
        let sy = oy as isize - pad;
        for ox in 0..out.width() {
            let sx = ox as isize - pad;
            for c in 0..ch {
                out.set_sample(ox, oy, c, src.sample_extrapolated(sx, sy, c, mode));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_interpolate_in_bounds() {
        for mode in [
            BorderMode::Constant,
            BorderMode::Replicate,
            BorderMode::Reflect,
            BorderMode::Wrap,
            BorderMode::Reflect101,
        ] {
            assert_eq!(border_interpolate(3, 8, mode), Some(3));
        }
    }

    #[test]
    fn test_border_interpolate_reflect101() {
        // gfedcb|abcdefgh|gfedcba
        assert_eq!(border_interpolate(-1, 8, BorderMode::Reflect101), Some(1));
        assert_eq!(border_interpolate(-3, 8, BorderMode::Reflect101), Some(3));
        assert_eq!(border_interpolate(8, 8, BorderMode::Reflect101), Some(6));
        assert_eq!(border_interpolate(10, 8, BorderMode::Reflect101), Some(4));
    }

    #[test]
    fn test_border_interpolate_reflect() {
        // fedcba|abcdefgh|hgfedcb
        assert_eq!(border_interpolate(-1, 8, BorderMode::Reflect), Some(0));
        assert_eq!(border_interpolate(-3, 8, BorderMode::Reflect), Some(2));
        assert_eq!(border_interpolate(8, 8, BorderMode::Reflect), Some(7));
        assert_eq!(border_interpolate(10, 8, BorderMode::Reflect), Some(5));
    }

    #[test]
    fn test_border_interpolate_replicate_and_wrap() {
        assert_eq!(border_interpolate(-5, 8, BorderMode::Replicate), Some(0));
        assert_eq!(border_interpolate(9, 8, BorderMode::Replicate), Some(7));
        assert_eq!(border_interpolate(-1, 8, BorderMode::Wrap), Some(7));
        assert_eq!(border_interpolate(8, 8, BorderMode::Wrap), Some(0));
        assert_eq!(border_interpolate(-9, 8, BorderMode::Wrap), Some(7));
    }

    #[test]
    fn test_border_interpolate_constant_out_of_bounds() {
        assert_eq!(border_interpolate(-1, 8, BorderMode::Constant), None);
        assert_eq!(border_interpolate(8, 8, BorderMode::Constant), None);
    }

    #[test]
    fn test_border_interpolate_single_pixel_axis() {
        // Reflection on a 1-wide axis must not loop forever.
        assert_eq!(border_interpolate(-4, 1, BorderMode::Reflect101), Some(0));
        assert_eq!(border_interpolate(7, 1, BorderMode::Reflect), Some(0));
        assert_eq!(border_interpolate(7, 1, BorderMode::Replicate), Some(0));
    }

    #[test]
    fn test_border_mode_codes_round_trip() {
        for mode in [
            BorderMode::Constant,
            BorderMode::Replicate,
            BorderMode::Reflect,
            BorderMode::Wrap,
            BorderMode::Reflect101,
        ] {
            assert_eq!(BorderMode::from_code(mode.code()).unwrap(), mode);
        }
    }

    #[test]
    fn test_border_mode_from_code_rejects_unknown() {
        assert!(matches!(
            BorderMode::from_code(16),
            Err(NlmError::UnsupportedBorderMode { code: 16 })
        ));
        assert!(matches!(
            BorderMode::from_code(-1),
            Err(NlmError::UnsupportedBorderMode { code: -1 })
        ));
    }

    #[test]
    fn test_from_vec_validates_geometry() {
        assert!(ImageBuf::from_vec(vec![0; 12], 4, 3, 1).is_ok());
        assert!(ImageBuf::from_vec(vec![0; 11], 4, 3, 1).is_err());
        assert!(ImageBuf::from_vec(vec![0; 12], 0, 3, 1).is_err());
        assert!(ImageBuf::from_vec(vec![0; 48], 4, 3, 4).is_err());
    }

    #[test]
    fn test_strided_access() {
        // 2x2 single-channel image inside rows of stride 4.
        let data = vec![
            10, 20, 0, 0, //
            30, 40, 0, 0,
        ];
        let img = ImageBuf::from_vec_with_stride(data, 2, 2, 1, 4).unwrap();
        assert_eq!(img.sample(0, 0, 0), 10);
        assert_eq!(img.sample(1, 1, 0), 40);
        assert_eq!(img.row(1), &[30, 40]);
    }

    #[test]
    fn test_padded_copy_reflect101() {
        let src = ImageBuf::from_vec(vec![1, 2, 3, 4], 2, 2, 1).unwrap();
        let mut out = ImageBuf::new(1, 1, 1);
        padded_copy(&src, 1, BorderMode::Reflect101, &mut out);
        assert_eq!(out.width(), 4);
        assert_eq!(out.height(), 4);
        // Interior preserved.
        assert_eq!(out.sample(1, 1, 0), 1);
        assert_eq!(out.sample(2, 2, 0), 4);
        // Reflect101 mirrors without duplicating the edge pixel.
        assert_eq!(out.sample(0, 1, 0), 2);
        assert_eq!(out.sample(1, 0, 0), 3);
        assert_eq!(out.sample(3, 3, 0), 1);
    }

    #[test]
    fn test_padded_copy_constant_fills_zero() {
        let src = ImageBuf::from_vec(vec![9], 1, 1, 1).unwrap();
        let mut out = ImageBuf::new(1, 1, 1);
        padded_copy(&src, 2, BorderMode::Constant, &mut out);
        assert_eq!(out.sample(2, 2, 0), 9);
        assert_eq!(out.sample(0, 0, 0), 0);
        assert_eq!(out.sample(4, 4, 0), 0);
    }

    #[test]
    fn test_padded_copy_multichannel() {
        let src = ImageBuf::from_vec(vec![1, 2, 3, 4, 5, 6], 2, 1, 3).unwrap();
        let mut out = ImageBuf::new(1, 1, 1);
        padded_copy(&src, 1, BorderMode::Replicate, &mut out);
        assert_eq!(out.channels(), 3);
        assert_eq!(out.sample(0, 0, 2), 3);
        assert_eq!(out.sample(3, 2, 0), 4);
    }
}
