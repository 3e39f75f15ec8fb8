//! Float trait abstraction for f32/f64 accumulator support.
//!
//! Pixel storage is always 8-bit; the weighted-average accumulators and
//! patch-distance tables are generic over this trait so callers can trade
//! precision for memory.

use num_traits::{Float, FromPrimitive, NumAssign};
use std::fmt::Debug;
use std::iter::Sum;

/// Trait alias for floating point types used by the NLM engines.
///
/// Combines the bounds the engines need:
/// - Basic float operations (Float, NumAssign)
/// - Conversion from primitive types (FromPrimitive)
/// - Iteration support (Sum)
/// - Thread safety for rayon-parallel pixel loops
pub trait NlmFloat:
    Float + FromPrimitive + NumAssign + Sum + Debug + Send + Sync + 'static
{
    /// Create a value from an f64 constant.
    fn from_f64_c(val: f64) -> Self;

    /// Create a value from a usize constant.
    fn usize_as(val: usize) -> Self;

    /// Widen an 8-bit sample.
    fn u8_as(val: u8) -> Self;

    /// Round to the nearest 8-bit sample, saturating at 0 and 255.
    fn round_to_u8(self) -> u8;
}

impl NlmFloat for f32 {
    #[inline]
    fn from_f64_c(val: f64) -> Self {
        val as f32
    }

    #[inline]
    fn usize_as(val: usize) -> Self {
        val as f32
    }

    #[inline]
    fn u8_as(val: u8) -> Self {
        val as f32
    }

    #[inline]
    fn round_to_u8(self) -> u8 {
        self.round().clamp(0.0, 255.0) as u8
    }
}

impl NlmFloat for f64 {
    #[inline]
    fn from_f64_c(val: f64) -> Self {
        val
    }

    #[inline]
    fn usize_as(val: usize) -> Self {
        val as f64
    }

    #[inline]
    fn u8_as(val: u8) -> Self {
        val as f64
    }

    #[inline]
    fn round_to_u8(self) -> u8 {
        self.round().clamp(0.0, 255.0) as u8
    }
}
