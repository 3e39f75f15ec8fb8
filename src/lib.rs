//! Non-Local Means image denoising.
//!
//! Denoises 8-bit interleaved images (1-3 channels) by replacing each
//! pixel with a weighted average of pixels whose surrounding patches look
//! similar, with weights `exp(-d / (h^2 * block_size^2 * channels))`.
//!
//! Two engines share that weight model:
//!
//! - [`non_local_means`] evaluates every patch pair exactly, with a
//!   caller-selected [`BorderMode`]. It is the ground-truth reference.
//! - [`FastNlmDenoising`] restructures the work per search-window offset
//!   with running box sums, dropping the `block_size^2` factor from the
//!   cost. Its [`lab_method`](FastNlmDenoising::lab_method) entry point
//!   denoises RGB images in CIELAB space with separate luminance and
//!   chrominance strengths.
//!
//! Every entry point has an `_async` variant that validates eagerly and
//! defers the pixel work onto a [`Stream`].
//!
//! ```
//! use nlm_core::{FastNlmDenoising, ImageBuf, DEFAULT_BLOCK_SIZE, DEFAULT_SEARCH_WINDOW};
//!
//! let noisy = ImageBuf::from_vec(vec![128; 32 * 32 * 3], 32, 32, 3)?;
//! let mut clean = ImageBuf::new(1, 1, 1);
//! let mut engine = FastNlmDenoising::new();
//! engine.lab_method(
//!     &noisy,
//!     &mut clean,
//!     10.0f32,
//!     10.0f32,
//!     DEFAULT_SEARCH_WINDOW,
//!     DEFAULT_BLOCK_SIZE,
//! )?;
//! # Ok::<(), nlm_core::NlmError>(())
//! ```

pub mod color;
pub mod error;
pub mod exact;
pub mod fast;
pub mod float_trait;
pub mod image;
pub mod stream;
pub mod weights;

pub use error::{NlmError, Result};
pub use exact::{non_local_means, non_local_means_async};
pub use fast::FastNlmDenoising;
pub use float_trait::NlmFloat;
pub use image::{border_interpolate, BorderMode, ImageBuf};
pub use stream::Stream;

/// Default search window side length, in pixels.
pub const DEFAULT_SEARCH_WINDOW: usize = 21;

/// Default patch side length, in pixels.
pub const DEFAULT_BLOCK_SIZE: usize = 7;
