//! Exact Non-Local Means engine.
//!
//! Evaluates every patch pair inside the search window for every output
//! pixel. The cost is `O(pixels * search_window^2 * block_size^2)`; this
//! engine exists as the ground-truth reference that the fast approximate
//! engine must stay visually close to, so the loop structure is kept
//! deliberately plain. Pixels are independent and processed as parallel
//! rows with purely local accumulators.

use rayon::prelude::*;

use crate::error::Result;
use crate::float_trait::NlmFloat;
use crate::image::{BorderMode, ImageBuf};
use crate::stream::Stream;
use crate::weights::{norm_constant, patch_distance, validate_common, weight};

/// Denoise `src` into `dst` with the exact algorithm, blocking until done.
///
/// `dst` is reshaped to the packed geometry of `src`. Out-of-bounds patch
/// samples are resolved through `border_mode`.
pub fn non_local_means<F: NlmFloat>(
    src: &ImageBuf,
    dst: &mut ImageBuf,
    h: F,
    search_window: usize,
    block_size: usize,
    border_mode: BorderMode,
) -> Result<()> {
    validate_common(src, h, search_window, block_size)?;
    run_exact(src, dst, h, search_window, block_size, border_mode);
    Ok(())
}

/// Asynchronous variant: parameters are validated now, the pixel work is
/// enqueued on `stream`. On a queued stream the destination is valid only
/// after [`Stream::synchronize`].
pub fn non_local_means_async<'s, F: NlmFloat>(
    src: &'s ImageBuf,
    dst: &'s mut ImageBuf,
    h: F,
    search_window: usize,
    block_size: usize,
    border_mode: BorderMode,
    stream: &mut Stream<'s>,
) -> Result<()> {
    validate_common(src, h, search_window, block_size)?;
    stream.enqueue(move || run_exact(src, dst, h, search_window, block_size, border_mode));
    Ok(())
}

fn run_exact<F: NlmFloat>(
    src: &ImageBuf,
    dst: &mut ImageBuf,
    h: F,
    search_window: usize,
    block_size: usize,
    mode: BorderMode,
) {
    dst.reshape_like(src);
    let (width, height, ch) = (src.width(), src.height(), src.channels());
    let inv_norm = F::one() / norm_constant(h, block_size, ch);
    let sr = (search_window / 2) as isize;
    let br = (block_size / 2) as isize;
    let row_len = dst.stride();

    dst.data_mut()
        .par_chunks_mut(row_len)
        .take(height)
        .enumerate()
        .for_each(|(y, row)| {
            let yi = y as isize;
            let mut sum_val = vec![F::zero(); ch];
            for x in 0..width {
                let xi = x as isize;
                let mut sum_w = F::zero();
                sum_val.iter_mut().for_each(|v| *v = F::zero());

                for qy in (yi - sr)..=(yi + sr) {
                    for qx in (xi - sr)..=(xi + sr) {
                        let d = patch_distance::<F>(src, (xi, yi), (qx, qy), br, mode);
                        let wgt = weight(d, inv_norm);
                        sum_w += wgt;
                        for (c, acc) in sum_val.iter_mut().enumerate() {
                            *acc += wgt * F::u8_as(src.sample_extrapolated(qx, qy, c, mode));
                        }
                    }
                }

                let base = x * ch;
                if sum_w > F::zero() {
                    for c in 0..ch {
                        row[base + c] = (sum_val[c] / sum_w).round_to_u8();
                    }
                } else {
                    // All weights underflowed; keep the source pixel.
                    for c in 0..ch {
                        row[base + c] = src.sample(x, y, c);
                    }
                }
            }
        });
}
