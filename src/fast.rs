//! Fast approximate Non-Local Means engine.
//!
//! Recomputing a full patch distance for every (center, candidate) pair is
//! redundant: candidates one pixel apart share almost their entire patch
//! overlap. This engine restructures the work around the fixed offsets
//! `(dx, dy)` of the search window. For each offset it builds one
//! squared-difference plane for the whole image, turns it into per-pixel
//! patch distances with running box sums (O(1) per pixel), and folds the
//! resulting weights into persistent `(sum_w, sum_val)` accumulators.
//! Total cost is `O(pixels * search_window^2)` instead of the exact
//! engine's `O(pixels * search_window^2 * block_size^2)`.
//!
//! Offsets are whole-image passes with a strict ordering dependency (every
//! offset must be folded in before normalization); pixels within a pass
//! are independent and processed as parallel rows.
//!
//! Border handling is fixed to Reflect101 through a padded working copy of
//! the source sized to absorb the maximum offset plus the patch radius, so
//! the inner loops carry no boundary checks.

use ndarray::Array2;
use rayon::prelude::*;
use std::time::Instant;

use crate::color;
use crate::error::{NlmError, Result};
use crate::float_trait::NlmFloat;
use crate::image::{padded_copy, BorderMode, ImageBuf};
use crate::stream::Stream;
use crate::weights::{norm_constant, validate_common, weight};

const PROFILE_TIMING_ENV: &str = "NLM_PROFILE_TIMING";

fn resolve_profile_timing() -> bool {
    std::env::var(PROFILE_TIMING_ENV)
        .ok()
        .map(|value| {
            let v = value.trim();
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Per-call working storage, retained across calls on the same engine so
/// repeated denoising of same-sized frames does not reallocate. Holds no
/// semantic state between calls.
struct ScratchBuffers<F: NlmFloat> {
    /// Reflect101-padded copy of the source.
    extended: ImageBuf,
    /// Squared-difference plane for the current offset, `(h+2br, w+2br)`.
    diff: Array2<F>,
    /// Horizontal box sums of `diff`, `(h+2br, w)`.
    row_sums: Array2<F>,
    /// Patch distance at the current offset per output pixel, `(h, w)`.
    dist: Array2<F>,
    /// Vertical sliding accumulator, one entry per output column.
    col_sums: Vec<F>,
    /// Accumulated weights per output pixel.
    sum_w: Array2<F>,
    /// Accumulated weight*value per output sample (interleaved channels).
    sum_val: Vec<F>,
}

impl<F: NlmFloat> ScratchBuffers<F> {
    fn new() -> Self {
        Self {
            extended: ImageBuf::new(1, 1, 1),
            diff: Array2::zeros((0, 0)),
            row_sums: Array2::zeros((0, 0)),
            dist: Array2::zeros((0, 0)),
            col_sums: Vec::new(),
            sum_w: Array2::zeros((0, 0)),
            sum_val: Vec::new(),
        }
    }
}

fn ensure_plane<F: NlmFloat>(plane: &mut Array2<F>, dim: (usize, usize)) {
    if plane.dim() != dim {
        *plane = Array2::zeros(dim);
    }
}

/// The fast approximate denoiser with reusable scratch storage.
///
/// One instance is not safe for two simultaneous calls; the `&mut self`
/// receivers (and the scope of [`Stream`] borrows for the `_async`
/// variants) encode that.
pub struct FastNlmDenoising<F: NlmFloat = f32> {
    scratch: ScratchBuffers<F>,
    // Color-pipeline planes, kept for reuse just like the scratch tables.
    lab: ImageBuf,
    luminance: ImageBuf,
    chrominance: ImageBuf,
    luminance_out: ImageBuf,
    chrominance_out: ImageBuf,
}

impl<F: NlmFloat> Default for FastNlmDenoising<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: NlmFloat> FastNlmDenoising<F> {
    pub fn new() -> Self {
        Self {
            scratch: ScratchBuffers::new(),
            lab: ImageBuf::new(1, 1, 1),
            luminance: ImageBuf::new(1, 1, 1),
            chrominance: ImageBuf::new(1, 1, 1),
            luminance_out: ImageBuf::new(1, 1, 1),
            chrominance_out: ImageBuf::new(1, 1, 1),
        }
    }

    /// Denoise `src` (1-3 channels) into `dst`, blocking until done.
    pub fn simple_method(
        &mut self,
        src: &ImageBuf,
        dst: &mut ImageBuf,
        h: F,
        search_window: usize,
        block_size: usize,
    ) -> Result<()> {
        validate_common(src, h, search_window, block_size)?;
        run_simple(&mut self.scratch, src, dst, h, search_window, block_size);
        Ok(())
    }

    /// Asynchronous [`FastNlmDenoising::simple_method`]: validates now,
    /// enqueues the pixel work on `stream`.
    pub fn simple_method_async<'s>(
        &'s mut self,
        src: &'s ImageBuf,
        dst: &'s mut ImageBuf,
        h: F,
        search_window: usize,
        block_size: usize,
        stream: &mut Stream<'s>,
    ) -> Result<()> {
        validate_common(src, h, search_window, block_size)?;
        stream.enqueue(move || {
            run_simple(&mut self.scratch, src, dst, h, search_window, block_size);
        });
        Ok(())
    }

    /// Denoise a 3-channel RGB image in CIELAB space: the luminance plane
    /// with `h_luminance`, the joint 2-channel chrominance plane with
    /// `photo_render`.
    pub fn lab_method(
        &mut self,
        src: &ImageBuf,
        dst: &mut ImageBuf,
        h_luminance: F,
        photo_render: F,
        search_window: usize,
        block_size: usize,
    ) -> Result<()> {
        self.validate_lab(src, h_luminance, photo_render, search_window, block_size)?;
        self.run_lab(src, dst, h_luminance, photo_render, search_window, block_size);
        Ok(())
    }

    /// Asynchronous [`FastNlmDenoising::lab_method`].
    pub fn lab_method_async<'s>(
        &'s mut self,
        src: &'s ImageBuf,
        dst: &'s mut ImageBuf,
        h_luminance: F,
        photo_render: F,
        search_window: usize,
        block_size: usize,
        stream: &mut Stream<'s>,
    ) -> Result<()> {
        self.validate_lab(src, h_luminance, photo_render, search_window, block_size)?;
        stream.enqueue(move || {
            self.run_lab(src, dst, h_luminance, photo_render, search_window, block_size);
        });
        Ok(())
    }

    fn validate_lab(
        &self,
        src: &ImageBuf,
        h_luminance: F,
        photo_render: F,
        search_window: usize,
        block_size: usize,
    ) -> Result<()> {
        if src.channels() != 3 {
            return Err(NlmError::InvalidChannelCount {
                channels: src.channels(),
            });
        }
        validate_common(src, h_luminance, search_window, block_size)?;
        validate_common(src, photo_render, search_window, block_size)?;
        Ok(())
    }

    fn run_lab(
        &mut self,
        src: &ImageBuf,
        dst: &mut ImageBuf,
        h_luminance: F,
        photo_render: F,
        search_window: usize,
        block_size: usize,
    ) {
        color::rgb_to_lab8(src, &mut self.lab);
        color::split_luminance_chrominance(&self.lab, &mut self.luminance, &mut self.chrominance);
        run_simple(
            &mut self.scratch,
            &self.luminance,
            &mut self.luminance_out,
            h_luminance,
            search_window,
            block_size,
        );
        run_simple(
            &mut self.scratch,
            &self.chrominance,
            &mut self.chrominance_out,
            photo_render,
            search_window,
            block_size,
        );
        color::merge_luminance_chrominance(
            &self.luminance_out,
            &self.chrominance_out,
            &mut self.lab,
        );
        color::lab8_to_rgb(&self.lab, dst);
    }
}

/// One full denoising pass. Parameters are already validated.
fn run_simple<F: NlmFloat>(
    ws: &mut ScratchBuffers<F>,
    src: &ImageBuf,
    dst: &mut ImageBuf,
    h: F,
    search_window: usize,
    block_size: usize,
) {
    dst.reshape_like(src);
    let (width, height, ch) = (src.width(), src.height(), src.channels());
    let br = block_size / 2;
    let sr = search_window / 2;
    let pad = sr + br;
    let inv_norm = F::one() / norm_constant(h, block_size, ch);

    padded_copy(src, pad, BorderMode::Reflect101, &mut ws.extended);

    let dw = width + 2 * br;
    let dh = height + 2 * br;
    ensure_plane(&mut ws.diff, (dh, dw));
    ensure_plane(&mut ws.row_sums, (dh, width));
    ensure_plane(&mut ws.dist, (height, width));
    ws.col_sums.clear();
    ws.col_sums.resize(width, F::zero());
    ensure_plane(&mut ws.sum_w, (height, width));
    ws.sum_w.fill(F::zero());
    ws.sum_val.clear();
    ws.sum_val.resize(width * height * ch, F::zero());

    let ScratchBuffers {
        extended,
        diff,
        row_sums,
        dist,
        col_sums,
        sum_w,
        sum_val,
    } = ws;
    let ext_data = extended.data();
    let ext_stride = extended.stride();

    let profile = resolve_profile_timing();
    let started = profile.then(Instant::now);
    let mut diff_ns: u128 = 0;
    let mut box_ns: u128 = 0;
    let mut fold_ns: u128 = 0;

    let sr_i = sr as isize;
    for dy in -sr_i..=sr_i {
        for dx in -sr_i..=sr_i {
            // 1. Whole-image squared-difference plane for this offset,
            // over the block-radius-enlarged domain.
            let t = profile.then(Instant::now);
            let diff_slice = diff
                .as_slice_memory_order_mut()
                .expect("difference plane is contiguous");
            diff_slice
                .par_chunks_mut(dw)
                .enumerate()
                .for_each(|(j, row)| {
                    let y0 = j + sr;
                    let y1 = (y0 as isize + dy) as usize;
                    let base0 = y0 * ext_stride;
                    let base1 = y1 * ext_stride;
                    for (i, slot) in row.iter_mut().enumerate() {
                        let x0 = i + sr;
                        let x1 = (x0 as isize + dx) as usize;
                        let mut d = F::zero();
                        for c in 0..ch {
                            let a = F::u8_as(ext_data[base0 + x0 * ch + c]);
                            let b = F::u8_as(ext_data[base1 + x1 * ch + c]);
                            let t = a - b;
                            d += t * t;
                        }
                        *slot = d;
                    }
                });
            if let Some(t) = t {
                diff_ns += t.elapsed().as_nanos();
            }

            // 2. Horizontal box sums per row, then a vertical slide turning
            // them into per-pixel patch distances. No per-pixel patch loop.
            let t = profile.then(Instant::now);
            let diff_ro = diff
                .as_slice_memory_order()
                .expect("difference plane is contiguous");
            let rs_slice = row_sums
                .as_slice_memory_order_mut()
                .expect("row-sum plane is contiguous");
            rs_slice
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(j, out_row)| {
                    let drow = &diff_ro[j * dw..(j + 1) * dw];
                    let mut acc = F::zero();
                    for &v in &drow[..block_size] {
                        acc += v;
                    }
                    out_row[0] = acc;
                    for x in 1..width {
                        acc += drow[x + block_size - 1] - drow[x - 1];
                        out_row[x] = acc;
                    }
                });

            let rs_ro = row_sums
                .as_slice_memory_order()
                .expect("row-sum plane is contiguous");
            let dist_slice = dist
                .as_slice_memory_order_mut()
                .expect("distance plane is contiguous");
            col_sums.iter_mut().for_each(|v| *v = F::zero());
            for j in 0..block_size {
                let rs_row = &rs_ro[j * width..(j + 1) * width];
                for (acc, &v) in col_sums.iter_mut().zip(rs_row) {
                    *acc += v;
                }
            }
            dist_slice[..width].copy_from_slice(col_sums);
            for y in 1..height {
                let add = &rs_ro[(y + block_size - 1) * width..(y + block_size) * width];
                let sub = &rs_ro[(y - 1) * width..y * width];
                for ((acc, &a), &s) in col_sums.iter_mut().zip(add).zip(sub) {
                    *acc += a - s;
                }
                dist_slice[y * width..(y + 1) * width].copy_from_slice(col_sums);
            }
            if let Some(t) = t {
                box_ns += t.elapsed().as_nanos();
            }

            // 3. Fold this offset's contribution into the accumulators.
            let t = profile.then(Instant::now);
            let dist_ro = dist
                .as_slice_memory_order()
                .expect("distance plane is contiguous");
            let sumw_slice = sum_w
                .as_slice_memory_order_mut()
                .expect("weight accumulator is contiguous");
            sumw_slice
                .par_chunks_mut(width)
                .zip(sum_val.par_chunks_mut(width * ch))
                .enumerate()
                .for_each(|(y, (wrow, vrow))| {
                    let ny = ((y + pad) as isize + dy) as usize;
                    let nbase = ny * ext_stride;
                    let drow = &dist_ro[y * width..(y + 1) * width];
                    for x in 0..width {
                        let wgt = weight(drow[x], inv_norm);
                        wrow[x] += wgt;
                        let nx = ((x + pad) as isize + dx) as usize;
                        for c in 0..ch {
                            vrow[x * ch + c] += wgt * F::u8_as(ext_data[nbase + nx * ch + c]);
                        }
                    }
                });
            if let Some(t) = t {
                fold_ns += t.elapsed().as_nanos();
            }
        }
    }

    // 4. Normalize once, after every offset has been folded in.
    let sumw_ro = sum_w
        .as_slice_memory_order()
        .expect("weight accumulator is contiguous");
    let row_len = dst.stride();
    dst.data_mut()
        .par_chunks_mut(row_len)
        .take(height)
        .enumerate()
        .for_each(|(y, row)| {
            let wrow = &sumw_ro[y * width..(y + 1) * width];
            let vrow = &sum_val[y * width * ch..(y + 1) * width * ch];
            let src_base = (y + pad) * ext_stride;
            for x in 0..width {
                let total = wrow[x];
                if total > F::zero() {
                    for c in 0..ch {
                        row[x * ch + c] = (vrow[x * ch + c] / total).round_to_u8();
                    }
                } else {
                    // All weights underflowed; keep the source pixel.
                    for c in 0..ch {
                        row[x * ch + c] = ext_data[src_base + (x + pad) * ch + c];
                    }
                }
            }
        });

    if profile {
        let total_ns = started.map(|t| t.elapsed().as_nanos()).unwrap_or_default();
        eprintln!(
            "nlm_profile size={width}x{height}x{ch} search_window={search_window} block_size={block_size} wall_ms={:.3} diff_ms={:.3} box_ms={:.3} fold_ms={:.3}",
            total_ns as f64 / 1_000_000.0,
            diff_ns as f64 / 1_000_000.0,
            box_ns as f64 / 1_000_000.0,
            fold_ns as f64 / 1_000_000.0,
        );
    }
}
