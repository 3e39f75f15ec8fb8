//! CIELAB color pipeline support.
//!
//! The color entry point denoises luminance and chrominance with separate
//! strengths, so the RGB source is moved into an 8-bit fixed-point CIELAB
//! encoding first: `L* in [0, 100]` maps to `[0, 255]` and `a*`/`b*` are
//! offset by 128. The transform (sRGB, D65 white point) is delegated to
//! the `palette` crate; this module owns only the fixed-point encoding and
//! the channel split/merge.

use palette::{FromColor, IntoColor, Lab, LinSrgb, Srgb};

use crate::image::ImageBuf;

const L_SCALE: f32 = 255.0 / 100.0;
const AB_OFFSET: f32 = 128.0;

#[inline]
fn encode_lab(lab: Lab) -> [u8; 3] {
    [
        (lab.l * L_SCALE).round().clamp(0.0, 255.0) as u8,
        (lab.a + AB_OFFSET).round().clamp(0.0, 255.0) as u8,
        (lab.b + AB_OFFSET).round().clamp(0.0, 255.0) as u8,
    ]
}

#[inline]
fn decode_lab(l: u8, a: u8, b: u8) -> Lab {
    Lab::new(
        l as f32 / L_SCALE,
        a as f32 - AB_OFFSET,
        b as f32 - AB_OFFSET,
    )
}

/// Convert a 3-channel RGB image to fixed-point CIELAB.
pub fn rgb_to_lab8(src: &ImageBuf, dst: &mut ImageBuf) {
    debug_assert_eq!(src.channels(), 3);
    dst.reshape(src.width(), src.height(), 3);
    for y in 0..src.height() {
        for x in 0..src.width() {
            let srgb: Srgb<f32> = Srgb::new(
                src.sample(x, y, 0) as f32 / 255.0,
                src.sample(x, y, 1) as f32 / 255.0,
                src.sample(x, y, 2) as f32 / 255.0,
            );
            let lin: LinSrgb<f32> = srgb.into_linear();
            let encoded = encode_lab(Lab::from_color(lin));
            for (c, v) in encoded.into_iter().enumerate() {
                dst.set_sample(x, y, c, v);
            }
        }
    }
}

/// Convert a fixed-point CIELAB image back to RGB.
pub fn lab8_to_rgb(src: &ImageBuf, dst: &mut ImageBuf) {
    debug_assert_eq!(src.channels(), 3);
    dst.reshape(src.width(), src.height(), 3);
    for y in 0..src.height() {
        for x in 0..src.width() {
            let lab = decode_lab(
                src.sample(x, y, 0),
                src.sample(x, y, 1),
                src.sample(x, y, 2),
            );
            let lin: LinSrgb<f32> = lab.into_color();
            let srgb: Srgb<f32> = Srgb::from_linear(lin);
            dst.set_sample(x, y, 0, (srgb.red.clamp(0.0, 1.0) * 255.0).round() as u8);
            dst.set_sample(x, y, 1, (srgb.green.clamp(0.0, 1.0) * 255.0).round() as u8);
            dst.set_sample(x, y, 2, (srgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8);
        }
    }
}

/// Split an interleaved Lab image into a 1-channel luminance plane and a
/// 2-channel interleaved chrominance plane.
pub fn split_luminance_chrominance(lab: &ImageBuf, l: &mut ImageBuf, ab: &mut ImageBuf) {
    debug_assert_eq!(lab.channels(), 3);
    l.reshape(lab.width(), lab.height(), 1);
    ab.reshape(lab.width(), lab.height(), 2);
    for y in 0..lab.height() {
        for x in 0..lab.width() {
            l.set_sample(x, y, 0, lab.sample(x, y, 0));
            ab.set_sample(x, y, 0, lab.sample(x, y, 1));
            ab.set_sample(x, y, 1, lab.sample(x, y, 2));
        }
    }
}

/// Reassemble luminance and chrominance planes into an interleaved Lab image.
pub fn merge_luminance_chrominance(l: &ImageBuf, ab: &ImageBuf, lab: &mut ImageBuf) {
    debug_assert_eq!(l.channels(), 1);
    debug_assert_eq!(ab.channels(), 2);
    lab.reshape(l.width(), l.height(), 3);
    for y in 0..l.height() {
        for x in 0..l.width() {
            lab.set_sample(x, y, 0, l.sample(x, y, 0));
            lab.set_sample(x, y, 1, ab.sample(x, y, 0));
            lab.set_sample(x, y, 2, ab.sample(x, y, 1));
        }
    }
}
