// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A Gaussian blur approximated by three box-blur passes per axis.

use std::f32::consts::PI;

use crate::image::{LinearImage, Pixel};
use crate::Error;

/// Derives the box radius for a Gaussian standard deviation.
///
/// This is the SVG box-blur width `floor(sigma * 3 * sqrt(2 * PI) / 4 + 0.5)`
/// halved with integer division. The three passes below assume exactly this
/// quantisation; reference output is calibrated against it.
pub fn blur_radius(sigma: f32) -> usize {
    if sigma <= 0.0 {
        return 0;
    }

    let d = (sigma * 3.0 * (2.0 * PI).sqrt() / 4.0 + 0.5).floor() as i32;
    (d / 2) as usize
}

/// Applies a Gaussian blur.
///
/// Input pixels must have a **premultiplied alpha**.
///
/// A non-positive sigma disables the blur along that axis. When both axes
/// are disabled the result is a plain copy of the input.
///
/// # Allocations
///
/// Allocates the output image plus one scratch buffer of the same size.
pub fn apply(sigma_x: f32, sigma_y: f32, src: &LinearImage) -> Result<LinearImage, Error> {
    let rx = blur_radius(sigma_x);
    let ry = blur_radius(sigma_y);

    let mut front = src.clone();
    if rx == 0 && ry == 0 {
        return Ok(front);
    }

    let mut back = LinearImage::try_new(src.width(), src.height())?;
    for _ in 0..3 {
        if rx > 0 {
            box_blur_horz(&front, &mut back, rx);
            std::mem::swap(&mut front, &mut back);
        }

        if ry > 0 {
            box_blur_vert(&front, &mut back, ry);
            std::mem::swap(&mut front, &mut back);
        }
    }

    Ok(front)
}

fn box_blur_horz(src: &LinearImage, dst: &mut LinearImage, radius: usize) {
    let w = src.width() as usize;
    let h = src.height() as usize;
    blur_strips(src.pixels(), dst.pixels_mut(), h, w, 1, w, radius);
}

fn box_blur_vert(src: &LinearImage, dst: &mut LinearImage, radius: usize) {
    let w = src.width() as usize;
    let h = src.height() as usize;
    blur_strips(src.pixels(), dst.pixels_mut(), w, h, w, 1, radius);
}

/// Sliding-window mean over `strips` strips of `len` samples each.
///
/// Samples outside a strip are clamped to its nearest edge sample, so the
/// window sum can be maintained incrementally in O(len) per strip.
fn blur_strips(
    src: &[Pixel],
    dst: &mut [Pixel],
    strips: usize,
    len: usize,
    step: usize,
    strip_step: usize,
    radius: usize,
) {
    let iarr = 1.0 / (radius + radius + 1) as f32;

    for i in 0..strips {
        let head = i * strip_step;
        let at = |j: usize| src[head + j * step];

        // Seed with the edge-extended window around the first sample.
        let first = at(0);
        let mut val_r = first.r * (radius + 1) as f32;
        let mut val_g = first.g * (radius + 1) as f32;
        let mut val_b = first.b * (radius + 1) as f32;
        let mut val_a = first.a * (radius + 1) as f32;
        for j in 1..=radius {
            let p = at(j.min(len - 1));
            val_r += p.r;
            val_g += p.g;
            val_b += p.b;
            val_a += p.a;
        }

        for j in 0..len {
            dst[head + j * step] = Pixel {
                r: val_r * iarr,
                g: val_g * iarr,
                b: val_b * iarr,
                a: val_a * iarr,
            };

            if j + 1 == len {
                break;
            }

            let enter = at((j + 1 + radius).min(len - 1));
            let leave = at(j.saturating_sub(radius));
            val_r += enter.r - leave.r;
            val_g += enter.g - leave.g;
            val_b += enter.b - leave.b;
            val_a += enter.a - leave.a;
        }
    }
}
