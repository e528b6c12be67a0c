// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversions between 8-bit premultiplied sRGB rasters and the
//! linear-light f32 plane.
//!
//! Both directions run exactly once per filter invocation, on ingress and
//! egress. Every filter primitive in between works on [`LinearImage`]
//! and never touches gamma-encoded values.

use once_cell::sync::Lazy;

use crate::image::{LinearImage, Pixel};
use crate::{f32_bound, Error, RasterRef, RasterRefMut};

/// Premultiplied alpha below this is written out as fully transparent black.
const ALPHA_EPSILON: f32 = 1e-4;

/// Precomputed sRGB u8 to linear f32 table.
///
/// ```text
/// if (C_srgb <= 0.04045)
///     C_lin = C_srgb / 12.92;
/// else
///     C_lin = pow((C_srgb + 0.055) / 1.055, 2.4);
/// ```
///
/// Unlike the classic u8-to-u8 tables this one keeps full float precision,
/// which is the point of running the filter graph in linear light.
static SRGB_TO_LINEAR_TABLE: Lazy<[f32; 256]> = Lazy::new(|| {
    let mut table = [0.0; 256];
    for (i, v) in table.iter_mut().enumerate() {
        *v = srgb_to_linear(i as f32 / 255.0);
    }

    table
});

/// Converts a gamma-encoded sRGB channel in `0..=1` into linear light.
#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Converts a linear-light channel in `0..=1` into gamma-encoded sRGB.
#[inline]
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn to_byte(c: f32) -> u8 {
    (f32_bound(0.0, c, 1.0) * 255.0).round() as u8
}

/// Converts a premultiplied sRGB raster into a premultiplied linear plane.
pub fn from_raster(raster: RasterRef) -> Result<LinearImage, Error> {
    let mut image = LinearImage::try_new(raster.width(), raster.height())?;
    let table = &*SRGB_TO_LINEAR_TABLE;

    let width = raster.width() as usize;
    for y in 0..raster.height() {
        let row = raster.row(y);
        let start = y as usize * width;
        for (dst, s) in image.pixels_mut()[start..start + width].iter_mut().zip(row) {
            if s.a == 255 {
                // Premultiplied and straight alpha coincide; the table applies directly.
                *dst = Pixel {
                    r: table[s.r as usize],
                    g: table[s.g as usize],
                    b: table[s.b as usize],
                    a: 1.0,
                };
            } else if s.a != 0 {
                let a = s.a as f32 / 255.0;
                *dst = Pixel {
                    r: srgb_to_linear((s.r as f32 / 255.0) / a) * a,
                    g: srgb_to_linear((s.g as f32 / 255.0) / a) * a,
                    b: srgb_to_linear((s.b as f32 / 255.0) / a) * a,
                    a,
                };
            }
        }
    }

    Ok(image)
}

/// Converts a premultiplied linear plane back into a premultiplied
/// sRGB raster.
///
/// Pixels with an alpha below `1e-4` become fully transparent black.
/// Channels that overshot their alpha during compositing are clamped here.
pub fn into_raster(image: &LinearImage, raster: &mut RasterRefMut) {
    debug_assert_eq!(image.width(), raster.width());
    debug_assert_eq!(image.height(), raster.height());

    let width = image.width() as usize;
    for y in 0..image.height() {
        let start = y as usize * width;
        let pixels = &image.pixels()[start..start + width];
        for (dst, p) in raster.row_mut(y).iter_mut().zip(pixels) {
            let a = f32_bound(0.0, p.a, 1.0);
            if a < ALPHA_EPSILON {
                dst.b = 0;
                dst.g = 0;
                dst.r = 0;
                dst.a = 0;
            } else {
                dst.b = to_byte(linear_to_srgb(f32_bound(0.0, p.b / a, 1.0)) * a);
                dst.g = to_byte(linear_to_srgb(f32_bound(0.0, p.g / a, 1.0)) * a);
                dst.r = to_byte(linear_to_srgb(f32_bound(0.0, p.r / a, 1.0)) * a);
                dst.a = to_byte(a);
            }
        }
    }
}
