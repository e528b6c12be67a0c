// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The feColorMatrix filter primitive.

use crate::image::LinearImage;
use crate::types::ColorMatrixKind;
use crate::{f32_bound, Error};

/// Applies a color matrix.
///
/// The 4x5 matrix operates on unpremultiplied channels; the pixels are
/// unpremultiplied and repremultiplied locally. Fully transparent pixels
/// stay transparent.
///
/// Note that the matrix is applied to linear-light values. The pipeline
/// runs every primitive in linear light, so the sRGB-space matrix variants
/// some renderers implement are intentionally absent.
pub fn apply(kind: &ColorMatrixKind, src: &LinearImage) -> Result<LinearImage, Error> {
    let m = build_matrix(kind);

    let mut dest = LinearImage::try_new(src.width(), src.height())?;
    for (dst, s) in dest.pixels_mut().iter_mut().zip(src.pixels()) {
        if s.a == 0.0 {
            continue;
        }

        let (r, g, b) = s.unpremultiply();
        let a = s.a;

        let new_r = r * m[0] + g * m[1] + b * m[2] + a * m[3] + m[4];
        let new_g = r * m[5] + g * m[6] + b * m[7] + a * m[8] + m[9];
        let new_b = r * m[10] + g * m[11] + b * m[12] + a * m[13] + m[14];
        let new_a = f32_bound(0.0, r * m[15] + g * m[16] + b * m[17] + a * m[18] + m[19], 1.0);

        dst.r = new_r * new_a;
        dst.g = new_g * new_a;
        dst.b = new_b * new_a;
        dst.a = new_a;
    }

    Ok(dest)
}

fn build_matrix(kind: &ColorMatrixKind) -> [f32; 20] {
    match kind {
        ColorMatrixKind::Matrix(values) => {
            let mut m = [0.0; 20];
            if values.len() >= 20 {
                m.copy_from_slice(&values[..20]);
            }

            m
        }
        ColorMatrixKind::Saturate(v) => {
            let v = v.max(0.0);
            [
                0.213 + 0.787 * v, 0.715 - 0.715 * v, 0.072 - 0.072 * v, 0.0, 0.0,
                0.213 - 0.213 * v, 0.715 + 0.285 * v, 0.072 - 0.072 * v, 0.0, 0.0,
                0.213 - 0.213 * v, 0.715 - 0.715 * v, 0.072 + 0.928 * v, 0.0, 0.0,
                0.0, 0.0, 0.0, 1.0, 0.0,
            ]
        }
        ColorMatrixKind::HueRotate(angle) => {
            let angle = angle.to_radians();
            let a1 = angle.cos();
            let a2 = angle.sin();
            [
                0.213 + 0.787 * a1 - 0.213 * a2,
                0.715 - 0.715 * a1 - 0.715 * a2,
                0.072 - 0.072 * a1 + 0.928 * a2,
                0.0,
                0.0,
                0.213 - 0.213 * a1 + 0.143 * a2,
                0.715 + 0.285 * a1 + 0.140 * a2,
                0.072 - 0.072 * a1 - 0.283 * a2,
                0.0,
                0.0,
                0.213 - 0.213 * a1 - 0.787 * a2,
                0.715 - 0.715 * a1 + 0.715 * a2,
                0.072 + 0.928 * a1 + 0.072 * a2,
                0.0,
                0.0,
                0.0,
                0.0,
                0.0,
                1.0,
                0.0,
            ]
        }
        ColorMatrixKind::LuminanceToAlpha => {
            let mut m = [0.0; 20];
            m[15] = 0.2125;
            m[16] = 0.7154;
            m[17] = 0.0721;
            m
        }
    }
}
