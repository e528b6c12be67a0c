// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The feBlend filter primitive.

use crate::image::{LinearImage, Pixel};
use crate::types::BlendMode;
use crate::Error;

/// Blends `src1` on top of `src2`.
///
/// Both inputs and the output have a **premultiplied alpha**.
///
/// `Normal` is plain source-over. The separable modes unpremultiply both
/// pixels, apply the mode's channel function and recombine per the SVG
/// compositing formula:
///
/// ```text
/// out_c = B(s', d') * s.a * d.a + s_c * (1 - d.a) + d_c * (1 - s.a)
/// out.a = s.a + d.a - s.a * d.a
/// ```
pub fn apply(mode: BlendMode, src1: &LinearImage, src2: &LinearImage) -> Result<LinearImage, Error> {
    debug_assert_eq!(src1.width(), src2.width());
    debug_assert_eq!(src1.height(), src2.height());

    let mut dest = LinearImage::try_new(src1.width(), src1.height())?;
    let pairs = src1.pixels().iter().zip(src2.pixels());
    for (dst, (s, d)) in dest.pixels_mut().iter_mut().zip(pairs) {
        if let BlendMode::Normal = mode {
            *dst = s.source_over(*d);
            continue;
        }

        let (sr, sg, sb) = s.unpremultiply();
        let (dr, dg, db) = d.unpremultiply();
        let recombine =
            |b: f32, sc: f32, dc: f32| b * s.a * d.a + sc * (1.0 - d.a) + dc * (1.0 - s.a);

        *dst = Pixel {
            r: recombine(blend_channel(mode, sr, dr), s.r, d.r),
            g: recombine(blend_channel(mode, sg, dg), s.g, d.g),
            b: recombine(blend_channel(mode, sb, db), s.b, d.b),
            a: s.a + d.a - s.a * d.a,
        };
    }

    Ok(dest)
}

#[inline]
fn blend_channel(mode: BlendMode, s: f32, d: f32) -> f32 {
    match mode {
        BlendMode::Normal => s,
        BlendMode::Multiply => s * d,
        BlendMode::Screen => s + d - s * d,
        BlendMode::Darken => s.min(d),
        BlendMode::Lighten => s.max(d),
    }
}
