// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The feComposite filter primitive.

use strict_num::ApproxEqUlps;

use crate::image::{LinearImage, Pixel};
use crate::types::CompositeOperator;
use crate::{f32_bound, Error};

/// Composites `src1` on top of `src2`.
///
/// Both inputs and the output have a **premultiplied alpha**.
///
/// Porter-Duff operators apply their factor pair component-wise, including
/// alpha. The arithmetic operator works on unpremultiplied channels and
/// clamps each result before repremultiplying.
pub fn apply(
    operator: CompositeOperator,
    src1: &LinearImage,
    src2: &LinearImage,
) -> Result<LinearImage, Error> {
    debug_assert_eq!(src1.width(), src2.width());
    debug_assert_eq!(src1.height(), src2.height());

    if let CompositeOperator::Arithmetic { k1, k2, k3, k4 } = operator {
        return arithmetic(k1, k2, k3, k4, src1, src2);
    }

    let mut dest = LinearImage::try_new(src1.width(), src1.height())?;
    let pairs = src1.pixels().iter().zip(src2.pixels());
    for (dst, (s, d)) in dest.pixels_mut().iter_mut().zip(pairs) {
        let (fa, fb) = match operator {
            CompositeOperator::Over => (1.0, 1.0 - s.a),
            CompositeOperator::In => (d.a, 0.0),
            CompositeOperator::Out => (1.0 - d.a, 0.0),
            CompositeOperator::Atop => (d.a, 1.0 - s.a),
            CompositeOperator::Xor => (1.0 - d.a, 1.0 - s.a),
            CompositeOperator::Arithmetic { .. } => (1.0, 1.0 - s.a),
        };

        *dst = Pixel {
            r: s.r * fa + d.r * fb,
            g: s.g * fa + d.g * fb,
            b: s.b * fa + d.b * fb,
            a: s.a * fa + d.a * fb,
        };
    }

    Ok(dest)
}

fn arithmetic(
    k1: f32,
    k2: f32,
    k3: f32,
    k4: f32,
    src1: &LinearImage,
    src2: &LinearImage,
) -> Result<LinearImage, Error> {
    let calc = |i1: f32, i2: f32, max: f32| f32_bound(0.0, k1 * i1 * i2 + k2 * i1 + k3 * i2 + k4, max);

    let mut dest = LinearImage::try_new(src1.width(), src1.height())?;
    let pairs = src1.pixels().iter().zip(src2.pixels());
    for (dst, (s, d)) in dest.pixels_mut().iter_mut().zip(pairs) {
        let a = calc(s.a, d.a, 1.0);
        if a.approx_eq_ulps(&0.0, 4) {
            continue;
        }

        let (sr, sg, sb) = s.unpremultiply();
        let (dr, dg, db) = d.unpremultiply();

        *dst = Pixel {
            r: calc(sr, dr, 1.0) * a,
            g: calc(sg, dg, 1.0) * a,
            b: calc(sb, db, 1.0) * a,
            a,
        };
    }

    Ok(dest)
}
