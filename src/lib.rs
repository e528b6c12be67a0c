// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`linfilters` provides a low-level [SVG filters](https://www.w3.org/TR/SVG11/filters.html)
implementation that evaluates the whole filter graph on a linear-light,
premultiplied-alpha f32 plane.

The caller rasterises the source graphic, resolves units, attribute
defaults and CSS cascading, and hands over plain numbers. This crate
converts the raster to linear light exactly once, runs every primitive in
that representation and converts back to 8-bit premultiplied sRGB on the
way out, which avoids the cumulative rounding and gamma errors of an
8-bit pipeline. Filter region calculation, transformations and primitive
ordering belong to the caller.

## Implemented filters

- [feBlend](https://www.w3.org/TR/SVG11/filters.html#feBlendElement)
- [feColorMatrix](https://www.w3.org/TR/SVG11/filters.html#feColorMatrixElement)
- [feComposite](https://www.w3.org/TR/SVG11/filters.html#feCompositeElement)
- [feDropShadow](https://drafts.fxtf.org/filter-effects/#feDropShadowElement)
- [feFlood](https://www.w3.org/TR/SVG11/filters.html#feFloodElement)
- [feGaussianBlur](https://www.w3.org/TR/SVG11/filters.html#feGaussianBlurElement)
  A three-pass box blur approximation.
- [feMerge](https://www.w3.org/TR/SVG11/filters.html#feMergeElement)
- [feOffset](https://www.w3.org/TR/SVG11/filters.html#feOffsetElement)
  Integer offsets only.

## Unimplemented filters

`feComponentTransfer`, `feConvolveMatrix`, `feDisplacementMap`, `feImage`,
`feMorphology`, `feTile`, `feTurbulence` and the lighting primitives are
out of scope.

## Color spaces

Every primitive runs in linear light regardless of
`color-interpolation-filters`. This diverges from the letter of the SVG
spec, which interpolates some primitives in sRGB, in exchange for a
pipeline without intermediate quantisation.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_arguments)]

use rgb::alt::BGRA8;
use rgb::FromSlice;
use strict_num::ApproxEqUlps;

mod blend;
mod box_blur;
mod color_matrix;
mod composite;
mod eval;
mod image;
mod srgb;
mod types;

pub use strict_num::{self, NormalizedF32, PositiveF32};

pub use eval::apply;
pub use image::{LinearImage, Pixel};
pub use srgb::{from_raster, into_raster, linear_to_srgb, srgb_to_linear};
pub use types::*;

/// A filter evaluation error.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Error {
    /// A `LinearImage` allocation failed.
    ///
    /// The caller's raster is left untouched, so the unfiltered source can
    /// still be composited.
    AllocFailed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::AllocFailed => write!(f, "memory allocation failed"),
        }
    }
}

impl std::error::Error for Error {}

/// A premultiplied 8-bit raster reference.
///
/// Pixels are stored as `B,G,R,A` bytes. `stride` is in bytes and may
/// exceed `4 * width` when rows are padded for alignment.
#[derive(Clone, Copy)]
pub struct RasterRef<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> RasterRef<'a> {
    /// Creates a new raster reference.
    ///
    /// Doesn't clone the provided data.
    ///
    /// Returns `None` when either dimension is zero, `stride` cannot hold a
    /// row, or `data` is too short.
    pub fn new(data: &'a [u8], width: u32, height: u32, stride: usize) -> Option<Self> {
        if !raster_layout_is_valid(data.len(), width, height, stride) {
            return None;
        }

        Some(RasterRef {
            data,
            width,
            height,
            stride,
        })
    }

    /// The raster width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The raster height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub(crate) fn row(&self, y: u32) -> &[BGRA8] {
        let start = y as usize * self.stride;
        self.data[start..start + self.width as usize * 4].as_bgra()
    }
}

/// A mutable `RasterRef` variant.
pub struct RasterRefMut<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> RasterRefMut<'a> {
    /// Creates a new mutable raster reference.
    ///
    /// Doesn't clone the provided data.
    ///
    /// Returns `None` when either dimension is zero, `stride` cannot hold a
    /// row, or `data` is too short.
    pub fn new(data: &'a mut [u8], width: u32, height: u32, stride: usize) -> Option<Self> {
        if !raster_layout_is_valid(data.len(), width, height, stride) {
            return None;
        }

        Some(RasterRefMut {
            data,
            width,
            height,
            stride,
        })
    }

    /// The raster width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The raster height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reborrows as an immutable reference.
    #[inline]
    pub fn as_raster_ref(&self) -> RasterRef {
        RasterRef {
            data: self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }

    #[inline]
    pub(crate) fn row_mut(&mut self, y: u32) -> &mut [BGRA8] {
        let start = y as usize * self.stride;
        self.data[start..start + self.width as usize * 4].as_bgra_mut()
    }
}

fn raster_layout_is_valid(len: usize, width: u32, height: u32, stride: usize) -> bool {
    if width == 0 || height == 0 {
        return false;
    }

    let row_len = width as usize * 4;
    if stride < row_len {
        return false;
    }

    // The last row doesn't have to carry the stride padding.
    match stride
        .checked_mul(height as usize - 1)
        .and_then(|v| v.checked_add(row_len))
    {
        Some(min_len) => len >= min_len,
        None => false,
    }
}

/// Approximate zero equality comparisons.
pub(crate) trait ApproxZeroUlps: ApproxEqUlps {
    /// Checks if the number is approximately zero.
    fn approx_zero_ulps(&self, ulps: i32) -> bool;
}

impl ApproxZeroUlps for f32 {
    fn approx_zero_ulps(&self, ulps: i32) -> bool {
        self.approx_eq_ulps(&0.0, ulps)
    }
}

#[inline]
pub(crate) fn f32_bound(min: f32, val: f32, max: f32) -> f32 {
    debug_assert!(min.is_finite());
    debug_assert!(val.is_finite());
    debug_assert!(max.is_finite());

    if val > max {
        max
    } else if val < min {
        min
    } else {
        val
    }
}
