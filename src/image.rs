// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::Error;

/// A single linear-light RGBA pixel.
///
/// Channels are **premultiplied**: after any legal operation `r`, `g` and `b`
/// do not exceed `a`. Arithmetic compositing may overshoot mid-flight;
/// the egress conversion clamps on write-back.
#[derive(Clone, Copy, PartialEq, Default, Debug)]
#[allow(missing_docs)]
pub struct Pixel {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Pixel {
    /// A transparent black pixel.
    pub const TRANSPARENT: Pixel = Pixel {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Composites `self` over `dest` in premultiplied space.
    #[inline]
    pub fn source_over(self, dest: Pixel) -> Pixel {
        let k = 1.0 - self.a;
        Pixel {
            r: self.r + dest.r * k,
            g: self.g + dest.g * k,
            b: self.b + dest.b * k,
            a: self.a + dest.a * k,
        }
    }

    /// Returns the unpremultiplied RGB channels.
    ///
    /// A fully transparent pixel yields zeros.
    #[inline]
    pub fn unpremultiply(self) -> (f32, f32, f32) {
        if self.a > 0.0 {
            (self.r / self.a, self.g / self.a, self.b / self.a)
        } else {
            (0.0, 0.0, 0.0)
        }
    }
}

/// A plane of premultiplied linear-light pixels with fixed dimensions.
///
/// Every image that participates in a single filter invocation has the
/// dimensions of the source graphic. There is no resizing and no cropping.
#[derive(Clone)]
pub struct LinearImage {
    width: u32,
    height: u32,
    data: Vec<Pixel>,
}

impl LinearImage {
    /// Creates a transparent black image.
    ///
    /// Returns `Error::AllocFailed` when either dimension is zero
    /// or the pixel count overflows.
    pub fn try_new(width: u32, height: u32) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::AllocFailed);
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or(Error::AllocFailed)?;

        Ok(LinearImage {
            width,
            height,
            data: vec![Pixel::TRANSPARENT; len],
        })
    }

    /// The image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The pixels in row-major order.
    #[inline]
    pub fn pixels(&self) -> &[Pixel] {
        &self.data
    }

    /// The pixels in row-major order, mutable.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.data
    }

    /// Returns the pixel at the specified position.
    ///
    /// # Panics
    ///
    /// When the position is out of bounds.
    #[inline]
    pub fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        self.data[(self.width * y + x) as usize]
    }

    /// Derives the `SourceAlpha` image: RGB zeroed, alpha preserved.
    pub(crate) fn to_alpha(&self) -> Result<LinearImage, Error> {
        let mut alpha = LinearImage::try_new(self.width, self.height)?;
        for (dst, src) in alpha.data.iter_mut().zip(self.data.iter()) {
            dst.a = src.a;
        }

        Ok(alpha)
    }
}
