// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The filter graph driver.
//!
//! Seeds the context with `SourceGraphic`/`SourceAlpha`, walks the
//! primitive list in document order, resolves every primitive's inputs and
//! records its result under the assigned name. Primitives run to
//! completion one after another; there is no reordering and no caching
//! across invocations.

use std::collections::HashMap;
use std::rc::Rc;

use crate::image::{LinearImage, Pixel};
use crate::types::{DropShadow, Filter, Flood, GaussianBlur, Input, Kind, Merge, Offset};
use crate::{blend, box_blur, color_matrix, composite, srgb};
use crate::{ApproxZeroUlps, Error, RasterRefMut};

/// Applies a filter to a premultiplied sRGB raster, in place.
///
/// The raster is converted to linear light once, every primitive runs on
/// the f32 plane and the final result is converted back and written over
/// the input. An empty primitive list degrades to that round trip.
///
/// A primitive referencing an unknown input produces no output and does
/// not advance the implicit `Last` input; evaluation continues with the
/// remaining primitives.
///
/// On error the raster is left untouched, so the caller can still composite
/// the unfiltered source.
pub fn apply(filter: &Filter, mut raster: RasterRefMut) -> Result<(), Error> {
    match apply_inner(filter, &mut raster) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::warn!(
                "Memory allocation failed while processing the '{}' filter. Skipped.",
                filter.id
            );
            Err(e)
        }
    }
}

fn apply_inner(filter: &Filter, raster: &mut RasterRefMut) -> Result<(), Error> {
    let source = srgb::from_raster(raster.as_raster_ref())?;
    let mut ctx = FilterContext::new(source)?;

    for primitive in &filter.primitives {
        if let Some(image) = render_primitive(&ctx, &primitive.kind)? {
            ctx.add_result(primitive.result.as_deref(), image);
        }
    }

    srgb::into_raster(&ctx.last, raster);
    Ok(())
}

/// Named results of one filter invocation.
///
/// All images are shared by reference counting: `feMerge`, `feComposite`
/// and `feBlend` may name the same result more than once, and every
/// primitive allocates a fresh output instead of mutating an input.
struct FilterContext {
    source_graphic: Rc<LinearImage>,
    results: HashMap<String, Rc<LinearImage>>,
    last: Rc<LinearImage>,
}

impl FilterContext {
    fn new(source: LinearImage) -> Result<Self, Error> {
        let source_alpha = Rc::new(source.to_alpha()?);
        let source_graphic = Rc::new(source);

        let mut results = HashMap::new();
        results.insert("SourceGraphic".to_string(), source_graphic.clone());
        results.insert("SourceAlpha".to_string(), source_alpha);

        Ok(FilterContext {
            source_graphic: source_graphic.clone(),
            results,
            last: source_graphic,
        })
    }

    fn get_input(&self, input: &Input) -> Option<Rc<LinearImage>> {
        match input {
            Input::Last => Some(self.last.clone()),
            Input::Reference(name) => {
                let image = self.results.get(name).cloned();
                if image.is_none() {
                    log::warn!("Unknown filter primitive reference '{}'.", name);
                }

                image
            }
        }
    }

    fn add_result(&mut self, name: Option<&str>, image: Rc<LinearImage>) {
        if let Some(name) = name {
            if !name.is_empty() {
                self.results.insert(name.to_string(), image.clone());
            }
        }

        self.last = image;
    }
}

fn render_primitive(ctx: &FilterContext, kind: &Kind) -> Result<Option<Rc<LinearImage>>, Error> {
    let image = match kind {
        Kind::Blend(ref fe) => {
            let (input1, input2) = match (ctx.get_input(&fe.input1), ctx.get_input(&fe.input2)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Ok(None),
            };
            Rc::new(blend::apply(fe.mode, &input1, &input2)?)
        }
        Kind::ColorMatrix(ref fe) => {
            let input = match ctx.get_input(&fe.input) {
                Some(v) => v,
                None => return Ok(None),
            };
            Rc::new(color_matrix::apply(&fe.kind, &input)?)
        }
        Kind::Composite(ref fe) => {
            let (input1, input2) = match (ctx.get_input(&fe.input1), ctx.get_input(&fe.input2)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Ok(None),
            };
            Rc::new(composite::apply(fe.operator, &input1, &input2)?)
        }
        Kind::DropShadow(ref fe) => {
            let input = match ctx.get_input(&fe.input) {
                Some(v) => v,
                None => return Ok(None),
            };
            Rc::new(apply_drop_shadow(fe, &input)?)
        }
        Kind::Flood(ref fe) => Rc::new(apply_flood(fe, ctx)?),
        Kind::GaussianBlur(ref fe) => {
            let input = match ctx.get_input(&fe.input) {
                Some(v) => v,
                None => return Ok(None),
            };
            apply_blur(fe, input)?
        }
        Kind::Merge(ref fe) => Rc::new(apply_merge(fe, ctx)?),
        Kind::Offset(ref fe) => {
            let input = match ctx.get_input(&fe.input) {
                Some(v) => v,
                None => return Ok(None),
            };
            apply_offset(fe, input)?
        }
    };

    Ok(Some(image))
}

fn apply_blur(fe: &GaussianBlur, input: Rc<LinearImage>) -> Result<Rc<LinearImage>, Error> {
    let std_dx = fe.std_dev_x.get();
    let std_dy = fe.std_dev_y.get();

    // 'A value of zero disables the effect of the given filter primitive.'
    if std_dx.approx_zero_ulps(4) && std_dy.approx_zero_ulps(4) {
        return Ok(input);
    }

    Ok(Rc::new(box_blur::apply(std_dx, std_dy, &input)?))
}

fn apply_offset(fe: &Offset, input: Rc<LinearImage>) -> Result<Rc<LinearImage>, Error> {
    let dx = fe.dx.round() as i32;
    let dy = fe.dy.round() as i32;

    if dx == 0 && dy == 0 {
        return Ok(input);
    }

    let mut image = LinearImage::try_new(input.width(), input.height())?;
    offset_into(&input, dx, dy, &mut image, |s, _| s);

    Ok(Rc::new(image))
}

/// Writes `src` shifted by `(dx, dy)` into `dest`, merging each shifted
/// pixel with the pixel already there. Out-of-bounds samples are
/// transparent black, not edge-extended.
fn offset_into(
    src: &LinearImage,
    dx: i32,
    dy: i32,
    dest: &mut LinearImage,
    merge: impl Fn(Pixel, Pixel) -> Pixel,
) {
    let w = src.width() as i32;
    let h = src.height() as i32;
    let dest_pixels = dest.pixels_mut();

    let mut i = 0;
    for y in 0..h {
        for x in 0..w {
            let sx = x - dx;
            let sy = y - dy;
            let s = if sx >= 0 && sx < w && sy >= 0 && sy < h {
                src.pixel_at(sx as u32, sy as u32)
            } else {
                Pixel::TRANSPARENT
            };

            dest_pixels[i] = merge(s, dest_pixels[i]);
            i += 1;
        }
    }
}

fn apply_drop_shadow(fe: &DropShadow, input: &LinearImage) -> Result<LinearImage, Error> {
    let opacity = fe.opacity.get();
    let lr = srgb::srgb_to_linear(fe.color.red as f32 / 255.0);
    let lg = srgb::srgb_to_linear(fe.color.green as f32 / 255.0);
    let lb = srgb::srgb_to_linear(fe.color.blue as f32 / 255.0);

    // The shadow plate: the input's alpha scaled by the flood opacity and
    // tinted with the flood color.
    let mut shadow = LinearImage::try_new(input.width(), input.height())?;
    for (dst, src) in shadow.pixels_mut().iter_mut().zip(input.pixels()) {
        let a = src.a * opacity;
        *dst = Pixel {
            r: lr * a,
            g: lg * a,
            b: lb * a,
            a,
        };
    }

    let shadow = box_blur::apply(fe.std_dev_x.get(), fe.std_dev_y.get(), &shadow)?;

    // Shift the blurred plate and draw the input over it in a single pass.
    let mut image = input.clone();
    offset_into(
        &shadow,
        fe.dx.round() as i32,
        fe.dy.round() as i32,
        &mut image,
        |s, g| g.source_over(s),
    );

    Ok(image)
}

fn apply_merge(fe: &Merge, ctx: &FilterContext) -> Result<LinearImage, Error> {
    let mut image = LinearImage::try_new(ctx.source_graphic.width(), ctx.source_graphic.height())?;

    for input in &fe.inputs {
        let input = match ctx.get_input(input) {
            Some(v) => v,
            None => continue,
        };

        for (dst, s) in image.pixels_mut().iter_mut().zip(input.pixels()) {
            *dst = s.source_over(*dst);
        }
    }

    Ok(image)
}

fn apply_flood(fe: &Flood, ctx: &FilterContext) -> Result<LinearImage, Error> {
    let a = fe.opacity.get();
    let pixel = Pixel {
        r: srgb::srgb_to_linear(fe.color.red as f32 / 255.0) * a,
        g: srgb::srgb_to_linear(fe.color.green as f32 / 255.0) * a,
        b: srgb::srgb_to_linear(fe.color.blue as f32 / 255.0) * a,
        a,
    };

    let mut image = LinearImage::try_new(ctx.source_graphic.width(), ctx.source_graphic.height())?;
    for dst in image.pixels_mut() {
        *dst = pixel;
    }

    Ok(image)
}
