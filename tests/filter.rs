// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use linfilters::{
    apply, Blend, BlendMode, Color, ColorMatrix, ColorMatrixKind, Composite, CompositeOperator,
    DropShadow, Filter, Flood, GaussianBlur, Input, Kind, Merge, Offset, Opacity, PositiveF32,
    Primitive, RasterRefMut,
};

fn filter(primitives: Vec<Primitive>) -> Filter {
    Filter {
        id: "test".to_string(),
        primitives,
    }
}

fn prim(kind: Kind) -> Primitive {
    Primitive { result: None, kind }
}

fn named(result: &str, kind: Kind) -> Primitive {
    Primitive {
        result: Some(result.to_string()),
        kind,
    }
}

fn reference(name: &str) -> Input {
    Input::Reference(name.to_string())
}

fn run(filter: &Filter, data: &mut [u8], width: u32, height: u32) {
    let stride = width as usize * 4;
    let raster = RasterRefMut::new(data, width, height, stride).unwrap();
    apply(filter, raster).unwrap();
}

/// A 2x2 opaque raster with four distinct colors, premultiplied B,G,R,A.
fn quad_raster() -> Vec<u8> {
    vec![
        0, 0, 255, 255, // red
        0, 255, 0, 255, // green
        255, 0, 0, 255, // blue
        0, 200, 230, 255, // orange-ish
    ]
}

fn max_byte_diff(a: &[u8], b: &[u8]) -> i16 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (*x as i16 - *y as i16).abs())
        .max()
        .unwrap()
}

#[test]
fn empty_filter_is_a_round_trip() {
    // Includes translucent pixels; premultiplied channels never exceed alpha.
    let original = vec![
        0, 0, 255, 255, //
        10, 60, 120, 200, //
        1, 2, 3, 10, //
        0, 0, 0, 0, //
    ];

    let mut data = original.clone();
    run(&filter(vec![]), &mut data, 2, 2);
    assert!(max_byte_diff(&data, &original) <= 1);
}

#[test]
fn flood_fills_every_pixel() {
    let mut data = quad_raster();
    let f = filter(vec![prim(Kind::Flood(Flood {
        color: Color::new_rgb(0, 0, 255),
        opacity: Opacity::ONE,
    }))]);
    run(&f, &mut data, 2, 2);

    for pixel in data.chunks(4) {
        assert_eq!(pixel, &[255, 0, 0, 255]);
    }
}

#[test]
fn flood_premultiplies_opacity() {
    let mut data = quad_raster();
    let f = filter(vec![prim(Kind::Flood(Flood {
        color: Color::white(),
        opacity: Opacity::new(0.5).unwrap(),
    }))]);
    run(&f, &mut data, 2, 2);

    let first = &data[0..4];
    assert_eq!(first[3], 128);
    // White at half opacity stays grey-premultiplied and uniform.
    assert_eq!(first[0], first[1]);
    assert_eq!(first[1], first[2]);
    assert!((first[0] as i16 - 128).abs() <= 1);
    for pixel in data.chunks(4) {
        assert_eq!(pixel, first);
    }
}

#[test]
fn offset_moves_pixels_and_clears_the_rest() {
    // A single opaque green pixel in the middle of 3x3.
    let mut data = vec![0; 9 * 4];
    data[4 * 4..4 * 4 + 4].copy_from_slice(&[0, 255, 0, 255]);

    let f = filter(vec![prim(Kind::Offset(Offset {
        input: Input::Last,
        dx: 1.0,
        dy: 1.0,
    }))]);
    run(&f, &mut data, 3, 3);

    let expected_index = (2 * 3 + 2) * 4;
    for (i, pixel) in data.chunks(4).enumerate() {
        if i * 4 == expected_index {
            assert_eq!(pixel, &[0, 255, 0, 255]);
        } else {
            assert_eq!(pixel, &[0, 0, 0, 0]);
        }
    }
}

#[test]
fn fractional_offset_rounds_to_identity() {
    let mut baseline = quad_raster();
    run(&filter(vec![]), &mut baseline, 2, 2);

    let mut data = quad_raster();
    let f = filter(vec![prim(Kind::Offset(Offset {
        input: Input::Last,
        dx: 0.2,
        dy: -0.3,
    }))]);
    run(&f, &mut data, 2, 2);

    assert_eq!(data, baseline);
}

#[test]
fn merge_composites_over_a_flood() {
    // First pixel opaque red, second transparent.
    let mut data = vec![0, 0, 255, 255, 0, 0, 0, 0];
    let f = filter(vec![
        named(
            "bg",
            Kind::Flood(Flood {
                color: Color::new_rgb(0, 0, 255),
                opacity: Opacity::ONE,
            }),
        ),
        prim(Kind::Merge(Merge {
            inputs: vec![reference("bg"), reference("SourceGraphic")],
        })),
    ]);
    run(&f, &mut data, 2, 1);

    // The graphic wins where it is opaque, the flood shows through elsewhere.
    assert_eq!(&data[0..4], &[0, 0, 255, 255]);
    assert_eq!(&data[4..8], &[255, 0, 0, 255]);
}

#[test]
fn merge_skips_unknown_references() {
    let original = quad_raster();
    let mut data = original.clone();
    let f = filter(vec![prim(Kind::Merge(Merge {
        inputs: vec![reference("missing"), reference("SourceGraphic")],
    }))]);
    run(&f, &mut data, 2, 2);

    assert!(max_byte_diff(&data, &original) <= 1);
}

#[test]
fn composite_over_transparent_dest_is_identity() {
    let original = quad_raster();

    let mut data = original.clone();
    let f = filter(vec![
        named(
            "bg",
            Kind::Flood(Flood {
                color: Color::black(),
                opacity: Opacity::ZERO,
            }),
        ),
        prim(Kind::Composite(Composite {
            input1: reference("SourceGraphic"),
            input2: reference("bg"),
            operator: CompositeOperator::Over,
        })),
    ]);
    run(&f, &mut data, 2, 2);

    assert!(max_byte_diff(&data, &original) <= 1);
}

#[test]
fn arithmetic_composite_identity() {
    let original = vec![
        0, 0, 255, 255, //
        10, 60, 120, 200, //
        30, 30, 30, 128, //
        0, 0, 0, 0, //
    ];

    let mut data = original.clone();
    let f = filter(vec![
        named(
            "bg",
            Kind::Flood(Flood {
                color: Color::new_rgb(40, 90, 200),
                opacity: Opacity::new(0.7).unwrap(),
            }),
        ),
        prim(Kind::Composite(Composite {
            input1: reference("SourceGraphic"),
            input2: reference("bg"),
            operator: CompositeOperator::Arithmetic {
                k1: 0.0,
                k2: 1.0,
                k3: 0.0,
                k4: 0.0,
            },
        })),
    ]);
    run(&f, &mut data, 2, 2);

    assert!(max_byte_diff(&data, &original) <= 1);
}

#[test]
fn gaussian_blur_zero_sigma_is_identity() {
    let mut baseline = quad_raster();
    run(&filter(vec![]), &mut baseline, 2, 2);

    let mut data = quad_raster();
    let f = filter(vec![prim(Kind::GaussianBlur(GaussianBlur {
        input: Input::Last,
        std_dev_x: PositiveF32::ZERO,
        std_dev_y: PositiveF32::ZERO,
    }))]);
    run(&f, &mut data, 2, 2);

    assert_eq!(data, baseline);
}

#[test]
fn blur_keeps_an_opaque_fill_opaque() {
    let mut data: Vec<u8> = std::iter::repeat([0u8, 0, 255, 255])
        .take(100 * 100)
        .flatten()
        .collect();

    let f = filter(vec![prim(Kind::GaussianBlur(GaussianBlur {
        input: Input::Last,
        std_dev_x: PositiveF32::new(2.0).unwrap(),
        std_dev_y: PositiveF32::new(2.0).unwrap(),
    }))]);
    run(&f, &mut data, 100, 100);

    // A uniform opaque fill is a fixed point of the blur.
    let center = (50 * 100 + 50) * 4;
    assert!(data[center + 2] >= 254);
    assert_eq!(data[center], 0);
    assert_eq!(data[center + 1], 0);

    let alpha_mass: u64 = data.chunks(4).map(|p| p[3] as u64).sum();
    assert_eq!(alpha_mass, 100 * 100 * 255);
}

#[test]
fn drop_shadow_offsets_a_soft_black_copy() {
    // A white 10x10 square centered on a transparent 50x50 canvas.
    let mut data = vec![0u8; 50 * 50 * 4];
    for y in 20..30 {
        for x in 20..30 {
            let i = (y * 50 + x) * 4;
            data[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
        }
    }

    let f = filter(vec![prim(Kind::DropShadow(DropShadow {
        input: Input::Last,
        dx: 2.0,
        dy: 2.0,
        std_dev_x: PositiveF32::new(1.5).unwrap(),
        std_dev_y: PositiveF32::new(1.5).unwrap(),
        color: Color::black(),
        opacity: Opacity::new(0.5).unwrap(),
    }))]);
    run(&f, &mut data, 50, 50);

    // The graphic itself is untouched where it was opaque.
    for y in 20..30 {
        for x in 20..30 {
            let i = (y * 50 + x) * 4;
            assert_eq!(&data[i..i + 4], &[255, 255, 255, 255]);
        }
    }

    // A soft black shadow pokes out below-right of the square.
    let i = (26 * 50 + 31) * 4;
    assert_eq!(data[i], 0);
    assert_eq!(data[i + 1], 0);
    assert_eq!(data[i + 2], 0);
    assert!(data[i + 3] > 0 && data[i + 3] < 255);

    // Far corners stay fully transparent.
    assert_eq!(&data[0..4], &[0, 0, 0, 0]);

    // Premultiplication holds everywhere after write-back.
    for pixel in data.chunks(4) {
        assert!(pixel[0] <= pixel[3]);
        assert!(pixel[1] <= pixel[3]);
        assert!(pixel[2] <= pixel[3]);
    }
}

#[test]
fn saturate_zero_is_grey() {
    let original = quad_raster();
    let mut data = original.clone();
    let f = filter(vec![prim(Kind::ColorMatrix(ColorMatrix {
        input: Input::Last,
        kind: ColorMatrixKind::Saturate(0.0),
    }))]);
    run(&f, &mut data, 2, 2);

    for (have, want) in data.chunks(4).zip(original.chunks(4)) {
        assert_eq!(have[0], have[1]);
        assert_eq!(have[1], have[2]);
        assert_eq!(have[3], want[3]);
    }
}

#[test]
fn color_matrix_identity_values() {
    let original = vec![
        0, 0, 255, 255, //
        10, 60, 120, 200, //
        255, 255, 255, 255, //
        0, 0, 0, 0, //
    ];

    let mut data = original.clone();
    let values = vec![
        1.0, 0.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0, //
    ];
    let f = filter(vec![prim(Kind::ColorMatrix(ColorMatrix {
        input: Input::Last,
        kind: ColorMatrixKind::Matrix(values),
    }))]);
    run(&f, &mut data, 2, 2);

    assert!(max_byte_diff(&data, &original) <= 1);
}

#[test]
fn blend_normal_matches_composite_over() {
    let bg = named(
        "bg",
        Kind::Flood(Flood {
            color: Color::new_rgb(20, 160, 60),
            opacity: Opacity::new(0.4).unwrap(),
        }),
    );

    let mut blended = quad_raster();
    let f = filter(vec![
        bg.clone(),
        prim(Kind::Blend(Blend {
            input1: reference("SourceGraphic"),
            input2: reference("bg"),
            mode: BlendMode::Normal,
        })),
    ]);
    run(&f, &mut blended, 2, 2);

    let mut composited = quad_raster();
    let f = filter(vec![
        bg,
        prim(Kind::Composite(Composite {
            input1: reference("SourceGraphic"),
            input2: reference("bg"),
            operator: CompositeOperator::Over,
        })),
    ]);
    run(&f, &mut composited, 2, 2);

    assert!(max_byte_diff(&blended, &composited) <= 1);
}

#[test]
fn missing_input_does_not_advance_the_chain() {
    let mut baseline = quad_raster();
    run(&filter(vec![]), &mut baseline, 2, 2);

    let mut data = quad_raster();
    let f = filter(vec![prim(Kind::Offset(Offset {
        input: reference("missing"),
        dx: 5.0,
        dy: 5.0,
    }))]);
    run(&f, &mut data, 2, 2);

    // The broken primitive produced nothing; the output is the source.
    assert_eq!(data, baseline);
}

#[test]
fn evaluation_continues_after_a_missing_input() {
    let mut data = quad_raster();
    let f = filter(vec![
        prim(Kind::Offset(Offset {
            input: reference("missing"),
            dx: 5.0,
            dy: 5.0,
        })),
        prim(Kind::Flood(Flood {
            color: Color::new_rgb(0, 0, 255),
            opacity: Opacity::ONE,
        })),
    ]);
    run(&f, &mut data, 2, 2);

    for pixel in data.chunks(4) {
        assert_eq!(pixel, &[255, 0, 0, 255]);
    }
}

#[test]
fn source_alpha_is_black_with_the_source_coverage() {
    // Opaque red and a transparent pixel.
    let mut data = vec![0, 0, 255, 255, 0, 0, 0, 0];
    let f = filter(vec![prim(Kind::Offset(Offset {
        input: reference("SourceAlpha"),
        dx: 0.0,
        dy: 0.0,
    }))]);
    run(&f, &mut data, 2, 1);

    assert_eq!(&data[0..4], &[0, 0, 0, 255]);
    assert_eq!(&data[4..8], &[0, 0, 0, 0]);
}

#[test]
fn stride_padding_is_left_untouched() {
    // 2x2 raster with 8 bytes of padding per row, poisoned with 0xAA.
    let mut data = vec![0xAA; 16 * 2];
    for y in 0..2 {
        for x in 0..2 {
            let i = y * 16 + x * 4;
            data[i..i + 4].copy_from_slice(&[0, 0, 200, 255]);
        }
    }

    let raster = RasterRefMut::new(&mut data, 2, 2, 16).unwrap();
    let f = filter(vec![prim(Kind::Flood(Flood {
        color: Color::new_rgb(0, 255, 0),
        opacity: Opacity::ONE,
    }))]);
    apply(&f, raster).unwrap();

    for y in 0..2 {
        for x in 0..2 {
            let i = y * 16 + x * 4;
            assert_eq!(&data[i..i + 4], &[0, 255, 0, 255]);
        }
        assert!(data[y * 16 + 8..y * 16 + 16].iter().all(|b| *b == 0xAA));
    }
}
