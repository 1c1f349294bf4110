// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use rgb::{FromSlice, RGBA8};
use svgscene::filter::{BlendMode, CompositeOperator, FilterInput};
use svgscene::{Color, Error};

/// A filter primitive with resolved units.
#[derive(Clone, Debug)]
pub(crate) struct Primitive {
    /// A position in the filter element, including skipped primitives.
    pub index: usize,
    pub input: FilterInput,
    /// A subregion in user space.
    ///
    /// `None` when width or height is not set.
    pub region: Option<tiny_skia::Rect>,
    pub kind: Kind,
}

#[derive(Clone, Debug)]
pub(crate) enum Kind {
    Blend {
        input2: FilterInput,
        mode: BlendMode,
    },
    Composite {
        input2: FilterInput,
        operator: CompositeOperator,
    },
    Flood {
        color: Color,
        opacity: f64,
    },
    GaussianBlur {
        std_dev_x: f64,
        std_dev_y: f64,
    },
    Offset {
        dx: f64,
        dy: f64,
    },
}

/// Applies a filter graph to a layer.
///
/// `ts` is the user space to canvas transform of the filtered element.
/// Returns the last primitive result.
pub(crate) fn apply(
    primitives: &[Primitive],
    source: tiny_skia::Pixmap,
    ts: tiny_skia::Transform,
) -> Result<tiny_skia::Pixmap, Error> {
    let mut results: HashMap<usize, tiny_skia::Pixmap> = HashMap::new();
    let mut last = None;

    for primitive in primitives {
        let result = {
            let input = get_input(primitive.input, &source, &results);
            match primitive.kind {
                Kind::Blend { input2, mode } => {
                    let input2 = get_input(input2, &source, &results);
                    apply_blend(mode, &input, &input2)?
                }
                Kind::Composite { input2, operator } => {
                    let input2 = get_input(input2, &source, &results);
                    apply_composite(operator, &input, &input2)?
                }
                Kind::Flood { color, opacity } => {
                    apply_flood(color, opacity, primitive.region, ts, &source)?
                }
                Kind::GaussianBlur {
                    std_dev_x,
                    std_dev_y,
                } => apply_blur(std_dev_x, std_dev_y, ts, input.into_owned()),
                Kind::Offset { dx, dy } => apply_offset(dx, dy, ts, &input)?,
            }
        };

        results.insert(primitive.index, result);
        last = Some(primitive.index);
    }

    Ok(match last.and_then(|idx| results.remove(&idx)) {
        Some(v) => v,
        None => source,
    })
}

fn get_input<'a>(
    input: FilterInput,
    source: &'a tiny_skia::Pixmap,
    results: &'a HashMap<usize, tiny_skia::Pixmap>,
) -> std::borrow::Cow<'a, tiny_skia::Pixmap> {
    use std::borrow::Cow;

    match input {
        FilterInput::SourceGraphic => Cow::Borrowed(source),
        FilterInput::SourceAlpha => {
            let mut pixmap = source.clone();
            for p in pixmap.data_mut().as_rgba_mut() {
                p.r = 0;
                p.g = 0;
                p.b = 0;
            }
            Cow::Owned(pixmap)
        }
        FilterInput::Reference(idx) => match results.get(&idx) {
            Some(v) => Cow::Borrowed(v),
            None => {
                log::warn!("Filter primitive {} has no result. SourceGraphic is used instead.", idx);
                Cow::Borrowed(source)
            }
        },
        _ => {
            log::warn!("{:?} filter input isn't supported. SourceGraphic is used instead.", input);
            Cow::Borrowed(source)
        }
    }
}

fn create_pixmap(like: &tiny_skia::Pixmap) -> Result<tiny_skia::Pixmap, Error> {
    tiny_skia::Pixmap::new(like.width(), like.height()).ok_or(Error::NoMemory)
}

fn apply_blend(
    mode: BlendMode,
    input1: &tiny_skia::Pixmap,
    input2: &tiny_skia::Pixmap,
) -> Result<tiny_skia::Pixmap, Error> {
    let mut pixmap = create_pixmap(input1)?;

    pixmap.draw_pixmap(
        0,
        0,
        input2.as_ref(),
        &tiny_skia::PixmapPaint::default(),
        tiny_skia::Transform::identity(),
        None,
    );

    let blend_mode = match mode {
        BlendMode::Normal => tiny_skia::BlendMode::SourceOver,
        BlendMode::Multiply => tiny_skia::BlendMode::Multiply,
        BlendMode::Screen => tiny_skia::BlendMode::Screen,
        BlendMode::Darken => tiny_skia::BlendMode::Darken,
        BlendMode::Lighten => tiny_skia::BlendMode::Lighten,
    };

    pixmap.draw_pixmap(
        0,
        0,
        input1.as_ref(),
        &tiny_skia::PixmapPaint {
            blend_mode,
            ..tiny_skia::PixmapPaint::default()
        },
        tiny_skia::Transform::identity(),
        None,
    );

    Ok(pixmap)
}

fn apply_composite(
    operator: CompositeOperator,
    input1: &tiny_skia::Pixmap,
    input2: &tiny_skia::Pixmap,
) -> Result<tiny_skia::Pixmap, Error> {
    let mut pixmap = create_pixmap(input1)?;

    if let CompositeOperator::Arithmetic { k1, k2, k3, k4 } = operator {
        arithmetic_composite(
            k1,
            k2,
            k3,
            k4,
            input1.data().as_rgba(),
            input2.data().as_rgba(),
            pixmap.data_mut().as_rgba_mut(),
        );
        return Ok(pixmap);
    }

    pixmap.draw_pixmap(
        0,
        0,
        input2.as_ref(),
        &tiny_skia::PixmapPaint::default(),
        tiny_skia::Transform::identity(),
        None,
    );

    let blend_mode = match operator {
        CompositeOperator::Over => tiny_skia::BlendMode::SourceOver,
        CompositeOperator::In => tiny_skia::BlendMode::SourceIn,
        CompositeOperator::Out => tiny_skia::BlendMode::SourceOut,
        CompositeOperator::Atop => tiny_skia::BlendMode::SourceAtop,
        CompositeOperator::Xor => tiny_skia::BlendMode::Xor,
        CompositeOperator::Arithmetic { .. } => tiny_skia::BlendMode::SourceOver,
    };

    pixmap.draw_pixmap(
        0,
        0,
        input1.as_ref(),
        &tiny_skia::PixmapPaint {
            blend_mode,
            ..tiny_skia::PixmapPaint::default()
        },
        tiny_skia::Transform::identity(),
        None,
    );

    Ok(pixmap)
}

fn apply_flood(
    color: Color,
    opacity: f64,
    region: Option<tiny_skia::Rect>,
    ts: tiny_skia::Transform,
    like: &tiny_skia::Pixmap,
) -> Result<tiny_skia::Pixmap, Error> {
    let mut pixmap = create_pixmap(like)?;
    let color = tiny_skia::Color::from_rgba8(
        color.red,
        color.green,
        color.blue,
        crate::paint::to_u8(opacity),
    );

    match region {
        Some(rect) => {
            let mut paint = tiny_skia::Paint::default();
            paint.set_color(color);
            pixmap.fill_rect(rect, &paint, ts, None);
        }
        None => pixmap.fill(color),
    }

    Ok(pixmap)
}

fn apply_offset(
    dx: f64,
    dy: f64,
    ts: tiny_skia::Transform,
    input: &tiny_skia::Pixmap,
) -> Result<tiny_skia::Pixmap, Error> {
    let (sx, sy) = ts.get_scale();
    let dx = dx as f32 * sx;
    let dy = dy as f32 * sy;

    let mut pixmap = create_pixmap(input)?;
    pixmap.draw_pixmap(
        dx as i32,
        dy as i32,
        input.as_ref(),
        &tiny_skia::PixmapPaint::default(),
        tiny_skia::Transform::identity(),
        None,
    );

    Ok(pixmap)
}

fn apply_blur(
    std_dev_x: f64,
    std_dev_y: f64,
    ts: tiny_skia::Transform,
    mut pixmap: tiny_skia::Pixmap,
) -> tiny_skia::Pixmap {
    let (sx, sy) = ts.get_scale();
    let std_dx = std_dev_x * sx as f64;
    let std_dy = std_dev_y * sy as f64;

    // A negative or zero deviation disables the effect along that axis.
    if std_dx <= 0.0 && std_dy <= 0.0 {
        return pixmap;
    }

    let (width, height) = (pixmap.width() as usize, pixmap.height() as usize);
    box_blur(std_dx, std_dy, pixmap.data_mut().as_rgba_mut(), width, height);
    pixmap
}

const STEPS: usize = 3;
const MAX_BOX_SIZE: usize = u16::MAX as usize;

/// Approximates a Gaussian blur with three box blur passes per axis.
///
/// Pixels are expected to be premultiplied. Pixels outside the image are
/// transparent.
pub(crate) fn box_blur(sigma_x: f64, sigma_y: f64, data: &mut [RGBA8], width: usize, height: usize) {
    // A box wider than the image only dilutes it further.
    let boxes_x = create_box_gauss(sigma_x.min(width as f64));
    let boxes_y = create_box_gauss(sigma_y.min(height as f64));
    let mut buf = data.to_vec();

    for (size_x, size_y) in boxes_x.iter().zip(boxes_y.iter()) {
        let radius_x = (size_x - 1) / 2;
        if radius_x > 0 {
            buf.copy_from_slice(data);
            for row in 0..height {
                blur_line(&buf, data, row * width, 1, width, radius_x);
            }
        }

        let radius_y = (size_y - 1) / 2;
        if radius_y > 0 {
            buf.copy_from_slice(data);
            for col in 0..width {
                blur_line(&buf, data, col, width, height, radius_y);
            }
        }
    }
}

// Box sizes for the requested deviation, see
// http://blog.ivank.net/fastest-gaussian-blur.html
fn create_box_gauss(sigma: f64) -> [usize; STEPS] {
    if !(sigma > 0.0) {
        return [1; STEPS];
    }

    let n = STEPS as f64;
    let w_ideal = (12.0 * sigma * sigma / n + 1.0).sqrt().min(MAX_BOX_SIZE as f64);
    let mut wl = w_ideal.floor() as usize;
    if wl % 2 == 0 {
        wl = wl.saturating_sub(1).max(1);
    }
    let wu = wl + 2;

    let wlf = wl as f64;
    let m_ideal = (12.0 * sigma * sigma - n * wlf * wlf - 4.0 * n * wlf - 3.0 * n) / (-4.0 * wlf - 4.0);
    let m = m_ideal.round().max(0.0) as usize;

    let mut sizes = [wu; STEPS];
    for (i, size) in sizes.iter_mut().enumerate() {
        if i < m {
            *size = wl;
        }
    }

    sizes
}

fn blur_line(
    src: &[RGBA8],
    dst: &mut [RGBA8],
    start: usize,
    stride: usize,
    len: usize,
    radius: usize,
) {
    let at = |i: usize| src[start + i * stride];
    let scale = 1.0 / (radius * 2 + 1) as f32;

    if len == 0 {
        return;
    }

    let mut sum = [0u32; 4];
    let add = |sum: &mut [u32; 4], p: RGBA8| {
        sum[0] += p.r as u32;
        sum[1] += p.g as u32;
        sum[2] += p.b as u32;
        sum[3] += p.a as u32;
    };

    for i in 0..radius.min(len.saturating_sub(1)) + 1 {
        add(&mut sum, at(i));
    }

    for i in 0..len {
        dst[start + i * stride] = RGBA8 {
            r: (sum[0] as f32 * scale).round() as u8,
            g: (sum[1] as f32 * scale).round() as u8,
            b: (sum[2] as f32 * scale).round() as u8,
            a: (sum[3] as f32 * scale).round() as u8,
        };

        if i + radius + 1 < len {
            add(&mut sum, at(i + radius + 1));
        }

        if i >= radius {
            let p = at(i - radius);
            sum[0] -= p.r as u32;
            sum[1] -= p.g as u32;
            sum[2] -= p.b as u32;
            sum[3] -= p.a as u32;
        }
    }
}

/// Performs an arithmetic composition.
///
/// `result = k1*i1*i2 + k2*i1 + k3*i2 + k4` per premultiplied channel,
/// with color channels bound by the resulting alpha.
pub(crate) fn arithmetic_composite(
    k1: f64,
    k2: f64,
    k3: f64,
    k4: f64,
    src1: &[RGBA8],
    src2: &[RGBA8],
    dest: &mut [RGBA8],
) {
    let calc = |i1: u8, i2: u8, max: f64| {
        let i1 = i1 as f64 / 255.0;
        let i2 = i2 as f64 / 255.0;
        let result = k1 * i1 * i2 + k2 * i1 + k3 * i2 + k4;
        result.clamp(0.0, max)
    };

    for ((c1, c2), d) in src1.iter().zip(src2).zip(dest.iter_mut()) {
        let a = calc(c1.a, c2.a, 1.0);
        if a <= f64::EPSILON {
            *d = RGBA8::default();
            continue;
        }

        *d = RGBA8 {
            r: (calc(c1.r, c2.r, a) * 255.0) as u8,
            g: (calc(c1.g, c2.g, a) * 255.0) as u8,
            b: (calc(c1.b, c2.b, a) * 255.0) as u8,
            a: (a * 255.0) as u8,
        };
    }
}
