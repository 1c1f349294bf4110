// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use svgscene::{Color, Gradient, GradientKind, OptionLog, SpreadMethod, UnitContext, Units};

/// A rendered pattern tile.
pub(crate) struct PatternTile {
    pub pixmap: tiny_skia::Pixmap,
    /// Maps the tile pixels into the user space of the painted element.
    pub transform: tiny_skia::Transform,
}

/// A fill or stroke paint of a state frame.
#[derive(Clone)]
pub(crate) enum Paint {
    None,
    Color(Color),
    CurrentColor,
    Gradient(Rc<Gradient>),
    Pattern(Rc<PatternTile>),
}

impl Paint {
    pub fn is_none(&self) -> bool {
        matches!(self, Paint::None)
    }
}

/// Creates a shader for a paint.
///
/// `object_bbox` is the painted shape bounds in user space.
/// Returns `None` when nothing should be painted.
pub(crate) fn to_shader<'a>(
    paint: &'a Paint,
    current_color: Color,
    opacity: f64,
    object_bbox: Option<tiny_skia::NonZeroRect>,
    units: &UnitContext,
) -> Option<tiny_skia::Shader<'a>> {
    match paint {
        Paint::None => None,
        Paint::Color(c) => Some(solid_color(*c, opacity)),
        Paint::CurrentColor => Some(solid_color(current_color, opacity)),
        Paint::Gradient(ref g) => convert_gradient(g, opacity, object_bbox, units),
        Paint::Pattern(ref tile) => Some(tiny_skia::Pattern::new(
            tile.pixmap.as_ref(),
            tiny_skia::SpreadMode::Repeat,
            tiny_skia::FilterQuality::Bicubic,
            opacity as f32,
            tile.transform,
        )),
    }
}

fn solid_color(c: Color, opacity: f64) -> tiny_skia::Shader<'static> {
    let alpha = c.alpha as f64 / 255.0 * opacity;
    tiny_skia::Shader::SolidColor(tiny_skia::Color::from_rgba8(
        c.red,
        c.green,
        c.blue,
        to_u8(alpha),
    ))
}

fn convert_gradient(
    gradient: &Gradient,
    opacity: f64,
    object_bbox: Option<tiny_skia::NonZeroRect>,
    units: &UnitContext,
) -> Option<tiny_skia::Shader<'static>> {
    let mode = match gradient.spread {
        SpreadMethod::Pad => tiny_skia::SpreadMode::Pad,
        SpreadMethod::Reflect => tiny_skia::SpreadMode::Reflect,
        SpreadMethod::Repeat => tiny_skia::SpreadMode::Repeat,
    };

    let ts = gradient.transform;
    let gradient_ts = tiny_skia::Transform::from_row(
        ts.a as f32,
        ts.b as f32,
        ts.c as f32,
        ts.d as f32,
        ts.e as f32,
        ts.f as f32,
    );

    let object_units = gradient.units == Units::ObjectBoundingBox;
    let transform = if object_units {
        let bbox =
            object_bbox.log_none(|| log::warn!("Gradient on zero-sized shapes is not allowed."))?;
        tiny_skia::Transform::from_bbox(bbox).pre_concat(gradient_ts)
    } else {
        gradient_ts
    };

    let units = UnitContext {
        object_units,
        ..*units
    };

    let mut stops = Vec::with_capacity(gradient.stops.len());
    for stop in &gradient.stops {
        let alpha = stop.color.alpha as f64 / 255.0 * stop.opacity * opacity;
        let color = tiny_skia::Color::from_rgba8(
            stop.color.red,
            stop.color.green,
            stop.color.blue,
            to_u8(alpha),
        );
        stops.push(tiny_skia::GradientStop::new(stop.offset as f32, color));
    }

    let px = |l: &svgscene::Length| l.to_px(&units) as f32;

    match gradient.kind {
        GradientKind::Linear {
            ref x1,
            ref y1,
            ref x2,
            ref y2,
        } => tiny_skia::LinearGradient::new(
            (px(x1), px(y1)).into(),
            (px(x2), px(y2)).into(),
            stops,
            mode,
            transform,
        ),
        GradientKind::Radial {
            ref cx,
            ref cy,
            ref r,
            ref fx,
            ref fy,
        } => tiny_skia::RadialGradient::new(
            (px(fx), px(fy)).into(),
            (px(cx), px(cy)).into(),
            px(r),
            stops,
            mode,
            transform,
        ),
    }
}

#[inline]
pub(crate) fn to_u8(opacity: f64) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}
