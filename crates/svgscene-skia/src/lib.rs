// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
A [tiny-skia] render engine for [`svgscene`] documents.

```no_run
let mut doc = svgscene::Document::default();
doc.parse("image.svg").unwrap();

let mut pixmap = tiny_skia::Pixmap::new(200, 200).unwrap();
svgscene_skia::render_to_area(&mut doc, &mut pixmap.as_mut(), 0.0, 0.0, 200.0, 200.0).unwrap();
pixmap.save_png("image.png").unwrap();
```

[tiny-skia]: https://github.com/RazrFalcon/tiny-skia
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::too_many_arguments)]

use std::collections::HashMap;
use std::rc::Rc;

use svgscene::filter::{BlendMode, CompositeOperator, FilterInput, PrimitiveRegion};
use svgscene::style::{FillRule, FontStyle, LineCap, LineJoin, TextAnchor};
use svgscene::{
    BoundingBox, Color, Document, Error, Length, Options, PaintRef, PathCache, Pattern,
    RasterImage, RenderEngine, UnitContext, Units, ViewBox,
};

mod filter;
mod paint;
mod path;

pub use svgscene;
pub use tiny_skia;

use crate::paint::{Paint, PatternTile};
use crate::path::PathBuilderExt;

/// Renders a document onto a pixmap.
///
/// `transform` maps the document user space onto the pixmap.
pub fn render(
    doc: &mut Document,
    transform: tiny_skia::Transform,
    pixmap: &mut tiny_skia::PixmapMut,
) -> Result<(), Error> {
    let mut engine = SkiaEngine::new(pixmap.width(), pixmap.height(), transform)?;
    engine.set_options(&doc.options);

    // A fresh engine knows nothing about previously emitted filters.
    doc.tree().invalidate_filters();
    doc.render(&mut engine)?;

    pixmap.draw_pixmap(
        0,
        0,
        engine.canvas().as_ref(),
        &tiny_skia::PixmapPaint::default(),
        tiny_skia::Transform::identity(),
        None,
    );

    Ok(())
}

/// Renders a document into a pixmap area.
///
/// The document is scaled uniformly to fit the area and centered.
pub fn render_to_area(
    doc: &mut Document,
    pixmap: &mut tiny_skia::PixmapMut,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Result<(), Error> {
    let (doc_width, doc_height) = document_size(doc, (width, height));
    if !(doc_width > 0.0 && doc_height > 0.0 && width > 0.0 && height > 0.0) {
        return Err(Error::InvalidValue(format!(
            "document size {}x{} into area {}x{}",
            doc_width, doc_height, width, height
        )));
    }

    let scale = (width / doc_width).min(height / doc_height);
    let tx = x + (width - doc_width * scale) / 2.0;
    let ty = y + (height - doc_height * scale) / 2.0;

    let ts = tiny_skia::Transform::from_row(
        scale as f32,
        0.0,
        0.0,
        scale as f32,
        tx as f32,
        ty as f32,
    );

    render(doc, ts, pixmap)
}

/// Returns the document size in pixels.
///
/// Percentages are resolved against `viewport`.
pub fn document_size(doc: &Document, viewport: (f64, f64)) -> (f64, f64) {
    let units = UnitContext {
        dpi: doc.options.dpi,
        font_size: doc.options.font_size,
        viewport,
        object_units: false,
    };

    let (width, height) = doc.size();
    (width.to_px(&units), height.to_px(&units))
}

#[derive(Clone)]
struct State {
    transform: tiny_skia::Transform,
    clip: Option<Rc<tiny_skia::Mask>>,
    viewport: (f64, f64),

    color: Color,
    fill: Paint,
    fill_opacity: f64,
    fill_rule: tiny_skia::FillRule,
    stroke: Paint,
    stroke_opacity: f64,
    stroke_width: Length,
    dashes: Vec<Length>,
    dash_offset: Length,
    line_cap: tiny_skia::LineCap,
    line_join: tiny_skia::LineJoin,
    miter_limit: f64,
    /// Applied to fill and stroke of the current element only.
    opacity: f64,

    font_size: f64,
    text_anchor: TextAnchor,

    /// The state owns the top canvas.
    layer: bool,
    group_opacity: f64,
    filter: Option<(Rc<[filter::Primitive]>, tiny_skia::Transform)>,
    /// Pattern tile to user space transform.
    ///
    /// Set only for a pattern content root.
    tile: Option<tiny_skia::Transform>,
}

impl State {
    fn new(transform: tiny_skia::Transform, viewport: (f64, f64), font_size: f64) -> Self {
        State {
            transform,
            clip: None,
            viewport,
            color: Color::black(),
            fill: Paint::Color(Color::black()),
            fill_opacity: 1.0,
            fill_rule: tiny_skia::FillRule::Winding,
            stroke: Paint::None,
            stroke_opacity: 1.0,
            stroke_width: Length::new_number(1.0, svgscene::Orientation::Other),
            dashes: Vec::new(),
            dash_offset: Length::zero(svgscene::Orientation::Other),
            line_cap: tiny_skia::LineCap::Butt,
            line_join: tiny_skia::LineJoin::Miter,
            miter_limit: 4.0,
            opacity: 1.0,
            font_size,
            text_anchor: TextAnchor::Start,
            layer: false,
            group_opacity: 1.0,
            filter: None,
            tile: None,
        }
    }

    fn inherit(&self) -> Self {
        State {
            opacity: 1.0,
            layer: false,
            group_opacity: 1.0,
            filter: None,
            tile: None,
            ..self.clone()
        }
    }
}

/// A `tiny-skia` render engine.
///
/// Keeps a stack of canvases: the target one and offscreen layers for
/// group opacity, filters and pattern tiles.
pub struct SkiaEngine {
    canvases: Vec<tiny_skia::Pixmap>,
    states: Vec<State>,
    path: tiny_skia::PathBuilder,
    filters: HashMap<String, Vec<filter::Primitive>>,
    current_filter: Option<String>,
    pattern: Option<Rc<PatternTile>>,
    text_reported: bool,
    dpi: f64,

    /// Enables shapes anti-aliasing.
    ///
    /// Default: true
    pub anti_alias: bool,
}

impl std::fmt::Debug for SkiaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SkiaEngine")
            .field("width", &self.canvas().width())
            .field("height", &self.canvas().height())
            .field("depth", &self.states.len())
            .field("anti_alias", &self.anti_alias)
            .finish()
    }
}

impl SkiaEngine {
    /// Creates a new engine with a transparent canvas.
    ///
    /// `transform` maps the document user space onto the canvas.
    pub fn new(width: u32, height: u32, transform: tiny_skia::Transform) -> Result<Self, Error> {
        let canvas = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| Error::InvalidValue(format!("canvas size {}x{}", width, height)))?;

        let opt = Options::default();
        let viewport = (width as f64, height as f64);

        Ok(SkiaEngine {
            canvases: vec![canvas],
            states: vec![State::new(transform, viewport, opt.font_size)],
            path: tiny_skia::PathBuilder::new(),
            filters: HashMap::new(),
            current_filter: None,
            pattern: None,
            text_reported: false,
            dpi: opt.dpi,
            anti_alias: true,
        })
    }

    /// Sets DPI and a default font size.
    pub fn set_options(&mut self, opt: &Options) {
        self.dpi = opt.dpi;
        if let Some(root) = self.states.first_mut() {
            root.font_size = opt.font_size;
        }
    }

    /// Returns the target canvas.
    pub fn canvas(&self) -> &tiny_skia::Pixmap {
        &self.canvases[0]
    }

    /// Consumes the engine and returns the target canvas.
    pub fn into_pixmap(mut self) -> tiny_skia::Pixmap {
        self.canvases.swap_remove(0)
    }

    fn state(&self) -> &State {
        // The root state is never removed.
        &self.states[self.states.len() - 1]
    }

    fn state_mut(&mut self) -> &mut State {
        let idx = self.states.len() - 1;
        &mut self.states[idx]
    }

    fn units(&self) -> UnitContext {
        let state = self.state();
        UnitContext {
            dpi: self.dpi,
            font_size: state.font_size,
            viewport: state.viewport,
            object_units: false,
        }
    }

    fn px(&self, length: Length) -> f32 {
        length.to_px(&self.units()) as f32
    }

    fn push_state(&mut self) {
        let state = self.state().inherit();
        self.states.push(state);
    }

    fn push_layer(&mut self) -> Result<(), Error> {
        let (width, height) = {
            let canvas = self.current_canvas();
            (canvas.width(), canvas.height())
        };

        let layer = tiny_skia::Pixmap::new(width, height).ok_or(Error::NoMemory)?;
        self.canvases.push(layer);
        self.state_mut().layer = true;
        Ok(())
    }

    fn pop_state(&mut self) -> Result<(), Error> {
        if self.states.len() < 2 {
            return Err(Error::InvalidCall);
        }

        let state = self.states.pop().ok_or(Error::InvalidCall)?;
        if !state.layer {
            return Ok(());
        }

        let mut layer = self.canvases.pop().ok_or(Error::InvalidCall)?;
        if let Some((ref primitives, ts)) = state.filter {
            layer = filter::apply(primitives, layer, ts)?;
        }

        let paint = tiny_skia::PixmapPaint {
            opacity: state.group_opacity as f32,
            ..tiny_skia::PixmapPaint::default()
        };

        self.current_canvas_mut().draw_pixmap(
            0,
            0,
            layer.as_ref(),
            &paint,
            tiny_skia::Transform::identity(),
            None,
        );

        Ok(())
    }

    fn current_canvas(&self) -> &tiny_skia::Pixmap {
        &self.canvases[self.canvases.len() - 1]
    }

    fn current_canvas_mut(&mut self) -> &mut tiny_skia::Pixmap {
        let idx = self.canvases.len() - 1;
        &mut self.canvases[idx]
    }

    fn stroke(&self) -> Option<tiny_skia::Stroke> {
        let state = self.state();
        if state.stroke.is_none() {
            return None;
        }

        let width = self.px(state.stroke_width);
        if !(width > 0.0) {
            return None;
        }

        let mut stroke = tiny_skia::Stroke {
            width,
            miter_limit: state.miter_limit as f32,
            line_cap: state.line_cap,
            line_join: state.line_join,
            dash: None,
        };

        if !state.dashes.is_empty() {
            let mut list: Vec<f32> = state.dashes.iter().map(|l| self.px(*l)).collect();
            // An odd list is repeated to get an even one.
            if list.len() % 2 != 0 {
                list.extend_from_within(..);
            }

            stroke.dash = tiny_skia::StrokeDash::new(list, self.px(state.dash_offset));
        }

        Some(stroke)
    }

    /// Fills and strokes a path using the current state.
    ///
    /// Returns the path bounds in canvas coordinates.
    fn draw_path(&mut self, path: &tiny_skia::Path, fill: bool) -> Option<BoundingBox> {
        let stroke = self.stroke();
        let units = self.units();
        let anti_alias = self.anti_alias;

        let idx = self.states.len() - 1;
        let state = &self.states[idx];
        let canvas_idx = self.canvases.len() - 1;
        let canvas = &mut self.canvases[canvas_idx];

        let bounds = path.bounds();
        let object_bbox =
            tiny_skia::NonZeroRect::from_xywh(bounds.x(), bounds.y(), bounds.width(), bounds.height());
        let clip = state.clip.as_deref();

        if fill {
            let opacity = state.fill_opacity * state.opacity;
            if let Some(shader) =
                paint::to_shader(&state.fill, state.color, opacity, object_bbox, &units)
            {
                let paint = tiny_skia::Paint {
                    shader,
                    anti_alias,
                    ..tiny_skia::Paint::default()
                };
                canvas.fill_path(path, &paint, state.fill_rule, state.transform, clip);
            }
        }

        let mut bbox = device_bbox(bounds, state.transform);

        if let Some(ref stroke) = stroke {
            let opacity = state.stroke_opacity * state.opacity;
            if let Some(shader) =
                paint::to_shader(&state.stroke, state.color, opacity, object_bbox, &units)
            {
                let paint = tiny_skia::Paint {
                    shader,
                    anti_alias,
                    ..tiny_skia::Paint::default()
                };
                canvas.stroke_path(path, &paint, stroke, state.transform, clip);
            }

            if let Some(outline) = path.stroke(stroke, 1.0) {
                let outline = device_bbox(outline.bounds(), state.transform);
                bbox = match (bbox, outline) {
                    (Some(a), Some(b)) => Some(a.union(&b)),
                    (a, b) => a.or(b),
                };
            }
        }

        bbox
    }

    fn set_paint(&mut self, paint: PaintRef, fill: bool) {
        let paint = match paint {
            PaintRef::None => Paint::None,
            PaintRef::Color(c) => Paint::Color(c),
            PaintRef::CurrentColor => Paint::CurrentColor,
            PaintRef::Gradient(g) => Paint::Gradient(Rc::new(g.clone())),
            PaintRef::Pattern(_) => match self.pattern.take() {
                Some(tile) => Paint::Pattern(tile),
                None => Paint::None,
            },
        };

        let state = self.state_mut();
        if fill {
            state.fill = paint;
        } else {
            state.stroke = paint;
        }
    }

    fn add_primitive(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        kind: filter::Kind,
    ) -> Result<(), Error> {
        let rect = if region.width.number > 0.0 && region.height.number > 0.0 {
            tiny_skia::Rect::from_xywh(
                self.px(region.x),
                self.px(region.y),
                self.px(region.width),
                self.px(region.height),
            )
        } else {
            None
        };

        let id = self.current_filter.as_ref().ok_or(Error::InvalidCall)?;
        let primitives = self.filters.get_mut(id).ok_or(Error::InvalidCall)?;
        primitives.push(filter::Primitive {
            index: region.index,
            input,
            region: rect,
            kind,
        });

        Ok(())
    }
}

impl RenderEngine for SkiaEngine {
    fn begin_group(&mut self, opacity: f64) -> Result<(), Error> {
        self.push_state();

        if opacity < 1.0 {
            self.push_layer()?;
            self.state_mut().group_opacity = opacity.max(0.0);
        }

        Ok(())
    }

    fn begin_element(&mut self, _: Option<&PathCache>) -> Result<(), Error> {
        self.push_state();
        self.path = tiny_skia::PathBuilder::new();
        Ok(())
    }

    fn end_element(&mut self) -> Result<(), Error> {
        self.pop_state()
    }

    fn end_group(&mut self, _: f64) -> Result<(), Error> {
        self.pop_state()
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<(), Error> {
        self.path.move_to(x as f32, y as f32);
        Ok(())
    }

    fn line_to(&mut self, x: f64, y: f64) -> Result<(), Error> {
        self.path.line_to(x as f32, y as f32);
        Ok(())
    }

    fn curve_to(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x: f64,
        y: f64,
    ) -> Result<(), Error> {
        self.path.cubic_to(
            x1 as f32, y1 as f32, x2 as f32, y2 as f32, x as f32, y as f32,
        );
        Ok(())
    }

    fn quadratic_curve_to(&mut self, x1: f64, y1: f64, x: f64, y: f64) -> Result<(), Error> {
        self.path.quad_to(x1 as f32, y1 as f32, x as f32, y as f32);
        Ok(())
    }

    fn arc_to(
        &mut self,
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep: bool,
        x: f64,
        y: f64,
    ) -> Result<(), Error> {
        self.path.arc_to(
            rx as f32,
            ry as f32,
            x_axis_rotation as f32,
            large_arc,
            sweep,
            x as f32,
            y as f32,
        );
        Ok(())
    }

    fn close_path(&mut self) -> Result<(), Error> {
        self.path.close();
        Ok(())
    }

    fn set_color(&mut self, color: Color) -> Result<(), Error> {
        self.state_mut().color = color;
        Ok(())
    }

    fn set_fill_opacity(&mut self, opacity: f64) -> Result<(), Error> {
        self.state_mut().fill_opacity = opacity;
        Ok(())
    }

    fn set_fill_paint(&mut self, paint: PaintRef) -> Result<(), Error> {
        self.set_paint(paint, true);
        Ok(())
    }

    fn set_fill_rule(&mut self, rule: FillRule) -> Result<(), Error> {
        self.state_mut().fill_rule = match rule {
            FillRule::NonZero => tiny_skia::FillRule::Winding,
            FillRule::EvenOdd => tiny_skia::FillRule::EvenOdd,
        };
        Ok(())
    }

    fn set_font_family(&mut self, _: &str) -> Result<(), Error> {
        Ok(())
    }

    fn set_font_size(&mut self, size: Length) -> Result<(), Error> {
        let size = size.to_px(&self.units());
        if size > 0.0 {
            self.state_mut().font_size = size;
        }
        Ok(())
    }

    fn set_font_style(&mut self, _: FontStyle) -> Result<(), Error> {
        Ok(())
    }

    fn set_font_weight(&mut self, _: u16) -> Result<(), Error> {
        Ok(())
    }

    fn set_opacity(&mut self, opacity: f64) -> Result<(), Error> {
        self.state_mut().opacity = opacity;
        Ok(())
    }

    fn set_stroke_dash_array(&mut self, dashes: &[Length]) -> Result<(), Error> {
        self.state_mut().dashes = dashes.to_vec();
        Ok(())
    }

    fn set_stroke_dash_offset(&mut self, offset: Length) -> Result<(), Error> {
        self.state_mut().dash_offset = offset;
        Ok(())
    }

    fn set_stroke_line_cap(&mut self, cap: LineCap) -> Result<(), Error> {
        self.state_mut().line_cap = match cap {
            LineCap::Butt => tiny_skia::LineCap::Butt,
            LineCap::Round => tiny_skia::LineCap::Round,
            LineCap::Square => tiny_skia::LineCap::Square,
        };
        Ok(())
    }

    fn set_stroke_line_join(&mut self, join: LineJoin) -> Result<(), Error> {
        self.state_mut().line_join = match join {
            LineJoin::Miter => tiny_skia::LineJoin::Miter,
            LineJoin::Round => tiny_skia::LineJoin::Round,
            LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
        };
        Ok(())
    }

    fn set_stroke_miter_limit(&mut self, limit: f64) -> Result<(), Error> {
        self.state_mut().miter_limit = limit;
        Ok(())
    }

    fn set_stroke_opacity(&mut self, opacity: f64) -> Result<(), Error> {
        self.state_mut().stroke_opacity = opacity;
        Ok(())
    }

    fn set_stroke_paint(&mut self, paint: PaintRef) -> Result<(), Error> {
        self.set_paint(paint, false);
        Ok(())
    }

    fn set_stroke_width(&mut self, width: Length) -> Result<(), Error> {
        self.state_mut().stroke_width = width;
        Ok(())
    }

    fn set_text_anchor(&mut self, anchor: TextAnchor) -> Result<(), Error> {
        self.state_mut().text_anchor = anchor;
        Ok(())
    }

    fn set_filter(&mut self, id: &str) -> Result<(), Error> {
        // A parent filter is already applied to the whole subtree.
        if id == "inherit" {
            return Ok(());
        }

        let primitives: Rc<[filter::Primitive]> = match self.filters.get(id) {
            Some(v) => Rc::from(v.as_slice()),
            None => {
                log::warn!("Filter '{}' was not defined. Skipped.", id);
                return Ok(());
            }
        };

        if !self.state().layer {
            self.push_layer()?;
        }

        let state = self.state_mut();
        state.filter = Some((primitives, state.transform));
        Ok(())
    }

    fn begin_filter(&mut self, id: &str) -> Result<(), Error> {
        self.filters.insert(id.to_string(), Vec::new());
        self.current_filter = Some(id.to_string());
        Ok(())
    }

    fn add_filter_fe_blend(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        input2: FilterInput,
        mode: BlendMode,
    ) -> Result<(), Error> {
        self.add_primitive(region, input, filter::Kind::Blend { input2, mode })
    }

    fn add_filter_fe_composite(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        input2: FilterInput,
        operator: CompositeOperator,
    ) -> Result<(), Error> {
        self.add_primitive(region, input, filter::Kind::Composite { input2, operator })
    }

    fn add_filter_fe_flood(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        color: Color,
        opacity: f64,
    ) -> Result<(), Error> {
        self.add_primitive(region, input, filter::Kind::Flood { color, opacity })
    }

    fn add_filter_fe_gaussian_blur(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        std_dev_x: f64,
        std_dev_y: f64,
    ) -> Result<(), Error> {
        self.add_primitive(
            region,
            input,
            filter::Kind::GaussianBlur {
                std_dev_x,
                std_dev_y,
            },
        )
    }

    fn add_filter_fe_offset(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        dx: f64,
        dy: f64,
    ) -> Result<(), Error> {
        self.add_primitive(region, input, filter::Kind::Offset { dx, dy })
    }

    fn begin_pattern(&mut self, pattern: &Pattern) -> Result<(), Error> {
        let parent_ts = self.state().transform;
        let (vw, vh) = self.state().viewport;

        let p_ts = pattern.transform;
        let pattern_ts = tiny_skia::Transform::from_row(
            p_ts.a as f32,
            p_ts.b as f32,
            p_ts.c as f32,
            p_ts.d as f32,
            p_ts.e as f32,
            p_ts.f as f32,
        );

        // The painted element is not known yet, so bounding box units
        // are resolved against the current viewport.
        let (x, y, width, height) = if pattern.units == Units::ObjectBoundingBox {
            let units = UnitContext {
                object_units: true,
                ..self.units()
            };
            let f = |l: Length| l.to_px(&units) as f32;
            (
                f(pattern.x) * vw as f32,
                f(pattern.y) * vh as f32,
                f(pattern.width) * vw as f32,
                f(pattern.height) * vh as f32,
            )
        } else {
            (
                self.px(pattern.x),
                self.px(pattern.y),
                self.px(pattern.width),
                self.px(pattern.height),
            )
        };

        let (sx, sy) = parent_ts.pre_concat(pattern_ts).get_scale();
        let tile_width = (width * sx).round();
        let tile_height = (height * sy).round();

        self.push_state();

        let pixmap = if tile_width >= 1.0 && tile_height >= 1.0 {
            tiny_skia::Pixmap::new(tile_width as u32, tile_height as u32)
        } else {
            None
        };

        let valid = pixmap.is_some();
        let pixmap = match pixmap {
            Some(v) => v,
            None => {
                log::warn!("Pattern has an invalid size. Skipped.");
                tiny_skia::Pixmap::new(1, 1).ok_or(Error::NoMemory)?
            }
        };
        self.canvases.push(pixmap);

        let mut content_ts = tiny_skia::Transform::from_scale(sx, sy);
        let mut viewport = (width as f64, height as f64);
        if let Some(ref vb) = pattern.view_box {
            let fit = svgscene::view_box_transform(vb, width as f64, height as f64);
            content_ts = content_ts.pre_concat(to_skia_transform(&fit.to_transform()));
            viewport = (vb.width, vb.height);
        } else if pattern.content_units == Units::ObjectBoundingBox {
            content_ts = content_ts.pre_scale(vw as f32, vh as f32);
        }

        let tile_ts = pattern_ts
            .pre_translate(x, y)
            .pre_scale(1.0 / sx, 1.0 / sy);

        let state = self.state_mut();
        state.layer = true;
        state.transform = content_ts;
        state.clip = None;
        state.viewport = viewport;
        state.tile = if valid { Some(tile_ts) } else { None };

        Ok(())
    }

    fn end_pattern(&mut self) -> Result<(), Error> {
        if self.states.len() < 2 {
            return Err(Error::InvalidCall);
        }

        let state = self.states.pop().ok_or(Error::InvalidCall)?;
        let pixmap = self.canvases.pop().ok_or(Error::InvalidCall)?;

        self.pattern = state.tile.map(|transform| Rc::new(PatternTile { pixmap, transform }));
        Ok(())
    }

    fn apply_clip_box(
        &mut self,
        x: Length,
        y: Length,
        width: Length,
        height: Length,
    ) -> Result<(), Error> {
        let rect = tiny_skia::Rect::from_xywh(
            self.px(x),
            self.px(y),
            self.px(width),
            self.px(height),
        );

        let (w, h) = {
            let canvas = self.current_canvas();
            (canvas.width(), canvas.height())
        };

        let mut pixmap = tiny_skia::Pixmap::new(w, h).ok_or(Error::NoMemory)?;
        if let Some(rect) = rect {
            let mut paint = tiny_skia::Paint::default();
            paint.set_color_rgba8(0, 0, 0, 255);
            paint.anti_alias = self.anti_alias;
            pixmap.fill_rect(rect, &paint, self.state().transform, None);
        }

        let mut mask = tiny_skia::Mask::from_pixmap(pixmap.as_ref(), tiny_skia::MaskType::Alpha);
        if let Some(ref prev) = self.state().clip {
            for (a, b) in mask.data_mut().iter_mut().zip(prev.data()) {
                *a = ((*a as u32 * *b as u32 + 127) / 255) as u8;
            }
        }

        self.state_mut().clip = Some(Rc::new(mask));
        Ok(())
    }

    fn transform(&mut self, ts: &svgscene::Transform) -> Result<(), Error> {
        let state = self.state_mut();
        state.transform = state.transform.pre_concat(to_skia_transform(ts));
        Ok(())
    }

    fn apply_view_box(&mut self, view_box: &ViewBox, width: Length, height: Length) -> Result<(), Error> {
        let width = self.px(width) as f64;
        let height = self.px(height) as f64;
        let fit = svgscene::view_box_transform(view_box, width, height);

        let state = self.state_mut();
        state.transform = state.transform.pre_concat(to_skia_transform(&fit.to_transform()));
        state.viewport = (view_box.width, view_box.height);
        Ok(())
    }

    fn set_viewport_dimension(&mut self, width: Length, height: Length) -> Result<(), Error> {
        let viewport = (self.px(width) as f64, self.px(height) as f64);
        self.state_mut().viewport = viewport;
        Ok(())
    }

    fn render_line(
        &mut self,
        x1: Length,
        y1: Length,
        x2: Length,
        y2: Length,
    ) -> Result<Option<BoundingBox>, Error> {
        let path = path::line_to_path(self.px(x1), self.px(y1), self.px(x2), self.px(y2));
        Ok(path.and_then(|p| self.draw_path(&p, false)))
    }

    fn render_path(
        &mut self,
        cache: Option<&mut Option<PathCache>>,
    ) -> Result<Option<BoundingBox>, Error> {
        let builder = std::mem::replace(&mut self.path, tiny_skia::PathBuilder::new());

        match cache {
            Some(slot) => {
                if slot.is_none() {
                    let path = match builder.finish() {
                        Some(v) => v,
                        None => return Ok(None),
                    };
                    *slot = Some(PathCache::new(path));
                }

                let path = slot
                    .as_ref()
                    .and_then(|c| c.downcast_ref::<tiny_skia::Path>())
                    .cloned()
                    .ok_or(Error::InvalidCall)?;
                Ok(self.draw_path(&path, true))
            }
            None => match builder.finish() {
                Some(path) => Ok(self.draw_path(&path, true)),
                None => Ok(None),
            },
        }
    }

    fn free_path_cache(&mut self, cache: PathCache) -> Result<(), Error> {
        match cache.downcast::<tiny_skia::Path>() {
            Ok(_) => Ok(()),
            Err(_) => Err(Error::InvalidCall),
        }
    }

    fn render_ellipse(
        &mut self,
        cx: Length,
        cy: Length,
        rx: Length,
        ry: Length,
    ) -> Result<Option<BoundingBox>, Error> {
        let path = path::ellipse_to_path(self.px(cx), self.px(cy), self.px(rx), self.px(ry));
        Ok(path.and_then(|p| self.draw_path(&p, true)))
    }

    fn render_rect(
        &mut self,
        x: Length,
        y: Length,
        width: Length,
        height: Length,
        rx: Length,
        ry: Length,
    ) -> Result<Option<BoundingBox>, Error> {
        let path = path::rect_to_path(
            self.px(x),
            self.px(y),
            self.px(width),
            self.px(height),
            self.px(rx),
            self.px(ry),
        );
        Ok(path.and_then(|p| self.draw_path(&p, true)))
    }

    fn render_text(
        &mut self,
        x: Length,
        y: Length,
        text: &str,
    ) -> Result<Option<BoundingBox>, Error> {
        if !self.text_reported {
            log::debug!("Text rendering is not supported. Only a bounding box is estimated.");
            self.text_reported = true;
        }

        let font_size = self.state().font_size as f32;
        let width = text.chars().count() as f32 * font_size * 0.5;
        let x = self.px(x);
        let y = self.px(y);

        let left = match self.state().text_anchor {
            TextAnchor::Start => x,
            TextAnchor::Middle => x - width / 2.0,
            TextAnchor::End => x - width,
        };

        let rect = tiny_skia::Rect::from_xywh(left, y - font_size, width, font_size);
        Ok(rect.and_then(|r| device_bbox(r, self.state().transform)))
    }

    fn render_image(
        &mut self,
        image: &RasterImage,
        x: Length,
        y: Length,
        width: Length,
        height: Length,
    ) -> Result<Option<BoundingBox>, Error> {
        let rect = match tiny_skia::Rect::from_xywh(
            self.px(x),
            self.px(y),
            self.px(width),
            self.px(height),
        ) {
            Some(v) if v.width() > 0.0 && v.height() > 0.0 => v,
            _ => return Ok(None),
        };

        let pixmap = match image_to_pixmap(image) {
            Some(v) => v,
            None => return Ok(None),
        };

        let ts = tiny_skia::Transform::from_row(
            rect.width() / pixmap.width() as f32,
            0.0,
            0.0,
            rect.height() / pixmap.height() as f32,
            rect.x(),
            rect.y(),
        );

        let opacity = self.state().opacity as f32;
        let paint = tiny_skia::Paint {
            shader: tiny_skia::Pattern::new(
                pixmap.as_ref(),
                tiny_skia::SpreadMode::Pad,
                tiny_skia::FilterQuality::Bicubic,
                opacity,
                ts,
            ),
            anti_alias: self.anti_alias,
            ..tiny_skia::Paint::default()
        };

        let idx = self.states.len() - 1;
        let state = &self.states[idx];
        let canvas_idx = self.canvases.len() - 1;
        self.canvases[canvas_idx].fill_rect(rect, &paint, state.transform, state.clip.as_deref());

        Ok(device_bbox(rect, state.transform))
    }
}

fn to_skia_transform(ts: &svgscene::Transform) -> tiny_skia::Transform {
    tiny_skia::Transform::from_row(
        ts.a as f32,
        ts.b as f32,
        ts.c as f32,
        ts.d as f32,
        ts.e as f32,
        ts.f as f32,
    )
}

/// Maps a user space rectangle onto the canvas.
fn device_bbox(rect: tiny_skia::Rect, ts: tiny_skia::Transform) -> Option<BoundingBox> {
    let mut points = [
        tiny_skia::Point::from_xy(rect.left(), rect.top()),
        tiny_skia::Point::from_xy(rect.right(), rect.top()),
        tiny_skia::Point::from_xy(rect.right(), rect.bottom()),
        tiny_skia::Point::from_xy(rect.left(), rect.bottom()),
    ];
    ts.map_points(&mut points);

    let mut bbox = BoundingBox::EMPTY;
    for p in &points {
        let point = BoundingBox::from_ltrb(p.x as f64, p.y as f64, p.x as f64, p.y as f64);
        bbox = bbox.union(&point);
    }

    bbox.non_empty()
}

fn image_to_pixmap(image: &RasterImage) -> Option<tiny_skia::Pixmap> {
    if image.pixels.len() != (image.width as usize) * (image.height as usize) {
        log::warn!("Image data doesn't match its size. Skipped.");
        return None;
    }

    let mut pixmap = tiny_skia::Pixmap::new(image.width, image.height)?;
    for (p, c) in pixmap.pixels_mut().iter_mut().zip(&image.pixels) {
        *p = tiny_skia::ColorU8::from_rgba(c.r, c.g, c.b, c.a).premultiply();
    }

    Some(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_bbox_rotated() {
        let rect = tiny_skia::Rect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap();
        let ts = tiny_skia::Transform::from_rotate(45.0);
        let bbox = device_bbox(rect, ts).unwrap();
        assert!((bbox.width() - 14.142).abs() < 0.01);
        assert!((bbox.left + 7.071).abs() < 0.01);
    }

    #[test]
    fn unbalanced_end() {
        let mut engine = SkiaEngine::new(10, 10, tiny_skia::Transform::identity()).unwrap();
        assert!(engine.end_group(1.0).is_err());
        assert!(engine.end_element().is_err());
    }

    #[test]
    fn zero_sized_canvas() {
        assert!(SkiaEngine::new(0, 10, tiny_skia::Transform::identity()).is_err());
    }

    #[test]
    fn image_size_mismatch() {
        let image = RasterImage {
            width: 2,
            height: 2,
            pixels: vec![rgb::RGBA8::new(0, 0, 0, 255); 3],
        };
        assert!(image_to_pixmap(&image).is_none());
    }
}
