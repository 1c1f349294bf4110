// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use svgscene::filter::{BlendMode, CompositeOperator, FilterInput, PrimitiveRegion};
use svgscene::style::{FillRule, FontStyle, LineCap, LineJoin, TextAnchor};
use svgscene::{
    BoundingBox, Color, Error, Length, PaintRef, PathCache, Pattern, RasterImage, RenderEngine,
    Transform, ViewBox,
};

/// An engine that records all calls as strings.
///
/// Drawing calls return boxes computed from raw length numbers,
/// transforms are ignored.
#[derive(Default)]
pub struct Recorder {
    pub calls: Vec<String>,
    pub fail_begin_group: bool,
    points: Vec<(f64, f64)>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn has(&self, call: &str) -> bool {
        self.calls.iter().any(|c| c == call)
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    /// Returns all `set_*` calls.
    pub fn style_calls(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|c| c.starts_with("set_"))
            .map(|c| c.as_str())
            .collect()
    }

    fn push(&mut self, call: String) -> Result<(), Error> {
        self.calls.push(call);
        Ok(())
    }

    fn point(&mut self, call: String, x: f64, y: f64) -> Result<(), Error> {
        self.points.push((x, y));
        self.push(call)
    }
}

fn paint(paint: PaintRef) -> String {
    match paint {
        PaintRef::None => "none".to_string(),
        PaintRef::Color(c) => format!("rgb({},{},{})", c.red, c.green, c.blue),
        PaintRef::CurrentColor => "currentColor".to_string(),
        PaintRef::Gradient(_) => "gradient".to_string(),
        PaintRef::Pattern(_) => "pattern".to_string(),
    }
}

fn input(input: FilterInput) -> String {
    match input {
        FilterInput::SourceGraphic => "SourceGraphic".to_string(),
        FilterInput::SourceAlpha => "SourceAlpha".to_string(),
        FilterInput::BackgroundImage => "BackgroundImage".to_string(),
        FilterInput::BackgroundAlpha => "BackgroundAlpha".to_string(),
        FilterInput::FillPaint => "FillPaint".to_string(),
        FilterInput::StrokePaint => "StrokePaint".to_string(),
        FilterInput::Reference(idx) => format!("{}", idx),
    }
}

impl RenderEngine for Recorder {
    fn begin_group(&mut self, opacity: f64) -> Result<(), Error> {
        self.calls.push(format!("begin_group({})", opacity));
        if self.fail_begin_group {
            return Err(Error::InvalidCall);
        }

        Ok(())
    }

    fn begin_element(&mut self, path_cache: Option<&PathCache>) -> Result<(), Error> {
        let cached = if path_cache.is_some() { "cached" } else { "" };
        self.push(format!("begin_element({})", cached))
    }

    fn end_element(&mut self) -> Result<(), Error> {
        self.push("end_element".to_string())
    }

    fn end_group(&mut self, opacity: f64) -> Result<(), Error> {
        self.push(format!("end_group({})", opacity))
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<(), Error> {
        self.point(format!("M {} {}", x, y), x, y)
    }

    fn line_to(&mut self, x: f64, y: f64) -> Result<(), Error> {
        self.point(format!("L {} {}", x, y), x, y)
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
        self.point(format!("C {} {} {} {} {} {}", x1, y1, x2, y2, x, y), x, y)
    }

    fn quadratic_curve_to(&mut self, x1: f64, y1: f64, x: f64, y: f64) -> Result<(), Error> {
        self.point(format!("Q {} {} {} {}", x1, y1, x, y), x, y)
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
        let call = format!(
            "A {} {} {} {} {} {} {}",
            rx, ry, x_axis_rotation, large_arc as u8, sweep as u8, x, y
        );
        self.point(call, x, y)
    }

    fn close_path(&mut self) -> Result<(), Error> {
        self.push("Z".to_string())
    }

    fn free_path_cache(&mut self, _: PathCache) -> Result<(), Error> {
        self.push("free_path_cache".to_string())
    }

    fn set_color(&mut self, color: Color) -> Result<(), Error> {
        self.push(format!("set_color({})", paint(PaintRef::Color(color))))
    }

    fn set_fill_opacity(&mut self, opacity: f64) -> Result<(), Error> {
        self.push(format!("set_fill_opacity({})", opacity))
    }

    fn set_fill_paint(&mut self, p: PaintRef) -> Result<(), Error> {
        self.push(format!("set_fill_paint({})", paint(p)))
    }

    fn set_fill_rule(&mut self, rule: FillRule) -> Result<(), Error> {
        self.push(format!("set_fill_rule({:?})", rule))
    }

    fn set_font_family(&mut self, family: &str) -> Result<(), Error> {
        self.push(format!("set_font_family({})", family))
    }

    fn set_font_size(&mut self, size: Length) -> Result<(), Error> {
        self.push(format!("set_font_size({})", size.number))
    }

    fn set_font_style(&mut self, style: FontStyle) -> Result<(), Error> {
        self.push(format!("set_font_style({:?})", style))
    }

    fn set_font_weight(&mut self, weight: u16) -> Result<(), Error> {
        self.push(format!("set_font_weight({})", weight))
    }

    fn set_opacity(&mut self, opacity: f64) -> Result<(), Error> {
        self.push(format!("set_opacity({})", opacity))
    }

    fn set_stroke_dash_array(&mut self, dashes: &[Length]) -> Result<(), Error> {
        let list: Vec<String> = dashes.iter().map(|l| l.number.to_string()).collect();
        self.push(format!("set_stroke_dash_array({})", list.join(",")))
    }

    fn set_stroke_dash_offset(&mut self, offset: Length) -> Result<(), Error> {
        self.push(format!("set_stroke_dash_offset({})", offset.number))
    }

    fn set_stroke_line_cap(&mut self, cap: LineCap) -> Result<(), Error> {
        self.push(format!("set_stroke_line_cap({:?})", cap))
    }

    fn set_stroke_line_join(&mut self, join: LineJoin) -> Result<(), Error> {
        self.push(format!("set_stroke_line_join({:?})", join))
    }

    fn set_stroke_miter_limit(&mut self, limit: f64) -> Result<(), Error> {
        self.push(format!("set_stroke_miter_limit({})", limit))
    }

    fn set_stroke_opacity(&mut self, opacity: f64) -> Result<(), Error> {
        self.push(format!("set_stroke_opacity({})", opacity))
    }

    fn set_stroke_paint(&mut self, p: PaintRef) -> Result<(), Error> {
        self.push(format!("set_stroke_paint({})", paint(p)))
    }

    fn set_stroke_width(&mut self, width: Length) -> Result<(), Error> {
        self.push(format!("set_stroke_width({})", width.number))
    }

    fn set_text_anchor(&mut self, anchor: TextAnchor) -> Result<(), Error> {
        self.push(format!("set_text_anchor({:?})", anchor))
    }

    fn set_filter(&mut self, id: &str) -> Result<(), Error> {
        self.push(format!("set_filter({})", id))
    }

    fn begin_filter(&mut self, id: &str) -> Result<(), Error> {
        self.push(format!("begin_filter({})", id))
    }

    fn add_filter_fe_blend(
        &mut self,
        region: &PrimitiveRegion,
        in1: FilterInput,
        in2: FilterInput,
        mode: BlendMode,
    ) -> Result<(), Error> {
        let call = format!("feBlend#{}({},{},{:?})", region.index, input(in1), input(in2), mode);
        self.push(call)
    }

    fn add_filter_fe_composite(
        &mut self,
        region: &PrimitiveRegion,
        in1: FilterInput,
        in2: FilterInput,
        operator: CompositeOperator,
    ) -> Result<(), Error> {
        let call = format!(
            "feComposite#{}({},{},{:?})",
            region.index,
            input(in1),
            input(in2),
            operator
        );
        self.push(call)
    }

    fn add_filter_fe_flood(
        &mut self,
        region: &PrimitiveRegion,
        in1: FilterInput,
        color: Color,
        opacity: f64,
    ) -> Result<(), Error> {
        let call = format!(
            "feFlood#{}({},{},{})",
            region.index,
            input(in1),
            paint(PaintRef::Color(color)),
            opacity
        );
        self.push(call)
    }

    fn add_filter_fe_gaussian_blur(
        &mut self,
        region: &PrimitiveRegion,
        in1: FilterInput,
        std_dev_x: f64,
        std_dev_y: f64,
    ) -> Result<(), Error> {
        let call = format!(
            "feGaussianBlur#{}({},{},{})",
            region.index,
            input(in1),
            std_dev_x,
            std_dev_y
        );
        self.push(call)
    }

    fn add_filter_fe_offset(
        &mut self,
        region: &PrimitiveRegion,
        in1: FilterInput,
        dx: f64,
        dy: f64,
    ) -> Result<(), Error> {
        let call = format!("feOffset#{}({},{},{})", region.index, input(in1), dx, dy);
        self.push(call)
    }

    fn begin_pattern(&mut self, _: &Pattern) -> Result<(), Error> {
        self.push("begin_pattern".to_string())
    }

    fn end_pattern(&mut self) -> Result<(), Error> {
        self.push("end_pattern".to_string())
    }

    fn apply_clip_box(
        &mut self,
        x: Length,
        y: Length,
        width: Length,
        height: Length,
    ) -> Result<(), Error> {
        let call = format!(
            "apply_clip_box({},{},{},{})",
            x.number, y.number, width.number, height.number
        );
        self.push(call)
    }

    fn transform(&mut self, ts: &Transform) -> Result<(), Error> {
        let call = format!(
            "transform({},{},{},{},{},{})",
            ts.a, ts.b, ts.c, ts.d, ts.e, ts.f
        );
        self.push(call)
    }

    fn apply_view_box(
        &mut self,
        view_box: &ViewBox,
        width: Length,
        height: Length,
    ) -> Result<(), Error> {
        let call = format!(
            "apply_view_box({},{},{},{},{},{})",
            view_box.x, view_box.y, view_box.width, view_box.height, width.number, height.number
        );
        self.push(call)
    }

    fn set_viewport_dimension(&mut self, width: Length, height: Length) -> Result<(), Error> {
        self.push(format!("set_viewport_dimension({},{})", width.number, height.number))
    }

    fn render_line(
        &mut self,
        x1: Length,
        y1: Length,
        x2: Length,
        y2: Length,
    ) -> Result<Option<BoundingBox>, Error> {
        self.calls.push("render_line".to_string());
        Ok(BoundingBox::from_ltrb(
            x1.number.min(x2.number),
            y1.number.min(y2.number),
            x1.number.max(x2.number),
            y1.number.max(y2.number),
        )
        .non_empty())
    }

    fn render_path(
        &mut self,
        cache: Option<&mut Option<PathCache>>,
    ) -> Result<Option<BoundingBox>, Error> {
        let mut bbox = BoundingBox::default();
        for (x, y) in self.points.drain(..) {
            bbox = bbox.union(&BoundingBox::from_ltrb(x, y, x, y));
        }

        match cache {
            Some(slot) => match slot {
                Some(cached) => {
                    self.calls.push("render_path(cached)".to_string());
                    Ok(cached.downcast_ref::<BoundingBox>().copied())
                }
                None => {
                    self.calls.push("render_path(new)".to_string());
                    *slot = Some(PathCache::new(bbox));
                    Ok(bbox.non_empty())
                }
            },
            None => {
                self.calls.push("render_path".to_string());
                Ok(bbox.non_empty())
            }
        }
    }

    fn render_ellipse(
        &mut self,
        cx: Length,
        cy: Length,
        rx: Length,
        ry: Length,
    ) -> Result<Option<BoundingBox>, Error> {
        self.calls.push(format!(
            "render_ellipse({},{},{},{})",
            cx.number, cy.number, rx.number, ry.number
        ));
        Ok(BoundingBox::from_ltrb(
            cx.number - rx.number,
            cy.number - ry.number,
            cx.number + rx.number,
            cy.number + ry.number,
        )
        .non_empty())
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
        self.calls.push(format!(
            "render_rect({},{},{},{},{},{})",
            x.number, y.number, width.number, height.number, rx.number, ry.number
        ));
        Ok(BoundingBox::from_xywh(x.number, y.number, width.number, height.number).non_empty())
    }

    fn render_text(
        &mut self,
        x: Length,
        y: Length,
        text: &str,
    ) -> Result<Option<BoundingBox>, Error> {
        self.calls.push(format!("render_text({},{},{})", x.number, y.number, text));
        Ok(None)
    }

    fn render_image(
        &mut self,
        image: &RasterImage,
        x: Length,
        y: Length,
        width: Length,
        height: Length,
    ) -> Result<Option<BoundingBox>, Error> {
        self.calls.push(format!("render_image({}x{})", image.width, image.height));
        Ok(BoundingBox::from_xywh(x.number, y.number, width.number, height.number).non_empty())
    }
}
