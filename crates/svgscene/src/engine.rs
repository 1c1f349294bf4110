// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A render engine interface.
//!
//! The walker drives an engine through a strict push/pop protocol:
//! each displayed element produces exactly one `begin_group`/`end_group`
//! or `begin_element`/`end_element` pair, with geometry, style and drawing
//! calls in between. An engine is expected to keep a state stack,
//! inheriting the parent state on each begin and discarding it on end.

use std::any::Any;

use svgtypes::{Color, Transform};

use crate::filter::{BlendMode, CompositeOperator, FilterInput, PrimitiveRegion};
use crate::geom::{BoundingBox, ViewBox};
use crate::image::RasterImage;
use crate::style::{FillRule, FontStyle, LineCap, LineJoin, TextAnchor};
use crate::tree::{Gradient, Pattern};
use crate::units::Length;
use crate::Error;

/// An engine-owned path handle.
///
/// Created by an engine during `render_path` and handed back on subsequent
/// renders of the same element.
pub struct PathCache(Box<dyn Any>);

impl PathCache {
    /// Wraps an engine-specific value.
    pub fn new<T: Any>(value: T) -> Self {
        PathCache(Box::new(value))
    }

    /// Returns a reference to the wrapped value if it has the type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Unwraps the value if it has the type `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        match self.0.downcast() {
            Ok(v) => Ok(*v),
            Err(v) => Err(PathCache(v)),
        }
    }
}

impl std::fmt::Debug for PathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("PathCache(..)")
    }
}

/// A resolved paint.
#[derive(Clone, Copy, Debug)]
pub enum PaintRef<'a> {
    /// No paint.
    None,
    /// A solid color.
    Color(Color),
    /// An engine must use the current inherited `color`.
    CurrentColor,
    /// A gradient paint server.
    ///
    /// Units, spread and transforms must be resolved by an engine
    /// against the current path bounds.
    Gradient(&'a Gradient),
    /// A pattern paint server.
    ///
    /// The pattern content was just emitted between `begin_pattern`
    /// and `end_pattern`.
    Pattern(&'a Pattern),
}

/// A drawing backend.
///
/// Geometry arguments are passed in user units. Drawing calls return
/// a bounding box of the drawn shape in device coordinates.
#[allow(clippy::too_many_arguments)]
pub trait RenderEngine {
    /// Starts a group with the specified opacity.
    fn begin_group(&mut self, opacity: f64) -> Result<(), Error>;

    /// Starts a non-group element.
    ///
    /// `path_cache` is set only for cached paths.
    fn begin_element(&mut self, path_cache: Option<&PathCache>) -> Result<(), Error>;

    /// Finishes a non-group element.
    fn end_element(&mut self) -> Result<(), Error>;

    /// Finishes a group.
    ///
    /// `opacity` is the same value that was passed to `begin_group`.
    fn end_group(&mut self, opacity: f64) -> Result<(), Error>;

    /// Starts a new subpath.
    fn move_to(&mut self, x: f64, y: f64) -> Result<(), Error>;

    /// Adds a line segment.
    fn line_to(&mut self, x: f64, y: f64) -> Result<(), Error>;

    /// Adds a cubic Bézier segment.
    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64)
        -> Result<(), Error>;

    /// Adds a quadratic Bézier segment.
    fn quadratic_curve_to(&mut self, x1: f64, y1: f64, x: f64, y: f64) -> Result<(), Error>;

    /// Adds an elliptical arc segment.
    fn arc_to(
        &mut self,
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep: bool,
        x: f64,
        y: f64,
    ) -> Result<(), Error>;

    /// Closes the current subpath.
    fn close_path(&mut self) -> Result<(), Error>;

    /// Releases a path cache.
    fn free_path_cache(&mut self, cache: PathCache) -> Result<(), Error> {
        drop(cache);
        Ok(())
    }

    /// Sets the current color.
    fn set_color(&mut self, color: Color) -> Result<(), Error>;

    /// Sets the fill opacity.
    fn set_fill_opacity(&mut self, opacity: f64) -> Result<(), Error>;

    /// Sets the fill paint.
    fn set_fill_paint(&mut self, paint: PaintRef) -> Result<(), Error>;

    /// Sets the fill rule.
    fn set_fill_rule(&mut self, rule: FillRule) -> Result<(), Error>;

    /// Sets the font family.
    fn set_font_family(&mut self, family: &str) -> Result<(), Error>;

    /// Sets the font size.
    fn set_font_size(&mut self, size: Length) -> Result<(), Error>;

    /// Sets the font style.
    fn set_font_style(&mut self, style: FontStyle) -> Result<(), Error>;

    /// Sets the font weight.
    fn set_font_weight(&mut self, weight: u16) -> Result<(), Error>;

    /// Sets the element opacity.
    fn set_opacity(&mut self, opacity: f64) -> Result<(), Error>;

    /// Sets the dash array.
    ///
    /// An empty array disables dashing.
    fn set_stroke_dash_array(&mut self, dashes: &[Length]) -> Result<(), Error>;

    /// Sets the dash offset.
    fn set_stroke_dash_offset(&mut self, offset: Length) -> Result<(), Error>;

    /// Sets the stroke line cap.
    fn set_stroke_line_cap(&mut self, cap: LineCap) -> Result<(), Error>;

    /// Sets the stroke line join.
    fn set_stroke_line_join(&mut self, join: LineJoin) -> Result<(), Error>;

    /// Sets the stroke miter limit.
    fn set_stroke_miter_limit(&mut self, limit: f64) -> Result<(), Error>;

    /// Sets the stroke opacity.
    fn set_stroke_opacity(&mut self, opacity: f64) -> Result<(), Error>;

    /// Sets the stroke paint.
    fn set_stroke_paint(&mut self, paint: PaintRef) -> Result<(), Error>;

    /// Sets the stroke width.
    fn set_stroke_width(&mut self, width: Length) -> Result<(), Error>;

    /// Sets the text anchor.
    fn set_text_anchor(&mut self, anchor: TextAnchor) -> Result<(), Error>;

    /// Applies a filter to the current element.
    ///
    /// `id` is either a filter element ID, which graph was emitted earlier,
    /// or `inherit`.
    fn set_filter(&mut self, id: &str) -> Result<(), Error>;

    /// Starts a new filter graph.
    fn begin_filter(&mut self, id: &str) -> Result<(), Error>;

    /// Adds an `feBlend` primitive.
    fn add_filter_fe_blend(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        input2: FilterInput,
        mode: BlendMode,
    ) -> Result<(), Error>;

    /// Adds an `feComposite` primitive.
    fn add_filter_fe_composite(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        input2: FilterInput,
        operator: CompositeOperator,
    ) -> Result<(), Error>;

    /// Adds an `feFlood` primitive.
    fn add_filter_fe_flood(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        color: Color,
        opacity: f64,
    ) -> Result<(), Error>;

    /// Adds an `feGaussianBlur` primitive.
    fn add_filter_fe_gaussian_blur(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        std_dev_x: f64,
        std_dev_y: f64,
    ) -> Result<(), Error>;

    /// Adds an `feOffset` primitive.
    fn add_filter_fe_offset(
        &mut self,
        region: &PrimitiveRegion,
        input: FilterInput,
        dx: f64,
        dy: f64,
    ) -> Result<(), Error>;

    /// Starts a pattern tile rendering.
    ///
    /// All elements up to `end_pattern` are the pattern content.
    fn begin_pattern(&mut self, pattern: &Pattern) -> Result<(), Error> {
        let _ = pattern;
        Ok(())
    }

    /// Finishes a pattern tile rendering.
    fn end_pattern(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Clips the current state to a rectangle.
    fn apply_clip_box(&mut self, x: Length, y: Length, width: Length, height: Length)
        -> Result<(), Error>;

    /// Multiplies the current transform by the specified one.
    fn transform(&mut self, ts: &Transform) -> Result<(), Error>;

    /// Fits a view box into a viewport of the specified size.
    ///
    /// See [`view_box_transform`](crate::geom::view_box_transform).
    fn apply_view_box(&mut self, view_box: &ViewBox, width: Length, height: Length)
        -> Result<(), Error>;

    /// Sets the current viewport size.
    ///
    /// Used to resolve percentages.
    fn set_viewport_dimension(&mut self, width: Length, height: Length) -> Result<(), Error>;

    /// Draws a line.
    fn render_line(&mut self, x1: Length, y1: Length, x2: Length, y2: Length)
        -> Result<Option<BoundingBox>, Error>;

    /// Draws the current path.
    ///
    /// When `cache` is set, path caching is enabled. A `None` cache must be
    /// filled by the engine, while a `Some` one means that no path commands
    /// were emitted and the cached path must be drawn.
    fn render_path(
        &mut self,
        cache: Option<&mut Option<PathCache>>,
    ) -> Result<Option<BoundingBox>, Error>;

    /// Draws an ellipse.
    fn render_ellipse(&mut self, cx: Length, cy: Length, rx: Length, ry: Length)
        -> Result<Option<BoundingBox>, Error>;

    /// Draws a rectangle.
    fn render_rect(
        &mut self,
        x: Length,
        y: Length,
        width: Length,
        height: Length,
        rx: Length,
        ry: Length,
    ) -> Result<Option<BoundingBox>, Error>;

    /// Draws a text run.
    fn render_text(&mut self, x: Length, y: Length, text: &str)
        -> Result<Option<BoundingBox>, Error>;

    /// Draws a raster image.
    fn render_image(
        &mut self,
        image: &RasterImage,
        x: Length,
        y: Length,
        width: Length,
        height: Length,
    ) -> Result<Option<BoundingBox>, Error>;
}
