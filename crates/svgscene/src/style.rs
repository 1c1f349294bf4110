// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Presentation attributes.
//!
//! A style stores only properties that were explicitly set. Nothing is
//! inherited here: an engine state stack takes care of inheritance.

use std::str::FromStr;

use svgtypes::Color;

use crate::engine::PaintRef;
use crate::render::RenderContext;
use crate::tree::{ElementKind, NodeId};
use crate::units::{parse_length, parse_number, Length, LengthUnit, Orientation};
use crate::{Error, OptionLog, RenderEngine};

/// A set of explicitly specified style properties.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct StyleFlags(u32);

#[allow(missing_docs)]
impl StyleFlags {
    pub const COLOR: Self = StyleFlags(1 << 0);
    pub const DISPLAY: Self = StyleFlags(1 << 1);
    pub const FILL_OPACITY: Self = StyleFlags(1 << 2);
    pub const FILL: Self = StyleFlags(1 << 3);
    pub const FILL_RULE: Self = StyleFlags(1 << 4);
    pub const FILTER: Self = StyleFlags(1 << 5);
    pub const FONT_FAMILY: Self = StyleFlags(1 << 6);
    pub const FONT_SIZE: Self = StyleFlags(1 << 7);
    pub const FONT_STYLE: Self = StyleFlags(1 << 8);
    pub const FONT_WEIGHT: Self = StyleFlags(1 << 9);
    pub const IMAGE_RENDERING: Self = StyleFlags(1 << 10);
    pub const OPACITY: Self = StyleFlags(1 << 11);
    pub const STROKE_DASH_ARRAY: Self = StyleFlags(1 << 12);
    pub const STROKE_DASH_OFFSET: Self = StyleFlags(1 << 13);
    pub const STROKE_LINE_CAP: Self = StyleFlags(1 << 14);
    pub const STROKE_LINE_JOIN: Self = StyleFlags(1 << 15);
    pub const STROKE_MITER_LIMIT: Self = StyleFlags(1 << 16);
    pub const STROKE_OPACITY: Self = StyleFlags(1 << 17);
    pub const STROKE: Self = StyleFlags(1 << 18);
    pub const STROKE_WIDTH: Self = StyleFlags(1 << 19);
    pub const TEXT_ANCHOR: Self = StyleFlags(1 << 20);
    pub const VISIBILITY: Self = StyleFlags(1 << 21);
    pub const STOP_OPACITY: Self = StyleFlags(1 << 22);
    pub const STOP_COLOR: Self = StyleFlags(1 << 23);
}

impl StyleFlags {
    /// Returns an empty set.
    pub const fn empty() -> Self {
        StyleFlags(0)
    }

    /// Checks that all flags of `other` are set.
    #[inline]
    pub fn contains(&self, other: StyleFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets flags.
    #[inline]
    pub fn insert(&mut self, other: StyleFlags) {
        self.0 |= other.0;
    }

    /// Clears flags.
    #[inline]
    pub fn remove(&mut self, other: StyleFlags) {
        self.0 &= !other.0;
    }

    /// Returns raw bits.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for StyleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        StyleFlags(self.0 | rhs.0)
    }
}

/// A `fill-rule`.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

/// A `stroke-linecap`.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

/// A `stroke-linejoin`.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

/// A `font-style`.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FontStyle {
    Normal,
    Italic,
    Oblique,
}

/// A `text-anchor`.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// An `image-rendering`.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImageRendering {
    Auto,
    OptimizeSpeed,
    OptimizeQuality,
}

/// A paint server fallback.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PaintFallback {
    None,
    CurrentColor,
    Color(Color),
}

/// A `fill` or a `stroke` value.
#[derive(Clone, PartialEq, Debug)]
pub enum Paint {
    /// No paint.
    None,
    /// A solid color.
    Color(Color),
    /// An inherited `color`.
    CurrentColor,
    /// A reference to a paint server with an optional fallback.
    Server(String, Option<PaintFallback>),
}

/// An element style.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub struct Style {
    /// Explicitly set properties.
    pub flags: StyleFlags,
    pub color: Color,
    pub fill: Paint,
    pub fill_opacity: f64,
    pub fill_rule: FillRule,
    filter_link: Option<String>,
    filter_node: Option<NodeId>,
    pub font_family: String,
    pub font_size: Length,
    pub font_style: FontStyle,
    pub font_weight: u16,
    pub image_rendering: ImageRendering,
    pub opacity: f64,
    pub dash_array: Vec<Length>,
    pub dash_offset: Length,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    pub stroke: Paint,
    pub stroke_opacity: f64,
    pub stroke_width: Length,
    pub text_anchor: TextAnchor,
    pub stop_color: Color,
    pub stop_opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            // `opacity` is not inherited, so it is always set.
            flags: StyleFlags::OPACITY | StyleFlags::VISIBILITY | StyleFlags::DISPLAY,
            color: Color::black(),
            fill: Paint::Color(Color::black()),
            fill_opacity: 1.0,
            fill_rule: FillRule::NonZero,
            filter_link: None,
            filter_node: None,
            font_family: "sans-serif".to_string(),
            font_size: Length::new(10.0, LengthUnit::Px, Orientation::Other),
            font_style: FontStyle::Normal,
            font_weight: 400,
            image_rendering: ImageRendering::Auto,
            opacity: 1.0,
            dash_array: Vec::new(),
            dash_offset: Length::zero(Orientation::Other),
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            miter_limit: 4.0,
            stroke: Paint::None,
            stroke_opacity: 1.0,
            stroke_width: Length::new_number(1.0, Orientation::Other),
            text_anchor: TextAnchor::Start,
            stop_color: Color::new_rgb(255, 255, 255),
            stop_opacity: 1.0,
        }
    }
}

type ParseFn = fn(&mut Style, &str) -> Result<(), Error>;

struct Property {
    name: &'static str,
    parse: ParseFn,
    default: &'static str,
}

// Presentation attributes are applied in this order.
static PROPERTIES: &[Property] = &[
    Property { name: "color", parse: parse_color_prop, default: "black" },
    Property { name: "display", parse: parse_display, default: "inline" },
    Property { name: "fill-opacity", parse: parse_fill_opacity, default: "1" },
    Property { name: "fill", parse: parse_fill, default: "black" },
    Property { name: "fill-rule", parse: parse_fill_rule, default: "nonzero" },
    Property { name: "filter", parse: parse_filter, default: "none" },
    Property { name: "font-family", parse: parse_font_family, default: "sans-serif" },
    Property { name: "font-size", parse: parse_font_size, default: "10px" },
    Property { name: "font-style", parse: parse_font_style, default: "normal" },
    Property { name: "font-weight", parse: parse_font_weight, default: "normal" },
    Property { name: "image-rendering", parse: parse_image_rendering, default: "auto" },
    Property { name: "opacity", parse: parse_opacity_prop, default: "1" },
    Property { name: "stroke-dasharray", parse: parse_dash_array, default: "none" },
    Property { name: "stroke-dashoffset", parse: parse_dash_offset, default: "0" },
    Property { name: "stroke-linecap", parse: parse_line_cap, default: "butt" },
    Property { name: "stroke-linejoin", parse: parse_line_join, default: "miter" },
    Property { name: "stroke-miterlimit", parse: parse_miter_limit, default: "4" },
    Property { name: "stroke-opacity", parse: parse_stroke_opacity, default: "1" },
    Property { name: "stroke", parse: parse_stroke, default: "none" },
    Property { name: "stroke-width", parse: parse_stroke_width, default: "1" },
    Property { name: "text-anchor", parse: parse_text_anchor, default: "start" },
    Property { name: "visibility", parse: parse_visibility, default: "visible" },
    Property { name: "stop-opacity", parse: parse_stop_opacity, default: "1" },
    Property { name: "stop-color", parse: parse_stop_color, default: "#ffffff" },
];

impl Style {
    /// Checks that the element must be rendered.
    #[inline]
    pub fn is_displayed(&self) -> bool {
        self.flags.contains(StyleFlags::DISPLAY)
    }

    /// Checks that the element must be drawn.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.flags.contains(StyleFlags::VISIBILITY)
    }

    /// Returns the element opacity, or 1 when not set.
    pub fn group_opacity(&self) -> f64 {
        if self.flags.contains(StyleFlags::OPACITY) {
            self.opacity
        } else {
            1.0
        }
    }

    /// Checks that a filter is set.
    pub fn has_filter(&self) -> bool {
        self.flags.contains(StyleFlags::FILTER)
    }

    /// Returns the referenced filter ID.
    ///
    /// `None` with a set filter means `inherit`.
    pub fn filter_link(&self) -> Option<&str> {
        self.filter_link.as_deref()
    }

    /// Returns a resolved filter element.
    pub fn filter_node(&self) -> Option<NodeId> {
        self.filter_node
    }

    pub(crate) fn set_filter_node(&mut self, node: Option<NodeId>) {
        self.filter_node = node;
        if node.is_none() {
            self.flags.remove(StyleFlags::FILTER);
        }
    }

    /// Parses and applies a single property.
    ///
    /// Returns `false` for an unknown property. `inherit` is a no-op
    /// for all properties except `filter`. `initial` applies the property
    /// initial value.
    pub fn apply_property(&mut self, name: &str, value: &str) -> Result<bool, Error> {
        let prop = match PROPERTIES.iter().find(|p| p.name == name) {
            Some(v) => v,
            None => return Ok(false),
        };

        let value = match value.trim() {
            "initial" => prop.default,
            "inherit" if name != "filter" => return Ok(true),
            v => v,
        };

        (prop.parse)(self, value)?;
        Ok(true)
    }

    /// Applies a CSS declarations list, like a `style` attribute.
    ///
    /// Malformed declarations are logged and skipped.
    pub fn apply_style_text(&mut self, text: &str) {
        for declaration in simplecss::DeclarationTokenizer::from(text) {
            self.apply_declaration(declaration.name, declaration.value);
        }
    }

    pub(crate) fn apply_declaration(&mut self, name: &str, value: &str) {
        match self.apply_property(name, value) {
            Ok(true) => {}
            Ok(false) => log::debug!("Unsupported style property '{}'. Skipped.", name),
            Err(e) => log::warn!("Invalid '{}' style: {}. Skipped.", name, e),
        }
    }

    /// Applies presentation attributes.
    ///
    /// Unlike style declarations, any error is propagated.
    pub fn apply_attributes(&mut self, node: roxmltree::Node) -> Result<(), Error> {
        for prop in PROPERTIES {
            if let Some(value) = node.attribute(prop.name) {
                self.apply_property(prop.name, value)?;
            }
        }

        Ok(())
    }

    /// Emits all set properties into an engine.
    pub(crate) fn render(
        &self,
        ctx: &mut RenderContext,
        engine: &mut dyn RenderEngine,
    ) -> Result<(), Error> {
        let flags = self.flags;

        if flags.contains(StyleFlags::COLOR) {
            engine.set_color(self.color)?;
        }

        if flags.contains(StyleFlags::FILL_OPACITY) {
            engine.set_fill_opacity(self.fill_opacity)?;
        }

        if flags.contains(StyleFlags::FILL) {
            let paint = resolve_paint(&self.fill, ctx, engine)?;
            engine.set_fill_paint(paint)?;
        }

        if flags.contains(StyleFlags::FILL_RULE) {
            engine.set_fill_rule(self.fill_rule)?;
        }

        if flags.contains(StyleFlags::FONT_FAMILY) {
            engine.set_font_family(&self.font_family)?;
        }

        if flags.contains(StyleFlags::FONT_SIZE) {
            engine.set_font_size(self.font_size)?;
        }

        if flags.contains(StyleFlags::FONT_STYLE) {
            engine.set_font_style(self.font_style)?;
        }

        if flags.contains(StyleFlags::FONT_WEIGHT) {
            engine.set_font_weight(self.font_weight)?;
        }

        if flags.contains(StyleFlags::OPACITY) {
            engine.set_opacity(self.opacity)?;
        }

        if flags.contains(StyleFlags::FILTER) {
            self.render_filter(ctx, engine)?;
        }

        if flags.contains(StyleFlags::STROKE_DASH_ARRAY) {
            engine.set_stroke_dash_array(&self.dash_array)?;
        }

        if flags.contains(StyleFlags::STROKE_DASH_OFFSET) {
            engine.set_stroke_dash_offset(self.dash_offset)?;
        }

        if flags.contains(StyleFlags::STROKE_LINE_CAP) {
            engine.set_stroke_line_cap(self.line_cap)?;
        }

        if flags.contains(StyleFlags::STROKE_LINE_JOIN) {
            engine.set_stroke_line_join(self.line_join)?;
        }

        if flags.contains(StyleFlags::STROKE_MITER_LIMIT) {
            engine.set_stroke_miter_limit(self.miter_limit)?;
        }

        if flags.contains(StyleFlags::STROKE_OPACITY) {
            engine.set_stroke_opacity(self.stroke_opacity)?;
        }

        if flags.contains(StyleFlags::STROKE) {
            let paint = resolve_paint(&self.stroke, ctx, engine)?;
            engine.set_stroke_paint(paint)?;
        }

        if flags.contains(StyleFlags::STROKE_WIDTH) {
            engine.set_stroke_width(self.stroke_width)?;
        }

        if flags.contains(StyleFlags::TEXT_ANCHOR) {
            engine.set_text_anchor(self.text_anchor)?;
        }

        Ok(())
    }

    fn render_filter(
        &self,
        ctx: &mut RenderContext,
        engine: &mut dyn RenderEngine,
    ) -> Result<(), Error> {
        let (link, node) = match (self.filter_link.as_deref(), self.filter_node) {
            (Some(link), Some(node)) => (link, node),
            _ => return engine.set_filter("inherit"),
        };

        let tree = ctx.tree;
        if let Some(ElementKind::Filter(filter)) = tree.node(node).map(|n| &n.kind) {
            filter.render(link, engine)?;
            engine.set_filter(link)?;
        }

        Ok(())
    }
}

fn resolve_paint<'a>(
    paint: &Paint,
    ctx: &mut RenderContext<'a>,
    engine: &mut dyn RenderEngine,
) -> Result<PaintRef<'a>, Error> {
    let (link, fallback) = match paint {
        Paint::None => return Ok(PaintRef::None),
        Paint::Color(c) => return Ok(PaintRef::Color(*c)),
        Paint::CurrentColor => return Ok(PaintRef::CurrentColor),
        Paint::Server(link, fallback) => (link, fallback),
    };

    let tree = ctx.tree;
    let server = tree
        .resources()
        .find(link)
        .log_none(|| log::warn!("Paint server '{}' cannot be found.", link))
        .and_then(|id| tree.node(id).map(|n| (id, n)));

    match server.map(|(id, n)| (id, &n.kind)) {
        Some((_, ElementKind::Gradient(g))) => return Ok(PaintRef::Gradient(g)),
        Some((id, ElementKind::Pattern(p))) => {
            if crate::render::render_pattern(ctx, id, p, engine)? {
                return Ok(PaintRef::Pattern(p));
            }
        }
        Some(_) => log::warn!("'{}' is not a paint server.", link),
        None => {}
    }

    Ok(match fallback {
        Some(PaintFallback::Color(c)) => PaintRef::Color(*c),
        Some(PaintFallback::CurrentColor) => PaintRef::CurrentColor,
        Some(PaintFallback::None) | None => PaintRef::None,
    })
}

/// Parses an opacity-like value.
///
/// A number or a percentage. The result is clamped to the 0..1 range.
pub(crate) fn parse_opacity(text: &str) -> Result<f64, Error> {
    let text = text.trim();
    let (number, percent) = match text.strip_suffix('%') {
        Some(v) => (v, true),
        None => (text, false),
    };

    if number.is_empty() {
        return Err(Error::parse("opacity", text));
    }

    let mut n = parse_number(number)?;
    if percent {
        n /= 100.0;
    }

    Ok(n.clamp(0.0, 1.0))
}

fn parse_color(name: &str, text: &str) -> Result<Color, Error> {
    Color::from_str(text).map_err(|_| Error::parse(name, text))
}

fn parse_paint(name: &str, text: &str) -> Result<Paint, Error> {
    let paint = svgtypes::Paint::from_str(text).map_err(|_| Error::parse(name, text))?;
    Ok(match paint {
        svgtypes::Paint::None => Paint::None,
        svgtypes::Paint::CurrentColor => Paint::CurrentColor,
        svgtypes::Paint::Color(c) => Paint::Color(c),
        svgtypes::Paint::FuncIRI(link, fallback) => {
            let fallback = fallback.map(|f| match f {
                svgtypes::PaintFallback::None => PaintFallback::None,
                svgtypes::PaintFallback::CurrentColor => PaintFallback::CurrentColor,
                svgtypes::PaintFallback::Color(c) => PaintFallback::Color(c),
            });
            Paint::Server(link.to_string(), fallback)
        }
        // Handled by `Style::apply_property`.
        svgtypes::Paint::Inherit => return Err(Error::parse(name, text)),
        svgtypes::Paint::ContextFill | svgtypes::Paint::ContextStroke => {
            log::warn!("{} '{}' is not supported. Fallback to none.", name, text);
            Paint::None
        }
    })
}

fn parse_color_prop(style: &mut Style, text: &str) -> Result<(), Error> {
    style.color = parse_color("color", text)?;
    style.flags.insert(StyleFlags::COLOR);
    Ok(())
}

fn parse_display(style: &mut Style, text: &str) -> Result<(), Error> {
    match text {
        "none" => style.flags.remove(StyleFlags::DISPLAY),
        "inline" | "block" | "list-item" | "run-in" | "compact" | "marker" | "table"
        | "inline-table" | "table-row-group" | "table-header-group" | "table-footer-group"
        | "table-row" | "table-column-group" | "table-column" | "table-cell"
        | "table-caption" | "inline-block" | "flex" | "inline-flex" | "grid"
        | "inline-grid" | "contents" => style.flags.insert(StyleFlags::DISPLAY),
        _ => return Err(Error::parse("display", text)),
    }

    Ok(())
}

fn parse_fill_opacity(style: &mut Style, text: &str) -> Result<(), Error> {
    style.fill_opacity = parse_opacity(text)?;
    style.flags.insert(StyleFlags::FILL_OPACITY);
    Ok(())
}

fn parse_fill(style: &mut Style, text: &str) -> Result<(), Error> {
    style.fill = parse_paint("fill", text)?;
    style.flags.insert(StyleFlags::FILL);
    Ok(())
}

fn parse_fill_rule(style: &mut Style, text: &str) -> Result<(), Error> {
    style.fill_rule = match text {
        "nonzero" => FillRule::NonZero,
        "evenodd" => FillRule::EvenOdd,
        _ => return Err(Error::parse("fill-rule", text)),
    };
    style.flags.insert(StyleFlags::FILL_RULE);
    Ok(())
}

fn parse_filter(style: &mut Style, text: &str) -> Result<(), Error> {
    match text {
        "none" => {}
        "inherit" => {
            style.filter_link = None;
            style.filter_node = None;
            style.flags.insert(StyleFlags::FILTER);
        }
        _ => {
            let link = svgtypes::FuncIRI::from_str(text).map_err(|_| Error::parse("filter", text))?;
            style.filter_link = Some(link.0.to_string());
            style.filter_node = None;
            style.flags.insert(StyleFlags::FILTER);
        }
    }

    Ok(())
}

fn parse_font_family(style: &mut Style, text: &str) -> Result<(), Error> {
    if text.is_empty() {
        return Err(Error::parse("font-family", text));
    }

    style.font_family = text.to_string();
    style.flags.insert(StyleFlags::FONT_FAMILY);
    Ok(())
}

fn parse_font_size(style: &mut Style, text: &str) -> Result<(), Error> {
    style.font_size = parse_length(text, Orientation::Other)?;
    style.flags.insert(StyleFlags::FONT_SIZE);
    Ok(())
}

fn parse_font_style(style: &mut Style, text: &str) -> Result<(), Error> {
    style.font_style = match text {
        "normal" => FontStyle::Normal,
        "italic" => FontStyle::Italic,
        "oblique" => FontStyle::Oblique,
        _ => return Err(Error::parse("font-style", text)),
    };
    style.flags.insert(StyleFlags::FONT_STYLE);
    Ok(())
}

fn parse_font_weight(style: &mut Style, text: &str) -> Result<(), Error> {
    let weight = match text {
        "normal" => 400.0,
        "bold" => 700.0,
        "bolder" => style.font_weight as f64 + 100.0,
        "lighter" => style.font_weight as f64 - 100.0,
        _ => parse_number(text)?,
    };

    style.font_weight = weight.clamp(100.0, 900.0).round() as u16;
    style.flags.insert(StyleFlags::FONT_WEIGHT);
    Ok(())
}

fn parse_image_rendering(style: &mut Style, text: &str) -> Result<(), Error> {
    style.image_rendering = match text {
        "auto" => ImageRendering::Auto,
        "optimizeSpeed" => ImageRendering::OptimizeSpeed,
        "optimizeQuality" => ImageRendering::OptimizeQuality,
        _ => return Err(Error::parse("image-rendering", text)),
    };
    style.flags.insert(StyleFlags::IMAGE_RENDERING);
    Ok(())
}

fn parse_opacity_prop(style: &mut Style, text: &str) -> Result<(), Error> {
    style.opacity = parse_opacity(text)?;
    style.flags.insert(StyleFlags::OPACITY);
    Ok(())
}

fn parse_dash_array(style: &mut Style, text: &str) -> Result<(), Error> {
    let mut list = Vec::new();
    if text != "none" {
        for length in svgtypes::LengthListParser::from(text) {
            let length = length.map_err(|_| Error::parse("stroke-dasharray", text))?;
            if length.number < 0.0 {
                return Err(Error::parse("stroke-dasharray", text));
            }

            list.push(Length::new(length.number, length.unit, Orientation::Other));
        }

        if list.is_empty() {
            return Err(Error::parse("stroke-dasharray", text));
        }

        // An odd list is repeated to get an even one.
        if list.len() % 2 != 0 {
            list.extend_from_within(..);
        }
    }

    style.dash_array = list;
    style.flags.insert(StyleFlags::STROKE_DASH_ARRAY);
    Ok(())
}

fn parse_dash_offset(style: &mut Style, text: &str) -> Result<(), Error> {
    style.dash_offset = parse_length(text, Orientation::Other)?;
    style.flags.insert(StyleFlags::STROKE_DASH_OFFSET);
    Ok(())
}

fn parse_line_cap(style: &mut Style, text: &str) -> Result<(), Error> {
    style.line_cap = match text {
        "butt" => LineCap::Butt,
        "round" => LineCap::Round,
        "square" => LineCap::Square,
        _ => return Err(Error::parse("stroke-linecap", text)),
    };
    style.flags.insert(StyleFlags::STROKE_LINE_CAP);
    Ok(())
}

fn parse_line_join(style: &mut Style, text: &str) -> Result<(), Error> {
    style.line_join = match text {
        "miter" => LineJoin::Miter,
        "round" => LineJoin::Round,
        "bevel" => LineJoin::Bevel,
        _ => return Err(Error::parse("stroke-linejoin", text)),
    };
    style.flags.insert(StyleFlags::STROKE_LINE_JOIN);
    Ok(())
}

fn parse_miter_limit(style: &mut Style, text: &str) -> Result<(), Error> {
    style.miter_limit = parse_number(text)?;
    style.flags.insert(StyleFlags::STROKE_MITER_LIMIT);
    Ok(())
}

fn parse_stroke_opacity(style: &mut Style, text: &str) -> Result<(), Error> {
    style.stroke_opacity = parse_opacity(text)?;
    style.flags.insert(StyleFlags::STROKE_OPACITY);
    Ok(())
}

fn parse_stroke(style: &mut Style, text: &str) -> Result<(), Error> {
    style.stroke = parse_paint("stroke", text)?;
    style.flags.insert(StyleFlags::STROKE);
    Ok(())
}

fn parse_stroke_width(style: &mut Style, text: &str) -> Result<(), Error> {
    style.stroke_width = parse_length(text, Orientation::Other)?;
    style.flags.insert(StyleFlags::STROKE_WIDTH);
    Ok(())
}

fn parse_text_anchor(style: &mut Style, text: &str) -> Result<(), Error> {
    style.text_anchor = match text {
        "start" => TextAnchor::Start,
        "middle" => TextAnchor::Middle,
        "end" => TextAnchor::End,
        _ => return Err(Error::parse("text-anchor", text)),
    };
    style.flags.insert(StyleFlags::TEXT_ANCHOR);
    Ok(())
}

fn parse_visibility(style: &mut Style, text: &str) -> Result<(), Error> {
    match text {
        "visible" => style.flags.insert(StyleFlags::VISIBILITY),
        "hidden" | "collapse" => style.flags.remove(StyleFlags::VISIBILITY),
        _ => return Err(Error::parse("visibility", text)),
    }

    Ok(())
}

// Stop properties also overwrite `opacity` and `color`.
fn parse_stop_opacity(style: &mut Style, text: &str) -> Result<(), Error> {
    style.stop_opacity = parse_opacity(text)?;
    style.opacity = style.stop_opacity;
    style.flags.insert(StyleFlags::STOP_OPACITY);
    style.flags.insert(StyleFlags::OPACITY);
    Ok(())
}

fn parse_stop_color(style: &mut Style, text: &str) -> Result<(), Error> {
    style.stop_color = parse_color("stop-color", text)?;
    style.color = style.stop_color;
    style.flags.insert(StyleFlags::STOP_COLOR);
    style.flags.insert(StyleFlags::COLOR);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(text: &str) -> Style {
        let mut style = Style::default();
        style.apply_style_text(text);
        style
    }

    #[test]
    fn defaults_are_parsable() {
        for prop in PROPERTIES {
            let mut style = Style::default();
            assert!(
                style.apply_property(prop.name, prop.default).is_ok(),
                "{}",
                prop.name
            );
        }
    }

    #[test]
    fn fresh_style_flags() {
        let style = Style::default();
        assert!(style.flags.contains(StyleFlags::OPACITY));
        assert!(style.is_displayed());
        assert!(style.is_visible());
        assert!(!style.flags.contains(StyleFlags::FILL));
    }

    #[test]
    fn font_weight_relative() {
        let mut s = style("font-weight:800");
        s.apply_property("font-weight", "bolder").unwrap();
        assert_eq!(s.font_weight, 900);

        let mut s = style("font-weight:100");
        s.apply_property("font-weight", "lighter").unwrap();
        assert_eq!(s.font_weight, 100);

        assert_eq!(style("font-weight:bold").font_weight, 700);
    }

    #[test]
    fn opacity_percent() {
        assert_eq!(style("opacity:50%").opacity, 0.5);
        assert_eq!(parse_opacity("0.25").unwrap(), 0.25);
        assert!(matches!(parse_opacity(""), Err(Error::ParseError(_))));
        assert!(matches!(parse_opacity("%"), Err(Error::ParseError(_))));
    }

    #[test]
    fn dash_array_odd() {
        let s = style("stroke-dasharray:1,2,3");
        let list: Vec<f64> = s.dash_array.iter().map(|l| l.number).collect();
        assert_eq!(list, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);

        let s = style("stroke-dasharray:none");
        assert!(s.flags.contains(StyleFlags::STROKE_DASH_ARRAY));
        assert!(s.dash_array.is_empty());

        let mut s = Style::default();
        assert!(s.apply_property("stroke-dasharray", "1 -2").is_err());
    }

    #[test]
    fn keywords() {
        let mut s = Style::default();
        assert!(s.apply_property("stroke-linecap", "flat").is_err());
        assert!(s.apply_property("fill-rule", "odd").is_err());
        s.apply_property("text-anchor", "middle").unwrap();
        assert_eq!(s.text_anchor, TextAnchor::Middle);
    }

    #[test]
    fn display_and_visibility() {
        assert!(!style("display:none").is_displayed());
        assert!(style("display:block").is_displayed());
        assert!(!style("visibility:collapse").is_visible());

        let mut s = Style::default();
        assert!(s.apply_property("display", "bogus").is_err());
        s.apply_property("display", "inherit").unwrap();
        assert!(s.is_displayed());
    }

    #[test]
    fn paints() {
        let s = style("fill:url(#g) red;stroke:currentColor");
        assert_eq!(
            s.fill,
            Paint::Server(
                "g".to_string(),
                Some(PaintFallback::Color(Color::new_rgb(255, 0, 0)))
            )
        );
        assert_eq!(s.stroke, Paint::CurrentColor);

        let s = style("fill:inherit");
        assert!(!s.flags.contains(StyleFlags::FILL));
    }

    #[test]
    fn filter_reference() {
        let s = style("filter:url(#blur)");
        assert!(s.has_filter());
        assert_eq!(s.filter_link(), Some("blur"));

        let s = style("filter:inherit");
        assert!(s.has_filter());
        assert_eq!(s.filter_link(), None);

        let s = style("filter:none");
        assert!(!s.has_filter());
    }

    #[test]
    fn style_errors_are_ignored() {
        let s = style("fill:#zzz;opacity:0.5;unknown:1");
        assert!(!s.flags.contains(StyleFlags::FILL));
        assert_eq!(s.opacity, 0.5);
    }

    #[test]
    fn stop_color_sets_color() {
        let s = style("stop-color:#0000ff");
        assert_eq!(s.stop_color, Color::new_rgb(0, 0, 255));
        assert_eq!(s.color, Color::new_rgb(0, 0, 255));
        assert!(s.flags.contains(StyleFlags::COLOR));
    }

    #[test]
    fn stop_opacity_sets_opacity() {
        let mut s = Style::default();
        s.flags.remove(StyleFlags::OPACITY);
        s.apply_property("stop-opacity", "0.25").unwrap();
        assert_eq!(s.stop_opacity, 0.25);
        assert_eq!(s.opacity, 0.25);
        assert!(s.flags.contains(StyleFlags::OPACITY));
    }

    #[test]
    fn initial_keyword() {
        let mut s = style("fill:red;stroke-width:5");
        s.apply_property("stroke-width", "initial").unwrap();
        s.apply_property("fill", "initial").unwrap();
        assert_eq!(s.stroke_width.number, 1.0);
        assert!(matches!(s.fill, Paint::Color(c) if c == Color::black()));
    }
}
