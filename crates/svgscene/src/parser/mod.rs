// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SVG to scene graph conversion.

mod css;
mod paint_server;

use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

use crate::filter::{self, Filter};
use crate::style::Style;
use crate::tree::{
    parse_classes, Ellipse, ElementKind, ElementTag, Image, Line, NodeId, Overflow, Path, Rect,
    Text, Tree, Viewport,
};
use crate::units::{parse_length, parse_length_or, Length, LengthUnit, Orientation};
use crate::{Error, Options, ViewBox};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// We do not allow SVG with more than 1024 nested elements.
const DEPTH_LIMIT: u32 = 1024;

pub(crate) type IdMap<'a, 'input> = HashMap<&'a str, roxmltree::Node<'a, 'input>>;

/// Decompresses an SVGZ file.
pub fn decompress_svgz(data: &[u8]) -> Result<Vec<u8>, Error> {
    use std::io::Read;

    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decoded = Vec::with_capacity(data.len() * 2);
    decoder
        .read_to_end(&mut decoded)
        .map_err(|_| Error::MalformedGZip)?;
    Ok(decoded)
}

/// Converts raw bytes, optionally gzip compressed, into a string.
pub(crate) fn data_to_string(data: &[u8]) -> Result<String, Error> {
    if data.starts_with(&[0x1f, 0x8b]) {
        let data = decompress_svgz(data)?;
        String::from_utf8(data).map_err(|_| Error::NotAnUtf8Str)
    } else {
        std::str::from_utf8(data)
            .map(|s| s.to_string())
            .map_err(|_| Error::NotAnUtf8Str)
    }
}

/// Returns an `xlink:href` or `href` link target.
pub(crate) fn href<'a>(node: roxmltree::Node<'a, '_>) -> Option<&'a str> {
    let value = node
        .attribute((XLINK_NS, "href"))
        .or_else(|| node.attribute("href"))?;
    svgtypes::IRI::from_str(value).ok().map(|v| v.0)
}

/// Parses a `viewBox` with an optional `preserveAspectRatio`.
///
/// A view box with a non-positive size is ignored.
pub(crate) fn parse_view_box(text: &str, aspect: Option<&str>) -> Result<Option<ViewBox>, Error> {
    let vb = svgtypes::ViewBox::from_str(text).map_err(|_| Error::parse("viewBox", text))?;
    if !(vb.w > 0.0 && vb.h > 0.0) {
        log::warn!("viewBox '{}' has an invalid size. Ignored.", text);
        return Ok(None);
    }

    let aspect = match aspect {
        Some(v) => svgtypes::AspectRatio::from_str(v)
            .map_err(|_| Error::parse("preserveAspectRatio", v))?,
        None => svgtypes::AspectRatio::default(),
    };

    Ok(Some(ViewBox {
        x: vb.x,
        y: vb.y,
        width: vb.w,
        height: vb.h,
        aspect,
    }))
}

/// Collapses whitespace like `xml:space="default"` does.
fn collapse_whitespace(text: &str) -> String {
    let mut s = String::with_capacity(text.len());
    for word in text.split(|c: char| c.is_ascii_whitespace()) {
        if word.is_empty() {
            continue;
        }

        if !s.is_empty() {
            s.push(' ');
        }

        s.push_str(word);
    }

    s
}

fn is_svg_element(node: roxmltree::Node) -> bool {
    node.is_element() && matches!(node.tag_name().namespace(), None | Some(SVG_NS))
}

struct PendingUse {
    node: NodeId,
    link: String,
    width: Option<Length>,
    height: Option<Length>,
}

#[derive(Clone, Copy, PartialEq)]
enum UseState {
    Pending,
    Visiting,
    Done,
}

struct Converter<'a, 'input: 'a, 't> {
    tree: &'t mut Tree,
    opt: &'a Options,
    id_map: IdMap<'a, 'input>,
    sheet: simplecss::StyleSheet<'a>,
    uses: Vec<PendingUse>,
    created: Vec<NodeId>,
}

/// Converts an SVG text into a detached subtree.
///
/// Returns the subtree root. When `fragment` is `false`, the root element
/// must be an `svg` one. On error, all created nodes are released.
pub(crate) fn convert(
    tree: &mut Tree,
    text: &str,
    opt: &Options,
    fragment: bool,
) -> Result<NodeId, Error> {
    let xml_opt = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let xml = roxmltree::Document::parse_with_options(text, xml_opt)?;

    let root = xml.root_element();
    if !fragment && (!is_svg_element(root) || root.tag_name().name() != "svg") {
        return Err(Error::ParsingFailed(roxmltree::Error::NoRootNode));
    }

    // Build a map of id -> node for `href` resolving.
    let mut id_map = HashMap::new();
    for node in xml.descendants() {
        if let Some(id) = node.attribute("id") {
            id_map.entry(id).or_insert(node);
        }
    }

    let sheet = if opt.ignore_style_sheets {
        simplecss::StyleSheet::new()
    } else {
        css::resolve_css(&xml)
    };

    let mut converter = Converter {
        tree,
        opt,
        id_map,
        sheet,
        uses: Vec::new(),
        created: Vec::new(),
    };

    match converter.convert_root(root) {
        Ok(id) => {
            converter.tree.resolve_filters();
            Ok(id)
        }
        Err(e) => {
            for id in converter.created {
                if converter.tree.is_alive(id) {
                    // Can fail only for already released nodes.
                    let _ = converter.tree.release_element(id);
                }
            }

            Err(e)
        }
    }
}

impl<'a, 'input: 'a, 't> Converter<'a, 'input, 't> {
    fn convert_root(&mut self, root: roxmltree::Node<'a, 'input>) -> Result<NodeId, Error> {
        let id = self
            .convert_element(root, None, 0)?
            .ok_or(Error::ParsingFailed(roxmltree::Error::NoRootNode))?;

        self.resolve_uses()?;
        Ok(id)
    }

    fn convert_element(
        &mut self,
        xml: roxmltree::Node<'a, 'input>,
        parent: Option<NodeId>,
        depth: u32,
    ) -> Result<Option<NodeId>, Error> {
        if depth > DEPTH_LIMIT {
            return Err(Error::ElementsLimitReached);
        }

        let (id, tag) = match self.create_element(xml, parent) {
            Ok(v) => v,
            Err(Error::UnknownElementType) => return Ok(None),
            Err(e) => return Err(e),
        };

        let kind = self.convert_kind(tag, xml)?;
        let style = self.convert_style(xml)?;
        let transform = paint_server::parse_transform(xml.attribute("transform"))?;
        let overflow = match xml.attribute("overflow") {
            Some(v) => Overflow::parse(v)?,
            None => Overflow::default(),
        };

        if let Some(node) = self.tree.node_mut(id) {
            node.kind = kind;
            node.style = style;
            node.transform = transform;
            node.overflow = overflow;
            node.classes = xml.attribute("class").map(parse_classes).unwrap_or_default();
        }

        if let Some(elem_id) = xml.attribute("id") {
            if self.tree.set_element_id(id, elem_id).is_err() {
                log::warn!("Element with ID '{}' already exists. ID is ignored.", elem_id);
            }
        }

        match tag {
            ElementTag::SvgGroup | ElementTag::Group | ElementTag::Defs | ElementTag::Symbol => {
                self.convert_children(xml, id, depth)?;
            }
            ElementTag::Pattern => {
                let content = paint_server::find_pattern_with_children(xml, &self.id_map);
                self.convert_children(content, id, depth)?;
            }
            ElementTag::Text => {
                let spans = xml
                    .children()
                    .filter(|n| is_svg_element(*n) && n.tag_name().name() == "tspan");
                for child in spans {
                    self.convert_element(child, Some(id), depth + 1)?;
                }
            }
            ElementTag::Use => self.push_use(xml, id)?,
            _ => {}
        }

        Ok(Some(id))
    }

    fn convert_children(
        &mut self,
        xml: roxmltree::Node<'a, 'input>,
        parent: NodeId,
        depth: u32,
    ) -> Result<(), Error> {
        for child in xml.children().filter(|n| n.is_element()) {
            self.convert_element(child, Some(parent), depth + 1)?;
        }

        Ok(())
    }

    // Returns `Error::UnknownElementType` for elements that are not scene nodes.
    fn create_element(
        &mut self,
        xml: roxmltree::Node,
        parent: Option<NodeId>,
    ) -> Result<(NodeId, ElementTag), Error> {
        if !is_svg_element(xml) {
            return Err(Error::UnknownElementType);
        }

        let name = xml.tag_name().name();
        let tag = match ElementTag::from_name(name) {
            Some(v) => v,
            None => {
                let silent = filter::is_primitive(name)
                    || matches!(name, "stop" | "style" | "title" | "desc" | "metadata");
                if !silent {
                    log::warn!("Unsupported element '{}'. Skipped.", name);
                }

                return Err(Error::UnknownElementType);
            }
        };

        let id = self.tree.create_element(tag, parent)?;
        self.created.push(id);
        if let Some(parent) = parent {
            self.tree.append_child(parent, id)?;
        }

        Ok((id, tag))
    }

    fn convert_style(&self, xml: roxmltree::Node) -> Result<Style, Error> {
        let mut style = Style::default();
        css::apply_rules(&mut style, &self.sheet, xml);

        if let Some(text) = xml.attribute("style") {
            style.apply_style_text(text);
        }

        // Presentation attributes override everything above.
        style.apply_attributes(xml)?;
        Ok(style)
    }

    fn convert_kind(
        &self,
        tag: ElementTag,
        xml: roxmltree::Node<'a, 'input>,
    ) -> Result<ElementKind, Error> {
        let length = |name: &str, o: Orientation| parse_length_or(xml.attribute(name), o, Length::zero(o));

        Ok(match tag {
            ElementTag::SvgGroup => ElementKind::SvgGroup(convert_viewport(xml)?),
            ElementTag::Group => ElementKind::Group(convert_viewport(xml)?),
            ElementTag::Defs => ElementKind::Defs(convert_viewport(xml)?),
            ElementTag::Use => ElementKind::Use(convert_viewport(xml)?),
            ElementTag::Symbol => ElementKind::Symbol(convert_viewport(xml)?),
            ElementTag::Path => {
                let commands = match xml.attribute("d") {
                    Some(d) => crate::path::parse_path_data(d)?,
                    None => Vec::new(),
                };

                ElementKind::Path(Path {
                    commands,
                    ..Path::default()
                })
            }
            ElementTag::Circle => {
                let r = xml.attribute("r");
                ElementKind::Circle(Ellipse {
                    cx: length("cx", Orientation::Horizontal)?,
                    cy: length("cy", Orientation::Vertical)?,
                    rx: parse_length_or(r, Orientation::Other, Length::zero(Orientation::Other))?,
                    ry: parse_length_or(r, Orientation::Other, Length::zero(Orientation::Other))?,
                })
            }
            ElementTag::Ellipse => ElementKind::Ellipse(Ellipse {
                cx: length("cx", Orientation::Horizontal)?,
                cy: length("cy", Orientation::Vertical)?,
                rx: length("rx", Orientation::Horizontal)?,
                ry: length("ry", Orientation::Vertical)?,
            }),
            ElementTag::Line => ElementKind::Line(Line {
                x1: length("x1", Orientation::Horizontal)?,
                y1: length("y1", Orientation::Vertical)?,
                x2: length("x2", Orientation::Horizontal)?,
                y2: length("y2", Orientation::Vertical)?,
            }),
            ElementTag::Rect => ElementKind::Rect(Rect {
                x: length("x", Orientation::Horizontal)?,
                y: length("y", Orientation::Vertical)?,
                width: length("width", Orientation::Horizontal)?,
                height: length("height", Orientation::Vertical)?,
                rx: optional_length(xml, "rx", Orientation::Horizontal)?,
                ry: optional_length(xml, "ry", Orientation::Vertical)?,
            }),
            ElementTag::Text => {
                let text: String = xml
                    .children()
                    .filter(|n| n.is_text())
                    .filter_map(|n| n.text())
                    .collect();

                ElementKind::Text(Text {
                    x: length("x", Orientation::Horizontal)?,
                    y: length("y", Orientation::Vertical)?,
                    text: collapse_whitespace(&text),
                })
            }
            ElementTag::Image => ElementKind::Image(self.convert_image(xml)?),
            ElementTag::Gradient => {
                ElementKind::Gradient(paint_server::convert_gradient(xml, &self.id_map)?)
            }
            ElementTag::Pattern => {
                ElementKind::Pattern(paint_server::convert_pattern(xml, &self.id_map)?)
            }
            ElementTag::Filter => {
                let mut filter = Filter::new();
                for child in xml.children().filter(|n| n.is_element()) {
                    match filter.add_primitive(child) {
                        Ok(()) => {}
                        Err(Error::UnknownElementType) => {
                            log::warn!(
                                "'{}' is not a filter primitive. Skipped.",
                                child.tag_name().name()
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }

                ElementKind::Filter(filter)
            }
        })
    }

    fn convert_image(&self, xml: roxmltree::Node) -> Result<Image, Error> {
        let length = |name: &str, o: Orientation| parse_length_or(xml.attribute(name), o, Length::zero(o));

        let width = length("width", Orientation::Horizontal)?;
        let height = length("height", Orientation::Vertical)?;
        if width.number < 0.0 || height.number < 0.0 {
            return Err(Error::InvalidValue(format!(
                "image size {}x{}",
                width.number, height.number
            )));
        }

        let link = xml
            .attribute((XLINK_NS, "href"))
            .or_else(|| xml.attribute("href"))
            .unwrap_or_default();

        let data = if link.is_empty() {
            log::warn!("Image lacks the 'xlink:href' attribute.");
            None
        } else {
            crate::image::load(link, self.opt).map(Rc::new)
        };

        Ok(Image {
            x: length("x", Orientation::Horizontal)?,
            y: length("y", Orientation::Vertical)?,
            width,
            height,
            href: link.to_string(),
            data,
        })
    }

    fn push_use(&mut self, xml: roxmltree::Node, id: NodeId) -> Result<(), Error> {
        let link = match href(xml) {
            Some(v) => v,
            None => {
                log::warn!("'use' lacks a valid 'xlink:href' attribute. Skipped.");
                return Ok(());
            }
        };

        self.uses.push(PendingUse {
            node: id,
            link: link.to_string(),
            width: optional_length(xml, "width", Orientation::Horizontal)?,
            height: optional_length(xml, "height", Orientation::Vertical)?,
        });

        Ok(())
    }

    // `use` elements are resolved after the whole tree is built,
    // so they can reference elements defined later.
    fn resolve_uses(&mut self) -> Result<(), Error> {
        let mut states = vec![UseState::Pending; self.uses.len()];
        for idx in 0..self.uses.len() {
            self.resolve_use(idx, &mut states)?;
        }

        Ok(())
    }

    fn resolve_use(&mut self, idx: usize, states: &mut [UseState]) -> Result<(), Error> {
        match states[idx] {
            UseState::Done => return Ok(()),
            UseState::Visiting => {
                log::warn!("'use' '{}' is recursive. Skipped.", self.uses[idx].link);
                return Ok(());
            }
            UseState::Pending => {}
        }

        states[idx] = UseState::Visiting;

        let use_node = self.uses[idx].node;
        let target = match self.tree.resources().find(&self.uses[idx].link) {
            Some(v) => v,
            None => {
                log::warn!("'use' references an unknown element '{}'.", self.uses[idx].link);
                states[idx] = UseState::Done;
                return Ok(());
            }
        };

        // Nested `use` elements must be resolved before being copied.
        for child in self.tree.descendants(target) {
            if let Some(nested) = self.uses.iter().position(|u| u.node == child) {
                if nested != idx {
                    self.resolve_use(nested, states)?;
                }
            }
        }

        if self.is_ancestor(target, use_node) {
            log::warn!("'use' '{}' references its ancestor. Skipped.", self.uses[idx].link);
            states[idx] = UseState::Done;
            return Ok(());
        }

        let copy = self.tree.clone_element(None, target)?;
        self.created.push(copy);

        let (width, height) = (self.uses[idx].width, self.uses[idx].height);
        if let Some(node) = self.tree.node_mut(copy) {
            if let ElementKind::Symbol(ref mut vp) | ElementKind::SvgGroup(ref mut vp) = node.kind
            {
                if let Some(w) = width {
                    vp.width = w;
                }

                if let Some(h) = height {
                    vp.height = h;
                }
            }
        }

        self.tree.append_child(use_node, copy)?;
        states[idx] = UseState::Done;
        Ok(())
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }

            current = self.tree.parent(id);
        }

        false
    }
}

fn optional_length(
    xml: roxmltree::Node,
    name: &str,
    orientation: Orientation,
) -> Result<Option<Length>, Error> {
    xml.attribute(name)
        .map(|v| parse_length(v, orientation))
        .transpose()
}

fn convert_viewport(xml: roxmltree::Node) -> Result<Viewport, Error> {
    let size = |name: &str, o: Orientation| {
        parse_length_or(
            xml.attribute(name),
            o,
            Length::new(100.0, LengthUnit::Percent, o),
        )
    };

    let view_box = match xml.attribute("viewBox") {
        Some(v) => parse_view_box(v, xml.attribute("preserveAspectRatio"))?,
        None => None,
    };

    Ok(Viewport {
        x: parse_length_or(
            xml.attribute("x"),
            Orientation::Horizontal,
            Length::zero(Orientation::Horizontal),
        )?,
        y: parse_length_or(
            xml.attribute("y"),
            Orientation::Vertical,
            Length::zero(Orientation::Vertical),
        )?,
        width: size("width", Orientation::Horizontal)?,
        height: size("height", Orientation::Vertical)?,
        view_box,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace() {
        assert_eq!(collapse_whitespace("  Hello \n\t world  "), "Hello world");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn invalid_view_box() {
        assert!(parse_view_box("0 0 0 10", None).unwrap().is_none());
        assert!(parse_view_box("0 0 q", None).is_err());
        let vb = parse_view_box("0 0 10 20", Some("xMaxYMax slice")).unwrap().unwrap();
        assert_eq!(vb.aspect.align, svgtypes::Align::XMaxYMax);
        assert!(vb.aspect.slice);
    }

    #[test]
    fn gzip_magic() {
        assert!(matches!(
            data_to_string(&[0x1f, 0x8b, 0x00]),
            Err(Error::MalformedGZip)
        ));
        assert!(matches!(
            data_to_string(&[0xff, 0xfe, 0x00]),
            Err(Error::NotAnUtf8Str)
        ));
    }
}
