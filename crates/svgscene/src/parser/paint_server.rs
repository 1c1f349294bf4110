// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use svgtypes::Transform;

use super::{href, IdMap};
use crate::style::Style;
use crate::tree::{Gradient, GradientKind, Pattern, SpreadMethod, Stop, Units};
use crate::units::{parse_length, parse_length_or, Length, LengthUnit, Orientation};
use crate::Error;

type XmlNode<'a, 'input> = roxmltree::Node<'a, 'input>;

// Guards against circular `href` chains.
const HREF_DEPTH_LIMIT: usize = 32;

fn href_iter<'a, 'input: 'a>(
    node: XmlNode<'a, 'input>,
    id_map: &IdMap<'a, 'input>,
) -> Vec<XmlNode<'a, 'input>> {
    let mut list = Vec::new();
    let mut current = node;
    while let Some(link) = href(current).and_then(|id| id_map.get(id).copied()) {
        if link == node || list.len() == HREF_DEPTH_LIMIT || list.contains(&link) {
            log::warn!("Element references itself via 'href'.");
            break;
        }

        list.push(link);
        current = link;
    }

    list
}

fn is_gradient(node: XmlNode) -> bool {
    matches!(node.tag_name().name(), "linearGradient" | "radialGradient")
}

fn resolve_gradient_attr<'a, 'input: 'a>(
    node: XmlNode<'a, 'input>,
    name: &str,
    id_map: &IdMap<'a, 'input>,
) -> Option<&'a str> {
    if let Some(v) = node.attribute(name) {
        return Some(v);
    }

    let is_geometry = !matches!(name, "gradientUnits" | "spreadMethod" | "gradientTransform");
    for link in href_iter(node, id_map) {
        if !is_gradient(link) {
            break;
        }

        // Coordinates can be resolved only from an element of the same type.
        if is_geometry && link.tag_name().name() != node.tag_name().name() {
            break;
        }

        if let Some(v) = link.attribute(name) {
            return Some(v);
        }
    }

    None
}

fn find_gradient_with_stops<'a, 'input: 'a>(
    node: XmlNode<'a, 'input>,
    id_map: &IdMap<'a, 'input>,
) -> Option<XmlNode<'a, 'input>> {
    if has_stops(node) {
        return Some(node);
    }

    for link in href_iter(node, id_map) {
        if !is_gradient(link) {
            log::warn!("Gradient cannot reference '{}' via 'href'.", link.tag_name().name());
            return None;
        }

        if has_stops(link) {
            return Some(link);
        }
    }

    None
}

fn has_stops(node: XmlNode) -> bool {
    node.children().any(|n| n.tag_name().name() == "stop")
}

pub(crate) fn convert_gradient<'a, 'input: 'a>(
    node: XmlNode<'a, 'input>,
    id_map: &IdMap<'a, 'input>,
) -> Result<Gradient, Error> {
    let attr = |name: &str| resolve_gradient_attr(node, name, id_map);
    let length = |name: &str, o: Orientation, default: f64| {
        parse_length_or(
            attr(name),
            o,
            Length::new(default, LengthUnit::Percent, o),
        )
    };

    let kind = if node.tag_name().name() == "radialGradient" {
        let cx = length("cx", Orientation::Horizontal, 50.0)?;
        let cy = length("cy", Orientation::Vertical, 50.0)?;
        let r = length("r", Orientation::Other, 50.0)?;
        // Focal point defaults to the center.
        let fx = parse_length_or(attr("fx"), Orientation::Horizontal, cx)?;
        let fy = parse_length_or(attr("fy"), Orientation::Vertical, cy)?;
        GradientKind::Radial { cx, cy, r, fx, fy }
    } else {
        GradientKind::Linear {
            x1: length("x1", Orientation::Horizontal, 0.0)?,
            y1: length("y1", Orientation::Vertical, 0.0)?,
            x2: length("x2", Orientation::Horizontal, 100.0)?,
            y2: length("y2", Orientation::Vertical, 0.0)?,
        }
    };

    let units = parse_units(attr("gradientUnits"), Units::ObjectBoundingBox)?;

    let spread = match attr("spreadMethod") {
        None | Some("pad") => SpreadMethod::Pad,
        Some("reflect") => SpreadMethod::Reflect,
        Some("repeat") => SpreadMethod::Repeat,
        Some(v) => return Err(Error::parse("spreadMethod", v)),
    };

    let transform = parse_transform(attr("gradientTransform"))?;

    let stops = match find_gradient_with_stops(node, id_map) {
        Some(v) => convert_stops(v)?,
        None => Vec::new(),
    };

    Ok(Gradient {
        kind,
        units,
        spread,
        transform,
        stops,
    })
}

fn convert_stops(grad: XmlNode) -> Result<Vec<Stop>, Error> {
    let mut stops = Vec::new();
    let mut prev_offset = 0.0;

    for stop in grad.children().filter(|n| n.is_element()) {
        if stop.tag_name().name() != "stop" {
            log::warn!("Invalid gradient child: '{}'.", stop.tag_name().name());
            continue;
        }

        // `offset` can be either a number or a percentage.
        let offset = match stop.attribute("offset") {
            Some(v) => {
                let length = parse_length(v, Orientation::Other)?;
                match length.unit {
                    LengthUnit::None => length.number,
                    LengthUnit::Percent => length.number / 100.0,
                    _ => prev_offset,
                }
            }
            None => prev_offset,
        };

        // Offsets must be monotonic.
        let offset = offset.clamp(0.0, 1.0).max(prev_offset);
        prev_offset = offset;

        let mut style = Style::default();
        if let Some(text) = stop.attribute("style") {
            style.apply_style_text(text);
        }
        style.apply_attributes(stop)?;

        let color = style.stop_color;
        let opacity = style.stop_opacity * (color.alpha as f64 / 255.0);
        stops.push(Stop {
            offset,
            color: svgtypes::Color::new_rgb(color.red, color.green, color.blue),
            opacity,
        });
    }

    Ok(stops)
}

fn find_pattern_attr<'a, 'input: 'a>(
    node: XmlNode<'a, 'input>,
    name: &str,
    id_map: &IdMap<'a, 'input>,
) -> Option<&'a str> {
    if let Some(v) = node.attribute(name) {
        return Some(v);
    }

    for link in href_iter(node, id_map) {
        if link.tag_name().name() != "pattern" {
            break;
        }

        if let Some(v) = link.attribute(name) {
            return Some(v);
        }
    }

    None
}

/// Returns a pattern which children must be used as the `node` content.
pub(crate) fn find_pattern_with_children<'a, 'input: 'a>(
    node: XmlNode<'a, 'input>,
    id_map: &IdMap<'a, 'input>,
) -> XmlNode<'a, 'input> {
    if node.children().any(|n| n.is_element()) {
        return node;
    }

    for link in href_iter(node, id_map) {
        if link.tag_name().name() != "pattern" {
            log::warn!("Pattern cannot reference '{}' via 'href'.", link.tag_name().name());
            break;
        }

        if link.children().any(|n| n.is_element()) {
            return link;
        }
    }

    node
}

pub(crate) fn convert_pattern<'a, 'input: 'a>(
    node: XmlNode<'a, 'input>,
    id_map: &IdMap<'a, 'input>,
) -> Result<Pattern, Error> {
    let attr = |name: &str| find_pattern_attr(node, name, id_map);
    let length = |name: &str, o: Orientation| parse_length_or(attr(name), o, Length::zero(o));

    let view_box = match attr("viewBox") {
        Some(v) => super::parse_view_box(v, attr("preserveAspectRatio"))?,
        None => None,
    };

    Ok(Pattern {
        x: length("x", Orientation::Horizontal)?,
        y: length("y", Orientation::Vertical)?,
        width: length("width", Orientation::Horizontal)?,
        height: length("height", Orientation::Vertical)?,
        units: parse_units(attr("patternUnits"), Units::ObjectBoundingBox)?,
        content_units: parse_units(attr("patternContentUnits"), Units::UserSpaceOnUse)?,
        transform: parse_transform(attr("patternTransform"))?,
        view_box,
    })
}

fn parse_units(text: Option<&str>, default: Units) -> Result<Units, Error> {
    match text {
        None => Ok(default),
        Some("userSpaceOnUse") => Ok(Units::UserSpaceOnUse),
        Some("objectBoundingBox") => Ok(Units::ObjectBoundingBox),
        Some(v) => Err(Error::parse("units", v)),
    }
}

pub(crate) fn parse_transform(text: Option<&str>) -> Result<Transform, Error> {
    match text {
        Some(v) => Transform::from_str(v).map_err(|_| Error::parse("transform", v)),
        None => Ok(Transform::default()),
    }
}
