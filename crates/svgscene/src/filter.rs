// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Filter primitives graph.

use std::cell::Cell;
use std::collections::HashMap;
use std::str::FromStr;

use svgtypes::Color;

use crate::units::{parse_length_or, parse_number, Length, Orientation};
use crate::{Error, RenderEngine};

/// A filter primitive input.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FilterInput {
    SourceGraphic,
    SourceAlpha,
    BackgroundImage,
    BackgroundAlpha,
    FillPaint,
    StrokePaint,
    /// A result of a primitive with the specified index.
    Reference(usize),
}

impl FilterInput {
    /// Returns a referenced primitive index or -1 for symbolic inputs.
    pub fn index(&self) -> i32 {
        match *self {
            FilterInput::Reference(idx) => idx as i32,
            _ => -1,
        }
    }

    fn from_keyword(text: &str) -> Option<Self> {
        match text {
            "SourceGraphic" => Some(FilterInput::SourceGraphic),
            "SourceAlpha" => Some(FilterInput::SourceAlpha),
            "BackgroundImage" => Some(FilterInput::BackgroundImage),
            "BackgroundAlpha" => Some(FilterInput::BackgroundAlpha),
            "FillPaint" => Some(FilterInput::FillPaint),
            "StrokePaint" => Some(FilterInput::StrokePaint),
            _ => None,
        }
    }
}

/// A filter primitive subregion.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PrimitiveRegion {
    /// A zero-based primitive position in its filter.
    pub index: usize,
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
}

/// An `feBlend` mode.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Darken,
    Lighten,
}

/// An `feComposite` operator.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum CompositeOperator {
    Over,
    In,
    Out,
    Atop,
    Xor,
    Arithmetic { k1: f64, k2: f64, k3: f64, k4: f64 },
}

/// A filter primitive operation.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub enum PrimitiveKind {
    Blend {
        mode: BlendMode,
        input2: FilterInput,
    },
    Composite {
        operator: CompositeOperator,
        input2: FilterInput,
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
    /// A recognized but unsupported primitive.
    ///
    /// Takes an index, but doesn't produce any engine calls.
    NoOp(String),
}

/// A filter primitive.
#[derive(Clone, PartialEq, Debug)]
pub struct Primitive {
    /// An operation.
    pub kind: PrimitiveKind,
    /// A subregion.
    pub region: PrimitiveRegion,
    /// The first input.
    pub input: FilterInput,
    /// A `result` name.
    pub result: Option<String>,
}

/// A `filter` element.
///
/// Primitives are stored in document order. The graph is replayed into
/// an engine only when it was changed since the last replay.
#[derive(Clone, Debug)]
pub struct Filter {
    primitives: Vec<Primitive>,
    results: HashMap<String, usize>,
    dirty: Cell<bool>,
}

impl Default for Filter {
    fn default() -> Self {
        Filter {
            primitives: Vec::new(),
            results: HashMap::new(),
            dirty: Cell::new(true),
        }
    }
}

/// Checks that an element name is a filter primitive.
pub(crate) fn is_primitive(name: &str) -> bool {
    matches!(
        name,
        "feBlend"
            | "feComposite"
            | "feFlood"
            | "feGaussianBlur"
            | "feOffset"
            | "feColorMatrix"
            | "feComponentTransfer"
            | "feConvolveMatrix"
            | "feDiffuseLighting"
            | "feDisplacementMap"
            | "feImage"
            | "feMerge"
            | "feMorphology"
            | "feSpecularLighting"
            | "feTile"
            | "feTurbulence"
    )
}

impl Filter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the primitives list.
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Finds a primitive index by its `result` name.
    pub fn result_index(&self, name: &str) -> Option<usize> {
        self.results.get(name).copied()
    }

    /// Checks that the filter must be replayed on the next render.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Forces a replay on the next render.
    ///
    /// Required when a new engine instance is used for each render.
    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    /// Parses a primitive element and appends it to the graph.
    pub fn add_primitive(&mut self, node: roxmltree::Node) -> Result<(), Error> {
        let name = node.tag_name().name();
        if !is_primitive(name) {
            return Err(Error::UnknownElementType);
        }

        let index = self.primitives.len();
        let attr = |name: &str| attribute(node, name);

        let region = PrimitiveRegion {
            index,
            x: parse_length_or(attr("x"), Orientation::Horizontal, Length::zero(Orientation::Horizontal))?,
            y: parse_length_or(attr("y"), Orientation::Vertical, Length::zero(Orientation::Vertical))?,
            width: parse_length_or(
                attr("width"),
                Orientation::Horizontal,
                Length::zero(Orientation::Horizontal),
            )?,
            height: parse_length_or(
                attr("height"),
                Orientation::Vertical,
                Length::zero(Orientation::Vertical),
            )?,
        };

        let input = self.resolve_input(attr("in"), index);

        let kind = match name {
            "feBlend" => {
                let mode = match attr("mode").unwrap_or("normal") {
                    "normal" => BlendMode::Normal,
                    "multiply" => BlendMode::Multiply,
                    "screen" => BlendMode::Screen,
                    "darken" => BlendMode::Darken,
                    "lighten" => BlendMode::Lighten,
                    v => return Err(Error::parse("feBlend mode", v)),
                };

                PrimitiveKind::Blend {
                    mode,
                    input2: self.resolve_input(attr("in2"), index),
                }
            }
            "feComposite" => {
                let operator = match attr("operator").unwrap_or("over") {
                    "over" => CompositeOperator::Over,
                    "in" => CompositeOperator::In,
                    "out" => CompositeOperator::Out,
                    "atop" => CompositeOperator::Atop,
                    "xor" => CompositeOperator::Xor,
                    "arithmetic" => {
                        let k = |name: &str| attr(name).map(parse_number).unwrap_or(Ok(0.0));
                        CompositeOperator::Arithmetic {
                            k1: k("k1")?,
                            k2: k("k2")?,
                            k3: k("k3")?,
                            k4: k("k4")?,
                        }
                    }
                    v => return Err(Error::parse("feComposite operator", v)),
                };

                PrimitiveKind::Composite {
                    operator,
                    input2: self.resolve_input(attr("in2"), index),
                }
            }
            "feFlood" => {
                let color = match attr("flood-color") {
                    Some(v) => Color::from_str(v).map_err(|_| Error::parse("flood-color", v))?,
                    None => Color::black(),
                };

                let opacity = match attr("flood-opacity") {
                    Some(v) => crate::style::parse_opacity(v)?,
                    None => 0.0,
                };

                PrimitiveKind::Flood { color, opacity }
            }
            "feGaussianBlur" => {
                let (std_dev_x, std_dev_y) = parse_std_dev(attr("stdDeviation"))?;
                PrimitiveKind::GaussianBlur {
                    std_dev_x,
                    std_dev_y,
                }
            }
            "feOffset" => {
                let dx = attr("dx").map(parse_number).unwrap_or(Ok(0.0))?;
                let dy = attr("dy").map(parse_number).unwrap_or(Ok(0.0))?;
                PrimitiveKind::Offset { dx, dy }
            }
            _ => {
                log::warn!("Filter primitive '{}' is not supported. Skipped.", name);
                PrimitiveKind::NoOp(name.to_string())
            }
        };

        let result = attr("result").map(|s| s.to_string());
        if let Some(ref result) = result {
            self.results.insert(result.clone(), index);
        }

        self.primitives.push(Primitive {
            kind,
            region,
            input,
            result,
        });
        self.dirty.set(true);

        Ok(())
    }

    fn resolve_input(&self, text: Option<&str>, index: usize) -> FilterInput {
        let default = if index == 0 {
            FilterInput::SourceGraphic
        } else {
            FilterInput::Reference(index - 1)
        };

        let text = match text {
            Some(v) => v.trim(),
            None => return default,
        };

        if let Some(input) = FilterInput::from_keyword(text) {
            return input;
        }

        match self.results.get(text) {
            Some(idx) => FilterInput::Reference(*idx),
            None => {
                log::warn!("Unknown filter input '{}'. Fallback to the previous result.", text);
                default
            }
        }
    }

    /// Replays the graph into an engine.
    ///
    /// Does nothing when the graph wasn't changed since the last call.
    pub fn render(&self, id: &str, engine: &mut dyn RenderEngine) -> Result<(), Error> {
        if !self.dirty.get() {
            return Ok(());
        }

        engine.begin_filter(id)?;
        for primitive in &self.primitives {
            let region = &primitive.region;
            let input = primitive.input;
            match primitive.kind {
                PrimitiveKind::Blend { mode, input2 } => {
                    engine.add_filter_fe_blend(region, input, input2, mode)?;
                }
                PrimitiveKind::Composite { operator, input2 } => {
                    engine.add_filter_fe_composite(region, input, input2, operator)?;
                }
                PrimitiveKind::Flood { color, opacity } => {
                    engine.add_filter_fe_flood(region, input, color, opacity)?;
                }
                PrimitiveKind::GaussianBlur {
                    std_dev_x,
                    std_dev_y,
                } => {
                    engine.add_filter_fe_gaussian_blur(region, input, std_dev_x, std_dev_y)?;
                }
                PrimitiveKind::Offset { dx, dy } => {
                    engine.add_filter_fe_offset(region, input, dx, dy)?;
                }
                PrimitiveKind::NoOp(_) => {}
            }
        }

        self.dirty.set(false);
        Ok(())
    }
}

// Primitive properties can be set via `style` too.
fn attribute<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    if let Some(value) = node.attribute(name) {
        return Some(value);
    }

    let style = node.attribute("style")?;
    simplecss::DeclarationTokenizer::from(style)
        .filter(|d| d.name == name)
        .last()
        .map(|d| d.value)
}

fn parse_std_dev(text: Option<&str>) -> Result<(f64, f64), Error> {
    let text = match text {
        Some(v) => v,
        None => return Ok((0.0, 0.0)),
    };

    let list = crate::units::parse_number_list(text)?;
    match list.as_slice() {
        [x] => Ok((*x, *x)),
        [x, y] => Ok((*x, *y)),
        _ => Err(Error::parse("stdDeviation", text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Filter {
        let doc = roxmltree::Document::parse(text).unwrap();
        let mut filter = Filter::new();
        for child in doc.root_element().children().filter(|n| n.is_element()) {
            filter.add_primitive(child).unwrap();
        }

        filter
    }

    #[test]
    fn default_chaining() {
        let filter = parse(
            "<filter>
                <feOffset dx='1'/>
                <feFlood/>
                <feGaussianBlur stdDeviation='2'/>
            </filter>",
        );

        let inputs: Vec<_> = filter.primitives().iter().map(|p| p.input).collect();
        assert_eq!(
            inputs,
            vec![
                FilterInput::SourceGraphic,
                FilterInput::Reference(0),
                FilterInput::Reference(1),
            ]
        );
        assert_eq!(inputs[0].index(), -1);
        assert_eq!(inputs[2].index(), 1);
    }

    #[test]
    fn named_results() {
        let filter = parse(
            "<filter>
                <feOffset dx='1' result='shifted'/>
                <feTurbulence/>
                <feBlend in='SourceAlpha' in2='shifted' mode='screen'/>
            </filter>",
        );

        let blend = &filter.primitives()[2];
        assert_eq!(blend.region.index, 2);
        assert_eq!(blend.input, FilterInput::SourceAlpha);
        assert_eq!(
            blend.kind,
            PrimitiveKind::Blend {
                mode: BlendMode::Screen,
                input2: FilterInput::Reference(0),
            }
        );
        assert_eq!(filter.result_index("shifted"), Some(0));
    }

    #[test]
    fn flood_defaults() {
        let filter = parse("<filter><feFlood/></filter>");
        assert_eq!(
            filter.primitives()[0].kind,
            PrimitiveKind::Flood {
                color: Color::black(),
                opacity: 0.0,
            }
        );
    }

    #[test]
    fn std_dev_single_value() {
        let filter = parse("<filter><feGaussianBlur stdDeviation='3'/></filter>");
        assert_eq!(
            filter.primitives()[0].kind,
            PrimitiveKind::GaussianBlur {
                std_dev_x: 3.0,
                std_dev_y: 3.0,
            }
        );
    }

    #[test]
    fn arithmetic() {
        let filter = parse(
            "<filter><feComposite operator='arithmetic' k2='0.5' k3='0.5'/></filter>",
        );
        assert_eq!(
            filter.primitives()[0].kind,
            PrimitiveKind::Composite {
                operator: CompositeOperator::Arithmetic {
                    k1: 0.0,
                    k2: 0.5,
                    k3: 0.5,
                    k4: 0.0,
                },
                input2: FilterInput::SourceGraphic,
            }
        );
    }

    #[test]
    fn not_a_primitive() {
        let doc = roxmltree::Document::parse("<rect/>").unwrap();
        let mut filter = Filter::new();
        assert!(matches!(
            filter.add_primitive(doc.root_element()),
            Err(Error::UnknownElementType)
        ));
    }
}
