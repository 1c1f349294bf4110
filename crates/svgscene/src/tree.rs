// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A scene graph.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use svgtypes::{Color, Transform};

use crate::engine::PathCache;
use crate::filter::Filter;
use crate::geom::{BoundingBox, ViewBox};
use crate::image::RasterImage;
use crate::path::PathCommand;
use crate::resource::ResourceTable;
use crate::style::Style;
use crate::units::{Length, LengthUnit, Orientation};
use crate::{Error, RenderEngine};

/// A node ID inside a [`Tree`].
///
/// IDs are never reused, so an ID of a released node stays invalid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns a node slot index.
    #[inline]
    pub fn get(&self) -> usize {
        self.0
    }
}

/// An element `overflow` property.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Overflow {
    Visible,
    Hidden,
    Scroll,
    Auto,
    Inherit,
}

impl Default for Overflow {
    fn default() -> Self {
        Overflow::Visible
    }
}

impl Overflow {
    pub(crate) fn parse(text: &str) -> Result<Self, Error> {
        match text.trim() {
            "visible" => Ok(Overflow::Visible),
            "hidden" => Ok(Overflow::Hidden),
            "scroll" => Ok(Overflow::Scroll),
            "auto" => Ok(Overflow::Auto),
            "inherit" => Ok(Overflow::Inherit),
            _ => Err(Error::parse("overflow", text)),
        }
    }
}

/// A group-like element viewport.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub struct Viewport {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
    pub view_box: Option<ViewBox>,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            x: Length::zero(Orientation::Horizontal),
            y: Length::zero(Orientation::Vertical),
            width: Length::new(100.0, LengthUnit::Percent, Orientation::Horizontal),
            height: Length::new(100.0, LengthUnit::Percent, Orientation::Vertical),
            view_box: None,
        }
    }
}

/// A `path` element.
#[derive(Default, Debug)]
pub struct Path {
    /// Absolute path commands.
    pub commands: Vec<PathCommand>,
    pub(crate) cache: RefCell<Option<PathCache>>,
}

impl Path {
    /// Checks that an engine cached this path.
    pub fn is_cached(&self) -> bool {
        self.cache.borrow().is_some()
    }
}

// A cache belongs to an engine and cannot be shared between copies.
impl Clone for Path {
    fn clone(&self) -> Self {
        Path {
            commands: self.commands.clone(),
            cache: RefCell::new(None),
        }
    }
}

/// A `circle` or an `ellipse` element.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub struct Ellipse {
    pub cx: Length,
    pub cy: Length,
    pub rx: Length,
    pub ry: Length,
}

impl Default for Ellipse {
    fn default() -> Self {
        Ellipse {
            cx: Length::zero(Orientation::Horizontal),
            cy: Length::zero(Orientation::Vertical),
            rx: Length::zero(Orientation::Horizontal),
            ry: Length::zero(Orientation::Vertical),
        }
    }
}

/// A `line` element.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub struct Line {
    pub x1: Length,
    pub y1: Length,
    pub x2: Length,
    pub y2: Length,
}

impl Default for Line {
    fn default() -> Self {
        Line {
            x1: Length::zero(Orientation::Horizontal),
            y1: Length::zero(Orientation::Vertical),
            x2: Length::zero(Orientation::Horizontal),
            y2: Length::zero(Orientation::Vertical),
        }
    }
}

/// A `rect` element.
///
/// When only one of the corner radii is set, the other one copies it.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub struct Rect {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
    pub rx: Option<Length>,
    pub ry: Option<Length>,
}

impl Rect {
    /// Returns resolved corner radii.
    pub fn radii(&self) -> (Length, Length) {
        match (self.rx, self.ry) {
            (Some(rx), Some(ry)) => (rx, ry),
            (Some(rx), None) => (rx, Length::new(rx.number, rx.unit, Orientation::Vertical)),
            (None, Some(ry)) => (Length::new(ry.number, ry.unit, Orientation::Horizontal), ry),
            (None, None) => (
                Length::zero(Orientation::Horizontal),
                Length::zero(Orientation::Vertical),
            ),
        }
    }
}

impl Default for Rect {
    fn default() -> Self {
        Rect {
            x: Length::zero(Orientation::Horizontal),
            y: Length::zero(Orientation::Vertical),
            width: Length::zero(Orientation::Horizontal),
            height: Length::zero(Orientation::Vertical),
            rx: None,
            ry: None,
        }
    }
}

/// A `text` or a `tspan` element.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub struct Text {
    pub x: Length,
    pub y: Length,
    /// Whitespace-collapsed character data.
    pub text: String,
}

impl Default for Text {
    fn default() -> Self {
        Text {
            x: Length::zero(Orientation::Horizontal),
            y: Length::zero(Orientation::Vertical),
            text: String::new(),
        }
    }
}

/// An `image` element.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct Image {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
    pub href: String,
    /// Decoded pixels. `None` when loading failed.
    pub data: Option<Rc<RasterImage>>,
}

impl Default for Image {
    fn default() -> Self {
        Image {
            x: Length::zero(Orientation::Horizontal),
            y: Length::zero(Orientation::Vertical),
            width: Length::zero(Orientation::Horizontal),
            height: Length::zero(Orientation::Vertical),
            href: String::new(),
            data: None,
        }
    }
}

/// A coordinate system units.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Units {
    UserSpaceOnUse,
    ObjectBoundingBox,
}

/// A gradient spread method.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpreadMethod {
    Pad,
    Reflect,
    Repeat,
}

/// A gradient stop.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Stop {
    /// In the 0..1 range.
    pub offset: f64,
    pub color: Color,
    pub opacity: f64,
}

/// A gradient geometry.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub enum GradientKind {
    Linear {
        x1: Length,
        y1: Length,
        x2: Length,
        y2: Length,
    },
    Radial {
        cx: Length,
        cy: Length,
        r: Length,
        fx: Length,
        fy: Length,
    },
}

/// A `linearGradient` or a `radialGradient` element.
///
/// `href` references are already resolved.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub struct Gradient {
    pub kind: GradientKind,
    pub units: Units,
    pub spread: SpreadMethod,
    pub transform: Transform,
    pub stops: Vec<Stop>,
}

impl Default for Gradient {
    fn default() -> Self {
        let percent = |n, o| Length::new(n, LengthUnit::Percent, o);
        Gradient {
            kind: GradientKind::Linear {
                x1: percent(0.0, Orientation::Horizontal),
                y1: percent(0.0, Orientation::Vertical),
                x2: percent(100.0, Orientation::Horizontal),
                y2: percent(0.0, Orientation::Vertical),
            },
            units: Units::ObjectBoundingBox,
            spread: SpreadMethod::Pad,
            transform: Transform::default(),
            stops: Vec::new(),
        }
    }
}

/// A `pattern` element.
///
/// Content is stored as the node children.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub struct Pattern {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
    pub units: Units,
    pub content_units: Units,
    pub transform: Transform,
    pub view_box: Option<ViewBox>,
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern {
            x: Length::zero(Orientation::Horizontal),
            y: Length::zero(Orientation::Vertical),
            width: Length::zero(Orientation::Horizontal),
            height: Length::zero(Orientation::Vertical),
            units: Units::ObjectBoundingBox,
            content_units: Units::UserSpaceOnUse,
            transform: Transform::default(),
            view_box: None,
        }
    }
}

/// An element tag.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ElementTag {
    SvgGroup,
    Group,
    Defs,
    Use,
    Symbol,
    Path,
    Circle,
    Ellipse,
    Line,
    Rect,
    Text,
    Image,
    Gradient,
    Pattern,
    Filter,
}

impl ElementTag {
    /// Maps an SVG element name to a tag.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "svg" => ElementTag::SvgGroup,
            "g" => ElementTag::Group,
            "defs" => ElementTag::Defs,
            "use" => ElementTag::Use,
            "symbol" => ElementTag::Symbol,
            "path" => ElementTag::Path,
            "circle" => ElementTag::Circle,
            "ellipse" => ElementTag::Ellipse,
            "line" => ElementTag::Line,
            "rect" => ElementTag::Rect,
            "text" | "tspan" => ElementTag::Text,
            "image" => ElementTag::Image,
            "linearGradient" | "radialGradient" => ElementTag::Gradient,
            "pattern" => ElementTag::Pattern,
            "filter" => ElementTag::Filter,
            _ => return None,
        })
    }

    /// Checks that an element can be a parent of other elements,
    /// including injected ones.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ElementTag::SvgGroup
                | ElementTag::Group
                | ElementTag::Use
                | ElementTag::Defs
                | ElementTag::Symbol
        )
    }

    /// Checks that an element can own children.
    ///
    /// Besides containers, patterns own their content and texts own spans.
    pub fn can_have_children(&self) -> bool {
        self.is_container() || matches!(self, ElementTag::Pattern | ElementTag::Text)
    }
}

/// An element payload.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum ElementKind {
    SvgGroup(Viewport),
    Group(Viewport),
    Defs(Viewport),
    Use(Viewport),
    Symbol(Viewport),
    Path(Path),
    Circle(Ellipse),
    Ellipse(Ellipse),
    Line(Line),
    Rect(Rect),
    Text(Text),
    Image(Image),
    Gradient(Gradient),
    Pattern(Pattern),
    Filter(Filter),
}

impl ElementKind {
    /// Creates a default payload for a tag.
    pub fn new(tag: ElementTag) -> Self {
        match tag {
            ElementTag::SvgGroup => ElementKind::SvgGroup(Viewport::default()),
            ElementTag::Group => ElementKind::Group(Viewport::default()),
            ElementTag::Defs => ElementKind::Defs(Viewport::default()),
            ElementTag::Use => ElementKind::Use(Viewport::default()),
            ElementTag::Symbol => ElementKind::Symbol(Viewport::default()),
            ElementTag::Path => ElementKind::Path(Path::default()),
            ElementTag::Circle => ElementKind::Circle(Ellipse::default()),
            ElementTag::Ellipse => ElementKind::Ellipse(Ellipse::default()),
            ElementTag::Line => ElementKind::Line(Line::default()),
            ElementTag::Rect => ElementKind::Rect(Rect::default()),
            ElementTag::Text => ElementKind::Text(Text::default()),
            ElementTag::Image => ElementKind::Image(Image::default()),
            ElementTag::Gradient => ElementKind::Gradient(Gradient::default()),
            ElementTag::Pattern => ElementKind::Pattern(Pattern::default()),
            ElementTag::Filter => ElementKind::Filter(Filter::default()),
        }
    }

    /// Returns a payload tag.
    pub fn tag(&self) -> ElementTag {
        match self {
            ElementKind::SvgGroup(_) => ElementTag::SvgGroup,
            ElementKind::Group(_) => ElementTag::Group,
            ElementKind::Defs(_) => ElementTag::Defs,
            ElementKind::Use(_) => ElementTag::Use,
            ElementKind::Symbol(_) => ElementTag::Symbol,
            ElementKind::Path(_) => ElementTag::Path,
            ElementKind::Circle(_) => ElementTag::Circle,
            ElementKind::Ellipse(_) => ElementTag::Ellipse,
            ElementKind::Line(_) => ElementTag::Line,
            ElementKind::Rect(_) => ElementTag::Rect,
            ElementKind::Text(_) => ElementTag::Text,
            ElementKind::Image(_) => ElementTag::Image,
            ElementKind::Gradient(_) => ElementTag::Gradient,
            ElementKind::Pattern(_) => ElementTag::Pattern,
            ElementKind::Filter(_) => ElementTag::Filter,
        }
    }

    /// Returns a viewport of a group-like element.
    pub fn viewport(&self) -> Option<&Viewport> {
        match self {
            ElementKind::SvgGroup(ref vp)
            | ElementKind::Group(ref vp)
            | ElementKind::Defs(ref vp)
            | ElementKind::Use(ref vp)
            | ElementKind::Symbol(ref vp) => Some(vp),
            _ => None,
        }
    }

    /// Returns a mutable viewport of a group-like element.
    pub fn viewport_mut(&mut self) -> Option<&mut Viewport> {
        match self {
            ElementKind::SvgGroup(ref mut vp)
            | ElementKind::Group(ref mut vp)
            | ElementKind::Defs(ref mut vp)
            | ElementKind::Use(ref mut vp)
            | ElementKind::Symbol(ref mut vp) => Some(vp),
            _ => None,
        }
    }
}

/// A scene graph node.
#[derive(Debug)]
pub struct Node {
    pub(crate) id: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Element classes.
    pub classes: Vec<String>,
    /// Element transform.
    pub transform: Transform,
    /// Element style.
    pub style: Style,
    /// Element overflow.
    pub overflow: Overflow,
    /// Element payload.
    pub kind: ElementKind,
    pub(crate) bounding_box: Cell<Option<BoundingBox>>,
    pub(crate) events: bool,
}

impl Node {
    fn new(kind: ElementKind, parent: Option<NodeId>) -> Self {
        Node {
            id: None,
            parent,
            children: Vec::new(),
            classes: Vec::new(),
            transform: Transform::default(),
            style: Style::default(),
            overflow: Overflow::default(),
            kind,
            bounding_box: Cell::new(None),
            events: false,
        }
    }

    /// Returns the element ID.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the parent node.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns child nodes in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the element tag.
    pub fn tag(&self) -> ElementTag {
        self.kind.tag()
    }

    /// Returns a bounding box computed by the last render.
    ///
    /// `None` when the element wasn't rendered or didn't draw anything.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box.get()
    }

    /// Checks that the element registers itself on the event stack.
    pub fn has_events(&self) -> bool {
        self.events
    }

    /// Checks that the element has the specified class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Splits a `class` attribute.
pub(crate) fn parse_classes(text: &str) -> Vec<String> {
    text.split(|c| c == ' ' || c == '\t')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// A scene graph arena.
///
/// Owns all nodes and the identifiers table.
#[derive(Default, Debug)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    root: Option<NodeId>,
    resources: ResourceTable,
}

impl Tree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the root element.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    /// Returns the identifiers table.
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Checks that a node wasn't released.
    pub fn is_alive(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0), Some(Some(_)))
    }

    /// Returns a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(|n| n.as_ref())
    }

    /// Returns a mutable node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(|n| n.as_mut())
    }

    /// Returns node children.
    ///
    /// Returns an empty slice for a released node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    /// Returns a node parent.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Iterates over all live nodes in an allocation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    /// Iterates over a subtree in a depth-first order, starting with `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut list = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                list.push(id);
                stack.extend(node.children.iter().rev());
            }
        }

        list
    }

    /// Allocates a new element.
    ///
    /// The element remembers `parent`, but isn't added to its children.
    /// Use [`append_child`](Tree::append_child) for this.
    pub fn create_element(
        &mut self,
        tag: ElementTag,
        parent: Option<NodeId>,
    ) -> Result<NodeId, Error> {
        if let Some(parent) = parent {
            if !self.is_alive(parent) {
                return Err(Error::InvalidCall);
            }
        }

        self.nodes.try_reserve(1).map_err(|_| Error::NoMemory)?;

        let id = NodeId(self.nodes.len());
        if self.resources.contains_value(id) {
            log::warn!("Identifiers table references an unallocated node {:?}.", id);
            return Err(Error::InvalidCall);
        }

        self.nodes.push(Some(Node::new(ElementKind::new(tag), parent)));
        Ok(id)
    }

    /// Assigns and registers an element ID.
    ///
    /// Returns `Error::InvalidCall` when the ID is already taken.
    pub fn set_element_id(&mut self, node: NodeId, id: &str) -> Result<(), Error> {
        if !self.is_alive(node) {
            return Err(Error::InvalidCall);
        }

        self.resources.insert(id, node)?;
        if let Some(old) = self.node(node).and_then(|n| n.id.clone()) {
            self.resources.erase(&old);
        }

        if let Some(n) = self.node_mut(node) {
            n.id = Some(id.to_string());
        }

        Ok(())
    }

    /// Appends a node to a parent children list.
    ///
    /// The child is detached from its previous parent first.
    ///
    /// Returns `Error::InvalidCall` when the parent cannot own children
    /// or when the child is the parent itself or one of its ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        if !self.is_alive(child) {
            return Err(Error::InvalidCall);
        }

        match self.node(parent) {
            Some(n) if n.tag().can_have_children() => {}
            _ => return Err(Error::InvalidCall),
        }

        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(Error::InvalidCall);
            }

            ancestor = self.parent(id);
        }

        self.detach(child);

        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }

        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }

        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.parent(child) {
            if let Some(node) = self.node_mut(parent) {
                node.children.retain(|c| *c != child);
            }
        }
    }

    /// Releases a node and its whole subtree.
    ///
    /// All identifiers inside the subtree are deregistered.
    /// If the node is still in its parent children list, it will be removed from it.
    pub fn release_element(&mut self, node: NodeId) -> Result<(), Error> {
        if !self.is_alive(node) {
            return Err(Error::InvalidCall);
        }

        self.detach(node);

        for id in self.descendants(node) {
            if let Some(n) = self.nodes.get_mut(id.0).and_then(|n| n.take()) {
                if let Some(ref key) = n.id {
                    if self.resources.find(key) == Some(id) {
                        self.resources.erase(key);
                    }
                }
            }
        }

        if self.root == Some(node) {
            self.root = None;
        }

        Ok(())
    }

    /// Removes a node from its parent and releases it.
    ///
    /// Returns `Error::InvalidCall` when the node doesn't exist or when
    /// its parent is not a container. The latter means the tree is corrupted.
    pub fn drop_element(&mut self, node: NodeId) -> Result<(), Error> {
        let parent = self.node(node).ok_or(Error::InvalidCall)?.parent;
        if let Some(parent) = parent {
            let parent_node = self.node(parent).ok_or(Error::InvalidCall)?;
            if !parent_node.tag().is_container() {
                log::warn!("Element {:?} has a non-container parent {:?}.", node, parent);
                return Err(Error::InvalidCall);
            }
        }

        self.release_element(node)
    }

    /// Deep copies an element.
    ///
    /// The copy is detached and gets the `new_id` identifier.
    /// Descendant copies have no identifiers. Path caches are not copied.
    pub fn clone_element(&mut self, new_id: Option<&str>, node: NodeId) -> Result<NodeId, Error> {
        if let Some(id) = new_id {
            if self.resources.contains_key(id) {
                return Err(Error::InvalidCall);
            }
        }

        let mut created = Vec::new();
        let result = self.clone_subtree(node, None, &mut created).and_then(|copy| {
            if let Some(id) = new_id {
                self.set_element_id(copy, id)?;
            }

            Ok(copy)
        });

        // A partial copy must not outlive a failure.
        if result.is_err() {
            for id in created {
                if let Some(slot) = self.nodes.get_mut(id.0) {
                    *slot = None;
                }
            }
        }

        result
    }

    fn clone_subtree(
        &mut self,
        src: NodeId,
        parent: Option<NodeId>,
        created: &mut Vec<NodeId>,
    ) -> Result<NodeId, Error> {
        let src_node = self.node(src).ok_or(Error::InvalidCall)?;
        let copy = Node {
            id: None,
            parent,
            children: Vec::new(),
            classes: src_node.classes.clone(),
            transform: src_node.transform,
            style: src_node.style.clone(),
            overflow: src_node.overflow,
            kind: src_node.kind.clone(),
            bounding_box: Cell::new(None),
            events: false,
        };
        let children = src_node.children.clone();

        self.nodes.try_reserve(1).map_err(|_| Error::NoMemory)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(copy));
        created.push(id);

        for child in children {
            let child_copy = self.clone_subtree(child, Some(id), created)?;
            if let Some(n) = self.node_mut(id) {
                n.children.push(child_copy);
            }
        }

        Ok(id)
    }

    /// Clones `source` into a container element.
    ///
    /// Returns `Error::InvalidCall` when `new_id` is already registered or
    /// `target` is not a container.
    pub fn inject(
        &mut self,
        new_id: Option<&str>,
        target: NodeId,
        source: NodeId,
    ) -> Result<NodeId, Error> {
        let target_node = self.node(target).ok_or(Error::InvalidCall)?;
        if !target_node.tag().is_container() {
            return Err(Error::InvalidCall);
        }

        let copy = self.clone_element(new_id, source)?;
        self.append_child(target, copy)?;
        Ok(copy)
    }

    /// Finds an element by ID.
    ///
    /// `None` returns the root element.
    pub fn element_by_id(&self, id: Option<&str>) -> Option<NodeId> {
        match id {
            Some(id) => self.resources.find(id),
            None => self.root,
        }
    }

    /// Finds the first element with the specified class in a depth-first order.
    pub fn element_by_class(&self, class: &str) -> Result<NodeId, Error> {
        let root = self.root.ok_or(Error::NoSuchElement)?;
        self.descendants(root)
            .into_iter()
            .find(|id| self.node(*id).map(|n| n.has_class(class)).unwrap_or(false))
            .ok_or(Error::NoSuchElement)
    }

    /// Applies CSS declarations to an element style.
    ///
    /// Malformed declarations are ignored.
    pub fn set_style(&mut self, node: NodeId, text: &str) -> Result<(), Error> {
        let n = self.node_mut(node).ok_or(Error::InvalidCall)?;
        n.style.apply_style_text(text);
        self.resolve_filter(node);
        Ok(())
    }

    /// Sets an element `display` property.
    pub fn set_display(&mut self, node: NodeId, value: &str) -> Result<(), Error> {
        let n = self.node_mut(node).ok_or(Error::InvalidCall)?;
        n.style.apply_property("display", value)?;
        Ok(())
    }

    /// Enables event registration for an element.
    pub fn enable_events(&mut self, node: NodeId) -> Result<(), Error> {
        let n = self.node_mut(node).ok_or(Error::InvalidCall)?;
        n.events = true;
        Ok(())
    }

    /// Resolves `filter` references of all nodes.
    pub(crate) fn resolve_filters(&mut self) {
        for i in 0..self.nodes.len() {
            self.resolve_filter(NodeId(i));
        }
    }

    fn resolve_filter(&mut self, node: NodeId) {
        let link = match self.node(node) {
            Some(n) if n.style.has_filter() => n.style.filter_link().map(|s| s.to_string()),
            _ => return,
        };

        // `inherit`.
        let link = match link {
            Some(v) => v,
            None => return,
        };

        let target = self
            .resources
            .find(&link)
            .filter(|id| self.node(*id).map(|n| n.tag()) == Some(ElementTag::Filter));

        if target.is_none() {
            log::warn!("Filter '{}' cannot be found. Ignored.", link);
        }

        if let Some(n) = self.node_mut(node) {
            n.style.set_filter_node(target);
        }
    }

    /// Marks all filter graphs for a replay on the next render.
    pub fn invalidate_filters(&self) {
        for node in self.nodes.iter().flatten() {
            if let ElementKind::Filter(ref filter) = node.kind {
                filter.invalidate();
            }
        }
    }

    /// Hands all path caches back to an engine.
    pub fn free_path_caches(&mut self, engine: &mut dyn RenderEngine) -> Result<(), Error> {
        for node in self.nodes.iter().flatten() {
            if let ElementKind::Path(ref path) = node.kind {
                if let Some(cache) = path.cache.borrow_mut().take() {
                    engine.free_path_cache(cache)?;
                }
            }
        }

        Ok(())
    }

    /// Logs the tree structure at the debug level.
    pub fn dump(&self) {
        if let Some(root) = self.root {
            self.dump_node(root, 0);
        }

        self.resources.dump();
    }

    fn dump_node(&self, id: NodeId, depth: usize) {
        if let Some(node) = self.node(id) {
            log::debug!(
                "{:indent$}{:?} {:?} id={:?}",
                "",
                id,
                node.tag(),
                node.id,
                indent = depth * 2
            );

            for child in &node.children {
                self.dump_node(*child, depth + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_with_child(tree: &mut Tree) -> (NodeId, NodeId) {
        let root = tree.create_element(ElementTag::SvgGroup, None).unwrap();
        tree.set_root(Some(root));
        let child = tree.create_element(ElementTag::Rect, Some(root)).unwrap();
        tree.set_element_id(child, "rect1").unwrap();
        tree.append_child(root, child).unwrap();
        (root, child)
    }

    #[test]
    fn release_deregisters_ids() {
        let mut tree = Tree::new();
        let (root, child) = group_with_child(&mut tree);
        let g = tree.create_element(ElementTag::Group, None).unwrap();
        tree.set_element_id(g, "g1").unwrap();
        let inner = tree.create_element(ElementTag::Circle, None).unwrap();
        tree.set_element_id(inner, "c1").unwrap();
        tree.append_child(g, inner).unwrap();
        tree.append_child(root, g).unwrap();

        tree.drop_element(g).unwrap();
        assert!(!tree.is_alive(g));
        assert!(!tree.is_alive(inner));
        assert!(tree.resources().find("g1").is_none());
        assert!(tree.resources().find("c1").is_none());
        assert_eq!(tree.children(root), &[child]);

        for (key, id) in tree.resources().iter() {
            assert_eq!(tree.node(id).and_then(|n| n.id()), Some(key));
        }
    }

    #[test]
    fn drop_with_non_container_parent() {
        let mut tree = Tree::new();
        let path = tree.create_element(ElementTag::Path, None).unwrap();
        let rect = tree.create_element(ElementTag::Rect, Some(path)).unwrap();
        assert!(matches!(tree.drop_element(rect), Err(Error::InvalidCall)));
        assert!(tree.is_alive(rect));
    }

    #[test]
    fn append_to_leaf() {
        let mut tree = Tree::new();
        let (root, child) = group_with_child(&mut tree);
        let other = tree.create_element(ElementTag::Circle, None).unwrap();
        assert!(matches!(tree.append_child(child, other), Err(Error::InvalidCall)));
        assert!(matches!(tree.append_child(child, root), Err(Error::InvalidCall)));
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.parent(other), None);
    }

    #[test]
    fn append_ancestor() {
        let mut tree = Tree::new();
        let (root, _) = group_with_child(&mut tree);
        let g = tree.create_element(ElementTag::Group, Some(root)).unwrap();
        tree.append_child(root, g).unwrap();
        let inner = tree.create_element(ElementTag::Group, Some(g)).unwrap();
        tree.append_child(g, inner).unwrap();

        assert!(matches!(tree.append_child(g, g), Err(Error::InvalidCall)));
        assert!(matches!(tree.append_child(g, root), Err(Error::InvalidCall)));
        assert!(matches!(tree.append_child(inner, root), Err(Error::InvalidCall)));
        assert!(matches!(tree.append_child(inner, g), Err(Error::InvalidCall)));
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.parent(g), Some(root));
        assert_eq!(tree.descendants(root).len(), 4);

        // Moving a node into a sibling subtree is fine.
        let g2 = tree.create_element(ElementTag::Group, Some(root)).unwrap();
        tree.append_child(root, g2).unwrap();
        tree.append_child(g2, inner).unwrap();
        assert_eq!(tree.parent(inner), Some(g2));
        assert!(tree.children(g).is_empty());
    }

    #[test]
    fn create_with_dead_parent() {
        let mut tree = Tree::new();
        assert!(matches!(
            tree.create_element(ElementTag::Rect, Some(NodeId(3))),
            Err(Error::InvalidCall)
        ));
        assert_eq!(tree.nodes().count(), 0);
    }

    #[test]
    fn failed_clone_leaves_nothing() {
        let mut tree = Tree::new();
        let (root, _) = group_with_child(&mut tree);
        let g = tree.create_element(ElementTag::Group, Some(root)).unwrap();
        tree.append_child(root, g).unwrap();
        let inner = tree.create_element(ElementTag::Rect, Some(g)).unwrap();
        tree.append_child(g, inner).unwrap();
        // A dangling child makes the copy fail half-way.
        tree.node_mut(g).unwrap().children.push(NodeId(100));

        let count = tree.nodes().count();
        assert!(matches!(tree.clone_element(None, root), Err(Error::InvalidCall)));
        assert_eq!(tree.nodes().count(), count);
    }

    #[test]
    fn drop_missing() {
        let mut tree = Tree::new();
        assert!(matches!(tree.drop_element(NodeId(5)), Err(Error::InvalidCall)));
    }

    #[test]
    fn clone_is_deep_and_detached() {
        let mut tree = Tree::new();
        let (root, child) = group_with_child(&mut tree);
        let copy = tree.clone_element(Some("copy"), root).unwrap();
        assert_eq!(tree.parent(copy), None);
        assert_eq!(tree.children(copy).len(), 1);

        let child_copy = tree.children(copy)[0];
        assert_ne!(child_copy, child);
        assert_eq!(tree.node(child_copy).unwrap().id(), None);
        assert_eq!(tree.parent(child_copy), Some(copy));
        assert_eq!(tree.element_by_id(Some("copy")), Some(copy));
    }

    #[test]
    fn clone_with_taken_id() {
        let mut tree = Tree::new();
        let (_, child) = group_with_child(&mut tree);
        assert!(matches!(
            tree.clone_element(Some("rect1"), child),
            Err(Error::InvalidCall)
        ));
    }

    #[test]
    fn clones_are_independent() {
        let mut tree = Tree::new();
        let (_, child) = group_with_child(&mut tree);
        tree.set_style(child, "fill:#00ff00;stroke-width:3").unwrap();

        let c1 = tree.clone_element(Some("c1"), child).unwrap();
        let c2 = tree.clone_element(Some("c2"), c1).unwrap();
        assert_eq!(tree.node(c2).unwrap().style, tree.node(child).unwrap().style);

        tree.release_element(c1).unwrap();
        assert!(tree.is_alive(child));
        assert!(tree.is_alive(c2));
        assert_eq!(tree.element_by_id(Some("c2")), Some(c2));
    }

    #[test]
    fn inject_checks() {
        let mut tree = Tree::new();
        let (root, child) = group_with_child(&mut tree);
        assert!(matches!(
            tree.inject(Some("new"), child, root),
            Err(Error::InvalidCall)
        ));
        assert!(matches!(
            tree.inject(Some("rect1"), root, child),
            Err(Error::InvalidCall)
        ));

        let copy = tree.inject(Some("rect2"), root, child).unwrap();
        assert_eq!(tree.children(root), &[child, copy]);
        assert_eq!(tree.parent(copy), Some(root));
    }

    #[test]
    fn find_by_class() {
        let mut tree = Tree::new();
        let (_, child) = group_with_child(&mut tree);
        tree.node_mut(child).unwrap().classes = parse_classes("a\tb  c");
        assert_eq!(tree.element_by_class("b").unwrap(), child);
        assert!(matches!(
            tree.element_by_class("d"),
            Err(Error::NoSuchElement)
        ));
    }

    #[test]
    fn rect_radii_auto() {
        let rect = Rect {
            rx: Some(Length::new_number(5.0, Orientation::Horizontal)),
            ..Rect::default()
        };
        let (rx, ry) = rect.radii();
        assert_eq!(rx.number, 5.0);
        assert_eq!(ry.number, 5.0);
        assert_eq!(ry.orientation, Orientation::Vertical);
    }
}
