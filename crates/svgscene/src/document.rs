// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Read;

use crate::render::{render_node, RenderContext};
use crate::tree::{ElementTag, NodeId, Tree};
use crate::units::{Length, Orientation};
use crate::{parser, Error, Options, RenderEngine};

/// An SVG document.
///
/// Owns the scene graph and keeps the state of the last render.
#[derive(Debug, Default)]
pub struct Document {
    tree: Tree,
    /// Parsing and rendering options.
    pub options: Options,
    events: Vec<NodeId>,
    chunks: Option<Vec<u8>>,
}

impl Document {
    /// Creates an empty document.
    pub fn new(options: Options) -> Self {
        Document {
            options,
            ..Document::default()
        }
    }

    /// Returns the scene graph.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Returns the mutable scene graph.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Parses a file.
    ///
    /// Gzip compressed files are supported.
    /// Sets `Options::resources_dir` to the file directory when unset.
    pub fn parse<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;

        if self.options.resources_dir.is_none() {
            self.options.resources_dir = std::fs::canonicalize(path)
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
        }

        self.parse_buffer(&data)
    }

    /// Parses an SVG from a reader.
    pub fn parse_file<R: Read>(&mut self, mut reader: R) -> Result<(), Error> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.parse_buffer(&data)
    }

    /// Parses an SVG data.
    ///
    /// Can contain an SVG string or a gzip compressed data.
    pub fn parse_buffer(&mut self, data: &[u8]) -> Result<(), Error> {
        let text = parser::data_to_string(data)?;
        self.parse_str(&text)
    }

    /// Parses an SVG string.
    ///
    /// The previous content is discarded, even on error.
    pub fn parse_str(&mut self, text: &str) -> Result<(), Error> {
        self.tree = Tree::new();
        self.events.clear();

        let root = parser::convert(&mut self.tree, text, &self.options, false)?;
        self.tree.set_root(Some(root));
        Ok(())
    }

    /// Starts an incremental parsing.
    pub fn parse_chunk_begin(&mut self) -> Result<(), Error> {
        self.chunks = Some(Vec::new());
        Ok(())
    }

    /// Appends a data chunk.
    ///
    /// Returns `Error::InvalidCall` when `parse_chunk_begin` wasn't called.
    pub fn parse_chunk(&mut self, data: &[u8]) -> Result<(), Error> {
        let chunks = self.chunks.as_mut().ok_or(Error::InvalidCall)?;
        chunks.try_reserve(data.len()).map_err(|_| Error::NoMemory)?;
        chunks.extend_from_slice(data);
        Ok(())
    }

    /// Finishes an incremental parsing and builds the document.
    pub fn parse_chunk_end(&mut self) -> Result<(), Error> {
        let data = self.chunks.take().ok_or(Error::InvalidCall)?;
        self.parse_buffer(&data)
    }

    /// Parses an SVG fragment and appends it to a `svg` or `g` element.
    ///
    /// The fragment root can be any supported element.
    /// Nothing is appended on error.
    pub fn parse_buffer_and_inject(&mut self, parent: NodeId, data: &[u8]) -> Result<NodeId, Error> {
        let tag = self.tree.node(parent).ok_or(Error::InvalidCall)?.tag();
        if !matches!(tag, ElementTag::SvgGroup | ElementTag::Group) {
            return Err(Error::InvalidCall);
        }

        let text = parser::data_to_string(data)?;
        let root = parser::convert(&mut self.tree, &text, &self.options, true)?;
        self.tree.append_child(parent, root)?;
        Ok(root)
    }

    /// Renders the document using the specified engine.
    ///
    /// Stores bounding boxes of all rendered elements and rebuilds
    /// the events list.
    pub fn render(&mut self, engine: &mut dyn RenderEngine) -> Result<(), Error> {
        self.events.clear();

        let root = match self.tree.root() {
            Some(v) => v,
            None => return Ok(()),
        };

        let mut ctx = RenderContext::new(&self.tree, self.options.path_cache);
        let res = render_node(&mut ctx, root, engine);
        self.events = ctx.events;
        res
    }

    /// Returns the root element `width` and `height`.
    ///
    /// Returns zero lengths for a document without a root `svg`.
    pub fn size(&self) -> (Length, Length) {
        let vp = self
            .tree
            .root()
            .and_then(|id| self.tree.node(id))
            .and_then(|n| n.kind.viewport());

        match vp {
            Some(vp) => (vp.width, vp.height),
            None => (
                Length::zero(Orientation::Horizontal),
                Length::zero(Orientation::Vertical),
            ),
        }
    }

    /// Enables event registration for an element.
    pub fn enable_events(&mut self, node: NodeId) -> Result<(), Error> {
        self.tree.enable_events(node)
    }

    /// Finds the last rendered element with enabled events that contains the point.
    ///
    /// Boundaries are not included.
    pub fn event_coords_match(&self, x: f64, y: f64) -> Option<NodeId> {
        self.events.iter().rev().copied().find(|id| {
            self.tree
                .node(*id)
                .and_then(|n| n.bounding_box())
                .map(|bbox| bbox.contains_strict(x, y))
                .unwrap_or(false)
        })
    }

    /// Returns elements registered for events during the last render.
    pub fn events(&self) -> &[NodeId] {
        &self.events
    }

    /// Enables path caching.
    pub fn enable_path_cache(&mut self) {
        self.options.path_cache = true;
    }

    /// Hands all path caches back to an engine.
    pub fn free_path_caches(&mut self, engine: &mut dyn RenderEngine) -> Result<(), Error> {
        self.tree.free_path_caches(engine)
    }

    /// Finds an element by ID. `None` returns the root.
    pub fn element_by_id(&self, id: Option<&str>) -> Option<NodeId> {
        self.tree.element_by_id(id)
    }

    /// Finds the first element with the specified class.
    pub fn element_by_class(&self, class: &str) -> Result<NodeId, Error> {
        self.tree.element_by_class(class)
    }

    /// Removes an element and its subtree.
    pub fn drop_element(&mut self, node: NodeId) -> Result<(), Error> {
        self.tree.drop_element(node)?;

        let tree = &self.tree;
        self.events.retain(|id| tree.is_alive(*id));
        Ok(())
    }

    /// Applies CSS declarations to an element.
    pub fn set_style(&mut self, node: NodeId, text: &str) -> Result<(), Error> {
        self.tree.set_style(node, text)
    }

    /// Sets an element `display` property.
    pub fn set_display(&mut self, node: NodeId, value: &str) -> Result<(), Error> {
        self.tree.set_display(node, value)
    }
}
