// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::geom::{is_identity, pre_translate, BoundingBox, StateStack};
use crate::tree::{ElementKind, ElementTag, Node, NodeId, Overflow, Pattern, Tree};
use crate::{path, Error, RenderEngine};

/// A walker state shared by a single render pass.
pub(crate) struct RenderContext<'a> {
    pub tree: &'a Tree,
    pub path_cache: bool,
    /// Elements registered for events, in render order.
    pub events: Vec<NodeId>,
    frames: StateStack<()>,
    // Patterns which content is being rendered right now.
    patterns: Vec<NodeId>,
}

impl<'a> RenderContext<'a> {
    pub fn new(tree: &'a Tree, path_cache: bool) -> Self {
        RenderContext {
            tree,
            path_cache,
            events: Vec::new(),
            frames: StateStack::new(()),
            patterns: Vec::new(),
        }
    }

    fn include(&mut self, bbox: Option<BoundingBox>) {
        if let Some(bbox) = bbox {
            self.frames.include(bbox);
        }
    }
}

/// Renders an element and its subtree.
pub(crate) fn render_node(
    ctx: &mut RenderContext,
    id: NodeId,
    engine: &mut dyn RenderEngine,
) -> Result<(), Error> {
    let tree = ctx.tree;
    let node = tree.node(id).ok_or(Error::NoSuchElement)?;

    if !node.style.is_displayed() {
        return Ok(());
    }

    if node.events && ctx.patterns.is_empty() {
        ctx.events.push(id);
    }

    let is_group = matches!(node.tag(), ElementTag::SvgGroup | ElementTag::Group);
    let opacity = node.style.group_opacity();

    let begin = if is_group {
        engine.begin_group(opacity)
    } else {
        match node.kind {
            ElementKind::Path(ref path) if ctx.path_cache => {
                let cache = path.cache.borrow();
                engine.begin_element(cache.as_ref())
            }
            _ => engine.begin_element(None),
        }
    };

    ctx.frames.push();

    let res = begin.and_then(|_| render_content(ctx, node, engine));

    // Finalize must run even after a failure, otherwise an engine state stack
    // would be left unbalanced.
    let bbox = ctx.frames.pop().and_then(|(_, bbox)| bbox);
    node.bounding_box.set(bbox);

    let end = if is_group {
        engine.end_group(opacity)
    } else {
        engine.end_element()
    };

    res.and(end)
}

fn render_content(
    ctx: &mut RenderContext,
    node: &Node,
    engine: &mut dyn RenderEngine,
) -> Result<(), Error> {
    apply_geometry(node, engine)?;
    node.style.render(ctx, engine)?;

    let tag = node.tag();
    let is_group_like = matches!(
        tag,
        ElementTag::SvgGroup | ElementTag::Group | ElementTag::Use
    );
    if !is_group_like && !node.style.is_visible() {
        return Ok(());
    }

    match node.kind {
        ElementKind::SvgGroup(_) | ElementKind::Group(_) | ElementKind::Use(_) => {
            render_children(ctx, node, engine)?;
        }
        ElementKind::Symbol(_) => {
            let parent_tag = node.parent.and_then(|p| ctx.tree.node(p)).map(|p| p.tag());
            if parent_tag == Some(ElementTag::Use) {
                render_children(ctx, node, engine)?;
            }
        }
        ElementKind::Path(ref p) => {
            if ctx.path_cache {
                let mut cache = p.cache.borrow_mut();
                if cache.is_none() {
                    path::emit(&p.commands, engine)?;
                }

                let bbox = engine.render_path(Some(&mut *cache))?;
                ctx.include(bbox);
            } else {
                path::emit(&p.commands, engine)?;
                let bbox = engine.render_path(None)?;
                ctx.include(bbox);
            }
        }
        ElementKind::Circle(ref e) | ElementKind::Ellipse(ref e) => {
            let bbox = engine.render_ellipse(e.cx, e.cy, e.rx, e.ry)?;
            ctx.include(bbox);
        }
        ElementKind::Line(ref l) => {
            let bbox = engine.render_line(l.x1, l.y1, l.x2, l.y2)?;
            ctx.include(bbox);
        }
        ElementKind::Rect(ref r) => {
            let (rx, ry) = r.radii();
            let bbox = engine.render_rect(r.x, r.y, r.width, r.height, rx, ry)?;
            ctx.include(bbox);
        }
        ElementKind::Text(ref t) => {
            render_children(ctx, node, engine)?;
            if !t.text.is_empty() {
                let bbox = engine.render_text(t.x, t.y, &t.text)?;
                ctx.include(bbox);
            }
        }
        ElementKind::Image(ref img) => {
            if let Some(ref data) = img.data {
                let bbox = engine.render_image(data, img.x, img.y, img.width, img.height)?;
                ctx.include(bbox);
            }
        }
        ElementKind::Defs(_)
        | ElementKind::Gradient(_)
        | ElementKind::Pattern(_)
        | ElementKind::Filter(_) => {}
    }

    Ok(())
}

fn apply_geometry(node: &Node, engine: &mut dyn RenderEngine) -> Result<(), Error> {
    if let ElementKind::SvgGroup(ref vp) = node.kind {
        if matches!(node.overflow, Overflow::Hidden | Overflow::Scroll) {
            engine.apply_clip_box(vp.x, vp.y, vp.width, vp.height)?;
        }

        engine.set_viewport_dimension(vp.width, vp.height)?;
    }

    let ts = match node.kind {
        // TODO: x/y are used as user units, percentages should use the parent viewport.
        ElementKind::SvgGroup(ref vp) | ElementKind::Use(ref vp) => {
            pre_translate(node.transform, vp.x.number, vp.y.number)
        }
        _ => node.transform,
    };

    if !is_identity(&ts) {
        engine.transform(&ts)?;
    }

    match node.kind {
        ElementKind::SvgGroup(ref vp) | ElementKind::Group(ref vp) | ElementKind::Symbol(ref vp) => {
            if let Some(ref view_box) = vp.view_box {
                engine.apply_view_box(view_box, vp.width, vp.height)?;
            }
        }
        _ => {}
    }

    Ok(())
}

fn render_children(
    ctx: &mut RenderContext,
    node: &Node,
    engine: &mut dyn RenderEngine,
) -> Result<(), Error> {
    for child in &node.children {
        render_node(ctx, *child, engine)?;
    }

    Ok(())
}

/// Renders a pattern content between `begin_pattern` and `end_pattern`.
///
/// Returns `false` when the pattern references itself.
pub(crate) fn render_pattern(
    ctx: &mut RenderContext,
    id: NodeId,
    pattern: &Pattern,
    engine: &mut dyn RenderEngine,
) -> Result<bool, Error> {
    if ctx.patterns.contains(&id) {
        log::warn!("Pattern {:?} references itself. Skipped.", id);
        return Ok(false);
    }

    let tree = ctx.tree;
    let node = tree.node(id).ok_or(Error::NoSuchElement)?;

    engine.begin_pattern(pattern)?;

    ctx.patterns.push(id);
    // Pattern content must not affect the current element bbox.
    ctx.frames.push();

    let res = render_children(ctx, node, engine);

    ctx.frames.discard();
    ctx.patterns.pop();

    let end = engine.end_pattern();
    res.and(end).map(|_| true)
}
