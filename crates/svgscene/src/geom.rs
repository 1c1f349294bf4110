// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub use svgtypes::{Align, AspectRatio, Transform};

/// An axis-aligned bounding box in device coordinates.
///
/// An empty box is represented by `BoundingBox::EMPTY` and is distinct
/// from a zero-sized box.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BoundingBox {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Right edge.
    pub right: f64,
    /// Bottom edge.
    pub bottom: f64,
}

impl BoundingBox {
    /// An empty bounding box.
    ///
    /// A union with it returns the other box.
    pub const EMPTY: BoundingBox = BoundingBox {
        left: f64::INFINITY,
        top: f64::INFINITY,
        right: f64::NEG_INFINITY,
        bottom: f64::NEG_INFINITY,
    };

    /// Creates a new bounding box from edges.
    #[inline]
    pub fn from_ltrb(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        BoundingBox {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a new bounding box from a position and size.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_ltrb(x, y, x + width, y + height)
    }

    /// Checks that the box is the empty sentinel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left > self.right || self.top > self.bottom
    }

    /// Returns box width.
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Returns box height.
    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Returns a union of two boxes.
    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> Self {
        BoundingBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Checks that a point lies strictly inside the box.
    ///
    /// Points on the edges do not match.
    #[inline]
    pub fn contains_strict(&self, x: f64, y: f64) -> bool {
        self.left < x && x < self.right && self.top < y && y < self.bottom
    }

    /// Converts the box into an `Option`, returning `None` for an empty one.
    #[inline]
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox::EMPTY
    }
}

struct Frame<T> {
    state: T,
    bbox: BoundingBox,
}

/// A render state stack.
///
/// Each push copies the inherited state and starts a fresh, empty
/// bounding box accumulator. Each pop merges the accumulated bounding box
/// into the parent frame.
pub struct StateStack<T: Clone> {
    frames: Vec<Frame<T>>,
}

impl<T: Clone> StateStack<T> {
    /// Creates a stack with a root state.
    pub fn new(root: T) -> Self {
        StateStack {
            frames: vec![Frame {
                state: root,
                bbox: BoundingBox::EMPTY,
            }],
        }
    }

    /// Pushes a copy of the current state.
    pub fn push(&mut self) {
        let state = self.current().clone();
        self.frames.push(Frame {
            state,
            bbox: BoundingBox::EMPTY,
        });
    }

    /// Pops the current state.
    ///
    /// Returns the popped state and its accumulated bounding box.
    /// The root frame is never popped.
    pub fn pop(&mut self) -> Option<(T, Option<BoundingBox>)> {
        if self.frames.len() < 2 {
            return None;
        }

        let frame = self.frames.pop()?;
        if let Some(parent) = self.frames.last_mut() {
            parent.bbox = parent.bbox.union(&frame.bbox);
        }

        Some((frame.state, frame.bbox.non_empty()))
    }

    /// Pops the current state without merging its bounding box into the parent.
    pub fn discard(&mut self) -> Option<T> {
        if self.frames.len() < 2 {
            return None;
        }

        self.frames.pop().map(|f| f.state)
    }

    /// Returns the current state.
    pub fn current(&self) -> &T {
        // The root frame always exists.
        &self.frames[self.frames.len() - 1].state
    }

    /// Returns the current state.
    pub fn current_mut(&mut self) -> &mut T {
        let idx = self.frames.len() - 1;
        &mut self.frames[idx].state
    }

    /// Returns the parent state, if any.
    pub fn parent(&self) -> Option<&T> {
        let len = self.frames.len();
        if len < 2 {
            None
        } else {
            Some(&self.frames[len - 2].state)
        }
    }

    /// Merges a bounding box into the current frame.
    pub fn include(&mut self, bbox: BoundingBox) {
        let idx = self.frames.len() - 1;
        self.frames[idx].bbox = self.frames[idx].bbox.union(&bbox);
    }

    /// Returns the current frame bounding box.
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.frames[self.frames.len() - 1].bbox.non_empty()
    }

    /// Returns the stack depth, including the root frame.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// A `viewBox` with its `preserveAspectRatio`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ViewBox {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// Aspect ratio alignment.
    pub aspect: AspectRatio,
}

/// A `viewBox` to viewport mapping.
///
/// The translation is in view box units and applied after the scale:
/// `x' = sx * (x + tx)`.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ViewBoxFit {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl ViewBoxFit {
    /// Converts the mapping into an affine transform.
    pub fn to_transform(&self) -> Transform {
        Transform::new(self.sx, 0.0, 0.0, self.sy, self.sx * self.tx, self.sy * self.ty)
    }
}

/// Maps a view box onto a viewport of the specified size in pixels.
///
/// The content is scaled by the height ratio when it has to fit vertically
/// (a wider viewport with `meet`, or a narrower one with `slice`)
/// and by the width ratio otherwise. The free axis is then aligned.
pub fn view_box_transform(vb: &ViewBox, width: f64, height: f64) -> ViewBoxFit {
    let (vx, vy, vw, vh) = (vb.x, vb.y, vb.width, vb.height);

    if vb.aspect.align == Align::None {
        return ViewBoxFit {
            sx: width / vw,
            sy: height / vh,
            tx: -vx,
            ty: -vy,
        };
    }

    let vb_ratio = vw / vh;
    let vp_ratio = width / height;
    let meet = !vb.aspect.slice;

    if (vb_ratio < vp_ratio && meet) || (vb_ratio >= vp_ratio && !meet) {
        let scale = height / vh;
        let free = vw - width * vh / height;
        let tx = match vb.aspect.align {
            Align::XMinYMin | Align::XMinYMid | Align::XMinYMax => -vx,
            Align::XMidYMin | Align::XMidYMid | Align::XMidYMax => -vx - free / 2.0,
            _ => -vx - free,
        };

        ViewBoxFit {
            sx: scale,
            sy: scale,
            tx,
            ty: -vy,
        }
    } else {
        let scale = width / vw;
        let free = vh - height * vw / width;
        let ty = match vb.aspect.align {
            Align::XMinYMin | Align::XMidYMin | Align::XMaxYMin => -vy,
            Align::XMinYMid | Align::XMidYMid | Align::XMaxYMid => -vy - free / 2.0,
            _ => -vy - free,
        };

        ViewBoxFit {
            sx: scale,
            sy: scale,
            tx: -vx,
            ty,
        }
    }
}

/// Returns `ts * translate(x, y)`.
pub(crate) fn pre_translate(ts: Transform, x: f64, y: f64) -> Transform {
    Transform::new(
        ts.a,
        ts.b,
        ts.c,
        ts.d,
        ts.a * x + ts.c * y + ts.e,
        ts.b * x + ts.d * y + ts.f,
    )
}

/// Checks that a transform is an identity one.
pub(crate) fn is_identity(ts: &Transform) -> bool {
    *ts == Transform::default()
}
