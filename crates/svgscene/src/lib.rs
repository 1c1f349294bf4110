// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`svgscene` parses [SVG] documents into a mutable scene graph and renders it
through a user-provided [`RenderEngine`].

Unlike a flattening SVG simplifier, the scene graph keeps the document
structure: groups, `use` instances, styles and filter graphs stay editable
after parsing. Elements can be looked up by ID or class, restyled, cloned,
injected and dropped between renders.

The walker does not rasterize anything by itself. It emits a sequence of
hierarchy, style, path and drawing calls and the engine decides what to do
with them. Each drawing call returns a bounding box, which is stored on the
element and used for hit-testing via [`Document::event_coords_match`].

## Example

```no_run
let mut doc = svgscene::Document::default();
doc.parse("image.svg").unwrap();
let (width, height) = doc.size();
```

[SVG]: https://en.wikipedia.org/wiki/Scalable_Vector_Graphics
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod document;
mod engine;
mod error;
pub mod filter;
mod geom;
mod image;
mod options;
mod parser;
mod path;
mod render;
mod resource;
pub mod style;
mod tree;
mod units;

pub use svgtypes::{Color, Transform};

pub use crate::document::Document;
pub use crate::engine::{PaintRef, PathCache, RenderEngine};
pub use crate::error::Error;
pub use crate::filter::Filter;
pub use crate::geom::*;
pub use crate::image::RasterImage;
pub use crate::options::Options;
pub use crate::parser::decompress_svgz;
pub use crate::path::{parse_path_data, PathCommand};
pub use crate::resource::ResourceTable;
pub use crate::style::{Paint, Style, StyleFlags};
pub use crate::tree::*;
pub use crate::units::*;

/// Logging helpers for `Option` chains.
pub trait OptionLog {
    /// Calls `f` when the value is `None`.
    fn log_none<F: FnOnce()>(self, f: F) -> Self;
}

impl<T> OptionLog for Option<T> {
    #[inline]
    fn log_none<F: FnOnce()>(self, f: F) -> Self {
        self.or_else(|| {
            f();
            None
        })
    }
}
