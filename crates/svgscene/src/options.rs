// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// Processing options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Directory that will be used during relative paths resolving.
    ///
    /// Expected to be the same as the directory that contains the SVG file,
    /// but can be set to any.
    /// `Document::parse` sets it to the input file directory when unset.
    ///
    /// Default: `None`
    pub resources_dir: Option<std::path::PathBuf>,

    /// Target DPI.
    ///
    /// Impacts units conversion.
    ///
    /// Default: 100.0
    pub dpi: f64,

    /// A default font size.
    ///
    /// Used to resolve `em` and `ex` units when no `font-size` is set.
    ///
    /// Default: 10
    pub font_size: f64,

    /// Enables backend path caching for `path` elements.
    ///
    /// Default: false
    pub path_cache: bool,

    /// Disables `<style>` sheets processing.
    ///
    /// Only `style` attributes and presentation attributes will be used.
    ///
    /// Default: false
    pub ignore_style_sheets: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            resources_dir: None,
            dpi: 100.0,
            font_size: 10.0,
            path_cache: false,
            ignore_style_sheets: false,
        }
    }
}

impl Options {
    /// Converts a relative path into absolute relative to the SVG file itself.
    ///
    /// If `Options::resources_dir` is not set, returns itself.
    pub fn get_abs_path(&self, rel_path: &std::path::Path) -> std::path::PathBuf {
        match self.resources_dir {
            Some(ref dir) => dir.join(rel_path),
            None => rel_path.into(),
        }
    }
}
