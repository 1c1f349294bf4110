// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tiny_skia::{Path, PathBuilder, Rect};

pub(crate) trait PathBuilderExt {
    #[allow(clippy::too_many_arguments)]
    fn arc_to(
        &mut self,
        rx: f32,
        ry: f32,
        x_axis_rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    );
}

impl PathBuilderExt for PathBuilder {
    fn arc_to(
        &mut self,
        rx: f32,
        ry: f32,
        x_axis_rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    ) {
        let prev = match self.last_point() {
            Some(v) => v,
            None => return,
        };

        let svg_arc = kurbo::SvgArc {
            from: kurbo::Point::new(prev.x as f64, prev.y as f64),
            to: kurbo::Point::new(x as f64, y as f64),
            radii: kurbo::Vec2::new(rx as f64, ry as f64),
            x_rotation: (x_axis_rotation as f64).to_radians(),
            large_arc,
            sweep,
        };

        // A degenerated arc is a straight line.
        match kurbo::Arc::from_svg_arc(&svg_arc) {
            Some(arc) => {
                arc.to_cubic_beziers(0.1, |p1, p2, p| {
                    self.cubic_to(
                        p1.x as f32,
                        p1.y as f32,
                        p2.x as f32,
                        p2.y as f32,
                        p.x as f32,
                        p.y as f32,
                    );
                });
            }
            None => {
                self.line_to(x, y);
            }
        }
    }
}

/// Builds a rectangle with optionally rounded corners.
///
/// Radii are clamped to the half of the size.
pub(crate) fn rect_to_path(x: f32, y: f32, width: f32, height: f32, rx: f32, ry: f32) -> Option<Path> {
    if !(width > 0.0 && height > 0.0) {
        return None;
    }

    let rx = rx.max(0.0).min(width / 2.0);
    let ry = ry.max(0.0).min(height / 2.0);

    if rx == 0.0 || ry == 0.0 {
        return Some(PathBuilder::from_rect(Rect::from_xywh(x, y, width, height)?));
    }

    let mut builder = PathBuilder::new();
    builder.move_to(x + rx, y);

    builder.line_to(x + width - rx, y);
    builder.arc_to(rx, ry, 0.0, false, true, x + width, y + ry);

    builder.line_to(x + width, y + height - ry);
    builder.arc_to(rx, ry, 0.0, false, true, x + width - rx, y + height);

    builder.line_to(x + rx, y + height);
    builder.arc_to(rx, ry, 0.0, false, true, x, y + height - ry);

    builder.line_to(x, y + ry);
    builder.arc_to(rx, ry, 0.0, false, true, x + rx, y);

    builder.close();
    builder.finish()
}

pub(crate) fn ellipse_to_path(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Path> {
    if !(rx > 0.0 && ry > 0.0) {
        return None;
    }

    let mut builder = PathBuilder::new();
    builder.move_to(cx + rx, cy);
    builder.arc_to(rx, ry, 0.0, false, true, cx, cy + ry);
    builder.arc_to(rx, ry, 0.0, false, true, cx - rx, cy);
    builder.arc_to(rx, ry, 0.0, false, true, cx, cy - ry);
    builder.arc_to(rx, ry, 0.0, false, true, cx + rx, cy);
    builder.close();
    builder.finish()
}

pub(crate) fn line_to_path(x1: f32, y1: f32, x2: f32, y2: f32) -> Option<Path> {
    let mut builder = PathBuilder::new();
    builder.move_to(x1, y1);
    builder.line_to(x2, y2);
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounded_rect_radii_are_clamped() {
        let path = rect_to_path(0.0, 0.0, 10.0, 20.0, 50.0, 50.0).unwrap();
        let bounds = path.bounds();
        assert!((bounds.width() - 10.0).abs() < 0.01);
        assert!((bounds.height() - 20.0).abs() < 0.01);
    }

    #[test]
    fn zero_sized_shapes() {
        assert!(rect_to_path(0.0, 0.0, 0.0, 10.0, 0.0, 0.0).is_none());
        assert!(ellipse_to_path(5.0, 5.0, 0.0, 2.0).is_none());
    }

    #[test]
    fn ellipse_bounds() {
        let path = ellipse_to_path(50.0, 40.0, 20.0, 10.0).unwrap();
        let bounds = path.bounds();
        assert!((bounds.left() - 30.0).abs() < 0.01);
        assert!((bounds.top() - 30.0).abs() < 0.01);
        assert!((bounds.right() - 70.0).abs() < 0.01);
        assert!((bounds.bottom() - 50.0).abs() < 0.01);
    }
}
