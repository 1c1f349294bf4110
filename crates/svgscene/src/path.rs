// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use svgtypes::PathSegment;

use crate::{Error, RenderEngine};

/// An absolute path command.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PathCommand {
    MoveTo {
        x: f64,
        y: f64,
    },
    LineTo {
        x: f64,
        y: f64,
    },
    CurveTo {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x: f64,
        y: f64,
    },
    Quadratic {
        x1: f64,
        y1: f64,
        x: f64,
        y: f64,
    },
    ArcTo {
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep: bool,
        x: f64,
        y: f64,
    },
    ClosePath,
}

/// Parses path data into a list of absolute commands.
///
/// Relative, horizontal, vertical and smooth segments are resolved.
/// Like in SVG, a malformed segment terminates the path and everything
/// parsed before it is kept, unless nothing was parsed at all.
pub fn parse_path_data(text: &str) -> Result<Vec<PathCommand>, Error> {
    let mut commands = Vec::new();

    // Current point.
    let mut px = 0.0;
    let mut py = 0.0;
    // Current subpath start.
    let mut sx = 0.0;
    let mut sy = 0.0;
    // Last control point, used for reflection by smooth segments.
    let mut prev_cubic: Option<(f64, f64)> = None;
    let mut prev_quad: Option<(f64, f64)> = None;

    for segment in svgtypes::PathParser::from(text) {
        let segment = match segment {
            Ok(v) => v,
            Err(_) => {
                if commands.is_empty() {
                    return Err(Error::parse("path data", text));
                }

                log::warn!("Path data '{}' is malformed. Truncated.", text);
                break;
            }
        };

        // Only the first segment resets the reflection state, so keep both.
        let mut cubic = None;
        let mut quad = None;

        match segment {
            PathSegment::MoveTo { abs, x, y } => {
                let (x, y) = to_abs(abs, px, py, x, y);
                commands.push(PathCommand::MoveTo { x, y });
                px = x;
                py = y;
                sx = x;
                sy = y;
            }
            PathSegment::LineTo { abs, x, y } => {
                let (x, y) = to_abs(abs, px, py, x, y);
                commands.push(PathCommand::LineTo { x, y });
                px = x;
                py = y;
            }
            PathSegment::HorizontalLineTo { abs, x } => {
                let x = if abs { x } else { px + x };
                commands.push(PathCommand::LineTo { x, y: py });
                px = x;
            }
            PathSegment::VerticalLineTo { abs, y } => {
                let y = if abs { y } else { py + y };
                commands.push(PathCommand::LineTo { x: px, y });
                py = y;
            }
            PathSegment::CurveTo {
                abs,
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                let (x1, y1) = to_abs(abs, px, py, x1, y1);
                let (x2, y2) = to_abs(abs, px, py, x2, y2);
                let (x, y) = to_abs(abs, px, py, x, y);
                commands.push(PathCommand::CurveTo {
                    x1,
                    y1,
                    x2,
                    y2,
                    x,
                    y,
                });
                cubic = Some((x2, y2));
                px = x;
                py = y;
            }
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => {
                let (x1, y1) = reflect(prev_cubic, px, py);
                let (x2, y2) = to_abs(abs, px, py, x2, y2);
                let (x, y) = to_abs(abs, px, py, x, y);
                commands.push(PathCommand::CurveTo {
                    x1,
                    y1,
                    x2,
                    y2,
                    x,
                    y,
                });
                cubic = Some((x2, y2));
                px = x;
                py = y;
            }
            PathSegment::Quadratic { abs, x1, y1, x, y } => {
                let (x1, y1) = to_abs(abs, px, py, x1, y1);
                let (x, y) = to_abs(abs, px, py, x, y);
                commands.push(PathCommand::Quadratic { x1, y1, x, y });
                quad = Some((x1, y1));
                px = x;
                py = y;
            }
            PathSegment::SmoothQuadratic { abs, x, y } => {
                let (x1, y1) = reflect(prev_quad, px, py);
                let (x, y) = to_abs(abs, px, py, x, y);
                commands.push(PathCommand::Quadratic { x1, y1, x, y });
                quad = Some((x1, y1));
                px = x;
                py = y;
            }
            PathSegment::EllipticalArc {
                abs,
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                x,
                y,
            } => {
                let (x, y) = to_abs(abs, px, py, x, y);
                commands.push(PathCommand::ArcTo {
                    rx,
                    ry,
                    x_axis_rotation,
                    large_arc,
                    sweep,
                    x,
                    y,
                });
                px = x;
                py = y;
            }
            PathSegment::ClosePath { .. } => {
                if commands.last() != Some(&PathCommand::ClosePath) {
                    commands.push(PathCommand::ClosePath);
                }

                px = sx;
                py = sy;
            }
        }

        prev_cubic = cubic;
        prev_quad = quad;
    }

    Ok(commands)
}

#[inline]
fn to_abs(abs: bool, px: f64, py: f64, x: f64, y: f64) -> (f64, f64) {
    if abs {
        (x, y)
    } else {
        (px + x, py + y)
    }
}

#[inline]
fn reflect(prev: Option<(f64, f64)>, px: f64, py: f64) -> (f64, f64) {
    match prev {
        Some((x, y)) => (px * 2.0 - x, py * 2.0 - y),
        None => (px, py),
    }
}

pub(crate) fn emit(commands: &[PathCommand], engine: &mut dyn RenderEngine) -> Result<(), Error> {
    for cmd in commands {
        match *cmd {
            PathCommand::MoveTo { x, y } => engine.move_to(x, y)?,
            PathCommand::LineTo { x, y } => engine.line_to(x, y)?,
            PathCommand::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => engine.curve_to(x1, y1, x2, y2, x, y)?,
            PathCommand::Quadratic { x1, y1, x, y } => engine.quadratic_curve_to(x1, y1, x, y)?,
            PathCommand::ArcTo {
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                x,
                y,
            } => engine.arc_to(rx, ry, x_axis_rotation, large_arc, sweep, x, y)?,
            PathCommand::ClosePath => engine.close_path()?,
        }
    }

    Ok(())
}
