// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::PathBuf;

use svgscene::Document;
use svgscene_skia::tiny_skia;

const USAGE: &str = "\
svgscene - render SVG documents to PNG

Usage:
  svgscene [options] <input> [<output>]

  <input> is an SVG or SVGZ file, or '-' for stdin.
  <output> is a PNG file, or '-c' for stdout.
  It can be omitted only with --query-all.

Options:
  -w, --width PX           Scale the image to the width
  -h, --height PX          Scale the image to the height
  -z, --zoom FACTOR        Scale the image by a factor
      --dpi DPI            Resolution for absolute units, 10..=4000 [100]
      --background COLOR   Fill the image with a color first
      --resources-dir DIR  Base directory for relative image paths
                           [input file directory]
      --no-anti-alias      Render shapes without anti-aliasing
      --query-all          Print 'id,x,y,width,height' for every element
                           with an id and exit
      --quiet              Do not print warnings
  -V, --version            Print version
      --help               Print this text
";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}.", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = parse_args().map_err(|e| format!("{}\n\n{}", e, USAGE))?;

    // Warnings would be mixed with the query output.
    if !args.quiet && !args.query_all && log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Warn);
    }

    let mut doc = Document::new(svgscene::Options {
        resources_dir: args.resources_dir.clone(),
        dpi: args.dpi as f64,
        ..svgscene::Options::default()
    });

    let parsed = match args.input {
        Source::File(ref path) => doc.parse(path),
        Source::Stdin => doc.parse_file(std::io::stdin().lock()),
    };
    parsed.map_err(|e| e.to_string())?;

    let image = render(&args, &mut doc)?;

    if args.query_all {
        return print_bboxes(&doc);
    }

    match args.output {
        Some(Target::File(ref path)) => image.save_png(path).map_err(|e| e.to_string()),
        Some(Target::Stdout) => {
            let data = image.encode_png().map_err(|e| e.to_string())?;
            std::io::stdout()
                .lock()
                .write_all(&data)
                .map_err(|e| format!("cannot write to stdout: {}", e))
        }
        None => Ok(()),
    }
}

enum Source {
    Stdin,
    File(PathBuf),
}

enum Target {
    Stdout,
    File(PathBuf),
}

/// Output image scaling.
#[derive(Clone, Copy, PartialEq, Debug)]
enum Scale {
    Original,
    Width(u32),
    Height(u32),
    Exact(u32, u32),
    Zoom(f32),
}

impl Scale {
    /// Returns an image size for a document size.
    fn image_size(self, width: f64, height: f64) -> Option<(u32, u32)> {
        let (w, h) = match self {
            Scale::Original => (width, height),
            Scale::Width(w) => (w as f64, height * w as f64 / width),
            Scale::Height(h) => (width * h as f64 / height, h as f64),
            Scale::Exact(w, h) => (w as f64, h as f64),
            Scale::Zoom(z) => (width * z as f64, height * z as f64),
        };

        let (w, h) = (w.ceil(), h.ceil());
        let valid = |v: f64| v.is_finite() && v >= 1.0 && v <= u32::MAX as f64;
        if valid(w) && valid(h) {
            Some((w as u32, h as u32))
        } else {
            None
        }
    }
}

struct Args {
    input: Source,
    output: Option<Target>,
    scale: Scale,
    dpi: u32,
    background: Option<svgtypes::Color>,
    resources_dir: Option<PathBuf>,
    anti_alias: bool,
    query_all: bool,
    quiet: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut cli = pico_args::Arguments::from_env();

    if cli.contains("--help") {
        print!("{}", USAGE);
        std::process::exit(0);
    }

    if cli.contains(["-V", "--version"]) {
        println!("{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let e = |e: pico_args::Error| e.to_string();

    let width = cli.opt_value_from_fn(["-w", "--width"], positive_u32).map_err(e)?;
    let height = cli.opt_value_from_fn(["-h", "--height"], positive_u32).map_err(e)?;
    let zoom = cli.opt_value_from_fn(["-z", "--zoom"], positive_f32).map_err(e)?;
    let dpi = cli.opt_value_from_fn("--dpi", parse_dpi).map_err(e)?.unwrap_or(100);
    let background = cli.opt_value_from_str("--background").map_err(e)?;
    let resources_dir = cli.opt_value_from_str("--resources-dir").map_err(e)?;
    let anti_alias = !cli.contains("--no-anti-alias");
    let query_all = cli.contains("--query-all");
    let quiet = cli.contains("--quiet");

    let input: String = cli.free_from_str().map_err(e)?;
    let output: Option<String> = cli.opt_free_from_str().map_err(e)?;

    let input = match input.as_str() {
        "-" => Source::Stdin,
        "-c" => return Err("'-c' must follow the input".to_string()),
        _ => Source::File(input.into()),
    };

    let output = output.map(|s| match s.as_str() {
        "-c" => Target::Stdout,
        _ => Target::File(s.into()),
    });

    if output.is_none() && !query_all {
        return Err("an output file is required".to_string());
    }

    if matches!(input, Source::Stdin) && resources_dir.is_none() {
        eprintln!("Warning: relative image paths are resolved against the current directory.");
    }

    let scale = match (width, height, zoom) {
        (Some(w), Some(h), _) => Scale::Exact(w, h),
        (Some(w), None, _) => Scale::Width(w),
        (None, Some(h), _) => Scale::Height(h),
        (None, None, Some(z)) => Scale::Zoom(z),
        (None, None, None) => Scale::Original,
    };

    Ok(Args {
        input,
        output,
        scale,
        dpi,
        background,
        resources_dir,
        anti_alias,
        query_all,
        quiet,
    })
}

fn positive_u32(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{}' is not a positive integer", s)),
    }
}

fn positive_f32(s: &str) -> Result<f32, String> {
    match s.parse::<f32>() {
        Ok(n) if n > 0.0 && n.is_finite() => Ok(n),
        _ => Err(format!("'{}' is not a positive number", s)),
    }
}

fn parse_dpi(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(n) if (10..=4000).contains(&n) => Ok(n),
        _ => Err(format!("DPI '{}' is not in 10..=4000", s)),
    }
}

fn render(args: &Args, doc: &mut Document) -> Result<tiny_skia::Pixmap, String> {
    // Relative document sizes are resolved against a 100x100 viewport.
    let (doc_width, doc_height) = svgscene_skia::document_size(doc, (100.0, 100.0));
    let (width, height) = args
        .scale
        .image_size(doc_width, doc_height)
        .ok_or_else(|| format!("cannot scale a {}x{} document", doc_width, doc_height))?;

    let mut image = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| format!("cannot allocate a {}x{} image", width, height))?;

    if let Some(c) = args.background {
        image.fill(tiny_skia::Color::from_rgba8(c.red, c.green, c.blue, c.alpha));
    }

    let ts = tiny_skia::Transform::from_scale(
        (width as f64 / doc_width) as f32,
        (height as f64 / doc_height) as f32,
    );

    let mut engine =
        svgscene_skia::SkiaEngine::new(width, height, ts).map_err(|e| e.to_string())?;
    engine.set_options(&doc.options);
    engine.anti_alias = args.anti_alias;
    doc.render(&mut engine).map_err(|e| e.to_string())?;

    image.draw_pixmap(
        0,
        0,
        engine.canvas().as_ref(),
        &tiny_skia::PixmapPaint::default(),
        tiny_skia::Transform::identity(),
        None,
    );

    Ok(image)
}

fn print_bboxes(doc: &Document) -> Result<(), String> {
    let tree = doc.tree();
    let root = tree.root().ok_or("the document is empty")?;

    let round = |v: f64| (v * 1000.0).round() / 1000.0;

    let mut found = false;
    for node in tree.descendants(root).into_iter().filter_map(|id| tree.node(id)) {
        let id = match node.id() {
            Some(v) => v,
            None => continue,
        };
        found = true;

        if let Some(bbox) = node.bounding_box() {
            println!(
                "{},{},{},{},{}",
                id,
                round(bbox.left),
                round(bbox.top),
                round(bbox.width()),
                round(bbox.height())
            );
        }
    }

    if found {
        Ok(())
    } else {
        Err("the document has no elements with an id".to_string())
    }
}

static LOGGER: StderrLogger = StderrLogger;

/// Prints warnings and errors to stderr.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let label = match record.level() {
            log::Level::Error => "Error",
            _ => "Warning",
        };

        eprintln!(
            "{} ({}:{}): {}",
            label,
            record.module_path().unwrap_or_else(|| record.target()),
            record.line().unwrap_or(0),
            record.args()
        );
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size() {
        assert_eq!(Scale::Original.image_size(10.5, 20.0), Some((11, 20)));
        assert_eq!(Scale::Width(20).image_size(10.0, 5.0), Some((20, 10)));
        assert_eq!(Scale::Height(20).image_size(10.0, 5.0), Some((40, 20)));
        assert_eq!(Scale::Exact(3, 4).image_size(10.0, 5.0), Some((3, 4)));
        assert_eq!(Scale::Zoom(0.5).image_size(10.0, 4.0), Some((5, 2)));
        assert_eq!(Scale::Original.image_size(0.0, 10.0), None);
        assert_eq!(Scale::Width(10).image_size(0.0, 10.0), None);
    }

    #[test]
    fn option_values() {
        assert_eq!(positive_u32("12"), Ok(12));
        assert!(positive_u32("0").is_err());
        assert!(positive_f32("-1").is_err());
        assert_eq!(parse_dpi("96"), Ok(96));
        assert!(parse_dpi("5").is_err());
    }
}
