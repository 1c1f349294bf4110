// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use rgb::RGBA8;

use crate::{OptionLog, Options};

/// A decoded raster image.
///
/// Pixels are stored row by row, with unpremultiplied alpha.
#[derive(Clone, PartialEq, Debug)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height` pixels.
    pub pixels: Vec<RGBA8>,
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum ImageFormat {
    PNG,
    JPEG,
    GIF,
}

/// Loads an `href` content.
///
/// Supports data URLs and local files. Relative paths are resolved
/// using [`Options::get_abs_path`].
pub(crate) fn load(href: &str, opt: &Options) -> Option<RasterImage> {
    let data = if let Ok(url) = data_url::DataUrl::process(href) {
        let (data, _) = url
            .decode_to_vec()
            .ok()
            .log_none(|| log::warn!("Failed to decode an image data URL."))?;
        data
    } else {
        let path = opt.get_abs_path(std::path::Path::new(href));
        match std::fs::read(&path) {
            Ok(data) => data,
            Err(_) => {
                log::warn!("Failed to load '{}'. Skipped.", href);
                return None;
            }
        }
    };

    let format = get_image_data_format(&data)
        .log_none(|| log::warn!("'{}' is not a PNG, JPEG or GIF image.", short_href(href)))?;

    decode(format, &data).log_none(|| log::warn!("Failed to decode '{}'.", short_href(href)))
}

// Data URLs can be huge.
fn short_href(href: &str) -> &str {
    match href.char_indices().nth(64) {
        Some((idx, _)) => &href[..idx],
        None => href,
    }
}

fn get_image_data_format(data: &[u8]) -> Option<ImageFormat> {
    match imagesize::image_type(data).ok()? {
        imagesize::ImageType::Gif => Some(ImageFormat::GIF),
        imagesize::ImageType::Jpeg => Some(ImageFormat::JPEG),
        imagesize::ImageType::Png => Some(ImageFormat::PNG),
        _ => None,
    }
}

#[cfg(feature = "raster-images")]
fn decode(format: ImageFormat, data: &[u8]) -> Option<RasterImage> {
    match format {
        ImageFormat::PNG => raster_images::decode_png(data),
        ImageFormat::JPEG => raster_images::decode_jpeg(data),
        ImageFormat::GIF => raster_images::decode_gif(data),
    }
}

#[cfg(not(feature = "raster-images"))]
fn decode(format: ImageFormat, _: &[u8]) -> Option<RasterImage> {
    log::warn!("{:?} decoding is disabled by a build feature.", format);
    None
}

#[cfg(feature = "raster-images")]
mod raster_images {
    use rgb::{FromSlice, RGBA8};

    use super::RasterImage;

    pub fn decode_png(data: &[u8]) -> Option<RasterImage> {
        let mut decoder = png::Decoder::new(data);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info().ok()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).ok()?;
        let data = &buf[..info.buffer_size()];

        let pixels = match info.color_type {
            png::ColorType::Rgb => from_rgb(data),
            png::ColorType::Rgba => data.as_rgba().to_vec(),
            png::ColorType::Grayscale => from_gray(data),
            png::ColorType::GrayscaleAlpha => data
                .chunks_exact(2)
                .map(|p| RGBA8::new(p[0], p[0], p[0], p[1]))
                .collect(),
            png::ColorType::Indexed => {
                log::warn!("Indexed PNG must be expanded.");
                return None;
            }
        };

        make(info.width, info.height, pixels)
    }

    pub fn decode_jpeg(data: &[u8]) -> Option<RasterImage> {
        let mut decoder = jpeg_decoder::Decoder::new(data);
        let img_data = decoder.decode().ok()?;
        let info = decoder.info()?;

        let pixels = match info.pixel_format {
            jpeg_decoder::PixelFormat::RGB24 => from_rgb(&img_data),
            jpeg_decoder::PixelFormat::L8 => from_gray(&img_data),
            _ => return None,
        };

        make(u32::from(info.width), u32::from(info.height), pixels)
    }

    pub fn decode_gif(data: &[u8]) -> Option<RasterImage> {
        let mut decoder = gif::DecodeOptions::new();
        decoder.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = decoder.read_info(data).ok()?;
        let first_frame = decoder.read_next_frame().ok()??;

        make(
            u32::from(first_frame.width),
            u32::from(first_frame.height),
            first_frame.buffer.as_rgba().to_vec(),
        )
    }

    fn from_rgb(data: &[u8]) -> Vec<RGBA8> {
        data.as_rgb()
            .iter()
            .map(|p| RGBA8::new(p.r, p.g, p.b, 255))
            .collect()
    }

    fn from_gray(data: &[u8]) -> Vec<RGBA8> {
        data.iter().map(|g| RGBA8::new(*g, *g, *g, 255)).collect()
    }

    fn make(width: u32, height: u32, pixels: Vec<RGBA8>) -> Option<RasterImage> {
        if width == 0 || height == 0 || pixels.len() != (width * height) as usize {
            return None;
        }

        Some(RasterImage {
            width,
            height,
            pixels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_data() {
        assert!(load("data:text/plain;base64,SGVsbG8=", &Options::default()).is_none());
        assert!(load("missing-file.png", &Options::default()).is_none());
    }

    #[test]
    fn short_href_is_bounded() {
        let href = "x".repeat(100);
        assert_eq!(short_href(&href).len(), 64);
        assert_eq!(short_href("abc"), "abc");
    }
}
