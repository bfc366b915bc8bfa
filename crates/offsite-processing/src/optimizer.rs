//! Best-effort image shrinking.
//!
//! Images are decoded, scaled down to fit the configured bounding box,
//! and re-encoded at the configured quality. The optimized bytes are
//! used only when they are strictly smaller than the input; any failure
//! along the way keeps the original bytes.

use std::io::Cursor;

use anyhow::Result;
use bytes::Bytes;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, DynamicImage, Frame, GenericImageView, ImageFormat, ImageReader};
use img_parts::{jpeg::Jpeg, png::Png, webp::WebP, ImageEXIF};
use offsite_core::OptimizationSettings;

use crate::format::resolve_output_format;

const SVG_CONTENT_TYPE: &str = "image/svg+xml";
const GIF_ENCODE_SPEED: i32 = 10;

pub struct ImageOptimizer {
    settings: OptimizationSettings,
}

impl ImageOptimizer {
    pub fn new(settings: OptimizationSettings) -> Self {
        Self { settings }
    }

    /// Optimize `content`, returning the original bytes when the result
    /// is not strictly smaller or when optimization fails. SVG is vector
    /// data and passes through untouched.
    pub fn optimize(&self, content: &Bytes, content_type: &str) -> Bytes {
        if content_type == SVG_CONTENT_TYPE {
            return content.clone();
        }

        match self.shrink(content, content_type) {
            Ok(optimized) if optimized.len() < content.len() => Bytes::from(optimized),
            Ok(_) => content.clone(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    content_type = %content_type,
                    size_bytes = content.len(),
                    "image optimization failed, keeping original"
                );
                content.clone()
            }
        }
    }

    fn shrink(&self, content: &Bytes, content_type: &str) -> Result<Vec<u8>> {
        let reader = ImageReader::new(Cursor::new(content.as_ref())).with_guessed_format()?;
        let detected = reader.format();
        let exif = read_exif(content);

        let format = resolve_output_format(content_type, detected)?;

        let img = reader.decode()?;
        let (width, height) = img.dimensions();
        let (target_width, target_height) = target_dimensions(
            width,
            height,
            self.settings.max_width,
            self.settings.max_height,
        );

        // Animated GIF frames are lost on a plain decode, so that path
        // re-encodes from the raw bytes frame by frame.
        if format == ImageFormat::Gif && detected == Some(ImageFormat::Gif) {
            return resize_gif(content, target_width, target_height);
        }

        let img = if (target_width, target_height) != (width, height) {
            img.resize_exact(target_width, target_height, FilterType::Lanczos3)
        } else {
            img
        };

        let encoded = self.encode(&img, format)?;
        Ok(write_exif(encoded, format, exif))
    }

    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        match format {
            ImageFormat::Jpeg => self.encode_jpeg(img),
            ImageFormat::WebP => self.encode_webp(img),
            other => {
                let mut buffer = Vec::new();
                img.write_to(&mut Cursor::new(&mut buffer), other)?;
                Ok(buffer)
            }
        }
    }

    fn encode_jpeg(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(self.settings.quality as f32);
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(jpeg_data)
    }

    fn encode_webp(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(self.settings.quality as f32);

        Ok(webp_data.to_vec())
    }
}

/// Fit `width` x `height` into the bounding box, never upscaling and
/// preserving the aspect ratio.
fn target_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let aspect = width as f64 / height as f64;
    let box_aspect = max_width as f64 / max_height as f64;

    if aspect > box_aspect {
        let target_height = ((max_width as f64 / aspect).round() as u32).max(1);
        (max_width, target_height)
    } else {
        let target_width = ((max_height as f64 * aspect).round() as u32).max(1);
        (target_width, max_height)
    }
}

fn resize_gif(content: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let decoder = GifDecoder::new(Cursor::new(content))?;
    let frames = decoder.into_frames().collect_frames()?;

    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut buffer, GIF_ENCODE_SPEED);
        encoder.set_repeat(Repeat::Infinite)?;
        for frame in frames {
            let delay = frame.delay();
            let resized = imageops::resize(frame.buffer(), width, height, FilterType::Lanczos3);
            encoder.encode_frame(Frame::from_parts(resized, 0, 0, delay))?;
        }
    }

    Ok(buffer)
}

fn read_exif(content: &[u8]) -> Option<Bytes> {
    if let Ok(jpeg) = Jpeg::from_bytes(content.to_vec().into()) {
        return jpeg.exif();
    }
    if let Ok(png) = Png::from_bytes(content.to_vec().into()) {
        return png.exif();
    }
    if let Ok(webp) = WebP::from_bytes(content.to_vec().into()) {
        return webp.exif();
    }
    None
}

/// Reattach EXIF metadata stripped by re-encoding. Formats without an
/// EXIF container keep the encoded bytes as they are.
fn write_exif(encoded: Vec<u8>, format: ImageFormat, exif: Option<Bytes>) -> Vec<u8> {
    let Some(exif) = exif else {
        return encoded;
    };

    match format {
        ImageFormat::Jpeg => match Jpeg::from_bytes(encoded.clone().into()) {
            Ok(mut jpeg) => {
                jpeg.set_exif(Some(exif));
                jpeg.encoder().bytes().to_vec()
            }
            Err(_) => encoded,
        },
        ImageFormat::Png => match Png::from_bytes(encoded.clone().into()) {
            Ok(mut png) => {
                png.set_exif(Some(exif));
                png.encoder().bytes().to_vec()
            }
            Err(_) => encoded,
        },
        ImageFormat::WebP => match WebP::from_bytes(encoded.clone().into()) {
            Ok(mut webp) => {
                webp.set_exif(Some(exif));
                webp.encoder().bytes().to_vec()
            }
            Err(_) => encoded,
        },
        _ => encoded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{Delay, Rgb, RgbImage, Rgba, RgbaImage};

    fn test_settings() -> OptimizationSettings {
        OptimizationSettings {
            enabled: true,
            quality: 85,
            max_width: 320,
            max_height: 180,
        }
    }

    fn noisy_rgb(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 7 + y * 13) as u8,
                (x * 3 + y * 11) as u8,
                (x * 5 + y * 2) as u8,
            ])
        })
    }

    fn jpeg_bytes(img: &RgbImage, quality: u8) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
        img.write_with_encoder(encoder).unwrap();
        buffer
    }

    fn encoded_bytes(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn decode(data: &[u8]) -> (DynamicImage, Option<ImageFormat>) {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .unwrap();
        let format = reader.format();
        (reader.decode().unwrap(), format)
    }

    #[test]
    fn test_target_dimensions() {
        // Inside the box stays untouched.
        assert_eq!(target_dimensions(800, 600, 2560, 1440), (800, 600));
        assert_eq!(target_dimensions(2560, 1440, 2560, 1440), (2560, 1440));

        // Wider than the box aspect clamps the width.
        assert_eq!(target_dimensions(5120, 2160, 2560, 1440), (2560, 1080));
        assert_eq!(target_dimensions(2561, 1440, 2560, 1440), (2560, 1439));

        // Taller than the box aspect clamps the height.
        assert_eq!(target_dimensions(2000, 4000, 2560, 1440), (720, 1440));
        assert_eq!(target_dimensions(5120, 2880, 2560, 1440), (2560, 1440));

        // Degenerate aspect ratios never collapse to zero.
        assert_eq!(target_dimensions(100_000, 10, 2560, 1440), (2560, 1));
    }

    #[test]
    fn test_svg_passes_through() {
        let optimizer = ImageOptimizer::new(test_settings());
        let svg = Bytes::from_static(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>");

        let out = optimizer.optimize(&svg, "image/svg+xml");
        assert_eq!(out, svg);
    }

    #[test]
    fn test_jpeg_within_box_keeps_dimensions() {
        let optimizer = ImageOptimizer::new(test_settings());
        let original = Bytes::from(jpeg_bytes(&noisy_rgb(300, 150), 100));

        let out = optimizer.optimize(&original, "image/jpeg");
        assert!(out.len() < original.len());

        let (img, format) = decode(&out);
        assert_eq!(format, Some(ImageFormat::Jpeg));
        assert_eq!(img.dimensions(), (300, 150));
    }

    #[test]
    fn test_wide_jpeg_is_scaled_to_box_width() {
        let optimizer = ImageOptimizer::new(test_settings());
        let original = Bytes::from(jpeg_bytes(&noisy_rgb(640, 270), 100));

        let out = optimizer.optimize(&original, "image/jpeg");
        let (img, _) = decode(&out);
        assert_eq!(img.dimensions(), (320, 135));
    }

    #[test]
    fn test_tall_png_is_scaled_to_box_height() {
        let optimizer = ImageOptimizer::new(test_settings());
        let original = Bytes::from(encoded_bytes(&noisy_rgb(200, 400), ImageFormat::Png));

        let out = optimizer.optimize(&original, "image/png");
        let (img, format) = decode(&out);
        assert_eq!(format, Some(ImageFormat::Png));
        assert_eq!(img.dimensions(), (90, 180));
    }

    #[test]
    fn test_not_smaller_keeps_original() {
        let optimizer = ImageOptimizer::new(test_settings());
        // Re-encoding the same pixels as BMP reproduces the input, which
        // is not strictly smaller.
        let original = Bytes::from(encoded_bytes(&noisy_rgb(10, 10), ImageFormat::Bmp));

        let out = optimizer.optimize(&original, "image/bmp");
        assert_eq!(out, original);
    }

    #[test]
    fn test_generic_content_type_falls_back_to_detected_format() {
        let optimizer = ImageOptimizer::new(test_settings());
        let original = Bytes::from(encoded_bytes(&noisy_rgb(400, 400), ImageFormat::Png));

        let out = optimizer.optimize(&original, "application/octet-stream");
        let (img, format) = decode(&out);
        assert_eq!(format, Some(ImageFormat::Png));
        assert_eq!(img.dimensions(), (180, 180));
    }

    #[test]
    fn test_unsupported_content_type_keeps_original() {
        let optimizer = ImageOptimizer::new(test_settings());
        let original = Bytes::from(encoded_bytes(&noisy_rgb(50, 50), ImageFormat::Png));

        let out = optimizer.optimize(&original, "image/heic");
        assert_eq!(out, original);
    }

    #[test]
    fn test_undecodable_bytes_keep_original() {
        let optimizer = ImageOptimizer::new(test_settings());
        let original = Bytes::from_static(b"definitely not an image");

        let out = optimizer.optimize(&original, "image/png");
        assert_eq!(out, original);
    }

    #[test]
    fn test_exif_survives_resize() {
        let optimizer = ImageOptimizer::new(test_settings());
        let payload = Bytes::from_static(b"camera metadata payload");

        let mut jpeg = Jpeg::from_bytes(jpeg_bytes(&noisy_rgb(640, 100), 100).into()).unwrap();
        jpeg.set_exif(Some(payload.clone()));
        let original = Bytes::from(jpeg.encoder().bytes().to_vec());

        let out = optimizer.optimize(&original, "image/jpeg");
        assert!(out.len() < original.len());

        let (img, _) = decode(&out);
        assert_eq!(img.dimensions(), (320, 50));

        let reparsed = Jpeg::from_bytes(out.to_vec().into()).unwrap();
        assert_eq!(reparsed.exif(), Some(payload));
    }

    #[test]
    fn test_animated_gif_keeps_every_frame() {
        let optimizer = ImageOptimizer::new(test_settings());

        let mut raw = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut raw);
            encoder.set_repeat(Repeat::Infinite).unwrap();
            for seed in [0u8, 128] {
                let frame_img = RgbaImage::from_fn(640, 320, |x, y| {
                    Rgba([(x * 7 + y * 13) as u8 ^ seed, (x * 3) as u8, (y * 5) as u8, 255])
                });
                let delay = Delay::from_numer_denom_ms(100, 1);
                encoder
                    .encode_frame(Frame::from_parts(frame_img, 0, 0, delay))
                    .unwrap();
            }
        }
        let original = Bytes::from(raw);

        let out = optimizer.optimize(&original, "image/gif");
        assert!(out.len() < original.len());

        let decoder = GifDecoder::new(Cursor::new(out.as_ref())).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 2);
        for frame in &frames {
            assert_eq!(frame.buffer().dimensions(), (320, 160));
        }
    }
}
