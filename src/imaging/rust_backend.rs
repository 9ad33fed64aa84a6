//! Pure Rust codec backend — zero external dependencies.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format detection | `image::guess_format` (magic bytes) |
//! | Dimensions | `ImageReader::into_dimensions` (header only, format sniffed) |
//! | Decode (JPEG, PNG) | `image::ImageReader` |
//! | Resize | `DynamicImage::resize_exact` with `Triangle` filter |
//! | Sharpening | `DynamicImage::unsharpen` |
//! | Encode → JPEG | `JpegEncoder` (baseline, never progressive) |
//! | Encode → PNG | `PngEncoder` (best compression, adaptive filter, no ancillary chunks) |
//! | GIF | `GifDecoder` frames → `GifEncoder`, no resize, animation preserved |

use super::backend::{CodecError, Dimensions, ImageCodec, SourceFormat};
use super::calculations::fit_within;
use super::params::{RenderParams, RenderRecipe};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Largest output a resize may produce, in pixels (8000x8000).
///
/// Requested sizes are unbounded `u32`s and may upscale, so the target is
/// checked before any buffer is allocated.
pub const MAX_OUTPUT_PIXELS: u64 = 64_000_000;

/// Pure Rust codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn image_format(format: SourceFormat) -> ImageFormat {
    match format {
        SourceFormat::Jpeg => ImageFormat::Jpeg,
        SourceFormat::Png => ImageFormat::Png,
        SourceFormat::Gif => ImageFormat::Gif,
    }
}

fn processing_failed(what: &str, path: &Path, e: impl std::fmt::Display) -> CodecError {
    CodecError::ProcessingFailed(format!("{what} {}: {e}", path.display()))
}

/// Load and decode a still image, trusting the probed format over the extension.
fn load_image(path: &Path, format: SourceFormat) -> Result<DynamicImage, CodecError> {
    let mut reader = ImageReader::open(path)?;
    reader.set_format(image_format(format));
    reader
        .decode()
        .map_err(|e| processing_failed("Failed to decode", path, e))
}

/// Encode `img` in `format` at `path` following the recipe.
///
/// The `image` encoders never write EXIF, text chunks or ICC profiles, and
/// always emit 8-bit sRGB, so metadata stripping and colorspace are implicit.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    format: SourceFormat,
    recipe: &RenderRecipe,
) -> Result<(), CodecError> {
    let writer = BufWriter::new(File::create(path)?);
    let result = match format {
        SourceFormat::Jpeg => {
            // Baseline JPEG: progressive (interlaced) output is never produced.
            let encoder = JpegEncoder::new_with_quality(writer, recipe.quality.value() as u8);
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        SourceFormat::Png => {
            // Adam7 interlacing is not supported by the encoder, so output is never interlaced.
            let encoder =
                PngEncoder::new_with_quality(writer, CompressionType::Best, PngFilter::Adaptive);
            if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(encoder)
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
            }
        }
        SourceFormat::Gif => {
            return Err(CodecError::ProcessingFailed(
                "GIF output goes through the frame re-encoder".into(),
            ));
        }
    };
    result.map_err(|e| processing_failed("Failed to encode", path, e))
}

/// Re-encode every frame of a GIF without resizing.
///
/// Frame-aware resizing is not implemented; GIF versions are always
/// recompress-only at source size.
fn recompress_gif(source: &Path, output: &Path) -> Result<(), CodecError> {
    let decoder = GifDecoder::new(BufReader::new(File::open(source)?))
        .map_err(|e| processing_failed("Failed to decode", source, e))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| processing_failed("Failed to read frames of", source, e))?;

    let writer = BufWriter::new(File::create(output)?);
    let mut encoder = GifEncoder::new_with_speed(writer, 10);
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|e| processing_failed("Failed to encode", output, e))?;
    encoder
        .encode_frames(frames)
        .map_err(|e| processing_failed("Failed to encode", output, e))
}

impl ImageCodec for RustCodec {
    fn probe_format(&self, bytes: &[u8]) -> Option<String> {
        image::guess_format(bytes)
            .ok()
            .map(|format| format.to_mime_type().to_string())
    }

    fn probe_dimensions(&self, path: &Path) -> Result<Dimensions, CodecError> {
        // Sniff the signature rather than trusting the extension
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| processing_failed("Failed to read dimensions of", path, e))?;
        Ok(Dimensions { width, height })
    }

    fn render(&self, params: &RenderParams) -> Result<(), CodecError> {
        if params.format == SourceFormat::Gif {
            return recompress_gif(&params.source, &params.output);
        }

        let img = load_image(&params.source, params.format)?;
        let source_dims = Dimensions {
            width: img.width(),
            height: img.height(),
        };

        let resized = match params.resize.and_then(|target| fit_within(source_dims, target)) {
            Some(Dimensions { width, height }) => {
                if width as u64 * height as u64 > MAX_OUTPUT_PIXELS {
                    return Err(CodecError::ProcessingFailed(format!(
                        "resize to {width}x{height} exceeds the {MAX_OUTPUT_PIXELS} pixel limit"
                    )));
                }
                img.resize_exact(width, height, FilterType::Triangle)
            }
            None => img,
        };

        let sharpening = params.recipe.sharpening;
        let sharpened = resized.unsharpen(sharpening.sigma, sharpening.threshold);

        save_image(&sharpened, &params.output, params.format, &params.recipe)
    }
}
