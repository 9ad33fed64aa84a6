//! Shared test utilities for the image-versions test suite.
//!
//! Provides synthetic image writers (real encoded files, via the `image`
//! crate) and fixture-directory builders for the mock codec, which reads
//! the mime type straight out of the file contents.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let src = mock_source_dir(tmp.path(), &[("dawn.jpg", "image/jpeg")]);
//! create_test_jpeg(&tmp.path().join("real.jpg"), 200, 150);
//! ```

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageEncoder, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write a small valid JPEG with a smooth gradient (compresses well).
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    write_jpeg(path, &gradient(width, height), 90);
}

/// Write a JPEG filled with pseudo-random noise at maximum quality.
///
/// Noise defeats JPEG compression, so even modest dimensions produce files
/// well above the low-quality-source threshold.
pub fn create_noisy_jpeg(path: &Path, width: u32, height: u32) {
    let mut state: u32 = 0x9E37_79B9;
    let img = RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xFF) as u8
        };
        image::Rgb([next(), next(), next()])
    });
    write_jpeg(path, &img, 100);
}

fn write_jpeg(path: &Path, img: &RgbImage, quality: u8) {
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
}

/// Write a small valid PNG.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    gradient(width, height).save(path).unwrap();
}

/// Write an animated GIF with `frames` frames.
pub fn create_test_gif(path: &Path, width: u32, height: u32, frames: u32) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = GifEncoder::new(std::io::BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite).unwrap();
    let frames = (0..frames).map(|i| {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([((x + i * 40) % 256) as u8, (y % 256) as u8, 64, 255])
        });
        Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(100, 1))
    });
    encoder.encode_frames(frames).unwrap();
}

// =========================================================================
// Mock-codec fixtures
// =========================================================================

/// Create `<root>/source` holding one file per `(name, contents)` pair.
///
/// With [`MockCodec`](crate::imaging::backend::tests::MockCodec) the
/// contents are the mime type the probe will report.
pub fn mock_source_dir(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    let dir = root.join("source");
    std::fs::create_dir_all(&dir).unwrap();
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents).unwrap();
    }
    dir
}

/// Sorted file names in a directory.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
