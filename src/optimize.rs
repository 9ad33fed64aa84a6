//! Post-render optimization of the whole output directory.
//!
//! Runs after every file of a batch has been rendered. Each pass globs one
//! format's extensions in the output directory and recompresses the matches
//! in place:
//!
//! | Format | Pass | Tunables |
//! |---|---|---|
//! | PNG | `oxipng` lossless re-compression, ancillary chunks stripped | preset 4 |
//! | JPEG | re-encode, keep the first quality that beats the original | 80, 70, 60 |
//! | GIF | re-encode every frame, non-interlaced, keep if smaller | speed 10 |
//!
//! The tunables are constants. A file is only rewritten when the optimized
//! bytes are strictly smaller, so running a pass twice is safe but not
//! guaranteed to be a no-op.
//!
//! The three passes are independent: [`optimize_all`] runs them in parallel
//! and reports each one's outcome separately, so one failing pass neither
//! hides its error nor stops the other two. Within a pass, a file that fails
//! does not stop the remaining files either.

use crate::imaging::SourceFormat;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Qualities tried for JPEG, highest first. The lowest is the floor.
pub const JPEG_QUALITY_STEPS: [u8; 3] = [80, 70, 60];

/// `oxipng` preset for PNG passes.
pub const PNG_PRESET: u8 = 4;

/// GIF encoder speed (1 = best palette, 30 = fastest).
pub const GIF_SPEED: i32 = 10;

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),
    #[error("Output directory is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("Failed to optimize {}: {message}", path.display())]
    Failed { path: PathBuf, message: String },
}

/// Format-specific in-place recompression of a single file.
///
/// Implementations must be `Sync`: files of one pass are optimized in parallel.
pub trait Optimizer: Sync {
    /// Recompress `path` in place. Returns `true` if the file was rewritten.
    fn optimize_file(&self, path: &Path, format: SourceFormat) -> Result<bool, OptimizeError>;
}

/// Outcome of one format's pass over the output directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub format: SourceFormat,
    pub rewritten: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PassReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Files directly inside `dir` whose extension belongs to `format`.
///
/// Extensions match case-insensitively (`.JPG` is a JPEG). Sorted, no
/// duplicates, subdirectories ignored.
pub fn matching_files(dir: &Path, format: SourceFormat) -> Result<Vec<PathBuf>, OptimizeError> {
    let dir_str = dir
        .to_str()
        .ok_or_else(|| OptimizeError::NonUtf8Path(dir.to_path_buf()))?;
    let escaped = glob::Pattern::escape(dir_str);
    let options = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = BTreeSet::new();
    for ext in format.extensions() {
        let pattern = format!("{escaped}/*.{ext}");
        for entry in glob::glob_with(&pattern, options)? {
            let path = entry?;
            if path.is_file() {
                files.insert(path);
            }
        }
    }
    Ok(files.into_iter().collect())
}

/// Run one format's pass over `dir`.
///
/// Every matching file is attempted even when some fail: the report lists
/// the files that were rewritten and, if any file failed, the failures in
/// path order.
pub fn optimize(optimizer: &impl Optimizer, dir: &Path, format: SourceFormat) -> PassReport {
    let files = match matching_files(dir, format) {
        Ok(files) => files,
        Err(e) => {
            return PassReport {
                format,
                rewritten: Vec::new(),
                error: Some(e.to_string()),
            };
        }
    };

    let outcomes: Vec<Result<(PathBuf, bool), OptimizeError>> = files
        .into_par_iter()
        .map(|path| -> Result<(PathBuf, bool), OptimizeError> {
            let rewritten = optimizer.optimize_file(&path, format)?;
            Ok((path, rewritten))
        })
        .collect();

    let mut rewritten = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok((path, true)) => rewritten.push(path),
            Ok((_, false)) => {}
            Err(e) => failures.push(e.to_string()),
        }
    }

    PassReport {
        format,
        rewritten,
        error: (!failures.is_empty()).then(|| failures.join("; ")),
    }
}

/// Run the PNG, JPEG and GIF passes over `dir` in parallel.
///
/// Reports come back in [`SourceFormat::ALL`] order regardless of which
/// pass finished first.
pub fn optimize_all(optimizer: &impl Optimizer, dir: &Path) -> Vec<PassReport> {
    SourceFormat::ALL
        .par_iter()
        .map(|&format| optimize(optimizer, dir, format))
        .collect()
}

// ============================================================================
// Pure-Rust optimizer
// ============================================================================

/// Optimizer built on `oxipng` (PNG) and the `image` encoders (JPEG, GIF).
pub struct RustOptimizer;

impl RustOptimizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(path: &Path, e: impl std::fmt::Display) -> OptimizeError {
    OptimizeError::Failed {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn optimize_png(path: &Path, original: &[u8]) -> Result<Vec<u8>, OptimizeError> {
    let mut options = oxipng::Options::from_preset(PNG_PRESET);
    options.strip = oxipng::StripChunks::All;
    oxipng::optimize_from_memory(original, &options).map_err(|e| failed(path, e))
}

/// First quality step whose output is smaller than the original, if any.
fn optimize_jpeg(path: &Path, original: &[u8]) -> Result<Vec<u8>, OptimizeError> {
    let img = image::load_from_memory_with_format(original, ImageFormat::Jpeg)
        .map_err(|e| failed(path, e))?;
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    for quality in JPEG_QUALITY_STEPS {
        let mut buf = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
            .map_err(|e| failed(path, e))?;
        if buf.len() < original.len() {
            return Ok(buf);
        }
    }
    Ok(original.to_vec())
}

fn optimize_gif(path: &Path, original: &[u8]) -> Result<Vec<u8>, OptimizeError> {
    let decoder = GifDecoder::new(Cursor::new(original)).map_err(|e| failed(path, e))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| failed(path, e))?;

    let mut buf = Vec::new();
    {
        // The trailer is written when the encoder drops.
        let mut encoder = GifEncoder::new_with_speed(&mut buf, GIF_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| failed(path, e))?;
        encoder.encode_frames(frames).map_err(|e| failed(path, e))?;
    }
    Ok(buf)
}

impl Optimizer for RustOptimizer {
    fn optimize_file(&self, path: &Path, format: SourceFormat) -> Result<bool, OptimizeError> {
        let original = fs::read(path)?;
        let optimized = match format {
            SourceFormat::Png => optimize_png(path, &original)?,
            SourceFormat::Jpeg => optimize_jpeg(path, &original)?,
            SourceFormat::Gif => optimize_gif(path, &original)?,
        };

        if optimized.len() < original.len() {
            fs::write(path, optimized)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::test_helpers::{
        create_noisy_jpeg, create_test_gif, create_test_jpeg, create_test_png,
    };
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Mock optimizer that records calls and reports every file as rewritten.
    ///
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockOptimizer {
        pub failing_format: Option<SourceFormat>,
        pub failing_file: Option<String>,
        pub calls: Mutex<Vec<(String, SourceFormat)>>,
    }

    impl MockOptimizer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing(format: SourceFormat) -> Self {
            Self {
                failing_format: Some(format),
                ..Self::default()
            }
        }

        /// Fails only for the file with this name.
        pub fn failing_file(name: &str) -> Self {
            Self {
                failing_file: Some(name.to_string()),
                ..Self::default()
            }
        }

        /// Recorded calls, sorted by file name for stable assertions.
        pub fn get_calls(&self) -> Vec<(String, SourceFormat)> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort_by(|a, b| a.0.cmp(&b.0));
            calls
        }
    }

    impl Optimizer for MockOptimizer {
        fn optimize_file(&self, path: &Path, format: SourceFormat) -> Result<bool, OptimizeError> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.calls.lock().unwrap().push((name.clone(), format));
            if self.failing_format == Some(format) || self.failing_file.as_ref() == Some(&name) {
                return Err(failed(path, "mock optimizer failure"));
            }
            Ok(true)
        }
    }

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"x").unwrap();
        }
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    // =========================================================================
    // Globbing
    // =========================================================================

    #[test]
    fn jpeg_glob_covers_both_extensions_any_case() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), &["a.jpg", "b.JPEG", "c.Jpg", "d.png", "e.gif", "notes.txt"]);

        let files = matching_files(tmp.path(), SourceFormat::Jpeg).unwrap();
        assert_eq!(names(&files), vec!["a.jpg", "b.JPEG", "c.Jpg"]);
    }

    #[test]
    fn glob_ignores_subdirectories() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), &["a.png"]);
        fs::create_dir(tmp.path().join("nested.png")).unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        touch(&tmp.path().join("sub"), &["deep.png"]);

        let files = matching_files(tmp.path(), SourceFormat::Png).unwrap();
        assert_eq!(names(&files), vec!["a.png"]);
    }

    #[test]
    fn glob_escapes_directory_metacharacters() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("shots [2024]");
        fs::create_dir(&dir).unwrap();
        touch(&dir, &["a.gif"]);

        let files = matching_files(&dir, SourceFormat::Gif).unwrap();
        assert_eq!(names(&files), vec!["a.gif"]);
    }

    // =========================================================================
    // Passes with mock optimizer
    // =========================================================================

    #[test]
    fn optimize_runs_one_format_only() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), &["a.png", "b.png", "c.jpg"]);

        let optimizer = MockOptimizer::new();
        let report = optimize(&optimizer, tmp.path(), SourceFormat::Png);

        assert!(report.is_ok());
        assert_eq!(names(&report.rewritten), vec!["a.png", "b.png"]);
        assert_eq!(
            optimizer.get_calls(),
            vec![
                ("a.png".to_string(), SourceFormat::Png),
                ("b.png".to_string(), SourceFormat::Png),
            ]
        );
    }

    #[test]
    fn failing_file_does_not_hide_the_rest_of_the_pass() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), &["a.png", "b.png", "c.png"]);

        let optimizer = MockOptimizer::failing_file("b.png");
        let report = optimize(&optimizer, tmp.path(), SourceFormat::Png);

        assert_eq!(names(&report.rewritten), vec!["a.png", "c.png"]);
        let error = report.error.unwrap();
        assert!(error.contains("b.png"));
        assert!(!error.contains("a.png"));
        assert_eq!(optimizer.get_calls().len(), 3);
    }

    #[test]
    fn every_failure_is_listed() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), &["a.gif", "b.gif"]);

        let report = optimize(
            &MockOptimizer::failing(SourceFormat::Gif),
            tmp.path(),
            SourceFormat::Gif,
        );

        assert!(report.rewritten.is_empty());
        let error = report.error.unwrap();
        assert!(error.contains("a.gif") && error.contains("b.gif"));
    }

    #[test]
    fn optimize_all_reports_every_format_in_order() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), &["a.png", "b.jpg", "c.gif"]);

        let reports = optimize_all(&MockOptimizer::new(), tmp.path());
        let formats: Vec<SourceFormat> = reports.iter().map(|r| r.format).collect();

        assert_eq!(formats, SourceFormat::ALL.to_vec());
        assert!(reports.iter().all(PassReport::is_ok));
        assert!(reports.iter().all(|r| r.rewritten.len() == 1));
    }

    #[test]
    fn failing_pass_is_reported_and_others_still_run() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), &["a.png", "b.jpg", "c.gif"]);

        let optimizer = MockOptimizer::failing(SourceFormat::Jpeg);
        let reports = optimize_all(&optimizer, tmp.path());

        let jpeg = reports.iter().find(|r| r.format == SourceFormat::Jpeg).unwrap();
        assert!(jpeg.error.as_deref().unwrap().contains("b.jpg"));
        assert!(jpeg.rewritten.is_empty());

        for report in reports.iter().filter(|r| r.format != SourceFormat::Jpeg) {
            assert!(report.is_ok());
            assert_eq!(report.rewritten.len(), 1);
        }
        assert_eq!(optimizer.get_calls().len(), 3);
    }

    #[test]
    fn empty_directory_rewrites_nothing() {
        let tmp = TempDir::new().unwrap();
        let reports = optimize_all(&MockOptimizer::new(), tmp.path());
        assert!(reports.iter().all(|r| r.is_ok() && r.rewritten.is_empty()));
    }

    // =========================================================================
    // Real optimizer
    // =========================================================================

    #[test]
    fn jpeg_at_max_quality_is_shrunk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("noisy.jpg");
        create_noisy_jpeg(&path, 128, 128);
        let before = fs::metadata(&path).unwrap().len();

        let rewritten = RustOptimizer::new()
            .optimize_file(&path, SourceFormat::Jpeg)
            .unwrap();

        assert!(rewritten);
        assert!(fs::metadata(&path).unwrap().len() < before);
        assert_eq!(image::image_dimensions(&path).unwrap(), (128, 128));
    }

    #[test]
    fn png_stays_valid_and_never_grows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.png");
        create_test_png(&path, 64, 48);
        let before = fs::metadata(&path).unwrap().len();

        RustOptimizer::new()
            .optimize_file(&path, SourceFormat::Png)
            .unwrap();

        assert!(fs::metadata(&path).unwrap().len() <= before);
        assert_eq!(image::image_dimensions(&path).unwrap(), (64, 48));
    }

    #[test]
    fn gif_keeps_frames_and_never_grows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.gif");
        create_test_gif(&path, 32, 24, 3);
        let before = fs::metadata(&path).unwrap().len();

        RustOptimizer::new()
            .optimize_file(&path, SourceFormat::Gif)
            .unwrap();

        assert!(fs::metadata(&path).unwrap().len() <= before);
        let decoder = GifDecoder::new(std::io::BufReader::new(fs::File::open(&path).unwrap()))
            .unwrap();
        assert_eq!(decoder.into_frames().collect_frames().unwrap().len(), 3);
    }

    #[test]
    fn undecodable_file_fails_with_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fake.jpg");
        fs::write(&path, b"not really a jpeg").unwrap();

        let err = RustOptimizer::new()
            .optimize_file(&path, SourceFormat::Jpeg)
            .unwrap_err();
        assert!(matches!(err, OptimizeError::Failed { ref path, .. } if path.ends_with("fake.jpg")));
    }

    #[test]
    fn real_pass_over_mixed_directory() {
        let tmp = TempDir::new().unwrap();
        create_noisy_jpeg(&tmp.path().join("a.jpg"), 96, 96);
        create_test_jpeg(&tmp.path().join("b.jpeg"), 40, 30);
        create_test_png(&tmp.path().join("c.png"), 40, 30);

        let reports = optimize_all(&RustOptimizer::new(), tmp.path());
        assert!(reports.iter().all(PassReport::is_ok));

        let jpeg = reports.iter().find(|r| r.format == SourceFormat::Jpeg).unwrap();
        assert!(names(&jpeg.rewritten).contains(&"a.jpg".to_string()));
    }
}
