//! CLI output formatting for batch runs.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! Processing 2 images from /photos/incoming
//! dawn.jpg (jpeg 1200x800, 412.3 KB)
//!     root: recompressed → dawn_aspR_1.500_w1200_h800_e.jpg
//!     h400: 600x400 → dawn_aspR_1.500_w1200_h800_e400.jpg
//!     h200: 300x200 → dawn_aspR_1.500_w1200_h800_e200.jpg
//! loop.gif (gif 320x240, 88.0 KB)
//!     root: recompressed → loop_aspR_1.333_w320_h240_e.gif
//!     h400: recompressed (gif pass-through) → loop_aspR_1.333_w320_h240_e400.gif
//! png: 0 files rewritten
//! jpeg: 3 files rewritten
//! gif: 1 file rewritten
//!
//! Processed 2 images into 6 versions
//! ```
//!
//! ## Probe
//!
//! ```text
//! dawn.jpg
//!     Format: jpeg (image/jpeg)
//!     Dimensions: 1200x800
//!     Aspect ratio: 1.500
//!     Size: 412.3 KB
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::naming;
use crate::planner::Treatment;
use crate::probe::ImageMetadata;
use crate::process::{BatchEvent, BatchResult, VersionStatus};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn format_size_kb(kb: f64) -> String {
    format!("{kb:.1} KB")
}

fn treatment_reason(treatment: Treatment) -> Option<&'static str> {
    match treatment {
        Treatment::Root | Treatment::Resize => None,
        Treatment::GifPassThrough => Some("gif pass-through"),
        Treatment::LowQualitySource => Some("low-quality source"),
        Treatment::NoTargetSize => Some("no target size"),
    }
}

fn format_status(status: &VersionStatus) -> String {
    match status {
        VersionStatus::Resized { width, height } => format!("{width}x{height}"),
        VersionStatus::Recompressed { reason } => match treatment_reason(*reason) {
            Some(why) => format!("recompressed ({why})"),
            None => "recompressed".to_string(),
        },
    }
}

/// Header line for one source image.
///
/// ```text
/// dawn.jpg (jpeg 1200x800, 412.3 KB)
/// ```
fn image_header(file_name: &str, metadata: &ImageMetadata) -> String {
    format!(
        "{} ({} {}x{}, {})",
        file_name,
        metadata.format,
        metadata.dimensions.width,
        metadata.dimensions.height,
        format_size_kb(metadata.file_size_kb)
    )
}

// ============================================================================
// Run
// ============================================================================

/// Format one progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::BatchStarted {
            source_dir,
            file_count,
        } => vec![format!(
            "Processing {} from {}",
            plural(*file_count, "image"),
            source_dir.display()
        )],
        BatchEvent::FileProcessed {
            file_name,
            metadata,
            versions,
        } => {
            let mut lines = vec![image_header(file_name, metadata)];
            for version in versions {
                lines.push(format!(
                    "{}{}: {} \u{2192} {}",
                    indent(1),
                    version.label,
                    format_status(&version.status),
                    version.output_name
                ));
            }
            lines
        }
        BatchEvent::OptimizePassFinished { format, rewritten } => {
            vec![format!("{}: {} rewritten", format, plural(*rewritten, "file"))]
        }
        BatchEvent::OptimizePassFailed { format, message } => {
            vec![format!("{}: optimization failed: {}", format, message)]
        }
    }
}

/// Summary printed after a successful run.
pub fn format_result(result: &BatchResult) -> Vec<String> {
    let version_count: usize = result.versions.values().map(Vec::len).sum();
    let mut lines = vec![
        String::new(),
        format!(
            "Processed {} into {}",
            plural(result.versions.len(), "image"),
            plural(version_count, "version")
        ),
    ];

    let failures: Vec<String> = result
        .optimization_failures()
        .map(|r| r.format.to_string())
        .collect();
    if !failures.is_empty() {
        lines.push(format!("Optimization failed for: {}", failures.join(", ")));
    }
    lines
}

pub fn print_result(result: &BatchResult) {
    for line in format_result(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Format the measured facts about one file.
pub fn format_probe(path: &Path, metadata: &ImageMetadata) -> Vec<String> {
    let name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let dims = metadata.dimensions;
    vec![
        name,
        format!("{}Format: {} ({})", indent(1), metadata.format, metadata.format.mime()),
        format!("{}Dimensions: {}x{}", indent(1), dims.width, dims.height),
        format!(
            "{}Aspect ratio: {}",
            indent(1),
            naming::format_aspect_ratio(dims.width, dims.height)
        ),
        format!("{}Size: {}", indent(1), format_size_kb(metadata.file_size_kb)),
    ]
}

pub fn print_probe(path: &Path, metadata: &ImageMetadata) {
    for line in format_probe(path, metadata) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
