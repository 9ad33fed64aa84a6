//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait is the seam between the batch pipeline and the
//! pixel work. It exposes exactly three operations: format detection from
//! raw bytes, dimension extraction, and rendering one output file.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec) — pure Rust on top of the
//! `image` crate. Tests use the recording [`MockCodec`](tests::MockCodec).

use super::params::RenderParams;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// The source formats the pipeline accepts. Anything else is rejected at probe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 3] = [SourceFormat::Png, SourceFormat::Jpeg, SourceFormat::Gif];

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }

    /// File extensions (without dot) that belong to this format in an output directory.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Png => &["png"],
            Self::Gif => &["gif"],
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
        };
        f.write_str(name)
    }
}

/// Capability every image codec must provide.
///
/// Implementations must be `Sync`: the orchestrator calls them from rayon
/// workers for many files at once.
pub trait ImageCodec: Sync {
    /// Detect the mime type from the file's signature. `None` if unrecognized.
    fn probe_format(&self, bytes: &[u8]) -> Option<String>;

    /// Read pixel dimensions.
    fn probe_dimensions(&self, path: &Path) -> Result<Dimensions, CodecError>;

    /// Decode the source, optionally resize, apply the render recipe and write the output.
    fn render(&self, params: &RenderParams) -> Result<(), CodecError>;
}
