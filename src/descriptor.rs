//! Per-file state for one source image.
//!
//! A descriptor goes through two phases, each an immutable value:
//!
//! 1. [`ImageDescriptor`] — identity only: where the file lives, how its
//!    name splits, which versions were requested. Built from the directory
//!    listing before any I/O on the file itself.
//! 2. [`MeasuredImage`] — the descriptor plus probed [`ImageMetadata`].
//!    Produced once by [`ImageDescriptor::measure`], consuming the identity.
//!
//! Geometry accessors on the unmeasured phase return `0` rather than failing,
//! so names built before measurement carry the `_aspR_0_w0_h0` sentinel.
//!
//! Each descriptor is owned by exactly one per-file pipeline; nothing here is
//! shared between threads.

use crate::config::VersionSpec;
use crate::imaging::SourceFormat;
use crate::naming::{self, FilenameError};
use crate::probe::ImageMetadata;
use std::path::{Path, PathBuf};

/// Identity of a source image, before measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescriptor {
    directory: PathBuf,
    base_name: String,
    extension: String,
    versions: Vec<VersionSpec>,
}

impl ImageDescriptor {
    /// Build a descriptor from already-split name parts.
    ///
    /// Both parts must be non-empty and the extension must start with a dot.
    pub fn new(
        directory: &Path,
        base_name: &str,
        extension: &str,
        versions: &[VersionSpec],
    ) -> Result<Self, FilenameError> {
        let file_name = format!("{base_name}{extension}");
        if !extension.starts_with('.') {
            return Err(FilenameError::NoExtension(file_name));
        }
        if base_name.is_empty() {
            return Err(FilenameError::NoBaseName(file_name));
        }
        Ok(Self {
            directory: directory.to_path_buf(),
            base_name: base_name.to_string(),
            extension: extension.to_string(),
            versions: versions.to_vec(),
        })
    }

    /// Build a descriptor for `file_name` inside `directory`.
    pub fn from_file_name(
        directory: &Path,
        file_name: &str,
        versions: &[VersionSpec],
    ) -> Result<Self, FilenameError> {
        let (base_name, extension) = naming::split_file_name(file_name)?;
        Self::new(directory, base_name, extension, versions)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Extension including the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn versions(&self) -> &[VersionSpec] {
        &self.versions
    }

    pub fn file_name(&self) -> String {
        format!("{}{}", self.base_name, self.extension)
    }

    pub fn file_path(&self) -> PathBuf {
        self.directory.join(self.file_name())
    }

    /// Unmeasured: always `0`.
    pub fn width(&self) -> u32 {
        0
    }

    /// Unmeasured: always `0`.
    pub fn height(&self) -> u32 {
        0
    }

    /// Unmeasured: the `0` sentinel.
    pub fn aspect_ratio(&self) -> f64 {
        0.0
    }

    pub fn final_name(&self, tag: Option<u32>) -> String {
        naming::build_name(&self.base_name, &self.extension, 0, 0, tag)
    }

    /// Attach probed metadata, producing the measured phase.
    pub fn measure(self, metadata: ImageMetadata) -> MeasuredImage {
        MeasuredImage {
            descriptor: self,
            metadata,
        }
    }
}

/// A source image with its probed metadata. Read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredImage {
    descriptor: ImageDescriptor,
    metadata: ImageMetadata,
}

impl MeasuredImage {
    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn format(&self) -> SourceFormat {
        self.metadata.format
    }

    pub fn width(&self) -> u32 {
        self.metadata.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.metadata.dimensions.height
    }

    pub fn file_size_kb(&self) -> f64 {
        self.metadata.file_size_kb
    }

    /// `width / height` to three decimals, or `0` if either side is zero.
    pub fn aspect_ratio(&self) -> f64 {
        naming::aspect_ratio(self.width(), self.height())
    }

    pub fn file_name(&self) -> String {
        self.descriptor.file_name()
    }

    pub fn file_path(&self) -> PathBuf {
        self.descriptor.file_path()
    }

    /// Output name for the version tagged `tag` (`None` = root version).
    pub fn final_name(&self, tag: Option<u32>) -> String {
        naming::build_name(
            &self.descriptor.base_name,
            &self.descriptor.extension,
            self.width(),
            self.height(),
            tag,
        )
    }
}
