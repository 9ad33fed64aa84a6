//! Parameter types for codec operations.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between the [`planner`](crate::planner) (which decides what each version
//! needs) and the [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100). Clamped on construction.
//! - [`Sharpening`] — Unsharp-mask parameters applied after resampling.
//! - [`RenderRecipe`] — The fixed quality and sharpening every render uses.
//! - [`ResizeBox`] — Target box; a missing side is derived from the source aspect.
//! - [`RenderParams`] — Full specification for one render: source, output, format, resize, recipe.

use super::backend::SourceFormat;
use serde::Serialize;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(82)
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    /// Very light sharpening to restore edges softened by the triangle filter.
    ///
    /// Threshold 17 is 6.5% of the 8-bit range.
    pub fn subtle() -> Self {
        Self {
            sigma: 0.25,
            threshold: 17,
        }
    }
}

/// The render policy shared by every output. Not configurable per call.
///
/// The encoders add the rest of the policy themselves: JPEG output is always
/// baseline (never progressive) and nothing is carried over from the source
/// except pixels, so EXIF, text chunks and color profiles are dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRecipe {
    pub quality: Quality,
    pub sharpening: Sharpening,
}

impl RenderRecipe {
    pub fn standard() -> Self {
        Self {
            quality: Quality::new(82),
            sharpening: Sharpening::subtle(),
        }
    }
}

impl Default for RenderRecipe {
    fn default() -> Self {
        Self::standard()
    }
}

/// Requested output box. Aspect ratio is always preserved.
///
/// - both sides: fit inside `width × height`
/// - one side: that side is exact, the other follows the source aspect
/// - neither: no resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResizeBox {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeBox {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    pub fn height(height: u32) -> Self {
        Self::new(None, Some(height))
    }

    pub fn is_unbounded(self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

/// Parameters for rendering one output file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Detected source format; the output is written in the same format.
    pub format: SourceFormat,
    /// `None` = recompress at source size.
    pub resize: Option<ResizeBox>,
    pub recipe: RenderRecipe,
}
