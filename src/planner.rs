//! Version planning: what to render for one measured source image.
//!
//! The plan is an ordered list of [`RenderJob`]s:
//!
//! ```text
//! [0]      root version — recompress at source size, no tag
//! [1..=N]  one job per requested version, in request order
//! ```
//!
//! Callers index the resulting name list positionally, so the order is part
//! of the contract. Duplicate requests are kept as separate jobs.
//!
//! ## Per-version policy
//!
//! Evaluated for each requested version independently, first match wins:
//!
//! | Condition | Treatment |
//! |---|---|
//! | source is GIF | recompress only (frame-aware resize is not implemented) |
//! | requested height is 400 and source ≤ 70 KiB | recompress only (low-quality source) |
//! | width and height both `null` | recompress only (nothing to fit) |
//! | otherwise | resize into the requested box |

use crate::descriptor::MeasuredImage;
use crate::imaging::{ResizeBox, SourceFormat};
use serde::Serialize;

/// Requested height that triggers the low-quality-source check.
pub const LOW_QUALITY_TARGET_HEIGHT: u32 = 400;

/// Sources at or below this size (KiB) skip resizing for the 400px version.
pub const LOW_QUALITY_MAX_KB: f64 = 70.0;

/// Why a job does or doesn't resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Treatment {
    /// Resize into the requested box.
    Resize,
    /// The implicit root version.
    Root,
    /// GIF sources are never resized.
    GifPassThrough,
    /// 400px version of a source already ≤ 70 KiB.
    LowQualitySource,
    /// Neither width nor height requested.
    NoTargetSize,
}

impl Treatment {
    pub fn skips_resize(self) -> bool {
        self != Treatment::Resize
    }
}

/// One output file to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderJob {
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
    pub treatment: Treatment,
    pub output_name: String,
}

impl RenderJob {
    pub fn skip_resize(&self) -> bool {
        self.treatment.skips_resize()
    }

    /// The box to hand to the codec, or `None` to recompress at source size.
    pub fn resize_box(&self) -> Option<ResizeBox> {
        if self.skip_resize() {
            None
        } else {
            Some(ResizeBox::new(self.target_width, self.target_height))
        }
    }
}

/// Decide the treatment for one requested version.
fn treatment_for(image: &MeasuredImage, target: ResizeBox) -> Treatment {
    if image.format() == SourceFormat::Gif {
        Treatment::GifPassThrough
    } else if target.height == Some(LOW_QUALITY_TARGET_HEIGHT)
        && image.file_size_kb() <= LOW_QUALITY_MAX_KB
    {
        Treatment::LowQualitySource
    } else if target.is_unbounded() {
        Treatment::NoTargetSize
    } else {
        Treatment::Resize
    }
}

/// Plan every render for `image`: the root version, then each requested version.
pub fn plan(image: &MeasuredImage) -> Vec<RenderJob> {
    let versions = image.descriptor().versions();
    let mut jobs = Vec::with_capacity(versions.len() + 1);

    jobs.push(RenderJob {
        target_width: None,
        target_height: None,
        treatment: Treatment::Root,
        output_name: image.final_name(None),
    });

    jobs.extend(versions.iter().map(|spec| RenderJob {
        target_width: spec.width,
        target_height: spec.height,
        treatment: treatment_for(image, ResizeBox::new(spec.width, spec.height)),
        output_name: image.final_name(spec.height),
    }));

    jobs
}
