//! # Image Versions
//!
//! Batch-render a directory of source images into a family of resized,
//! recompressed versions whose filenames encode the source geometry.
//!
//! # Architecture: One Batch, Three Stages
//!
//! ```text
//! 1. Check     config + directories  →  fail fast, nothing written
//! 2. Render    each file in parallel →  probe → plan → render versions
//! 3. Optimize  whole output dir      →  PNG / JPEG / GIF passes in parallel
//! ```
//!
//! Stage 3 is a barrier: it starts only after every file of stage 2 has
//! finished, because the passes glob the output directory as a whole.
//!
//! The result maps each source file name to its output names, root version
//! first and then one name per requested version in request order:
//!
//! ```text
//! dawn.jpg → [ dawn_aspR_1.500_w1200_h800_e.jpg,
//!              dawn_aspR_1.500_w1200_h800_e400.jpg,
//!              dawn_aspR_1.500_w1200_h800_e200.jpg ]
//! ```
//!
//! Consumers index that list positionally, so its order is part of the
//! contract.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`process`] | Batch orchestration — directory checks, per-file fan-out, events, result map |
//! | [`probe`] | Measures one source: format from signature, pixel size, size on disk |
//! | [`planner`] | Turns a measured image into ordered render jobs, including the per-version skip rules |
//! | [`naming`] | `<base>_aspR_<ratio>_w<w>_h<h>_e<tag><ext>` builder and parser |
//! | [`descriptor`] | Two-phase per-file record: identity, then identity + measurement |
//! | [`optimize`] | Post-render recompression passes over the output directory |
//! | [`imaging`] | Codec seam and the pure-Rust codec: detect, measure, resize, encode |
//! | [`config`] | JSON batch config, validation, thread-count resolution |
//! | [`output`] | CLI output formatting for events, results and probes |
//!
//! # Design Decisions
//!
//! ## Names Encode the Source, Not the Output
//!
//! Every version of one source shares the same ratio and size segments; only
//! the trailing tag (the *requested* height) differs. Any single derived file
//! is enough to recover the original aspect ratio, which is what downstream
//! layout code needs before the full-size image has loaded.
//!
//! ## Fatal Batch on Any File Error
//!
//! A malformed filename, an unsupported format or a codec failure aborts the
//! whole run with one descriptive error. Callers get either a complete result
//! map or nothing. Filenames are split before any render starts, so the
//! cheapest failure is also the earliest.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resizing and encoding use the `image` crate; PNG optimization
//! uses `oxipng`. No ImageMagick, no external optimizer binaries: the binary
//! is self-contained.

pub mod config;
pub mod descriptor;
pub mod imaging;
pub mod naming;
pub mod optimize;
pub mod output;
pub mod planner;
pub mod probe;
pub mod process;

#[cfg(test)]
pub(crate) mod test_helpers;
