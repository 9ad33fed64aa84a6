//! Image codec capability — pure Rust, zero external dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Probe format** | `image::guess_format` |
//! | **Probe dimensions** | `ImageReader::into_dimensions` |
//! | **Render** | Triangle resize + light unsharp + re-encode in the source format |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a render and the fixed recipe
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{CodecError, Dimensions, ImageCodec, SourceFormat};
pub use calculations::fit_within;
pub use params::{Quality, RenderParams, RenderRecipe, ResizeBox, Sharpening};
pub use rust_backend::RustCodec;
