//! Output filename convention shared by every rendered version.
//!
//! Each source image produces a family of files whose names encode the
//! *source's* geometry, so any one of them is enough to recover the original
//! aspect ratio and pixel size:
//!
//! ```text
//! <base>_aspR_<ratio>_w<width>_h<height>_e<tag><ext>
//!
//! dawn_aspR_1.500_w1200_h800_e.jpg      ← root version (no tag)
//! dawn_aspR_1.500_w1200_h800_e400.jpg   ← version requested at height 400
//! dawn_aspR_1.500_w1200_h800_e200.jpg   ← version requested at height 200
//! ```
//!
//! Only the trailing tag differs between versions of one source. The tag is
//! the *requested* height, not the height the codec actually produced.
//!
//! ## Aspect ratio sentinel
//!
//! When either dimension is unknown (zero) the ratio segment is the literal
//! `0`, and the size segments read `_w0_h0`. `0` is never a real ratio.

use thiserror::Error;

/// Why a source filename could not be split into base name and extension.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilenameError {
    #[error("Could not determine extension of {0}")]
    NoExtension(String),
    #[error("Could not determine basename of {0}")]
    NoBaseName(String),
}

/// Split a filename into `(base_name, extension)`, the extension keeping its dot.
///
/// - `"dawn.jpg"` → `("dawn", ".jpg")`
/// - `"archive.tar.gz"` → `("archive.tar", ".gz")`
/// - `"README"` → no extension
/// - `".hidden"` → no extension (a leading dot starts the name, not an extension)
pub fn split_file_name(file_name: &str) -> Result<(&str, &str), FilenameError> {
    let dot = match file_name.rfind('.') {
        Some(pos) if pos > 0 => pos,
        _ => return Err(FilenameError::NoExtension(file_name.to_string())),
    };
    let (base, ext) = file_name.split_at(dot);
    if base.is_empty() {
        return Err(FilenameError::NoBaseName(file_name.to_string()));
    }
    Ok((base, ext))
}

/// Aspect ratio in thousandths. `None` when a side is zero.
///
/// Matches JavaScript's `toFixed(3)`: take the nearest `f64`
/// to `width / height`, then round its exact binary value to three decimals
/// with ties going up. The double is decomposed into mantissa and exponent so
/// the rounding itself is integer arithmetic. `1001 / 2000` is stored just
/// below `0.5005` and therefore yields `0.500`.
fn ratio_millis(width: u32, height: u32) -> Option<u64> {
    if width == 0 || height == 0 {
        return None;
    }
    let ratio = width as f64 / height as f64;

    // Any u32 / u32 ratio is a normal, positive double.
    let bits = ratio.to_bits();
    let mantissa = ((bits & ((1u64 << 52) - 1)) | (1u64 << 52)) as u128;
    let exponent = ((bits >> 52) & 0x7ff) as i32 - 1075;

    let scaled = mantissa * 1000;
    let millis = if exponent >= 0 {
        scaled << exponent
    } else {
        let shift = (-exponent) as u32;
        (scaled + (1u128 << (shift - 1))) >> shift
    };
    Some(millis as u64)
}

/// `width / height` rounded to 3 decimal places, or `0.0` if either side is unknown.
pub fn aspect_ratio(width: u32, height: u32) -> f64 {
    ratio_millis(width, height)
        .map(|m| m as f64 / 1000.0)
        .unwrap_or(0.0)
}

/// Aspect ratio as it appears in filenames: exactly three decimals, or `0`.
pub fn format_aspect_ratio(width: u32, height: u32) -> String {
    match ratio_millis(width, height) {
        Some(m) => format!("{}.{:03}", m / 1000, m % 1000),
        None => "0".to_string(),
    }
}

/// Build the output filename for one version of a source image.
///
/// `width`/`height` are the measured source dimensions. `tag` is the requested
/// target height for derived versions and `None` for the root version; a tag of
/// zero is treated as absent.
pub fn build_name(
    base_name: &str,
    extension: &str,
    width: u32,
    height: u32,
    tag: Option<u32>,
) -> String {
    let tag = tag
        .filter(|&h| h != 0)
        .map(|h| h.to_string())
        .unwrap_or_default();
    format!(
        "{}_aspR_{}_w{}_h{}_e{}{}",
        base_name,
        format_aspect_ratio(width, height),
        width,
        height,
        tag,
        extension
    )
}

/// Fields recovered from a generated filename.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    pub base_name: String,
    /// Ratio segment exactly as written (`"1.500"`, or `"0"` for the sentinel).
    pub aspect_ratio: String,
    pub width: u32,
    pub height: u32,
    pub tag: Option<u32>,
    pub extension: String,
}

/// Parse a name produced by [`build_name`]. Returns `None` for anything else.
///
/// The last `_aspR_` marker wins, so base names that themselves contain the
/// marker still parse.
pub fn parse_name(name: &str) -> Option<ParsedName> {
    let marker = name.rfind("_aspR_")?;
    let base_name = &name[..marker];
    let rest = &name[marker + "_aspR_".len()..];

    let (ratio, rest) = rest.split_once("_w")?;
    let (width, rest) = rest.split_once("_h")?;
    let (height, rest) = rest.split_once("_e")?;

    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let (tag, extension) = rest.split_at(digits);

    Some(ParsedName {
        base_name: base_name.to_string(),
        aspect_ratio: ratio.to_string(),
        width: width.parse().ok()?,
        height: height.parse().ok()?,
        tag: if tag.is_empty() {
            None
        } else {
            Some(tag.parse().ok()?)
        },
        extension: extension.to_string(),
    })
}
