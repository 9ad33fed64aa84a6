//! Source image measurement.
//!
//! [`probe`] runs three independent queries, in this order, and stops at the
//! first failure:
//!
//! 1. **Format** — read the whole file and detect the mime type from its
//!    signature. Anything other than JPEG, PNG or GIF is rejected here, so a
//!    stray `.txt` never reaches the decoder.
//! 2. **Dimensions** — header read via the codec.
//! 3. **File size** — bytes on disk ÷ 1024, unrounded.
//!
//! Errors are scoped to the one file being probed.

use crate::imaging::{CodecError, Dimensions, ImageCodec, SourceFormat};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(
        "The image format '{mime}' was not recognized. Only jpeg, png and gif files are allowed"
    )]
    UnsupportedFormat { mime: String },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Measured facts about one source image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMetadata {
    pub format: SourceFormat,
    pub dimensions: Dimensions,
    /// Size on disk in KiB (bytes / 1024, not rounded).
    pub file_size_kb: f64,
}

/// Mime reported when the codec does not recognize the signature at all.
const UNKNOWN_MIME: &str = "unknown";

/// Measure the image at `path`.
pub fn probe(codec: &impl ImageCodec, path: &Path) -> Result<ImageMetadata, ProbeError> {
    let bytes = std::fs::read(path).map_err(CodecError::from)?;
    let mime = codec
        .probe_format(&bytes)
        .unwrap_or_else(|| UNKNOWN_MIME.to_string());
    let format = SourceFormat::from_mime(&mime).ok_or(ProbeError::UnsupportedFormat { mime })?;

    let dimensions = codec.probe_dimensions(path)?;

    let file_size_kb = file_size_kb(path)?;

    Ok(ImageMetadata {
        format,
        dimensions,
        file_size_kb,
    })
}

fn file_size_kb(path: &Path) -> Result<f64, CodecError> {
    let bytes = std::fs::metadata(path)?.len();
    Ok(bytes as f64 / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustCodec;
    use crate::imaging::backend::tests::{MockCodec, RecordedOp};
    use crate::test_helpers::{create_test_gif, create_test_jpeg};
    use tempfile::TempDir;

    #[test]
    fn probe_reads_format_dimensions_and_size() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        let mut contents = vec![b' '; 2048 - "image/jpeg".len()];
        contents.extend_from_slice(b"image/jpeg");
        std::fs::write(&path, contents).unwrap();

        let codec = MockCodec::with_dimensions(640, 480);
        let meta = probe(&codec, &path).unwrap();

        assert_eq!(meta.format, SourceFormat::Jpeg);
        assert_eq!(meta.dimensions, Dimensions { width: 640, height: 480 });
        assert_eq!(meta.file_size_kb, 2.0);
    }

    #[test]
    fn probe_checks_format_before_dimensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "shopping list").unwrap();

        let codec = MockCodec::with_dimensions(640, 480);
        let err = probe(&codec, &path).unwrap_err();

        assert!(matches!(err, ProbeError::UnsupportedFormat { ref mime } if mime == "unknown"));
        assert_eq!(codec.get_operations(), vec![RecordedOp::ProbeFormat]);
    }

    #[test]
    fn unsupported_message_names_allowed_formats() {
        let err = ProbeError::UnsupportedFormat {
            mime: "image/webp".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("image/webp"));
        assert!(msg.contains("jpeg, png and gif"));
    }

    #[test]
    fn recognized_but_unsupported_mime_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.webp");
        std::fs::write(&path, "image/webp").unwrap();

        let err = probe(&MockCodec::new(), &path).unwrap_err();
        assert!(matches!(err, ProbeError::UnsupportedFormat { ref mime } if mime == "image/webp"));
    }

    #[test]
    fn missing_file_is_codec_io_error() {
        let err = probe(&MockCodec::new(), Path::new("/nonexistent/a.jpg")).unwrap_err();
        assert!(matches!(err, ProbeError::Codec(CodecError::Io(_))));
    }

    #[test]
    fn probe_real_jpeg() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("real.jpg");
        create_test_jpeg(&path, 64, 32);

        let meta = probe(&RustCodec::new(), &path).unwrap();
        let on_disk = std::fs::metadata(&path).unwrap().len() as f64 / 1024.0;
        assert_eq!(meta.format, SourceFormat::Jpeg);
        assert_eq!(meta.dimensions, Dimensions { width: 64, height: 32 });
        assert_eq!(meta.file_size_kb, on_disk);
    }

    #[test]
    fn probe_real_gif_with_wrong_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("actually-a-gif.png");
        create_test_gif(&path, 16, 8, 2);

        let meta = probe(&RustCodec::new(), &path).unwrap();
        assert_eq!(meta.format, SourceFormat::Gif);
    }

    #[test]
    fn probe_real_text_file_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("readme.txt");
        std::fs::write(&path, "hello").unwrap();

        assert!(matches!(
            probe(&RustCodec::new(), &path),
            Err(ProbeError::UnsupportedFormat { .. })
        ));
    }
}
