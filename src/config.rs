//! Batch configuration.
//!
//! A batch is described by three fields. The same shape is accepted from a
//! JSON file (`run --config batch.json`) or assembled from CLI flags:
//!
//! ```json
//! {
//!   "dir": "/abs/path/to/source/images",
//!   "output_dir": "/abs/path/to/output",
//!   "versions": [
//!     { "height": 400, "width": null },
//!     { "height": 200, "width": null }
//!   ]
//! }
//! ```
//!
//! - `dir`, `output_dir`: non-empty. They must also be absolute, but that is
//!   checked by the batch run itself so it can report `InvalidPath`.
//! - `versions`: at least one entry. Both `height` and `width` keys are
//!   required; either may be `null`. `null` means "derive from the source
//!   aspect ratio", and both `null` means "no resize".
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Input for one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Directory of source images. Must be absolute.
    pub dir: PathBuf,
    /// Directory the versions are written to. Must be absolute.
    pub output_dir: PathBuf,
    /// Requested versions, in output order (after the implicit root version).
    pub versions: Vec<VersionSpec>,
}

/// Deserialize an `Option` that must be present but may be `null`.
///
/// A plain `Option` field silently defaults to `None` when the key is
/// missing; routing through `deserialize_with` makes the key required.
fn nullable<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<u32>::deserialize(deserializer)
}

/// One requested output size.
///
/// Duplicate specs are legal; each produces its own entry in the result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionSpec {
    #[serde(deserialize_with = "nullable")]
    pub height: Option<u32>,
    #[serde(deserialize_with = "nullable")]
    pub width: Option<u32>,
}

impl VersionSpec {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { height, width }
    }

    pub fn height(height: u32) -> Self {
        Self::new(None, Some(height))
    }
}

/// `WxH`, `xH` (height only), `Wx` (width only) or `x` (no resize).
impl FromStr for VersionSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("invalid version '{s}': expected WxH, xH or Wx"))?;
        let side = |v: &str| -> Result<Option<u32>, String> {
            if v.is_empty() {
                Ok(None)
            } else {
                v.parse()
                    .map(Some)
                    .map_err(|_| format!("invalid version '{s}': '{v}' is not a size"))
            }
        };
        Ok(Self::new(side(w)?, side(h)?))
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();
        write!(f, "{}x{}", side(self.width), side(self.height))
    }
}

impl BatchConfig {
    /// Validate the shape contract. Absolute-path checks happen at run time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("dir must not be empty".into()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output_dir must not be empty".into(),
            ));
        }
        if self.versions.is_empty() {
            return Err(ConfigError::Validation(
                "versions must contain at least one entry".into(),
            ));
        }
        for (i, spec) in self.versions.iter().enumerate() {
            if spec.width == Some(0) || spec.height == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "versions[{i}]: width and height must be positive or null"
                )));
            }
        }
        Ok(())
    }
}

/// Parse and validate a batch config from JSON text.
pub fn parse_config(json: &str) -> Result<BatchConfig, ConfigError> {
    let config: BatchConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a batch config file.
pub fn load_config(path: &Path) -> Result<BatchConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// A sample config with every field present, for `gen-config`.
pub fn sample_config_json() -> String {
    let sample = BatchConfig {
        dir: PathBuf::from("/absolute/path/to/images"),
        output_dir: PathBuf::from("/absolute/path/to/output"),
        versions: vec![
            VersionSpec::height(400),
            VersionSpec::height(200),
            VersionSpec::new(Some(200), Some(80)),
        ],
    };
    // Serializing plain owned data into a String cannot fail.
    serde_json::to_string_pretty(&sample).unwrap_or_default()
}

/// Resolve the effective thread count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(max_processes: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}
