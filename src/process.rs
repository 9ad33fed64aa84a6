//! Batch orchestration: one source directory in, versioned files out.
//!
//! ## Flow
//!
//! ```text
//! validate config
//!   → dir / output_dir absolute?          InvalidPath
//!   → dir exists?                         DirectoryNotFound
//!   → dir has entries?                    EmptyDirectory
//!   → split every file name               MalformedFilename
//!   → create output_dir
//!   → per file, in parallel:
//!         probe → plan → render jobs (in parallel)
//!   → barrier
//!   → PNG / JPEG / GIF optimization passes (in parallel)
//! ```
//!
//! All directory-level checks run before anything is written, so a failing
//! run leaves no output directory behind.
//!
//! ## Failure policy
//!
//! Every error is fatal to the whole batch: a malformed filename, an
//! unsupported format or a codec failure in any one file aborts the run and
//! no partial [`BatchResult`] is returned. Filenames are all split before the
//! fan-out starts, so a bad name stops the batch before any render. Once the
//! fan-out is running, the first error stops new files from being scheduled;
//! renders already in flight finish.
//!
//! Optimization passes are the exception: they run after every render has
//! succeeded, and their failures are reported per pass in
//! [`BatchResult::optimization`] rather than discarding the rendered output.
//!
//! ## Result
//!
//! ```text
//! {
//!   "dawn.jpg": [
//!     "dawn_aspR_1.500_w1200_h800_e.jpg",      ← [0] root version
//!     "dawn_aspR_1.500_w1200_h800_e400.jpg",   ← [1] versions[0]
//!     "dawn_aspR_1.500_w1200_h800_e200.jpg"    ← [2] versions[1]
//!   ]
//! }
//! ```
//!
//! ## Parallel Processing
//!
//! Files fan out with rayon's `par_iter`; within a file the render jobs fan
//! out again. Two jobs of one file that resolve to the same output name
//! (e.g. two specs with the same height) are written once, by the first job
//! in plan order, so no two workers ever write the same path. Both positions
//! still appear in the result list and report what was actually written.
//!
//! The root job is first in plan order, so a spec whose name collides with
//! the root (width only, or no size at all) never replaces the source-size
//! root file.

use crate::config::{BatchConfig, ConfigError};
use crate::descriptor::{ImageDescriptor, MeasuredImage};
use crate::imaging::{
    CodecError, ImageCodec, RenderParams, RenderRecipe, RustCodec, SourceFormat, fit_within,
};
use crate::naming::FilenameError;
use crate::optimize::{self, Optimizer, PassReport, RustOptimizer};
use crate::planner::{self, RenderJob, Treatment};
use crate::probe::{self, ImageMetadata, ProbeError};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Path to {which} has to be absolute: {}", path.display())]
    InvalidPath { which: &'static str, path: PathBuf },
    #[error("Image folder does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("No images found in {}", .0.display())]
    EmptyDirectory(PathBuf),
    #[error("{source}")]
    MalformedFilename {
        file_name: String,
        source: FilenameError,
    },
    #[error(
        "{file_name}: The image format '{mime}' was not recognized. Only jpeg, png and gif files are allowed"
    )]
    UnsupportedFormat { file_name: String, mime: String },
    #[error("Image processing failed for {file_name}: {source}")]
    Codec {
        file_name: String,
        source: CodecError,
    },
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    fn from_probe(file_name: &str, err: ProbeError) -> Self {
        match err {
            ProbeError::UnsupportedFormat { mime } => BatchError::UnsupportedFormat {
                file_name: file_name.to_string(),
                mime,
            },
            ProbeError::Codec(source) => BatchError::Codec {
                file_name: file_name.to_string(),
                source,
            },
        }
    }
}

/// Progress events emitted while a batch runs.
///
/// Sent over an optional channel so the caller decides how (or whether) to
/// display them. `FileProcessed` events arrive in completion order.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    BatchStarted {
        source_dir: PathBuf,
        file_count: usize,
    },
    FileProcessed {
        file_name: String,
        metadata: ImageMetadata,
        versions: Vec<VersionInfo>,
    },
    OptimizePassFinished {
        format: SourceFormat,
        rewritten: usize,
    },
    OptimizePassFailed {
        format: SourceFormat,
        message: String,
    },
}

/// One rendered version, as reported in [`BatchEvent::FileProcessed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionInfo {
    /// `root`, `h400`, `w300`, `200x80` or `unsized`.
    pub label: String,
    pub output_name: String,
    pub status: VersionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// Resized to the given pixel size.
    Resized { width: u32, height: u32 },
    /// Re-encoded at source size.
    Recompressed { reason: Treatment },
}

/// Output of a successful batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    /// Source file name → output names, root version first.
    pub versions: BTreeMap<String, Vec<String>>,
    /// One report per optimization pass; empty when optimization was skipped.
    pub optimization: Vec<PassReport>,
}

impl BatchResult {
    pub fn optimization_failures(&self) -> impl Iterator<Item = &PassReport> {
        self.optimization.iter().filter(|r| !r.is_ok())
    }
}

/// Run a batch with the pure-Rust codec and optimizer.
pub fn run(
    config: &BatchConfig,
    optimize_output: bool,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchResult, BatchError> {
    run_with(
        &RustCodec::new(),
        &RustOptimizer::new(),
        config,
        optimize_output,
        events,
    )
}

/// Run a batch with specific backends (allows testing with mocks).
pub fn run_with(
    codec: &impl ImageCodec,
    optimizer: &impl Optimizer,
    config: &BatchConfig,
    optimize_output: bool,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchResult, BatchError> {
    config.validate()?;
    require_absolute("image folder", &config.dir)?;
    require_absolute("output folder", &config.output_dir)?;
    if !config.dir.is_dir() {
        return Err(BatchError::DirectoryNotFound(config.dir.clone()));
    }

    let descriptors = collect_descriptors(config)?;
    std::fs::create_dir_all(&config.output_dir)?;

    emit(
        &events,
        BatchEvent::BatchStarted {
            source_dir: config.dir.clone(),
            file_count: descriptors.len(),
        },
    );

    let versions: BTreeMap<String, Vec<String>> = descriptors
        .into_par_iter()
        .map(|descriptor| -> Result<(String, Vec<String>), BatchError> {
            let file_name = descriptor.file_name();
            let (names, metadata, infos) = process_file(codec, descriptor, &config.output_dir)?;
            emit(
                &events,
                BatchEvent::FileProcessed {
                    file_name: file_name.clone(),
                    metadata,
                    versions: infos,
                },
            );
            Ok((file_name, names))
        })
        .collect::<Result<_, _>>()?;

    let optimization = if optimize_output {
        optimize::optimize_all(optimizer, &config.output_dir)
    } else {
        Vec::new()
    };
    for report in &optimization {
        let event = match &report.error {
            None => BatchEvent::OptimizePassFinished {
                format: report.format,
                rewritten: report.rewritten.len(),
            },
            Some(message) => BatchEvent::OptimizePassFailed {
                format: report.format,
                message: message.clone(),
            },
        };
        emit(&events, event);
    }

    Ok(BatchResult {
        versions,
        optimization,
    })
}

fn emit(events: &Option<Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        tx.send(event).ok();
    }
}

fn require_absolute(which: &'static str, path: &Path) -> Result<(), BatchError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(BatchError::InvalidPath {
            which,
            path: path.to_path_buf(),
        })
    }
}

/// List the source directory and split every file name.
///
/// Subdirectories are skipped, but still count as entries for the
/// empty-directory check.
fn collect_descriptors(config: &BatchConfig) -> Result<Vec<ImageDescriptor>, BatchError> {
    let entries = WalkDir::new(&config.dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(std::io::Error::from)?;

    if entries.is_empty() {
        return Err(BatchError::EmptyDirectory(config.dir.clone()));
    }

    entries
        .iter()
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            ImageDescriptor::from_file_name(&config.dir, &file_name, &config.versions).map_err(
                |source| BatchError::MalformedFilename {
                    file_name: file_name.clone(),
                    source,
                },
            )
        })
        .collect()
}

/// Probe, plan and render one file. Returns the output names in plan order.
fn process_file(
    codec: &impl ImageCodec,
    descriptor: ImageDescriptor,
    output_dir: &Path,
) -> Result<(Vec<String>, ImageMetadata, Vec<VersionInfo>), BatchError> {
    let file_name = descriptor.file_name();
    let metadata = probe::probe(codec, &descriptor.file_path())
        .map_err(|e| BatchError::from_probe(&file_name, e))?;
    let image = descriptor.measure(metadata);

    let jobs = planner::plan(&image);
    let writers = writer_indices(&jobs);

    jobs.par_iter()
        .enumerate()
        .filter(|(i, _)| writers[*i] == *i)
        .try_for_each(|(_, job)| codec.render(&render_params(&image, job, output_dir)))
        .map_err(|source| BatchError::Codec {
            file_name: file_name.clone(),
            source,
        })?;

    let infos = jobs
        .iter()
        .zip(&writers)
        .map(|(job, &writer)| version_info(&image, job, &jobs[writer]))
        .collect();
    let names = jobs.into_iter().map(|job| job.output_name).collect();
    Ok((names, image.metadata().clone(), infos))
}

/// For each job, the index of the job that writes its output file: the first
/// job in plan order with that output name.
fn writer_indices(jobs: &[RenderJob]) -> Vec<usize> {
    let mut first: HashMap<&str, usize> = HashMap::new();
    jobs.iter()
        .enumerate()
        .map(|(i, job)| *first.entry(job.output_name.as_str()).or_insert(i))
        .collect()
}

fn render_params(image: &MeasuredImage, job: &RenderJob, output_dir: &Path) -> RenderParams {
    RenderParams {
        source: image.file_path(),
        output: output_dir.join(&job.output_name),
        format: image.format(),
        resize: job.resize_box(),
        recipe: RenderRecipe::standard(),
    }
}

fn version_label(job: &RenderJob) -> String {
    match (job.treatment, job.target_width, job.target_height) {
        (Treatment::Root, _, _) => "root".to_string(),
        (_, None, Some(h)) => format!("h{h}"),
        (_, Some(w), None) => format!("w{w}"),
        (_, Some(w), Some(h)) => format!("{w}x{h}"),
        (_, None, None) => "unsized".to_string(),
    }
}

/// `writer` is the job whose render produced `job`'s file.
fn version_info(image: &MeasuredImage, job: &RenderJob, writer: &RenderJob) -> VersionInfo {
    let status = match writer
        .resize_box()
        .and_then(|target| fit_within(image.metadata().dimensions, target))
    {
        Some(dims) => VersionStatus::Resized {
            width: dims.width,
            height: dims.height,
        },
        None => VersionStatus::Recompressed {
            reason: writer.treatment,
        },
    };
    VersionInfo {
        label: version_label(job),
        output_name: job.output_name.clone(),
        status,
    }
}
