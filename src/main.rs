use clap::{Parser, Subcommand};
use image_versions::config::{self, BatchConfig, VersionSpec};
use image_versions::imaging::RustCodec;
use image_versions::{naming, output, probe, process};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "image-versions")]
#[command(about = "Batch-render images into resized versions with geometry-encoding names")]
#[command(long_about = "\
Batch-render images into resized versions with geometry-encoding names

Every file in the source directory (subdirectories are skipped) is rendered
once at its own size and once per requested size. Output names encode the
source geometry and the requested height:

  dawn.jpg  (1200x800, sizes x400 and x200)
  → dawn_aspR_1.500_w1200_h800_e.jpg       root version
  → dawn_aspR_1.500_w1200_h800_e400.jpg    requested height 400
  → dawn_aspR_1.500_w1200_h800_e200.jpg    requested height 200

Sizes are WxH, xH (height only) or Wx (width only); the image keeps its
aspect ratio and fits inside the box. GIFs are never resized. A 400px-high
version of a source that is already 70 KB or smaller is only recompressed.

Only jpeg, png and gif sources are accepted; any other file aborts the
batch. After rendering, PNG, JPEG and GIF optimization passes run over the
whole output directory.

Run 'image-versions gen-config' to print a sample batch config.")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Batch config file (JSON)
    #[arg(long, conflicts_with_all = ["dir", "output_dir", "sizes"])]
    config: Option<PathBuf>,

    /// Source image directory (absolute)
    #[arg(long, required_unless_present = "config")]
    dir: Option<PathBuf>,

    /// Output directory (absolute, created if missing)
    #[arg(long, required_unless_present = "config")]
    output_dir: Option<PathBuf>,

    /// Requested size: WxH, xH or Wx. Repeat or comma-separate for several
    #[arg(
        long = "size",
        value_name = "WxH",
        value_delimiter = ',',
        required_unless_present = "config"
    )]
    sizes: Vec<VersionSpec>,

    /// Maximum worker threads (capped at the number of cores)
    #[arg(long)]
    jobs: Option<usize>,

    /// Skip the post-render optimization passes
    #[arg(long)]
    no_optimize: bool,

    /// Write the result map as JSON to this file
    #[arg(long)]
    manifest: Option<PathBuf>,
}

impl RunArgs {
    fn batch_config(&self) -> Result<BatchConfig, Box<dyn std::error::Error>> {
        if let Some(path) = &self.config {
            return Ok(config::load_config(path)?);
        }
        Ok(BatchConfig {
            dir: self.dir.clone().ok_or("--dir is required without --config")?,
            output_dir: self
                .output_dir
                .clone()
                .ok_or("--output-dir is required without --config")?,
            versions: self.sizes.clone(),
        })
    }
}

#[derive(Subcommand)]
enum Command {
    /// Render every image in a directory into its versions
    Run(RunArgs),
    /// Print format, dimensions and size of one image
    Probe {
        /// Image file
        file: PathBuf,
    },
    /// Print the output name for the given source geometry
    Name {
        /// Base name of the source file (without extension)
        base: String,
        /// Extension, with or without the leading dot
        ext: String,
        /// Source width in pixels
        width: u32,
        /// Source height in pixels
        height: u32,
        /// Requested height tag (omit for the root version)
        tag: Option<u32>,
    },
    /// Print a sample batch config
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let batch = args.batch_config()?;
            init_thread_pool(args.jobs);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::run(&batch, !args.no_optimize, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let result = result?;

            if let Some(path) = &args.manifest {
                let json = serde_json::to_string_pretty(&result)?;
                std::fs::write(path, json)?;
            }
            output::print_result(&result);

            let failed = result.optimization_failures().count();
            if failed > 0 {
                return Err(format!("{failed} optimization pass(es) failed").into());
            }
        }
        Command::Probe { file } => {
            let metadata = probe::probe(&RustCodec::new(), &file)?;
            output::print_probe(&file, &metadata);
        }
        Command::Name {
            base,
            ext,
            width,
            height,
            tag,
        } => {
            let ext = if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            };
            println!("{}", naming::build_name(&base, &ext, width, height, tag));
        }
        Command::GenConfig => {
            println!("{}", config::sample_config_json());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(jobs: Option<usize>) {
    let threads = config::effective_threads(jobs);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
