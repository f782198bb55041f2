//! image-retrieval - print the path of the image that best matches a prompt.
//!
//! ## Usage
//!
//! ```bash
//! image-retrieval --folder ~/Pictures --prompt "a dog on a beach"
//! ```
//!
//! stdout carries exactly one line: the matching path, or an empty line when
//! nothing matched or anything failed. Progress goes to stderr. The exit code
//! is 0 in both cases.

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use image_retrieval::{config::CONFIG_ENV, logging, result_line, retrieve_best_image, Config};

#[derive(Debug, Parser)]
#[command(
    name = "image-retrieval",
    version,
    about = "Find the image in a folder that best matches a text prompt",
    after_help = format!(
        "ENVIRONMENT:\n    {}    Path to config file (overrides default location)\n    {}       Log filter (trace, debug, info, warn, error)",
        CONFIG_ENV,
        logging::LOG_ENV
    )
)]
struct Args {
    /// Path to image folder
    #[arg(long)]
    folder: PathBuf,

    /// Text description to match
    #[arg(long)]
    prompt: String,

    /// Path to config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let (config, config_error) = match Config::load(args.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    if let Some(e) = config_error {
        tracing::warn!("Using default configuration: {:#}", e);
    }

    tracing::info!(
        "Started with folder={}, prompt={}",
        args.folder.display(),
        args.prompt
    );

    let best = retrieve_best_image(&args.folder, &args.prompt, &config);

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout
        .write_all(result_line(best.as_deref()).as_bytes())
        .and_then(|_| stdout.flush())
    {
        tracing::error!("Failed to write result: {}", e);
    }
}
