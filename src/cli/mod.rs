//! Command line front end
//!
//! Only available with the `cli` feature.

use crate::{
    backends::CornerSampleRemover,
    config::{PipelineConfig, DEFAULT_TRANSFORM_DEADLINE},
    session::RemovalSession,
    transform::BackgroundRemover,
    tracing_config::TracingConfig,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[cfg(feature = "onnx")]
use crate::{backends::OnnxRemover, model::ModelFetcher};

/// Remove the background from an image and write PNG downloads
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "nobg")]
pub struct Cli {
    /// Input image file (JPEG, PNG or WebP; use "-" for stdin)
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Directory the download artifacts are written into
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Deadline for the background removal step in seconds (0 disables it)
    #[arg(long, default_value_t = DEFAULT_TRANSFORM_DEADLINE.as_secs())]
    pub timeout_secs: u64,

    /// Use the built-in corner-sampling remover instead of a neural model
    #[arg(long)]
    pub mock: bool,

    /// Model file path or URL to download
    #[cfg(feature = "onnx")]
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Print a JSON summary of the run to stdout
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// CLI entry point
///
/// # Errors
///
/// Any pipeline or I/O failure. Intake and transform failures are also printed
/// as the inline error message before returning.
pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    TracingConfig::new(cli.verbose).init()?;

    let config = PipelineConfig::builder()
        .transform_deadline(match cli.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        })
        .debug(cli.verbose >= 2)
        .build()
        .context("invalid pipeline configuration")?;

    let remover = build_remover(&cli).await?;
    let (bytes, file_name) = read_input(&cli.input)?;

    std::fs::create_dir_all(&cli.output_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            cli.output_dir.display()
        )
    })?;

    let spinner = make_spinner();
    let mut session = RemovalSession::new(config, remover);
    if cli.verbose >= 1 {
        session = session.with_progress(Arc::new(crate::progress::ConsoleProgressReporter));
    }
    let outcome = session.process_upload(file_name.as_deref(), &bytes).await;
    spinner.finish_and_clear();

    let completed = match outcome {
        Ok(completed) => completed,
        Err(err) => {
            // Mirror the inline error shown to end users, then fail
            if let Some(inline) = session.inline_error() {
                eprintln!("{inline}");
            }
            return Err(err.into());
        },
    };

    let mut written = Vec::new();
    for artifact in &completed.downloads {
        let path = cli.output_dir.join(&artifact.file_name);
        std::fs::write(&path, artifact.bytes.as_slice())
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        info!(path = %path.display(), bytes = artifact.byte_len(), "artifact written");
        written.push(path);
    }

    if cli.json {
        print_json_summary(&completed, &written)?;
    } else {
        let (width, height) = completed.result.dimensions();
        println!(
            "Background removed ({width}x{height}, {} via {})",
            completed.source.format, completed.result.metadata.remover_name
        );
        for path in &written {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

async fn build_remover(cli: &Cli) -> Result<Arc<dyn BackgroundRemover>> {
    if cli.mock {
        return Ok(Arc::new(CornerSampleRemover::default()));
    }

    #[cfg(feature = "onnx")]
    {
        let model_path = resolve_model(cli.model.as_deref()).await?;
        let remover =
            OnnxRemover::from_model_file(&model_path).context("failed to load ONNX model")?;
        Ok(Arc::new(remover))
    }

    #[cfg(not(feature = "onnx"))]
    anyhow::bail!("built without the onnx feature; rerun with --mock")
}

#[cfg(feature = "onnx")]
async fn resolve_model(model: Option<&str>) -> Result<PathBuf> {
    match model {
        Some(spec) if !spec.starts_with("http://") && !spec.starts_with("https://") => {
            let path = PathBuf::from(spec);
            anyhow::ensure!(path.exists(), "model file '{}' does not exist", spec);
            Ok(path)
        },
        spec => {
            let url = spec.unwrap_or(crate::model::DEFAULT_MODEL_URL);
            let fetcher = ModelFetcher::new().context("failed to set up model cache")?;
            fetcher
                .fetch(url)
                .await
                .with_context(|| format!("failed to fetch model from '{url}'"))
        },
    }
}

fn read_input(input: &str) -> Result<(Vec<u8>, Option<String>)> {
    if input == "-" {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("failed to read image from stdin")?;
        // No file name, so intake relies on content sniffing alone
        return Ok((bytes, None));
    }

    let path = Path::new(input);
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(ToString::to_string);
    Ok((bytes, file_name))
}

fn make_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Removing background...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_json_summary(
    completed: &crate::session::CompletedRequest,
    written: &[PathBuf],
) -> Result<()> {
    let (width, height) = completed.result.dimensions();
    let summary = serde_json::json!({
        "width": width,
        "height": height,
        "input_format": completed.source.format.to_string(),
        "remover": completed.result.metadata.remover_name,
        "timings": completed.result.metadata.timings,
        "artifacts": written
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
