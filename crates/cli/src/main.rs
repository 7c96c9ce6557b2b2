//! capburn - burn timed form-analysis captions into a workout video
//!
//! # Usage
//!
//! ```bash
//! # Captions as returned by the analysis service
//! capburn squat.mov --captions analysis.json
//!
//! # Custom styling and output location
//! capburn file:///videos/squat.mov --captions analysis.json \
//!     --config overlay.json --output-dir renders/
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use overlay_engine::{OverlayConfig, OverlayPipeline, RenderFailure};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "capburn")]
#[command(about = "Burn timed captions into a local video", long_about = None)]
struct Args {
    /// Source video as a path or file:// URI
    #[arg(value_name = "INPUT")]
    input: String,

    /// JSON captions: an analysis response or a bare item array
    #[arg(long, value_name = "FILE")]
    captions: PathBuf,

    /// JSON overlay config; unspecified keys keep their defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for the rendered file (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Font file passed to the text renderer
    #[arg(long, value_name = "FILE")]
    font_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let captions = match load_captions(&args.captions) {
        Ok(captions) => captions,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(2);
        }
    };

    match render(&args, &captions).await {
        Ok(output) => {
            println!("{}", output.display());
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("{failure}");
            ExitCode::FAILURE
        }
    }
}

async fn render(args: &Args, captions: &Value) -> Result<PathBuf, RenderFailure> {
    let mut config = match &args.config {
        Some(path) => OverlayConfig::from_json_file(path)?,
        None => OverlayConfig::default(),
    };
    if let Some(dir) = &args.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(font) = &args.font_file {
        config.font_file = Some(font.clone());
    }

    let pipeline = OverlayPipeline::with_ffmpeg(config)?;
    info!(input = %args.input, "rendering captions");
    Ok(pipeline.render_json(&args.input, captions).await?)
}

fn load_captions(path: &Path) -> anyhow::Result<Value> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read captions {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse captions {}", path.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries only the output path.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::{Args, load_captions};

    #[test]
    fn args_parse_required_and_optional_flags() {
        let args = Args::try_parse_from([
            "capburn",
            "squat.mov",
            "--captions",
            "analysis.json",
            "--output-dir",
            "renders",
        ])
        .expect("args should parse");

        assert_eq!(args.input, "squat.mov");
        assert_eq!(args.captions.to_str(), Some("analysis.json"));
        assert_eq!(
            args.output_dir.as_deref().and_then(|dir| dir.to_str()),
            Some("renders")
        );
        assert!(args.config.is_none());
    }

    #[test]
    fn args_require_captions() {
        assert!(Args::try_parse_from(["capburn", "squat.mov"]).is_err());
    }

    #[test]
    fn load_captions_reports_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        file.write_all(b"{ not json").expect("captions should be written");

        let err = load_captions(file.path()).expect_err("invalid json must fail");
        assert!(format!("{err:#}").contains("parse captions"));
    }
}
