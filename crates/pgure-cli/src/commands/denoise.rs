use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use pgure_core::io::image_io::export_frames;
use pgure_core::io::ser::SerReader;
use pgure_core::io::ser_writer::write_sequence;
use pgure_core::pipeline::config::{DenoiseConfig, ThresholdMode};
use pgure_core::pipeline::{
    denoise_sequence_reported, Collaborators, PipelineStage, ProgressReporter,
};

use crate::progress::BarReporter;
use crate::summary::{print_report, print_run_summary};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ExportFormat {
    Tiff,
    Png,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Tiff => "tiff",
            Self::Png => "png",
        }
    }
}

#[derive(Args)]
pub struct DenoiseArgs {
    /// Input SER file
    pub file: PathBuf,

    /// Output SER file (defaults to <input>_denoised.ser)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Denoise config file (TOML). Flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Temporal window length in frames (odd)
    #[arg(short = 'T', long)]
    pub window: Option<usize>,

    /// Patch size in pixels
    #[arg(long)]
    pub patch_size: Option<usize>,

    /// Step between patch origins (1 = maximal overlap)
    #[arg(long)]
    pub patch_step: Option<usize>,

    /// Use a fixed threshold instead of the adaptive search
    #[arg(long)]
    pub lambda: Option<f64>,

    /// Relative tolerance of the adaptive lambda search
    #[arg(long, conflicts_with = "lambda")]
    pub tolerance: Option<f64>,

    /// Cap on risk evaluations per frame
    #[arg(long, conflicts_with = "lambda")]
    pub max_evaluations: Option<usize>,

    /// Start every search from the window mean
    #[arg(long, conflicts_with = "lambda")]
    pub no_warm_start: bool,

    /// Keep the configured noise parameters instead of estimating them
    #[arg(long)]
    pub no_noise_estimate: bool,

    /// Detector gain of the noise model
    #[arg(long)]
    pub gain: Option<f64>,

    /// Detector offset of the noise model
    #[arg(long)]
    pub offset: Option<f64>,

    /// Gaussian read noise of the noise model
    #[arg(long)]
    pub sigma: Option<f64>,

    /// Block-matching search radius in pixels
    #[arg(long)]
    pub motion: Option<usize>,

    /// Median filter size in pixels (odd)
    #[arg(long)]
    pub median: Option<usize>,

    /// Hot pixel threshold in robust sigmas (0 disables)
    #[arg(long)]
    pub hot_pixel: Option<f64>,

    /// Worker threads (defaults to all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Also write every denoised frame as an image into this directory
    #[arg(long)]
    pub export_frames: Option<PathBuf>,

    /// Image format for --export-frames
    #[arg(long, value_enum, default_value = "tiff")]
    pub export_format: ExportFormat,

    /// Skip the per-frame table
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn run(args: &DenoiseArgs) -> Result<()> {
    let config = build_config(args)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.file));

    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let reporter = Arc::new(BarReporter::new());

    reporter.begin_stage(PipelineStage::Reading, Some(reader.frame_count()));
    let sequence = reader
        .read_sequence()
        .with_context(|| format!("Failed to read frames from {}", args.file.display()))?;
    reporter.finish_stage();

    print_run_summary(&config, &args.file, &output, sequence.shape());

    let collaborators = Collaborators::from_config(&config);
    let result = denoise_sequence_reported(&sequence, &config, &collaborators, reporter.clone())
        .context("Denoising failed")?;

    reporter.begin_stage(PipelineStage::Writing, None);
    let timestamps = reader.timestamps();
    write_sequence(
        &output,
        &result.sequence,
        &reader.header,
        timestamps.as_deref(),
    )
    .with_context(|| format!("Failed to write {}", output.display()))?;

    if let Some(ref dir) = args.export_frames {
        let prefix = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("frame");
        export_frames(
            &result.sequence,
            reader.header.max_value(),
            dir,
            prefix,
            args.export_format.extension(),
        )
        .with_context(|| format!("Failed to export frames to {}", dir.display()))?;
    }
    reporter.finish_stage();
    reporter.finish();

    if !args.quiet {
        print_report(&result.report);
    }
    println!("Output saved to {}", output.display());
    Ok(())
}

fn build_config(args: &DenoiseArgs) -> Result<DenoiseConfig> {
    let mut config: DenoiseConfig = if let Some(ref path) = args.config {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).context("Invalid denoise config")?
    } else {
        DenoiseConfig::default()
    };

    if let Some(t) = args.window {
        config.window_length = t;
    }
    if let Some(p) = args.patch_size {
        config.patch.size = p;
    }
    if let Some(step) = args.patch_step {
        config.patch.overlap = step;
    }
    if let Some(threads) = args.threads {
        config.threads = Some(threads);
    }
    if let Some(radius) = args.motion {
        config.motion.search_radius = radius;
    }
    if let Some(size) = args.median {
        config.preprocess.median_size = size;
    }
    if let Some(threshold) = args.hot_pixel {
        config.preprocess.hot_pixel_threshold = threshold;
    }
    if let Some(gain) = args.gain {
        config.noise.gain = gain;
    }
    if let Some(offset) = args.offset {
        config.noise.offset = offset;
    }
    if let Some(sigma) = args.sigma {
        config.noise.sigma = sigma;
    }
    if args.no_noise_estimate {
        config.noise.estimate = false;
    }

    if let Some(lambda) = args.lambda {
        config.threshold = ThresholdMode::Fixed { lambda };
    }
    match config.threshold {
        ThresholdMode::Adaptive {
            ref mut tolerance,
            ref mut max_evaluations,
            ref mut warm_start,
        } => {
            if let Some(tol) = args.tolerance {
                *tolerance = tol;
            }
            if let Some(cap) = args.max_evaluations {
                *max_evaluations = cap;
            }
            if args.no_warm_start {
                *warm_start = false;
            }
        }
        ThresholdMode::Fixed { .. } => {
            if args.tolerance.is_some() || args.max_evaluations.is_some() || args.no_warm_start {
                bail!(
                    "--tolerance, --max-evaluations and --no-warm-start apply only to the \
                     adaptive threshold, but the config selects a fixed lambda"
                );
            }
        }
    }
    Ok(config)
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}_denoised.ser"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: DenoiseArgs,
    }

    fn parse(argv: &[&str]) -> std::result::Result<DenoiseArgs, clap::Error> {
        TestCli::try_parse_from(std::iter::once("pgure").chain(argv.iter().copied()))
            .map(|cli| cli.args)
    }

    #[test]
    fn test_search_flags_override_adaptive_defaults() {
        let args = parse(&["in.ser", "--tolerance", "1e-5", "--no-warm-start"]).unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(
            config.threshold,
            ThresholdMode::Adaptive {
                tolerance: 1e-5,
                max_evaluations: 1000,
                warm_start: false,
            }
        );
    }

    #[test]
    fn test_search_flags_conflict_with_lambda() {
        assert!(parse(&["in.ser", "--lambda", "0.1", "--tolerance", "1e-5"]).is_err());
        assert!(parse(&["in.ser", "--lambda", "0.1", "--no-warm-start"]).is_err());
        let args = parse(&["in.ser", "--lambda", "0.1"]).unwrap();
        assert_eq!(
            build_config(&args).unwrap().threshold,
            ThresholdMode::Fixed { lambda: 0.1 }
        );
    }

    #[test]
    fn test_search_flags_rejected_for_fixed_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixed.toml");
        std::fs::write(&path, "[threshold]\nmode = \"fixed\"\nlambda = 0.05\n").unwrap();
        let config_arg = path.to_string_lossy().into_owned();

        let args = parse(&["in.ser", "--config", &config_arg, "--max-evaluations", "5"]).unwrap();
        assert!(build_config(&args).is_err());

        let args = parse(&["in.ser", "--config", &config_arg]).unwrap();
        assert_eq!(
            build_config(&args).unwrap().threshold,
            ThresholdMode::Fixed { lambda: 0.05 }
        );
    }
}
