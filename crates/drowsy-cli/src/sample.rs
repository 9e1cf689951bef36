//! Sample file generation - default config and synthetic frame recordings.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use drowsy_core::{DetectorConfig, FrameInput};
use rand::Rng;

#[derive(Args)]
pub struct SampleConfigArgs {
    /// Where to write the configuration file
    #[arg(short, long, default_value = "config.json")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct SampleInputArgs {
    /// Where to write the frame-record file
    #[arg(short, long, default_value = "frames.json")]
    pub output: PathBuf,

    /// Number of frames to generate
    #[arg(short, long, default_value_t = 100)]
    pub frames: usize,
}

pub fn write_sample_config(args: &SampleConfigArgs) -> Result<()> {
    let json = serde_json::to_string_pretty(&DetectorConfig::default())?;
    fs::write(&args.output, json)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("Sample configuration file created: {}", args.output.display());
    Ok(())
}

pub fn write_sample_input(args: &SampleInputArgs) -> Result<()> {
    let frames = generate_frames(args.frames);
    let json = serde_json::to_string_pretty(&frames)?;
    fs::write(&args.output, json)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "Sample input file created: {} ({} frames)",
        args.output.display(),
        frames.len()
    );
    Ok(())
}

/// Generate a synthetic recording: the first 10 frames of every 50-frame
/// block are a closed-eye burst, the rest are open eyes.
fn generate_frames(count: usize) -> Vec<FrameInput> {
    let mut rng = rand::rng();
    (0..count)
        .map(|i| {
            let (left, right) = if i % 50 < 10 {
                (rng.random_range(0.0..0.2), rng.random_range(0.0..0.2))
            } else {
                (rng.random_range(0.5..1.0), rng.random_range(0.5..1.0))
            };
            FrameInput {
                frame_num: (i + 1) as i64,
                left_eye_open: left,
                right_eye_open: right,
                face_confidence: rng.random_range(0.8..1.0),
            }
        })
        .collect()
}
