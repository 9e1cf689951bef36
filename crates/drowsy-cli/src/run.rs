//! Run command - feed recorded frames through the detector.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use drowsy_core::{DetectorConfig, Drowsiness, DrowsyDetector, FrameInput, Verdict};
use tracing::info;

#[derive(Args)]
pub struct RunArgs {
    /// JSON file containing an array of frame records
    #[arg(short, long)]
    pub input: PathBuf,

    /// Configuration file (JSON); defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write verdict records to this file as a JSON array
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Frame rate of the recording in fps
    #[arg(long, default_value_t = 30.0)]
    pub frame_rate: f64,
}

/// Per-run verdict tallies for the summary line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub normal: usize,
    pub drowsy: usize,
    pub error: usize,
}

impl RunSummary {
    pub fn tally(verdicts: &[Verdict]) -> Self {
        let mut summary = Self {
            total: verdicts.len(),
            ..Default::default()
        };
        for v in verdicts {
            match v.is_drowsy {
                Drowsiness::Drowsy => summary.drowsy += 1,
                Drowsiness::Error => summary.error += 1,
                Drowsiness::NotDrowsy => summary.normal += 1,
            }
        }
        summary
    }

    fn percent(&self, count: usize) -> f64 {
        100.0 * count as f64 / self.total.max(1) as f64
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut detector = DrowsyDetector::new(config).context("invalid configuration")?;
    detector
        .set_frame_rate(args.frame_rate)
        .context("invalid frame rate")?;

    let frames = load_frames(&args.input)?;
    info!(frames = frames.len(), "processing input");

    let verdicts: Vec<Verdict> = frames.iter().map(|f| detector.update(f)).collect();

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(&verdicts)?;
        fs::write(output, json)
            .with_context(|| format!("failed to write results to {}", output.display()))?;
        println!("Results saved to: {}", output.display());
    }

    print_summary(&RunSummary::tally(&verdicts));
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<DetectorConfig> {
    match path {
        None => Ok(DetectorConfig::default()),
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config JSON in {}", path.display()))
        }
    }
}

fn load_frames(path: &std::path::Path) -> Result<Vec<FrameInput>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read input {}", path.display()))?;
    let frames: Vec<FrameInput> = serde_json::from_str(&text)
        .with_context(|| format!("invalid frame JSON in {}", path.display()))?;
    for (i, frame) in frames.iter().enumerate() {
        frame
            .validate()
            .with_context(|| format!("invalid frame record at index {i}"))?;
    }
    Ok(frames)
}

fn print_summary(summary: &RunSummary) {
    println!("=== Run summary ===");
    println!("Total frames:  {}", summary.total);
    println!(
        "Normal frames: {} ({:.1}%)",
        summary.normal,
        summary.percent(summary.normal)
    );
    println!(
        "Drowsy frames: {} ({:.1}%)",
        summary.drowsy,
        summary.percent(summary.drowsy)
    );
    println!(
        "Error frames:  {} ({:.1}%)",
        summary.error,
        summary.percent(summary.error)
    );
    if summary.drowsy > 0 {
        println!("Drowsiness detected!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drowsy_core::ErrorCode;

    fn verdict(is_drowsy: Drowsiness, error_code: Option<ErrorCode>) -> Verdict {
        Verdict {
            is_drowsy,
            frame_num: 0,
            left_eye_closed: false,
            right_eye_closed: false,
            continuous_time: 0.0,
            error_code,
        }
    }

    #[test]
    fn test_tally() {
        let verdicts = vec![
            verdict(Drowsiness::NotDrowsy, None),
            verdict(Drowsiness::Drowsy, None),
            verdict(Drowsiness::Error, Some(ErrorCode::LowFaceConfidence)),
            verdict(Drowsiness::NotDrowsy, None),
        ];
        let summary = RunSummary::tally(&verdicts);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.normal, 2);
        assert_eq!(summary.drowsy, 1);
        assert_eq!(summary.error, 1);
    }

    #[test]
    fn test_percent_handles_empty_run() {
        let summary = RunSummary::tally(&[]);
        assert_eq!(summary.percent(summary.normal), 0.0);
    }
}
