//! Generate large MOT-format test data.
//!
//! Produces tracks with linear movement plus noise, varying confidence,
//! and proper track continuity, for exercising the prefetching cache
//! against realistically sized files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "generate-mot-data", about = "Generate MOT-format test data")]
struct Args {
    /// Output file path.
    #[arg(short, long)]
    output: PathBuf,

    /// Number of tracks to generate.
    #[arg(short, long, default_value_t = 100)]
    tracks: usize,

    /// Number of frames to generate.
    #[arg(short, long, default_value_t = 10_000)]
    frames: u64,

    /// Image width in pixels.
    #[arg(long, default_value_t = 1920.0)]
    width: f64,

    /// Image height in pixels.
    #[arg(long, default_value_t = 1080.0)]
    height: f64,

    /// Minimum track length in frames.
    #[arg(long, default_value_t = 10)]
    min_track_length: u64,

    /// Maximum track length in frames.
    #[arg(long, default_value_t = 200)]
    max_track_length: u64,

    /// Random seed for reproducible generation.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// A single object track with its movement parameters.
struct Track {
    track_id: u64,
    start_frame: u64,
    end_frame: u64,
    start_x: f64,
    start_y: f64,
    velocity_x: f64,
    velocity_y: f64,
    width: f64,
    height: f64,
    base_confidence: f64,
}

impl Track {
    fn position(&self, frame: u64, rng: &mut StdRng) -> (f64, f64) {
        let offset = (frame - self.start_frame) as f64;
        let x = self.start_x + self.velocity_x * offset + rng.gen_range(-2.0..2.0);
        let y = self.start_y + self.velocity_y * offset + rng.gen_range(-2.0..2.0);
        (x, y)
    }

    fn confidence(&self, frame: u64, rng: &mut StdRng) -> f64 {
        let wobble = 0.1 * (frame as f64 * 0.1).sin();
        let noise = rng.gen_range(-0.05..0.05);
        (self.base_confidence + wobble + noise).clamp(0.1, 1.0)
    }
}

fn generate_tracks(args: &Args, rng: &mut StdRng) -> Vec<Track> {
    let margin = 100.0;
    (1..=args.tracks as u64)
        .map(|track_id| {
            let length = rng.gen_range(args.min_track_length..=args.max_track_length);
            let start_frame = rng.gen_range(1..=args.frames.saturating_sub(args.min_track_length).max(1));
            Track {
                track_id,
                start_frame,
                end_frame: (start_frame + length).min(args.frames),
                start_x: rng.gen_range(margin..args.width - margin),
                start_y: rng.gen_range(margin..args.height - margin),
                velocity_x: rng.gen_range(-5.0..5.0),
                velocity_y: rng.gen_range(-5.0..5.0),
                width: rng.gen_range(50.0..200.0),
                height: rng.gen_range(50.0..200.0),
                base_confidence: rng.gen_range(0.4..0.95),
            }
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    info!(
        output = %args.output.display(),
        tracks = args.tracks,
        frames = args.frames,
        seed = args.seed,
        "Generating MOT data"
    );

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tracks = generate_tracks(&args, &mut rng);
    let mut writer = BufWriter::new(File::create(&args.output)?);
    let mut lines_written: u64 = 0;

    for frame in 1..=args.frames {
        for track in &tracks {
            if frame < track.start_frame || frame > track.end_frame {
                continue;
            }

            let (x, y) = track.position(frame, &mut rng);
            let confidence = track.confidence(frame, &mut rng);

            let bb_left = (x - track.width / 2.0).max(0.0);
            let bb_top = (y - track.height / 2.0).max(0.0);
            let bb_width = track.width.min(args.width - bb_left);
            let bb_height = track.height.min(args.height - bb_top);

            // Drop boxes that shrank out of the image.
            if bb_width < 10.0 || bb_height < 10.0 {
                continue;
            }

            writeln!(
                writer,
                "{frame},{},{bb_left:.1},{bb_top:.1},{bb_width:.1},{bb_height:.1},{confidence:.5},{x:.1},{y:.1},0.0",
                track.track_id
            )?;
            lines_written += 1;
        }

        if frame % 1000 == 0 {
            info!(frame, total = args.frames, lines_written, "Progress");
        }
    }

    writer.flush()?;

    let file_size = std::fs::metadata(&args.output)?.len();
    info!(
        lines_written,
        frames = args.frames,
        tracks = tracks.len(),
        file_size,
        "Generation complete"
    );

    Ok(())
}
