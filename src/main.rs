use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tracing::{Level, info};
use tracing_subscriber::util::SubscriberInitExt;

use nxvideo::scene::Scene;
use nxvideo::video::chip::{FRAME_STRIDE, VideoChip, VideoDebugCounters, encode_ppm, frame_sha1};
use nxvideo::video::{SCREEN_HEIGHT, SCREEN_WIDTH};

#[derive(Parser)]
#[command(name = "nxvideo")]
#[command(version, about = "Render LowRes NX style video scenes", long_about = None)]
struct Cli {
    /// Scene description (JSON)
    scene: PathBuf,

    /// Number of frames to render
    #[arg(short, long, default_value_t = 1)]
    frames: u32,

    /// Write the last frame as a binary PPM image
    #[arg(long)]
    ppm: Option<PathBuf>,

    /// Output row stride in bytes
    #[arg(long, default_value_t = FRAME_STRIDE)]
    stride: usize,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Summary {
    scene: String,
    frames: u32,
    width: usize,
    height: usize,
    stride: usize,
    sha1: String,
    counters: VideoDebugCounters,
    recent_events: Vec<String>,
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
        .init();
}

/// Bytes needed for a full screen at `stride`. The last row is not padded.
fn output_len(stride: usize) -> Result<usize> {
    if stride < FRAME_STRIDE {
        bail!("stride {stride} is shorter than a {FRAME_STRIDE}-byte row");
    }
    match (SCREEN_HEIGHT - 1)
        .checked_mul(stride)
        .and_then(|len| len.checked_add(FRAME_STRIDE))
    {
        Some(len) => Ok(len),
        None => bail!("stride {stride} is too large"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let output_len = output_len(cli.stride)?;
    let scene = Scene::from_file(&cli.scene)?;
    let (mut machine, mut script) = scene
        .build()
        .with_context(|| format!("invalid scene: {}", cli.scene.display()))?;

    let mut chip = VideoChip::new();
    let mut output = vec![0u8; output_len];
    for _ in 0..cli.frames {
        chip.render_screen(&mut machine, &mut script, &mut output, cli.stride);
    }
    info!(frames = cli.frames, "rendering finished");

    if let Some(path) = &cli.ppm {
        fs::write(path, encode_ppm(&output, cli.stride))
            .with_context(|| format!("failed to write PPM: {}", path.display()))?;
    }

    let summary = Summary {
        scene: cli.scene.display().to_string(),
        frames: cli.frames,
        width: SCREEN_WIDTH,
        height: SCREEN_HEIGHT,
        stride: cli.stride,
        sha1: frame_sha1(&output),
        counters: chip.debug_counters(),
        recent_events: chip.debug_recent_events(8),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{} frame(s) of {}", summary.frames, summary.scene);
        println!("sha1: {}", summary.sha1);
        let c = &summary.counters;
        println!(
            "scanlines={} interrupts={} planeA={} planeB={}",
            c.scanlines, c.raster_interrupts, c.plane_a_lines, c.plane_b_lines
        );
        println!(
            "spriteLines={} spritesDrawn={} registerChanges={}",
            c.sprite_lines, c.sprites_drawn, c.register_changes
        );
        for event in summary.recent_events.iter().rev() {
            println!("  {event}");
        }
    }

    Ok(())
}
