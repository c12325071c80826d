//! Command-line front end for vigil archives.
//!
//! Exercises the full pipeline from provider discovery through the
//! worker-backed video source: `info` inspects an archive, `seek` issues a
//! single identified request, and `scrub` steps through the archive with
//! strictly-after seeks.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::Receiver;

use vigil_source::{SourceEvent, SourceService, VideoSource};
use vigil_types::{Requestor, SeekMode, SeekRequest, Timestamp};

const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(author, version, about = "Inspect and scrub vigil video archives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover an archive and print its frame range and metadata summary.
    Info {
        /// Path to the archive file.
        archive: String,
    },

    /// Issue a single seek and print the resolved frame.
    Seek {
        /// Path to the archive file.
        archive: String,

        /// Seek position in seconds.
        #[arg(long)]
        time: Option<f64>,

        /// Seek position as a frame number.
        #[arg(long)]
        frame: Option<u32>,

        /// How to resolve a position that falls between frames.
        #[arg(long, value_enum, default_value_t = SeekMode::Nearest)]
        mode: SeekMode,
    },

    /// Step through the archive with strictly-after seeks.
    Scrub {
        /// Path to the archive file.
        archive: String,

        /// Starting time in seconds; defaults to the first frame.
        #[arg(long)]
        from: Option<f64>,

        /// Maximum number of frames to visit.
        #[arg(long, default_value_t = 25)]
        count: usize,
    },
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info { archive } => info(&archive),
        Commands::Seek {
            archive,
            time,
            frame,
            mode,
        } => seek(&archive, time, frame, mode),
        Commands::Scrub {
            archive,
            from,
            count,
        } => scrub(&archive, from, count),
    }
}

fn open_source(archive: &str) -> Result<(VideoSource, Receiver<SourceEvent>)> {
    let service = SourceService::with_default_providers();
    let reader = service
        .create_archive_source(archive)
        .with_context(|| format!("no provider recognizes '{archive}'"))?;
    Ok(VideoSource::from_reader(reader))
}

fn info(archive: &str) -> Result<()> {
    let service = SourceService::with_default_providers();
    for plugin in service.plugin_info() {
        tracing::debug!(
            description = %plugin.description,
            extensions = ?plugin.extensions,
            "registered provider"
        );
    }

    let reader = service
        .create_archive_source(archive)
        .with_context(|| format!("no provider recognizes '{archive}'"))?;

    let metadata = reader.metadata();
    println!("archive: {}", reader.uri());
    println!("frames: {}", metadata.len());
    if let Some((first, last)) = reader.frame_range() {
        println!("range: {first} .. {last}");
    }
    if let Some(meta) = metadata.first() {
        println!("size: {}x{}", meta.width, meta.height);
        if meta.gsd >= 0.0 {
            println!("gsd: {} m/px", meta.gsd);
        }
        let located = metadata.iter().filter(|m| m.world_location.is_some()).count();
        if located > 0 {
            println!("georeferenced frames: {located}");
        }
    }
    Ok(())
}

fn seek(archive: &str, time: Option<f64>, frame: Option<u32>, mode: SeekMode) -> Result<()> {
    let position = match (time, frame) {
        (Some(t), Some(n)) => Timestamp::new(t, n),
        (Some(t), None) => Timestamp::from_time(t),
        (None, Some(n)) => Timestamp::from_frame_number(n),
        (None, None) => bail!("seek needs --time and/or --frame"),
    };

    let (source, _events) = open_source(archive)?;
    let (requestor, replies) = Requestor::new();
    source.request_frame(SeekRequest::new(position, mode, &requestor, 0));

    let reply = replies
        .recv_timeout(REPLY_TIMEOUT)
        .context("timed out waiting for a frame reply")?;
    match reply.frame {
        Some(frame) => {
            let meta = &frame.metadata;
            println!("resolved {position} -> {}", frame.timestamp());
            println!("size: {}x{}", meta.width, meta.height);
            if let Some(world) = &meta.world_location {
                println!("gcs: {}", world.gcs);
            }
        }
        None => println!("no frame at {position}"),
    }
    Ok(())
}

fn scrub(archive: &str, from: Option<f64>, count: usize) -> Result<()> {
    let (source, events) = open_source(archive)?;

    let mut position = match from {
        Some(t) => Timestamp::from_time(t),
        None => await_frame_range(&events)?.0,
    };
    // The first request lands at-or-after the starting point; every
    // request after that is strictly-after the frame just served.
    let mut mode = SeekMode::LowerBound;

    let (requestor, replies) = Requestor::new();
    for id in 0..count as i64 {
        source.request_frame(SeekRequest::new(position, mode, &requestor, id));
        let reply = replies
            .recv_timeout(REPLY_TIMEOUT)
            .context("timed out waiting for a frame reply")?;
        match reply.frame {
            Some(frame) => {
                println!("#{id}: {}", frame.timestamp());
                position = frame.timestamp();
                mode = SeekMode::Next;
            }
            None => {
                tracing::info!("end of archive after {id} frames");
                break;
            }
        }
    }
    Ok(())
}

fn await_frame_range(events: &Receiver<SourceEvent>) -> Result<(Timestamp, Timestamp)> {
    let deadline = Instant::now() + REPLY_TIMEOUT;
    while let Ok(event) = events.recv_deadline(deadline) {
        if let SourceEvent::FrameRangeAvailable(first, last) = event {
            return Ok((first, last));
        }
    }
    bail!("source never announced a frame range")
}
