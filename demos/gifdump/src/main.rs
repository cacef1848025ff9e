//! Decodes a GIF file given on the command line and prints per-frame
//! metadata (dimensions, delay, disposal, transparency) as frames stream in.
//! The pixel-level analogue of `immeta-analyzer`'s `print_gif_metadata`,
//! which only ever printed a `// TODO` for GIF.

use std::fs;
use std::process::ExitCode;

use clap::Parser;

use gifstream::{decode, DecodeOutcome};

#[derive(Parser)]
#[command(name = "gifdump", about = "Streams and prints GIF frame metadata")]
struct Args {
    /// GIF file to decode.
    file: String,

    /// Number of already-delivered frames to skip (resume mode).
    #[arg(long, default_value_t = 0)]
    skip: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let data = match fs::read(&args.file) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("cannot read {}: {e}", args.file);
            return ExitCode::FAILURE;
        }
    };

    let mut frame_count = 0usize;
    let outcome = decode(
        &data,
        args.skip,
        &mut |frame| {
            frame_count += 1;
            println!(
                "frame {:>3}: {:>4}x{:<4} at ({:>4},{:>4}) on {:>4}x{:<4} screen, delay={:>4}, disposal={:?}, transparent={:?}, interlaced={}",
                frame.frame_index,
                frame.width,
                frame.height,
                frame.x_offset,
                frame.y_offset,
                frame.screen_width,
                frame.screen_height,
                frame.delay,
                frame.disposal,
                frame.transparent_color_index,
                frame.interlaced,
            );
        },
        Some(&mut |app| {
            if let Ok(identity) = app.identity() {
                println!(
                    "application extension: {}{}",
                    String::from_utf8_lossy(&identity.identifier),
                    String::from_utf8_lossy(&identity.authentication_code)
                );
            }
        }),
    );

    match outcome {
        DecodeOutcome::Complete(n) => {
            println!("complete: {n} frame(s) total, {frame_count} delivered this call");
            ExitCode::SUCCESS
        }
        DecodeOutcome::Partial(n) => {
            println!(
                "truncated: {n} frame(s) delivered so far, {frame_count} this call; resume with --skip {n}"
            );
            ExitCode::SUCCESS
        }
        DecodeOutcome::Invalid => {
            eprintln!("not a recognizable GIF stream");
            ExitCode::FAILURE
        }
    }
}
