use std::env;
use std::process::ExitCode;

use cdg_replayer::{CdgPlayer, Result};

struct Args {
    file: Option<String>,
    snapshot_ms: Option<u32>,
    snapshot_out: String,
    tempo: Option<i32>,
    show_help: bool,
}

fn parse_args() -> Args {
    let mut parsed = Args {
        file: None,
        snapshot_ms: None,
        snapshot_out: "frame.png".to_string(),
        tempo: None,
        show_help: false,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                parsed.show_help = true;
            }
            "--snapshot" => match args.next().and_then(|v| v.parse().ok()) {
                Some(ms) => parsed.snapshot_ms = Some(ms),
                None => {
                    eprintln!("--snapshot requires a time in milliseconds");
                    parsed.show_help = true;
                }
            },
            "--out" => match args.next() {
                Some(path) => parsed.snapshot_out = path,
                None => {
                    eprintln!("--out requires a file path");
                    parsed.show_help = true;
                }
            },
            "--tempo" => match args.next().and_then(|v| v.parse().ok()) {
                Some(percent) => parsed.tempo = Some(percent),
                None => {
                    eprintln!("--tempo requires an integer percent");
                    parsed.show_help = true;
                }
            },
            _ if arg.starts_with('-') => {
                eprintln!("Unknown flag: {}", arg);
                parsed.show_help = true;
            }
            _ => {
                parsed.file = Some(arg);
            }
        }
    }
    parsed
}

fn print_usage() {
    eprintln!(
        "Usage:\n  cdg-replayer [--snapshot <ms>] [--out <file.png>] [--tempo <percent>] <file.cdg>\n\nFlags:\n  --snapshot <ms>   Export the frame current at <ms> as a PNG\n  --out <path>      Snapshot output path (default frame.png)\n  --tempo <percent> Query-time tempo scaling (default 100)\n  -h, --help        Show this help\n\nExamples:\n  cdg-replayer song.cdg\n  cdg-replayer --snapshot 30000 --out chorus.png song.cdg"
    );
}

fn run(args: Args) -> Result<()> {
    println!("CDG Replayer - CD+G stream inspector");
    println!("====================================\n");

    let file = match args.file {
        Some(file) => file,
        None => return Err("no CDG file specified".into()),
    };

    let mut player = CdgPlayer::new();
    player.open_file(&file)?;
    player.process()?;
    if let Some(percent) = args.tempo {
        player.set_tempo(percent);
    }

    println!("File:            {}", file);
    println!("Frames:          {} (40 ms cadence)", player.frame_count());
    println!("Duration:        {} ms (nominal)", player.duration_ms());
    println!("Last update:     {} ms", player.last_update_ms());
    println!("Tempo:           {}%", player.tempo());
    if let Some(color) = player.display().transparent_color() {
        println!("Transparency:    requested for palette entry {} (ignored)", color);
    }

    if let Some(ms) = args.snapshot_ms {
        let frame = player.frame_at(ms)?;
        frame
            .image
            .save(&args.snapshot_out)
            .map_err(|e| format!("failed to write '{}': {}", args.snapshot_out, e))?;
        println!(
            "\nSnapshot:        frame starting at {} ms written to {}",
            frame.start_time_ms, args.snapshot_out
        );
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = parse_args();
    if args.show_help || args.file.is_none() {
        print_usage();
        if args.file.is_none() {
            return ExitCode::SUCCESS;
        }
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
