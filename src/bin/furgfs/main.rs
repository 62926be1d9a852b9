//! `furgfs` mounts (or formats) a volume file and drops into an interactive
//! prompt over it, the same shape as `fdisk::main`'s own command loop, but
//! backed by `furgfs::Volume` instead of a partition table.

mod commands;
mod prompt;

use furgfs::Volume;
use std::env;
use std::path::PathBuf;
use std::process::exit;

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// If true, print command line help.
    help: bool,
    /// If set, format a fresh volume of this size (in MB) instead of
    /// mounting an existing one.
    format_mb: Option<u64>,
    /// Path to the volume file.
    volume_path: Option<PathBuf>,
}

fn parse_args(args: env::ArgsOs) -> Args {
    let mut res: Args = Default::default();
    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        match arg.to_str() {
            Some("-h" | "--help") => res.help = true,
            Some("--format") => {
                let size = args
                    .next()
                    .and_then(|s| s.to_str().map(str::to_owned))
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("furgfs: --format requires a size in MB");
                        exit(1);
                    });
                res.format_mb = Some(size);
            }
            _ => res.volume_path = Some(PathBuf::from(arg)),
        }
    }
    res
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(" furgfs [--format <size-mb>] <volume-file>");
    eprintln!();
    eprintln!("Options:");
    eprintln!(" -h, --help\t\tprints usage");
    eprintln!(" --format <size-mb>\tcreates a fresh volume of the given size before mounting");
}

fn main() {
    let args = parse_args(env::args_os());
    if args.help {
        print_usage();
        exit(0);
    }
    let Some(path) = args.volume_path else {
        print_usage();
        exit(1);
    };

    let mut volume = match args.format_mb {
        Some(size_mb) => Volume::format(&path, size_mb).unwrap_or_else(|e| {
            eprintln!("furgfs: cannot format {}: {e}", path.display());
            exit(1);
        }),
        None => Volume::mount(&path).unwrap_or_else(|e| {
            eprintln!("furgfs: cannot mount {}: {e}", path.display());
            exit(1);
        }),
    };

    println!("furgfs: mounted {}", path.display());
    while let Some(line) = prompt::prompt(format_args!("{}> ", volume.current_path())) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !commands::handle_line(&mut volume, line) {
            break;
        }
    }
    volume.close();
}
