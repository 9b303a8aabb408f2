use anyhow::{Context, Result};
use clap::Parser;
use image_view::Image;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::io::Write;
use std::path::PathBuf;

/// Dump the superblock, group descriptor, bitmaps, inodes and directory
/// blocks of an ext2 image.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// ext2 image file
    image: PathBuf,

    /// Log more on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if let Err(error) = run(&args) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .context("failed to install logger")?;

    let image = Image::open(&args.image)
        .with_context(|| format!("failed to open {}", args.image.display()))?;
    let report = ext2::inspect(image.view())
        .with_context(|| format!("failed to inspect {}", args.image.display()))?;

    let mut stdout = std::io::stdout().lock();
    report.write_to(&mut stdout)?;
    stdout.flush()?;

    Ok(())
}
