//! Main entry point for the rezip CLI application.
//!
//! Each invocation runs exactly one archive protocol and renders its result.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use rezip::cli::Command;
use rezip::{Archive, ArchiveError, Cli, CompressionMethod, EntryInfo, ErrorKind};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let method = if cli.store {
        CompressionMethod::Stored
    } else {
        CompressionMethod::Deflate
    };
    let archive = Archive::new(&cli.archive).with_method(method);

    match run(&archive, &cli) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            report_failure(&archive, &e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Dispatch the selected subcommand to the archive engine.
fn run(archive: &Archive, cli: &Cli) -> rezip::Result<()> {
    match &cli.command {
        Command::Create { source } => {
            archive.create(source)?;
            if !cli.is_quiet() {
                println!("Archive created: {}", archive.path().display());
            }
        }
        Command::List { verbose } => list_files(archive, *verbose)?,
        Command::Extract { dir } => {
            archive.extract(dir)?;
            if !cli.is_quiet() {
                println!("Archive extracted to {}", dir.display());
            }
        }
        Command::Remove { names } => {
            for outcome in archive.remove(names.as_slice())? {
                if !cli.is_quiet() {
                    println!("  {}", outcome);
                }
            }
        }
        Command::Add { files } => {
            for outcome in archive.add(files.as_slice())? {
                if !cli.is_quiet() {
                    println!("  {}", outcome);
                }
            }
        }
    }

    Ok(())
}

/// Turn a typed failure into a message for the user.
fn report_failure(archive: &Archive, error: &ArchiveError) {
    match error.kind() {
        ErrorKind::PathNotFound => eprintln!("rezip: {}", error),
        ErrorKind::NotAZipFile => eprintln!(
            "rezip: {} does not exist or is not a file",
            archive.path().display()
        ),
        ErrorKind::IoFailure => eprintln!(
            "rezip: operation on {} failed: {}",
            archive.path().display(),
            error
        ),
    }
}

/// List files in the ZIP archive.
///
/// Supports two output formats:
/// - Simple format: Just file names, one per line
/// - Verbose format (`-v`): Detailed table with size, compression ratio, and timestamps
fn list_files(archive: &Archive, verbose: bool) -> rezip::Result<()> {
    if verbose {
        println!(
            "{:>10}  {:>6}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Method", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(78));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    // Entries are printed as they are decoded
    for entry in archive.entries()? {
        let entry = entry?;
        if verbose {
            print_entry(&entry);
            if !entry.is_dir {
                total_uncompressed += entry.uncompressed_size;
                total_compressed += entry.compressed_size;
                file_count += 1;
            }
        } else {
            println!("{}", entry.name);
        }
    }

    if verbose {
        println!("{}", "-".repeat(78));
        let ratio = if total_uncompressed > total_compressed {
            100 - (total_compressed * 100 / total_uncompressed)
        } else {
            0
        };
        println!(
            "{:>10}  {:>6}  {:>10}  {:>4}%  {:>17}  {} files",
            total_uncompressed, "", total_compressed, ratio, "", file_count
        );
    }

    Ok(())
}

fn print_entry(entry: &EntryInfo) {
    let (year, month, day) = entry.mod_date;
    let (hour, minute, _second) = entry.mod_time;
    println!(
        "{:>10}  {:>6}  {:>10}  {:>4}%  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
        entry.uncompressed_size,
        entry.method.name(),
        entry.compressed_size,
        entry.ratio(),
        year,
        month,
        day,
        hour,
        minute,
        entry.name
    );
}
