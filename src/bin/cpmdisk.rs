use clap::{App, AppSettings, Arg, SubCommand};
use std::fs;
use std::io::{self, Read, Write};
use std::process;

use cpm::disk::filename::FileName;
use cpm::disk::geometry::{BLOCK_SIZE, SECTOR_SIZE};
use cpm::disk::Disk;
use slog::Logger;
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::{Format, Severity};
use sloggers::Build;

// Possible exit codes
static _EXIT_SUCCESS: i32 = 0;
static EXIT_FAILURE: i32 = 1;

/// If a dash is specified for a filename, this indicates that the user wants
/// to read from standard input or write to standard output.
static STDINOUT_PSEUDOFILENAME: &str = "-";

fn main() {
    // Parse command-line arguments
    let app = App::new("CP/M Disk Image Utility")
        .version("0.1.0")
        .about("Create CP/M 2.2 disk images and move files in and out of them.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("diskimage").required(true))
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .global(true)
                .help("Show more detail"),
        )
        .subcommand(
            SubCommand::with_name("create")
                .about("Create a blank disk image")
                .arg(
                    Arg::with_name("force")
                        .short("f")
                        .long("force")
                        .help("Overwrite an existing file"),
                ),
        )
        .subcommand(
            SubCommand::with_name("list")
                .alias("dir")
                .about("Show a directory listing"),
        )
        .subcommand(
            SubCommand::with_name("add")
                .about("Add a file to a disk image.")
                .arg(Arg::with_name("source_filename").required(true))
                .arg(Arg::with_name("destination_filename").required(false)),
        )
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extract a file from a disk image.")
                .arg(Arg::with_name("source_filename").required(true))
                .arg(Arg::with_name("destination_filename").required(false)),
        )
        .subcommand(SubCommand::with_name("map").about("Show the block allocation map"))
        .subcommand(SubCommand::with_name("validate").about("Validate a disk image."));

    let mut app_clone = app.clone();
    let matches = app.get_matches();

    // A global flag may be counted at either level.
    let verbosity = match matches.subcommand() {
        (_, Some(m)) => matches.occurrences_of("verbose").max(m.occurrences_of("verbose")),
        _ => matches.occurrences_of("verbose"),
    };
    let logger = match terminal_logger(verbosity) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_FAILURE);
        }
    };

    // The disk image argument is required, so clap guarantees its presence.
    let diskimage = matches.value_of("diskimage").unwrap_or_default();
    let result = match matches.subcommand() {
        ("create", Some(m)) => cmd_create(diskimage, m.is_present("force"), &logger),
        ("list", Some(_)) => cmd_list(diskimage, verbosity, &logger),
        ("add", Some(m)) => cmd_add(
            diskimage,
            m.value_of("source_filename").unwrap_or_default(),
            m.value_of("destination_filename"),
            &logger,
        ),
        ("extract", Some(m)) => cmd_extract(
            diskimage,
            m.value_of("source_filename").unwrap_or_default(),
            m.value_of("destination_filename"),
            &logger,
        ),
        ("map", Some(_)) => cmd_map(diskimage, &logger),
        ("validate", Some(_)) => cmd_validate(diskimage, &logger),
        _ => {
            let _ = app_clone.print_help();
            println!();
            process::exit(EXIT_FAILURE);
        }
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(EXIT_FAILURE);
    }
}

/// Build a logger writing to standard error.  Warnings and errors are always
/// shown; each `-v` lowers the threshold by one level.
fn terminal_logger(verbosity: u64) -> io::Result<Logger> {
    let level = match verbosity {
        0 => Severity::Warning,
        1 => Severity::Info,
        2 => Severity::Debug,
        _ => Severity::Trace,
    };
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(level);
    builder.destination(Destination::Stderr);
    builder.format(Format::Compact);
    builder
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

/// Open a file for reading
fn open_fs_reader(filename: &str) -> io::Result<Box<dyn Read>> {
    if filename == STDINOUT_PSEUDOFILENAME {
        Ok(Box::new(io::stdin()))
    } else {
        Ok(Box::new(fs::File::open(filename)?))
    }
}

/// Open a file for writing
fn open_fs_writer(filename: &str) -> io::Result<Box<dyn Write>> {
    if filename == STDINOUT_PSEUDOFILENAME {
        Ok(Box::new(io::stdout()))
    } else {
        Ok(Box::new(fs::File::create(filename)?))
    }
}

fn cmd_create(diskimage: &str, force: bool, logger: &Logger) -> io::Result<()> {
    let disk = Disk::create_with_logger(diskimage, !force, logger.clone())?;
    println!("Created {}", disk);
    Ok(())
}

fn cmd_list(diskimage: &str, verbosity: u64, logger: &Logger) -> io::Result<()> {
    let disk = Disk::open_with_logger(diskimage, logger.clone())?;
    let files = disk.files();
    let free = disk.blocks_free();
    if files.is_empty() {
        println!("No files on {}", diskimage);
        println!("Free: {}KB ({} blocks)", free * BLOCK_SIZE / 1024, free);
        return Ok(());
    }

    let rule = "-".repeat(50);
    println!("Directory of {}:", diskimage);
    println!("{}", rule);
    println!("{:<5} {:<12} {:<10} {}", "User", "Filename", "Size", "Blocks");
    println!("{}", rule);
    for summary in files.iter() {
        println!("{}", summary);
        if verbosity > 0 {
            let file = disk.open_file(&summary.filename)?;
            file.details(&mut io::stdout())?;
        }
    }
    println!("{}", rule);
    let total: usize = files.iter().map(|summary| summary.size()).sum();
    println!("Total: {} file(s), {} bytes", files.len(), total);
    println!("Free: {}KB ({} blocks)", free * BLOCK_SIZE / 1024, free);
    Ok(())
}

fn cmd_add(
    diskimage: &str,
    source_filename: &str,
    destination_filename: Option<&str>,
    logger: &Logger,
) -> io::Result<()> {
    let filename = match destination_filename {
        Some(name) => FileName::parse(name)?,
        None if source_filename == STDINOUT_PSEUDOFILENAME => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "a destination filename is required when reading standard input",
            ));
        }
        None => FileName::from_path(source_filename)?,
    };

    let mut data = vec![];
    open_fs_reader(source_filename)?.read_to_end(&mut data)?;

    let mut disk = Disk::open_with_logger(diskimage, logger.clone())?;
    let written = disk.write_file(&filename, &data)?;
    disk.save()?;

    let records = (written + SECTOR_SIZE - 1) / SECTOR_SIZE;
    let blocks = (written + BLOCK_SIZE - 1) / BLOCK_SIZE;
    println!("Added {} to {}", filename, diskimage);
    println!(
        "  Size: {} bytes ({} records, {} blocks)",
        written, records, blocks
    );
    Ok(())
}

fn cmd_extract(
    diskimage: &str,
    source_filename: &str,
    destination_filename: Option<&str>,
    logger: &Logger,
) -> io::Result<()> {
    let filename = FileName::parse(source_filename)?;
    let disk = Disk::open_with_logger(diskimage, logger.clone())?;
    let data = disk.read_file(&filename)?;

    let destination_filename = match destination_filename {
        Some(name) => name.to_string(),
        None => filename.to_string(),
    };
    let mut writer = open_fs_writer(&destination_filename)?;
    writer.write_all(&data)?;
    writer.flush()?;

    if destination_filename != STDINOUT_PSEUDOFILENAME {
        println!("Extracted {} ({} bytes)", destination_filename, data.len());
    }
    Ok(())
}

fn cmd_map(diskimage: &str, logger: &Logger) -> io::Result<()> {
    let disk = Disk::open_with_logger(diskimage, logger.clone())?;
    print!("{}", disk.allocation());
    println!("{} blocks free.", disk.blocks_free());
    Ok(())
}

fn cmd_validate(diskimage: &str, logger: &Logger) -> io::Result<()> {
    let disk = Disk::open_with_logger(diskimage, logger.clone())?;
    let errors = disk.validate();
    for e in errors.iter() {
        println!("{}", e);
    }
    if errors.is_empty() {
        println!("Disk validates successfully.");
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} errors found during validation.", errors.len()),
        ))
    }
}
