use anyhow::{Context, Result, bail};
use clap::Parser;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use mmccopy_core::copy;
use mmccopy_core::device::{self, DeviceSearch};
use mmccopy_core::mounts;
use mmccopy_core::progress::{Progress, ProgressMode};
use mmccopy_core::size::{SUFFIX_MULTIPLIERS, parse_size, pretty_size};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Generate the trailing help text listing the recognized size suffixes.
fn size_suffix_help() -> String {
    let mut help = String::from("Offset and size may be specified with the following suffixes:\n");
    for (suffix, multiple) in SUFFIX_MULTIPLIERS {
        help.push_str(&format!("  {suffix:>3}  {multiple}\n"));
    }
    help.push_str(
        "\nThe [PATH] specifies the location of the image to copy to or from\n\
         the memory card. If it is unspecified or '-', the image is read from\n\
         stdin (-w) or written to stdout (-r).\n\
         \n\
         Examples:\n\
         \n\
         Write sdcard.img to an automatically detected SD card:\n\
         \x20 mmccopy sdcard.img\n\
         \n\
         Read the master boot record (512 bytes @ offset 0) from /dev/sdc:\n\
         \x20 mmccopy -r -s 512 -o 0 -d /dev/sdc mbr.img",
    );
    help
}

#[derive(Parser)]
#[command(name = "mmccopy")]
#[command(about = "Copy data to or from a memory card")]
#[command(after_help = size_suffix_help())]
struct Cli {
    /// Device file for the memory card
    #[arg(short = 'd', value_name = "DEVICE")]
    device: Option<PathBuf>,

    /// Amount to read/write
    #[arg(short = 's', value_name = "SIZE", value_parser = parse_size)]
    size: Option<u64>,

    /// Offset from the beginning of the memory card
    #[arg(short = 'o', value_name = "OFFSET", value_parser = parse_size)]
    offset: Option<u64>,

    /// Report numeric progress
    #[arg(short = 'n')]
    numeric: bool,

    /// Report progress (default)
    #[arg(short = 'p')]
    progress: bool,

    /// Quiet
    #[arg(short = 'q')]
    quiet: bool,

    /// Read from the memory card
    #[arg(short = 'r', overrides_with = "write")]
    read: bool,

    /// Write to the memory card (default)
    #[arg(short = 'w', overrides_with = "read")]
    write: bool,

    /// Print out the version and exit
    #[arg(short = 'v')]
    version: bool,

    /// Accept an automatically found memory card
    #[arg(short = 'y')]
    accept_found: bool,

    /// Location of the image to copy to or from the memory card
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,
}

impl Cli {
    fn read_from_card(&self) -> bool {
        self.read && !self.write
    }

    fn progress_mode(&self) -> ProgressMode {
        match (self.quiet, self.numeric, self.progress) {
            (true, _, _) => ProgressMode::Quiet,
            (_, true, _) => ProgressMode::Numeric,
            // -p is accepted for compatibility; human output is the default.
            (_, _, _) => ProgressMode::Human,
        }
    }
}

/// The non-card end of the transfer, fixed by the copy direction.
enum DataEnd {
    Source(Box<dyn Read>),
    Sink(Box<dyn Write>),
}

/// Present a final "Yes/No" confirmation to the user.
fn confirm_operation(prompt: &str) -> Result<bool> {
    let confirmation = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(confirmation)
}

/// Scan for a memory card and, unless `-y` was given, make the user confirm
/// the find before anything touches it.
fn auto_detect_card(cli: &Cli, use_stdio: bool) -> Result<PathBuf> {
    let card = match device::find_memory_card(device::DEFAULT_CARD_SIZE_CEILING) {
        DeviceSearch::Found(path) => path,
        DeviceSearch::NotFound => {
            if nix::unistd::getuid().is_root() {
                bail!("no memory cards found");
            }
            bail!(
                "a memory card couldn't be found automatically;\n\
                 try running as root, or specify the device with -d"
            );
        }
        DeviceSearch::Ambiguous(candidates) => {
            let mut listing = String::from("too many possible memory cards found:\n");
            for candidate in &candidates {
                listing.push_str(&format!("  {}\n", candidate.display()));
            }
            listing.push_str("Pick one and specify it explicitly with -d.");
            bail!(listing);
        }
    };

    if !cli.accept_found {
        if use_stdio {
            bail!(
                "cannot confirm the use of {} when using stdin/stdout;\n\
                 rerun with -y if the location is correct",
                card.display()
            );
        }

        if !cli.read_from_card() {
            eprintln!(
                "{} all data on {} will be overwritten.",
                style("WARNING:").red().bold(),
                style(card.display()).cyan()
            );
        }

        let capacity = device::device_size(&card).unwrap_or(0);
        let prompt = format!(
            "Use the {} memory card found at {}?",
            pretty_size(capacity),
            style(card.display()).cyan()
        );
        if !confirm_operation(&prompt)? {
            bail!("aborted");
        }
    }

    Ok(card)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        eprintln!(
            "{} version {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        return Ok(());
    }

    if cli.quiet && cli.numeric {
        bail!("pick either -n or -q, but not both");
    }

    let read_from_card = cli.read_from_card();
    let seek_offset = cli.offset.unwrap_or(0);
    let mut total_to_copy = cli.size.unwrap_or(0);
    let data_path = cli.path.clone().unwrap_or_else(|| PathBuf::from("-"));
    let use_stdio = data_path == Path::new("-");

    if read_from_card && total_to_copy == 0 {
        bail!("specify the amount to copy (-s) when reading from the memory card");
    }

    let card_path = match &cli.device {
        Some(path) => path.clone(),
        None => auto_detect_card(&cli, use_stdio)?,
    };

    let mut mode = cli.progress_mode();

    let data = if read_from_card {
        let sink: Box<dyn Write> = if use_stdio {
            // Progress reports would stomp on the data stream.
            mode = ProgressMode::Quiet;
            Box::new(io::stdout())
        } else {
            Box::new(
                File::create(&data_path).with_context(|| data_path.display().to_string())?,
            )
        };
        DataEnd::Sink(sink)
    } else {
        let source: Box<dyn Read> = if use_stdio {
            Box::new(io::stdin())
        } else {
            let file =
                File::open(&data_path).with_context(|| data_path.display().to_string())?;

            // Cap the number of bytes to write to the image file's size.
            let file_len = file
                .metadata()
                .with_context(|| data_path.display().to_string())?
                .len();
            if total_to_copy == 0 || file_len < total_to_copy {
                total_to_copy = file_len;
            }

            Box::new(file)
        };
        DataEnd::Source(source)
    };

    if mode == ProgressMode::Numeric && total_to_copy == 0 {
        bail!("specify the input size (-s) to report numeric progress");
    }

    // Unmount everything on the card so the raw reads and writes below are
    // unaffected by filesystem caches or other concurrent activity.
    mounts::unmount_all(&card_path)?;

    let mut card = if read_from_card {
        device::open_card_for_read(&card_path)?
    } else {
        device::open_card_for_write(&card_path)?
    };
    card.seek(SeekFrom::Start(seek_offset)).context("seek")?;

    let mut progress = Progress::new(mode, total_to_copy, io::stdout());
    let copied = match data {
        DataEnd::Sink(mut sink) => copy::run(&mut card, &mut sink, total_to_copy, |written| {
            progress.report(written)
        })?,
        DataEnd::Source(mut source) => {
            copy::run(&mut source, &mut card, total_to_copy, |written| {
                progress.report(written)
            })?
        }
    };
    progress.finish(copied);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_arguments_accept_suffixes() {
        let cli = Cli::try_parse_from(["mmccopy", "-s", "4M", "-o", "1b"]).unwrap();
        assert_eq!(cli.size, Some(4 * 1024 * 1024));
        assert_eq!(cli.offset, Some(512));
    }

    #[test]
    fn bad_size_arguments_are_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["mmccopy", "-s", "12x"]).is_err());
        assert!(Cli::try_parse_from(["mmccopy", "-o", "abc"]).is_err());
    }

    #[test]
    fn write_is_the_default_and_the_last_direction_flag_wins() {
        let cli = Cli::try_parse_from(["mmccopy"]).unwrap();
        assert!(!cli.read_from_card());

        let cli = Cli::try_parse_from(["mmccopy", "-r"]).unwrap();
        assert!(cli.read_from_card());

        let cli = Cli::try_parse_from(["mmccopy", "-r", "-w"]).unwrap();
        assert!(!cli.read_from_card());

        let cli = Cli::try_parse_from(["mmccopy", "-w", "-r"]).unwrap();
        assert!(cli.read_from_card());
    }

    #[test]
    fn progress_mode_selection() {
        let cli = Cli::try_parse_from(["mmccopy"]).unwrap();
        assert_eq!(cli.progress_mode(), ProgressMode::Human);

        let cli = Cli::try_parse_from(["mmccopy", "-p"]).unwrap();
        assert_eq!(cli.progress_mode(), ProgressMode::Human);

        let cli = Cli::try_parse_from(["mmccopy", "-n"]).unwrap();
        assert_eq!(cli.progress_mode(), ProgressMode::Numeric);

        let cli = Cli::try_parse_from(["mmccopy", "-q"]).unwrap();
        assert_eq!(cli.progress_mode(), ProgressMode::Quiet);
    }

    #[test]
    fn numeric_and_quiet_can_both_be_parsed_but_conflict_later() {
        // The conflict is reported by main before any device is touched.
        let cli = Cli::try_parse_from(["mmccopy", "-n", "-q"]).unwrap();
        assert!(cli.numeric && cli.quiet);
    }
}
