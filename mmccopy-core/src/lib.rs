//! The core, UI-agnostic library for the `mmccopy` memory card utility.
//!
//! `mmccopy-core` is designed to be used as a library by any front-end. It
//! handles everything the command-line tool does apart from argument parsing
//! and interactive prompts: size-string parsing, best-effort card discovery,
//! unmounting of in-the-way partitions, and the buffered copy loop.
//!
//! The library is structured into several key modules:
//! - [`size`]: Parsing of `<number><suffix>` byte counts and pretty-printing.
//! - [`device`]: The card-size probe, candidate scan, and device opening.
//! - [`mounts`]: Mount-table scanning and unmounting of matching partitions.
//! - [`copy`]: The chunked transfer loop between a reader and a writer.
//! - [`progress`]: Human/numeric/quiet rendering of copy progress.
//!
//! The primary entry point for a transfer is [`copy::run`], which reports
//! cumulative progress through a callback so the calling application can
//! display it in any way it chooses.
//!
//! ## Example: Writing an image to a card with progress reporting
//!
//! ```rust,no_run
//! use mmccopy_core::copy;
//! use mmccopy_core::device;
//! use mmccopy_core::progress::{Progress, ProgressMode};
//! use std::fs::File;
//! use std::io;
//! use std::path::Path;
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let mut image = File::open("sdcard.img")?;
//!     let total = image.metadata()?.len();
//!
//!     let card_path = Path::new("/dev/sdc");
//!     mmccopy_core::mounts::unmount_all(card_path)?;
//!     let mut card = device::open_card_for_write(card_path)?;
//!
//!     let mut progress = Progress::new(ProgressMode::Human, total, io::stdout());
//!     let copied = copy::run(&mut image, &mut card, total, |written| {
//!         progress.report(written)
//!     })?;
//!     progress.finish(copied);
//!
//!     Ok(())
//! }
//! ```

pub mod copy;
pub mod device;
pub mod mounts;
pub mod progress;
pub mod size;
