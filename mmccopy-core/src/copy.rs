//! The chunked transfer loop between a source and a destination.

use anyhow::{Context, Result};
use std::io::{self, Read, Write};

/// Data is moved in 1 MiB chunks.
pub const COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Copies up to `total` bytes from `source` to `dest`.
///
/// A `total` of zero means the amount is unknown: the copy runs until the
/// source reports end-of-stream. With a nonzero `total`, each read is clamped
/// to the amount still owed so the transfer stops exactly at the boundary
/// even when the source has more data.
///
/// Reads interrupted by a signal are retried; writes go through
/// [`Write::write_all`], which completes short writes and retries interrupted
/// ones. Any other I/O failure aborts the copy.
///
/// `on_progress` receives the cumulative byte count: once with 0 before the
/// first chunk and once after every chunk. Returns the number of bytes
/// actually transferred.
///
/// # Errors
///
/// Fails if a read or write fails for any reason other than an interrupted
/// system call, or if the destination cannot be flushed.
pub fn run<R, W, F>(source: &mut R, dest: &mut W, total: u64, mut on_progress: F) -> Result<u64>
where
    R: Read,
    W: Write,
    F: FnMut(u64),
{
    on_progress(0);

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written: u64 = 0;

    while total == 0 || written < total {
        let mut want = buffer.len();
        if total != 0 {
            want = want.min((total - written) as usize);
        }

        let amount_read = loop {
            match source.read(&mut buffer[..want]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("read"),
            }
        };

        if amount_read == 0 {
            break;
        }

        dest.write_all(&buffer[..amount_read]).context("write")?;
        written += amount_read as u64;
        on_progress(written);
    }

    dest.flush().context("write")?;
    Ok(written)
}
