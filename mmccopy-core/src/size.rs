//! Parsing and pretty-printing of byte counts.

use anyhow::{Context, Result, bail};

pub const ONE_KIB: u64 = 1024;
pub const ONE_MIB: u64 = 1024 * ONE_KIB;
pub const ONE_GIB: u64 = 1024 * ONE_MIB;

/// Recognized size suffixes and their multipliers, in the order they are
/// shown in the command-line help. Lookup is case-sensitive and exact.
pub const SUFFIX_MULTIPLIERS: [(&str, u64); 10] = [
    ("b", 512),
    ("kB", 1000),
    ("K", ONE_KIB),
    ("KiB", ONE_KIB),
    ("MB", 1000 * 1000),
    ("M", ONE_MIB),
    ("MiB", ONE_MIB),
    ("GB", 1000 * 1000 * 1000),
    ("G", ONE_GIB),
    ("GiB", ONE_GIB),
];

/// Parses a size of the form `<decimal digits>[suffix]` into a byte count.
///
/// With no suffix the digits are taken as a plain byte count. Otherwise the
/// suffix must match one of [`SUFFIX_MULTIPLIERS`] exactly, e.g. `7M` is
/// 7 MiB while `7MB` is 7,000,000 bytes.
pub fn parse_size(s: &str) -> Result<u64> {
    let digits_end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, suffix) = s.split_at(digits_end);

    if digits.is_empty() {
        bail!("expecting number but got '{s}'");
    }

    let value: u64 = digits
        .parse()
        .with_context(|| format!("'{digits}' is out of range"))?;

    if suffix.is_empty() {
        return Ok(value);
    }

    match SUFFIX_MULTIPLIERS
        .iter()
        .find(|(name, _)| *name == suffix)
    {
        Some((_, multiple)) => Ok(value * multiple),
        None => bail!("unknown size multiplier '{suffix}'"),
    }
}

/// Formats a byte count the way a person wants to read it: two decimals of
/// GiB or MiB when large enough, whole KiB below that, raw bytes below 1 KiB.
pub fn pretty_size(amount: u64) -> String {
    if amount >= ONE_GIB {
        format!("{:.2} GiB", amount as f64 / ONE_GIB as f64)
    } else if amount >= ONE_MIB {
        format!("{:.2} MiB", amount as f64 / ONE_MIB as f64)
    } else if amount >= ONE_KIB {
        format!("{} KiB", amount / ONE_KIB)
    } else {
        format!("{amount} bytes")
    }
}
