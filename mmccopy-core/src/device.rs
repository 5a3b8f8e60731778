//! Memory card probing, discovery, and opening.

use crate::size::ONE_GIB;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Devices larger than this are assumed to be fixed disks, not cards.
///
/// This is a heuristic policy choice, not a protocol constant; callers can
/// pass a different ceiling to [`is_memory_card`] and [`find_memory_card`].
pub const DEFAULT_CARD_SIZE_CEILING: u64 = 32 * ONE_GIB;

/// The outcome of an automatic card scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSearch {
    /// No candidate looked like a memory card.
    NotFound,
    /// Exactly one candidate matched.
    Found(PathBuf),
    /// Several candidates matched, in probe order. The caller has to make
    /// the user pick one; guessing here would risk the wrong disk.
    Ambiguous(Vec<PathBuf>),
}

/// Returns the size of a device (or file) by seeking to its end, or `None`
/// if it cannot be opened for reading or reports a zero size.
pub fn device_size(path: &Path) -> Option<u64> {
    let mut file = File::open(path).ok()?;
    let len = file.seek(SeekFrom::End(0)).ok()?;
    (len > 0).then_some(len)
}

/// Decides whether `path` plausibly is a removable memory card: it exists,
/// is readable, and holds no more than `size_ceiling` bytes.
///
/// Purely a size heuristic. A small enough fixed disk will pass; there is no
/// content or signature inspection.
pub fn is_memory_card(path: &Path, size_ceiling: u64) -> bool {
    match device_size(path) {
        Some(len) => len <= size_ceiling,
        None => false,
    }
}

/// Scans the usual card locations and reports what turned up.
///
/// Candidates are probed in a fixed order: `/dev/sdb` through `/dev/sdy`
/// (USB readers), then `/dev/mmcblk0` through `/dev/mmcblk15` (built-in
/// slots). `/dev/sda` is never probed since it is almost always the primary
/// fixed disk.
pub fn find_memory_card(size_ceiling: u64) -> DeviceSearch {
    search(candidate_paths(), |path| is_memory_card(path, size_ceiling))
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for letter in b'b'..=b'y' {
        paths.push(PathBuf::from(format!("/dev/sd{}", letter as char)));
    }
    for index in 0..16 {
        paths.push(PathBuf::from(format!("/dev/mmcblk{index}")));
    }
    paths
}

fn search(candidates: Vec<PathBuf>, probe: impl Fn(&Path) -> bool) -> DeviceSearch {
    let mut possible: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|path| probe(path))
        .collect();

    match possible.len() {
        0 => DeviceSearch::NotFound,
        1 => DeviceSearch::Found(possible.remove(0)),
        _ => DeviceSearch::Ambiguous(possible),
    }
}

/// Opens a card read-only for copying data off of it.
pub fn open_card_for_read(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| path.display().to_string())
}

/// Opens a card for writing with `O_SYNC`, so every completed write has
/// physically reached the card and progress reports reflect durable work
/// rather than data sitting in the page cache.
pub fn open_card_for_write(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_SYNC)
        .open(path)
        .with_context(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch_file(len: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; len]).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn missing_path_is_not_a_card() {
        let path = Path::new("/nonexistent/no-such-device");
        assert_eq!(device_size(path), None);
        assert!(!is_memory_card(path, DEFAULT_CARD_SIZE_CEILING));
    }

    #[test]
    fn empty_device_is_not_a_card() {
        let file = scratch_file(0);
        assert!(!is_memory_card(file.path(), DEFAULT_CARD_SIZE_CEILING));
    }

    #[test]
    fn oversized_device_is_not_a_card() {
        let file = scratch_file(2048);
        assert!(!is_memory_card(file.path(), 1024));
    }

    #[test]
    fn device_within_the_ceiling_is_a_card() {
        let file = scratch_file(2048);
        assert_eq!(device_size(file.path()), Some(2048));
        assert!(is_memory_card(file.path(), DEFAULT_CARD_SIZE_CEILING));
        // Right at the boundary still counts.
        assert!(is_memory_card(file.path(), 2048));
    }

    #[test]
    fn candidates_cover_sd_and_mmcblk_but_never_sda() {
        let paths = candidate_paths();
        assert_eq!(paths.len(), 24 + 16);
        assert_eq!(paths[0], PathBuf::from("/dev/sdb"));
        assert!(paths.contains(&PathBuf::from("/dev/sdy")));
        assert!(!paths.contains(&PathBuf::from("/dev/sda")));
        assert!(!paths.contains(&PathBuf::from("/dev/sdz")));
        assert!(paths.contains(&PathBuf::from("/dev/mmcblk0")));
        assert!(paths.contains(&PathBuf::from("/dev/mmcblk15")));
    }

    #[test]
    fn no_matches_is_not_found() {
        let result = search(candidate_paths(), |_| false);
        assert_eq!(result, DeviceSearch::NotFound);
    }

    #[test]
    fn single_match_is_returned_directly() {
        let result = search(candidate_paths(), |path| {
            path == Path::new("/dev/mmcblk0")
        });
        assert_eq!(result, DeviceSearch::Found(PathBuf::from("/dev/mmcblk0")));
    }

    #[test]
    fn several_matches_are_ambiguous_in_probe_order() {
        let result = search(candidate_paths(), |path| {
            path == Path::new("/dev/sdc") || path == Path::new("/dev/mmcblk1")
        });
        assert_eq!(
            result,
            DeviceSearch::Ambiguous(vec![
                PathBuf::from("/dev/sdc"),
                PathBuf::from("/dev/mmcblk1"),
            ])
        );
    }
}
