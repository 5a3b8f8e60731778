//! Unmounting of filesystems that sit on the target device.
//!
//! A card that stays mounted while raw data is copied underneath it would be
//! corrupted by the filesystem layer's cached and dirty pages, so every
//! mounted filesystem whose device is the target (or one of its partitions)
//! is unmounted before the copy starts. Failure to unmount is fatal.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

/// An implausible number of mounts for one card; more than this in the table
/// means something is wrong with the match, not with the card.
const UNMOUNT_LIMIT: usize = 64;

/// Unmounts every filesystem mounted from `device` or one of its partitions.
///
/// The live mount table is scanned completely first; the collected mount
/// points are then unmounted in discovery order.
///
/// # Errors
///
/// Fails if the mount table cannot be read, if more than 64 entries match,
/// or if any `umount(2)` call fails (for example because the target is busy).
pub fn unmount_all(device: &Path) -> Result<()> {
    let table = fs::read_to_string("/proc/mounts").context("/proc/mounts")?;

    for mount_point in mount_points_under(&table, &device.to_string_lossy())? {
        nix::mount::umount(&mount_point)
            .with_context(|| format!("umount {}", mount_point.display()))?;
    }

    Ok(())
}

/// Collects the mount points of every mount-table record whose device field
/// starts with `device`, in table order.
///
/// Only the first two whitespace-separated fields of each record matter
/// (device and mount point); short or malformed lines are skipped. The
/// prefix match is what picks up partitions: a target of `/dev/sdc` matches
/// both `/dev/sdc` itself and `/dev/sdc1`.
fn mount_points_under(table: &str, device: &str) -> Result<Vec<PathBuf>> {
    let mut mount_points = Vec::new();

    for line in table.lines() {
        let mut fields = line.split_whitespace();
        let (Some(dev), Some(mount_point)) = (fields.next(), fields.next()) else {
            continue;
        };

        if dev.starts_with(device) {
            if mount_points.len() == UNMOUNT_LIMIT {
                bail!("device mounted too many times");
            }
            mount_points.push(PathBuf::from(mount_point));
        }
    }

    Ok(mount_points)
}
