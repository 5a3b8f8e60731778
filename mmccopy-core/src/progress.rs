//! Rendering of copy progress.

use crate::size::pretty_size;
use std::io::Write;

/// How progress is presented while a copy runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressMode {
    /// In-place percentage (or byte count when the total is unknown).
    Human,
    /// One integer percentage per line, for machine consumption.
    Numeric,
    /// No output at all.
    Quiet,
}

/// Renders cumulative progress reports to an output sink.
///
/// The sink is stdout in the command-line tool; tests hand in a byte buffer
/// instead. A `total` of zero means the amount to copy is unknown.
pub struct Progress<W: Write> {
    mode: ProgressMode,
    total: u64,
    out: W,
}

/// The integer percentage of `written` against `total`, or 0 when the total
/// is unknown.
pub fn percent(written: u64, total: u64) -> u64 {
    if total > 0 { 100 * written / total } else { 0 }
}

impl<W: Write> Progress<W> {
    pub fn new(mode: ProgressMode, total: u64, out: W) -> Self {
        Self { mode, total, out }
    }

    /// Reports that `written` bytes have been transferred so far.
    pub fn report(&mut self, written: u64) {
        match self.mode {
            ProgressMode::Quiet => {}
            ProgressMode::Numeric => {
                writeln!(self.out, "{}", percent(written, self.total)).ok();
            }
            ProgressMode::Human => {
                self.render_human(written);
                self.out.flush().ok();
            }
        }
    }

    /// Emits the final report once the copy loop has ended, terminating the
    /// in-place line. Numeric reports are already line-terminated.
    pub fn finish(&mut self, written: u64) {
        if self.mode == ProgressMode::Human {
            self.render_human(written);
            writeln!(self.out).ok();
            self.out.flush().ok();
        }
    }

    fn render_human(&mut self, written: u64) {
        if self.total > 0 {
            write!(self.out, "\r{}%", percent(written, self.total)).ok();
        } else {
            // Trailing spaces wipe leftovers from a longer previous line.
            write!(self.out, "\r{}     ", pretty_size(written)).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size::ONE_MIB;

    fn rendered(mode: ProgressMode, total: u64, reports: &[u64]) -> String {
        let mut out = Vec::new();
        let mut progress = Progress::new(mode, total, &mut out);
        for &written in reports {
            progress.report(written);
        }
        if let Some(&last) = reports.last() {
            progress.finish(last);
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn numeric_prints_one_percentage_per_line() {
        let out = rendered(ProgressMode::Numeric, 200, &[0, 50, 100, 200]);
        assert_eq!(out, "0\n25\n50\n100\n");
    }

    #[test]
    fn numeric_with_unknown_total_reports_zero() {
        let out = rendered(ProgressMode::Numeric, 0, &[0, 1000]);
        assert_eq!(out, "0\n0\n");
    }

    #[test]
    fn human_overwrites_in_place_and_terminates_the_line() {
        let out = rendered(ProgressMode::Human, 200, &[0, 100, 200]);
        assert_eq!(out, "\r0%\r50%\r100%\r100%\n");
    }

    #[test]
    fn human_with_unknown_total_prints_byte_counts() {
        let out = rendered(ProgressMode::Human, 0, &[512, 2 * ONE_MIB]);
        assert!(out.starts_with("\r512 bytes"));
        assert!(out.contains("\r2.00 MiB"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn quiet_emits_nothing() {
        let out = rendered(ProgressMode::Quiet, 200, &[0, 100, 200]);
        assert!(out.is_empty());
    }

    #[test]
    fn percent_floors() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(12345, 0), 0);
    }
}
