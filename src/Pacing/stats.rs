// Human-scaled throughput statistics.

use crate::Pacing::Structs::Engine_Structs::RateUnit;

/// Unit ladder for byte counts, 1024 apart.
const UNITS: &[u8] = b"BKMGTPE";

/// Values at or above this are bumped to the next unit.
const DISPLAY_MAX: u64 = 10000;

/// Scale a byte count down the 1024 ladder until it fits the display
/// range, pairing it with the unit letter it ended on.
pub fn scale(n: u64) -> (u64, char) {
    let mut max = DISPLAY_MAX;
    let mut div = 1u64;
    let mut index = 0;
    while index < UNITS.len() - 1 {
        if n < max {
            break;
        }
        max = max.saturating_mul(1024);
        div *= 1024;
        index += 1;
    }
    (n / div, UNITS[index] as char)
}

/// Everything one report line needs; captured by the engine at the
/// moment of reporting.
#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    pub total: u64,
    pub window_written: u64,
    pub elapsed_secs: f64,
    pub block_size: usize,
    pub window: u64,
    pub rate: f64,
    pub unit: RateUnit,
}

/// Pure formatting: scaled lifetime total, scaled window bytes,
/// elapsed time, achieved rate in the display unit, and the active
/// settings spelled as re-runnable flags.
pub fn format_report(s: &StatsSnapshot) -> String {
    let (total, total_unit) = scale(s.total);
    let (written, written_unit) = scale(s.window_written);

    let achieved = if s.elapsed_secs > 0.0 {
        (s.window_written as f64 / s.elapsed_secs) / s.unit.multiplier()
    } else {
        0.0
    };
    let unit_letter = s.unit.letter();

    format!(
        "pacepipe: {:>4}{}, {:>4}{} in {:.3}s {:.3}{}/s -s {} -w {} -{} {:.3}",
        total,
        total_unit,
        written,
        written_unit,
        s.elapsed_secs,
        achieved,
        unit_letter,
        s.block_size,
        s.window,
        unit_letter,
        s.rate / s.unit.multiplier(),
    )
}

/// Write one report line to the diagnostic stream.
pub fn report(s: &StatsSnapshot) {
    eprintln!("{}", format_report(s));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_keeps_small_counts_in_bytes() {
        assert_eq!(scale(0), (0, 'B'));
        assert_eq!(scale(9999), (9999, 'B'));
    }

    #[test]
    fn scale_climbs_the_ladder() {
        assert_eq!(scale(10000), (9, 'K'));
        assert_eq!(scale(5 * 1024 * 1024), (5120, 'K'));
        assert_eq!(scale(11 * 1024 * 1024), (11, 'M'));
        assert_eq!(scale(3 * 1024 * 1024 * 1024 * 1024), (3072, 'G'));
    }

    #[test]
    fn scale_tops_out_at_exa() {
        let (n, unit) = scale(u64::MAX);
        assert_eq!(unit, 'E');
        assert!(n > 0);
    }

    #[test]
    fn report_line_carries_settings() {
        let line = format_report(&StatsSnapshot {
            total: 2048,
            window_written: 1024,
            elapsed_secs: 2.0,
            block_size: 512,
            window: 60,
            rate: 1024.0,
            unit: RateUnit::Kilobytes,
        });
        assert!(line.starts_with("pacepipe: 2048B, 1024B in 2.000s"));
        assert!(line.contains("-s 512"));
        assert!(line.contains("-w 60"));
        assert!(line.ends_with("-K 1.000"));
        // 1024 bytes over 2s is 0.5 KB/s.
        assert!(line.contains("0.500K/s"));
    }
}
