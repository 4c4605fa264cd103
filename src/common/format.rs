//! Human-readable formatting shared by replies, logs and stats.

use super::colours;

/// Latency below this many milliseconds is graded green.
pub const LOW_LATENCY_MS: u64 = 200;
/// Latency below this many milliseconds is graded orange, above it red.
pub const HIGH_LATENCY_MS: u64 = 400;

/// Colour grade for a latency value.
pub fn color_level(value_ms: u64) -> u32 {
    if value_ms < LOW_LATENCY_MS {
        colours::BRIGHT_GREEN
    } else if value_ms < HIGH_LATENCY_MS {
        colours::ORANGE
    } else {
        colours::RED
    }
}

const METRIC_LABELS: [&str; 9] = ["B", "kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const BINARY_LABELS: [&str; 9] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];
const PRECISION_OFFSETS: [f64; 4] = [0.5, 0.05, 0.005, 0.0005];

/// Formats a byte count using binary (1024) or metric (1000) units.
///
/// `precision` is the number of decimals, clamped to 0..=3. A unit is kept only
/// while the value stays below the threshold where rounding would carry it into
/// the next unit, so `1023.99 KiB` at precision 1 prints as `1.0 MiB`.
pub fn format_bytes(num: f64, metric: bool, precision: usize) -> String {
    let precision = precision.min(3);
    let labels = if metric { &METRIC_LABELS } else { &BINARY_LABELS };
    let step = if metric { 1000.0 } else { 1024.0 };
    let threshold = step - PRECISION_OFFSETS[precision];

    let negative = num < 0.0;
    let mut value = num.abs();
    let mut unit = labels[0];

    for (i, label) in labels.iter().enumerate() {
        unit = label;
        if value < threshold {
            break;
        }
        if i != labels.len() - 1 {
            value /= step;
        }
    }

    format!(
        "{}{:.*} {}",
        if negative { "-" } else { "" },
        precision,
        value,
        unit
    )
}

/// Formats milliseconds as `mm:ss`, or `h:mm:ss` past the hour.
pub fn format_duration(ms: u64) -> String {
    let total = ms / 1000;
    let (hours, rest) = (total / 3600, total % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
