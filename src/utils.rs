//! Utility functions for human-readable output

/// Decimal size units, one step per factor of 1000
const BYTE_UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

/// Format a byte count with decimal (SI) units
///
/// Values below 10 in their unit get one decimal place, larger values are
/// rounded to whole numbers. Plain byte counts are never fractional.
///
/// # Examples
///
/// ```
/// use cloudinary_dump::utils::format_bytes;
///
/// assert_eq!(format_bytes(60), "60 B");
/// assert_eq!(format_bytes(1_500), "1.5 kB");
/// assert_eq!(format_bytes(98_123), "98 kB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 10 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit_index = 0;
    while value >= 1000.0 && unit_index < BYTE_UNITS.len() - 1 {
        value /= 1000.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{bytes} B")
    } else if value < 10.0 {
        format!("{:.1} {}", value, BYTE_UNITS[unit_index])
    } else {
        format!("{:.0} {}", value, BYTE_UNITS[unit_index])
    }
}

/// Share of `done` in `total` as a percentage, clamped to `0.0..=100.0`
///
/// An empty total counts as fully done.
///
/// # Examples
///
/// ```
/// use cloudinary_dump::utils::percent;
///
/// assert_eq!(percent(1, 4), 25.0);
/// assert_eq!(percent(0, 0), 100.0);
/// ```
#[must_use]
pub fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
