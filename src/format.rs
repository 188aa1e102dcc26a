//! Console formatting helpers.

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Formats a byte count with base-1024 units: plain bytes below one
/// kilobyte, two decimals from `KB` up to `GB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_size(bytes: u64) -> String {
    match bytes {
        b if b < KB => format!("{b} B"),
        b if b < MB => format!("{:.2} KB", b as f64 / KB as f64),
        b if b < GB => format!("{:.2} MB", b as f64 / MB as f64),
        b => format!("{:.2} GB", b as f64 / GB as f64),
    }
}

/// Two spaces per tree level.
#[must_use]
pub fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
