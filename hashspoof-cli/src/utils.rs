//! Helpers shared by the command implementation.

use std::time::Duration;

use crate::exit_codes::UsageError;

/// Two-character marker that must precede the hex prefix.
pub const HEX_MARKER: &str = "0x";

/// Strip the `0x` marker from a command-line prefix.
///
/// The marker is case-insensitive; the remainder is returned unvalidated.
pub fn strip_hex_marker(raw: &str) -> Result<&str, UsageError> {
    match raw.get(..HEX_MARKER.len()) {
        Some(marker) if marker.eq_ignore_ascii_case(HEX_MARKER) => Ok(&raw[HEX_MARKER.len()..]),
        _ => Err(UsageError(format!(
            "Hex prefix must start with '{HEX_MARKER}' (got {raw:?})"
        ))),
    }
}

/// Format an elapsed duration for humans.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", elapsed.as_millis())
    } else if secs < 120.0 {
        format!("{secs:.2}s")
    } else {
        let total = elapsed.as_secs();
        format!("{}m{:02}s", total / 60, total % 60)
    }
}

/// Format a large count with thousands separators.
pub fn format_count(n: f64) -> String {
    if !n.is_finite() || n >= 1e15 {
        return format!("{n:.2e}");
    }
    let digits = format!("{:.0}", n);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
