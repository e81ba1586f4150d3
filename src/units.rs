//! Human byte-size parsing and formatting
//!
//! Sizes accept a decimal number with an optional unit. `k`, `m`, `g`, `t`
//! (and their `b`-suffixed forms) are powers of 1000; `kib`, `mib`, `gib`,
//! `tib` are powers of 1024. Units are case-insensitive.

use crate::error::{AppError, Result};
use regex::Regex;
use std::sync::OnceLock;

const KIB: i64 = 1 << 10;
const MIB: i64 = 1 << 20;
const GIB: i64 = 1 << 30;

fn size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*([\d.]+)\s*([a-z]*)\s*$").expect("size pattern is valid")
    })
}

fn unit_multiplier(unit: &str) -> Option<i64> {
    let mul = match unit.to_ascii_lowercase().as_str() {
        "" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "kib" => KIB,
        "mib" => MIB,
        "gib" => GIB,
        "tib" => 1 << 40,
        _ => return None,
    };
    Some(mul)
}

/// Parse a human size string such as `2G`, `512`, `1.5MiB` into bytes.
///
/// Fractional results are truncated toward zero.
pub fn parse_size(input: &str) -> Result<i64> {
    let caps = size_pattern()
        .captures(input)
        .ok_or_else(|| AppError::parse(format!("cannot parse size {:?}", input)))?;

    let number: f64 = caps[1].parse()?;
    let unit = &caps[2];
    let multiplier = unit_multiplier(unit)
        .ok_or_else(|| AppError::parse(format!("unknown unit {:?}", unit)))?;

    Ok((number * multiplier as f64) as i64)
}

/// Format a byte count with binary units.
pub fn human_bytes(bytes: i64) -> String {
    if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.0} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Megabits per second over `secs`; non-positive durations count as one second.
pub fn mbps(bytes: i64, secs: f64) -> f64 {
    let secs = if secs <= 0.0 { 1.0 } else { secs };
    bytes as f64 * 8.0 / (secs * 1_000_000.0)
}
