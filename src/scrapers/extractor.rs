//! Heuristic statistics extraction from tracker profile pages.
//!
//! There is no per-site parser. Each metric has an ordered list of matchers
//! and the first one that finds something wins. The windows below are tuned
//! to the page layouts seen so far and are not guaranteed to generalize.
//! Anything not found stays `None`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::UserStats;

/// Characters scanned after a byte-metric label for a size value.
pub const BYTE_WINDOW: usize = 300;
/// Characters scanned after the ratio label.
pub const RATIO_WINDOW: usize = 100;

/// Room past the window for the rest of a value that starts inside it.
const VALUE_TAIL: usize = 64;

/// Achievement badges ("Uploaded >= 1 TB") must not be read as values.
const GTE_MARKERS: [&str; 2] = [">=", "&gt;="];

static UPLOADED_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Upload(?:ed)?").unwrap());
static DOWNLOADED_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Download(?:ed)?").unwrap());
static BUFFER_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Buffer").unwrap());
static RATIO_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Ratio").unwrap());

static SIZE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d{1,3}(?:[,\x{00A0}\x{202F} ]\d{3})+(?:\.\d+)?|\d+(?:[.,]\d+)?)\s*([KMGTP]i?B|(?-i:B)\b)",
    )
    .unwrap()
});
static DECIMAL_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\d+").unwrap());
static INTEGER_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

static SEEDING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // "Uploaded (Seeding) ... (296)"
        Regex::new(r"(?is)Uploaded\s*\(Seeding\).{0,300}?\(\s*(\d+)\s*\)").unwrap(),
        // "Torrents seeding</td><td>12"
        Regex::new(r"(?is)Torrents\s+seeding.{0,300}?>.{0,100}?(\d+)").unwrap(),
        // "&uarr; 448"
        Regex::new(r"(?is)(?:&uarr;|uarr).{0,50}?(\d+)").unwrap(),
        // "Seeding: 4", "title='Seeding'>4"
        Regex::new(r#"(?is)Seeding\s*(?:[:><"']|&nbsp;).{0,200}?(\d+)"#).unwrap(),
    ]
});

static LEECHING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?is)Downloaded\s*\(Leeching\).{0,300}?\(\s*(\d+)\s*\)").unwrap(),
        Regex::new(r"(?is)Torrents\s+leeching.{0,300}?>.{0,100}?(\d+)").unwrap(),
        Regex::new(r"(?is)(?:&darr;|darr).{0,50}?(\d+)").unwrap(),
        Regex::new(r#"(?is)Leeching\s*(?:[:><"']|&nbsp;).{0,200}?(\d+)"#).unwrap(),
    ]
});

static HIT_AND_RUN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![Regex::new(r"(?is)(?:Hit\s+(?:and|&)\s+Run|H&R|HnR).{0,200}?(\d+)").unwrap()]
});

static BONUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![Regex::new(
        r#"(?is)(?:TL Points|Bonus Points|Bonus|BON)\s*(?:[:<>"']|&nbsp;).{0,150}?(\d+(?:[,\x{00A0}\x{202F} ]\d{3})*(?:\.\d+)?)"#,
    )
    .unwrap()]
});

/// Extract whatever statistics can be found in a profile page.
pub fn extract_user_stats(html: &str) -> UserStats {
    UserStats {
        uploaded: byte_metric(html, &UPLOADED_LABEL),
        downloaded: byte_metric(html, &DOWNLOADED_LABEL),
        buffer: byte_metric(html, &BUFFER_LABEL),
        ratio: ratio(html),
        bonus: first_capture(html, &BONUS_PATTERNS, parse_number),
        seeding: first_capture(html, &SEEDING_PATTERNS, parse_count),
        leeching: first_capture(html, &LEECHING_PATTERNS, parse_count),
        hit_and_runs: first_capture(html, &HIT_AND_RUN_PATTERNS, parse_count),
    }
}

/// Convert a size such as `("3.03", "TB")` to bytes using binary prefixes.
///
/// Unknown units count as bytes.
pub fn parse_size(value: &str, unit: &str) -> Option<u64> {
    let amount = parse_number(value)?;
    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "KB" | "KIB" => 1024_f64,
        "MB" | "MIB" => 1024_f64.powi(2),
        "GB" | "GIB" => 1024_f64.powi(3),
        "TB" | "TIB" => 1024_f64.powi(4),
        "PB" | "PIB" => 1024_f64.powi(5),
        _ => 1.0,
    };
    Some((amount * multiplier).floor() as u64)
}

/// Parse a free-form size string such as `"575.67 GiB"` into bytes.
pub fn parse_size_str(text: &str) -> Option<u64> {
    let caps = SIZE_VALUE.captures(text)?;
    parse_size(&caps[1], &caps[2])
}

/// Parse a number after stripping thousands separators.
pub fn parse_number(value: &str) -> Option<f64> {
    let clean: String = value
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{00A0}' | '\u{202F}'))
        .collect();
    clean.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_count(value: &str) -> Option<u64> {
    value.parse().ok()
}

/// Try each pattern in order; the first match is parsed from capture group 1.
fn first_capture<T>(html: &str, patterns: &[Regex], parse: fn(&str) -> Option<T>) -> Option<T> {
    patterns
        .iter()
        .find_map(|pattern| pattern.captures(html))
        .and_then(|caps| parse(&caps[1]))
}

fn byte_metric(html: &str, label: &Regex) -> Option<u64> {
    scan_after_label(html, label, BYTE_WINDOW, &SIZE_VALUE)
        .and_then(|caps| parse_size(&caps[1], &caps[2]))
}

fn ratio(html: &str) -> Option<f64> {
    // A decimal anywhere beats an integer, so the fallback only runs when no
    // label occurrence has a decimal value.
    [&*DECIMAL_VALUE, &*INTEGER_VALUE]
        .into_iter()
        .find_map(|value| scan_after_label(html, &RATIO_LABEL, RATIO_WINDOW, value))
        .and_then(|caps| parse_number(&caps[0]))
}

/// Find the first label occurrence followed by `value` within `window`
/// characters, with no `>=` marker between the label and the value.
fn scan_after_label<'h>(
    html: &'h str,
    label: &Regex,
    window: usize,
    value: &Regex,
) -> Option<Captures<'h>> {
    label.find_iter(html).find_map(|label_match| {
        let rest = &html[label_match.end()..];
        // Only the window (plus one value's length) is ever searched, so each
        // label costs the same however long the page is.
        let segment = &rest[..window_limit(rest, window + VALUE_TAIL)];
        let limit = window_limit(segment, window).min(gte_marker_offset(segment));
        value
            .captures(segment)
            .filter(|caps| caps.get(0).is_some_and(|m| m.start() <= limit))
    })
}

/// Byte offset of the position `chars` characters into `text`.
fn window_limit(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

fn gte_marker_offset(text: &str) -> usize {
    GTE_MARKERS
        .iter()
        .filter_map(|marker| text.find(marker))
        .min()
        .unwrap_or(text.len())
}
