/// Helpers for turning raw tag strings into the single values the library stores

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Separators between credited names: `, ; / | 、 &` and featuring markers
fn separators() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"[,;/|、&]|\s+(?:ft\.?|feat\.?|featuring)\s+").expect("separator pattern is valid")
    })
}

fn four_digit_year() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\b(\d{4})\b").expect("year pattern is valid"))
}

/// Leading track numbers such as `01 - `, `3. ` or `12_`
fn track_number_prefix() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\d{1,3}\s*[-._)]\s*").expect("prefix pattern is valid"))
}

/// Split a multi-valued artist or genre field into trimmed, non-empty values
pub fn split_multi_value(value: &str) -> Vec<String> {
    separators()
        .split(value)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// First credited value, or None for a blank field
pub fn primary_value(value: &str) -> Option<String> {
    split_multi_value(value).into_iter().next()
}

/// Pull a year out of free-form date strings like `2004`, `2004-05-11` or `11/05/2004`
pub fn parse_year(raw: &str) -> Option<u32> {
    four_digit_year()
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|&y: &u32| y > 0)
}

/// Title for an untagged file: the file stem without a leading track number
pub fn title_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown");

    let stripped = track_number_prefix().replace(stem, "");
    let title = stripped.trim();
    if title.is_empty() {
        stem.to_string()
    } else {
        title.to_string()
    }
}
