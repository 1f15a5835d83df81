use std::sync::LazyLock;

use regex::Regex;

pub const DEFAULT_MAX_COMPONENT_LENGTH: usize = 80;
pub const DEFAULT_SPECIES_COMPONENT_LENGTH: usize = 50;

const ILLEGAL_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

// <catalog id>-<yymmdd>_<anything>_<Ge.speci>
static STRUCTURED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(XC\d+)-(\d{6})_.*?_([A-Za-z]{2}\.[A-Za-z]{3,5})")
        .expect("structured name pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredName {
    Matched(String),
    NoMatch,
}

pub fn shorten_structured(name: &str) -> StructuredName {
    match STRUCTURED_NAME.captures(name) {
        Some(caps) => StructuredName::Matched(format!("{}_{}_{}", &caps[1], &caps[2], &caps[3])),
        None => StructuredName::NoMatch,
    }
}

pub fn sanitize(name: &str, max_len: usize) -> String {
    let cleaned = name
        .chars()
        .filter(|ch| !ILLEGAL_CHARS.contains(ch))
        .map(|ch| if ch == ' ' { '_' } else { ch })
        .collect::<String>();

    if cleaned.chars().count() <= max_len {
        return cleaned;
    }

    if let StructuredName::Matched(short) = shorten_structured(&cleaned) {
        if short.chars().count() <= max_len {
            tracing::debug!(original = %cleaned, shortened = %short, "shortened long name");
            return short;
        }
    }

    let truncated = truncate_chars(&cleaned, max_len);
    tracing::debug!(original = %cleaned, truncated = %truncated, "truncated long name");
    truncated
}

/// Filename without its last extension; a leading dot does not start one.
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if file_name[..idx].chars().any(|ch| ch != '.') => &file_name[..idx],
        _ => file_name,
    }
}

fn truncate_chars(value: &str, max_len: usize) -> String {
    value.chars().take(max_len).collect()
}
