//! Text cleanup shared by every source when turning raw listing fields into
//! event attributes.

use once_cell::sync::Lazy;
use regex::Regex;

use super::event::LocationType;

static PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[\d,]+(?:\s*[-\u{2013}]\s*\$[\d,]+)?").expect("price pattern compiles"));

const FREE_SPELLINGS: &[&str] = &["0", "$0", "$0.00", "no cost", "no charge"];

/// Split `"A, B and C"` or `"A & B"` into trimmed names
pub fn parse_speakers(text: &str) -> Vec<String> {
    text.replace(" and ", ", ")
        .replace(" & ", ", ")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reduce cost text to `free`, a dollar amount or range, or the lowercased text
pub fn normalize_cost(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() || lowered.contains("free") || FREE_SPELLINGS.contains(&lowered.as_str()) {
        return "free".to_string();
    }
    match PRICE.find(&lowered) {
        Some(price) => price.as_str().to_string(),
        None => lowered,
    }
}

pub fn detect_location_type(text: &str) -> LocationType {
    let lowered = text.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

    let in_person = mentions(&["in-person", "in person"]);
    if mentions(&["virtual", "online", "webinar", "zoom"]) {
        if in_person || lowered.contains("hybrid") {
            return LocationType::Hybrid;
        }
        return LocationType::Virtual;
    }
    if in_person || lowered.contains("onsite") {
        return LocationType::InPerson;
    }
    LocationType::Unknown
}
