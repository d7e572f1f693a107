//! Normalization of free-text track and artist names.
//!
//! [`clean_track_name`] is deliberately lossy: streaming catalogs store clean
//! titles, so stripping uploader noise raises the match rate against catalog
//! search at the cost of occasionally merging two genuinely different titles.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // "prod. X", "feat. X", "ft. X" (optionally bracketed) until end of title
    static ref CREDIT_SUFFIX: Regex =
        Regex::new(r"(?i)\s*[\(\[]?\b(?:prod|feat|ft)\.?\s.*$").unwrap();
    // "(with X)" / "[with X]" until end of title
    static ref WITH_SUFFIX: Regex = Regex::new(r"(?i)\s*[\(\[]with\s.*$").unwrap();
    static ref SQUARE_BRACKETS: Regex = Regex::new(r"\s*\[[^\]]*\]").unwrap();
    static ref BOLD_MARKUP: Regex = Regex::new(r"\*\*[^*]*\*\*").unwrap();
    static ref NOISE_TOKENS: Regex = Regex::new(r"(?i)ep\s+out\s+now|\((?:lq|hq)\)").unwrap();
    static ref PARENTHESIZED: Regex = Regex::new(r"\s*\(([^()]*)\)").unwrap();
    static ref NOISE_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(?:prod|feat|ft|bootleg|remix|edit|demo|version|slowed|reverb|mix|vip|live|session|remaster|remastered)\b"
    )
    .unwrap();
    static ref FULL_DATE: Regex = Regex::new(r"\b\d{1,2}\.\d{1,2}\.\d{4}\b").unwrap();
    static ref BARE_YEAR: Regex = Regex::new(r"\b\d{4}\b").unwrap();
    static ref PART_MARKER: Regex =
        Regex::new(r"(?i)\b(?:p\d+|pt\.?\s*\d+|part\s*\d+)\b").unwrap();
    static ref EMPTY_BRACKETS: Regex = Regex::new(r"\(\s*\)|\[\s*\]").unwrap();
    static ref DASH_SUFFIX: Regex = Regex::new(r"\s+-\s+.*$").unwrap();
    static ref DANGLING_DASH: Regex = Regex::new(r"\s*-\s*$").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Lower-case, strip diacritics and trim.
///
/// Lower-casing happens before decomposition so that characters whose lower
/// case form carries a combining mark (e.g. `İ`) end up mark-free, which keeps
/// the function idempotent.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Strip uploader noise from a track title.
///
/// Applied in order: credit suffixes, square-bracket metadata, noise tokens,
/// parenthetical groups mentioning a version keyword, dates, part markers and
/// a trailing `" - ..."` segment. If everything gets stripped the trimmed
/// input is returned instead.
pub fn clean_track_name(s: &str) -> String {
    if s.trim().is_empty() {
        return String::new();
    }

    let mut cleaned = CREDIT_SUFFIX.replace(s, "").into_owned();
    cleaned = WITH_SUFFIX.replace(&cleaned, "").into_owned();
    cleaned = SQUARE_BRACKETS.replace_all(&cleaned, "").into_owned();
    cleaned = BOLD_MARKUP.replace_all(&cleaned, "").into_owned();
    cleaned = NOISE_TOKENS.replace_all(&cleaned, "").into_owned();
    cleaned = PARENTHESIZED
        .replace_all(&cleaned, |caps: &Captures| {
            if NOISE_KEYWORDS.is_match(&caps[1]) {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned();
    cleaned = FULL_DATE.replace_all(&cleaned, "").into_owned();
    cleaned = BARE_YEAR.replace_all(&cleaned, "").into_owned();
    cleaned = PART_MARKER.replace_all(&cleaned, "").into_owned();
    cleaned = EMPTY_BRACKETS.replace_all(&cleaned, "").into_owned();
    cleaned = DASH_SUFFIX.replace(&cleaned, "").into_owned();
    cleaned = DANGLING_DASH.replace(&cleaned, "").into_owned();

    let cleaned = collapse_whitespace(&cleaned);
    if cleaned.is_empty() {
        collapse_whitespace(s)
    } else {
        cleaned
    }
}

/// Key used by plain deduplication: `normalize(name)::normalize(artist)`.
pub fn dedup_key(name: &str, artist: &str) -> String {
    format!("{}::{}", normalize(name), normalize(artist))
}

/// Key used for session anti-repetition and the generative path:
/// `normalize(clean_track_name(name))::normalize(artist)`.
pub fn session_key(name: &str, artist: &str) -> String {
    format!("{}::{}", normalize(&clean_track_name(name)), normalize(artist))
}
