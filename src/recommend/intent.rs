//! Classification of a similarity-graph prompt into a traversal mode.

use lazy_static::lazy_static;
use regex::Regex;

const GENRES: &[&str] = &[
    "rock",
    "pop",
    "jazz",
    "indie",
    "electronic",
    "hip hop",
    "rap",
    "metal",
    "folk",
    "country",
    "blues",
    "reggae",
    "punk",
    "soul",
    "funk",
    "disco",
    "house",
    "techno",
    "ambient",
    "classical",
    "edm",
    "r&b",
    "alternative",
    "grunge",
    "psychedelic",
    "progressive",
    "hardcore",
    "ska",
    "gospel",
    "latin",
    "world",
    "experimental",
    "noise",
    "drone",
    "shoegaze",
];

/// Listener count above which a free-text search hit is trusted to be the
/// track the user meant.
pub const TRACK_SEARCH_LISTENER_THRESHOLD: u64 = 100_000;

lazy_static! {
    static ref BY_OR_FROM: Regex = Regex::new(r"(?i)^(.+?)\s+(?:by|from)\s+(.+)$").unwrap();
    static ref DASHED: Regex = Regex::new(r"^(.+?)\s+-\s+(.+)$").unwrap();
    static ref GENRE_PATTERNS: Vec<(&'static str, Regex)> = GENRES
        .iter()
        .map(|genre| {
            let pattern = format!(r"(?i)(?:^|[^\w&]){}(?:$|[^\w&])", regex::escape(genre));
            (*genre, Regex::new(&pattern).unwrap())
        })
        .collect();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// A named track by a named artist.
    Track { name: String, artist: String },
    /// A genre keyword was found.
    Genre(String),
    /// Free text the catalog recognizes as a popular track.
    TrackSearch(String),
    /// Everything else is treated as an artist name.
    Artist(String),
}

/// Match the explicit "X by Y", "X from Y" and "X - Y" forms.
pub fn parse_named_track(prompt: &str) -> Option<(String, String)> {
    let caps = BY_OR_FROM
        .captures(prompt)
        .or_else(|| DASHED.captures(prompt))?;
    let name = caps[1].trim();
    let artist = caps[2].trim();
    if name.is_empty() || artist.is_empty() {
        return None;
    }
    Some((name.to_string(), artist.to_string()))
}

/// First genre keyword, in list order, appearing as a whole word.
pub fn find_genre(prompt: &str) -> Option<&'static str> {
    GENRE_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(prompt))
        .map(|(genre, _)| *genre)
}

/// Classify without consulting the catalog. Returns `None` when the catalog
/// lookup is needed to tell a track title from an artist name.
pub fn classify_offline(prompt: &str) -> Option<Intent> {
    if let Some((name, artist)) = parse_named_track(prompt) {
        return Some(Intent::Track { name, artist });
    }
    find_genre(prompt).map(|genre| Intent::Genre(genre.to_string()))
}
