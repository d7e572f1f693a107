//! Deduplication and per-artist diversity filtering.

use super::models::Track;
use crate::text::{dedup_key, normalize};
use std::collections::{HashMap, HashSet};

/// Keep the first occurrence of each `normalize(name)::normalize(artist)`.
///
/// Titles are not cleaned here, unlike the session key: "Song" and
/// "Song (Live)" by the same artist both survive.
pub fn deduplicate_tracks(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(dedup_key(&t.name, &t.artist)))
        .collect()
}

/// Cap how many tracks each artist contributes.
///
/// The first pass admits tracks while their artist is under `max_per_artist`.
/// The second pass revisits the rejected tracks and admits at most one more
/// per artist, so no artist ends up with more than `max_per_artist + 1`.
/// Relative order is preserved within each pass; second-pass tracks follow
/// the first-pass ones.
pub fn apply_diversity_filter(tracks: Vec<Track>, max_per_artist: usize) -> Vec<Track> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::with_capacity(tracks.len());
    let mut rejected = Vec::new();

    for track in tracks {
        let count = counts.entry(normalize(&track.artist)).or_default();
        if *count < max_per_artist {
            *count += 1;
            kept.push(track);
        } else {
            rejected.push(track);
        }
    }

    let cap = max_per_artist + 1;
    for track in rejected {
        let count = counts.entry(normalize(&track.artist)).or_default();
        if *count < cap {
            *count += 1;
            kept.push(track);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by(artist: &str, name: &str) -> Track {
        Track::new(name, artist)
    }

    fn count_artist(tracks: &[Track], artist: &str) -> usize {
        tracks.iter().filter(|t| t.artist == artist).count()
    }

    #[test]
    fn test_diversity_two_pass() {
        let tracks = vec![
            by("A", "a1"),
            by("A", "a2"),
            by("A", "a3"),
            by("A", "a4"),
            by("A", "a5"),
            by("B", "b1"),
        ];

        let filtered = apply_diversity_filter(tracks, 2);

        assert_eq!(filtered.len(), 4);
        assert_eq!(count_artist(&filtered, "A"), 3);
        assert_eq!(count_artist(&filtered, "B"), 1);
        let names: Vec<&str> = filtered.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a1", "a2", "b1", "a3"]);
    }

    #[test]
    fn test_diversity_bound_holds_for_many_shapes() {
        for cap in 0..4 {
            for a_count in 0..8 {
                let mut tracks: Vec<Track> =
                    (0..a_count).map(|i| by("A", &format!("a{}", i))).collect();
                tracks.extend((0..3).map(|i| by("b", &format!("b{}", i))));
                tracks.extend((0..2).map(|i| by("B", &format!("B{}", i))));

                let filtered = apply_diversity_filter(tracks.clone(), cap);
                assert!(count_artist(&filtered, "A") <= cap + 1);
                // "b" and "B" are the same artist once normalized
                let b_total = count_artist(&filtered, "b") + count_artist(&filtered, "B");
                assert!(b_total <= cap + 1);
                assert!(filtered.len() <= tracks.len());
            }
        }
    }

    #[test]
    fn test_diversity_keeps_everything_under_cap() {
        let tracks = vec![by("A", "1"), by("B", "2"), by("C", "3")];
        assert_eq!(apply_diversity_filter(tracks.clone(), 3), tracks);
    }

    #[test]
    fn test_deduplicate_first_occurrence_wins() {
        let mut first = by("Queen", "Bohemian Rhapsody");
        first.reason = Some("first".to_string());
        let tracks = vec![
            first,
            by("QUEEN", "bohemian rhapsody"),
            by("Queen", "Bohemian Rhapsody (Live)"),
            by("Quéen", "Bohemian Rhapsody"),
        ];

        let deduped = deduplicate_tracks(tracks);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].reason.as_deref(), Some("first"));
        assert_eq!(deduped[1].name, "Bohemian Rhapsody (Live)");
    }

    #[test]
    fn test_deduplicate_output_has_unique_keys() {
        let tracks: Vec<Track> = ["x", "X", "y", " x ", "z", "Y"]
            .iter()
            .map(|n| by("Artist", n))
            .collect();
        let deduped = deduplicate_tracks(tracks.clone());
        let keys: HashSet<String> = deduped
            .iter()
            .map(|t| dedup_key(&t.name, &t.artist))
            .collect();
        assert_eq!(keys.len(), deduped.len());
        assert!(deduped.len() <= tracks.len());
        assert_eq!(deduped.len(), 3);
    }
}
