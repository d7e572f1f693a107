use std::collections::HashMap;

fn bigrams(s: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Dice coefficient over character bigrams: `2·|A∩B| / (|A|+|B|)`.
///
/// Bigrams are counted as a multiset, so repeated pairs only match as many
/// times as they occur on both sides. Empty input scores 0, equal non-empty
/// input scores 1, and strings shorter than two characters have no bigrams.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let a_bigrams = bigrams(a);
    let b_bigrams = bigrams(b);
    let total = a_bigrams.len() + b_bigrams.len();
    if total == 0 {
        return 0.0;
    }

    let mut counts: HashMap<(char, char), usize> = HashMap::new();
    for bigram in a_bigrams {
        *counts.entry(bigram).or_default() += 1;
    }

    let mut intersection = 0usize;
    for bigram in b_bigrams {
        if let Some(count) = counts.get_mut(&bigram) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    (2 * intersection) as f64 / total as f64
}
