//! Concept Vocabulary
//!
//! The shared concept inventory every lexicon starts from, the syllable
//! bank for coined terms, and the fragment tables myth summaries are
//! assembled from.

use rand::rngs::SmallRng;
use rand::Rng;

/// Concepts every agent carries a term for, in canonical order.
pub const CONCEPTS: &[(&str, &str)] = &[
    ("danger", "khor"),
    ("death", "mool"),
    ("debt", "senna"),
    ("fire", "ashen"),
    ("gift", "lumo"),
    ("grain", "vess"),
    ("home", "tarn"),
    ("law", "orid"),
    ("spirit", "yeva"),
    ("stranger", "polt"),
    ("trade", "miren"),
    ("water", "shale"),
];

/// Syllable bank for coined terms.
pub const SYLLABLES: &[&str] = &[
    "ka", "lo", "mir", "ash", "ten", "vor", "ul", "shi", "ran", "ost", "fen", "dra", "yel", "bru",
    "sen", "tol",
];

const MYTH_SUBJECTS: &[&str] = &[
    "the first flood",
    "the ember bird",
    "the hollow king",
    "the grain mother",
    "the glass serpent",
    "the silent trader",
    "the twin moons",
    "the salt wind",
];

const MYTH_EVENTS: &[&str] = &[
    "split the sky",
    "drowned the old roads",
    "taught the bargain words",
    "stole the summer",
    "buried the ore heart",
    "named the four valleys",
    "broke the long silence",
    "wove the trust lines",
];

/// Coins a new term from the syllable bank.
pub fn coin_term(rng: &mut SmallRng) -> String {
    let syllable_count = rng.gen_range(2..=3);
    let mut term = String::new();
    for _ in 0..syllable_count {
        term.push_str(SYLLABLES[rng.gen_range(0..SYLLABLES.len())]);
    }
    term
}

/// Assembles a myth summary from the fragment tables.
pub fn myth_summary(rng: &mut SmallRng) -> String {
    let subject = MYTH_SUBJECTS[rng.gen_range(0..MYTH_SUBJECTS.len())];
    let event = MYTH_EVENTS[rng.gen_range(0..MYTH_EVENTS.len())];
    format!("{} {}", subject, event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn concepts_are_in_canonical_order() {
        let mut sorted: Vec<_> = CONCEPTS.iter().map(|(c, _)| *c).collect();
        sorted.sort();
        let original: Vec<_> = CONCEPTS.iter().map(|(c, _)| *c).collect();
        assert_eq!(sorted, original);
    }

    #[test]
    fn coined_terms_are_deterministic_per_seed() {
        let mut a = SmallRng::seed_from_u64(9);
        let mut b = SmallRng::seed_from_u64(9);
        assert_eq!(coin_term(&mut a), coin_term(&mut b));
    }
}
