//! Spell checking using Levenshtein distance
//!
//! Used to suggest "did you mean" alternatives when a document refers to a
//!     macro or request that does not exist.

/// A dictionary word together with its edit distance from the searched word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseWord {
    pub word: String,
    pub distance: usize,
}

/// Find words in the provided dictionary that are close to the search word.
///
/// Only words within `max_distance` edits are returned.
/// The closest matches come first; ties are broken alphabetically so the result is deterministic.
pub fn find_close_words<'a, I>(dictionary: I, word: &str, max_distance: usize) -> Vec<CloseWord>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result: Vec<CloseWord> = dictionary
        .into_iter()
        .filter(|candidate| *candidate != word)
        .filter_map(|candidate| {
            let distance = levenshtein_distance(word, candidate);
            if distance <= max_distance {
                Some(CloseWord {
                    word: candidate.to_string(),
                    distance,
                })
            } else {
                None
            }
        })
        .collect();
    result.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.word.cmp(&b.word)));
    result
}

/// Number of single character insertions, deletions or substitutions needed to turn `a` into `b`.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    // row[j] holds the distance between the current prefix of a and b[..j].
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, a_i) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, b_j) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if a_i == b_j {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}
