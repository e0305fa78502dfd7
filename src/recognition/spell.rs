//! Frequency-dictionary spelling correction.
//!
//! Candidates are the known words at edit distance 1 (deletion, transposition, replacement or
//! insertion of a lowercase ASCII letter), falling back to distance 2. The most frequent candidate
//! wins.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";

pub struct SpellChecker {
    frequencies: HashMap<String, u64>,
}

impl SpellChecker {
    /// Loads a dictionary with one `word count` pair per line. A missing count means 1.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let checker = Self::parse(&contents)?;
        log::info!(
            "Loaded {} dictionary words from {}",
            checker.frequencies.len(),
            path.display()
        );
        Ok(checker)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut frequencies = HashMap::new();
        for (line_no, line) in contents.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let count = match fields.next() {
                Some(count) => count.parse::<u64>().map_err(|e| {
                    Error::Dictionary(format!("line {}: bad count {count:?}: {e}", line_no + 1))
                })?,
                None => 1,
            };
            *frequencies.entry(word.to_lowercase()).or_insert(0) += count;
        }

        if frequencies.is_empty() {
            return Err(Error::Dictionary("dictionary is empty".to_string()));
        }
        Ok(Self { frequencies })
    }

    pub fn from_words<'a>(words: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        Self {
            frequencies: words
                .into_iter()
                .map(|(word, count)| (word.to_lowercase(), count))
                .collect(),
        }
    }

    pub fn is_known(&self, word: &str) -> bool {
        self.frequencies.contains_key(word)
    }

    /// The most likely spelling of `word`, or `None` if nothing within two edits is known.
    pub fn correction(&self, word: &str) -> Option<String> {
        let word = word.to_lowercase();
        if self.is_known(&word) {
            return Some(word);
        }

        let near = edits1(&word);
        if let Some(best) = self.most_frequent(near.iter()) {
            return Some(best);
        }

        let far: HashSet<String> = near.iter().flat_map(|w| edits1(w)).collect();
        self.most_frequent(far.iter())
    }

    /// Ties go to the alphabetically first word.
    fn most_frequent<'a>(&self, candidates: impl Iterator<Item = &'a String>) -> Option<String> {
        candidates
            .filter_map(|w| self.frequencies.get(w).map(|&count| (w, count)))
            .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
            .map(|(w, _)| w.clone())
    }
}

/// All strings one edit away from `word`.
fn edits1(word: &str) -> HashSet<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut out = HashSet::new();

    for i in 0..=chars.len() {
        let (left, right) = chars.split_at(i);
        let left: String = left.iter().collect();

        if !right.is_empty() {
            out.insert(format!("{left}{}", right[1..].iter().collect::<String>()));
        }
        if right.len() > 1 {
            out.insert(format!(
                "{left}{}{}{}",
                right[1],
                right[0],
                right[2..].iter().collect::<String>()
            ));
        }
        for c in LETTERS.chars() {
            if !right.is_empty() {
                out.insert(format!("{left}{c}{}", right[1..].iter().collect::<String>()));
            }
            out.insert(format!("{left}{c}{}", right.iter().collect::<String>()));
        }
    }
    out
}
