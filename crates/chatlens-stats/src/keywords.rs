use std::collections::{HashMap, HashSet};

use chatlens_types::KeywordCount;

/// Collapse runs of three or more identical characters to two (`ㅋㅋㅋ` → `ㅋㅋ`).
pub fn squash_repeats(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut run_char = None;
    let mut run_len = 0usize;

    for c in token.chars() {
        if Some(c) == run_char {
            run_len += 1;
        } else {
            run_char = Some(c);
            run_len = 1;
        }
        if run_len <= 2 {
            out.push(c);
        }
    }
    out
}

/// Lower-cased tokens split on anything that is not a letter or digit.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| squash_repeats(&t.to_lowercase()))
}

/// Frequency counter that remembers first-occurrence order for ties.
pub struct KeywordCounter<'a> {
    stopwords: &'a HashSet<String>,
    min_chars: usize,
    counts: HashMap<String, (u64, usize)>,
}

impl<'a> KeywordCounter<'a> {
    pub fn new(stopwords: &'a HashSet<String>, min_chars: usize) -> Self {
        Self {
            stopwords,
            min_chars,
            counts: HashMap::new(),
        }
    }

    pub fn add_text(&mut self, text: &str) {
        for token in tokenize(text) {
            if token.chars().count() < self.min_chars
                || token.chars().all(|c| c.is_ascii_digit())
                || self.stopwords.contains(&token)
            {
                continue;
            }
            let order = self.counts.len();
            self.counts.entry(token).or_insert((0, order)).0 += 1;
        }
    }

    /// Top `n` terms by count, ties by first occurrence
    pub fn top(self, n: usize) -> Vec<KeywordCount> {
        let mut entries: Vec<(String, u64, usize)> = self
            .counts
            .into_iter()
            .map(|(term, (count, order))| (term, count, order))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        entries
            .into_iter()
            .take(n)
            .map(|(term, count, _)| KeywordCount { term, count })
            .collect()
    }
}
