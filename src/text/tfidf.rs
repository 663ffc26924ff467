//! TF-IDF vectorizer with a capped vocabulary.
//!
//! ```text
//! tfidf(t, d) = count(t, d) × idf(t)
//! idf(t)      = ln((1 + N) / (1 + df(t))) + 1
//! ```
//!
//! Rows are L2-normalized, so the cosine similarity of two documents is the
//! dot product of their rows.

use std::collections::{HashMap, HashSet};

use rustc_hash::FxHashMap;

use super::stopwords::StopWords;
use super::tokenize::tokenize;
use crate::primitives::vector::SparseVector;

/// Converts documents into sparse TF-IDF rows.
///
/// `fit_transform` learns the vocabulary and idf weights; `transform` reuses
/// them for unseen text. Refitting replaces everything learned before.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: Option<usize>,
    ngram_range: (usize, usize),
    stop_words: StopWords,
    vocabulary: Vec<String>,
    term_ids: FxHashMap<String, u32>,
    idf: Vec<f64>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TfidfVectorizer {
    /// Unigrams, no stop words, unbounded vocabulary.
    pub fn new() -> Self {
        Self {
            max_features: None,
            ngram_range: (1, 1),
            stop_words: StopWords::none(),
            vocabulary: Vec::new(),
            term_ids: FxHashMap::default(),
            idf: Vec::new(),
        }
    }

    /// Keeps only the `max_features` most frequent terms of the corpus.
    #[must_use]
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Inclusive n-gram length range; lengths below 1 are raised to 1.
    #[must_use]
    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        let min_n = min_n.max(1);
        self.ngram_range = (min_n, max_n.max(min_n));
        self
    }

    /// Removes `stop_words` before n-grams are formed.
    #[must_use]
    pub fn with_stop_words(mut self, stop_words: StopWords) -> Self {
        self.stop_words = stop_words;
        self
    }

    /// Tokens minus stop words, expanded into space-joined n-grams.
    fn analyze(&self, document: &str) -> Vec<String> {
        let tokens = self.stop_words.filter(tokenize(document));
        let mut terms = Vec::new();
        for n in self.ngram_range.0..=self.ngram_range.1 {
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    /// Learns vocabulary and idf from `documents` and returns one row each.
    ///
    /// An empty corpus, or one with no surviving terms, yields an empty
    /// vocabulary and all-zero rows.
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Vec<SparseVector> {
        let analyzed: Vec<Vec<String>> =
            documents.iter().map(|doc| self.analyze(doc.as_ref())).collect();

        let mut term_freq: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for terms in &analyzed {
            let mut seen: HashSet<&str> = HashSet::new();
            for term in terms {
                *term_freq.entry(term.as_str()).or_insert(0) += 1;
                if seen.insert(term.as_str()) {
                    *doc_freq.entry(term.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = term_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if let Some(max_features) = self.max_features {
            ranked.truncate(max_features);
        }
        let mut kept: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort_unstable();

        let n_docs = documents.len() as f64;
        self.idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = kept.iter().map(|term| term.to_string()).collect();
        self.term_ids = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx as u32))
            .collect();

        analyzed.iter().map(|terms| self.weigh(terms)).collect()
    }

    /// Vectorizes unseen text with the learned vocabulary.
    pub fn transform(&self, document: &str) -> SparseVector {
        self.weigh(&self.analyze(document))
    }

    fn weigh(&self, terms: &[String]) -> SparseVector {
        let pairs = terms
            .iter()
            .filter_map(|term| self.term_ids.get(term))
            .map(|&id| (id, self.idf[id as usize]))
            .collect();
        let mut row = SparseVector::from_pairs(pairs);
        row.l2_normalize();
        row
    }

    /// Learned terms in term-id order (alphabetical).
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Number of learned terms.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Idf weight of a learned term.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.term_ids.get(term).map(|&id| self.idf[id as usize])
    }
}
