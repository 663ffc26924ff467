use crate::config::ContentConfig;
use crate::model::Product;
use crate::primitives::vector::SparseVector;
use crate::text::{StopWords, TfidfVectorizer};

/// TF-IDF rows of the catalog, one per product in catalog order.
#[derive(Debug, Clone, Default)]
pub struct ItemFeatureIndex {
    rows: Vec<SparseVector>,
    vocabulary: Vec<String>,
}

impl ItemFeatureIndex {
    /// Row of the product at catalog position `position`.
    pub fn row(&self, position: usize) -> Option<&SparseVector> {
        self.rows.get(position)
    }

    /// All rows in catalog order.
    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    /// Number of indexed products.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing was indexed.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Learned terms, alphabetical.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Number of learned terms.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Turns the catalog into an [`ItemFeatureIndex`].
///
/// Each product contributes the document `"{title} {category} {description}"`.
#[derive(Debug, Clone)]
pub struct ProductCorpusIndexer {
    max_features: usize,
    ngram_range: (usize, usize),
}

impl Default for ProductCorpusIndexer {
    fn default() -> Self {
        Self::from_config(&ContentConfig::default())
    }
}

impl ProductCorpusIndexer {
    /// Indexer using the vocabulary cap and n-gram range of `config`.
    pub fn from_config(config: &ContentConfig) -> Self {
        Self {
            max_features: config.max_features,
            ngram_range: config.ngram_range,
        }
    }

    /// Full rebuild over `products`; an empty catalog gives an empty index.
    pub fn index(&self, products: &[Product]) -> ItemFeatureIndex {
        let documents: Vec<String> = products.iter().map(Product::document).collect();
        let mut vectorizer = TfidfVectorizer::new()
            .with_max_features(self.max_features)
            .with_ngram_range(self.ngram_range.0, self.ngram_range.1)
            .with_stop_words(StopWords::english());
        let rows = vectorizer.fit_transform(&documents);
        ItemFeatureIndex {
            rows,
            vocabulary: vectorizer.vocabulary().to_vec(),
        }
    }
}
