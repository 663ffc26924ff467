//! Text processing for the product feature index.
//!
//! - [`stopwords`]: English stop-word list and filter
//! - [`tokenize`]: lowercase word tokenizer
//! - [`tfidf`]: fixed-vocabulary TF-IDF vectorizer over unigrams and bigrams

pub mod stopwords;
pub mod tfidf;
pub mod tokenize;

pub use stopwords::StopWords;
pub use tfidf::TfidfVectorizer;
pub use tokenize::tokenize;
