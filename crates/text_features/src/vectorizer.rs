//! TF-IDF vectorizer over word unigrams and bigrams.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::normalize_text;

/// Errors raised while fitting or applying a vectorizer.
#[derive(Debug, thiserror::Error)]
pub enum VectorizerError {
    #[error("cannot fit a vectorizer on an empty corpus")]
    EmptyCorpus,

    #[error("corpus produced an empty vocabulary (no tokens of two or more characters)")]
    EmptyVocabulary,
}

/// Vectorizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Largest n-gram size (1 = unigrams only, 2 = unigrams and bigrams).
    pub max_ngram: usize,
    /// Vocabulary cap, keeping the most frequent terms.
    pub max_features: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_ngram: 2,
            max_features: 5000,
        }
    }
}

/// A sparse feature row: `(feature index, weight)` pairs sorted by index.
pub type SparseRow = Vec<(usize, f32)>;

/// Fitted TF-IDF vectorizer.
///
/// Terms are indexed alphabetically. Weights are raw counts times smoothed
/// idf, `ln((1 + n) / (1 + df)) + 1`, with each row L2-normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Fits the vocabulary and idf weights on a corpus.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus is empty or yields no terms.
    pub fn fit<S: AsRef<str>>(
        corpus: &[S],
        config: VectorizerConfig,
    ) -> Result<Self, VectorizerError> {
        if corpus.is_empty() {
            return Err(VectorizerError::EmptyCorpus);
        }

        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            let terms = analyze(doc.as_ref(), config.max_ngram);
            let unique: BTreeSet<&String> = terms.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
            for term in terms {
                *term_counts.entry(term).or_default() += 1;
            }
        }

        if term_counts.is_empty() {
            return Err(VectorizerError::EmptyVocabulary);
        }

        // Most frequent first, alphabetical among ties, then cap.
        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(config.max_features.max(1));

        let kept: BTreeSet<String> = ranked.into_iter().map(|(term, _)| term).collect();
        let vocabulary: BTreeMap<String, usize> = kept
            .into_iter()
            .enumerate()
            .map(|(index, term)| (term, index))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let n_docs = corpus.len() as f32;
        let idf = vocabulary
            .keys()
            .map(|term| {
                #[allow(clippy::cast_precision_loss)]
                let df = doc_freq.get(term).copied().unwrap_or(0) as f32;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        Ok(Self {
            config,
            vocabulary,
            idf,
        })
    }

    /// Number of features (vocabulary size).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// Settings the vectorizer was fitted with.
    #[must_use]
    pub const fn config(&self) -> VectorizerConfig {
        self.config
    }

    /// Index of a term, if it is in the vocabulary.
    #[must_use]
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Transforms one document into a sparse, L2-normalized row.
    /// Out-of-vocabulary terms are ignored.
    #[must_use]
    pub fn transform_one(&self, doc: &str) -> SparseRow {
        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        for term in analyze(doc, self.config.max_ngram) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_default() += 1.0;
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(index, count)| (index, count * self.idf[index]))
            .collect();

        let norm = row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, weight) in &mut row {
                *weight /= norm;
            }
        }

        row
    }

    /// Transforms a batch of documents into sparse rows.
    #[must_use]
    pub fn transform<S: AsRef<str>>(&self, docs: &[S]) -> Vec<SparseRow> {
        docs.iter().map(|doc| self.transform_one(doc.as_ref())).collect()
    }

    /// Transforms a batch into a row-major dense matrix of shape
    /// `[docs.len(), n_features()]`.
    #[must_use]
    pub fn transform_dense<S: AsRef<str>>(&self, docs: &[S]) -> Vec<f32> {
        let width = self.n_features();
        let mut dense = vec![0.0; docs.len() * width];
        for (row_index, row) in self.transform(docs).into_iter().enumerate() {
            for (col, weight) in row {
                dense[row_index * width + col] = weight;
            }
        }
        dense
    }
}

/// Normalizes, tokenizes and expands a document into its n-gram terms.
fn analyze(doc: &str, max_ngram: usize) -> Vec<String> {
    let normalized = normalize_text(doc);
    let tokens = tokenize(&normalized);
    let mut terms = Vec::with_capacity(tokens.len() * max_ngram.max(1));

    for n in 1..=max_ngram.max(1) {
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }

    terms
}

/// Splits on anything but alphanumerics and `_`, keeping tokens of two or
/// more characters.
fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .collect()
}
