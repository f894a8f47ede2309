//! Text feature extraction for the risk classifier.
//!
//! This crate turns raw customer text into ML-ready feature vectors. The same
//! [`normalize_text`] runs inside [`TfidfVectorizer`] at fit and transform
//! time, and the fitted vectorizer is serialized with the model, so scoring
//! always sees exactly the features training produced.

mod vectorizer;

pub use vectorizer::*;

/// Lowercases, trims and collapses whitespace runs to a single space.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
