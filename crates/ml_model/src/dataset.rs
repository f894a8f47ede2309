//! Labeled training data and tensor batching.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use burn::prelude::*;
use risk_structs::RiskLabel;
use strum::IntoEnumIterator;

const TEXT_COLUMN: &str = "raw_text";
const LABEL_COLUMN: &str = "label";

/// Errors raised while loading a labeled training file.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("training CSV must have columns: {TEXT_COLUMN},{LABEL_COLUMN} (found: {found})")]
    MissingColumns { found: String },

    #[error("invalid labels found: {invalid:?}. Allowed: {allowed:?}")]
    InvalidLabels {
        invalid: Vec<String>,
        allowed: Vec<String>,
    },

    #[error("training dataset is empty")]
    Empty,

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// One labeled training example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledText {
    pub raw_text: String,
    pub label: RiskLabel,
}

/// Validated training data.
#[derive(Debug, Clone, Default)]
pub struct LabeledDataset {
    samples: Vec<LabeledText>,
}

impl LabeledDataset {
    /// Loads a CSV file with `raw_text` and `label` columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a column is missing, or
    /// any label falls outside `LOW`/`MEDIUM`/`HIGH`.
    pub fn from_csv(path: &Path) -> Result<Self, DatasetError> {
        let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        Self::from_csv_reader(reader)
    }

    /// Parses CSV content from any reader.
    ///
    /// # Errors
    ///
    /// See [`LabeledDataset::from_csv`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        Self::from_csv_reader(csv::ReaderBuilder::new().flexible(true).from_reader(reader))
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, DatasetError> {
        let headers = reader.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let (Some(text_idx), Some(label_idx)) = (position(TEXT_COLUMN), position(LABEL_COLUMN))
        else {
            return Err(DatasetError::MissingColumns {
                found: headers.iter().collect::<Vec<_>>().join(","),
            });
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push((
                record.get(text_idx).unwrap_or_default().to_string(),
                record.get(label_idx).unwrap_or_default().to_string(),
            ));
        }

        Self::from_rows(rows)
    }

    /// Validates `(raw_text, label)` pairs. Labels are matched after
    /// trimming and upper-casing.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidLabels`] listing every distinct bad
    /// label, or [`DatasetError::Empty`] if there are no rows.
    pub fn from_rows<I>(rows: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut samples = Vec::new();
        let mut invalid = BTreeSet::new();

        for (raw_text, label) in rows {
            let label = label.trim().to_uppercase();
            match label.parse::<RiskLabel>() {
                Ok(label) => samples.push(LabeledText { raw_text, label }),
                Err(_) => {
                    invalid.insert(label);
                }
            }
        }

        if !invalid.is_empty() {
            return Err(DatasetError::InvalidLabels {
                invalid: invalid.into_iter().collect(),
                allowed: RiskLabel::iter().map(|l| l.to_string()).collect(),
            });
        }
        if samples.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self { samples })
    }

    #[must_use]
    pub fn samples(&self) -> &[LabeledText] {
        &self.samples
    }

    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.raw_text.as_str()).collect()
    }

    #[must_use]
    pub fn labels(&self) -> Vec<RiskLabel> {
        self.samples.iter().map(|s| s.label).collect()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A batch of dense features and class targets.
#[derive(Debug, Clone)]
pub struct TextBatch<B: Backend> {
    /// Shape [`batch_size`, `n_features`].
    pub inputs: Tensor<B, 2>,
    /// Shape [`batch_size`], class indices.
    pub targets: Tensor<B, 1, Int>,
}

/// Builds tensors from vectorized rows.
#[derive(Clone, Debug)]
pub struct TextBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> TextBatcher<B> {
    pub const fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// `features` is row-major with `labels.len()` rows of `n_features`.
    pub fn batch(&self, features: &[f32], n_features: usize, labels: &[RiskLabel]) -> TextBatch<B> {
        let batch_size = labels.len();

        let inputs = Tensor::<B, 1>::from_floats(features, &self.device)
            .reshape([batch_size, n_features]);

        #[allow(clippy::cast_possible_wrap)]
        let targets: Vec<i64> = labels.iter().map(|l| l.class_index() as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device);

        TextBatch { inputs, targets }
    }
}
