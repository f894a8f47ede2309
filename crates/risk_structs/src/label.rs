//! Risk labels produced by the classifier and the premium policy attached to them.

use serde::{Deserialize, Serialize};

/// Risk class assigned to a piece of customer text.
///
/// Parsing is case-insensitive; the canonical form is upper case
/// (`LOW`, `MEDIUM`, `HIGH`), which is also how labels are persisted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::EnumCount,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RiskLabel {
    Low,
    Medium,
    High,
}

impl RiskLabel {
    /// Premium adjustment percentage suggested for this label.
    #[must_use]
    pub const fn adjustment_pct(self) -> f64 {
        match self {
            Self::High => 15.0,
            Self::Medium => 5.0,
            Self::Low => 0.0,
        }
    }

    /// Adjustment percentage for an arbitrary stored label.
    ///
    /// Labels outside the known set map to 0%.
    #[must_use]
    pub fn adjustment_pct_for(label: &str) -> f64 {
        label.parse::<Self>().map_or(0.0, Self::adjustment_pct)
    }

    /// Position of the label in the classifier's output layer.
    #[must_use]
    pub const fn class_index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Inverse of [`RiskLabel::class_index`].
    #[must_use]
    pub const fn from_class_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            _ => None,
        }
    }
}

/// Suggested premium for a base premium and an adjustment percentage,
/// rounded to cents.
///
/// Rounding works on the exact value of the `f64` result rather than on the
/// result scaled by 100, so `2.675` (stored just below the half) becomes
/// `2.67`.
#[must_use]
pub fn suggested_premium(base_premium: f64, adjustment_pct: f64) -> f64 {
    let premium = base_premium * (1.0 + adjustment_pct / 100.0);
    format!("{premium:.2}").parse().unwrap_or(premium)
}
