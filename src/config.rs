#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::types::GradeDisplayType;

/// Report-wide display configuration, injected into the engine at
/// construction instead of being read from global state.
#[derive(Debug, Clone, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Decimal points used for numeric display when an item carries no
    /// override.
    #[builder(default = 2)]
    pub decimal_points:  u8,
    /// Display type used when an item carries no override.
    #[builder(default)]
    pub default_display: GradeDisplayType,
    /// Letter boundaries as `(minimum percentage, letter)` pairs, highest
    /// boundary first.
    #[builder(default = ReportConfig::default_letters())]
    pub letters:         Vec<(f64, String)>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            decimal_points:  2,
            default_display: GradeDisplayType::Real,
            letters:         Self::default_letters(),
        }
    }
}

impl ReportConfig {
    /// The stock letter boundaries shipped by the gradebook.
    pub fn default_letters() -> Vec<(f64, String)> {
        [
            (93.0, "A"),
            (90.0, "A-"),
            (87.0, "B+"),
            (83.0, "B"),
            (80.0, "B-"),
            (77.0, "C+"),
            (73.0, "C"),
            (70.0, "C-"),
            (67.0, "D+"),
            (60.0, "D"),
            (0.0, "F"),
        ]
        .into_iter()
        .map(|(min, letter)| (min, letter.to_string()))
        .collect()
    }

    /// Maps a percentage onto the first letter whose boundary it meets.
    pub fn letter_for(&self, percentage: f64) -> &str {
        self.letters
            .iter()
            .find(|(min, _)| percentage >= *min)
            .map(|(_, letter)| letter.as_str())
            .unwrap_or("-")
    }
}
