#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use serde::{Deserialize, Serialize, Serializer};

/// How a grade item is graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeType {
    /// The item carries no grade at all.
    None,
    /// A numeric grade between the item's min and max bounds.
    #[default]
    Value,
    /// A position on an ordered scale.
    Scale,
    /// Free-text feedback only; bounds and scales are meaningless.
    Text,
}

/// How a numeric grade value is rendered for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeDisplayType {
    /// The raw value, formatted to the configured number of decimals.
    #[default]
    Real,
    /// The value as a percentage of the item's grade range.
    Percentage,
    /// The value mapped onto the configured letter boundaries.
    Letter,
}

/// Storage format of a feedback text, dictating how it is rendered to HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    /// Gradebook-native format; already safe to emit as-is.
    #[default]
    Native,
    /// Trusted HTML, emitted unchanged.
    Html,
    /// Plain text; escaped, with newlines turned into `<br />`.
    Plain,
    /// Markdown source; escaped before display.
    Markdown,
}

/// A per-user grade value in its report form.
///
/// The upstream wire shape is `null` for ungraded, the boolean `false`
/// sentinel for items whose regrade failed, and a number otherwise; the
/// `Serialize` impl reproduces exactly that.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GradeValue {
    /// No grade has been recorded (serializes as `null`).
    #[default]
    Missing,
    /// The item needs a regrade that failed (serializes as `false`).
    NeedsRegrade,
    /// A concrete grade value.
    Graded(f64),
}

impl GradeValue {
    /// Returns the numeric value, if one is present.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GradeValue::Graded(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns true when a concrete value is present.
    pub fn is_graded(&self) -> bool {
        matches!(self, GradeValue::Graded(_))
    }
}

impl Serialize for GradeValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            GradeValue::Missing => serializer.serialize_none(),
            GradeValue::NeedsRegrade => serializer.serialize_bool(false),
            GradeValue::Graded(value) => serializer.serialize_f64(*value),
        }
    }
}
