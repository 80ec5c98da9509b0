#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::types::{GradeDisplayType, GradeType, TextFormat};

/// A grade item definition as stored by the external gradebook engine.
///
/// Identifies a gradable thing by its `(course, type, module, instance,
/// number)` tuple and carries the bounds and flags the report needs. The
/// course aggregate item uses the `"course"` item type and owns the
/// `needs_update` flag consulted before a report is built.
#[derive(Debug, Clone, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct GradeItem {
    /// Unique id of the item within the gradebook store.
    pub id:            i64,
    /// Course this item belongs to.
    #[builder(default)]
    pub course_id:     i64,
    /// Broad item category, e.g. `"mod"` or `"course"`.
    #[builder(default, setter(into))]
    pub item_type:     String,
    /// Activity module the item belongs to, e.g. `"quiz"`; absent for
    /// non-activity items.
    #[builder(default, setter(strip_option, into))]
    pub item_module:   Option<String>,
    /// Id of the activity instance within its module.
    #[builder(default, setter(strip_option))]
    pub item_instance: Option<i64>,
    /// Ordinal distinguishing multiple items of one activity.
    #[builder(default)]
    pub item_number:   i64,
    /// Display name of the item.
    #[builder(default, setter(into))]
    pub name:          String,
    /// How this item is graded.
    #[builder(default)]
    pub grade_type:    GradeType,
    /// Scale used when `grade_type` is [`GradeType::Scale`].
    #[builder(default, setter(strip_option))]
    pub scale_id:      Option<i64>,
    /// Outcome this item grades, when it is an outcome item.
    #[builder(default, setter(strip_option))]
    pub outcome_id:    Option<i64>,
    /// Lower grade bound.
    #[builder(default = 0.0)]
    pub grade_min:     f64,
    /// Upper grade bound.
    #[builder(default = 100.0)]
    pub grade_max:     f64,
    /// Grade required to pass.
    #[builder(default = 0.0)]
    pub grade_pass:    f64,
    /// Whether the item is locked against further grading.
    #[builder(default)]
    pub locked:        bool,
    /// Whether the item is hidden from students.
    #[builder(default)]
    pub hidden:        bool,
    /// Whether final grades under this item are stale (course item only).
    #[builder(default)]
    pub needs_update:  bool,
    /// Display type override; `None` falls back to the engine default.
    #[builder(default, setter(strip_option))]
    pub display_type:  Option<GradeDisplayType>,
    /// Decimal points override; `None` falls back to the engine default.
    #[builder(default, setter(strip_option))]
    pub decimals:      Option<u8>,
}

/// A named competency graded via a fixed scale.
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
pub struct Outcome {
    /// Unique id of the outcome.
    pub id:       i64,
    /// Competency name shown in reports.
    #[builder(default, setter(into))]
    pub name:     String,
    /// Scale the outcome is graded against.
    #[builder(default)]
    pub scale_id: i64,
}

/// An ordered list of textual grade levels mapped to integer positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    /// Unique id of the scale.
    pub id:    i64,
    /// Display name of the scale.
    pub name:  String,
    /// Scale entries in ascending order; position 1 is the first entry.
    pub items: Vec<String>,
}

impl Scale {
    /// Builds a scale from its entries in ascending order.
    pub fn new(id: i64, name: impl Into<String>, entries: &[&str]) -> Self {
        Self {
            id,
            name: name.into(),
            items: entries.iter().map(|e| (*e).to_string()).collect(),
        }
    }

    /// Looks up the entry for a stored grade value. Stored values are
    /// 1-indexed: value `N` maps to the entry at position `N - 1`.
    pub fn entry(&self, position: i64) -> Option<&str> {
        usize::try_from(position.checked_sub(1)?)
            .ok()
            .and_then(|idx| self.items.get(idx))
            .map(String::as_str)
    }
}

/// A per-user, per-item grade record fetched from the external engine.
///
/// The record does not carry a back-reference to its grade item; operations
/// that depend on the item take it as an explicit parameter instead.
#[derive(Debug, Clone, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct GradeRecord {
    /// Item this record grades.
    #[builder(default)]
    pub item_id:         i64,
    /// User this record grades.
    #[builder(default)]
    pub user_id:         i64,
    /// Final grade value; `None` when the user is ungraded.
    #[builder(default, setter(strip_option))]
    pub final_grade:     Option<f64>,
    /// Whether this individual grade is locked.
    #[builder(default)]
    pub locked:          bool,
    /// Whether this individual grade is hidden.
    #[builder(default)]
    pub hidden:          bool,
    /// Whether the grade was manually overridden.
    #[builder(default)]
    pub overridden:      bool,
    /// Raw feedback text, in the format named by `feedback_format`.
    #[builder(default, setter(strip_option, into))]
    pub feedback:        Option<String>,
    /// Storage format of the feedback text.
    #[builder(default)]
    pub feedback_format: TextFormat,
    /// Id of the user who last modified the grade.
    #[builder(default, setter(strip_option))]
    pub user_modified:   Option<i64>,
    /// Unix timestamp of record creation (submission time).
    #[builder(default, setter(strip_option))]
    pub time_created:    Option<i64>,
    /// Unix timestamp of the last grade change.
    #[builder(default, setter(strip_option))]
    pub time_modified:   Option<i64>,
}

impl GradeRecord {
    /// A grade is locked when either the record or its item is locked.
    pub fn is_locked(&self, item: &GradeItem) -> bool {
        self.locked || item.locked
    }

    /// A grade is hidden when either the record or its item is hidden.
    pub fn is_hidden(&self, item: &GradeItem) -> bool {
        self.hidden || item.hidden
    }

    /// Submission timestamp, taken from record creation time.
    pub fn date_submitted(&self) -> Option<i64> {
        self.time_created
    }

    /// Grading timestamp; only meaningful once a final grade exists.
    pub fn date_graded(&self) -> Option<i64> {
        if self.final_grade.is_some() {
            self.time_modified
        } else {
            None
        }
    }
}

/// Filter tuple used for item fetches and existence probes against the
/// external engine. Absent fields match everything; empty strings are
/// treated as absent, mirroring the upstream query semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Course the items must belong to.
    pub course_id:     i64,
    /// Item type to match, e.g. `"mod"`.
    #[builder(default, setter(strip_option, into))]
    pub item_type:     Option<String>,
    /// Activity module to match, e.g. `"quiz"`.
    #[builder(default, setter(strip_option, into))]
    pub item_module:   Option<String>,
    /// Activity instance to match.
    #[builder(default, setter(strip_option))]
    pub item_instance: Option<i64>,
    /// Exact item-number to match; used by renumbering probes.
    #[builder(default, setter(strip_option))]
    pub item_number:   Option<i64>,
}

impl ItemFilter {
    /// Returns true when `item` satisfies every populated field.
    pub fn matches(&self, item: &GradeItem) -> bool {
        if item.course_id != self.course_id {
            return false;
        }
        let type_ok = self
            .item_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .is_none_or(|t| item.item_type == t);
        let module_ok = self
            .item_module
            .as_deref()
            .filter(|m| !m.is_empty())
            .is_none_or(|m| item.item_module.as_deref() == Some(m));
        let instance_ok = self
            .item_instance
            .is_none_or(|i| item.item_instance == Some(i));
        let number_ok = self.item_number.is_none_or(|n| item.item_number == n);
        type_ok && module_ok && instance_ok && number_ok
    }
}
