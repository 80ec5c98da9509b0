#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::{BTreeMap, HashMap};

use crate::{
    model::{GradeItem, GradeRecord, ItemFilter, Outcome, Scale},
    types::{GradeDisplayType, TextFormat},
};

/// Result of a course-wide regrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegradeOutcome {
    /// Every final grade was recomputed.
    Complete,
    /// Recomputation failed for the listed items, keyed by item id with the
    /// engine's failure reason as the value.
    Failed(BTreeMap<i64, String>),
}

/// Localized display strings the report requests from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<'a> {
    /// Shown in place of a grade whose recomputation failed.
    Error,
    /// Shown when a user has no outcome set yet.
    NoOutcome,
    /// Long-form composite of a grade and the item maximum.
    GradeLong {
        /// The already-formatted grade value.
        grade: &'a str,
        /// The already-formatted item maximum.
        max:   &'a str,
    },
}

impl Message<'_> {
    /// Built-in English rendering, used by engines without a language pack.
    pub fn default_text(&self) -> String {
        match self {
            Message::Error => "error".to_string(),
            Message::NoOutcome => "No outcome".to_string(),
            Message::GradeLong { grade, max } => format!("{grade}/{max}"),
        }
    }
}

/// An enum to represent possible errors raised by a gradebook engine.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The course has no aggregate grade item to consult for staleness.
    #[error("course {course_id} has no course grade item")]
    CourseItemMissing {
        /// The course that was queried.
        course_id: i64,
    },
    /// A write against the gradebook store was rejected.
    #[error("could not persist grade item {item_id}: {reason}")]
    PersistFailed {
        /// The item the write targeted.
        item_id: i64,
        /// The engine's stated reason.
        reason:  String,
    },
    /// The engine did not return a grade record it was asked to create.
    #[error("no grade record for user {user_id} on item {item_id}")]
    GradeRecordMissing {
        /// The user whose record was requested.
        user_id: i64,
        /// The item the record belongs to.
        item_id: i64,
    },
    /// Unknown error.
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

/// The external gradebook engine this crate reports over.
///
/// Grade computation, persistence, visibility rules, and locking all live
/// behind this trait; the report adapter only reads, formats, and performs
/// the single item-number rewrite described on [`persist_item`].
///
/// Every method takes `&self`: implementations model a handle onto a shared
/// store and use interior mutability for the mutating operations.
///
/// [`persist_item`]: GradebookEngine::persist_item
pub trait GradebookEngine {
    /// Fetches the course aggregate grade item, whose `needs_update` flag
    /// signals that final grades are stale.
    fn fetch_course_item(&self, course_id: i64) -> Result<GradeItem, EngineError>;

    /// Recomputes final grades for a whole course.
    fn regrade_final_grades(&self, course_id: i64) -> Result<RegradeOutcome, EngineError>;

    /// Fetches every grade item matching the filter.
    fn fetch_items(&self, filter: &ItemFilter) -> Result<Vec<GradeItem>, EngineError>;

    /// Existence probe: fetches a single item matching the filter, which may
    /// include an exact item-number.
    fn fetch_item(&self, filter: &ItemFilter) -> Result<Option<GradeItem>, EngineError>;

    /// Writes an item's updated fields back to the store. Only used to
    /// persist item-number renumbering.
    fn persist_item(&self, item: &GradeItem) -> Result<(), EngineError>;

    /// Resolves an outcome by id.
    fn fetch_outcome(&self, outcome_id: i64) -> Result<Option<Outcome>, EngineError>;

    /// Resolves a scale by id.
    fn fetch_scale(&self, scale_id: i64) -> Result<Option<Scale>, EngineError>;

    /// Fetches the grade records of the given users against one item. With
    /// `create_if_missing`, the engine inserts an empty record for every
    /// requested user that has none and returns it alongside the rest.
    fn fetch_users_grades(
        &self,
        item: &GradeItem,
        user_ids: &[i64],
        create_if_missing: bool,
    ) -> Result<HashMap<i64, GradeRecord>, EngineError>;

    /// Resolved display type for an item, falling back to the engine-wide
    /// default when the item carries no override.
    fn display_type(&self, item: &GradeItem) -> GradeDisplayType {
        item.display_type.unwrap_or_default()
    }

    /// Renders a numeric grade value for display according to the item's
    /// display type and decimal settings.
    fn format_grade_value(&self, value: f64, item: &GradeItem) -> String;

    /// Renders stored feedback text to safe HTML according to its format.
    fn format_rich_text(&self, text: &str, format: TextFormat) -> String;

    /// Escapes a plain string (scale entries, names) for safe display.
    fn format_plain_text(&self, text: &str) -> String;

    /// Localized display string; defaults to the built-in English texts.
    fn localized(&self, message: &Message<'_>) -> String {
        message.default_text()
    }
}
