#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, object::Rows},
};
use typed_builder::TypedBuilder;

use crate::{
    engine::{EngineError, GradebookEngine, Message, RegradeOutcome},
    model::{GradeItem, GradeRecord, ItemFilter, Outcome},
    types::{GradeDisplayType, GradeType, GradeValue, TextFormat},
};

/// Placeholder shown where no grade can be displayed.
const UNGRADED_DISPLAY: &str = "-";

/// A query for one course's grade report.
///
/// The optional item fields narrow which grade items are fetched; `users`
/// selects whose grades are attached. An empty `users` list returns item and
/// outcome metadata only.
#[derive(Debug, Clone, Default, PartialEq, TypedBuilder, Serialize)]
pub struct GradeQuery {
    /// Course whose grade tree is queried.
    pub course_id:     i64,
    /// Restrict to one item type, e.g. `"mod"`. Manual, course, and category
    /// items are not excluded here; callers filter them out.
    #[builder(default, setter(strip_option, into))]
    pub item_type:     Option<String>,
    /// Restrict to one activity module, e.g. `"quiz"`.
    #[builder(default, setter(strip_option, into))]
    pub item_module:   Option<String>,
    /// Restrict to one activity instance.
    #[builder(default, setter(strip_option))]
    pub item_instance: Option<i64>,
    /// Users whose grades to fetch; order-insensitive, not deduplicated.
    #[builder(default, setter(into))]
    pub users:         Vec<i64>,
}

impl GradeQuery {
    /// A metadata-only query over every item of a course.
    pub fn for_course(course_id: i64) -> Self {
        Self::builder().course_id(course_id).build()
    }

    /// A whole-course query for a single user's grades.
    pub fn for_user(course_id: i64, user_id: i64) -> Self {
        Self::builder().course_id(course_id).users(vec![user_id]).build()
    }

    /// The engine filter tuple equivalent of this query.
    pub(crate) fn filter(&self) -> ItemFilter {
        ItemFilter {
            course_id:     self.course_id,
            item_type:     self.item_type.clone(),
            item_module:   self.item_module.clone(),
            item_instance: self.item_instance,
            item_number:   None,
        }
    }
}

/// A single user's grade against one item, in display-ready form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedGrade {
    /// The grade value, or the ungraded/needs-regrade markers.
    pub grade:           GradeValue,
    /// Whether the grade or its item is locked.
    pub locked:          bool,
    /// Whether the grade or its item is hidden.
    pub hidden:          bool,
    /// Whether the grade was manually overridden.
    pub overridden:      bool,
    /// Raw feedback text as stored.
    pub feedback:        Option<String>,
    /// Storage format of the feedback text.
    pub feedback_format: TextFormat,
    /// Id of the user who last modified the grade.
    pub user_modified:   Option<i64>,
    /// Submission timestamp.
    pub date_submitted:  Option<i64>,
    /// Grading timestamp.
    pub date_graded:     Option<i64>,
    /// Short display string for the grade.
    pub str_grade:       String,
    /// Long display string; `grade/max` where that applies, otherwise the
    /// short form.
    pub str_long_grade:  String,
    /// Feedback rendered to safe HTML; empty when there is none.
    pub str_feedback:    String,
}

impl FormattedGrade {
    /// Carries a record's pass-through fields into a formatted grade, with
    /// the display strings still to be filled in.
    fn from_record(record: &GradeRecord, item: &GradeItem) -> Self {
        Self {
            grade:           match record.final_grade {
                Some(value) => GradeValue::Graded(value),
                None => GradeValue::Missing,
            },
            locked:          record.is_locked(item),
            hidden:          record.is_hidden(item),
            overridden:      record.overridden,
            feedback:        record.feedback.clone(),
            feedback_format: record.feedback_format,
            user_modified:   record.user_modified,
            date_submitted:  record.date_submitted(),
            date_graded:     record.date_graded(),
            str_grade:       String::new(),
            str_long_grade:  String::new(),
            str_feedback:    String::new(),
        }
    }
}

/// A normalized plain (non-outcome) grade item in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportItem {
    /// Grade item id.
    pub id:            i64,
    /// Item-number within the owning activity.
    pub item_number:   i64,
    /// Broad item category, e.g. `"mod"`.
    pub item_type:     String,
    /// Activity module, when the item belongs to one.
    pub item_module:   Option<String>,
    /// Activity instance, when the item belongs to one.
    pub item_instance: Option<i64>,
    /// Scale id; cleared for value- and text-graded items.
    pub scale_id:      Option<i64>,
    /// Display name.
    pub name:          String,
    /// Lower grade bound; zeroed for text items.
    pub grade_min:     f64,
    /// Upper grade bound; zeroed for text items.
    pub grade_max:     f64,
    /// Pass grade; zeroed for text items.
    pub grade_pass:    f64,
    /// Whether the item is locked.
    pub locked:        bool,
    /// Whether the item is hidden.
    pub hidden:        bool,
    /// Per-user formatted grades, keyed by user id.
    pub grades:        BTreeMap<i64, FormattedGrade>,
}

/// A normalized outcome item in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportOutcome {
    /// Grade item id of the outcome item.
    pub id:            i64,
    /// Item-number, unique among this report's outcomes after
    /// deduplication.
    pub item_number:   i64,
    /// Broad item category.
    pub item_type:     String,
    /// Activity module, when the item belongs to one.
    pub item_module:   Option<String>,
    /// Activity instance, when the item belongs to one.
    pub item_instance: Option<i64>,
    /// Scale of the outcome.
    pub scale_id:      i64,
    /// Name of the outcome, not of the grade item.
    pub name:          String,
    /// Whether the item is locked.
    pub locked:        bool,
    /// Whether the item is hidden.
    pub hidden:        bool,
    /// Per-user formatted grades, keyed by user id.
    pub grades:        BTreeMap<i64, FormattedGrade>,
}

/// A course grade report: plain items keyed by grade-item id and outcome
/// items keyed by their (deduplicated) item-number. Both maps iterate in
/// ascending key order by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// Non-outcome grade items, keyed by grade-item id.
    pub items:    BTreeMap<i64, ReportItem>,
    /// Outcome items, keyed by item-number.
    pub outcomes: BTreeMap<i64, ReportOutcome>,
}

/// One row of the human-readable report overview.
#[derive(Tabled)]
struct OverviewRow {
    /// Whether the row is a plain item or an outcome.
    #[tabled(rename = "Kind")]
    kind:   &'static str,
    /// Grade item id.
    #[tabled(rename = "Id")]
    id:     i64,
    /// Item-number.
    #[tabled(rename = "No.")]
    number: i64,
    /// Display name.
    #[tabled(rename = "Name")]
    name:   String,
    /// Grade range, or `-` where bounds are meaningless.
    #[tabled(rename = "Range")]
    range:  String,
    /// How many of the requested users have a concrete grade.
    #[tabled(rename = "Graded")]
    graded: usize,
}

impl Report {
    /// True when the report holds neither items nor outcomes.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.outcomes.is_empty()
    }

    /// Serializes the report to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Could not serialize the grade report")
    }

    /// Renders a human-readable overview table of the report.
    pub fn overview(&self) -> String {
        let rows = self
            .items
            .values()
            .map(|item| OverviewRow {
                kind:   "item",
                id:     item.id,
                number: item.item_number,
                name:   item.name.clone(),
                range:  format!("{:.2}-{:.2}", item.grade_min, item.grade_max),
                graded: item.grades.values().filter(|g| g.grade.is_graded()).count(),
            })
            .chain(self.outcomes.values().map(|outcome| OverviewRow {
                kind:   "outcome",
                id:     outcome.id,
                number: outcome.item_number,
                name:   outcome.name.clone(),
                range:  UNGRADED_DISPLAY.to_string(),
                graded: outcome.grades.values().filter(|g| g.grade.is_graded()).count(),
            }))
            .collect_vec();

        Table::new(rows)
            .with(Panel::header("Grade Report Overview"))
            .with(Panel::footer(format!(
                "Total: {} items, {} outcomes",
                self.items.len(),
                self.outcomes.len()
            )))
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .with(Style::modern())
            .to_string()
    }
}

/// Builds normalized grade reports over an external gradebook engine.
///
/// The adapter is request-scoped and synchronous: every engine call is a
/// blocking round-trip, and nothing is cached between calls. The item-number
/// renumbering step is a read-check-then-write against shared state, so
/// concurrent reports over the same course can race on the numbers they
/// allocate.
pub struct GradeReportAdapter<'a, E: GradebookEngine> {
    /// Handle onto the external gradebook engine.
    engine: &'a E,
}

impl<'a, E: GradebookEngine> GradeReportAdapter<'a, E> {
    /// Creates an adapter over the given engine handle.
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Builds the grade report for one course.
    ///
    /// Ensures final grades are current (requesting a regrade when the
    /// course item is flagged stale), fetches the matching grade items,
    /// splits them into plain items and outcomes, attaches formatted
    /// per-user grades when users were requested, and deduplicates outcome
    /// item-numbers. Items whose regrade failed degrade to an error display
    /// instead of failing the call; an unresolvable outcome reference is
    /// logged and skipped. Any other engine failure propagates.
    pub fn get_grades(&self, query: &GradeQuery) -> Result<Report> {
        let course_item = self
            .engine
            .fetch_course_item(query.course_id)
            .with_context(|| {
                format!("Could not fetch the course grade item for course {}", query.course_id)
            })?;

        let mut needs_update = HashSet::new();
        if course_item.needs_update {
            if let RegradeOutcome::Failed(failures) =
                self.engine.regrade_final_grades(query.course_id)?
            {
                tracing::debug!(
                    course = query.course_id,
                    items = %failures.keys().join(", "),
                    "regrade left stale items"
                );
                needs_update.extend(failures.keys().copied());
            }
        }

        let mut report = Report::default();
        for grade_item in self.engine.fetch_items(&query.filter())? {
            match grade_item.outcome_id {
                None => {
                    let item = self.build_item(&grade_item, query, &needs_update)?;
                    report.items.insert(item.id, item);
                }
                Some(outcome_id) => {
                    let Some(mut outcome) =
                        self.build_outcome(&grade_item, outcome_id, query, &needs_update)?
                    else {
                        continue;
                    };
                    if report.outcomes.contains_key(&outcome.item_number) {
                        let number = self.free_item_number(&grade_item, query)?;
                        let mut renumbered = grade_item.clone();
                        renumbered.item_number = number;
                        self.engine.persist_item(&renumbered)?;
                        outcome.item_number = number;
                    }
                    report.outcomes.insert(outcome.item_number, outcome);
                }
            }
        }

        Ok(report)
    }

    /// Builds the report entry for a plain grade item, normalizing the
    /// fields that are meaningless for its grade type.
    fn build_item(
        &self,
        grade_item: &GradeItem,
        query: &GradeQuery,
        needs_update: &HashSet<i64>,
    ) -> Result<ReportItem> {
        let mut item = ReportItem {
            id:            grade_item.id,
            item_number:   grade_item.item_number,
            item_type:     grade_item.item_type.clone(),
            item_module:   grade_item.item_module.clone(),
            item_instance: grade_item.item_instance,
            scale_id:      grade_item.scale_id,
            name:          grade_item.name.clone(),
            grade_min:     grade_item.grade_min,
            grade_max:     grade_item.grade_max,
            grade_pass:    grade_item.grade_pass,
            locked:        grade_item.locked,
            hidden:        grade_item.hidden,
            grades:        BTreeMap::new(),
        };
        match grade_item.grade_type {
            GradeType::None | GradeType::Scale => {}
            GradeType::Value => item.scale_id = None,
            GradeType::Text => {
                item.scale_id = None;
                item.grade_min = 0.0;
                item.grade_max = 0.0;
                item.grade_pass = 0.0;
            }
        }

        for (user_id, record) in self.requested_records(grade_item, query)? {
            item.grades
                .insert(user_id, self.format_item_grade(grade_item, &record, needs_update));
        }
        Ok(item)
    }

    /// Builds the report entry for an outcome item, or `None` when the
    /// outcome reference cannot be resolved.
    fn build_outcome(
        &self,
        grade_item: &GradeItem,
        outcome_id: i64,
        query: &GradeQuery,
        needs_update: &HashSet<i64>,
    ) -> Result<Option<ReportOutcome>> {
        let Some(outcome) = self.engine.fetch_outcome(outcome_id)? else {
            tracing::warn!(
                item = grade_item.id,
                outcome = outcome_id,
                "grade item references a missing outcome, skipping"
            );
            return Ok(None);
        };

        let mut report_outcome = ReportOutcome {
            id:            grade_item.id,
            item_number:   grade_item.item_number,
            item_type:     grade_item.item_type.clone(),
            item_module:   grade_item.item_module.clone(),
            item_instance: grade_item.item_instance,
            scale_id:      outcome.scale_id,
            name:          outcome.name.clone(),
            locked:        grade_item.locked,
            hidden:        grade_item.hidden,
            grades:        BTreeMap::new(),
        };

        for (user_id, record) in self.requested_records(grade_item, query)? {
            let formatted =
                self.format_outcome_grade(grade_item, &outcome, &record, needs_update)?;
            report_outcome.grades.insert(user_id, formatted);
        }
        Ok(Some(report_outcome))
    }

    /// Fetches (or creates) the grade records of the requested users for one
    /// item, in the order they were requested. Empty when no users were.
    fn requested_records(
        &self,
        grade_item: &GradeItem,
        query: &GradeQuery,
    ) -> Result<Vec<(i64, GradeRecord)>> {
        if query.users.is_empty() {
            return Ok(Vec::new());
        }
        let records = self.engine.fetch_users_grades(grade_item, &query.users, true)?;
        query
            .users
            .iter()
            .map(|&user_id| {
                // duplicates in the request resolve to the same record
                let record = records.get(&user_id).cloned().ok_or(
                    EngineError::GradeRecordMissing {
                        user_id,
                        item_id: grade_item.id,
                    },
                )?;
                Ok((user_id, record))
            })
            .collect()
    }

    /// Formats one user's grade against a plain item.
    fn format_item_grade(
        &self,
        grade_item: &GradeItem,
        record: &GradeRecord,
        needs_update: &HashSet<i64>,
    ) -> FormattedGrade {
        let mut grade = FormattedGrade::from_record(record, grade_item);

        if matches!(grade_item.grade_type, GradeType::Text | GradeType::None) {
            grade.grade = GradeValue::Missing;
            grade.str_grade = UNGRADED_DISPLAY.to_string();
            grade.str_long_grade = grade.str_grade.clone();
        } else if needs_update.contains(&grade_item.id) {
            grade.grade = GradeValue::NeedsRegrade;
            grade.str_grade = self.engine.localized(&Message::Error);
            grade.str_long_grade = grade.str_grade.clone();
        } else {
            match record.final_grade {
                None => {
                    grade.str_grade = UNGRADED_DISPLAY.to_string();
                    grade.str_long_grade = grade.str_grade.clone();
                }
                Some(value) => {
                    grade.str_grade = self.engine.format_grade_value(value, grade_item);
                    let scale_graded = grade_item.grade_type == GradeType::Scale;
                    if scale_graded
                        || self.engine.display_type(grade_item) != GradeDisplayType::Real
                    {
                        grade.str_long_grade = grade.str_grade.clone();
                    } else {
                        let max =
                            self.engine.format_grade_value(grade_item.grade_max, grade_item);
                        grade.str_long_grade = self.engine.localized(&Message::GradeLong {
                            grade: &grade.str_grade,
                            max:   &max,
                        });
                    }
                }
            }
        }

        grade.str_feedback = self.render_feedback(record);
        grade
    }

    /// Formats one user's grade against an outcome item. Outcome values are
    /// positions on the outcome's scale; a null value means the outcome has
    /// not been set and reports as position zero.
    fn format_outcome_grade(
        &self,
        grade_item: &GradeItem,
        outcome: &Outcome,
        record: &GradeRecord,
        needs_update: &HashSet<i64>,
    ) -> Result<FormattedGrade> {
        let mut grade = FormattedGrade::from_record(record, grade_item);

        if needs_update.contains(&grade_item.id) {
            grade.grade = GradeValue::NeedsRegrade;
            grade.str_grade = self.engine.localized(&Message::Error);
        } else {
            match record.final_grade {
                None => {
                    grade.grade = GradeValue::Graded(0.0);
                    grade.str_grade = self.engine.localized(&Message::NoOutcome);
                }
                Some(value) => {
                    let position = value as i64;
                    grade.grade = GradeValue::Graded(position as f64);
                    let scale = self.engine.fetch_scale(outcome.scale_id)?.ok_or_else(|| {
                        anyhow!(
                            "outcome {} references missing scale {}",
                            outcome.id,
                            outcome.scale_id
                        )
                    })?;
                    grade.str_grade =
                        self.engine.format_plain_text(scale.entry(position).unwrap_or_default());
                }
            }
        }
        grade.str_long_grade = grade.str_grade.clone();

        grade.str_feedback = self.render_feedback(record);
        Ok(grade)
    }

    /// Renders stored feedback to HTML; absent feedback renders empty.
    fn render_feedback(&self, record: &GradeRecord) -> String {
        match record.feedback.as_deref() {
            None => String::new(),
            Some(text) => self.engine.format_rich_text(text, record.feedback_format),
        }
    }

    /// Finds the first item-number above the item's own that no stored item
    /// occupies, probing with the caller's filter tuple the way the upstream
    /// query does. Read-check-then-write: not atomic against concurrent
    /// reports.
    fn free_item_number(&self, grade_item: &GradeItem, query: &GradeQuery) -> Result<i64> {
        let mut probe = query.filter();
        let mut candidate = grade_item.item_number + 1;
        loop {
            probe.item_number = Some(candidate);
            if self.engine.fetch_item(&probe)?.is_none() {
                return Ok(candidate);
            }
            candidate += 1;
        }
    }
}
