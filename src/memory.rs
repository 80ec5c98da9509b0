#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
};

use crate::{
    config::ReportConfig,
    engine::{EngineError, GradebookEngine, RegradeOutcome},
    model::{GradeItem, GradeRecord, ItemFilter, Outcome, Scale},
    types::{GradeDisplayType, GradeType, TextFormat},
    util::{escape_html, nl2br},
};

/// Item type of course aggregate grade items.
const COURSE_ITEM_TYPE: &str = "course";

/// Backing state of a [`MemoryGradebook`].
#[derive(Debug, Default)]
struct Store {
    /// Grade items keyed by id.
    items:            BTreeMap<i64, GradeItem>,
    /// Outcomes keyed by id.
    outcomes:         BTreeMap<i64, Outcome>,
    /// Scales keyed by id.
    scales:           BTreeMap<i64, Scale>,
    /// Grade records keyed by `(item id, user id)`.
    grades:           BTreeMap<(i64, i64), GradeRecord>,
    /// Injected regrade failures: course id to item id to reason.
    regrade_failures: BTreeMap<i64, BTreeMap<i64, String>>,
    /// Courses that have been regraded, in request order.
    regraded_courses: Vec<i64>,
}

/// An in-memory gradebook engine.
///
/// Implements the full [`GradebookEngine`] surface over plain maps, with the
/// gradebook's stock formatting rules (real/percentage/letter display,
/// per-item decimal overrides, scale-aware rendering). Display configuration
/// is injected at construction. Used by the integration tests and by
/// embedders that need a self-contained gradebook.
#[derive(Debug, Default)]
pub struct MemoryGradebook {
    /// Shared mutable store behind this engine handle.
    store:  RefCell<Store>,
    /// Injected display configuration.
    config: ReportConfig,
}

impl MemoryGradebook {
    /// Creates an empty gradebook with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty gradebook with the given configuration.
    pub fn with_config(config: ReportConfig) -> Self {
        Self {
            store: RefCell::new(Store::default()),
            config,
        }
    }

    /// Inserts or replaces a grade item.
    pub fn insert_item(&self, item: GradeItem) {
        self.store.borrow_mut().items.insert(item.id, item);
    }

    /// Inserts the course aggregate item for a course.
    pub fn insert_course_item(&self, item_id: i64, course_id: i64, needs_update: bool) {
        self.insert_item(
            GradeItem::builder()
                .id(item_id)
                .course_id(course_id)
                .item_type(COURSE_ITEM_TYPE)
                .name(format!("Course total {course_id}"))
                .needs_update(needs_update)
                .build(),
        );
    }

    /// Inserts or replaces an outcome.
    pub fn insert_outcome(&self, outcome: Outcome) {
        self.store.borrow_mut().outcomes.insert(outcome.id, outcome);
    }

    /// Inserts or replaces a scale.
    pub fn insert_scale(&self, scale: Scale) {
        self.store.borrow_mut().scales.insert(scale.id, scale);
    }

    /// Records a user's grade against an item.
    pub fn record_grade(&self, record: GradeRecord) {
        self.store
            .borrow_mut()
            .grades
            .insert((record.item_id, record.user_id), record);
    }

    /// Marks an item as failing the next regrade of its course.
    pub fn set_regrade_failure(&self, course_id: i64, item_id: i64, reason: impl Into<String>) {
        self.store
            .borrow_mut()
            .regrade_failures
            .entry(course_id)
            .or_default()
            .insert(item_id, reason.into());
    }

    /// Returns a copy of a stored item, for inspection.
    pub fn item(&self, id: i64) -> Option<GradeItem> {
        self.store.borrow().items.get(&id).cloned()
    }

    /// Returns a copy of a stored grade record, for inspection.
    pub fn grade(&self, item_id: i64, user_id: i64) -> Option<GradeRecord> {
        self.store.borrow().grades.get(&(item_id, user_id)).cloned()
    }

    /// Courses regraded so far, in request order.
    pub fn regraded_courses(&self) -> Vec<i64> {
        self.store.borrow().regraded_courses.clone()
    }

    /// Percentage position of a value within an item's grade range.
    fn percentage(value: f64, item: &GradeItem) -> f64 {
        let range = item.grade_max - item.grade_min;
        if range == 0.0 {
            0.0
        } else {
            (value - item.grade_min) / range * 100.0
        }
    }

    /// Decimal points to use for an item.
    fn decimals(&self, item: &GradeItem) -> usize {
        usize::from(item.decimals.unwrap_or(self.config.decimal_points))
    }

    /// Renders a scale-graded value through the item's scale, falling back
    /// to numeric display when the scale or entry is unknown.
    fn format_scale_value(&self, value: f64, item: &GradeItem) -> Option<String> {
        let store = self.store.borrow();
        let scale = store.scales.get(&item.scale_id?)?;
        let entry = scale.entry(value as i64)?;
        Some(escape_html(entry))
    }
}

impl GradebookEngine for MemoryGradebook {
    fn fetch_course_item(&self, course_id: i64) -> Result<GradeItem, EngineError> {
        self.store
            .borrow()
            .items
            .values()
            .find(|item| item.course_id == course_id && item.item_type == COURSE_ITEM_TYPE)
            .cloned()
            .ok_or(EngineError::CourseItemMissing { course_id })
    }

    fn regrade_final_grades(&self, course_id: i64) -> Result<RegradeOutcome, EngineError> {
        let mut store = self.store.borrow_mut();
        store.regraded_courses.push(course_id);

        // The course item is no longer stale once a regrade ran, even a
        // partially failed one.
        if let Some(course_item) = store
            .items
            .values_mut()
            .find(|item| item.course_id == course_id && item.item_type == COURSE_ITEM_TYPE)
        {
            course_item.needs_update = false;
        }

        match store.regrade_failures.get(&course_id) {
            Some(failures) if !failures.is_empty() => {
                Ok(RegradeOutcome::Failed(failures.clone()))
            }
            _ => Ok(RegradeOutcome::Complete),
        }
    }

    fn fetch_items(&self, filter: &ItemFilter) -> Result<Vec<GradeItem>, EngineError> {
        Ok(self
            .store
            .borrow()
            .items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    fn fetch_item(&self, filter: &ItemFilter) -> Result<Option<GradeItem>, EngineError> {
        Ok(self
            .store
            .borrow()
            .items
            .values()
            .find(|item| filter.matches(item))
            .cloned())
    }

    fn persist_item(&self, item: &GradeItem) -> Result<(), EngineError> {
        let mut store = self.store.borrow_mut();
        if !store.items.contains_key(&item.id) {
            return Err(EngineError::PersistFailed {
                item_id: item.id,
                reason:  "unknown item id".to_string(),
            });
        }
        store.items.insert(item.id, item.clone());
        Ok(())
    }

    fn fetch_outcome(&self, outcome_id: i64) -> Result<Option<Outcome>, EngineError> {
        Ok(self.store.borrow().outcomes.get(&outcome_id).cloned())
    }

    fn fetch_scale(&self, scale_id: i64) -> Result<Option<Scale>, EngineError> {
        Ok(self.store.borrow().scales.get(&scale_id).cloned())
    }

    fn fetch_users_grades(
        &self,
        item: &GradeItem,
        user_ids: &[i64],
        create_if_missing: bool,
    ) -> Result<HashMap<i64, GradeRecord>, EngineError> {
        let mut store = self.store.borrow_mut();
        let mut records = HashMap::with_capacity(user_ids.len());
        for &user_id in user_ids {
            let key = (item.id, user_id);
            match store.grades.get(&key) {
                Some(record) => {
                    records.insert(user_id, record.clone());
                }
                None if create_if_missing => {
                    let record = GradeRecord::builder().item_id(item.id).user_id(user_id).build();
                    store.grades.insert(key, record.clone());
                    records.insert(user_id, record);
                }
                None => {}
            }
        }
        Ok(records)
    }

    fn display_type(&self, item: &GradeItem) -> GradeDisplayType {
        item.display_type.unwrap_or(self.config.default_display)
    }

    fn format_grade_value(&self, value: f64, item: &GradeItem) -> String {
        match self.display_type(item) {
            GradeDisplayType::Real => {
                if item.grade_type == GradeType::Scale {
                    if let Some(entry) = self.format_scale_value(value, item) {
                        return entry;
                    }
                }
                format!("{value:.prec$}", prec = self.decimals(item))
            }
            GradeDisplayType::Percentage => {
                format!(
                    "{pct:.prec$} %",
                    pct = Self::percentage(value, item),
                    prec = self.decimals(item)
                )
            }
            GradeDisplayType::Letter => {
                self.config.letter_for(Self::percentage(value, item)).to_string()
            }
        }
    }

    fn format_rich_text(&self, text: &str, format: TextFormat) -> String {
        match format {
            TextFormat::Native | TextFormat::Html => text.to_string(),
            TextFormat::Plain => nl2br(&escape_html(text)),
            TextFormat::Markdown => escape_html(text),
        }
    }

    fn format_plain_text(&self, text: &str) -> String {
        escape_html(text)
    }
}
