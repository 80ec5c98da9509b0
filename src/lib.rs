#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # gradebook-report
//!
//! Normalizes the state of an external gradebook engine into display-ready
//! course grade reports: grade items, outcomes, and per-user formatted
//! grades. Grade computation, persistence, visibility, and locking rules
//! stay behind the [`GradebookEngine`] trait; this crate only shapes and
//! formats what the engine returns.
//!
//! The usual entry point is [`GradeReportAdapter::get_grades`] with a
//! [`GradeQuery`] describing the course, optional item filters, and the
//! users whose grades should be attached.

/// Injected display configuration (decimals, display type, letters).
pub mod config;
/// The external gradebook engine boundary.
pub mod engine;
/// An in-memory engine implementation for tests and embedders.
pub mod memory;
/// Entities read from the external engine.
pub mod model;
/// Report types and the report-building adapter.
pub mod report;
/// Shared enums and the tri-state grade value.
pub mod types;
/// Text escaping helpers.
pub mod util;

pub use config::ReportConfig;
pub use engine::{EngineError, GradebookEngine, Message, RegradeOutcome};
pub use memory::MemoryGradebook;
pub use model::{GradeItem, GradeRecord, ItemFilter, Outcome, Scale};
pub use report::{
    FormattedGrade, GradeQuery, GradeReportAdapter, Report, ReportItem, ReportOutcome,
};
pub use types::{GradeDisplayType, GradeType, GradeValue, TextFormat};
