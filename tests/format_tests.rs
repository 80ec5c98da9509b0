use gradebook_report::{
    GradeDisplayType, GradeItem, GradeQuery, GradeRecord, GradeReportAdapter, GradeValue,
    MemoryGradebook, ReportConfig, TextFormat,
};
use serde_json::json;

const COURSE: i64 = 40;

fn gradebook_with(config: ReportConfig) -> MemoryGradebook {
    let engine = MemoryGradebook::with_config(config);
    engine.insert_course_item(1, COURSE, false);
    engine
}

fn quiz_item(id: i64) -> GradeItem {
    GradeItem::builder()
        .id(id)
        .course_id(COURSE)
        .item_type("mod")
        .item_module("quiz")
        .item_instance(id)
        .name(format!("Quiz {id}"))
        .build()
}

fn report_for_user(engine: &MemoryGradebook, user_id: i64) -> gradebook_report::Report {
    GradeReportAdapter::new(engine)
        .get_grades(&GradeQuery::for_user(COURSE, user_id))
        .expect("report")
}

#[test]
fn plain_feedback_is_escaped_with_line_breaks() {
    let engine = gradebook_with(ReportConfig::default());
    engine.insert_item(quiz_item(11));
    engine.record_grade(
        GradeRecord::builder()
            .item_id(11)
            .user_id(7)
            .final_grade(85.0)
            .feedback("Good <job>\nwell done")
            .feedback_format(TextFormat::Plain)
            .build(),
    );

    let report = report_for_user(&engine, 7);
    assert_eq!(
        report.items[&11].grades[&7].str_feedback,
        "Good &lt;job&gt;<br />\nwell done"
    );
}

#[test]
fn html_feedback_passes_through() {
    let engine = gradebook_with(ReportConfig::default());
    engine.insert_item(quiz_item(11));
    engine.record_grade(
        GradeRecord::builder()
            .item_id(11)
            .user_id(7)
            .final_grade(85.0)
            .feedback("<p>Good job</p>")
            .feedback_format(TextFormat::Html)
            .build(),
    );

    let report = report_for_user(&engine, 7);
    assert_eq!(report.items[&11].grades[&7].str_feedback, "<p>Good job</p>");
}

#[test]
fn absent_feedback_renders_empty() {
    let engine = gradebook_with(ReportConfig::default());
    engine.insert_item(quiz_item(11));

    let report = report_for_user(&engine, 7);
    let grade = &report.items[&11].grades[&7];
    assert_eq!(grade.feedback, None);
    assert_eq!(grade.str_feedback, "");
}

#[test]
fn grade_values_serialize_to_the_wire_shape() {
    assert_eq!(serde_json::to_value(GradeValue::Missing).expect("json"), json!(null));
    assert_eq!(serde_json::to_value(GradeValue::NeedsRegrade).expect("json"), json!(false));
    assert_eq!(serde_json::to_value(GradeValue::Graded(85.0)).expect("json"), json!(85.0));
}

#[test]
fn report_json_carries_the_false_sentinel() {
    let engine = MemoryGradebook::new();
    engine.insert_course_item(1, COURSE, true);
    engine.insert_item(quiz_item(11));
    engine.set_regrade_failure(COURSE, 11, "circular dependency");

    let report = report_for_user(&engine, 7);
    let json: serde_json::Value =
        serde_json::from_str(&report.to_json().expect("json")).expect("parse");

    assert_eq!(json["items"]["11"]["grades"]["7"]["grade"], json!(false));
}

#[test]
fn letter_display_maps_percentages_to_letters() {
    let config = ReportConfig::builder().default_display(GradeDisplayType::Letter).build();
    let engine = gradebook_with(config);
    engine.insert_item(quiz_item(11));
    engine.record_grade(
        GradeRecord::builder().item_id(11).user_id(7).final_grade(85.0).build(),
    );

    let report = report_for_user(&engine, 7);
    let grade = &report.items[&11].grades[&7];
    assert_eq!(grade.str_grade, "B");
    // letter display is not "real numeric", so the long form collapses
    assert_eq!(grade.str_long_grade, "B");
}

#[test]
fn per_item_decimal_override_wins() {
    let engine = gradebook_with(ReportConfig::default());
    let mut item = quiz_item(11);
    item.decimals = Some(0);
    engine.insert_item(item);
    engine.record_grade(
        GradeRecord::builder().item_id(11).user_id(7).final_grade(85.0).build(),
    );

    let report = report_for_user(&engine, 7);
    assert_eq!(report.items[&11].grades[&7].str_grade, "85");
    assert_eq!(report.items[&11].grades[&7].str_long_grade, "85/100");
}

#[test]
fn date_graded_requires_a_final_grade() {
    let ungraded = GradeRecord::builder().time_created(100).time_modified(200).build();
    assert_eq!(ungraded.date_submitted(), Some(100));
    assert_eq!(ungraded.date_graded(), None);

    let graded = GradeRecord::builder()
        .final_grade(85.0)
        .time_created(100)
        .time_modified(200)
        .build();
    assert_eq!(graded.date_graded(), Some(200));
}

#[test]
fn lock_and_hide_flags_combine_record_and_item() {
    let engine = gradebook_with(ReportConfig::default());
    let mut item = quiz_item(11);
    item.locked = true;
    engine.insert_item(item);
    engine.record_grade(
        GradeRecord::builder().item_id(11).user_id(7).final_grade(85.0).hidden(true).build(),
    );

    let report = report_for_user(&engine, 7);
    let grade = &report.items[&11].grades[&7];
    assert!(grade.locked, "item lock propagates to the grade");
    assert!(grade.hidden, "record hide flag survives");
    assert!(!grade.overridden);
}

#[test]
fn pass_through_metadata_survives_formatting() {
    let engine = gradebook_with(ReportConfig::default());
    engine.insert_item(quiz_item(11));
    engine.record_grade(
        GradeRecord::builder()
            .item_id(11)
            .user_id(7)
            .final_grade(85.0)
            .overridden(true)
            .user_modified(3)
            .time_created(100)
            .time_modified(200)
            .build(),
    );

    let report = report_for_user(&engine, 7);
    let grade = &report.items[&11].grades[&7];
    assert!(grade.overridden);
    assert_eq!(grade.grade.as_f64(), Some(85.0));
    assert_eq!(grade.user_modified, Some(3));
    assert_eq!(grade.date_submitted, Some(100));
    assert_eq!(grade.date_graded, Some(200));
}
