use gradebook_report::{
    GradeDisplayType, GradeItem, GradeQuery, GradeRecord, GradeReportAdapter, GradeType,
    GradeValue, MemoryGradebook, Scale,
};

const COURSE: i64 = 40;

fn gradebook() -> MemoryGradebook {
    let engine = MemoryGradebook::new();
    engine.insert_course_item(1, COURSE, false);
    engine
}

fn quiz_item(id: i64, instance: i64) -> GradeItem {
    GradeItem::builder()
        .id(id)
        .course_id(COURSE)
        .item_type("mod")
        .item_module("quiz")
        .item_instance(instance)
        .name(format!("Quiz {instance}"))
        .build()
}

fn graded(item_id: i64, user_id: i64, value: f64) -> GradeRecord {
    GradeRecord::builder()
        .item_id(item_id)
        .user_id(user_id)
        .final_grade(value)
        .build()
}

#[test]
fn value_item_formats_short_and_long_grade() {
    let engine = gradebook();
    engine.insert_item(quiz_item(11, 5));
    engine.record_grade(graded(11, 7, 85.0));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter
        .get_grades(&GradeQuery::builder().course_id(COURSE).item_type("mod").users(vec![7]).build())
        .expect("report");

    let grade = &report.items[&11].grades[&7];
    assert_eq!(grade.grade, GradeValue::Graded(85.0));
    assert_eq!(grade.str_grade, "85.00");
    assert_eq!(grade.str_long_grade, "85.00/100.00");
}

#[test]
fn metadata_only_query_attaches_no_grades() {
    let engine = gradebook();
    engine.insert_item(quiz_item(11, 5));
    engine.record_grade(graded(11, 7, 85.0));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter
        .get_grades(&GradeQuery::builder().course_id(COURSE).item_type("mod").build())
        .expect("report");

    assert_eq!(report.items.len(), 1);
    assert!(report.items[&11].grades.is_empty());
}

#[test]
fn text_item_zeroes_bounds_and_displays_dash() {
    let engine = gradebook();
    let mut item = quiz_item(11, 5);
    item.grade_type = GradeType::Text;
    item.scale_id = Some(3);
    item.grade_pass = 50.0;
    engine.insert_item(item);
    engine.record_grade(graded(11, 7, 55.0));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter.get_grades(&GradeQuery::for_user(COURSE, 7)).expect("report");

    let item = &report.items[&11];
    assert_eq!(item.scale_id, None);
    assert_eq!(item.grade_min, 0.0);
    assert_eq!(item.grade_max, 0.0);
    assert_eq!(item.grade_pass, 0.0);
    let grade = &item.grades[&7];
    assert_eq!(grade.grade, GradeValue::Missing);
    assert_eq!(grade.str_grade, "-");
    assert_eq!(grade.str_long_grade, "-");
}

#[test]
fn none_item_displays_dash_but_keeps_bounds() {
    let engine = gradebook();
    let mut item = quiz_item(11, 5);
    item.grade_type = GradeType::None;
    item.grade_max = 20.0;
    engine.insert_item(item);
    engine.record_grade(graded(11, 7, 12.0));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter.get_grades(&GradeQuery::for_user(COURSE, 7)).expect("report");

    let item = &report.items[&11];
    assert_eq!(item.grade_max, 20.0);
    assert_eq!(item.grades[&7].grade, GradeValue::Missing);
    assert_eq!(item.grades[&7].str_grade, "-");
}

#[test]
fn ungraded_user_displays_dash_and_gets_a_record() {
    let engine = gradebook();
    engine.insert_item(quiz_item(11, 5));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter.get_grades(&GradeQuery::for_user(COURSE, 7)).expect("report");

    let grade = &report.items[&11].grades[&7];
    assert_eq!(grade.grade, GradeValue::Missing);
    assert_eq!(grade.str_grade, "-");
    // fetch-or-create semantics: the engine now stores an empty record
    assert!(engine.grade(11, 7).is_some());
}

#[test]
fn module_filter_narrows_fetched_items() {
    let engine = gradebook();
    engine.insert_item(quiz_item(11, 5));
    let mut forum = quiz_item(12, 9);
    forum.item_module = Some("forum".to_string());
    forum.name = "Forum 9".to_string();
    engine.insert_item(forum);

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter
        .get_grades(&GradeQuery::builder().course_id(COURSE).item_module("quiz").build())
        .expect("report");

    assert!(report.items.contains_key(&11));
    assert!(!report.items.contains_key(&12));
}

#[test]
fn instance_filter_narrows_to_one_activity() {
    let engine = gradebook();
    engine.insert_item(quiz_item(11, 5));
    engine.insert_item(quiz_item(12, 6));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter
        .get_grades(
            &GradeQuery::builder()
                .course_id(COURSE)
                .item_module("quiz")
                .item_instance(6)
                .build(),
        )
        .expect("report");

    assert_eq!(report.items.keys().copied().collect::<Vec<_>>(), vec![12]);
}

#[test]
fn empty_course_returns_empty_report() {
    let engine = gradebook();

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter
        .get_grades(&GradeQuery::builder().course_id(COURSE).item_type("mod").build())
        .expect("report");

    assert!(report.is_empty());
}

#[test]
fn item_keys_ascend_regardless_of_insert_order() {
    let engine = gradebook();
    engine.insert_item(quiz_item(30, 1));
    engine.insert_item(quiz_item(11, 2));
    engine.insert_item(quiz_item(23, 3));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter
        .get_grades(&GradeQuery::builder().course_id(COURSE).item_type("mod").build())
        .expect("report");

    let keys: Vec<i64> = report.items.keys().copied().collect();
    assert_eq!(keys, vec![11, 23, 30]);
}

#[test]
fn scale_item_long_grade_equals_short() {
    let engine = gradebook();
    engine.insert_scale(Scale::new(3, "Pass or fail", &["Fail", "Pass"]));
    let mut item = quiz_item(11, 5);
    item.grade_type = GradeType::Scale;
    item.scale_id = Some(3);
    item.grade_min = 1.0;
    item.grade_max = 2.0;
    engine.insert_item(item);
    engine.record_grade(graded(11, 7, 2.0));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter.get_grades(&GradeQuery::for_user(COURSE, 7)).expect("report");

    let grade = &report.items[&11].grades[&7];
    assert_eq!(grade.str_grade, "Pass");
    assert_eq!(grade.str_long_grade, "Pass");
    // scale id survives on scale-graded items
    assert_eq!(report.items[&11].scale_id, Some(3));
}

#[test]
fn non_real_display_long_grade_equals_short() {
    let engine = gradebook();
    let mut item = quiz_item(11, 5);
    item.display_type = Some(GradeDisplayType::Percentage);
    engine.insert_item(item);
    engine.record_grade(graded(11, 7, 85.0));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter.get_grades(&GradeQuery::for_user(COURSE, 7)).expect("report");

    let grade = &report.items[&11].grades[&7];
    assert_eq!(grade.str_grade, "85.00 %");
    assert_eq!(grade.str_long_grade, "85.00 %");
}

#[test]
fn multiple_users_each_get_a_formatted_grade() {
    let engine = gradebook();
    engine.insert_item(quiz_item(11, 5));
    engine.record_grade(graded(11, 7, 85.0));
    engine.record_grade(graded(11, 8, 42.5));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter
        .get_grades(
            &GradeQuery::builder()
                .course_id(COURSE)
                .item_type("mod")
                .users(vec![8, 7])
                .build(),
        )
        .expect("report");

    let grades = &report.items[&11].grades;
    assert_eq!(grades.len(), 2);
    assert_eq!(grades[&7].str_grade, "85.00");
    assert_eq!(grades[&8].str_grade, "42.50");
}

#[test]
fn overview_lists_items_and_outcomes() {
    let engine = gradebook();
    engine.insert_item(quiz_item(11, 5));
    engine.record_grade(graded(11, 7, 85.0));

    let adapter = GradeReportAdapter::new(&engine);
    let report = adapter.get_grades(&GradeQuery::for_user(COURSE, 7)).expect("report");

    let overview = report.overview();
    assert!(overview.contains("Grade Report Overview"));
    assert!(overview.contains("Quiz 5"));
}
