//! End-to-end aggregation scenarios over the public API.

use chrono::NaiveDate;
use rosterbucket_core::prelude::*;

fn sydney() -> chrono_tz::Tz {
    parse_tz("Australia/Sydney").unwrap()
}

fn entries(json: &str) -> Vec<ScheduleEntry> {
    serde_json::from_str(json).unwrap()
}

fn date(text: &str) -> NaiveDate {
    parse_schedule_date(text).unwrap()
}

fn single(zone: &str, day: &str, state: &str, start: &str, end: &str) -> Vec<ScheduleEntry> {
    entries(&format!(
        r#"[{{"site": "X", "timezone": "{zone}", "team": "A", "agent": "d1",
             "date": "{day}", "scheduleState": "{state}",
             "startTime": "{start}", "endTime": "{end}"}}]"#
    ))
}

fn bucket_total(report: &Report, state: &str) -> f64 {
    report
        .intervals
        .iter()
        .filter_map(|interval| interval.states.get(state))
        .map(|totals| totals.total_duration)
        .sum()
}

fn bucket_indices(report: &Report, state: &str) -> Vec<usize> {
    report
        .intervals
        .iter()
        .filter(|interval| interval.states.contains_key(state))
        .map(|interval| interval.interval.index)
        .collect()
}

#[test]
fn manila_overnight_shift_with_suffix_offset() {
    let rows = entries(
        r#"[{"site": "MNL", "timezone": "PHT", "team": "Night", "agent": "m1",
             "date": "11/15/2024", "scheduleState": "Available",
             "startTime": "10:00 PM", "endTime": "02:00 AM +", "duration": "4:00"}]"#,
    );
    let catalog = StateCatalog::builtin();

    // 10:00 PM PHT is 1:00 AM AEDT on the 16th; the shift ends 5:00 AM.
    let report = process_schedule_data(&rows, &catalog, sydney(), Some(date("11/16/2024")));
    let record = &report.processed_entries[0];
    assert_eq!(record.reference_start, "1:00 AM");
    assert_eq!(record.reference_end, "5:00 AM");
    assert!(record.day_offset_applied);
    assert!(!record.was_clamped);
    assert_eq!(record.conversion_method, ConversionMethod::Exact);
    assert_eq!(report.state_totals["Available"].total_duration, 240.0);
    assert_eq!(record.buckets.first().map(|b| b.index), Some(2));
    assert_eq!(record.buckets.last().map(|b| b.index), Some(9));
}

#[test]
fn shift_crossing_reference_midnight_is_prorated() {
    // 6:00 PM to 8:00 PM Kolkata on the 15th is 11:30 PM to 1:30 AM in Sydney.
    let rows = entries(
        r#"[{"site": "BLR", "timezone": "Asia/Kolkata", "team": "A", "agent": "k1",
             "date": "11/15/2024", "scheduleState": "Training",
             "startTime": "6:00 PM", "endTime": "8:00 PM", "duration": "2:00"}]"#,
    );
    let catalog = StateCatalog::builtin();

    let first = process_schedule_data(&rows, &catalog, sydney(), Some(date("11/15/2024")));
    let second = process_schedule_data(&rows, &catalog, sydney(), Some(date("11/16/2024")));

    assert!(first.processed_entries[0].was_clamped);
    assert_eq!(first.state_totals["Training"].total_duration, 30.0);
    assert_eq!(first.intervals[47].states["Training"].total_duration, 30.0);

    assert!(second.processed_entries[0].was_clamped);
    assert_eq!(second.state_totals["Training"].total_duration, 90.0);
    assert_eq!(second.intervals[0].states["Training"].total_duration, 30.0);
}

#[test]
fn scaled_allocation_trusts_source_duration() {
    // 60-minute span but the row says 45 minutes were scheduled.
    let rows = entries(
        r#"[{"site": "SYD", "timezone": "AEST", "team": "A", "agent": "s1",
             "date": "11/15/2024", "scheduleState": "Coaching 1:1",
             "startTime": "2:00 PM", "endTime": "3:00 PM", "duration": "0:45"}]"#,
    );
    let catalog = StateCatalog::builtin();
    let report = process_schedule_data(&rows, &catalog, sydney(), None);

    let record = &report.processed_entries[0];
    assert_eq!(record.state, "Coaching");
    assert_eq!(record.duration_difference, 15);
    assert_eq!(report.state_totals["Coaching"].total_duration, 45.0);
    assert_eq!(report.intervals[28].states["Coaching"].total_duration, 22.5);
    assert_eq!(report.intervals[29].states["Coaching"].total_duration, 22.5);
}

#[test]
fn custom_catalog_and_group_views() {
    let catalog: StateCatalog = serde_json::from_str(
        r#"{
            "states": [
                {"name": "Phones", "category": "Productive", "group": "Productive",
                 "is_paid": true},
                {"name": "Email", "category": "Productive", "group": "Productive",
                 "is_paid": true},
                {"name": "Break", "category": "Break", "group": "Shrinkage", "is_paid": true},
                {"name": "Annual Leave", "category": "Time Off", "group": "Time Off"}
            ],
            "groups": ["Productive", "Shrinkage", "Time Off"]
        }"#,
    )
    .unwrap();
    catalog.validate().unwrap();

    let rows = entries(
        r#"[
            {"site": "SYD", "timezone": "AEST", "team": "A", "agent": "s1",
             "date": "11/15/2024", "scheduleState": "phones - inbound",
             "startTime": "9:00 AM", "endTime": "10:00 AM"},
            {"site": "SYD", "timezone": "AEST", "team": "A", "agent": "s2",
             "date": "11/15/2024", "scheduleState": "Email",
             "startTime": "9:00 AM", "endTime": "9:30 AM"},
            {"site": "SYD", "timezone": "AEST", "team": "A", "agent": "s2",
             "date": "11/15/2024", "scheduleState": "Break 15 min",
             "startTime": "9:30 AM", "endTime": "9:45 AM"},
            {"site": "SYD", "timezone": "AEST", "team": "A", "agent": "s3",
             "date": "11/15/2024", "scheduleState": "Annual Leave",
             "startTime": "Full Day", "endTime": "Full Day"},
            {"site": "SYD", "timezone": "AEST", "team": "A", "agent": "s3",
             "date": "11/15/2024", "scheduleState": "Phones",
             "startTime": "9:00 AM", "endTime": "5:00 PM"}
        ]"#,
    );

    let report = process_schedule_data(&rows, &catalog, sydney(), Some(date("11/15/2024")));
    assert_eq!(report.metadata.excluded_entries, 1);

    let productive = filter_by_group(&report, &catalog, "Productive");
    assert_eq!(
        productive.state_totals.keys().collect::<Vec<_>>(),
        vec!["Email", "Phones"]
    );
    assert_eq!(productive.intervals[18].states["Phones"].agent_count, 1);
    assert_eq!(productive.state_totals["Phones"].total_duration, 60.0);

    let shrinkage = filter_by_group(&report, &catalog, "Shrinkage");
    assert_eq!(shrinkage.intervals[19].states["Break"].total_duration, 15.0);
    assert!(shrinkage.intervals[19].states.get("Email").is_none());
}

#[test]
fn before_after_comparison() {
    let catalog = StateCatalog::builtin();
    let before = entries(
        r#"[{"site": "SYD", "timezone": "AEST", "team": "A", "agent": "s1",
             "date": "11/15/2024", "scheduleState": "Lunch",
             "startTime": "12:00 PM", "endTime": "1:00 PM"}]"#,
    );
    let after = entries(
        r#"[{"site": "SYD", "timezone": "AEST", "team": "A", "agent": "s1",
             "date": "11/15/2024", "scheduleState": "Lunch",
             "startTime": "12:30 PM", "endTime": "1:00 PM"}]"#,
    );

    let comparison = compare_reports(
        &process_schedule_data(&before, &catalog, sydney(), None),
        &process_schedule_data(&after, &catalog, sydney(), None),
    );

    assert_eq!(comparison.states["Lunch"].minutes.delta, -30.0);
    assert_eq!(comparison.states["Lunch"].agents.delta, 0);
    assert_eq!(comparison.buckets[24].minutes.delta, -30.0);
    assert_eq!(comparison.buckets[25].minutes.delta, 0.0);
}

#[test]
fn reference_spring_forward_counts_elapsed_minutes() {
    // Sydney clocks jump from 2:00 to 3:00 AM on 2024-10-06.
    let rows = single("Australia/Sydney", "10/06/2024", "Meeting", "1:00 AM", "4:00 AM");
    let catalog = StateCatalog::builtin();
    let report = process_schedule_data(&rows, &catalog, sydney(), Some(date("10/06/2024")));

    let record = &report.processed_entries[0];
    assert_eq!(record.reference_span_minutes, 120);
    assert_eq!(record.source_duration_minutes, 120);
    assert!(!record.was_clamped);
    assert_eq!(report.state_totals["Meeting"].total_duration, 120.0);
    assert!((bucket_total(&report, "Meeting") - 120.0).abs() < 1e-9);
    assert_eq!(bucket_indices(&report, "Meeting"), vec![2, 3, 4, 5, 6, 7]);
}

#[test]
fn reference_fall_back_counts_the_repeated_hour() {
    // Sydney clocks fall back from 3:00 to 2:00 AM on 2024-04-07.
    let rows = single("Australia/Sydney", "04/07/2024", "Meeting", "1:00 AM", "4:00 AM");
    let catalog = StateCatalog::builtin();
    let report = process_schedule_data(&rows, &catalog, sydney(), Some(date("04/07/2024")));

    let record = &report.processed_entries[0];
    assert_eq!(record.reference_span_minutes, 240);
    assert_eq!(record.duration_difference, 0);
    assert_eq!(report.state_totals["Meeting"].total_duration, 240.0);
    assert!((bucket_total(&report, "Meeting") - 240.0).abs() < 1e-9);
    assert_eq!(report.intervals[2].states["Meeting"].total_duration, 40.0);
}

#[test]
fn source_spring_forward_into_sydney() {
    // New York skips 2:00-3:00 AM on 2024-03-10; Sydney is on AEDT.
    // 1:00 AM EST is 5:00 PM AEDT and 4:00 AM EDT is 7:00 PM AEDT.
    let rows = single("EST", "03/10/2024", "Available", "1:00 AM", "4:00 AM");
    let catalog = StateCatalog::builtin();
    let report = process_schedule_data(&rows, &catalog, sydney(), Some(date("03/10/2024")));

    let record = &report.processed_entries[0];
    assert_eq!(record.reference_start, "5:00 PM");
    assert_eq!(record.reference_end, "7:00 PM");
    assert_eq!(record.reference_span_minutes, 120);
    assert_eq!(report.state_totals["Available"].total_duration, 120.0);
    assert_eq!(bucket_total(&report, "Available"), 120.0);
    assert_eq!(bucket_indices(&report, "Available"), vec![34, 35, 36, 37]);
}

#[test]
fn source_fall_back_into_sydney() {
    // New York repeats 1:00-2:00 AM on 2024-11-03.
    // Midnight EDT is 3:00 PM AEDT and 3:00 AM EST is 7:00 PM AEDT.
    let rows = single("America/New_York", "11/03/2024", "Available", "12:00 AM", "3:00 AM");
    let catalog = StateCatalog::builtin();
    let report = process_schedule_data(&rows, &catalog, sydney(), Some(date("11/03/2024")));

    let record = &report.processed_entries[0];
    assert_eq!(record.reference_start, "3:00 PM");
    assert_eq!(record.reference_end, "7:00 PM");
    assert_eq!(record.reference_span_minutes, 240);
    assert_eq!(report.state_totals["Available"].total_duration, 240.0);
    assert_eq!(bucket_total(&report, "Available"), 240.0);
    assert_eq!(bucket_indices(&report, "Available"), (30..38).collect::<Vec<_>>());
}

#[test]
fn opposite_dst_phases_shift_the_reference_day() {
    // March: New York on EDT (-4), Sydney on AEDT (+11), 15 hours apart.
    // November: New York on EST (-5), Sydney on AEDT (+11), 16 hours apart.
    let catalog = StateCatalog::builtin();

    let march = single("America/New_York", "03/20/2024", "Training", "8:00 AM", "10:00 AM");
    let evening = process_schedule_data(&march, &catalog, sydney(), Some(date("03/20/2024")));
    let morning = process_schedule_data(&march, &catalog, sydney(), Some(date("03/21/2024")));

    assert!(evening.processed_entries[0].was_clamped);
    assert_eq!(evening.state_totals["Training"].total_duration, 60.0);
    assert_eq!(bucket_indices(&evening, "Training"), vec![46, 47]);
    assert_eq!(morning.state_totals["Training"].total_duration, 60.0);
    assert_eq!(bucket_indices(&morning, "Training"), vec![0, 1]);
    assert_eq!(morning.processed_entries[0].reference_end, "1:00 AM");

    let november = single("America/New_York", "11/20/2024", "Training", "8:00 AM", "10:00 AM");
    let report = process_schedule_data(&november, &catalog, sydney(), Some(date("11/21/2024")));
    let record = &report.processed_entries[0];
    assert!(!record.was_clamped);
    assert_eq!(record.reference_start, "12:00 AM");
    assert_eq!(record.reference_end, "2:00 AM");
    assert_eq!(report.state_totals["Training"].total_duration, 120.0);
    assert_eq!(bucket_indices(&report, "Training"), vec![0, 1, 2, 3]);
}
