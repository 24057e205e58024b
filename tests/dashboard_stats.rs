mod common;

use common::Daemon;
use serde_json::json;

#[test]
fn seeded_workspace_dashboards_and_stats() {
    let workspace = tempfile::tempdir().expect("temp workspace");
    let mut d = Daemon::spawn();
    d.select_workspace(workspace.path());
    d.login("admin", "admin123");

    let seeded = d.request_ok("seed", "setup.seedSamples", json!({}));
    assert_eq!(seeded["users"].as_u64(), Some(2));
    assert_eq!(seeded["students"].as_u64(), Some(5));
    assert_eq!(seeded["subjects"].as_u64(), Some(5));
    assert_eq!(seeded["scores"].as_u64(), Some(15));

    // Seeding twice adds nothing.
    let seeded = d.request_ok("seed2", "setup.seedSamples", json!({}));
    assert_eq!(seeded["students"].as_u64(), Some(0));
    assert_eq!(seeded["scores"].as_u64(), Some(0));

    let admin = d.request_ok("da", "dashboard.admin", json!({}));
    assert_eq!(admin["totalStudents"].as_i64(), Some(5));
    assert_eq!(admin["totalSubjects"].as_i64(), Some(5));
    assert_eq!(admin["totalScores"].as_i64(), Some(15));
    assert_eq!(admin["activeStudents"].as_i64(), Some(5));
    assert_eq!(
        admin["recentStudents"].as_array().expect("recent").len(),
        5
    );

    let teacher = d.request_ok("dt", "dashboard.teacher", json!({}));
    assert_eq!(teacher["totalStudents"].as_i64(), Some(5));
    assert_eq!(
        teacher["recentScores"].as_array().expect("recent").len(),
        10
    );

    let stats = d.request_ok("st", "stats.summary", json!({}));
    assert_eq!(stats["totalScores"].as_i64(), Some(15));
    let dist = stats["gradeDistribution"].as_array().expect("distribution");
    // Seeded marks cover exactly these buckets, reported highest first.
    let pairs: Vec<(String, i64)> = dist
        .iter()
        .map(|b| {
            (
                b["letter"].as_str().expect("letter").to_string(),
                b["count"].as_i64().expect("count"),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("A+".to_string(), 3),
            ("A".to_string(), 3),
            ("B".to_string(), 3),
            ("C+".to_string(), 3),
            ("C".to_string(), 3),
        ]
    );
}

#[test]
fn student_dashboard_reports_credit_weighted_gpa() {
    let workspace = tempfile::tempdir().expect("temp workspace");
    let mut d = Daemon::spawn();
    d.select_workspace(workspace.path());
    d.login("admin", "admin123");
    d.request_ok("seed", "setup.seedSamples", json!({}));

    d.login("student", "student123");
    let result = d.request_ok("ds", "dashboard.student", json!({ "studentNo": "SV001" }));
    assert_eq!(
        result["student"]["fullName"].as_str(),
        Some("Nguyễn Văn An")
    );
    let scores = result["scores"].as_array().expect("scores");
    assert_eq!(scores.len(), 3);

    // SV001: IT001 B over 3 credits, IT002 C+ over 4, IT003 A over 3:
    // (3.0*3 + 2.5*4 + 3.7*3) / 10 = 3.01
    assert_eq!(result["gpa"].as_f64(), Some(3.01));

    let code = d.request_err("dx", "dashboard.student", json!({ "studentNo": "SV999" }));
    assert_eq!(code, "not_found");
}

#[test]
fn student_with_no_scores_has_zero_gpa() {
    let workspace = tempfile::tempdir().expect("temp workspace");
    let mut d = Daemon::spawn();
    d.select_workspace(workspace.path());
    d.login("admin", "admin123");
    d.request_ok(
        "st",
        "students.create",
        json!({ "studentNo": "SV200", "fullName": "Vũ Văn Không" }),
    );

    let result = d.request_ok("ds", "dashboard.student", json!({ "studentNo": "SV200" }));
    assert!(result["scores"].as_array().expect("scores").is_empty());
    assert_eq!(result["gpa"].as_f64(), Some(0.0));
}
