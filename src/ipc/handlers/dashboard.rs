use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

use crate::auth::Role;
use crate::grade::{self, CreditedGrade, LetterGrade};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_db, require_role, required_str};
use crate::ipc::types::{AppState, Request};

fn count(conn: &Connection, sql: &str) -> Result<i64, rusqlite::Error> {
    conn.query_row(sql, [], |r| r.get(0))
}

fn handle_admin(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Admin) {
        return resp;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let totals = (|| -> Result<_, rusqlite::Error> {
        Ok((
            count(conn, "SELECT COUNT(*) FROM students")?,
            count(conn, "SELECT COUNT(*) FROM subjects")?,
            count(conn, "SELECT COUNT(*) FROM scores")?,
            count(conn, "SELECT COUNT(*) FROM students WHERE status = 'active'")?,
        ))
    })();
    let (students, subjects, scores, active) = match totals {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut stmt = match conn.prepare(
        "SELECT student_no, full_name, class_name, created_at
         FROM students
         ORDER BY created_at DESC
         LIMIT 5",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let recent = stmt
        .query_map([], |r| {
            Ok(json!({
                "studentNo": r.get::<_, String>(0)?,
                "fullName": r.get::<_, String>(1)?,
                "className": r.get::<_, Option<String>>(2)?,
                "createdAt": r.get::<_, String>(3)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let recent = match recent {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "totalStudents": students,
            "totalSubjects": subjects,
            "totalScores": scores,
            "activeStudents": active,
            "recentStudents": recent,
        }),
    )
}

fn handle_teacher(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Teacher) {
        return resp;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let totals = (|| -> Result<_, rusqlite::Error> {
        Ok((
            count(conn, "SELECT COUNT(*) FROM students")?,
            count(conn, "SELECT COUNT(*) FROM subjects")?,
        ))
    })();
    let (students, subjects) = match totals {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut stmt = match conn.prepare(
        "SELECT st.student_no, st.full_name, su.code, sc.average, sc.letter, sc.created_at
         FROM scores sc
         JOIN students st ON st.id = sc.student_id
         JOIN subjects su ON su.id = sc.subject_id
         ORDER BY sc.created_at DESC
         LIMIT 10",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let recent = stmt
        .query_map([], |r| {
            Ok(json!({
                "studentNo": r.get::<_, String>(0)?,
                "studentName": r.get::<_, String>(1)?,
                "subjectCode": r.get::<_, String>(2)?,
                "average": r.get::<_, Option<f64>>(3)?,
                "letter": r.get::<_, Option<String>>(4)?,
                "createdAt": r.get::<_, String>(5)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let recent = match recent {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "totalStudents": students,
            "totalSubjects": subjects,
            "recentScores": recent,
        }),
    )
}

fn handle_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Student) {
        return resp;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    // The caller names the student explicitly; there is no implicit
    // "first record" binding.
    let student_no = match required_str(req, "studentNo") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let student = match conn
        .query_row(
            "SELECT id, full_name, class_name, major, status
             FROM students WHERE student_no = ?",
            [&student_no],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, String>(4)?,
                ))
            },
        )
        .optional()
    {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "student not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let (student_id, full_name, class_name, major, status) = student;

    // The join drops scores whose subject no longer resolves, so they
    // never reach the GPA computation.
    let mut stmt = match conn.prepare(
        "SELECT su.code, su.name, su.credits, sc.midterm, sc.final, sc.average, sc.letter, sc.semester
         FROM scores sc
         JOIN subjects su ON su.id = sc.subject_id
         WHERE sc.student_id = ?
         ORDER BY su.code",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    type ScoreRow = (
        String,
        String,
        i64,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<String>,
        Option<String>,
    );
    let rows: Result<Vec<ScoreRow>, _> = stmt
        .query_map([&student_id], |r| {
            Ok((
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                r.get(3)?,
                r.get(4)?,
                r.get(5)?,
                r.get(6)?,
                r.get(7)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let credited: Vec<CreditedGrade> = rows
        .iter()
        .map(|(_, _, credits, _, _, _, letter, _)| CreditedGrade {
            letter: letter.as_deref().and_then(LetterGrade::parse),
            credits: *credits,
        })
        .collect();
    let gpa = grade::compute_gpa(&credited);

    let scores: Vec<serde_json::Value> = rows
        .into_iter()
        .map(
            |(code, name, credits, midterm, final_score, average, letter, semester)| {
                json!({
                    "subjectCode": code,
                    "subjectName": name,
                    "credits": credits,
                    "midterm": midterm,
                    "final": final_score,
                    "average": average,
                    "letter": letter,
                    "semester": semester,
                })
            },
        )
        .collect();

    ok(
        &req.id,
        json!({
            "student": {
                "studentNo": student_no,
                "fullName": full_name,
                "className": class_name,
                "major": major,
                "status": status,
            },
            "scores": scores,
            "gpa": gpa,
        }),
    )
}

fn handle_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Student) {
        return resp;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let letters: Result<Vec<Option<String>>, _> = (|| {
        let mut stmt = conn.prepare("SELECT letter FROM scores")?;
        let rows = stmt
            .query_map([], |r| r.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>();
        rows
    })();
    let letters = match letters {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let distribution = grade::grade_distribution(letters.iter().map(|l| l.as_deref()));
    let total_scores = letters.len() as i64;

    let totals = (|| -> Result<_, rusqlite::Error> {
        Ok((
            count(conn, "SELECT COUNT(*) FROM students")?,
            count(conn, "SELECT COUNT(*) FROM subjects")?,
        ))
    })();
    let (students, subjects) = match totals {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let dist_json: Vec<serde_json::Value> = distribution
        .into_iter()
        .map(|(letter, n)| json!({ "letter": letter, "count": n }))
        .collect();

    ok(
        &req.id,
        json!({
            "gradeDistribution": dist_json,
            "totalStudents": students,
            "totalSubjects": subjects,
            "totalScores": total_scores,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.admin" => Some(handle_admin(state, req)),
        "dashboard.teacher" => Some(handle_teacher(state, req)),
        "dashboard.student" => Some(handle_student(state, req)),
        "stats.summary" => Some(handle_stats(state, req)),
        _ => None,
    }
}
