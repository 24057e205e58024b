use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Role;
use crate::db;
use crate::grade;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_f64, optional_str, require_db, require_role, required_str};
use crate::ipc::types::{AppState, Request};

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Teacher) {
        return resp;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let mut stmt = match conn.prepare(
        "SELECT sc.id, st.student_no, st.full_name, su.code, su.name,
                sc.midterm, sc.final, sc.average, sc.letter, sc.semester, sc.created_at
         FROM scores sc
         JOIN students st ON st.id = sc.student_id
         JOIN subjects su ON su.id = sc.subject_id
         ORDER BY sc.created_at DESC",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "studentNo": r.get::<_, String>(1)?,
                "studentName": r.get::<_, String>(2)?,
                "subjectCode": r.get::<_, String>(3)?,
                "subjectName": r.get::<_, String>(4)?,
                "midterm": r.get::<_, Option<f64>>(5)?,
                "final": r.get::<_, Option<f64>>(6)?,
                "average": r.get::<_, Option<f64>>(7)?,
                "letter": r.get::<_, Option<String>>(8)?,
                "semester": r.get::<_, Option<String>>(9)?,
                "createdAt": r.get::<_, String>(10)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(scores) => ok(&req.id, json!({ "scores": scores })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Teacher) {
        return resp;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // Both parents must exist before a score may be recorded.
    for (table, id) in [("students", &student_id), ("subjects", &subject_id)] {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
        let found: Option<i64> = match conn.query_row(&sql, [id], |r| r.get(0)).optional() {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        if found.is_none() {
            return err(
                &req.id,
                "not_found",
                format!("{} record not found", table.trim_end_matches('s')),
                None,
            );
        }
    }

    let midterm = optional_f64(req, "midterm");
    let final_score = optional_f64(req, "final");
    // Derived pair: present iff both components are present.
    let graded = grade::compute_average(midterm, final_score);
    let average = graded.map(|(avg, _)| avg);
    let letter = graded.map(|(_, l)| l.as_str());

    let score_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO scores(
           id, student_id, subject_id, midterm, final, average, letter, semester, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &score_id,
            &student_id,
            &subject_id,
            midterm,
            final_score,
            average,
            letter,
            optional_str(req, "semester"),
            db::now_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "scores" })),
        );
    }

    ok(
        &req.id,
        json!({
            "scoreId": score_id,
            "average": average,
            "letter": letter,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scores.list" => Some(handle_list(state, req)),
        "scores.create" => Some(handle_create(state, req)),
        _ => None,
    }
}
