use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Role;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, require_db, require_role, required_str};
use crate::ipc::types::{AppState, Request};

fn student_json(
    id: String,
    student_no: String,
    full_name: String,
    email: Option<String>,
    phone: Option<String>,
    birth_date: Option<String>,
    class_name: Option<String>,
    major: Option<String>,
    status: String,
    created_at: String,
) -> serde_json::Value {
    json!({
        "id": id,
        "studentNo": student_no,
        "fullName": full_name,
        "email": email,
        "phone": phone,
        "birthDate": birth_date,
        "className": class_name,
        "major": major,
        "status": status,
        "createdAt": created_at,
    })
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Teacher) {
        return resp;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let search = optional_str(req, "search");
    let (sql, params): (&str, Vec<String>) = match &search {
        Some(q) => (
            "SELECT id, student_no, full_name, email, phone, birth_date, class_name, major, status, created_at
             FROM students
             WHERE student_no LIKE '%' || ?1 || '%' OR full_name LIKE '%' || ?1 || '%'
             ORDER BY student_no",
            vec![q.clone()],
        ),
        None => (
            "SELECT id, student_no, full_name, email, phone, birth_date, class_name, major, status, created_at
             FROM students
             ORDER BY student_no",
            Vec::new(),
        ),
    };

    let mut stmt = match conn.prepare(sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |r| {
            Ok(student_json(
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                r.get(3)?,
                r.get(4)?,
                r.get(5)?,
                r.get(6)?,
                r.get(7)?,
                r.get(8)?,
                r.get(9)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(students) => ok(&req.id, json!({ "students": students })),
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

    let student_no = match required_str(req, "studentNo") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let full_name = match required_str(req, "fullName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let student_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO students(
           id, student_no, full_name, email, phone, birth_date, class_name, major, status, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, 'active', ?)",
        (
            &student_id,
            &student_no,
            &full_name,
            optional_str(req, "email"),
            optional_str(req, "phone"),
            optional_str(req, "birthDate"),
            optional_str(req, "className"),
            optional_str(req, "major"),
            db::now_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    ok(&req.id, json!({ "studentId": student_id }))
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let full_name = match required_str(req, "fullName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = optional_str(req, "status").unwrap_or_else(|| "active".to_string());
    if status != "active" && status != "inactive" {
        return err(&req.id, "bad_params", "status must be active or inactive", None);
    }

    let updated = conn.execute(
        "UPDATE students
         SET full_name = ?, email = ?, phone = ?, class_name = ?, major = ?, status = ?
         WHERE id = ?",
        (
            &full_name,
            optional_str(req, "email"),
            optional_str(req, "phone"),
            optional_str(req, "className"),
            optional_str(req, "major"),
            &status,
            &student_id,
        ),
    );
    match updated {
        Ok(0) => err(&req.id, "not_found", "student not found", None),
        Ok(_) => ok(&req.id, json!({ "studentId": student_id })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Admin) {
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

    let exists: Option<String> = match conn
        .query_row("SELECT id FROM students WHERE id = ?", [&student_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "student not found", None);
    }

    // Dependent scores go with the student via ON DELETE CASCADE.
    if let Err(e) = conn.execute("DELETE FROM students WHERE id = ?", [&student_id]) {
        return err(&req.id, "db_query_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "deleted": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.create" => Some(handle_create(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
