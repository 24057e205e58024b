use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use uuid::Uuid;

use crate::auth::Role;
use crate::db;
use crate::export::{self, StudentRow};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_db, require_db_mut, require_role, required_str};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, RosterError};
use crate::sheet;

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Admin) {
        return resp;
    }
    let conn = match require_db_mut(&mut state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };

    let data = match sheet::read_sheet(&path) {
        Ok(d) => d,
        Err(e) => return err(&req.id, "sheet_read_failed", format!("{e:?}"), None),
    };

    let existing_keys: Result<HashSet<String>, rusqlite::Error> = (|| {
        let mut stmt = conn.prepare("SELECT student_no FROM students")?;
        let rows = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>();
        rows
    })();
    let existing_keys = match existing_keys {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let reconciliation = match roster::reconcile(&data.headers, &data.rows, &existing_keys) {
        Ok(r) => r,
        Err(RosterError::MalformedBatch { missing }) => {
            return err(
                &req.id,
                "malformed_batch",
                "spreadsheet is missing required columns",
                Some(json!({ "missingColumns": missing })),
            )
        }
    };

    // All accepted rows land in one transaction; either the whole batch
    // persists or none of it does.
    let inserted = (|| -> anyhow::Result<usize> {
        let tx = conn.transaction()?;
        for row in &reconciliation.to_insert {
            tx.execute(
                "INSERT INTO students(
                   id, student_no, full_name, email, phone, class_name, major, status, created_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, 'active', ?)",
                (
                    Uuid::new_v4().to_string(),
                    &row.student_no,
                    &row.full_name,
                    &row.email,
                    &row.phone,
                    &row.class_name,
                    &row.major,
                    db::now_rfc3339(),
                ),
            )?;
        }
        tx.commit()?;
        Ok(reconciliation.to_insert.len())
    })();

    match inserted {
        Ok(n) => {
            log::info!(
                "roster import: {} inserted, {} skipped",
                n,
                reconciliation.skipped
            );
            ok(
                &req.id,
                json!({
                    "insertedCount": n,
                    "skippedCount": reconciliation.skipped,
                    "totalRows": data.rows.len(),
                }),
            )
        }
        Err(e) => err(&req.id, "db_insert_failed", format!("{e:?}"), None),
    }
}

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Teacher) {
        return resp;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };

    let students: Result<Vec<StudentRow>, rusqlite::Error> = (|| {
        let mut stmt = conn.prepare(
            "SELECT student_no, full_name, COALESCE(email, ''), COALESCE(phone, ''),
                    COALESCE(class_name, ''), COALESCE(major, ''), status
             FROM students
             ORDER BY student_no",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(StudentRow {
                student_no: r.get(0)?,
                full_name: r.get(1)?,
                email: r.get(2)?,
                phone: r.get(3)?,
                class_name: r.get(4)?,
                major: r.get(5)?,
                status: r.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>();
        rows
    })();
    let students = match students {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let headers: Vec<String> = export::EXPORT_HEADERS
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = export::student_export_rows(&students);
    if let Err(e) = sheet::write_sheet(&path, export::EXPORT_SHEET_NAME, &headers, &rows) {
        return err(&req.id, "sheet_write_failed", format!("{e:?}"), None);
    }

    ok(
        &req.id,
        json!({
            "path": path.to_string_lossy(),
            "fileName": export::EXPORT_FILE_NAME,
            "mimeType": export::XLSX_MIME_TYPE,
            "rowCount": rows.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.import" => Some(handle_import(state, req)),
        "roster.export" => Some(handle_export(state, req)),
        _ => None,
    }
}
