use serde_json::json;

use crate::auth::Role;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_db_mut, require_role};
use crate::ipc::types::{AppState, Request};

fn handle_seed_samples(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_role(&state.session, req, Role::Admin) {
        return resp;
    }
    let conn = match require_db_mut(&mut state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match db::seed_samples(conn) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "users": summary.users,
                "students": summary.students,
                "subjects": summary.subjects,
                "scores": summary.scores,
            }),
        ),
        Err(e) => err(&req.id, "db_insert_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.seedSamples" => Some(handle_seed_samples(state, req)),
        _ => None,
    }
}
