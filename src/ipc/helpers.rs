use rusqlite::Connection;

use crate::auth::{Role, Session};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

/// Either the open database handle or a ready-to-send error response.
pub fn require_db<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn require_db_mut<'a>(
    db: &'a mut Option<Connection>,
    req: &Request,
) -> Result<&'a mut Connection, serde_json::Value> {
    db.as_mut()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Boundary-layer capability check. Core modules never see roles; every
/// gated method goes through here before touching the store.
pub fn require_role<'a>(
    session: &'a Option<Session>,
    req: &Request,
    required: Role,
) -> Result<&'a Session, serde_json::Value> {
    let Some(session) = session.as_ref() else {
        return Err(err(&req.id, "not_authenticated", "log in first", None));
    };
    if !session.role.allows(required) {
        return Err(err(
            &req.id,
            "forbidden",
            format!("requires {} access", required.as_str()),
            None,
        ));
    }
    Ok(session)
}

pub fn required_str(req: &Request, name: &str) -> Result<String, serde_json::Value> {
    match req.params.get(name).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", name),
            None,
        )),
        None => Err(err(&req.id, "bad_params", format!("missing {}", name), None)),
    }
}

pub fn optional_str(req: &Request, name: &str) -> Option<String> {
    req.params
        .get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn optional_f64(req: &Request, name: &str) -> Option<f64> {
    req.params.get(name).and_then(|v| v.as_f64())
}
