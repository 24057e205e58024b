use rusqlite::OptionalExtension;
use serde_json::json;

use crate::auth::{self, Role, Session};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_db, required_str};
use crate::ipc::types::{AppState, Request};

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let row = {
        let conn = match require_db(state, req) {
            Ok(c) => c,
            Err(resp) => return resp,
        };
        match conn
            .query_row(
                "SELECT id, password_hash, role, full_name FROM users WHERE username = ?",
                [&username],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
        {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    };

    // One error for both unknown user and wrong password.
    let Some((user_id, password_hash, role_str, full_name)) = row else {
        return err(&req.id, "invalid_credentials", "wrong username or password", None);
    };
    if !auth::verify_password(&password_hash, &password) {
        return err(&req.id, "invalid_credentials", "wrong username or password", None);
    }
    let Some(role) = Role::parse(&role_str) else {
        return err(
            &req.id,
            "db_query_failed",
            format!("user has unknown role: {}", role_str),
            None,
        );
    };

    log::info!("login: {} ({})", username, role.as_str());
    state.session = Some(Session {
        user_id: user_id.clone(),
        username: username.clone(),
        full_name: full_name.clone(),
        role,
    });
    ok(
        &req.id,
        json!({
            "userId": user_id,
            "username": username,
            "fullName": full_name,
            "role": role.as_str(),
        }),
    )
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let was_logged_in = state.session.take().is_some();
    ok(&req.id, json!({ "loggedOut": was_logged_in }))
}

fn handle_whoami(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.session.as_ref() {
        Some(s) => ok(
            &req.id,
            json!({
                "userId": s.user_id,
                "username": s.username,
                "fullName": s.full_name,
                "role": s.role.as_str(),
            }),
        ),
        None => ok(&req.id, json!({ "session": serde_json::Value::Null })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.whoami" => Some(handle_whoami(state, req)),
        _ => None,
    }
}
