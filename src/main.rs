mod auth;
mod db;
mod export;
mod grade;
mod ipc;
mod roster;
mod sheet;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

fn main() {
    // stdout carries the protocol; logs go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let mut state = ipc::AppState {
        workspace: None,
        db: None,
        session: None,
    };

    // Env-driven preselect so supervised deployments can skip
    // workspace.select.
    if let Ok(path) = std::env::var("GRADEBOOKD_WORKSPACE") {
        let path = PathBuf::from(path);
        match db::open_db(&path) {
            Ok(conn) => {
                log::info!("workspace preselected: {}", path.to_string_lossy());
                state.workspace = Some(path);
                state.db = Some(conn);
            }
            Err(e) => log::error!("failed to open GRADEBOOKD_WORKSPACE: {e:?}"),
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; ignore.
                let _ = writeln!(
                    stdout,
                    "{{\"ok\":false,\"error\":{{\"code\":\"bad_json\",\"message\":\"{}\"}}}}",
                    e
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
