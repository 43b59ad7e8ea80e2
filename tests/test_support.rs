#![allow(dead_code)]

use catalogd::auth::AdminList;
use catalogd::ipc::{handle_request, AppState, Request};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub fn temp_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{prefix}-{}", Uuid::new_v4()))
}

pub fn new_state(admins: &[&str]) -> AppState {
    AppState {
        workspace: None,
        db: None,
        admins: AdminList::new(admins.iter().map(|s| s.to_string())),
    }
}

pub fn open_workspace(state: &mut AppState, workspace: &Path) {
    let resp = request(
        state,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(resp["ok"], json!(true), "workspace.select failed: {resp}");
}

pub fn request(state: &mut AppState, id: &str, method: &str, params: Value) -> Value {
    handle_request(
        state,
        Request {
            id: id.to_string(),
            method: method.to_string(),
            params,
        },
    )
}

pub fn request_ok(state: &mut AppState, id: &str, method: &str, params: Value) -> Value {
    let resp = request(state, id, method, params);
    assert_eq!(resp["ok"], json!(true), "{method} failed: {resp}");
    resp["result"].clone()
}

pub fn request_err(state: &mut AppState, id: &str, method: &str, params: Value) -> Value {
    let resp = request(state, id, method, params);
    assert_eq!(resp["ok"], json!(false), "{method} unexpectedly ok: {resp}");
    resp["error"].clone()
}
