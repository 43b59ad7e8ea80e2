use crate::db;
use crate::hierarchy::{self, Drilldown};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn handle_categories_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let search = optional_str(req, "search");

    match db::load_active_categories(conn, search.as_deref()) {
        Ok(categories) => ok(
            &req.id,
            json!({ "count": categories.len(), "categories": categories }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_categories_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let records = match db::load_active_categories(conn, None) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(&req.id, json!(hierarchy::level_stats(&records)))
}

fn parse_order(req: &Request) -> Result<bool, serde_json::Value> {
    match req.params.get("order").and_then(|v| v.as_str()) {
        None | Some("asc") => Ok(false),
        Some("desc") => Ok(true),
        Some(other) => Err(err(
            &req.id,
            "bad_params",
            format!("order must be asc or desc, got {other}"),
            None,
        )),
    }
}

fn handle_categories_drilldown(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let descending = match parse_order(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let selection = Drilldown {
        large: optional_str(req, "large"),
        medium: optional_str(req, "medium"),
        small: optional_str(req, "small"),
    };

    let records = match db::load_active_categories(conn, None) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(
        &req.id,
        json!(hierarchy::drilldown(&records, &selection, descending)),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "categories.list" => Some(handle_categories_list(state, req)),
        "categories.stats" => Some(handle_categories_stats(state, req)),
        "categories.drilldown" => Some(handle_categories_drilldown(state, req)),
        _ => None,
    }
}
