use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::reconcile::{self, CategoryStore, IncomingCategory, UploadStatus};
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

/// Boundary guard on the serialized row payload, checked before the
/// reconciler or the audit row exist.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Production store: categories table in the workspace database.
struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl CategoryStore for SqliteStore<'_> {
    fn existing_ids(&mut self) -> anyhow::Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT category_id FROM categories")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    fn bulk_insert(&mut self, rows: &[IncomingCategory]) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut ins = tx.prepare(
                "INSERT INTO categories(category_id, category_name, category_path,
                                        category_level, parent_category_id, is_active,
                                        created_at, updated_at)
                 VALUES(?, ?, ?, ?, ?, 1, ?, ?)",
            )?;
            let now = db::now_rfc3339();
            for row in rows {
                ins.execute((
                    &row.category_id,
                    &row.category_name,
                    &row.category_path,
                    row.category_level,
                    &row.parent_category_id,
                    &now,
                    &now,
                ))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn update_one(&mut self, row: &IncomingCategory) -> anyhow::Result<()> {
        let affected = self.conn.execute(
            "UPDATE categories
             SET category_name = ?, category_path = ?, category_level = ?,
                 parent_category_id = ?, is_active = 1, updated_at = ?
             WHERE category_id = ?",
            (
                &row.category_name,
                &row.category_path,
                row.category_level,
                &row.parent_category_id,
                db::now_rfc3339(),
                &row.category_id,
            ),
        )?;
        if affected == 0 {
            anyhow::bail!("category {} not found", row.category_id);
        }
        Ok(())
    }
}

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Rows come pre-split (`params.rows`) or as raw CSV text (`params.csvText`)
/// parsed into the same shape. Both feed the same alias resolution.
fn collect_rows(req: &Request) -> Result<Vec<serde_json::Value>, serde_json::Value> {
    if let Some(rows) = req.params.get("rows") {
        let Some(rows) = rows.as_array() else {
            return Err(err(&req.id, "bad_params", "rows must be an array", None));
        };
        return Ok(rows.clone());
    }
    if let Some(text) = req.params.get("csvText").and_then(|v| v.as_str()) {
        if text.len() > MAX_UPLOAD_BYTES {
            return Err(payload_too_large(req, text.len()));
        }
        return reconcile::rows_from_csv(text)
            .map_err(|e| err(&req.id, "csv_parse_failed", e.to_string(), None));
    }
    Err(err(
        &req.id,
        "bad_params",
        "missing rows or csvText",
        None,
    ))
}

fn payload_too_large(req: &Request, size: usize) -> serde_json::Value {
    err(
        &req.id,
        "payload_too_large",
        format!("upload payload is {size} bytes, limit is {MAX_UPLOAD_BYTES}"),
        Some(json!({ "limitBytes": MAX_UPLOAD_BYTES })),
    )
}

fn handle_categories_upload(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    // Authorization comes first: nobody touches a row without it.
    let Some(caller) = req.params.get("caller").and_then(|v| v.as_str()) else {
        return err(&req.id, "not_authorized", "missing caller identity", None);
    };
    if !state.admins.is_authorized(caller) {
        return err(
            &req.id,
            "not_authorized",
            format!("{caller} is not an administrator"),
            None,
        );
    }

    let filename = match required_str(req, "filename") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Some(format) = req.params.get("format").and_then(|v| v.as_str()) {
        if format != "csv" && format != "json" {
            return err(
                &req.id,
                "bad_params",
                format!("format must be csv or json, got {format}"),
                None,
            );
        }
    }
    // Accepted for wire compatibility; reconciliation has no deactivation
    // flow, so this reduces to the default upsert behavior.
    let replace_all = req
        .params
        .get("replaceAll")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let rows = match collect_rows(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let payload_bytes = serde_json::to_string(&rows).map(|s| s.len()).unwrap_or(0);
    if payload_bytes > MAX_UPLOAD_BYTES {
        return payload_too_large(req, payload_bytes);
    }

    let upload_id = Uuid::new_v4().to_string();
    if let Err(e) = db::create_upload_audit(conn, &upload_id, &filename, caller) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    info!(upload_id = %upload_id, filename = %filename, total = rows.len(), "upload started");

    let mut store = SqliteStore { conn };
    let summary = match reconcile::reconcile_upload(&mut store, &rows) {
        Ok(v) => v,
        Err(e) => {
            // Failed before any row was processed; close the audit trail as
            // failed and surface the fatal error.
            let details = json!([{ "code": "fatal", "message": e.to_string() }]);
            let _ = db::finalize_upload_audit(
                conn,
                &upload_id,
                rows.len(),
                0,
                0,
                UploadStatus::Failed.as_str(),
                &details,
            );
            return err(&req.id, "upload_failed", e.to_string(), None);
        }
    };

    if let Err(e) = db::finalize_upload_audit(
        conn,
        &upload_id,
        summary.total,
        summary.successful,
        summary.failed,
        summary.status.as_str(),
        &json!(summary.errors),
    ) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({
            "uploadId": upload_id,
            "filename": filename,
            "replaceAll": replace_all,
            "total": summary.total,
            "inserted": summary.inserted,
            "updated": summary.updated,
            "successful": summary.successful,
            "failed": summary.failed,
            "status": summary.status.as_str(),
            "errors": summary.response_errors(),
            "message": format!(
                "processed {} rows: {} inserted, {} updated, {} failed",
                summary.total, summary.inserted, summary.updated, summary.failed
            ),
        }),
    )
}

fn handle_uploads_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match db::list_uploads(conn) {
        Ok(uploads) => ok(&req.id, json!({ "uploads": uploads })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "categories.upload" => Some(handle_categories_upload(state, req)),
        "uploads.list" => Some(handle_uploads_list(state, req)),
        _ => None,
    }
}
