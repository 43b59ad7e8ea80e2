use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("catalog.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories(
            category_id TEXT PRIMARY KEY,
            category_name TEXT NOT NULL,
            category_path TEXT NOT NULL,
            category_level INTEGER NOT NULL,
            parent_category_id TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_categories_active ON categories(is_active)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_categories_level ON categories(category_level)",
        [],
    )?;

    // Early workspaces stored categories without the parent linkage. Add if needed.
    ensure_categories_parent_id(&conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS category_uploads(
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            total_records INTEGER NOT NULL DEFAULT 0,
            successful_records INTEGER NOT NULL DEFAULT 0,
            failed_records INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            error_details TEXT,
            uploaded_by TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_category_uploads_created ON category_uploads(created_at)",
        [],
    )?;

    Ok(conn)
}

fn ensure_categories_parent_id(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "categories", "parent_category_id")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE categories ADD COLUMN parent_category_id TEXT",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub category_id: String,
    pub category_name: String,
    pub category_path: String,
    pub category_level: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_category_id: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Active categories, optionally filtered by a case-insensitive "contains"
/// match against id, name, or path. Hangul has no case, so lower() only
/// affects latin search terms.
pub fn load_active_categories(
    conn: &Connection,
    search: Option<&str>,
) -> anyhow::Result<Vec<CategoryRecord>> {
    let base = "SELECT category_id, category_name, category_path, category_level,
                       parent_category_id, is_active, created_at, updated_at
                FROM categories
                WHERE is_active = 1";
    let map_row = |row: &rusqlite::Row| -> rusqlite::Result<CategoryRecord> {
        Ok(CategoryRecord {
            category_id: row.get(0)?,
            category_name: row.get(1)?,
            category_path: row.get(2)?,
            category_level: row.get(3)?,
            parent_category_id: row.get(4)?,
            is_active: row.get::<_, i64>(5)? != 0,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    };

    let rows = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            let needle = format!("%{}%", term.to_lowercase());
            let sql = format!(
                "{base}
                 AND (lower(category_id) LIKE ?1
                      OR lower(category_name) LIKE ?1
                      OR lower(category_path) LIKE ?1)
                 ORDER BY category_path"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([&needle], map_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let sql = format!("{base} ORDER BY category_path");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

/// Create the audit row in `processing` state before any category row is
/// touched. It receives exactly one further write: `finalize_upload_audit`.
pub fn create_upload_audit(
    conn: &Connection,
    upload_id: &str,
    filename: &str,
    uploaded_by: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO category_uploads(id, filename, status, uploaded_by, created_at)
         VALUES(?, ?, 'processing', ?, ?)",
        (upload_id, filename, uploaded_by, now_rfc3339()),
    )?;
    Ok(())
}

/// Single terminal write to the audit row. The `status = 'processing'` guard
/// keeps a terminal row from ever being mutated again.
pub fn finalize_upload_audit(
    conn: &Connection,
    upload_id: &str,
    total: usize,
    successful: usize,
    failed: usize,
    status: &str,
    error_details: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE category_uploads
         SET total_records = ?, successful_records = ?, failed_records = ?,
             status = ?, error_details = ?
         WHERE id = ? AND status = 'processing'",
        (
            total as i64,
            successful as i64,
            failed as i64,
            status,
            serde_json::to_string(error_details)?,
            upload_id,
        ),
    )?;
    Ok(())
}

pub fn list_uploads(conn: &Connection) -> anyhow::Result<Vec<serde_json::Value>> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, total_records, successful_records, failed_records,
                status, error_details, uploaded_by, created_at
         FROM category_uploads
         ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let error_details: Option<String> = row.get(6)?;
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "filename": row.get::<_, String>(1)?,
                "totalRecords": row.get::<_, i64>(2)?,
                "successfulRecords": row.get::<_, i64>(3)?,
                "failedRecords": row.get::<_, i64>(4)?,
                "status": row.get::<_, String>(5)?,
                "errorDetails": error_details
                    .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
                    .unwrap_or(serde_json::Value::Array(vec![])),
                "uploadedBy": row.get::<_, String>(7)?,
                "createdAt": row.get::<_, String>(8)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
