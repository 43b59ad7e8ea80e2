//! Batch upload reconciliation: normalize heterogeneous rows, classify each
//! as insert or update against the known id set, and apply writes in fixed
//! batches with per-row error capture.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::taxonomy;

pub const BATCH_SIZE: usize = 50;
/// Row errors persisted to the audit record.
pub const MAX_AUDIT_ERRORS: usize = 50;
/// Row errors returned synchronously to the caller.
pub const MAX_RESPONSE_ERRORS: usize = 10;

// Accepted header aliases per logical field, first-match-wins. CSV uploads
// arrive with Korean or English headers; JSON uploads use either convention.
const ID_ALIASES: &[&str] = &["카테고리번호", "category_id", "categoryId", "카테고리ID"];
const NAME_ALIASES: &[&str] = &["카테고리명", "category_name", "categoryName"];
const PARENT_ALIASES: &[&str] = &["상위카테고리번호", "parent_category_id", "parentCategoryId"];
const LARGE_ALIASES: &[&str] = &["대분류", "large_category", "largeCategory"];
const MEDIUM_ALIASES: &[&str] = &["중분류", "medium_category", "mediumCategory"];
const SMALL_ALIASES: &[&str] = &["소분류", "small_category", "smallCategory"];
const SMALLEST_ALIASES: &[&str] = &["세분류", "smallest_category", "smallestCategory"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub code: String,
    pub message: String,
    /// Set on batch-level failures: how many rows the single entry covers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected: Option<usize>,
}

impl RowError {
    fn for_row(row: usize, code: &str, message: impl Into<String>) -> Self {
        Self {
            row: Some(row),
            category_id: None,
            code: code.to_string(),
            message: message.into(),
            affected: None,
        }
    }
}

/// A normalized row ready to be written. Timestamps and the active flag are
/// assigned by the store; `is_active` is always true through this path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCategory {
    pub category_id: String,
    pub category_name: String,
    pub category_path: String,
    pub category_level: i64,
    pub parent_category_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Processing,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::CompletedWithErrors => "completed_with_errors",
            UploadStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub total: usize,
    pub inserted: usize,
    pub updated: usize,
    pub successful: usize,
    pub failed: usize,
    pub status: UploadStatus,
    /// Capped at `MAX_AUDIT_ERRORS`; `failed` carries the true count.
    pub errors: Vec<RowError>,
}

impl UploadSummary {
    /// Truncated view for the synchronous response.
    pub fn response_errors(&self) -> &[RowError] {
        let n = self.errors.len().min(MAX_RESPONSE_ERRORS);
        &self.errors[..n]
    }
}

/// Write seam for the reconciler. The SQLite implementation lives in the
/// uploads handler; tests substitute failing doubles to exercise the
/// batch-failure contract.
pub trait CategoryStore {
    /// Full id set (active and inactive) seeding the insert/update split.
    fn existing_ids(&mut self) -> anyhow::Result<HashSet<String>>;
    /// Apply a batch's insert set as one bulk operation. An error means the
    /// whole set failed; no partial success is assumed.
    fn bulk_insert(&mut self, rows: &[IncomingCategory]) -> anyhow::Result<()>;
    /// Apply a single update row.
    fn update_one(&mut self, row: &IncomingCategory) -> anyhow::Result<()>;
}

fn field(row: &Value, aliases: &[&str]) -> Option<String> {
    for alias in aliases {
        let got = match row.get(alias) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        if let Some(v) = got {
            let v = v.trim().to_string();
            if !v.is_empty() {
                return Some(v);
            }
        }
    }
    None
}

/// Normalize one raw row. `index` is the 0-based position in the upload,
/// reported back in row errors.
pub fn normalize_row(index: usize, raw: &Value) -> Result<IncomingCategory, RowError> {
    if !raw.is_object() {
        return Err(RowError::for_row(index, "bad_row", "row is not an object"));
    }

    let Some(category_id) = field(raw, ID_ALIASES) else {
        return Err(RowError::for_row(
            index,
            "missing_id",
            "no category id field found",
        ));
    };

    let segments = [
        field(raw, LARGE_ALIASES).unwrap_or_default(),
        field(raw, MEDIUM_ALIASES).unwrap_or_default(),
        field(raw, SMALL_ALIASES).unwrap_or_default(),
        field(raw, SMALLEST_ALIASES).unwrap_or_default(),
    ];
    let mut category_path = taxonomy::build_path(segments.iter().map(String::as_str));
    let explicit_name = field(raw, NAME_ALIASES);

    // Name: explicit field first, else the deepest populated segment (which
    // is also the first when all deeper ones are empty).
    let derived_name = segments
        .iter()
        .rev()
        .find(|s| !s.is_empty())
        .cloned();
    let category_name = match explicit_name.or(derived_name) {
        Some(n) => n,
        None => {
            return Err(RowError::for_row(
                index,
                "missing_name",
                "no category name or level fields found",
            ))
        }
    };

    // Rows carrying only an explicit name get a single-segment path so the
    // level/path invariant holds.
    if category_path.is_empty() {
        category_path = category_name.clone();
    }
    let category_level = taxonomy::actual_level(&category_path);

    // Parent linkage only makes sense below the root.
    let parent_category_id = if category_level > 1 {
        field(raw, PARENT_ALIASES)
    } else {
        None
    };

    Ok(IncomingCategory {
        category_id,
        category_name,
        category_path,
        category_level,
        parent_category_id,
    })
}

/// Run the full reconciliation over `rows`. Batches are processed strictly
/// in order; the id set is mutated as inserts are classified, so a duplicate
/// id later in the same run classifies as an update. Returns `Err` only for
/// failures before any row is processed (the caller records those as a
/// `failed` run).
pub fn reconcile_upload(
    store: &mut dyn CategoryStore,
    rows: &[Value],
) -> anyhow::Result<UploadSummary> {
    let mut existing = store.existing_ids()?;

    let mut inserted = 0usize;
    let mut updated = 0usize;
    let mut failed = 0usize;
    let mut errors: Vec<RowError> = Vec::new();
    let push_error = |errors: &mut Vec<RowError>, e: RowError| {
        if errors.len() < MAX_AUDIT_ERRORS {
            errors.push(e);
        }
    };

    for (batch_no, batch) in rows.chunks(BATCH_SIZE).enumerate() {
        let mut to_insert: Vec<IncomingCategory> = Vec::new();
        let mut to_update: Vec<(usize, IncomingCategory)> = Vec::new();

        for (offset, raw) in batch.iter().enumerate() {
            let index = batch_no * BATCH_SIZE + offset;
            match normalize_row(index, raw) {
                Ok(row) => {
                    if existing.contains(&row.category_id) {
                        to_update.push((index, row));
                    } else {
                        existing.insert(row.category_id.clone());
                        to_insert.push(row);
                    }
                }
                Err(e) => {
                    failed += 1;
                    push_error(&mut errors, e);
                }
            }
        }

        // Insert phase: one bulk write, all-or-nothing for this batch.
        if !to_insert.is_empty() {
            match store.bulk_insert(&to_insert) {
                Ok(()) => inserted += to_insert.len(),
                Err(e) => {
                    failed += to_insert.len();
                    warn!(batch = batch_no, affected = to_insert.len(), error = %e, "bulk insert failed");
                    push_error(
                        &mut errors,
                        RowError {
                            row: None,
                            category_id: None,
                            code: "bulk_insert_failed".to_string(),
                            message: e.to_string(),
                            affected: Some(to_insert.len()),
                        },
                    );
                }
            }
        }

        // Update phase: one row at a time, each recorded independently.
        for (index, row) in to_update {
            match store.update_one(&row) {
                Ok(()) => updated += 1,
                Err(e) => {
                    failed += 1;
                    push_error(
                        &mut errors,
                        RowError {
                            row: Some(index),
                            category_id: Some(row.category_id.clone()),
                            code: "update_failed".to_string(),
                            message: e.to_string(),
                            affected: None,
                        },
                    );
                }
            }
        }
    }

    let successful = inserted + updated;
    let status = if failed == 0 {
        UploadStatus::Completed
    } else {
        UploadStatus::CompletedWithErrors
    };
    info!(
        total = rows.len(),
        inserted, updated, failed, "upload reconciled"
    );

    Ok(UploadSummary {
        total: rows.len(),
        inserted,
        updated,
        successful,
        failed,
        status,
        errors,
    })
}

/// Parse raw CSV text into the same row shape JSON uploads use: one object
/// per record, header cells as keys. Ragged rows are tolerated; alias
/// resolution decides what is usable.
pub fn rows_from_csv(text: &str) -> anyhow::Result<Vec<Value>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut obj = serde_json::Map::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let cell = record.get(i).unwrap_or_default();
            obj.insert(header.to_string(), Value::String(cell.to_string()));
        }
        rows.push(Value::Object(obj));
    }
    Ok(rows)
}
