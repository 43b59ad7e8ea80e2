use catalogd::reconcile::{
    reconcile_upload, CategoryStore, IncomingCategory, UploadStatus, BATCH_SIZE,
};
use serde_json::json;
use std::collections::HashSet;

/// Fails the bulk insert on selected batch-insert calls; updates always work.
struct FlakyStore {
    fail_on_calls: Vec<usize>,
    insert_calls: usize,
    inserted: Vec<String>,
}

impl FlakyStore {
    fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_on_calls: calls.to_vec(),
            insert_calls: 0,
            inserted: Vec::new(),
        }
    }
}

impl CategoryStore for FlakyStore {
    fn existing_ids(&mut self) -> anyhow::Result<HashSet<String>> {
        Ok(HashSet::new())
    }

    fn bulk_insert(&mut self, rows: &[IncomingCategory]) -> anyhow::Result<()> {
        self.insert_calls += 1;
        if self.fail_on_calls.contains(&self.insert_calls) {
            anyhow::bail!("disk full");
        }
        self.inserted
            .extend(rows.iter().map(|r| r.category_id.clone()));
        Ok(())
    }

    fn update_one(&mut self, _row: &IncomingCategory) -> anyhow::Result<()> {
        Ok(())
    }
}

fn new_rows(n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| json!({ "category_id": format!("ID-{i:04}"), "대분류": "식품" }))
        .collect()
}

#[test]
fn failed_bulk_insert_fails_the_whole_insert_set() {
    let mut store = FlakyStore::failing_on(&[1]);
    let rows = new_rows(7);
    let summary = reconcile_upload(&mut store, &rows).unwrap();

    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.successful, 0);
    assert_eq!(summary.failed, 7);
    assert_eq!(summary.status, UploadStatus::CompletedWithErrors);
    // One entry for the batch, not one per row.
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].code, "bulk_insert_failed");
    assert_eq!(summary.errors[0].affected, Some(7));
}

#[test]
fn middle_batch_failure_leaves_other_batches_intact() {
    // 120 all-new rows -> batches of 50, 50, 20. Batch 2's bulk insert fails.
    let mut store = FlakyStore::failing_on(&[2]);
    let rows = new_rows(120);
    let summary = reconcile_upload(&mut store, &rows).unwrap();

    assert_eq!(summary.total, 120);
    assert_eq!(summary.inserted, 70);
    assert_eq!(summary.successful, 70);
    assert_eq!(summary.failed, 50);
    assert_eq!(summary.status, UploadStatus::CompletedWithErrors);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].affected, Some(BATCH_SIZE));
    assert_eq!(store.inserted.len(), 70);
    // Batches run strictly in order: batch 1 then batch 3.
    assert_eq!(store.inserted[0], "ID-0000");
    assert_eq!(store.inserted[69], "ID-0119");
}

struct BrokenStore;

impl CategoryStore for BrokenStore {
    fn existing_ids(&mut self) -> anyhow::Result<HashSet<String>> {
        anyhow::bail!("cannot read categories table")
    }

    fn bulk_insert(&mut self, _rows: &[IncomingCategory]) -> anyhow::Result<()> {
        unreachable!("must not be reached when seeding fails")
    }

    fn update_one(&mut self, _row: &IncomingCategory) -> anyhow::Result<()> {
        unreachable!("must not be reached when seeding fails")
    }
}

#[test]
fn failure_before_any_row_is_fatal() {
    let mut store = BrokenStore;
    let rows = new_rows(3);
    let err = reconcile_upload(&mut store, &rows).unwrap_err();
    assert!(err.to_string().contains("cannot read categories table"));
}

/// Updates are applied one at a time; a failing update only fails its row.
struct UpdateRejectsStore {
    reject_id: String,
    existing: HashSet<String>,
}

impl CategoryStore for UpdateRejectsStore {
    fn existing_ids(&mut self) -> anyhow::Result<HashSet<String>> {
        Ok(self.existing.clone())
    }

    fn bulk_insert(&mut self, _rows: &[IncomingCategory]) -> anyhow::Result<()> {
        Ok(())
    }

    fn update_one(&mut self, row: &IncomingCategory) -> anyhow::Result<()> {
        if row.category_id == self.reject_id {
            anyhow::bail!("constraint violation");
        }
        Ok(())
    }
}

#[test]
fn per_row_update_failure_is_recorded_independently() {
    let mut store = UpdateRejectsStore {
        reject_id: "U2".to_string(),
        existing: ["U1", "U2", "U3"].iter().map(|s| s.to_string()).collect(),
    };
    let rows = vec![
        json!({ "category_id": "U1", "대분류": "식품" }),
        json!({ "category_id": "U2", "대분류": "식품" }),
        json!({ "category_id": "U3", "대분류": "식품" }),
    ];
    let summary = reconcile_upload(&mut store, &rows).unwrap();
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].code, "update_failed");
    assert_eq!(summary.errors[0].category_id, Some("U2".to_string()));
    assert_eq!(summary.errors[0].row, Some(1));
}
