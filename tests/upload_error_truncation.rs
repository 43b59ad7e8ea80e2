mod test_support;

use serde_json::json;
use test_support::{new_state, open_workspace, request_err, request_ok, temp_dir};

#[test]
fn response_errors_cap_at_ten_and_audit_at_fifty() {
    let workspace = temp_dir("catalogd-caps");
    let mut state = new_state(&["owner@shop.example"]);
    open_workspace(&mut state, &workspace);

    // 60 rows with no id field at all: every one is a row error.
    let rows: Vec<serde_json::Value> = (0..60)
        .map(|i| json!({ "대분류": format!("무명-{i}") }))
        .collect();
    let result = request_ok(
        &mut state,
        "1",
        "categories.upload",
        json!({ "caller": "owner@shop.example", "filename": "bad.csv", "rows": rows }),
    );
    assert_eq!(result["total"], json!(60));
    assert_eq!(result["successful"], json!(0));
    // The tally carries the true count even though the lists are capped.
    assert_eq!(result["failed"], json!(60));
    assert_eq!(result["status"], json!("completed_with_errors"));
    assert_eq!(result["errors"].as_array().unwrap().len(), 10);

    let uploads = request_ok(&mut state, "2", "uploads.list", json!({}));
    let audit = uploads["uploads"][0].clone();
    assert_eq!(audit["status"], json!("completed_with_errors"));
    assert_eq!(audit["failedRecords"], json!(60));
    assert_eq!(audit["errorDetails"].as_array().unwrap().len(), 50);
}

#[test]
fn oversized_payload_is_rejected_at_the_boundary() {
    let workspace = temp_dir("catalogd-size");
    let mut state = new_state(&["owner@shop.example"]);
    open_workspace(&mut state, &workspace);

    let big = "x".repeat(10 * 1024 * 1024 + 1024);
    let error = request_err(
        &mut state,
        "1",
        "categories.upload",
        json!({
            "caller": "owner@shop.example",
            "filename": "huge.csv",
            "rows": [{ "category_id": "BIG-1", "대분류": big }]
        }),
    );
    assert_eq!(error["code"], json!("payload_too_large"));

    // Rejected before the reconciler and before the audit row.
    let uploads = request_ok(&mut state, "2", "uploads.list", json!({}));
    assert_eq!(uploads["uploads"].as_array().unwrap().len(), 0);
    let listed = request_ok(&mut state, "3", "categories.list", json!({}));
    assert_eq!(listed["count"], json!(0));
}
