//! Operator endpoint integration tests.

mod common;

use common::{TestHarness, ADMIN_KEY, PASSWORD};
use serde_json::{json, Value};

use bluemoon_store::{keys, KvStore};

#[tokio::test]
async fn reconcile_requires_admin_key() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/admin/reconcile")
        .await
        .assert_status_unauthorized();
    harness
        .server
        .post("/admin/reconcile")
        .add_header("x-admin-key", "nope".to_string())
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn reconcile_without_admin_key_configured_is_refused() {
    let harness = TestHarness::with_config(|config| config.admin_api_key = None);

    harness
        .server
        .post("/admin/reconcile")
        .add_header("x-admin-key", ADMIN_KEY.to_string())
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn consistent_store_reports_clean() {
    let harness = TestHarness::new();
    harness
        .register_resident(
            "5",
            "0901000001",
            json!({ "email": "lan@example.com", "residency_status": "household head" }),
        )
        .await;
    harness.create_payment(1, 300_000).await;

    let response = harness
        .server
        .post("/admin/reconcile")
        .add_header("x-admin-key", ADMIN_KEY.to_string())
        .await;

    response.assert_status_ok();
    let report: Value = response.json();
    assert_eq!(report["entries_repaired"], 0);
    assert_eq!(report["entries_removed"], 0);
    assert_eq!(report["listing_members_added"], 0);
    assert_eq!(report["listing_members_rescored"], 0);
    assert_eq!(report["records_scanned"]["resident"], 1);
    assert_eq!(report["records_scanned"]["payment"], 1);
}

#[tokio::test]
async fn reconcile_restores_a_lost_login_entry() {
    let harness = TestHarness::new();
    harness
        .register_resident("5", "0901000001", json!({ "email": "lan@example.com" }))
        .await;
    assert!(harness
        .store
        .delete(&keys::login_email_key("lan@example.com"))
        .unwrap());

    let login = json!({ "username": "lan@example.com", "password": PASSWORD, "role": "resident" });
    harness
        .server
        .post("/login")
        .json(&login)
        .await
        .assert_status_not_found();

    let report: Value = harness
        .server
        .post("/admin/reconcile")
        .add_header("x-admin-key", ADMIN_KEY.to_string())
        .await
        .json();
    assert!(report["entries_repaired"].as_u64().unwrap() >= 1);

    harness
        .server
        .post("/login")
        .json(&login)
        .await
        .assert_status_ok();
}
