//! Mock-based tests for the resource-group fixture lifecycle.
//!
//! Each test points a fresh [`AuthCell`] at a temp auth file whose
//! endpoints resolve to the mock server.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::constants::*;
use crate::common::*;

use azure_aci::fixture::{
    self, AuthCell, Fixture, FixtureError, FixtureSettings, Suite, TestContext, TestResult,
    SETUP_FAILURE, SUITE_PANIC,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Matches any group created from the default base name.
const GROUP_PATH_PATTERN: &str =
    r"^/subscriptions/test-sub/resourcegroups/virtual-node-test-rg-[0-9a-f]{6}$";

fn settings(auth_file: PathBuf) -> FixtureSettings {
    FixtureSettings {
        retry: fast_retry(0),
        auth_location: Some(auth_file),
        ..FixtureSettings::default()
    }
}

async fn mount_create(server: &MockServer, status: u16) {
    let response = if status < 300 {
        ResponseTemplate::new(status).set_body_json(mock_group_response(
            "virtual-node-test-rg-abcdef",
            LOCATION,
            "Succeeded",
        ))
    } else {
        ResponseTemplate::new(status).set_body_json(mock_error_response(
            "AuthorizationFailed",
            "does not have authorization to perform action",
        ))
    };

    Mock::given(method("PUT"))
        .and(path_regex(GROUP_PATH_PATTERN))
        .and(body_partial_json(json!({ "location": LOCATION })))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_delete(server: &MockServer, status: u16, times: u64) {
    Mock::given(method("DELETE"))
        .and(path_regex(GROUP_PATH_PATTERN))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

async fn always_fails(_ctx: TestContext) -> TestResult {
    Err("expected failure".into())
}

async fn panicking_suite(_ctx: TestContext) -> i32 {
    panic!("suite exploded")
}

// =============================================================================
// Full Lifecycle
// =============================================================================

#[tokio::test]
async fn test_lifecycle_success() {
    let server = setup_mock_server().await;
    mount_token(&server).await;
    mount_create(&server, 201).await;
    mount_delete(&server, 202, 1).await;

    let auth_file = write_auth_file(&server.uri());
    let cell = AuthCell::new();

    let code = fixture::run(
        &settings(auth_file.path().to_path_buf()),
        &cell,
        |_ctx: TestContext| async { 0 },
    )
    .await;

    assert_eq!(code, 0);
    assert!(cell.is_initialized());
}

#[tokio::test]
async fn test_suite_sees_created_group() {
    let server = setup_mock_server().await;
    mount_token(&server).await;
    mount_create(&server, 201).await;
    mount_delete(&server, 202, 1).await;

    let auth_file = write_auth_file(&server.uri());
    let seen = Rc::new(RefCell::new(None));
    let seen_by_suite = Rc::clone(&seen);

    let code = fixture::run(
        &settings(auth_file.path().to_path_buf()),
        &AuthCell::new(),
        move |ctx: TestContext| async move {
            *seen_by_suite.borrow_mut() = Some(ctx.resource_group().to_string());
            0
        },
    )
    .await;
    assert_eq!(code, 0);

    let name = seen.borrow().clone().expect("suite ran");
    let requests = server.received_requests().await.unwrap_or_default();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .expect("group was created");
    let delete = requests
        .iter()
        .find(|r| r.method.as_str() == "DELETE")
        .expect("group was deleted");

    assert_eq!(put.url.path(), group_path(&name));
    assert_eq!(delete.url.path(), group_path(&name));
}

#[tokio::test]
async fn test_exit_code_survives_teardown_failure() {
    let server = setup_mock_server().await;
    mount_token(&server).await;
    mount_create(&server, 201).await;
    mount_delete(&server, 500, 1).await;

    let auth_file = write_auth_file(&server.uri());
    let code = fixture::run(
        &settings(auth_file.path().to_path_buf()),
        &AuthCell::new(),
        |_ctx: TestContext| async { 7 },
    )
    .await;

    assert_eq!(code, 7);
}

#[tokio::test]
async fn test_success_survives_teardown_failure() {
    let server = setup_mock_server().await;
    mount_token(&server).await;
    mount_create(&server, 201).await;
    mount_delete(&server, 409, 1).await;

    let auth_file = write_auth_file(&server.uri());
    let code = fixture::run(
        &settings(auth_file.path().to_path_buf()),
        &AuthCell::new(),
        |_ctx: TestContext| async { 0 },
    )
    .await;

    assert_eq!(code, 0);
}

#[tokio::test]
async fn test_teardown_runs_after_failing_suite() {
    let server = setup_mock_server().await;
    mount_token(&server).await;
    mount_create(&server, 201).await;
    // expect(1) is verified when the server drops
    mount_delete(&server, 202, 1).await;

    let auth_file = write_auth_file(&server.uri());
    let suite = Suite::new().case("always_fails", always_fails);

    let code = fixture::run(&settings(auth_file.path().to_path_buf()), &AuthCell::new(), suite).await;
    assert_eq!(code, 1);
}

#[tokio::test]
async fn test_teardown_runs_after_panicking_suite() {
    let server = setup_mock_server().await;
    mount_token(&server).await;
    mount_create(&server, 201).await;
    mount_delete(&server, 202, 1).await;

    let auth_file = write_auth_file(&server.uri());
    let code = fixture::run(
        &settings(auth_file.path().to_path_buf()),
        &AuthCell::new(),
        panicking_suite,
    )
    .await;

    assert_eq!(code, SUITE_PANIC);
}

// =============================================================================
// Setup Failures
// =============================================================================

#[tokio::test]
async fn test_create_failure_aborts_before_suite() {
    let server = setup_mock_server().await;
    mount_token(&server).await;
    mount_create(&server, 403).await;
    mount_delete(&server, 202, 0).await;

    let auth_file = write_auth_file(&server.uri());
    let ran = Arc::new(AtomicBool::new(false));
    let ran_in_suite = Arc::clone(&ran);

    let code = fixture::run(
        &settings(auth_file.path().to_path_buf()),
        &AuthCell::new(),
        move |_ctx: TestContext| async move {
            ran_in_suite.store(true, Ordering::SeqCst);
            0
        },
    )
    .await;

    assert_eq!(code, SETUP_FAILURE);
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_missing_credentials_abort_without_requests() {
    let server = setup_mock_server().await;

    let cell = AuthCell::new();
    let code = fixture::run(
        &settings(PathBuf::from("/definitely/not/an/auth/file.json")),
        &cell,
        |_ctx: TestContext| async { 0 },
    )
    .await;

    assert_eq!(code, SETUP_FAILURE);
    assert!(cell.is_initialized());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

// =============================================================================
// Step-by-step API
// =============================================================================

#[tokio::test]
async fn test_step_by_step_lifecycle() {
    let server = setup_mock_server().await;
    mount_token(&server).await;
    mount_create(&server, 201).await;
    mount_delete(&server, 500, 1).await;

    let auth_file = write_auth_file(&server.uri());
    let cell = AuthCell::new();
    let ctx = Fixture::initialize(&settings(auth_file.path().to_path_buf()), &cell)
        .expect("Failed to initialize");
    assert_eq!(ctx.authentication().subscription_id, SUBSCRIPTION_ID);

    let fixture = Fixture::set_up(ctx).await.expect("Failed to set up");
    let group = fixture.context().resource_group().to_string();

    let code = fixture.run_suite(|_ctx: TestContext| async { 3 }).await;
    assert_eq!(code, 3);

    match fixture.tear_down().await {
        Err(FixtureError::DeleteGroup { name, .. }) => assert_eq!(name, group),
        other => panic!("Expected delete failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_set_up_reports_create_failure() {
    let server = setup_mock_server().await;
    mount_token(&server).await;
    mount_create(&server, 403).await;

    let auth_file = write_auth_file(&server.uri());
    let ctx = Fixture::initialize(&settings(auth_file.path().to_path_buf()), &AuthCell::new())
        .expect("Failed to initialize");
    let group = ctx.resource_group().to_string();

    match Fixture::set_up(ctx).await {
        Err(FixtureError::CreateGroup { name, source }) => {
            assert_eq!(name, group);
            assert!(matches!(source, azure_aci::ApiError::Unauthorized));
        }
        other => panic!("Expected create failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_scoped_client_reaches_group() {
    let server = setup_mock_server().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path_regex(
            r"^/subscriptions/test-sub/resourceGroups/virtual-node-test-rg-[0-9a-f]{6}/providers/Microsoft.Network/virtualNetworks/vnet1$",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(network::mock_vnet_response(
            "any",
            "vnet1",
            vec!["10.1.0.0/16"],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let auth_file = write_auth_file(&server.uri());
    let ctx = Fixture::initialize(&settings(auth_file.path().to_path_buf()), &AuthCell::new())
        .expect("Failed to initialize");

    let client = ctx.new_scoped_client().expect("Failed to build client");
    let vnet = client
        .get_vnet(ctx.resource_group(), "vnet1")
        .await
        .expect("Failed to get vnet");
    assert_eq!(vnet.name, "vnet1");
}
