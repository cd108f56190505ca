//! End-to-end selection flows through the public API.
//!
//! These tests drive the controller the way application test-setup code
//! does: declare bindings, group them, switch presets, and resolve requests
//! as the mocking runtime would.

use assert_json_diff::assert_json_eq;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use switchboard::endpoint::HttpMethod;
use switchboard::runtime::{NoopRuntime, RecordingRuntime, RuntimeCall};
use switchboard::{
    extend_handlers_with, HandlerBinding, MockError, Preset, Profile, Registry, RequestContext,
    ScenarioController, UseMock,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "switchboard=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn users_api(registry: &Arc<Registry>) -> HandlerBinding {
    HandlerBinding::new(registry, HttpMethod::Get, "/api/users", |_ctx| async {
        json!({"users": [{"id": 1, "name": "John"}]})
    })
    .presets([
        Preset::json("empty", 200, json!({"users": []})),
        Preset::json("withUsers", 200, json!({"users": [{"id": 1, "name": "John"}]})),
    ])
}

fn setup() -> (ScenarioController, Arc<Registry>) {
    let registry = Arc::new(Registry::new());
    let users = users_api(&registry);
    let controller = extend_handlers_with([users], Arc::clone(&registry), Arc::new(NoopRuntime));
    (controller, registry)
}

async fn fetch_users(controller: &ScenarioController) -> switchboard::MockResponse {
    controller
        .handler(HttpMethod::Get, "/api/users")
        .unwrap()
        .resolve(RequestContext::new(HttpMethod::Get, "/api/users"))
        .await
}

#[tokio::test]
async fn switching_presets_switches_the_served_body() {
    init_tracing();
    let (controller, _registry) = setup();

    controller
        .use_mock(UseMock::preset(HttpMethod::Get, "/api/users", "empty"))
        .unwrap();
    let response = fetch_users(&controller).await;
    assert_eq!(response.status, 200);
    assert_json_eq!(response.body, json!({"users": []}));

    controller
        .use_mock(UseMock::preset(HttpMethod::Get, "/api/users", "withUsers"))
        .unwrap();
    let response = fetch_users(&controller).await;
    assert_eq!(response.status, 200);
    assert_json_eq!(response.body, json!({"users": [{"id": 1, "name": "John"}]}));
}

#[tokio::test]
async fn unknown_preset_label_fails_loudly() {
    let (controller, _registry) = setup();
    let err = controller
        .use_mock(UseMock::preset(HttpMethod::Get, "/api/users", "nope"))
        .unwrap_err();
    assert!(err.to_string().contains("Preset not found: nope"));
    assert!(matches!(err, MockError::PresetNotFound(_)));

    // The failed call changed nothing: the default resolver still answers.
    let response = fetch_users(&controller).await;
    assert_json_eq!(response.body, json!({"users": [{"id": 1, "name": "John"}]}));
}

#[tokio::test]
async fn override_enriches_the_response_without_touching_the_preset() {
    let (controller, _registry) = setup();
    controller
        .use_mock(
            UseMock::preset(HttpMethod::Get, "/api/users", "withUsers").with_override(|body| {
                body["users"]
                    .as_array_mut()
                    .expect("users array")
                    .push(json!({"id": 2, "name": "Jane"}));
            }),
        )
        .unwrap();

    let response = fetch_users(&controller).await;
    assert_json_eq!(
        response.body,
        json!({"users": [{"id": 1, "name": "John"}, {"id": 2, "name": "Jane"}]})
    );

    // The stored preset still holds the original single-user body.
    let stored = controller
        .handler(HttpMethod::Get, "/api/users")
        .unwrap()
        .get_current_preset()
        .unwrap();
    match stored.response {
        switchboard::preset::PresetResponse::Static(body) => {
            assert_json_eq!(body, json!({"users": [{"id": 1, "name": "John"}]}))
        }
        _ => panic!("expected static preset"),
    }
}

#[tokio::test]
async fn real_api_sentinel_hides_the_endpoint_but_keeps_it_working() {
    let (controller, _registry) = setup();
    controller
        .use_mock(UseMock::preset(HttpMethod::Get, "/api/users", "empty"))
        .unwrap();
    controller
        .use_real_api(HttpMethod::Get, "/api/users")
        .unwrap();

    assert!(controller.get_current_status().is_empty());
    assert!(controller
        .handler(HttpMethod::Get, "/api/users")
        .unwrap()
        .get_current_preset()
        .is_none());

    let response = fetch_users(&controller).await;
    assert_eq!(response.status, 200);
    assert_json_eq!(response.body, json!({"users": [{"id": 1, "name": "John"}]}));
}

#[tokio::test]
async fn profile_switching_is_atomic_across_endpoints() {
    let registry = Arc::new(Registry::new());
    let users = users_api(&registry);
    let orders = HandlerBinding::new(&registry, HttpMethod::Get, "/api/orders", |_ctx| async {
        json!({"orders": [{"id": 10}]})
    })
    .presets([Preset::json("empty", 200, json!({"orders": []}))]);

    let controller =
        extend_handlers_with([users, orders], Arc::clone(&registry), Arc::new(NoopRuntime));
    let profiles = controller.create_mock_profiles([
        Profile::new("Empty State", |ctx| {
            ctx.use_mock(UseMock::preset(HttpMethod::Get, "/api/users", "empty"))?;
            ctx.use_mock(UseMock::preset(HttpMethod::Get, "/api/orders", "empty"))?;
            Ok(())
        }),
        Profile::new("Users Only", |ctx| {
            ctx.use_mock(UseMock::preset(HttpMethod::Get, "/api/users", "withUsers"))
        }),
    ]);

    profiles.use_mock("Empty State").unwrap();
    assert_eq!(
        profiles.get_current_profile().as_deref(),
        Some("Empty State")
    );

    profiles.use_mock("Users Only").unwrap();
    // Orders was configured only under "Empty State" and reverted.
    let orders_response = controller
        .handler(HttpMethod::Get, "/api/orders")
        .unwrap()
        .resolve(RequestContext::new(HttpMethod::Get, "/api/orders"))
        .await;
    assert_json_eq!(orders_response.body, json!({"orders": [{"id": 10}]}));

    profiles.reset();
    assert!(profiles.get_current_profile().is_none());
    let response = fetch_users(&controller).await;
    assert_json_eq!(response.body, json!({"users": [{"id": 1, "name": "John"}]}));
}

#[tokio::test]
async fn every_mutation_reregisters_the_runtime_before_notifying() {
    let registry = Arc::new(Registry::new());
    let runtime = Arc::new(RecordingRuntime::new());
    let users = users_api(&registry);
    let controller = extend_handlers_with(
        [users],
        Arc::clone(&registry),
        Arc::clone(&runtime) as Arc<dyn switchboard::runtime::MockRuntime>,
    );

    let calls_seen_by_subscriber: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls_seen_by_subscriber);
    let observer = Arc::clone(&runtime);
    let _sub = controller.subscribe_to_changes(move |_snapshot| {
        sink.lock().push(observer.calls().len());
    });

    controller
        .use_mock(UseMock::preset(HttpMethod::Get, "/api/users", "empty"))
        .unwrap();
    controller
        .use_real_api(HttpMethod::Get, "/api/users")
        .unwrap();
    controller.reset();

    let calls = runtime.calls();
    assert!(matches!(calls[0], RuntimeCall::Use(_)));
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, RuntimeCall::Reset(_)))
            .count(),
        3
    );
    // Each notification observed the collaborator already updated:
    // 1 use + N resets at each point.
    assert_eq!(*calls_seen_by_subscriber.lock(), vec![2, 3, 4]);
}
