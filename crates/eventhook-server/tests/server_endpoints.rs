use std::sync::Arc;

use eventhook_remote::InMemoryRemote;
use eventhook_server::{AppConfig, build_app};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

async fn start_server(
    remote: &InMemoryRemote,
) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_app(&AppConfig::default(), Arc::new(remote.clone()));

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

fn app_event(event_type: &str) -> Value {
    json!({
        "eventType": event_type,
        "contextToken": "context-token",
        "appEventProperties": { "hostWebFullUrl": "https://contoso.test/sites/dev" }
    })
}

#[tokio::test]
async fn health_endpoints_work() {
    let remote = InMemoryRemote::new();
    let (base, shutdown_tx, handle) = start_server(&remote).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert!(resp.status().is_success());
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "Eventhook Server");

    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{base}/readyz")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn install_registers_request_address_and_uninstall_cleans_up() {
    let remote = InMemoryRemote::new();
    let (base, shutdown_tx, handle) = start_server(&remote).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/events"))
        .json(&app_event("AppInstalled"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "status": "OK" }));

    let subs = remote.collection("MyList").unwrap().subscriptions.unwrap();
    assert_eq!(subs.len(), 2);
    let expected_endpoint = format!("{base}/events");
    assert!(subs.iter().all(|s| s.endpoint == expected_endpoint));

    let resp = client
        .post(format!("{base}/events"))
        .json(&app_event("AppUninstalling"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "OK");
    assert!(remote.collection("MyList").unwrap().subscriptions.unwrap().is_empty());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn forwarded_address_is_registered() {
    let remote = InMemoryRemote::new();
    let (base, shutdown_tx, handle) = start_server(&remote).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/events"))
        .header("x-forwarded-proto", "https")
        .header("x-forwarded-host", "hooks.contoso.test")
        .json(&app_event("AppInstalled"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "OK");

    let subs = remote.collection("MyList").unwrap().subscriptions.unwrap();
    assert!(subs.iter().all(|s| s.endpoint == "https://hooks.contoso.test/events"));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn item_and_unsupported_events() {
    let remote = InMemoryRemote::new();
    let (base, shutdown_tx, handle) = start_server(&remote).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/events"))
        .json(&json!({
            "eventType": "ItemAdding",
            "itemEventProperties": { "listTitle": "MyList", "afterProperties": { "Title": "x" } }
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "OK");
    let stamped = body["changedItemProperties"]["_ExtendedDescription"]
        .as_str()
        .unwrap();
    assert!(stamped.starts_with("Changed from RER ("));
    assert!(stamped.ends_with(')'));

    let resp = client
        .post(format!("{base}/events"))
        .json(&json!({ "eventType": "ItemDeleted" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "status": "CancelWithError", "errorMessage": "Unsupported event" })
    );
    assert_eq!(remote.round_trips(), 0);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn one_way_events_are_not_implemented() {
    let remote = InMemoryRemote::new();
    let (base, shutdown_tx, handle) = start_server(&remote).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/events/one-way"))
        .json(&app_event("AppInstalled"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_IMPLEMENTED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "not-supported");
    assert_eq!(remote.round_trips(), 0);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn malformed_body_is_rejected_before_dispatch() {
    let remote = InMemoryRemote::new();
    let (base, shutdown_tx, handle) = start_server(&remote).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/events"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let fault: Value = resp.json().await.unwrap();
    assert_eq!(fault["code"], "invalid");
    assert!(!fault["message"].as_str().unwrap().is_empty());

    let resp = client
        .post(format!("{base}/events"))
        .body(app_event("AppInstalled").to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let fault: Value = resp.json().await.unwrap();
    assert_eq!(fault["code"], "not-supported");

    let resp = client
        .post(format!("{base}/events"))
        .json(&json!({ "contextToken": "no event type" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
    let fault: Value = resp.json().await.unwrap();
    assert_eq!(fault["code"], "invalid");

    assert_eq!(remote.round_trips(), 0);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
