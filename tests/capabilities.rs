//! Capability loading over HTTP

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use geoprint_rs::{CapabilityStore, HttpTransport, PrintError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_info(body: &'static str) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/geoprint/pdf/info.json",
            get(move |State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                body
            }),
        )
        .with_state(hits.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/geoprint/pdf", addr), hits)
}

fn transport() -> HttpTransport {
    HttpTransport::new(Duration::from_secs(5), "UTF-8").unwrap()
}

#[tokio::test]
async fn test_loads_once_and_serves_from_cache() {
    let (url, hits) = spawn_info(
        r#"{"layouts": [{"name": "A4", "map": {"width": 500, "height": 700}}],
            "dpis": [{"name": "96", "value": "96"}],
            "outputFormats": [{"name": "pdf"}]}"#,
    )
    .await;
    let store = CapabilityStore::new(BTreeMap::new());
    assert_eq!(store.get().unwrap_err(), PrintError::NotReady);

    let caps = store.load(&transport(), &url).await.unwrap();
    assert_eq!(caps.layouts[0].name, "A4");
    assert_eq!(caps.dpis[0].value, 96.0);
    store.load(&transport(), &url).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let create = store.create_url().unwrap();
    assert_eq!(create.as_str(), format!("{}/create.json", url));
}

#[tokio::test]
async fn test_malformed_document_is_a_capabilities_error() {
    let (url, _) = spawn_info("<ServiceException>down</ServiceException>").await;
    let store = CapabilityStore::new(BTreeMap::new());
    let err = store.load(&transport(), &url).await.unwrap_err();
    assert!(matches!(err, PrintError::Capabilities(_)), "got {:?}", err);
    assert!(!store.is_loaded());
}

#[tokio::test]
async fn test_unreachable_service_is_a_transport_error() {
    // bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = CapabilityStore::new(BTreeMap::new());
    let err = store
        .load(&transport(), &format!("http://{}/geoprint/pdf", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, PrintError::Transport(_)), "got {:?}", err);
}
