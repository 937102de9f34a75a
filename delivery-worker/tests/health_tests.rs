use delivery_worker::health;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[tokio::test]
async fn test_health_reports_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, health::router()).await.unwrap();
    });

    let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"status": "healthy", "service": "delivery-worker"})
    );
}
