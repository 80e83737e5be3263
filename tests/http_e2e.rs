//! End-to-end tests over HTTP against an in-process server.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use task_manager_server::{App, AppError, ServerConfig};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), AppError>>,
}

impl TestServer {
    async fn start(io_duration: Duration) -> Self {
        let mut config = ServerConfig::default();
        config.http.host = "127.0.0.1".into();
        config.executor.io_duration_ms = io_duration.as_millis() as u64;
        config.app.shutdown_timeout_ms = 2_000;

        let app = App::new(config).expect("valid config");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            app.serve(listener, async {
                let _ = rx.await;
            })
            .await
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            shutdown: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn post(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.post(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn create(&self) -> String {
        let (status, body) = self.post("/api/v1/tasks").await;
        assert_eq!(status, StatusCode::OK);
        body["task_uuid"].as_str().unwrap().to_string()
    }

    async fn wait_for_status(&self, id: &str, expected: &str) -> Value {
        let path = format!("/api/v1/tasks/{id}/status");
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let (status, body) = self.get(&path).await;
                assert_eq!(status, StatusCode::OK);
                if body["status"] == expected {
                    return body;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("task {id} never reached {expected}"))
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server shuts down")
            .unwrap()
            .unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn task_lifecycle_over_http() {
    let server = TestServer::start(Duration::from_millis(100)).await;

    let id = server.create().await;

    let (status, body) = server.get(&format!("/api/v1/tasks/{id}/status")).await;
    assert_eq!(status, StatusCode::OK);
    let initial = body["status"].as_str().unwrap();
    assert!(initial == "pending" || initial == "running", "got {initial}");
    assert!(body["created_at"].as_str().unwrap().ends_with('Z'));

    let done = server.wait_for_status(&id, "completed").await;
    assert_eq!(done["result"]["message"], "I/O operation completed");
    assert_eq!(done["result"]["bytes"], 1024);
    assert_eq!(done["result"]["task"], id.as_str());
    assert!(done.get("error").is_none());
    assert_ne!(done["duration"], "0s");

    let (status, body) = server.get("/api/v1/tasks").await;
    assert_eq!(status, StatusCode::OK);
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["uuid"], id.as_str());
    assert_eq!(tasks[0]["status"], "completed");
    assert_eq!(tasks[0]["result"]["bytes"], 1024);

    // Completed tasks cannot be cancelled.
    let (status, body) = server.post(&format!("/api/v1/tasks/{id}/cancel")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "cant_be_canceled");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_running_task_over_http() {
    let server = TestServer::start(Duration::from_secs(30)).await;

    let id = server.create().await;
    server.wait_for_status(&id, "running").await;

    let (status, body) = server.post(&format!("/api/v1/tasks/{id}/cancel")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task cancelled successfully");

    let cancelled = server.wait_for_status(&id, "canceled").await;
    assert!(cancelled.get("result").is_none());

    let (status, body) = server.post(&format!("/api/v1/tasks/{id}/cancel")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "cant_be_canceled");

    server.stop().await;
}

#[tokio::test]
async fn unknown_tasks_and_routes() {
    let server = TestServer::start(Duration::from_millis(10)).await;

    let (status, body) = server.get("/api/v1/tasks/missing/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], "Task not found");

    let (status, body) = server.post("/api/v1/tasks/missing/cancel").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = server.get("/api/v2/anything").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let response = server
        .client
        .delete(server.url("/api/v1/tasks"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    server.stop().await;
}

#[tokio::test]
async fn empty_list_and_cors_headers() {
    let server = TestServer::start(Duration::from_millis(10)).await;

    let response = server
        .client
        .get(server.url("/api/v1/tasks"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tasks"].as_array().unwrap().len(), 0);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_drains_in_flight_tasks() {
    let server = TestServer::start(Duration::from_millis(150)).await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(server.create().await);
    }

    // Shutdown returns only after the pool finished the accepted work.
    let started = std::time::Instant::now();
    server.stop().await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(ids.len(), 3);
}
