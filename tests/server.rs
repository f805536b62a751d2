use reqwest::Client;
use runrs::config::AppConfig;
use runrs::{Framework, HandlerRegistry};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

// Test client wrapper for making calls against a spawned server
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }
}

async fn spawn_server(webapps: &std::path::Path) -> TestClient {
    let mut config = AppConfig::default();
    config.framework.webapps_dir = webapps.to_string_lossy().to_string();
    config.framework.default_app = "demo".to_string();

    let framework = Arc::new(Framework::new(config, HandlerRegistry::new()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        runrs::serve(framework, listener).await.unwrap();
    });

    TestClient::new(format!("http://{}", address))
}

#[tokio::test]
async fn test_server_smoke() {
    let webapps = tempfile::tempdir().unwrap();
    let views = webapps.path().join("demo/views");
    std::fs::create_dir_all(&views).unwrap();
    std::fs::write(views.join("index.html"), "<p>welcome</p>").unwrap();

    let client = spawn_server(webapps.path()).await;

    let health = client.get("/health").await.unwrap();
    assert_eq!(health.status(), 200);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    let home = client.get("/").await.unwrap();
    assert_eq!(home.status(), 200);
    assert_eq!(home.text().await.unwrap(), "<p>welcome</p>");

    let missing = client.get("/nope.json").await.unwrap();
    assert_eq!(missing.status(), 404);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Page not found");
}
