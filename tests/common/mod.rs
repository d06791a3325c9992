//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;

use podcast_performance::data::{Database, NewFollower};
use podcast_performance::federation::{DeliveryRequest, InProcessQueue};
use podcast_performance::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const HANDLE: &str = "fresh7at7";
pub const BASE_URL: &str = "https://test.example.com";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    /// Requests the publisher handed to the delivery queue
    pub deliveries: mpsc::Receiver<DeliveryRequest>,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "test.example.com".to_string(),
            protocol: "https".to_string(),
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        actor: config::ActorConfig {
            handle: HANDLE.to_string(),
            display_name: "Podcast Performance".to_string(),
            actor_type: podcast_performance::data::ActorType::Person,
            summary: None,
            private_key_path: None,
            public_key_path: None,
        },
        federation: config::FederationConfig {
            page_size: 10,
            max_page_size: 100,
            max_post_chars: 500,
            delivery_queue_capacity: 64,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let db = Arc::new(Database::connect(&config.database.path).await.unwrap());
        let (queue, deliveries) =
            InProcessQueue::new(config.federation.delivery_queue_capacity);
        let state = AppState::new(config, db, Arc::new(queue)).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = podcast_performance::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            deliveries,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// POST /send as the configured actor
    pub async fn send(&self, message: &str) -> reqwest::Response {
        self.client
            .post(self.url("/send"))
            .json(&serde_json::json!({
                "senderHandle": HANDLE,
                "type": "Note",
                "message": message,
            }))
            .send()
            .await
            .unwrap()
    }
}

/// Follow notification from `name` on `host`
pub fn remote_follower(name: &str, host: &str) -> NewFollower {
    NewFollower {
        remote_actor_id: format!("https://{host}/users/{name}"),
        inbox_url: format!("https://{host}/users/{name}/inbox"),
        shared_inbox_url: Some(format!("https://{host}/inbox")),
        handle: format!("@{name}@{host}"),
        display_name: Some(name.to_string()),
        actor_type: "Person".to_string(),
        url: Some(format!("https://{host}/@{name}")),
        follow_activity_id: format!("https://{host}/activities/follow-{name}"),
    }
}
