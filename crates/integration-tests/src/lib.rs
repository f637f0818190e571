//! Test harness for Katha Vault.
//!
//! [`TestApp::spawn`] serves the full router on `127.0.0.1:0` with the
//! in-memory store, a temporary uploads directory and rate limiting off.
//! [`MockProvider`] stands in for the Anthropic Messages API so the
//! writing-assistant endpoints can be driven without a network.
//!
//! ```rust,ignore
//! let app = TestApp::spawn().await;
//! let reader = app.client();
//! reader.sign_up("Asha Rao", "asha").await;
//! let res = reader.get("/api/auth/me").send().await.unwrap();
//! assert_eq!(res.status(), 200);
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};
use reqwest::RequestBuilder;
use secrecy::SecretString;
use serde_json::{Value, json};

use katha_vault_core::Email;
use katha_vault_server::ai::AiService;
use katha_vault_server::config::{ClaudeConfig, KathaConfig};
use katha_vault_server::db::Store;
use katha_vault_server::state::AppState;

/// Email that [`TestApp`] configures as an admin.
pub const ADMIN_EMAIL: &str = "editor@katha.test";

/// Password used by every [`TestClient::sign_up`] account.
pub const PASSWORD: &str = "correct horse battery";

/// What the mock provider answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A successful message whose single text block is `text`.
    Text(String),
    /// An error status with an Anthropic-style error body.
    Error(u16, String),
}

#[derive(Default)]
struct MockState {
    reply: Option<MockReply>,
    requests: Vec<(HeaderMap, Value)>,
}

/// A local stand-in for the Messages API.
#[derive(Clone)]
pub struct MockProvider {
    pub base_url: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Serve the mock on an ephemeral port.
    pub async fn spawn() -> Self {
        let state = Arc::new(Mutex::new(MockState::default()));
        let router = Router::new()
            .route("/v1/messages", post(messages))
            .with_state(Arc::clone(&state));
        let addr = serve(router).await;
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Answer every following request with `reply`.
    pub fn reply_with(&self, reply: MockReply) {
        self.lock().reply = Some(reply);
    }

    /// Answer with text that is itself the JSON object a flow expects.
    pub fn reply_json(&self, value: &Value) {
        self.reply_with(MockReply::Text(value.to_string()));
    }

    /// Request bodies received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.lock().requests.iter().map(|(_, body)| body.clone()).collect()
    }

    /// Value of `name` on the most recent request.
    pub fn last_header(&self, name: &str) -> Option<String> {
        self.lock()
            .requests
            .last()
            .and_then(|(headers, _)| headers.get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }
}

async fn messages(
    State(state): State<Arc<Mutex<MockState>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let reply = {
        let mut state = state.lock().expect("mock state poisoned");
        state.requests.push((headers, body.clone()));
        state.reply.clone()
    };

    match reply {
        Some(MockReply::Text(text)) => (
            StatusCode::OK,
            Json(json!({
                "id": "msg_test",
                "type": "message",
                "role": "assistant",
                "model": body["model"],
                "stop_reason": "end_turn",
                "content": [{"type": "text", "text": text}],
                "usage": {"input_tokens": 12, "output_tokens": 34}
            })),
        ),
        Some(MockReply::Error(status, message)) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({
                "type": "error",
                "error": {"type": "api_error", "message": message}
            })),
        ),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "type": "error",
                "error": {"type": "api_error", "message": "no reply scripted"}
            })),
        ),
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no address");
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("test server failed");
    });
    addr
}

/// A running server.
pub struct TestApp {
    pub base_url: String,
    pub uploads_dir: PathBuf,
    pub provider: Option<MockProvider>,
}

impl TestApp {
    /// Serve the app with the writing assistant disabled.
    pub async fn spawn() -> Self {
        Self::start(None).await
    }

    /// Serve the app backed by a [`MockProvider`].
    pub async fn spawn_with_provider() -> Self {
        Self::start(Some(MockProvider::spawn().await)).await
    }

    async fn start(provider: Option<MockProvider>) -> Self {
        let uploads_dir =
            std::env::temp_dir().join(format!("katha-it-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&uploads_dir).expect("failed to create uploads dir");

        let claude = provider.as_ref().map(|p| ClaudeConfig {
            api_key: SecretString::from("sk-ant-test-3f9c2a7b1e"),
            model: "claude-test".to_owned(),
            base_url: p.base_url.clone(),
        });
        let config = KathaConfig {
            uploads_dir: uploads_dir.clone(),
            admin_emails: vec![Email::parse(ADMIN_EMAIL).expect("valid admin email")],
            rate_limit: false,
            claude,
            ..KathaConfig::default()
        };

        let ai = AiService::new(config.claude.as_ref()).expect("failed to build AI client");
        let state = AppState::new(config, Store::memory(), ai);
        let addr = serve(katha_vault_server::app(state)).await;

        Self {
            base_url: format!("http://{addr}"),
            uploads_dir,
            provider,
        }
    }

    /// The mock provider, for apps started with one.
    pub fn provider(&self) -> &MockProvider {
        self.provider.as_ref().expect("app was spawned without a provider")
    }

    /// A fresh client with its own cookie jar.
    pub fn client(&self) -> TestClient {
        TestClient {
            http: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .expect("failed to build client"),
            base_url: self.base_url.clone(),
        }
    }
}

/// An HTTP client bound to one [`TestApp`], keeping its session cookie.
pub struct TestClient {
    pub http: reqwest::Client,
    base_url: String,
}

impl TestClient {
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(format!("{}{path}", self.base_url))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(format!("{}{path}", self.base_url))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.http.put(format!("{}{path}", self.base_url))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(format!("{}{path}", self.base_url))
    }

    /// Register `username@katha.test` and keep the session. Returns the
    /// new profile.
    pub async fn sign_up(&self, name: &str, username: &str) -> Value {
        self.sign_up_as(name, username, &format!("{username}@katha.test"))
            .await
    }

    /// Register with an explicit email.
    pub async fn sign_up_as(&self, name: &str, username: &str, email: &str) -> Value {
        let res = self
            .post("/api/auth/sign-up")
            .json(&json!({
                "name": name,
                "username": username,
                "email": email,
                "password": PASSWORD,
            }))
            .send()
            .await
            .expect("sign-up request failed");
        assert_eq!(res.status(), 201, "sign-up of {username} failed");
        res.json().await.expect("sign-up body")
    }

    /// Create a novel and return its JSON.
    pub async fn create_novel(&self, title: &str, genres: &[&str]) -> Value {
        let res = self
            .post("/api/novels")
            .json(&json!({
                "title": title,
                "genres": genres,
                "synopsis": format!("{title} is a story told one chapter at a time."),
            }))
            .send()
            .await
            .expect("create novel request failed");
        assert_eq!(res.status(), 201, "creating {title} failed");
        res.json().await.expect("novel body")
    }

    /// Add a chapter and return its id.
    pub async fn add_chapter(&self, novel_id: i64, title: &str) -> i64 {
        let res = self
            .post(&format!("/api/novels/{novel_id}/chapters"))
            .json(&json!({
                "title": title,
                "content": format!("{title}: the lanterns on the far bank went out one by one."),
            }))
            .send()
            .await
            .expect("add chapter request failed");
        assert_eq!(res.status(), 201, "adding chapter {title} failed");
        let body: Value = res.json().await.expect("chapter body");
        body["id"].as_i64().expect("chapter id")
    }

    /// Publish a novel.
    pub async fn publish(&self, novel_id: i64) {
        let res = self
            .post(&format!("/api/novels/{novel_id}/publish"))
            .send()
            .await
            .expect("publish request failed");
        assert_eq!(res.status(), 200, "publishing {novel_id} failed");
    }

    /// GET `path` and decode the JSON body, asserting a 200.
    pub async fn get_json(&self, path: &str) -> Value {
        let res = self.get(path).send().await.expect("request failed");
        assert_eq!(res.status(), 200, "GET {path}");
        res.json().await.expect("json body")
    }
}
