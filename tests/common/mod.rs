// Shared fixtures: an in-process stand-in for the site backend
#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use axum_test::TestServer;
use serde_json::{json, Value};
use site_dashboard_sync::{
    api::{create_router, AppState},
    audit::AuditLog,
    backend::BackendClient,
    SiteController, SiteStore,
};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

#[derive(Default)]
pub struct FakeState {
    pub status: Mutex<Value>,
    pub logs: Mutex<Vec<String>>,
    /// (status code, body) returned by /control instead of success
    pub control_failure: Mutex<Option<(u16, Value)>>,
    pub controls: Mutex<Vec<Value>>,
}

impl FakeState {
    pub fn set_status(&self, status: Value) {
        *self.status.lock().unwrap() = status;
    }

    pub fn fail_control(&self, code: u16, body: Value) {
        *self.control_failure.lock().unwrap() = Some((code, body));
    }

    pub fn controls(&self) -> Vec<Value> {
        self.controls.lock().unwrap().clone()
    }
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<FakeState>,
    task: JoinHandle<()>,
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn status(State(state): State<Arc<FakeState>>) -> Json<Value> {
    Json(state.status.lock().unwrap().clone())
}

async fn logs(State(state): State<Arc<FakeState>>) -> Json<Vec<String>> {
    Json(state.logs.lock().unwrap().clone())
}

async fn control(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.controls.lock().unwrap().push(body.clone());

    if let Some((code, failure)) = state.control_failure.lock().unwrap().clone() {
        let code = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (code, Json(failure));
    }

    let action = body["action"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({"success": true, "message": format!("{} executed success.", action)})),
    )
}

pub async fn spawn_backend() -> FakeBackend {
    let state = Arc::new(FakeState::default());
    state.set_status(json!({"devices": {}}));

    let app = Router::new()
        .route("/status", get(status))
        .route("/logs", get(logs))
        .route("/control", post(control))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeBackend {
        base_url: format!("http://{}", addr),
        state,
        task,
    }
}

/// URL of a local port nothing listens on
pub async fn closed_backend_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn client(base_url: &str) -> BackendClient {
    BackendClient::new(base_url, Duration::from_secs(2)).unwrap()
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<SiteStore>,
}

pub fn build_app(base_url: &str) -> TestApp {
    let store = Arc::new(SiteStore::new(false));
    let audit = Arc::new(RwLock::new(AuditLog::new(100)));
    let controller = SiteController::new(store.clone(), client(base_url), audit);

    let server = TestServer::new(create_router(AppState::new(controller, None))).unwrap();

    TestApp { server, store }
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..40 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

pub fn site_status(wind: f64, pcs_frequency: f64, diesel_status: &str) -> Value {
    json!({
        "devices": {
            "pn14": {"name": "PN14", "connected": true, "wind": wind, "force": 450, "status": "Active"},
            "sbms": {"name": "SBMS", "connected": true, "active": false, "voltage": 768.0, "soc": 80},
            "pcs": {"name": "PCS", "connected": true, "frequency": pcs_frequency, "linevoltage": 380.0, "power": 40},
            "diesel": {"name": "Diesel", "connected": true, "status": diesel_status, "frequency": 0, "fuel": "--"}
        },
        "global_status": true
    })
}
