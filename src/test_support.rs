use std::path::Path;
use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, state::AppState, time::now_rfc3339};
use crate::store::layout::StorageLayout;
use crate::store::models::{Exam, Question};

const MULTIPART_BOUNDARY: &str = "markpad-test-boundary";

// 1x1 transparent PNG
pub(crate) const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    root: tempfile::TempDir,
    _guard: OwnedMutexGuard<()>,
}

impl TestContext {
    pub(crate) fn data_root(&self) -> &Path {
        self.root.path()
    }
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

fn set_test_env(data_root: &Path) {
    std::env::set_var("MARKPAD_ENV", "test");
    std::env::set_var("MARKPAD_STRICT_CONFIG", "0");
    std::env::set_var("MARKPAD_DATA_ROOT", data_root.display().to_string());
    std::env::remove_var("PROMETHEUS_ENABLED");
    std::env::remove_var("BACKEND_CORS_ORIGINS");
    std::env::remove_var("MAX_UPLOAD_SIZE_MB");
    std::env::remove_var("ALLOWED_IMAGE_EXTENSIONS");
}

pub(crate) async fn setup_test_context() -> TestContext {
    setup_test_context_with(|_| {}).await
}

pub(crate) async fn setup_test_context_with(extra_env: impl FnOnce(&Path)) -> TestContext {
    let guard = env_lock().await;
    let root = tempfile::tempdir().expect("tempdir");
    set_test_env(root.path());
    extra_env(root.path());

    let settings = Settings::load().expect("settings");
    let layout = StorageLayout::new(root.path());
    layout.init().await.expect("layout init");

    let state = AppState::new(settings, layout);
    let app = api::router::router(state.clone());

    TestContext { state, app, root, _guard: guard }
}

pub(crate) fn png_data_url() -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES))
}

pub(crate) async fn seed_exam(ctx: &TestContext, exam_id: &str, title: &str, questions: usize) {
    let exam = Exam {
        exam_id: exam_id.to_string(),
        title: title.to_string(),
        created_by: "teacher".to_string(),
        created_at: now_rfc3339(),
        questions: (1..=questions)
            .map(|index| Question {
                qid: format!("q{index}"),
                marks: 5,
                instruction: format!("Question {index}"),
                model_answer: String::new(),
                question_image: String::new(),
                diagram_image: None,
            })
            .collect(),
    };
    ctx.state.exams().create(&exam).await.expect("seed exam");
}

pub(crate) async fn seed_attempt(ctx: &TestContext, exam_id: &str, student: &str, answer: &str) {
    let exam = ctx.state.exams().load(exam_id).await.expect("seed exam lookup");
    ctx.state.attempts().autosave(&exam, 1, student, answer, None).await.expect("seed attempt");
}

pub(crate) fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    let bytes = serde_json::to_vec(&body).expect("serialize body");
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("request body")
}

pub(crate) fn multipart_request(
    uri: &str,
    texts: &[(&str, &str)],
    files: &[(&str, &str, &str, &[u8])],
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();

    for (name, value) in texts {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    for (name, filename, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request body")
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
