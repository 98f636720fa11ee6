//! End-to-end webhook delivery scenarios: signature gate, routing,
//! summarization, and backend delivery exercised through the real router
//! against a stub backend bound to an ephemeral port.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use haggler_agent::summarizer::{ExtractionError, Summarizer};
use haggler_core::domain::outcome::NegotiationOutcome;
use haggler_core::domain::webhook::TranscriptTurn;
use haggler_server::backend::OutcomeReporter;
use haggler_server::webhook::{self, WebhookState, SIGNATURE_HEADER};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::sync::Mutex;
use tower::ServiceExt;

const SECRET: &str = "wsec_e2e";

struct StubSummarizer {
    outcome: NegotiationOutcome,
    calls: AtomicUsize,
}

impl StubSummarizer {
    fn new(outcome: NegotiationOutcome) -> Arc<Self> {
        Arc::new(Self { outcome, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(
        &self,
        _transcript: &[TranscriptTurn],
    ) -> Result<NegotiationOutcome, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome.clone())
    }
}

async fn spawn_backend(status: StatusCode) -> (SocketAddr, Arc<Mutex<Vec<Value>>>) {
    let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = received.clone();

    let app = Router::new().route(
        "/api/calls/finish",
        post(move |Json(body): Json<Value>| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().await.push(body);
                status
            }
        }),
    );

    let listener =
        tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("stub backend should bind");
    let addr = listener.local_addr().expect("stub backend should expose its address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, received)
}

fn webhook_app(summarizer: Arc<StubSummarizer>, backend_addr: SocketAddr) -> Router {
    let reporter = Arc::new(OutcomeReporter::new(
        reqwest::Client::new(),
        &format!("http://{backend_addr}"),
    ));
    webhook::router(WebhookState {
        webhook_secret: SECRET.to_string().into(),
        summarizer,
        reporter,
    })
}

fn sign(payload: &[u8]) -> String {
    let timestamp = Utc::now().timestamp();
    let mut mac =
        Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).expect("hmac accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v0={}", hex::encode(mac.finalize().into_bytes()))
}

fn transcription_payload() -> Vec<u8> {
    json!({
        "type": "post_call_transcription",
        "data": {
            "agent_id": "agent-1",
            "conversation_id": "conv-1",
            "status": "done",
            "user_id": "user-1",
            "transcript": [
                {"role": "user", "message": "I can do $28000"},
                {"role": "agent", "message": "Deal."}
            ],
            "metadata": {},
            "analysis": null,
            "conversation_initiation_client_data": null
        }
    })
    .to_string()
    .into_bytes()
}

fn failure_payload() -> Vec<u8> {
    json!({
        "type": "call_initiation_failure",
        "data": {
            "agent_id": "agent-1",
            "conversation_id": "conv-9",
            "status": "failed",
            "user_id": "user-9"
        }
    })
    .to_string()
    .into_bytes()
}

fn agreed_outcome() -> NegotiationOutcome {
    NegotiationOutcome {
        is_available: true,
        deal_price: 28_000,
        remarks: "Dealer agreed to $28000".to_string(),
    }
}

async fn deliver(app: Router, payload: Vec<u8>, signature: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/calls/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        request = request.header(SIGNATURE_HEADER, signature);
    }

    let response = app
        .oneshot(request.body(Body::from(payload)).expect("request should build"))
        .await
        .expect("router should respond");

    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body should collect").to_bytes();
    let body = serde_json::from_slice(&bytes).expect("response body should be JSON");
    (status, body)
}

#[tokio::test]
async fn successful_delivery_reports_outcome_to_backend() {
    let (backend_addr, received) = spawn_backend(StatusCode::OK).await;
    let summarizer = StubSummarizer::new(agreed_outcome());
    let app = webhook_app(summarizer.clone(), backend_addr);

    let payload = transcription_payload();
    let signature = sign(&payload);
    let (status, body) = deliver(app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);

    let reports = received.lock().await;
    assert_eq!(
        *reports,
        vec![json!({
            "user_id": "user-1",
            "is_available": true,
            "deal_price": 28000,
            "remarks": "Dealer agreed to $28000"
        })]
    );
}

#[tokio::test]
async fn backend_failure_surfaces_error_status_to_sender() {
    let (backend_addr, _received) = spawn_backend(StatusCode::SERVICE_UNAVAILABLE).await;
    let summarizer = StubSummarizer::new(agreed_outcome());
    let app = webhook_app(summarizer, backend_addr);

    let payload = transcription_payload();
    let signature = sign(&payload);
    let (status, body) = deliver(app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Failed to call backend");
}

#[tokio::test]
async fn tampered_payload_is_rejected_before_any_processing() {
    let (backend_addr, received) = spawn_backend(StatusCode::OK).await;
    let summarizer = StubSummarizer::new(agreed_outcome());
    let app = webhook_app(summarizer.clone(), backend_addr);

    let signature = sign(&transcription_payload());
    let mut tampered = transcription_payload();
    let last = tampered.len() - 2;
    tampered[last] = b'!';
    let (status, body) = deliver(app, tampered, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Invalid signature");
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    assert!(received.lock().await.is_empty());
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let (backend_addr, received) = spawn_backend(StatusCode::OK).await;
    let summarizer = StubSummarizer::new(agreed_outcome());
    let app = webhook_app(summarizer, backend_addr);

    let (status, body) = deliver(app, transcription_payload(), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Invalid signature");
    assert!(received.lock().await.is_empty());
}

#[tokio::test]
async fn unknown_webhook_type_never_reaches_the_backend() {
    let (backend_addr, received) = spawn_backend(StatusCode::OK).await;
    let summarizer = StubSummarizer::new(agreed_outcome());
    let app = webhook_app(summarizer.clone(), backend_addr);

    let payload = json!({
        "type": "unknown_event",
        "data": {
            "agent_id": "agent-1",
            "conversation_id": "conv-2",
            "status": "done",
            "user_id": "user-2"
        }
    })
    .to_string()
    .into_bytes();
    let signature = sign(&payload);
    let (status, body) = deliver(app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Invalid webhook type");
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    assert!(received.lock().await.is_empty());
}

#[tokio::test]
async fn initiation_failure_delivers_the_fixed_template() {
    let (backend_addr, received) = spawn_backend(StatusCode::OK).await;
    let summarizer = StubSummarizer::new(agreed_outcome());
    let app = webhook_app(summarizer.clone(), backend_addr);

    let payload = failure_payload();
    let signature = sign(&payload);
    let (status, body) = deliver(app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);

    let reports = received.lock().await;
    assert_eq!(
        *reports,
        vec![json!({
            "user_id": "user-9",
            "is_available": false,
            "deal_price": 0,
            "remarks": "Call initiation failed"
        })]
    );
}
