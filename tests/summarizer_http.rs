/// Integration tests for the chat-completions summarizer against a stub server
use anyhow::Result;
use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use common::{Centroid, DensityLevel, DetectionRecord, ImageShape};
use pipeline::{
    OpenRouterSummarizer, Orchestrator, PipelineConfig, Summarizer, SummarizerConfig, SummaryError,
    SummaryRequest,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::{net::TcpListener, task::JoinHandle};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>,
}

async fn chat_ok(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if let Ok(mut requests) = captured.requests.lock() {
        requests.push((auth, body));
    }
    Json(serde_json::json!({
        "choices": [
            { "message": { "role": "assistant", "content": "  Crowd levels at Gate 4 are above the usual level.  " } }
        ]
    }))
}

async fn chat_unavailable() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "upstream overloaded")
}

async fn spawn_router(router: Router) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .expect("server failed");
    });
    Ok((addr, handle))
}

fn summarizer_config(addr: SocketAddr) -> SummarizerConfig {
    SummarizerConfig {
        api_key: Some("sk-test".to_string()),
        base_url: format!("http://{}/api/v1", addr),
        model: "deepseek/deepseek-chat".to_string(),
        timeout_secs: 5,
    }
}

fn request() -> SummaryRequest {
    SummaryRequest {
        zone: "Gate 4".to_string(),
        person_count: 50,
        density_level: DensityLevel::High,
        baseline_mean: 10.0,
        baseline_std: 0.0,
        z_score: 4.0,
        pattern: None,
    }
}

#[tokio::test]
async fn test_summary_from_chat_completions() -> Result<()> {
    let captured = Captured::default();
    let router = Router::new()
        .route("/api/v1/chat/completions", post(chat_ok))
        .with_state(captured.clone());
    let (addr, server) = spawn_router(router).await?;

    let summarizer = OpenRouterSummarizer::new(&summarizer_config(addr), "sk-test".to_string())?;
    let text = summarizer.summarize(&request()).await?;
    assert_eq!(text, "Crowd levels at Gate 4 are above the usual level.");

    let requests = captured.requests.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "deepseek/deepseek-chat");
    assert_eq!(body["messages"][0]["role"], "user");
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    assert!(prompt.contains("Observed people count: 50"));
    assert!(prompt.contains("significantly above normal"));

    server.abort();
    Ok(())
}

#[tokio::test]
async fn test_error_status_is_reported() -> Result<()> {
    let router = Router::new().route("/api/v1/chat/completions", post(chat_unavailable));
    let (addr, server) = spawn_router(router).await?;

    let summarizer = OpenRouterSummarizer::new(&summarizer_config(addr), "sk-test".to_string())?;
    let err = summarizer.summarize(&request()).await.unwrap_err();
    match &err {
        SummaryError::Status { status, body } => {
            assert_eq!(*status, 503);
            assert_eq!(body, "upstream overloaded");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.to_string(), "LLM Error 503: upstream overloaded");

    server.abort();
    Ok(())
}

#[tokio::test]
async fn test_unreachable_service_is_a_transport_error() -> Result<()> {
    // bind and drop to get a port nothing listens on
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let summarizer = OpenRouterSummarizer::new(&summarizer_config(addr), "sk-test".to_string())?;
    let err = summarizer.summarize(&request()).await.unwrap_err();
    assert!(matches!(err, SummaryError::Transport(_)));
    assert!(err.to_string().starts_with("Request failed:"));
    Ok(())
}

#[tokio::test]
async fn test_pipeline_keeps_going_when_summarizer_fails() -> Result<()> {
    let router = Router::new().route("/api/v1/chat/completions", post(chat_unavailable));
    let (addr, server) = spawn_router(router).await?;

    let config = PipelineConfig {
        calibration_window: 5,
        summarizer: summarizer_config(addr),
        ..PipelineConfig::default()
    };
    let summarizer = pipeline::summary::from_config(&config.summarizer)?;
    let mut orch = Orchestrator::new(&config, summarizer);

    for i in 0..8u64 {
        let count = if i < 5 { 4 } else { 30 };
        let record = DetectionRecord {
            frame_index: i,
            timestamp: i as f64,
            person_count: count,
            centroids: (0..count)
                .map(|p| Centroid::new(p as f64 * 20.0, 50.0))
                .collect(),
            confidences: vec![0.95; count as usize],
            image_shape: ImageShape::new(480, 640),
            image_id: None,
            bboxes: vec![],
        };
        orch.process_frame(record).await?;
    }

    let report = orch.finish()?;
    assert_eq!(report.alerts.len(), 3);
    assert!(report
        .entries
        .iter()
        .all(|e| e.summary == "LLM Error 503: upstream overloaded"));

    server.abort();
    Ok(())
}
