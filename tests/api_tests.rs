//! Router-level tests for the OpenAI-compatible API.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use mock_openai::config::{Config, StreamingConfig};
use mock_openai::registry::SUPPORTED_MODELS;
use mock_openai::server::openai_api::{build_router, AppState};

fn app() -> Router {
    let config = Config {
        streaming: StreamingConfig {
            char_delay_ms: 0,
            announce_role: true,
        },
        ..Config::default()
    };
    build_router(Arc::new(AppState::new(Arc::new(config))))
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(req: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let resp = app().oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body.to_vec())
}

async fn send_json(req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(req).await;
    (status, serde_json::from_slice(&body).unwrap())
}

/// Split an event-stream body into `data:` payloads, checking the framing.
fn parse_frames(body: &[u8]) -> Vec<String> {
    let text = std::str::from_utf8(body).unwrap();
    assert!(text.ends_with("\n\n"), "unterminated stream: {text:?}");
    text.strip_suffix("\n\n")
        .unwrap()
        .split("\n\n")
        .map(|frame| {
            frame
                .strip_prefix("data: ")
                .unwrap_or_else(|| panic!("bad frame: {frame:?}"))
                .to_string()
        })
        .collect()
}

fn streamed_content(frames: &[String]) -> String {
    frames
        .iter()
        .filter(|f| f.as_str() != "[DONE]")
        .filter_map(|f| {
            let json: Value = serde_json::from_str(f).unwrap();
            json["choices"][0]["delta"]["content"]
                .as_str()
                .map(str::to_string)
        })
        .collect()
}

// -- Chat completions (single-shot) --

#[tokio::test]
async fn test_single_shot_for_every_supported_model() {
    for model in SUPPORTED_MODELS {
        for stream in [json!(null), json!("false"), json!("TRUE"), json!("yes"), json!(false)] {
            let (status, json) = send_json(json_request(
                "/v1/chat/completions",
                json!({
                    "model": model,
                    "messages": [{"role": "user", "content": "Hello"}],
                    "stream": stream,
                }),
            ))
            .await;

            assert_eq!(status, StatusCode::OK, "model {model}, stream {stream}");
            assert_eq!(json["object"], "chat.completion");
            assert_eq!(json["model"], model);
            assert_eq!(json["choices"][0]["finish_reason"], "stop");
            let usage = &json["usage"];
            assert_eq!(
                usage["total_tokens"].as_u64().unwrap(),
                usage["prompt_tokens"].as_u64().unwrap()
                    + usage["completion_tokens"].as_u64().unwrap()
            );
        }
    }
}

#[tokio::test]
async fn test_single_shot_echoes_last_user_message() {
    let (status, json) = send_json(json_request(
        "/v1/chat/completions",
        json!({
            "model": "gpt-4",
            "messages": [
                {"role": "system", "content": "You are terse."},
                {"role": "user", "content": "Hello"}
            ],
            "stream": "false"
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert_eq!(json["choices"][0]["index"], 0);
    assert_eq!(json["choices"][0]["message"]["role"], "assistant");
    assert_eq!(json["choices"][0]["message"]["content"], "Hello");
    assert_eq!(json["usage"]["prompt_tokens"], 6);
    assert_eq!(json["usage"]["completion_tokens"], 50);
    assert_eq!(json["usage"]["total_tokens"], 56);
}

#[tokio::test]
async fn test_single_shot_without_user_message_greets() {
    let (status, json) = send_json(json_request(
        "/v1/chat/completions",
        json!({"model": "gpt-3.5-turbo", "messages": []}),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["choices"][0]["message"]["content"],
        "Hello! I'm a mock AI assistant."
    );
    assert_eq!(json["usage"]["prompt_tokens"], 0);
}

#[tokio::test]
async fn test_single_shot_is_structurally_idempotent() {
    let body = json!({
        "model": "gpt-4",
        "messages": [{"role": "user", "content": "same input"}]
    });
    let (_, mut first) = send_json(json_request("/v1/chat/completions", body.clone())).await;
    let (_, mut second) = send_json(json_request("/v1/chat/completions", body)).await;

    for json in [&mut first, &mut second] {
        let obj = json.as_object_mut().unwrap();
        obj.remove("id");
        obj.remove("created");
    }
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_single_shot_is_plain_json() {
    let (status, content_type, body) = send(json_request(
        "/v1/chat/completions",
        json!({"model": "gpt-4", "messages": [{"role": "user", "content": "Hi"}]}),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert!(!body.starts_with(b"data:"));
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["choices"][0]["message"]["content"], "Hi");
}

#[tokio::test]
async fn test_null_generation_parameters_are_accepted() {
    let (status, json) = send_json(json_request(
        "/v1/chat/completions",
        json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "Hi"}],
            "temperature": null,
            "max_tokens": null,
            "top_p": null,
            "frequency_penalty": null,
            "presence_penalty": null,
            "stop": null
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["choices"][0]["message"]["content"], "Hi");
}

#[tokio::test]
async fn test_negative_max_tokens_is_carried() {
    let (status, json) = send_json(json_request(
        "/v1/chat/completions",
        json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "Hi"}],
            "max_tokens": -1
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["usage"]["completion_tokens"], 50);
}

// -- Chat completions (streaming) --

#[tokio::test]
async fn test_streaming_reproduces_content_once() {
    let content = "Hi \"there\"\\\n\ttab";
    let (status, content_type, body) = send(json_request(
        "/v1/chat/completions",
        json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": content}],
            "stream": "true"
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/event-stream"));

    let frames = parse_frames(&body);
    assert_eq!(frames.iter().filter(|f| *f == "[DONE]").count(), 1);
    assert_eq!(frames.last().map(String::as_str), Some("[DONE]"));
    assert_eq!(streamed_content(&frames), content);
    // role + one unit per char + finish + [DONE]
    assert_eq!(frames.len(), content.chars().count() + 3);
}

#[tokio::test]
async fn test_streaming_chunk_shape() {
    let (_, _, body) = send(json_request(
        "/v1/chat/completions",
        json!({
            "model": "gpt-4-turbo-preview",
            "messages": [{"role": "user", "content": "ok"}],
            "stream": "true"
        }),
    ))
    .await;

    let frames = parse_frames(&body);
    let chunks: Vec<Value> = frames[..frames.len() - 1]
        .iter()
        .map(|f| serde_json::from_str(f).unwrap())
        .collect();

    assert_eq!(chunks[0]["choices"][0]["delta"], json!({"role": "assistant"}));
    assert_eq!(chunks[1]["choices"][0]["delta"], json!({"content": "o"}));
    assert_eq!(chunks[2]["choices"][0]["delta"], json!({"content": "k"}));
    let last = chunks.last().unwrap();
    assert_eq!(last["choices"][0]["delta"], json!({}));
    assert_eq!(last["choices"][0]["finish_reason"], "stop");

    for chunk in &chunks {
        assert_eq!(chunk["object"], "chat.completion.chunk");
        assert_eq!(chunk["model"], "gpt-4-turbo-preview");
        assert_eq!(chunk["id"], chunks[0]["id"]);
        assert_eq!(chunk["created"], chunks[0]["created"]);
    }
    for chunk in &chunks[..chunks.len() - 1] {
        assert!(chunk["choices"][0]["finish_reason"].is_null());
    }
}

#[tokio::test]
async fn test_streaming_accepts_boolean_true() {
    let (status, content_type, body) = send(json_request(
        "/v1/chat/completions",
        json!({
            "model": "gpt-4",
            "messages": [],
            "stream": true
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/event-stream"));
    assert_eq!(
        streamed_content(&parse_frames(&body)),
        "Hello! I'm a mock AI assistant."
    );
}

// -- Rejections --

#[tokio::test]
async fn test_unsupported_model_is_rejected() {
    for stream in ["true", "false"] {
        let (status, json) = send_json(json_request(
            "/v1/chat/completions",
            json!({
                "model": "not-a-model",
                "messages": [{"role": "user", "content": "Hello"}],
                "stream": stream
            }),
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "model_not_found");
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("`not-a-model`"));
    }
}

#[tokio::test]
async fn test_missing_fields_are_collected() {
    let (status, json) = send_json(json_request(
        "/v1/chat/completions",
        json!({"model": ""}),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(json["error"]["param"], "model");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("model="), "{message}");
    assert!(message.contains("messages="), "{message}");
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let req = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send_json(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["type"], "invalid_request_error");
    assert_eq!(json["error"]["code"], "invalid_request_body");
}

#[tokio::test]
async fn test_legacy_endpoints_are_unsupported() {
    for uri in ["/v1/completions", "/v1/embeddings"] {
        let (status, json) = send_json(json_request(uri, json!({"model": "gpt-4"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["error"]["code"], "endpoint_not_supported");
        assert_eq!(json["error"]["type"], "invalid_request_error");
    }
}

#[tokio::test]
async fn test_unknown_route_returns_error_envelope() {
    let (status, json) = send_json(json_request("/v1/nope", json!({}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["type"], "invalid_request_error");
    assert_eq!(json["error"]["code"], "unknown_url");
    assert_eq!(json["error"]["message"], "Invalid URL (POST /v1/nope)");
}

#[tokio::test]
async fn test_wrong_method_returns_error_envelope() {
    let (status, json) = send_json(get("/v1/chat/completions")).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json["error"]["type"], "invalid_request_error");
    assert_eq!(json["error"]["code"], "method_not_allowed");
}

// -- Models --

#[tokio::test]
async fn test_list_models_and_engines() {
    for uri in ["/v1/models", "/v1/engines"] {
        let (status, json) = send_json(get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["object"], "list");
        let ids: Vec<&str> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, SUPPORTED_MODELS);
    }
}

#[tokio::test]
async fn test_get_single_model() {
    for uri in ["/v1/models/gpt-4", "/v1/engines/gpt-4"] {
        let (status, json) = send_json(get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], "gpt-4");
        assert_eq!(json["object"], "model");
        assert_eq!(json["created"], 1_677_610_602u64);
        assert!(json["owned_by"].is_string());
    }
}

#[tokio::test]
async fn test_unknown_model_is_not_found() {
    let (status, json) = send_json(get("/v1/models/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "model_not_found");
}

#[tokio::test]
async fn test_health_returns_ok() {
    let (status, json) = send_json(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["models"], 5);
}
