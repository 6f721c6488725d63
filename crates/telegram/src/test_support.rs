//! In-process mock of the Bot API and message fixtures.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::HashSet,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use {
    axum::{Json, Router, body::Bytes, extract::State, http::Uri, routing::post},
    serde::Deserialize,
    serde_json::{Value, json},
    teloxide::types::Message,
    tokio::{sync::oneshot, task::JoinHandle},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CopyMessageRequest {
    pub chat_id: Value,
    pub from_chat_id: Value,
    pub message_id: i32,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub parse_mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyParametersBody {
    pub message_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(default)]
    pub parse_mode: Option<String>,
    #[serde(default)]
    pub reply_parameters: Option<ReplyParametersBody>,
}

impl SendMessageRequest {
    pub fn reply_to(&self) -> Option<i32> {
        self.reply_parameters.as_ref().map(|rp| rp.message_id)
    }
}

#[derive(Debug, Clone)]
enum CapturedRequest {
    CopyMessage(CopyMessageRequest),
    SendMessage(SendMessageRequest),
    Other(String),
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    reject_entities_once: Arc<AtomicBool>,
    failing_copies: Arc<Mutex<HashSet<i32>>>,
}

pub struct MockTelegramApi {
    state: MockState,
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<()>,
}

impl MockTelegramApi {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });

        Self {
            state,
            addr,
            shutdown,
            server,
        }
    }

    pub fn bot(&self) -> teloxide::Bot {
        let api_url =
            reqwest::Url::parse(&format!("http://{}/", self.addr)).expect("parse api url");
        teloxide::Bot::new("test-token").set_api_url(api_url)
    }

    /// The next copy with a parse mode fails with an entity parse error.
    pub fn reject_entities_once(&self) {
        self.state.reject_entities_once.store(true, Ordering::SeqCst);
    }

    /// Copies of these message ids fail as "message to copy not found".
    pub fn fail_copies_of(&self, ids: &[i32]) {
        self.state
            .failing_copies
            .lock()
            .unwrap()
            .extend(ids.iter().copied());
    }

    pub fn copies(&self) -> Vec<CopyMessageRequest> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| match r {
                CapturedRequest::CopyMessage(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<SendMessageRequest> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| match r {
                CapturedRequest::SendMessage(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn other_methods(&self) -> Vec<String> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| match r {
                CapturedRequest::Other(method) => Some(method.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        self.server.await.expect("server join");
    }
}

async fn telegram_api_handler(
    State(state): State<MockState>,
    uri: Uri,
    body: Bytes,
) -> Json<Value> {
    let method = uri.path().rsplit('/').next().unwrap_or_default().to_string();

    match method.as_str() {
        "CopyMessage" => {
            let req: CopyMessageRequest = serde_json::from_slice(&body).expect("copy body");
            state
                .requests
                .lock()
                .unwrap()
                .push(CapturedRequest::CopyMessage(req.clone()));

            if req.parse_mode.is_some() && state.reject_entities_once.swap(false, Ordering::SeqCst)
            {
                return Json(error_response(
                    "Bad Request: can't parse entities: Can't find end of the entity starting at byte offset 7",
                ));
            }
            if state.failing_copies.lock().unwrap().contains(&req.message_id) {
                return Json(error_response("Bad Request: message to copy not found"));
            }
            Json(json!({ "ok": true, "result": { "message_id": 1000 + req.message_id } }))
        },
        "SendMessage" => {
            let req: SendMessageRequest = serde_json::from_slice(&body).expect("send body");
            let chat_id = req.chat_id;
            state
                .requests
                .lock()
                .unwrap()
                .push(CapturedRequest::SendMessage(req));
            Json(json!({
                "ok": true,
                "result": {
                    "message_id": 1,
                    "date": 0,
                    "chat": { "id": chat_id, "type": "private", "first_name": "Test" },
                    "text": "ok"
                }
            }))
        },
        _ => {
            let result = match method.as_str() {
                "GetMe" => json!({
                    "id": 777,
                    "is_bot": true,
                    "first_name": "Relay",
                    "username": "relay_bot",
                    "can_join_groups": true,
                    "can_read_all_group_messages": false,
                    "supports_inline_queries": false,
                    "can_connect_to_business": false,
                    "has_main_web_app": false
                }),
                "GetUpdates" => json!([]),
                _ => json!(true),
            };
            state
                .requests
                .lock()
                .unwrap()
                .push(CapturedRequest::Other(method));
            Json(json!({ "ok": true, "result": result }))
        },
    }
}

fn error_response(description: &str) -> Value {
    json!({ "ok": false, "error_code": 400, "description": description })
}

/// A private-chat message from `from` with the given media or text payload.
pub fn message(chat: i64, id: i32, from: u64, payload: Value) -> Message {
    let mut value = json!({
        "message_id": id,
        "date": 1,
        "chat": { "id": chat, "type": "private", "first_name": "Alice" },
        "from": { "id": from, "is_bot": false, "first_name": "Alice" }
    });
    if let (Some(base), Some(extra)) = (value.as_object_mut(), payload.as_object()) {
        base.extend(extra.clone());
    }
    serde_json::from_value(value).expect("deserialize message fixture")
}

pub fn video_message(chat: i64, id: i32, from: u64, caption: Option<&str>) -> Message {
    let mut payload = json!({
        "video": {
            "file_id": format!("video-{id}"),
            "file_unique_id": format!("video-unique-{id}"),
            "width": 1280,
            "height": 720,
            "duration": 60,
            "mime_type": "video/mp4"
        }
    });
    if let Some(caption) = caption {
        payload["caption"] = json!(caption);
    }
    message(chat, id, from, payload)
}

pub fn text_message(chat: i64, id: i32, from: u64, text: &str) -> Message {
    message(chat, id, from, json!({ "text": text }))
}
