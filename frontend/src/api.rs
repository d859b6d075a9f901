use futures_util::future::{Either, select};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;

use crate::errors::ChatError;
use crate::models::{ChatRequest, ChatResponse, RawChatResponse};

/// Base URL of the assistant backend.
pub const API_BASE: &str = "http://localhost:8000";

/// Path of the question-answering endpoint, appended to [`API_BASE`].
pub const CHAT_PATH: &str = "/chat";

/// How long the browser waits for `/chat` before giving up.
pub const REQUEST_TIMEOUT_MS: u32 = 60_000;

/// Status and body of an HTTP response, before any interpretation.
#[derive(Clone, Debug, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// One JSON POST round-trip. The browser uses [`GlooClient`]; tests plug in
/// a canned implementation.
#[allow(async_fn_in_trait)]
pub trait HttpClient {
    /// Sends `payload` as JSON to `url`. Only failures that prevent an HTTP
    /// response from arriving are errors here; a 4xx/5xx is a normal
    /// [`RawResponse`].
    async fn post_json(&self, url: &str, payload: &ChatRequest) -> Result<RawResponse, ChatError>;
}

/// `fetch`-backed client for the browser.
#[derive(Clone, Debug)]
pub struct GlooClient {
    timeout_ms: u32,
}

impl GlooClient {
    pub fn with_timeout(timeout_ms: u32) -> Self {
        Self { timeout_ms }
    }
}

impl Default for GlooClient {
    fn default() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT_MS)
    }
}

impl HttpClient for GlooClient {
    async fn post_json(&self, url: &str, payload: &ChatRequest) -> Result<RawResponse, ChatError> {
        // `.json()` sets `Content-Type: application/json`.
        let request = Request::post(url)
            .header("Accept", "application/json")
            .json(payload)
            .map_err(|e| ChatError::Connectivity(format!("request could not be encoded: {e}")))?;

        let exchange = async move {
            let resp = request
                .send()
                .await
                .map_err(|e| ChatError::Connectivity(e.to_string()))?;
            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| ChatError::Connectivity(format!("response body was cut off: {e}")))?;
            Ok::<_, ChatError>(RawResponse { status, body })
        };

        match select(Box::pin(exchange), TimeoutFuture::new(self.timeout_ms)).await {
            Either::Left((outcome, _)) => outcome,
            Either::Right(_) => Err(ChatError::Connectivity(format!(
                "no response within {} seconds",
                self.timeout_ms / 1000
            ))),
        }
    }
}

/// Performs one `/chat` exchange per [`ask`](ChatTransport::ask) call. No
/// retries and no cancellation.
#[derive(Clone, Debug)]
pub struct ChatTransport<C = GlooClient> {
    client: C,
    endpoint: String,
}

impl ChatTransport<GlooClient> {
    /// Transport pointed at [`API_BASE`] with the default timeout.
    pub fn from_defaults() -> Self {
        Self::new(GlooClient::default(), API_BASE)
    }
}

impl<C: HttpClient> ChatTransport<C> {
    pub fn new(client: C, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{CHAT_PATH}", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `query` and waits for the backend's answer.
    pub async fn ask(&self, query: &str) -> Result<ChatResponse, ChatError> {
        let payload = ChatRequest { query: query.to_string() };
        log::debug!("POST {} ({} chars)", self.endpoint, query.chars().count());

        let raw = self.client.post_json(&self.endpoint, &payload).await?;
        decode_response(raw)
    }
}

/// Turns a raw HTTP response into a [`ChatResponse`] or the matching
/// [`ChatError`].
pub fn decode_response(raw: RawResponse) -> Result<ChatResponse, ChatError> {
    if !(200..300).contains(&raw.status) {
        return Err(ChatError::Transport { status: raw.status });
    }

    let parsed: RawChatResponse = serde_json::from_str(&raw.body)
        .map_err(|e| ChatError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let answer = match parsed.answer {
        Some(answer) if !answer.trim().is_empty() => answer,
        Some(_) => return Err(ChatError::MalformedResponse("`answer` is empty".to_string())),
        None => return Err(ChatError::MalformedResponse("missing `answer` field".to_string())),
    };

    Ok(ChatResponse {
        answer,
        sources: parsed.sources.unwrap_or_default(),
    })
}
