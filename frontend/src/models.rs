use serde::{Deserialize, Serialize};

/// Who authored a message in the conversation log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry of the conversation log. Only the session creates these and
/// it hands out shared references, so a message never changes after it is
/// appended.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub sources: Vec<String>,
}

/// Request body for `POST /chat`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub query: String,
}

/// A decoded, validated answer from the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Wire shape of the `/chat` response before validation. Both fields are
/// optional here so a missing `answer` can be reported as malformed instead
/// of as a JSON syntax error.
#[derive(Debug, Deserialize)]
pub(crate) struct RawChatResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}
