use crate::errors::ChatError;
use crate::models::{ChatResponse, Message, Role};

/// In-memory log of one chat session plus the busy flag that keeps at most
/// one request in flight.
///
/// Constructed explicitly and owned by whoever drives it (the widget keeps
/// one inside [`AppState`](crate::state::AppState)), so several sessions can
/// live side by side.
#[derive(Clone, Debug, Default)]
pub struct ChatSession {
    history: Vec<Message>,
    is_loading: bool,
    /// Bumped by `reset` so replies to requests from before the reset can be
    /// recognised and dropped.
    generation: u64,
    next_id: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Records the user's query and marks the session busy. Returns `false`
    /// without touching anything when the query is blank or a request is
    /// already in flight.
    pub fn submit(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() || self.is_loading {
            return false;
        }

        self.push(Role::User, query.to_string(), Vec::new());
        self.is_loading = true;
        true
    }

    pub fn complete(&mut self, answer: String, sources: Vec<String>) {
        self.push(Role::Assistant, answer, sources);
        self.is_loading = false;
    }

    pub fn fail(&mut self, error_message: impl Into<String>) {
        self.push(Role::Assistant, error_message.into(), Vec::new());
        self.is_loading = false;
    }

    /// Folds the result of the request started under `generation` into the
    /// log. Returns `false` if the session was reset since, in which case
    /// the result is discarded.
    pub fn settle(&mut self, generation: u64, outcome: Result<ChatResponse, ChatError>) -> bool {
        if generation != self.generation {
            log::debug!(
                "Dropping reply for generation {generation}; session is at {}",
                self.generation
            );
            return false;
        }

        match outcome {
            Ok(resp) => self.complete(resp.answer, resp.sources),
            Err(err) => self.fail(err.to_string()),
        }
        true
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.is_loading = false;
        self.generation += 1;
    }

    /// User-initiated clear. Refused while a request is in flight, so the
    /// abandoned fetch cannot overlap a new one.
    pub fn clear(&mut self) -> bool {
        if self.is_loading {
            return false;
        }
        self.reset();
        true
    }

    fn push(&mut self, role: Role, content: String, sources: Vec<String>) {
        let id = self.next_id;
        self.next_id += 1;
        self.history.push(Message { id, role, content, sources });
    }
}
