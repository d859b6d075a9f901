use std::sync::Arc;

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api::ChatTransport;
use crate::session::ChatSession;

/// Shared application state, provided via Leptos context.
#[derive(Clone)]
pub struct AppState {
    /// The conversation. Components read it; only the methods below write it.
    pub session: RwSignal<ChatSession>,
    transport: Arc<ChatTransport>,
}

impl AppState {
    /// Create a new `AppState` around `transport` and provide it in the
    /// current Leptos context.
    pub fn provide(transport: ChatTransport) -> Self {
        let state = Self {
            session: RwSignal::new(ChatSession::new()),
            transport: Arc::new(transport),
        };

        provide_context(state.clone());
        state
    }

    /// Sends `text` to the backend unless it is blank or another request is
    /// still running.
    pub fn send_query(&self, text: String) {
        let query = text.trim().to_string();
        let mut accepted = false;
        let mut generation = 0;
        self.session.update(|session| {
            accepted = session.submit(&query);
            generation = session.generation();
        });
        if !accepted {
            return;
        }

        let state = self.clone();
        spawn_local(async move {
            let outcome = state.transport.ask(&query).await;
            match &outcome {
                Ok(resp) => log::debug!("Answer received with {} source(s)", resp.sources.len()),
                Err(e) if e.is_connectivity() => log::warn!("Assistant unreachable: {e}"),
                Err(e) => log::error!("Chat request failed: {e}"),
            }
            state.session.update(|session| {
                session.settle(generation, outcome);
            });
        });
    }

    /// Starts a fresh conversation once the current request, if any, has
    /// settled.
    pub fn reset(&self) {
        self.session.update(|session| {
            if !session.clear() {
                log::debug!("Ignoring clear while a request is in flight");
            }
        });
    }
}
