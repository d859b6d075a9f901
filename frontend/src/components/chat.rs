use leptos::ev;
use leptos::prelude::*;

use crate::models::{Message, Role};
use crate::session::ChatSession;
use crate::state::AppState;

/// Starter questions shown on an empty conversation.
const SUGGESTIONS: [&str; 3] = [
    "What subjects are in Sem 6?",
    "What are the prerequisites for Machine Learning?",
    "What are the rules for a Minor Degree?",
];

/// Main chat area with message history, busy indicator, and input.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();
    let session = state.session;

    let on_clear = {
        let state = state.clone();
        move |_| state.reset()
    };

    view! {
        <main class="chat-area">
            <div class="chat-header">
                <span class="chat-title">"Academic Assistant"</span>
                <button
                    class="clear-btn"
                    on:click=on_clear
                    disabled=move || session.with(ChatSession::is_loading)
                >
                    "Clear chat"
                </button>
            </div>

            <div class="messages-container">
                {move || {
                    if session.with(|s| s.history().is_empty()) {
                        let state = state.clone();
                        view! { <EmptyState state=state /> }.into_any()
                    } else {
                        view! {
                            <For
                                each=move || session.with(|s| s.history().to_vec())
                                key=|m| m.id
                                let:msg
                            >
                                <MessageBubble message=msg />
                            </For>
                        }.into_any()
                    }
                }}

                {move || {
                    session.with(ChatSession::is_loading).then(|| {
                        view! {
                            <div class="message assistant">
                                <div class="typing-indicator">"Thinking…"</div>
                            </div>
                        }
                    })
                }}
            </div>

            <ChatInput />
        </main>
    }
}

/// Greeting plus clickable starter questions.
#[component]
fn EmptyState(state: AppState) -> impl IntoView {
    view! {
        <div class="empty-state">
            <p>"Ask about courses, semesters, credits, or academic regulations."</p>
            <div class="suggestions">
                {SUGGESTIONS
                    .into_iter()
                    .map(|question| {
                        let state = state.clone();
                        view! {
                            <button
                                class="suggestion"
                                on:click=move |_| state.send_query(question.to_string())
                            >
                                {question}
                            </button>
                        }
                    })
                    .collect_view()}
            </div>
        </div>
    }
}

/// A single chat message bubble.
#[component]
fn MessageBubble(message: Message) -> impl IntoView {
    let Message { role, content, sources, .. } = message;
    let css_class = match role {
        Role::User => "message user",
        Role::Assistant => "message assistant",
    };

    let sources = (!sources.is_empty()).then(|| {
        view! {
            <div class="sources">
                <span class="sources-label">"Sources"</span>
                <ul>
                    {sources.into_iter().map(|s| view! { <li>{s}</li> }).collect_view()}
                </ul>
            </div>
        }
    });

    view! {
        <div class=css_class>
            <div class="role-label">
                {role.as_str()}
                <span class="timestamp">{clock_time()}</span>
            </div>
            <div class="content">{content}</div>
            {sources}
        </div>
    }
}

/// Chat input form with textarea and send button.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let session = state.session;
    let (input, set_input) = signal(String::new());

    let is_sending = move || session.with(ChatSession::is_loading);

    let send = move || {
        let text = input.get_untracked();
        if text.trim().is_empty() || session.with_untracked(ChatSession::is_loading) {
            return;
        }
        set_input.set(String::new());
        state.send_query(text);
    };

    let send_clone = send.clone();
    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send_clone();
        }
    };

    let on_submit = move |_| {
        send();
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    rows="1"
                    placeholder="Ask a question… (Enter to send, Shift+Enter for newline)"
                    prop:value=input
                    on:input=move |ev| {
                        set_input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button
                    class="send-btn"
                    on:click=on_submit
                    disabled=move || is_sending() || input.get().trim().is_empty()
                >
                    {move || if is_sending() { "Sending…" } else { "Send" }}
                </button>
            </div>
        </div>
    }
}

/// Wall-clock `HH:MM` at render time.
fn clock_time() -> String {
    let now = js_sys::Date::new_0();
    format!("{:02}:{:02}", now.get_hours(), now.get_minutes())
}
