mod api;
mod components;
mod errors;
mod models;
mod session;
mod state;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use api::ChatTransport;
use components::chat::ChatArea;
use state::AppState;

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let transport = ChatTransport::from_defaults();
    log::info!("Academic assistant widget using {}", transport.endpoint());
    AppState::provide(transport);

    view! {
        <div class="app-container">
            <ChatArea />
        </div>
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
