use dioxus::prelude::*;

mod components;
mod utils;

use async_trait::async_trait;
use components::{ChatContainer, ChatInput, Header, SettingsPanel, Sidebar, StatusBanner};
use std::sync::Arc;
use utils::{
    export_chat, send_active_draft, ChatId, CompletionBackend, CompletionError, ModelChoice,
    ProviderClient, SessionHandle, SessionState, Settings,
};

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    init_tracing();
    dioxus::launch(App);
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aichat=info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

impl SessionHandle for Signal<SessionState> {
    fn update<R>(&mut self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.write())
    }
}

/// Stands in for the provider client when it could not be built, so sends
/// still end in a visible error.
struct UnavailableBackend(String);

#[async_trait]
impl CompletionBackend for UnavailableBackend {
    async fn complete(
        &self,
        _model: ModelChoice,
        _prompt: &str,
        _use_caching: bool,
    ) -> Result<String, CompletionError> {
        Err(CompletionError::Provider(self.0.clone()))
    }
}

#[component]
fn App() -> Element {
    // Load settings from disk on startup
    let mut app_settings = use_signal(|| {
        Settings::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings: {}", e);
            Settings::default()
        })
    });

    let backend = use_hook(|| -> Arc<dyn CompletionBackend> {
        match ProviderClient::new(&app_settings.peek()) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!("Failed to build HTTP client: {}", e);
                Arc::new(UnavailableBackend(format!("HTTP client is unavailable: {}", e)))
            }
        }
    });

    let mut session = use_signal(|| {
        let settings = app_settings.peek();
        SessionState::new(settings.default_model, settings.caching_enabled)
    });

    let mut settings_open = use_signal(|| false);

    let new_chat = move |_| {
        session.write().create_chat();
    };

    let select_chat = move |id: ChatId| {
        session.write().select_chat(id);
    };

    let update_draft = move |text: String| {
        session.write().update_draft(text);
    };

    let toggle_settings = move |_| {
        let open = *settings_open.read();
        settings_open.set(!open);
    };

    let change_model = move |model: ModelChoice| {
        session.write().set_model(model);

        let mut settings = app_settings.write();
        settings.default_model = model;
        if let Err(e) = settings.save() {
            tracing::warn!("Failed to save settings: {}", e);
        }
    };

    let change_caching = move |enabled: bool| {
        session.write().set_caching(enabled);

        let mut settings = app_settings.write();
        settings.caching_enabled = enabled;
        if let Err(e) = settings.save() {
            tracing::warn!("Failed to save settings: {}", e);
        }
    };

    let send_message = move |_| {
        if session.read().is_sending() {
            return;
        }

        let backend = backend.clone();
        let timeout = app_settings.read().request_timeout();

        spawn(async move {
            send_active_draft(&mut session, backend.as_ref(), timeout).await;
        });
    };

    let export_active_chat = move |_| {
        let chat = session.read().active_chat().clone();
        let result = Settings::exports_dir()
            .map_err(|e| e.to_string())
            .and_then(|dir| export_chat(&chat, &dir).map_err(|e| e.to_string()));

        match result {
            Ok(path) => session
                .write()
                .show_notice(format!("Exported to {}", path.display())),
            Err(e) => {
                tracing::warn!("Failed to export chat: {}", e);
                session.write().show_notice(format!("Export failed: {}", e));
            }
        }
    };

    let state = session.read();
    let messages = state.active_chat().messages().to_vec();
    let draft = state.draft().to_string();
    let is_sending = state.is_sending();
    let last_error = state.last_error().map(str::to_string);
    let notice = state.notice().map(str::to_string);
    let model = state.model();
    let caching_enabled = state.caching_enabled();
    drop(state);

    rsx! {
        document::Link { rel: "stylesheet", href: MAIN_CSS }

        div {
            class: "app",

            Header {
                settings_open: settings_open(),
                on_toggle_settings: toggle_settings,
                on_export: export_active_chat,
            }

            div {
                class: "app-body",

                Sidebar {
                    session,
                    on_new_chat: new_chat,
                    on_select_chat: select_chat,
                }

                main {
                    class: "chat-area",

                    if settings_open() {
                        SettingsPanel {
                            model,
                            caching_enabled,
                            on_model_change: change_model,
                            on_caching_change: change_caching,
                        }
                    }

                    ChatContainer { messages, is_sending }

                    StatusBanner { error: last_error, notice }

                    ChatInput {
                        draft,
                        is_sending,
                        on_input: update_draft,
                        on_send: send_message,
                    }
                }
            }
        }
    }
}
