use crate::utils::{ChatId, SessionState};
use dioxus::prelude::*;

#[component]
pub fn Sidebar(
    session: Signal<SessionState>,
    on_new_chat: EventHandler<()>,
    on_select_chat: EventHandler<ChatId>,
) -> Element {
    let state = session.read();
    let active_id = state.active_chat_id();

    rsx! {
        aside {
            class: "sidebar",

            button {
                onclick: move |_| on_new_chat.call(()),
                class: "btn btn-block",
                span { class: "btn-icon", "+" }
                span { "New Chat" }
            }

            div {
                class: "chat-list",

                for chat in state.chats().iter() {
                    {
                        let chat_id = chat.id;
                        rsx! {
                            ChatItem {
                                key: "{chat.id}",
                                title: chat.title.clone(),
                                is_active: chat.id == active_id,
                                on_click: move |_| on_select_chat.call(chat_id),
                            }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn ChatItem(title: String, is_active: bool, on_click: EventHandler<()>) -> Element {
    rsx! {
        div {
            onclick: move |_| on_click.call(()),
            class: "chat-item",
            class: if is_active { "chat-item-active" } else { "" },
            title: "{title}",

            span { class: "chat-item-icon", "💬" }
            span { class: "chat-item-title", "{title}" }
        }
    }
}
