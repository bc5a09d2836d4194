use crate::utils::Message;
use dioxus::prelude::*;

#[component]
pub fn ChatContainer(messages: Vec<Message>, is_sending: bool) -> Element {
    let is_empty = messages.is_empty() && !is_sending;

    rsx! {
        div {
            class: "chat-container",

            if is_empty {
                div {
                    class: "chat-empty",
                    "Start the conversation by typing a message below."
                }
            }

            for (index, message) in messages.into_iter().enumerate() {
                MessageBubble {
                    key: "{index}",
                    content: message.content,
                    is_user: message.is_user,
                }
            }

            if is_sending {
                div {
                    class: "message message-assistant message-pending",
                    "Thinking..."
                }
            }
        }
    }
}

#[component]
fn MessageBubble(content: String, is_user: bool) -> Element {
    rsx! {
        div {
            class: "message",
            class: if is_user { "message-user" } else { "message-assistant" },
            p { "{content}" }
        }
    }
}

/// Errors take priority over informational notices.
#[component]
pub fn StatusBanner(error: Option<String>, notice: Option<String>) -> Element {
    match (error, notice) {
        (Some(error), _) => rsx! {
            div { class: "banner banner-error", "{error}" }
        },
        (None, Some(notice)) => rsx! {
            div { class: "banner banner-notice", "{notice}" }
        },
        (None, None) => rsx! {},
    }
}
