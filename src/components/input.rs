use dioxus::prelude::*;

#[component]
pub fn ChatInput(
    draft: String,
    is_sending: bool,
    on_input: EventHandler<String>,
    on_send: EventHandler<()>,
) -> Element {
    let has_content = !draft.trim().is_empty();

    let handle_keydown = move |evt: KeyboardEvent| {
        if evt.key() == Key::Enter {
            evt.prevent_default();
            on_send.call(());
        }
    };

    rsx! {
        div {
            class: "input-row",

            input {
                r#type: "text",
                value: "{draft}",
                oninput: move |evt| on_input.call(evt.value()),
                onkeydown: handle_keydown,
                placeholder: "Type your message...",
                class: "text-input",
                autofocus: true,
            }

            button {
                onclick: move |_| on_send.call(()),
                disabled: is_sending || !has_content,
                class: "btn btn-send",
                span { class: "btn-icon", "➤" }
                span { if is_sending { "Sending..." } else { "Send" } }
            }
        }
    }
}
