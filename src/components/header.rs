use dioxus::prelude::*;

#[component]
pub fn Header(
    settings_open: bool,
    on_toggle_settings: EventHandler<()>,
    on_export: EventHandler<()>,
) -> Element {
    rsx! {
        header {
            class: "app-header",

            h1 {
                class: "app-title",
                "AI Chat"
            }

            div {
                class: "header-actions",

                button {
                    onclick: move |_| on_toggle_settings.call(()),
                    class: "btn",
                    class: if settings_open { "btn-active" } else { "" },
                    span { class: "btn-icon", "⚙" }
                    span { "Settings" }
                }

                button {
                    onclick: move |_| on_export.call(()),
                    class: "btn",
                    title: "Save the current chat as Markdown",
                    span { class: "btn-icon", "⤓" }
                    span { "Export Chat" }
                }
            }
        }
    }
}
