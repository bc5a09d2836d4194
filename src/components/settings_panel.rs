use crate::utils::ModelChoice;
use dioxus::prelude::*;

#[component]
pub fn SettingsPanel(
    model: ModelChoice,
    caching_enabled: bool,
    on_model_change: EventHandler<ModelChoice>,
    on_caching_change: EventHandler<bool>,
) -> Element {
    rsx! {
        div {
            class: "settings-panel",

            h2 { "Settings" }

            div {
                class: "settings-row",
                label { "Model:" }
                select {
                    value: "{model.id()}",
                    onchange: move |evt| match evt.value().parse::<ModelChoice>() {
                        Ok(model) => on_model_change.call(model),
                        Err(e) => tracing::warn!("{}", e),
                    },
                    class: "select",

                    for choice in ModelChoice::all() {
                        option {
                            value: "{choice.id()}",
                            selected: choice == model,
                            "{choice.label()}"
                        }
                    }
                }
            }

            div {
                class: "settings-row",
                label { "Use Caching:" }
                input {
                    r#type: "checkbox",
                    checked: caching_enabled,
                    onchange: move |evt| on_caching_change.call(evt.checked()),
                    class: "checkbox",
                }
            }
        }
    }
}
