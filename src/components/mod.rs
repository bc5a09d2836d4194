mod chat;
mod header;
mod input;
mod settings_panel;
mod sidebar;

pub use chat::{ChatContainer, StatusBanner};
pub use header::Header;
pub use input::ChatInput;
pub use settings_panel::SettingsPanel;
pub use sidebar::Sidebar;
