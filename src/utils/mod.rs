mod completion;
mod export;
mod session;
mod settings;
mod types;

pub use completion::{CompletionBackend, CompletionError, ProviderClient};
pub use export::export_chat;
pub use session::{send_active_draft, SessionHandle, SessionState};
pub use settings::Settings;
pub use types::{ChatId, Message, ModelChoice};
