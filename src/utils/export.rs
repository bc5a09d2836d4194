use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::types::Chat;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Render a chat transcript as Markdown.
pub fn to_markdown(chat: &Chat) -> String {
    let mut out = format!("# {}\n", chat.title);

    for message in chat.messages() {
        let speaker = if message.is_user { "You" } else { "Assistant" };
        out.push_str(&format!("\n**{}:**\n\n{}\n", speaker, message.content));
    }

    out
}

/// Write `chat` to `dir/chat_<id>.md`, replacing any earlier export of the same chat.
pub fn export_chat(chat: &Chat, dir: &Path) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;

    let path = dir.join(format!("chat_{}.md", chat.id));
    fs::write(&path, to_markdown(chat))?;

    tracing::info!(chat_id = %chat.id, path = %path.display(), "exported chat");
    Ok(path)
}
