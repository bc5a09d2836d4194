use std::time::Duration;

use super::completion::{CompletionBackend, CompletionError};
use super::types::{Chat, ChatId, Message, ModelChoice};

const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Where the single send slot currently is.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SendPhase {
    Idle,
    Sending { chat_id: ChatId },
}

/// Proof that a send was started. Only [`SessionState::begin_send`] hands one
/// out, and it is consumed by [`SessionState::finish_send`].
#[derive(Debug, PartialEq)]
pub struct SendTicket {
    chat_id: ChatId,
    prompt: String,
    model: ModelChoice,
    use_caching: bool,
}

/// Everything the chat window shows, owned in one place.
///
/// There is always at least one chat and the active index always points into
/// `chats`. Chats are never removed, so chat ids double as `index + 1`.
#[derive(Clone, PartialEq, Debug)]
pub struct SessionState {
    chats: Vec<Chat>,
    active: usize,
    draft: String,
    phase: SendPhase,
    last_error: Option<String>,
    // One-off messages such as export results
    notice: Option<String>,
    model: ModelChoice,
    caching_enabled: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(ModelChoice::default(), false)
    }
}

impl SessionState {
    pub fn new(model: ModelChoice, caching_enabled: bool) -> Self {
        Self {
            chats: vec![Chat::new(ChatId(1), DEFAULT_CHAT_TITLE)],
            active: 0,
            draft: String::new(),
            phase: SendPhase::Idle,
            last_error: None,
            notice: None,
            model,
            caching_enabled,
        }
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    fn chat_mut(&mut self, id: ChatId) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|chat| chat.id == id)
    }

    pub fn active_chat(&self) -> &Chat {
        &self.chats[self.active]
    }

    pub fn active_chat_id(&self) -> ChatId {
        self.active_chat().id
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_sending(&self) -> bool {
        matches!(self.phase, SendPhase::Sending { .. })
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Show a notice until the next chat switch or send.
    pub fn show_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
    }

    pub fn model(&self) -> ModelChoice {
        self.model
    }

    pub fn caching_enabled(&self) -> bool {
        self.caching_enabled
    }

    pub fn create_chat(&mut self) -> ChatId {
        let number = self.chats.len() + 1;
        let id = ChatId(number as u32);
        self.chats
            .push(Chat::new(id, format!("{} {}", DEFAULT_CHAT_TITLE, number)));
        self.active = self.chats.len() - 1;
        self.notice = None;
        tracing::info!(chat_id = %id, "created chat");
        id
    }

    /// Switch the active chat. Ids come from [`Self::chats`], so an unknown id
    /// is a caller bug; it is logged and ignored.
    pub fn select_chat(&mut self, id: ChatId) {
        match self.chats.iter().position(|chat| chat.id == id) {
            Some(index) => {
                self.active = index;
                self.notice = None;
            }
            None => tracing::warn!(chat_id = %id, "ignoring selection of unknown chat"),
        }
    }

    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn set_model(&mut self, model: ModelChoice) {
        self.model = model;
    }

    pub fn set_caching(&mut self, enabled: bool) {
        self.caching_enabled = enabled;
    }

    /// First half of a send: records the user's message and claims the send
    /// slot. Returns `None` without touching anything when the draft is blank
    /// or a send is already in flight.
    pub fn begin_send(&mut self) -> Option<SendTicket> {
        if self.draft.trim().is_empty() || self.is_sending() {
            return None;
        }

        let prompt = std::mem::take(&mut self.draft);
        let chat = &mut self.chats[self.active];
        chat.push(Message::user(prompt.clone()));
        let chat_id = chat.id;

        self.phase = SendPhase::Sending { chat_id };
        self.last_error = None;
        self.notice = None;

        tracing::info!(
            chat_id = %chat_id,
            model = %self.model,
            use_caching = self.caching_enabled,
            "sending message"
        );

        Some(SendTicket {
            chat_id,
            prompt,
            model: self.model,
            use_caching: self.caching_enabled,
        })
    }

    /// Second half of a send. The reply goes to the chat the ticket was issued
    /// for, even if another chat has been selected since.
    pub fn finish_send(&mut self, ticket: SendTicket, outcome: Result<String, CompletionError>) {
        if self.phase != (SendPhase::Sending { chat_id: ticket.chat_id }) {
            tracing::warn!(chat_id = %ticket.chat_id, "ignoring outcome for a send that is not in flight");
            return;
        }
        self.phase = SendPhase::Idle;

        match outcome {
            Ok(text) => match self.chat_mut(ticket.chat_id) {
                Some(chat) => {
                    chat.push(Message::assistant(text));
                    tracing::info!(chat_id = %ticket.chat_id, "received response");
                }
                None => tracing::warn!(chat_id = %ticket.chat_id, "reply target chat is gone"),
            },
            Err(err) => {
                tracing::warn!(chat_id = %ticket.chat_id, error = %err, "completion failed");
                self.last_error = Some(format!(
                    "Failed to get response from AI: {}. Please check the console for more details.",
                    err
                ));
            }
        }
    }
}

/// Anything that gives short, synchronous access to the session state.
///
/// The state is only borrowed inside `update`, never across an await, so the
/// UI stays free to mutate it while a completion is pending.
pub trait SessionHandle {
    fn update<R>(&mut self, f: impl FnOnce(&mut SessionState) -> R) -> R;
}

impl SessionHandle for SessionState {
    fn update<R>(&mut self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(self)
    }
}

/// Send the active draft: claim the slot, call `backend`, record the outcome.
/// Returns whether a request was actually made.
pub async fn send_active_draft<H, B>(session: &mut H, backend: &B, timeout: Duration) -> bool
where
    H: SessionHandle,
    B: CompletionBackend + ?Sized,
{
    let Some(ticket) = session.update(SessionState::begin_send) else {
        return false;
    };
    let outcome = request_completion(backend, &ticket, timeout).await;
    session.update(|state| state.finish_send(ticket, outcome));
    true
}

/// Call the backend for `ticket`, turning an overrun of `timeout` into a
/// regular failure so the send slot is always released.
async fn request_completion<B>(
    backend: &B,
    ticket: &SendTicket,
    timeout: Duration,
) -> Result<String, CompletionError>
where
    B: CompletionBackend + ?Sized,
{
    let call = backend.complete(ticket.model, &ticket.prompt, ticket.use_caching);
    match tokio::time::timeout(timeout, call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(CompletionError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::collections::{HashSet, VecDeque};
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    const TIMEOUT: Duration = Duration::from_secs(120);

    /// Replays canned outcomes and records every call it receives.
    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
        calls: Mutex<Vec<(ModelChoice, String, bool)>>,
    }

    impl ScriptedBackend {
        fn replying(outcomes: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(outcomes.into()),
                calls: Mutex::default(),
            }
        }

        fn calls(&self) -> Vec<(ModelChoice, String, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            model: ModelChoice,
            prompt: &str,
            use_caching: bool,
        ) -> Result<String, CompletionError> {
            self.calls
                .lock()
                .unwrap()
                .push((model, prompt.to_string(), use_caching));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CompletionError::Provider("no scripted reply".to_string())))
        }
    }

    /// Never answers.
    struct HangingBackend;

    #[async_trait]
    impl CompletionBackend for HangingBackend {
        async fn complete(
            &self,
            _model: ModelChoice,
            _prompt: &str,
            _use_caching: bool,
        ) -> Result<String, CompletionError> {
            std::future::pending::<Result<String, CompletionError>>().await
        }
    }

    /// Holds every call until `release` is called.
    #[derive(Default)]
    struct GatedBackend {
        gate: Notify,
        calls: AtomicUsize,
    }

    impl GatedBackend {
        fn release(&self) {
            self.gate.notify_one();
        }
    }

    #[async_trait]
    impl CompletionBackend for GatedBackend {
        async fn complete(
            &self,
            _model: ModelChoice,
            prompt: &str,
            _use_caching: bool,
        ) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(format!("reply to {}", prompt))
        }
    }

    /// Shared state, the way the UI holds it while a send is pending.
    #[derive(Clone, Default)]
    struct SharedSession(Rc<RefCell<SessionState>>);

    impl SessionHandle for SharedSession {
        fn update<R>(&mut self, f: impl FnOnce(&mut SessionState) -> R) -> R {
            f(&mut self.0.borrow_mut())
        }
    }

    #[test]
    fn test_initial_state() {
        let state = SessionState::default();
        assert_eq!(state.chats().len(), 1);
        assert_eq!(state.active_chat().title, "New Chat");
        assert_eq!(state.active_chat_id(), ChatId(1));
        assert!(state.active_chat().messages().is_empty());
        assert_eq!(state.draft(), "");
        assert!(!state.is_sending());
        assert_eq!(state.last_error(), None);
        assert_eq!(state.model(), ModelChoice::Claude);
        assert!(!state.caching_enabled());
    }

    #[test]
    fn test_create_chat_twice() {
        let mut state = SessionState::default();
        state.create_chat();
        let last = state.create_chat();

        let ids: Vec<ChatId> = state.chats().iter().map(|chat| chat.id).collect();
        assert_eq!(ids, vec![ChatId(1), ChatId(2), ChatId(3)]);
        assert_eq!(state.active_chat_id(), last);
        assert_eq!(state.active_chat().title, "New Chat 3");
    }

    #[test]
    fn test_created_ids_are_unique() {
        let mut state = SessionState::default();
        for _ in 0..25 {
            state.create_chat();
        }
        let ids: HashSet<ChatId> = state.chats().iter().map(|chat| chat.id).collect();
        assert_eq!(state.chats().len(), 26);
        assert_eq!(ids.len(), 26);
    }

    #[test]
    fn test_select_chat() {
        let mut state = SessionState::default();
        state.create_chat();
        state.select_chat(ChatId(1));
        assert_eq!(state.active_chat_id(), ChatId(1));

        state.select_chat(ChatId(42));
        assert_eq!(state.active_chat_id(), ChatId(1));
    }

    #[test]
    fn test_settings_setters_are_idempotent() {
        let mut once = SessionState::default();
        once.set_model(ModelChoice::ChatGpt);
        once.set_caching(true);

        let mut twice = SessionState::default();
        twice.set_model(ModelChoice::ChatGpt);
        twice.set_model(ModelChoice::ChatGpt);
        twice.set_caching(true);
        twice.set_caching(true);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_blank_draft_is_ignored() {
        for draft in ["", "   ", "\n\t "] {
            let mut state = SessionState::default();
            state.update_draft(draft);
            let before = state.clone();

            assert!(state.begin_send().is_none());
            assert_eq!(state, before);
        }
    }

    #[test]
    fn test_begin_send_claims_slot() {
        let mut state = SessionState::default();
        state.set_caching(true);
        state.update_draft("hello");

        let ticket = state.begin_send().unwrap();
        assert_eq!(
            ticket,
            SendTicket {
                chat_id: ChatId(1),
                prompt: "hello".to_string(),
                model: ModelChoice::Claude,
                use_caching: true,
            }
        );

        assert_eq!(state.draft(), "");
        assert!(state.is_sending());
        assert_eq!(state.active_chat().messages(), &[Message::user("hello")]);
    }

    #[test]
    fn test_second_send_while_pending_is_ignored() {
        let mut state = SessionState::default();
        state.update_draft("first");
        let ticket = state.begin_send().unwrap();

        state.update_draft("second");
        assert!(state.begin_send().is_none());
        assert_eq!(state.active_chat().messages().len(), 1);
        assert_eq!(state.draft(), "second");

        state.finish_send(ticket, Ok("reply".to_string()));
        assert!(!state.is_sending());
        assert!(state.begin_send().is_some());
    }

    #[test]
    fn test_sending_is_global_across_chats() {
        let mut state = SessionState::default();
        state.update_draft("first");
        let _ticket = state.begin_send().unwrap();

        state.create_chat();
        state.update_draft("other chat");
        assert!(state.begin_send().is_none());
        assert!(state.active_chat().messages().is_empty());
    }

    #[test]
    fn test_reply_goes_to_original_chat_after_switch() {
        let mut state = SessionState::default();
        state.update_draft("hello");
        let ticket = state.begin_send().unwrap();

        state.create_chat();
        state.update_draft("typing elsewhere");
        state.finish_send(ticket, Ok("hi there".to_string()));

        assert_eq!(state.active_chat_id(), ChatId(2));
        assert!(state.active_chat().messages().is_empty());
        assert_eq!(state.draft(), "typing elsewhere");
        assert_eq!(
            state.chats()[0].messages(),
            &[Message::user("hello"), Message::assistant("hi there")]
        );
    }

    #[test]
    fn test_new_send_clears_previous_error() {
        let mut state = SessionState::default();
        state.update_draft("hello");
        let ticket = state.begin_send().unwrap();
        state.finish_send(ticket, Err(CompletionError::Provider("boom".to_string())));
        assert!(state.last_error().is_some());

        state.update_draft("again");
        let _ticket = state.begin_send().unwrap();
        assert_eq!(state.last_error(), None);
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut other = SessionState::default();
        other.create_chat();
        other.update_draft("elsewhere");
        let foreign = other.begin_send().unwrap();

        let mut state = SessionState::default();
        let before = state.clone();
        state.finish_send(foreign, Ok("reply".to_string()));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_successful_send() {
        let backend = ScriptedBackend::replying(vec![Ok("hi there".to_string())]);
        let mut state = SessionState::default();
        state.update_draft("hello");

        assert!(send_active_draft(&mut state, &backend, TIMEOUT).await);

        assert_eq!(
            state.active_chat().messages(),
            &[Message::user("hello"), Message::assistant("hi there")]
        );
        assert_eq!(state.draft(), "");
        assert_eq!(state.last_error(), None);
        assert!(!state.is_sending());
        assert_eq!(
            backend.calls(),
            vec![(ModelChoice::Claude, "hello".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_failed_send_keeps_user_message() {
        let backend =
            ScriptedBackend::replying(vec![Err(CompletionError::Provider("timeout".to_string()))]);
        let mut state = SessionState::default();
        state.update_draft("hello");

        assert!(send_active_draft(&mut state, &backend, TIMEOUT).await);

        assert_eq!(state.active_chat().messages(), &[Message::user("hello")]);
        assert!(!state.is_sending());
        let error = state.last_error().unwrap();
        assert!(error.starts_with("Failed to get response from AI: timeout"));
        assert_eq!(
            error,
            "Failed to get response from AI: timeout. Please check the console for more details."
        );
    }

    #[tokio::test]
    async fn test_blank_send_never_calls_backend() {
        let backend = ScriptedBackend::default();
        let mut state = SessionState::default();
        state.update_draft("  ");

        assert!(!send_active_draft(&mut state, &backend, TIMEOUT).await);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_send_uses_current_settings() {
        let backend = ScriptedBackend::replying(vec![Ok("ok".to_string())]);
        let mut state = SessionState::default();
        state.set_model(ModelChoice::ChatGpt);
        state.set_caching(true);
        state.update_draft("hello");

        send_active_draft(&mut state, &backend, TIMEOUT).await;
        assert_eq!(
            backend.calls(),
            vec![(ModelChoice::ChatGpt, "hello".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let backend = ScriptedBackend::replying(vec![
            Err(CompletionError::Provider("overloaded".to_string())),
            Ok("hi there".to_string()),
        ]);
        let mut state = SessionState::default();

        state.update_draft("hello");
        send_active_draft(&mut state, &backend, TIMEOUT).await;
        state.update_draft("hello");
        send_active_draft(&mut state, &backend, TIMEOUT).await;

        assert_eq!(
            state.active_chat().messages(),
            &[
                Message::user("hello"),
                Message::user("hello"),
                Message::assistant("hi there"),
            ]
        );
        assert_eq!(state.last_error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_backend_times_out() {
        let mut state = SessionState::default();
        state.update_draft("hello");

        assert!(
            send_active_draft(&mut state, &HangingBackend, Duration::from_secs(30))
                .await
        );

        assert!(!state.is_sending());
        assert_eq!(state.active_chat().messages(), &[Message::user("hello")]);
        assert_eq!(
            state.last_error(),
            Some(
                "Failed to get response from AI: request timed out after 30s. Please check the console for more details."
            )
        );
    }

    #[tokio::test]
    async fn test_interaction_while_send_is_pending() {
        let backend = GatedBackend::default();
        let mut session = SharedSession::default();
        session.update(|state| state.update_draft("hello"));

        let mut ui = session.clone();
        let (sent, ()) = tokio::join!(
            send_active_draft(&mut session, &backend, TIMEOUT),
            async {
                tokio::task::yield_now().await;
                assert!(ui.update(|state| state.is_sending()));

                // A second send is refused and never reaches the backend.
                ui.update(|state| state.update_draft("again"));
                assert!(!send_active_draft(&mut ui, &backend, TIMEOUT).await);
                assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

                // Everything else keeps working.
                ui.update(|state| {
                    state.create_chat();
                    state.update_draft("draft in chat 2");
                });

                backend.release();
            }
        );

        assert!(sent);
        let state = session.0.borrow();
        assert!(!state.is_sending());
        assert_eq!(state.active_chat_id(), ChatId(2));
        assert_eq!(state.draft(), "draft in chat 2");
        assert!(state.active_chat().messages().is_empty());
        assert_eq!(
            state.chats()[0].messages(),
            &[Message::user("hello"), Message::assistant("reply to hello")]
        );
    }

    #[test]
    fn test_notice_clears_on_chat_switch() {
        let mut state = SessionState::default();
        state.create_chat();

        state.show_notice("Exported to /tmp/chat_2.md");
        state.select_chat(ChatId(1));
        assert_eq!(state.notice(), None);

        state.show_notice("Exported to /tmp/chat_1.md");
        state.select_chat(ChatId(9));
        assert_eq!(state.notice(), Some("Exported to /tmp/chat_1.md"));

        state.create_chat();
        assert_eq!(state.notice(), None);

        state.show_notice("Export failed: disk full");
        state.update_draft("hi");
        let _ticket = state.begin_send().unwrap();
        assert_eq!(state.notice(), None);
    }
}
