use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::backend::ChatBackend;
use crate::chat::{Conversation, Message};
use crate::notify::{NoticeKind, Notify};

/// Fixed description shown whenever a send fails, whatever the cause.
pub const BACKEND_UNREACHABLE: &str =
    "Could not reach the model endpoint. Make sure the server is running with: ollama serve";

/// Drives one turn of the conversation: dispatch spawns the backend request,
/// reconcile folds the settled result back into the transcript. At most one
/// request is in flight; the busy flag on the conversation is the gate.
pub struct ChatSession {
    conversation: Conversation,
    backend: Arc<dyn ChatBackend>,
    in_flight: Option<JoinHandle<anyhow::Result<String>>>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            conversation: Conversation::new(),
            backend,
            in_flight: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Starts a send. A no-op (returns false) when the draft is empty or a
    /// request is already in flight; otherwise appends the user message,
    /// resets the draft, raises the busy flag and spawns the backend call.
    pub fn dispatch(&mut self) -> bool {
        if self.conversation.draft().is_empty() || self.conversation.busy() {
            return false;
        }

        let draft = self.conversation.draft().clone();
        self.conversation
            .append(Message::user(draft.text.clone(), draft.image.clone()));
        self.conversation.clear_draft();
        self.conversation.set_busy(true);

        let backend = Arc::clone(&self.backend);
        self.in_flight = Some(tokio::spawn(async move {
            backend.request_reply(&draft.text, draft.image.as_ref()).await
        }));
        true
    }

    /// True once the in-flight request has settled and reconcile will not block.
    pub fn reply_ready(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|task| task.is_finished())
    }

    /// Folds the settled request into the conversation: the reply is appended
    /// as an assistant message, any failure becomes a single error notice.
    /// The user message stays in the transcript either way, so the input can
    /// be retried. The busy flag is cleared on both paths.
    pub async fn reconcile(&mut self, notifier: &mut dyn Notify) {
        let Some(task) = self.in_flight.take() else {
            return;
        };

        match task.await {
            Ok(Ok(reply)) => self.conversation.append(Message::assistant(reply)),
            Ok(Err(_)) | Err(_) => {
                notifier.notify(NoticeKind::Error, "Connection failed", BACKEND_UNREACHABLE);
            }
        }

        self.conversation.set_busy(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use crate::attachment::ImagePayload;
    use crate::chat::Role;

    struct StubBackend {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl StubBackend {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for StubBackend {
        async fn request_reply(
            &self,
            _text: &str,
            _image: Option<&ImagePayload>,
        ) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(anyhow!("connection refused")),
            }
        }
    }

    /// Backend that blocks until a permit is released, to hold a send in flight.
    struct GatedBackend {
        gate: Semaphore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatBackend for GatedBackend {
        async fn request_reply(
            &self,
            _text: &str,
            _image: Option<&ImagePayload>,
        ) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _permit = self.gate.acquire().await?;
            Ok("late reply".to_string())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notices: Vec<(NoticeKind, String, String)>,
    }

    impl Notify for RecordingNotifier {
        fn notify(&mut self, kind: NoticeKind, title: &str, description: &str) {
            self.notices
                .push((kind, title.to_string(), description.to_string()));
        }
    }

    #[tokio::test]
    async fn test_successful_turns_alternate_user_then_assistant() {
        let backend = Arc::new(StubBackend::replying("Hi there"));
        let mut session = ChatSession::new(backend.clone());
        let mut notifier = RecordingNotifier::default();

        for turn in 1..=3 {
            session.conversation_mut().set_draft_text("Hello");
            assert!(session.dispatch());
            session.reconcile(&mut notifier).await;
            assert_eq!(session.conversation().messages().len(), 2 * turn);
        }

        for (i, message) in session.conversation().messages().iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role, expected);
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert!(notifier.notices.is_empty());
        assert!(!session.conversation().busy());
    }

    #[tokio::test]
    async fn test_hello_turn_round_trip() {
        let mut session = ChatSession::new(Arc::new(StubBackend::replying("Hi there")));
        let mut notifier = RecordingNotifier::default();

        session.conversation_mut().set_draft_text("Hello");
        assert!(session.dispatch());

        let user = &session.conversation().messages()[0];
        assert_eq!(user.role, Role::User);
        assert_eq!(user.text, "Hello");
        assert!(user.image.is_none());

        session.reconcile(&mut notifier).await;
        let assistant = &session.conversation().messages()[1];
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.text, "Hi there");
    }

    #[tokio::test]
    async fn test_empty_draft_is_a_noop() {
        let backend = Arc::new(StubBackend::replying("unused"));
        let mut session = ChatSession::new(backend.clone());

        assert!(!session.dispatch());
        assert!(session.conversation().messages().is_empty());
        assert!(!session.conversation().busy());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_while_busy_is_a_noop() {
        let backend = Arc::new(GatedBackend {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        });
        let mut session = ChatSession::new(backend.clone());
        let mut notifier = RecordingNotifier::default();

        session.conversation_mut().set_draft_text("first");
        assert!(session.dispatch());
        assert!(session.conversation().busy());

        session.conversation_mut().set_draft_text("second");
        assert!(!session.dispatch());
        assert_eq!(session.conversation().messages().len(), 1);

        backend.gate.add_permits(1);
        session.reconcile(&mut notifier).await;

        assert!(!session.conversation().busy());
        assert_eq!(session.conversation().messages().len(), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_send_keeps_user_message_and_notifies_once() {
        let mut session = ChatSession::new(Arc::new(StubBackend::failing()));
        let mut notifier = RecordingNotifier::default();

        session.conversation_mut().set_draft_text("are you there?");
        assert!(session.dispatch());
        session.reconcile(&mut notifier).await;

        assert_eq!(session.conversation().messages().len(), 1);
        assert_eq!(session.conversation().messages()[0].role, Role::User);
        assert!(!session.conversation().busy());

        assert_eq!(notifier.notices.len(), 1);
        let (kind, _, description) = &notifier.notices[0];
        assert_eq!(*kind, NoticeKind::Error);
        assert_eq!(description, BACKEND_UNREACHABLE);
    }

    #[tokio::test]
    async fn test_image_only_draft_dispatches() {
        let mut session = ChatSession::new(Arc::new(StubBackend::replying("a cat")));
        let mut notifier = RecordingNotifier::default();

        session
            .conversation_mut()
            .set_draft_image(Some(ImagePayload::new("image/png", "aGVsbG8=")));
        assert!(session.dispatch());

        let user = &session.conversation().messages()[0];
        assert_eq!(user.text, "");
        assert!(user.image.is_some());

        session.reconcile(&mut notifier).await;
        assert_eq!(session.conversation().messages().len(), 2);
    }

    #[tokio::test]
    async fn test_draft_cleared_on_dispatch() {
        let mut session = ChatSession::new(Arc::new(StubBackend::replying("ok")));

        session.conversation_mut().set_draft_text("to send");
        session
            .conversation_mut()
            .set_draft_image(Some(ImagePayload::new("image/png", "aGVsbG8=")));
        assert!(session.dispatch());

        assert!(session.conversation().draft().is_empty());
        assert!(session.conversation().draft().image.is_none());
    }

    #[tokio::test]
    async fn test_reconcile_without_dispatch_does_nothing() {
        let mut session = ChatSession::new(Arc::new(StubBackend::replying("ok")));
        let mut notifier = RecordingNotifier::default();

        session.reconcile(&mut notifier).await;
        assert!(session.conversation().messages().is_empty());
        assert!(notifier.notices.is_empty());
    }
}
