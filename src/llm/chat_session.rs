//! Chat session management for the role-aware assistant.
//!
//! A session owns one append-only transcript and allows at most one message in
//! flight at a time. A second `send_message` issued while the first is still
//! awaiting the model is rejected with [`InternMatchError::SessionBusy`]
//! rather than queued.

use crate::error::{InternMatchError, Result};
use crate::llm::client::RequestClient;
use crate::llm::models::{RoleContext, Turn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A conversation between one portal user and the assistant.
///
/// All methods take `&self`; the transcript and the in-flight flag are only
/// ever changed by [`send_message`](Self::send_message).
///
/// # Examples
///
/// ```ignore
/// use internmatch::config::AssistantConfig;
/// use internmatch::llm::{create_session, RoleContext, UserRole};
///
/// let client = AssistantConfig::from_env()?.request_client();
/// let session = create_session(client, RoleContext::new("Shrenika Kumar", UserRole::Student));
///
/// let reply = session.send_message("How do I prepare for a system design interview?").await?;
/// println!("{}", reply.text);
/// ```
pub struct ChatSession {
    session_id: Uuid,
    client: RequestClient,
    role_context: RoleContext,
    instruction: String,
    transcript: Mutex<Vec<Turn>>,
    pending: AtomicBool,
}

/// Create a session with an empty transcript.
pub fn create_session(client: RequestClient, role_context: RoleContext) -> ChatSession {
    ChatSession::builder(client, role_context).build()
}

/// Clears the in-flight flag however the send finishes, including when its
/// future is dropped before completion.
struct PendingGuard<'a> {
    pending: &'a AtomicBool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.store(false, Ordering::Release);
    }
}

impl ChatSession {
    pub fn builder(client: RequestClient, role_context: RoleContext) -> ChatSessionBuilder {
        ChatSessionBuilder::new(client, role_context)
    }

    /// Send a user message and wait for the assistant's reply.
    ///
    /// This method:
    /// 1. Rejects blank text with `InvalidArgument` and a busy session with `SessionBusy`
    /// 2. Appends the user turn
    /// 3. Asks the request client for a reply, steered by the role context
    /// 4. Appends and returns the assistant turn (possibly fallback text)
    ///
    /// If the returned future is dropped before it resolves, the session is
    /// released and no assistant turn is appended.
    pub async fn send_message(&self, text: &str) -> Result<Turn> {
        if text.trim().is_empty() {
            return Err(InternMatchError::InvalidArgument("message must not be empty".to_string()));
        }

        let _guard = self.begin_send()?;

        let user_turn = self.append(|id| Turn::user(id, text));
        info!(session_id = %self.session_id, turn_id = user_turn.id, "User message sent");

        let generation = self.client.generate_detailed(text, &self.instruction).await?;

        if generation.was_fallback {
            warn!(session_id = %self.session_id, "Assistant unavailable, recording fallback reply");
        }

        let reply = self.append(|id| Turn::assistant(id, generation.text, generation.was_fallback));
        debug!(
            session_id = %self.session_id,
            turn_id = reply.id,
            attempts = generation.attempts,
            "Assistant reply recorded"
        );

        Ok(reply)
    }

    /// Snapshot of the transcript in display order
    pub fn transcript(&self) -> Vec<Turn> {
        self.lock_transcript().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_transcript().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_transcript().is_empty()
    }

    /// True while a `send_message` call is awaiting the assistant
    pub fn pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn role_context(&self) -> &RoleContext {
        &self.role_context
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The system instruction sent with every request from this session
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    fn begin_send(&self) -> Result<PendingGuard<'_>> {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                debug!(session_id = %self.session_id, "Rejected message while busy");
                InternMatchError::SessionBusy
            })?;

        Ok(PendingGuard {
            pending: &self.pending,
        })
    }

    /// Append a turn built with the next id and return a copy of it.
    fn append(&self, make: impl FnOnce(u64) -> Turn) -> Turn {
        let mut transcript = self.lock_transcript();
        let turn = make(transcript.len() as u64 + 1);
        transcript.push(turn.clone());
        turn
    }

    fn lock_transcript(&self) -> MutexGuard<'_, Vec<Turn>> {
        self.transcript.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Builder for constructing a `ChatSession` with custom configuration.
pub struct ChatSessionBuilder {
    client: RequestClient,
    role_context: RoleContext,
    greeting: bool,
    instruction: Option<String>,
}

impl ChatSessionBuilder {
    fn new(client: RequestClient, role_context: RoleContext) -> Self {
        Self {
            client,
            role_context,
            greeting: false,
            instruction: None,
        }
    }

    /// Seed the transcript with a personalised assistant greeting
    pub fn with_greeting(mut self) -> Self {
        self.greeting = true;
        self
    }

    /// Replace the role-derived instruction prefix
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn build(self) -> ChatSession {
        let session_id = Uuid::new_v4();
        let instruction =
            self.instruction.unwrap_or_else(|| self.role_context.instruction_prefix());

        let transcript = if self.greeting {
            vec![Turn::assistant(1, self.role_context.greeting(), false)]
        } else {
            Vec::new()
        };

        info!(
            session_id = %session_id,
            role = %self.role_context.role,
            "Chat session created"
        );

        ChatSession {
            session_id,
            client: self.client,
            role_context: self.role_context,
            instruction,
            transcript: Mutex::new(transcript),
            pending: AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::FALLBACK_TEXT;
    use crate::llm::gateway::{GenerateRequest, TextGateway};
    use crate::llm::models::{Speaker, UserRole};
    use crate::llm::retry::RetryPolicy;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    // Mock gateway that echoes the prompt after an optional delay
    struct MockGateway {
        delay: Duration,
        fail: bool,
        requests: std::sync::Mutex<Vec<GenerateRequest>>,
    }

    impl MockGateway {
        fn echo() -> Self {
            Self {
                delay: Duration::ZERO,
                fail: false,
                requests: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::echo()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::echo()
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGateway for MockGateway {
        async fn generate_content(&self, request: &GenerateRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(InternMatchError::Transport("HTTP 500".to_string()));
            }
            Ok(format!("re: {}", request.prompt))
        }
    }

    fn session_with(gateway: Arc<MockGateway>) -> ChatSession {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), 2.0).unwrap();
        let client = RequestClient::new(gateway, policy);
        create_session(client, RoleContext::new("Shrenika Kumar", UserRole::Student))
    }

    #[tokio::test]
    async fn test_new_session_is_empty_and_idle() {
        let session = session_with(Arc::new(MockGateway::echo()));

        assert!(session.is_empty());
        assert!(!session.pending());
        assert_eq!(session.role_context().role, UserRole::Student);
    }

    #[tokio::test]
    async fn test_builder_with_greeting() {
        let client = RequestClient::new(Arc::new(MockGateway::echo()), RetryPolicy::default());
        let session = ChatSession::builder(client, RoleContext::new("Prof. Sharma", UserRole::Faculty))
            .with_greeting()
            .build();

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].speaker, Speaker::Assistant);
        assert!(transcript[0].text.starts_with("Hi Prof. Sharma!"));
    }

    #[tokio::test]
    async fn test_send_appends_user_then_assistant() {
        let gateway = Arc::new(MockGateway::echo());
        let session = session_with(gateway.clone());

        let reply = session.send_message("Hello").await.unwrap();

        assert_eq!(reply.text, "re: Hello");
        assert!(!reply.was_fallback);
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].speaker, Speaker::User);
        assert_eq!(transcript[0].text, "Hello");
        assert_eq!(transcript[1].speaker, Speaker::Assistant);
        assert_eq!(transcript[1], reply);
        assert!(!session.pending());
    }

    #[tokio::test]
    async fn test_request_carries_role_instruction() {
        let gateway = Arc::new(MockGateway::echo());
        let session = session_with(gateway.clone());

        session.send_message("Review my resume").await.unwrap();

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[0].prompt, "Review my resume");
        let instruction = requests[0].system_instruction.as_deref().unwrap();
        assert_eq!(instruction, session.instruction());
        assert!(instruction.contains("role: student"));
        assert!(instruction.contains("interview prep"));
    }

    #[tokio::test]
    async fn test_turns_alternate_and_ids_increase() {
        let session = session_with(Arc::new(MockGateway::echo()));

        for query in ["one", "two", "three"] {
            session.send_message(query).await.unwrap();
        }

        let transcript = session.transcript();
        assert_eq!(transcript.len() % 2, 0);
        for (index, turn) in transcript.iter().enumerate() {
            let expected = if index % 2 == 0 { Speaker::User } else { Speaker::Assistant };
            assert_eq!(turn.speaker, expected);
            assert_eq!(turn.id, index as u64 + 1);
        }
    }

    #[tokio::test]
    async fn test_empty_message_rejected_without_side_effects() {
        let gateway = Arc::new(MockGateway::echo());
        let session = session_with(gateway.clone());

        let result = session.send_message("").await;
        assert!(matches!(result, Err(InternMatchError::InvalidArgument(_))));

        let result = session.send_message(" \n\t").await;
        assert!(matches!(result, Err(InternMatchError::InvalidArgument(_))));

        assert!(session.is_empty());
        assert!(!session.pending());
        assert_eq!(gateway.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_send_is_rejected_as_busy() {
        let gateway = Arc::new(MockGateway::slow(Duration::from_secs(2)));
        let session = session_with(gateway.clone());

        let (first, second) =
            tokio::join!(session.send_message("first"), session.send_message("second"));

        assert_eq!(first.unwrap().text, "re: first");
        assert!(matches!(second, Err(InternMatchError::SessionBusy)));

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].text, "first");
        assert_eq!(transcript[1].text, "re: first");
        assert_eq!(gateway.request_count(), 1);
        assert!(!session.pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_is_visible_while_in_flight() {
        let session = session_with(Arc::new(MockGateway::slow(Duration::from_secs(2))));

        let send = session.send_message("Hello");
        tokio::pin!(send);

        tokio::select! {
            _ = &mut send => panic!("send should still be waiting"),
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
        }
        assert!(session.pending());
        assert_eq!(session.len(), 1);

        send.await.unwrap();
        assert!(!session.pending());
        assert_eq!(session.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_send_busy_until_first_dropped() {
        // Reply delay stays inside the per-attempt timeout so the third send succeeds
        let session = session_with(Arc::new(MockGateway::slow(Duration::from_secs(10))));

        let mut first = tokio_test::task::spawn(session.send_message("first"));
        tokio_test::assert_pending!(first.poll());

        assert!(matches!(
            session.send_message("second").await,
            Err(InternMatchError::SessionBusy)
        ));

        drop(first);
        assert!(!session.pending());
        assert_eq!(session.send_message("third").await.unwrap().text, "re: third");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_share_one_client_concurrently() {
        let gateway = Arc::new(MockGateway::slow(Duration::from_secs(2)));
        let policy = RetryPolicy::new(3, Duration::from_millis(10), 2.0).unwrap();
        let client = RequestClient::new(gateway.clone(), policy);

        let student =
            create_session(client.clone(), RoleContext::new("Shrenika Kumar", UserRole::Student));
        let company = create_session(client, RoleContext::new("TechCorp Hiring", UserRole::Company));

        let started = tokio::time::Instant::now();
        let (a, b) = tokio::join!(
            student.send_message("resume tips"),
            company.send_message("funnel report")
        );

        // Both replies arrive after one delay, so the calls overlapped
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(a.unwrap().text, "re: resume tips");
        assert_eq!(b.unwrap().text, "re: funnel report");
        assert_eq!(gateway.request_count(), 2);

        let student_turns = student.transcript();
        let company_turns = company.transcript();
        assert_eq!(student_turns.len(), 2);
        assert_eq!(company_turns.len(), 2);
        assert_eq!(student_turns[0].text, "resume tips");
        assert_eq!(company_turns[0].text, "funnel report");

        let requests = gateway.requests.lock().unwrap();
        let instructions: Vec<_> =
            requests.iter().filter_map(|r| r.system_instruction.clone()).collect();
        assert!(instructions.iter().any(|i| i.contains("role: student")));
        assert!(instructions.iter().any(|i| i.contains("role: company")));
    }

    #[tokio::test]
    async fn test_exhausted_retries_record_fallback_turn() {
        let gateway = Arc::new(MockGateway::failing());
        let session = session_with(gateway.clone());

        let reply = session.send_message("Hello").await.unwrap();

        assert_eq!(reply.text, FALLBACK_TEXT);
        assert!(reply.was_fallback);
        assert_eq!(session.len(), 2);
        assert_eq!(gateway.request_count(), 3);
        assert!(!session.pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_send_releases_session() {
        let session = session_with(Arc::new(MockGateway::slow(Duration::from_secs(3600))));

        let result =
            tokio::time::timeout(Duration::from_millis(100), session.send_message("Hello")).await;
        assert!(result.is_err());

        assert!(!session.pending());
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].speaker, Speaker::User);
    }

    #[tokio::test]
    async fn test_reads_do_not_mutate() {
        let session = session_with(Arc::new(MockGateway::echo()));
        session.send_message("Hello").await.unwrap();

        let before = session.transcript();
        let _ = session.pending();
        let _ = session.transcript();
        let _ = session.len();

        assert_eq!(session.transcript(), before);
        assert!(!session.pending());
    }
}
