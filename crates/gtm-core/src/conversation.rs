//! In-memory conversation state
//!
//! Owns the transcript, the recent-questions list, and the loading flag.
//! Asking is split into [`Conversation::begin`] and
//! [`Conversation::complete`] so a UI can run the request on its own task
//! and hand the result back; [`Conversation::submit`] does both in one call.

use crate::agent::{Agent, AgentError, AgentResponse};
use crate::citation::filter_citations;
use crate::state::{ChatMessage, HistoryItem};

/// Most recent questions kept in the sidebar.
pub const HISTORY_LIMIT: usize = 20;

/// A question that has been shown to the user and is waiting on the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    pub request_id: u64,
    pub question: String,
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    history: Vec<HistoryItem>,
    in_flight: usize,
    next_request_id: u64,
    streaming_message: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Partial answer text. Never filled in: answers arrive whole.
    pub fn streaming_message(&self) -> Option<&str> {
        self.streaming_message.as_deref()
    }

    /// Record the user's turn and mark a request in flight.
    pub fn begin(&mut self, question: &str) -> PendingQuestion {
        self.messages.push(ChatMessage::user(question));
        self.in_flight += 1;
        self.streaming_message = None;
        self.next_request_id += 1;

        tracing::debug!(request_id = self.next_request_id, "Question submitted");
        PendingQuestion {
            request_id: self.next_request_id,
            question: question.to_string(),
        }
    }

    /// Record the outcome of a pending question, in whatever order results arrive.
    pub fn complete(&mut self, pending: PendingQuestion, result: Result<AgentResponse, AgentError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.streaming_message = None;

        match result {
            Ok(response) => {
                let content = filter_citations(&response.answer);
                let item = HistoryItem::new(pending.question, &content);
                self.messages
                    .push(ChatMessage::assistant(content, response.sources, response.cost));
                self.history.insert(0, item);
                self.history.truncate(HISTORY_LIMIT);
            }
            Err(e) => {
                tracing::warn!(request_id = pending.request_id, error = %e, "Question failed");
                self.messages.push(ChatMessage::error());
            }
        }
    }

    /// Ask a question and wait for the answer.
    pub async fn submit<A: Agent + ?Sized>(&mut self, agent: &A, question: &str) {
        let pending = self.begin(question);
        let result = agent.ask_question(&pending.question).await;
        self.complete(pending, result);
    }

    /// Run a past question again. Only the preview of the old answer was kept.
    pub fn replay(&mut self, item: &HistoryItem) -> PendingQuestion {
        self.begin(&item.question)
    }

    /// Start over with an empty transcript; history stays.
    pub fn new_chat(&mut self) {
        self.messages.clear();
    }

    /// Forget recent questions; the transcript stays.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{render, RenderBlock};
    use crate::state::{ChatRole, ERROR_APOLOGY};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every question with a fixed response, or fails with a status.
    struct StubAgent {
        answer: Option<String>,
        status: u16,
        calls: AtomicUsize,
    }

    impl StubAgent {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                status: 200,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                answer: None,
                status,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Agent for StubAgent {
        async fn ask_question(&self, question: &str) -> Result<AgentResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Some(answer) => Ok(AgentResponse {
                    answer: format!("{} ({})", answer, question),
                    ..Default::default()
                }),
                None => Err(AgentError::RequestFailed(self.status)),
            }
        }
    }

    #[test]
    fn test_begin_appends_user_turn_immediately() {
        let mut convo = Conversation::new();
        let pending = convo.begin("What objections came up?");

        assert_eq!(convo.messages().len(), 1);
        assert_eq!(convo.messages()[0].role, ChatRole::User);
        assert_eq!(convo.messages()[0].content, "What objections came up?");
        assert!(convo.is_loading());
        assert!(convo.streaming_message().is_none());
        assert_eq!(pending.question, "What objections came up?");
    }

    #[test]
    fn test_successful_answer_scenario() {
        let mut convo = Conversation::new();
        let pending = convo.begin("What objections came up?");
        convo.complete(
            pending,
            Ok(AgentResponse {
                answer: "**Pricing**\n- too high".to_string(),
                ..Default::default()
            }),
        );

        assert!(!convo.is_loading());
        let messages = convo.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert!(!messages[1].is_error);

        let blocks = render(&messages[1].content);
        assert!(matches!(&blocks[0], RenderBlock::SectionHeader { .. }));
        assert_eq!(blocks[0].plain_text(), "Pricing");
        assert!(matches!(&blocks[1], RenderBlock::Bullet { .. }));
        assert_eq!(blocks[1].plain_text(), "too high");

        assert_eq!(convo.history().len(), 1);
        assert_eq!(convo.history()[0].question, "What objections came up?");
    }

    #[tokio::test]
    async fn test_failed_request_scenario() {
        let agent = StubAgent::failing(502);
        let mut convo = Conversation::new();
        convo.submit(&agent, "What objections came up?").await;

        let messages = convo.messages();
        assert_eq!(messages.len(), 2);
        let reply = &messages[1];
        assert_eq!(reply.role, ChatRole::Assistant);
        assert!(reply.is_error);
        assert_eq!(reply.content, ERROR_APOLOGY);
        assert!(reply.sources.is_empty());
        assert!(reply.cost.is_none());
        assert!(convo.history().is_empty());
        assert!(!convo.is_loading());
    }

    #[tokio::test]
    async fn test_history_keeps_twenty_newest() {
        let agent = StubAgent::answering("ok");
        let mut convo = Conversation::new();
        for i in 0..25 {
            convo.submit(&agent, &format!("question {}", i)).await;
        }

        assert_eq!(agent.calls.load(Ordering::SeqCst), 25);
        let questions: Vec<&str> = convo.history().iter().map(|h| h.question.as_str()).collect();
        assert_eq!(questions.len(), HISTORY_LIMIT);
        assert_eq!(questions[0], "question 24");
        assert_eq!(questions[19], "question 5");
        for i in 0..5 {
            assert!(!questions.contains(&format!("question {}", i).as_str()));
        }
    }

    #[test]
    fn test_answer_is_filtered_before_storing() {
        let mut convo = Conversation::new();
        let pending = convo.begin("q");
        convo.complete(
            pending,
            Ok(AgentResponse {
                answer: "Revenue grew [CALL summary] fast.".to_string(),
                ..Default::default()
            }),
        );
        assert_eq!(convo.messages()[1].content, "Revenue grew fast.");
        assert_eq!(convo.history()[0].preview, "Revenue grew fast....");
    }

    #[test]
    fn test_user_text_is_not_filtered() {
        let mut convo = Conversation::new();
        convo.begin("What did [CALL summary] say?");
        assert_eq!(convo.messages()[0].content, "What did [CALL summary] say?");
    }

    #[test]
    fn test_overlapping_requests_complete_in_resolution_order() {
        let mut convo = Conversation::new();
        let first = convo.begin("first");
        let second = convo.begin("second");
        assert_ne!(first.request_id, second.request_id);

        convo.complete(
            second,
            Ok(AgentResponse {
                answer: "answer two".to_string(),
                ..Default::default()
            }),
        );
        assert!(convo.is_loading());

        convo.complete(first, Err(AgentError::RequestFailed(500)));
        assert!(!convo.is_loading());

        let contents: Vec<&str> = convo.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "answer two", ERROR_APOLOGY]);
        assert_eq!(convo.history().len(), 1);
        assert_eq!(convo.history()[0].question, "second");
    }

    #[tokio::test]
    async fn test_new_chat_and_clear_history_are_independent() {
        let agent = StubAgent::answering("ok");
        let mut convo = Conversation::new();
        convo.submit(&agent, "one").await;
        convo.submit(&agent, "two").await;

        convo.new_chat();
        assert!(convo.messages().is_empty());
        assert_eq!(convo.history().len(), 2);

        convo.submit(&agent, "three").await;
        convo.clear_history();
        assert!(convo.history().is_empty());
        assert_eq!(convo.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_replay_reruns_question() {
        let agent = StubAgent::answering("fresh");
        let mut convo = Conversation::new();
        convo.submit(&agent, "pipeline?").await;
        let item = convo.history()[0].clone();

        convo.new_chat();
        let pending = convo.replay(&item);
        assert_eq!(pending.question, "pipeline?");
        assert_eq!(convo.messages()[0].content, "pipeline?");

        let result = agent.ask_question(&pending.question).await;
        convo.complete(pending, result);
        assert_eq!(agent.calls.load(Ordering::SeqCst), 2);
        assert_eq!(convo.messages()[1].content, "fresh (pipeline?)");
        assert_eq!(convo.history().len(), 2);
    }
}
