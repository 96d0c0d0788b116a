//! Hosted chat model access
//!
//! [`ChatBackend`] is the seam to the provider: given the full request it
//! opens a stream of text fragments. [`ChatSession`] is the per-session
//! handle the rest of the app holds; it carries the system instruction and
//! the turns exchanged so far.

pub mod gemini;

pub use gemini::GeminiClient;

use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ChatError;
use crate::state::ChatMessage;

/// Lazy, finite sequence of reply fragments. Concatenated in order they
/// form the full reply.
pub type FragmentStream = BoxStream<'static, Result<String, ChatError>>;

/// Everything the provider needs for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_instruction: String,
    /// Prior turns followed by the new user message
    pub contents: Vec<ChatMessage>,
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn open_stream(&self, request: ChatRequest) -> Result<FragmentStream, ChatError>;

    fn model_name(&self) -> &str;
}

/// Session handle, created once at startup and cloned into each reply task.
#[derive(Clone)]
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    system_instruction: Arc<str>,
    history: Arc<Mutex<Vec<ChatMessage>>>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatBackend>, system_instruction: &str) -> Self {
        Self {
            backend,
            system_instruction: Arc::from(system_instruction),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Send `message` with the session history and stream the reply.
    ///
    /// The turn is added to the history only once the returned stream has
    /// been read to the end without error; a failed turn leaves the history
    /// as it was.
    pub async fn send_message_stream(&self, message: &str) -> Result<FragmentStream, ChatError> {
        let mut contents = self.history.lock().await.clone();
        contents.push(ChatMessage::user(message));

        let request = ChatRequest {
            system_instruction: self.system_instruction.to_string(),
            contents,
        };
        let mut inner = self.backend.open_stream(request).await?;

        let history = Arc::clone(&self.history);
        let user_turn = ChatMessage::user(message);

        Ok(Box::pin(stream! {
            let mut reply = String::new();
            while let Some(item) = inner.next().await {
                match item {
                    Ok(text) => {
                        reply.push_str(&text);
                        yield Ok(text);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            let mut history = history.lock().await;
            history.push(user_turn);
            history.push(ChatMessage::model(reply));
            debug!(turns = history.len(), "chat history updated");
        }))
    }

    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedBackend;
    use super::*;

    async fn drain(stream: FragmentStream) -> Vec<Result<String, String>> {
        stream
            .map(|r| r.map_err(|e| e.to_string()))
            .collect::<Vec<_>>()
            .await
    }

    #[tokio::test]
    async fn test_session_sends_system_instruction_and_message() {
        let backend = Arc::new(ScriptedBackend::replying(&["Hello", ", darling"]));
        let session = ChatSession::new(backend.clone(), "be elegant");

        let items = drain(session.send_message_stream("hi").await.unwrap()).await;

        assert_eq!(items, vec![Ok("Hello".to_string()), Ok(", darling".to_string())]);
        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_instruction, "be elegant");
        assert_eq!(requests[0].contents, vec![ChatMessage::user("hi")]);
    }

    #[tokio::test]
    async fn test_completed_turn_is_carried_into_next_request() {
        let backend = Arc::new(ScriptedBackend::replying(&["first ", "reply"]));
        let session = ChatSession::new(backend.clone(), "sys");

        drain(session.send_message_stream("one").await.unwrap()).await;
        backend.set_script(&["second"]);
        drain(session.send_message_stream("two").await.unwrap()).await;

        let requests = backend.requests();
        assert_eq!(
            requests[1].contents,
            vec![
                ChatMessage::user("one"),
                ChatMessage::model("first reply"),
                ChatMessage::user("two"),
            ]
        );
        assert_eq!(session.history().await.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_turn_is_not_recorded() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("partial"), Err("boom")]));
        let session = ChatSession::new(backend, "sys");

        let items = drain(session.send_message_stream("hi").await.unwrap()).await;

        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
        assert!(session.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_surfaces_as_single_error() {
        let session = ChatSession::new(Arc::new(ScriptedBackend::failing_to_open("no route")), "sys");

        let result = session.send_message_stream("hi").await;

        assert!(matches!(result, Err(ChatError::Provider(m)) if m == "no route"));
        assert!(session.history().await.is_empty());
    }
}
