//! Streaming reply consumer
//!
//! Runs one request/stream cycle per accepted submission and reports what
//! happened as [`ReplyEvent`]s. The main loop applies those events to the
//! conversation in the order they arrive.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ai::ChatSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    /// The stream is open; the empty model message can be added
    Started,
    /// Next piece of reply text, verbatim
    Fragment(String),
    /// The stream ran to completion
    Finished,
    /// Opening or reading the stream failed (error text for the log)
    Failed(String),
}

/// Stream the model's reply to `utterance`, sending events to `tx`.
///
/// Fragments are forwarded one by one in arrival order. Any error ends the
/// cycle with a single [`ReplyEvent::Failed`]; nothing is retried.
pub async fn stream_reply(
    session: ChatSession,
    utterance: String,
    tx: mpsc::UnboundedSender<ReplyEvent>,
) {
    let mut stream = match session.send_message_stream(&utterance).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "failed to open reply stream");
            let _ = tx.send(ReplyEvent::Failed(e.to_string()));
            return;
        }
    };

    debug!(model = session.model_name(), "reply stream opened");
    if tx.send(ReplyEvent::Started).is_err() {
        return;
    }

    let mut fragments = 0usize;
    while let Some(item) = stream.next().await {
        match item {
            Ok(text) if text.is_empty() => {}
            Ok(text) => {
                fragments += 1;
                if tx.send(ReplyEvent::Fragment(text)).is_err() {
                    debug!("reply receiver dropped, abandoning stream");
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, fragments, "reply stream failed");
                let _ = tx.send(ReplyEvent::Failed(e.to_string()));
                return;
            }
        }
    }

    info!(fragments, "reply stream finished");
    let _ = tx.send(ReplyEvent::Finished);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedBackend;
    use crate::state::{ChatMessage, Conversation, PartialReplyPolicy};
    use std::sync::Arc;

    const GREETING: &str = "Greetings, darling!";
    const FALLBACK: &str = "Oh, dear.";

    async fn collect_events(backend: ScriptedBackend, utterance: &str) -> Vec<ReplyEvent> {
        let session = ChatSession::new(Arc::new(backend), "sys");
        let (tx, mut rx) = mpsc::unbounded_channel();

        stream_reply(session, utterance.to_string(), tx).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn apply_all(convo: &mut Conversation, events: Vec<ReplyEvent>) {
        for event in events {
            convo
                .apply(event, FALLBACK, PartialReplyPolicy::Discard)
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_events_follow_fragment_order() {
        let events = collect_events(ScriptedBackend::replying(&["a", "b", "c"]), "hi").await;

        assert_eq!(
            events,
            vec![
                ReplyEvent::Started,
                ReplyEvent::Fragment("a".to_string()),
                ReplyEvent::Fragment("b".to_string()),
                ReplyEvent::Fragment("c".to_string()),
                ReplyEvent::Finished,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_fragments_are_skipped() {
        let events = collect_events(ScriptedBackend::replying(&["", "x", ""]), "hi").await;

        assert_eq!(
            events,
            vec![
                ReplyEvent::Started,
                ReplyEvent::Fragment("x".to_string()),
                ReplyEvent::Finished,
            ]
        );
    }

    #[tokio::test]
    async fn test_open_failure_sends_only_failed() {
        let events = collect_events(ScriptedBackend::failing_to_open("offline"), "hi").await;

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ReplyEvent::Failed(m) if m.contains("offline")));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_stops_reading() {
        let backend = ScriptedBackend::new(vec![Ok("part"), Err("reset"), Ok("never")]);
        let events = collect_events(backend, "hi").await;

        assert_eq!(events[0], ReplyEvent::Started);
        assert_eq!(events[1], ReplyEvent::Fragment("part".to_string()));
        assert!(matches!(&events[2], ReplyEvent::Failed(_)));
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn test_end_to_end_reply() {
        let fragments = [
            "Splendid, darling!",
            "\n## Conception\n",
            "* Vision document\n",
            "* Scope",
        ];
        let mut convo = Conversation::new(GREETING);
        convo
            .submit_user("We're building a mobile app with 3 engineers")
            .unwrap();
        assert!(convo.is_pending());

        let events = collect_events(ScriptedBackend::replying(&fragments), "We're building a mobile app with 3 engineers").await;
        apply_all(&mut convo, events);

        assert!(!convo.is_pending());
        assert_eq!(
            convo.messages(),
            &[
                ChatMessage::model(GREETING),
                ChatMessage::user("We're building a mobile app with 3 engineers"),
                ChatMessage::model(fragments.concat()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_after_zero_fragments() {
        let mut convo = Conversation::new(GREETING);
        convo.submit_user("hello").unwrap();

        let backend = ScriptedBackend::new(vec![Err("boom")]);
        let events = collect_events(backend, "hello").await;
        apply_all(&mut convo, events);

        assert!(!convo.is_pending());
        assert_eq!(convo.len(), 3);
        assert_eq!(convo.messages()[2], ChatMessage::model(FALLBACK));
    }

    #[tokio::test]
    async fn test_failure_before_open_leaves_one_placeholder() {
        let mut convo = Conversation::new(GREETING);
        convo.submit_user("hello").unwrap();

        let events = collect_events(ScriptedBackend::failing_to_open("dns"), "hello").await;
        apply_all(&mut convo, events);

        assert_eq!(convo.len(), 3);
        assert_eq!(convo.messages()[2], ChatMessage::model(FALLBACK));
        assert!(convo.submit_user("try again").is_ok());
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_quietly() {
        let session = ChatSession::new(Arc::new(ScriptedBackend::replying(&["a", "b"])), "sys");
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        stream_reply(session, "hi".to_string(), tx).await;
    }
}
