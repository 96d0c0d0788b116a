//! Conversation state
//!
//! The ordered message log plus the bookkeeping for the one reply that may
//! be streaming at a time. The streaming message is tracked by index
//! (`in_flight`) rather than by "whatever the last message is", and the
//! `pending` flag refuses new submissions until the reply settles.

use serde::{Deserialize, Serialize};

use crate::error::{ConversationError, SubmitRejected};
use crate::reply::ReplyEvent;

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
    System,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

/// What to do with already-streamed text when a reply fails part way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialReplyPolicy {
    /// Replace the partial reply with the fallback text
    #[default]
    Discard,
    /// Keep the partial reply and append the fallback text after it
    Keep,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    in_flight: Option<usize>,
    pending: bool,
    revision: u64,
}

impl Conversation {
    /// Start a session seeded with the model's greeting
    pub fn new(greeting: &str) -> Self {
        Self {
            messages: vec![ChatMessage::model(greeting)],
            in_flight: None,
            pending: false,
            revision: 0,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn in_flight_index(&self) -> Option<usize> {
        self.in_flight
    }

    /// Bumped on every mutation; the view autoscrolls when it changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True while a submission is accepted but no reply text has started
    pub fn awaiting_first_fragment(&self) -> bool {
        self.pending
            && self.in_flight.is_none()
            && self.messages.last().map(|m| m.role) == Some(ChatRole::User)
    }

    /// Accept a user message, or refuse it without touching any state.
    pub fn submit_user(&mut self, text: &str) -> Result<(), SubmitRejected> {
        if text.trim().is_empty() {
            return Err(SubmitRejected::Empty);
        }
        if self.pending {
            return Err(SubmitRejected::ReplyInFlight);
        }

        self.messages.push(ChatMessage::user(text));
        self.pending = true;
        self.touch();
        Ok(())
    }

    /// Append the empty model message that the reply stream will extend.
    pub fn begin_model_reply(&mut self) -> Result<(), ConversationError> {
        if self.in_flight.is_some() {
            return Err(ConversationError::ReplyAlreadyStarted);
        }
        if !self.awaiting_first_fragment() {
            return Err(ConversationError::NotAwaitingReply);
        }

        self.messages.push(ChatMessage::model(String::new()));
        self.in_flight = Some(self.messages.len() - 1);
        self.touch();
        Ok(())
    }

    /// Append a fragment, verbatim, to the in-flight model message.
    pub fn extend_in_flight(&mut self, fragment: &str) -> Result<(), ConversationError> {
        let idx = self.in_flight.ok_or(ConversationError::NoReplyInFlight)?;
        let message = self
            .messages
            .get_mut(idx)
            .ok_or(ConversationError::NoReplyInFlight)?;

        message.content.push_str(fragment);
        self.touch();
        Ok(())
    }

    /// The reply stream ended normally
    pub fn end_reply(&mut self) {
        self.in_flight = None;
        self.pending = false;
        self.touch();
    }

    /// The reply stream failed; leave exactly one model message holding the
    /// fallback text after the user's message.
    pub fn fail_reply(&mut self, fallback: &str, policy: PartialReplyPolicy) {
        match self.in_flight.and_then(|idx| self.messages.get_mut(idx)) {
            Some(message) => match policy {
                PartialReplyPolicy::Keep if !message.content.is_empty() => {
                    message.content.push_str("\n\n");
                    message.content.push_str(fallback);
                }
                _ => message.content = fallback.to_string(),
            },
            None => {
                if self.pending {
                    self.messages.push(ChatMessage::model(fallback));
                }
            }
        }

        self.in_flight = None;
        self.pending = false;
        self.touch();
    }

    /// Apply one event from the reply stream.
    pub fn apply(
        &mut self,
        event: ReplyEvent,
        fallback: &str,
        policy: PartialReplyPolicy,
    ) -> Result<(), ConversationError> {
        match event {
            ReplyEvent::Started => self.begin_model_reply(),
            ReplyEvent::Fragment(text) => self.extend_in_flight(&text),
            ReplyEvent::Finished => {
                if !self.pending {
                    return Err(ConversationError::NotAwaitingReply);
                }
                self.end_reply();
                Ok(())
            }
            ReplyEvent::Failed(_) => {
                if !self.pending {
                    return Err(ConversationError::NotAwaitingReply);
                }
                self.fail_reply(fallback, policy);
                Ok(())
            }
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "hiccup";

    fn conversation() -> Conversation {
        Conversation::new("hello, darling")
    }

    #[test]
    fn test_new_conversation_has_greeting() {
        let convo = conversation();
        assert_eq!(convo.messages(), &[ChatMessage::model("hello, darling")]);
        assert!(!convo.is_pending());
        assert_eq!(convo.in_flight_index(), None);
    }

    #[test]
    fn test_empty_submission_rejected() {
        for text in ["", "   ", "\n\t "] {
            let mut convo = conversation();
            let before = convo.messages().to_vec();
            assert_eq!(convo.submit_user(text), Err(SubmitRejected::Empty));
            assert_eq!(convo.messages(), before.as_slice());
            assert!(!convo.is_pending());
            assert_eq!(convo.revision(), 0);
        }
    }

    #[test]
    fn test_submission_while_pending_rejected() {
        let mut convo = conversation();
        convo.submit_user("first").unwrap();
        let before = convo.messages().to_vec();
        let revision = convo.revision();

        assert_eq!(convo.submit_user("second"), Err(SubmitRejected::ReplyInFlight));
        assert_eq!(convo.messages(), before.as_slice());
        assert_eq!(convo.revision(), revision);

        convo.begin_model_reply().unwrap();
        convo.extend_in_flight("partial").unwrap();
        assert_eq!(convo.submit_user("third"), Err(SubmitRejected::ReplyInFlight));
        assert_eq!(convo.len(), 3);
    }

    #[test]
    fn test_submit_keeps_text_verbatim() {
        let mut convo = conversation();
        convo.submit_user("  padded  ").unwrap();
        assert_eq!(convo.messages()[1], ChatMessage::user("  padded  "));
        assert!(convo.is_pending());
        assert!(convo.awaiting_first_fragment());
    }

    #[test]
    fn test_fragments_concatenate_in_order() {
        let mut convo = conversation();
        convo.submit_user("question").unwrap();
        convo.begin_model_reply().unwrap();

        let fragments = ["## Plan", "\n* one", "\n* two", " and more"];
        for f in fragments {
            convo.extend_in_flight(f).unwrap();
        }
        convo.end_reply();

        assert_eq!(convo.messages()[2].content, fragments.concat());
        assert!(!convo.is_pending());
        assert_eq!(convo.in_flight_index(), None);
    }

    #[test]
    fn test_begin_requires_pending_user_message() {
        let mut convo = conversation();
        assert_eq!(convo.begin_model_reply(), Err(ConversationError::NotAwaitingReply));

        convo.submit_user("hi").unwrap();
        convo.begin_model_reply().unwrap();
        assert_eq!(convo.in_flight_index(), Some(2));
        assert!(!convo.awaiting_first_fragment());
        assert_eq!(convo.begin_model_reply(), Err(ConversationError::ReplyAlreadyStarted));
    }

    #[test]
    fn test_extend_without_in_flight_is_error() {
        let mut convo = conversation();
        assert_eq!(convo.extend_in_flight("x"), Err(ConversationError::NoReplyInFlight));
        assert_eq!(convo.messages()[0].content, "hello, darling");
    }

    #[test]
    fn test_fail_discards_partial_reply() {
        let mut convo = conversation();
        convo.submit_user("hi").unwrap();
        convo.begin_model_reply().unwrap();
        convo.extend_in_flight("half a tho").unwrap();

        convo.fail_reply(FALLBACK, PartialReplyPolicy::Discard);

        assert_eq!(convo.len(), 3);
        assert_eq!(convo.messages()[2], ChatMessage::model(FALLBACK));
        assert!(!convo.is_pending());
    }

    #[test]
    fn test_fail_keeps_partial_reply_when_asked() {
        let mut convo = conversation();
        convo.submit_user("hi").unwrap();
        convo.begin_model_reply().unwrap();
        convo.extend_in_flight("half a tho").unwrap();

        convo.fail_reply(FALLBACK, PartialReplyPolicy::Keep);

        assert_eq!(convo.messages()[2].content, "half a tho\n\nhiccup");
    }

    #[test]
    fn test_fail_with_empty_in_flight_uses_fallback() {
        for policy in [PartialReplyPolicy::Discard, PartialReplyPolicy::Keep] {
            let mut convo = conversation();
            convo.submit_user("hi").unwrap();
            convo.begin_model_reply().unwrap();

            convo.fail_reply(FALLBACK, policy);

            assert_eq!(convo.len(), 3);
            assert_eq!(convo.messages()[2].content, FALLBACK);
        }
    }

    #[test]
    fn test_fail_before_stream_opened_appends_fallback() {
        let mut convo = conversation();
        convo.submit_user("hi").unwrap();

        convo.fail_reply(FALLBACK, PartialReplyPolicy::Discard);

        assert_eq!(convo.len(), 3);
        assert_eq!(convo.messages()[2], ChatMessage::model(FALLBACK));
        assert!(!convo.is_pending());
        assert!(convo.submit_user("again").is_ok());
    }

    #[test]
    fn test_apply_events() {
        let mut convo = conversation();
        convo.submit_user("hi").unwrap();

        let events = vec![
            ReplyEvent::Started,
            ReplyEvent::Fragment("Splendid".to_string()),
            ReplyEvent::Fragment("!".to_string()),
            ReplyEvent::Finished,
        ];
        for event in events {
            convo.apply(event, FALLBACK, PartialReplyPolicy::Discard).unwrap();
        }

        assert_eq!(convo.messages()[2], ChatMessage::model("Splendid!"));
        assert!(!convo.is_pending());
        assert_eq!(
            convo.apply(ReplyEvent::Finished, FALLBACK, PartialReplyPolicy::Discard),
            Err(ConversationError::NotAwaitingReply)
        );
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut convo = conversation();
        convo.submit_user("hi").unwrap();
        convo.begin_model_reply().unwrap();
        convo.extend_in_flight("a").unwrap();
        convo.end_reply();
        assert_eq!(convo.revision(), 4);
    }
}
