use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::ai::ChatSession;
use crate::config::Settings;
use crate::persona;
use crate::reference::ReferencePanel;
use crate::reply::{self, ReplyEvent};
use crate::state::{Conversation, PartialReplyPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Reference,
    Chat,
    Input,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Reference => FocusPane::Chat,
            FocusPane::Chat => FocusPane::Input,
            FocusPane::Input => FocusPane::Reference,
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Chat state
    pub conversation: Conversation,
    pub session: ChatSession,
    pub partial_reply_policy: PartialReplyPolicy,
    reply_tx: mpsc::UnboundedSender<ReplyEvent>,

    // Input box
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Chat viewport (updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_total_lines: u16,
    pub rendered_revision: Option<u64>,

    // Reference pane
    pub reference: ReferencePanel,

    // Animation state
    pub animation_frame: u8,

    // Panel areas for mouse hit-testing (updated during render)
    pub reference_area: Option<Rect>,
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(
        session: ChatSession,
        settings: &Settings,
        reply_tx: mpsc::UnboundedSender<ReplyEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            conversation: Conversation::new(persona::GREETING),
            session,
            partial_reply_policy: settings.partial_reply_policy,
            reply_tx,

            input: String::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_total_lines: 0,
            rendered_revision: None,

            reference: ReferencePanel::new(),

            animation_frame: 0,

            reference_area: None,
            chat_area: None,
        }
    }

    pub fn model_name(&self) -> &str {
        self.session.model_name()
    }

    /// Submit the input box. Returns false when the submission is refused
    /// (blank text or a reply still streaming); the typed text is kept.
    pub fn submit_input(&mut self) -> bool {
        if let Err(reason) = self.conversation.submit_user(&self.input) {
            debug!(%reason, "submission rejected");
            return false;
        }

        let utterance = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        debug!(chars = utterance.chars().count(), "submission accepted");

        tokio::spawn(reply::stream_reply(
            self.session.clone(),
            utterance,
            self.reply_tx.clone(),
        ));
        true
    }

    /// Apply one reply event; out-of-order events are logged and dropped
    pub fn apply_reply(&mut self, event: ReplyEvent) {
        if let ReplyEvent::Failed(reason) = &event {
            debug!(%reason, "replacing reply with fallback");
        }

        if let Err(e) = self.conversation.apply(
            event,
            persona::FALLBACK_REPLY,
            self.partial_reply_policy,
        ) {
            error!(error = %e, "dropped reply event");
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    fn max_chat_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll());
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// A reader at the end stays there when the pane is re-wrapped
    pub fn pin_chat_if_at_end(&mut self) {
        if self.chat_scroll >= self.max_chat_scroll() {
            self.rendered_revision = None;
        }
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    // Input editing (cursor is a char index, not a byte index)
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.input_cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
