//! The chat client: input field, message log and placeholders of in-flight
//! requests.
//!
//! Every mutation of the log goes through [`ChatClient`], which the app owns
//! and passes to the key handler and the renderer. Network IO lives elsewhere;
//! [`ChatClient::submit`] hands back a [`Submission`] for the caller to send,
//! and the outcome comes back through [`ChatClient::resolve`].

use crossterm::event::{KeyCode, KeyEvent};

use crate::backend::{Answer, ApiError};
use crate::evidence::Evidence;
use crate::message::{Message, PendingId};

pub const LOADING_TEXT: &str = "🔍 Scanning document visuals...";
pub const ERROR_NOTICE: &str = "⚠️ Error connecting to server.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub message: Message,
    /// Set while this entry is the placeholder for an in-flight request.
    pub pending: Option<PendingId>,
}

impl Entry {
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}

/// A query accepted by [`ChatClient::submit`] that still has to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: PendingId,
    pub query: String,
}

/// Scroll state of the log view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub offset: u16,
    pub follow_tail: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: 0,
            follow_tail: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ChatClient {
    input: String,
    cursor: usize, // in chars
    log: Vec<Entry>,
    viewport: Viewport,
}

impl ChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[Entry] {
        &self.log
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pending_count(&self) -> usize {
        self.log.iter().filter(|e| e.is_loading()).count()
    }

    /// Submit on the commit key (Enter); any other key does nothing here.
    pub fn on_key_submit(&mut self, key: &KeyEvent) -> Option<Submission> {
        if key.code == KeyCode::Enter {
            self.submit()
        } else {
            None
        }
    }

    /// Turn the current input into a user message and a loading placeholder.
    ///
    /// Whitespace-only input is ignored and leaves everything untouched.
    pub fn submit(&mut self) -> Option<Submission> {
        let query = self.input.trim();
        if query.is_empty() {
            return None;
        }
        let query = query.to_string();

        self.render_message(Message::user(query.clone()));
        self.input.clear();
        self.cursor = 0;

        let id = PendingId::generate();
        self.log.push(Entry {
            message: Message::bot(LOADING_TEXT, None),
            pending: Some(id),
        });
        self.scroll_to_end();

        tracing::info!(%id, query_len = query.len(), "query submitted");
        Some(Submission { id, query })
    }

    /// Append a message to the log and bring it into view.
    pub fn render_message(&mut self, message: Message) {
        self.log.push(Entry {
            message,
            pending: None,
        });
        self.scroll_to_end();
    }

    /// Settle the request identified by `id`.
    ///
    /// Success replaces the placeholder with the answer at the end of the log.
    /// Failure overwrites the placeholder text in place with [`ERROR_NOTICE`].
    /// Returns false when no placeholder carries `id`.
    pub fn resolve(&mut self, id: PendingId, outcome: Result<Answer, ApiError>) -> bool {
        let Some(idx) = self.log.iter().position(|e| e.pending == Some(id)) else {
            tracing::warn!(%id, "reply for unknown placeholder ignored");
            return false;
        };

        match outcome {
            Ok(answer) => {
                self.log.remove(idx);
                self.render_message(Message::bot(answer.text, answer.evidence));
                tracing::info!(%id, "reply rendered");
            }
            Err(err) => {
                tracing::error!(%id, error = %err, "chat request failed");
                let entry = &mut self.log[idx];
                entry.message.text = ERROR_NOTICE.to_string();
                entry.pending = None;
            }
        }
        true
    }

    /// Most recent evidence in the log with its entry number (1-based).
    pub fn latest_evidence(&self) -> Option<(usize, &Evidence)> {
        self.log
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, e)| e.message.evidence.as_ref().map(|ev| (i + 1, ev)))
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // Viewport

    pub fn scroll_to_end(&mut self) {
        self.viewport.follow_tail = true;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.viewport.offset = self.viewport.offset.saturating_sub(lines);
        self.viewport.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.viewport.offset = self.viewport.offset.saturating_add(lines);
    }

    /// Fit the offset to the rendered content and return it.
    ///
    /// Following the tail pins the offset to the bottom; scrolling down to the
    /// bottom turns following back on.
    pub fn clamp_scroll(&mut self, total_lines: u16, visible_lines: u16) -> u16 {
        let max_offset = total_lines.saturating_sub(visible_lines);
        if self.viewport.follow_tail || self.viewport.offset >= max_offset {
            self.viewport.offset = max_offset;
            self.viewport.follow_tail = true;
        }
        self.viewport.offset
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
