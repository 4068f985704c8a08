use healthchat_core::{ChatEntry, ChatRole, ConversationEngine, RevealStep};

use crate::ui;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub engine: ConversationEngine,

    // Input box
    pub input: String,
    pub cursor: usize,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    last_revision: u64,

    /// Frame of the "..." indicator, 0..3
    pub animation_frame: u8,
}

impl App {
    pub fn new(engine: ConversationEngine) -> Self {
        let last_revision = engine.revision();
        Self {
            should_quit: false,
            engine,
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            last_revision,
            animation_frame: 0,
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        self.engine.entries()
    }

    pub fn is_busy(&self) -> bool {
        self.engine.is_busy()
    }

    /// Busy but no reply text yet: the request is still in flight
    pub fn awaiting_reply(&self) -> bool {
        self.is_busy()
            && self
                .entries()
                .last()
                .map_or(true, |entry| entry.role == ChatRole::User)
    }

    /// Send the input box contents; clears the box only when accepted
    pub fn submit_input(&mut self) -> bool {
        if self.engine.submit(&self.input).is_none() {
            return false;
        }
        self.input.clear();
        self.cursor = 0;
        true
    }

    pub fn cancel_reply(&mut self) -> bool {
        self.engine.cancel()
    }

    pub fn apply_step(&mut self, step: RevealStep) {
        self.engine.apply(step);
    }

    /// Follow the newest entry whenever the log changed since the last call
    pub fn sync_scroll(&mut self) {
        let revision = self.engine.revision();
        if revision != self.last_revision {
            self.last_revision = revision;
            self.scroll_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    fn wrap_width(&self) -> u16 {
        // Default to 50 until the first render reports the real width
        if self.chat_width > 0 {
            self.chat_width
        } else {
            50
        }
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rendered height of the chat at the current width, wrapped exactly as drawn
    pub fn chat_line_count(&self) -> u16 {
        let lines = ui::chat_paragraph(self).line_count(self.wrap_width());
        u16::try_from(lines).unwrap_or(u16::MAX)
    }

    pub fn max_scroll(&self) -> u16 {
        self.chat_line_count().saturating_sub(self.visible_height())
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1).min(self.max_scroll());
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_page_down(&mut self) {
        let half = (self.visible_height() / 2).max(1);
        self.chat_scroll = self.chat_scroll.saturating_add(half).min(self.max_scroll());
    }

    pub fn scroll_page_up(&mut self) {
        let half = (self.visible_height() / 2).max(1);
        self.chat_scroll = self.chat_scroll.saturating_sub(half);
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn delete_back(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_forward(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use healthchat_core::{EngineSettings, ReplyError, ReplyService};
    use std::sync::Arc;

    pub(crate) struct CannedReply(pub &'static str);

    #[async_trait]
    impl ReplyService for CannedReply {
        async fn fetch_reply(&self, _message: &str) -> Result<String, ReplyError> {
            Ok(self.0.to_string())
        }
    }

    pub(crate) fn app_with_reply(reply: &'static str) -> App {
        App::new(ConversationEngine::new(
            Arc::new(CannedReply(reply)),
            EngineSettings::default(),
        ))
    }

    #[tokio::test]
    async fn test_editing_handles_multibyte_input() {
        let mut app = app_with_reply("ok");
        for c in "fiévre".chars() {
            app.insert_char(c);
        }
        app.cursor_left();
        app.cursor_left();
        app.cursor_left();
        app.delete_back();

        assert_eq!(app.input, "fivre");
        assert_eq!(app.cursor, 2);

        app.cursor_end();
        app.delete_forward();
        assert_eq!(app.input, "fivre");
        app.cursor_home();
        app.delete_forward();
        assert_eq!(app.input, "ivre");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_clears_input_only_when_accepted() {
        let mut app = app_with_reply("ok");
        app.input = "   ".to_string();
        assert!(!app.submit_input());
        assert_eq!(app.input, "   ");

        app.input = "cough".to_string();
        app.cursor = 5;
        assert!(app.submit_input());
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.awaiting_reply());

        app.input = "again".to_string();
        assert!(!app.submit_input());
        assert_eq!(app.input, "again");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_scroll_follows_new_entries() {
        let mut app = app_with_reply("line one\nline two\nline three");
        app.chat_height = 3;
        app.chat_width = 40;

        app.input = "hello".to_string();
        app.submit_input();
        app.sync_scroll();
        // You: / hello / blank / AI: / Thinking...
        assert_eq!(app.chat_line_count(), 5);
        assert_eq!(app.chat_scroll, 2);

        app.engine.run_until_idle().await;
        app.sync_scroll();
        // You: / hello / blank / AI: / three lines / blank
        assert_eq!(app.chat_line_count(), 8);
        assert_eq!(app.chat_scroll, 5);

        app.scroll_up();
        app.sync_scroll();
        assert_eq!(app.chat_scroll, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_very_long_chat_saturates_line_count() {
        let mut app = app_with_reply("ok");
        app.chat_height = 10;
        app.chat_width = 40;
        app.input = "long".to_string();
        app.submit_input();
        let request_id = app.engine.active_request().unwrap();

        app.apply_step(RevealStep {
            request_id,
            text: "x\n".repeat(70_000),
            finished: true,
        });
        app.sync_scroll();

        assert_eq!(app.chat_line_count(), u16::MAX);
        assert_eq!(app.chat_scroll, u16::MAX - 10);
        app.scroll_page_down();
        assert_eq!(app.chat_scroll, u16::MAX - 10);
    }

    #[tokio::test]
    async fn test_tick_only_animates_while_busy() {
        let mut app = app_with_reply("ok");
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
    }
}
