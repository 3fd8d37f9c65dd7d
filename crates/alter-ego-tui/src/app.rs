use std::sync::Arc;
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use alter_ego_core::rate_limiter::DEFAULT_REFRESH_PERIOD;
use alter_ego_core::{deliver, ChatSession, CooldownTimer, Limits, Settlement, SubmitOutcome, Transport};
use crate::tui::{AppEvent, EventSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Chat state
    pub session: ChatSession,
    pub cursor: usize, // cursor position in the draft, in characters
    pub send_task: Option<JoinHandle<()>>,

    // Log view
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the log, for scroll calculations
    pub chat_width: u16,  // Inner width of the log, for wrap calculations
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Backend
    pub transport: Arc<dyn Transport>,
    pub api_base_url: String,
    events: EventSender,
}

impl App {
    pub fn new(
        limits: Limits,
        transport: Arc<dyn Transport>,
        events: EventSender,
        api_base_url: String,
    ) -> Self {
        let tx_cooldown = events.clone();
        let timer = CooldownTimer::new(DEFAULT_REFRESH_PERIOD, move |remaining| {
            tx_cooldown.send(AppEvent::Cooldown(remaining)).is_ok()
        });

        Self {
            should_quit: false,
            screen: Screen::Landing,
            input_mode: InputMode::Normal,

            session: ChatSession::new(limits).with_cooldown_timer(timer),
            cursor: 0,
            send_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            animation_frame: 0,

            transport,
            api_base_url,
            events,
        }
    }

    pub fn open_chat(&mut self) {
        self.screen = Screen::Chat;
        self.input_mode = InputMode::Editing;
    }

    /// Submit the draft; on acceptance the backend call runs in the background
    /// and reports back as `AppEvent::Settled`.
    pub fn submit(&mut self) {
        match self.session.submit(Instant::now()) {
            SubmitOutcome::Accepted(exchange) => {
                self.cursor = 0;
                self.scroll_to_bottom();

                let transport = Arc::clone(&self.transport);
                let tx = self.events.clone();
                self.send_task = Some(tokio::spawn(async move {
                    let settlement = deliver(transport.as_ref(), exchange).await;
                    let _ = tx.send(AppEvent::Settled(settlement));
                }));
            }
            SubmitOutcome::Rejected(_) | SubmitOutcome::Ignored => {}
        }
    }

    pub fn settle(&mut self, settlement: Settlement) {
        if self.session.settle(settlement) {
            self.send_task = None;
            self.scroll_to_bottom();
        }
    }

    /// Drop an outstanding backend call without applying its result
    pub fn abandon_exchange(&mut self) {
        if let Some(task) = self.send_task.take() {
            tracing::info!("abandoning in-flight exchange");
            task.abort();
        }
    }

    pub fn refresh_cooldown(&mut self) {
        self.session.refresh_cooldown(Instant::now());
    }

    /// Esc in the input: clear the draft and the error banner
    pub fn clear_input(&mut self) {
        self.session.clear_draft();
        self.cursor = 0;
    }

    // Draft editing

    pub fn insert_char(&mut self, c: char) {
        let draft = self.session.draft_mut();
        let byte_pos = char_to_byte_index(draft, self.cursor);
        draft.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn delete_back(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let draft = self.session.draft_mut();
            let byte_pos = char_to_byte_index(draft, self.cursor);
            draft.remove(byte_pos);
        }
    }

    pub fn delete_forward(&mut self) {
        let draft = self.session.draft_mut();
        if self.cursor < draft.chars().count() {
            let byte_pos = char_to_byte_index(draft, self.cursor);
            draft.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.session.draft().chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.session.draft().chars().count();
    }

    // Log view

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.total_chat_lines().saturating_sub(self.visible_chat_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    /// Scroll the log so the newest message (and "Thinking..." while pending) is visible
    pub fn scroll_to_bottom(&mut self) {
        let total_lines = self.total_chat_lines();
        let visible_height = self.visible_chat_height();
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rendered height of the log, matching the layout in `ui::chat_lines`
    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.session.conversation().messages() {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                let char_count = line.chars().count();
                total_lines += char_count / wrap_width + 1;
            }
            total_lines += 1; // Blank line after message
        }

        if self.session.is_pending() {
            total_lines += 2; // "AI:" + "Thinking..."
        }

        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alter_ego_core::{Reply, TransportFault};
    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::mpsc;

    /// Echoes the message back, or fails if configured to
    pub(crate) struct EchoTransport {
        pub fail: bool,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, message: &str) -> Result<Reply, TransportFault> {
            if self.fail {
                return Err(TransportFault::unreachable());
            }
            Ok(Reply {
                reply: format!("You said: {}", message),
                timestamp: Utc::now(),
            })
        }
    }

    pub(crate) fn test_app(fail: bool) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(
            Limits::default(),
            Arc::new(EchoTransport { fail }),
            tx,
            "http://localhost:8000".to_string(),
        );
        (app, rx)
    }

    #[test]
    fn test_editing_is_utf8_safe() {
        let (mut app, _rx) = test_app(false);
        for c in "héllo".chars() {
            app.insert_char(c);
        }
        app.cursor_home();
        app.cursor_right();
        app.delete_forward();
        assert_eq!(app.session.draft(), "hllo");

        app.cursor_end();
        app.delete_back();
        assert_eq!(app.session.draft(), "hll");
        assert_eq!(app.cursor, 3);

        app.cursor_home();
        app.delete_back();
        assert_eq!(app.session.draft(), "hll");
    }

    #[test]
    fn test_clear_input_resets_cursor() {
        let (mut app, _rx) = test_app(false);
        for c in "draft".chars() {
            app.insert_char(c);
        }
        app.clear_input();
        assert_eq!(app.session.draft(), "");
        assert_eq!(app.cursor, 0);
    }

    #[tokio::test]
    async fn test_scroll_to_bottom_accounts_for_wrapping() {
        let (mut app, _rx) = test_app(false);
        app.chat_height = 4;
        app.chat_width = 10;
        app.session.set_draft("a".repeat(25));
        app.submit();

        // Role line + three wrapped lines + blank, then "AI:" + "Thinking..."
        assert_eq!(app.chat_scroll, 3);

        app.scroll_down(5);
        assert_eq!(app.chat_scroll, 3);
        app.scroll_up(1);
        assert_eq!(app.chat_scroll, 2);
        app.abandon_exchange();
    }

    #[tokio::test]
    async fn test_submit_spawns_exchange_and_settles() {
        let (mut app, mut rx) = test_app(false);
        app.session.set_draft("Hello");
        app.submit();

        assert!(app.session.is_pending());
        assert!(app.send_task.is_some());

        while let Some(event) = rx.recv().await {
            if let AppEvent::Settled(settlement) = event {
                app.settle(settlement);
                break;
            }
        }

        let messages = app.session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "You said: Hello");
        assert!(!app.session.is_pending());
        assert!(app.send_task.is_none());
    }

    #[tokio::test]
    async fn test_abandon_exchange_leaves_pending_state_untouched() {
        let (mut app, _rx) = test_app(false);
        app.session.set_draft("Hello");
        app.submit();
        app.abandon_exchange();

        assert!(app.send_task.is_none());
        assert_eq!(app.session.conversation().len(), 1);
    }
}
