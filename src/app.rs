use ratatui::layout::Rect;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;
use crate::client::{ChatClient, ChatMode};
use crate::config::Config;
use crate::conversation::{Action, Conversation};
use crate::requests::{Completion, Outcome, RequestId, RequestTracker};
use crate::tui::AppEvent;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub mode: ChatMode,
    /// Config file that mode changes are written back to
    pub config_path: Option<PathBuf>,

    // Conversation
    pub conversation: Conversation,
    pub session_id: Option<String>,
    pub requests: RequestTracker,
    pub client: ChatClient,

    // Input state
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Chat scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub input_area: Option<Rect>,
    pub send_button: Option<Rect>,
    pub clear_button: Option<Rect>,
    pub mode_button: Option<Rect>,
}

impl App {
    pub fn new(
        client: ChatClient,
        session_id: Option<String>,
        mode: ChatMode,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            mode,
            config_path: None,
            conversation: Conversation::new(),
            session_id,
            requests: RequestTracker::new(events),
            client,
            input: String::new(),
            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            chat_area: None,
            input_area: None,
            send_button: None,
            clear_button: None,
            mode_button: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.requests.is_busy()
    }

    /// Send whatever is in the input box. Blank input is ignored; without a
    /// session the input is dropped and the attempt only logged.
    pub fn submit_input(&mut self) -> Option<RequestId> {
        if self.input.trim().is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.input);
        self.input_cursor = 0;

        let Some(session_id) = self.session_id.clone() else {
            tracing::error!("No session id available, message not sent");
            return None;
        };

        let id = self
            .requests
            .spawn_send(self.client.clone(), session_id, self.mode, text);

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_to_bottom();
        Some(id)
    }

    pub fn clear_history(&mut self) -> Option<RequestId> {
        let Some(session_id) = self.session_id.clone() else {
            tracing::error!("No session id available, history not cleared");
            return None;
        };

        Some(self.requests.spawn_clear(self.client.clone(), session_id))
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        if !self.requests.finish(completion.id) {
            tracing::warn!(request_id = completion.id, "Dropping completion for cancelled request");
            return;
        }

        match completion.outcome {
            Outcome::Reply { prompt, result } => match result {
                Ok(reply) => {
                    tracing::info!(request_id = completion.id, "Reply received");
                    self.conversation.apply(Action::Exchange { prompt, reply });
                    self.scroll_to_bottom();
                }
                Err(e) => {
                    tracing::error!(request_id = completion.id, error = %e, "Send failed, exchange discarded");
                }
            },
            Outcome::Cleared(result) => match result {
                Ok(()) => {
                    self.conversation.apply(Action::Clear);
                    self.chat_scroll = 0;
                }
                Err(e) => {
                    tracing::error!(request_id = completion.id, error = %e, "Clear history failed");
                }
            },
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        tracing::info!(mode = self.mode.as_str(), "Mode switched");

        if let Some(path) = &self.config_path {
            if let Err(e) = Config::save_default_mode_to(path, self.mode) {
                tracing::warn!(error = %e, path = %path.display(), "Could not save mode to config");
            }
        }
    }

    pub fn cancel_pending(&mut self) {
        let cancelled = self.requests.cancel_all();
        if cancelled > 0 {
            tracing::info!(cancelled, "Cancelled in-flight requests");
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1).min(self.max_scroll());
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half = (self.chat_height / 2).max(1);
        self.chat_scroll = self.chat_scroll.saturating_add(half).min(self.max_scroll());
    }

    pub fn scroll_half_page_up(&mut self) {
        let half = (self.chat_height / 2).max(1);
        self.chat_scroll = self.chat_scroll.saturating_sub(half);
    }

    fn max_scroll(&self) -> u16 {
        self.total_chat_lines().saturating_sub(self.visible_height())
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 { self.chat_height } else { 20 }
    }

    /// Rendered height of the chat at the current width, pending prompts included
    fn total_chat_lines(&self) -> u16 {
        // Default to 50 columns until the first render reports the real width
        let width = if self.chat_width > 0 { self.chat_width } else { 50 };
        ui::chat_content_height(self, width).min(u16::MAX as usize) as u16
    }

    /// Scroll chat to bottom so the newest line is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }
}
