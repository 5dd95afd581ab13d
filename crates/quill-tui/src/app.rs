use std::sync::Arc;

use quill_core::{
    ChatTransport, ChatView, Composer, Document, DocumentView, RequestCoordinator, SessionId,
    SubmitOutcome, View,
};
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub type Coordinator = RequestCoordinator<Arc<dyn ChatTransport>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Chat,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Editor,
    Input, // AI command box (document screen only)
}

/// Font size applied when a paragraph has none yet
pub const BASE_FONT_SIZE: f64 = 16.0;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub focus: FocusPane,

    // Shared with in-flight requests
    pub chat: Arc<ChatView>,
    pub document: Arc<DocumentView>,
    pub coordinator: Arc<Coordinator>,
    pub session_id: Option<SessionId>,
    pub endpoint: String,

    // Background submissions, one per view
    pub chat_task: Option<JoinHandle<SubmitOutcome>>,
    pub document_task: Option<JoinHandle<SubmitOutcome>>,

    // Chat layout
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_chat: bool,

    // Document editing
    pub selected_block: usize,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        session_id: Option<SessionId>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Chat,
            focus: FocusPane::Input,

            chat: Arc::new(ChatView::new()),
            document: Arc::new(DocumentView::default()),
            coordinator: Arc::new(RequestCoordinator::new(transport)),
            session_id,
            endpoint: endpoint.into(),

            chat_task: None,
            document_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_chat: true,

            selected_block: 0,

            animation_frame: 0,
        }
    }

    pub fn chat_pending(&self) -> bool {
        self.chat.is_in_flight() || self.chat_task.is_some()
    }

    pub fn document_pending(&self) -> bool {
        self.document.is_in_flight() || self.document_task.is_some()
    }

    /// Edit the chat input. Refused from the moment a submission is spawned.
    pub fn edit_chat_input(&self, f: impl FnOnce(&mut Composer)) -> bool {
        !self.chat_pending() && self.chat.edit_input(f)
    }

    /// Edit the AI command box. Refused while a document submission exists.
    pub fn edit_document_input(&self, f: impl FnOnce(&mut Composer)) -> bool {
        !self.document_pending() && self.document.edit_input(f)
    }

    /// Apply a user edit to the document. Refused while a submission exists,
    /// since the reply would replace it.
    pub fn edit_document(&self, f: impl FnOnce(&mut Document)) -> bool {
        !self.document_pending() && self.document.edit(f)
    }

    /// Send the chat input buffer in the background.
    pub fn submit_chat(&mut self) {
        if self.chat_pending() || self.chat.input().is_blank() {
            return;
        }
        let coordinator = Arc::clone(&self.coordinator);
        let view = Arc::clone(&self.chat);
        let session_id = self.session_id.clone();
        self.chat_task = Some(tokio::spawn(async move {
            coordinator.submit_input(session_id.as_ref(), &*view).await
        }));
        self.follow_chat = true;
    }

    /// Send the AI command box in the background.
    pub fn submit_document(&mut self) {
        if self.document_pending() || self.document.input().is_blank() {
            return;
        }
        let coordinator = Arc::clone(&self.coordinator);
        let view = Arc::clone(&self.document);
        let session_id = self.session_id.clone();
        self.document_task = Some(tokio::spawn(async move {
            coordinator.submit_input(session_id.as_ref(), &*view).await
        }));
    }

    /// Collect submissions that have finished. Called on every tick.
    pub async fn reap_finished(&mut self) {
        if let Some(outcome) = reap(&mut self.chat_task).await {
            debug!(?outcome, "Chat submission finished");
            self.follow_chat = true;
        }
        if let Some(outcome) = reap(&mut self.document_task).await {
            debug!(?outcome, "Document submission finished");
            let blocks = self.document.current().blocks().len();
            self.selected_block = self.selected_block.min(blocks.saturating_sub(1));
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat_pending() || self.document_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn switch_screen(&mut self) {
        self.screen = match self.screen {
            Screen::Chat => Screen::Document,
            Screen::Document => Screen::Chat,
        };
        self.focus = FocusPane::Input;
    }

    pub fn toggle_focus(&mut self) {
        if self.screen == Screen::Document {
            self.focus = match self.focus {
                FocusPane::Editor => FocusPane::Input,
                FocusPane::Input => FocusPane::Editor,
            };
        }
    }

    pub fn select_next_block(&mut self) {
        let len = self.document.current().blocks().len();
        if len > 0 {
            self.selected_block = (self.selected_block + 1).min(len - 1);
        }
    }

    pub fn select_prev_block(&mut self) {
        self.selected_block = self.selected_block.saturating_sub(1);
    }

    /// Scroll chat so the newest line (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;

        for msg in self.chat.snapshot() {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "AI:")
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.chat.is_in_flight() {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height as usize
        } else {
            20
        };

        // Paragraph scroll offsets are u16
        let scroll = total_lines.saturating_sub(visible_height);
        self.chat_scroll = u16::try_from(scroll).unwrap_or(u16::MAX);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }
}

async fn reap(task: &mut Option<JoinHandle<SubmitOutcome>>) -> Option<SubmitOutcome> {
    if !task.as_ref().is_some_and(JoinHandle::is_finished) {
        return None;
    }
    let handle = task.take()?;
    match handle.await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            error!(error = %e, "Submission task failed");
            None
        }
    }
}
