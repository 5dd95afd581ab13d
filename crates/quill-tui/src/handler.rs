use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use quill_core::{Alignment, Composer};

use crate::app::{App, FocusPane, Screen, BASE_FONT_SIZE};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.reap_finished().await;
            app.tick_animation();
        }
    }
    if app.follow_chat {
        app.scroll_chat_to_bottom();
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work on every screen
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::BackTab => {
            app.switch_screen();
            return;
        }
        _ => {}
    }

    match app.screen {
        Screen::Chat => handle_chat(app, key),
        Screen::Document => match app.focus {
            FocusPane::Editor => handle_editor(app, key),
            FocusPane::Input => handle_command(app, key),
        },
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_chat(),
        KeyCode::PageUp => app.scroll_chat_up(app.chat_height.max(1) / 2),
        KeyCode::PageDown => app.scroll_chat_down(app.chat_height.max(1) / 2),
        KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.follow_chat = true;
        }
        _ => {
            // Typing is ignored while a request is pending
            app.edit_chat_input(|input| edit_composer(input, key));
        }
    }
}

fn handle_command(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_document(),
        KeyCode::Tab => app.toggle_focus(),
        _ => {
            app.edit_document_input(|input| edit_composer(input, key));
        }
    }
}

fn handle_editor(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let index = app.selected_block;

    match key.code {
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Up if alt => resize_font(app, index, 2.0),
        KeyCode::Down if alt => resize_font(app, index, -2.0),
        KeyCode::Up => app.select_prev_block(),
        KeyCode::Down => app.select_next_block(),
        KeyCode::Char('b') if ctrl => {
            app.edit_document(|doc| *doc = doc.with_bold_toggled(index));
        }
        KeyCode::Char('l') if ctrl => align(app, index, Alignment::Left),
        KeyCode::Char('e') if ctrl => align(app, index, Alignment::Center),
        KeyCode::Char('r') if ctrl => align(app, index, Alignment::Right),
        KeyCode::Char('j') if ctrl => align(app, index, Alignment::Justify),
        KeyCode::Enter => {
            let mut created = None;
            if app.edit_document(|doc| created = Some(doc.push_paragraph(index))) {
                if let Some(at) = created {
                    app.selected_block = at;
                }
            }
        }
        KeyCode::Backspace => {
            app.edit_document(|doc| doc.pop_char(index));
        }
        KeyCode::Char(c) if !ctrl && !alt => {
            app.edit_document(|doc| doc.push_char(index, c));
        }
        _ => {}
    }
}

fn align(app: &mut App, index: usize, alignment: Alignment) {
    app.edit_document(|doc| *doc = doc.with_alignment(index, alignment));
}

fn resize_font(app: &mut App, index: usize, delta: f64) {
    let current = app
        .document
        .current()
        .blocks()
        .get(index)
        .and_then(|block| block.runs().find_map(|run| run.font_size))
        .unwrap_or(BASE_FONT_SIZE);
    let size = (current + delta).clamp(8.0, 72.0);
    app.edit_document(|doc| *doc = doc.with_font_size(index, size));
}

fn edit_composer(input: &mut Composer, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            input.insert(c)
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Chat {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_chat_up(3),
        MouseEventKind::ScrollDown => app.scroll_chat_down(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use quill_core::{
        ChatRequest, ChatResponse, ChatTransport, Document, Message, SessionId, TransportError,
        View,
    };

    use super::*;

    /// Replies to every chat request with a fixed body.
    struct FixedTransport(Result<ChatResponse, String>);

    #[async_trait]
    impl ChatTransport for FixedTransport {
        async fn send(&self, _request: &ChatRequest) -> Result<ChatResponse, TransportError> {
            self.0.clone().map_err(TransportError::Network)
        }
    }

    fn app_with(reply: Result<ChatResponse, String>) -> App {
        App::new(
            Arc::new(FixedTransport(reply)),
            Some(SessionId::from("tui-test".to_string())),
            "http://localhost:8000",
        )
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).await;
        }
    }

    async fn settle(app: &mut App) {
        for task in [app.chat_task.take(), app.document_task.take()]
            .into_iter()
            .flatten()
        {
            task.await.unwrap();
        }
        handle_event(app, AppEvent::Tick).await;
    }

    #[tokio::test]
    async fn test_enter_sends_chat_and_renders_reply() {
        let mut app = app_with(Ok(ChatResponse::reply("Hello")));
        type_text(&mut app, "hi").await;
        assert_eq!(app.chat.input().text(), "hi");

        handle_event(&mut app, key(KeyCode::Enter)).await;
        assert!(app.chat_task.is_some());
        settle(&mut app).await;

        assert_eq!(
            app.chat.snapshot(),
            vec![Message::user("hi"), Message::assistant("Hello")]
        );
        assert_eq!(app.chat.input().text(), "");
        assert!(!app.chat_pending());
    }

    #[tokio::test]
    async fn test_blank_chat_input_does_not_spawn() {
        let mut app = app_with(Ok(ChatResponse::reply("unused")));
        type_text(&mut app, "   ").await;
        handle_event(&mut app, key(KeyCode::Enter)).await;

        assert!(app.chat_task.is_none());
        assert!(app.chat.is_empty());
    }

    #[tokio::test]
    async fn test_failed_chat_shows_error_message() {
        let mut app = app_with(Err("connection refused".to_string()));
        type_text(&mut app, "ping").await;
        handle_event(&mut app, key(KeyCode::Enter)).await;
        settle(&mut app).await;

        let messages = app.chat.snapshot();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_error());
    }

    #[tokio::test]
    async fn test_document_command_replaces_document() {
        let replacement = Document::new(vec![quill_core::Block::paragraph("Formatted")]).unwrap();
        let mut app = app_with(Ok(ChatResponse::with_document(&replacement)));

        handle_event(&mut app, AppEvent::Key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT))).await;
        assert_eq!(app.screen, Screen::Document);
        type_text(&mut app, "format it").await;
        handle_event(&mut app, key(KeyCode::Enter)).await;
        settle(&mut app).await;

        assert_eq!(*app.document.current(), replacement);
        assert!(app.chat.is_empty());
    }

    #[tokio::test]
    async fn test_editor_keys_edit_selected_paragraph() {
        let mut app = app_with(Ok(ChatResponse::default()));
        app.switch_screen();
        handle_event(&mut app, key(KeyCode::Tab)).await;
        assert_eq!(app.focus, FocusPane::Editor);

        handle_event(&mut app, key(KeyCode::Enter)).await;
        assert_eq!(app.selected_block, 1);
        type_text(&mut app, "Hi").await;
        handle_event(&mut app, ctrl('b')).await;
        handle_event(&mut app, ctrl('e')).await;

        let doc = app.document.current();
        let block = &doc.blocks()[1];
        assert_eq!(block.plain_text(), "Hi");
        assert_eq!(block.alignment(), Alignment::Center);
        assert!(block.runs().all(|run| run.is_bold()));
        assert_eq!(doc.blocks().len(), 2);
    }

    #[tokio::test]
    async fn test_scroll_follows_short_conversation() {
        let mut app = app_with(Ok(ChatResponse::reply("Hello")));
        app.chat_height = 2;
        app.chat_width = 10;
        type_text(&mut app, "hi").await;
        handle_event(&mut app, key(KeyCode::Enter)).await;
        settle(&mut app).await;

        // You:, hi, blank, AI:, Hello, blank
        assert_eq!(app.chat_scroll, 4);
    }

    #[tokio::test]
    async fn test_scroll_saturates_on_huge_replies() {
        let mut app = app_with(Ok(ChatResponse::reply("x".repeat(1_500_000))));
        for _ in 0..3 {
            type_text(&mut app, "hi").await;
            handle_event(&mut app, key(KeyCode::Enter)).await;
            settle(&mut app).await;
        }

        assert_eq!(app.chat.len(), 6);
        // ~90k wrapped lines at the default width
        assert_eq!(app.chat_scroll, u16::MAX);
    }

    #[tokio::test]
    async fn test_typing_refused_between_spawn_and_completion() {
        let mut app = app_with(Ok(ChatResponse::reply("Hello")));
        type_text(&mut app, "hi").await;
        handle_event(&mut app, key(KeyCode::Enter)).await;
        assert!(app.chat_pending());

        // The task has not run yet; keystrokes must not land in the buffer
        type_text(&mut app, "more").await;
        assert_eq!(app.chat.input().text(), "hi");

        settle(&mut app).await;
        assert_eq!(app.chat.input().text(), "");
        type_text(&mut app, "next").await;
        assert_eq!(app.chat.input().text(), "next");
    }

    #[tokio::test]
    async fn test_document_edits_refused_while_command_pending() {
        let mut app = app_with(Ok(ChatResponse::default()));
        app.switch_screen();
        type_text(&mut app, "format").await;
        handle_event(&mut app, key(KeyCode::Enter)).await;
        assert!(app.document_pending());

        let before = app.document.current();
        assert!(!app.edit_document(|doc| doc.push_char(0, '!')));
        assert_eq!(app.document.current(), before);

        settle(&mut app).await;
        assert!(app.edit_document(|doc| doc.push_char(0, '!')));
    }
}
