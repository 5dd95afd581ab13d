//! The two views the coordinator can drive.
//!
//! Each view owns its own in-flight gate and input buffer, so a pending chat
//! request never blocks the document editor and vice versa.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, warn};

use crate::composer::Composer;
use crate::conversation::{Conversation, Message};
use crate::document::{Document, DocumentModel};
use crate::error::TransportError;
use crate::flight::{Flight, Phase};
use crate::transport::ChatResponse;

/// What a successful response changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub reply: bool,
    pub document: bool,
}

/// A target for submitted requests
pub trait View: Send + Sync {
    fn flight(&self) -> &Flight;

    /// Runs after the view is marked in flight and before the request goes out.
    fn on_begin(&self, _user_text: &str) {}

    fn on_success(&self, response: ChatResponse) -> Applied;

    fn on_failure(&self, error: &TransportError);

    fn phase(&self) -> Phase {
        self.flight().phase()
    }

    fn is_in_flight(&self) -> bool {
        self.flight().is_in_flight()
    }

    fn input(&self) -> Composer {
        self.flight().input()
    }

    fn edit_input(&self, f: impl FnOnce(&mut Composer)) -> bool
    where
        Self: Sized,
    {
        self.flight().edit_input(f)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Chat window state
#[derive(Debug, Default)]
pub struct ChatView {
    flight: Flight,
    conversation: Mutex<Conversation>,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Message> {
        lock(&self.conversation).snapshot()
    }

    pub fn len(&self) -> usize {
        lock(&self.conversation).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.conversation).is_empty()
    }
}

impl View for ChatView {
    fn flight(&self) -> &Flight {
        &self.flight
    }

    fn on_begin(&self, user_text: &str) {
        lock(&self.conversation).append(Message::user(user_text));
    }

    fn on_success(&self, response: ChatResponse) -> Applied {
        if response.document.is_some() {
            debug!("Chat view ignoring document field");
        }
        match response.response {
            Some(reply) => {
                lock(&self.conversation).append(Message::assistant(reply));
                Applied {
                    reply: true,
                    document: false,
                }
            }
            None => {
                debug!("Chat response carried no reply");
                Applied::default()
            }
        }
    }

    fn on_failure(&self, error: &TransportError) {
        warn!(error = %error, "Chat request failed");
        lock(&self.conversation).append(Message::error(error));
    }
}

/// Document editor state
#[derive(Debug, Default)]
pub struct DocumentView {
    flight: Flight,
    model: Mutex<DocumentModel>,
}

impl DocumentView {
    pub fn new(model: DocumentModel) -> Self {
        Self {
            flight: Flight::new(),
            model: Mutex::new(model),
        }
    }

    pub fn current(&self) -> Arc<Document> {
        lock(&self.model).current()
    }

    /// Apply a user edit. Refused while a request is pending, and dropped if
    /// it would leave the document without blocks.
    pub fn edit(&self, f: impl FnOnce(&mut Document)) -> bool {
        if self.flight.is_in_flight() {
            return false;
        }
        match lock(&self.model).edit(f) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Discarding invalid edit");
                false
            }
        }
    }
}

impl View for DocumentView {
    fn flight(&self) -> &Flight {
        &self.flight
    }

    fn on_success(&self, response: ChatResponse) -> Applied {
        if response.response.is_some() {
            debug!("Document view ignoring chat reply");
        }
        let document = match response.parse_document() {
            Some(Ok(document)) => document,
            Some(Err(e)) => {
                error!(error = %e, "AI formatting error: unreadable document");
                return Applied::default();
            }
            None => {
                debug!("Response carried no document");
                return Applied::default();
            }
        };

        match lock(&self.model).replace(document) {
            Ok(()) => Applied {
                reply: false,
                document: true,
            },
            Err(e) => {
                error!(error = %e, "AI formatting error: document rejected");
                Applied::default()
            }
        }
    }

    fn on_failure(&self, error: &TransportError) {
        error!(error = %error, "AI formatting error");
    }
}
