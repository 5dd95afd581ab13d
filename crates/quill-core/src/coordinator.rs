//! Turns one user intent into one `/chat` round trip
//!
//! A submission moves its view `Idle -> Pending -> Idle`. The pending window
//! covers exactly the transport call; leaving it clears the in-flight flag
//! and the view's input buffer however the call ended.

use tracing::debug;

use crate::session::SessionId;
use crate::transport::{ChatRequest, ChatTransport};
use crate::view::{Applied, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InFlight,
    BlankInput,
    NoSession,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Precondition not met; nothing was sent or changed.
    Rejected(Rejection),
    Completed(Applied),
    /// The transport failed; the view recorded the failure its own way.
    Failed(String),
}

pub struct RequestCoordinator<T> {
    transport: T,
}

impl<T: ChatTransport> RequestCoordinator<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn submit<V: View + ?Sized>(
        &self,
        session_id: Option<&SessionId>,
        view: &V,
        user_text: &str,
    ) -> SubmitOutcome {
        if view.is_in_flight() {
            debug!("Submit dropped: request already in flight");
            return SubmitOutcome::Rejected(Rejection::InFlight);
        }
        if user_text.trim().is_empty() {
            debug!("Submit dropped: blank input");
            return SubmitOutcome::Rejected(Rejection::BlankInput);
        }
        let Some(session_id) = session_id else {
            debug!("Submit dropped: no session id yet");
            return SubmitOutcome::Rejected(Rejection::NoSession);
        };
        let Some(_guard) = view.flight().try_begin() else {
            debug!("Submit dropped: request already in flight");
            return SubmitOutcome::Rejected(Rejection::InFlight);
        };

        view.on_begin(user_text);

        let request = ChatRequest {
            session_id: session_id.clone(),
            user_input: user_text.to_string(),
        };

        match self.transport.send(&request).await {
            Ok(response) => {
                let applied = view.on_success(response);
                debug!(reply = applied.reply, document = applied.document, "Applied chat response");
                SubmitOutcome::Completed(applied)
            }
            Err(e) => {
                view.on_failure(&e);
                SubmitOutcome::Failed(e.to_string())
            }
        }
    }

    /// Submit whatever is in the view's input buffer.
    pub async fn submit_input<V: View + ?Sized>(
        &self,
        session_id: Option<&SessionId>,
        view: &V,
    ) -> SubmitOutcome {
        let text = view.input().text().to_string();
        self.submit(session_id, view, &text).await
    }
}
