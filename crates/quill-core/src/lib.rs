pub mod composer;
pub mod config;
pub mod conversation;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod flight;
pub mod session;
pub mod transport;
pub mod view;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use composer::Composer;
pub use config::Config;
pub use conversation::{Conversation, Message, Role, ERROR_MARKER};
pub use coordinator::{Rejection, RequestCoordinator, SubmitOutcome};
pub use document::{Alignment, Block, Document, DocumentModel, Node, TextRun};
pub use error::{DocumentError, StorageError, TransportError};
pub use flight::Phase;
pub use session::{FileStorage, LocalStorage, MemoryStorage, SessionId, SessionManager};
pub use transport::{ChatRequest, ChatResponse, ChatTransport, HttpTransport};
pub use view::{Applied, ChatView, DocumentView, View};
