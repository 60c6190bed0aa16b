//! Append-only JSON logs and conversation state for Tessera.

pub mod context;
pub mod conversation;
pub mod error;
pub mod log;

pub use context::{ContextInfo, ContextTracker};
pub use conversation::{Conversation, TurnError, extend_and_generate};
pub use error::LogError;
pub use log::{AppendReport, LoadedLog, LogStatus, LogStore, append_entry, read_entries};
