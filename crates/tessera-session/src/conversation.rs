//! The running conversation fed to the generation collaborator.
//!
//! A [`Conversation`] is a plain value: it is moved into
//! [`extend_and_generate`] and handed back extended, so there is no hidden
//! process-wide state. Callers that share it across tasks wrap it in a mutex.

use serde::{Deserialize, Serialize};
use tessera_types::{CollaboratorError, Generator, Turn};
use thiserror::Error;

/// Accumulated context of one conversation.
///
/// Turns only ever grow; there is no reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// True if `self` holds every turn of `earlier`, in order, plus at least one more.
    pub fn strictly_extends(&self, earlier: &Conversation) -> bool {
        self.turns.len() > earlier.turns.len() && self.turns.starts_with(&earlier.turns)
    }
}

/// Generation failed; the conversation is returned untouched.
#[derive(Debug, Error)]
#[error("Generation failed: {source}")]
pub struct TurnError {
    pub session: Conversation,
    pub source: CollaboratorError,
}

impl TurnError {
    pub fn into_parts(self) -> (Conversation, CollaboratorError) {
        (self.session, self.source)
    }
}

/// Run one generation turn.
///
/// The generator sees every prior turn plus `input`. On success both the input
/// and the reply are appended, so the next call's context strictly extends
/// this one's.
pub async fn extend_and_generate(
    session: Conversation,
    generator: &dyn Generator,
    input: &str,
) -> Result<(Conversation, String), TurnError> {
    let result = generator.generate(session.turns(), input).await;
    match result {
        Ok(text) => {
            let mut session = session;
            session.turns.push(Turn::user(input));
            session.turns.push(Turn::assistant(text.clone()));
            Ok((session, text))
        }
        Err(source) => Err(TurnError { session, source }),
    }
}
