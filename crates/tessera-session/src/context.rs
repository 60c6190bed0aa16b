//! Context window tracking and token estimation.
//!
//! The generation collaborator owns what happens at its context limit. This
//! tracker only estimates usage so the orchestrator can warn and the REPL can
//! report it.

use tessera_types::{Role, Turn};

/// Information about current context window usage.
#[derive(Debug, Clone)]
pub struct ContextInfo {
    pub estimated_tokens: u64,
    pub context_window: u64,
    pub user_tokens: u64,
    pub assistant_tokens: u64,
    pub turns: usize,
}

impl ContextInfo {
    /// Usage as a percentage of the context window.
    pub fn usage_percent(&self) -> f64 {
        if self.context_window == 0 {
            return 0.0;
        }
        (self.estimated_tokens as f64 / self.context_window as f64) * 100.0
    }

    pub fn is_over_limit(&self) -> bool {
        self.context_window > 0 && self.estimated_tokens > self.context_window
    }
}

/// Tracks context window usage for a conversation.
#[derive(Debug, Clone)]
pub struct ContextTracker {
    context_window: u64,
}

impl ContextTracker {
    pub fn new(context_window: u64) -> Self {
        Self { context_window }
    }

    pub fn context_window(&self) -> u64 {
        self.context_window
    }

    /// Estimate token usage of the given turns plus an optional pending input.
    pub fn estimate(&self, turns: &[Turn], pending: Option<&str>) -> ContextInfo {
        let mut user_tokens = pending.map(estimate_turn_text).unwrap_or(0);
        let mut assistant_tokens = 0u64;

        for turn in turns {
            let tokens = estimate_turn_text(&turn.text);
            match turn.role {
                Role::User => user_tokens += tokens,
                Role::Assistant => assistant_tokens += tokens,
            }
        }

        ContextInfo {
            estimated_tokens: user_tokens + assistant_tokens,
            context_window: self.context_window,
            user_tokens,
            assistant_tokens,
            turns: turns.len(),
        }
    }

    /// Format a brief one-line context summary.
    pub fn format_brief(&self, info: &ContextInfo) -> String {
        format!(
            "Context: ~{}/{} tokens ({:.0}%)",
            info.estimated_tokens,
            info.context_window,
            info.usage_percent()
        )
    }

    /// Format a multi-line context breakdown.
    pub fn format_detailed(&self, info: &ContextInfo) -> String {
        let mut lines = vec![format!(
            "Context window: ~{} / {} tokens ({:.1}%) over {} turns",
            info.estimated_tokens,
            info.context_window,
            info.usage_percent(),
            info.turns
        )];
        lines.push(format!("  User:      ~{} tokens", info.user_tokens));
        lines.push(format!("  Assistant: ~{} tokens", info.assistant_tokens));
        if info.is_over_limit() {
            lines.push("  Over the model's window: the model decides what to keep.".to_string());
        }
        lines.join("\n")
    }
}

/// Estimate tokens for a text string (chars / 4 heuristic).
pub fn estimate_text_tokens(text: &str) -> u64 {
    (text.len() as u64).div_ceil(4)
}

/// A turn costs its text plus one end-of-turn separator.
fn estimate_turn_text(text: &str) -> u64 {
    estimate_text_tokens(text) + 1
}
