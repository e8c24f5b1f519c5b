//! Session transcript: the ordered turns of one conversation.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{OutcomeKind, Role, Turn};

/// Append-only list of turns for one session.
///
/// Lives in memory for the session's lifetime. `export` writes a JSON
/// snapshot but nothing is ever read back.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Append a turn and return a reference to it.
    pub fn append(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    /// All turns in insertion order.
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The most recent answered exchange as `(question, answer)`.
    pub fn last_answered(&self) -> Option<(&Turn, &Turn)> {
        self.turns.windows(2).rev().find_map(|pair| {
            let (question, answer) = (&pair[0], &pair[1]);
            (question.role() == Role::User && answer.outcome() == Some(OutcomeKind::Answered))
                .then_some((question, answer))
        })
    }

    pub fn to_json(&self) -> cora_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the transcript as pretty JSON to `path`.
    pub fn export(&self, path: &Path) -> cora_core::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
