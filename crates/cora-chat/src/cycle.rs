//! Request cycle state machine.
//!
//! One question moves through:
//! Idle -> GeneratingSql -> Unanswerable | RunningQuery
//! RunningQuery -> EmptyResult | GeneratingViz -> Answered
//! GeneratingSql/RunningQuery/GeneratingViz -> SystemError
//! Every terminal state -> Idle

use std::fmt;

use tracing::debug;

use crate::error::ChatError;

/// State of the request cycle for a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleState {
    Idle,
    GeneratingSql,
    RunningQuery,
    GeneratingViz,
    Answered,
    EmptyResult,
    Unanswerable,
    SystemError,
}

impl CycleState {
    pub const ALL: [CycleState; 8] = [
        CycleState::Idle,
        CycleState::GeneratingSql,
        CycleState::RunningQuery,
        CycleState::GeneratingViz,
        CycleState::Answered,
        CycleState::EmptyResult,
        CycleState::Unanswerable,
        CycleState::SystemError,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CycleState::Answered
                | CycleState::EmptyResult
                | CycleState::Unanswerable
                | CycleState::SystemError
        )
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleState::Idle => "idle",
            CycleState::GeneratingSql => "generating_sql",
            CycleState::RunningQuery => "running_query",
            CycleState::GeneratingViz => "generating_viz",
            CycleState::Answered => "answered",
            CycleState::EmptyResult => "empty_result",
            CycleState::Unanswerable => "unanswerable",
            CycleState::SystemError => "system_error",
        };
        f.write_str(s)
    }
}

/// Validate that a cycle transition is allowed.
pub fn validate_transition(from: CycleState, to: CycleState) -> Result<(), ChatError> {
    use CycleState::*;

    let valid = matches!(
        (from, to),
        (Idle, GeneratingSql)
            | (GeneratingSql, RunningQuery)
            | (GeneratingSql, Unanswerable)
            | (GeneratingSql, SystemError)
            | (RunningQuery, EmptyResult)
            | (RunningQuery, GeneratingViz)
            | (RunningQuery, SystemError)
            | (GeneratingViz, Answered)
            | (GeneratingViz, SystemError)
    ) || (from.is_terminal() && to == Idle);

    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidTransition(from, to))
    }
}

/// Tracks one question's progress and the path it took.
#[derive(Debug, Clone)]
pub struct RequestCycle {
    state: CycleState,
    path: Vec<CycleState>,
}

impl RequestCycle {
    pub fn new() -> Self {
        Self {
            state: CycleState::Idle,
            path: vec![CycleState::Idle],
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Every state visited, starting with `Idle`.
    pub fn path(&self) -> &[CycleState] {
        &self.path
    }

    pub fn advance(&mut self, to: CycleState) -> Result<(), ChatError> {
        validate_transition(self.state, to)?;
        debug!(from = %self.state, to = %to, "Cycle transition");
        self.state = to;
        self.path.push(to);
        Ok(())
    }

    /// Enter `terminal`, then return to `Idle`.
    pub fn finish(&mut self, terminal: CycleState) -> Result<(), ChatError> {
        self.advance(terminal)?;
        self.advance(CycleState::Idle)
    }
}

impl Default for RequestCycle {
    fn default() -> Self {
        Self::new()
    }
}
