//! Chat orchestrator: drives one question through the request cycle.
//!
//! Pipeline per question:
//! 1. Validate and record the user turn
//! 2. Generate SQL
//! 3. Run it against the warehouse
//! 4. Generate charts from the first rows
//! 5. Record the assistant turn for whichever outcome was reached

use std::sync::Arc;

use cora_backend::{Backend, Warehouse};
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::cycle::{CycleState, RequestCycle};
use crate::error::ChatError;
use crate::transcript::Transcript;
use crate::types::{OutcomeKind, Turn};

/// Maximum question length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Rows sent to the visualization endpoint. The turn keeps all rows.
pub const VIZ_ROW_LIMIT: usize = 12;

/// Coordinates the backend and warehouse for one database.
pub struct ChatOrchestrator {
    backend: Arc<dyn Backend>,
    warehouse: Arc<dyn Warehouse>,
    database: String,
}

impl ChatOrchestrator {
    pub fn new(
        backend: Arc<dyn Backend>,
        warehouse: Arc<dyn Warehouse>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            warehouse,
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Answer `question`, appending a user turn and an assistant turn.
    ///
    /// Returns the assistant turn. Backend failures are recorded as a
    /// `SystemError` turn rather than returned; only an invalid question is
    /// an `Err`, and then nothing is appended.
    pub async fn submit<'t>(
        &self,
        transcript: &'t mut Transcript,
        question: &str,
    ) -> Result<&'t Turn, ChatError> {
        if question.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if question.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH));
        }

        transcript.append(Turn::user(question));

        let mut cycle = RequestCycle::new();
        let reply = match self.run_cycle(question, &mut cycle).await {
            Ok(turn) => turn,
            Err(err) => Self::fail(&mut cycle, err),
        };

        info!(
            session = %transcript.session_id(),
            database = %self.database,
            outcome = ?reply.outcome(),
            "Question handled"
        );
        Ok(transcript.append(reply))
    }

    async fn run_cycle(&self, question: &str, cycle: &mut RequestCycle) -> Result<Turn, ChatError> {
        cycle.advance(CycleState::GeneratingSql)?;
        let query = self.backend.generate_sql(question, &self.database).await?;
        if !query.is_success() {
            debug!(status = query.status_code, "No SQL generated");
            cycle.finish(CycleState::Unanswerable)?;
            return Ok(Turn::unanswerable());
        }

        cycle.advance(CycleState::RunningQuery)?;
        let result = self.warehouse.run_query(&self.database, &query.sql).await?;
        if classify(&query, &result) == OutcomeKind::EmptyResult {
            cycle.finish(CycleState::EmptyResult)?;
            return Ok(Turn::empty_result(query));
        }

        cycle.advance(CycleState::GeneratingViz)?;
        let rows_json = result.head_as_records_json(VIZ_ROW_LIMIT)?;
        let charts = self
            .backend
            .generate_visualization(question, &query.sql, &rows_json)
            .await?;
        debug!(rows = result.len(), "Query answered");

        cycle.finish(CycleState::Answered)?;
        Ok(Turn::answered(query, result, charts))
    }

    fn fail(cycle: &mut RequestCycle, err: ChatError) -> Turn {
        let (source, detail) = match &err {
            ChatError::Backend(e) => (e.endpoint.as_str(), e.cause.to_string()),
            other => ("orchestrator", other.to_string()),
        };
        warn!(source, state = %cycle.state(), error = %detail, "Request cycle failed");
        if let Err(e) = cycle.finish(CycleState::SystemError) {
            warn!(error = %e, "Could not record failure state");
        }
        Turn::system_error(source, detail)
    }

    /// Send the last answered question and its SQL to the backend as a
    /// known-good pair. The transcript is not changed.
    pub async fn confirm_last_answer(&self, transcript: &Transcript) -> Result<(), ChatError> {
        let (question, answer) = transcript
            .last_answered()
            .ok_or(ChatError::NothingToConfirm)?;
        let sql = answer.sql().ok_or(ChatError::NothingToConfirm)?;

        self.backend
            .embed_sql(question.text(), sql, &self.database)
            .await?;
        info!(database = %self.database, "Answer confirmed as known-good SQL");
        Ok(())
    }

    /// Natural-language answer for `question`, outside the transcript.
    pub async fn explain(&self, question: &str) -> Result<String, ChatError> {
        if question.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        Ok(self.backend.natural_response(question, &self.database).await?)
    }

    /// Example questions the backend already knows for this database.
    pub async fn suggestions(&self) -> Result<Vec<String>, ChatError> {
        Ok(self.backend.get_known_sql(&self.database).await?)
    }
}
