//! Error types for the conversation engine.

use cora_backend::BackendError;
use cora_core::CoraError;

use crate::cycle::CycleState;

/// Errors from the chat engine.
///
/// Backend failures during a question never surface here; they become a
/// `SystemError` turn. Only validation, feedback and internal sequencing
/// failures are returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("no answered question to confirm")]
    NothingToConfirm,
    #[error("invalid state transition: {0} -> {1}")]
    InvalidTransition(CycleState, CycleState),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoraError> for ChatError {
    fn from(err: CoraError) -> Self {
        ChatError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cora_backend::AuthError;
    use cora_core::Endpoint;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::NothingToConfirm.to_string(),
            "no answered question to confirm"
        );
        assert_eq!(
            ChatError::InvalidTransition(CycleState::Idle, CycleState::Answered).to_string(),
            "invalid state transition: idle -> answered"
        );
    }

    #[test]
    fn test_chat_error_from_backend_error() {
        let err: ChatError = BackendError::auth(Endpoint::EmbedSql, AuthError::Empty).into();
        assert!(matches!(err, ChatError::Backend(_)));
        assert!(err.to_string().starts_with("embed_sql failed"));
    }

    #[test]
    fn test_chat_error_from_cora_error() {
        let err: ChatError = CoraError::Serialization("bad".to_string()).into();
        assert!(matches!(err, ChatError::Internal(_)));
    }
}
