//! Error taxonomy shared by every lobby component.

/// Errors that can occur while handling a client request.
///
/// None of these terminate a connection: the gateway converts each one into an
/// `error` event delivered to the sender only.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum LobbyError {
    /// Malformed or out-of-bound input (empty name, bad payload).
    #[error("{0}")]
    Validation(String),
    /// Unknown room, player or tournament id.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Wrong password or acting on behalf of someone else.
    #[error("{0}")]
    Forbidden(String),
    /// Room or tournament at capacity.
    #[error("{0} is full")]
    Full(&'static str),
    /// Operation not allowed in the current lifecycle phase.
    #[error("{0}")]
    InvalidState(String),
    /// Move submitted by a seat that does not hold the turn.
    #[error("Not your turn")]
    NotYourTurn,
    /// Move rejected by the rule engine.
    #[error("Illegal move")]
    IllegalMove,
    /// Inbound envelope with a `type` the gateway does not route.
    #[error("Unknown message type: {0}")]
    UnknownMessage(String),
    /// Shared state became unusable (poisoned lock).
    #[error("Internal error: {0}")]
    Internal(&'static str),
}

impl LobbyError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            LobbyError::Validation(_) => "validation",
            LobbyError::NotFound(_) => "not_found",
            LobbyError::Forbidden(_) => "forbidden",
            LobbyError::Full(_) => "full",
            LobbyError::InvalidState(_) => "invalid_state",
            LobbyError::NotYourTurn => "not_your_turn",
            LobbyError::IllegalMove => "illegal_move",
            LobbyError::UnknownMessage(_) => "unknown_message",
            LobbyError::Internal(_) => "internal",
        }
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        LobbyError::InvalidState(message.into())
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        LobbyError::Forbidden(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        LobbyError::Validation(message.into())
    }
}

/// Lock a mutex, mapping poisoning to [`LobbyError::Internal`].
pub(crate) fn lock<T>(
    mutex: &std::sync::Mutex<T>,
) -> Result<std::sync::MutexGuard<'_, T>, LobbyError> {
    mutex.lock().map_err(|_| LobbyError::Internal("lock error"))
}

pub(crate) fn read<T>(
    lock: &std::sync::RwLock<T>,
) -> Result<std::sync::RwLockReadGuard<'_, T>, LobbyError> {
    lock.read().map_err(|_| LobbyError::Internal("lock error"))
}

pub(crate) fn write<T>(
    lock: &std::sync::RwLock<T>,
) -> Result<std::sync::RwLockWriteGuard<'_, T>, LobbyError> {
    lock.write().map_err(|_| LobbyError::Internal("lock error"))
}
