//! Error types for the entity store and game operations

/// Errors reported by an [`EntityStore`](crate::store::EntityStore)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The entity was deleted (or never existed). Callers treat this as a no-op.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Room code {0} is already in use")]
    DuplicateRoomCode(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors from game operations. The `Display` text of a validation
/// variant is sent verbatim to the client that caused it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Game already in progress")]
    InProgress,

    #[error("Game is full")]
    Full,

    #[error("Color already taken")]
    ColorTaken,

    #[error("Cannot start game")]
    CannotStart,

    #[error("Too many impostors for this many players")]
    TooManyImpostors,

    #[error("Invalid room code")]
    InvalidRoomCode,

    #[error("Username is required")]
    MissingUsername,

    #[error("Username is too long")]
    UsernameTooLong,

    #[error("Already joined a game")]
    AlreadyJoined,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    /// Stale references are swallowed by the dispatcher instead of reported
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_not_found())
    }
}
