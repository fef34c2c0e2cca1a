//! Arena error kinds

use super::PlayerId;

/// Everything that can go wrong loading or driving an arena.
///
/// None of these are fatal: configuration errors leave the arena inactive,
/// runtime ones skip a single action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArenaError {
    #[error("Arena {arena} is missing {field}")]
    ConfigurationIncomplete { arena: String, field: String },

    #[error("World '{world}' for arena {arena} is not loaded")]
    WorldUnavailable { arena: String, world: String },

    #[error("Arena {arena} needs {expected} spawn points but has {found}")]
    CapacityMismatch {
        arena: String,
        expected: usize,
        found: usize,
    },

    #[error("Arena {arena} capacity must be at least 2 (got {capacity})")]
    InvalidCapacity { arena: String, capacity: usize },

    #[error("Task for arena {arena} no longer matches its state")]
    StaleCallback { arena: String },

    #[error("Player {player} is not online")]
    ParticipantOffline { player: PlayerId },
}

impl ArenaError {
    pub(crate) fn incomplete(arena: &str, field: impl Into<String>) -> Self {
        ArenaError::ConfigurationIncomplete {
            arena: arena.to_string(),
            field: field.into(),
        }
    }
}
