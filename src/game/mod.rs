//! Duel arena core: geometry, enclosures, per-arena lifecycle and routing

pub mod arena;
pub mod coordinator;
pub mod enclosure;
pub mod error;
pub mod geometry;
pub mod manager;

pub use arena::{Arena, ArenaPhase, MatchContext, MatchTimings};
pub use coordinator::MatchCoordinator;
pub use error::ArenaError;
pub use geometry::{BlockPos, Location, Material, Volume};
pub use manager::{ArenaManager, Verdict};

use uuid::Uuid;

/// Stable identity of a connected player
pub type PlayerId = Uuid;

/// Process-wide unique id of one match
pub type MatchId = u64;
