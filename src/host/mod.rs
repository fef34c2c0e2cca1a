//! Interfaces to the hosting environment
//!
//! The host owns the world and delivers every event. Arenas only ever reach
//! it through these traits:
//! - [`World`] for block reads/writes, teleports and chat
//! - [`Scheduler`] for single-shot delayed tasks

pub mod memory;
pub mod protocol;
pub mod scheduler;

pub use memory::MemoryWorld;
pub use scheduler::{TickScheduler, TokioScheduler};

use crate::game::geometry::{BlockPos, Location, Material};
use crate::game::{MatchId, PlayerId};

/// World mutation and query primitives provided by the host
pub trait World {
    /// Whether a world with this name is currently loaded
    fn is_world_loaded(&self, world: &str) -> bool;

    /// Best known block at `pos`. May lag behind the host; writes that must not
    /// clobber terrain go through [`World::set_block_if`].
    fn block_at(&self, pos: &BlockPos) -> Material;

    /// Write `material` at `pos` only if the block there is one of `only_if`.
    ///
    /// Returns the outcome when it is known right away. `None` means the host
    /// decides and answers later with a `block_written` event.
    fn set_block_if(&mut self, pos: &BlockPos, material: Material, only_if: &[Material]) -> Option<bool>;

    /// Current location of an online player
    fn location_of(&self, player: PlayerId) -> Option<Location>;

    /// Default spawn point of a loaded world
    fn world_spawn(&self, world: &str) -> Option<Location>;

    /// Move a player. Returns false if the player is not online.
    fn teleport(&mut self, player: PlayerId, to: &Location) -> bool;

    /// Send a chat line to one player. Offline recipients are ignored.
    fn send_message(&mut self, player: PlayerId, text: &str);
}

/// A delayed action addressed to an arena by identity.
///
/// Tasks never hold arena state; on delivery they are checked against the
/// arena's current match and dropped if it moved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledTask {
    /// End of the pre-fight countdown
    EnableCombat { arena: String, match_id: MatchId },
    /// End of the post-match cooldown
    Cooldown {
        arena: String,
        match_id: MatchId,
        winner: Option<PlayerId>,
    },
}

impl ScheduledTask {
    pub fn arena(&self) -> &str {
        match self {
            ScheduledTask::EnableCombat { arena, .. } | ScheduledTask::Cooldown { arena, .. } => arena,
        }
    }
}

/// Single-shot delayed execution on the host's logical thread
pub trait Scheduler {
    fn schedule_once(&self, delay_ticks: u64, task: ScheduledTask);
}
