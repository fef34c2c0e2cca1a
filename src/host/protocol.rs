//! Host protocol message definitions
//! These are the line-delimited JSON types exchanged with the hosting world

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::geometry::{BlockPos, Location, Material};

/// Events delivered by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A world became available
    WorldLoaded {
        world: String,
        /// Default spawn point of the world
        spawn: Location,
    },

    /// Player connected
    PlayerJoin { player: Uuid, location: Location },

    /// Player position changed
    PlayerMove { player: Uuid, to: Location },

    /// Player died
    PlayerDeath { player: Uuid },

    /// Player disconnected
    PlayerQuit { player: Uuid },

    /// Damage about to be applied; answered with a verdict
    Damage {
        /// Correlation id echoed in the verdict
        id: u64,
        /// Responsible player, already resolved through projectiles. `None` for
        /// environmental damage.
        attacker: Option<Uuid>,
        victim: Uuid,
    },

    /// Block about to be broken; answered with a verdict
    BlockBreak {
        id: u64,
        pos: BlockPos,
        material: Material,
    },

    /// A block changed outside our control
    BlockChanged { pos: BlockPos, material: Material },

    /// Answer to a conditional `set_block`: whether the host wrote `material`
    /// at `pos`. Sent once per conditional write, in the order they were issued.
    BlockWritten {
        pos: BlockPos,
        material: Material,
        applied: bool,
    },

    /// Arena setup command from an authorised user
    Admin {
        player: Uuid,
        arena: String,
        command: AdminCommand,
    },

    /// Re-read the arena file
    Reload,
}

/// Arena setup operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Declare a new arena with a fixed capacity
    Create { capacity: usize },
    /// Remember the sender's location as box corner 1 or 2
    Corner { index: u8 },
    /// Persist both pending corners as the arena box
    Confirm,
    /// Sender's location becomes the sphere center
    SetCenter,
    SetRadius { radius: f64 },
    /// Sender's location becomes spawn `index` (1-based)
    SetSpawn { index: usize },
}

/// Actions the host must apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostAction {
    /// Write `material` at `pos`. When `only_if` is non-empty the host writes
    /// only if the block currently there is one of those materials, and answers
    /// with `block_written`.
    SetBlock {
        pos: BlockPos,
        material: Material,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        only_if: Vec<Material>,
    },
    Teleport { player: Uuid, to: Location },
    Message { player: Uuid, text: String },
    /// Answer to a cancellable event
    Verdict { id: u64, allow: bool },
}
