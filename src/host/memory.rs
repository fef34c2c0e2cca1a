//! In-memory mirror of the host world
//!
//! Tracks loaded worlds, online players and every block the host reported or
//! we wrote. Writes are queued as [`HostAction`]s for the host to apply.

use std::collections::HashMap;

use crate::game::geometry::{BlockPos, Location, Material};
use crate::game::PlayerId;

use super::protocol::HostAction;
use super::World;

#[derive(Debug, Default)]
pub struct MemoryWorld {
    /// Whether this copy is the world itself. A mirror only knows what the
    /// host reported and leaves conditional writes to the host.
    authoritative: bool,
    /// world name -> default spawn
    worlds: HashMap<String, Location>,
    /// Non-air blocks
    blocks: HashMap<BlockPos, Material>,
    players: HashMap<PlayerId, Location>,
    outbox: Vec<HostAction>,
}

impl MemoryWorld {
    /// A world that applies writes itself
    pub fn new() -> Self {
        Self {
            authoritative: true,
            ..Self::default()
        }
    }

    /// A copy of a world owned by the host
    pub fn mirror() -> Self {
        Self::default()
    }

    pub fn load_world(&mut self, name: impl Into<String>, spawn: Location) {
        self.worlds.insert(name.into(), spawn);
    }

    /// Record a block change made by the host (no action is emitted)
    pub fn put_block(&mut self, pos: BlockPos, material: Material) {
        if material == Material::Air {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, material);
        }
    }

    pub fn join(&mut self, player: PlayerId, location: Location) {
        self.players.insert(player, location);
    }

    pub fn move_to(&mut self, player: PlayerId, location: Location) {
        self.players.insert(player, location);
    }

    pub fn quit(&mut self, player: PlayerId) {
        self.players.remove(&player);
    }

    /// Take every action queued since the last drain
    pub fn drain_actions(&mut self) -> Vec<HostAction> {
        std::mem::take(&mut self.outbox)
    }

    #[cfg(test)]
    pub fn blocks(&self) -> &HashMap<BlockPos, Material> {
        &self.blocks
    }

    #[cfg(test)]
    pub fn count_blocks(&self, material: Material) -> usize {
        self.blocks.values().filter(|m| **m == material).count()
    }

    /// Chat lines queued for `player` and not yet drained
    #[cfg(test)]
    pub fn pending_messages(&self, player: PlayerId) -> Vec<&str> {
        self.outbox
            .iter()
            .filter_map(|action| match action {
                HostAction::Message { player: p, text } if *p == player => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl World for MemoryWorld {
    fn is_world_loaded(&self, world: &str) -> bool {
        self.worlds.contains_key(world)
    }

    fn block_at(&self, pos: &BlockPos) -> Material {
        self.blocks.get(pos).copied().unwrap_or_default()
    }

    fn set_block_if(&mut self, pos: &BlockPos, material: Material, only_if: &[Material]) -> Option<bool> {
        if self.authoritative && !only_if.is_empty() && !only_if.contains(&self.block_at(pos)) {
            return Some(false);
        }

        self.outbox.push(HostAction::SetBlock {
            pos: pos.clone(),
            material,
            only_if: only_if.to_vec(),
        });
        if !self.authoritative {
            return None;
        }
        self.put_block(pos.clone(), material);
        Some(true)
    }

    fn location_of(&self, player: PlayerId) -> Option<Location> {
        self.players.get(&player).cloned()
    }

    fn world_spawn(&self, world: &str) -> Option<Location> {
        self.worlds.get(world).cloned()
    }

    fn teleport(&mut self, player: PlayerId, to: &Location) -> bool {
        match self.players.get_mut(&player) {
            Some(location) => {
                *location = to.clone();
                self.outbox.push(HostAction::Teleport {
                    player,
                    to: to.clone(),
                });
                true
            }
            None => false,
        }
    }

    fn send_message(&mut self, player: PlayerId, text: &str) {
        if self.players.contains_key(&player) {
            self.outbox.push(HostAction::Message {
                player,
                text: text.to_string(),
            });
        }
    }
}
