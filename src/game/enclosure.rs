//! Temporary barrier walls around a running match

use std::collections::HashSet;

use tracing::debug;

use crate::host::World;

use super::geometry::{BlockPos, Material, Volume};

/// What a barrier may replace
const REPLACEABLE: [Material; 2] = [Material::Air, Material::Passable];

/// Barrier blocks placed by one arena.
///
/// Every write is conditional: the barrier only goes where the block is empty
/// or passable at write time, and only a still-standing barrier is reverted.
/// When the world is remote the outcome arrives later through
/// [`Enclosure::confirm`], and a position is recorded as placed only once the
/// write is known to have happened. Terrain is never overwritten and never
/// removed.
#[derive(Debug, Default)]
pub struct Enclosure {
    placed: HashSet<BlockPos>,
    /// Writes issued for the current build, outcome not known yet
    pending: HashSet<BlockPos>,
    /// Writes still unanswered when the enclosure was cleared
    abandoned: HashSet<BlockPos>,
}

impl Enclosure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Erect walls and roof around `volume`, replacing any previous enclosure
    pub fn build(&mut self, volume: &Volume, world: &mut dyn World) {
        self.clear(world);

        for pos in volume.enclosure_positions() {
            // known terrain is skipped without a write
            if !world.block_at(&pos).is_replaceable() {
                continue;
            }
            match world.set_block_if(&pos, Material::Barrier, &REPLACEABLE) {
                Some(true) => {
                    self.placed.insert(pos);
                }
                Some(false) => {}
                None => {
                    self.pending.insert(pos);
                }
            }
        }

        debug!(
            world = volume.world(),
            placed = self.placed.len(),
            pending = self.pending.len(),
            "Enclosure built"
        );
    }

    /// Remove every barrier this enclosure placed. Writes still in flight are
    /// reverted once their answer arrives. No-op when nothing is recorded.
    pub fn clear(&mut self, world: &mut dyn World) {
        if self.is_empty() {
            return;
        }

        let count = self.placed.len();
        for pos in self.placed.drain() {
            world.set_block_if(&pos, Material::Air, &[Material::Barrier]);
        }
        self.abandoned.extend(self.pending.drain());

        debug!(blocks = count, unanswered = self.abandoned.len(), "Enclosure cleared");
    }

    /// Clear for good. Nobody will read later answers, so in-flight writes are
    /// reverted right away; the host applies them in order, after the build.
    pub fn tear_down(&mut self, world: &mut dyn World) {
        self.clear(world);
        for pos in self.abandoned.drain() {
            world.set_block_if(&pos, Material::Air, &[Material::Barrier]);
        }
    }

    /// Outcome of a barrier write issued by this enclosure. Returns false if
    /// the write was not ours.
    pub fn confirm(&mut self, world: &mut dyn World, pos: &BlockPos, applied: bool) -> bool {
        // answers arrive in issue order, so older writes are matched first
        if self.abandoned.remove(pos) {
            if applied {
                world.set_block_if(pos, Material::Air, &[Material::Barrier]);
            }
            return true;
        }
        if self.pending.remove(pos) {
            if applied {
                self.placed.insert(pos.clone());
            }
            return true;
        }
        false
    }

    /// Whether the barrier at `pos` belongs to this enclosure (placed or
    /// about to be)
    pub fn contains(&self, pos: &BlockPos) -> bool {
        self.placed.contains(pos) || self.pending.contains(pos)
    }

    pub fn len(&self) -> usize {
        self.placed.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty() && self.pending.is_empty()
    }
}
