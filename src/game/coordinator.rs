//! Process-wide registry of who is playing where

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::{MatchId, PlayerId};

/// Maps each actively playing participant to the key of their arena, and
/// hands out match ids.
///
/// A participant is present here iff they are in some arena's playing set.
pub struct MatchCoordinator {
    active: DashMap<PlayerId, String>,
    next_match: AtomicU64,
}

impl MatchCoordinator {
    pub fn new() -> Self {
        Self {
            active: DashMap::new(),
            next_match: AtomicU64::new(1),
        }
    }

    /// Fresh, never reused match id
    pub fn next_match_id(&self) -> MatchId {
        self.next_match.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, player: PlayerId, arena: &str) {
        self.active.insert(player, arena.to_string());
    }

    pub fn remove(&self, player: PlayerId) -> Option<String> {
        self.active.remove(&player).map(|(_, arena)| arena)
    }

    /// Key of the arena this participant is playing in
    pub fn arena_of(&self, player: PlayerId) -> Option<String> {
        self.active.get(&player).map(|entry| entry.value().clone())
    }

    pub fn is_playing(&self, player: PlayerId) -> bool {
        self.active.contains_key(&player)
    }

    /// Drop every entry pointing at `arena`. Safe on an arena with no entries.
    pub fn release_arena(&self, arena: &str) {
        self.active.retain(|_, key| key != arena);
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for MatchCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
