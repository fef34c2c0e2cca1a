//! Per-arena match lifecycle

use std::collections::HashSet;

use indexmap::IndexSet;
use tracing::{debug, info};

use crate::host::{ScheduledTask, Scheduler, World};
use crate::util::time::{ticks_to_secs, COOLDOWN_TICKS, COUNTDOWN_TICKS};

use super::coordinator::MatchCoordinator;
use super::enclosure::Enclosure;
use super::error::ArenaError;
use super::geometry::{BlockPos, Location, Volume};
use super::{MatchId, PlayerId};

/// Observable arena phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaPhase {
    /// Nobody waiting or playing
    Empty,
    /// Some players waiting, fewer than capacity
    Queueing,
    /// Match running, countdown before combat
    Starting,
    /// Match running, combat allowed
    Active,
    /// Match over, next start deferred until the cooldown task runs
    Cooldown,
}

/// Delays used by the lifecycle, in host ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchTimings {
    pub countdown_ticks: u64,
    pub cooldown_ticks: u64,
}

impl Default for MatchTimings {
    fn default() -> Self {
        Self {
            countdown_ticks: COUNTDOWN_TICKS,
            cooldown_ticks: COOLDOWN_TICKS,
        }
    }
}

/// Collaborators an arena needs while handling one event
pub struct MatchContext<'a> {
    pub world: &'a mut dyn World,
    pub scheduler: &'a dyn Scheduler,
    pub coordinator: &'a MatchCoordinator,
    pub timings: MatchTimings,
}

/// One configured duel area with its own queue and match state
#[derive(Debug)]
pub struct Arena {
    key: String,
    capacity: usize,
    volume: Volume,
    /// Insertion-ordered; the oldest entries start first
    waiting: IndexSet<PlayerId>,
    playing: HashSet<PlayerId>,
    running: bool,
    combat_enabled: bool,
    /// Id of the running match
    current_match: Option<MatchId>,
    /// Id of the match whose cooldown is pending
    cooldown: Option<MatchId>,
    enclosure: Enclosure,
}

impl Arena {
    pub fn new(key: impl Into<String>, capacity: usize, volume: Volume) -> Result<Self, ArenaError> {
        let key = key.into();
        if capacity < 2 {
            return Err(ArenaError::InvalidCapacity {
                arena: key,
                capacity,
            });
        }
        if let Volume::Sphere { spawns, .. } = &volume {
            if spawns.len() < capacity {
                return Err(ArenaError::CapacityMismatch {
                    arena: key,
                    expected: capacity,
                    found: spawns.len(),
                });
            }
        }

        Ok(Self {
            key,
            capacity,
            volume,
            waiting: IndexSet::new(),
            playing: HashSet::new(),
            running: false,
            combat_enabled: false,
            current_match: None,
            cooldown: None,
            enclosure: Enclosure::new(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn enclosure(&self) -> &Enclosure {
        &self.enclosure
    }

    pub fn waiting(&self) -> impl Iterator<Item = &PlayerId> {
        self.waiting.iter()
    }

    pub fn playing(&self) -> &HashSet<PlayerId> {
        &self.playing
    }

    pub fn is_waiting(&self, player: PlayerId) -> bool {
        self.waiting.contains(&player)
    }

    pub fn is_playing(&self, player: PlayerId) -> bool {
        self.playing.contains(&player)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_combat_enabled(&self) -> bool {
        self.combat_enabled
    }

    pub fn is_inside(&self, loc: &Location) -> bool {
        self.volume.contains(loc)
    }

    pub fn phase(&self) -> ArenaPhase {
        if self.running {
            if self.combat_enabled {
                ArenaPhase::Active
            } else {
                ArenaPhase::Starting
            }
        } else if self.cooldown.is_some() {
            ArenaPhase::Cooldown
        } else if self.waiting.is_empty() {
            ArenaPhase::Empty
        } else {
            ArenaPhase::Queueing
        }
    }

    /// Player stepped into the volume. Queues them unless already queued or
    /// playing here, then tries to start a match.
    pub fn on_enter(&mut self, ctx: &mut MatchContext<'_>, player: PlayerId) -> bool {
        if self.playing.contains(&player) || !self.waiting.insert(player) {
            return false;
        }

        ctx.world.send_message(
            player,
            &format!(
                "You joined the {} duel queue! ({}/{})",
                self.key,
                self.waiting.len(),
                self.capacity
            ),
        );
        debug!(arena = %self.key, player = %player, queued = self.waiting.len(), "Player queued");

        self.try_start(ctx);
        true
    }

    /// Player stepped out of the volume. Only affects the queue.
    pub fn on_leave(&mut self, world: &mut dyn World, player: PlayerId) -> bool {
        if !self.waiting.shift_remove(&player) {
            return false;
        }
        world.send_message(player, &format!("You left the {} duel queue.", self.key));
        debug!(arena = %self.key, player = %player, "Player left queue");
        true
    }

    /// Drop a player from the queue without notifying them
    pub fn remove_waiting(&mut self, player: PlayerId) -> bool {
        self.waiting.shift_remove(&player)
    }

    /// Start a match if the arena is idle and the queue is full.
    ///
    /// Drains the oldest `capacity` waiting players, builds the enclosure,
    /// registers and teleports everyone, and schedules the end of the countdown.
    pub fn try_start(&mut self, ctx: &mut MatchContext<'_>) -> bool {
        if self.running || self.cooldown.is_some() || self.waiting.len() < self.capacity {
            return false;
        }

        let drained: Vec<PlayerId> = self.waiting.drain(..self.capacity).collect();
        let match_id = ctx.coordinator.next_match_id();

        self.running = true;
        self.combat_enabled = false;
        self.current_match = Some(match_id);
        self.playing = drained.iter().copied().collect();

        self.enclosure.build(&self.volume, ctx.world);

        let countdown_secs = ticks_to_secs(ctx.timings.countdown_ticks);
        for (index, player) in drained.iter().copied().enumerate() {
            ctx.coordinator.insert(player, &self.key);

            let spawn = self.volume.spawn_location(self.capacity, index);
            if !ctx.world.teleport(player, &spawn) {
                let skipped = ArenaError::ParticipantOffline { player };
                debug!(arena = %self.key, error = %skipped, "Skipping spawn teleport");
                continue;
            }
            ctx.world.send_message(
                player,
                &format!(
                    "Match starting in {}! ({} seconds until fight)",
                    self.key, countdown_secs
                ),
            );
        }

        ctx.scheduler.schedule_once(
            ctx.timings.countdown_ticks,
            ScheduledTask::EnableCombat {
                arena: self.key.clone(),
                match_id,
            },
        );

        info!(
            arena = %self.key,
            match_id,
            players = drained.len(),
            barrier_blocks = self.enclosure.len(),
            "Match started"
        );
        true
    }

    /// End of the countdown for `match_id`
    pub fn enable_combat(&mut self, ctx: &mut MatchContext<'_>, match_id: MatchId) -> Result<(), ArenaError> {
        if !self.running || self.combat_enabled || self.current_match != Some(match_id) {
            return Err(self.stale());
        }

        self.combat_enabled = true;
        for player in &self.playing {
            ctx.world.send_message(*player, "FIGHT!");
        }

        info!(arena = %self.key, match_id, "Combat enabled");
        Ok(())
    }

    /// A playing participant died or disconnected. Resolves the match once at
    /// most one participant remains.
    pub fn on_eliminated(&mut self, ctx: &mut MatchContext<'_>, player: PlayerId) -> bool {
        if !self.playing.remove(&player) {
            return false;
        }
        ctx.coordinator.remove(player);

        info!(
            arena = %self.key,
            player = %player,
            remaining = self.playing.len(),
            "Participant eliminated"
        );

        if self.playing.len() <= 1 {
            self.resolve(ctx);
        }
        true
    }

    fn resolve(&mut self, ctx: &mut MatchContext<'_>) {
        let winner = self.playing.iter().next().copied();
        let match_id = self
            .current_match
            .take()
            .unwrap_or_else(|| ctx.coordinator.next_match_id());

        self.running = false;
        self.combat_enabled = false;
        self.enclosure.clear(ctx.world);
        ctx.coordinator.release_arena(&self.key);
        self.playing.clear();
        self.cooldown = Some(match_id);

        if let Some(winner) = winner {
            ctx.world
                .send_message(winner, &format!("You won the duel in {}!", self.key));
            ctx.world.send_message(
                winner,
                &format!(
                    "You will be teleported to spawn in {} seconds.",
                    ticks_to_secs(ctx.timings.cooldown_ticks)
                ),
            );
        }

        ctx.scheduler.schedule_once(
            ctx.timings.cooldown_ticks,
            ScheduledTask::Cooldown {
                arena: self.key.clone(),
                match_id,
                winner,
            },
        );

        info!(
            arena = %self.key,
            match_id,
            winner = ?winner,
            "Match resolved"
        );
    }

    /// End of the cooldown for `match_id`: send the winner home, then try the
    /// next start against whatever the queue holds now.
    pub fn finish_cooldown(
        &mut self,
        ctx: &mut MatchContext<'_>,
        match_id: MatchId,
        winner: Option<PlayerId>,
    ) -> Result<(), ArenaError> {
        if self.cooldown != Some(match_id) {
            return Err(self.stale());
        }
        self.cooldown = None;

        if let Some(winner) = winner {
            if let Err(e) = self.send_home(ctx.world, winner) {
                debug!(arena = %self.key, error = %e, "Skipping winner teleport");
            }
        }

        self.try_start(ctx);
        Ok(())
    }

    fn send_home(&mut self, world: &mut dyn World, player: PlayerId) -> Result<(), ArenaError> {
        let offline = ArenaError::ParticipantOffline { player };
        let here = world.location_of(player).ok_or_else(|| offline.clone())?;
        let spawn = world.world_spawn(&here.world).ok_or_else(|| ArenaError::WorldUnavailable {
            arena: self.key.clone(),
            world: here.world.clone(),
        })?;

        if !world.teleport(player, &spawn) {
            return Err(offline);
        }
        world.send_message(player, "Teleported to spawn.");

        if !self.volume.contains(&spawn) {
            self.waiting.shift_remove(&player);
        }
        Ok(())
    }

    /// Abort whatever is in progress: tear down the enclosure, release every
    /// participant and forget the queue. Safe to call in any phase.
    pub fn cancel(&mut self, world: &mut dyn World, coordinator: &MatchCoordinator) {
        if self.running {
            for player in &self.playing {
                world.send_message(*player, &format!("The {} match was cancelled.", self.key));
            }
            info!(arena = %self.key, match_id = ?self.current_match, "Match cancelled");
        }

        self.running = false;
        self.combat_enabled = false;
        self.current_match = None;
        self.cooldown = None;
        self.enclosure.tear_down(world);
        coordinator.release_arena(&self.key);
        self.playing.clear();
        self.waiting.clear();
    }

    /// Route the outcome of a barrier write. Returns false if it was not ours.
    pub fn confirm_block(&mut self, world: &mut dyn World, pos: &BlockPos, applied: bool) -> bool {
        self.enclosure.confirm(world, pos, applied)
    }

    fn stale(&self) -> ArenaError {
        ArenaError::StaleCallback {
            arena: self.key.clone(),
        }
    }
}
