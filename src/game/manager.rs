//! Routes host events to the configured arenas

use tracing::{debug, info};

use crate::host::{ScheduledTask, Scheduler, World};

use super::arena::{Arena, MatchContext, MatchTimings};
use super::coordinator::MatchCoordinator;
use super::error::ArenaError;
use super::geometry::{BlockPos, Location, Material};
use super::PlayerId;

/// Outcome of a cancellable host event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Permit,
    Suppress,
}

impl Verdict {
    pub fn is_permitted(self) -> bool {
        self == Verdict::Permit
    }
}

/// Every active arena, in configuration order, plus the shared coordinator
pub struct ArenaManager {
    arenas: Vec<Arena>,
    coordinator: MatchCoordinator,
    timings: MatchTimings,
}

impl ArenaManager {
    pub fn new(timings: MatchTimings) -> Self {
        Self {
            arenas: Vec::new(),
            coordinator: MatchCoordinator::new(),
            timings,
        }
    }

    pub fn arenas(&self) -> &[Arena] {
        &self.arenas
    }

    pub fn arena(&self, key: &str) -> Option<&Arena> {
        self.arenas.iter().find(|a| a.key() == key)
    }

    pub fn coordinator(&self) -> &MatchCoordinator {
        &self.coordinator
    }

    /// The arena a participant is currently playing in
    pub fn arena_of(&self, player: PlayerId) -> Option<&Arena> {
        let key = self.coordinator.arena_of(player)?;
        self.arena(&key)
    }

    /// Position update. Queues the player in an arena they are inside (unless
    /// already queued elsewhere or playing) and unqueues them from the others.
    pub fn on_move(&mut self, world: &mut dyn World, scheduler: &dyn Scheduler, player: PlayerId, to: &Location) {
        let mut ctx = MatchContext {
            world,
            scheduler,
            coordinator: &self.coordinator,
            timings: self.timings,
        };

        for i in 0..self.arenas.len() {
            if !self.arenas[i].is_inside(to) {
                self.arenas[i].on_leave(ctx.world, player);
                continue;
            }

            let queued_elsewhere = self
                .arenas
                .iter()
                .enumerate()
                .any(|(j, a)| j != i && a.is_waiting(player));
            if queued_elsewhere || ctx.coordinator.is_playing(player) {
                continue;
            }
            self.arenas[i].on_enter(&mut ctx, player);
        }
    }

    pub fn on_death(&mut self, world: &mut dyn World, scheduler: &dyn Scheduler, player: PlayerId) {
        self.eliminate(world, scheduler, player);
    }

    pub fn on_disconnect(&mut self, world: &mut dyn World, scheduler: &dyn Scheduler, player: PlayerId) {
        if self.eliminate(world, scheduler, player) {
            return;
        }
        for arena in &mut self.arenas {
            if arena.remove_waiting(player) {
                debug!(arena = %arena.key(), player = %player, "Queued player disconnected");
            }
        }
    }

    fn eliminate(&mut self, world: &mut dyn World, scheduler: &dyn Scheduler, player: PlayerId) -> bool {
        let Some(key) = self.coordinator.arena_of(player) else {
            return false;
        };
        let mut ctx = MatchContext {
            world,
            scheduler,
            coordinator: &self.coordinator,
            timings: self.timings,
        };
        match self.arenas.iter_mut().find(|a| a.key() == key) {
            Some(arena) => arena.on_eliminated(&mut ctx, player),
            None => {
                // registry entry outlived its arena
                self.coordinator.remove(player);
                false
            }
        }
    }

    /// Damage between players is allowed only inside a running match whose
    /// countdown is over, between two participants of that same match.
    /// Players outside every match may not hurt anyone standing in an arena.
    pub fn check_damage(&self, world: &dyn World, attacker: Option<PlayerId>, victim: PlayerId) -> Verdict {
        let Some(attacker) = attacker else {
            return Verdict::Permit;
        };

        match (self.coordinator.arena_of(victim), self.coordinator.arena_of(attacker)) {
            (None, None) => {
                let in_arena = world
                    .location_of(victim)
                    .map(|loc| self.arenas.iter().any(|a| a.is_inside(&loc)))
                    .unwrap_or(false);
                if in_arena {
                    Verdict::Suppress
                } else {
                    Verdict::Permit
                }
            }
            (Some(v), Some(a)) if v == a => match self.arena(&v) {
                Some(arena) if arena.is_combat_enabled() => Verdict::Permit,
                _ => Verdict::Suppress,
            },
            _ => Verdict::Suppress,
        }
    }

    /// Enclosure blocks cannot be broken
    pub fn check_block_break(&self, pos: &BlockPos, material: Material) -> Verdict {
        if material == Material::Barrier && self.arenas.iter().any(|a| a.enclosure().contains(pos)) {
            Verdict::Suppress
        } else {
            Verdict::Permit
        }
    }

    /// Outcome of a conditional block write reported by the host. Only
    /// barrier writes belong to enclosures; anything else is ignored.
    pub fn on_block_written(&mut self, world: &mut dyn World, pos: &BlockPos, material: Material, applied: bool) {
        if material != Material::Barrier {
            return;
        }
        if !self.arenas.iter_mut().any(|a| a.confirm_block(world, pos, applied)) {
            debug!(pos = ?pos, applied, "Barrier answer for no active enclosure");
        }
    }

    /// Deliver a delayed task. Tasks for arenas that no longer exist, or whose
    /// match has moved on, are stale.
    pub fn run_task(
        &mut self,
        world: &mut dyn World,
        scheduler: &dyn Scheduler,
        task: ScheduledTask,
    ) -> Result<(), ArenaError> {
        let mut ctx = MatchContext {
            world,
            scheduler,
            coordinator: &self.coordinator,
            timings: self.timings,
        };
        let arena = self
            .arenas
            .iter_mut()
            .find(|a| a.key() == task.arena())
            .ok_or_else(|| ArenaError::StaleCallback {
                arena: task.arena().to_string(),
            })?;

        match task {
            ScheduledTask::EnableCombat { match_id, .. } => arena.enable_combat(&mut ctx, match_id),
            ScheduledTask::Cooldown { match_id, winner, .. } => arena.finish_cooldown(&mut ctx, match_id, winner),
        }
    }

    /// Swap in freshly loaded arenas. Anything in progress is cancelled first.
    pub fn replace_arenas(&mut self, world: &mut dyn World, arenas: Vec<Arena>) {
        for arena in &mut self.arenas {
            arena.cancel(world, &self.coordinator);
        }
        self.arenas = arenas;
        info!(arenas = self.arenas.len(), "Arenas replaced");
    }

    /// Add an arena whose key is not active yet. Returns false (and drops
    /// `arena`) if the key is taken.
    pub fn insert_arena(&mut self, arena: Arena) -> bool {
        if self.arena(arena.key()).is_some() {
            return false;
        }
        info!(arena = %arena.key(), "Arena activated");
        self.arenas.push(arena);
        true
    }

    /// Tear down every enclosure and forget all arenas
    pub fn shutdown(&mut self, world: &mut dyn World) {
        for arena in &mut self.arenas {
            arena.cancel(world, &self.coordinator);
        }
        self.arenas.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::Volume;
    use crate::game::ArenaPhase;
    use crate::host::{MemoryWorld, TickScheduler};
    use crate::util::time::{COOLDOWN_TICKS, COUNTDOWN_TICKS};
    use uuid::Uuid;

    struct Setup {
        world: MemoryWorld,
        scheduler: TickScheduler,
        manager: ArenaManager,
    }

    fn duel_box() -> Volume {
        Volume::cuboid(
            &Location::new("world", 0.0, 64.0, 0.0),
            &Location::new("world", 8.0, 68.0, 8.0),
        )
        .unwrap()
    }

    fn team_sphere() -> Volume {
        Volume::Sphere {
            center: Location::new("world", 50.0, 64.0, 50.0),
            radius: 6.0,
            spawns: (0..4)
                .map(|i| Location::new("world", 47.0 + 2.0 * i as f64, 64.0, 50.0))
                .collect(),
        }
    }

    fn inside_box() -> Location {
        Location::new("world", 4.0, 65.0, 4.0)
    }

    fn outside() -> Location {
        Location::new("world", 30.0, 65.0, 30.0)
    }

    impl Setup {
        fn new() -> Self {
            let mut world = MemoryWorld::new();
            world.load_world("world", Location::new("world", 200.0, 64.0, 200.0));
            let mut manager = ArenaManager::new(MatchTimings::default());
            manager.replace_arenas(
                &mut world,
                vec![
                    Arena::new("arena1", 2, duel_box()).unwrap(),
                    Arena::new("arena2", 4, team_sphere()).unwrap(),
                ],
            );
            Self {
                world,
                scheduler: TickScheduler::new(),
                manager,
            }
        }

        fn join(&mut self, at: Location) -> PlayerId {
            let id = Uuid::new_v4();
            self.world.join(id, at.clone());
            self.step(id, at);
            id
        }

        fn step(&mut self, player: PlayerId, to: Location) {
            self.world.move_to(player, to.clone());
            self.manager.on_move(&mut self.world, &self.scheduler, player, &to);
        }

        fn advance(&mut self, ticks: u64) {
            for task in self.scheduler.advance(ticks) {
                let _ = self.manager.run_task(&mut self.world, &self.scheduler, task);
            }
        }

        fn duel(&self) -> &Arena {
            self.manager.arena("arena1").unwrap()
        }

        fn assert_invariants(&self) {
            let mut seen = std::collections::HashSet::new();
            for arena in self.manager.arenas() {
                assert!(arena.playing().len() <= arena.capacity());
                assert!(!arena.is_combat_enabled() || arena.is_running());
                assert!(arena.enclosure().is_empty() || arena.is_running());
                for p in arena.playing() {
                    assert!(seen.insert(*p), "player in two playing sets");
                    assert!(!arena.is_waiting(*p));
                    assert_eq!(self.manager.coordinator().arena_of(*p).as_deref(), Some(arena.key()));
                }
            }
            assert_eq!(seen.len(), self.manager.coordinator().len());
        }
    }

    #[test]
    fn barrier_answers_reach_the_issuing_arena() {
        let mut setup = Setup::new();
        setup.world = MemoryWorld::mirror();
        setup.world.load_world("world", Location::new("world", 200.0, 64.0, 200.0));
        let (p1, p2) = (setup.join(inside_box()), setup.join(inside_box()));
        assert!(setup.manager.arena_of(p1).is_some() && setup.manager.arena_of(p2).is_some());

        let wall = BlockPos::new("world", 0, 66, 0);
        let gap = BlockPos::new("world", 8, 66, 8);
        let arena = setup.manager.arena("arena1").unwrap();
        assert!(arena.enclosure().contains(&wall) && arena.enclosure().contains(&gap));
        let issued = arena.enclosure().len();

        // air answers are reverts and never touch an enclosure
        setup.manager.on_block_written(&mut setup.world, &wall, Material::Air, false);
        setup.manager.on_block_written(&mut setup.world, &wall, Material::Barrier, true);
        setup.manager.on_block_written(&mut setup.world, &gap, Material::Barrier, false);
        let enclosure = setup.manager.arena("arena1").unwrap().enclosure();
        assert!(enclosure.contains(&wall));
        assert!(!enclosure.contains(&gap));
        assert_eq!(enclosure.len(), issued - 1);
    }

    #[test]
    fn movement_queues_and_unqueues() {
        let mut s = Setup::new();
        let p1 = s.join(inside_box());
        assert!(s.duel().is_waiting(p1));

        s.step(p1, outside());
        assert!(!s.duel().is_waiting(p1));
        assert_eq!(s.duel().phase(), ArenaPhase::Empty);
        s.assert_invariants();
    }

    #[test]
    fn second_player_starts_duel() {
        let mut s = Setup::new();
        let p1 = s.join(inside_box());
        let p2 = s.join(inside_box());
        s.assert_invariants();

        assert_eq!(s.duel().phase(), ArenaPhase::Starting);
        assert_eq!(s.manager.arena_of(p1).map(Arena::key), Some("arena1"));
        assert_eq!(s.manager.arena_of(p2).map(Arena::key), Some("arena1"));

        // moving around inside the match never re-queues
        s.step(p1, inside_box());
        assert!(!s.duel().is_waiting(p1));
    }

    #[test]
    fn damage_gated_by_countdown() {
        let mut s = Setup::new();
        let p1 = s.join(inside_box());
        let p2 = s.join(inside_box());

        assert_eq!(s.manager.check_damage(&s.world, Some(p1), p2), Verdict::Suppress);
        s.advance(COUNTDOWN_TICKS);
        assert_eq!(s.manager.check_damage(&s.world, Some(p1), p2), Verdict::Permit);
        s.assert_invariants();
    }

    #[test]
    fn damage_across_match_boundary_is_suppressed() {
        let mut s = Setup::new();
        let p1 = s.join(inside_box());
        let p2 = s.join(inside_box());
        s.advance(COUNTDOWN_TICKS);
        let spectator = s.join(outside());
        let bystander = s.join(outside());

        assert_eq!(s.manager.check_damage(&s.world, Some(spectator), p1), Verdict::Suppress);
        assert_eq!(s.manager.check_damage(&s.world, Some(p2), spectator), Verdict::Suppress);
        // outside every arena this system has no say
        assert_eq!(s.manager.check_damage(&s.world, Some(bystander), spectator), Verdict::Permit);
        assert_eq!(s.manager.check_damage(&s.world, None, p1), Verdict::Permit);

        let queued = s.join(Location::new("world", 50.0, 64.0, 50.0));
        assert_eq!(s.manager.check_damage(&s.world, Some(bystander), queued), Verdict::Suppress);
    }

    #[test]
    fn barrier_blocks_are_protected() {
        let mut s = Setup::new();
        s.join(inside_box());
        s.join(inside_box());

        let wall = BlockPos::new("world", 0, 66, 0);
        assert_eq!(s.manager.check_block_break(&wall, Material::Barrier), Verdict::Suppress);
        assert_eq!(s.manager.check_block_break(&wall, Material::Solid), Verdict::Permit);
        let loose = BlockPos::new("world", 40, 66, 0);
        assert_eq!(s.manager.check_block_break(&loose, Material::Barrier), Verdict::Permit);
    }

    #[test]
    fn death_resolves_and_cooldown_restarts() {
        let mut s = Setup::new();
        let p1 = s.join(inside_box());
        let p2 = s.join(inside_box());
        s.advance(COUNTDOWN_TICKS);

        s.manager.on_death(&mut s.world, &s.scheduler, p1);
        s.assert_invariants();
        assert!(!s.duel().is_running());
        assert!(s.manager.arena_of(p2).is_none());
        assert_eq!(s.world.count_blocks(Material::Barrier), 0);

        let p3 = s.join(inside_box());
        let p4 = s.join(inside_box());
        assert_eq!(s.duel().phase(), ArenaPhase::Cooldown);

        s.advance(COOLDOWN_TICKS);
        assert_eq!(s.world.location_of(p2), s.world.world_spawn("world"));
        assert!(s.duel().is_playing(p3) && s.duel().is_playing(p4));
        s.assert_invariants();
    }

    #[test]
    fn waiting_disconnect_leaves_match_state_alone() {
        let mut s = Setup::new();
        let p1 = s.join(inside_box());
        s.world.quit(p1);
        s.manager.on_disconnect(&mut s.world, &s.scheduler, p1);

        assert!(!s.duel().is_waiting(p1));
        assert!(!s.duel().is_running());
        assert!(s.manager.coordinator().is_empty());
    }

    #[test]
    fn playing_disconnect_eliminates() {
        let mut s = Setup::new();
        let p1 = s.join(inside_box());
        let p2 = s.join(inside_box());
        s.world.quit(p2);
        s.manager.on_disconnect(&mut s.world, &s.scheduler, p2);

        assert!(!s.duel().is_running());
        assert!(s.world.pending_messages(p1).contains(&"You won the duel in arena1!"));
        s.assert_invariants();
    }

    #[test]
    fn overlapping_volumes_queue_once() {
        let mut s = Setup::new();
        s.manager.replace_arenas(
            &mut s.world,
            vec![
                Arena::new("a", 2, duel_box()).unwrap(),
                Arena::new("b", 2, duel_box()).unwrap(),
            ],
        );
        let p1 = s.join(inside_box());
        let queued: Vec<&str> = s
            .manager
            .arenas()
            .iter()
            .filter(|a| a.is_waiting(p1))
            .map(Arena::key)
            .collect();
        assert_eq!(queued, vec!["a"]);

        let p2 = s.join(inside_box());
        assert!(s.manager.arena("a").unwrap().is_playing(p2));
        assert!(!s.manager.arena("b").unwrap().is_waiting(p1));
        s.assert_invariants();
    }

    #[test]
    fn reload_cancels_running_match() {
        let mut s = Setup::new();
        let p1 = s.join(inside_box());
        s.join(inside_box());

        s.manager.replace_arenas(&mut s.world, vec![Arena::new("arena1", 2, duel_box()).unwrap()]);
        assert_eq!(s.world.count_blocks(Material::Barrier), 0);
        assert!(s.manager.coordinator().is_empty());
        assert!(s.world.pending_messages(p1).contains(&"The arena1 match was cancelled."));

        // the countdown of the cancelled match must not arm the new arena
        s.advance(COUNTDOWN_TICKS);
        assert!(!s.duel().is_combat_enabled());
        assert_eq!(s.duel().phase(), ArenaPhase::Empty);
    }

    #[test]
    fn insert_leaves_running_arenas_alone() {
        let mut s = Setup::new();
        let p1 = s.join(inside_box());
        s.join(inside_box());

        assert!(!s.manager.insert_arena(Arena::new("arena1", 2, duel_box()).unwrap()));
        assert!(s.duel().is_playing(p1));

        let far = Volume::cuboid(
            &Location::new("world", 100.0, 64.0, 100.0),
            &Location::new("world", 108.0, 68.0, 108.0),
        )
        .unwrap();
        assert!(s.manager.insert_arena(Arena::new("arena3", 2, far).unwrap()));
        assert_eq!(s.manager.arenas().len(), 3);
        assert_eq!(s.duel().phase(), ArenaPhase::Starting);
        s.assert_invariants();
    }

    #[test]
    fn shutdown_clears_enclosures_and_orphans_tasks() {
        let mut s = Setup::new();
        s.join(inside_box());
        s.join(inside_box());
        assert!(s.world.count_blocks(Material::Barrier) > 0);

        s.manager.shutdown(&mut s.world);
        assert_eq!(s.world.count_blocks(Material::Barrier), 0);

        for task in s.scheduler.advance(COUNTDOWN_TICKS) {
            assert!(matches!(
                s.manager.run_task(&mut s.world, &s.scheduler, task),
                Err(ArenaError::StaleCallback { .. })
            ));
        }
    }
}
