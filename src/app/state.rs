//! Application state shared by the event loop

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ArenaFile, ArenaStore, Config};
use crate::game::ArenaManager;
use crate::host::protocol::{HostAction, HostEvent};
use crate::host::{MemoryWorld, ScheduledTask, Scheduler, TokioScheduler, World};
use crate::util::time::uptime_secs;

use super::admin::{self, AdminOutcome, PendingSelections};

/// Everything mutated by events; guarded by one lock so arenas and the
/// coordinator only ever change one event at a time.
struct Core {
    manager: ArenaManager,
    world: MemoryWorld,
    selections: PendingSelections,
    file: ArenaFile,
}

/// Shared application state
pub struct AppState<S: Scheduler = TokioScheduler> {
    pub config: Arc<Config>,
    store: ArenaStore,
    scheduler: S,
    core: Mutex<Core>,
}

impl<S: Scheduler> AppState<S> {
    /// Read the arena file. Arenas become active as their worlds load.
    pub fn new(config: Config, scheduler: S) -> Result<Self, crate::config::StoreError> {
        let store = ArenaStore::new(config.arenas_file.clone());
        let file = store.load()?;
        info!(
            path = %store.path().display(),
            configured = file.arenas.len(),
            "Arena file read"
        );

        let core = Core {
            manager: ArenaManager::new(config.timings()),
            world: MemoryWorld::mirror(),
            selections: PendingSelections::new(),
            file,
        };

        Ok(Self {
            config: Arc::new(config),
            store,
            scheduler,
            core: Mutex::new(core),
        })
    }

    /// Apply one host event and return what the host must do in response
    pub fn handle(&self, event: HostEvent) -> Vec<HostAction> {
        let mut guard = self.core.lock();
        let core = &mut *guard;
        let scheduler = &self.scheduler;
        let mut verdict = None;

        match event {
            HostEvent::WorldLoaded { world, spawn } => {
                info!(world = %world, "World loaded");
                core.world.load_world(world, spawn);
                activate_missing(core);
            }
            HostEvent::PlayerJoin { player, location } => {
                core.world.join(player, location.clone());
                core.manager.on_move(&mut core.world, scheduler, player, &location);
            }
            HostEvent::PlayerMove { player, to } => {
                core.world.move_to(player, to.clone());
                core.manager.on_move(&mut core.world, scheduler, player, &to);
            }
            HostEvent::PlayerDeath { player } => {
                core.manager.on_death(&mut core.world, scheduler, player);
            }
            HostEvent::PlayerQuit { player } => {
                core.manager.on_disconnect(&mut core.world, scheduler, player);
                core.world.quit(player);
            }
            HostEvent::Damage {
                id,
                attacker,
                victim,
            } => {
                let allow = core.manager.check_damage(&core.world, attacker, victim).is_permitted();
                verdict = Some(HostAction::Verdict { id, allow });
            }
            HostEvent::BlockBreak { id, pos, material } => {
                let allow = core.manager.check_block_break(&pos, material).is_permitted();
                verdict = Some(HostAction::Verdict { id, allow });
            }
            HostEvent::BlockChanged { pos, material } => {
                core.world.put_block(pos, material);
            }
            HostEvent::BlockWritten {
                pos,
                material,
                applied,
            } => {
                if applied {
                    core.world.put_block(pos.clone(), material);
                }
                core.manager.on_block_written(&mut core.world, &pos, material, applied);
            }
            HostEvent::Admin {
                player,
                arena,
                command,
            } => {
                self.run_admin(core, player, &arena, &command);
            }
            HostEvent::Reload => match self.store.load() {
                Ok(file) => {
                    core.file = file;
                    reload(core);
                }
                Err(e) => warn!(error = %e, "Reload failed, keeping current arenas"),
            },
        }

        let mut actions = core.world.drain_actions();
        actions.extend(verdict);
        actions
    }

    /// Deliver a delayed task
    pub fn run_task(&self, task: ScheduledTask) -> Vec<HostAction> {
        let mut guard = self.core.lock();
        let core = &mut *guard;

        if let Err(e) = core.manager.run_task(&mut core.world, &self.scheduler, task) {
            debug!(error = %e, "Dropped delayed task");
        }
        core.world.drain_actions()
    }

    /// Remove every enclosure before the process exits
    pub fn shutdown(&self) -> Vec<HostAction> {
        let mut guard = self.core.lock();
        let core = &mut *guard;

        core.manager.shutdown(&mut core.world);
        info!(uptime_secs = uptime_secs(), "Arenas shut down");
        core.world.drain_actions()
    }

    fn run_admin(
        &self,
        core: &mut Core,
        player: crate::game::PlayerId,
        arena: &str,
        command: &crate::host::protocol::AdminCommand,
    ) {
        let Some(sender) = core.world.location_of(player) else {
            debug!(player = %player, "Ignoring admin command from offline player");
            return;
        };

        let mut draft = core.file.clone();
        match admin::apply(&mut draft, &mut core.selections, arena, command, &sender) {
            Ok(AdminOutcome::Pending(reply)) => core.world.send_message(player, &reply),
            Ok(AdminOutcome::Saved(reply)) => {
                if let Err(e) = self.store.save(&draft) {
                    warn!(error = %e, arena = %arena, "Failed to save arena file");
                    core.world.send_message(player, "Could not save the arena file.");
                    return;
                }
                core.file = draft;
                info!(arena = %arena, command = ?command, "Arena configuration changed");
                reload(core);
                core.world.send_message(player, &reply);
            }
            Err(e) => core.world.send_message(player, &e.to_string()),
        }
    }
}

/// Rebuild all arenas from the current file, cancelling anything in progress
fn reload(core: &mut Core) {
    let arenas = core.file.load_arenas(&core.world);
    core.manager.replace_arenas(&mut core.world, arenas);
}

/// Bring up configured arenas that were not active yet, leaving running ones alone
fn activate_missing(core: &mut Core) {
    let mut pending = core.file.clone();
    pending
        .arenas
        .retain(|key, _| core.manager.arena(key).is_none());

    for arena in pending.load_arenas(&core.world) {
        core.manager.insert_arena(arena);
    }
}
