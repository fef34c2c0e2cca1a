//! Arena setup commands

use std::collections::HashMap;

use crate::config::{ArenaFile, ArenaSection};
use crate::game::Location;
use crate::host::protocol::AdminCommand;

/// Box corners captured per arena key, waiting for `confirm`
#[derive(Debug, Default)]
pub struct PendingSelections {
    corners: HashMap<String, (Option<Location>, Option<Location>)>,
}

impl PendingSelections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_corner(&mut self, arena: &str, first: bool, location: Location) {
        let entry = self.corners.entry(arena.to_string()).or_default();
        if first {
            entry.0 = Some(location);
        } else {
            entry.1 = Some(location);
        }
    }

    /// Both corners, if both are set
    pub fn pair(&self, arena: &str) -> Option<(&Location, &Location)> {
        let (a, b) = self.corners.get(arena)?;
        Some((a.as_ref()?, b.as_ref()?))
    }

    pub fn discard(&mut self, arena: &str) {
        self.corners.remove(arena);
    }
}

/// What a successful command did
#[derive(Debug, Clone, PartialEq)]
pub enum AdminOutcome {
    /// Only in-memory state changed
    Pending(String),
    /// The arena file changed and must be saved and reloaded
    Saved(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdminError {
    #[error("Unknown arena {0}. Create it first.")]
    UnknownArena(String),

    #[error("Arena {0} already exists.")]
    ArenaExists(String),

    #[error("Capacity must be at least 2.")]
    InvalidCapacity,

    #[error("Corner must be 1 or 2.")]
    InvalidCorner,

    #[error("You must set both corners first.")]
    CornersMissing,

    #[error("Both corners must be in the same world.")]
    CornerWorldMismatch,

    #[error("Radius must be a positive number.")]
    InvalidRadius,

    #[error("This arena only needs {capacity} spawn points.")]
    SpawnOutOfRange { capacity: usize },
}

/// Apply `command` for `arena`, issued by someone standing at `sender`
pub fn apply(
    file: &mut ArenaFile,
    selections: &mut PendingSelections,
    arena: &str,
    command: &AdminCommand,
    sender: &Location,
) -> Result<AdminOutcome, AdminError> {
    match command {
        AdminCommand::Create { capacity } => {
            if file.arenas.contains_key(arena) {
                return Err(AdminError::ArenaExists(arena.to_string()));
            }
            if *capacity < 2 {
                return Err(AdminError::InvalidCapacity);
            }
            file.arenas.insert(arena.to_string(), ArenaSection::new(*capacity));
            Ok(AdminOutcome::Saved(format!(
                "Created {arena} for {capacity} players."
            )))
        }
        AdminCommand::Corner { index } => {
            let first = match index {
                1 => true,
                2 => false,
                _ => return Err(AdminError::InvalidCorner),
            };
            section_mut(file, arena)?;
            selections.set_corner(arena, first, sender.clone());
            Ok(AdminOutcome::Pending(format!(
                "Set box corner {index} for {arena} at your location. Confirm to save the box."
            )))
        }
        AdminCommand::Confirm => {
            section_mut(file, arena)?;
            let (c1, c2) = selections.pair(arena).ok_or(AdminError::CornersMissing)?;
            if c1.world != c2.world {
                return Err(AdminError::CornerWorldMismatch);
            }
            section_mut(file, arena)?.set_box(c1.clone(), c2.clone(), sender.yaw, sender.pitch);
            selections.discard(arena);
            Ok(AdminOutcome::Saved(format!(
                "Box for {arena} saved and set as arena area."
            )))
        }
        AdminCommand::SetCenter => {
            section_mut(file, arena)?.center = Some(sender.clone());
            Ok(AdminOutcome::Saved(format!("Center for {arena} set to your location.")))
        }
        AdminCommand::SetRadius { radius } => {
            if !radius.is_finite() || *radius <= 0.0 {
                return Err(AdminError::InvalidRadius);
            }
            section_mut(file, arena)?.radius = Some(*radius);
            Ok(AdminOutcome::Saved(format!("Radius for {arena} set to {radius}.")))
        }
        AdminCommand::SetSpawn { index } => {
            let section = section_mut(file, arena)?;
            if *index == 0 || *index > section.capacity {
                return Err(AdminError::SpawnOutOfRange {
                    capacity: section.capacity,
                });
            }
            section.set_spawn(*index, sender.clone());
            Ok(AdminOutcome::Saved(format!(
                "Spawn {index} for {arena} set to your location."
            )))
        }
    }
}

fn section_mut<'a>(file: &'a mut ArenaFile, arena: &str) -> Result<&'a mut ArenaSection, AdminError> {
    file.arenas
        .get_mut(arena)
        .ok_or_else(|| AdminError::UnknownArena(arena.to_string()))
}
