//! Persisted arena descriptors

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::game::{Arena, ArenaError, Location, Volume};
use crate::host::World;

/// Contents of the arena file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaFile {
    #[serde(default)]
    pub arenas: BTreeMap<String, ArenaSection>,
}

/// One arena as stored. Either a box (`box1` + `box2`) or a sphere
/// (`center` + `radius` + one spawn per slot); the box wins when both exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaSection {
    pub capacity: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Slot `i` holds spawn `i + 1`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spawns: Vec<Option<Location>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box1: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box2: Option<Location>,
}

impl ArenaSection {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Store a box and derive its center. The radius no longer applies.
    pub fn set_box(&mut self, corner1: Location, corner2: Location, yaw: f32, pitch: f32) {
        let mut center = Location::new(
            corner1.world.clone(),
            (corner1.x + corner2.x) / 2.0,
            (corner1.y + corner2.y) / 2.0,
            (corner1.z + corner2.z) / 2.0,
        );
        center.yaw = yaw;
        center.pitch = pitch;

        self.box1 = Some(corner1);
        self.box2 = Some(corner2);
        self.center = Some(center);
        self.radius = None;
    }

    /// Store spawn `index` (1-based)
    pub fn set_spawn(&mut self, index: usize, location: Location) {
        if index == 0 {
            return;
        }
        if self.spawns.len() < index {
            self.spawns.resize(index, None);
        }
        self.spawns[index - 1] = Some(location);
    }

    /// Turn the stored descriptor into a live arena
    pub fn build(&self, key: &str, world: &dyn World) -> Result<Arena, ArenaError> {
        if self.capacity < 2 {
            return Err(ArenaError::InvalidCapacity {
                arena: key.to_string(),
                capacity: self.capacity,
            });
        }

        let loaded = |loc: &Location| {
            if world.is_world_loaded(&loc.world) {
                Ok(())
            } else {
                Err(ArenaError::WorldUnavailable {
                    arena: key.to_string(),
                    world: loc.world.clone(),
                })
            }
        };

        match (&self.box1, &self.box2) {
            (Some(a), Some(b)) => {
                loaded(a)?;
                loaded(b)?;
                match Volume::cuboid(a, b) {
                    Some(volume) => return Arena::new(key, self.capacity, volume),
                    None => warn!(arena = %key, "Box corners are in different worlds, ignoring box"),
                }
            }
            (Some(_), None) | (None, Some(_)) => {
                warn!(arena = %key, "Box is missing a corner, ignoring box");
            }
            (None, None) => {}
        }

        let center = self
            .center
            .as_ref()
            .ok_or_else(|| ArenaError::incomplete(key, "center"))?;
        loaded(center)?;

        let radius = self
            .radius
            .filter(|r| *r > 0.0)
            .ok_or_else(|| ArenaError::incomplete(key, "radius"))?;

        if self.spawns.len() < self.capacity {
            return Err(ArenaError::CapacityMismatch {
                arena: key.to_string(),
                expected: self.capacity,
                found: self.spawns.iter().flatten().count(),
            });
        }

        let mut spawns = Vec::with_capacity(self.capacity);
        for (i, slot) in self.spawns.iter().take(self.capacity).enumerate() {
            let spawn = slot
                .as_ref()
                .ok_or_else(|| ArenaError::incomplete(key, format!("spawn{}", i + 1)))?;
            loaded(spawn)?;
            spawns.push(spawn.clone());
        }

        Arena::new(
            key,
            self.capacity,
            Volume::Sphere {
                center: center.clone(),
                radius,
                spawns,
            },
        )
    }
}

impl ArenaFile {
    /// Build every arena that is fully configured. The rest are reported and
    /// left out until fixed.
    pub fn load_arenas(&self, world: &dyn World) -> Vec<Arena> {
        let mut arenas = Vec::with_capacity(self.arenas.len());
        for (key, section) in &self.arenas {
            match section.build(key, world) {
                Ok(arena) => {
                    info!(
                        arena = %key,
                        capacity = arena.capacity(),
                        using_box = matches!(arena.volume(), Volume::Cuboid { .. }),
                        "Loaded arena"
                    );
                    arenas.push(arena);
                }
                Err(e) => warn!(arena = %key, error = %e, "Arena inactive until its configuration is fixed"),
            }
        }
        arenas
    }
}

/// JSON file holding the arena descriptors
#[derive(Debug, Clone)]
pub struct ArenaStore {
    path: PathBuf,
}

impl ArenaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file; a missing file is an empty configuration
    pub fn load(&self) -> Result<ArenaFile, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ArenaFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, file: &ArenaFile) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// Arena file errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access arena file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid arena file: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryWorld;
    use uuid::Uuid;

    fn world() -> MemoryWorld {
        let mut world = MemoryWorld::new();
        world.load_world("world", Location::new("world", 0.0, 64.0, 0.0));
        world
    }

    fn temp_store() -> ArenaStore {
        ArenaStore::new(std::env::temp_dir().join(format!("arenas-{}.json", Uuid::new_v4())))
    }

    fn sphere_section() -> ArenaSection {
        let mut section = ArenaSection::new(2);
        section.center = Some(Location::new("world", 0.0, 64.0, 0.0));
        section.radius = Some(6.0);
        section.set_spawn(1, Location::new("world", -2.0, 64.0, 0.0));
        section.set_spawn(2, Location::new("world", 2.0, 64.0, 0.0));
        section
    }

    #[test]
    fn box_round_trip_keeps_midpoint() {
        let store = temp_store();
        let corner1 = Location::new("world", -4.0, 60.0, 10.0);
        let corner2 = Location::new("world", 6.0, 70.0, -2.0);

        let mut section = sphere_section();
        section.set_box(corner1.clone(), corner2.clone(), 90.0, 0.0);
        let mut file = ArenaFile::default();
        file.arenas.insert("arena1".to_string(), section);
        store.save(&file).unwrap();

        let loaded = store.load().unwrap();
        let _ = std::fs::remove_file(store.path());
        assert_eq!(loaded, file);
        assert_eq!(loaded.arenas["arena1"].radius, None);

        let arenas = loaded.load_arenas(&world());
        assert_eq!(arenas.len(), 1);
        let volume = arenas[0].volume();
        let center = volume.center();
        assert_eq!((center.x, center.y, center.z), (1.0, 65.0, 4.0));

        let expected = Volume::cuboid(&corner1, &corner2).unwrap();
        assert_eq!(volume, &expected);
        for point in [
            Location::new("world", -4.0, 60.0, -2.0),
            Location::new("world", 6.0, 70.0, 10.0),
            Location::new("world", 6.1, 65.0, 0.0),
            Location::new("world", 0.0, 59.9, 0.0),
        ] {
            assert_eq!(volume.contains(&point), expected.contains(&point));
        }
    }

    #[test]
    fn missing_file_is_empty() {
        assert_eq!(temp_store().load().unwrap(), ArenaFile::default());
    }

    #[test]
    fn sphere_needs_every_field() {
        let world = world();
        assert!(sphere_section().build("a", &world).is_ok());

        let mut no_radius = sphere_section();
        no_radius.radius = Some(0.0);
        assert_eq!(
            no_radius.build("a", &world).unwrap_err(),
            ArenaError::incomplete("a", "radius")
        );

        let mut no_center = sphere_section();
        no_center.center = None;
        assert_eq!(
            no_center.build("a", &world).unwrap_err(),
            ArenaError::incomplete("a", "center")
        );

        let mut gap = sphere_section();
        gap.spawns[0] = None;
        assert_eq!(gap.build("a", &world).unwrap_err(), ArenaError::incomplete("a", "spawn1"));
    }

    #[test]
    fn too_few_spawns_is_capacity_mismatch() {
        let mut section = sphere_section();
        section.capacity = 4;
        assert_eq!(
            section.build("a", &world()).unwrap_err(),
            ArenaError::CapacityMismatch {
                arena: "a".to_string(),
                expected: 4,
                found: 2
            }
        );
    }

    #[test]
    fn unloaded_world_is_reported() {
        let mut section = sphere_section();
        section.center = Some(Location::new("nether", 0.0, 64.0, 0.0));
        assert_eq!(
            section.build("a", &world()).unwrap_err(),
            ArenaError::WorldUnavailable {
                arena: "a".to_string(),
                world: "nether".to_string()
            }
        );
    }

    #[test]
    fn broken_box_falls_back_to_sphere() {
        let mut section = sphere_section();
        section.box1 = Some(Location::new("world", 0.0, 0.0, 0.0));
        let arena = section.build("a", &world()).unwrap();
        assert!(matches!(arena.volume(), Volume::Sphere { .. }));

        let mut only_box = ArenaSection::new(2);
        only_box.box1 = Some(Location::new("world", 0.0, 0.0, 0.0));
        assert!(only_box.build("a", &world()).is_err());
    }

    #[test]
    fn invalid_sections_are_skipped_on_load() {
        let mut file = ArenaFile::default();
        file.arenas.insert("good".to_string(), sphere_section());
        file.arenas.insert("bad".to_string(), ArenaSection::new(2));
        let arenas = file.load_arenas(&world());
        assert_eq!(arenas.len(), 1);
        assert_eq!(arenas[0].key(), "good");
    }

    #[test]
    fn parses_hand_written_file() {
        let raw = r#"{
            "arenas": {
                "arena2": {
                    "capacity": 4,
                    "box1": {"world": "world", "x": 0, "y": 64, "z": 0},
                    "box2": {"world": "world", "x": 12, "y": 70, "z": 12}
                }
            }
        }"#;
        let file: ArenaFile = serde_json::from_str(raw).unwrap();
        let arenas = file.load_arenas(&world());
        assert_eq!(arenas[0].capacity(), 4);
    }
}
