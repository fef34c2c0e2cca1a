//! Arena volumes, containment tests and block-coordinate generation

use serde::{Deserialize, Serialize};

/// Distance from the box center to each generated spawn point
pub const SPAWN_OFFSET: f64 = 1.5;

/// Height of a sphere arena's enclosure above its base block
pub const SPHERE_ENCLOSURE_HEIGHT: i32 = 5;

/// Horizontal spawn offsets (x, z) for two-slot arenas: left, right
const TWO_SLOT_OFFSETS: [(f64, f64); 2] = [(-SPAWN_OFFSET, 0.0), (SPAWN_OFFSET, 0.0)];

/// Horizontal spawn offsets (x, z) for larger arenas: left, right, front, back
const FOUR_SLOT_OFFSETS: [(f64, f64); 4] = [
    (-SPAWN_OFFSET, 0.0),
    (SPAWN_OFFSET, 0.0),
    (0.0, -SPAWN_OFFSET),
    (0.0, SPAWN_OFFSET),
];

/// A point in a named world, with facing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// The block this point lies in
    pub fn block(&self) -> BlockPos {
        BlockPos::new(
            self.world.clone(),
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }

    pub fn distance_squared(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Integer block coordinate in a named world
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }
}

/// Block material as far as arenas care
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    /// Empty space
    #[default]
    Air,
    /// Non-colliding decoration (grass, flowers, torches)
    Passable,
    /// Terrain or anything else that collides
    Solid,
    /// The enclosure wall material
    Barrier,
}

impl Material {
    /// Whether an enclosure may claim a block of this material
    pub fn is_replaceable(self) -> bool {
        matches!(self, Material::Air | Material::Passable)
    }
}

/// The play volume of an arena
#[derive(Debug, Clone, PartialEq)]
pub enum Volume {
    /// Axis-aligned box between two corners (bounds inclusive)
    Cuboid {
        world: String,
        min: [f64; 3],
        max: [f64; 3],
    },
    /// Sphere around a center with explicit spawn points
    Sphere {
        center: Location,
        radius: f64,
        spawns: Vec<Location>,
    },
}

impl Volume {
    /// Box from two arbitrary opposite corners. `None` if they are in different worlds.
    pub fn cuboid(a: &Location, b: &Location) -> Option<Self> {
        if a.world != b.world {
            return None;
        }
        Some(Volume::Cuboid {
            world: a.world.clone(),
            min: [a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)],
            max: [a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)],
        })
    }

    pub fn world(&self) -> &str {
        match self {
            Volume::Cuboid { world, .. } => world,
            Volume::Sphere { center, .. } => &center.world,
        }
    }

    /// Midpoint of a box, or the configured center of a sphere
    pub fn center(&self) -> Location {
        match self {
            Volume::Cuboid { world, min, max } => Location::new(
                world.clone(),
                (min[0] + max[0]) / 2.0,
                (min[1] + max[1]) / 2.0,
                (min[2] + max[2]) / 2.0,
            ),
            Volume::Sphere { center, .. } => center.clone(),
        }
    }

    /// Whether `loc` lies inside the play volume. Box bounds are inclusive.
    pub fn contains(&self, loc: &Location) -> bool {
        if loc.world != self.world() {
            return false;
        }
        match self {
            Volume::Cuboid { min, max, .. } => {
                loc.x >= min[0]
                    && loc.x <= max[0]
                    && loc.y >= min[1]
                    && loc.y <= max[1]
                    && loc.z >= min[2]
                    && loc.z <= max[2]
            }
            Volume::Sphere { center, radius, .. } => {
                loc.distance_squared(center) <= radius * radius
            }
        }
    }

    /// Where the participant drained at `index` is placed when a match starts.
    ///
    /// Boxes place players one block above the floor around the horizontal
    /// center, using a fixed offset table chosen by capacity; indices past the
    /// table reuse its last entry. Spheres use the configured spawn at the same
    /// index and fall back to the center.
    pub fn spawn_location(&self, capacity: usize, index: usize) -> Location {
        match self {
            Volume::Cuboid { world, min, max } => {
                let table: &[(f64, f64)] = if capacity == 2 {
                    &TWO_SLOT_OFFSETS
                } else {
                    &FOUR_SLOT_OFFSETS
                };
                let (dx, dz) = table[index.min(table.len() - 1)];
                let cx = (min[0] + max[0]) / 2.0;
                let cz = (min[2] + max[2]) / 2.0;
                Location::new(world.clone(), cx + dx, min[1] + 1.0, cz + dz)
            }
            Volume::Sphere { center, spawns, .. } => {
                spawns.get(index).unwrap_or(center).clone()
            }
        }
    }

    /// Every block position that belongs to the enclosure shell: the walls over
    /// the full height and the roof layer. The floor layer is never included.
    /// Positions are produced lazily, column by column.
    pub fn enclosure_positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        match self {
            Volume::Cuboid { world, min, max } => {
                let (min_x, max_x) = (min[0].floor() as i32, max[0].floor() as i32);
                let (min_y, max_y) = (min[1].floor() as i32, max[1].floor() as i32);
                let (min_z, max_z) = (min[2].floor() as i32, max[2].floor() as i32);
                shell(world, (min_x, max_x), (min_z, max_z), min_y + 1, max_y)
            }
            Volume::Sphere { center, radius, .. } => {
                let base = center.block();
                let r = radius.round() as i32;
                shell(
                    &center.world,
                    (base.x - r, base.x + r),
                    (base.z - r, base.z + r),
                    base.y + 1,
                    base.y + SPHERE_ENCLOSURE_HEIGHT,
                )
            }
        }
    }
}

/// Walls on the rectangle's border for `low_y..=roof_y`, plus the roof layer at `roof_y`
fn shell(
    world: &str,
    (min_x, max_x): (i32, i32),
    (min_z, max_z): (i32, i32),
    low_y: i32,
    roof_y: i32,
) -> impl Iterator<Item = BlockPos> + '_ {
    (min_x..=max_x)
        .filter(move |_| roof_y >= low_y)
        .flat_map(move |x| (min_z..=max_z).map(move |z| (x, z)))
        .flat_map(move |(x, z)| {
            let is_wall = x == min_x || x == max_x || z == min_z || z == max_z;
            let bottom = if is_wall { low_y } else { roof_y };
            (bottom..=roof_y).map(move |y| BlockPos::new(world, x, y, z))
        })
}
