use std::time::Duration;

/// Cells per axis in one render/culling chunk.
///
/// Chunk keys are `floor(coord / CHUNK_SIZE)` per axis, so negative grid
/// coordinates land in negative chunks rather than folding into chunk 0.
pub const CHUNK_SIZE: i32 = 8;

/// Largest absolute grid coordinate a block may have on any axis.
pub const MAX_GRID_COORD: i32 = 1 << 20;

/// Static chunks farther than this from the camera (meters, measured to the
/// bounding-sphere surface) are hidden.
pub const CULL_DISTANCE: f32 = 120.0;

/// How long a fragment stays fully simulated before it may be demoted.
pub const FRAGMENT_ACTIVE_DURATION: Duration = Duration::from_millis(6500);

/// Minimum camera distance (meters) for an old fragment to be put to sleep.
pub const SLEEP_DISTANCE: f32 = 62.0;

/// Fragments farther than this from the camera (meters) are despawned.
pub const REMOVE_DISTANCE: f32 = 220.0;

/// Fragments above this world height (meters) are despawned.
pub const REMOVE_HEIGHT: f32 = 140.0;

/// Hard age limit for a fragment, whatever its dynamic state.
///
/// A 3 s limit would remove debris long before it can go passive. Must
/// exceed [`FRAGMENT_ACTIVE_DURATION`] or fragments never reach the
/// passive stage.
pub const REMOVE_TIMEOUT: Duration = Duration::from_secs(12);

/// Entries materialized per frame across all fragmentation tasks.
pub const BREAK_BATCH_SIZE: usize = 40;

/// Wall-clock budget for fragmentation work in a single frame.
pub const BREAK_TIME_BUDGET: Duration = Duration::from_micros(4200);

/// Pending attraction impulses applied per frame.
pub const IMPULSE_BATCH_PER_FRAME: usize = 24;

/// Maximum number of bodies with a pending attraction impulse.
pub const IMPULSE_MAX_QUEUE: usize = 4096;

/// Largest impulse magnitude ever applied to a body.
pub const MAX_IMPULSE_MAGNITUDE: f32 = 120.0;

/// Largest delay a scheduled impulse may carry.
pub const MAX_IMPULSE_DELAY: Duration = Duration::from_millis(20);

/// Fragment mass is `max(FRAGMENT_MIN_MASS, cell_size * FRAGMENT_MASS_PER_CELL)`.
pub const FRAGMENT_MIN_MASS: f32 = 0.4;
pub const FRAGMENT_MASS_PER_CELL: f32 = 0.5;

pub const FRAGMENT_LINEAR_DAMPING: f32 = 0.08;
pub const FRAGMENT_ANGULAR_DAMPING: f32 = 0.06;

/// Largest physics step; long frames are clamped rather than sub-stepped.
pub const MAX_PHYSICS_DT: f32 = 1.0 / 30.0;

/// Gravity along -Y (m/s^2).
pub const GRAVITY_MPS2: f32 = 9.82;

/// Extra radius added to a chunk bounding sphere, as a fraction of the cell size.
pub const CHUNK_RADIUS_PADDING: f32 = 0.75;

/// Distance in front of the player at which a structure is placed, before
/// accounting for its footprint.
pub const SPAWN_BASE_DISTANCE: f32 = 1.6;
