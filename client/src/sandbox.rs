//! The destruction world as a Bevy resource, plus the gameplay that drives it.
//!
//! Every system that touches [`Sandbox`] runs in one chained set so the
//! world only ever sees a single writer per frame:
//! gameplay input → tick → scene mirroring (see `scene_sync`).

use std::path::Path;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use destruction::{
    BodyKind, BreakOptions, CameraView, DestructionWorld, EntryFilter, SpawnPlacement,
    StructureData, TickReport, Tunables, radial_impulse,
};
use leafwing_input_manager::prelude::*;

use crate::camera::Focus;
use crate::convert::to_na;
use crate::input::InputAction;

pub(super) fn plugin(app: &mut App) {
    app.insert_resource(Sandbox::new(load_tunables()));
    app.insert_resource(Catalog::embedded());
    app.configure_sets(
        Update,
        (SandboxSet::Gameplay, SandboxSet::Tick, SandboxSet::Mirror).chain(),
    );
    app.add_systems(
        Update,
        (spawn_structure, cycle_structure, strike, attract, clear)
            .chain()
            .in_set(SandboxSet::Gameplay),
    );
    app.add_systems(Update, tick.in_set(SandboxSet::Tick));
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SandboxSet {
    Gameplay,
    Tick,
    Mirror,
}

const STRIKE_REACH: f32 = 250.0;
const BLAST_RADIUS: f32 = 3.5;
const BLAST_FORCE: f32 = 9.0;
const BLAST_LIFT: f32 = 2.5;
const ATTRACT_MAGNITUDE: f32 = 6.0;
const GROUND_Y: f32 = 0.0;

#[derive(Resource)]
pub struct Sandbox {
    pub world: DestructionWorld,
    pub last_report: TickReport,
}

impl Sandbox {
    fn new(tunables: Tunables) -> Self {
        Self {
            world: DestructionWorld::new(tunables).with_ground(GROUND_Y),
            last_report: TickReport::default(),
        }
    }
}

/// Structures that can be spawned, in catalog order.
#[derive(Resource)]
pub struct Catalog {
    pub entries: Vec<(String, StructureData)>,
    pub selected: usize,
}

const EMBEDDED: &[(&str, &str)] = &[
    ("tower", include_str!("../assets/structures/tower.json")),
    ("arch", include_str!("../assets/structures/arch.json")),
    ("glass_cube", include_str!("../assets/structures/glass_cube.json")),
];

impl Catalog {
    fn embedded() -> Self {
        let entries = EMBEDDED
            .iter()
            .filter_map(|(name, src)| match StructureData::from_json(src) {
                Ok(data) => Some((name.to_string(), data)),
                Err(err) => {
                    warn!("skipping catalog entry {name}: {err}");
                    None
                }
            })
            .collect();
        Self {
            entries,
            selected: 0,
        }
    }

    pub fn current(&self) -> Option<&(String, StructureData)> {
        self.entries.get(self.selected)
    }
}

/// Defaults, overridden by `assets/destruction.toml` when it exists and parses.
fn load_tunables() -> Tunables {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/destruction.toml");
    let Ok(src) = std::fs::read_to_string(&path) else {
        return Tunables::default();
    };
    match Tunables::from_toml_str(&src) {
        Ok(tunables) => {
            info!("loaded tunables from {}", path.display());
            tunables
        }
        Err(err) => {
            warn!("ignoring {}: {err}", path.display());
            Tunables::default()
        }
    }
}

pub fn camera_view(transform: &GlobalTransform, projection: &Projection) -> CameraView {
    let position = to_na(transform.translation());
    match projection {
        Projection::Perspective(p) => CameraView::perspective(
            position,
            to_na(*transform.forward()),
            to_na(*transform.up()),
            p.fov,
            p.aspect_ratio,
            p.near,
            p.far,
        ),
        _ => CameraView::omnidirectional(position),
    }
}

fn tick(
    mut sandbox: ResMut<Sandbox>,
    camera: Single<(&GlobalTransform, &Projection), With<Camera3d>>,
    time: Res<Time>,
) {
    let (transform, projection) = *camera;
    let view = camera_view(transform, projection);
    let report = sandbox.world.tick(time.delta_secs(), &view);
    sandbox.last_report = report;
}

fn spawn_structure(
    actions: Res<ActionState<InputAction>>,
    catalog: Res<Catalog>,
    focus: Res<Focus>,
    camera: Single<&GlobalTransform, With<Camera3d>>,
    mut sandbox: ResMut<Sandbox>,
) {
    if !actions.just_pressed(&InputAction::Spawn) {
        return;
    }
    let Some((name, data)) = catalog.current() else {
        return;
    };
    let placement = SpawnPlacement::InFrontOf {
        position: to_na(focus.0),
        forward: to_na(*camera.forward()),
        ground_y: GROUND_Y,
    };
    if let Err(err) = sandbox.world.spawn(data, placement) {
        warn!("cannot spawn {name}: {err}");
    }
}

fn cycle_structure(actions: Res<ActionState<InputAction>>, mut catalog: ResMut<Catalog>) {
    if !actions.just_pressed(&InputAction::NextStructure) || catalog.entries.is_empty() {
        return;
    }
    catalog.selected = (catalog.selected + 1) % catalog.entries.len();
    if let Some((name, _)) = catalog.current() {
        info!("selected {name}");
    }
}

fn strike(
    actions: Res<ActionState<InputAction>>,
    window: Single<&Window, With<PrimaryWindow>>,
    camera: Single<(&Camera, &GlobalTransform), With<Camera3d>>,
    mut sandbox: ResMut<Sandbox>,
) {
    if !actions.just_pressed(&InputAction::Strike) {
        return;
    }
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let (camera, transform) = *camera;
    let Ok(ray) = camera.viewport_to_world(transform, cursor) else {
        return;
    };
    let origin = to_na(ray.origin);
    let dir = to_na(*ray.direction);
    let Some((entry, toi)) =
        sandbox
            .world
            .hit_test(origin, dir, STRIKE_REACH, EntryFilter::default())
    else {
        return;
    };

    let hit = origin + dir * toi;
    match entry.kind {
        BodyKind::StructureStatic(id) | BodyKind::StructurePart { structure: id, .. } => {
            let blast = radial_impulse(hit, BLAST_RADIUS, BLAST_FORCE, BLAST_LIFT);
            sandbox
                .world
                .break_structure(id, BreakOptions::default().impulse(blast));
        }
        BodyKind::Target(_) | BodyKind::Bust | BodyKind::Raft(_) => {
            sandbox.world.remove_entry(entry);
        }
    }
}

fn attract(
    actions: Res<ActionState<InputAction>>,
    focus: Res<Focus>,
    mut sandbox: ResMut<Sandbox>,
) {
    if actions.just_pressed(&InputAction::Attract) {
        let pulled = sandbox
            .world
            .attract_debris(to_na(focus.0 + Vec3::Y), ATTRACT_MAGNITUDE);
        info!("pulling {pulled} bodies");
    }
}

fn clear(actions: Res<ActionState<InputAction>>, mut sandbox: ResMut<Sandbox>) {
    if actions.just_pressed(&InputAction::Clear) {
        sandbox.world.clear_all();
    }
}
