use std::cell::Cell;
use std::time::Duration;

use destruction::physics::DebrisBody;
use destruction::{
    BlockData, BodyKind, BreakOptions, CameraView, CollisionLayers, DestructionWorld,
    DynamicState, EntryFilter, ImpulseSpec, SpawnError, SpawnPlacement, StructureData,
    StructureId, StructureState, Tunables, Vec3, radial_impulse,
};
use rapier3d::prelude::RigidBodyType;

const EPS: f32 = 1.0e-3;

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).norm() < EPS
}

fn tunables() -> Tunables {
    Tunables {
        gravity: 0.0,
        break_time_budget: Duration::from_secs(60),
        ..Tunables::default()
    }
}

fn origin_camera() -> CameraView {
    CameraView::omnidirectional(Vec3::zeros())
}

fn row(n: i32) -> StructureData {
    StructureData::from_blocks(
        1.0,
        (0..n).map(|x| BlockData::new(x, 0, 0, "#7f7f7f")).collect(),
    )
}

fn spawn_at(world: &mut DestructionWorld, data: &StructureData, at: Vec3) -> StructureId {
    world.spawn(data, SpawnPlacement::At(at)).unwrap()
}

#[test]
fn two_block_row_breaks_in_one_frame() {
    let mut world = DestructionWorld::new(tunables());
    let id = spawn_at(&mut world, &row(2), Vec3::new(0.0, 1.0, -4.0));

    let structure = world.structure(id).unwrap();
    let static_body = structure.static_body.unwrap();
    let expected: Vec<Vec3> = structure.blocks.iter().map(|b| b.world_position).collect();
    let colliders = world.physics().bodies[static_body].colliders().to_vec();
    assert_eq!(colliders.len(), 1);
    let cuboid = world.physics().colliders[colliders[0]]
        .shape()
        .as_cuboid()
        .unwrap();
    assert!((cuboid.half_extents.x - 1.0).abs() < EPS);

    world.break_structure(id, BreakOptions::default());
    let report = world.tick(1.0 / 60.0, &origin_camera());
    assert_eq!(report.fragmentation.completed, vec![id]);

    let structure = world.structure(id).unwrap();
    assert_eq!(structure.state, StructureState::Fragments);
    assert!(!world.physics().is_alive(static_body));
    assert_eq!(structure.fragments.len(), 2);
    for (fragment, want) in structure.fragments.iter().zip(&expected) {
        assert!(world.physics().is_dynamic(fragment.body));
        assert!(close(world.physics().translation(fragment.body).unwrap(), *want));
    }
}

#[test]
fn second_break_keeps_fragment_count() {
    let mut world = DestructionWorld::new(tunables());
    let id = spawn_at(&mut world, &row(6), Vec3::zeros());
    world.break_structure(id, BreakOptions::default());
    world.tick(1.0 / 60.0, &origin_camera());

    let again = world
        .break_structure(id, BreakOptions::default())
        .map(<[_]>::len);
    assert_eq!(again, Some(6));
    assert!(world.fragmentation().is_empty());
    world.tick(1.0 / 60.0, &origin_camera());
    assert_eq!(world.structure(id).unwrap().fragments.len(), 6);
}

#[test]
fn batch_cap_takes_ceil_k_over_b_frames() {
    let mut world = DestructionWorld::new(Tunables {
        break_batch_size: 5,
        ..tunables()
    });
    let data = StructureData::from_blocks(
        1.0,
        (0..23)
            .map(|i| BlockData::new(i % 6, i / 6, 0, "#445566"))
            .collect(),
    );
    let id = spawn_at(&mut world, &data, Vec3::zeros());
    world.break_structure(id, BreakOptions::default());

    let mut frames = 0;
    while world.structure(id).unwrap().state != StructureState::Fragments {
        world.tick(1.0 / 60.0, &origin_camera());
        frames += 1;
        assert!(frames <= 10, "fragmentation stalled");
    }
    assert_eq!(frames, 5);
    assert_eq!(world.structure(id).unwrap().fragments.len(), 23);
}

#[test]
fn hard_timeout_removes_everything() {
    let mut world = DestructionWorld::new(tunables());
    let id = spawn_at(&mut world, &row(4), Vec3::new(0.0, 0.0, -3.0));
    world.break_structure(id, BreakOptions::default());
    world.tick(1.0 / 60.0, &origin_camera());
    assert_eq!(world.physics().body_count(), 4);

    let report = world.tick(13.0, &origin_camera());
    assert_eq!(report.lifecycle.despawned, 4);
    assert_eq!(report.lifecycle.disposed, 1);
    assert!(world.structure(id).is_none());
    assert_eq!(world.physics().body_count(), 0);
    assert_eq!(world.scene().mesh_count(), 0);
}

#[test]
fn catalog_json_batches_cover_every_block() {
    let src = r##"{
        "name": "arch",
        "blockSize": 0.5,
        "blocks": [
            { "x": 0, "y": 0, "z": 0, "color": "#aa0000" },
            { "x": 0, "y": 1, "z": 0, "color": "#aa0000" },
            { "x": 0, "y": 2, "z": 0, "color": "#00aa00" },
            { "x": 1, "y": 2, "z": 0, "color": "#00aa00", "opacity": 0.4 },
            { "x": 2, "y": 2, "z": 0 },
            { "x": 2, "y": 1, "z": 0, "color": "#aa0000" },
            { "x": 2, "y": 0, "z": 0, "color": "#aa0000" },
            { "x": 9, "y": 0, "z": 9, "color": "#0000aa" }
        ]
    }"##;
    let data = StructureData::from_json(src).unwrap();
    let mut world = DestructionWorld::new(tunables());
    let id = spawn_at(&mut world, &data, Vec3::zeros());

    let structure = world.structure(id).unwrap();
    assert_eq!(structure.name.as_deref(), Some("arch"));
    assert_eq!(structure.batched_block_count(), 8);
    let instances: usize = structure
        .chunks
        .iter()
        .flat_map(|c| &c.batches)
        .filter_map(|b| world.scene().mesh(b.mesh))
        .map(|m| m.instance_count())
        .sum();
    assert_eq!(instances, 8);
}

#[test]
fn empty_catalog_entry_is_rejected() {
    let mut world = DestructionWorld::new(tunables());
    let data = StructureData::from_json(r#"{ "blocks": [] }"#).unwrap();
    let err = world.spawn(&data, SpawnPlacement::At(Vec3::zeros()));
    assert!(matches!(err, Err(SpawnError::NoBlocks)));
    assert!(world.structures().is_empty());
    assert_eq!(world.physics().body_count(), 0);
}

#[test]
fn repeated_pulls_apply_the_strongest_once() {
    let mut world = DestructionWorld::new(tunables());
    let body = world.physics_mut().add_debris(DebrisBody {
        position: Vec3::zeros(),
        half_extent: 0.5,
        mass: 1.0,
        linear_damping: 0.0,
        angular_damping: 0.0,
    });
    assert!(world.register_body(body, BodyKind::Target(7)));
    world.tick(1.0 / 60.0, &origin_camera());

    let p = Vec3::new(0.0, 0.0, 30.0);
    world.impulses_mut().queue(body, 10.0, p);
    world.impulses_mut().queue(body, 25.0, p);
    assert_eq!(world.impulses().len(), 1);

    let report = world.tick(1.0 / 60.0, &origin_camera());
    assert_eq!(report.batched_impulses, 1);
    let v = world.physics().linvel(body).unwrap();
    assert!(close(v, Vec3::new(0.0, 0.0, 25.0)), "got {v:?}");
}

#[test]
fn disposal_cancels_a_queued_task() {
    let mut world = DestructionWorld::new(Tunables {
        break_batch_size: 1,
        ..tunables()
    });
    let id = spawn_at(&mut world, &row(5), Vec3::zeros());
    world.break_structure(id, BreakOptions::default());
    world.tick(1.0 / 60.0, &origin_camera());
    assert_eq!(world.structure(id).unwrap().fragments.len(), 1);
    assert!(world.fragmentation().is_queued(id));

    assert!(world.dispose_structure(id));
    assert!(!world.dispose_structure(id));
    assert!(world.fragmentation().is_empty());
    assert_eq!(world.physics().body_count(), 0);
    assert_eq!(world.scene().mesh_count(), 0);

    let report = world.tick(1.0 / 60.0, &origin_camera());
    assert_eq!(report.fragmentation.processed, 0);
}

#[test]
fn chunks_behind_the_camera_are_hidden() {
    let mut world = DestructionWorld::new(tunables());
    // two chunks: one ahead (-z), one behind (+z)
    let data = StructureData::from_blocks(
        1.0,
        vec![
            BlockData::new(0, 0, -20, "#ffffff"),
            BlockData::new(0, 0, 20, "#ffffff"),
        ],
    );
    let id = spawn_at(&mut world, &data, Vec3::zeros());
    let camera = CameraView::perspective(
        Vec3::new(0.0, 1.0, 0.0),
        -Vec3::z(),
        Vec3::y(),
        std::f32::consts::FRAC_PI_3,
        16.0 / 9.0,
        0.1,
        1000.0,
    );

    let first = world.tick(1.0 / 60.0, &camera);
    assert_eq!(first.lifecycle.visibility_toggles, 1);
    let second = world.tick(1.0 / 60.0, &camera);
    assert_eq!(second.lifecycle.visibility_toggles, 0);

    let structure = world.structure(id).unwrap();
    for chunk in &structure.chunks {
        let ahead = chunk.centroid.z < 0.0;
        assert_eq!(chunk.visible, ahead);
        for batch in &chunk.batches {
            assert_eq!(world.scene().mesh(batch.mesh).unwrap().visible, ahead);
        }
    }
}

#[test]
fn only_old_and_distant_debris_goes_passive() {
    let mut world = DestructionWorld::new(tunables());
    let id = spawn_at(&mut world, &row(1), Vec3::new(0.0, 0.0, -100.0));
    world.break_structure(id, BreakOptions::default());
    world.tick(1.0 / 60.0, &origin_camera());
    let body = world.structure(id).unwrap().fragments[0].body;

    let nearby = CameraView::omnidirectional(Vec3::new(0.0, 0.0, -90.0));
    let report = world.tick(7.0, &nearby);
    assert_eq!(report.lifecycle.demoted, 0);
    assert_eq!(
        world.structure(id).unwrap().fragments[0].state,
        DynamicState::Active
    );

    let report = world.tick(1.0 / 60.0, &origin_camera());
    assert_eq!(report.lifecycle.demoted, 1);
    assert_eq!(
        world.structure(id).unwrap().fragments[0].state,
        DynamicState::Passive
    );
    assert_eq!(
        world.physics().body_type(body),
        Some(RigidBodyType::KinematicPositionBased)
    );
    let groups = world.physics().collision_groups(body).unwrap();
    assert_eq!(groups.memberships, CollisionLayers::DEBRIS);
    assert_eq!(groups.filter, CollisionLayers::GROUND | CollisionLayers::PLAYER);
}

#[test]
fn failing_impulse_callback_still_fragments_everything() {
    let mut world = DestructionWorld::new(tunables());
    let id = spawn_at(&mut world, &row(6), Vec3::zeros());
    let calls = Cell::new(0);

    world.break_structure(
        id,
        BreakOptions::default().impulse(|entry| {
            calls.set(calls.get() + 1);
            if entry.coord.x == 2 {
                anyhow::bail!("refusing block {:?}", entry.coord);
            }
            Ok(Some(ImpulseSpec {
                vector: Vec3::new(0.0, 5.0, 0.0),
                point: None,
                delay: None,
            }))
        }),
    );
    assert_eq!(calls.get(), 6);

    let report = world.tick(1.0 / 60.0, &origin_camera());
    assert_eq!(report.fragmentation.processed, 6);
    assert_eq!(world.structure(id).unwrap().fragments.len(), 6);

    // impulses due "now" land on the next frame's delayed pass
    let report = world.tick(1.0 / 60.0, &origin_camera());
    assert_eq!(report.delayed_impulses, 5);
}

#[test]
fn radial_blast_pushes_parts_outward() {
    let mut world = DestructionWorld::new(tunables());
    let id = spawn_at(&mut world, &row(5), Vec3::zeros());
    world.break_structure(id, BreakOptions::default().impulse(radial_impulse(
        Vec3::new(0.0, 0.5, 0.0),
        4.0,
        20.0,
        0.0,
    )));
    world.tick(1.0 / 60.0, &origin_camera());
    world.tick(1.0 / 60.0, &origin_camera());

    let structure = world.structure(id).unwrap();
    for fragment in &structure.fragments {
        let x = structure.blocks[fragment.entry].world_position.x;
        let v = world.physics().linvel(fragment.body).unwrap();
        if x.abs() < 0.01 {
            continue;
        }
        assert_eq!(v.x.signum(), x.signum(), "block at {x} moved {v:?}");
    }
}

#[test]
fn clear_all_leaves_an_empty_world() {
    let mut world = DestructionWorld::new(tunables());
    let a = spawn_at(&mut world, &row(3), Vec3::new(-10.0, 0.0, 0.0));
    spawn_at(&mut world, &row(3), Vec3::new(10.0, 0.0, 0.0));
    world.break_structure(a, BreakOptions::default());
    world.tick(1.0 / 60.0, &origin_camera());
    world.attract_debris(Vec3::new(0.0, 0.0, 5.0), 10.0);
    assert!(!world.impulses().is_empty());

    assert_eq!(world.clear_all(), 2);
    assert!(world.structures().is_empty());
    assert!(world.impulses().is_empty());
    assert!(world.fragmentation().is_empty());
    assert_eq!(world.physics().body_count(), 0);
    assert_eq!(world.scene().mesh_count(), 0);
    assert!(world.collidable_entries(EntryFilter::all()).is_empty());
}

#[test]
fn hits_resolve_to_their_owners() {
    let mut world = DestructionWorld::new(tunables()).with_ground(0.0);
    let id = spawn_at(&mut world, &row(1), Vec3::new(0.0, 0.0, -10.0));
    let bust = world.physics_mut().add_debris(DebrisBody {
        position: Vec3::new(5.0, 0.5, 0.0),
        half_extent: 0.5,
        mass: 1.0,
        linear_damping: 0.0,
        angular_damping: 0.0,
    });
    assert!(world.register_body(bust, BodyKind::Bust));
    world.tick(1.0 / 60.0, &origin_camera());

    let (entry, toi) = world
        .hit_test(
            Vec3::new(0.0, 0.5, 0.0),
            -Vec3::z(),
            100.0,
            EntryFilter::default(),
        )
        .unwrap();
    assert_eq!(entry.kind, BodyKind::StructureStatic(id));
    assert!((toi - 9.5).abs() < EPS);

    let no_bust = EntryFilter {
        include_bust: false,
        include_rafts: false,
    };
    assert!(world.resolve_body(bust, EntryFilter::default()).is_some());
    assert!(world.resolve_body(bust, no_bust).is_none());
    assert_eq!(world.collidable_entries(no_bust).len(), 1);
    assert_eq!(world.collidable_entries(EntryFilter::default()).len(), 2);

    let static_body = world.structure(id).unwrap().static_body.unwrap();
    let collider = world.physics().bodies[static_body].colliders()[0];
    assert_eq!(
        world
            .resolve_collider(collider, EntryFilter::default())
            .map(|e| e.kind),
        Some(BodyKind::StructureStatic(id))
    );

    // structure bodies stay owned by their structure
    assert!(!world.register_body(static_body, BodyKind::Target(1)));
    assert!(!world.register_body(bust, BodyKind::StructureStatic(id)));
    assert_eq!(world.unregister_body(static_body), None);
    assert_eq!(world.unregister_body(bust), Some(BodyKind::Bust));
    assert!(world.resolve_body(bust, EntryFilter::all()).is_none());

    world.break_structure(id, BreakOptions::default());
    world.tick(1.0 / 60.0, &origin_camera());
    let part = world.structure(id).unwrap().fragments[0].clone();
    let resolved = world.resolve_body(part.body, EntryFilter::default()).unwrap();
    assert_eq!(
        resolved.kind,
        BodyKind::StructurePart {
            structure: id,
            fragment: part.id
        }
    );

    // removing the last part takes the structure with it
    assert!(world.remove_entry(resolved));
    assert!(world.structure(id).is_none());
    assert!(world.resolve_body(part.body, EntryFilter::all()).is_none());
}
