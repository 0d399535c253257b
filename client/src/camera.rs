use bevy::{
    camera::Exposure,
    pbr::{AtmosphereMode, AtmosphereSettings},
    prelude::*,
};
use leafwing_input_manager::prelude::*;

use crate::input::InputAction;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<Focus>();
    app.add_systems(Startup, add_camera);
    app.add_systems(Update, move_focus);
    app.add_systems(PostUpdate, follow_focus);
}

const CAMERA_OFFSET_GLOBAL: Vec3 = Vec3::new(0.0, 9.0, 16.0);
const CAMERA_DECAY_RATE: f32 = 12.0;
const FOCUS_SPEED: f32 = 14.0;

/// The ground point the camera orbits; stands in for the player.
#[derive(Resource, Default)]
pub struct Focus(pub Vec3);

fn add_camera(mut commands: Commands) {
    commands.spawn((
        Exposure { ev100: 16.0 },
        bevy::core_pipeline::tonemapping::Tonemapping::AcesFitted,
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            far: 400.0,
            ..default()
        }),
        Transform::from_translation(CAMERA_OFFSET_GLOBAL).looking_at(Vec3::ZERO, Vec3::Y),
        DistanceFog {
            color: Color::srgba(0.35, 0.48, 0.66, 1.0),
            directional_light_color: Color::srgba(1.0, 0.95, 0.85, 0.5),
            directional_light_exponent: 30.0,
            falloff: FogFalloff::from_visibility_colors(
                300.0,
                Color::srgb(0.35, 0.5, 0.66),
                Color::srgb(0.8, 0.8, 0.7),
            ),
        },
        AtmosphereSettings {
            rendering_method: AtmosphereMode::Raymarched,
            ..default()
        },
    ));
}

fn move_focus(
    actions: Res<ActionState<InputAction>>,
    camera: Single<&Transform, With<Camera3d>>,
    mut focus: ResMut<Focus>,
    time: Res<Time>,
) {
    let axis = actions.axis_pair(&InputAction::Move);
    if axis == Vec2::ZERO {
        return;
    }
    let forward = camera.forward().with_y(0.0).normalize_or_zero();
    let right = camera.right().with_y(0.0).normalize_or_zero();
    let step = (right * axis.x + forward * axis.y).normalize_or_zero();
    focus.0 += step * FOCUS_SPEED * time.delta_secs();
}

fn follow_focus(
    mut camera: Single<&mut Transform, With<Camera3d>>,
    focus: Res<Focus>,
    time: Res<Time>,
) {
    let target = focus.0 + CAMERA_OFFSET_GLOBAL;
    camera
        .translation
        .smooth_nudge(&target, CAMERA_DECAY_RATE, time.delta_secs());
}
