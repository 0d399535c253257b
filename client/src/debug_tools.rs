//! Debug/performance tooling for native dev builds.
//!
//! Besides the perf overlay this shows a line of destruction counters: live
//! structures, fragments, queued fragmentation tasks, pending impulses and
//! the last tick's lifecycle report.

use bevy::diagnostic::{
    EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin, SystemInformationDiagnosticsPlugin,
};
use bevy::prelude::*;
use bevy::render::diagnostic::RenderDiagnosticsPlugin;
use iyes_perf_ui::prelude::*;

use crate::sandbox::{Catalog, Sandbox, SandboxSet};

pub(super) fn plugin(app: &mut App) {
    app.add_plugins((
        FrameTimeDiagnosticsPlugin::default(),
        EntityCountDiagnosticsPlugin::default(),
        SystemInformationDiagnosticsPlugin::default(),
        RenderDiagnosticsPlugin,
        PerfUiPlugin,
    ));

    app.add_systems(Startup, (spawn_perf_ui, spawn_stats));
    app.add_systems(Update, update_stats.after(SandboxSet::Tick));
}

#[derive(Component)]
struct DestructionStats;

fn spawn_perf_ui(mut commands: Commands) {
    commands.spawn(PerfUiAllEntries::default());
}

fn spawn_stats(mut commands: Commands) {
    commands.spawn((
        DestructionStats,
        Text::new(""),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        },
    ));
}

fn update_stats(
    sandbox: Res<Sandbox>,
    catalog: Res<Catalog>,
    mut text: Single<&mut Text, With<DestructionStats>>,
) {
    let world = &sandbox.world;
    let fragments: usize = world.structures().iter().map(|s| s.fragments.len()).sum();
    let report = &sandbox.last_report;
    let selected = catalog.current().map(|(name, _)| name.as_str()).unwrap_or("-");
    text.0 = format!(
        "[{selected}] structures {} | fragments {fragments} | tasks {} | impulses {} | \
         culled {} demoted {} despawned {}",
        world.structures().len(),
        world.fragmentation().len(),
        world.impulses().len(),
        report.lifecycle.visibility_toggles,
        report.lifecycle.demoted,
        report.lifecycle.despawned,
    );
}
