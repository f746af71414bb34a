//! Development tools for the game. This plugin is only enabled in dev builds.

use avian3d::prelude::{PhysicsDebugPlugin, PhysicsGizmos};
use bevy::{
    color::palettes::css::{LIME, ORANGE_RED},
    dev_tools::states::log_transitions,
    input::common_conditions::input_just_pressed,
    prelude::*,
};

use crate::{game::obstacle_detection::LastProbe, screens::Screen};

const TOGGLE_PHYSICS_KEY: KeyCode = KeyCode::F3;

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(PhysicsDebugPlugin::default());
    app.add_systems(Startup, hide_physics_debug);

    // Log `Screen` state transitions.
    app.add_systems(
        Update,
        (
            log_transitions::<Screen>,
            toggle_physics_debug.run_if(input_just_pressed(TOGGLE_PHYSICS_KEY)),
            draw_probe.run_if(in_state(Screen::Gameplay)),
        ),
    );
}

fn hide_physics_debug(mut store: ResMut<GizmoConfigStore>) {
    store.config_mut::<PhysicsGizmos>().0.enabled = false;
}

fn toggle_physics_debug(mut store: ResMut<GizmoConfigStore>) {
    let (config, _) = store.config_mut::<PhysicsGizmos>();
    config.enabled = !config.enabled;
    info!(
        "Physics debug rendering: {}",
        if config.enabled { "ON" } else { "OFF" }
    );
}

fn draw_probe(probe: Res<LastProbe>, mut gizmos: Gizmos) {
    let Some(ray) = probe.0 else {
        return;
    };
    let color = if ray.hit { ORANGE_RED } else { LIME };
    gizmos.ray(ray.origin, *ray.direction * ray.range, color);
}
