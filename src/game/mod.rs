//! Gameplay: the character, its locomotion and the box field around it.

pub mod animations;
pub mod autopilot;
pub mod camera_controller;
pub mod configs;
pub mod interaction;
pub mod obstacle_detection;
pub mod player;
pub mod props;
pub mod scene;

use bevy::prelude::*;
use rand::{SeedableRng, rngs::StdRng};

use crate::game::configs::LocomotionConfig;

/// Seed for [`WorldRng`]; fixed so runs are reproducible
const WORLD_SEED: u64 = 0x5EED_B0C5;

pub(super) fn plugin(app: &mut App) {
    app.insert_resource(WorldRng(StdRng::seed_from_u64(WORLD_SEED)));
    app.configure_sets(
        Update,
        (
            LocomotionSystems::RecordInput,
            LocomotionSystems::StateMachine,
            LocomotionSystems::Integrate,
            LocomotionSystems::FollowCamera,
            LocomotionSystems::Probe,
            LocomotionSystems::Autopilot,
            LocomotionSystems::Animate,
        )
            .chain(),
    );

    app.add_plugins((
        configs::plugin,
        scene::plugin,
        player::plugin,
        camera_controller::plugin,
        animations::plugin,
        autopilot::plugin,
        obstacle_detection::plugin,
        props::plugin,
        interaction::plugin,
    ));
}

/// Per-tick order of the character pipeline
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSystems {
    /// Keyboard writes the input snapshot
    RecordInput,
    StateMachine,
    Integrate,
    FollowCamera,
    Probe,
    /// Writes the input snapshot for the next tick
    Autopilot,
    Animate,
}

/// Shared random source for the autopilot and the box field
#[derive(Resource)]
pub struct WorldRng(pub StdRng);

/// Frame delta clamped to the configured maximum step
pub fn tick_seconds(time: &Time, config: &LocomotionConfig) -> f32 {
    time.delta_secs().clamp(0.0, config.movement.max_step)
}
