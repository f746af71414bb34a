mod animation_assets;
mod animation_controller;
pub mod mixer;
pub mod models;
pub mod state_machine;

use bevy::prelude::*;

use crate::{asset_tracking::LoadResource, game::LocomotionSystems, screens::Screen};

pub use self::{
    mixer::{ClipMixer, ClipRegistry},
    models::{CharacterAnimationController, LocomotionState},
    state_machine::{BlendTimes, LocomotionFsm},
};

use self::{
    animation_assets::PlayerAnimations,
    animation_controller::{drive_state_machine, report_finished_clips, setup_animation_graph},
};

pub(super) fn plugin(app: &mut App) {
    // Load animation assets
    app.load_resource::<PlayerAnimations>();

    app.add_systems(
        Update,
        (
            setup_animation_graph.before(LocomotionSystems::StateMachine),
            drive_state_machine.in_set(LocomotionSystems::StateMachine),
            report_finished_clips.in_set(LocomotionSystems::Animate),
        )
            .run_if(in_state(Screen::Gameplay)),
    );
}
