mod assets;
mod input;
mod movement;

use crate::{
    asset_tracking::LoadResource,
    game::{
        LocomotionSystems,
        animations::{BlendTimes, LocomotionFsm},
        autopilot::Autopilot,
        camera_controller::CameraRig,
        configs::LocomotionConfig,
    },
    screens::Screen,
};
use bevy::prelude::*;

pub use assets::PlayerAssets;
pub use input::{InputDriver, InputSnapshot};
pub use movement::{Kinematics, integrate, yaw_of};

// Player marker component
#[derive(Component)]
pub struct Player;

// Player spawn command
pub struct SpawnPlayer {
    pub position: Vec3,
}

impl Command for SpawnPlayer {
    fn apply(self, world: &mut World) {
        let _ = world.run_system_cached_with(spawn_player, self);
    }
}

fn spawn_player(
    In(spawn_config): In<SpawnPlayer>,
    mut commands: Commands,
    player_assets: Res<PlayerAssets>,
    config: Res<LocomotionConfig>,
) {
    let movement = &config.movement;
    commands
        .spawn((
            Name::new("Player"),
            Player,
            DespawnOnExit(Screen::Gameplay), // Cleanup when leaving Gameplay screen
            Transform::from_translation(spawn_config.position),
            Visibility::Visible,
        ))
        .insert((
            // The autopilot drives until someone touches the keyboard
            InputSnapshot::default(),
            InputDriver::Autopilot,
            Kinematics::default(),
            LocomotionFsm::new(BlendTimes {
                locomotion: movement.locomotion_blend,
                interact: movement.interact_blend,
            }),
            CameraRig::from_config(&config.camera),
            Autopilot::starting_in(config.autopilot.initial_delay),
        ))
        .with_children(|parent| {
            parent.spawn((
                SceneRoot(player_assets.character_model.clone()),
                Transform::from_scale(Vec3::splat(movement.model_scale)),
            ));
        });
    info!("Spawned player at {}", spawn_config.position);
}

pub(super) fn plugin(app: &mut App) {
    app.load_resource::<PlayerAssets>();

    app.add_systems(
        Update,
        (
            input::record_player_input.in_set(LocomotionSystems::RecordInput),
            movement::move_player.in_set(LocomotionSystems::Integrate),
        )
            .run_if(in_state(Screen::Gameplay)),
    );
}
