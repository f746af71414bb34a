//! Third-person follower camera.
//!
//! The ideal camera position and look-at are expressed in the character's
//! local frame ([`CameraRig`]), moved into world space each tick and
//! approached with frame-rate independent exponential smoothing.

use bevy::prelude::*;

use crate::{
    game::{
        LocomotionSystems,
        animations::{LocomotionFsm, LocomotionState},
        configs::{CameraConfig, LocomotionConfig},
        player::Player,
        tick_seconds,
    },
    screens::Screen,
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<ScriptedCamera>();
    app.add_systems(Update, attach_camera_to_player);
    app.add_systems(
        Update,
        follow_player
            .in_set(LocomotionSystems::FollowCamera)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Camera targeting parameters carried by the character.
/// Scripted events may override them; [`CameraRig::restore`] puts the defaults back.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
pub struct CameraRig {
    pub offset: Vec3,
    pub look_at: Vec3,
    pub turn_speed: f32,
}

impl CameraRig {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            offset: config.offset,
            look_at: config.look_at,
            turn_speed: config.turn_speed,
        }
    }

    pub fn restore(&mut self, config: &CameraConfig) {
        *self = Self::from_config(config);
    }
}

/// Smoothed camera state, lives on the camera entity
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
pub struct FollowCamera {
    pub position: Vec3,
    pub look_at: Vec3,
    initialized: bool,
}

impl FollowCamera {
    /// Moves the smoothed state toward the ideal pose by factor `t`
    pub fn approach(&mut self, ideal_position: Vec3, ideal_look_at: Vec3, t: f32) {
        if !self.initialized {
            self.position = ideal_position;
            self.look_at = ideal_look_at;
            self.initialized = true;
            return;
        }
        self.position = self.position.lerp(ideal_position, t);
        self.look_at = self.look_at.lerp(ideal_look_at, t);
    }

    /// Takes over wherever a scripted camera left things
    pub fn resume_from(&mut self, position: Vec3, look_at: Vec3) {
        self.position = position;
        self.look_at = look_at;
        self.initialized = true;
    }
}

/// Set while a scripted camera animation owns the camera; the follower stands down
#[derive(Resource, Debug, Default)]
pub struct ScriptedCamera {
    pub active: bool,
}

/// Ideal camera position in world space
pub fn ideal_offset(
    rig: &CameraRig,
    state: LocomotionState,
    transform: &Transform,
    config: &CameraConfig,
) -> Vec3 {
    let mut offset = rig.offset;
    if state.is_walking() {
        offset.z = config.walk_offset_z;
    } else if state == LocomotionState::RunBackward {
        offset.z = config.run_backward_offset_z;
    }
    transform.rotation * offset + transform.translation
}

/// Ideal look-at point in world space
pub fn ideal_look_at(rig: &CameraRig, transform: &Transform) -> Vec3 {
    transform.rotation * rig.look_at + transform.translation
}

/// `1 − 0.001^(dt · turn_speed)`, the same decay per second at any frame rate
pub fn smoothing_factor(dt: f32, turn_speed: f32) -> f32 {
    1.0 - 0.001_f32.powf(dt * turn_speed)
}

/// Attach the follower to the main camera once the player exists
fn attach_camera_to_player(
    mut commands: Commands,
    player_query: Query<(), With<Player>>,
    camera_query: Query<Entity, (With<Camera3d>, Without<FollowCamera>)>,
) {
    if player_query.is_empty() {
        return;
    }
    let Ok(camera_entity) = camera_query.single() else {
        return;
    };

    let fov: f32 = 60.0;
    commands.entity(camera_entity).insert((
        FollowCamera::default(),
        Projection::from(PerspectiveProjection {
            fov: fov.to_radians(),
            far: 4000.0,
            ..default()
        }),
        DistanceFog {
            color: Color::srgb(0.63, 0.63, 0.63),
            falloff: FogFalloff::Linear {
                start: 300.0,
                end: 1500.0,
            },
            ..default()
        },
    ));
    info!("Follower camera attached to player");
}

fn follow_player(
    time: Res<Time>,
    config: Res<LocomotionConfig>,
    scripted: Res<ScriptedCamera>,
    player_query: Query<(&Transform, &CameraRig, &LocomotionFsm), With<Player>>,
    mut camera_query: Query<(&mut Transform, &mut FollowCamera), Without<Player>>,
) {
    if scripted.active {
        return;
    }
    let Ok((player_transform, rig, fsm)) = player_query.single() else {
        return;
    };
    let Some(state) = fsm.state() else {
        return;
    };
    let Ok((mut camera_transform, mut follow)) = camera_query.single_mut() else {
        return;
    };

    let dt = tick_seconds(&time, &config);
    let position = ideal_offset(rig, state, player_transform, &config.camera);
    let look_at = ideal_look_at(rig, player_transform);
    follow.approach(position, look_at, smoothing_factor(dt, rig.turn_speed));

    camera_transform.translation = follow.position;
    camera_transform.look_at(follow.look_at, Vec3::Y);
}
