use std::f32::consts::PI;

use bevy::prelude::*;

use crate::game::{
    animations::{LocomotionFsm, LocomotionState},
    configs::{LocomotionConfig, MovementConfig},
    tick_seconds,
};

use super::{InputSnapshot, Player};

/// Persisted local-frame velocity: `x` strafes, `z` moves along the facing
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
pub struct Kinematics {
    pub velocity: Vec3,
}

/// Advances velocity, yaw and position by one tick.
///
/// Local forward is `+Z`; positive yaw turns left.
pub fn integrate(
    transform: &mut Transform,
    kinematics: &mut Kinematics,
    input: &InputSnapshot,
    state: LocomotionState,
    dt: f32,
    config: &MovementConfig,
) {
    let velocity = &mut kinematics.velocity;

    let mut decay = *velocity * config.deceleration * dt;
    decay.z = decay.z.signum() * decay.z.abs().min(velocity.z.abs());
    *velocity += decay;

    let mut acceleration = config.acceleration;
    if input.sprint {
        acceleration *= config.sprint_multiplier;
    }
    if state == LocomotionState::Interact {
        acceleration = Vec3::ZERO;
    }

    if input.forward {
        velocity.z += acceleration.z * dt;
    }
    if input.backward {
        velocity.z -= acceleration.z * dt;
    }

    // Turning uses the unboosted rate so sprinting does not spin faster
    let turn_factor = if state == LocomotionState::Interact {
        0.0
    } else {
        config.acceleration.y
    };
    let rate = if input.forward || input.backward {
        config.turn_while_moving_rate
    } else {
        config.turn_in_place_rate
    };
    let mut yaw = 0.0;
    if input.left {
        yaw += rate * PI * dt * turn_factor;
    }
    if input.right {
        yaw -= rate * PI * dt * turn_factor;
    }
    if yaw != 0.0 {
        transform.rotation *= Quat::from_rotation_y(yaw);
    }

    let forward = transform.rotation * Vec3::Z;
    let sideways = transform.rotation * Vec3::X;
    transform.translation += (forward * velocity.z + sideways * velocity.x) * dt;
}

pub fn move_player(
    time: Res<Time>,
    config: Res<LocomotionConfig>,
    mut query: Query<
        (&mut Transform, &mut Kinematics, &InputSnapshot, &LocomotionFsm),
        With<Player>,
    >,
) {
    let dt = tick_seconds(&time, &config);
    for (mut transform, mut kinematics, input, fsm) in query.iter_mut() {
        // Nothing moves until the clips are in and the machine has a state
        let Some(state) = fsm.state() else {
            continue;
        };
        integrate(&mut transform, &mut kinematics, input, state, dt, &config.movement);
    }
}

/// Yaw of a transform around `+Y`, with zero facing `+Z`
pub fn yaw_of(transform: &Transform) -> f32 {
    let forward = transform.rotation * Vec3::Z;
    forward.x.atan2(forward.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward() -> InputSnapshot {
        InputSnapshot {
            forward: true,
            ..default()
        }
    }

    #[test]
    fn test_first_forward_tick_is_deterministic() {
        let mut transform = Transform::IDENTITY;
        let mut kinematics = Kinematics::default();
        integrate(
            &mut transform,
            &mut kinematics,
            &forward(),
            LocomotionState::WalkForward,
            0.1,
            &MovementConfig::default(),
        );

        assert!((kinematics.velocity.z - 15.0).abs() < 1e-4);
        assert!((transform.translation.z - 1.5).abs() < 1e-4);
        assert!(transform.translation.x.abs() < 1e-6);
    }

    #[test]
    fn test_sprint_doubles_acceleration() {
        let mut transform = Transform::IDENTITY;
        let mut kinematics = Kinematics::default();
        let input = InputSnapshot {
            forward: true,
            sprint: true,
            ..default()
        };
        integrate(
            &mut transform,
            &mut kinematics,
            &input,
            LocomotionState::RunForward,
            0.1,
            &MovementConfig::default(),
        );
        assert!((kinematics.velocity.z - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_interact_does_not_drift() {
        let mut transform = Transform::IDENTITY;
        let mut kinematics = Kinematics::default();
        let input = InputSnapshot {
            forward: true,
            left: true,
            ..default()
        };
        integrate(
            &mut transform,
            &mut kinematics,
            &input,
            LocomotionState::Interact,
            0.1,
            &MovementConfig::default(),
        );
        assert_eq!(kinematics.velocity, Vec3::ZERO);
        assert_eq!(transform, Transform::IDENTITY);
    }

    #[test]
    fn test_damping_never_reverses_velocity() {
        let mut transform = Transform::IDENTITY;
        let mut kinematics = Kinematics {
            velocity: Vec3::new(0.0, 0.0, 2.0),
        };
        // A huge step would overshoot past zero without the clamp
        integrate(
            &mut transform,
            &mut kinematics,
            &InputSnapshot::default(),
            LocomotionState::Idle,
            1.0,
            &MovementConfig::default(),
        );
        assert_eq!(kinematics.velocity.z, 0.0);
    }

    #[test]
    fn test_velocity_decays_without_input() {
        let mut transform = Transform::IDENTITY;
        let mut kinematics = Kinematics {
            velocity: Vec3::new(0.0, 0.0, 30.0),
        };
        let mut last = kinematics.velocity.z;
        for _ in 0..10 {
            integrate(
                &mut transform,
                &mut kinematics,
                &InputSnapshot::default(),
                LocomotionState::Idle,
                1.0 / 60.0,
                &MovementConfig::default(),
            );
            assert!(kinematics.velocity.z < last);
            assert!(kinematics.velocity.z > 0.0);
            last = kinematics.velocity.z;
        }
    }

    #[test]
    fn test_turning_twice_as_fast_while_moving() {
        let config = MovementConfig::default();
        let dt = 0.1;

        let mut standing = Transform::IDENTITY;
        integrate(
            &mut standing,
            &mut Kinematics::default(),
            &InputSnapshot {
                left: true,
                ..default()
            },
            LocomotionState::TurnLeft,
            dt,
            &config,
        );

        let mut walking = Transform::IDENTITY;
        integrate(
            &mut walking,
            &mut Kinematics::default(),
            &InputSnapshot {
                left: true,
                forward: true,
                ..default()
            },
            LocomotionState::WalkForward,
            dt,
            &config,
        );

        let standing_yaw = yaw_of(&standing);
        let walking_yaw = yaw_of(&walking);
        assert!((standing_yaw - 2.0 * PI * dt * 0.25).abs() < 1e-5);
        assert!((walking_yaw - 2.0 * standing_yaw).abs() < 1e-5);
    }

    #[test]
    fn test_right_turn_is_negative_yaw() {
        let mut transform = Transform::IDENTITY;
        integrate(
            &mut transform,
            &mut Kinematics::default(),
            &InputSnapshot {
                right: true,
                ..default()
            },
            LocomotionState::TurnRight,
            0.1,
            &MovementConfig::default(),
        );
        assert!(yaw_of(&transform) < 0.0);
    }

    #[test]
    fn test_moves_along_facing() {
        let mut transform = Transform::from_rotation(Quat::from_rotation_y(PI / 2.0));
        let mut kinematics = Kinematics::default();
        integrate(
            &mut transform,
            &mut kinematics,
            &forward(),
            LocomotionState::WalkForward,
            0.1,
            &MovementConfig::default(),
        );
        assert!((transform.translation.x - 1.5).abs() < 1e-4);
        assert!(transform.translation.z.abs() < 1e-4);
    }
}
