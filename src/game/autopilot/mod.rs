//! Scripted driver that walks the character between random destinations.
//!
//! The autopilot writes the same [`InputSnapshot`] a human would. Any held key
//! hands control back to the human and cancels everything the autopilot has
//! queued; after a stretch of idleness it picks a new destination on its own.

mod schedule;

use std::f32::consts::{PI, TAU};

use bevy::prelude::*;
use rand::Rng;
use thiserror::Error;

use crate::{
    game::{
        LocomotionSystems, WorldRng,
        animations::{
            CharacterAnimationController, ClipMixer, ClipRegistry, LocomotionFsm, LocomotionState,
        },
        camera_controller::CameraRig,
        configs::{AutopilotConfig, LocomotionConfig},
        interaction::InteractionStarted,
        player::{InputDriver, InputSnapshot, Player, yaw_of},
        tick_seconds,
    },
    screens::Screen,
};

use schedule::ScheduledActions;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        drive_autopilot
            .in_set(LocomotionSystems::Autopilot)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Hypotenuse below which no heading can be derived
const MIN_TARGET_DISTANCE: f32 = 1e-3;
/// Attempts at finding a destination that is not already within reach
const DESTINATION_ATTEMPTS: usize = 16;
/// Ponder framing, sampled in the character's local frame
const PONDER_OFFSET_MIN: Vec3 = Vec3::new(-60.0, 10.0, -60.0);
const PONDER_OFFSET_MAX: Vec3 = Vec3::new(60.0, 60.0, 60.0);
const PONDER_LOOK_MIN: Vec3 = Vec3::new(-20.0, 5.0, -20.0);
const PONDER_LOOK_MAX: Vec3 = Vec3::new(20.0, 20.0, 20.0);

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum AutopilotError {
    #[error("walk target {0} coincides with the character")]
    DegenerateTarget(Vec3),
}

/// What happens once a walk ends, by arrival or timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Look around from a random camera angle before moving on
    Ponder,
    /// Play the interaction, then move on
    Interact,
    /// Move on after a short pause
    Wander,
}

impl FollowUp {
    pub fn pick(rng: &mut impl Rng) -> Self {
        match rng.random_range(0..3) {
            0 => Self::Ponder,
            1 => Self::Interact,
            _ => Self::Wander,
        }
    }
}

/// Deferred work on the autopilot's clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    NewDestination,
    RestoreCamera,
    Interact,
}

/// Side effects the autopilot asks the world to perform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutopilotCommand {
    MoveCamera { offset: Vec3, look_at: Vec3 },
    RestoreCamera,
    Interact,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkTarget {
    pub point: Vec3,
    /// Heading fixed when the walk starts
    pub yaw: f32,
    pub sprint: bool,
    started_at: f64,
}

/// Which way to steer towards a heading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steer {
    Left,
    Right,
    Hold,
}

#[derive(Component, Debug, Default)]
pub struct Autopilot {
    /// Seconds since spawn; double precision so due times stay exact in long sessions
    clock: f64,
    target: Option<WalkTarget>,
    pending: ScheduledActions<Pending>,
    human_idle: f32,
}

impl Autopilot {
    /// Autopilot that picks its first destination after `delay` seconds
    pub fn starting_in(delay: f32) -> Self {
        let mut autopilot = Self::default();
        autopilot.pending.schedule(autopilot.clock, delay, Pending::NewDestination);
        autopilot
    }

    pub fn target(&self) -> Option<&WalkTarget> {
        self.target.as_ref()
    }

    /// Walking towards a target
    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    /// Walking or waiting on a follow-up
    pub fn is_engaged(&self) -> bool {
        self.is_active() || !self.pending.is_empty()
    }

    /// Starts a walk to `point`, superseding any walk or follow-up in progress
    pub fn walk_to(
        &mut self,
        point: Vec3,
        from: &Transform,
        rng: &mut impl Rng,
        config: &AutopilotConfig,
    ) -> Result<(), AutopilotError> {
        let yaw = yaw_towards(from.translation, point)
            .ok_or(AutopilotError::DegenerateTarget(point))?;
        let distance = horizontal_distance(from.translation, point);
        let sprint = distance > config.sprint_distance && rng.random_bool(0.5);

        self.pending.cancel_all();
        self.target = Some(WalkTarget {
            point,
            yaw,
            sprint,
            started_at: self.clock,
        });
        debug!(
            "autopilot: walking to {point} ({distance:.0} away, yaw {yaw:.2}, sprint {sprint})"
        );
        Ok(())
    }

    /// Drops the walk and every queued follow-up. Returns whether anything was in progress.
    pub fn interrupt(&mut self) -> bool {
        let engaged = self.is_engaged();
        self.pending.cancel_all();
        self.target = None;
        self.human_idle = 0.0;
        engaged
    }

    /// Tracks how long the human has held nothing. Returns `true` once the
    /// autopilot has queued a new destination and should take over.
    pub fn human_idle(&mut self, dt: f32, idle: bool, config: &AutopilotConfig) -> bool {
        if !idle {
            self.human_idle = 0.0;
            return false;
        }
        self.human_idle += dt;
        if self.human_idle < config.resume_after_idle {
            return false;
        }
        self.human_idle = 0.0;
        self.pending.schedule(self.clock, 0.0, Pending::NewDestination);
        true
    }

    /// Advances the clock, fires due follow-ups and steers towards the target
    pub fn tick(
        &mut self,
        dt: f32,
        transform: &Transform,
        input: &mut InputSnapshot,
        rng: &mut impl Rng,
        locomotion: &LocomotionConfig,
    ) -> Vec<AutopilotCommand> {
        let config = &locomotion.autopilot;
        self.clock += f64::from(dt);
        let mut commands = Vec::new();

        for pending in self.pending.take_due(self.clock) {
            match pending {
                Pending::NewDestination => {
                    let destination = random_destination(rng, transform.translation, config);
                    if let Err(err) = self.walk_to(destination, transform, rng, config) {
                        warn!("autopilot: {err}, retrying");
                        self.pending.schedule(
                            self.clock,
                            config.wander_delay,
                            Pending::NewDestination,
                        );
                    }
                }
                Pending::RestoreCamera => commands.push(AutopilotCommand::RestoreCamera),
                Pending::Interact => commands.push(AutopilotCommand::Interact),
            }
        }

        let Some(target) = self.target else {
            return commands;
        };

        let elapsed = (self.clock - target.started_at) as f32;
        let distance = horizontal_distance(transform.translation, target.point);
        if elapsed >= config.timeout || distance < config.arrival_distance {
            input.clear();
            self.target = None;
            let follow_up = FollowUp::pick(rng);
            debug!("autopilot: stopped {distance:.0} short after {elapsed:.1}s, {follow_up:?}");
            commands.extend(self.follow_up(follow_up, rng, config));
            return commands;
        }

        input.forward = true;
        input.backward = false;
        input.sprint = target.sprint;
        let steer = steer_towards(yaw_of(transform), target.yaw, steering_band(dt, locomotion));
        input.left = steer == Steer::Left;
        input.right = steer == Steer::Right;

        commands
    }

    /// Queues the follow-up and returns anything that must happen immediately
    pub fn follow_up(
        &mut self,
        follow_up: FollowUp,
        rng: &mut impl Rng,
        config: &AutopilotConfig,
    ) -> Vec<AutopilotCommand> {
        let now = self.clock;
        match follow_up {
            FollowUp::Ponder => {
                self.pending.schedule(now, config.ponder_dwell, Pending::RestoreCamera);
                self.pending.schedule(now, config.ponder_dwell, Pending::NewDestination);
                vec![AutopilotCommand::MoveCamera {
                    offset: random_between(rng, PONDER_OFFSET_MIN, PONDER_OFFSET_MAX),
                    look_at: random_between(rng, PONDER_LOOK_MIN, PONDER_LOOK_MAX),
                }]
            }
            FollowUp::Interact => {
                self.pending.schedule(now, config.interact_delay, Pending::Interact);
                self.pending.schedule(
                    now,
                    config.interact_resume_delay,
                    Pending::NewDestination,
                );
                Vec::new()
            }
            FollowUp::Wander => {
                self.pending.schedule(now, config.wander_delay, Pending::NewDestination);
                Vec::new()
            }
        }
    }
}

/// Heading from `from` to `to` on the ground plane, in the `atan2(x, z)` convention.
///
/// Built from the triangle formed by the two points and the z leg, so both
/// legs degenerate cleanly: a zero z leg is a quarter turn and coincident
/// points have no heading.
pub fn yaw_towards(from: Vec3, to: Vec3) -> Option<f32> {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    let adjacent = dz.abs();
    let opposite = dx.abs();
    let hypotenuse = (dx * dx + dz * dz).sqrt();
    if hypotenuse < MIN_TARGET_DISTANCE {
        return None;
    }

    let cosine = if adjacent < f32::EPSILON {
        0.0
    } else {
        (adjacent * adjacent + hypotenuse * hypotenuse - opposite * opposite)
            / (2.0 * adjacent * hypotenuse)
    };
    let mut angle = cosine.clamp(-1.0, 1.0).acos();
    if dz < 0.0 {
        angle = PI - angle;
    }
    if dx < 0.0 {
        angle = -angle;
    }
    Some(angle)
}

/// Dead band around the target heading. Never narrower than half of one moving
/// tick's turn, so a single overshoot always lands inside it.
pub fn steering_band(dt: f32, config: &LocomotionConfig) -> f32 {
    let movement = &config.movement;
    let turn_step = movement.turn_while_moving_rate * PI * dt * movement.acceleration.y;
    config.autopilot.heading_tolerance.max(0.5 * turn_step)
}

pub fn steer_towards(current: f32, target: f32, tolerance: f32) -> Steer {
    let delta = wrap_angle(target - current);
    if delta > tolerance {
        Steer::Left
    } else if delta < -tolerance {
        Steer::Right
    } else {
        Steer::Hold
    }
}

/// Maps an angle into `[-π, π)`
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}

/// Random point inside the roam square, preferring ones not already within reach
pub fn random_destination(rng: &mut impl Rng, from: Vec3, config: &AutopilotConfig) -> Vec3 {
    let radius = config.roam_radius.max(1.0);
    let mut candidate = from;
    for _ in 0..DESTINATION_ATTEMPTS {
        candidate = Vec3::new(
            rng.random_range(-radius..=radius),
            0.0,
            rng.random_range(-radius..=radius),
        );
        if horizontal_distance(from, candidate) > config.arrival_distance * 2.0 {
            break;
        }
    }
    candidate
}

fn random_between(rng: &mut impl Rng, min: Vec3, max: Vec3) -> Vec3 {
    Vec3::new(
        rng.random_range(min.x..=max.x),
        rng.random_range(min.y..=max.y),
        rng.random_range(min.z..=max.z),
    )
}

pub fn drive_autopilot(
    time: Res<Time>,
    config: Res<LocomotionConfig>,
    mut rng: ResMut<WorldRng>,
    mut interactions: MessageWriter<InteractionStarted>,
    mut query: Query<
        (
            &Transform,
            &mut InputSnapshot,
            &mut InputDriver,
            &mut Autopilot,
            &mut CameraRig,
            &mut LocomotionFsm,
            Option<(&mut ClipRegistry, &CharacterAnimationController)>,
        ),
        With<Player>,
    >,
    mut animation_players: Query<(&mut AnimationPlayer, &mut AnimationTransitions)>,
) {
    let dt = tick_seconds(&time, &config);
    let Ok((transform, mut input, mut driver, mut autopilot, mut rig, mut fsm, mut animation)) =
        query.single_mut()
    else {
        return;
    };

    if *driver == InputDriver::Human {
        if autopilot.human_idle(dt, input.is_empty(), &config.autopilot) {
            driver.switch_to(InputDriver::Autopilot, &mut input);
            info!("Autopilot resumed after human idleness");
        }
        return;
    }

    let commands = autopilot.tick(dt, transform, &mut input, &mut rng.0, &config);
    for command in commands {
        match command {
            AutopilotCommand::MoveCamera { offset, look_at } => {
                rig.offset = offset;
                rig.look_at = look_at;
            }
            AutopilotCommand::RestoreCamera => rig.restore(&config.camera),
            AutopilotCommand::Interact => {
                let Some((registry, controller)) = animation.as_mut() else {
                    continue;
                };
                let Ok((mut animation_player, mut transitions)) =
                    animation_players.get_mut(controller.animation_player)
                else {
                    continue;
                };
                let mut mixer = ClipMixer::new(registry, &mut animation_player, &mut transitions);
                if fsm.set_state(LocomotionState::Interact, &mut mixer).is_some() {
                    interactions.write(InteractionStarted);
                }
            }
        }
    }
}
