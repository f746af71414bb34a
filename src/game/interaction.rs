//! Reactions to the character starting an interaction: a short scripted
//! close-up and a new key light colour.

use bevy::{color::Mix, prelude::*};
use rand::Rng;

use crate::{
    game::{
        LocomotionSystems, WorldRng,
        camera_controller::{FollowCamera, ScriptedCamera, smoothing_factor},
        configs::{CameraConfig, LocomotionConfig},
        player::Player,
        scene::KeyLight,
        tick_seconds,
    },
    screens::Screen,
};

const LIGHT_FADE_SECONDS: f32 = 1.5;

const PALETTE: [Color; 9] = [
    Color::srgb_u8(0x33, 0x33, 0x33),
    Color::srgb_u8(0xCC, 0xCC, 0xCC),
    Color::srgb_u8(0xF1, 0xC6, 0x60),
    Color::srgb_u8(0xD0, 0x20, 0x23),
    Color::srgb_u8(0xE5, 0x47, 0x26),
    Color::srgb_u8(0x23, 0xE3, 0x83),
    Color::srgb_u8(0x10, 0x8A, 0xB2),
    Color::srgb_u8(0x4A, 0x57, 0xA2),
    Color::srgb_u8(0x94, 0x29, 0x9E),
];

pub(super) fn plugin(app: &mut App) {
    app.add_message::<InteractionStarted>();
    app.init_resource::<CloseUp>();
    app.add_systems(
        Update,
        (
            (start_close_up, recolor_key_light),
            (run_close_up, fade_key_light),
        )
            .chain()
            .after(LocomotionSystems::Autopilot)
            .before(LocomotionSystems::Animate)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Written whenever the character enters its interact state
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct InteractionStarted;

/// Running close-up, if any
#[derive(Resource, Debug, Default)]
pub struct CloseUp(Option<CloseUpShot>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseUpShot {
    elapsed: f32,
    duration: f32,
}

impl CloseUpShot {
    pub fn new(duration: f32) -> Self {
        Self {
            elapsed: 0.0,
            duration,
        }
    }

    /// Returns `false` once the shot is over
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        self.elapsed < self.duration
    }
}

/// Close-up pose around the character, in world space
pub fn close_up_pose(transform: &Transform, config: &CameraConfig) -> (Vec3, Vec3) {
    (
        transform.translation + transform.rotation * config.close_up_offset,
        transform.translation + transform.rotation * config.close_up_look_at,
    )
}

/// Linear blend between two light colours
#[derive(Component, Debug, Clone, Copy)]
pub struct LightTransition {
    from: LinearRgba,
    to: LinearRgba,
    elapsed: f32,
    duration: f32,
}

impl LightTransition {
    pub fn new(from: Color, to: Color, duration: f32) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            elapsed: 0.0,
            duration: duration.max(f32::EPSILON),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn advance(&mut self, dt: f32) -> Color {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.from.mix(&self.to, self.elapsed / self.duration).into()
    }
}

/// Palette colour other than `current`
pub fn pick_light_color(rng: &mut impl Rng, current: Color) -> Color {
    let current = current.to_srgba();
    let candidates: Vec<Color> = PALETTE
        .iter()
        .copied()
        .filter(|color| color.to_srgba() != current)
        .collect();
    candidates[rng.random_range(0..candidates.len())]
}

fn start_close_up(
    mut started: MessageReader<InteractionStarted>,
    config: Res<LocomotionConfig>,
    mut close_up: ResMut<CloseUp>,
    mut scripted: ResMut<ScriptedCamera>,
) {
    if started.read().count() == 0 {
        return;
    }
    close_up.0 = Some(CloseUpShot::new(config.camera.close_up_duration));
    scripted.active = true;
    debug!("camera: close-up for {}s", config.camera.close_up_duration);
}

fn run_close_up(
    time: Res<Time>,
    config: Res<LocomotionConfig>,
    mut close_up: ResMut<CloseUp>,
    mut scripted: ResMut<ScriptedCamera>,
    player: Query<&Transform, With<Player>>,
    mut camera: Query<(&mut Transform, &mut FollowCamera), Without<Player>>,
) {
    let Some(shot) = close_up.0.as_mut() else {
        return;
    };
    let dt = tick_seconds(&time, &config);

    if let (Ok(player), Ok((mut camera_transform, mut follow))) =
        (player.single(), camera.single_mut())
    {
        let (position, look_at) = close_up_pose(player, &config.camera);
        let t = smoothing_factor(dt, config.camera.close_up_speed);
        let position = follow.position.lerp(position, t);
        let look_at = follow.look_at.lerp(look_at, t);
        follow.resume_from(position, look_at);
        camera_transform.translation = position;
        camera_transform.look_at(look_at, Vec3::Y);
    }

    if !shot.advance(dt) {
        close_up.0 = None;
        scripted.active = false;
        debug!("camera: close-up released");
    }
}

fn recolor_key_light(
    mut commands: Commands,
    mut started: MessageReader<InteractionStarted>,
    mut rng: ResMut<WorldRng>,
    lights: Query<(Entity, &DirectionalLight), With<KeyLight>>,
) {
    if started.read().count() == 0 {
        return;
    }
    for (entity, light) in &lights {
        let to = pick_light_color(&mut rng.0, light.color);
        commands
            .entity(entity)
            .insert(LightTransition::new(light.color, to, LIGHT_FADE_SECONDS));
    }
}

fn fade_key_light(
    mut commands: Commands,
    time: Res<Time>,
    mut lights: Query<(Entity, &mut DirectionalLight, &mut LightTransition)>,
) {
    for (entity, mut light, mut transition) in &mut lights {
        light.color = transition.advance(time.delta_secs());
        if transition.is_finished() {
            commands.entity(entity).remove::<LightTransition>();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::{state::app::StatesPlugin, time::TimeUpdateStrategy};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_close_up_shot_ends_after_duration() {
        let mut shot = CloseUpShot::new(3.0);
        for _ in 0..29 {
            assert!(shot.advance(0.1));
        }
        assert!(!shot.advance(0.2));
    }

    #[test]
    fn test_close_up_pose_follows_facing() {
        let config = CameraConfig::default();
        let transform = Transform::from_xyz(10.0, 0.0, 10.0)
            .with_rotation(Quat::from_rotation_y(std::f32::consts::PI));
        let (position, look_at) = close_up_pose(&transform, &config);
        assert!(position.distance(Vec3::new(0.0, 16.0, -18.0)) < 1e-4);
        assert!(look_at.distance(Vec3::new(10.0, 12.0, 10.0)) < 1e-4);
    }

    #[test]
    fn test_new_light_color_differs() {
        let mut rng = StdRng::seed_from_u64(1);
        for current in PALETTE {
            for _ in 0..20 {
                let next = pick_light_color(&mut rng, current);
                assert_ne!(next.to_srgba(), current.to_srgba());
                assert!(PALETTE.contains(&next));
            }
        }
    }

    #[test]
    fn test_light_transition_reaches_target() {
        let mut transition = LightTransition::new(Color::WHITE, PALETTE[3], 1.0);
        let halfway = LinearRgba::from(transition.advance(0.5));
        assert!(halfway.red > LinearRgba::from(PALETTE[3]).red);
        assert!(halfway.red <= 1.0);
        let end = transition.advance(1.0);
        assert!(transition.is_finished());
        assert_eq!(LinearRgba::from(end), LinearRgba::from(PALETTE[3]));
    }

    #[test]
    fn test_interaction_takes_and_releases_camera() {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
            .insert_resource(LocomotionConfig::default())
            .insert_resource(WorldRng(StdRng::seed_from_u64(2)))
            .init_resource::<ScriptedCamera>()
            .insert_state(Screen::Gameplay)
            .add_plugins(plugin);

        app.world_mut().spawn((Player, Transform::default()));
        let camera = app
            .world_mut()
            .spawn((Transform::from_xyz(0.0, 50.0, -100.0), FollowCamera::default()))
            .id();
        let light = app
            .world_mut()
            .spawn((
                KeyLight,
                DirectionalLight {
                    color: Color::WHITE,
                    ..default()
                },
            ))
            .id();

        app.world_mut().write_message(InteractionStarted);
        app.update();
        assert!(app.world().resource::<ScriptedCamera>().active);
        assert!(app.world().get::<LightTransition>(light).is_some());

        for _ in 0..40 {
            app.update();
        }
        let world = app.world();
        assert!(!world.resource::<ScriptedCamera>().active);
        assert!(world.get::<LightTransition>(light).is_none());
        assert_ne!(
            world.get::<DirectionalLight>(light).unwrap().color.to_srgba(),
            Color::WHITE.to_srgba()
        );

        let camera_position = world.get::<Transform>(camera).unwrap().translation;
        let (close_up, _) = close_up_pose(&Transform::default(), &CameraConfig::default());
        assert!(
            camera_position.distance(close_up) < Vec3::new(0.0, 50.0, -100.0).distance(close_up),
            "camera stayed at {camera_position}"
        );
    }
}
