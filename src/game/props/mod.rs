//! The box field: movable props that get out of the character's way.

use std::f32::consts::TAU;

use avian3d::prelude::*;
use bevy::{
    math::curve::{Curve, easing::EaseFunction},
    prelude::*,
};
use rand::Rng;

use crate::{
    game::{
        WorldRng,
        configs::{LocomotionConfig, PropConfig},
        player::Player,
    },
    screens::Screen,
};

/// Vertical spacing of prop layers
const LAYER_HEIGHT: f32 = 7.0;
const LAYERS: i32 = 20;
const BASE_HEIGHT: f32 = 10.0;
/// Grid cells either side of the character
const HALF_GRID: i32 = 10;
const PLACEMENT_ATTEMPTS: usize = 64;
const MAX_STRETCH: f32 = 3.0;

pub(super) fn plugin(app: &mut App) {
    app.add_message::<RelocateProp>();
    app.add_systems(OnEnter(Screen::Gameplay), spawn_props);
    app.add_systems(
        Update,
        (shuffle_props, start_relocations, animate_prop_tweens)
            .chain()
            .run_if(in_state(Screen::Gameplay)),
    );
}

#[derive(Component, Debug, Default, Clone, Copy, Reflect)]
pub struct Prop {
    /// Set while a relocation is requested or running
    pub flagged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationPace {
    Fast,
    Slow,
}

/// Request to move a prop somewhere around the character
#[derive(Message, Debug, Clone, Copy)]
pub struct RelocateProp {
    pub prop: Entity,
    pub pace: RelocationPace,
}

#[derive(Resource, Debug)]
struct ShuffleTimer(Timer);

/// Sine eased move, stretch and roll of a prop
#[derive(Component, Debug, Clone, Copy)]
pub struct PropTween {
    from: Transform,
    to: Transform,
    /// Extra spin about the local z axis over the whole tween
    roll: f32,
    elapsed: f32,
    duration: f32,
}

impl PropTween {
    pub fn new(from: Transform, to: Transform, duration: f32) -> Self {
        Self {
            from,
            to,
            roll: 0.0,
            elapsed: 0.0,
            duration: duration.max(f32::EPSILON),
        }
    }

    pub fn with_roll(mut self, radians: f32) -> Self {
        self.roll = radians;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn advance(&mut self, dt: f32) -> Transform {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        let t = EaseFunction::SineInOut.sample_clamped(self.elapsed / self.duration);
        Transform {
            translation: self.from.translation.lerp(self.to.translation, t),
            rotation: self.from.rotation.slerp(self.to.rotation, t)
                * Quat::from_rotation_z(self.roll * t),
            scale: self.from.scale.lerp(self.to.scale, t),
        }
    }
}

/// Random grid cell around `character`, at least `min_character_distance` away
pub fn new_prop_position(rng: &mut impl Rng, character: Vec3, config: &PropConfig) -> Vec3 {
    for _ in 0..PLACEMENT_ATTEMPTS {
        let offset = Vec3::new(
            rng.random_range(-HALF_GRID..HALF_GRID) as f32 * config.grid_step,
            rng.random_range(0..LAYERS) as f32 * LAYER_HEIGHT + BASE_HEIGHT,
            rng.random_range(-HALF_GRID..HALF_GRID) as f32 * config.grid_step,
        );
        let candidate = character + offset;
        if candidate.distance(character) >= config.min_character_distance {
            return candidate;
        }
    }
    character + Vec3::Y * (BASE_HEIGHT + LAYER_HEIGHT * (LAYERS - 1) as f32)
}

/// Seconds for one relocation, `1..1 + pace factor`
pub fn relocation_duration(rng: &mut impl Rng, pace: RelocationPace, config: &PropConfig) -> f32 {
    let factor = match pace {
        RelocationPace::Fast => config.fast_pace,
        RelocationPace::Slow => config.slow_pace,
    };
    rng.random_range(0.0..factor.max(f32::EPSILON)) + 1.0
}

fn spawn_props(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut rng: ResMut<WorldRng>,
    config: Res<LocomotionConfig>,
) {
    let props = &config.props;
    let mesh = meshes.add(Cuboid::from_length(props.size));
    let material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 0.6,
        ..default()
    });

    for index in 0..props.count {
        let position = new_prop_position(&mut rng.0, Vec3::ZERO, props);
        commands.spawn((
            Name::new(format!("Prop {index}")),
            Prop::default(),
            DespawnOnExit(Screen::Gameplay),
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(position),
            RigidBody::Kinematic,
            Collider::cuboid(props.size, props.size, props.size),
        ));
    }
    commands.insert_resource(ShuffleTimer(Timer::from_seconds(
        props.shuffle_interval,
        TimerMode::Repeating,
    )));
    info!("Spawned {} props", props.count);
}

/// Every interval, a random idle prop moves somewhere else on its own
fn shuffle_props(
    time: Res<Time>,
    timer: Option<ResMut<ShuffleTimer>>,
    mut rng: ResMut<WorldRng>,
    mut props: Query<(Entity, &mut Prop)>,
    mut relocations: MessageWriter<RelocateProp>,
) {
    let Some(mut timer) = timer else {
        return;
    };
    if !timer.0.tick(time.delta()).just_finished() {
        return;
    }

    let count = props.iter().count();
    if count == 0 {
        return;
    }
    let pick = rng.0.random_range(0..count);
    let Some((entity, mut prop)) = props.iter_mut().nth(pick) else {
        return;
    };
    if prop.flagged {
        return;
    }
    prop.flagged = true;
    relocations.write(RelocateProp {
        prop: entity,
        pace: RelocationPace::Slow,
    });
}

fn start_relocations(
    mut commands: Commands,
    mut requests: MessageReader<RelocateProp>,
    mut rng: ResMut<WorldRng>,
    config: Res<LocomotionConfig>,
    player: Query<&Transform, With<Player>>,
    mut props: Query<(&Transform, &mut Prop), Without<Player>>,
) {
    let character = player
        .single()
        .map(|transform| transform.translation)
        .unwrap_or(Vec3::ZERO);

    for request in requests.read() {
        let Ok((transform, mut prop)) = props.get_mut(request.prop) else {
            continue;
        };
        prop.flagged = true;

        let target = Transform {
            translation: new_prop_position(&mut rng.0, character, &config.props),
            rotation: transform.rotation,
            scale: Vec3::new(1.0, rng.0.random_range(1.0..MAX_STRETCH), 1.0),
        };
        let duration = relocation_duration(&mut rng.0, request.pace, &config.props);
        commands
            .entity(request.prop)
            .insert(PropTween::new(*transform, target, duration).with_roll(TAU));
        debug!(
            "prop {}: {:?} relocation to {} over {duration:.1}s",
            request.prop, request.pace, target.translation
        );
    }
}

fn animate_prop_tweens(
    mut commands: Commands,
    time: Res<Time>,
    mut tweens: Query<(Entity, &mut Transform, &mut PropTween, &mut Prop)>,
) {
    let dt = time.delta_secs();
    for (entity, mut transform, mut tween, mut prop) in &mut tweens {
        *transform = tween.advance(dt);
        if tween.is_finished() {
            prop.flagged = false;
            commands.entity(entity).remove::<PropTween>();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::time::TimeUpdateStrategy;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_new_positions_keep_clear_of_character() {
        let config = PropConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let character = Vec3::new(120.0, 0.0, -40.0);
        for _ in 0..500 {
            let position = new_prop_position(&mut rng, character, &config);
            assert!(position.distance(character) >= config.min_character_distance);
            let offset = position - character;
            assert_eq!(offset.x % config.grid_step, 0.0);
            assert!(offset.x.abs() <= config.grid_step * HALF_GRID as f32);
            assert!(offset.y >= BASE_HEIGHT);
        }
    }

    #[test]
    fn test_duration_ranges() {
        let config = PropConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let fast = relocation_duration(&mut rng, RelocationPace::Fast, &config);
            let slow = relocation_duration(&mut rng, RelocationPace::Slow, &config);
            assert!((1.0..3.0).contains(&fast));
            assert!((1.0..7.0).contains(&slow));
        }
    }

    #[test]
    fn test_tween_eases_in_and_out() {
        let from = Transform::from_xyz(0.0, 10.0, 0.0);
        let to = Transform::from_xyz(100.0, 10.0, 0.0);
        let mut tween = PropTween::new(from, to, 2.0);

        let early = tween.advance(0.2).translation.x;
        assert!(early < 10.0, "sine ease starts slow: {early}");
        let half = tween.advance(0.8).translation.x;
        assert!((half - 50.0).abs() < 1e-3);
        assert!(!tween.is_finished());

        let end = tween.advance(5.0);
        assert!(tween.is_finished());
        assert_eq!(end.translation, to.translation);
    }

    #[test]
    fn test_relocation_rolls_a_full_turn() {
        let from = Transform::from_xyz(0.0, 10.0, 0.0)
            .with_rotation(Quat::from_rotation_y(0.3));
        let to = Transform::from_xyz(40.0, 10.0, 0.0).with_rotation(from.rotation);
        let mut tween = PropTween::new(from, to, 2.0).with_roll(TAU);

        let half = tween.advance(1.0).rotation;
        let upside_down = from.rotation * Quat::from_rotation_z(TAU * 0.5);
        assert!(half.angle_between(upside_down) < 1e-3);
        assert!(half.angle_between(from.rotation) > 3.0);

        let end = tween.advance(1.0).rotation;
        assert!(end.angle_between(from.rotation) < 1e-3);
    }

    #[test]
    fn test_relocation_request_moves_and_unflags_prop() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
            .insert_resource(LocomotionConfig::default())
            .insert_resource(WorldRng(StdRng::seed_from_u64(11)))
            .add_message::<RelocateProp>()
            .add_systems(Update, (start_relocations, animate_prop_tweens).chain());

        app.world_mut().spawn((Player, Transform::default()));
        let prop = app
            .world_mut()
            .spawn((Prop { flagged: true }, Transform::from_xyz(5.0, 18.0, 5.0)))
            .id();

        app.world_mut().write_message(RelocateProp {
            prop,
            pace: RelocationPace::Fast,
        });
        app.update();
        assert!(app.world().get::<PropTween>(prop).is_some());

        for _ in 0..40 {
            app.update();
        }

        let world = app.world();
        assert!(world.get::<PropTween>(prop).is_none());
        assert!(!world.get::<Prop>(prop).unwrap().flagged);
        let position = world.get::<Transform>(prop).unwrap().translation;
        assert!(position.distance(Vec3::ZERO) >= 40.0, "ended at {position}");
    }
}
