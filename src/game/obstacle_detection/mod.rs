//! Proximity probe: a short ray cast along the movement direction that moves
//! props out of the character's way.

pub mod detection;

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::{
    game::{
        LocomotionSystems,
        camera_controller::FollowCamera,
        configs::LocomotionConfig,
        player::{InputSnapshot, Player},
        props::{Prop, RelocateProp, RelocationPace},
    },
    screens::Screen,
};

use self::detection::{probe_direction, select_relocations};

/// Upper bound on hits gathered by one probe
const MAX_PROBE_HITS: u32 = 8;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<LastProbe>();
    app.add_systems(
        Update,
        probe_props
            .in_set(LocomotionSystems::Probe)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Most recent probe ray, kept for debug drawing
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct LastProbe(pub Option<ProbeRay>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeRay {
    pub origin: Vec3,
    pub direction: Dir3,
    pub range: f32,
    pub hit: bool,
}

pub fn probe_props(
    config: Res<LocomotionConfig>,
    spatial_query: SpatialQuery,
    mut last_probe: ResMut<LastProbe>,
    mut relocations: MessageWriter<RelocateProp>,
    player: Query<(Entity, &Transform, &InputSnapshot), With<Player>>,
    camera: Query<&Transform, (With<FollowCamera>, Without<Player>)>,
    mut props: Query<&mut Prop>,
) {
    last_probe.0 = None;
    let Ok((player_entity, transform, input)) = player.single() else {
        return;
    };
    if !input.any_movement() {
        return;
    }
    let camera_forward = camera
        .single()
        .map(|camera| *camera.forward())
        .unwrap_or(transform.rotation * Vec3::Z);
    let Some(direction) = probe_direction(camera_forward, input) else {
        return;
    };

    let probe = &config.probe;
    let origin = transform.translation.with_y(probe.chest_height);
    let filter = SpatialQueryFilter::from_excluded_entities([player_entity]);
    let hits = spatial_query.ray_hits(
        origin,
        direction,
        probe.range,
        MAX_PROBE_HITS,
        true,
        &filter,
    );

    let selected = select_relocations(
        hits.iter().map(|hit| (hit.entity, hit.distance)),
        probe.near_distance,
        |entity| props.get(entity).ok().map(|prop| prop.flagged),
    );
    for entity in &selected {
        if let Ok(mut prop) = props.get_mut(*entity) {
            prop.flagged = true;
            relocations.write(RelocateProp {
                prop: *entity,
                pace: RelocationPace::Fast,
            });
            debug!("probe: relocating {entity}");
        }
    }

    last_probe.0 = Some(ProbeRay {
        origin,
        direction,
        range: probe.range,
        hit: !hits.is_empty(),
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::time::TimeUpdateStrategy;

    use super::*;

    #[derive(Resource, Default)]
    struct Relocations(Vec<RelocateProp>);

    fn collect_relocations(
        mut requests: MessageReader<RelocateProp>,
        mut relocations: ResMut<Relocations>,
    ) {
        relocations.0.extend(requests.read().copied());
    }

    fn build_app() -> App {
        let mut app = App::new();
        app.add_plugins((
            MinimalPlugins,
            TransformPlugin,
            bevy::asset::AssetPlugin::default(),
            bevy::scene::ScenePlugin::default(),
        ))
        .add_plugins(PhysicsPlugins::default())
        .insert_resource(Gravity(Vec3::ZERO))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(50)))
        .insert_resource(LocomotionConfig::default())
        .init_resource::<LastProbe>()
        .init_resource::<Relocations>()
        .init_resource::<Assets<Mesh>>()
        .add_message::<bevy::asset::AssetEvent<Mesh>>()
        .add_message::<RelocateProp>()
        .add_systems(Update, (probe_props, collect_relocations).chain());
        app.finish();
        app
    }

    fn spawn_prop(app: &mut App, position: Vec3) -> Entity {
        app.world_mut()
            .spawn((
                Prop::default(),
                Transform::from_translation(position),
                RigidBody::Kinematic,
                Collider::cuboid(20.0, 20.0, 20.0),
            ))
            .id()
    }

    fn spawn_player(app: &mut App, input: InputSnapshot) -> Entity {
        app.world_mut()
            .spawn((Player, Transform::default(), input))
            .id()
    }

    #[test]
    fn test_prop_ahead_is_flagged_and_moved_fast() {
        let mut app = build_app();
        let ahead = spawn_prop(&mut app, Vec3::new(0.0, 18.0, 15.0));
        let behind = spawn_prop(&mut app, Vec3::new(0.0, 18.0, -15.0));
        spawn_player(
            &mut app,
            InputSnapshot {
                forward: true,
                ..default()
            },
        );

        for _ in 0..5 {
            app.update();
        }

        let world = app.world();
        assert!(world.get::<Prop>(ahead).is_some_and(|prop| prop.flagged));
        assert!(world.get::<Prop>(behind).is_some_and(|prop| !prop.flagged));

        // Flagged props are not requested again on later frames
        let requests = &world.resource::<Relocations>().0;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prop, ahead);
        assert_eq!(requests[0].pace, RelocationPace::Fast);

        let Some(ray) = world.resource::<LastProbe>().0 else {
            panic!("no ray recorded");
        };
        assert_eq!(ray.origin, Vec3::new(0.0, 18.0, 0.0));
        assert!(ray.hit);
    }

    #[test]
    fn test_standing_still_checks_nothing() {
        let mut app = build_app();
        let ahead = spawn_prop(&mut app, Vec3::new(0.0, 18.0, 15.0));
        spawn_player(
            &mut app,
            InputSnapshot {
                sprint: true,
                ..default()
            },
        );

        for _ in 0..5 {
            app.update();
        }

        let world = app.world();
        assert!(world.get::<Prop>(ahead).is_some_and(|prop| !prop.flagged));
        assert!(world.resource::<Relocations>().0.is_empty());
        assert!(world.resource::<LastProbe>().0.is_none());
    }
}
