//! Ground, lights and the character for the gameplay screen.

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::{game::player::SpawnPlayer, screens::Screen};

const GROUND_SIZE: f32 = 2000.0;
const GROUND_THICKNESS: f32 = 1.0;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        OnEnter(Screen::Gameplay),
        (spawn_environment, spawn_level).chain(),
    );
}

/// The light that changes colour on interactions
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct KeyLight;

pub fn spawn_environment(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let ground_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.6, 0.6, 0.6),
        perceptual_roughness: 0.9,
        ..default()
    });
    commands.spawn((
        Name::new("Ground"),
        DespawnOnExit(Screen::Gameplay),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(GROUND_SIZE, GROUND_SIZE))),
        MeshMaterial3d(ground_material),
        Transform::default(),
        RigidBody::Static,
        // Top face flush with the plane
        children![(
            Transform::from_xyz(0.0, -GROUND_THICKNESS / 2.0, 0.0),
            Collider::cuboid(GROUND_SIZE, GROUND_THICKNESS, GROUND_SIZE),
        )],
    ));

    commands.spawn((
        Name::new("Key Light"),
        KeyLight,
        DespawnOnExit(Screen::Gameplay),
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(0.0, 200.0, 100.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        Name::new("Fill Light"),
        DespawnOnExit(Screen::Gameplay),
        DirectionalLight {
            illuminance: 2500.0,
            color: Color::srgb(0.8, 0.85, 1.0),
            ..default()
        },
        Transform::from_xyz(-100.0, 150.0, -200.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 200.0,
        affects_lightmapped_meshes: false,
    });
    info!("Spawned ground and lights");
}

pub fn spawn_level(world: &mut World) {
    SpawnPlayer {
        position: Vec3::ZERO,
    }
    .apply(world);
}
