use bevy::{
    asset::{AssetLoader, AsyncReadExt, LoadContext},
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Locomotion, camera, autopilot, probe and prop tuning loaded from a RON file
#[derive(Asset, Resource, Reflect, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub movement: MovementConfig,
    pub camera: CameraConfig,
    pub autopilot: AutopilotConfig,
    pub probe: ProbeConfig,
    pub props: PropConfig,
}

impl LocomotionConfig {
    /// Path to the locomotion configuration file
    pub const PATH: &'static str = "config/locomotion.ron";
}

/// Constants for the kinematic integrator and clip blending
#[derive(Reflect, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Per-axis acceleration; `y` doubles as the turn-rate factor
    pub acceleration: Vec3,
    /// Per-axis velocity decay rates (negative)
    pub deceleration: Vec3,
    pub sprint_multiplier: f32,
    /// Multiples of `π · accel.y` radians per second
    pub turn_in_place_rate: f32,
    pub turn_while_moving_rate: f32,
    /// Upper bound for a single tick, in seconds
    pub max_step: f32,
    pub locomotion_blend: f32,
    pub interact_blend: f32,
    pub model_scale: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            acceleration: Vec3::new(1.0, 0.25, 150.0),
            deceleration: Vec3::new(-0.0005, -0.0001, -5.0),
            sprint_multiplier: 2.0,
            turn_in_place_rate: 2.0,
            turn_while_moving_rate: 4.0,
            max_step: 0.1,
            locomotion_blend: 0.5,
            interact_blend: 0.2,
            model_scale: 0.1,
        }
    }
}

/// Third-person follower targeting
#[derive(Reflect, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera position in the character's local frame
    pub offset: Vec3,
    /// Look-at point in the character's local frame
    pub look_at: Vec3,
    pub turn_speed: f32,
    /// Offset z used while walking
    pub walk_offset_z: f32,
    /// Offset z used while running backwards
    pub run_backward_offset_z: f32,
    /// Scripted close-up played when an interaction starts
    pub close_up_offset: Vec3,
    pub close_up_look_at: Vec3,
    pub close_up_duration: f32,
    pub close_up_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            offset: Vec3::new(-15.0, 20.0, -30.0),
            look_at: Vec3::new(0.0, 10.0, 50.0),
            turn_speed: 0.3,
            walk_offset_z: -40.0,
            run_backward_offset_z: -120.0,
            close_up_offset: Vec3::new(10.0, 16.0, 28.0),
            close_up_look_at: Vec3::new(0.0, 12.0, 0.0),
            close_up_duration: 3.0,
            close_up_speed: 2.0,
        }
    }
}

/// Walk-to behaviour
#[derive(Reflect, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Targets further than this may be approached at a sprint
    pub sprint_distance: f32,
    pub arrival_distance: f32,
    /// Seconds before a walk is abandoned
    pub timeout: f32,
    /// Radians either side of the target heading where no turn input is given
    pub heading_tolerance: f32,
    pub ponder_dwell: f32,
    pub interact_delay: f32,
    pub interact_resume_delay: f32,
    pub wander_delay: f32,
    /// Destinations are picked inside this square around the origin
    pub roam_radius: f32,
    /// Seconds without human input before the autopilot takes over again
    pub resume_after_idle: f32,
    pub initial_delay: f32,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            sprint_distance: 100.0,
            arrival_distance: 50.0,
            timeout: 20.0,
            heading_tolerance: 0.1,
            ponder_dwell: 5.0,
            interact_delay: 1.0,
            interact_resume_delay: 6.0,
            wander_delay: 2.0,
            roam_radius: 400.0,
            resume_after_idle: 10.0,
            initial_delay: 1.0,
        }
    }
}

/// Proximity probe against movable props
#[derive(Reflect, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub chest_height: f32,
    pub range: f32,
    pub near_distance: f32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            chest_height: 18.0,
            range: 20.0,
            near_distance: 25.0,
        }
    }
}

/// Box field layout and relocation pacing
#[derive(Reflect, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PropConfig {
    pub count: usize,
    pub size: f32,
    pub grid_step: f32,
    pub min_character_distance: f32,
    pub shuffle_interval: f32,
    pub fast_pace: f32,
    pub slow_pace: f32,
}

impl Default for PropConfig {
    fn default() -> Self {
        Self {
            count: 120,
            size: 20.0,
            grid_step: 20.0,
            min_character_distance: 40.0,
            shuffle_interval: 2.0,
            fast_pace: 2.0,
            slow_pace: 6.0,
        }
    }
}

/// Holds the handle so the loading screen waits for the config file
#[derive(Resource, Asset, Reflect, Clone)]
pub struct ConfigAssets {
    #[dependency]
    pub locomotion: Handle<LocomotionConfig>,
}

impl FromWorld for ConfigAssets {
    fn from_world(world: &mut World) -> Self {
        let assets = world.resource::<AssetServer>();
        Self {
            locomotion: assets.load(LocomotionConfig::PATH),
        }
    }
}

/// Asset loader for LocomotionConfig RON files
#[derive(Default)]
pub struct LocomotionConfigLoader;

impl AssetLoader for LocomotionConfigLoader {
    type Asset = LocomotionConfig;
    type Settings = ();
    type Error = anyhow::Error;

    async fn load(
        &self,
        reader: &mut dyn bevy::asset::io::Reader,
        _settings: &Self::Settings,
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let config: LocomotionConfig = ron::de::from_bytes(&bytes)?;
        Ok(config)
    }

    fn extensions(&self) -> &[&str] {
        &["ron"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config: LocomotionConfig =
            ron::de::from_str("(autopilot: (arrival_distance: 30.0))").unwrap();

        assert_eq!(config.autopilot.arrival_distance, 30.0);
        assert_eq!(config.autopilot.timeout, 20.0);
        assert_eq!(config.movement.acceleration, Vec3::new(1.0, 0.25, 150.0));
    }

    #[test]
    fn test_shipped_config_parses() {
        let text = include_str!("../../../assets/config/locomotion.ron");
        let config: LocomotionConfig = ron::de::from_str(text).unwrap();

        assert_eq!(config.camera.offset, Vec3::new(-15.0, 20.0, -30.0));
        assert_eq!(config.probe.range, 20.0);
    }
}
