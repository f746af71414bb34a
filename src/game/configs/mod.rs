pub mod assets;

use bevy::prelude::*;

use crate::asset_tracking::LoadResource;

pub use assets::{
    AutopilotConfig, CameraConfig, ConfigAssets, LocomotionConfig, LocomotionConfigLoader,
    MovementConfig, ProbeConfig, PropConfig,
};

pub(super) fn plugin(app: &mut App) {
    // Register the asset loader for RON config files
    app.init_asset::<LocomotionConfig>();
    app.init_asset_loader::<LocomotionConfigLoader>();

    // Defaults are usable until the file arrives; the loading screen waits for it anyway
    app.init_resource::<LocomotionConfig>();
    app.load_resource::<ConfigAssets>();

    app.add_systems(PreUpdate, apply_locomotion_config);
}

/// Copies the loaded config asset into the resource, again whenever the file is hot-reloaded
fn apply_locomotion_config(
    mut events: MessageReader<AssetEvent<LocomotionConfig>>,
    handles: Option<Res<ConfigAssets>>,
    configs: Res<Assets<LocomotionConfig>>,
    mut active: ResMut<LocomotionConfig>,
) {
    let Some(handles) = handles else {
        events.clear();
        return;
    };

    let modified = events
        .read()
        .fold(false, |acc, event| acc | event.is_modified(&handles.locomotion));
    if !handles.is_added() && !modified {
        return;
    }

    if let Some(config) = configs.get(&handles.locomotion) {
        *active = config.clone();
        info!("Applied locomotion config from {}", LocomotionConfig::PATH);
    }
}
