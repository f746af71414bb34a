use bevy::prelude::*;

/// Clip files by state name, one clip per locomotion state
const CLIP_FILES: [(&str, &str); 8] = [
    ("idle", "models/animations/Idle.glb"),
    ("walkForward", "models/animations/Walking Forward.glb"),
    ("walkBackward", "models/animations/Walking Backward.glb"),
    ("runForward", "models/animations/Running Forward.glb"),
    ("runBackward", "models/animations/Running Backward.glb"),
    ("turnLeft", "models/animations/Turn Left.glb"),
    ("turnRight", "models/animations/Turn Right.glb"),
    ("interact", "models/animations/Button Pushing.glb"),
];

/// Resource holding handles to every locomotion clip, keyed by state name
#[derive(Resource, Asset, Reflect, Clone)]
pub struct PlayerAnimations {
    pub names: Vec<String>,
    #[dependency]
    pub clips: Vec<Handle<AnimationClip>>,
}

impl PlayerAnimations {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Handle<AnimationClip>)> {
        self.names.iter().map(String::as_str).zip(self.clips.iter())
    }
}

impl FromWorld for PlayerAnimations {
    fn from_world(world: &mut World) -> Self {
        let asset_server = world.resource::<AssetServer>();

        let (names, clips) = CLIP_FILES
            .iter()
            .map(|(name, path)| {
                (
                    name.to_string(),
                    asset_server.load(GltfAssetLabel::Animation(0).from_asset(*path)),
                )
            })
            .unzip();

        Self { names, clips }
    }
}
