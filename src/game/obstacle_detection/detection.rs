use std::f32::consts::{FRAC_PI_2, PI};

use bevy::prelude::*;

use crate::game::player::InputSnapshot;

/// Rotation of the probe relative to the camera heading. The first held key wins.
pub fn probe_heading(input: &InputSnapshot) -> Option<f32> {
    if input.forward {
        Some(0.0)
    } else if input.backward {
        Some(PI)
    } else if input.left {
        Some(FRAC_PI_2)
    } else if input.right {
        Some(-FRAC_PI_2)
    } else {
        None
    }
}

/// Horizontal probe direction, or `None` without movement input or with a vertical camera
pub fn probe_direction(camera_forward: Vec3, input: &InputSnapshot) -> Option<Dir3> {
    let heading = probe_heading(input)?;
    let flat = Vec3::new(camera_forward.x, 0.0, camera_forward.z);
    let rotated = Quat::from_rotation_y(heading) * flat;
    Dir3::new(rotated).ok()
}

/// Props that should be relocated from a batch of `(entity, distance)` hits.
///
/// `flagged` answers `None` for anything that is not a prop. Already flagged
/// props and hits beyond `near` are skipped, and each prop is reported once.
pub fn select_relocations(
    hits: impl IntoIterator<Item = (Entity, f32)>,
    near: f32,
    flagged: impl Fn(Entity) -> Option<bool>,
) -> Vec<Entity> {
    let mut selected = Vec::new();
    for (entity, distance) in hits {
        if distance >= near || selected.contains(&entity) {
            continue;
        }
        if flagged(entity) == Some(false) {
            selected.push(entity);
        }
    }
    selected
}
