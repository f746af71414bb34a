use bevy::prelude::*;
use bevy_hotpatching_experiments::hot;

use crate::game::{autopilot::Autopilot, camera_controller::CameraRig, configs::LocomotionConfig};

use super::Player;

/// Intent flags read by the state machine and integrator each tick
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub struct InputSnapshot {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
    pub interact: bool,
}

impl InputSnapshot {
    pub fn any_movement(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Snapshot of the keys currently held
    pub fn from_keyboard(keyboard: &ButtonInput<KeyCode>) -> Self {
        Self {
            forward: keyboard.any_pressed([KeyCode::KeyW, KeyCode::ArrowUp]),
            backward: keyboard.any_pressed([KeyCode::KeyS, KeyCode::ArrowDown]),
            left: keyboard.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]),
            right: keyboard.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]),
            sprint: keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]),
            interact: keyboard.pressed(KeyCode::Space),
        }
    }
}

/// Who writes the [`InputSnapshot`] this tick
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum InputDriver {
    Human,
    Autopilot,
}

impl InputDriver {
    /// Hands the snapshot to another writer; all flags are released so no key sticks
    pub fn switch_to(&mut self, driver: InputDriver, input: &mut InputSnapshot) {
        if *self != driver {
            input.clear();
            *self = driver;
        }
    }
}

/// Keyboard driver. A held key always wins over the autopilot within the same tick.
#[hot]
pub fn record_player_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    config: Res<LocomotionConfig>,
    mut query: Query<
        (&mut InputSnapshot, &mut InputDriver, &mut Autopilot, &mut CameraRig),
        With<Player>,
    >,
) {
    let Ok((mut input, mut driver, mut autopilot, mut rig)) = query.single_mut() else {
        return;
    };

    let keys = InputSnapshot::from_keyboard(&keyboard);
    if *driver == InputDriver::Autopilot {
        if keys.is_empty() {
            return;
        }
        if autopilot.interrupt() {
            rig.restore(&config.camera);
            info!("Human input took over from the autopilot");
        }
        driver.switch_to(InputDriver::Human, &mut input);
    }

    *input = keys;
}
