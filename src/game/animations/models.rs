use std::{fmt, str::FromStr};

use bevy::prelude::*;
use thiserror::Error;

/// Discrete locomotion/animation states of the character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum LocomotionState {
    Idle,
    WalkForward,
    WalkBackward,
    RunForward,
    RunBackward,
    TurnLeft,
    TurnRight,
    Interact,
}

impl LocomotionState {
    pub const ALL: [LocomotionState; 8] = [
        LocomotionState::Idle,
        LocomotionState::WalkForward,
        LocomotionState::WalkBackward,
        LocomotionState::RunForward,
        LocomotionState::RunBackward,
        LocomotionState::TurnLeft,
        LocomotionState::TurnRight,
        LocomotionState::Interact,
    ];

    /// Stable name, shared with the clip table
    pub fn name(self) -> &'static str {
        match self {
            LocomotionState::Idle => "idle",
            LocomotionState::WalkForward => "walkForward",
            LocomotionState::WalkBackward => "walkBackward",
            LocomotionState::RunForward => "runForward",
            LocomotionState::RunBackward => "runBackward",
            LocomotionState::TurnLeft => "turnLeft",
            LocomotionState::TurnRight => "turnRight",
            LocomotionState::Interact => "interact",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn is_walking(self) -> bool {
        matches!(self, LocomotionState::WalkForward | LocomotionState::WalkBackward)
    }

    /// Walk and run in the same direction share a gait cycle
    pub fn shares_gait_with(self, other: LocomotionState) -> bool {
        use LocomotionState::*;
        matches!(
            (self, other),
            (WalkForward, RunForward)
                | (RunForward, WalkForward)
                | (WalkBackward, RunBackward)
                | (RunBackward, WalkBackward)
        )
    }
}

impl fmt::Display for LocomotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LocomotionState {
    type Err = LocomotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LocomotionState::ALL
            .into_iter()
            .find(|state| state.name() == s)
            .ok_or_else(|| LocomotionError::UnknownState(s.to_string()))
    }
}

/// Configuration errors in the clip/state wiring. None of these are recoverable.
#[derive(Debug, Error, PartialEq)]
pub enum LocomotionError {
    #[error("no locomotion state is named `{0}`")]
    UnknownState(String),
    #[error("no clip registered for state `{0}`")]
    MissingClip(LocomotionState),
    #[error("clip asset for state `{0}` is not loaded")]
    ClipNotLoaded(LocomotionState),
}

/// Links the player to the entity carrying its Bevy `AnimationPlayer`
#[derive(Component)]
pub struct CharacterAnimationController {
    pub animation_player: Entity,
}
