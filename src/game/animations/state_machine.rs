//! Locomotion finite-state machine.
//!
//! Transitions are evaluated once per tick from the [`InputSnapshot`]; every
//! state change exits the old state, enters the new one and asks the
//! [`ClipMixer`] for the matching cross-fade. `Interact` ignores input and only
//! leaves when its one-shot clip reports [`ClipFinished`].

use std::collections::VecDeque;

use bevy::prelude::*;

use crate::game::player::InputSnapshot;

use super::{
    mixer::{ClipFinished, ClipMixer, FinishListener, LoopMode},
    models::LocomotionState,
};

/// Cross-fade lengths in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendTimes {
    pub locomotion: f32,
    pub interact: f32,
}

impl Default for BlendTimes {
    fn default() -> Self {
        Self {
            locomotion: 0.5,
            interact: 0.2,
        }
    }
}

/// Per-state data that lives only while the state is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transient {
    None,
    Interact { finish_listener: FinishListener },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveState {
    kind: LocomotionState,
    transient: Transient,
}

/// Reported by the machine whenever the active state actually changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: Option<LocomotionState>,
    pub to: LocomotionState,
}

#[derive(Component, Debug, Default)]
pub struct LocomotionFsm {
    current: Option<ActiveState>,
    finished: VecDeque<ClipFinished>,
    blend: BlendTimes,
}

impl LocomotionFsm {
    pub fn new(blend: BlendTimes) -> Self {
        Self {
            blend,
            ..default()
        }
    }

    /// `None` until the initial state has been entered
    pub fn state(&self) -> Option<LocomotionState> {
        self.current.map(|active| active.kind)
    }

    pub fn set_blend(&mut self, blend: BlendTimes) {
        self.blend = blend;
    }

    /// Queues a finish event; drained at the start of the next [`update`](Self::update)
    pub fn push_finished(&mut self, event: ClipFinished) {
        self.finished.push_back(event);
    }

    /// Switches state. Re-entering the active state does nothing.
    pub fn set_state(
        &mut self,
        next: LocomotionState,
        mixer: &mut ClipMixer,
    ) -> Option<StateChange> {
        let previous = self.current.take();
        if let Some(previous) = previous {
            if previous.kind == next {
                self.current = Some(previous);
                return None;
            }
            Self::exit(previous, mixer);
        }

        let from = previous.map(|active| active.kind);
        let transient = self.enter(next, from, mixer);
        self.current = Some(ActiveState {
            kind: next,
            transient,
        });

        debug!("locomotion: {:?} -> {}", from, next);
        Some(StateChange { from, to: next })
    }

    /// Runs one tick of transition logic. A no-op before the initial state is set.
    pub fn update(&mut self, input: &InputSnapshot, mixer: &mut ClipMixer) -> Option<StateChange> {
        let active = self.current?;

        let interaction_done = self.drain_finished(active);
        if interaction_done {
            return self.set_state(LocomotionState::Idle, mixer);
        }

        let next = next_state(active.kind, input)?;
        self.set_state(next, mixer)
    }

    fn drain_finished(&mut self, active: ActiveState) -> bool {
        let mut done = false;
        while let Some(event) = self.finished.pop_front() {
            if let Transient::Interact { finish_listener } = active.transient {
                done |= event.listener == finish_listener;
            }
        }
        done
    }

    fn enter(
        &self,
        next: LocomotionState,
        previous: Option<LocomotionState>,
        mixer: &mut ClipMixer,
    ) -> Transient {
        match previous {
            None => mixer.play(next),
            Some(previous) => {
                let blend = if next == LocomotionState::Interact {
                    self.blend.interact
                } else {
                    self.blend.locomotion
                };
                mixer.cross_fade(next, blend);
                if next.shares_gait_with(previous) {
                    mixer.sync_phase(next, previous);
                }
            }
        }

        if next == LocomotionState::Interact {
            mixer.set_loop(next, LoopMode::Once);
            Transient::Interact {
                finish_listener: mixer.subscribe_finished(next),
            }
        } else {
            mixer.set_loop(next, LoopMode::Repeat);
            Transient::None
        }
    }

    fn exit(previous: ActiveState, mixer: &mut ClipMixer) {
        if let Transient::Interact { finish_listener } = previous.transient {
            mixer.unsubscribe(finish_listener);
        }
    }
}

/// Input-driven transition table, first match wins
pub fn next_state(current: LocomotionState, input: &InputSnapshot) -> Option<LocomotionState> {
    use LocomotionState::*;

    let moving = input.forward || input.backward;
    match current {
        Interact => None,
        _ if input.interact => Some(Interact),
        Idle => {
            if !moving && input.right {
                Some(TurnRight)
            } else if !moving && input.left {
                Some(TurnLeft)
            } else if input.forward {
                Some(WalkForward)
            } else if input.backward {
                Some(WalkBackward)
            } else {
                None
            }
        }
        WalkForward => gait(input.forward, input.sprint.then_some(RunForward)),
        WalkBackward => gait(input.backward, input.sprint.then_some(RunBackward)),
        RunForward => gait(input.forward, (!input.sprint).then_some(WalkForward)),
        RunBackward => gait(input.backward, (!input.sprint).then_some(WalkBackward)),
        TurnLeft => (!input.left || moving).then_some(Idle),
        TurnRight => (!input.right || moving).then_some(Idle),
    }
}

fn gait(key_held: bool, while_held: Option<LocomotionState>) -> Option<LocomotionState> {
    if key_held {
        while_held
    } else {
        Some(LocomotionState::Idle)
    }
}
