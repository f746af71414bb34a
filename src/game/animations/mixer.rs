//! Clip registry for the character: one graph node per locomotion state.
//!
//! Playback, weights and cross-fades belong to Bevy's `AnimationPlayer` and
//! `AnimationTransitions`. The registry only adds what they lack: per-state
//! durations for gait phase sync, and finish listeners for one-shot clips.

use std::time::Duration;

use bevy::{animation::RepeatAnimation, prelude::*};

use super::models::{LocomotionError, LocomotionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum LoopMode {
    Repeat,
    /// Play once and hold the last frame
    Once,
}

/// Handle returned by [`ClipMixer::subscribe_finished`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FinishListener(u32);

/// Raised by [`ClipRegistry::finished_clips`] when a subscribed one-shot clip reaches its end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipFinished {
    pub clip: LocomotionState,
    pub listener: FinishListener,
}

#[derive(Debug, Clone)]
struct ClipSlot {
    node: AnimationNodeIndex,
    duration: f32,
    /// Set once the finish of the current run has been reported
    finish_reported: bool,
}

#[derive(Component, Debug, Clone)]
pub struct ClipRegistry {
    /// Indexed like [`LocomotionState::ALL`]
    slots: Vec<ClipSlot>,
    listeners: Vec<(FinishListener, LocomotionState)>,
    next_listener: u32,
}

impl ClipRegistry {
    /// Builds the registry; every state must resolve to a graph node and a clip duration.
    pub fn new(
        nodes: &[AnimationNodeIndex],
        mut duration_of: impl FnMut(LocomotionState) -> Option<f32>,
    ) -> Result<Self, LocomotionError> {
        let slots = LocomotionState::ALL
            .into_iter()
            .map(|state| {
                let node = nodes.get(state.index()).copied();
                node.zip(duration_of(state))
                    .map(|(node, duration)| ClipSlot {
                        node,
                        duration,
                        finish_reported: false,
                    })
                    .ok_or(LocomotionError::MissingClip(state))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            slots,
            listeners: Vec::new(),
            next_listener: 0,
        })
    }

    pub fn node(&self, state: LocomotionState) -> AnimationNodeIndex {
        self.slots[state.index()].node
    }

    pub fn duration(&self, state: LocomotionState) -> f32 {
        self.slots[state.index()].duration
    }

    /// Fraction of the gait cycle `state` has played, zero when it is not playing
    pub fn phase(&self, state: LocomotionState, player: &AnimationPlayer) -> f32 {
        let duration = self.duration(state);
        match player.animation(self.node(state)) {
            Some(active) if duration > 0.0 => (active.seek_time() / duration).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Reports each one-shot clip that reached its end since it was last started,
    /// once per subscribed listener
    pub fn finished_clips(&mut self, player: &AnimationPlayer) -> Vec<ClipFinished> {
        let mut finished = Vec::new();
        for (state, slot) in LocomotionState::ALL.into_iter().zip(self.slots.iter_mut()) {
            if slot.finish_reported {
                continue;
            }
            let Some(active) = player.animation(slot.node) else {
                continue;
            };
            let one_shot = active.repeat_mode() == RepeatAnimation::Never;
            if !one_shot || !(active.is_finished() || active.seek_time() >= slot.duration) {
                continue;
            }

            slot.finish_reported = true;
            finished.extend(
                self.listeners
                    .iter()
                    .filter(|(_, clip)| *clip == state)
                    .map(|(listener, _)| ClipFinished {
                        clip: state,
                        listener: *listener,
                    }),
            );
        }
        finished
    }
}

/// The registry together with the Bevy components it drives, borrowed for one tick
pub struct ClipMixer<'a> {
    registry: &'a mut ClipRegistry,
    player: &'a mut AnimationPlayer,
    transitions: &'a mut AnimationTransitions,
}

impl<'a> ClipMixer<'a> {
    pub fn new(
        registry: &'a mut ClipRegistry,
        player: &'a mut AnimationPlayer,
        transitions: &'a mut AnimationTransitions,
    ) -> Self {
        Self {
            registry,
            player,
            transitions,
        }
    }

    /// Starts `state` at full weight with no blend
    pub fn play(&mut self, state: LocomotionState) {
        self.cross_fade(state, 0.0);
    }

    /// Restarts `to` from its first frame and fades the current clip out over `seconds`
    pub fn cross_fade(&mut self, to: LocomotionState, seconds: f32) {
        let node = self.registry.node(to);
        self.registry.slots[to.index()].finish_reported = false;
        self.transitions
            .play(self.player, node, Duration::from_secs_f32(seconds.max(0.0)))
            .set_speed(1.0);
    }

    /// Moves `to`'s playhead to the same phase of the gait cycle as `from`
    pub fn sync_phase(&mut self, to: LocomotionState, from: LocomotionState) {
        let time = self.registry.phase(from, self.player) * self.registry.duration(to);
        if let Some(active) = self.player.animation_mut(self.registry.node(to)) {
            active.seek_to(time);
        }
    }

    pub fn set_loop(&mut self, state: LocomotionState, mode: LoopMode) {
        let Some(active) = self.player.animation_mut(self.registry.node(state)) else {
            return;
        };
        match mode {
            LoopMode::Repeat => active.repeat(),
            LoopMode::Once => active.set_repeat(RepeatAnimation::Never),
        };
    }

    pub fn subscribe_finished(&mut self, state: LocomotionState) -> FinishListener {
        let registry = &mut *self.registry;
        let listener = FinishListener(registry.next_listener);
        registry.next_listener = registry.next_listener.wrapping_add(1);
        registry.listeners.push((listener, state));
        listener
    }

    pub fn unsubscribe(&mut self, listener: FinishListener) {
        self.registry.listeners.retain(|(id, _)| *id != listener);
    }
}

/// Registry plus unattached player components, for exercising the mixer without an `App`
#[cfg(test)]
pub(crate) struct TestClips {
    pub registry: ClipRegistry,
    pub player: AnimationPlayer,
    pub transitions: AnimationTransitions,
}

#[cfg(test)]
use bevy::animation::ActiveAnimation;

#[cfg(test)]
impl TestClips {
    pub fn with_durations(duration_of: impl FnMut(LocomotionState) -> Option<f32>) -> Self {
        let (_, nodes) =
            AnimationGraph::from_clips(vec![Handle::default(); LocomotionState::ALL.len()]);
        let registry = match ClipRegistry::new(&nodes, duration_of) {
            Ok(registry) => registry,
            Err(err) => panic!("{err}"),
        };
        Self {
            registry,
            player: AnimationPlayer::default(),
            transitions: AnimationTransitions::new(),
        }
    }

    pub fn uniform(duration: f32) -> Self {
        Self::with_durations(|_| Some(duration))
    }

    pub fn mixer(&mut self) -> ClipMixer<'_> {
        ClipMixer::new(&mut self.registry, &mut self.player, &mut self.transitions)
    }

    /// Moves the playhead of `state` as if it had played for `seconds`
    pub fn play_for(&mut self, state: LocomotionState, seconds: f32) {
        let node = self.registry.node(state);
        if let Some(active) = self.player.animation_mut(node) {
            let time = active.seek_time() + seconds;
            active.seek_to(time);
        }
    }

    pub fn finished(&mut self) -> Vec<ClipFinished> {
        self.registry.finished_clips(&self.player)
    }

    /// Runs Bevy's fade bookkeeping for one frame of `seconds`
    pub fn fade(&mut self, seconds: f32) {
        use bevy::{
            animation::transition::{advance_transitions, expire_completed_transitions},
            ecs::system::RunSystemOnce,
        };

        let mut time = Time::<()>::default();
        time.advance_by(Duration::from_secs_f32(seconds));
        let mut world = World::new();
        world.insert_resource(time);
        let entity = world
            .spawn((
                std::mem::take(&mut self.player),
                std::mem::take(&mut self.transitions),
            ))
            .id();
        world.run_system_once(advance_transitions).unwrap();
        world.run_system_once(expire_completed_transitions).unwrap();

        let (player, transitions) = world
            .entity_mut(entity)
            .take::<(AnimationPlayer, AnimationTransitions)>()
            .unwrap();
        self.player = player;
        self.transitions = transitions;
    }

    /// State whose clip the transitions currently fade towards
    pub fn main_clip(&self) -> Option<LocomotionState> {
        let node = self.transitions.get_main_animation()?;
        LocomotionState::ALL
            .into_iter()
            .find(|state| self.registry.node(*state) == node)
    }

    pub fn clip(&self, state: LocomotionState) -> Option<&ActiveAnimation> {
        self.player.animation(self.registry.node(state))
    }

    pub fn weight(&self, state: LocomotionState) -> f32 {
        self.clip(state).map_or(0.0, ActiveAnimation::weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_clip_is_reported() {
        let (_, nodes) = AnimationGraph::from_clips(vec![Handle::default(); 8]);
        let result =
            ClipRegistry::new(&nodes, |state| (state != LocomotionState::Interact).then_some(1.0));
        assert_eq!(
            result.unwrap_err(),
            LocomotionError::MissingClip(LocomotionState::Interact)
        );

        let result = ClipRegistry::new(&nodes[..3], |_| Some(1.0));
        assert_eq!(
            result.unwrap_err(),
            LocomotionError::MissingClip(LocomotionState::RunForward)
        );
    }

    #[test]
    fn test_cross_fade_moves_weight() {
        let mut clips = TestClips::uniform(1.0);
        clips.mixer().play(LocomotionState::Idle);
        clips.mixer().cross_fade(LocomotionState::WalkForward, 0.5);
        assert_eq!(clips.main_clip(), Some(LocomotionState::WalkForward));

        clips.fade(0.25);
        assert!((clips.weight(LocomotionState::Idle) - 0.5).abs() < 1e-4);
        assert!((clips.weight(LocomotionState::WalkForward) - 0.5).abs() < 1e-4);

        clips.fade(0.25);
        assert!(!clips.player.is_playing_animation(clips.registry.node(LocomotionState::Idle)));
        assert!((clips.weight(LocomotionState::WalkForward) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_cross_fade_restarts_target() {
        let mut clips = TestClips::uniform(1.0);
        clips.mixer().play(LocomotionState::WalkForward);
        clips.play_for(LocomotionState::WalkForward, 0.6);
        clips.mixer().cross_fade(LocomotionState::Idle, 0.5);
        clips.mixer().cross_fade(LocomotionState::WalkForward, 0.5);

        let walk = clips.clip(LocomotionState::WalkForward).map(ActiveAnimation::seek_time);
        assert_eq!(walk, Some(0.0));
    }

    #[test]
    fn test_once_clamps_and_notifies_subscribers_only() {
        let mut clips = TestClips::uniform(1.0);
        clips.mixer().play(LocomotionState::Interact);
        clips.mixer().set_loop(LocomotionState::Interact, LoopMode::Once);
        clips.play_for(LocomotionState::Interact, 1.0);
        assert!(clips.finished().is_empty(), "no listener, no event");

        let mut clips = TestClips::uniform(1.0);
        let listener = clips.mixer().subscribe_finished(LocomotionState::Interact);
        clips.mixer().play(LocomotionState::Interact);
        clips.mixer().set_loop(LocomotionState::Interact, LoopMode::Once);

        clips.play_for(LocomotionState::Interact, 0.5);
        assert!(clips.finished().is_empty());
        clips.play_for(LocomotionState::Interact, 0.5);
        assert_eq!(
            clips.finished(),
            vec![ClipFinished {
                clip: LocomotionState::Interact,
                listener
            }]
        );
        assert!(clips.finished().is_empty(), "finish fires once");

        // A restart arms the clip again
        clips.mixer().play(LocomotionState::Interact);
        clips.mixer().set_loop(LocomotionState::Interact, LoopMode::Once);
        clips.play_for(LocomotionState::Interact, 1.0);
        assert_eq!(clips.finished().len(), 1);
    }

    #[test]
    fn test_repeating_clip_never_finishes() {
        let mut clips = TestClips::uniform(1.0);
        clips.mixer().subscribe_finished(LocomotionState::Idle);
        clips.mixer().play(LocomotionState::Idle);
        clips.mixer().set_loop(LocomotionState::Idle, LoopMode::Repeat);
        clips.play_for(LocomotionState::Idle, 1.0);
        assert!(clips.finished().is_empty());
    }

    #[test]
    fn test_unsubscribed_listener_is_silent() {
        let mut clips = TestClips::uniform(1.0);
        let listener = clips.mixer().subscribe_finished(LocomotionState::Interact);
        clips.mixer().unsubscribe(listener);
        clips.mixer().play(LocomotionState::Interact);
        clips.mixer().set_loop(LocomotionState::Interact, LoopMode::Once);
        clips.play_for(LocomotionState::Interact, 2.0);
        assert!(clips.finished().is_empty());
    }

    #[test]
    fn test_sync_phase_scales_by_duration_ratio() {
        let mut clips = TestClips::with_durations(|state| match state {
            LocomotionState::WalkForward => Some(1.2),
            LocomotionState::RunForward => Some(0.6),
            _ => Some(1.0),
        });
        clips.mixer().play(LocomotionState::WalkForward);
        clips.play_for(LocomotionState::WalkForward, 0.6);

        let mut mixer = clips.mixer();
        mixer.cross_fade(LocomotionState::RunForward, 0.5);
        mixer.sync_phase(LocomotionState::RunForward, LocomotionState::WalkForward);
        let Some(run) = clips.clip(LocomotionState::RunForward) else {
            panic!("run clip not started");
        };
        assert!((run.seek_time() - 0.3).abs() < 1e-5);
    }
}
