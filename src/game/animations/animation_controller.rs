use bevy::prelude::*;

use crate::game::{
    configs::LocomotionConfig,
    interaction::InteractionStarted,
    player::{InputSnapshot, Player},
};

use super::{
    animation_assets::PlayerAnimations,
    mixer::{ClipMixer, ClipRegistry},
    models::{CharacterAnimationController, LocomotionError, LocomotionState},
    state_machine::{BlendTimes, LocomotionFsm},
};

/// Builds the animation graph and the clip registry once the character's
/// `AnimationPlayer` exists and every clip has loaded.
pub fn setup_animation_graph(
    mut commands: Commands,
    animations: Option<Res<PlayerAnimations>>,
    clips: Res<Assets<AnimationClip>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    animation_player_query: Query<Entity, With<AnimationPlayer>>,
    player_query: Query<Entity, (With<Player>, Without<CharacterAnimationController>)>,
) -> Result {
    let Some(animations) = animations else {
        return Ok(());
    };
    let Ok(animation_player_entity) = animation_player_query.single() else {
        return Ok(());
    };
    let Ok(player_entity) = player_query.single() else {
        return Ok(());
    };

    // Resolve every clip name to its state; an unknown name is a wiring bug
    let mut by_state: Vec<Option<Handle<AnimationClip>>> = vec![None; LocomotionState::ALL.len()];
    for (name, handle) in animations.iter() {
        let state: LocomotionState = name.parse()?;
        by_state[state.index()] = Some(handle.clone());
    }

    let handles = LocomotionState::ALL
        .into_iter()
        .map(|state| by_state[state.index()].clone().ok_or(LocomotionError::MissingClip(state)))
        .collect::<Result<Vec<_>, _>>()?;

    let durations = LocomotionState::ALL
        .into_iter()
        .map(|state| {
            clips
                .get(&handles[state.index()])
                .map(AnimationClip::duration)
                .ok_or(LocomotionError::ClipNotLoaded(state))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (graph, nodes) = AnimationGraph::from_clips(handles);
    let registry = ClipRegistry::new(&nodes, |state| durations.get(state.index()).copied())?;
    let graph_handle = graphs.add(graph);

    commands
        .entity(animation_player_entity)
        .insert(AnimationGraphHandle(graph_handle))
        .insert(AnimationTransitions::new());
    commands.entity(player_entity).insert((
        registry,
        CharacterAnimationController {
            animation_player: animation_player_entity,
        },
    ));

    info!("Animation graph and clip registry created for {} clips", LocomotionState::ALL.len());
    Ok(())
}

/// Enters `Idle` once the registry exists, then runs the input-driven transitions
pub fn drive_state_machine(
    config: Res<LocomotionConfig>,
    mut query: Query<
        (
            &InputSnapshot,
            &mut LocomotionFsm,
            &mut ClipRegistry,
            &CharacterAnimationController,
        ),
        With<Player>,
    >,
    mut animation_players: Query<(&mut AnimationPlayer, &mut AnimationTransitions)>,
    mut interactions: MessageWriter<InteractionStarted>,
) {
    for (input, mut fsm, mut registry, controller) in query.iter_mut() {
        let Ok((mut animation_player, mut transitions)) =
            animation_players.get_mut(controller.animation_player)
        else {
            continue;
        };

        if config.is_changed() {
            fsm.set_blend(BlendTimes {
                locomotion: config.movement.locomotion_blend,
                interact: config.movement.interact_blend,
            });
        }

        let mut mixer = ClipMixer::new(&mut registry, &mut animation_player, &mut transitions);
        let change = match fsm.state() {
            None => fsm.set_state(LocomotionState::Idle, &mut mixer),
            Some(_) => fsm.update(input, &mut mixer),
        };

        if change.is_some_and(|change| change.to == LocomotionState::Interact) {
            interactions.write(InteractionStarted);
        }
    }
}

/// Hands finished one-shot clips to the machine; they are acted on next tick
pub fn report_finished_clips(
    mut query: Query<(&mut ClipRegistry, &mut LocomotionFsm, &CharacterAnimationController)>,
    animation_players: Query<&AnimationPlayer>,
) {
    for (mut registry, mut fsm, controller) in query.iter_mut() {
        let Ok(animation_player) = animation_players.get(controller.animation_player) else {
            continue;
        };
        for event in registry.finished_clips(animation_player) {
            fsm.push_finished(event);
        }
    }
}
