use super::action::ClipAction;
use super::clip::{AnimationClip, TrackProperty, TrackSample};
use crate::scene::SceneGraph;
use bevy_ecs::entity::Entity;
use glam::{Quat, Vec3};
use std::collections::HashMap;
use std::sync::Arc;

type PropertyKey = (Entity, TrackProperty);

/// Node property captured when the first clip touching it was bound.
#[derive(Clone, Copy, Debug)]
enum RestValue {
    Vector(Vec3),
    Rotation(Quat),
}

/// Weighted running blend of every contribution to one property in a frame.
#[derive(Clone, Copy, Debug)]
struct Accumulator {
    weight: f32,
    value: TrackSample,
}

impl Accumulator {
    fn accumulate(slot: &mut Option<Accumulator>, sample: TrackSample, weight: f32) {
        match slot {
            None => *slot = Some(Accumulator { weight, value: sample }),
            Some(acc) => {
                acc.weight += weight;
                let mix = weight / acc.weight;
                acc.value = match (acc.value, sample) {
                    (TrackSample::Vector(a), TrackSample::Vector(b)) => TrackSample::Vector(a.lerp(b, mix)),
                    (TrackSample::Rotation(a), TrackSample::Rotation(b)) => TrackSample::Rotation(a.slerp(b, mix)),
                    (current, _) => current,
                };
            }
        }
    }

    /// Fills the missing weight with the rest value.
    fn resolve(self, rest: RestValue) -> TrackSample {
        if self.weight >= 1.0 {
            return self.value;
        }
        let remainder = 1.0 - self.weight;
        match (self.value, rest) {
            (TrackSample::Vector(v), RestValue::Vector(r)) => TrackSample::Vector(v.lerp(r, remainder)),
            (TrackSample::Rotation(q), RestValue::Rotation(r)) => TrackSample::Rotation(q.slerp(r, remainder)),
            (value, _) => value,
        }
    }
}

/// Track of a bound clip resolved against the mixer's root. `None` when no node carries the
/// track's name.
type TrackBindings = Vec<Option<Entity>>;

/// Independent animation clock bound to one object hierarchy.
pub struct AnimationMixer {
    root: Entity,
    time: f32,
    actions: Vec<ClipAction>,
    bindings: Vec<TrackBindings>,
    rest: HashMap<PropertyKey, RestValue>,
}

impl AnimationMixer {
    pub fn new(root: Entity) -> Self {
        Self { root, time: 0.0, actions: Vec::new(), bindings: Vec::new(), rest: HashMap::new() }
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Binds `clip` to the nodes below the root and returns the new action's index.
    pub fn clip_action(&mut self, clip: Arc<AnimationClip>, scene: &SceneGraph) -> usize {
        let mut bindings = Vec::with_capacity(clip.tracks.len());
        for track in clip.tracks.iter() {
            let target = scene.find_by_name(self.root, &track.node);
            if let Some(entity) = target {
                let property = track.property();
                if let Some(transform) = scene.transform(entity) {
                    self.rest.entry((entity, property)).or_insert(match property {
                        TrackProperty::Translation => RestValue::Vector(transform.translation),
                        TrackProperty::Rotation => RestValue::Rotation(transform.rotation),
                        TrackProperty::Scale => RestValue::Vector(transform.scale),
                    });
                }
            } else {
                log::trace!(target: "animation", "clip '{}' track '{}' has no matching node", clip.name, track.node);
            }
            bindings.push(target);
        }
        self.actions.push(ClipAction::new(clip, self.time));
        self.bindings.push(bindings);
        self.actions.len() - 1
    }

    pub fn action(&self, index: usize) -> Option<&ClipAction> {
        self.actions.get(index)
    }

    pub fn action_mut(&mut self, index: usize) -> Option<&mut ClipAction> {
        self.actions.get_mut(index)
    }

    /// Advances every scheduled action by `delta` seconds and writes the blended pose.
    pub fn update(&mut self, delta: f32, scene: &mut SceneGraph) {
        self.time += delta;
        let now = self.time;
        let mut accumulators: HashMap<PropertyKey, Option<Accumulator>> = HashMap::new();
        for (action, bindings) in self.actions.iter_mut().zip(self.bindings.iter()) {
            if !action.is_scheduled() {
                action.sync_clock(now);
                continue;
            }
            let weight = action.advance(now, delta);
            let clip = Arc::clone(action.clip());
            for (track, target) in clip.tracks.iter().zip(bindings.iter()) {
                let Some(entity) = *target else {
                    continue;
                };
                let slot = accumulators.entry((entity, track.property())).or_insert(None);
                if weight <= 0.0 {
                    continue;
                }
                if let Some(sample) = track.sample(action.time()) {
                    Accumulator::accumulate(slot, sample, weight);
                }
            }
        }

        for ((entity, property), accumulated) in accumulators {
            let Some(rest) = self.rest.get(&(entity, property)).copied() else {
                continue;
            };
            let value = match accumulated {
                Some(acc) if acc.weight > 0.0 => acc.resolve(rest),
                _ => match rest {
                    RestValue::Vector(v) => TrackSample::Vector(v),
                    RestValue::Rotation(q) => TrackSample::Rotation(q),
                },
            };
            let Some(mut transform) = scene.transform(entity) else {
                continue;
            };
            match (property, value) {
                (TrackProperty::Translation, TrackSample::Vector(v)) => transform.translation = v,
                (TrackProperty::Scale, TrackSample::Vector(v)) => transform.scale = v,
                (TrackProperty::Rotation, TrackSample::Rotation(q)) => transform.rotation = q.normalize(),
                _ => continue,
            }
            scene.set_transform(entity, transform);
        }
    }
}
