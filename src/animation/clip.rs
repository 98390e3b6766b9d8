use anyhow::{bail, Result};
use glam::{Quat, Vec3};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipInterpolation {
    Step,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipKeyframe<T> {
    pub time: f32,
    pub value: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackProperty {
    Translation,
    Rotation,
    Scale,
}

#[derive(Clone, Debug)]
pub enum TrackValues {
    Translation(Arc<[ClipKeyframe<Vec3>]>),
    Rotation(Arc<[ClipKeyframe<Quat>]>),
    Scale(Arc<[ClipKeyframe<Vec3>]>),
}

/// Sampled value of one track at a point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackSample {
    Vector(Vec3),
    Rotation(Quat),
}

/// Keyframes driving one property of the node called `node`.
#[derive(Clone, Debug)]
pub struct NodeTrack {
    pub node: Arc<str>,
    pub interpolation: ClipInterpolation,
    pub values: TrackValues,
}

impl NodeTrack {
    pub fn translation(node: &str, interpolation: ClipInterpolation, times: &[f32], values: Vec<Vec3>) -> Result<Self> {
        Ok(Self {
            node: Arc::from(node),
            interpolation,
            values: TrackValues::Translation(build_keyframes(times, values)?),
        })
    }

    pub fn rotation(node: &str, interpolation: ClipInterpolation, times: &[f32], values: Vec<Quat>) -> Result<Self> {
        let values = values
            .into_iter()
            .map(|q| if q.length_squared() > 0.0 { q.normalize() } else { Quat::IDENTITY })
            .collect();
        Ok(Self { node: Arc::from(node), interpolation, values: TrackValues::Rotation(build_keyframes(times, values)?) })
    }

    pub fn scale(node: &str, interpolation: ClipInterpolation, times: &[f32], values: Vec<Vec3>) -> Result<Self> {
        Ok(Self { node: Arc::from(node), interpolation, values: TrackValues::Scale(build_keyframes(times, values)?) })
    }

    pub fn property(&self) -> TrackProperty {
        match self.values {
            TrackValues::Translation(_) => TrackProperty::Translation,
            TrackValues::Rotation(_) => TrackProperty::Rotation,
            TrackValues::Scale(_) => TrackProperty::Scale,
        }
    }

    pub fn end_time(&self) -> f32 {
        let end = match &self.values {
            TrackValues::Translation(frames) | TrackValues::Scale(frames) => frames.last().map(|kf| kf.time),
            TrackValues::Rotation(frames) => frames.last().map(|kf| kf.time),
        };
        end.unwrap_or(0.0)
    }

    pub fn sample(&self, time: f32) -> Option<TrackSample> {
        match &self.values {
            TrackValues::Translation(frames) | TrackValues::Scale(frames) => {
                sample_frames(&frames[..], self.interpolation, time, |a: Vec3, b: Vec3, t| a.lerp(b, t)).map(TrackSample::Vector)
            }
            TrackValues::Rotation(frames) => {
                sample_frames(&frames[..], self.interpolation, time, |a: Quat, b: Quat, t| a.slerp(b, t)).map(TrackSample::Rotation)
            }
        }
    }
}

/// Named, time-parameterised animation over a node hierarchy.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: Arc<str>,
    pub duration: f32,
    pub tracks: Arc<[NodeTrack]>,
}

impl AnimationClip {
    pub fn new(name: &str, tracks: Vec<NodeTrack>) -> Self {
        let duration = tracks.iter().map(NodeTrack::end_time).fold(0.0_f32, f32::max);
        Self { name: Arc::from(name), duration, tracks: Arc::from(tracks.into_boxed_slice()) }
    }

    /// Clip without tracks; plays for zero seconds.
    pub fn empty(name: &str) -> Self {
        Self::new(name, Vec::new())
    }
}

fn sample_frames<T: Copy>(
    frames: &[ClipKeyframe<T>],
    interpolation: ClipInterpolation,
    time: f32,
    mix: impl Fn(T, T, f32) -> T,
) -> Option<T> {
    let first = frames.first()?;
    if frames.len() == 1 || time <= first.time {
        return Some(first.value);
    }
    let last = frames[frames.len() - 1];
    if time >= last.time {
        return Some(last.value);
    }
    // First keyframe strictly after `time`; guaranteed in 1..len by the checks above.
    let next = frames.partition_point(|kf| kf.time <= time);
    let a = frames[next - 1];
    let b = frames[next];
    match interpolation {
        ClipInterpolation::Step => Some(a.value),
        ClipInterpolation::Linear => {
            let span = b.time - a.time;
            let t = if span > 0.0 { (time - a.time) / span } else { 0.0 };
            Some(mix(a.value, b.value, t))
        }
    }
}

fn build_keyframes<T: Clone>(times: &[f32], values: Vec<T>) -> Result<Arc<[ClipKeyframe<T>]>> {
    if times.len() != values.len() {
        bail!("Animation channel time/value count mismatch ({} vs {})", times.len(), values.len());
    }
    if times.is_empty() {
        bail!("Animation channel must contain at least one keyframe");
    }
    let mut frames: Vec<ClipKeyframe<T>> = Vec::with_capacity(times.len());
    for (time, value) in times.iter().copied().zip(values) {
        if !time.is_finite() {
            bail!("Animation channel contains non-finite time value");
        }
        if time < 0.0 {
            bail!("Animation channel time cannot be negative");
        }
        if let Some(last) = frames.last_mut() {
            if time < last.time {
                bail!("Animation channel times must be ascending");
            }
            if (time - last.time).abs() <= f32::EPSILON {
                last.value = value;
                continue;
            }
        }
        frames.push(ClipKeyframe { time, value });
    }
    Ok(Arc::from(frames.into_boxed_slice()))
}
