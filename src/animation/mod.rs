//! Clip playback: keyframed clips, per-clip actions with cross-fades, per-object mixers and
//! the driver that advances every mixer once per frame.

pub mod action;
pub mod clip;
pub mod driver;
pub mod mixer;

pub use action::{ClipAction, LoopMode};
pub use clip::{AnimationClip, ClipInterpolation, ClipKeyframe, NodeTrack, TrackProperty, TrackSample};
pub use driver::{AnimationDriver, ClipHandle, MixerHandle};
pub use mixer::AnimationMixer;
