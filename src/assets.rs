use crate::animation::AnimationClip;
use crate::color::Color;
use crate::scene::Transform3D;
use std::sync::Arc;

pub mod model_import;

pub use model_import::load_model_from_gltf;

/// Owned node tree of an imported model, spawned into the scene graph as one hierarchy.
#[derive(Clone, Debug, Default)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform3D,
    /// Morph target names in index order, present on morphable meshes only.
    pub morph_targets: Option<Vec<String>>,
    pub morph_weights: Vec<f32>,
    /// Base color of the node's mesh, when it has one.
    pub color: Option<Color>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn with_child(mut self, child: ModelNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_morph_targets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.morph_weights = vec![0.0; names.len()];
        self.morph_targets = Some(names);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ModelNode::node_count).sum::<usize>()
    }
}

/// Parsed mesh + animation bundle.
#[derive(Clone, Debug)]
pub struct ModelAsset {
    pub root: ModelNode,
    pub clips: Vec<Arc<AnimationClip>>,
}

impl ModelAsset {
    pub fn clip(&self, name: &str) -> Option<&Arc<AnimationClip>> {
        self.clips.iter().find(|clip| clip.name.as_ref() == name)
    }

    pub fn first_clip(&self) -> Option<&Arc<AnimationClip>> {
        self.clips.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_morph_targets_and_weights() {
        let head = ModelNode::new("Head_4").with_morph_targets(["Angry", "Surprised"]);
        assert_eq!(head.morph_targets.as_deref(), Some(&["Angry".to_string(), "Surprised".to_string()][..]));
        assert_eq!(head.morph_weights, vec![0.0, 0.0]);
        let robot = ModelNode::new("Robot").with_child(ModelNode::new("Body").with_child(head));
        assert_eq!(robot.node_count(), 3);
    }

    #[test]
    fn clip_lookup_by_name() {
        let asset = ModelAsset {
            root: ModelNode::new("Robot"),
            clips: vec![Arc::new(AnimationClip::empty("Dance")), Arc::new(AnimationClip::empty("Idle"))],
        };
        assert_eq!(asset.clip("Idle").map(|c| c.name.as_ref()), Some("Idle"));
        assert!(asset.clip("Jump").is_none());
        assert_eq!(asset.first_clip().map(|c| c.name.as_ref()), Some("Dance"));
    }
}
