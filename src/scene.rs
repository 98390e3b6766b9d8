use crate::assets::ModelNode;
use crate::color::Color;
use crate::environment::SharedEnvironment;
use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;
use std::sync::Arc;

#[derive(Component, Clone)]
pub struct SceneNode {
    pub name: Arc<str>,
}

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform3D {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Transform3D {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Self::default() }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Component, Clone, Copy)]
pub struct Parent(pub Entity);

#[derive(Component, Default, Clone)]
pub struct Children(pub Vec<Entity>);

/// Morph target names in index order and their current influences.
#[derive(Component, Clone, Debug, Default, PartialEq)]
pub struct MorphTargets {
    pub names: Vec<String>,
    pub influences: Vec<f32>,
}

impl MorphTargets {
    pub fn new(names: Vec<String>) -> Self {
        let influences = vec![0.0; names.len()];
        Self { names, influences }
    }
}

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Directional { color: Color, intensity: f32 },
    Hemisphere { sky: Color, ground: Color, intensity: f32 },
}

/// Flat-shaded marker the renderer draws at the node's world position.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Renderable {
    pub color: Color,
    pub opacity: f32,
    pub extent: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub color: Color,
    pub near: f32,
    pub far: f32,
}

/// Node reached from the root during traversal, with its accumulated world matrix.
#[derive(Clone, Copy, Debug)]
pub struct VisibleNode {
    pub entity: Entity,
    pub world: Mat4,
    pub renderable: Option<Renderable>,
}

/// Arena-backed scene tree. Every node lives in the ECS world for the whole session; only the
/// nodes reachable from `root` are part of the rendered scene.
pub struct SceneGraph {
    world: World,
    root: Entity,
    pub background: Color,
    pub fog: Option<Fog>,
    pub environment: Option<SharedEnvironment>,
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut world = World::new();
        let root = world
            .spawn((SceneNode { name: Arc::from("Scene") }, Transform3D::default(), Children::default()))
            .id();
        Self { world, root, background: Color::WHITE, fog: None, environment: None }
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    /// Spawns a detached node.
    pub fn spawn(&mut self, name: &str, transform: Transform3D) -> Entity {
        self.world.spawn((SceneNode { name: Arc::from(name) }, transform, Children::default())).id()
    }

    /// Spawns a model hierarchy and returns its (detached) root.
    pub fn spawn_model(&mut self, model: &ModelNode) -> Entity {
        let entity = self.spawn(&model.name, model.transform);
        if let Some(names) = &model.morph_targets {
            let mut morph = MorphTargets::new(names.clone());
            for (slot, weight) in morph.influences.iter_mut().zip(model.morph_weights.iter()) {
                *slot = *weight;
            }
            self.world.entity_mut(entity).insert(morph);
        }
        if let Some(color) = model.color {
            self.world.entity_mut(entity).insert(Renderable { color, opacity: 1.0, extent: 0.1 });
        }
        for child in &model.children {
            let child_entity = self.spawn_model(child);
            self.set_parent(child_entity, entity);
        }
        entity
    }

    pub fn insert_light(&mut self, entity: Entity, light: Light) {
        self.world.entity_mut(entity).insert(light);
    }

    pub fn insert_renderable(&mut self, entity: Entity, renderable: Renderable) {
        self.world.entity_mut(entity).insert(renderable);
    }

    /// Moves `child` under `parent`. Refused (returns false) when `parent` is `child` itself or
    /// one of its descendants.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> bool {
        if self.is_ancestor_or_self(child, parent) {
            log::warn!(target: "stage", "refusing to parent {child:?} under its own subtree");
            return false;
        }
        self.detach(child);
        if let Some(mut children) = self.world.get_mut::<Children>(parent) {
            children.0.push(child);
        } else {
            self.world.entity_mut(parent).insert(Children(vec![child]));
        }
        self.world.entity_mut(child).insert(Parent(parent));
        true
    }

    fn is_ancestor_or_self(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = Some(entity);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Attaches `child` directly under the root. Re-adding an attached node keeps a single entry.
    pub fn add(&mut self, child: Entity) {
        self.set_parent(child, self.root);
    }

    /// Detaches `child` if it hangs directly under the root. The node itself is kept alive.
    pub fn remove(&mut self, child: Entity) -> bool {
        match self.world.get::<Parent>(child) {
            Some(Parent(parent)) if *parent == self.root => self.detach(child),
            _ => false,
        }
    }

    fn detach(&mut self, child: Entity) -> bool {
        let Some(Parent(parent)) = self.world.get::<Parent>(child).copied() else {
            return false;
        };
        if let Some(mut children) = self.world.get_mut::<Children>(parent) {
            children.0.retain(|entry| *entry != child);
        }
        self.world.entity_mut(child).remove::<Parent>();
        true
    }

    /// True when `entity` is reachable from the root.
    pub fn contains(&self, entity: Entity) -> bool {
        let mut current = entity;
        loop {
            if current == self.root {
                return true;
            }
            match self.world.get::<Parent>(current) {
                Some(Parent(parent)) => current = *parent,
                None => return false,
            }
        }
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<Parent>(entity).map(|p| p.0)
    }

    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.world.get::<Children>(entity).map(|c| c.0.as_slice()).unwrap_or(&[])
    }

    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.world.get::<SceneNode>(entity).map(|node| node.name.as_ref())
    }

    /// Depth-first search starting at (and including) `from`.
    pub fn find_by_name(&self, from: Entity, name: &str) -> Option<Entity> {
        let mut stack: SmallVec<[Entity; 32]> = SmallVec::new();
        stack.push(from);
        while let Some(entity) = stack.pop() {
            if self.name(entity) == Some(name) {
                return Some(entity);
            }
            stack.extend(self.children(entity).iter().rev().copied());
        }
        None
    }

    /// `from` followed by all of its descendants in depth-first order.
    pub fn descendants(&self, from: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut stack: SmallVec<[Entity; 32]> = SmallVec::new();
        stack.push(from);
        while let Some(entity) = stack.pop() {
            out.push(entity);
            stack.extend(self.children(entity).iter().rev().copied());
        }
        out
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform3D> {
        self.world.get::<Transform3D>(entity).copied()
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform3D) {
        if let Some(mut current) = self.world.get_mut::<Transform3D>(entity) {
            *current = transform;
        }
    }

    pub fn morph_targets(&self, entity: Entity) -> Option<&MorphTargets> {
        self.world.get::<MorphTargets>(entity)
    }

    pub fn morph_targets_mut(&mut self, entity: Entity) -> Option<Mut<'_, MorphTargets>> {
        self.world.get_mut::<MorphTargets>(entity)
    }

    pub fn light(&self, entity: Entity) -> Option<Light> {
        self.world.get::<Light>(entity).copied()
    }

    pub fn light_mut(&mut self, entity: Entity) -> Option<Mut<'_, Light>> {
        self.world.get_mut::<Light>(entity)
    }

    /// Walks the attached tree and accumulates world matrices.
    pub fn visible_nodes(&self) -> Vec<VisibleNode> {
        let mut out = Vec::new();
        let mut stack: SmallVec<[(Entity, Mat4); 64]> = SmallVec::new();
        stack.push((self.root, Mat4::IDENTITY));
        while let Some((entity, parent_world)) = stack.pop() {
            let local = self.transform(entity).map(|t| t.matrix()).unwrap_or(Mat4::IDENTITY);
            let world = parent_world * local;
            out.push(VisibleNode { entity, world, renderable: self.world.get::<Renderable>(entity).copied() });
            for child in self.children(entity).iter().rev() {
                stack.push((*child, world));
            }
        }
        out
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str, children: Vec<ModelNode>) -> ModelNode {
        ModelNode { name: name.to_string(), children, ..ModelNode::default() }
    }

    #[test]
    fn parenting_under_own_subtree_is_refused() {
        let mut scene = SceneGraph::new();
        let body = scene.spawn("Body", Transform3D::default());
        let head = scene.spawn("Head", Transform3D::default());
        scene.add(body);
        assert!(scene.set_parent(head, body));
        assert!(!scene.set_parent(body, head));
        assert!(!scene.set_parent(body, body));
        assert!(!scene.set_parent(scene.root(), head));
        assert_eq!(scene.parent(body), Some(scene.root()));
        assert_eq!(scene.parent(head), Some(body));
        assert!(scene.contains(head));
    }

    #[test]
    fn add_and_remove_keep_node_alive() {
        let mut scene = SceneGraph::new();
        let prop = scene.spawn("prop", Transform3D::default());
        assert!(!scene.contains(prop));
        scene.add(prop);
        scene.add(prop);
        assert_eq!(scene.children(scene.root()), &[prop]);
        assert!(scene.remove(prop));
        assert!(!scene.contains(prop));
        assert_eq!(scene.name(prop), Some("prop"));
        assert!(!scene.remove(prop), "second removal is a no-op");
    }

    #[test]
    fn find_by_name_searches_descendants() {
        let mut scene = SceneGraph::new();
        let tree = model("Robot", vec![model("Body", vec![model("Head_4", vec![])]), model("Legs", vec![])]);
        let root = scene.spawn_model(&tree);
        let head = scene.find_by_name(root, "Head_4").expect("head");
        assert_eq!(scene.parent(head).and_then(|p| scene.name(p)), Some("Body"));
        assert!(scene.find_by_name(root, "Tail").is_none());
        assert_eq!(scene.descendants(root).len(), 4);
    }

    #[test]
    fn visible_nodes_accumulate_world_transforms() {
        let mut scene = SceneGraph::new();
        let parent = scene.spawn("parent", Transform3D::from_translation(Vec3::X));
        let child = scene.spawn("child", Transform3D::from_translation(Vec3::Y));
        scene.set_parent(child, parent);
        scene.add(parent);
        let nodes = scene.visible_nodes();
        let child_node = nodes.iter().find(|n| n.entity == child).expect("child visible");
        assert!((child_node.world.w_axis.truncate() - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
        scene.remove(parent);
        assert_eq!(scene.visible_nodes().len(), 1);
    }
}
