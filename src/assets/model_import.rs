use super::{ModelAsset, ModelNode};
use crate::animation::{AnimationClip, ClipInterpolation, NodeTrack};
use crate::color::Color;
use crate::scene::Transform3D;
use anyhow::{anyhow, Context, Result};
use glam::{Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::animation::{Interpolation, Property};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Morph target names are not part of core glTF; exporters store them in the mesh extras.
#[derive(Deserialize, Default)]
struct MeshExtras {
    #[serde(rename = "targetNames", default)]
    target_names: Vec<String>,
}

/// Imports the default scene of a glTF/GLB file: the node tree (names, TRS, morph targets, base
/// colors) and every node-transform animation.
pub fn load_model_from_gltf(path: impl AsRef<Path>) -> Result<ModelAsset> {
    let path_ref = path.as_ref();
    let (document, buffers, _) =
        gltf::import(path_ref).with_context(|| format!("Failed to import GLTF model from {}", path_ref.display()))?;

    let node_names: HashMap<usize, String> = document
        .nodes()
        .map(|node| {
            let name = node.name().map(|n| n.to_string()).unwrap_or_else(|| format!("node_{}", node.index()));
            (node.index(), name)
        })
        .collect();

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| anyhow!("GLTF '{}' does not contain a scene", path_ref.display()))?;
    let root_name = scene
        .name()
        .map(|n| n.to_string())
        .or_else(|| path_ref.file_stem().and_then(|stem| stem.to_str()).map(|stem| stem.to_string()))
        .unwrap_or_else(|| "model".to_string());
    let mut root = ModelNode::new(root_name);
    for node in scene.nodes() {
        root.children.push(convert_node(&node, &node_names));
    }

    let mut clips = Vec::new();
    for (anim_index, animation) in document.animations().enumerate() {
        let clip_name =
            animation.name().map(|n| n.to_string()).unwrap_or_else(|| format!("animation_{anim_index}"));
        let mut tracks = Vec::new();
        for channel in animation.channels() {
            let target_node = channel.target().node();
            let Some(node_name) = node_names.get(&target_node.index()) else {
                continue;
            };
            let interpolation = match channel.sampler().interpolation() {
                Interpolation::Linear => ClipInterpolation::Linear,
                Interpolation::Step => ClipInterpolation::Step,
                Interpolation::CubicSpline => {
                    log::warn!(
                        target: "assets",
                        "animation '{}' uses CubicSpline interpolation; skipping channel (node {}).",
                        clip_name,
                        target_node.index()
                    );
                    continue;
                }
            };
            let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(inputs) = reader.read_inputs() else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();
            let Some(outputs) = reader.read_outputs() else {
                continue;
            };
            let track = match (channel.target().property(), outputs) {
                (Property::Translation, ReadOutputs::Translations(values)) => {
                    NodeTrack::translation(node_name, interpolation, &times, values.map(Vec3::from_array).collect())
                }
                (Property::Scale, ReadOutputs::Scales(values)) => {
                    NodeTrack::scale(node_name, interpolation, &times, values.map(Vec3::from_array).collect())
                }
                (Property::Rotation, ReadOutputs::Rotations(rotations)) => {
                    let values = rotations.into_f32().map(Quat::from_array).collect();
                    NodeTrack::rotation(node_name, interpolation, &times, values)
                }
                // Morph weights are driven by the expression picker, not by clips.
                _ => continue,
            }
            .with_context(|| format!("Animation '{clip_name}' channel for node '{node_name}' is malformed"))?;
            tracks.push(track);
        }
        clips.push(Arc::new(AnimationClip::new(&clip_name, tracks)));
    }

    Ok(ModelAsset { root, clips })
}

fn convert_node(node: &gltf::Node<'_>, names: &HashMap<usize, String>) -> ModelNode {
    let (t, r, s) = node.transform().decomposed();
    let rotation = Quat::from_array(r);
    let transform = Transform3D {
        translation: Vec3::from_array(t),
        rotation: if rotation.length_squared() > 0.0 { rotation.normalize() } else { Quat::IDENTITY },
        scale: Vec3::from_array(s),
    };
    let mut model = ModelNode {
        name: names.get(&node.index()).cloned().unwrap_or_else(|| format!("node_{}", node.index())),
        transform,
        ..ModelNode::default()
    };
    if let Some(mesh) = node.mesh() {
        let target_count = mesh.primitives().map(|p| p.morph_targets().count()).max().unwrap_or(0);
        if target_count > 0 {
            let extras: MeshExtras = mesh
                .extras()
                .as_ref()
                .and_then(|raw| serde_json::from_str(raw.get()).ok())
                .unwrap_or_default();
            let mut target_names = extras.target_names;
            target_names.truncate(target_count);
            while target_names.len() < target_count {
                target_names.push(format!("morph_{}", target_names.len()));
            }
            let defaults = node.weights().or_else(|| mesh.weights()).unwrap_or(&[]);
            let mut weights = vec![0.0; target_count];
            for (slot, weight) in weights.iter_mut().zip(defaults.iter()) {
                *slot = *weight;
            }
            model.morph_targets = Some(target_names);
            model.morph_weights = weights;
        }
        if let Some(primitive) = mesh.primitives().next() {
            let [r, g, b, _] = primitive.material().pbr_metallic_roughness().base_color_factor();
            model.color = Some(Color::new(r, g, b));
        }
    }
    for child in node.children() {
        model.children.push(convert_node(&child, names));
    }
    model
}
