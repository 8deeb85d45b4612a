// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! glTF 2.0 JSON document, limited to what the GLB writer emits

use hexmass_core::Tolerances;
use hexmass_geometry::{Footprint, NormalRule, SceneContracts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const COMPONENT_FLOAT: u32 = 5126;
pub const COMPONENT_UNSIGNED_INT: u32 = 5125;
pub const TARGET_ARRAY_BUFFER: u32 = 34962;
pub const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;
pub const MODE_TRIANGLES: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub asset: Asset,
    pub scene: usize,
    pub scenes: Vec<SceneDef>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<MaterialDef>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Buffer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    pub generator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<AssetExtras>,
}

/// Scene-level metadata needed to validate a file without regenerating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetExtras {
    pub units: String,
    pub axis_correction_degrees: f64,
    pub export_unit_scale: f64,
    pub tolerances: Tolerances,
    pub contracts: SceneContracts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDef {
    pub name: String,
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f64; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<NodeExtras>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExtras {
    pub outline: String,
    pub normal_rule: NormalRule,
    pub footprint: Footprint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Primitive {
    pub attributes: BTreeMap<String, usize>,
    pub indices: usize,
    pub material: usize,
    pub mode: u32,
    pub extras: PrimitiveExtras,
}

/// Polygon structure lost by triangulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrimitiveExtras {
    /// Vertex count of each face, in buffer order
    pub face_sizes: Vec<usize>,
    /// Faces whose orientation was never verified
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unverified_faces: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDef {
    pub name: String,
    pub pbr_metallic_roughness: Pbr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_mode: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub double_sided: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pbr {
    pub base_color_factor: [f64; 4],
    pub metallic_factor: f64,
    pub roughness_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub target: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: usize,
}
