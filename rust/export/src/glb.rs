// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary glTF (GLB) writer and reader
//!
//! Layout:
//! - root node `hexmass_root` carrying the axis correction and unit scale
//! - one child node and mesh per volume, in scene order
//! - one primitive per material with flat `POSITION`/`NORMAL`, a custom
//!   `_ANCHOR` attribute holding each face's orientation reference, and u32
//!   triangle-fan indices
//!
//! Coordinates in the buffers are plan feet, z up. Exact footprints and the
//! scene contracts travel in `extras` so a file can be validated without
//! regenerating it.

use crate::error::{ExportError, Result};
use crate::gltf::*;
use hexmass_geometry::{Face, Material, Point3, Scene, Vector3, Volume};
use nalgebra::UnitQuaternion;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::Path;

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

pub const ROOT_NODE: &str = "hexmass_root";
pub const ANCHOR_ATTRIBUTE: &str = "_ANCHOR";

/// Largest plan distance between a read-back vertex and the footprint corner
/// it came from; covers f32 rounding at site scale.
const CORNER_RESTORE: f64 = 1e-3;

/// PBR factors: base colour, metallic, roughness, blended, double sided.
fn material_def(material: Material) -> MaterialDef {
    let (color, metallic, roughness, blend) = match material {
        Material::Concrete => ([0.70, 0.70, 0.72, 1.0], 0.0, 0.85, false),
        Material::Glass => ([0.62, 0.79, 0.90, 0.35], 0.0, 0.05, true),
        Material::Ground => ([0.18, 0.43, 0.20, 1.0], 0.0, 1.0, false),
        Material::Marble => ([0.92, 0.90, 0.87, 1.0], 0.0, 0.15, false),
    };
    MaterialDef {
        name: material.name().to_string(),
        pbr_metallic_roughness: Pbr {
            base_color_factor: color,
            metallic_factor: metallic,
            roughness_factor: roughness,
        },
        alpha_mode: blend.then(|| "BLEND".to_string()),
        double_sided: blend,
    }
}

/// Accumulates buffer views and accessors over one binary buffer.
#[derive(Default)]
struct BufferBuilder {
    bytes: Vec<u8>,
    views: Vec<BufferView>,
    accessors: Vec<Accessor>,
}

impl BufferBuilder {
    fn push_view(&mut self, data: &[u8], target: u32) -> usize {
        let view = BufferView {
            buffer: 0,
            byte_offset: self.bytes.len(),
            byte_length: data.len(),
            target,
        };
        self.bytes.extend_from_slice(data);
        self.views.push(view);
        self.views.len() - 1
    }

    fn push_vec3(&mut self, values: &[[f32; 3]], bounds: bool) -> usize {
        let view = self.push_view(bytemuck::cast_slice(values), TARGET_ARRAY_BUFFER);
        let (min, max) = if bounds {
            let mut min = [f32::MAX; 3];
            let mut max = [f32::MIN; 3];
            for v in values {
                for k in 0..3 {
                    min[k] = min[k].min(v[k]);
                    max[k] = max[k].max(v[k]);
                }
            }
            (Some(min.to_vec()), Some(max.to_vec()))
        } else {
            (None, None)
        };
        self.accessors.push(Accessor {
            buffer_view: view,
            component_type: COMPONENT_FLOAT,
            count: values.len(),
            kind: "VEC3".to_string(),
            min,
            max,
        });
        self.accessors.len() - 1
    }

    fn push_indices(&mut self, indices: &[u32]) -> usize {
        let view = self.push_view(bytemuck::cast_slice(indices), TARGET_ELEMENT_ARRAY_BUFFER);
        self.accessors.push(Accessor {
            buffer_view: view,
            component_type: COMPONENT_UNSIGNED_INT,
            count: indices.len(),
            kind: "SCALAR".to_string(),
            min: None,
            max: None,
        });
        self.accessors.len() - 1
    }
}

fn to_f32(p: &Point3<f64>) -> [f32; 3] {
    [p.x as f32, p.y as f32, p.z as f32]
}

fn vec_to_f32(v: &Vector3<f64>) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

/// Flat-shaded primitive for every face of one material.
fn write_primitive(
    volume: &Volume,
    faces: &[(usize, &Face)],
    material: Material,
    buffer: &mut BufferBuilder,
) -> Primitive {
    let vertices = volume.vertices();
    let centroid = volume.centroid();
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut anchors = Vec::new();
    let mut indices = Vec::new();
    let mut extras = PrimitiveExtras::default();

    for (k, (_, face)) in faces.iter().enumerate() {
        let base = positions.len() as u32;
        let normal = face
            .normal(vertices)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::z);
        let anchor = to_f32(&face.anchor.unwrap_or(centroid));
        for &i in &face.indices {
            positions.push(to_f32(&vertices[i as usize]));
            normals.push(vec_to_f32(&normal));
            anchors.push(anchor);
        }
        let n = face.indices.len() as u32;
        for j in 1..n.saturating_sub(1) {
            indices.extend_from_slice(&[base, base + j, base + j + 1]);
        }
        extras.face_sizes.push(face.indices.len());
        if !face.outward {
            extras.unverified_faces.push(k);
        }
    }

    let mut attributes = BTreeMap::new();
    attributes.insert("POSITION".to_string(), buffer.push_vec3(&positions, true));
    attributes.insert("NORMAL".to_string(), buffer.push_vec3(&normals, false));
    attributes.insert(ANCHOR_ATTRIBUTE.to_string(), buffer.push_vec3(&anchors, false));
    let indices = buffer.push_indices(&indices);

    Primitive {
        attributes,
        indices,
        material: material_index(material),
        mode: MODE_TRIANGLES,
        extras,
    }
}

fn material_index(material: Material) -> usize {
    Material::ALL
        .iter()
        .position(|&m| m == material)
        .unwrap_or(0)
}

/// Encode the scene as GLB bytes. The output depends only on the scene.
pub fn write_glb(scene: &Scene) -> Result<Vec<u8>> {
    let mut buffer = BufferBuilder::default();
    let mut nodes = vec![Node::default()];
    let mut meshes = Vec::with_capacity(scene.volumes().len());

    for volume in scene.volumes() {
        let mut primitives = Vec::new();
        for material in Material::ALL {
            let faces: Vec<(usize, &Face)> = volume
                .faces()
                .iter()
                .enumerate()
                .filter(|(_, f)| f.material == material)
                .collect();
            if !faces.is_empty() {
                primitives.push(write_primitive(volume, &faces, material, &mut buffer));
            }
        }
        meshes.push(Mesh {
            name: volume.name().to_string(),
            primitives,
        });
        nodes.push(Node {
            name: volume.name().to_string(),
            mesh: Some(meshes.len() - 1),
            extras: Some(NodeExtras {
                outline: volume.outline().to_string(),
                normal_rule: volume.normal_rule(),
                footprint: volume.footprint().clone(),
            }),
            ..Node::default()
        });
    }

    let rotation = UnitQuaternion::from_axis_angle(
        &Vector3::x_axis(),
        scene.axis_correction_degrees().to_radians(),
    );
    let q = rotation.coords;
    let k = scene.export_unit_scale();
    nodes[0] = Node {
        name: ROOT_NODE.to_string(),
        children: (1..nodes.len()).collect(),
        rotation: Some([q.x, q.y, q.z, q.w]),
        scale: Some([k, k, k]),
        ..Node::default()
    };

    let BufferBuilder {
        bytes,
        views,
        accessors,
    } = buffer;
    let document = Document {
        asset: Asset {
            version: "2.0".to_string(),
            generator: format!("hexmass {}", env!("CARGO_PKG_VERSION")),
            extras: Some(AssetExtras {
                units: scene.units().to_string(),
                axis_correction_degrees: scene.axis_correction_degrees(),
                export_unit_scale: scene.export_unit_scale(),
                tolerances: *scene.tolerances(),
                contracts: scene.contracts().clone(),
            }),
        },
        scene: 0,
        scenes: vec![SceneDef {
            name: "hexmass".to_string(),
            nodes: vec![0],
        }],
        nodes,
        meshes,
        materials: Material::ALL.iter().map(|&m| material_def(m)).collect(),
        accessors,
        buffer_views: views,
        buffers: vec![Buffer {
            byte_length: bytes.len(),
        }],
    };

    let glb = assemble(&serde_json::to_vec(&document)?, &bytes)?;
    tracing::info!(
        volumes = scene.volumes().len(),
        faces = scene.face_count(),
        bytes = glb.len(),
        "Encoded GLB"
    );
    Ok(glb)
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

fn chunk_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ExportError::malformed("GLB", "chunk exceeds 4 GiB"))
}

fn assemble(json: &[u8], bin: &[u8]) -> Result<Vec<u8>> {
    let json_len = padded_len(json.len());
    let bin_len = padded_len(bin.len());
    let total = 12 + 8 + json_len + 8 + bin_len;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&chunk_len(total)?.to_le_bytes());

    out.extend_from_slice(&chunk_len(json_len)?.to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(json);
    out.resize(out.len() + json_len - json.len(), b' ');

    out.extend_from_slice(&chunk_len(bin_len)?.to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(bin);
    out.resize(out.len() + bin_len - bin.len(), 0);
    Ok(out)
}

pub fn write_glb_file(scene: &Scene, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = write_glb(scene)?;
    std::fs::write(path, bytes).map_err(|e| ExportError::io(path, e))?;
    tracing::info!(path = %path.display(), "Wrote GLB");
    Ok(())
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| ExportError::malformed("GLB", format!("truncated at byte {}", offset)))
}

/// Split a GLB container into its JSON and binary chunks.
fn split_chunks(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    if read_u32(bytes, 0)? != GLB_MAGIC {
        return Err(ExportError::malformed("GLB", "bad magic"));
    }
    let version = read_u32(bytes, 4)?;
    if version != GLB_VERSION {
        return Err(ExportError::malformed("GLB", format!("unsupported version {}", version)));
    }
    let total = (read_u32(bytes, 8)? as usize).min(bytes.len());

    let mut json = None;
    let mut bin: &[u8] = &[];
    let mut offset = 12;
    while offset + 8 <= total {
        let len = read_u32(bytes, offset)? as usize;
        let kind = read_u32(bytes, offset + 4)?;
        let data = bytes
            .get(offset + 8..offset + 8 + len)
            .ok_or_else(|| ExportError::malformed("GLB", "chunk runs past the end"))?;
        match kind {
            CHUNK_JSON => json = Some(data),
            CHUNK_BIN => bin = data,
            _ => {}
        }
        offset += 8 + len;
    }
    let json = json.ok_or_else(|| ExportError::malformed("GLB", "missing JSON chunk"))?;
    Ok((json, bin))
}

fn accessor_bytes<'a>(document: &Document, bin: &'a [u8], index: usize) -> Result<(&'a [u8], usize)> {
    let accessor = document
        .accessors
        .get(index)
        .ok_or_else(|| ExportError::malformed("GLB", format!("missing accessor {}", index)))?;
    let view = document
        .buffer_views
        .get(accessor.buffer_view)
        .ok_or_else(|| ExportError::malformed("GLB", "missing buffer view"))?;
    let data = bin
        .get(view.byte_offset..view.byte_offset + view.byte_length)
        .ok_or_else(|| ExportError::malformed("GLB", "buffer view out of range"))?;
    Ok((data, accessor.count))
}

fn read_vec3(document: &Document, bin: &[u8], index: usize) -> Result<Vec<[f32; 3]>> {
    let (data, count) = accessor_bytes(document, bin, index)?;
    if data.len() < count * 12 {
        return Err(ExportError::malformed("GLB", "VEC3 accessor too short"));
    }
    Ok(data
        .chunks_exact(12)
        .take(count)
        .map(|c| {
            let f = |k: usize| f32::from_le_bytes([c[k], c[k + 1], c[k + 2], c[k + 3]]);
            [f(0), f(4), f(8)]
        })
        .collect())
}

fn attribute(primitive: &Primitive, name: &str) -> Result<usize> {
    primitive
        .attributes
        .get(name)
        .copied()
        .ok_or_else(|| ExportError::malformed("GLB", format!("primitive lacks {}", name)))
}

/// Rebuild one volume from its node.
fn read_volume(document: &Document, bin: &[u8], node: &Node) -> Result<Volume> {
    let extras = node
        .extras
        .as_ref()
        .ok_or_else(|| ExportError::malformed("GLB", format!("node {} has no extras", node.name)))?;
    let mesh = node
        .mesh
        .and_then(|m| document.meshes.get(m))
        .ok_or_else(|| ExportError::malformed("GLB", format!("node {} has no mesh", node.name)))?;

    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut lookup: FxHashMap<[u32; 3], u32> = FxHashMap::default();
    let mut faces = Vec::new();

    for primitive in &mesh.primitives {
        let material = Material::ALL
            .get(primitive.material)
            .copied()
            .ok_or_else(|| ExportError::malformed("GLB", "unknown material index"))?;
        let positions = read_vec3(document, bin, attribute(primitive, "POSITION")?)?;
        let anchors = read_vec3(document, bin, attribute(primitive, ANCHOR_ATTRIBUTE)?)?;

        let mut cursor = 0;
        for (k, &size) in primitive.extras.face_sizes.iter().enumerate() {
            let corners = positions
                .get(cursor..cursor + size)
                .ok_or_else(|| ExportError::malformed("GLB", "face sizes exceed positions"))?;
            let indices: Vec<u32> = corners
                .iter()
                .map(|p| {
                    let key = [p[0].to_bits(), p[1].to_bits(), p[2].to_bits()];
                    *lookup.entry(key).or_insert_with(|| {
                        vertices.push(Point3::new(p[0] as f64, p[1] as f64, p[2] as f64));
                        (vertices.len() - 1) as u32
                    })
                })
                .collect();
            let a = anchors
                .get(cursor)
                .ok_or_else(|| ExportError::malformed("GLB", "face sizes exceed anchors"))?;
            let mut face = Face::new(&indices, material)
                .with_anchor(Point3::new(a[0] as f64, a[1] as f64, a[2] as f64));
            face.outward = !primitive.extras.unverified_faces.contains(&k);
            faces.push(face);
            cursor += size;
        }
    }

    restore_corners(&mut vertices, &extras.footprint);
    Ok(Volume::new(
        node.name.clone(),
        extras.outline.clone(),
        extras.normal_rule,
        extras.footprint.clone(),
        vertices,
        faces,
    ))
}

/// Put f32-rounded vertices back onto the exact footprint corners.
fn restore_corners(vertices: &mut [Point3<f64>], footprint: &hexmass_geometry::Footprint) {
    let corners: Vec<_> = footprint.rings().flatten().copied().collect();
    for v in vertices {
        let nearest = corners
            .iter()
            .map(|c| (c, (c.x - v.x).hypot(c.y - v.y)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((c, d)) = nearest {
            if d <= CORNER_RESTORE {
                v.x = c.x;
                v.y = c.y;
            }
        }
    }
}

/// Decode a GLB written by [`write_glb`] back into a scene.
pub fn read_glb(bytes: &[u8]) -> Result<Scene> {
    let (json, bin) = split_chunks(bytes)?;
    let document: Document = serde_json::from_slice(json)?;
    let extras = document
        .asset
        .extras
        .clone()
        .ok_or_else(|| ExportError::malformed("GLB", "asset carries no scene metadata"))?;

    let root = document
        .nodes
        .iter()
        .find(|n| n.name == ROOT_NODE)
        .ok_or_else(|| ExportError::malformed("GLB", "missing root node"))?;
    let mut volumes = Vec::with_capacity(root.children.len());
    for &child in &root.children {
        let node = document
            .nodes
            .get(child)
            .ok_or_else(|| ExportError::malformed("GLB", format!("missing node {}", child)))?;
        volumes.push(read_volume(&document, bin, node)?);
    }

    tracing::debug!(volumes = volumes.len(), "Decoded GLB");
    Ok(Scene::new(extras.tolerances, extras.contracts, volumes)
        .with_export_frame(extras.axis_correction_degrees, extras.export_unit_scale)
        .with_units(extras.units))
}

pub fn read_glb_file(path: impl AsRef<Path>) -> Result<Scene> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ExportError::io(path, e))?;
    read_glb(&bytes)
}
