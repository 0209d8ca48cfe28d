//! Mesh geometry as served by the pack JSON endpoint.
//!
//! A mesh is a list of parts; each part holds groups of objects, and every object
//! carries one or more DMA chains of vertex blocks:
//!
//! `Parts[] -> Groups[] -> Objects[] -> Blocks[chain][block]`
//!
//! Each block is a triangle strip. A vertex whose `Skip` flag is set does not close a
//! triangle (it restarts the strip), which is how the console packets encode several
//! strips in one block. We expand strips into plain triangle lists here so renderers
//! never see the skip encoding.
//!
//! Vertex colours (`Blend`) use the console scale where `0x80` is full intensity and
//! full opacity. They are passed through unscaled.

use serde::Deserialize;

use crate::scene::MeshSegment;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Mesh {
    #[serde(deserialize_with = "null_as_default")]
    pub parts: Vec<MeshPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MeshPart {
    #[serde(deserialize_with = "null_as_default")]
    pub groups: Vec<MeshGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MeshGroup {
    #[serde(deserialize_with = "null_as_default")]
    pub objects: Vec<MeshObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MeshObject {
    pub material_id: u8,
    #[serde(deserialize_with = "null_as_default")]
    pub blocks: Vec<Vec<MeshBlock>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MeshBlock {
    pub uvs: BlockUvs,
    pub trias: BlockTrias,
    pub norms: BlockNorms,
    pub blend: BlockBlend,
    pub has_transparent_blending: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlockUvs {
    #[serde(rename = "U", deserialize_with = "null_as_default")]
    pub u: Vec<f32>,
    #[serde(rename = "V", deserialize_with = "null_as_default")]
    pub v: Vec<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlockTrias {
    #[serde(rename = "X", deserialize_with = "null_as_default")]
    pub x: Vec<f32>,
    #[serde(rename = "Y", deserialize_with = "null_as_default")]
    pub y: Vec<f32>,
    #[serde(rename = "Z", deserialize_with = "null_as_default")]
    pub z: Vec<f32>,
    #[serde(rename = "Skip", deserialize_with = "null_as_default")]
    pub skip: Vec<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlockNorms {
    #[serde(rename = "X", deserialize_with = "null_as_default")]
    pub x: Vec<f32>,
    #[serde(rename = "Y", deserialize_with = "null_as_default")]
    pub y: Vec<f32>,
    #[serde(rename = "Z", deserialize_with = "null_as_default")]
    pub z: Vec<f32>,
}

/// Per-vertex RGBA. Stored as `u16` on the wire, values fit in a byte.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlockBlend {
    #[serde(rename = "R", deserialize_with = "null_as_default")]
    pub r: Vec<u16>,
    #[serde(rename = "G", deserialize_with = "null_as_default")]
    pub g: Vec<u16>,
    #[serde(rename = "B", deserialize_with = "null_as_default")]
    pub b: Vec<u16>,
    #[serde(rename = "A", deserialize_with = "null_as_default")]
    pub a: Vec<u16>,
}

/// Colour used for vertices the block carries no `Blend` entry for.
pub const NEUTRAL_BLEND: [u8; 4] = [0x80; 4];

/// Go marshals nil slices as `null`; treat that like an empty list.
pub(crate) fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

impl MeshBlock {
    /// Number of strip vertices (the shortest coordinate column wins).
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.trias
            .x
            .len()
            .min(self.trias.y.len())
            .min(self.trias.z.len())
    }

    /// Expand the strip into a triangle-list segment.
    ///
    /// Returns `None` for blocks that produce no triangles.
    pub fn to_segment(&self, material_id: Option<usize>) -> Option<MeshSegment> {
        let n = self.vertex_count();
        let t = &self.trias;

        let positions: Vec<[f32; 3]> = (0..n).map(|i| [t.x[i], t.y[i], t.z[i]]).collect();
        let uvs: Vec<[f32; 2]> = (0..n)
            .map(|i| {
                [
                    self.uvs.u.get(i).copied().unwrap_or(0.0),
                    self.uvs.v.get(i).copied().unwrap_or(0.0),
                ]
            })
            .collect();
        let normals: Vec<[f32; 3]> = (0..n)
            .map(|i| {
                let nm = &self.norms;
                [
                    nm.x.get(i).copied().unwrap_or(0.0),
                    nm.y.get(i).copied().unwrap_or(0.0),
                    nm.z.get(i).copied().unwrap_or(0.0),
                ]
            })
            .collect();
        let colors: Vec<[u8; 4]> = (0..n).map(|i| self.blend.color(i)).collect();

        let indices = strip_to_triangles(n, &t.skip);
        if indices.is_empty() {
            return None;
        }

        Some(MeshSegment {
            positions,
            uvs,
            normals,
            colors,
            indices,
            material_id,
            transparent: self.has_transparent_blending,
        })
    }
}

impl BlockBlend {
    /// Colour of vertex `i`; missing channels fall back to [`NEUTRAL_BLEND`].
    pub fn color(&self, i: usize) -> [u8; 4] {
        let ch = |v: &[u16], k: usize| {
            v.get(i)
                .map_or(NEUTRAL_BLEND[k], |&c| u8::try_from(c).unwrap_or(u8::MAX))
        };
        [ch(&self.r, 0), ch(&self.g, 1), ch(&self.b, 2), ch(&self.a, 3)]
    }
}

/// Convert a triangle strip with per-vertex skip flags into triangle-list indices.
///
/// Vertex `i >= 2` closes triangle `(i-2, i-1, i)` unless `skip[i]` is set. Winding
/// alternates with strip parity so every emitted triangle faces the same way.
pub fn strip_to_triangles(vertex_count: usize, skip: &[bool]) -> Vec<u32> {
    let mut out = Vec::with_capacity(vertex_count.saturating_sub(2) * 3);
    for i in 2..vertex_count {
        if skip.get(i).copied().unwrap_or(false) {
            continue;
        }
        let (a, b, c) = (i as u32 - 2, i as u32 - 1, i as u32);
        if i % 2 == 0 {
            out.extend_from_slice(&[a, b, c]);
        } else {
            out.extend_from_slice(&[b, a, c]);
        }
    }
    out
}

impl MeshPart {
    /// Flatten every object block of this part into renderable segments.
    ///
    /// Segments keep the object's pack material id until a caller assigns model slots.
    pub fn to_segments(&self) -> Vec<MeshSegment> {
        let mut out = Vec::new();
        for object in self.groups.iter().flat_map(|g| g.objects.iter()) {
            let material_id = Some(object.material_id as usize);
            for block in object.blocks.iter().flatten() {
                if let Some(seg) = block.to_segment(material_id) {
                    out.push(seg);
                }
            }
        }
        out
    }
}
