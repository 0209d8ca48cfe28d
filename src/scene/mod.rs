//! Scene abstractions consumed by the label interpreter.
//!
//! The renderer that finally draws a label is an external collaborator. This module
//! describes only what the interpreter hands over to it:
//! - models (mesh segments + materials + a placement matrix)
//! - materials that share decoded textures
//! - a `SceneSink` seam that receives models and redraw requests
//!
//! Conventions:
//! - Units are label units (fixed-point pack values already divided by 16).
//! - Matrices are column-major 4x4 with column vectors, `world_from_local = parent * local`.
//! - Shared materials are reference counted (`Rc`), so identity can be checked with
//!   `Rc::ptr_eq` and a material is never rebuilt for the same texture.

pub mod texture;

use std::rc::Rc;

pub use texture::{Texture, TextureError};

/// 3D affine transform stored as a 4x4 matrix in column-major order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    /// Column-major 4x4 matrix.
    pub m: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    #[inline]
    pub fn translate(tx: f32, ty: f32, tz: f32) -> Self {
        let mut out = Self::IDENTITY;
        out.m[3] = [tx, ty, tz, 1.0];
        out
    }

    #[inline]
    pub fn scale(sx: f32, sy: f32, sz: f32) -> Self {
        Self {
            m: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[inline]
    pub fn scale_uniform(s: f32) -> Self {
        Self::scale(s, s, s)
    }

    /// Compose transforms: `self * rhs`.
    ///
    /// With column-vector convention `rhs` applies first, then `self`.
    #[inline]
    pub fn mul(self, rhs: Self) -> Self {
        let a = self.m;
        let b = rhs.m;

        let mut out = [[0.0f32; 4]; 4];
        for (col, out_col) in out.iter_mut().enumerate() {
            for (row, cell) in out_col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| a[k][row] * b[col][k]).sum();
            }
        }
        Self { m: out }
    }

    /// Placement used for glyph instances: translate to the pen, then scale uniformly.
    #[inline]
    pub fn glyph_placement(x: f32, y: f32, scale: f32) -> Self {
        Self::translate(x, y, 0.0).mul(Self::scale_uniform(scale))
    }

    #[inline]
    pub fn transform_point(self, p: [f32; 3]) -> [f32; 3] {
        let m = self.m;
        let mut out = [0.0f32; 3];
        for (row, v) in out.iter_mut().enumerate() {
            *v = m[0][row] * p[0] + m[1][row] * p[1] + m[2][row] * p[2] + m[3][row];
        }
        out
    }

    /// Translation column (x, y, z).
    #[inline]
    pub fn translation(self) -> [f32; 3] {
        [self.m[3][0], self.m[3][1], self.m[3][2]]
    }
}

/// Axis-aligned bounding box in label units.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Aabb3 {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb3 {
    #[inline]
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    #[inline]
    pub fn include_point(&mut self, p: [f32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let mut out = self;
        out.include_point(other.min);
        out.include_point(other.max);
        out
    }

    #[inline]
    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// One drawable piece of a model: a triangle list plus its material slot.
#[derive(Debug, Clone, Default)]
pub struct MeshSegment {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    /// Per-vertex RGBA tint, `0x80` is full intensity.
    pub colors: Vec<[u8; 4]>,
    pub indices: Vec<u32>,
    /// Index into the owning model's material list.
    pub material_id: Option<usize>,
    /// Some vertex alpha is below full opacity.
    pub transparent: bool,
}

impl MeshSegment {
    #[inline]
    pub fn set_material_id(&mut self, id: usize) {
        self.material_id = Some(id);
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A material with an optional diffuse texture.
#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: String,
    pub diffuse: Option<Rc<Texture>>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: None,
        }
    }

    #[inline]
    pub fn set_diffuse(&mut self, texture: Rc<Texture>) {
        self.diffuse = Some(texture);
    }
}

/// A positioned mesh instance handed over to the renderer.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    pub segments: Vec<MeshSegment>,
    pub materials: Vec<Rc<Material>>,
    /// `world_from_local`.
    pub matrix: Mat4,
}

impl Model {
    pub fn new(name: impl Into<String>, segments: Vec<MeshSegment>) -> Self {
        Self {
            name: name.into(),
            segments,
            ..Default::default()
        }
    }

    /// Append a material and return its slot index.
    pub fn add_material(&mut self, material: Rc<Material>) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Point every segment at the same material slot.
    pub fn set_material_id_all(&mut self, id: usize) {
        for seg in &mut self.segments {
            seg.set_material_id(id);
        }
    }

    /// Material used by `segment`, if its slot is populated.
    pub fn material_for(&self, segment: &MeshSegment) -> Option<&Rc<Material>> {
        segment.material_id.and_then(|id| self.materials.get(id))
    }

    /// Bounds of all segment positions after applying `matrix`.
    pub fn world_bounds(&self) -> Aabb3 {
        let mut bounds = Aabb3::empty();
        for seg in &self.segments {
            for &p in &seg.positions {
                bounds.include_point(self.matrix.transform_point(p));
            }
        }
        bounds
    }
}

/// Receiver of laid-out models.
///
/// A real renderer implements this to take ownership of models and schedule a frame.
pub trait SceneSink {
    /// Append a model to the scene. Ownership moves to the scene.
    fn add_model(&mut self, model: Model);

    /// Ask the renderer to redraw once.
    fn request_redraw(&mut self);
}

/// In-memory scene: keeps models in insertion order and counts redraw requests.
#[derive(Debug, Default)]
pub struct Scene3D {
    pub models: Vec<Model>,
    pub redraw_requests: u32,
}

impl Scene3D {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounds(&self) -> Aabb3 {
        self.models
            .iter()
            .fold(Aabb3::empty(), |acc, m| acc.union(m.world_bounds()))
    }

    /// Distinct materials across all models (by identity).
    pub fn unique_materials(&self) -> Vec<Rc<Material>> {
        let mut out: Vec<Rc<Material>> = Vec::new();
        for mat in self.models.iter().flat_map(|m| m.materials.iter()) {
            if !out.iter().any(|seen| Rc::ptr_eq(seen, mat)) {
                out.push(Rc::clone(mat));
            }
        }
        out
    }
}

impl SceneSink for Scene3D {
    fn add_model(&mut self, model: Model) {
        self.models.push(model);
    }

    fn request_redraw(&mut self) {
        self.redraw_requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> MeshSegment {
        MeshSegment {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            uvs: vec![[0.0, 0.0]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
            ..Default::default()
        }
    }

    #[test]
    fn glyph_placement_scales_before_translating() {
        let m = Mat4::glyph_placement(10.0, 2.0, 2.0);
        assert_eq!(m.transform_point([1.0, 1.0, 1.0]), [12.0, 4.0, 2.0]);
        assert_eq!(m.translation(), [10.0, 2.0, 0.0]);
    }

    #[test]
    fn identity_is_neutral_for_mul() {
        let t = Mat4::translate(3.0, -1.0, 0.5);
        assert_eq!(Mat4::IDENTITY.mul(t), t);
        assert_eq!(t.mul(Mat4::IDENTITY), t);
    }

    #[test]
    fn model_bounds_follow_matrix() {
        let mut model = Model::new("quad", vec![unit_quad()]);
        model.matrix = Mat4::glyph_placement(5.0, 0.0, 3.0);
        let b = model.world_bounds();
        assert_eq!(b.min, [5.0, 0.0, 0.0]);
        assert_eq!(b.max, [8.0, 3.0, 0.0]);
    }

    #[test]
    fn set_material_id_all_touches_every_segment() {
        let mut model = Model::new("quad", vec![unit_quad(), unit_quad()]);
        let slot = model.add_material(Rc::new(Material::new("font")));
        model.set_material_id_all(slot);
        assert!(model.segments.iter().all(|s| s.material_id == Some(0)));
        assert_eq!(model.material_for(&model.segments[1]).map(|m| m.name.as_str()), Some("font"));
    }

    #[test]
    fn scene_counts_redraws_and_dedups_materials() {
        let shared = Rc::new(Material::new("shared"));
        let mut scene = Scene3D::new();
        for _ in 0..2 {
            let mut model = Model::new("glyph", vec![unit_quad()]);
            model.add_material(Rc::clone(&shared));
            scene.add_model(model);
        }
        scene.request_redraw();

        assert_eq!(scene.models.len(), 2);
        assert_eq!(scene.redraw_requests, 1);
        assert_eq!(scene.unique_materials().len(), 1);
    }

    #[test]
    fn empty_scene_has_empty_bounds() {
        assert!(Scene3D::new().bounds().is_empty());
    }
}
