//! Triangle mesh building for layer geometry
//!
//! Every feature is turned into a small closed solid: extrusions and travels
//! into capped tubes, retractions into cones. All vertices of a layer go into
//! one `LayerMesh`, which is uploaded to a single vertex/index buffer pair.

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use layerview_core::Rgba;
use std::f64::consts::{FRAC_1_SQRT_2, TAU};

/// Interleaved vertex: position, normal, color (40 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl ColorVertex {
    /// Byte stride of one vertex in a vertex buffer
    pub const STRIDE: i32 = std::mem::size_of::<ColorVertex>() as i32;

    fn new(position: DVec3, normal: DVec3, color: [f32; 4]) -> Self {
        Self {
            position: position.as_vec3().to_array(),
            normal: normal.as_vec3().to_array(),
            color,
        }
    }
}

/// Vertex and index data of one layer
#[derive(Debug, Clone, Default)]
pub struct LayerMesh {
    vertices: Vec<ColorVertex>,
    indices: Vec<u32>,
}

impl LayerMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[ColorVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Append a capped tube from `start` to `end`.
    ///
    /// The cross-section is a `steps`-gon `2 * radius` wide and `height` tall.
    /// Both ends get a band of cap vertices rotated 45° toward the axis and a
    /// tip vertex on the axis one radius beyond the end, so the result is a
    /// closed mesh with outward facing triangles.
    pub fn add_cylinder(
        &mut self,
        start: DVec3,
        end: DVec3,
        radius: f64,
        height: f64,
        steps: usize,
        color: Rgba,
    ) {
        let steps = steps.max(3);
        let color = color.to_f32_array();
        let dir = (end - start).try_normalize().unwrap_or(DVec3::X);
        let (side, up) = sweep_basis(dir);
        let half_height = height * 0.5;

        let base = self.vertices.len() as u32;
        let s = steps as u32;

        let ring: Vec<(DVec3, DVec3)> = (0..steps)
            .map(|i| {
                let angle = TAU / (2 * steps) as f64 + TAU / steps as f64 * i as f64;
                let (sin, cos) = angle.sin_cos();
                let offset = side * (cos * radius) + up * (sin * half_height);
                let normal = (side * cos + up * sin).normalize();
                (offset, normal)
            })
            .collect();

        // start ring, end ring
        for center in [start, end] {
            for &(offset, normal) in &ring {
                self.vertices
                    .push(ColorVertex::new(center + offset, normal, color));
            }
        }
        // start cap ring, end cap ring
        for (center, axis) in [(start, -dir), (end, dir)] {
            for &(offset, normal) in &ring {
                let position = center + offset * FRAC_1_SQRT_2 + axis * (radius * FRAC_1_SQRT_2);
                let normal = (normal + axis).normalize();
                self.vertices.push(ColorVertex::new(position, normal, color));
            }
        }
        // tips
        self.vertices
            .push(ColorVertex::new(start - dir * radius, -dir, color));
        self.vertices
            .push(ColorVertex::new(end + dir * radius, dir, color));

        let start_ring = base;
        let end_ring = base + s;
        let start_cap = base + 2 * s;
        let end_cap = base + 3 * s;
        let start_tip = base + 4 * s;
        let end_tip = start_tip + 1;

        self.indices.reserve(24 * steps);
        for i in 0..s {
            let n = (i + 1) % s;
            self.push_band(start_ring, end_ring, i, n);
            self.push_band(start_cap, start_ring, i, n);
            self.push_band(end_ring, end_cap, i, n);
            self.indices
                .extend_from_slice(&[start_tip, start_cap + i, start_cap + n]);
            self.indices
                .extend_from_slice(&[end_cap + i, end_tip, end_cap + n]);
        }
    }

    /// Append a cone with its base ring around `base` and apex at `tip`.
    ///
    /// The base is closed by a fan around its center.
    pub fn add_pointer(&mut self, base: DVec3, tip: DVec3, radius: f64, steps: usize, color: Rgba) {
        let steps = steps.max(3);
        let color = color.to_f32_array();
        let dir = (tip - base).try_normalize().unwrap_or(DVec3::Z);
        let (side, up) = sweep_basis(dir);

        let first = self.vertices.len() as u32;
        let s = steps as u32;

        for i in 0..steps {
            let angle = TAU / steps as f64 * i as f64;
            let (sin, cos) = angle.sin_cos();
            let radial = side * cos + up * sin;
            self.vertices
                .push(ColorVertex::new(base + radial * radius, radial, color));
        }
        let apex = first + s;
        let center = apex + 1;
        self.vertices.push(ColorVertex::new(tip, dir, color));
        self.vertices.push(ColorVertex::new(base, -dir, color));

        for i in 0..s {
            let n = (i + 1) % s;
            self.indices
                .extend_from_slice(&[first + i, apex, first + n]);
            self.indices
                .extend_from_slice(&[center, first + i, first + n]);
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Two triangles joining ring `back` to ring `front` between ring
    /// positions `i` and `n`; `front` lies further along the sweep direction.
    fn push_band(&mut self, back: u32, front: u32, i: u32, n: u32) {
        self.indices
            .extend_from_slice(&[back + i, front + i, back + n, back + n, front + i, front + n]);
    }
}

/// Orthonormal `(side, up)` pair perpendicular to `dir`.
///
/// For horizontal segments `up` is world Z, so flattened cross-sections lie
/// in the layer plane.
fn sweep_basis(dir: DVec3) -> (DVec3, DVec3) {
    let side = dir
        .cross(DVec3::Z)
        .try_normalize()
        .unwrap_or_else(|| dir.any_orthonormal_vector());
    let up = side.cross(dir).normalize();
    (side, up)
}
