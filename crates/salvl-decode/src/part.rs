//! Mesh parts, vertex deduplication and bounding box normalization.

use std::collections::BTreeMap;

use glam::Vec3;

use crate::{Material, Vertex};

/// Index of a [`Mesh`] in [`crate::LevelGeometry::meshes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

/// Identity of one mesh part: the owning mesh plus the part's material key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartRef {
    pub mesh: MeshId,
    pub key: u32,
}

/// Result of [`MeshPart::aabb_correct`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartBounds {
    /// Center of the original bounding box, subtracted from every vertex.
    pub offset: Vec3,
    /// Extent of the bounding box, floored per axis to the minimum extent.
    pub size: Vec3,
}

/// Triangles of one material within a mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPart {
    vertices: Vec<Vertex>,
    triangles: Vec<[u32; 3]>,
    pub material: Material,
    bounds: Option<PartBounds>,
}

impl MeshPart {
    #[must_use]
    pub fn new(material: Material) -> Self {
        Self {
            material,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[must_use]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Bounds recorded by [`Self::aabb_correct`], if it has run.
    #[must_use]
    pub fn bounds(&self) -> Option<PartBounds> {
        self.bounds
    }

    /// Offset to re-add when placing the part; zero before normalization.
    #[must_use]
    pub fn offset(&self) -> Vec3 {
        self.bounds.map_or(Vec3::ZERO, |b| b.offset)
    }

    /// Return the index of `vertex`, appending it if no identical vertex exists.
    ///
    /// This is a linear scan: parts are small and exact-match semantics
    /// matter more than speed here.
    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        let index = self
            .vertices
            .iter()
            .position(|v| *v == vertex)
            .unwrap_or_else(|| {
                self.vertices.push(vertex);
                self.vertices.len() - 1
            });
        index as u32
    }

    /// Deduplicate three vertices and append them as one triangle.
    pub fn push_triangle(&mut self, triangle: [Vertex; 3]) {
        let indices = triangle.map(|v| self.add_vertex(v));
        self.triangles.push(indices);
    }

    /// Re-center vertex positions on the bounding box center.
    ///
    /// Records the removed offset and the floored size. An empty part gets a
    /// zero offset and a minimum-size box.
    pub fn aabb_correct(&mut self, min_extent: f32) -> PartBounds {
        let (min, max) = self.vertices.iter().fold(
            (Vec3::INFINITY, Vec3::NEG_INFINITY),
            |(min, max), v| (min.min(v.position), max.max(v.position)),
        );

        let bounds = if self.vertices.is_empty() {
            PartBounds {
                offset: Vec3::ZERO,
                size: Vec3::splat(min_extent),
            }
        } else {
            PartBounds {
                offset: (min + max) * 0.5,
                size: (max - min).max(Vec3::splat(min_extent)),
            }
        };

        for v in &mut self.vertices {
            v.position -= bounds.offset;
        }
        self.bounds = Some(bounds);
        bounds
    }
}

/// All parts decoded from one source model, keyed by material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub parts: BTreeMap<u32, MeshPart>,
    /// Set when any instance referencing this mesh is visible.
    pub visible: bool,
}

impl Mesh {
    /// Get the part for `key`, creating it with `material` on first use.
    pub fn part_mut(&mut self, key: u32, material: Material) -> &mut MeshPart {
        self.parts
            .entry(key)
            .or_insert_with(|| MeshPart::new(material))
    }

    /// Normalize the bounding box of every part.
    pub fn aabb_correct(&mut self, min_extent: f32) {
        for part in self.parts.values_mut() {
            part.aabb_correct(min_extent);
        }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.parts.values().map(|p| p.triangles.len()).sum()
    }
}
