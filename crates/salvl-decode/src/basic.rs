//! Fixed-format (basic) model decoding: triangle, quad and strip meshsets.

use glam::{Vec2, Vec3};
use tracing::{debug, warn};

use crate::error::{DecodeError, DecodeResult};
use crate::geometry::{DecodeContext, PolygonDecoder};
use crate::part::{Mesh, MeshPart};
use crate::source::{BasicModel, Meshset, PolyType};
use crate::strip::strip_triangles;
use crate::{Material, MaterialFlags, Vertex, argb_to_rgb};

/// Basic model UVs are stored in 1/256 units.
const UV_SCALE: f32 = 256.0;

/// Strip header bit holding the starting winding.
const STRIP_REVERSED: u16 = 0x8000;

impl PolygonDecoder for BasicModel {
    fn decode(&self, ctx: &DecodeContext) -> DecodeResult<Mesh> {
        let mut mesh = Mesh::default();
        for meshset in &self.meshsets {
            let key = u32::from(meshset.material_index());
            let material = self.material(meshset.material_index(), ctx);
            let part = mesh.part_mut(key, material);
            self.decode_meshset(meshset, part)?;
        }
        Ok(mesh)
    }
}

impl BasicModel {
    /// Translate a material record, falling back to the default material if
    /// the index is out of range.
    fn material(&self, index: u16, ctx: &DecodeContext) -> Material {
        let Some(source) = self.materials.get(usize::from(index)) else {
            warn!(index, count = self.materials.len(), "meshset material out of range, using default");
            return Material::default();
        };

        let mut flags = MaterialFlags(source.attr_flags);
        let texture = if flags.contains(MaterialFlags::USE_TEXTURE) {
            ctx.resolve_texture(source.texture_id)
        } else {
            None
        };
        if texture.is_none() {
            flags.remove(MaterialFlags::USE_TEXTURE);
        }

        Material {
            flags,
            texture,
            diffuse: argb_to_rgb(source.diffuse),
        }
    }

    fn decode_meshset(&self, meshset: &Meshset, part: &mut MeshPart) -> DecodeResult<()> {
        let count = usize::from(meshset.poly_count);
        match meshset.poly_type() {
            PolyType::Triangles => {
                for base in (0..count).map(|p| p * 3) {
                    let triangle = self.triangle(meshset, part.material, [base, base + 1, base + 2])?;
                    part.push_triangle(triangle);
                }
            }
            PolyType::Quads => {
                for base in (0..count).map(|p| p * 4) {
                    let first = self.triangle(meshset, part.material, [base, base + 1, base + 2])?;
                    let second = self.triangle(meshset, part.material, [base + 2, base + 1, base + 3])?;
                    part.push_triangle(first);
                    part.push_triangle(second);
                }
            }
            PolyType::Strips => {
                // Loop positions exclude the per-strip headers; UVs are indexed
                // by loop, not by stream position.
                let mut stream = 0;
                let mut uv = 0;
                for _ in 0..count {
                    let header = index_at(&meshset.indices, stream)?;
                    let length = usize::from(header & !STRIP_REVERSED);
                    stream += 1;

                    let loops: Vec<usize> = (0..length).collect();
                    for [a, b, c] in strip_triangles(&loops, header & STRIP_REVERSED != 0) {
                        let triangle = [
                            self.loop_vertex(meshset, part.material, stream + a, uv + a)?,
                            self.loop_vertex(meshset, part.material, stream + b, uv + b)?,
                            self.loop_vertex(meshset, part.material, stream + c, uv + c)?,
                        ];
                        part.push_triangle(triangle);
                    }

                    stream += length;
                    uv += length;
                }
            }
            PolyType::NGons => {
                debug!(count, "skipping n-gon meshset");
            }
        }
        Ok(())
    }

    /// Build a triangle from three loops whose stream and UV positions coincide.
    fn triangle(&self, meshset: &Meshset, material: Material, loops: [usize; 3]) -> DecodeResult<[Vertex; 3]> {
        Ok([
            self.loop_vertex(meshset, material, loops[0], loops[0])?,
            self.loop_vertex(meshset, material, loops[1], loops[1])?,
            self.loop_vertex(meshset, material, loops[2], loops[2])?,
        ])
    }

    fn loop_vertex(&self, meshset: &Meshset, material: Material, stream: usize, uv: usize) -> DecodeResult<Vertex> {
        let point = usize::from(index_at(&meshset.indices, stream)?);
        let position = *self.points.get(point).ok_or(DecodeError::InvalidIndex {
            index: point,
            len: self.points.len(),
        })?;
        let normal = if self.normals.is_empty() {
            Vec3::Y
        } else {
            *self.normals.get(point).ok_or(DecodeError::InvalidIndex {
                index: point,
                len: self.normals.len(),
            })?
        };
        let tex = match &meshset.uvs {
            Some(uvs) => {
                let [u, v] = *uvs.get(uv).ok_or(DecodeError::InvalidIndex {
                    index: uv,
                    len: uvs.len(),
                })?;
                material.adjust_tex(Vec2::new(f32::from(u), f32::from(v)) / UV_SCALE)
            }
            None => Vec2::ZERO,
        };

        Ok(Vertex {
            position,
            normal,
            tex,
            ..Vertex::default()
        })
    }
}

fn index_at(indices: &[u16], position: usize) -> DecodeResult<u16> {
    indices.get(position).copied().ok_or(DecodeError::InvalidIndex {
        index: position,
        len: indices.len(),
    })
}
