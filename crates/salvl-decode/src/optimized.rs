//! Optimized (packed binary) model decoding.
//!
//! Vertex attributes live in separate arrays. Each mesh's big-endian
//! primitive stream references them by index, with the presence and width of
//! each index given by the most recent index attribute parameter.

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::cursor::{Cursor, Endian};
use crate::error::{DecodeError, DecodeResult};
use crate::geometry::{DecodeContext, PolygonDecoder};
use crate::part::Mesh;
use crate::source::{MeshParameter, OptimizedMesh, OptimizedModel};
use crate::strip::strip_triangles;
use crate::{Material, MaterialFlags, Vertex};

/// Index attribute parameter bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexAttributes(pub u32);

impl IndexAttributes {
    pub const POSITION_16: u32 = 0x4;
    pub const HAS_POSITION: u32 = 0x8;
    pub const NORMAL_16: u32 = 0x10;
    pub const HAS_NORMAL: u32 = 0x20;
    pub const COLOR_16: u32 = 0x40;
    pub const HAS_COLOR: u32 = 0x80;
    pub const UV_16: u32 = 0x400;
    pub const HAS_UV: u32 = 0x800;

    fn index_width(self, present: u32, wide: u32) -> Option<IndexWidth> {
        if self.0 & present == 0 {
            None
        } else if self.0 & wide != 0 {
            Some(IndexWidth::U16)
        } else {
            Some(IndexWidth::U8)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexWidth {
    U8,
    U16,
}

impl IndexWidth {
    fn read(self, cursor: &mut Cursor<'_>) -> DecodeResult<usize> {
        Ok(match self {
            Self::U8 => usize::from(cursor.read_u8()?),
            Self::U16 => usize::from(cursor.read_u16()?),
        })
    }
}

/// Texture tiling bits of a texture parameter.
mod tile {
    pub const REPEAT_V: u16 = 0x1;
    pub const MIRROR_V: u16 = 0x2;
    pub const REPEAT_U: u16 = 0x4;
    pub const MIRROR_U: u16 = 0x8;
}

mod primitive {
    pub const TRIANGLES: u8 = 0x90;
    pub const STRIP: u8 = 0x98;
    /// Low bits select a vertex format slot, not the primitive kind.
    pub const KIND_MASK: u8 = 0xF8;
}

/// Layout of one vertex in the primitive stream.
#[derive(Debug, Clone, Copy)]
struct VertexLayout {
    position: Option<IndexWidth>,
    normal: Option<IndexWidth>,
    color: Option<IndexWidth>,
    uv: Option<IndexWidth>,
}

impl From<IndexAttributes> for VertexLayout {
    fn from(attributes: IndexAttributes) -> Self {
        Self {
            position: attributes.index_width(IndexAttributes::HAS_POSITION, IndexAttributes::POSITION_16),
            normal: attributes.index_width(IndexAttributes::HAS_NORMAL, IndexAttributes::NORMAL_16),
            color: attributes.index_width(IndexAttributes::HAS_COLOR, IndexAttributes::COLOR_16),
            uv: attributes.index_width(IndexAttributes::HAS_UV, IndexAttributes::UV_16),
        }
    }
}

/// Material for a mesh from its parameters.
///
/// Without a texture parameter, or with an out-of-range id, the texture and
/// addressing bits are cleared and everything else is kept.
fn mesh_material(parameters: &[MeshParameter], ctx: &DecodeContext) -> Material {
    let mut material = Material::default();
    let texture = parameters.iter().find_map(|p| match *p {
        MeshParameter::Texture { id, tile } => Some((id, tile)),
        _ => None,
    });

    if let Some((id, tiling)) = texture {
        material.texture = ctx.resolve_texture(u32::from(id));
        if material.texture.is_some() {
            material.flags.insert(MaterialFlags::USE_TEXTURE);
            material.flags.set(MaterialFlags::FLIP_U, tiling & tile::MIRROR_U != 0);
            material.flags.set(MaterialFlags::FLIP_V, tiling & tile::MIRROR_V != 0);
            material
                .flags
                .set(MaterialFlags::CLAMP_U, tiling & (tile::REPEAT_U | tile::MIRROR_U) == 0);
            material
                .flags
                .set(MaterialFlags::CLAMP_V, tiling & (tile::REPEAT_V | tile::MIRROR_V) == 0);
        }
    }

    if !material.is_textured() {
        material.flags.remove(MaterialFlags::USE_TEXTURE);
        material.flags.remove(MaterialFlags::ADDRESSING);
        material.texture = None;
    }
    material
}

impl PolygonDecoder for OptimizedModel {
    fn decode(&self, ctx: &DecodeContext) -> DecodeResult<Mesh> {
        let mut mesh = Mesh::default();
        let mut seen: Vec<Material> = Vec::new();
        // Index attributes carry over from one mesh to the next.
        let mut attributes: Option<IndexAttributes> = None;

        for source in self.opaque.iter().chain(&self.translucent) {
            for parameter in &source.parameters {
                if let MeshParameter::IndexAttributes(bits) = *parameter {
                    attributes = Some(IndexAttributes(bits));
                }
            }
            let layout = VertexLayout::from(attributes.ok_or_else(|| {
                DecodeError::InvalidModel("mesh has no index attribute parameter".into())
            })?);

            let material = mesh_material(&source.parameters, ctx);
            let key = match seen.iter().position(|m| *m == material) {
                Some(key) => key,
                None => {
                    seen.push(material);
                    seen.len() - 1
                }
            };
            let part = mesh.part_mut(key as u32, material);

            for triangle in self.triangles(source, layout, &material)? {
                part.push_triangle(triangle);
            }
        }

        Ok(mesh)
    }
}

impl OptimizedModel {
    fn triangles(&self, source: &OptimizedMesh, layout: VertexLayout, material: &Material) -> DecodeResult<Vec<[Vertex; 3]>> {
        let mut triangles = Vec::new();
        let mut cursor = Cursor::new(&source.primitives).with_endian(Endian::Big);

        while !cursor.is_empty() {
            let kind = cursor.read_u8()?;
            // Primitive streams are zero padded to alignment.
            if kind == 0 {
                break;
            }
            let count = usize::from(cursor.read_u16()?);
            let vertices = (0..count)
                .map(|_| self.read_vertex(&mut cursor, layout, material))
                .collect::<DecodeResult<Vec<_>>>()?;

            match kind & primitive::KIND_MASK {
                primitive::TRIANGLES => {
                    triangles.extend(vertices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]));
                }
                primitive::STRIP => triangles.extend(strip_triangles(&vertices, false)),
                other => debug!(kind = other, count, "skipping primitive"),
            }
        }

        Ok(triangles)
    }

    fn read_vertex(&self, cursor: &mut Cursor<'_>, layout: VertexLayout, material: &Material) -> DecodeResult<Vertex> {
        let mut vertex = Vertex::default();
        if let Some(width) = layout.position {
            vertex.position = lookup(&self.positions, width.read(cursor)?)?;
        }
        if let Some(width) = layout.normal {
            vertex.normal = lookup(&self.normals, width.read(cursor)?)?;
        }
        if let Some(width) = layout.color {
            vertex.color = lookup(&self.colors, width.read(cursor)?)?;
        }
        if let Some(width) = layout.uv {
            vertex.tex = material.adjust_tex(lookup(&self.uvs, width.read(cursor)?)?);
        }
        Ok(vertex)
    }
}

fn lookup<T: Copy>(values: &[T], index: usize) -> DecodeResult<T> {
    values.get(index).copied().ok_or(DecodeError::InvalidIndex {
        index,
        len: values.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTRS_8: u32 = IndexAttributes::HAS_POSITION | IndexAttributes::HAS_UV;

    fn model(meshes: Vec<OptimizedMesh>) -> OptimizedModel {
        OptimizedModel {
            positions: (0..5).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect(),
            normals: vec![Vec3::X],
            colors: Vec::new(),
            uvs: vec![Vec2::ZERO, Vec2::new(1.0, 1.0)],
            opaque: meshes,
            translucent: Vec::new(),
        }
    }

    fn mesh(parameters: Vec<MeshParameter>, primitives: Vec<u8>) -> OptimizedMesh {
        OptimizedMesh { parameters, primitives }
    }

    /// Primitive with 8-bit position and UV indices.
    fn primitive(kind: u8, loops: &[(u8, u8)]) -> Vec<u8> {
        let mut bytes = vec![kind];
        bytes.extend((loops.len() as u16).to_be_bytes());
        for (position, uv) in loops {
            bytes.extend([*position, *uv]);
        }
        bytes
    }

    fn positions(mesh: &Mesh, key: u32) -> Vec<[f32; 3]> {
        let part = &mesh.parts[&key];
        part.triangles()
            .iter()
            .map(|t| t.map(|i| part.vertices()[i as usize].position.x))
            .collect()
    }

    #[test]
    fn triangle_list_and_strip() {
        let mut primitives = primitive(0x90, &[(0, 0), (1, 0), (2, 0)]);
        primitives.extend(primitive(0x98, &[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)]));
        primitives.extend([0, 0, 0]);

        let model = model(vec![mesh(vec![MeshParameter::IndexAttributes(ATTRS_8)], primitives)]);
        let decoded = model.decode(&DecodeContext::default()).unwrap();
        assert_eq!(
            positions(&decoded, 0),
            [[0.0, 1.0, 2.0], [0.0, 1.0, 2.0], [2.0, 1.0, 3.0], [2.0, 3.0, 4.0]]
        );
    }

    #[test]
    fn wide_indices_and_normals() {
        let attrs = IndexAttributes::HAS_POSITION
            | IndexAttributes::POSITION_16
            | IndexAttributes::HAS_NORMAL;
        // Three loops: u16 position, u8 normal.
        let primitives = vec![0x90, 0, 3, 0, 4, 0, 0, 3, 0, 0, 2, 0];

        let model = model(vec![mesh(vec![MeshParameter::IndexAttributes(attrs)], primitives)]);
        let decoded = model.decode(&DecodeContext::default()).unwrap();
        let part = &decoded.parts[&0];
        assert_eq!(positions(&decoded, 0), [[4.0, 3.0, 2.0]]);
        assert!(part.vertices().iter().all(|v| v.normal == Vec3::X));
    }

    #[test]
    fn index_attributes_persist_across_meshes() {
        let first = mesh(
            vec![MeshParameter::IndexAttributes(ATTRS_8)],
            primitive(0x90, &[(0, 0), (1, 0), (2, 0)]),
        );
        let second = mesh(
            vec![MeshParameter::Texture { id: 0, tile: tile::MIRROR_U | tile::REPEAT_V }],
            primitive(0x90, &[(2, 1), (3, 1), (4, 1)]),
        );

        let decoded = model(vec![first, second])
            .decode(&DecodeContext { texture_count: 1 })
            .unwrap();
        assert_eq!(decoded.parts.len(), 2);

        let textured = &decoded.parts[&1].material;
        assert!(textured.is_textured());
        assert!(textured.flags.contains(MaterialFlags::FLIP_U));
        assert!(!textured.flags.contains(MaterialFlags::CLAMP_U));
        assert!(!textured.flags.contains(MaterialFlags::FLIP_V));
        assert!(!textured.flags.contains(MaterialFlags::CLAMP_V));
        assert_eq!(decoded.parts[&1].vertices()[0].tex, Vec2::new(0.5, 1.0));
    }

    #[test]
    fn out_of_range_texture_is_untextured() {
        let source = mesh(
            vec![
                MeshParameter::IndexAttributes(ATTRS_8),
                MeshParameter::Texture { id: 12, tile: tile::MIRROR_U },
            ],
            primitive(0x90, &[(0, 1), (1, 1), (2, 1)]),
        );

        let decoded = model(vec![source]).decode(&DecodeContext { texture_count: 1 }).unwrap();
        let part = &decoded.parts[&0];
        assert_eq!(part.material, Material::default());
        // Untextured parts keep their UVs unscaled.
        assert_eq!(part.vertices()[0].tex, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn clamped_addressing_without_repeat_bits() {
        let material = mesh_material(&[MeshParameter::Texture { id: 0, tile: 0 }], &DecodeContext { texture_count: 1 });
        assert!(material.flags.contains(MaterialFlags::CLAMP_U));
        assert!(material.flags.contains(MaterialFlags::CLAMP_V));
    }

    #[test]
    fn missing_index_attributes_is_an_error() {
        let source = mesh(Vec::new(), primitive(0x90, &[(0, 0), (1, 0), (2, 0)]));
        assert!(matches!(
            model(vec![source]).decode(&DecodeContext::default()),
            Err(DecodeError::InvalidModel(_))
        ));
    }

    #[test]
    fn bad_attribute_index_is_an_error() {
        let source = mesh(
            vec![MeshParameter::IndexAttributes(ATTRS_8)],
            primitive(0x90, &[(0, 0), (1, 0), (2, 9)]),
        );
        assert_eq!(
            model(vec![source]).decode(&DecodeContext::default()).unwrap_err(),
            DecodeError::InvalidIndex { index: 9, len: 2 }
        );
    }
}
