//! Chunk model decoding.
//!
//! A chunk model is two independent streams. The vertex list is a run of
//! 32-bit word chunks that each write a span of a sparse, absolutely indexed
//! vertex buffer. The polygon list is a run of 16-bit word chunks: material
//! and texture chunks update a running material, and strip chunks draw
//! triangles with whatever material is current.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::geometry::{DecodeContext, PolygonDecoder};
use crate::part::Mesh;
use crate::source::ChunkModel;
use crate::strip::strip_triangles;
use crate::{Material, MaterialFlags, Vertex, argb_to_rgb, argb_to_rgba};

const CHUNK_NULL: u8 = 0;
const CHUNK_END: u8 = 255;

mod vertex_kind {
    pub const SH: u8 = 32;
    pub const VN_SH: u8 = 33;
    pub const PLAIN: u8 = 34;
    pub const D8: u8 = 35;
    /// Last position-only kind carrying one extra word (user, ninja flags,
    /// specular or intensity).
    pub const EXTRA_LAST: u8 = 40;
    pub const VN: u8 = 41;
    pub const VN_D8: u8 = 42;
    pub const VN_EXTRA_LAST: u8 = 47;
}

mod poly_kind {
    pub const BITS_LAST: u8 = 7;
    pub const TINY_FIRST: u8 = 8;
    pub const TINY_LAST: u8 = 9;
    pub const MATERIAL_FIRST: u8 = 16;
    pub const MATERIAL_LAST: u8 = 31;
    pub const STRIP_FIRST: u8 = 64;
    pub const STRIP_LAST: u8 = 75;
}

/// A vertex as written by the vertex list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkVertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// RGBA.
    pub color: [u8; 4],
}

/// Sparse vertex buffer keyed by absolute vertex index.
pub type VertexMap = HashMap<u32, ChunkVertex>;

/// Walk the vertex list into a sparse vertex buffer.
///
/// Vertex chunk kinds that carry no position data this decoder uses are
/// logged and skipped.
pub fn parse_vertex_list(data: &[u8]) -> DecodeResult<VertexMap> {
    let mut vertices = VertexMap::new();
    let mut cursor = Cursor::new(data);

    while !cursor.is_empty() {
        let header = cursor.read_u32()?;
        let kind = (header & 0xFF) as u8;
        if kind == CHUNK_END {
            break;
        }
        let words = (header >> 16) as usize;
        let mut body = Cursor::new(cursor.take(words * 4)?);
        if kind == CHUNK_NULL {
            continue;
        }

        let (has_normal, extra) = match kind {
            vertex_kind::SH | vertex_kind::VN_SH => {
                parse_sh_vertices(&mut body, kind == vertex_kind::VN_SH, &mut vertices)?;
                continue;
            }
            vertex_kind::PLAIN => (false, Extra::None),
            vertex_kind::D8 => (false, Extra::Color),
            k if k <= vertex_kind::EXTRA_LAST && k > vertex_kind::D8 => (false, Extra::Skip),
            vertex_kind::VN => (true, Extra::None),
            vertex_kind::VN_D8 => (true, Extra::Color),
            k if k <= vertex_kind::VN_EXTRA_LAST && k > vertex_kind::VN_D8 => (true, Extra::Skip),
            _ => {
                debug!(kind, "skipping vertex chunk");
                continue;
            }
        };

        let (offset, count) = read_span(&mut body)?;
        for i in 0..count {
            let position = body.read_vec3()?;
            let normal = if has_normal { body.read_vec3()? } else { Vec3::Y };
            let color = match extra {
                Extra::None => [0xFF; 4],
                Extra::Color => argb_to_rgba(body.read_u32()?),
                Extra::Skip => {
                    body.skip(4)?;
                    [0xFF; 4]
                }
            };
            vertices.insert(offset + i, ChunkVertex { position, normal, color });
        }
    }

    Ok(vertices)
}

#[derive(Debug, Clone, Copy)]
enum Extra {
    None,
    Color,
    Skip,
}

fn read_span(body: &mut Cursor<'_>) -> DecodeResult<(u32, u32)> {
    let word = body.read_u32()?;
    Ok((word & 0xFFFF, word >> 16))
}

/// Four-float vertices used by the shader-oriented kinds.
fn parse_sh_vertices(body: &mut Cursor<'_>, has_normal: bool, vertices: &mut VertexMap) -> DecodeResult<()> {
    let (offset, count) = read_span(body)?;
    for i in 0..count {
        let position = body.read_vec3()?;
        body.skip(4)?;
        let normal = if has_normal {
            let normal = body.read_vec3()?;
            body.skip(4)?;
            normal
        } else {
            Vec3::Y
        };
        vertices.insert(
            offset + i,
            ChunkVertex {
                position,
                normal,
                color: [0xFF; 4],
            },
        );
    }
    Ok(())
}

/// Divisor applied to inline strip UVs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvFormat {
    None,
    /// 1/256 units.
    Normal,
    /// 1/1024 units.
    High,
}

impl UvFormat {
    fn from_strip_kind(kind: u8) -> Self {
        match kind {
            65 | 68 | 71 | 74 => Self::Normal,
            66 | 69 | 72 | 75 => Self::High,
            _ => Self::None,
        }
    }

    fn divisor(self) -> f32 {
        match self {
            Self::None | Self::Normal => 256.0,
            Self::High => 1024.0,
        }
    }
}

/// One loop of a strip: a vertex reference and its inline UV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLoop {
    pub index: u16,
    pub uv: [i16; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strip {
    pub reversed: bool,
    pub loops: Vec<StripLoop>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripChunk {
    pub uv: UvFormat,
    pub strips: Vec<Strip>,
}

/// A polygon list record, decoded from its declared layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolyChunk {
    /// Header-only render state chunk.
    Bits { kind: u8, flags: u8 },
    Texture { flags: u8, data: u16 },
    /// Material colors; only the diffuse color is kept.
    Material { diffuse: Option<u32> },
    Strip(StripChunk),
    /// A sized chunk this decoder does not act on.
    Skipped { kind: u8 },
}

/// Walk the polygon list into typed records, stopping at the end chunk.
pub fn parse_poly_list(data: &[u8]) -> DecodeResult<Vec<PolyChunk>> {
    let mut chunks = Vec::new();
    let mut cursor = Cursor::new(data);

    while !cursor.is_empty() {
        let header = cursor.read_u16()?;
        let kind = (header & 0xFF) as u8;
        let flags = (header >> 8) as u8;

        match kind {
            CHUNK_END => break,
            CHUNK_NULL => {}
            k if k <= poly_kind::BITS_LAST => chunks.push(PolyChunk::Bits { kind: k, flags }),
            poly_kind::TINY_FIRST..=poly_kind::TINY_LAST => chunks.push(PolyChunk::Texture {
                flags,
                data: cursor.read_u16()?,
            }),
            k if k < poly_kind::MATERIAL_FIRST => {
                debug!(kind = k, "skipping unknown header-only poly chunk");
            }
            _ => {
                let shorts = usize::from(cursor.read_u16()?);
                let mut body = Cursor::new(cursor.take(shorts * 2)?);
                chunks.push(match kind {
                    poly_kind::MATERIAL_FIRST..=poly_kind::MATERIAL_LAST => parse_material(kind, &mut body)?,
                    poly_kind::STRIP_FIRST..=poly_kind::STRIP_LAST => PolyChunk::Strip(parse_strip(kind, &mut body)?),
                    _ => {
                        debug!(kind, "skipping poly chunk");
                        PolyChunk::Skipped { kind }
                    }
                });
            }
        }
    }

    Ok(chunks)
}

/// Length in bytes of the vertex list at the start of `data`, end chunk included.
///
/// Chunk streams are not length prefixed, so the level reader uses this to
/// find where a model's stream stops.
pub fn vertex_list_len(data: &[u8]) -> DecodeResult<usize> {
    let mut cursor = Cursor::new(data);
    loop {
        let header = cursor.read_u32()?;
        if (header & 0xFF) as u8 == CHUNK_END {
            return Ok(cursor.position());
        }
        cursor.skip((header >> 16) as usize * 4)?;
    }
}

/// Length in bytes of the polygon list at the start of `data`, end chunk included.
pub fn poly_list_len(data: &[u8]) -> DecodeResult<usize> {
    let mut cursor = Cursor::new(data);
    loop {
        match (cursor.read_u16()? & 0xFF) as u8 {
            CHUNK_END => return Ok(cursor.position()),
            poly_kind::TINY_FIRST..=poly_kind::TINY_LAST => cursor.skip(2)?,
            k if k < poly_kind::MATERIAL_FIRST => {}
            _ => {
                let shorts = usize::from(cursor.read_u16()?);
                cursor.skip(shorts * 2)?;
            }
        }
    }
}

fn parse_material(kind: u8, body: &mut Cursor<'_>) -> DecodeResult<PolyChunk> {
    // Low three bits: diffuse, ambient, specular present.
    let diffuse = if kind & 1 != 0 {
        Some(body.read_u32()?)
    } else {
        None
    };
    Ok(PolyChunk::Material { diffuse })
}

fn parse_strip(kind: u8, body: &mut Cursor<'_>) -> DecodeResult<StripChunk> {
    let uv = UvFormat::from_strip_kind(kind);
    // Shorts per loop beyond index and first UV.
    let loop_extra = match kind {
        67..=69 => 3,
        70..=72 => 2,
        74 | 75 => 2,
        _ => 0,
    };

    let word = body.read_u16()?;
    let strip_count = word & 0x3FFF;
    let user_offset = usize::from(word >> 14);

    let mut strips = Vec::with_capacity(usize::from(strip_count));
    for _ in 0..strip_count {
        let length = body.read_i16()?;
        let mut loops = Vec::with_capacity(usize::from(length.unsigned_abs()));
        for k in 0..length.unsigned_abs() {
            let index = body.read_u16()?;
            let uv = if uv == UvFormat::None {
                [0, 0]
            } else {
                [body.read_i16()?, body.read_i16()?]
            };
            body.skip(loop_extra * 2)?;
            if k >= 2 {
                body.skip(user_offset * 2)?;
            }
            loops.push(StripLoop { index, uv });
        }
        strips.push(Strip {
            reversed: length < 0,
            loops,
        });
    }

    Ok(StripChunk { uv, strips })
}

/// Material accumulator step.
///
/// Returns the material in effect after `chunk`. Strip and unknown chunks
/// leave it unchanged.
#[must_use]
pub fn apply_chunk(mut material: Material, chunk: &PolyChunk, ctx: &DecodeContext) -> Material {
    match chunk {
        PolyChunk::Texture { flags, data } => {
            material.flags.set(MaterialFlags::FLIP_U, flags & 0x80 != 0);
            material.flags.set(MaterialFlags::FLIP_V, flags & 0x40 != 0);
            material.flags.set(MaterialFlags::CLAMP_U, flags & 0x20 != 0);
            material.flags.set(MaterialFlags::CLAMP_V, flags & 0x10 != 0);
            material.texture = ctx.resolve_texture(u32::from(data & 0x1FFF));
            material
                .flags
                .set(MaterialFlags::USE_TEXTURE, material.texture.is_some());
        }
        PolyChunk::Material { diffuse: Some(argb) } => material.diffuse = argb_to_rgb(*argb),
        PolyChunk::Bits { .. } | PolyChunk::Material { diffuse: None } | PolyChunk::Strip(_) | PolyChunk::Skipped { .. } => {}
    }
    material
}

impl PolygonDecoder for ChunkModel {
    fn decode(&self, ctx: &DecodeContext) -> DecodeResult<Mesh> {
        let vertices = parse_vertex_list(&self.vertex_list)?;
        let chunks = parse_poly_list(&self.poly_list)?;

        let mut mesh = Mesh::default();
        let mut seen: Vec<Material> = Vec::new();
        let mut material = Material::default();

        for chunk in &chunks {
            material = apply_chunk(material, chunk, ctx);
            let PolyChunk::Strip(strip_chunk) = chunk else {
                continue;
            };

            let key = match seen.iter().position(|m| *m == material) {
                Some(key) => key,
                None => {
                    seen.push(material);
                    seen.len() - 1
                }
            };
            let part = mesh.part_mut(key as u32, material);

            for strip in &strip_chunk.strips {
                let loops = strip
                    .loops
                    .iter()
                    .map(|l| strip_vertex(&vertices, l, strip_chunk.uv, &material))
                    .collect::<DecodeResult<Vec<_>>>()?;
                for triangle in strip_triangles(&loops, strip.reversed) {
                    part.push_triangle(triangle);
                }
            }
        }

        Ok(mesh)
    }
}

fn strip_vertex(vertices: &VertexMap, strip_loop: &StripLoop, uv: UvFormat, material: &Material) -> DecodeResult<Vertex> {
    let index = u32::from(strip_loop.index);
    let source = vertices.get(&index).ok_or(DecodeError::MissingVertex { index })?;
    let tex = if uv == UvFormat::None {
        Vec2::ZERO
    } else {
        let [u, v] = strip_loop.uv;
        material.adjust_tex(Vec2::new(f32::from(u), f32::from(v)) / uv.divisor())
    };
    Ok(Vertex {
        position: source.position,
        normal: source.normal,
        tex,
        color: source.color,
        ..Vertex::default()
    })
}
