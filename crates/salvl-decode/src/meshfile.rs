//! Version 2.00 binary mesh files.
//!
//! Layout, all little-endian:
//!
//! | field | size |
//! |---|---|
//! | `"version 2.00\n"` | 13 |
//! | header size (12) | u16 |
//! | vertex stride (40) | u8 |
//! | face stride (12) | u8 |
//! | vertex count | u32 |
//! | face count | u32 |
//! | vertices | stride × count |
//! | faces | 3 × u32 each |

use glam::{Vec2, Vec3};

use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::part::MeshPart;

pub const VERSION_LINE: &[u8; 13] = b"version 2.00\n";
const HEADER_LEN: u16 = 12;
const VERTEX_STRIDE: u8 = 0x28;
const FACE_STRIDE: u8 = 0x0C;

/// A vertex as stored in a mesh file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshFileVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex: Vec2,
    pub tangent: [u8; 4],
    pub color: [u8; 4],
}

/// Parsed contents of a mesh file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshFile {
    pub vertices: Vec<MeshFileVertex>,
    pub faces: Vec<[u32; 3]>,
}

fn put_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Serialize a part. Tangent and color bytes are fixed defaults.
#[must_use]
pub fn write_mesh_file(part: &MeshPart) -> Vec<u8> {
    let vertices = part.vertices();
    let faces = part.triangles();

    let mut out = Vec::with_capacity(
        VERSION_LINE.len()
            + usize::from(HEADER_LEN)
            + vertices.len() * usize::from(VERTEX_STRIDE)
            + faces.len() * usize::from(FACE_STRIDE),
    );
    out.extend_from_slice(VERSION_LINE);
    out.extend_from_slice(&HEADER_LEN.to_le_bytes());
    out.push(VERTEX_STRIDE);
    out.push(FACE_STRIDE);
    out.extend_from_slice(&(vertices.len() as u32).to_le_bytes());
    out.extend_from_slice(&(faces.len() as u32).to_le_bytes());

    for v in vertices {
        put_f32s(&mut out, &v.position.to_array());
        put_f32s(&mut out, &v.normal.to_array());
        put_f32s(&mut out, &v.tex.to_array());
        out.extend_from_slice(&[0x00; 4]);
        out.extend_from_slice(&[0xFF; 4]);
    }
    for face in faces {
        for index in face {
            out.extend_from_slice(&index.to_le_bytes());
        }
    }

    out
}

/// Parse a mesh file written by [`write_mesh_file`].
pub fn read_mesh_file(data: &[u8]) -> DecodeResult<MeshFile> {
    let mut cursor = Cursor::new(data);
    if cursor.take(VERSION_LINE.len())? != VERSION_LINE {
        return Err(DecodeError::InvalidModel("missing mesh version line".into()));
    }

    let header_len = cursor.read_u16()?;
    let vertex_stride = cursor.read_u8()?;
    let face_stride = cursor.read_u8()?;
    if header_len != HEADER_LEN || vertex_stride != VERTEX_STRIDE || face_stride != FACE_STRIDE {
        return Err(DecodeError::InvalidModel(format!(
            "unsupported mesh header: size {header_len}, vertex stride {vertex_stride}, face stride {face_stride}"
        )));
    }
    let vertex_count = cursor.read_u32()? as usize;
    let face_count = cursor.read_u32()? as usize;

    let mut vertices = Vec::with_capacity(vertex_count.min(cursor.remaining() / usize::from(VERTEX_STRIDE)));
    for _ in 0..vertex_count {
        let position = cursor.read_vec3()?;
        let normal = cursor.read_vec3()?;
        let tex = Vec2::new(cursor.read_f32()?, cursor.read_f32()?);
        let mut tangent = [0; 4];
        tangent.copy_from_slice(cursor.take(4)?);
        let mut color = [0; 4];
        color.copy_from_slice(cursor.take(4)?);
        vertices.push(MeshFileVertex {
            position,
            normal,
            tex,
            tangent,
            color,
        });
    }

    let mut faces = Vec::with_capacity(face_count.min(cursor.remaining() / usize::from(FACE_STRIDE)));
    for _ in 0..face_count {
        let face = [cursor.read_u32()?, cursor.read_u32()?, cursor.read_u32()?];
        if let Some(&index) = face.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(DecodeError::InvalidIndex {
                index: index as usize,
                len: vertex_count,
            });
        }
        faces.push(face);
    }

    Ok(MeshFile { vertices, faces })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Material, Vertex};

    fn quad_part() -> MeshPart {
        let v = |x: f32, z: f32, u: f32| Vertex {
            position: Vec3::new(x, 0.5, z),
            normal: Vec3::new(0.0, 0.0, -1.0),
            tex: Vec2::new(u, 1.0 - u),
            color: [1, 2, 3, 4],
            ..Vertex::default()
        };
        let mut part = MeshPart::new(Material::default());
        part.push_triangle([v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.25), v(0.0, 1.0, 0.5)]);
        part.push_triangle([v(0.0, 1.0, 0.5), v(1.0, 0.0, 0.25), v(1.0, 1.0, 1.0)]);
        part
    }

    #[test]
    fn header_layout() {
        let bytes = write_mesh_file(&quad_part());
        assert_eq!(&bytes[..13], b"version 2.00\n");
        assert_eq!(&bytes[13..17], &[12, 0, 0x28, 0x0C]);
        assert_eq!(&bytes[17..21], &4u32.to_le_bytes());
        assert_eq!(&bytes[21..25], &2u32.to_le_bytes());
        assert_eq!(bytes.len(), 25 + 4 * 40 + 2 * 12);
    }

    #[test]
    fn written_file_reads_back() {
        let part = quad_part();
        let file = read_mesh_file(&write_mesh_file(&part)).unwrap();

        assert_eq!(file.vertices.len(), part.vertices().len());
        assert_eq!(file.faces, part.triangles());
        for (read, written) in file.vertices.iter().zip(part.vertices()) {
            assert_eq!(read.position, written.position);
            assert_eq!(read.normal, written.normal);
            assert_eq!(read.tex, written.tex);
            // Fixed defaults, not the vertex color.
            assert_eq!(read.tangent, [0; 4]);
            assert_eq!(read.color, [0xFF; 4]);
        }
    }

    #[test]
    fn truncated_file_is_an_error() {
        let bytes = write_mesh_file(&quad_part());
        assert!(matches!(
            read_mesh_file(&bytes[..bytes.len() - 1]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            read_mesh_file(b"version 1.00\n"),
            Err(DecodeError::InvalidModel(_))
        ));
    }

    #[test]
    fn face_index_is_validated() {
        let mut bytes = write_mesh_file(&quad_part());
        let last = bytes.len() - 4;
        bytes[last..].copy_from_slice(&9u32.to_le_bytes());
        assert_eq!(
            read_mesh_file(&bytes),
            Err(DecodeError::InvalidIndex { index: 9, len: 4 })
        );
    }
}
