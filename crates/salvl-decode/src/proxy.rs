//! Thin-shell physics proxy generation.
//!
//! Every triangle of a collision part becomes a closed prism: the triangle
//! itself plus a copy pushed 1/8 unit inward along the vertex normals, wound
//! the other way.

use std::collections::HashMap;

use glam::Vec3;

use crate::part::{MeshPart, PartRef};

pub const PROXY_MAGIC: &[u8; 6] = b"CSGPHS";
pub const PROXY_VERSION: u32 = 3;

/// Distance the back face is pushed along the inverted normal.
pub const SHELL_DEPTH: f32 = 0.125;

/// Front triangle, then the inward triangle reversed.
const PRISM_INDICES: [u32; 6] = [0, 1, 2, 5, 4, 3];

/// Bytes of one triangle record.
pub const RECORD_LEN: usize = 4 + 16 + 4 + 16 + 8 + 18 * 4 + 4 + 6 * 4;

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_vec3(out: &mut Vec<u8>, value: Vec3) {
    for component in value.to_array() {
        out.extend_from_slice(&component.to_le_bytes());
    }
}

/// Build the proxy blob for one part.
#[must_use]
pub fn build_proxy(part: &MeshPart) -> Vec<u8> {
    let triangles = part.triangles();
    let mut out = Vec::with_capacity(PROXY_MAGIC.len() + 4 + triangles.len() * RECORD_LEN);
    out.extend_from_slice(PROXY_MAGIC);
    push_u32(&mut out, PROXY_VERSION);

    for triangle in triangles {
        let vertices = triangle.map(|i| part.vertices()[i as usize]);

        // Unused triangle index table.
        push_u32(&mut out, 16);
        out.extend_from_slice(&[0; 16]);

        // Transform offsets: zero except a trailing 1.0.
        push_u32(&mut out, 16);
        out.extend_from_slice(&[0; 12]);
        out.extend_from_slice(&1.0f32.to_le_bytes());

        // 18 coordinates of 4 bytes each.
        push_u32(&mut out, 18);
        push_u32(&mut out, 4);
        for v in &vertices {
            push_vec3(&mut out, v.position);
        }
        for v in &vertices {
            push_vec3(&mut out, v.position - v.normal * SHELL_DEPTH);
        }

        push_u32(&mut out, PRISM_INDICES.len() as u32);
        for index in PRISM_INDICES {
            push_u32(&mut out, index);
        }
    }

    out
}

/// Proxy blobs memoized per mesh part.
#[derive(Debug, Default)]
pub struct ProxyCache {
    blobs: HashMap<PartRef, Vec<u8>>,
}

impl ProxyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the proxy for `part`, building it on first request.
    pub fn get_or_build(&mut self, key: PartRef, part: &MeshPart) -> &[u8] {
        self.blobs.entry(key).or_insert_with(|| build_proxy(part))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::MeshId;
    use crate::{Material, Vertex};

    fn read_f32s(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn read_u32s(bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn triangle_part() -> MeshPart {
        let mut part = MeshPart::new(Material::default());
        part.push_triangle([
            Vertex { position: Vec3::new(0.0, 0.0, 0.0), ..Vertex::default() },
            Vertex { position: Vec3::new(1.0, 0.0, 0.0), ..Vertex::default() },
            Vertex { position: Vec3::new(0.0, 0.0, 1.0), ..Vertex::default() },
        ]);
        part
    }

    #[test]
    fn one_triangle_layout() {
        let blob = build_proxy(&triangle_part());
        assert_eq!(blob.len(), 10 + RECORD_LEN);
        assert_eq!(&blob[..6], b"CSGPHS");
        assert_eq!(read_u32s(&blob[6..10]), [3]);

        let record = &blob[10..];
        assert_eq!(read_u32s(&record[..4]), [16]);
        assert!(record[4..20].iter().all(|&b| b == 0));
        assert_eq!(read_u32s(&record[20..24]), [16]);
        assert_eq!(&record[36..40], &[0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(read_u32s(&record[40..48]), [18, 4]);

        let coords = read_f32s(&record[48..120]);
        assert_eq!(&coords[..9], &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        // Default normals point up, so the back face sits 1/8 below.
        assert_eq!(&coords[9..12], &[0.0, -0.125, 0.0]);
        assert_eq!(&coords[15..18], &[0.0, -0.125, 1.0]);

        assert_eq!(read_u32s(&record[120..]), [6, 0, 1, 2, 5, 4, 3]);
    }

    #[test]
    fn empty_part_is_header_only() {
        let blob = build_proxy(&MeshPart::default());
        assert_eq!(blob.len(), 10);
    }

    #[test]
    fn cache_builds_once_per_part() {
        let part = triangle_part();
        let key = PartRef { mesh: MeshId(0), key: 0 };
        let mut cache = ProxyCache::new();

        let first = cache.get_or_build(key, &part).to_vec();
        // A different part under the same key returns the memoized blob.
        let second = cache.get_or_build(key, &MeshPart::default()).to_vec();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }
}
