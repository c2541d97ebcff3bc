//! Decode landtable polygon data into indexed triangle mesh parts.
//!
//! This crate is the geometry core of the level converter. It takes the
//! in-memory source object model of a level (see [`source`]) and turns every
//! referenced model into a [`Mesh`] of per-material [`MeshPart`]s, then works
//! out where each part has to be placed in the output scene.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives, no I/O
//! - **Bounds-checked**: Every chunked stream is walked with a [`Cursor`]
//! - **Lossless where it matters**: Vertex deduplication is exact, field by field
//!
//! # Key functions
//!
//! - [`build_geometry`]: Decode and normalize every model a landtable references
//! - [`resolve_placements`]: Split placed mesh parts into collision and visual lists
//! - [`build_proxy`]: Synthesize the thin-shell physics proxy of a mesh part
//! - [`write_mesh_file`] / [`read_mesh_file`]: Version 2.00 binary mesh files

mod error;

pub mod basic;
pub mod chunk;
pub mod cursor;
pub mod geometry;
pub mod meshfile;
pub mod optimized;
pub mod part;
pub mod placement;
pub mod proxy;
pub mod source;
pub mod strip;

pub use cursor::{Cursor, Endian};
pub use error::{DecodeError, DecodeResult};
pub use geometry::{DecodeContext, LevelGeometry, PolygonDecoder, build_geometry};
pub use meshfile::{MeshFile, read_mesh_file, write_mesh_file};
pub use part::{Mesh, MeshId, MeshPart, PartBounds, PartRef};
pub use placement::{MeshInstance, MeshPartInstance, Placements, resolve_placements};
pub use proxy::{ProxyCache, build_proxy};
pub use source::{LandTable, LevelObject, ModelId, RotationOrder, SourceModel, SurfaceFlags};
pub use strip::strip_triangles;

use glam::{Vec2, Vec3};

/// Smallest bounding box extent a mesh part is given on any axis.
///
/// Flat geometry would otherwise produce a zero-thickness box, which the
/// target engine rejects.
pub const DEFAULT_MIN_EXTENT: f32 = 0.2;

/// A fully described output vertex.
///
/// Equality is exact field-wise comparison with no epsilon; it is the key
/// used by [`MeshPart::add_vertex`] to merge duplicates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex: Vec2,
    /// Currently always zero.
    pub tangent: Vec3,
    pub tangent_sign: f32,
    /// RGBA.
    pub color: [u8; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            tex: Vec2::ZERO,
            tangent: Vec3::ZERO,
            tangent_sign: 0.0,
            color: [0xFF; 4],
        }
    }
}

/// Material attribute bits, using the source engine's bit positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MaterialFlags(pub u32);

impl MaterialFlags {
    pub const CLAMP_V: Self = Self(1 << 15);
    pub const CLAMP_U: Self = Self(1 << 16);
    pub const FLIP_V: Self = Self(1 << 17);
    pub const FLIP_U: Self = Self(1 << 18);
    pub const USE_ALPHA: Self = Self(1 << 20);
    pub const USE_TEXTURE: Self = Self(1 << 21);
    pub const DOUBLE_SIDE: Self = Self(1 << 23);

    /// Bits that describe texture addressing.
    pub const ADDRESSING: Self =
        Self(Self::FLIP_U.0 | Self::FLIP_V.0 | Self::CLAMP_U.0 | Self::CLAMP_V.0);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

/// Material of a mesh part after translation from the source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Material {
    pub flags: MaterialFlags,
    /// Index into the level's texture list. Only meaningful when
    /// [`MaterialFlags::USE_TEXTURE`] is set.
    pub texture: Option<u32>,
    /// 24-bit RGB.
    pub diffuse: u32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            flags: MaterialFlags::empty(),
            texture: None,
            diffuse: 0x00FF_FFFF,
        }
    }
}

impl Material {
    /// Whether the part should be drawn with its texture.
    #[must_use]
    pub fn is_textured(&self) -> bool {
        self.flags.contains(MaterialFlags::USE_TEXTURE) && self.texture.is_some()
    }

    /// Scale a source texture coordinate to account for the mirrored
    /// double-size texture variants used for flipped addressing.
    #[must_use]
    pub fn adjust_tex(&self, mut tex: Vec2) -> Vec2 {
        if self.flags.contains(MaterialFlags::FLIP_U) {
            tex.x *= 0.5;
        }
        if self.flags.contains(MaterialFlags::FLIP_V) {
            tex.y *= 0.5;
        }
        tex
    }
}

/// Convert a 32-bit ARGB color to 24-bit RGB.
#[must_use]
pub const fn argb_to_rgb(argb: u32) -> u32 {
    argb & 0x00FF_FFFF
}

/// Convert a 32-bit ARGB color to RGBA bytes.
#[must_use]
pub const fn argb_to_rgba(argb: u32) -> [u8; 4] {
    let [b, g, r, a] = argb.to_le_bytes();
    [r, g, b, a]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_defaults() {
        let v = Vertex::default();
        assert_eq!(v.normal, Vec3::Y);
        assert_eq!(v.color, [255, 255, 255, 255]);
    }

    #[test]
    fn flipped_addressing_halves_tex() {
        let mut material = Material::default();
        material.flags.insert(MaterialFlags::FLIP_U);
        assert_eq!(material.adjust_tex(Vec2::new(1.0, 1.0)), Vec2::new(0.5, 1.0));
        material.flags.insert(MaterialFlags::FLIP_V);
        assert_eq!(material.adjust_tex(Vec2::new(1.0, 1.0)), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn argb_conversion() {
        assert_eq!(argb_to_rgb(0x80_11_22_33), 0x11_22_33);
        assert_eq!(argb_to_rgba(0x80_11_22_33), [0x11, 0x22, 0x33, 0x80]);
    }
}
