//! In-memory source object model of a level.
//!
//! These types are produced by the level container reader and consumed by
//! the polygon decoders. They describe the data as stored, with raw
//! index/strip streams left undecoded.

use glam::{Vec2, Vec3};

/// Index of a model in [`LandTable::models`].
///
/// Several objects may reference the same model; this id is the identity
/// the mesh cache is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

/// Canonical surface flags, remapped from the game-specific bit layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SurfaceFlags(pub u32);

impl SurfaceFlags {
    pub const SOLID: Self = Self(1 << 0);
    pub const VISIBLE: Self = Self(1 << 1);

    #[must_use]
    pub const fn is_solid(self) -> bool {
        self.0 & Self::SOLID.0 != 0
    }

    #[must_use]
    pub const fn is_visible(self) -> bool {
        self.0 & Self::VISIBLE.0 != 0
    }

    /// Build from a source bitset given the source's solid and visible bits.
    #[must_use]
    pub const fn remap(raw: u32, solid: u32, visible: u32) -> Self {
        let mut flags = 0;
        if raw & solid != 0 {
            flags |= Self::SOLID.0;
        }
        if raw & visible != 0 {
            flags |= Self::VISIBLE.0;
        }
        Self(flags)
    }
}

/// Order the three single-axis rotations of an object are applied in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationOrder {
    /// Z, then Y, then X. Selected by the object's rotate-XYZ eval flag.
    Zyx,
    /// Y, then X, then Z.
    #[default]
    Yxz,
}

impl RotationOrder {
    /// Object eval flag selecting [`RotationOrder::Zyx`].
    pub const EVAL_ROTATE_XYZ: u32 = 0x20;

    #[must_use]
    pub const fn from_eval_flags(flags: u32) -> Self {
        if flags & Self::EVAL_ROTATE_XYZ != 0 {
            Self::Zyx
        } else {
            Self::Yxz
        }
    }
}

/// One placed object of the landtable.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelObject {
    pub model: ModelId,
    pub position: Vec3,
    /// Per-axis angles where 0x10000 is a full turn.
    pub angles: [i32; 3],
    pub rotation_order: RotationOrder,
    pub surface: SurfaceFlags,
}

/// Top-level scene container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandTable {
    pub objects: Vec<LevelObject>,
    pub models: Vec<SourceModel>,
    /// Number of entries in the level's texture list.
    pub texture_count: usize,
}

impl LandTable {
    #[must_use]
    pub fn model(&self, id: ModelId) -> Option<&SourceModel> {
        self.models.get(id.0)
    }
}

/// A model in one of the three polygon encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceModel {
    Basic(BasicModel),
    Chunk(ChunkModel),
    Optimized(OptimizedModel),
}

/// Primitive type of a basic meshset, from the top two bits of its
/// type/material word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolyType {
    Triangles,
    Quads,
    NGons,
    Strips,
}

impl PolyType {
    #[must_use]
    pub const fn from_type_material(type_material: u16) -> Self {
        match type_material >> 14 {
            0 => Self::Triangles,
            1 => Self::Quads,
            2 => Self::NGons,
            _ => Self::Strips,
        }
    }
}

/// Material record of a basic model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicMaterial {
    /// ARGB.
    pub diffuse: u32,
    pub texture_id: u32,
    pub attr_flags: u32,
}

/// One primitive group of a basic model.
#[derive(Debug, Clone, PartialEq)]
pub struct Meshset {
    /// Packed type and material index, as stored.
    pub type_material: u16,
    /// Number of primitives. Strip primitives carry their own length header.
    pub poly_count: u16,
    /// Raw primitive stream.
    pub indices: Vec<u16>,
    /// Per-loop UVs, `u`/`v` in 1/256 units.
    pub uvs: Option<Vec<[i16; 2]>>,
}

impl Meshset {
    #[must_use]
    pub const fn material_index(&self) -> u16 {
        self.type_material & 0x3FFF
    }

    #[must_use]
    pub const fn poly_type(&self) -> PolyType {
        PolyType::from_type_material(self.type_material)
    }
}

/// Fixed-format model: shared point arrays plus meshsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicModel {
    pub points: Vec<Vec3>,
    /// Empty when the model has no normals.
    pub normals: Vec<Vec3>,
    pub meshsets: Vec<Meshset>,
    pub materials: Vec<BasicMaterial>,
}

/// Chunk-format model: raw vertex and polygon chunk streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkModel {
    /// Little-endian 32-bit word stream, terminated by an end chunk.
    pub vertex_list: Vec<u8>,
    /// Little-endian 16-bit word stream, terminated by an end chunk.
    pub poly_list: Vec<u8>,
}

/// Parameter of an optimized mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshParameter {
    /// Presence and index width of each vertex attribute.
    IndexAttributes(u32),
    Texture { id: u16, tile: u16 },
    Other { kind: u32, data: u32 },
}

impl MeshParameter {
    #[must_use]
    pub const fn from_raw(kind: u32, data: u32) -> Self {
        match kind {
            1 => Self::IndexAttributes(data),
            8 => Self::Texture {
                id: (data & 0xFFFF) as u16,
                tile: (data >> 16) as u16,
            },
            _ => Self::Other { kind, data },
        }
    }
}

/// One mesh of an optimized model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizedMesh {
    pub parameters: Vec<MeshParameter>,
    /// Big-endian primitive stream.
    pub primitives: Vec<u8>,
}

/// Packed binary model with separate attribute arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizedModel {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// RGBA.
    pub colors: Vec<[u8; 4]>,
    pub uvs: Vec<Vec2>,
    pub opaque: Vec<OptimizedMesh>,
    pub translucent: Vec<OptimizedMesh>,
}
