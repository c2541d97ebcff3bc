//! Level-wide mesh building: decoder dispatch, caching and normalization.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, warn};

use crate::error::{DecodeError, DecodeResult};
use crate::part::{Mesh, MeshId, MeshPart, PartRef};
use crate::placement::MeshInstance;
use crate::source::{LandTable, ModelId, SourceModel};

/// Level-wide information a decoder needs to translate materials.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeContext {
    /// Number of entries in the level's texture list.
    pub texture_count: usize,
}

impl DecodeContext {
    /// Check a texture id against the texture list.
    ///
    /// Out-of-range ids are not an error; the caller decodes the part as
    /// untextured.
    #[must_use]
    pub fn resolve_texture(&self, id: u32) -> Option<u32> {
        if (id as usize) < self.texture_count {
            Some(id)
        } else {
            warn!(id, count = self.texture_count, "texture id out of range, decoding untextured");
            None
        }
    }
}

/// Turns one source model encoding into a [`Mesh`].
pub trait PolygonDecoder {
    fn decode(&self, ctx: &DecodeContext) -> DecodeResult<Mesh>;
}

impl PolygonDecoder for SourceModel {
    fn decode(&self, ctx: &DecodeContext) -> DecodeResult<Mesh> {
        match self {
            Self::Basic(model) => model.decode(ctx),
            Self::Chunk(model) => model.decode(ctx),
            Self::Optimized(model) => model.decode(ctx),
        }
    }
}

/// Every mesh of a level plus one instance per placed object.
#[derive(Debug, Clone, Default)]
pub struct LevelGeometry {
    pub meshes: Vec<Mesh>,
    /// In object order.
    pub instances: Vec<MeshInstance>,
}

impl LevelGeometry {
    #[must_use]
    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    #[must_use]
    pub fn part(&self, part: PartRef) -> Option<&MeshPart> {
        self.mesh(part.mesh)?.parts.get(&part.key)
    }
}

/// Decode every model referenced by the landtable's objects.
///
/// Each distinct model is decoded and normalized once; later objects that
/// reference it share the cached mesh. A mesh is marked visible if any
/// referencing object is visible.
pub fn build_geometry(land: &LandTable, min_extent: f32) -> DecodeResult<LevelGeometry> {
    let ctx = DecodeContext {
        texture_count: land.texture_count,
    };

    let mut geometry = LevelGeometry::default();
    let mut cache: HashMap<ModelId, MeshId> = HashMap::new();

    for object in &land.objects {
        let mesh_id = match cache.entry(object.model) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let model = land.model(object.model).ok_or(DecodeError::InvalidIndex {
                    index: object.model.0,
                    len: land.models.len(),
                })?;
                let mut mesh = model.decode(&ctx)?;
                mesh.aabb_correct(min_extent);
                debug!(
                    model = object.model.0,
                    parts = mesh.parts.len(),
                    triangles = mesh.triangle_count(),
                    "decoded model"
                );

                geometry.meshes.push(mesh);
                *entry.insert(MeshId(geometry.meshes.len() - 1))
            }
        };

        if object.surface.is_visible() {
            geometry.meshes[mesh_id.0].visible = true;
        }
        geometry
            .instances
            .push(MeshInstance::from_object(mesh_id, object));
    }

    Ok(geometry)
}
