//! Level container reading.
//!
//! A level file is a little-endian memory image: an 8-byte magic/version
//! word, a landtable offset, then the landtable and everything it points at.
//! Pointers are file offsets, with zero meaning null. The reader walks the
//! COL list and lifts every referenced model into the source object model
//! of [`salvl_decode::source`], sharing models by file offset.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use glam::{Vec2, Vec3};
use salvl_decode::chunk::{poly_list_len, vertex_list_len};
use salvl_decode::cursor::Cursor;
use salvl_decode::source::{
    BasicMaterial, BasicModel, ChunkModel, MeshParameter, Meshset, OptimizedMesh, OptimizedModel, PolyType,
};
use salvl_decode::{DecodeResult, LandTable, LevelObject, ModelId, RotationOrder, SourceModel, SurfaceFlags};

use crate::error::{Error, Result};

const MAGIC_MASK: u64 = 0x00FF_FFFF_FFFF_FFFF;
const SA1LVL: u64 = 0x4C56_4C31_4153;
const SA2LVL: u64 = 0x4C56_4C32_4153;
const SA2BLVL: u64 = 0x004C_564C_4232_4153;

/// Surface bits shared by both games.
const SURFACE_SOLID: u32 = 0x1;
const SURFACE_VISIBLE: u32 = 0x8000_0000;

/// Which game a level comes from, and so which layouts it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelFormat {
    Sa1,
    Sa2,
    /// Second game with optimized models in place of chunk models.
    Sa2b,
}

impl LevelFormat {
    fn from_magic(magic: u64) -> Option<Self> {
        match magic {
            SA1LVL => Some(Self::Sa1),
            SA2LVL => Some(Self::Sa2),
            SA2BLVL => Some(Self::Sa2b),
            _ => None,
        }
    }

    /// Offset of the COL list pointer within the landtable. The second game
    /// adds four 16-bit fields ahead of the far clip distance.
    const fn col_list_field(self) -> usize {
        match self {
            Self::Sa1 => 0xC,
            Self::Sa2 | Self::Sa2b => 0x10,
        }
    }

    /// Size of one COL record.
    const fn col_stride(self) -> usize {
        match self {
            Self::Sa1 => 0x24,
            Self::Sa2 | Self::Sa2b => 0x20,
        }
    }

    /// Offsets of the object pointer and the surface flags within a COL.
    const fn col_fields(self) -> (usize, usize) {
        match self {
            Self::Sa1 => (0x18, 0x20),
            Self::Sa2 | Self::Sa2b => (0x10, 0x1C),
        }
    }

    /// Size of one basic meshset; the first game's carries an extra word.
    const fn meshset_stride(self) -> usize {
        match self {
            Self::Sa1 => 0x1C,
            Self::Sa2 | Self::Sa2b => 0x18,
        }
    }
}

/// A level read from disk.
#[derive(Debug, Clone)]
pub struct Level {
    pub format: LevelFormat,
    pub version: u8,
    pub landtable: LandTable,
}

/// Read and parse a level file.
pub fn load_level(path: &Path) -> Result<Level> {
    let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    read_level(&data)
}

/// Parse a level from memory.
pub fn read_level(data: &[u8]) -> Result<Level> {
    let mut header = Cursor::new(data);
    let raw = header.read_u64()?;
    let format = LevelFormat::from_magic(raw & MAGIC_MASK)
        .ok_or_else(|| Error::InvalidLevel(format!("unknown level magic {:#x}", raw & MAGIC_MASK)))?;
    let version = (raw >> 56) as u8;
    let landtable = header.read_u32()?;
    if landtable == 0 {
        return Err(Error::InvalidLevel("level has no landtable".into()));
    }

    tracing::debug!(?format, version, landtable, "reading level");
    let mut reader = LevelReader {
        data,
        format,
        models: Vec::new(),
        model_ids: HashMap::new(),
    };
    let objects = reader.read_landtable(landtable as usize)?;

    Ok(Level {
        format,
        version,
        landtable: LandTable {
            objects,
            models: reader.models,
            texture_count: 0,
        },
    })
}

/// Model encoding expected behind an object's model pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelKind {
    Basic,
    Chunk,
    Optimized,
}

struct LevelReader<'a> {
    data: &'a [u8],
    format: LevelFormat,
    models: Vec<SourceModel>,
    model_ids: HashMap<usize, ModelId>,
}

impl<'a> LevelReader<'a> {
    fn at(&self, offset: usize) -> DecodeResult<Cursor<'a>> {
        Cursor::at(self.data, offset)
    }

    fn read_landtable(&mut self, offset: usize) -> Result<Vec<LevelObject>> {
        let mut cursor = self.at(offset)?;
        let col_count = cursor.read_i16()?;
        let visible_count = cursor.read_i16()?;
        cursor.seek(offset + self.format.col_list_field())?;
        let col_list = cursor.read_u32()? as usize;

        tracing::info!("Reading COLs...");
        let (object_field, flags_field) = self.format.col_fields();
        let mut objects = Vec::new();

        for i in 0..col_count.max(0) {
            let col = col_list + usize::from(i.unsigned_abs()) * self.format.col_stride();
            let object = self.at(col + object_field)?.read_u32()? as usize;
            let flags = self.at(col + flags_field)?.read_u32()?;
            if object == 0 {
                continue;
            }

            let kind = match self.format {
                LevelFormat::Sa1 => ModelKind::Basic,
                LevelFormat::Sa2 | LevelFormat::Sa2b => {
                    let visual = if visible_count >= 0 {
                        i < visible_count
                    } else {
                        flags & SURFACE_VISIBLE != 0
                    };
                    match (visual, self.format) {
                        (false, _) => ModelKind::Basic,
                        (true, LevelFormat::Sa2b) => ModelKind::Optimized,
                        (true, _) => ModelKind::Chunk,
                    }
                }
            };

            if let Some(object) = self.read_object(object, flags, kind)? {
                objects.push(object);
            }
        }

        Ok(objects)
    }

    fn read_object(&mut self, offset: usize, flags: u32, kind: ModelKind) -> Result<Option<LevelObject>> {
        let mut cursor = self.at(offset)?;
        let eval_flags = cursor.read_u32()?;
        let model = cursor.read_u32()? as usize;
        if model == 0 {
            return Ok(None);
        }
        let position = cursor.read_vec3()?;
        let angles = [cursor.read_i32()?, cursor.read_i32()?, cursor.read_i32()?];

        let model = match self.model_ids.entry(model) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let source = match kind {
                    ModelKind::Basic => SourceModel::Basic(read_basic_model(self.data, model, self.format)?),
                    ModelKind::Chunk => SourceModel::Chunk(read_chunk_model(self.data, model)?),
                    ModelKind::Optimized => SourceModel::Optimized(read_optimized_model(self.data, model)?),
                };
                self.models.push(source);
                *entry.insert(ModelId(self.models.len() - 1))
            }
        };

        Ok(Some(LevelObject {
            model,
            position,
            angles,
            rotation_order: RotationOrder::from_eval_flags(eval_flags),
            surface: SurfaceFlags::remap(flags, SURFACE_SOLID, SURFACE_VISIBLE),
        }))
    }
}

/// Read `count` records of `size` bytes at `offset`.
///
/// The whole span is bounds-checked before any record is parsed, so a
/// corrupt count cannot trigger a huge allocation.
fn read_array<T>(
    data: &[u8],
    offset: usize,
    count: usize,
    size: usize,
    mut read: impl FnMut(&mut Cursor<'_>) -> DecodeResult<T>,
) -> DecodeResult<Vec<T>> {
    if offset == 0 || count == 0 {
        return Ok(Vec::new());
    }
    let mut span = Cursor::at(data, offset)?;
    let mut cursor = Cursor::new(span.take(count.saturating_mul(size))?);
    (0..count).map(|_| read(&mut cursor)).collect()
}

fn read_uv(cursor: &mut Cursor<'_>) -> DecodeResult<[i16; 2]> {
    Ok([cursor.read_i16()?, cursor.read_i16()?])
}

fn read_basic_model(data: &[u8], offset: usize, format: LevelFormat) -> Result<BasicModel> {
    let mut cursor = Cursor::at(data, offset)?;
    let points = cursor.read_u32()? as usize;
    let normals = cursor.read_u32()? as usize;
    let point_count = usize::try_from(cursor.read_i32()?)
        .map_err(|_| Error::InvalidLevel(format!("model at {offset:#x} has a negative point count")))?;
    let meshsets = cursor.read_u32()? as usize;
    let materials = cursor.read_u32()? as usize;
    let meshset_count = usize::from(cursor.read_u16()?);
    let material_count = usize::from(cursor.read_u16()?);

    let meshsets = (0..meshset_count)
        .map(|i| read_meshset(data, meshsets + i * format.meshset_stride()))
        .collect::<Result<Vec<_>>>()?;

    Ok(BasicModel {
        points: read_array(data, points, point_count, 12, |c| c.read_vec3())?,
        normals: read_array(data, normals, point_count, 12, |c| c.read_vec3())?,
        meshsets,
        materials: read_array(data, materials, material_count, 0x14, |c| {
            let diffuse = c.read_u32()?;
            c.skip(8)?;
            Ok(BasicMaterial {
                diffuse,
                texture_id: c.read_u32()?,
                attr_flags: c.read_u32()?,
            })
        })?,
    })
}

fn read_meshset(data: &[u8], offset: usize) -> Result<Meshset> {
    let mut cursor = Cursor::at(data, offset)?;
    let type_material = cursor.read_u16()?;
    let poly_count = cursor.read_u16()?;
    let meshes = cursor.read_u32()? as usize;
    cursor.skip(12)?;
    let uvs = cursor.read_u32()? as usize;

    // Strip and n-gon primitives carry a length header, so the stream has
    // to be walked to find its end.
    let mut stream = Cursor::at(data, meshes)?;
    let mut indices = Vec::new();
    let mut loops = 0;
    let poly_type = PolyType::from_type_material(type_material);
    for _ in 0..poly_count {
        let length = match poly_type {
            PolyType::Triangles => 3,
            PolyType::Quads => 4,
            PolyType::NGons | PolyType::Strips => {
                let header = stream.read_u16()?;
                indices.push(header);
                usize::from(header & 0x7FFF)
            }
        };
        for _ in 0..length {
            indices.push(stream.read_u16()?);
        }
        loops += length;
    }

    let uvs = if uvs == 0 {
        None
    } else {
        Some(read_array(data, uvs, loops, 4, read_uv)?)
    };

    Ok(Meshset {
        type_material,
        poly_count,
        indices,
        uvs,
    })
}

fn read_chunk_model(data: &[u8], offset: usize) -> Result<ChunkModel> {
    let mut cursor = Cursor::at(data, offset)?;
    let vertex_list = cursor.read_u32()? as usize;
    let poly_list = cursor.read_u32()? as usize;

    let stream = |start: usize, len: fn(&[u8]) -> DecodeResult<usize>| -> Result<Vec<u8>> {
        if start == 0 {
            return Ok(Vec::new());
        }
        let rest = data
            .get(start..)
            .ok_or_else(|| Error::InvalidLevel(format!("chunk stream at {start:#x} is past the end of the file")))?;
        Ok(rest[..len(rest)?].to_vec())
    };

    Ok(ChunkModel {
        vertex_list: stream(vertex_list, vertex_list_len)?,
        poly_list: stream(poly_list, poly_list_len)?,
    })
}

mod vertex_attribute {
    pub const POSITION: u8 = 1;
    pub const NORMAL: u8 = 2;
    pub const COLOR0: u8 = 3;
    pub const TEX0: u8 = 5;
    pub const END: u8 = 0xFF;
}

fn read_optimized_model(data: &[u8], offset: usize) -> Result<OptimizedModel> {
    let mut cursor = Cursor::at(data, offset)?;
    let attributes = cursor.read_u32()? as usize;
    cursor.skip(4)?;
    let opaque = cursor.read_u32()? as usize;
    let translucent = cursor.read_u32()? as usize;
    let opaque_count = usize::from(cursor.read_u16()?);
    let translucent_count = usize::from(cursor.read_u16()?);

    let mut model = OptimizedModel {
        opaque: read_optimized_meshes(data, opaque, opaque_count)?,
        translucent: read_optimized_meshes(data, translucent, translucent_count)?,
        ..OptimizedModel::default()
    };

    let mut record = Cursor::at(data, attributes)?;
    loop {
        let kind = record.read_u8()?;
        if kind == vertex_attribute::END {
            break;
        }
        record.skip(1)?;
        let count = usize::from(record.read_u16()?);
        record.skip(4)?;
        let values = record.read_u32()? as usize;
        record.skip(4)?;

        match kind {
            vertex_attribute::POSITION => model.positions = read_array(data, values, count, 12, |c| c.read_vec3())?,
            vertex_attribute::NORMAL => model.normals = read_array(data, values, count, 12, |c| c.read_vec3())?,
            vertex_attribute::COLOR0 => {
                model.colors = read_array(data, values, count, 4, |c| {
                    Ok([c.read_u8()?, c.read_u8()?, c.read_u8()?, c.read_u8()?])
                })?;
            }
            vertex_attribute::TEX0 => {
                model.uvs = read_array(data, values, count, 4, |c| {
                    let [u, v] = read_uv(c)?;
                    Ok(Vec2::new(f32::from(u), f32::from(v)) / 256.0)
                })?;
            }
            other => tracing::debug!(kind = other, "skipping vertex attribute"),
        }
    }

    Ok(model)
}

fn read_optimized_meshes(data: &[u8], offset: usize, count: usize) -> Result<Vec<OptimizedMesh>> {
    let records = read_array(data, offset, count, 0x10, |c| {
        Ok((
            c.read_u32()? as usize,
            c.read_u32()? as usize,
            c.read_u32()? as usize,
            c.read_u32()? as usize,
        ))
    })?;

    records
        .into_iter()
        .map(|(parameters, parameter_count, primitives, primitives_len)| -> Result<OptimizedMesh> {
            let parameters = read_array(data, parameters, parameter_count, 8, |c| {
                Ok(MeshParameter::from_raw(c.read_u32()?, c.read_u32()?))
            })?;
            let primitives = if primitives == 0 {
                Vec::new()
            } else {
                Cursor::at(data, primitives)?.take(primitives_len)?.to_vec()
            };
            Ok(OptimizedMesh { parameters, primitives })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian level image builder with absolute offsets.
    #[derive(Default)]
    struct Image(Vec<u8>);

    impl Image {
        fn pos(&self) -> u32 {
            self.0.len() as u32
        }
        fn u8(&mut self, v: u8) -> &mut Self {
            self.0.push(v);
            self
        }
        fn u16(&mut self, v: u16) -> &mut Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn i16(&mut self, v: i16) -> &mut Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn u32(&mut self, v: u32) -> &mut Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn i32(&mut self, v: i32) -> &mut Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn f32(&mut self, v: f32) -> &mut Self {
            self.u32(v.to_bits())
        }
        fn vec3(&mut self, v: Vec3) -> &mut Self {
            self.f32(v.x).f32(v.y).f32(v.z)
        }
        fn zeros(&mut self, n: usize) -> &mut Self {
            self.0.resize(self.0.len() + n, 0);
            self
        }
        fn patch_u32(&mut self, at: u32, v: u32) {
            let at = at as usize;
            self.0[at..at + 4].copy_from_slice(&v.to_le_bytes());
        }
    }

    /// A first-game level: one COL whose object has a one-triangle basic
    /// model with no materials.
    fn sa1_triangle_level(position: Vec3, flags: u32) -> Vec<u8> {
        let mut image = Image::default();
        // Header: magic "SA1LVL", version 3, landtable offset, metadata offset.
        image.0.extend_from_slice(b"SA1LVL\0\x03");
        let landtable_ptr = image.pos();
        image.u32(0).u32(0);

        let points = image.pos();
        image
            .vec3(Vec3::new(-1.0, 0.0, -1.0))
            .vec3(Vec3::new(1.0, 0.0, -1.0))
            .vec3(Vec3::new(0.0, 0.0, 2.0));
        let indices = image.pos();
        image.u16(0).u16(1).u16(2).u16(0);
        let meshset = image.pos();
        image.u16(0).u16(1).u32(indices).zeros(0x1C - 8);
        let model = image.pos();
        image.u32(points).u32(0).i32(3).u32(meshset).u32(0).u16(1).u16(0).zeros(0x10);
        let object = image.pos();
        image.u32(0).u32(model).vec3(position).i32(0).i32(0).i32(0).zeros(0x34 - 0x20);
        let col = image.pos();
        image.zeros(0x18).u32(object).u32(0).u32(flags);
        let landtable = image.pos();
        image.i16(1).i16(0).u32(0).f32(0.0).u32(col).zeros(0x10);

        image.patch_u32(landtable_ptr, landtable);
        image.0
    }

    #[test]
    fn reads_first_game_level() {
        let data = sa1_triangle_level(Vec3::new(1.0, 2.0, 3.0), 0x8000_0001);
        let level = read_level(&data).unwrap();
        assert_eq!(level.format, LevelFormat::Sa1);
        assert_eq!(level.version, 3);

        let land = &level.landtable;
        assert_eq!(land.objects.len(), 1);
        let object = &land.objects[0];
        assert_eq!(object.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(object.rotation_order, RotationOrder::Yxz);
        assert!(object.surface.is_solid() && object.surface.is_visible());

        let SourceModel::Basic(model) = &land.models[0] else {
            panic!("expected basic model");
        };
        assert_eq!(model.points.len(), 3);
        assert!(model.normals.is_empty());
        assert_eq!(model.meshsets[0].indices, [0, 1, 2]);
        assert_eq!(model.meshsets[0].uvs, None);
    }

    #[test]
    fn rejects_unknown_magic() {
        let mut data = sa1_triangle_level(Vec3::ZERO, 1);
        data[0] = b'X';
        assert!(matches!(read_level(&data), Err(Error::InvalidLevel(_))));
    }

    #[test]
    fn truncated_level_is_an_error() {
        let data = sa1_triangle_level(Vec3::ZERO, 1);
        // Cuts the landtable short of its COL list pointer.
        assert!(read_level(&data[..data.len() - 0x1C]).is_err());
        assert!(read_level(&data[..4]).is_err());
    }

    #[test]
    fn strip_meshset_stream_is_walked() {
        let mut image = Image::default();
        image.zeros(4);
        let indices = image.pos();
        image.u16(4).u16(0).u16(1).u16(2).u16(3).u16(0x8003).u16(3).u16(2).u16(1);
        let uvs = image.pos();
        for i in 0..7 {
            image.i16(i).i16(-i);
        }
        let meshset = image.pos();
        image.u16(0xC000).u16(2).u32(indices).u32(0).u32(0).u32(0).u32(uvs);

        let meshset = read_meshset(&image.0, meshset as usize).unwrap();
        assert_eq!(meshset.indices.len(), 9);
        assert_eq!(meshset.uvs.as_ref().map(Vec::len), Some(7));
        assert_eq!(meshset.uvs.unwrap()[6], [6, -6]);
    }

    #[test]
    fn chunk_model_streams_are_bounded() {
        let mut image = Image::default();
        image.zeros(4);
        let vertex_list = image.pos();
        image.u32(34 | (4 << 16)).u32(1 << 16).vec3(Vec3::ONE).u32(0xFF);
        let poly_list = image.pos();
        image.u16(8).u16(0).u16(0xFF);
        let model = image.pos();
        image.u32(vertex_list).u32(poly_list);
        image.zeros(16);

        let model = read_chunk_model(&image.0, model as usize).unwrap();
        assert_eq!(model.vertex_list.len(), 24);
        assert_eq!(model.poly_list, [8, 0, 0, 0, 0xFF, 0]);
    }

    #[test]
    fn optimized_model_attributes_and_meshes() {
        let mut image = Image::default();
        image.zeros(4);
        let positions = image.pos();
        image.vec3(Vec3::X).vec3(Vec3::Y).vec3(Vec3::Z);
        let uvs = image.pos();
        image.i16(256).i16(512);
        let parameters = image.pos();
        image.u32(1).u32(0x808).u32(8).u32(0x0004_0002);
        let primitives = image.pos();
        image.u8(0x90).u8(0).u8(3).u8(0).u8(0).u8(1).u8(0).u8(2).u8(0).u8(0).u8(0).u8(0);
        let meshes = image.pos();
        image.u32(parameters).u32(2).u32(primitives).u32(12);
        let attributes = image.pos();
        image.u8(1).u8(0).u16(3).u32(0).u32(positions).u32(36);
        image.u8(5).u8(0).u16(1).u32(0).u32(uvs).u32(4);
        image.u8(0xFF).zeros(15);
        let model = image.pos();
        image.u32(attributes).u32(0).u32(meshes).u32(0).u16(1).u16(0);

        let model = read_optimized_model(&image.0, model as usize).unwrap();
        assert_eq!(model.positions, [Vec3::X, Vec3::Y, Vec3::Z]);
        assert_eq!(model.uvs, [Vec2::new(1.0, 2.0)]);
        assert_eq!(model.opaque.len(), 1);
        assert!(model.translucent.is_empty());
        assert_eq!(
            model.opaque[0].parameters,
            [
                MeshParameter::IndexAttributes(0x808),
                MeshParameter::Texture { id: 2, tile: 4 }
            ]
        );
        assert_eq!(model.opaque[0].primitives.len(), 12);
    }

    #[test]
    fn second_game_visible_count_selects_chunk_models() {
        let mut image = Image::default();
        image.0.extend_from_slice(b"SA2LVL\0\x03");
        let landtable_ptr = image.pos();
        image.u32(0).u32(0);

        let vertex_list = image.pos();
        image.u32(0xFF);
        let poly_list = image.pos();
        image.u16(0xFF).u16(0);
        let chunk = image.pos();
        image.u32(vertex_list).u32(poly_list).zeros(0x10);
        let basic = image.pos();
        image.u32(0).u32(0).i32(0).u32(0).u32(0).u16(0).u16(0).zeros(0x10);

        let mut objects = Vec::new();
        for model in [chunk, basic] {
            objects.push(image.pos());
            image.u32(0x20).u32(model).zeros(0x34 - 8);
        }
        let cols = image.pos();
        for (object, flags) in objects.iter().zip([0x8000_0000u32, 0x1]) {
            image.zeros(0x10).u32(*object).u32(0).u32(0).u32(flags);
        }
        let landtable = image.pos();
        image.i16(2).i16(1).zeros(8).f32(3000.0).u32(cols).zeros(0x10);
        image.patch_u32(landtable_ptr, landtable);

        let level = read_level(&image.0).unwrap();
        assert_eq!(level.format, LevelFormat::Sa2);
        let land = &level.landtable;
        assert!(matches!(land.models[0], SourceModel::Chunk(_)));
        assert!(matches!(land.models[1], SourceModel::Basic(_)));
        assert_eq!(land.objects[0].rotation_order, RotationOrder::Zyx);
        assert!(land.objects[0].surface.is_visible());
        assert!(land.objects[1].surface.is_solid());
    }

    #[test]
    fn optimized_models_fill_the_visible_slots() {
        let mut image = Image::default();
        image.0.extend_from_slice(b"SA2BLVL\x03");
        let landtable_ptr = image.pos();
        image.u32(0).u32(0);

        let attributes = image.pos();
        image.u8(0xFF).zeros(15);
        let optimized = image.pos();
        image.u32(attributes).u32(0).u32(0).u32(0).u16(0).u16(0);
        let basic = image.pos();
        image.u32(0).u32(0).i32(0).u32(0).u32(0).u16(0).u16(0).zeros(0x10);

        let mut objects = Vec::new();
        for model in [optimized, optimized, basic] {
            objects.push(image.pos());
            image.u32(0).u32(model).zeros(0x34 - 8);
        }
        let cols = image.pos();
        for object in &objects {
            image.zeros(0x10).u32(*object).u32(0).u32(0).u32(0x8000_0001);
        }
        let landtable = image.pos();
        image.i16(3).i16(2).zeros(8).f32(3000.0).u32(cols).zeros(0x10);
        image.patch_u32(landtable_ptr, landtable);

        let level = read_level(&image.0).unwrap();
        assert_eq!(level.format, LevelFormat::Sa2b);
        assert_eq!(level.version, 3);

        let land = &level.landtable;
        assert_eq!(land.objects.len(), 3);
        assert_eq!(land.models.len(), 2);
        assert_eq!(land.objects[0].model, land.objects[1].model);
        assert!(matches!(land.models[0], SourceModel::Optimized(_)));
        assert!(matches!(land.models[1], SourceModel::Basic(_)));
        assert_eq!(land.objects[2].model, ModelId(1));
    }

    #[test]
    fn landtable_layout_depends_on_game() {
        assert_eq!(LevelFormat::Sa1.col_list_field(), 0xC);
        assert_eq!(LevelFormat::Sa2.col_list_field(), 0x10);
        assert_eq!(LevelFormat::Sa2b.col_list_field(), 0x10);
    }
}
