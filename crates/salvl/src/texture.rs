//! Texture index loading and mirrored texture variants.
//!
//! Mirrored addressing has no direct equivalent in the target engine, so each
//! texture is also written pre-mirrored: twice as wide (`fu_`), twice as tall
//! (`fv_`) or both (`fuv_`). Decoded texture coordinates are halved on the
//! mirrored axes to match.

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use salvl_decode::{Material, MaterialFlags};

use crate::error::{Error, Result};

/// Which pre-mirrored copy of a texture a material samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlipVariant {
    Plain,
    U,
    V,
    Uv,
}

impl FlipVariant {
    pub const ALL: [Self; 4] = [Self::Plain, Self::U, Self::V, Self::Uv];

    #[must_use]
    pub const fn from_flags(flags: MaterialFlags) -> Self {
        match (
            flags.contains(MaterialFlags::FLIP_U),
            flags.contains(MaterialFlags::FLIP_V),
        ) {
            (false, false) => Self::Plain,
            (true, false) => Self::U,
            (false, true) => Self::V,
            (true, true) => Self::Uv,
        }
    }

    /// File name prefix of this variant.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Plain => "",
            Self::U => "fu_",
            Self::V => "fv_",
            Self::Uv => "fuv_",
        }
    }

    /// Build this variant from the source image.
    #[must_use]
    pub fn apply(self, image: &RgbaImage) -> RgbaImage {
        match self {
            Self::Plain => image.clone(),
            Self::U => mirror_u(image),
            Self::V => mirror_v(image),
            Self::Uv => mirror_v(&mirror_u(image)),
        }
    }
}

/// Append a horizontally mirrored copy to the right of `image`.
#[must_use]
pub fn mirror_u(image: &RgbaImage) -> RgbaImage {
    let width = image.width();
    RgbaImage::from_fn(width * 2, image.height(), |x, y| {
        let x = if x < width { x } else { width * 2 - x - 1 };
        *image.get_pixel(x, y)
    })
}

/// Append a vertically mirrored copy below `image`.
#[must_use]
pub fn mirror_v(image: &RgbaImage) -> RgbaImage {
    let height = image.height();
    RgbaImage::from_fn(image.width(), height * 2, |x, y| {
        let y = if y < height { y } else { height * 2 - y - 1 };
        *image.get_pixel(x, y)
    })
}

/// Whether any pixel is less than fully opaque.
#[must_use]
pub fn is_transparent(image: &RgbaImage) -> bool {
    image.pixels().any(|p| p[3] != 0xFF)
}

/// File name from one texture index line.
///
/// Lines look like `<id>,<file name>,<dimensions>`; the name is everything
/// between the first and last comma. A line with a single comma names
/// everything after it.
#[must_use]
pub fn index_entry_name(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    let first = line.find(',')?;
    let last = line.rfind(',')?;
    let name = if first == last {
        &line[first + 1..]
    } else {
        &line[first + 1..last]
    };
    (!name.is_empty()).then_some(name)
}

/// One texture of the level's texture list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub transparent: bool,
}

impl Texture {
    /// Output file name of one variant.
    #[must_use]
    pub fn variant_name(&self, variant: FlipVariant) -> String {
        format!("{}{}", variant.prefix(), self.name)
    }
}

/// Textures in index order; a material's texture id indexes this list.
#[derive(Debug, Clone, Default)]
pub struct TextureSet {
    pub textures: Vec<Texture>,
}

impl TextureSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Texture> {
        self.textures.get(id as usize)
    }

    /// Texture and variant file name a part's material samples, if any.
    #[must_use]
    pub fn for_material(&self, material: &Material) -> Option<(&Texture, String)> {
        if !material.is_textured() {
            return None;
        }
        let texture = self.get(material.texture?)?;
        Some((texture, texture.variant_name(FlipVariant::from_flags(material.flags))))
    }
}

/// Read every texture named by the index at `index_path` and write its four
/// variants as PNG into `out_dir`.
///
/// Texture files are looked up next to the index.
pub fn prepare_textures(index_path: &Path, out_dir: &Path) -> Result<TextureSet> {
    tracing::info!("Reading texlist...");
    let index = std::fs::read_to_string(index_path).map_err(|e| Error::io(index_path, e))?;
    let base = index_path.parent().map_or_else(PathBuf::new, Path::to_path_buf);

    let mut set = TextureSet::default();
    for name in index.lines().filter_map(index_entry_name) {
        tracing::info!("  {name}");
        let texture = prepare_texture(&base.join(name), name, out_dir)?;
        set.textures.push(texture);
    }
    Ok(set)
}

fn prepare_texture(source: &Path, name: &str, out_dir: &Path) -> Result<Texture> {
    let bytes = std::fs::read(source).map_err(|e| Error::io(source, e))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|source_err| Error::Image {
            path: source.to_path_buf(),
            source: source_err,
        })?
        .to_rgba8();

    let texture = Texture {
        name: name.to_owned(),
        width: image.width(),
        height: image.height(),
        transparent: is_transparent(&image),
    };

    for variant in FlipVariant::ALL {
        let path = out_dir.join(texture.variant_name(variant));
        variant
            .apply(&image)
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| Error::Image { path, source })?;
    }

    Ok(texture)
}
