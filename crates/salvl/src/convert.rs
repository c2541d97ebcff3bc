//! The conversion pipeline, from level file to mesh files and scene document.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use salvl_decode::{LevelGeometry, MeshId, PartRef, build_geometry, resolve_placements, write_mesh_file};

use crate::error::{Error, Result};
use crate::lvl::load_level;
use crate::options::{CONTENT_SUBDIR, ConvertOptions, OutputMode};
use crate::scene::{PartAssets, TextureAsset, build_scene};
use crate::texture::{FlipVariant, TextureSet, prepare_textures};
use crate::upload::AssetUploader;

/// Name of the scene document written next to the meshes.
pub const SCENE_FILE: &str = "level.rbxmx";

/// A mesh file written for one mesh part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshFileEntry {
    pub part: PartRef,
    pub name: String,
    pub path: PathBuf,
}

/// What a conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertReport {
    pub scene_path: PathBuf,
    pub mesh_files: usize,
    pub textures: usize,
    pub collision: usize,
    pub visual: usize,
}

/// Write one mesh file per mesh part, numbered in mesh then material order.
pub fn write_meshes(geometry: &LevelGeometry, out_dir: &Path) -> Result<Vec<MeshFileEntry>> {
    tracing::info!("Writing meshes...");
    let mut entries = Vec::new();

    for (mesh_index, mesh) in geometry.meshes.iter().enumerate() {
        for (&key, part) in &mesh.parts {
            let name = format!("{}.mesh", entries.len());
            let path = out_dir.join(&name);
            tracing::info!("  {name}");
            std::fs::write(&path, write_mesh_file(part)).map_err(|e| Error::io(&path, e))?;
            entries.push(MeshFileEntry {
                part: PartRef {
                    mesh: MeshId(mesh_index),
                    key,
                },
                name,
                path,
            });
        }
    }

    Ok(entries)
}

/// URL of a file in the local content directory.
#[must_use]
pub fn local_url(name: &str) -> String {
    format!("rbxasset://{CONTENT_SUBDIR}/{name}")
}

/// URL of an uploaded asset.
#[must_use]
pub fn asset_id_url(id: u64) -> String {
    format!("rbxassetid://{id}")
}

/// Resolve part assets given URL lookups for mesh files and texture variants.
///
/// Parts whose texture variant has no URL are emitted untextured.
fn part_assets(
    geometry: &LevelGeometry,
    meshes: &[MeshFileEntry],
    textures: &TextureSet,
    mesh_url: impl Fn(&MeshFileEntry) -> String,
    texture_urls: &HashMap<String, String>,
) -> HashMap<PartRef, PartAssets> {
    meshes
        .iter()
        .filter_map(|entry| {
            let part = geometry.part(entry.part)?;
            let texture = textures
                .for_material(&part.material)
                .and_then(|(texture, variant)| {
                    Some(TextureAsset {
                        url: texture_urls.get(&variant)?.clone(),
                        transparent: texture.transparent,
                    })
                });
            Some((
                entry.part,
                PartAssets {
                    mesh_url: mesh_url(entry),
                    texture,
                    diffuse: part.material.diffuse,
                },
            ))
        })
        .collect()
}

/// Texture variant file names sampled by any part, with their paths.
fn used_texture_variants(
    geometry: &LevelGeometry,
    meshes: &[MeshFileEntry],
    textures: &TextureSet,
    out_dir: &Path,
) -> BTreeMap<String, PathBuf> {
    meshes
        .iter()
        .filter_map(|entry| geometry.part(entry.part))
        .filter_map(|part| textures.for_material(&part.material))
        .map(|(_, variant)| {
            let path = out_dir.join(&variant);
            (variant, path)
        })
        .collect()
}

/// Asset references for local output under the content directory.
#[must_use]
pub fn local_assets(
    geometry: &LevelGeometry,
    meshes: &[MeshFileEntry],
    textures: &TextureSet,
) -> HashMap<PartRef, PartAssets> {
    tracing::info!("Getting rbxasset:// URLs...");
    let texture_urls: HashMap<String, String> = textures
        .textures
        .iter()
        .flat_map(|t| FlipVariant::ALL.map(|v| t.variant_name(v)))
        .map(|name| {
            let url = local_url(&name);
            (name, url)
        })
        .collect();
    part_assets(geometry, meshes, textures, |entry| local_url(&entry.name), &texture_urls)
}

/// Upload every mesh file and every texture variant a part samples.
pub async fn upload_assets(
    uploader: &mut AssetUploader,
    geometry: &LevelGeometry,
    meshes: &[MeshFileEntry],
    textures: &TextureSet,
    out_dir: &Path,
) -> Result<HashMap<PartRef, PartAssets>> {
    tracing::info!("Uploading content...");

    tracing::info!("  Uploading {} meshes...", meshes.len());
    let mut mesh_urls = HashMap::new();
    for entry in meshes {
        let data = std::fs::read(&entry.path).map_err(|e| Error::io(&entry.path, e))?;
        let url = asset_id_url(uploader.upload_mesh(&entry.name, data).await?);
        tracing::info!("  Uploaded mesh {} to {url}", entry.name);
        mesh_urls.insert(entry.part, url);
    }

    let variants = used_texture_variants(geometry, meshes, textures, out_dir);
    tracing::info!("  Uploading {} textures...", variants.len());
    let mut texture_urls = HashMap::new();
    for (name, path) in variants {
        let data = std::fs::read(&path).map_err(|e| Error::io(&path, e))?;
        let url = asset_id_url(uploader.upload_texture(&name, data).await?);
        tracing::info!("  Uploaded texture {name} to {url}");
        texture_urls.insert(name, url);
    }

    Ok(part_assets(
        geometry,
        meshes,
        textures,
        |entry| mesh_urls.get(&entry.part).cloned().unwrap_or_default(),
        &texture_urls,
    ))
}

/// Run a whole conversion.
///
/// `uploader` is required when the options select upload mode and ignored
/// otherwise.
pub async fn convert(options: &ConvertOptions, uploader: Option<&mut AssetUploader>) -> Result<ConvertReport> {
    let out_dir = options.output_dir();
    std::fs::create_dir_all(&out_dir).map_err(|e| Error::io(&out_dir, e))?;

    let textures = prepare_textures(&options.texture_index_path, &out_dir)?;

    tracing::info!("Converting LVL {} to landtable...", options.level_path.display());
    let mut level = load_level(&options.level_path)?;
    level.landtable.texture_count = textures.len();
    let geometry = build_geometry(&level.landtable, options.min_extent)?;

    let meshes = write_meshes(&geometry, &out_dir)?;

    let assets = match (&options.output, uploader) {
        (OutputMode::Local(_), _) => local_assets(&geometry, &meshes, &textures),
        (OutputMode::Upload, Some(uploader)) => {
            upload_assets(uploader, &geometry, &meshes, &textures, &out_dir).await?
        }
        (OutputMode::Upload, None) => {
            return Err(Error::InvalidArgument("upload mode needs an uploader".into()));
        }
    };

    tracing::info!("Placing MeshPart instances...");
    let placements = resolve_placements(&geometry);

    let scene_path = out_dir.join(SCENE_FILE);
    tracing::info!("Writing RBXMX {}...", scene_path.display());
    build_scene(&geometry, &placements, &assets, options.scale).save(&scene_path)?;

    tracing::info!("Complete!");
    Ok(ConvertReport {
        scene_path,
        mesh_files: meshes.len(),
        textures: textures.len(),
        collision: placements.collision.len(),
        visual: placements.visual.len(),
    })
}
