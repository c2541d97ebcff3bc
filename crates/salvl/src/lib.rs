//! Convert landtable level files into mesh files and a scene document.
//!
//! This crate wraps the pure geometry core of [`salvl_decode`] with
//! everything that touches the outside world: reading level containers,
//! preparing textures, writing mesh files, uploading assets and emitting the
//! XML scene.
//!
//! # Example
//!
//! ```no_run
//! use salvl::{ConvertOptions, convert};
//!
//! # async fn run() -> salvl::Result<()> {
//! let options = ConvertOptions::from_args("content", "1.0", "stage.sa1lvl", "textures/index.txt")?;
//! let report = convert(&options, None).await?;
//! println!("wrote {}", report.scene_path.display());
//! # Ok(())
//! # }
//! ```

mod error;

pub mod convert;
pub mod lvl;
pub mod options;
pub mod scene;
pub mod texture;
pub mod upload;

pub use convert::{ConvertReport, convert};
pub use error::{Error, Result};
pub use lvl::{Level, LevelFormat, load_level, read_level};
pub use options::{ConvertOptions, OutputMode, load_credential};
pub use scene::{Item, Property, Scene, build_scene, encode_proxy};
pub use texture::{FlipVariant, Texture, TextureSet, prepare_textures};
pub use upload::AssetUploader;

// Re-export the geometry core for convenience.
pub use salvl_decode;
