//! Conversion options and upload credentials.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Literal output argument that selects remote upload.
pub const UPLOAD_MODE: &str = "upload";

/// Directory under the content root that all local output goes to.
pub const CONTENT_SUBDIR: &str = "salvl";

/// Number of attempts made for each upload request.
pub const UPLOAD_ATTEMPTS: u32 = 10;

/// Pause between failed upload attempts.
pub const UPLOAD_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Where generated assets go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Write into `<content>/salvl/` and reference files with `rbxasset://`.
    Local(PathBuf),
    /// Upload to the asset service and reference `rbxassetid://` ids.
    Upload,
}

impl OutputMode {
    #[must_use]
    pub fn parse(arg: &str) -> Self {
        if arg == UPLOAD_MODE {
            Self::Upload
        } else {
            Self::Local(PathBuf::from(arg))
        }
    }

    #[must_use]
    pub fn is_upload(&self) -> bool {
        matches!(self, Self::Upload)
    }
}

/// Everything a conversion run needs.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub output: OutputMode,
    /// Uniform scale applied to translations and part sizes.
    pub scale: f32,
    pub level_path: PathBuf,
    pub texture_index_path: PathBuf,
    /// Smallest bounding box extent given to a mesh part.
    pub min_extent: f32,
    /// Where intermediate files go in upload mode.
    pub work_dir: PathBuf,
}

impl ConvertOptions {
    /// Build options from the four positional arguments.
    pub fn from_args(output: &str, scale: &str, level: &str, texture_index: &str) -> Result<Self> {
        let scale: f32 = scale
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("scale {scale:?} is not a number")))?;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidArgument(format!("scale must be positive, got {scale}")));
        }

        Ok(Self {
            output: OutputMode::parse(output),
            scale,
            level_path: PathBuf::from(level),
            texture_index_path: PathBuf::from(texture_index),
            min_extent: salvl_decode::DEFAULT_MIN_EXTENT,
            work_dir: std::env::temp_dir().join(CONTENT_SUBDIR),
        })
    }

    /// Directory generated files are written to.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        match &self.output {
            OutputMode::Local(content) => content.join(CONTENT_SUBDIR),
            OutputMode::Upload => self.work_dir.clone(),
        }
    }
}

/// Environment variable holding the session cookie.
pub const COOKIE_ENV: &str = "ROBLOSECURITY";
/// Environment variable naming a file that holds the session cookie.
pub const COOKIE_FILE_ENV: &str = "SALVL_COOKIE_FILE";
const COOKIE_FILE_DEFAULT: &str = ".roblosecurity";

/// Locate the upload session cookie.
///
/// Looks at `ROBLOSECURITY`, then the file named by `SALVL_COOKIE_FILE`, then
/// `~/.roblosecurity`.
pub fn load_credential() -> Result<String> {
    if let Ok(cookie) = std::env::var(COOKIE_ENV)
        && !cookie.trim().is_empty()
    {
        return Ok(cookie.trim().to_owned());
    }

    let path = match std::env::var_os(COOKIE_FILE_ENV) {
        Some(path) => PathBuf::from(path),
        None => std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(|home| Path::new(&home).join(COOKIE_FILE_DEFAULT))
            .ok_or_else(|| Error::Upload("no home directory to look for a session cookie in".into()))?,
    };
    read_credential_file(&path)
}

fn read_credential_file(path: &Path) -> Result<String> {
    let cookie = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let cookie = cookie.trim();
    if cookie.is_empty() {
        return Err(Error::Upload(format!("session cookie file {} is empty", path.display())));
    }
    Ok(cookie.to_owned())
}
