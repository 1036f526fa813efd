//! External tool adapters
//!
//! The file pipeline depends on four collaborators, each behind a trait so
//! the pipeline can be exercised without the real programs installed:
//!
//! - [`FormatValidator`]: structural validity (JHOVE)
//! - [`MetadataProber`]: technical metadata tag bag (exiftool)
//! - [`ImageInspector`]: generic inspection, page count, compression (ImageMagick)
//! - [`PreviewGenerator`]: thumbnail and tile pyramid (libvips)

pub mod discovery;
pub mod error;
pub mod exiftool;
pub mod jhove;
pub mod magick;
mod process;
pub mod types;
pub mod vips;

use std::path::Path;
use std::sync::Arc;

use osprey_meta::ToolsConfig;

pub use discovery::{check_requirements, resolve_path};
pub use error::{Error, Result};
pub use exiftool::ExifTool;
pub use jhove::Jhove;
pub use magick::Magick;
pub use types::{Inspection, ValidationReport};
pub use vips::Vips;

pub trait FormatValidator: Send + Sync {
    fn validate(&self, path: &Path) -> Result<ValidationReport>;
}

pub trait MetadataProber: Send + Sync {
    /// Opaque key/value tags for the file.
    fn probe(&self, path: &Path) -> Result<serde_json::Value>;
}

pub trait ImageInspector: Send + Sync {
    /// Full inspection; a non-zero exit is reported in the result, not as an error.
    fn inspect(&self, path: &Path) -> Result<Inspection>;

    fn page_count(&self, path: &Path) -> Result<u32>;

    /// Compression scheme identifier, e.g. `LZW`.
    fn compression(&self, path: &Path) -> Result<String>;
}

pub trait PreviewGenerator: Send + Sync {
    /// Proportional resize to `width` pixels, keeping the colour profile.
    fn thumbnail(&self, source: &Path, dest: &Path, width: u32) -> Result<()>;

    /// Zoomable tile pyramid at `dest_base` (`.dzi` + `_files`, or `.zip` when archived).
    fn tiles(&self, source: &Path, dest_base: &Path, tile_size: u32, archive: bool) -> Result<()>;
}

/// The external collaborators used by one pipeline.
#[derive(Clone)]
pub struct Toolkit {
    pub validator: Arc<dyn FormatValidator>,
    pub prober: Arc<dyn MetadataProber>,
    pub inspector: Arc<dyn ImageInspector>,
    pub previews: Arc<dyn PreviewGenerator>,
}

impl Toolkit {
    /// Subprocess-backed toolkit for the configured programs.
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            validator: Arc::new(Jhove::new(&config.jhove)),
            prober: Arc::new(ExifTool::new(&config.exiftool)),
            inspector: Arc::new(Magick::new(&config.magick, config.magick_thread_limit)),
            previews: Arc::new(Vips::new(&config.vips)),
        }
    }
}
