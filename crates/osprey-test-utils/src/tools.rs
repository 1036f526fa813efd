//! Scripted stand-ins for the external programs.
//!
//! Behaviour is keyed by file stem; anything not scripted is a clean
//! single-page LZW TIFF.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use osprey_tools::{
    Error, FormatValidator, ImageInspector, Inspection, MetadataProber, PreviewGenerator, Result,
    Toolkit, ValidationReport,
};

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct FakeTools {
    /// Validator messages by stem; a scripted stem is not well-formed
    invalid: HashMap<String, Vec<String>>,
    pages: HashMap<String, u32>,
    compression: HashMap<String, String>,
    /// Stems the inspector cannot read
    unreadable: HashSet<String>,
    /// Stems whose thumbnail fails
    no_preview: HashSet<String>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalid(mut self, stem: &str, messages: &[&str]) -> Self {
        self.invalid
            .insert(stem.to_string(), messages.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn pages(mut self, stem: &str, pages: u32) -> Self {
        self.pages.insert(stem.to_string(), pages);
        self
    }

    pub fn compression(mut self, stem: &str, scheme: &str) -> Self {
        self.compression.insert(stem.to_string(), scheme.to_string());
        self
    }

    pub fn unreadable(mut self, stem: &str) -> Self {
        self.unreadable.insert(stem.to_string());
        self
    }

    pub fn no_preview(mut self, stem: &str) -> Self {
        self.no_preview.insert(stem.to_string());
        self
    }

    pub fn toolkit(self) -> Toolkit {
        let fake = Arc::new(self);
        Toolkit {
            validator: fake.clone(),
            prober: fake.clone(),
            inspector: fake.clone(),
            previews: fake,
        }
    }

    fn check_readable(&self, path: &Path) -> Result<()> {
        if self.unreadable.contains(&stem(path)) {
            return Err(Error::CommandFailed {
                program: "magick".into(),
                code: 1,
                stderr: format!("identify: improper image header `{}'", path.display()),
            });
        }
        Ok(())
    }
}

impl FormatValidator for FakeTools {
    fn validate(&self, path: &Path) -> Result<ValidationReport> {
        let report = match self.invalid.get(&stem(path)) {
            Some(messages) => ValidationReport {
                well_formed: false,
                status: "Not well-formed".into(),
                messages: messages.clone(),
                output: messages.join("\n"),
            },
            None => ValidationReport {
                well_formed: true,
                status: "Well-Formed and valid".into(),
                messages: Vec::new(),
                output: "Well-Formed and valid".into(),
            },
        };
        Ok(report)
    }
}

impl MetadataProber for FakeTools {
    fn probe(&self, path: &Path) -> Result<serde_json::Value> {
        Ok(serde_json::json!([{
            "SourceFile": path.display().to_string(),
            "File:FileType": "TIFF",
        }]))
    }
}

impl ImageInspector for FakeTools {
    fn inspect(&self, path: &Path) -> Result<Inspection> {
        let readable = !self.unreadable.contains(&stem(path));
        Ok(Inspection {
            success: readable,
            output: if readable {
                format!("Image: {}", path.display())
            } else {
                "identify: improper image header".into()
            },
        })
    }

    fn page_count(&self, path: &Path) -> Result<u32> {
        self.check_readable(path)?;
        Ok(self.pages.get(&stem(path)).copied().unwrap_or(1))
    }

    fn compression(&self, path: &Path) -> Result<String> {
        self.check_readable(path)?;
        Ok(self
            .compression
            .get(&stem(path))
            .cloned()
            .unwrap_or_else(|| "LZW".into()))
    }
}

impl PreviewGenerator for FakeTools {
    fn thumbnail(&self, source: &Path, dest: &Path, width: u32) -> Result<()> {
        if self.no_preview.contains(&stem(source)) {
            return Err(Error::CommandFailed {
                program: "vips".into(),
                code: 1,
                stderr: "VipsForeignLoad: not a known file format".into(),
            });
        }
        fs::write(dest, format!("thumbnail {width}")).map_err(|source| Error::Spawn {
            program: "vips".into(),
            source,
        })
    }

    fn tiles(&self, _source: &Path, dest_base: &Path, _tile_size: u32, _archive: bool) -> Result<()> {
        fs::write(dest_base.with_extension("dzi"), "<Image/>").map_err(|source| Error::Spawn {
            program: "vips".into(),
            source,
        })
    }
}
