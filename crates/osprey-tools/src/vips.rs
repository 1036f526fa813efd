//! libvips preview generator

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::process;
use crate::PreviewGenerator;

pub struct Vips {
    program: PathBuf,
}

impl Vips {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
        }
    }
}

impl PreviewGenerator for Vips {
    fn thumbnail(&self, source: &Path, dest: &Path, width: u32) -> Result<()> {
        // Save options ride on the output filename
        let mut target = dest.as_os_str().to_os_string();
        target.push("[Q=100]");
        let args: Vec<OsString> = vec![
            "thumbnail".into(),
            source.into(),
            target,
            width.to_string().into(),
        ];
        process::run(&self.program, args, &[])?.require_success(&self.program)?;
        Ok(())
    }

    fn tiles(&self, source: &Path, dest_base: &Path, tile_size: u32, archive: bool) -> Result<()> {
        let mut args: Vec<OsString> = vec![
            "dzsave".into(),
            source.into(),
            dest_base.into(),
            "--tile-size".into(),
            tile_size.to_string().into(),
            "--suffix".into(),
            ".jpg[Q=100]".into(),
        ];
        if archive {
            args.push("--container".into());
            args.push("zip".into());
        }
        process::run(&self.program, args, &[])?.require_success(&self.program)?;
        Ok(())
    }
}
