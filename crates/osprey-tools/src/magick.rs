//! ImageMagick inspector

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::process::{self, Captured};
use crate::types::Inspection;
use crate::ImageInspector;

pub struct Magick {
    program: PathBuf,
    thread_limit: Option<u32>,
}

impl Magick {
    pub fn new(program: &Path, thread_limit: Option<u32>) -> Self {
        Self {
            program: program.to_path_buf(),
            thread_limit,
        }
    }

    /// ImageMagick 7 takes `identify` as a subcommand; a configured
    /// `identify` binary (ImageMagick 6) is called directly.
    fn identify(&self, args: &[OsString]) -> Result<Captured> {
        let mut full = Vec::with_capacity(args.len() + 1);
        if self.program.file_stem().is_none_or(|s| s != "identify") {
            full.push(OsString::from("identify"));
        }
        full.extend(args.iter().cloned());

        let envs: Vec<(&str, String)> = self
            .thread_limit
            .map(|limit| vec![("MAGICK_THREAD_LIMIT", limit.to_string())])
            .unwrap_or_default();
        process::run(&self.program, full, &envs)
    }

    fn format_query(&self, format: &str, path: &Path) -> Result<String> {
        let captured = self
            .identify(&["-format".into(), format.into(), path.into()])?
            .require_success(&self.program)?;
        Ok(captured.stdout)
    }
}

impl ImageInspector for Magick {
    fn inspect(&self, path: &Path) -> Result<Inspection> {
        let captured = self.identify(&["-verbose".into(), path.into()])?;
        Ok(Inspection {
            success: captured.success,
            output: captured.combined(),
        })
    }

    fn page_count(&self, path: &Path) -> Result<u32> {
        let output = self.format_query("%n\n", path)?;
        parse_page_count(&output).ok_or_else(|| Error::ParseError {
            program: self.program.clone(),
            message: format!("unexpected page count output: {:?}", output.trim()),
        })
    }

    fn compression(&self, path: &Path) -> Result<String> {
        let output = self.format_query("%C\n", path)?;
        first_line(&output)
            .map(String::from)
            .ok_or_else(|| Error::ParseError {
                program: self.program.clone(),
                message: "empty compression output".into(),
            })
    }
}

fn first_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).find(|l| !l.is_empty())
}

/// `%n` prints the frame count once per frame.
pub fn parse_page_count(output: &str) -> Option<u32> {
    first_line(output)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1\n", Some(1))]
    #[case("3\n3\n3\n", Some(3))]
    #[case("\n2\n2\n", Some(2))]
    #[case("", None)]
    #[case("identify: no decode delegate\n", None)]
    fn page_count_output(#[case] output: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_page_count(output), expected);
    }
}
