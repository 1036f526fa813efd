//! Named per-file checks
//!
//! Check names are the keys a project enables in the ledger and the keys
//! results are stored under, so their string forms are part of the ledger
//! protocol.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One independently reported validation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    /// Same-stem counterpart exists in the raw set
    RawPair,
    /// Structural validity from the format validator
    Jhove,
    /// Filename is free of disallowed characters and matches the project pattern
    Filename,
    /// Exactly one page/frame
    #[serde(rename = "tifpages")]
    TifPages,
    /// Image-toolkit inspection exits successfully
    Magick,
    /// Compression scheme equals the required one
    TifCompression,
    /// Next file of a multi-part sequence exists
    Sequence,
    /// Stem is unique within the project
    UniqueFile,
    /// Stem is unique across other projects
    UniqueOther,
}

impl CheckName {
    /// Checks run by the file pipeline, in execution order.
    pub const PIPELINE_ORDER: [CheckName; 6] = [
        CheckName::RawPair,
        CheckName::Jhove,
        CheckName::Filename,
        CheckName::TifPages,
        CheckName::Magick,
        CheckName::TifCompression,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RawPair => "raw_pair",
            Self::Jhove => "jhove",
            Self::Filename => "filename",
            Self::TifPages => "tifpages",
            Self::Magick => "magick",
            Self::TifCompression => "tif_compression",
            Self::Sequence => "sequence",
            Self::UniqueFile => "unique_file",
            Self::UniqueOther => "unique_other",
        }
    }

    pub fn all() -> &'static [CheckName] {
        &[
            Self::RawPair,
            Self::Jhove,
            Self::Filename,
            Self::TifPages,
            Self::Magick,
            Self::TifCompression,
            Self::Sequence,
            Self::UniqueFile,
            Self::UniqueOther,
        ]
    }
}

impl FromStr for CheckName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown check: {s}"))
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of checks a project has enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSet(BTreeSet<CheckName>);

impl CheckSet {
    /// Build from the ledger's list of enabled check names.
    ///
    /// Names this worker does not implement are logged and ignored.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut set = BTreeSet::new();
        for name in names {
            match name.as_ref().parse::<CheckName>() {
                Ok(check) => {
                    set.insert(check);
                }
                Err(_) => tracing::warn!(check = name.as_ref(), "ignoring unsupported check"),
            }
        }
        Self(set)
    }

    pub fn contains(&self, check: CheckName) -> bool {
        self.0.contains(&check)
    }

    pub fn insert(&mut self, check: CheckName) {
        self.0.insert(check);
    }

    /// Enabled pipeline checks in execution order.
    pub fn pipeline_checks(&self) -> impl Iterator<Item = CheckName> + '_ {
        CheckName::PIPELINE_ORDER
            .into_iter()
            .filter(|c| self.0.contains(c))
    }
}

impl FromIterator<CheckName> for CheckSet {
    fn from_iter<I: IntoIterator<Item = CheckName>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
