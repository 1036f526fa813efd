//! Server version compatibility

use semver::Version;

use crate::{Error, Result};

/// Accept `found` when it shares the major version with `expected`
/// (and the minor version too while the major is `0`).
pub fn check_compatible(expected: &str, found: &str) -> Result<()> {
    let mismatch = || Error::VersionMismatch {
        expected: expected.to_string(),
        found: found.to_string(),
    };
    let want = parse(expected).ok_or_else(mismatch)?;
    let have = parse(found).ok_or_else(mismatch)?;

    let compatible = if want.major == 0 {
        have.major == 0 && have.minor == want.minor
    } else {
        have.major == want.major
    };
    if compatible { Ok(()) } else { Err(mismatch()) }
}

fn parse(version: &str) -> Option<Version> {
    let trimmed = version.trim().trim_start_matches('v');
    Version::parse(trimmed).ok().or_else(|| {
        // "2.8" style versions
        Version::parse(&format!("{trimmed}.0")).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2.8.0", "2.8.3", true)]
    #[case("2.8.0", "2.10.0", true)]
    #[case("2.8.0", "3.0.0", false)]
    #[case("0.4.0", "0.4.9", true)]
    #[case("0.4.0", "0.5.0", false)]
    #[case("2.8", "v2.9.1", true)]
    #[case("2.8.0", "unknown", false)]
    fn compatibility(#[case] expected: &str, #[case] found: &str, #[case] ok: bool) {
        assert_eq!(check_compatible(expected, found).is_ok(), ok);
    }
}
