//! Minor release lines

use crate::core::version::ReleaseVersion;
use std::collections::BTreeMap;

/// Number of most recent patches kept per minor line by default
pub const DEFAULT_LINE_WINDOW: usize = 3;

/// The newest patch releases of one major.minor line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinorLine {
    pub major: u64,
    pub minor: u64,

    /// Descending by patch, at most the retained window
    pub versions: Vec<ReleaseVersion>,
}

impl MinorLine {
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Retained versions joined by a single space
    pub fn joined(&self) -> String {
        self.versions
            .iter()
            .map(ReleaseVersion::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Group versions by minor line, keeping the `window` highest patches of each
///
/// Lines come back ascending by (major, minor). Within a line versions are
/// sorted descending by patch; equal patches keep their encounter order.
pub fn group_minor_lines<'a, I>(versions: I, window: usize) -> Vec<MinorLine>
where
    I: IntoIterator<Item = &'a ReleaseVersion>,
{
    let mut lines: BTreeMap<(u64, u64), Vec<ReleaseVersion>> = BTreeMap::new();

    for version in versions {
        lines
            .entry((version.major(), version.minor()))
            .or_default()
            .push(version.clone());
    }

    lines
        .into_iter()
        .map(|((major, minor), mut versions)| {
            versions.sort_by(|a, b| b.patch().cmp(&a.patch()));
            versions.truncate(window);
            MinorLine {
                major,
                minor,
                versions,
            }
        })
        .collect()
}
