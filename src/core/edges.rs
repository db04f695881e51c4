//! Upgrade edges between adjacent minor lines

use crate::core::{lines::MinorLine, version::ReleaseVersion};

/// An upgrade to test: one source version to every retained version of the next line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePair {
    pub from: ReleaseVersion,

    /// Target versions joined by a single space
    pub to: String,
}

/// Derive upgrade edges between each minor line and the next one up
///
/// Lines are ordered by (major, minor) before pairing, so callers may pass
/// them in any order. The highest line never appears as a source, and a line
/// without retained versions takes part in no edge.
pub fn plan_edges(lines: &[MinorLine]) -> Vec<EdgePair> {
    let mut ordered: Vec<&MinorLine> = lines.iter().collect();
    ordered.sort_by_key(|l| (l.major, l.minor));

    let mut edges = Vec::new();
    for pair in ordered.windows(2) {
        let (older, newer) = (pair[0], pair[1]);
        if older.is_empty() || newer.is_empty() {
            continue;
        }
        let to = newer.joined();
        for from in &older.versions {
            edges.push(EdgePair {
                from: from.clone(),
                to: to.clone(),
            });
        }
    }

    edges
}
