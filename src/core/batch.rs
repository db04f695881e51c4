//! Bounded-size batches of versions for the general report tasks

use crate::core::version::ReleaseVersion;

/// Default number of versions handed to one report task
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// A consecutive run of versions reported on by one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBatch {
    /// Index of the first version of this batch in the full list
    pub start: usize,

    pub versions: Vec<ReleaseVersion>,
}

impl VersionBatch {
    /// Versions joined by a single space
    pub fn joined(&self) -> String {
        self.versions
            .iter()
            .map(ReleaseVersion::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Split versions, in the given order, into chunks of at most `size`
///
/// The last chunk may be shorter. A size of zero is treated as one.
pub fn batch_versions(versions: &[ReleaseVersion], size: usize) -> Vec<VersionBatch> {
    let size = size.max(1);

    versions
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| VersionBatch {
            start: index * size,
            versions: chunk.to_vec(),
        })
        .collect()
}
