//! Release versions and the filter that admits them into a synthesis run

use crate::core::error::SynthesisError;
use semver::Version;
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

/// A release version as found in a channel, with its parsed form
///
/// Ordering follows semantic-version precedence; the original string breaks ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseVersion {
    version: Version,
    raw: String,
}

impl ReleaseVersion {
    /// Parse a version string
    pub fn parse(raw: &str) -> Result<Self, SynthesisError> {
        let version = Version::parse(raw).map_err(|source| SynthesisError::MalformedVersion {
            version: raw.to_string(),
            source,
        })?;

        Ok(Self {
            version,
            raw: raw.to_string(),
        })
    }

    pub fn major(&self) -> u64 {
        self.version.major
    }

    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    /// The version exactly as it appeared in the channel
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The version with dots replaced by dashes, usable inside resource names
    pub fn undotted(&self) -> String {
        self.raw.replace('.', "-")
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Default lowest minor release that still gets reports
pub const DEFAULT_MIN_MINOR: u64 = 5;

/// Admits raw version strings into a synthesis run
///
/// A version is admitted when it has no build metadata suffix and its minor
/// number is at least `min_minor`. Strings that do not parse are skipped with
/// a warning, or rejected outright when the filter is strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionFilter {
    min_minor: u64,
    strict: bool,
}

impl Default for VersionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_MINOR)
    }
}

impl VersionFilter {
    pub fn new(min_minor: u64) -> Self {
        Self {
            min_minor,
            strict: false,
        }
    }

    /// Make malformed version strings fatal instead of skipping them
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn min_minor(&self) -> u64 {
        self.min_minor
    }

    /// Check a single raw version string
    ///
    /// Returns `Ok(None)` when the version is excluded.
    pub fn admit(&self, raw: &str) -> Result<Option<ReleaseVersion>, SynthesisError> {
        // Arch-suffixed builds are no longer reported on
        if raw.contains('+') {
            return Ok(None);
        }

        let version = match ReleaseVersion::parse(raw) {
            Ok(version) => version,
            Err(e) if self.strict => return Err(e),
            Err(e) => {
                warn!("Skipping version: {}", e);
                return Ok(None);
            }
        };

        if version.minor() < self.min_minor {
            return Ok(None);
        }

        Ok(Some(version))
    }

    /// Filter a list of raw versions, keeping input order and dropping repeats
    pub fn filter<I, S>(&self, raw: I) -> Result<Vec<ReleaseVersion>, SynthesisError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = std::collections::HashSet::new();
        let mut admitted = Vec::new();

        for item in raw {
            if let Some(version) = self.admit(item.as_ref())? {
                if seen.insert(version.raw.clone()) {
                    admitted.push(version);
                }
            }
        }

        Ok(admitted)
    }

    /// Filter into an ordered set (precedence order)
    pub fn normalize<I, S>(&self, raw: I) -> Result<BTreeSet<ReleaseVersion>, SynthesisError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.filter(raw)?.into_iter().collect())
    }
}
