//! Channel source - release channels read from a graph-data checkout

pub mod git;

pub use git::GitCloner;

use crate::core::{ReleaseVersion, SynthesisError, VersionFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Error types for reading channels
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Clone failed: {0}")]
    Clone(String),

    #[error("Failed to list channels in {path}: {source}")]
    ListChannels {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read channel {channel}: {source}")]
    ReadChannel {
        channel: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse channel {channel}: {source}")]
    ParseChannel {
        channel: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

/// A release channel document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub versions: Vec<String>,
}

/// Reads channel documents from a directory
#[derive(Debug, Clone)]
pub struct ChannelSource {
    channels_path: PathBuf,
}

impl ChannelSource {
    pub fn new(channels_path: impl Into<PathBuf>) -> Self {
        Self {
            channels_path: channels_path.into(),
        }
    }

    pub fn channels_path(&self) -> &Path {
        &self.channels_path
    }

    /// Names of all entries in the channel directory, sorted
    pub async fn list_channels(&self) -> Result<Vec<String>, SourceError> {
        let list_err = |source| SourceError::ListChannels {
            path: self.channels_path.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.channels_path)
            .await
            .map_err(list_err)?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        Ok(names)
    }

    /// Read and parse one channel document
    pub async fn read_channel(&self, channel: &str) -> Result<Channel, SourceError> {
        let content = tokio::fs::read_to_string(self.channels_path.join(channel))
            .await
            .map_err(|source| SourceError::ReadChannel {
                channel: channel.to_string(),
                source,
            })?;

        if content.trim().is_empty() {
            return Ok(Channel::default());
        }

        serde_yaml::from_str(&content).map_err(|source| SourceError::ParseChannel {
            channel: channel.to_string(),
            source,
        })
    }

    /// Union of admitted versions across all channels
    ///
    /// A channel that cannot be read or parsed is skipped with a warning.
    /// Failing to list the directory, or a malformed version under a strict
    /// filter, aborts.
    pub async fn collect_versions(
        &self,
        filter: &VersionFilter,
    ) -> Result<BTreeSet<ReleaseVersion>, SourceError> {
        let mut versions = BTreeSet::new();

        for channel_name in self.list_channels().await? {
            let channel = match self.read_channel(&channel_name).await {
                Ok(channel) => channel,
                Err(e) => {
                    warn!("Skipping channel {}: {}", channel_name, e);
                    continue;
                }
            };

            let admitted = filter.filter(&channel.versions)?;
            info!("Found {} versions from {} channel", admitted.len(), channel_name);
            versions.extend(admitted);
        }

        info!("Discovered {} unique versions", versions.len());
        Ok(versions)
    }
}
