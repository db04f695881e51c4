//! build-reports - turns release channel versions into a Tekton report pipeline

pub mod cli;
pub mod core;
pub mod source;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use crate::core::{PipelineAssembler, PipelineSpec, ReleaseVersion, SynthesisError, Task, VersionFilter};
pub use source::{ChannelSource, GitCloner, SourceError};
pub use store::{InMemoryStore, PipelineStore, StoreError, TektonClient};
pub use sync::{PipelineSyncer, SyncConfig, SyncError, SyncOutcome};
