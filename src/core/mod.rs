//! Core synthesis model
//!
//! This module turns raw release versions into a report pipeline definition:
//! filtering, grouping into minor lines, planning upgrade edges, batching and
//! assembly. Nothing here performs I/O.

pub mod batch;
pub mod config;
pub mod edges;
pub mod error;
pub mod lines;
pub mod pipeline;
pub mod task;
pub mod version;

pub use batch::*;
pub use edges::*;
pub use error::*;
pub use lines::*;
pub use pipeline::*;
pub use task::*;
pub use version::*;
