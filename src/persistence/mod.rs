//! Persistence layer: versioned index artifact, catalog artifact, and files.

pub mod artifact;
pub mod files;
pub mod serialization;

pub use artifact::{inspect, load, save, ArtifactHeader, Artifacts};
pub use files::{read_artifacts, read_header, write_artifacts, ArtifactPaths};
