pub mod artifact;
pub mod store;

pub use artifact::{read_artifact, ArtifactRecord, ArtifactSummary, PropertyValue};
pub use store::{CacheEntry, CacheStore};
