//! The 3D host's native FBX import/export, seen from the pipeline.

pub mod command;
pub mod staged;

pub use command::CommandHost;
pub use staged::StagedHost;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    #[default]
    All,
    Selected,
}

impl ExportScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportScope::All => "all",
            ExportScope::Selected => "selected",
        }
    }
}

impl fmt::Display for ExportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait SceneHost: Send + Sync {
    /// Load the container at `source` into the active scene.
    fn import_scene(&self, source: &Path) -> Result<()>;

    /// Write the scene (or the selected part of it) to `destination`.
    fn export_scene(&self, destination: &Path, scope: ExportScope) -> Result<()>;
}
