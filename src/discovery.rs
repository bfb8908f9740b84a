//! Buildfile lookup

use std::path::{Path, PathBuf};

pub const BUILDFILE_NAME: &str = "Buildfile";

/// Nearest `Buildfile` in `start` or one of its ancestors.
pub fn find_buildfile(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(BUILDFILE_NAME))
        .find(|candidate| candidate.is_file())
}
