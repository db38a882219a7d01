use std::path::{Path, PathBuf};

use base64::engine::GeneralPurpose;

/// Returns the first of `subpaths` (joined onto `root`) accepted by `search`.
pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .map(|it| root.as_ref().join(it))
        .find(|it: &PathBuf| search(it))
}

pub fn base64_engine() -> GeneralPurpose {
    base64::engine::GeneralPurpose::new(
        &base64::alphabet::URL_SAFE,
        base64::engine::GeneralPurposeConfig::new(),
    )
}

/// Parses a path/body id. Anything that isn't a UUID can't name a stored record.
pub fn parse_id(value: &str) -> Option<bson::Uuid> {
    uuid::Uuid::parse_str(value.trim()).ok().map(bson::Uuid::from)
}
