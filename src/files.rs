use std::path::{Path, PathBuf};

/// Upload location: base and filename glued together as strings.
pub fn upload_path(base: &str, filename: &str) -> String {
    base.to_owned() + filename
}

/// Download location under `<root>/documents`. `join` keeps `..` segments
/// and lets an absolute `file` replace the whole path.
pub fn download_path(root: &Path, file: &str) -> PathBuf {
    root.join("documents").join(file)
}
