use crate::error::{EngineError, Result};
use std::fs::Permissions;
use std::path::{Path, PathBuf};
use tourline::v1::Tour;

/// Write `tour` back to the file its `id` names.
///
/// The document is written pretty-printed and without `id`. The write goes
/// through a temp file in the same directory and is renamed into place.
pub fn save_tour(tour: &Tour) -> Result<()> {
    write_tour(Path::new(&tour.id), tour)
}

/// Create the document for a brand-new tour at `path`, refusing to
/// overwrite an existing file.
pub fn create_tour_file(path: &Path, tour: &Tour) -> Result<()> {
    if path.exists() {
        return Err(EngineError::TourExists(path.to_path_buf()));
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    write_tour(path, tour)
}

/// Remove a tour file. A file that is already gone is not an error.
pub fn delete_tour_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// File name stem for a tour title: lowercase, whitespace to `-`, anything
/// other than word characters and `-` dropped.
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Path a new tour titled `title` is recorded to under `root`.
pub fn new_tour_path(root: &Path, directory: &str, title: &str) -> PathBuf {
    root.join(directory)
        .join(format!("{}.tour", slugify_title(title)))
}

fn write_tour(path: &Path, tour: &Tour) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&tmp, tour)?;

    // The temp file is owner-only; keep the mode of the file being replaced.
    let permissions = match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => new_file_permissions(),
    };
    if let Some(permissions) = permissions {
        tmp.as_file().set_permissions(permissions)?;
    }

    tmp.persist(path).map_err(|e| EngineError::Io(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}
